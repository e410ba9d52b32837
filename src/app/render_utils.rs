use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use eframe::egui::ecolor::Hsva;
use eframe::egui::{Color32, Painter, Pos2, Rect, Stroke, Vec2};

use crate::explore::{LinkKind, NodeKind};

const STYLE_COLORS: [(&str, Color32); 9] = [
    ("House", Color32::from_rgb(0xFF, 0x40, 0x81)),
    ("Deep House", Color32::from_rgb(0xC2, 0x18, 0x5B)),
    ("Tech House", Color32::from_rgb(0x00, 0xBC, 0xD4)),
    ("Techno", Color32::from_rgb(0x21, 0x96, 0xF3)),
    ("Minimal", Color32::from_rgb(0x19, 0x76, 0xD2)),
    ("Ambient", Color32::from_rgb(0x4C, 0xAF, 0x50)),
    ("Experimental", Color32::from_rgb(0x1B, 0x5E, 0x20)),
    ("Abstract", Color32::from_rgb(0x81, 0xC7, 0x84)),
    ("IDM", Color32::from_rgb(0x9C, 0x27, 0xB0)),
];

const UNSTYLED_COLOR: Color32 = Color32::from_rgb(0x9E, 0x9E, 0x9E);

pub(super) fn blend_color(base: Color32, overlay: Color32, amount: f32) -> Color32 {
    let amount = amount.clamp(0.0, 1.0);
    let mix = |from: u8, to: u8| (from as f32 + (to as f32 - from as f32) * amount) as u8;

    Color32::from_rgba_unmultiplied(
        mix(base.r(), overlay.r()),
        mix(base.g(), overlay.g()),
        mix(base.b(), overlay.b()),
        mix(base.a(), overlay.a()),
    )
}

pub(super) fn dim_color(color: Color32, factor: f32) -> Color32 {
    let factor = factor.clamp(0.0, 1.0);
    let scale = |channel: u8| (channel as f32 * factor) as u8;
    Color32::from_rgba_unmultiplied(
        scale(color.r()),
        scale(color.g()),
        scale(color.b()),
        (color.a() as f32 * (0.45 + (factor * 0.55))) as u8,
    )
}

/// Table colour for well-known styles, a stable hashed hue for the rest.
pub(super) fn style_color(style: Option<&str>) -> Color32 {
    let Some(style) = style else {
        return UNSTYLED_COLOR;
    };
    if let Some((_, color)) = STYLE_COLORS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(style))
    {
        return *color;
    }

    let mut hasher = DefaultHasher::new();
    style.to_ascii_lowercase().hash(&mut hasher);
    let hue = (hasher.finish() % 360) as f32 / 360.0;
    Hsva::new(hue, 0.55, 0.82, 1.0).into()
}

pub(super) fn node_color(kind: NodeKind, style: Option<&str>) -> Color32 {
    match kind {
        NodeKind::Cluster | NodeKind::Release => style_color(style),
        NodeKind::Artist => Color32::from_rgb(236, 190, 92),
        NodeKind::Label => Color32::from_rgb(168, 148, 226),
    }
}

pub(super) fn link_color(kind: LinkKind, value: f32) -> Color32 {
    let alpha = (90.0 + value.clamp(0.0, 1.0) * 120.0) as u8;
    match kind {
        LinkKind::Similarity => Color32::from_rgba_unmultiplied(120, 170, 220, alpha),
        LinkKind::Member => Color32::from_rgba_unmultiplied(110, 110, 110, 150),
        LinkKind::Artist => Color32::from_rgba_unmultiplied(200, 160, 80, 130),
        LinkKind::Label => Color32::from_rgba_unmultiplied(150, 130, 210, 130),
    }
}

/// World radius for a node of the given explorer size.
pub(super) fn node_radius(kind: NodeKind, size: f32) -> f32 {
    match kind {
        NodeKind::Cluster => (size * 1.5).clamp(9.0, 64.0),
        NodeKind::Release => (size * 2.0).clamp(4.0, 10.0),
        NodeKind::Artist | NodeKind::Label => (size * 1.2).clamp(4.0, 22.0),
    }
}

pub(super) fn draw_background(painter: &Painter, rect: Rect, pan: Vec2, zoom: f32) {
    painter.rect_filled(rect, 0.0, Color32::from_rgb(17, 20, 27));

    let step = (64.0 * zoom.clamp(0.5, 2.0)).max(24.0);
    let origin = rect.center() + pan;
    let stroke = Stroke::new(1.0, Color32::from_rgba_unmultiplied(58, 66, 82, 60));

    let mut x = rect.left() + (origin.x - rect.left()).rem_euclid(step);
    while x < rect.right() {
        painter.line_segment([Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())], stroke);
        x += step;
    }

    let mut y = rect.top() + (origin.y - rect.top()).rem_euclid(step);
    while y < rect.bottom() {
        painter.line_segment([Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)], stroke);
        y += step;
    }
}

pub(super) fn circle_visible(rect: Rect, position: Pos2, radius: f32) -> bool {
    rect.expand(radius).contains(position)
}

/// Cheap bounding-box test; may keep a few segments that miss the rect.
pub(super) fn segment_maybe_visible(rect: Rect, start: Pos2, end: Pos2) -> bool {
    Rect::from_two_pos(start, end).intersects(rect)
}

pub(super) fn world_to_screen(rect: Rect, pan: Vec2, zoom: f32, world: Vec2) -> Pos2 {
    rect.center() + pan + world * zoom
}

pub(super) fn screen_to_world(rect: Rect, pan: Vec2, zoom: f32, screen: Pos2) -> Vec2 {
    (screen - rect.center() - pan) / zoom
}
