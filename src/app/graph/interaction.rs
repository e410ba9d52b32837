use eframe::egui::{self, Pos2, Rect, Ui, Vec2};

use super::super::ViewModel;
use super::super::render_utils::{circle_visible, screen_to_world};

impl ViewModel {
    pub(in crate::app) fn handle_graph_zoom(
        &mut self,
        ui: &Ui,
        rect: Rect,
        response: &egui::Response,
    ) {
        if !response.hovered() {
            return;
        }

        let scroll = ui.input(|input| input.raw_scroll_delta.y);
        if scroll.abs() <= f32::EPSILON {
            return;
        }

        let pointer = ui
            .input(|input| input.pointer.hover_pos())
            .unwrap_or_else(|| rect.center());
        let world_before = screen_to_world(rect, self.pan, self.zoom, pointer);

        let zoom_factor = (1.0 + (scroll * 0.0018)).clamp(0.85, 1.15);
        self.zoom = (self.zoom * zoom_factor).clamp(0.05, 6.0);
        self.pan = pointer - rect.center() - (world_before * self.zoom);
        self.camera_target = None;
    }

    pub(in crate::app) fn handle_graph_pan(&mut self, response: &egui::Response) {
        if response.dragged_by(egui::PointerButton::Secondary)
            || response.dragged_by(egui::PointerButton::Middle)
        {
            self.pan += response.drag_delta();
            self.camera_target = None;
        }
    }

    /// Eases the camera towards `camera_target`. Returns whether it is still moving.
    pub(in crate::app) fn animate_camera(&mut self) -> bool {
        let Some(target) = self.camera_target else {
            return false;
        };

        let desired_pan = -target * self.zoom;
        let remaining = desired_pan - self.pan;
        if remaining.length() < 0.5 {
            self.pan = desired_pan;
            self.camera_target = None;
            return false;
        }
        self.pan += remaining * 0.18;
        true
    }

    /// Centres the camera on a visible node, if it is laid out yet.
    pub(in crate::app) fn focus_on(&mut self, id: &str) -> bool {
        let Some(position) = self.graph_cache.as_ref().and_then(|cache| {
            cache
                .index_by_id
                .get(id)
                .map(|&index| cache.nodes[index].world_pos)
        }) else {
            return false;
        };
        self.camera_target = Some(position);
        true
    }

    pub(in crate::app) fn reset_camera(&mut self) {
        self.pan = Vec2::ZERO;
        self.zoom = 1.0;
        self.camera_target = None;
    }

    pub(in crate::app) fn visible_indices_into(
        rect: Rect,
        screen_positions: &[Pos2],
        screen_radii: &[f32],
        visible: &mut Vec<usize>,
    ) {
        visible.clear();
        visible.extend(
            (0..screen_positions.len())
                .filter(|&index| circle_visible(rect, screen_positions[index], screen_radii[index])),
        );
    }

    pub(in crate::app) fn hovered_index(
        ui: &Ui,
        visible_indices: &[usize],
        screen_positions: &[Pos2],
        screen_radii: &[f32],
    ) -> Option<usize> {
        let pointer = ui.input(|input| input.pointer.hover_pos())?;
        visible_indices
            .iter()
            .filter_map(|&index| {
                let distance = screen_positions[index].distance(pointer);
                (distance <= screen_radii[index]).then_some((index, distance))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(index, _)| index)
    }
}
