use std::collections::HashSet;
use std::sync::Arc;

use eframe::egui::{self, Align2, Color32, FontId, Sense, Stroke, Ui, Vec2, vec2};
use tracing::debug;

use crate::explore::{ClickOutcome, NodeKind, matching_node_ids};
use crate::util::truncate_label;

use super::super::physics::step_physics;
use super::super::render_utils::{
    blend_color, dim_color, draw_background, link_color, node_color, segment_maybe_visible,
    world_to_screen,
};
use super::super::{PhysicsConfig, RenderGraph, SearchMatchCache, ViewModel};

enum CanvasAction {
    Click(String),
    Reset,
}

impl ViewModel {
    fn update_screen_space(rect: egui::Rect, pan: Vec2, zoom: f32, cache: &mut RenderGraph) {
        let scratch = &mut cache.view_scratch;
        scratch.screen_positions.clear();
        scratch.screen_radii.clear();
        for node in &cache.nodes {
            scratch
                .screen_positions
                .push(world_to_screen(rect, pan, zoom, node.world_pos));
            scratch
                .screen_radii
                .push((node.base_radius * zoom.powf(0.6)).clamp(2.5, 70.0));
        }
    }

    fn cached_search_matches(&mut self) -> Option<Arc<HashSet<usize>>> {
        let query = self.search.trim();
        if query.is_empty() {
            return None;
        }

        if let Some(cached) = &self.search_match_cache
            && cached.graph_revision == self.render_graph_revision
            && cached.query == query
        {
            return Some(Arc::clone(&cached.matches));
        }

        let cache = self.graph_cache.as_ref()?;
        let matches = matching_node_ids(&self.visible_graph, query)
            .into_iter()
            .filter_map(|id| cache.index_by_id.get(&id).copied())
            .collect::<HashSet<_>>();
        let matches = Arc::new(matches);

        self.search_match_cache = Some(SearchMatchCache {
            query: query.to_owned(),
            graph_revision: self.render_graph_revision,
            matches: Arc::clone(&matches),
        });
        Some(matches)
    }

    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui) {
        if self.graph_is_stale() {
            self.rebuild_render_graph();
        }
        if let Some(id) = self.pending_focus.take()
            && !self.focus_on(&id)
        {
            debug!(node = %id, "focus target is not on the canvas");
        }

        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        draw_background(&painter, rect, self.pan, self.zoom);

        self.handle_graph_zoom(ui, rect, &response);
        self.handle_graph_pan(&response);
        let camera_moving = self.animate_camera();

        let search_matches = self.cached_search_matches();
        let physics = PhysicsConfig {
            intensity: self.physics_intensity,
            repulsion_scale: self.physics_repulsion,
            spring_scale: self.physics_spring,
            collision_scale: self.physics_collision,
            velocity_damping: self.physics_velocity_damping,
        };
        let (pan, zoom) = (self.pan, self.zoom);
        let selected = self.explorer.selected().map(str::to_owned);

        let Some(cache) = self.graph_cache.as_mut() else {
            self.visible_node_count = 0;
            self.visible_edge_count = 0;
            ui.label("Nothing to show with the current filters.");
            if response.secondary_clicked() {
                self.explorer.reset();
            }
            return;
        };

        let physics_moving = self.live_physics && step_physics(cache, physics);
        if physics_moving || camera_moving || response.dragged() {
            ui.ctx().request_repaint();
        }

        Self::update_screen_space(rect, pan, zoom, cache);
        Self::visible_indices_into(
            rect,
            &cache.view_scratch.screen_positions,
            &cache.view_scratch.screen_radii,
            &mut cache.view_scratch.visible_indices,
        );
        let scratch = &mut cache.view_scratch;
        scratch.visible_mask.clear();
        scratch.visible_mask.resize(cache.nodes.len(), false);
        for &index in &scratch.visible_indices {
            scratch.visible_mask[index] = true;
        }

        let hovered = Self::hovered_index(
            ui,
            &scratch.visible_indices,
            &scratch.screen_positions,
            &scratch.screen_radii,
        );
        if hovered.is_some() {
            ui.output_mut(|output| output.cursor_icon = egui::CursorIcon::PointingHand);
        }

        let action = if response.clicked_by(egui::PointerButton::Primary) {
            Some(match hovered {
                Some(index) => CanvasAction::Click(cache.nodes[index].id.clone()),
                None => CanvasAction::Reset,
            })
        } else if response.secondary_clicked() {
            Some(CanvasAction::Reset)
        } else {
            None
        };

        let selected_index = selected
            .as_deref()
            .and_then(|id| cache.index_by_id.get(id).copied());
        let related = selected_index
            .map(|index| cache.neighbors[index].iter().copied().collect::<HashSet<_>>())
            .unwrap_or_default();
        let search_active = search_matches
            .as_ref()
            .is_some_and(|matches| !matches.is_empty());

        let zoom_sqrt = zoom.sqrt();
        let mut drawn_edges = 0usize;
        for edge in &cache.edges {
            let start = scratch.screen_positions[edge.source];
            let end = scratch.screen_positions[edge.target];
            if !scratch.visible_mask[edge.source]
                && !scratch.visible_mask[edge.target]
                && !segment_maybe_visible(rect, start, end)
            {
                continue;
            }

            let touches_selection =
                selected_index.is_some_and(|index| edge.source == index || edge.target == index);
            let base = link_color(edge.kind, edge.value);
            let (width, color) = if touches_selection {
                (
                    (2.4 * zoom_sqrt).clamp(1.2, 4.4),
                    blend_color(base, Color32::from_rgb(245, 206, 93), 0.6),
                )
            } else if selected_index.is_some() {
                ((0.8 * zoom_sqrt).clamp(0.4, 2.0), dim_color(base, 0.45))
            } else {
                ((1.1 * zoom_sqrt).clamp(0.5, 3.0), base)
            };

            painter.line_segment([start, end], Stroke::new(width, color));
            drawn_edges += 1;
        }
        self.visible_edge_count = drawn_edges;
        self.visible_node_count = scratch.visible_indices.len();

        // clusters first so members draw on top of them
        let mut draw_order = scratch.visible_indices.clone();
        draw_order.sort_by_key(|&index| cache.nodes[index].kind != NodeKind::Cluster);

        let selected_color = Color32::from_rgb(245, 206, 93);
        let mut selection_animating = false;
        for index in draw_order {
            let node = &cache.nodes[index];
            let position = scratch.screen_positions[index];
            let radius = scratch.screen_radii[index];

            let is_selected = selected_index == Some(index);
            let is_hovered = hovered == Some(index);
            let is_related = related.contains(&index);
            let is_search_match = search_matches
                .as_ref()
                .is_some_and(|matches| matches.contains(&index));

            let base_color = node_color(node.kind, node.style.as_deref());
            let unselected_color = if is_hovered {
                blend_color(base_color, Color32::WHITE, 0.35)
            } else if is_related {
                blend_color(base_color, Color32::from_rgb(246, 137, 92), 0.35)
            } else if is_search_match {
                blend_color(base_color, Color32::from_rgb(103, 196, 255), 0.6)
            } else if selected_index.is_some() {
                dim_color(base_color, 0.5)
            } else if search_active {
                dim_color(base_color, 0.4)
            } else {
                base_color
            };

            let selection_mix = ui.ctx().animate_bool(
                ui.make_persistent_id(("node-selection", node.id.as_str())),
                is_selected,
            );
            if selection_mix > 0.0 && selection_mix < 1.0 {
                selection_animating = true;
            }

            painter.circle_filled(
                position,
                radius,
                blend_color(unselected_color, selected_color, selection_mix * 0.5),
            );
            let is_expanded = node.kind == NodeKind::Cluster
                && self
                    .explorer
                    .index()
                    .cluster_index(&node.id)
                    .is_some_and(|cluster| self.explorer.is_expanded(cluster));
            if is_expanded {
                painter.circle_stroke(
                    position,
                    radius + 3.0,
                    Stroke::new(1.5, Color32::from_rgba_unmultiplied(230, 230, 230, 140)),
                );
            }
            if selection_mix > 0.0 {
                painter.circle_stroke(
                    position,
                    radius + 4.0 + ((1.0 - selection_mix) * 6.0),
                    Stroke::new(
                        1.0 + selection_mix,
                        Color32::from_rgba_unmultiplied(245, 206, 93, (selection_mix * 200.0) as u8),
                    ),
                );
            }
            painter.circle_stroke(
                position,
                radius,
                Stroke::new(1.0, Color32::from_rgba_unmultiplied(10, 10, 10, 190)),
            );

            let show_label = node.kind == NodeKind::Cluster
                || is_selected
                || is_hovered
                || is_related
                || (is_search_match && zoom > 0.35)
                || zoom > 1.4;
            if show_label {
                let text = match node.kind {
                    NodeKind::Cluster => {
                        format!("{} ({})", truncate_label(&node.name, 28), node.count)
                    }
                    _ => truncate_label(&node.name, 32),
                };
                painter.text(
                    position + vec2(radius + 5.0, 0.0),
                    Align2::LEFT_CENTER,
                    text,
                    FontId::proportional(if node.kind == NodeKind::Cluster { 13.0 } else { 11.5 }),
                    Color32::from_gray(236),
                );
            }
        }

        if selection_animating {
            ui.ctx().request_repaint();
        }

        if let Some(index) = hovered {
            let node = &cache.nodes[index];
            let hover_text = format!(
                "{}  |  {}  |  releases {}",
                node.name,
                node.kind.label(),
                node.count
            );
            painter.text(
                rect.left_top() + vec2(10.0, 10.0),
                Align2::LEFT_TOP,
                hover_text,
                FontId::proportional(13.0),
                Color32::from_gray(240),
            );
        }

        match action {
            Some(CanvasAction::Click(id)) => self.apply_canvas_click(&id),
            Some(CanvasAction::Reset) => {
                self.explorer.reset();
                self.reset_camera();
            }
            None => {}
        }
    }

    fn apply_canvas_click(&mut self, id: &str) {
        let outcome = self.explorer.handle_click(id);
        debug!(node = %id, ?outcome, "canvas click");
        match outcome {
            ClickOutcome::Expanded { cluster_id, .. } => {
                self.focus_on(&cluster_id);
                self.member_rows_visible = Self::INITIAL_LIST_ROWS;
            }
            ClickOutcome::Selected { node_id } => {
                self.focus_on(&node_id);
            }
            ClickOutcome::Collapsed { .. } | ClickOutcome::Ignored => {}
        }
    }
}
