use eframe::egui::{self, Align, Layout, Ui};

use crate::cluster::GroupBy;
use crate::explore::{ExpandMode, SearchHit, search_nodes};
use crate::util::truncate_label;

use super::super::{SearchHitsCache, ViewModel};

impl ViewModel {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("Explore");
        ui.separator();
        ui.add_space(4.0);

        self.draw_search(ui);
        ui.separator();

        egui::CollapsingHeader::new("Clustering")
            .default_open(true)
            .show(ui, |ui| self.draw_clustering_controls(ui));

        egui::CollapsingHeader::new("View")
            .default_open(true)
            .show(ui, |ui| self.draw_view_controls(ui));

        egui::CollapsingHeader::new("Largest clusters")
            .default_open(true)
            .show(ui, |ui| self.draw_cluster_ranking(ui));

        egui::CollapsingHeader::new("Physics tuning")
            .default_open(false)
            .show(ui, |ui| self.draw_physics_controls(ui));
    }

    fn current_search_hits(&mut self) -> &[SearchHit] {
        let query = self.search.trim();
        let revision = self.explorer.revision();
        let fresh = self
            .search_hits
            .as_ref()
            .is_some_and(|cached| cached.query == query && cached.explorer_revision == revision);
        if !fresh {
            self.search_hits = Some(SearchHitsCache {
                query: query.to_owned(),
                explorer_revision: revision,
                hits: search_nodes(&self.explorer, query, Self::SEARCH_HIT_LIMIT),
            });
        }
        self.search_hits
            .as_ref()
            .map(|cached| cached.hits.as_slice())
            .unwrap_or_default()
    }

    fn draw_search(&mut self, ui: &mut Ui) {
        ui.label("Search releases, artists, labels and clusters")
            .on_hover_text("Fuzzy match; visible matches are highlighted on the canvas.");
        ui.text_edit_singleline(&mut self.search);

        if self.search.trim().is_empty() {
            return;
        }

        let hits = self.current_search_hits().to_vec();
        if hits.is_empty() {
            ui.small("No matches.");
            return;
        }

        let mut revealed = None;
        egui::ScrollArea::vertical()
            .id_salt("search_hits_scroll")
            .max_height(200.0)
            .auto_shrink([false, true])
            .show_rows(ui, 20.0, hits.len(), |ui, row_range| {
                for hit in &hits[row_range] {
                    let is_selected = self.explorer.selected() == Some(hit.id.as_str());
                    let clicked = ui
                        .horizontal(|ui| {
                            let clicked = ui
                                .selectable_label(is_selected, truncate_label(&hit.name, 34))
                                .on_hover_text(hit.id.as_str())
                                .clicked();
                            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                                let marker = if hit.visible { "" } else { " (hidden)" };
                                ui.small(format!("{}{marker}", hit.kind.label()));
                            });
                            clicked
                        })
                        .inner;
                    if clicked {
                        revealed = Some(hit.id.clone());
                    }
                }
            });

        if let Some(id) = revealed {
            self.reveal_and_focus(&id);
        }
    }

    fn draw_clustering_controls(&mut self, ui: &mut Ui) {
        let mut config = self.cluster_config;
        let mut changed = false;

        ui.horizontal(|ui| {
            for (mode, text, hint) in [
                (GroupBy::Style, "Style", "One cluster per primary style."),
                (GroupBy::Label, "Label", "One cluster per label."),
                (
                    GroupBy::Similarity,
                    "Similarity",
                    "Greedy grouping by shared labels, artists and styles.",
                ),
            ] {
                changed |= ui
                    .selectable_value(&mut config.group_by, mode, text)
                    .on_hover_text(hint)
                    .changed();
            }
        });

        changed |= ui
            .add(egui::Slider::new(&mut config.min_cluster_size, 1..=25).text("Min cluster size"))
            .on_hover_text("Groups with fewer releases stay unclustered.")
            .changed();
        changed |= ui
            .add(egui::Slider::new(&mut config.link_threshold, 0.0..=1.0).text("Link threshold"))
            .on_hover_text("Similarity a pair must exceed to be linked.")
            .changed();
        changed |= ui
            .add(egui::Slider::new(&mut config.label_bonus, 0.0..=0.5).text("Label bonus"))
            .on_hover_text("Added to the similarity of pairs sharing a label.")
            .changed();
        changed |= ui
            .add(egui::Slider::new(&mut config.size_scale, 1.0..=15.0).text("Size scale"))
            .changed();
        if config.group_by == GroupBy::Similarity {
            changed |= ui
                .add(
                    egui::Slider::new(&mut config.affinity_threshold, 0.0..=1.0)
                        .text("Affinity threshold"),
                )
                .changed();
        }

        if changed {
            self.cluster_config = config;
            self.request_recluster(config);
        }

        if let Some(error) = &self.clustering_error {
            ui.colored_label(ui.visuals().error_fg_color, error.as_str());
        }
    }

    fn draw_view_controls(&mut self, ui: &mut Ui) {
        let mut mode = self.explorer.expand_mode();
        ui.horizontal(|ui| {
            ui.label("Expand");
            ui.selectable_value(&mut mode, ExpandMode::Augment, "Augment")
                .on_hover_text("Keep every cluster and add the members of expanded ones.");
            ui.selectable_value(&mut mode, ExpandMode::Replace, "Replace")
                .on_hover_text("Show only the expanded cluster and its members.");
        });
        self.explorer.set_expand_mode(mode);

        let mut filter = self.explorer.filter();
        ui.label("Nodes");
        ui.horizontal_wrapped(|ui| {
            ui.checkbox(&mut filter.clusters, "Clusters");
            ui.checkbox(&mut filter.releases, "Releases");
            ui.checkbox(&mut filter.artists, "Artists");
            ui.checkbox(&mut filter.labels, "Labels");
        });
        ui.label("Links");
        ui.horizontal_wrapped(|ui| {
            ui.checkbox(&mut filter.similarity_links, "Similarity");
            ui.checkbox(&mut filter.member_links, "Membership");
            ui.checkbox(&mut filter.artist_links, "Artist");
            ui.checkbox(&mut filter.label_links, "Label");
        });
        self.explorer.set_filter(filter);

        ui.checkbox(&mut self.live_physics, "Live physics simulation")
            .on_hover_text("Continuously simulate layout forces while viewing the graph.");
    }

    fn draw_cluster_ranking(&mut self, ui: &mut Ui) {
        let cluster_count = self.explorer.index().clusters.len();
        if cluster_count == 0 {
            ui.label("No cluster reached the minimum size.");
            return;
        }

        let row_count = cluster_count.min(self.largest_rows_visible);
        let mut should_load_more = false;
        let mut clicked_id = None;

        egui::ScrollArea::vertical()
            .id_salt("cluster_ranking_scroll")
            .max_height(220.0)
            .auto_shrink([false, false])
            .show_rows(ui, 22.0, row_count, |ui, row_range| {
                if row_range.end + Self::LIST_PREFETCH_MARGIN >= row_count {
                    should_load_more = true;
                }

                for position in row_range {
                    let Some(cluster) = self.explorer.index().clusters.get(position) else {
                        continue;
                    };
                    let is_selected = self.explorer.selected() == Some(cluster.id.as_str());
                    let expanded = self.explorer.is_expanded(position);

                    let clicked = ui
                        .horizontal(|ui| {
                            let clicked = ui
                                .selectable_label(is_selected, truncate_label(&cluster.name, 30))
                                .clicked();
                            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                                let marker = if expanded { "open · " } else { "" };
                                ui.label(format!("{marker}{}", cluster.count()));
                            });
                            clicked
                        })
                        .inner;
                    if clicked {
                        clicked_id = Some(cluster.id.clone());
                    }
                }
            });

        if let Some(id) = clicked_id {
            self.reveal_and_focus(&id);
        }

        if should_load_more && row_count < cluster_count {
            self.largest_rows_visible = (row_count + Self::LIST_PAGE_ROWS).min(cluster_count);
        }
    }

    fn draw_physics_controls(&mut self, ui: &mut Ui) {
        let sliders = [
            (
                &mut self.physics_intensity,
                0.2..=2.5,
                "Intensity",
                "Overall strength applied to all physics forces.",
            ),
            (
                &mut self.physics_repulsion,
                0.25..=2.6,
                "Repulsion",
                "How strongly nodes push away from each other.",
            ),
            (
                &mut self.physics_spring,
                0.2..=2.2,
                "Link spring",
                "How strongly linked nodes pull toward their rest distance.",
            ),
            (
                &mut self.physics_collision,
                0.2..=2.0,
                "Collision",
                "Extra separation force between overlapping nodes.",
            ),
            (
                &mut self.physics_velocity_damping,
                0.78..=0.97,
                "Velocity damping",
                "How much node speed is kept each frame.",
            ),
        ];
        for (value, range, text, hint) in sliders {
            ui.add(
                egui::Slider::new(value, range)
                    .text(text)
                    .clamping(egui::SliderClamping::Always),
            )
            .on_hover_text(hint);
        }
    }
}
