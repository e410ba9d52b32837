use std::path::Path;
use std::sync::Arc;

use eframe::egui::{self, Align, Context, Layout, Vec2};
use tracing::{info, warn};

use crate::cluster::{ClusterConfig, build_cluster_index};
use crate::config::{Settings, validate_cluster_config};
use crate::explore::{GraphExplorer, VisibleGraph};
use crate::worker::ClusterWorker;

use super::super::{LoadedCatalog, ViewModel};

impl ViewModel {
    pub(in crate::app) const INITIAL_LIST_ROWS: usize = 24;
    pub(in crate::app) const LIST_PAGE_ROWS: usize = 24;
    pub(in crate::app) const LIST_PREFETCH_MARGIN: usize = 4;
    pub(in crate::app) const SEARCH_HIT_LIMIT: usize = 40;

    pub(in crate::app) fn new(loaded: LoadedCatalog, settings: &Settings) -> Self {
        let worker = match ClusterWorker::spawn(Arc::clone(&loaded.catalog)) {
            Ok(worker) => Some(worker),
            Err(error) => {
                warn!(%error, "re-clustering will run on the UI thread");
                None
            }
        };
        let cluster_config = loaded.index.config;

        Self {
            explorer: GraphExplorer::new(loaded.catalog, loaded.index, settings.expand_mode),
            worker,
            cluster_config,
            clustering_error: None,
            search: String::new(),
            search_hits: None,
            pending_focus: None,
            pan: Vec2::ZERO,
            zoom: 1.0,
            camera_target: None,
            live_physics: settings.live_physics,
            physics_intensity: 1.0,
            physics_repulsion: 1.0,
            physics_spring: 1.0,
            physics_collision: 1.0,
            physics_velocity_damping: 0.88,
            explorer_revision: None,
            render_graph_revision: 0,
            visible_graph: VisibleGraph::default(),
            graph_cache: None,
            search_match_cache: None,
            largest_rows_visible: Self::INITIAL_LIST_ROWS,
            member_rows_visible: Self::INITIAL_LIST_ROWS,
            visible_node_count: 0,
            visible_edge_count: 0,
        }
    }

    pub(in crate::app) fn show(
        &mut self,
        ctx: &Context,
        releases_path: &Path,
        reload_requested: &mut bool,
        is_loading: bool,
    ) {
        self.poll_worker(ctx);

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("SoundMap");
                    ui.separator();
                    let catalog = self.explorer.catalog();
                    let index = self.explorer.index();
                    ui.label(format!("dump: {}", releases_path.display()));
                    ui.label(format!("releases: {}", catalog.len()));
                    ui.label(format!("artists: {}", catalog.artist_count()));
                    ui.label(format!("labels: {}", catalog.label_count()));
                    ui.label(format!(
                        "clusters: {} ({} unclustered)",
                        index.clusters.len(),
                        index.unclustered
                    ));
                    let reload_button =
                        ui.add_enabled(!is_loading, egui::Button::new("Reload dump"));
                    if reload_button.clicked() {
                        *reload_requested = true;
                    }
                    if ui.button("Reset view").clicked() {
                        self.explorer.reset();
                        self.reset_camera();
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        ui.label(format!(
                            "visible: {} nodes / {} links",
                            self.visible_node_count, self.visible_edge_count
                        ));
                        if self.worker.as_ref().is_some_and(ClusterWorker::is_pending) {
                            ui.spinner();
                            ui.label("re-clustering");
                        }
                    });
                });
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(340.0)
            .show(ctx, |ui| self.draw_controls(ui));

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(360.0)
            .show(ctx, |ui| self.draw_details(ui));

        egui::CentralPanel::default().show(ctx, |ui| {
            if is_loading {
                ui.vertical_centered(|ui| {
                    ui.add_space(120.0);
                    ui.heading("Reloading release catalog...");
                    ui.add_space(8.0);
                    ui.spinner();
                });
            } else {
                self.draw_graph(ui);
            }
        });
    }

    /// Makes a node visible through the explorer and moves the camera to it.
    pub(in crate::app) fn reveal_and_focus(&mut self, id: &str) {
        if self.explorer.reveal(id) {
            self.pending_focus = Some(id.to_owned());
        }
    }

    pub(in crate::app) fn request_recluster(&mut self, config: ClusterConfig) {
        if let Err(error) = validate_cluster_config(&config) {
            self.clustering_error = Some(error.to_string());
            return;
        }
        self.clustering_error = None;

        match self.worker.as_mut() {
            Some(worker) => {
                worker.submit(config);
            }
            None => {
                let index = build_cluster_index(self.explorer.catalog(), &config);
                self.explorer.replace_index(Arc::new(index));
            }
        }
    }

    fn poll_worker(&mut self, ctx: &Context) {
        let Some(worker) = self.worker.as_mut() else {
            return;
        };

        match worker.try_recv() {
            Ok(Some(result)) => {
                info!(
                    generation = result.generation,
                    clusters = result.index.clusters.len(),
                    elapsed_ms = result.elapsed.as_millis() as u64,
                    "applied new clustering"
                );
                self.explorer.replace_index(result.index);
                self.largest_rows_visible = Self::INITIAL_LIST_ROWS;
            }
            Ok(None) => {
                if worker.is_pending() {
                    ctx.request_repaint();
                }
            }
            Err(error) => {
                warn!(%error, "falling back to clustering on the UI thread");
                self.clustering_error = Some(error.to_string());
                self.worker = None;
            }
        }
    }
}
