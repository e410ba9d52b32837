use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use eframe::egui::{self, Context, Pos2, Vec2};
use tracing::{error, info};

use crate::catalog::{Catalog, load_catalog};
use crate::cluster::{ClusterConfig, ClusterIndex, build_cluster_index};
use crate::config::Settings;
use crate::explore::{GraphExplorer, LinkKind, NodeKind, SearchHit, VisibleGraph};
use crate::worker::ClusterWorker;

mod graph;
mod physics;
mod render_utils;
mod ui;

pub struct SoundMapApp {
    settings: Settings,
    state: AppState,
    reload_rx: Option<Receiver<Result<LoadedCatalog, String>>>,
}

struct LoadedCatalog {
    catalog: Arc<Catalog>,
    index: Arc<ClusterIndex>,
}

enum AppState {
    Loading {
        rx: Receiver<Result<LoadedCatalog, String>>,
    },
    Ready(Box<ViewModel>),
    Error(String),
}

struct ViewModel {
    explorer: GraphExplorer,
    worker: Option<ClusterWorker>,
    cluster_config: ClusterConfig,
    clustering_error: Option<String>,
    search: String,
    search_hits: Option<SearchHitsCache>,
    pending_focus: Option<String>,
    pan: Vec2,
    zoom: f32,
    camera_target: Option<Vec2>,
    live_physics: bool,
    physics_intensity: f32,
    physics_repulsion: f32,
    physics_spring: f32,
    physics_collision: f32,
    physics_velocity_damping: f32,
    explorer_revision: Option<u64>,
    render_graph_revision: u64,
    visible_graph: VisibleGraph,
    graph_cache: Option<RenderGraph>,
    search_match_cache: Option<SearchMatchCache>,
    largest_rows_visible: usize,
    member_rows_visible: usize,
    visible_node_count: usize,
    visible_edge_count: usize,
}

struct SearchHitsCache {
    query: String,
    explorer_revision: u64,
    hits: Vec<SearchHit>,
}

struct SearchMatchCache {
    query: String,
    graph_revision: u64,
    matches: Arc<HashSet<usize>>,
}

struct RenderGraph {
    nodes: Vec<RenderNode>,
    edges: Vec<RenderEdge>,
    index_by_id: HashMap<String, usize>,
    neighbors: Vec<Vec<usize>>,
    view_scratch: ViewScratch,
}

struct ViewScratch {
    screen_positions: Vec<Pos2>,
    screen_radii: Vec<f32>,
    visible_indices: Vec<usize>,
    visible_mask: Vec<bool>,
}

struct RenderNode {
    id: String,
    name: String,
    kind: NodeKind,
    style: Option<String>,
    count: usize,
    world_pos: Vec2,
    velocity: Vec2,
    base_radius: f32,
}

#[derive(Clone, Copy)]
struct RenderEdge {
    source: usize,
    target: usize,
    kind: LinkKind,
    value: f32,
}

#[derive(Clone, Copy)]
struct PhysicsConfig {
    intensity: f32,
    repulsion_scale: f32,
    spring_scale: f32,
    collision_scale: f32,
    velocity_damping: f32,
}

impl SoundMapApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, settings: Settings) -> Self {
        let state = Self::start_load(&settings);
        Self {
            settings,
            state,
            reload_rx: None,
        }
    }

    fn spawn_load(releases: PathBuf, config: ClusterConfig) -> Receiver<Result<LoadedCatalog, String>> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = load_catalog(&releases)
                .map(|catalog| {
                    let index = build_cluster_index(&catalog, &config);
                    LoadedCatalog {
                        catalog: Arc::new(catalog),
                        index: Arc::new(index),
                    }
                })
                .map_err(|error| {
                    error!(path = %releases.display(), %error, "failed to load release dump");
                    error.to_string()
                });
            let _ = tx.send(result);
        });

        rx
    }

    fn start_load(settings: &Settings) -> AppState {
        AppState::Loading {
            rx: Self::spawn_load(settings.releases.clone(), settings.cluster),
        }
    }

    fn ready_state(&self, loaded: LoadedCatalog) -> AppState {
        info!(
            releases = loaded.catalog.len(),
            clusters = loaded.index.clusters.len(),
            "catalog ready"
        );
        AppState::Ready(Box::new(ViewModel::new(loaded, &self.settings)))
    }
}

impl eframe::App for SoundMapApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.state {
            AppState::Loading { rx } => {
                match rx.try_recv() {
                    Ok(Ok(loaded)) => transition = Some(Ok(loaded)),
                    Ok(Err(error)) => transition = Some(Err(error)),
                    Err(TryRecvError::Empty) => ctx.request_repaint(),
                    Err(TryRecvError::Disconnected) => {
                        transition = Some(Err("Background load worker disconnected".to_owned()));
                    }
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading release catalog...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
            }
            AppState::Error(error) => {
                let mut retry = false;
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load release catalog");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    retry = ui.button("Retry").clicked();
                });
                if retry {
                    self.state = Self::start_load(&self.settings);
                    return;
                }
            }
            AppState::Ready(model) => {
                let mut reload_requested = false;
                let is_reloading = self.reload_rx.is_some();
                model.show(ctx, &self.settings.releases, &mut reload_requested, is_reloading);

                if reload_requested && self.reload_rx.is_none() {
                    self.reload_rx = Some(Self::spawn_load(
                        self.settings.releases.clone(),
                        model.cluster_config,
                    ));
                }

                if let Some(rx) = self.reload_rx.take() {
                    match rx.try_recv() {
                        Ok(result) => transition = Some(result),
                        Err(TryRecvError::Empty) => {
                            self.reload_rx = Some(rx);
                            ctx.request_repaint();
                        }
                        Err(TryRecvError::Disconnected) => {
                            transition =
                                Some(Err("Background load worker disconnected".to_owned()));
                        }
                    }
                }
            }
        }

        if let Some(result) = transition {
            self.reload_rx = None;
            self.state = match result {
                Ok(loaded) => self.ready_state(loaded),
                Err(error) => AppState::Error(error),
            };
        }
    }
}
