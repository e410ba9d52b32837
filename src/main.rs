mod app;
mod catalog;
mod cluster;
mod config;
mod error;
mod explore;
mod export;
mod util;
mod worker;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, anyhow};
use clap::Parser;
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::catalog::load_catalog;
use crate::cluster::{GroupBy, build_cluster_index};
use crate::config::{CliOverrides, FileConfig, Settings};
use crate::explore::{ExpandMode, GraphExplorer};
use crate::export::export_graph_to_path;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Release dump: JSON array, `{"releases": [...]}` or one release per line.
    #[arg(long, env = "SOUNDMAP_RELEASES")]
    releases: Option<PathBuf>,

    /// TOML settings file.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum)]
    group_by: Option<GroupBy>,

    #[arg(long)]
    min_cluster_size: Option<usize>,

    #[arg(long)]
    link_threshold: Option<f32>,

    #[arg(long, value_enum)]
    expand_mode: Option<ExpandMode>,

    /// Write the visible graph as JSON instead of opening the viewer (`-` for stdout).
    #[arg(long)]
    export: Option<PathBuf>,

    /// Cluster id to expand before exporting; repeatable.
    #[arg(long, requires = "export")]
    expand: Vec<String>,
}

fn init_tracing() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .with_env_var("SOUNDMAP_LOG")
        .from_env_lossy();

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .try_init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    let file_config = match &args.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let settings = Settings::resolve(
        CliOverrides {
            releases: args.releases,
            group_by: args.group_by,
            min_cluster_size: args.min_cluster_size,
            link_threshold: args.link_threshold,
            expand_mode: args.expand_mode,
        },
        file_config,
    )?;
    info!(
        releases = %settings.releases.display(),
        group_by = settings.cluster.group_by.label(),
        expand_mode = ?settings.expand_mode,
        "resolved settings"
    );

    match &args.export {
        Some(target) => run_export(&settings, &args.expand, target),
        None => run_viewer(settings),
    }
}

fn run_export(settings: &Settings, expand: &[String], target: &Path) -> anyhow::Result<()> {
    let catalog = load_catalog(&settings.releases)
        .with_context(|| format!("failed to load release dump {}", settings.releases.display()))?;
    let index = build_cluster_index(&catalog, &settings.cluster);
    let mut explorer = GraphExplorer::new(Arc::new(catalog), Arc::new(index), settings.expand_mode);

    export_graph_to_path(&mut explorer, expand, target)
}

fn run_viewer(settings: Settings) -> anyhow::Result<()> {
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "SoundMap",
        options,
        Box::new(move |cc| Ok(Box::new(app::SoundMapApp::new(cc, settings)))),
    )
    .map_err(|error| anyhow!("viewer failed: {error}"))
}
