use std::fs;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, anyhow};
use serde::Serialize;
use tracing::info;

use crate::explore::{GraphExplorer, GraphLink, GraphNode};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportSummary<'a> {
    releases: usize,
    artists: usize,
    labels: usize,
    group_by: &'static str,
    clusters: usize,
    cluster_links: usize,
    unclustered: usize,
    expanded: &'a [String],
    visible_nodes: usize,
    visible_links: usize,
}

#[derive(Debug, Serialize)]
struct ExportDocument<'a> {
    summary: ExportSummary<'a>,
    nodes: &'a [GraphNode],
    links: &'a [GraphLink],
}

/// Expands `expand_ids` in order and writes the resulting visible graph.
pub fn export_graph(
    explorer: &mut GraphExplorer,
    expand_ids: &[String],
    writer: impl Write,
) -> anyhow::Result<()> {
    let expanded = expand_clusters(explorer, expand_ids)?;
    write_graph(explorer, &expanded, writer)
}

/// Like [`export_graph`] but targets a file, or stdout for `-`. The file is
/// only replaced once the whole document has been rendered.
pub fn export_graph_to_path(
    explorer: &mut GraphExplorer,
    expand_ids: &[String],
    target: &Path,
) -> anyhow::Result<()> {
    if target == Path::new("-") {
        return export_graph(explorer, expand_ids, io::stdout().lock());
    }

    let mut rendered = Vec::new();
    export_graph(explorer, expand_ids, &mut rendered)?;
    fs::write(target, rendered)
        .with_context(|| format!("failed to write export file {}", target.display()))?;
    info!(path = %target.display(), "wrote graph export");
    Ok(())
}

/// Resolves every id before expanding any of them. Returns the ids that are
/// still expanded afterwards; in replace mode that is only the last one.
fn expand_clusters(
    explorer: &mut GraphExplorer,
    expand_ids: &[String],
) -> anyhow::Result<Vec<String>> {
    let clusters = expand_ids
        .iter()
        .map(|id| {
            explorer
                .index()
                .cluster_index(id)
                .ok_or_else(|| anyhow!("unknown cluster id `{id}`"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    for &cluster in &clusters {
        if !explorer.is_expanded(cluster) {
            explorer.expand(cluster);
        }
    }

    let index = explorer.index();
    Ok(explorer
        .expanded_clusters()
        .iter()
        .map(|&cluster| index.clusters[cluster].id.clone())
        .collect())
}

fn write_graph(
    explorer: &GraphExplorer,
    expanded: &[String],
    mut writer: impl Write,
) -> anyhow::Result<()> {
    let graph = explorer.visible_graph();
    let catalog = explorer.catalog();
    let index = explorer.index();
    let document = ExportDocument {
        summary: ExportSummary {
            releases: catalog.len(),
            artists: catalog.artist_count(),
            labels: catalog.label_count(),
            group_by: index.config.group_by.label(),
            clusters: index.clusters.len(),
            cluster_links: index.cluster_links.len(),
            unclustered: index.unclustered,
            expanded,
            visible_nodes: graph.nodes.len(),
            visible_links: graph.links.len(),
        },
        nodes: &graph.nodes,
        links: &graph.links,
    };

    serde_json::to_writer_pretty(&mut writer, &document).context("failed to serialize graph")?;
    writeln!(writer).context("failed to write graph export")?;

    info!(
        nodes = graph.nodes.len(),
        links = graph.links.len(),
        "exported visible graph"
    );
    Ok(())
}
