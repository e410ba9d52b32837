mod model;
mod search;

use std::collections::HashSet;
use std::sync::Arc;

use clap::ValueEnum;
use serde::Deserialize;
use tracing::debug;

use crate::catalog::Catalog;
use crate::cluster::ClusterIndex;

pub use model::{
    GraphFilter, GraphLink, GraphNode, LinkKind, NodeKind, VisibleGraph, artist_node_id,
    label_node_id,
};
pub use search::{SearchHit, fuzzy_match_score, matching_node_ids, search_nodes};

const RELEASE_NODE_SIZE: f32 = 3.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExpandMode {
    /// Keep every cluster visible and add the members of expanded ones.
    #[default]
    Augment,
    /// Show only the expanded cluster and its members.
    Replace,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeTarget {
    Cluster(usize),
    Release(usize),
    Artist(String),
    Label(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClickOutcome {
    Expanded { cluster_id: String, revealed: usize },
    Collapsed { cluster_id: String },
    Selected { node_id: String },
    Ignored,
}

/// Interaction state over one clustering of the catalog: which clusters are
/// expanded, which extra nodes were pinned by search, and the selection.
pub struct GraphExplorer {
    catalog: Arc<Catalog>,
    index: Arc<ClusterIndex>,
    expand_mode: ExpandMode,
    expanded: Vec<usize>,
    pinned: Vec<String>,
    selected: Option<String>,
    filter: GraphFilter,
    revision: u64,
}

impl GraphExplorer {
    pub fn new(catalog: Arc<Catalog>, index: Arc<ClusterIndex>, expand_mode: ExpandMode) -> Self {
        Self {
            catalog,
            index,
            expand_mode,
            expanded: Vec::new(),
            pinned: Vec::new(),
            selected: None,
            filter: GraphFilter::default(),
            revision: 0,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn index(&self) -> &ClusterIndex {
        &self.index
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn filter(&self) -> GraphFilter {
        self.filter
    }

    pub fn expand_mode(&self) -> ExpandMode {
        self.expand_mode
    }

    pub fn is_expanded(&self, cluster: usize) -> bool {
        self.expanded.contains(&cluster)
    }

    pub fn expanded_count(&self) -> usize {
        self.expanded.len()
    }

    /// Expanded clusters in expansion order.
    pub fn expanded_clusters(&self) -> &[usize] {
        &self.expanded
    }

    /// Bumped on every change that can alter `visible_graph` or the selection.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    pub fn resolve(&self, id: &str) -> Option<NodeTarget> {
        if let Some(cluster) = self.index.cluster_index(id) {
            return Some(NodeTarget::Cluster(cluster));
        }
        if let Some(release) = self.catalog.index_of(id) {
            return Some(NodeTarget::Release(release));
        }
        if let Some(name) = id.strip_prefix("artist-")
            && !self.catalog.artist_releases(name).is_empty()
        {
            return Some(NodeTarget::Artist(name.to_owned()));
        }
        if let Some(name) = id.strip_prefix("label-")
            && !self.catalog.label_releases(name).is_empty()
        {
            return Some(NodeTarget::Label(name.to_owned()));
        }
        None
    }

    pub fn handle_click(&mut self, id: &str) -> ClickOutcome {
        match self.resolve(id) {
            None => ClickOutcome::Ignored,
            Some(NodeTarget::Cluster(cluster)) => {
                let cluster_id = self.index.clusters[cluster].id.clone();
                if self.is_expanded(cluster) {
                    self.collapse(cluster);
                    ClickOutcome::Collapsed { cluster_id }
                } else {
                    let revealed = self.expand(cluster);
                    ClickOutcome::Expanded {
                        cluster_id,
                        revealed,
                    }
                }
            }
            Some(_) => {
                self.select(Some(id.to_owned()));
                ClickOutcome::Selected {
                    node_id: id.to_owned(),
                }
            }
        }
    }

    /// Expands a cluster and selects it; returns the number of member releases.
    pub fn expand(&mut self, cluster: usize) -> usize {
        let Some(target) = self.index.clusters.get(cluster) else {
            return 0;
        };
        let cluster_id = target.id.clone();
        let revealed = target.count();

        if self.expand_mode == ExpandMode::Replace {
            self.expanded.clear();
        }
        if !self.expanded.contains(&cluster) {
            self.expanded.push(cluster);
        }
        debug!(cluster = %cluster_id, revealed, mode = ?self.expand_mode, "expanded cluster");

        self.selected = Some(cluster_id);
        self.touch();
        revealed
    }

    pub fn collapse(&mut self, cluster: usize) {
        let before = self.expanded.len();
        self.expanded.retain(|&expanded| expanded != cluster);
        if self.expanded.len() == before {
            return;
        }
        debug!(cluster = %self.index.clusters[cluster].id, "collapsed cluster");

        self.touch();
        self.drop_hidden_selection();
    }

    pub fn select(&mut self, selected: Option<String>) {
        if self.selected == selected {
            return;
        }
        self.selected = selected;
        self.touch();
    }

    /// Back to the plain cluster view.
    pub fn reset(&mut self) {
        self.expanded.clear();
        self.pinned.clear();
        self.selected = None;
        self.touch();
        debug!("reset explorer to cluster view");
    }

    /// Makes `id` visible (expanding its cluster or pinning it) and selects it.
    /// Returns false when the node is unknown or its kind is filtered out; a
    /// filtered node stays pinned but is not selected.
    pub fn reveal(&mut self, id: &str) -> bool {
        let Some(target) = self.resolve(id) else {
            return false;
        };

        if let NodeTarget::Release(release) = target
            && let Some(cluster) = self.index.cluster_of_release(release)
            && !self.is_expanded(cluster)
        {
            self.expand(cluster);
        }

        if !self.visible_graph().contains(id) && !self.pinned.iter().any(|pinned| pinned == id) {
            self.pinned.push(id.to_owned());
        }

        let visible = self.visible_graph().contains(id);
        if visible {
            self.selected = Some(id.to_owned());
        }
        self.touch();
        self.drop_hidden_selection();
        visible
    }

    pub fn set_filter(&mut self, filter: GraphFilter) {
        if self.filter == filter {
            return;
        }
        self.filter = filter;
        self.touch();
    }

    pub fn set_expand_mode(&mut self, mode: ExpandMode) {
        if self.expand_mode == mode {
            return;
        }
        self.expand_mode = mode;
        if mode == ExpandMode::Replace && self.expanded.len() > 1 {
            let last = self.expanded.split_off(self.expanded.len() - 1);
            self.expanded = last;
        }
        self.touch();
        self.drop_hidden_selection();
    }

    /// Swaps in a new clustering; expansions are dropped, pins and the
    /// selection survive when their nodes still exist.
    pub fn replace_index(&mut self, index: Arc<ClusterIndex>) {
        self.index = index;
        self.expanded.clear();
        let pinned = std::mem::take(&mut self.pinned);
        self.pinned = pinned
            .into_iter()
            .filter(|id| self.resolve(id).is_some())
            .collect();
        self.touch();
        self.drop_hidden_selection();
    }

    fn drop_hidden_selection(&mut self) {
        let hidden = self
            .selected
            .as_deref()
            .is_some_and(|selected| !self.visible_graph().contains(selected));
        if hidden {
            self.selected = None;
        }
    }

    fn cluster_node(&self, cluster: usize) -> GraphNode {
        let cluster = &self.index.clusters[cluster];
        GraphNode {
            id: cluster.id.clone(),
            name: cluster.name.clone(),
            kind: NodeKind::Cluster,
            size: cluster.size,
            style: cluster.dominant_style.clone(),
            parent: None,
            count: cluster.count(),
        }
    }

    fn release_node(&self, release: usize, parent: Option<&str>) -> GraphNode {
        let release = &self.catalog.releases()[release];
        GraphNode {
            id: release.id.clone(),
            name: release.title.clone(),
            kind: NodeKind::Release,
            size: RELEASE_NODE_SIZE,
            style: release.styles.first().cloned(),
            parent: parent.map(str::to_owned),
            count: 1,
        }
    }

    fn neighbor_size(&self, count: usize) -> f32 {
        ((count as f32).sqrt() * self.index.config.size_scale * 0.5).max(RELEASE_NODE_SIZE)
    }

    fn artist_node(&self, name: &str, parent: Option<&str>) -> GraphNode {
        let count = self.catalog.artist_releases(name).len();
        GraphNode {
            id: artist_node_id(name),
            name: name.to_owned(),
            kind: NodeKind::Artist,
            size: self.neighbor_size(count),
            style: None,
            parent: parent.map(str::to_owned),
            count,
        }
    }

    fn label_node(&self, name: &str, parent: Option<&str>) -> GraphNode {
        let count = self.catalog.label_releases(name).len();
        GraphNode {
            id: label_node_id(name),
            name: name.to_owned(),
            kind: NodeKind::Label,
            size: self.neighbor_size(count),
            style: None,
            parent: parent.map(str::to_owned),
            count,
        }
    }

    fn push_release_neighbors(&self, builder: &mut GraphBuilder, release: usize, with_nodes: bool) {
        let release = &self.catalog.releases()[release];
        for artist in &release.artist_names {
            if with_nodes {
                builder.push_node(self.artist_node(artist, Some(&release.id)));
            }
            builder.push_link(&release.id, &artist_node_id(artist), LinkKind::Artist, 1.0);
        }
        if let Some(label) = &release.label_name {
            if with_nodes {
                builder.push_node(self.label_node(label, Some(&release.id)));
            }
            builder.push_link(&release.id, &label_node_id(label), LinkKind::Label, 1.0);
        }
    }

    /// The node/link pair to hand to the layout. Links never reference nodes
    /// outside the returned node set.
    pub fn visible_graph(&self) -> VisibleGraph {
        let mut builder = GraphBuilder::new(self.filter);
        let clusters = &self.index.clusters;

        let shown_clusters = if self.expand_mode == ExpandMode::Replace && !self.expanded.is_empty()
        {
            self.expanded.clone()
        } else {
            (0..clusters.len()).collect()
        };
        for &cluster in &shown_clusters {
            builder.push_node(self.cluster_node(cluster));
        }
        for link in &self.index.cluster_links {
            builder.push_link(
                &clusters[link.source].id,
                &clusters[link.target].id,
                LinkKind::Similarity,
                link.similarity,
            );
        }

        let releases = self.catalog.releases();
        for &cluster in &self.expanded {
            let parent = clusters[cluster].id.as_str();
            for &member in &clusters[cluster].members {
                builder.push_node(self.release_node(member, Some(parent)));
                builder.push_link(parent, &releases[member].id, LinkKind::Member, 1.0);
                self.push_release_neighbors(&mut builder, member, true);
            }
            for link in &self.index.member_links[cluster] {
                builder.push_link(
                    &releases[link.source].id,
                    &releases[link.target].id,
                    LinkKind::Similarity,
                    link.similarity,
                );
            }
        }

        for id in &self.pinned {
            match self.resolve(id) {
                Some(NodeTarget::Cluster(cluster)) => builder.push_node(self.cluster_node(cluster)),
                Some(NodeTarget::Release(release)) => {
                    builder.push_node(self.release_node(release, None));
                    if let Some(cluster) = self.index.cluster_of_release(release) {
                        builder.push_link(
                            &clusters[cluster].id,
                            &releases[release].id,
                            LinkKind::Member,
                            1.0,
                        );
                    }
                    self.push_release_neighbors(&mut builder, release, false);
                }
                Some(NodeTarget::Artist(name)) => {
                    builder.push_node(self.artist_node(&name, None));
                    let target = artist_node_id(&name);
                    for &release in self.catalog.artist_releases(&name) {
                        builder.push_link(&releases[release].id, &target, LinkKind::Artist, 1.0);
                    }
                }
                Some(NodeTarget::Label(name)) => {
                    builder.push_node(self.label_node(&name, None));
                    let target = label_node_id(&name);
                    for &release in self.catalog.label_releases(&name) {
                        builder.push_link(&releases[release].id, &target, LinkKind::Label, 1.0);
                    }
                }
                None => {}
            }
        }

        builder.finish()
    }
}

struct GraphBuilder {
    filter: GraphFilter,
    nodes: Vec<GraphNode>,
    ids: HashSet<String>,
    links: Vec<GraphLink>,
}

impl GraphBuilder {
    fn new(filter: GraphFilter) -> Self {
        Self {
            filter,
            nodes: Vec::new(),
            ids: HashSet::new(),
            links: Vec::new(),
        }
    }

    fn push_node(&mut self, node: GraphNode) {
        if self.filter.shows_node(node.kind) && self.ids.insert(node.id.clone()) {
            self.nodes.push(node);
        }
    }

    fn push_link(&mut self, source: &str, target: &str, kind: LinkKind, value: f32) {
        if source == target || !self.filter.shows_link(kind) {
            return;
        }
        self.links.push(GraphLink {
            source: source.to_owned(),
            target: target.to_owned(),
            kind,
            value,
        });
    }

    fn finish(self) -> VisibleGraph {
        let ids = self.ids;
        let mut seen = HashSet::new();
        let links = self
            .links
            .into_iter()
            .filter(|link| ids.contains(&link.source) && ids.contains(&link.target))
            .filter(|link| {
                let (low, high) = if link.source <= link.target {
                    (link.source.clone(), link.target.clone())
                } else {
                    (link.target.clone(), link.source.clone())
                };
                seen.insert((low, high, link.kind))
            })
            .collect();

        VisibleGraph {
            nodes: self.nodes,
            links,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{ClusterConfig, build_cluster_index, sample_catalog};

    fn explorer(mode: ExpandMode) -> GraphExplorer {
        let catalog = sample_catalog();
        let index = build_cluster_index(&catalog, &ClusterConfig::default());
        GraphExplorer::new(Arc::new(catalog), Arc::new(index), mode)
    }

    fn ids(graph: &VisibleGraph) -> Vec<&str> {
        graph.nodes.iter().map(|node| node.id.as_str()).collect()
    }

    #[test]
    fn starts_in_cluster_view() {
        let explorer = explorer(ExpandMode::Augment);
        let graph = explorer.visible_graph();

        assert_eq!(ids(&graph), vec!["cluster-Techno", "cluster-Minimal"]);
        assert_eq!(graph.links.len(), 1);
        assert_eq!(graph.links[0].kind, LinkKind::Similarity);
        assert!(graph.is_consistent());
    }

    #[test]
    fn clicking_cluster_reveals_members_and_neighbors() {
        let mut explorer = explorer(ExpandMode::Augment);
        let outcome = explorer.handle_click("cluster-Techno");

        assert_eq!(
            outcome,
            ClickOutcome::Expanded {
                cluster_id: "cluster-Techno".to_owned(),
                revealed: 4
            }
        );
        let graph = explorer.visible_graph();
        for id in ["t1", "t2", "t3", "t4", "artist-Gui Boratto", "label-Kompakt", "cluster-Minimal"] {
            assert!(graph.contains(id), "missing {id}");
        }
        assert!(!graph.contains("m1"));
        assert!(graph.links.iter().any(|link| link.kind == LinkKind::Member
            && link.source == "cluster-Techno"
            && link.target == "t1"));
        assert_eq!(explorer.selected(), Some("cluster-Techno"));
        assert_eq!(
            graph.node("t1").and_then(|node| node.parent.as_deref()),
            Some("cluster-Techno")
        );
        assert!(graph.is_consistent());
    }

    #[test]
    fn second_click_collapses_cluster() {
        let mut explorer = explorer(ExpandMode::Augment);
        explorer.handle_click("cluster-Techno");
        explorer.handle_click("t1");
        assert_eq!(explorer.selected(), Some("t1"));

        let outcome = explorer.handle_click("cluster-Techno");
        assert!(matches!(outcome, ClickOutcome::Collapsed { .. }));
        assert_eq!(explorer.visible_graph().nodes.len(), 2);
        assert_eq!(explorer.selected(), None);
    }

    #[test]
    fn leaf_click_selects_without_changing_graph() {
        let mut explorer = explorer(ExpandMode::Augment);
        explorer.handle_click("cluster-Minimal");
        let before = explorer.visible_graph();

        let outcome = explorer.handle_click("artist-Zip");
        assert_eq!(
            outcome,
            ClickOutcome::Selected {
                node_id: "artist-Zip".to_owned()
            }
        );
        assert_eq!(explorer.visible_graph(), before);
        assert_eq!(explorer.handle_click("nope"), ClickOutcome::Ignored);
    }

    #[test]
    fn replace_mode_hides_other_clusters() {
        let mut explorer = explorer(ExpandMode::Replace);
        explorer.handle_click("cluster-Minimal");
        let graph = explorer.visible_graph();

        assert!(graph.contains("cluster-Minimal"));
        assert!(!graph.contains("cluster-Techno"));
        assert!(graph.contains("m2"));
        assert!(graph.is_consistent());

        explorer.reveal("t4");
        let graph = explorer.visible_graph();
        assert!(graph.contains("t4"));
        assert!(!graph.contains("m2"));
        assert_eq!(explorer.expanded_count(), 1);
    }

    #[test]
    fn reset_returns_to_cluster_view() {
        let mut explorer = explorer(ExpandMode::Augment);
        explorer.handle_click("cluster-Techno");
        explorer.reveal("artist-Burial");
        explorer.reset();

        assert_eq!(explorer.visible_graph().nodes.len(), 2);
        assert_eq!(explorer.selected(), None);
    }

    #[test]
    fn reveal_pins_unclustered_nodes() {
        let mut explorer = explorer(ExpandMode::Augment);
        assert!(explorer.reveal("a1"));
        let graph = explorer.visible_graph();

        assert!(graph.contains("a1"));
        assert_eq!(explorer.selected(), Some("a1"));
        assert!(graph.is_consistent());

        assert!(explorer.reveal("m2"));
        assert!(explorer.is_expanded(1));
        assert!(!explorer.reveal("missing"));
    }

    #[test]
    fn reveal_does_not_select_filtered_kinds() {
        let mut explorer = explorer(ExpandMode::Augment);
        explorer.handle_click("cluster-Minimal");
        explorer.set_filter(GraphFilter {
            labels: false,
            ..GraphFilter::default()
        });

        assert!(!explorer.reveal("label-Warp"));
        assert_eq!(explorer.selected(), Some("cluster-Minimal"));
        assert!(!explorer.visible_graph().contains("label-Warp"));

        explorer.set_filter(GraphFilter::default());
        assert!(explorer.visible_graph().contains("label-Warp"));
        assert!(explorer.visible_graph().is_consistent());
    }

    #[test]
    fn node_filters_also_drop_links() {
        let mut explorer = explorer(ExpandMode::Augment);
        explorer.handle_click("cluster-Techno");
        explorer.set_filter(GraphFilter {
            artists: false,
            clusters: false,
            ..GraphFilter::default()
        });

        let graph = explorer.visible_graph();
        assert!(graph.nodes.iter().all(|node| node.kind != NodeKind::Artist));
        assert!(graph.nodes.iter().all(|node| node.kind != NodeKind::Cluster));
        assert!(graph.links.iter().all(|link| link.kind != LinkKind::Artist));
        assert!(graph.links.iter().all(|link| link.kind != LinkKind::Member));
        assert!(graph.is_consistent());
    }

    #[test]
    fn link_filters_hide_link_kinds() {
        let mut explorer = explorer(ExpandMode::Augment);
        explorer.handle_click("cluster-Techno");
        explorer.set_filter(GraphFilter {
            similarity_links: false,
            ..GraphFilter::default()
        });
        let graph = explorer.visible_graph();
        assert!(graph.links.iter().all(|link| link.kind != LinkKind::Similarity));
        assert!(graph.contains("cluster-Minimal"));
    }

    #[test]
    fn every_interaction_sequence_stays_consistent() {
        let mut explorer = explorer(ExpandMode::Augment);
        let script = [
            "cluster-Techno",
            "cluster-Minimal",
            "label-Perlon",
            "cluster-Techno",
            "t2",
            "artist-Jeff Mills",
            "cluster-Minimal",
        ];
        for id in script {
            explorer.handle_click(id);
            assert!(explorer.visible_graph().is_consistent(), "after {id}");
            explorer.reveal("h1");
            assert!(explorer.visible_graph().is_consistent(), "after reveal {id}");
        }

        explorer.set_expand_mode(ExpandMode::Replace);
        assert!(explorer.visible_graph().is_consistent());
    }

    #[test]
    fn replace_index_drops_expansions() {
        let mut explorer = explorer(ExpandMode::Augment);
        explorer.handle_click("cluster-Techno");
        explorer.handle_click("t3");

        let catalog = sample_catalog();
        let relabeled = build_cluster_index(
            &catalog,
            &ClusterConfig {
                group_by: crate::cluster::GroupBy::Label,
                min_cluster_size: 2,
                ..ClusterConfig::default()
            },
        );
        let revision = explorer.revision();
        explorer.replace_index(Arc::new(relabeled));

        assert!(explorer.revision() > revision);
        assert_eq!(explorer.expanded_count(), 0);
        assert_eq!(explorer.selected(), None);
        assert!(explorer.visible_graph().contains("cluster-Kompakt"));
    }

    #[test]
    fn replace_index_keeps_pins_and_visible_selection() {
        let mut explorer = explorer(ExpandMode::Augment);
        explorer.handle_click("cluster-Techno");
        assert!(explorer.reveal("label-Warp"));
        assert!(explorer.reveal("artist-Burial"));

        let catalog = sample_catalog();
        let relabeled = build_cluster_index(
            &catalog,
            &ClusterConfig {
                group_by: crate::cluster::GroupBy::Label,
                min_cluster_size: 2,
                ..ClusterConfig::default()
            },
        );
        explorer.replace_index(Arc::new(relabeled));

        let graph = explorer.visible_graph();
        assert_eq!(explorer.expanded_count(), 0);
        assert!(graph.contains("label-Warp"));
        assert!(graph.contains("artist-Burial"));
        assert!(!graph.contains("t1"));
        assert_eq!(explorer.selected(), Some("artist-Burial"));
        assert!(graph.is_consistent());
    }
}
