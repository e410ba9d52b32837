use std::collections::HashSet;

use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Cluster,
    Release,
    Artist,
    Label,
}

impl NodeKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Cluster => "cluster",
            Self::Release => "release",
            Self::Artist => "artist",
            Self::Label => "label",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    Similarity,
    Member,
    Artist,
    Label,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GraphNode {
    pub id: String,
    pub name: String,
    pub kind: NodeKind,
    pub size: f32,
    /// Style used for colouring; clusters use their dominant style.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    /// Node whose expansion or selection revealed this one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Releases represented by the node.
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GraphLink {
    pub source: String,
    pub target: String,
    pub kind: LinkKind,
    pub value: f32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct VisibleGraph {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
}

impl VisibleGraph {
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    /// Unique node ids and every link endpoint present in `nodes`.
    pub fn is_consistent(&self) -> bool {
        let mut ids = HashSet::with_capacity(self.nodes.len());
        if !self.nodes.iter().all(|node| ids.insert(node.id.as_str())) {
            return false;
        }
        self.links
            .iter()
            .all(|link| ids.contains(link.source.as_str()) && ids.contains(link.target.as_str()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GraphFilter {
    pub clusters: bool,
    pub releases: bool,
    pub artists: bool,
    pub labels: bool,
    pub similarity_links: bool,
    pub member_links: bool,
    pub artist_links: bool,
    pub label_links: bool,
}

impl Default for GraphFilter {
    fn default() -> Self {
        Self {
            clusters: true,
            releases: true,
            artists: true,
            labels: true,
            similarity_links: true,
            member_links: true,
            artist_links: true,
            label_links: true,
        }
    }
}

impl GraphFilter {
    pub fn shows_node(&self, kind: NodeKind) -> bool {
        match kind {
            NodeKind::Cluster => self.clusters,
            NodeKind::Release => self.releases,
            NodeKind::Artist => self.artists,
            NodeKind::Label => self.labels,
        }
    }

    pub fn shows_link(&self, kind: LinkKind) -> bool {
        match kind {
            LinkKind::Similarity => self.similarity_links,
            LinkKind::Member => self.member_links,
            LinkKind::Artist => self.artist_links,
            LinkKind::Label => self.label_links,
        }
    }
}

pub fn artist_node_id(name: &str) -> String {
    format!("artist-{name}")
}

pub fn label_node_id(name: &str) -> String {
    format!("label-{name}")
}
