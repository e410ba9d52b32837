use std::collections::HashSet;

use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use super::{GraphExplorer, NodeKind, VisibleGraph, artist_node_id, label_node_id};

#[derive(Clone, Debug, PartialEq)]
pub struct SearchHit {
    pub id: String,
    pub name: String,
    pub kind: NodeKind,
    pub score: i64,
    /// Already part of the visible graph.
    pub visible: bool,
}

pub fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_ascii_lowercase(), &query.to_ascii_lowercase()))
}

/// Searches every cluster, release, artist and label known to the explorer,
/// visible or not. Best matches first.
pub fn search_nodes(explorer: &GraphExplorer, query: &str, limit: usize) -> Vec<SearchHit> {
    let query = query.trim();
    if query.is_empty() || limit == 0 {
        return Vec::new();
    }

    let matcher = SkimMatcherV2::default();
    let graph = explorer.visible_graph();
    let visible = graph
        .nodes
        .iter()
        .map(|node| node.id.as_str())
        .collect::<HashSet<_>>();
    let mut hits = Vec::new();
    let mut push = |id: String, name: &str, kind: NodeKind, score: Option<i64>| {
        if let Some(score) = score {
            hits.push(SearchHit {
                visible: visible.contains(id.as_str()),
                id,
                name: name.to_owned(),
                kind,
                score,
            });
        }
    };

    for cluster in &explorer.index().clusters {
        let score = fuzzy_match_score(&matcher, &cluster.name, query);
        push(cluster.id.clone(), &cluster.name, NodeKind::Cluster, score);
    }

    let catalog = explorer.catalog();
    for release in catalog.releases() {
        let score = fuzzy_match_score(&matcher, &release.title, query)
            .max(fuzzy_match_score(&matcher, &release.display_name(), query));
        push(release.id.clone(), &release.title, NodeKind::Release, score);
    }
    for (name, _) in catalog.artists() {
        let score = fuzzy_match_score(&matcher, name, query);
        push(artist_node_id(name), name, NodeKind::Artist, score);
    }
    for (name, _) in catalog.labels() {
        let score = fuzzy_match_score(&matcher, name, query);
        push(label_node_id(name), name, NodeKind::Label, score);
    }

    hits.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.id.cmp(&b.id))
    });
    hits.truncate(limit);
    hits
}

/// Ids of visible nodes whose name matches `query`, for highlighting.
pub fn matching_node_ids(graph: &VisibleGraph, query: &str) -> HashSet<String> {
    let query = query.trim();
    if query.is_empty() {
        return HashSet::new();
    }

    let matcher = SkimMatcherV2::default();
    graph
        .nodes
        .iter()
        .filter(|node| fuzzy_match_score(&matcher, &node.name, query).is_some())
        .map(|node| node.id.clone())
        .collect()
}
