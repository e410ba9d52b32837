use std::collections::HashMap;

use eframe::egui::{Vec2, vec2};

use crate::explore::GraphNode;
use crate::util::stable_pair;

use super::super::render_utils::node_radius;
use super::super::{RenderEdge, RenderGraph, RenderNode, ViewModel, ViewScratch};

const SPAWN_SPREAD: f32 = 260.0;

fn jitter_direction(id: &str, index: usize) -> Vec2 {
    let (jx, jy) = stable_pair(id);
    let direction = vec2(jx, jy);
    if direction.length_sq() > 0.0001 {
        return direction.normalized();
    }
    let angle = ((index as f32) * 0.618_034 + 0.11) * std::f32::consts::TAU;
    vec2(angle.cos(), angle.sin())
}

impl ViewModel {
    fn make_render_node(node: &GraphNode, index: usize, anchor: Option<(Vec2, f32)>) -> RenderNode {
        let base_radius = node_radius(node.kind, node.size);
        let direction = jitter_direction(&node.id, index);

        // new nodes start beside whatever revealed them, or scattered around the origin
        let world_pos = match anchor {
            Some((position, radius)) => position + direction * (radius + base_radius + 24.0),
            None => {
                let (jx, jy) = stable_pair(&node.id);
                vec2(jx, jy) * SPAWN_SPREAD
            }
        };

        RenderNode {
            id: node.id.clone(),
            name: node.name.clone(),
            kind: node.kind,
            style: node.style.clone(),
            count: node.count,
            world_pos,
            velocity: direction * (1.2 + base_radius * 0.02),
            base_radius,
        }
    }

    /// Syncs the render graph with the explorer, keeping positions of nodes
    /// that stay visible.
    pub(in crate::app) fn rebuild_render_graph(&mut self) {
        self.render_graph_revision = self.render_graph_revision.wrapping_add(1);
        self.explorer_revision = Some(self.explorer.revision());
        self.search_match_cache = None;
        self.visible_graph = self.explorer.visible_graph();

        let mut prior_nodes = self
            .graph_cache
            .take()
            .map(|cache| {
                cache
                    .nodes
                    .into_iter()
                    .map(|node| (node.id.clone(), node))
                    .collect::<HashMap<_, _>>()
            })
            .unwrap_or_default();
        let prior_anchor = |prior: &HashMap<String, RenderNode>, id: &str| {
            prior.get(id).map(|node| (node.world_pos, node.base_radius))
        };

        let mut nodes: Vec<RenderNode> = Vec::with_capacity(self.visible_graph.nodes.len());
        let mut index_by_id: HashMap<String, usize> =
            HashMap::with_capacity(self.visible_graph.nodes.len());
        for (index, graph_node) in self.visible_graph.nodes.iter().enumerate() {
            let node = match prior_nodes.remove(&graph_node.id) {
                Some(mut node) => {
                    node.name = graph_node.name.clone();
                    node.style = graph_node.style.clone();
                    node.count = graph_node.count;
                    node.base_radius = node_radius(graph_node.kind, graph_node.size);
                    node
                }
                None => {
                    let anchor = graph_node.parent.as_deref().and_then(|parent| {
                        index_by_id
                            .get(parent)
                            .map(|&placed| {
                                (nodes[placed].world_pos, nodes[placed].base_radius)
                            })
                            .or_else(|| prior_anchor(&prior_nodes, parent))
                    });
                    Self::make_render_node(graph_node, index, anchor)
                }
            };
            index_by_id.insert(graph_node.id.clone(), index);
            nodes.push(node);
        }

        let mut neighbors = vec![Vec::new(); nodes.len()];
        let edges = self
            .visible_graph
            .links
            .iter()
            .filter_map(|link| {
                let source = *index_by_id.get(&link.source)?;
                let target = *index_by_id.get(&link.target)?;
                neighbors[source].push(target);
                neighbors[target].push(source);
                Some(RenderEdge {
                    source,
                    target,
                    kind: link.kind,
                    value: link.value,
                })
            })
            .collect::<Vec<_>>();

        self.visible_node_count = nodes.len();
        self.visible_edge_count = edges.len();
        self.graph_cache = if nodes.is_empty() {
            None
        } else {
            Some(RenderGraph {
                nodes,
                edges,
                index_by_id,
                neighbors,
                view_scratch: ViewScratch {
                    screen_positions: Vec::new(),
                    screen_radii: Vec::new(),
                    visible_indices: Vec::new(),
                    visible_mask: Vec::new(),
                },
            })
        };
    }

    pub(in crate::app) fn graph_is_stale(&self) -> bool {
        self.explorer_revision != Some(self.explorer.revision())
    }
}
