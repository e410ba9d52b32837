use eframe::egui::{Vec2, vec2};

use crate::explore::LinkKind;

use super::{PhysicsConfig, RenderEdge, RenderGraph};

const SOFTENING: f32 = 420.0;
const CENTER_PULL: f32 = 0.0007;
const REST_SPEED: f32 = 0.03;

fn fallback_direction(a: usize, b: usize) -> Vec2 {
    let angle = ((a as f32) * 0.618_034 + (b as f32) * 0.414_214) * std::f32::consts::TAU;
    vec2(angle.cos(), angle.sin())
}

fn limit(vector: Vec2, max_length: f32) -> Vec2 {
    let length = vector.length();
    if length > max_length {
        vector * (max_length / length)
    } else {
        vector
    }
}

fn rest_length(edge: &RenderEdge, radius_sum: f32) -> f32 {
    match edge.kind {
        LinkKind::Member => 64.0 + radius_sum,
        LinkKind::Artist | LinkKind::Label => 42.0 + radius_sum,
        // stronger similarity pulls clusters closer together
        LinkKind::Similarity => (190.0 - edge.value.clamp(0.0, 1.0) * 80.0) + radius_sum * 1.4,
    }
}

/// Advances the layout by one frame. Returns whether anything still moves.
pub(super) fn step_physics(cache: &mut RenderGraph, config: PhysicsConfig) -> bool {
    let nodes = &mut cache.nodes;
    let count = nodes.len();
    if count == 0 {
        return false;
    }

    let intensity = config.intensity.clamp(0.2, 2.5);
    let repulsion = 52_000.0 * intensity * config.repulsion_scale.clamp(0.25, 2.6);
    let spring = 0.018 * intensity * config.spring_scale.clamp(0.2, 2.2);
    let collision = 1.6 * intensity * config.collision_scale.clamp(0.2, 2.0);
    let damping = config.velocity_damping.clamp(0.78, 0.97);

    let mut forces = vec![Vec2::ZERO; count];

    for i in 0..count {
        for j in (i + 1)..count {
            let delta = nodes[i].world_pos - nodes[j].world_pos;
            let distance_sq = delta.length_sq();
            let distance = distance_sq.sqrt();
            let direction = if distance > 0.0001 {
                delta / distance
            } else {
                fallback_direction(i, j)
            };

            let mut push = repulsion / (distance_sq + SOFTENING);
            let min_distance = (nodes[i].base_radius + nodes[j].base_radius) * 1.6 + 6.0;
            if distance < min_distance {
                push += (min_distance - distance) * collision;
            }

            forces[i] += direction * push;
            forces[j] -= direction * push;
        }
    }

    for edge in &cache.edges {
        let (source, target) = (edge.source, edge.target);
        if source >= count || target >= count || source == target {
            continue;
        }

        let delta = nodes[target].world_pos - nodes[source].world_pos;
        let distance = delta.length();
        if distance <= 0.0001 {
            continue;
        }

        let radius_sum = nodes[source].base_radius + nodes[target].base_radius;
        let stretch = distance - rest_length(edge, radius_sum);
        let pull = delta / distance * stretch * spring;
        forces[source] += pull;
        forces[target] -= pull;
    }

    let max_force = 150.0 + intensity * 80.0;
    let max_speed = 10.0 + intensity * 14.0;
    let mut moving = false;
    for (node, force) in nodes.iter_mut().zip(forces) {
        let force = limit(force - node.world_pos * CENTER_PULL, max_force);
        let velocity = limit((node.velocity + force * 0.06) * damping, max_speed);

        if velocity.length() < REST_SPEED {
            node.velocity = Vec2::ZERO;
            continue;
        }
        node.velocity = velocity;
        node.world_pos += velocity;
        moving = true;
    }

    moving
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::app::{RenderNode, ViewScratch};
    use crate::explore::NodeKind;

    fn node(id: &str, x: f32, y: f32) -> RenderNode {
        RenderNode {
            id: id.to_owned(),
            name: id.to_owned(),
            kind: NodeKind::Release,
            style: None,
            count: 1,
            world_pos: vec2(x, y),
            velocity: Vec2::ZERO,
            base_radius: 6.0,
        }
    }

    fn graph(nodes: Vec<RenderNode>, edges: Vec<RenderEdge>) -> RenderGraph {
        RenderGraph {
            neighbors: vec![Vec::new(); nodes.len()],
            index_by_id: HashMap::new(),
            nodes,
            edges,
            view_scratch: ViewScratch {
                screen_positions: Vec::new(),
                screen_radii: Vec::new(),
                visible_indices: Vec::new(),
                visible_mask: Vec::new(),
            },
        }
    }

    fn config() -> PhysicsConfig {
        PhysicsConfig {
            intensity: 1.0,
            repulsion_scale: 1.0,
            spring_scale: 1.0,
            collision_scale: 1.0,
            velocity_damping: 0.9,
        }
    }

    fn distance(graph: &RenderGraph) -> f32 {
        (graph.nodes[0].world_pos - graph.nodes[1].world_pos).length()
    }

    #[test]
    fn overlapping_nodes_push_apart() {
        let mut graph = graph(vec![node("a", 0.0, 0.0), node("b", 1.0, 0.0)], Vec::new());
        for _ in 0..20 {
            step_physics(&mut graph, config());
        }
        assert!(distance(&graph) > 20.0);
    }

    #[test]
    fn linked_nodes_are_pulled_together() {
        let edge = RenderEdge {
            source: 0,
            target: 1,
            kind: LinkKind::Member,
            value: 1.0,
        };
        let mut graph = graph(vec![node("a", -600.0, 0.0), node("b", 600.0, 0.0)], vec![edge]);
        let start = distance(&graph);
        for _ in 0..30 {
            step_physics(&mut graph, config());
        }
        assert!(distance(&graph) < start);
    }

    #[test]
    fn lone_node_at_origin_rests() {
        let mut graph = graph(vec![node("a", 0.0, 0.0)], Vec::new());
        assert!(!step_physics(&mut graph, config()));
    }
}
