//! Whole-graph queries and bulk geometry edits

use std::collections::VecDeque;

use glam::Vec3;
use rand::Rng;

use super::model::{Graph, NodeId};
use crate::constants::scale::FALLBACK_RADIUS;

impl Graph {
    /// Bounding sphere of all node positions
    ///
    /// Returns the box center and the largest center-to-node distance. An
    /// empty or single-point graph gets [`FALLBACK_RADIUS`].
    pub fn locate(&self) -> (Vec3, f32) {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        let mut any = false;
        for (_, node) in self.nodes() {
            min = min.min(node.position);
            max = max.max(node.position);
            any = true;
        }
        if !any {
            return (Vec3::ZERO, FALLBACK_RADIUS);
        }

        let center = (min + max) * 0.5;
        let radius = self
            .nodes()
            .map(|(_, node)| node.position.distance(center))
            .fold(0.0_f32, f32::max);

        if radius.is_finite() && radius > f32::EPSILON {
            (center, radius)
        } else {
            (center, FALLBACK_RADIUS)
        }
    }

    /// Translate every node and bundled path point by `offset`
    pub fn move_nodes(&mut self, offset: Vec3) {
        for id in self.node_ids().collect::<Vec<_>>() {
            if let Some(node) = self.node_mut(id) {
                node.position += offset;
            }
        }
        let paths: Vec<Vec<Vec3>> = (0..self.edge_count())
            .filter_map(|id| self.edge_path(id).map(|p| p.iter().map(|q| *q + offset).collect()))
            .collect();
        if paths.len() == self.edge_count() && !paths.is_empty() {
            self.set_edge_paths(paths);
        }
    }

    /// Scatter nodes uniformly inside a cube of half extent `extent`
    pub fn randomize_positions<R: Rng>(&mut self, extent: f32, rng: &mut R) {
        for id in self.node_ids().collect::<Vec<_>>() {
            if let Some(node) = self.node_mut(id) {
                node.position = Vec3::new(
                    rng.random_range(-extent..=extent),
                    rng.random_range(-extent..=extent),
                    rng.random_range(-extent..=extent),
                );
            }
        }
        self.clear_edge_paths();
    }

    /// Label every node with its connected component, ignoring edge direction
    ///
    /// Components are numbered in order of their lowest node id. Returns the
    /// number of components found.
    pub fn assign_components(&mut self) -> usize {
        let adjacency = self.undirected_adjacency();
        let mut component = vec![usize::MAX; self.node_capacity()];
        let mut next = 0;

        for start in self.node_ids().collect::<Vec<_>>() {
            if component[start] != usize::MAX {
                continue;
            }
            component[start] = next;
            let mut queue = VecDeque::from([start]);
            while let Some(current) = queue.pop_front() {
                for &neighbor in &adjacency[current] {
                    if component[neighbor] == usize::MAX {
                        component[neighbor] = next;
                        queue.push_back(neighbor);
                    }
                }
            }
            next += 1;
        }

        for id in self.node_ids().collect::<Vec<_>>() {
            if let Some(node) = self.node_mut(id) {
                node.component = component[id];
            }
        }
        next
    }

    /// Breadth-first predecessor tree rooted at `root`
    ///
    /// `pred[i] == i` marks the root, unreachable nodes and holes in the id
    /// range. Following `pred` from any reachable node ends at `root`.
    pub fn shortest_path_tree(&self, root: NodeId) -> Vec<NodeId> {
        let mut pred: Vec<NodeId> = (0..self.node_capacity()).collect();
        if !self.is_valid_node(root) {
            return pred;
        }
        let adjacency = self.undirected_adjacency();
        let mut visited = vec![false; self.node_capacity()];
        Self::bfs_into(&adjacency, root, &mut visited, &mut pred);
        pred
    }

    /// Breadth-first spanning forest
    ///
    /// The tree containing `root` is grown first; remaining components are
    /// rooted at their lowest id. Same `pred` encoding as
    /// [`shortest_path_tree`](Self::shortest_path_tree).
    pub fn spanning_tree(&self, root: Option<NodeId>) -> Vec<NodeId> {
        let mut pred: Vec<NodeId> = (0..self.node_capacity()).collect();
        let adjacency = self.undirected_adjacency();
        let mut visited = vec![false; self.node_capacity()];

        let roots = root
            .filter(|r| self.is_valid_node(*r))
            .into_iter()
            .chain(self.node_ids())
            .collect::<Vec<_>>();
        for start in roots {
            if !visited[start] {
                Self::bfs_into(&adjacency, start, &mut visited, &mut pred);
            }
        }
        pred
    }

    fn bfs_into(
        adjacency: &[Vec<NodeId>],
        root: NodeId,
        visited: &mut [bool],
        pred: &mut [NodeId],
    ) {
        visited[root] = true;
        let mut queue = VecDeque::from([root]);
        while let Some(current) = queue.pop_front() {
            for &neighbor in &adjacency[current] {
                if !visited[neighbor] {
                    visited[neighbor] = true;
                    pred[neighbor] = current;
                    queue.push_back(neighbor);
                }
            }
        }
    }
}

/// Walk `pred` from `from` back to its root
///
/// Stops at the first self-loop, so an unreachable `from` yields just itself.
pub fn path_to_root(pred: &[NodeId], from: NodeId) -> Vec<NodeId> {
    let mut path = Vec::new();
    let mut current = from;
    while current < pred.len() && path.len() <= pred.len() {
        path.push(current);
        if pred[current] == current {
            break;
        }
        current = pred[current];
    }
    path
}
