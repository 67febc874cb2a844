//! Graph data structures
//!
//! Node ids are a dense integer range: removing a node leaves a hole instead of
//! renumbering, so per-node buffers held by layouts and pickers stay aligned.
//! Mutating methods here never touch `version`; the [`GraphStore`] bumps it
//! once per batch.
//!
//! [`GraphStore`]: super::GraphStore

use std::collections::BTreeMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::GraphError;

/// Index of a node in the dense id range
pub type NodeId = usize;

/// Index of an edge in insertion order
pub type EdgeId = usize;

/// Style selector resolved by the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MaterialId(pub u32);

impl MaterialId {
    pub const DEFAULT: Self = Self(0);
    pub const SELECTED: Self = Self(1);
    pub const SELECTED_PREVIOUS: Self = Self(2);
    pub const HIGHLIGHTED: Self = Self(3);
}

/// How a node is drawn
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum NodeKind {
    /// Fixed 3D shape (sphere)
    #[default]
    Shape,
    /// Image quad; falls back to the shape when the image cannot be loaded
    Image { path: String, scale: f32 },
}

/// Orientation policy for image nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextureMode {
    /// Quads always face the camera; redrawn every frame
    #[default]
    Align,
    /// Quads keep a fixed orientation and rotate with the graph
    Rotate,
}

/// A single graph node
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub position: Vec3,
    /// Radius multiplier relative to the scene node radius
    pub size: f32,
    pub material: MaterialId,
    pub label: String,
    pub attributes: BTreeMap<String, String>,
    /// Connected component id, valid after [`Graph::assign_components`]
    pub component: usize,
    pub kind: NodeKind,
}

impl Node {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            size: 1.0,
            material: MaterialId::DEFAULT,
            label: String::new(),
            attributes: BTreeMap::new(),
            component: 0,
            kind: NodeKind::Shape,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_size(mut self, size: f32) -> Self {
        self.size = size;
        self
    }

    pub fn with_material(mut self, material: MaterialId) -> Self {
        self.material = material;
        self
    }

    pub fn with_image(mut self, path: impl Into<String>, scale: f32) -> Self {
        self.kind = NodeKind::Image {
            path: path.into(),
            scale,
        };
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn is_image(&self) -> bool {
        matches!(self.kind, NodeKind::Image { .. })
    }

    /// Image path, empty for shape nodes
    pub fn image_path(&self) -> &str {
        match &self.kind {
            NodeKind::Image { path, .. } => path,
            NodeKind::Shape => "",
        }
    }

    /// Image scale, 1.0 for shape nodes
    pub fn image_scale(&self) -> f32 {
        match self.kind {
            NodeKind::Image { scale, .. } => scale,
            NodeKind::Shape => 1.0,
        }
    }
}

/// A directed edge
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
    pub weight: f32,
    pub material: MaterialId,
    /// Set when the reverse edge also exists
    pub bidirectional: bool,
    pub label: String,
}

impl Edge {
    pub fn new(source: NodeId, target: NodeId) -> Self {
        Self {
            source,
            target,
            weight: 1.0,
            material: MaterialId::DEFAULT,
            bidirectional: false,
            label: String::new(),
        }
    }

    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_material(mut self, material: MaterialId) -> Self {
        self.material = material;
        self
    }
}

/// Mutable graph topology and geometry
#[derive(Debug, Default)]
pub struct Graph {
    nodes: Vec<Option<Node>>,
    edges: Vec<Edge>,
    /// Bundled control points per edge, endpoints included
    edge_paths: Vec<Vec<Vec3>>,
    texture_mode: TextureMode,
    version: u64,
    structure_version: u64,
}

impl Clone for Graph {
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
            edge_paths: self.edge_paths.clone(),
            texture_mode: self.texture_mode,
            version: self.version,
            structure_version: self.structure_version,
        }
    }

    // Reuses the snapshot's allocations frame to frame.
    fn clone_from(&mut self, source: &Self) {
        self.nodes.clone_from(&source.nodes);
        self.edges.clone_from(&source.edges);
        self.edge_paths.clone_from(&source.edge_paths);
        self.texture_mode = source.texture_mode;
        self.version = source.version;
        self.structure_version = source.structure_version;
    }
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Change counter observed by render caches
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Change counter for topology only (node/edge add and remove)
    pub fn structure_version(&self) -> u64 {
        self.structure_version
    }

    pub fn bump_version(&mut self) {
        self.version += 1;
    }

    /// Carry the version forward from a graph this one replaces
    pub(crate) fn inherit_versions(&mut self, previous: &Graph) {
        self.version = self.version.max(previous.version);
        self.structure_version = self.structure_version.max(previous.structure_version) + 1;
    }

    fn touch_structure(&mut self) {
        self.structure_version += 1;
        self.edge_paths.clear();
    }

    /// Remove all nodes and edges, keeping the version counters
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.touch_structure();
    }

    pub fn add_node(&mut self, node: Node) -> NodeId {
        self.nodes.push(Some(node));
        self.touch_structure();
        self.nodes.len() - 1
    }

    /// Remove a node and every edge touching it
    pub fn remove_node(&mut self, id: NodeId) -> Option<Node> {
        let removed = self.nodes.get_mut(id)?.take()?;
        self.edges.retain(|e| e.source != id && e.target != id);
        self.refresh_bidirectional();
        self.touch_structure();
        Some(removed)
    }

    pub fn add_edge(&mut self, source: NodeId, target: NodeId) -> Result<EdgeId, GraphError> {
        self.insert_edge(Edge::new(source, target))
    }

    pub fn insert_edge(&mut self, mut edge: Edge) -> Result<EdgeId, GraphError> {
        for endpoint in [edge.source, edge.target] {
            if !self.is_valid_node(endpoint) {
                return Err(GraphError::MissingEndpoint(endpoint));
            }
        }

        let mut has_reverse = false;
        for other in self.edges.iter_mut() {
            if other.source == edge.target && other.target == edge.source {
                other.bidirectional = true;
                has_reverse = true;
            }
        }
        edge.bidirectional = has_reverse;

        self.edges.push(edge);
        self.touch_structure();
        Ok(self.edges.len() - 1)
    }

    fn refresh_bidirectional(&mut self) {
        let pairs: Vec<(NodeId, NodeId)> = self.edges.iter().map(|e| (e.source, e.target)).collect();
        for edge in self.edges.iter_mut() {
            edge.bidirectional = pairs.contains(&(edge.target, edge.source));
        }
    }

    pub fn is_valid_node(&self, id: NodeId) -> bool {
        matches!(self.nodes.get(id), Some(Some(_)))
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id).and_then(Option::as_ref)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id).and_then(Option::as_mut)
    }

    /// Ids of existing nodes in ascending order
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(id, slot)| slot.as_ref().map(|_| id))
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(id, slot)| slot.as_ref().map(|node| (id, node)))
    }

    /// Number of existing nodes
    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|slot| slot.is_some()).count()
    }

    /// Length of the dense id range, holes included
    pub fn node_capacity(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_count() == 0
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id)
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn position(&self, id: NodeId) -> Option<Vec3> {
        self.node(id).map(|n| n.position)
    }

    pub fn set_position(&mut self, id: NodeId, position: Vec3) -> Result<(), GraphError> {
        let node = self.node_mut(id).ok_or(GraphError::InvalidNode(id))?;
        node.position = position;
        Ok(())
    }

    pub fn has_edge(&self, source: NodeId, target: NodeId) -> bool {
        self.edges.iter().any(|e| e.source == source && e.target == target)
    }

    pub fn is_bidirectional(&self, source: NodeId, target: NodeId) -> bool {
        self.has_edge(source, target) && self.has_edge(target, source)
    }

    /// In-degree plus out-degree
    pub fn degree(&self, id: NodeId) -> usize {
        self.edges
            .iter()
            .filter(|e| e.source == id || e.target == id)
            .count()
    }

    /// Adjacency lists ignoring edge direction, indexed by node id
    pub fn undirected_adjacency(&self) -> Vec<Vec<NodeId>> {
        let mut adjacency = vec![Vec::new(); self.nodes.len()];
        for edge in &self.edges {
            adjacency[edge.source].push(edge.target);
            if edge.source != edge.target {
                adjacency[edge.target].push(edge.source);
            }
        }
        adjacency
    }

    pub fn texture_mode(&self) -> TextureMode {
        self.texture_mode
    }

    pub fn set_texture_mode(&mut self, mode: TextureMode) {
        self.texture_mode = mode;
    }

    /// Bundled path for an edge, if the bundler has produced one
    pub fn edge_path(&self, id: EdgeId) -> Option<&[Vec3]> {
        self.edge_paths
            .get(id)
            .filter(|path| path.len() >= 2)
            .map(Vec::as_slice)
    }

    pub fn has_edge_paths(&self) -> bool {
        !self.edge_paths.is_empty()
    }

    pub fn set_edge_paths(&mut self, paths: Vec<Vec<Vec3>>) {
        self.edge_paths = paths;
    }

    pub fn clear_edge_paths(&mut self) {
        self.edge_paths.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_graph() -> Graph {
        let mut graph = Graph::new();
        let a = graph.add_node(Node::new(Vec3::ZERO));
        let b = graph.add_node(Node::new(Vec3::X));
        let c = graph.add_node(Node::new(Vec3::Y));
        graph.add_edge(a, b).unwrap();
        graph.add_edge(b, c).unwrap();
        graph
    }

    #[test]
    fn test_dense_ids_survive_removal() {
        let mut graph = line_graph();
        assert!(graph.remove_node(1).is_some());

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.node_capacity(), 3);
        assert!(!graph.is_valid_node(1));
        assert_eq!(graph.node_ids().collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_bidirectional_flags() {
        let mut graph = line_graph();
        assert!(!graph.edges()[0].bidirectional);

        graph.add_edge(1, 0).unwrap();
        assert!(graph.edges()[0].bidirectional);
        assert!(graph.edges()[2].bidirectional);
        assert!(graph.is_bidirectional(0, 1));

        graph.remove_node(2);
        assert!(graph.edges().iter().all(|e| e.bidirectional));
    }

    #[test]
    fn test_edge_to_missing_node_rejected() {
        let mut graph = line_graph();
        assert_eq!(graph.add_edge(0, 7), Err(GraphError::MissingEndpoint(7)));
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn test_clear_keeps_version() {
        let mut graph = line_graph();
        graph.bump_version();
        let structure = graph.structure_version();

        graph.clear();
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.version(), 1);
        assert!(graph.structure_version() > structure);
    }

    #[test]
    fn test_structural_change_drops_edge_paths() {
        let mut graph = line_graph();
        graph.set_edge_paths(vec![vec![Vec3::ZERO, Vec3::X], vec![Vec3::X, Vec3::Y]]);
        assert_eq!(graph.edge_path(1), Some(&[Vec3::X, Vec3::Y][..]));

        graph.add_node(Node::new(Vec3::Z));
        assert!(graph.edge_path(0).is_none());
    }

    #[test]
    fn test_clone_from_copies_everything() {
        let source = line_graph();
        let mut snapshot = Graph::new();
        snapshot.add_node(Node::new(Vec3::ONE));

        snapshot.clone_from(&source);
        assert_eq!(snapshot.node_count(), 3);
        assert_eq!(snapshot.edges(), source.edges());
        assert_eq!(snapshot.structure_version(), source.structure_version());
    }
}
