//! View state consumed by the draw routines

use serde::{Deserialize, Serialize};

use crate::constants::scale::{EDGE_THICKNESS_DIVISOR, FALLBACK_RADIUS, NODE_RADIUS_DIVISOR};
use crate::graph::{Graph, MaterialId, NodeId};

/// User-visible display toggles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewOptions {
    /// Node labels
    pub labels: bool,
    pub edge_labels: bool,
    /// Draw arrow heads on directed edges
    pub arrows: bool,
    /// Only draw the selected node's connected component
    pub component_filter: bool,
    /// Highlight the path between the previous and the selected node
    pub shortest_path: bool,
    /// Replace the edges with a spanning forest
    pub spanning_tree: bool,
    pub bundling: bool,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            labels: false,
            edge_labels: false,
            arrows: true,
            component_filter: false,
            shortest_path: false,
            spanning_tree: false,
            bundling: false,
        }
    }
}

/// Current, previous and hovered node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    pub selected: Option<NodeId>,
    pub previous: Option<NodeId>,
    pub highlighted: Option<NodeId>,
}

impl Selection {
    /// Material override for a node: highlighted, then selected, then previous
    pub fn material_for(&self, id: NodeId, own: MaterialId) -> MaterialId {
        if self.highlighted == Some(id) {
            MaterialId::HIGHLIGHTED
        } else if self.selected == Some(id) {
            MaterialId::SELECTED
        } else if self.previous == Some(id) {
            MaterialId::SELECTED_PREVIOUS
        } else {
            own
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Drop ids that no longer exist in the graph
    pub fn retain_valid(&mut self, graph: &Graph) {
        for slot in [&mut self.selected, &mut self.previous, &mut self.highlighted] {
            if slot.is_some_and(|id| !graph.is_valid_node(id)) {
                *slot = None;
            }
        }
    }
}

/// Display sizes derived from the graph's bounding radius
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneScale {
    pub node_radius: f32,
    pub arrow_height: f32,
    pub arrow_width: f32,
    pub edge_thickness: f32,
    /// Gap left at an edge end for the arrow head
    pub edge_offset: f32,
}

impl Default for SceneScale {
    fn default() -> Self {
        Self::from_radius(FALLBACK_RADIUS)
    }
}

impl SceneScale {
    pub fn from_radius(radius: f32) -> Self {
        let node_radius = radius / NODE_RADIUS_DIVISOR;
        let arrow_height = node_radius / 2.0;
        Self {
            node_radius,
            arrow_height,
            arrow_width: arrow_height / 2.0,
            edge_thickness: node_radius / EDGE_THICKNESS_DIVISOR,
            edge_offset: arrow_height,
        }
    }
}
