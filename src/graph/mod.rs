//! Graph model and the shared store

mod algorithms;
mod model;
mod store;

pub use algorithms::path_to_root;
pub use model::{Edge, EdgeId, Graph, MaterialId, Node, NodeId, NodeKind, TextureMode};
pub use store::GraphStore;
