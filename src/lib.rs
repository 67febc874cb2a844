//! Hyphae core library
//!
//! Layout, render synchronization and picking for interactive 3D graph
//! visualization. Background layout threads mutate a shared [`GraphStore`];
//! each frame copies it into a snapshot that drawing and picking read.

pub mod config;
pub mod constants;
pub mod error;
pub mod graph;
pub mod layout;
pub mod picking;
pub mod render;
pub mod startup_checks;
pub mod viewer;

// Re-export commonly used types
pub use config::ViewerConfig;
pub use error::{ConfigError, GraphError, ResourceError};
pub use graph::{Edge, Graph, GraphStore, MaterialId, Node, NodeId, NodeKind, TextureMode};
pub use layout::{LayoutEngine, LayoutKind};
pub use picking::{InputDevice, PickingEngine, Ray};
pub use render::{FrameSynchronizer, RenderResourceCache};
pub use viewer::Viewer;
