//! Error types shared across the crate
//!
//! The render and picking paths never surface these to callers; they log and
//! degrade to "no resource" / "no selection" instead.

use std::path::PathBuf;
use thiserror::Error;

use crate::graph::NodeId;

/// Errors raised by graph mutation and selection
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GraphError {
    #[error("invalid node id: {0}")]
    InvalidNode(NodeId),

    #[error("edge endpoint {0} does not exist")]
    MissingEndpoint(NodeId),
}

/// Errors raised while loading a GPU resource
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("failed to decode image {path}: {message}")]
    Decode { path: String, message: String },

    #[error("image {path} has zero size")]
    EmptyImage { path: String },

    #[error("texture upload failed: {0}")]
    Upload(String),
}

/// Errors raised while reading the viewer configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
