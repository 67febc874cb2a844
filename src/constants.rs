//! Constants and default values
//!
//! Tunables that are not exposed through `ViewerConfig` live here

/// Picking constants
pub mod picking {
    /// Point queries accept the nearest node only within this many node radii
    pub const POINT_RADIUS_MULTIPLIER: f32 = 8.0;
}

/// Scene scale constants derived from the graph's bounding sphere
pub mod scale {
    /// Bounding radius divided by this gives the standard node radius
    pub const NODE_RADIUS_DIVISOR: f32 = 80.0;

    /// Node radius divided by this gives the edge thickness
    pub const EDGE_THICKNESS_DIVISOR: f32 = 7.0;

    /// Labels are offset from the node center by this many node radii per axis
    pub const NODE_LABEL_OFFSET: f32 = 1.1;

    /// Radius used when the graph is empty or collapsed to a point
    pub const FALLBACK_RADIUS: f32 = 1.0;

    /// Physical radius the whole graph is fitted into on navigation reset
    pub const DEFAULT_DISPLAY_RADIUS: f32 = 20.0;
}

/// Layout constants
pub mod layout {
    /// Half extent of the cube positions are randomized into on reset
    pub const RANDOMIZE_EXTENT: f32 = 100.0;

    /// Default pause between layout iterations (milliseconds)
    pub const DEFAULT_STEP_INTERVAL_MS: u64 = 10;

    /// Default number of Fruchterman-Reingold iterations for a static pass
    pub const DEFAULT_STATIC_ITERATIONS: u32 = 400;

    /// Default number of subdivision points per bundled edge
    pub const DEFAULT_BUNDLE_SUBDIVISIONS: usize = 8;
}

/// GPU resource constants
pub mod resources {
    /// Texture handles reserved up front for each rendering context
    pub const DEFAULT_TEXTURE_POOL_SIZE: usize = 1000;

    /// Environment variable overriding the resource directory
    pub const RESOURCE_DIR_ENV: &str = "HYPHAE_RESOURCE_DIR";

    /// Directory name used under the platform data directory
    pub const DATA_DIR_NAME: &str = "hyphae";
}
