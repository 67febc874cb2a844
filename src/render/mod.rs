//! Render-side state: snapshots, resource caches and draw lists

pub mod camera;
pub mod draw;
pub mod frame;
pub mod instance;
pub mod resources;
pub mod scene;
pub mod wgpu_backend;

pub use camera::{Camera3D, NavTransform};
pub use draw::{draw_frame, DrawContext, FrameDraw};
pub use frame::FrameSynchronizer;
pub use instance::{DrawList, Label};
pub use resources::{
    DecodedImage, FileImageDecoder, GeometryCache, HeadlessBackend, ImageDecoder, RenderResourceCache,
    ResourceSettings, ResourceStatistics, TextureBackend, TextureCache, TextureEntry, TextureHandle,
};
pub use scene::{SceneScale, Selection, ViewOptions};
pub use wgpu_backend::WgpuTextureBackend;
