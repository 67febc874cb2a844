//! Per-context GPU resource cache
//!
//! Textures are keyed by image path and live as long as the rendering
//! context. Handles come from a pool reserved up front; once it runs dry the
//! pool grows one handle at a time. Compiled geometry is kept until the graph
//! version it was built from changes.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::resources::DEFAULT_TEXTURE_POOL_SIZE;
use crate::error::ResourceError;
use crate::render::instance::DrawList;

/// Opaque GPU texture handle; 0 means "no texture"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextureHandle(pub u32);

impl TextureHandle {
    pub const NONE: Self = Self(0);

    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }
}

/// Result of a texture lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextureEntry {
    pub handle: TextureHandle,
    pub width: u32,
    pub height: u32,
}

impl TextureEntry {
    /// Sentinel returned for empty keys and failed loads
    pub const NONE: Self = Self {
        handle: TextureHandle::NONE,
        width: 0,
        height: 0,
    };

    pub fn is_loaded(&self) -> bool {
        !self.handle.is_none() && self.width > 0 && self.height > 0
    }

    /// Width over height, 1.0 when not loaded
    pub fn aspect(&self) -> f32 {
        if self.is_loaded() {
            self.width as f32 / self.height as f32
        } else {
            1.0
        }
    }
}

/// RGBA8 pixels
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Turns a resource key into pixels
pub trait ImageDecoder {
    fn decode(&self, key: &str) -> Result<DecodedImage, ResourceError>;
}

/// GPU side of the texture cache
pub trait TextureBackend {
    /// Reserve `count` fresh, non-zero handles
    fn allocate(&mut self, count: usize) -> Vec<TextureHandle>;

    /// Upload pixels into a reserved handle
    fn upload(&mut self, handle: TextureHandle, image: &DecodedImage) -> Result<(), ResourceError>;
}

/// Decodes image files with the `image` crate
///
/// Relative keys are resolved against the resource directory.
#[derive(Debug, Clone)]
pub struct FileImageDecoder {
    root: PathBuf,
}

impl FileImageDecoder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn resolve(&self, key: &str) -> PathBuf {
        let path = Path::new(key);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

impl ImageDecoder for FileImageDecoder {
    fn decode(&self, key: &str) -> Result<DecodedImage, ResourceError> {
        let path = self.resolve(key);
        let image = image::open(&path).map_err(|e| ResourceError::Decode {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        if width == 0 || height == 0 {
            return Err(ResourceError::EmptyImage {
                path: path.display().to_string(),
            });
        }
        Ok(DecodedImage {
            width,
            height,
            rgba: rgba.into_raw(),
        })
    }
}

/// Backend that only hands out handles; used without a GPU
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    next: u32,
    uploads: Vec<(TextureHandle, u32, u32)>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn uploads(&self) -> &[(TextureHandle, u32, u32)] {
        &self.uploads
    }
}

impl TextureBackend for HeadlessBackend {
    fn allocate(&mut self, count: usize) -> Vec<TextureHandle> {
        (0..count)
            .map(|_| {
                self.next += 1;
                TextureHandle(self.next)
            })
            .collect()
    }

    fn upload(&mut self, handle: TextureHandle, image: &DecodedImage) -> Result<(), ResourceError> {
        self.uploads.push((handle, image.width, image.height));
        Ok(())
    }
}

/// Texture cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceSettings {
    /// Handles reserved when a context is created
    pub texture_pool_size: usize,
    /// Remember failed keys instead of retrying every frame
    pub memoize_failures: bool,
    /// Directory relative image paths are resolved against
    pub resource_dir: Option<PathBuf>,
}

impl Default for ResourceSettings {
    fn default() -> Self {
        Self {
            texture_pool_size: DEFAULT_TEXTURE_POOL_SIZE,
            memoize_failures: true,
            resource_dir: None,
        }
    }
}

/// Statistics about cache usage
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ResourceStatistics {
    pub hits: usize,
    pub misses: usize,
    pub failures: usize,
    /// Handles allocated after the initial pool ran out
    pub pool_growth: usize,
    pub geometry_rebuilds: usize,
}

impl ResourceStatistics {
    pub fn hit_ratio(&self) -> f32 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f32 / total as f32
        }
    }
}

/// Append-only map from image key to uploaded texture
pub struct TextureCache {
    backend: Box<dyn TextureBackend>,
    decoder: Box<dyn ImageDecoder>,
    free: Vec<TextureHandle>,
    entries: HashMap<String, TextureEntry>,
    failed: HashSet<String>,
    memoize_failures: bool,
    stats: ResourceStatistics,
}

impl TextureCache {
    pub fn new(
        mut backend: Box<dyn TextureBackend>,
        decoder: Box<dyn ImageDecoder>,
        settings: &ResourceSettings,
    ) -> Self {
        let mut free = backend.allocate(settings.texture_pool_size);
        // Hand out the lowest handles first.
        free.reverse();
        Self {
            backend,
            decoder,
            free,
            entries: HashMap::new(),
            failed: HashSet::new(),
            memoize_failures: settings.memoize_failures,
            stats: ResourceStatistics::default(),
        }
    }

    /// Look up a texture, decoding and uploading it on first use
    ///
    /// Never fails: an empty key or a failed load yields [`TextureEntry::NONE`].
    pub fn get_or_load(&mut self, key: &str) -> TextureEntry {
        if key.is_empty() {
            return TextureEntry::NONE;
        }
        if let Some(entry) = self.entries.get(key) {
            self.stats.hits += 1;
            return *entry;
        }
        if self.failed.contains(key) {
            self.stats.hits += 1;
            return TextureEntry::NONE;
        }

        self.stats.misses += 1;
        match self.load(key) {
            Ok(entry) => {
                log::debug!("Loaded texture {} ({}x{})", key, entry.width, entry.height);
                self.entries.insert(key.to_string(), entry);
                entry
            }
            Err(e) => {
                log::warn!("{}", e);
                self.stats.failures += 1;
                if self.memoize_failures {
                    self.failed.insert(key.to_string());
                }
                TextureEntry::NONE
            }
        }
    }

    fn load(&mut self, key: &str) -> Result<TextureEntry, ResourceError> {
        let image = self.decoder.decode(key)?;
        let handle = self.next_handle()?;
        if let Err(e) = self.backend.upload(handle, &image) {
            self.free.push(handle);
            return Err(e);
        }
        Ok(TextureEntry {
            handle,
            width: image.width,
            height: image.height,
        })
    }

    fn next_handle(&mut self) -> Result<TextureHandle, ResourceError> {
        if let Some(handle) = self.free.pop() {
            return Ok(handle);
        }
        self.stats.pool_growth += 1;
        self.backend
            .allocate(1)
            .pop()
            .ok_or_else(|| ResourceError::Upload("texture pool exhausted".to_string()))
    }

    /// Cached entry without loading
    pub fn get(&self, key: &str) -> Option<TextureEntry> {
        self.entries.get(key).copied()
    }

    /// Allow previously failed keys to be retried
    pub fn forget_failures(&mut self) {
        self.failed.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn free_handles(&self) -> usize {
        self.free.len()
    }

    pub fn stats(&self) -> &ResourceStatistics {
        &self.stats
    }
}

/// Draw list of everything that does not depend on the camera
#[derive(Debug, Default)]
pub struct GeometryCache {
    list: DrawList,
    version: Option<u64>,
    rebuilds: usize,
}

impl GeometryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the compiled list, rebuilding it if `current_version` changed
    ///
    /// The version is recorded before `build` runs, so a mutation that lands
    /// during the rebuild shows up as a new version next frame.
    pub fn get_or_build(&mut self, current_version: u64, build: impl FnOnce(&mut DrawList)) -> &DrawList {
        if self.version != Some(current_version) {
            self.version = Some(current_version);
            self.list.clear();
            build(&mut self.list);
            self.rebuilds += 1;
        }
        &self.list
    }

    pub fn invalidate(&mut self) {
        self.version = None;
    }

    pub fn version(&self) -> Option<u64> {
        self.version
    }

    pub fn rebuilds(&self) -> usize {
        self.rebuilds
    }

    pub fn list(&self) -> &DrawList {
        &self.list
    }
}

/// All GPU-side state owned by one rendering context
pub struct RenderResourceCache {
    pub textures: TextureCache,
    pub geometry: GeometryCache,
}

impl RenderResourceCache {
    pub fn new(
        backend: Box<dyn TextureBackend>,
        decoder: Box<dyn ImageDecoder>,
        settings: &ResourceSettings,
    ) -> Self {
        Self {
            textures: TextureCache::new(backend, decoder, settings),
            geometry: GeometryCache::new(),
        }
    }

    /// Context without a GPU, decoding files from `resource_dir`
    pub fn headless(resource_dir: impl Into<PathBuf>, settings: &ResourceSettings) -> Self {
        Self::new(
            Box::new(HeadlessBackend::new()),
            Box::new(FileImageDecoder::new(resource_dir)),
            settings,
        )
    }

    pub fn get_or_load(&mut self, key: &str) -> TextureEntry {
        self.textures.get_or_load(key)
    }

    pub fn get_or_build_compiled_geometry(
        &mut self,
        current_version: u64,
        build: impl FnOnce(&mut DrawList),
    ) -> &DrawList {
        self.geometry.get_or_build(current_version, build)
    }

    pub fn stats(&self) -> ResourceStatistics {
        ResourceStatistics {
            geometry_rebuilds: self.geometry.rebuilds(),
            ..self.textures.stats().clone()
        }
    }
}
