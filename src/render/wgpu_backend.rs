//! wgpu implementation of the texture backend and instance uploads

use std::collections::HashMap;

use wgpu::util::DeviceExt;
use wgpu::{Buffer, Device, Queue, Texture, TextureView};

use crate::error::ResourceError;
use crate::render::instance::DrawList;
use crate::render::resources::{DecodedImage, TextureBackend, TextureHandle};

/// Graphics settings shared by every rendering context
pub struct GraphicsConfig {
    pub sample_count: u32,
    pub texture_format: wgpu::TextureFormat,
}

impl GraphicsConfig {
    pub fn global() -> Self {
        Self {
            sample_count: 1, // Disable multisampling for better compatibility
            texture_format: wgpu::TextureFormat::Rgba8UnormSrgb,
        }
    }
}

/// Texture and its view, created on upload
pub struct GpuTexture {
    pub texture: Texture,
    pub view: TextureView,
}

/// Instance buffers for one uploaded draw list
pub struct DrawBuffers {
    pub shapes: Option<(Buffer, u32)>,
    pub billboards: Option<(Buffer, u32)>,
    pub edges: Option<(Buffer, u32)>,
    pub arrows: Option<(Buffer, u32)>,
}

pub struct WgpuTextureBackend {
    device: Device,
    queue: Queue,
    config: GraphicsConfig,
    next: u32,
    textures: HashMap<TextureHandle, GpuTexture>,
}

impl std::fmt::Debug for WgpuTextureBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuTextureBackend")
            .field("next", &self.next)
            .field("textures", &self.textures.len())
            .finish()
    }
}

impl WgpuTextureBackend {
    pub fn new(device: Device, queue: Queue) -> Self {
        Self {
            device,
            queue,
            config: GraphicsConfig::global(),
            next: 0,
            textures: HashMap::new(),
        }
    }

    pub fn texture(&self, handle: TextureHandle) -> Option<&GpuTexture> {
        self.textures.get(&handle)
    }

    /// Create vertex-rate instance buffers for a draw list
    pub fn upload_draw_list(&self, list: &DrawList) -> DrawBuffers {
        DrawBuffers {
            shapes: self.instance_buffer("Shape Instances", list.shape_bytes(), list.shapes.len()),
            billboards: self.instance_buffer(
                "Billboard Instances",
                list.billboard_bytes(),
                list.billboards.len(),
            ),
            edges: self.instance_buffer("Edge Instances", list.edge_bytes(), list.edges.len()),
            arrows: self.instance_buffer("Arrow Instances", list.arrow_bytes(), list.arrows.len()),
        }
    }

    fn instance_buffer(&self, label: &str, contents: &[u8], count: usize) -> Option<(Buffer, u32)> {
        if count == 0 {
            return None;
        }
        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        Some((buffer, count as u32))
    }
}

impl TextureBackend for WgpuTextureBackend {
    fn allocate(&mut self, count: usize) -> Vec<TextureHandle> {
        // Handles are ids only; GPU memory is created on upload.
        (0..count)
            .map(|_| {
                self.next += 1;
                TextureHandle(self.next)
            })
            .collect()
    }

    fn upload(&mut self, handle: TextureHandle, image: &DecodedImage) -> Result<(), ResourceError> {
        let max = self.device.limits().max_texture_dimension_2d;
        if image.width > max || image.height > max {
            return Err(ResourceError::Upload(format!(
                "{}x{} exceeds the maximum texture size {}",
                image.width, image.height, max
            )));
        }
        if image.rgba.len() != (image.width * image.height * 4) as usize {
            return Err(ResourceError::Upload("pixel buffer size mismatch".to_string()));
        }

        let size = wgpu::Extent3d {
            width: image.width,
            height: image.height,
            depth_or_array_layers: 1,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Node Image Texture"),
            size,
            mip_level_count: 1,
            sample_count: self.config.sample_count,
            dimension: wgpu::TextureDimension::D2,
            format: self.config.texture_format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &image.rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * image.width),
                rows_per_image: Some(image.height),
            },
            size,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.textures.insert(handle, GpuTexture { texture, view });
        Ok(())
    }
}
