//! GPU instance data and draw lists
//!
//! Draw routines emit instances into a [`DrawList`]; a renderer uploads the
//! byte views into instance buffers.

use glam::{Quat, Vec3};

use crate::graph::MaterialId;
use crate::render::resources::TextureHandle;

/// Instance data for a fixed-shape node
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ShapeInstance {
    pub position: [f32; 3],
    pub radius: f32,
    pub material: u32,
    pub _padding: [u32; 3],
}

/// Instance data for a textured image quad
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BillboardInstance {
    pub position: [f32; 3],
    pub texture: u32,
    pub half_size: [f32; 2],
    pub _padding: [f32; 2],
    pub rotation: [f32; 4], // quaternion xyzw
}

/// Instance data for an edge segment
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct EdgeInstance {
    pub start: [f32; 3],
    pub thickness: f32,
    pub end: [f32; 3],
    pub material: u32,
}

/// Instance data for an arrow head (cone from base to tip)
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ArrowInstance {
    pub base: [f32; 3],
    pub width: f32,
    pub tip: [f32; 3],
    pub material: u32,
}

/// Camera-facing text
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub position: Vec3,
    pub text: String,
    pub shadow: bool,
}

/// Instances for one draw pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrawList {
    pub shapes: Vec<ShapeInstance>,
    pub billboards: Vec<BillboardInstance>,
    pub edges: Vec<EdgeInstance>,
    pub arrows: Vec<ArrowInstance>,
    pub labels: Vec<Label>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.shapes.clear();
        self.billboards.clear();
        self.edges.clear();
        self.arrows.clear();
        self.labels.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
            && self.billboards.is_empty()
            && self.edges.is_empty()
            && self.arrows.is_empty()
            && self.labels.is_empty()
    }

    pub fn push_shape(&mut self, position: Vec3, radius: f32, material: MaterialId) {
        self.shapes.push(ShapeInstance {
            position: position.to_array(),
            radius,
            material: material.0,
            _padding: [0; 3],
        });
    }

    pub fn push_billboard(&mut self, position: Vec3, half_size: [f32; 2], rotation: Quat, texture: TextureHandle) {
        self.billboards.push(BillboardInstance {
            position: position.to_array(),
            texture: texture.0,
            half_size,
            _padding: [0.0; 2],
            rotation: rotation.to_array(),
        });
    }

    pub fn push_edge(&mut self, start: Vec3, end: Vec3, thickness: f32, material: MaterialId) {
        self.edges.push(EdgeInstance {
            start: start.to_array(),
            thickness,
            end: end.to_array(),
            material: material.0,
        });
    }

    pub fn push_arrow(&mut self, base: Vec3, tip: Vec3, width: f32, material: MaterialId) {
        self.arrows.push(ArrowInstance {
            base: base.to_array(),
            width,
            tip: tip.to_array(),
            material: material.0,
        });
    }

    pub fn push_label(&mut self, position: Vec3, text: impl Into<String>, shadow: bool) {
        self.labels.push(Label {
            position,
            text: text.into(),
            shadow,
        });
    }

    pub fn shape_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.shapes)
    }

    pub fn billboard_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.billboards)
    }

    pub fn edge_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.edges)
    }

    pub fn arrow_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.arrows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_sizes() {
        assert_eq!(std::mem::size_of::<ShapeInstance>(), 32);
        assert_eq!(std::mem::size_of::<BillboardInstance>(), 48);
        assert_eq!(std::mem::size_of::<EdgeInstance>(), 32);
        assert_eq!(std::mem::size_of::<ArrowInstance>(), 32);
    }

    #[test]
    fn test_byte_views() {
        let mut list = DrawList::new();
        list.push_shape(Vec3::ONE, 0.5, MaterialId::SELECTED);
        list.push_edge(Vec3::ZERO, Vec3::X, 0.1, MaterialId::DEFAULT);

        assert_eq!(list.shape_bytes().len(), 32);
        assert_eq!(list.edge_bytes().len(), 32);
        assert_eq!(list.shapes[0].material, 1);

        list.clear();
        assert!(list.is_empty());
    }
}
