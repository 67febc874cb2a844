//! Nearest-node selection for pointing devices
//!
//! All queries run against a frame snapshot in graph coordinates. A device
//! that reports a 3D position picks by distance; a ray-casting device picks
//! inside a cone whose half-angle shrinks as the viewer moves away from the
//! scene origin.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::constants::picking::POINT_RADIUS_MULTIPLIER;
use crate::graph::{Graph, NodeId};
use crate::render::camera::{Camera3D, NavTransform};

/// Half-line with a unit direction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Build a ray, normalizing the direction; None for a zero direction
    pub fn new(origin: Vec3, direction: Vec3) -> Option<Self> {
        let direction = direction.try_normalize()?;
        Some(Self { origin, direction })
    }

    /// Map a physical-space ray into graph space
    pub fn into_graph_space(self, nav: &NavTransform) -> Option<Self> {
        Self::new(nav.inverse_point(self.origin), nav.inverse_vector(self.direction))
    }
}

/// Pointing device state in physical coordinates
pub trait InputDevice {
    /// True if the device has a full 3D pose and picks by position
    fn is_6dof(&self) -> bool;

    fn position(&self) -> Vec3;

    /// Pointing direction for ray-casting devices
    fn ray_direction(&self) -> Vec3;
}

/// Tracked wand or other device with a 3D position
#[derive(Debug, Clone, Copy)]
pub struct TrackedDevice {
    pub position: Vec3,
}

impl InputDevice for TrackedDevice {
    fn is_6dof(&self) -> bool {
        true
    }

    fn position(&self) -> Vec3 {
        self.position
    }

    fn ray_direction(&self) -> Vec3 {
        Vec3::ZERO
    }
}

/// Device that only casts a ray
#[derive(Debug, Clone, Copy)]
pub struct RayDevice {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl InputDevice for RayDevice {
    fn is_6dof(&self) -> bool {
        false
    }

    fn position(&self) -> Vec3 {
        self.origin
    }

    fn ray_direction(&self) -> Vec3 {
        self.direction
    }
}

/// Mouse cursor cast through the camera
#[derive(Debug, Clone, Copy)]
pub struct MouseDevice {
    origin: Vec3,
    direction: Vec3,
}

impl MouseDevice {
    /// Cursor at normalized screen coordinates (0-1, origin top left)
    pub fn new(camera: &Camera3D, screen_x: f32, screen_y: f32) -> Self {
        let (origin, direction) = camera.screen_to_ray(screen_x, screen_y);
        Self { origin, direction }
    }
}

impl InputDevice for MouseDevice {
    fn is_6dof(&self) -> bool {
        false
    }

    fn position(&self) -> Vec3 {
        self.origin
    }

    fn ray_direction(&self) -> Vec3 {
        self.direction
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PickingSettings {
    /// Point queries accept nodes within this many node radii
    pub point_radius_multiplier: f32,
}

impl Default for PickingSettings {
    fn default() -> Self {
        Self {
            point_radius_multiplier: POINT_RADIUS_MULTIPLIER,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PickingEngine {
    node_radius: f32,
    point_multiplier: f32,
}

impl PickingEngine {
    pub fn new(node_radius: f32, settings: &PickingSettings) -> Self {
        Self {
            node_radius,
            point_multiplier: settings.point_radius_multiplier,
        }
    }

    pub fn node_radius(&self) -> f32 {
        self.node_radius
    }

    pub fn set_node_radius(&mut self, node_radius: f32) {
        self.node_radius = node_radius;
    }

    /// Node closest to `point` with its squared distance, no threshold
    pub fn nearest_node(&self, graph: &Graph, point: Vec3) -> Option<(NodeId, f32)> {
        let mut best: Option<(NodeId, f32)> = None;
        for (id, node) in graph.nodes() {
            let distance_squared = node.position.distance_squared(point);
            if best.is_none_or(|(_, min)| distance_squared < min) {
                best = Some((id, distance_squared));
            }
        }
        best
    }

    /// Nearest node to a point, if it lies within the pick radius
    pub fn select_point(&self, graph: &Graph, point: Vec3) -> Option<NodeId> {
        let threshold = self.point_multiplier * self.node_radius;
        self.nearest_node(graph, point)
            .filter(|(_, distance_squared)| *distance_squared <= threshold * threshold)
            .map(|(id, _)| id)
    }

    /// Squared tangent of the cone half-angle, None when the cone is a half-space
    fn cone_tan_squared(&self, origin: Vec3) -> Option<f32> {
        let origin_squared = origin.length_squared();
        if origin_squared <= f32::EPSILON {
            return None;
        }
        let sine = (self.node_radius * self.node_radius / origin_squared).clamp(0.0, 1.0);
        if sine >= 1.0 {
            return None;
        }
        let theta = sine.asin();
        let tan = theta.tan();
        Some(tan * tan)
    }

    /// Closest node ahead of the ray inside the acceptance cone
    ///
    /// Ties on distance along the ray keep the first node found.
    pub fn select_ray(&self, graph: &Graph, ray: &Ray) -> Option<NodeId> {
        let tan_squared = self.cone_tan_squared(ray.origin);
        let mut best: Option<(NodeId, f32)> = None;

        for (id, node) in graph.nodes() {
            let sp = node.position - ray.origin;
            let along = sp.dot(ray.direction);
            if along < 0.0 {
                continue;
            }
            let x2 = along * along;
            let y2 = sp.cross(ray.direction).length_squared();

            let inside = match tan_squared {
                Some(tan_squared) => y2 <= tan_squared * x2,
                None => true,
            };
            if inside && best.is_none_or(|(_, min)| x2 < min) {
                best = Some((id, x2));
            }
        }
        best.map(|(id, _)| id)
    }

    /// Pick with whatever query suits the device
    ///
    /// Device coordinates are physical; `nav` maps graph space into them.
    pub fn select_device(&self, graph: &Graph, device: &dyn InputDevice, nav: &NavTransform) -> Option<NodeId> {
        if device.is_6dof() {
            return self.select_point(graph, nav.inverse_point(device.position()));
        }
        let ray = Ray::new(device.position(), device.ray_direction())?.into_graph_space(nav)?;
        self.select_ray(graph, &ray)
    }
}
