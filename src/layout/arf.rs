//! Continuous attractive/repulsive force layout
//!
//! Edges act as springs, every pair of nodes repels with an inverse distance
//! force and a weak pull toward the centroid keeps disconnected components
//! from drifting apart. Velocities are damped and clamped each iteration. The
//! layout never reports convergence; it keeps running until stopped.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::runner::{LayoutAlgorithm, LayoutFrame, StepOutcome};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArfConfig {
    /// Spring constant along edges
    pub spring: f32,
    /// Pull of every node toward the centroid
    pub attraction: f32,
    /// Inverse-distance repulsion between all pairs
    pub repulsion: f32,
    /// Fraction of velocity kept per iteration
    pub damping: f32,
    /// Integration step
    pub time_step: f32,
    /// Upper bound on displacement per iteration
    pub max_step: f32,
}

impl Default for ArfConfig {
    fn default() -> Self {
        Self {
            spring: 1.0,
            attraction: 0.05,
            repulsion: 200.0,
            damping: 0.6,
            time_step: 0.05,
            max_step: 5.0,
        }
    }
}

pub struct ArfLayout {
    config: ArfConfig,
    velocities: Vec<Vec3>,
    forces: Vec<Vec3>,
}

impl ArfLayout {
    pub fn new(config: ArfConfig) -> Self {
        Self {
            config,
            velocities: Vec::new(),
            forces: Vec::new(),
        }
    }

    pub fn velocities(&self) -> &[Vec3] {
        &self.velocities
    }

    /// Sum of squared speeds, zero at rest
    pub fn kinetic_energy(&self) -> f32 {
        self.velocities.iter().map(|v| v.length_squared()).sum()
    }
}

impl LayoutAlgorithm for ArfLayout {
    fn name(&self) -> &'static str {
        "dynamic"
    }

    fn step(&mut self, frame: &mut LayoutFrame) -> StepOutcome {
        let n = frame.capacity();
        // Nodes added since the last iteration start at rest.
        self.velocities.resize(n, Vec3::ZERO);
        self.forces.clear();
        self.forces.resize(n, Vec3::ZERO);

        let count = frame.node_count();
        if count == 0 {
            return StepOutcome::Continue;
        }

        let centroid = frame
            .positions
            .iter()
            .zip(&frame.present)
            .filter(|(_, present)| **present)
            .map(|(p, _)| *p)
            .sum::<Vec3>()
            / count as f32;

        for i in 0..n {
            if !frame.present[i] {
                continue;
            }
            self.forces[i] += (centroid - frame.positions[i]) * self.config.attraction;
            for j in (i + 1)..n {
                if !frame.present[j] {
                    continue;
                }
                let delta = frame.positions[i] - frame.positions[j];
                let distance_squared = delta.length_squared().max(1e-2);
                // |F| = repulsion / d, direction delta / d
                let force = delta * (self.config.repulsion / distance_squared);
                self.forces[i] += force;
                self.forces[j] -= force;
            }
        }

        for &(source, target, weight) in &frame.edges {
            let delta = frame.positions[target] - frame.positions[source];
            let force = delta * (self.config.spring * weight.max(0.0));
            self.forces[source] += force;
            self.forces[target] -= force;
        }

        let max_step = self.config.max_step;
        for i in 0..n {
            if !frame.present[i] {
                self.velocities[i] = Vec3::ZERO;
                continue;
            }
            let velocity = (self.velocities[i] + self.forces[i] * self.config.time_step)
                * self.config.damping;
            let velocity = if velocity.is_finite() {
                velocity.clamp_length_max(max_step)
            } else {
                Vec3::ZERO
            };
            self.velocities[i] = velocity;
            frame.positions[i] += velocity;
        }
        frame.positions_dirty = true;

        StepOutcome::Continue
    }

    fn reset(&mut self) {
        self.velocities.clear();
        self.forces.clear();
    }
}
