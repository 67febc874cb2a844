//! Static Fruchterman-Reingold layout in 3D
//!
//! Runs a fixed cooling schedule and reports convergence when the temperature
//! reaches zero.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::runner::{LayoutAlgorithm, LayoutFrame, StepOutcome};
use crate::constants::layout::DEFAULT_STATIC_ITERATIONS;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FruchtermanConfig {
    /// Length of the cooling schedule
    pub iterations: u32,
    /// Preferred edge length
    pub ideal_distance: f32,
    /// Maximum displacement per iteration at the start of the schedule
    pub initial_temperature: f32,
}

impl Default for FruchtermanConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_STATIC_ITERATIONS,
            ideal_distance: 10.0,
            initial_temperature: 10.0,
        }
    }
}

pub struct FruchtermanReingold {
    config: FruchtermanConfig,
    iteration: u32,
    displacement: Vec<Vec3>,
}

impl FruchtermanReingold {
    pub fn new(config: FruchtermanConfig) -> Self {
        Self {
            config,
            iteration: 0,
            displacement: Vec::new(),
        }
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    fn temperature(&self) -> f32 {
        let progress = self.iteration as f32 / self.config.iterations.max(1) as f32;
        self.config.initial_temperature * (1.0 - progress).max(0.0)
    }
}

impl LayoutAlgorithm for FruchtermanReingold {
    fn name(&self) -> &'static str {
        "static"
    }

    fn on_start(&mut self, _frame: &LayoutFrame) {
        // A finished schedule restarts; an interrupted one picks up where it stopped.
        if self.iteration >= self.config.iterations {
            self.iteration = 0;
        }
    }

    fn step(&mut self, frame: &mut LayoutFrame) -> StepOutcome {
        if self.iteration >= self.config.iterations || frame.node_count() < 2 {
            self.iteration = self.config.iterations;
            return StepOutcome::Converged;
        }

        let k = self.config.ideal_distance.max(f32::EPSILON);
        let k2 = k * k;
        let n = frame.capacity();
        self.displacement.clear();
        self.displacement.resize(n, Vec3::ZERO);

        for i in 0..n {
            if !frame.present[i] {
                continue;
            }
            for j in (i + 1)..n {
                if !frame.present[j] {
                    continue;
                }
                let mut delta = frame.positions[i] - frame.positions[j];
                let mut distance = delta.length();
                if distance < 1e-4 {
                    // Coincident nodes: push apart along a deterministic axis.
                    delta = Vec3::new(1.0, (i % 3) as f32, (j % 5) as f32).normalize() * 1e-4;
                    distance = 1e-4;
                }
                let force = delta / distance * (k2 / distance);
                self.displacement[i] += force;
                self.displacement[j] -= force;
            }
        }

        for &(source, target, weight) in &frame.edges {
            let delta = frame.positions[source] - frame.positions[target];
            let distance = delta.length();
            if distance < 1e-4 {
                continue;
            }
            let force = delta / distance * (distance * distance / k) * weight.max(0.0);
            self.displacement[source] -= force;
            self.displacement[target] += force;
        }

        let temperature = self.temperature();
        for (i, displacement) in self.displacement.iter().enumerate() {
            if !frame.present[i] {
                continue;
            }
            let length = displacement.length();
            if length > 0.0 && length.is_finite() {
                frame.positions[i] += *displacement / length * length.min(temperature);
            }
        }
        frame.positions_dirty = true;

        self.iteration += 1;
        if self.iteration >= self.config.iterations {
            StepOutcome::Converged
        } else {
            StepOutcome::Continue
        }
    }

    fn reset(&mut self) {
        self.iteration = 0;
        self.displacement.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Graph, Node};

    fn frame_for(positions: &[Vec3], edges: &[(usize, usize)]) -> LayoutFrame {
        let mut graph = Graph::new();
        for p in positions {
            graph.add_node(Node::new(*p));
        }
        for &(s, t) in edges {
            graph.add_edge(s, t).unwrap();
        }
        LayoutFrame::capture(&graph)
    }

    #[test]
    fn test_converges_after_schedule() {
        let config = FruchtermanConfig {
            iterations: 20,
            ..Default::default()
        };
        let mut layout = FruchtermanReingold::new(config);
        let mut frame = frame_for(&[Vec3::ZERO, Vec3::X * 50.0, Vec3::Y * 50.0], &[(0, 1), (1, 2)]);

        let mut steps = 0;
        while layout.step(&mut frame) == StepOutcome::Continue {
            steps += 1;
            assert!(steps < 20);
        }
        assert_eq!(layout.iteration(), 20);
        assert!(frame.positions.iter().all(|p| p.is_finite()));

        layout.on_start(&frame);
        assert_eq!(layout.iteration(), 0);
    }

    #[test]
    fn test_connected_pair_contracts() {
        let mut layout = FruchtermanReingold::new(FruchtermanConfig::default());
        let mut frame = frame_for(&[Vec3::ZERO, Vec3::X * 200.0], &[(0, 1)]);
        let before = frame.positions[0].distance(frame.positions[1]);

        layout.step(&mut frame);
        let after = frame.positions[0].distance(frame.positions[1]);
        assert!(after < before);
        assert!(frame.positions_dirty);
    }

    #[test]
    fn test_coincident_nodes_separate() {
        let mut layout = FruchtermanReingold::new(FruchtermanConfig::default());
        let mut frame = frame_for(&[Vec3::ZERO, Vec3::ZERO], &[]);
        layout.step(&mut frame);
        assert!(frame.positions[0].distance(frame.positions[1]) > 0.0);
    }

    #[test]
    fn test_single_node_converges_immediately() {
        let mut layout = FruchtermanReingold::new(FruchtermanConfig::default());
        let mut frame = frame_for(&[Vec3::ONE], &[]);
        assert_eq!(layout.step(&mut frame), StepOutcome::Converged);
        assert!(!frame.positions_dirty);
    }
}
