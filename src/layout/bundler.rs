//! Force-directed edge bundling
//!
//! Each edge is subdivided into control points. Points are held in line by
//! springs along their own edge and pulled toward the matching point of every
//! compatible edge. Node positions are never touched; the result is written
//! to the graph as per-edge paths.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::runner::{LayoutAlgorithm, LayoutFrame, StepOutcome};
use crate::constants::layout::DEFAULT_BUNDLE_SUBDIVISIONS;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BundlerConfig {
    /// Interior control points per edge
    pub subdivisions: usize,
    pub iterations: u32,
    /// Spring constant holding points along their own edge
    pub stiffness: f32,
    /// Displacement scale at the first iteration
    pub step_size: f32,
    /// Edge pairs below this compatibility do not attract
    pub compatibility_threshold: f32,
}

impl Default for BundlerConfig {
    fn default() -> Self {
        Self {
            subdivisions: DEFAULT_BUNDLE_SUBDIVISIONS,
            iterations: 120,
            stiffness: 0.1,
            step_size: 0.5,
            compatibility_threshold: 0.6,
        }
    }
}

pub struct EdgeBundler {
    config: BundlerConfig,
    iteration: u32,
    paths: Vec<Vec<Vec3>>,
    next: Vec<Vec<Vec3>>,
}

impl EdgeBundler {
    pub fn new(config: BundlerConfig) -> Self {
        Self {
            config,
            iteration: 0,
            paths: Vec::new(),
            next: Vec::new(),
        }
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    fn straighten(&mut self, frame: &LayoutFrame) {
        let points = self.config.subdivisions + 2;
        self.paths.clear();
        for &(source, target, _) in &frame.edges {
            let a = frame.positions[source];
            let b = frame.positions[target];
            self.paths.push(
                (0..points)
                    .map(|i| a.lerp(b, i as f32 / (points - 1) as f32))
                    .collect(),
            );
        }
    }

    /// Angle, scale and position compatibility of two edges, in [0, 1]
    fn compatibility(a: (Vec3, Vec3), b: (Vec3, Vec3)) -> f32 {
        let pa = a.1 - a.0;
        let pb = b.1 - b.0;
        let la = pa.length();
        let lb = pb.length();
        if la < f32::EPSILON || lb < f32::EPSILON {
            return 0.0;
        }
        let angle = (pa.dot(pb) / (la * lb)).abs();
        let average = (la + lb) * 0.5;
        let scale = 2.0 / (average / la.min(lb) + la.max(lb) / average);
        let midpoint_distance = ((a.0 + a.1) - (b.0 + b.1)).length() * 0.5;
        let position = average / (average + midpoint_distance);
        angle * scale * position
    }
}

impl LayoutAlgorithm for EdgeBundler {
    fn name(&self) -> &'static str {
        "bundler"
    }

    fn on_start(&mut self, frame: &LayoutFrame) {
        self.iteration = 0;
        self.straighten(frame);
    }

    fn step(&mut self, frame: &mut LayoutFrame) -> StepOutcome {
        if frame.edges.is_empty() || self.iteration >= self.config.iterations {
            return StepOutcome::Converged;
        }
        if self.paths.len() != frame.edges.len() {
            self.straighten(frame);
        }

        let endpoints: Vec<(Vec3, Vec3)> = frame
            .edges
            .iter()
            .map(|&(s, t, _)| (frame.positions[s], frame.positions[t]))
            .collect();
        let m = endpoints.len();
        let mut compatible: Vec<Vec<(usize, f32)>> = vec![Vec::new(); m];
        for i in 0..m {
            for j in (i + 1)..m {
                let c = Self::compatibility(endpoints[i], endpoints[j]);
                if c >= self.config.compatibility_threshold {
                    compatible[i].push((j, c));
                    compatible[j].push((i, c));
                }
            }
        }

        let progress = self.iteration as f32 / self.config.iterations.max(1) as f32;
        let step = self.config.step_size * (1.0 - progress);
        let segments = (self.config.subdivisions + 1) as f32;

        self.next.clone_from(&self.paths);
        for (e, path) in self.paths.iter().enumerate() {
            let last = path.len() - 1;
            let next = &mut self.next[e];
            next[0] = endpoints[e].0;
            next[last] = endpoints[e].1;

            let length = endpoints[e].0.distance(endpoints[e].1);
            if length < f32::EPSILON {
                continue;
            }
            let spring = self.config.stiffness / (length * segments);

            for i in 1..last {
                let point = path[i];
                let mut force = (path[i - 1] + path[i + 1] - 2.0 * point) * spring * length;
                for &(other, weight) in &compatible[e] {
                    let delta = self.paths[other][i] - point;
                    let distance = delta.length();
                    if distance > 1e-4 {
                        force += delta / distance * weight;
                    }
                }
                let displacement = force * step;
                next[i] = point + displacement.clamp_length_max(length / segments);
            }
        }
        std::mem::swap(&mut self.paths, &mut self.next);

        frame.paths.clone_from(&self.paths);
        frame.paths_dirty = true;

        self.iteration += 1;
        if self.iteration >= self.config.iterations {
            StepOutcome::Converged
        } else {
            StepOutcome::Continue
        }
    }

    fn reset(&mut self) {
        self.iteration = 0;
        self.paths.clear();
        self.next.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Graph, Node};

    fn parallel_edges() -> (Graph, LayoutFrame) {
        let mut graph = Graph::new();
        graph.add_node(Node::new(Vec3::new(0.0, 0.0, 0.0)));
        graph.add_node(Node::new(Vec3::new(100.0, 0.0, 0.0)));
        graph.add_node(Node::new(Vec3::new(0.0, 10.0, 0.0)));
        graph.add_node(Node::new(Vec3::new(100.0, 10.0, 0.0)));
        graph.add_edge(0, 1).unwrap();
        graph.add_edge(2, 3).unwrap();
        let frame = LayoutFrame::capture(&graph);
        (graph, frame)
    }

    #[test]
    fn test_paths_keep_endpoints() {
        let (graph, mut frame) = parallel_edges();
        let mut bundler = EdgeBundler::new(BundlerConfig::default());
        bundler.on_start(&frame);
        bundler.step(&mut frame);

        assert_eq!(frame.paths.len(), 2);
        assert_eq!(frame.paths[0].len(), DEFAULT_BUNDLE_SUBDIVISIONS + 2);
        assert_eq!(frame.paths[0][0], graph.position(0).unwrap());
        assert_eq!(*frame.paths[1].last().unwrap(), graph.position(3).unwrap());
        assert!(!frame.positions_dirty);
    }

    #[test]
    fn test_parallel_edges_pull_together() {
        let (_, mut frame) = parallel_edges();
        let mut bundler = EdgeBundler::new(BundlerConfig {
            iterations: 30,
            ..Default::default()
        });
        bundler.on_start(&frame);
        while bundler.step(&mut frame) == StepOutcome::Continue {}

        let middle = DEFAULT_BUNDLE_SUBDIVISIONS / 2;
        let gap = frame.paths[0][middle].distance(frame.paths[1][middle]);
        assert!(gap < 10.0);
        assert_eq!(bundler.iteration(), 30);
    }

    #[test]
    fn test_no_edges_converges() {
        let mut graph = Graph::new();
        graph.add_node(Node::new(Vec3::ZERO));
        let mut frame = LayoutFrame::capture(&graph);
        let mut bundler = EdgeBundler::new(BundlerConfig::default());
        assert_eq!(bundler.step(&mut frame), StepOutcome::Converged);
        assert!(!frame.paths_dirty);
    }
}
