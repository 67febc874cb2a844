//! Background execution of a single layout algorithm
//!
//! Each iteration locks the store only to capture positions into a
//! [`LayoutFrame`], computes unlocked, then locks again to write the result.
//! An iteration is dropped if the topology or any node position changed while
//! it computed, so edits made through the store always win. Cancellation is cooperative: the worker checks its flag at every iteration
//! boundary.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use glam::Vec3;

use crate::graph::{Graph, GraphStore, NodeId};

/// Result of one algorithm iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Continue,
    Converged,
}

/// Working copy of the geometry a layout iteration operates on
///
/// Positions are indexed by node id; holes in the id range are marked absent
/// and never written back.
#[derive(Debug, Default)]
pub struct LayoutFrame {
    pub positions: Vec<Vec3>,
    pub present: Vec<bool>,
    /// `(source, target, weight)` per edge, in graph order, self-loops included
    pub edges: Vec<(NodeId, NodeId, f32)>,
    /// Bundled control points per edge, written back when `paths_dirty`
    pub paths: Vec<Vec<Vec3>>,
    pub positions_dirty: bool,
    pub paths_dirty: bool,
    /// Positions as read from the graph, before the step moved them
    captured: Vec<Vec3>,
    structure_version: u64,
}

impl LayoutFrame {
    pub fn capture(graph: &Graph) -> Self {
        let mut frame = Self::default();
        frame.refresh(graph);
        frame
    }

    /// Re-read geometry from the graph, reusing buffers
    pub fn refresh(&mut self, graph: &Graph) {
        let capacity = graph.node_capacity();
        self.positions.clear();
        self.positions.resize(capacity, Vec3::ZERO);
        self.present.clear();
        self.present.resize(capacity, false);
        for (id, node) in graph.nodes() {
            self.positions[id] = node.position;
            self.present[id] = true;
        }
        self.captured.clone_from(&self.positions);

        self.edges.clear();
        self.edges
            .extend(graph.edges().iter().map(|e| (e.source, e.target, e.weight)));

        self.positions_dirty = false;
        self.paths_dirty = false;
        self.structure_version = graph.structure_version();
    }

    /// Write results back
    ///
    /// Returns false without touching the graph when the topology changed or
    /// a node was moved since capture.
    pub fn apply(&mut self, graph: &mut Graph) -> bool {
        if graph.structure_version() != self.structure_version {
            return false;
        }
        if self.is_stale(graph) {
            log::debug!("Layout iteration dropped, positions edited during step");
            return false;
        }
        if self.positions_dirty {
            for (id, position) in self.positions.iter().enumerate() {
                if self.present[id] {
                    if let Some(node) = graph.node_mut(id) {
                        node.position = *position;
                    }
                }
            }
        }
        if self.paths_dirty {
            graph.set_edge_paths(std::mem::take(&mut self.paths));
        }
        self.positions_dirty || self.paths_dirty
    }

    fn is_stale(&self, graph: &Graph) -> bool {
        self.captured
            .iter()
            .enumerate()
            .any(|(id, captured)| self.present[id] && graph.position(id) != Some(*captured))
    }

    pub fn node_count(&self) -> usize {
        self.present.iter().filter(|p| **p).count()
    }

    pub fn capacity(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_count() == 0
    }
}

/// An iterative layout or edge-routing algorithm
///
/// Working buffers (velocities, schedules) live in the implementor and
/// survive stop/start; only [`reset`](Self::reset) clears them.
pub trait LayoutAlgorithm: Send {
    fn name(&self) -> &'static str;

    /// Perform one iteration on the frame
    fn step(&mut self, frame: &mut LayoutFrame) -> StepOutcome;

    /// Called on the worker thread before the first iteration of a run
    fn on_start(&mut self, _frame: &LayoutFrame) {}

    /// Drop all working state
    fn reset(&mut self);
}

type SharedAlgorithm = Arc<Mutex<Box<dyn LayoutAlgorithm>>>;

fn lock_algorithm(algorithm: &SharedAlgorithm) -> MutexGuard<'_, Box<dyn LayoutAlgorithm>> {
    match algorithm.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Owns the worker thread of one algorithm
pub struct LayoutRunner {
    store: GraphStore,
    algorithm: SharedAlgorithm,
    name: &'static str,
    cancel: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    converged: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    interval: Duration,
    generation: u64,
}

impl LayoutRunner {
    pub fn new(store: GraphStore, algorithm: Box<dyn LayoutAlgorithm>, interval: Duration) -> Self {
        let name = algorithm.name();
        Self {
            store,
            algorithm: Arc::new(Mutex::new(algorithm)),
            name,
            cancel: Arc::new(AtomicBool::new(false)),
            running: Arc::new(AtomicBool::new(false)),
            converged: Arc::new(AtomicBool::new(false)),
            handle: None,
            interval,
            generation: 0,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Spawn the worker unless one is already running
    ///
    /// Returns true if a new worker was started.
    pub fn start(&mut self) -> bool {
        if self.is_running() {
            return false;
        }
        self.reap();

        self.cancel.store(false, Ordering::SeqCst);
        self.converged.store(false, Ordering::SeqCst);
        self.running.store(true, Ordering::SeqCst);

        let store = self.store.clone();
        let algorithm = Arc::clone(&self.algorithm);
        let cancel = Arc::clone(&self.cancel);
        let running = Arc::clone(&self.running);
        let converged = Arc::clone(&self.converged);
        let interval = self.interval;
        let name = self.name;

        let spawned = thread::Builder::new()
            .name(format!("layout-{name}"))
            .spawn(move || {
                run_worker(&store, &algorithm, &cancel, &converged, interval);
                running.store(false, Ordering::SeqCst);
                log::debug!("{name} layout worker exited");
            });

        match spawned {
            Ok(handle) => {
                self.handle = Some(handle);
                self.generation += 1;
                log::debug!("{} layout started", self.name);
                true
            }
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                log::error!("Failed to spawn {} layout thread: {}", self.name, e);
                false
            }
        }
    }

    /// Cancel the worker and wait for it; safe to call when stopped
    pub fn stop(&mut self) {
        self.cancel.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("{} layout thread panicked", self.name);
            }
            log::debug!("{} layout stopped", self.name);
        }
        self.running.store(false, Ordering::SeqCst);
    }

    fn reap(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// True once after the algorithm reports convergence
    pub fn take_converged(&self) -> bool {
        self.converged.swap(false, Ordering::SeqCst)
    }

    /// Number of worker threads spawned so far
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Clear the algorithm's working state; stops the worker first
    pub fn reset(&mut self) {
        self.stop();
        lock_algorithm(&self.algorithm).reset();
    }

    /// Run a closure against the algorithm while no iteration is in progress
    pub fn with_algorithm<R>(&self, f: impl FnOnce(&mut dyn LayoutAlgorithm) -> R) -> R {
        let mut algorithm = lock_algorithm(&self.algorithm);
        f(algorithm.as_mut())
    }
}

impl Drop for LayoutRunner {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_worker(
    store: &GraphStore,
    algorithm: &SharedAlgorithm,
    cancel: &AtomicBool,
    converged: &AtomicBool,
    interval: Duration,
) {
    let mut frame = LayoutFrame::capture(&store.lock());
    lock_algorithm(algorithm).on_start(&frame);

    while !cancel.load(Ordering::SeqCst) {
        store.copy_frame(&mut frame);

        let outcome = lock_algorithm(algorithm).step(&mut frame);

        {
            let mut graph = store.lock();
            if frame.apply(&mut graph) {
                graph.bump_version();
            }
        }

        if outcome == StepOutcome::Converged {
            converged.store(true, Ordering::SeqCst);
            break;
        }
        if !interval.is_zero() {
            thread::sleep(interval);
        }
    }
}

impl GraphStore {
    /// Capture geometry for a layout iteration
    pub(crate) fn copy_frame(&self, frame: &mut LayoutFrame) {
        let graph = self.lock();
        frame.refresh(&graph);
    }
}
