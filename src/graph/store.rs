//! Shared, lock-guarded graph
//!
//! One store is shared by the layout threads, the render loop and the
//! interaction handlers. Every batch of edits made through [`GraphStore::mutate`]
//! bumps the version exactly once, so the render side sees either none or all
//! of a batch.

use std::sync::{Arc, Mutex, MutexGuard};

use super::model::Graph;

#[derive(Debug, Clone, Default)]
pub struct GraphStore {
    inner: Arc<Mutex<Graph>>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_graph(graph: Graph) -> Self {
        Self {
            inner: Arc::new(Mutex::new(graph)),
        }
    }

    /// Acquire the graph lock
    ///
    /// A panic on another thread while holding the lock leaves the graph in
    /// whatever state the last completed edit produced; we keep using it.
    pub fn lock(&self) -> MutexGuard<'_, Graph> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("graph lock poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Apply a batch of edits and bump the version once
    pub fn mutate<R>(&self, edit: impl FnOnce(&mut Graph) -> R) -> R {
        let mut graph = self.lock();
        let result = edit(&mut graph);
        graph.bump_version();
        result
    }

    /// Read under the lock without changing the version
    pub fn read<R>(&self, query: impl FnOnce(&Graph) -> R) -> R {
        let graph = self.lock();
        query(&graph)
    }

    /// Remove all nodes and edges
    pub fn clear(&self) {
        self.mutate(Graph::clear);
    }

    /// Mark the graph changed without editing it
    pub fn update(&self) {
        self.lock().bump_version();
    }

    /// Swap in a new graph, keeping both counters strictly increasing
    pub fn replace(&self, mut graph: Graph) {
        let mut current = self.lock();
        graph.inherit_versions(&current);
        graph.bump_version();
        *current = graph;
    }

    /// Copy the graph into `target`, reusing its allocations
    pub fn copy_into(&self, target: &mut Graph) {
        let graph = self.lock();
        target.clone_from(&graph);
    }

    pub fn version(&self) -> u64 {
        self.lock().version()
    }

    pub fn structure_version(&self) -> u64 {
        self.lock().structure_version()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Node;
    use glam::Vec3;
    use std::thread;

    #[test]
    fn test_mutate_bumps_once() {
        let store = GraphStore::new();
        let before = store.version();
        store.mutate(|graph| {
            for i in 0..10 {
                graph.add_node(Node::new(Vec3::splat(i as f32)));
            }
        });
        assert_eq!(store.version(), before + 1);
        assert_eq!(store.read(Graph::node_count), 10);
    }

    #[test]
    fn test_clear_bumps_version() {
        let store = GraphStore::new();
        store.mutate(|graph| {
            let a = graph.add_node(Node::new(Vec3::ZERO));
            let b = graph.add_node(Node::new(Vec3::X));
            graph.add_edge(a, b).unwrap();
        });
        let before = store.version();

        store.clear();
        assert!(store.version() > before);
        assert_eq!(store.read(Graph::node_count), 0);
        assert_eq!(store.read(Graph::edge_count), 0);
    }

    #[test]
    fn test_replace_keeps_versions_increasing() {
        let store = GraphStore::new();
        store.update();
        store.update();
        let version = store.version();
        let structure = store.structure_version();

        let mut fresh = Graph::new();
        fresh.add_node(Node::new(Vec3::ZERO));
        store.replace(fresh);

        assert!(store.version() > version);
        assert!(store.structure_version() > structure);
    }

    #[test]
    fn test_concurrent_batches_are_atomic() {
        let store = GraphStore::new();
        let writer = store.clone();
        let handle = thread::spawn(move || {
            for _ in 0..200 {
                writer.mutate(|graph| {
                    graph.add_node(Node::new(Vec3::ZERO));
                    graph.add_node(Node::new(Vec3::ONE));
                });
            }
        });

        let mut snapshot = Graph::new();
        for _ in 0..200 {
            store.copy_into(&mut snapshot);
            assert_eq!(snapshot.node_count() % 2, 0);
        }
        handle.join().unwrap();
        assert_eq!(store.read(Graph::node_count), 400);
    }
}
