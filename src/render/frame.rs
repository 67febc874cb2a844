//! Per-frame graph snapshot
//!
//! The lock is held only for the copy. Everything a frame draws or picks
//! reads the snapshot, never the store.

use crate::graph::{Graph, GraphStore};

pub struct FrameSynchronizer {
    store: GraphStore,
    snapshot: Graph,
    frames: u64,
}

impl FrameSynchronizer {
    pub fn new(store: GraphStore) -> Self {
        Self {
            store,
            snapshot: Graph::new(),
            frames: 0,
        }
    }

    /// Refresh the snapshot from the store and return it
    pub fn sync(&mut self) -> &Graph {
        self.store.copy_into(&mut self.snapshot);
        self.frames += 1;
        &self.snapshot
    }

    /// Snapshot taken by the last [`sync`](Self::sync)
    pub fn snapshot(&self) -> &Graph {
        &self.snapshot
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Node;
    use glam::Vec3;

    #[test]
    fn test_snapshot_independent_of_store() {
        let store = GraphStore::new();
        store.mutate(|g| {
            g.add_node(Node::new(Vec3::ZERO));
        });
        let mut sync = FrameSynchronizer::new(store.clone());
        let version = sync.sync().version();

        store.mutate(|g| {
            g.set_position(0, Vec3::ONE).unwrap();
            g.add_node(Node::new(Vec3::X));
        });
        assert_eq!(sync.snapshot().node_count(), 1);
        assert_eq!(sync.snapshot().position(0), Some(Vec3::ZERO));
        assert_eq!(sync.snapshot().version(), version);

        let snapshot = sync.sync();
        assert_eq!(snapshot.node_count(), 2);
        assert_eq!(snapshot.position(0), Some(Vec3::ONE));
        assert_eq!(sync.frames(), 2);
    }

    #[test]
    fn test_sync_does_not_hold_lock() {
        let store = GraphStore::new();
        let mut sync = FrameSynchronizer::new(store.clone());
        let _snapshot = sync.sync();
        // Store is free again after the copy.
        store.update();
        assert_eq!(store.version(), 1);
    }
}
