//! Viewer state and the entry points the GUI calls
//!
//! The viewer owns the display toggles, the selection and the navigation
//! transform. Every toggle that changes what is drawn bumps the graph version
//! so compiled geometry is rebuilt on the next frame.

use glam::{Quat, Vec3};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::ViewerConfig;
use crate::constants::layout::RANDOMIZE_EXTENT;
use crate::constants::scale::DEFAULT_DISPLAY_RADIUS;
use crate::error::GraphError;
use crate::graph::{Graph, GraphStore, NodeId};
use crate::layout::{LayoutEngine, LayoutKind};
use crate::picking::{InputDevice, PickingEngine};
use crate::render::{
    draw_frame, DrawContext, DrawList, FrameDraw, FrameSynchronizer, NavTransform, RenderResourceCache,
    SceneScale, Selection, ViewOptions,
};

pub struct Viewer {
    store: GraphStore,
    layout: LayoutEngine,
    frames: FrameSynchronizer,
    picking: PickingEngine,
    options: ViewOptions,
    /// Layout kind chosen by the user; restored on every layout reset
    layout_kind: LayoutKind,
    selection: Selection,
    predecessors: Vec<NodeId>,
    scale: SceneScale,
    nav: NavTransform,
    display_radius: f32,
    overlay: DrawList,
    rng: StdRng,
}

impl Viewer {
    pub fn new(config: &ViewerConfig) -> Self {
        let store = GraphStore::new();
        let scale = SceneScale::default();
        Self {
            layout: LayoutEngine::new(store.clone(), &config.layout),
            frames: FrameSynchronizer::new(store.clone()),
            picking: PickingEngine::new(scale.node_radius, &config.picking),
            store,
            options: config.view.clone(),
            layout_kind: config.layout.kind,
            selection: Selection::default(),
            predecessors: Vec::new(),
            scale,
            nav: NavTransform::IDENTITY,
            display_radius: config.display_radius.unwrap_or(DEFAULT_DISPLAY_RADIUS),
            overlay: DrawList::new(),
            rng: StdRng::from_os_rng(),
        }
    }

    /// Make position randomization reproducible
    pub fn seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn layout(&self) -> &LayoutEngine {
        &self.layout
    }

    pub fn options(&self) -> &ViewOptions {
        &self.options
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn scale(&self) -> &SceneScale {
        &self.scale
    }

    pub fn nav(&self) -> &NavTransform {
        &self.nav
    }

    /// Rotate the graph about the display center
    ///
    /// Navigation only moves the per-frame pass, so compiled geometry stays.
    pub fn rotate_view(&mut self, rotation: Quat) {
        self.nav.rotate(rotation);
    }

    /// Scale the graph about the display center; non-positive factors are ignored
    pub fn zoom_view(&mut self, factor: f32) {
        self.nav.zoom(factor);
    }

    pub fn snapshot(&self) -> &Graph {
        self.frames.snapshot()
    }

    // --- graph lifecycle ---

    /// Install a freshly loaded graph
    ///
    /// With `explicit_positions` the file's coordinates are kept and layout
    /// never runs for this graph.
    pub fn load_graph(&mut self, graph: Graph, explicit_positions: bool) {
        self.clear();
        self.store.replace(graph);
        let components = self.store.mutate(Graph::assign_components);
        log::info!(
            "Loaded graph: {} nodes, {} edges, {} components",
            self.store.read(Graph::node_count),
            self.store.read(Graph::edge_count),
            components
        );
        self.layout.set_skip_layout(explicit_positions);
        self.reset_navigation();
        self.reset_layout(true);
    }

    /// Stop layout, empty the graph and reset every toggle and selection
    pub fn clear(&mut self) {
        self.layout.stop();
        self.store.clear();
        self.options.bundling = false;
        self.options.component_filter = false;
        self.options.shortest_path = false;
        self.options.spanning_tree = false;
        self.selection.clear();
        self.predecessors.clear();
    }

    // --- layout ---

    pub fn start(&mut self) {
        if self.store.read(Graph::is_empty) {
            log::debug!("Empty graph, layout not started");
            return;
        }
        self.layout.start();
    }

    pub fn stop(&mut self) {
        self.layout.stop();
    }

    pub fn resume(&mut self) {
        if !self.store.read(Graph::is_empty) {
            self.layout.resume();
        }
    }

    pub fn set_layout_kind(&mut self, kind: LayoutKind) {
        if kind == LayoutKind::Dynamic && self.options.bundling {
            self.layout.stop_bundling();
            self.options.bundling = false;
            self.store.mutate(Graph::clear_edge_paths);
        }
        self.layout_kind = kind;
        self.layout.set_active(kind);
    }

    /// Scramble positions and lay the graph out again
    ///
    /// With `watch`, the view is refitted to the scrambled graph before the
    /// layout starts so the user sees it unfold without a jump.
    pub fn reset_layout(&mut self, watch: bool) {
        self.layout.stop();
        if self.options.bundling {
            self.options.bundling = false;
            self.store.mutate(Graph::clear_edge_paths);
        }
        self.layout.set_active(self.layout_kind);

        if self.layout.skip_layout() || self.store.read(Graph::is_empty) {
            return;
        }

        let rng = &mut self.rng;
        self.store
            .mutate(|graph| graph.randomize_positions(RANDOMIZE_EXTENT, rng));
        self.layout.reset_working_state();
        if watch {
            self.reset_navigation();
        }
        self.layout.start();
    }

    /// Recenter the graph at the origin and refit scale and navigation
    pub fn reset_navigation(&mut self) {
        let was_running = self.layout.is_running();
        self.layout.stop();

        let radius = self.store.mutate(|graph| {
            let (center, radius) = graph.locate();
            graph.move_nodes(-center);
            radius
        });
        self.scale = SceneScale::from_radius(radius);
        self.picking.set_node_radius(self.scale.node_radius);
        self.nav = NavTransform::fit_sphere(Vec3::ZERO, radius, self.display_radius);
        log::debug!("Navigation reset: radius {:.3}, node radius {:.4}", radius, self.scale.node_radius);

        if was_running {
            self.resume();
        }
    }

    /// Route edges into bundles, or drop the bundles and resume layout
    pub fn set_bundling(&mut self, enabled: bool) {
        self.options.bundling = enabled;
        if enabled {
            if self.store.read(Graph::is_empty) {
                return;
            }
            self.layout.start_bundling();
        } else {
            self.layout.stop_bundling();
            self.store.mutate(Graph::clear_edge_paths);
            self.resume();
        }
    }

    // --- display toggles ---

    pub fn set_component_filter(&mut self, enabled: bool) {
        self.options.component_filter = enabled;
        if enabled {
            self.store.mutate(Graph::assign_components);
        }
        self.store.update();
        self.reset_layout(true);
    }

    pub fn set_labels(&mut self, enabled: bool) {
        self.options.labels = enabled;
        self.store.update();
    }

    pub fn set_edge_labels(&mut self, enabled: bool) {
        self.options.edge_labels = enabled;
        self.store.update();
    }

    pub fn set_arrows(&mut self, enabled: bool) {
        self.options.arrows = enabled;
        self.store.update();
    }

    /// Overlay the path from the previous to the selected node
    ///
    /// Shares the predecessor tree with the spanning tree overlay, so turning
    /// one on turns the other off.
    pub fn set_shortest_path(&mut self, enabled: bool) {
        self.options.shortest_path = enabled;
        if enabled {
            self.options.spanning_tree = false;
            self.recompute_shortest_path();
        }
        self.store.update();
    }

    pub fn set_spanning_tree(&mut self, enabled: bool) {
        self.options.spanning_tree = enabled;
        if enabled {
            self.options.shortest_path = false;
            self.recompute_spanning_tree();
        }
        self.store.update();
    }

    fn recompute_shortest_path(&mut self) {
        match (self.selection.previous, self.selection.selected) {
            (Some(previous), Some(_)) => {
                self.predecessors = self.store.read(|graph| graph.shortest_path_tree(previous));
            }
            _ => {
                log::debug!("Shortest path needs a selected and a previous node");
                self.options.shortest_path = false;
                self.predecessors.clear();
            }
        }
    }

    fn recompute_spanning_tree(&mut self) {
        let root = self.selection.selected;
        self.predecessors = self.store.read(|graph| graph.spanning_tree(root));
    }

    // --- selection ---

    /// Select a node; the current selection becomes the previous one
    pub fn set_selected_node(&mut self, id: NodeId) -> Result<(), GraphError> {
        if !self.store.read(|graph| graph.is_valid_node(id)) {
            log::warn!("Ignoring selection of invalid node {}", id);
            return Err(GraphError::InvalidNode(id));
        }
        self.selection.previous = self.selection.selected;
        self.selection.selected = Some(id);

        if self.options.shortest_path {
            self.recompute_shortest_path();
        } else if self.options.spanning_tree {
            self.recompute_spanning_tree();
        }
        self.store.update();
        Ok(())
    }

    /// Set the hovered node; bumps the version only when it changes
    pub fn set_highlighted_node(&mut self, id: Option<NodeId>) {
        let id = id.filter(|id| self.store.read(|graph| graph.is_valid_node(*id)));
        if self.selection.highlighted != id {
            self.selection.highlighted = id;
            self.store.update();
        }
    }

    pub fn clear_selections(&mut self) {
        self.selection.clear();
        self.predecessors.clear();
        self.options.shortest_path = false;
        self.store.update();
    }

    // --- frame ---

    /// Snapshot the graph for this frame
    ///
    /// A static layout that finished since the last frame is recentered first.
    pub fn begin_frame(&mut self) -> &Graph {
        if self.layout.take_static_converged() {
            log::info!("Static layout finished, recentering");
            self.reset_navigation();
        }
        let snapshot = self.frames.sync();
        self.selection.retain_valid(snapshot);
        snapshot
    }

    /// Build this frame's draw lists from the last snapshot
    pub fn draw<'a>(&'a mut self, cache: &'a mut RenderResourceCache) -> FrameDraw<'a> {
        let ctx = DrawContext {
            options: &self.options,
            selection: &self.selection,
            scale: &self.scale,
            nav: &self.nav,
            predecessors: &self.predecessors,
        };
        draw_frame(self.frames.snapshot(), &ctx, cache, &mut self.overlay)
    }

    /// Node under the device in the last snapshot
    pub fn pick(&self, device: &dyn InputDevice) -> Option<NodeId> {
        self.picking
            .select_device(self.frames.snapshot(), device, &self.nav)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Node;
    use crate::layout::FruchtermanConfig;
    use crate::picking::{RayDevice, TrackedDevice};
    use crate::render::resources::tests::stub_cache;
    use crate::render::GeometryCache;
    use std::thread;
    use std::time::Duration;

    fn chain(n: usize) -> Graph {
        let mut graph = Graph::new();
        for i in 0..n {
            graph.add_node(Node::new(Vec3::new(i as f32 * 10.0, 0.0, 0.0)));
        }
        for i in 1..n {
            graph.add_edge(i - 1, i).unwrap();
        }
        graph
    }

    fn viewer() -> Viewer {
        let mut config = ViewerConfig::default();
        config.layout.step_interval_ms = 1;
        let mut viewer = Viewer::new(&config);
        viewer.seed(11);
        viewer
    }

    #[test]
    fn test_explicit_positions_skip_layout() {
        let mut viewer = viewer();
        viewer.load_graph(chain(3), true);

        assert!(viewer.layout().is_stopped());
        let (center, radius) = viewer.store().read(Graph::locate);
        assert!(center.length() < 1e-5);
        assert!((radius - 10.0).abs() < 1e-5);
        assert!((viewer.scale().node_radius - 0.125).abs() < 1e-6);
        assert_eq!(viewer.store().read(|g| g.position(0)), Some(Vec3::new(-10.0, 0.0, 0.0)));
    }

    #[test]
    fn test_load_starts_dynamic_layout() {
        let mut viewer = viewer();
        viewer.load_graph(chain(4), false);
        assert!(viewer.layout().is_running_kind(LayoutKind::Dynamic));

        viewer.stop();
        assert!(viewer.layout().is_stopped());
    }

    #[test]
    fn test_empty_graph_never_starts_layout() {
        let mut viewer = viewer();
        viewer.load_graph(Graph::new(), false);
        viewer.start();
        viewer.resume();
        assert!(viewer.layout().is_stopped());
        viewer.set_bundling(true);
        assert!(!viewer.layout().is_bundling());
    }

    #[test]
    fn test_invalid_selection_rejected() {
        let mut viewer = viewer();
        viewer.load_graph(chain(3), true);
        viewer.set_selected_node(1).unwrap();
        let version = viewer.store().version();

        assert_eq!(viewer.set_selected_node(9), Err(GraphError::InvalidNode(9)));
        assert_eq!(viewer.selection().selected, Some(1));
        assert_eq!(viewer.store().version(), version);

        viewer.set_selected_node(2).unwrap();
        assert_eq!(viewer.selection().previous, Some(1));
        assert_eq!(viewer.selection().selected, Some(2));
    }

    #[test]
    fn test_highlight_bumps_only_on_change() {
        let mut viewer = viewer();
        viewer.load_graph(chain(2), true);
        let version = viewer.store().version();

        viewer.set_highlighted_node(Some(0));
        assert_eq!(viewer.store().version(), version + 1);
        viewer.set_highlighted_node(Some(0));
        assert_eq!(viewer.store().version(), version + 1);
        viewer.set_highlighted_node(Some(42));
        assert_eq!(viewer.selection().highlighted, None);
    }

    #[test]
    fn test_shortest_path_needs_two_nodes() {
        let mut viewer = viewer();
        viewer.load_graph(chain(4), true);
        viewer.set_shortest_path(true);
        assert!(!viewer.options().shortest_path);

        viewer.set_selected_node(0).unwrap();
        viewer.set_selected_node(3).unwrap();
        viewer.set_shortest_path(true);
        assert!(viewer.options().shortest_path);

        viewer.begin_frame();
        let (textures, _) = stub_cache(1, true);
        let mut cache = RenderResourceCache {
            textures,
            geometry: GeometryCache::new(),
        };
        let frame = viewer.draw(&mut cache);
        assert_eq!(frame.overlay.edges.len(), 3);
    }

    #[test]
    fn test_clear_resets_toggles() {
        let mut viewer = viewer();
        viewer.load_graph(chain(3), true);
        viewer.set_selected_node(0).unwrap();
        viewer.set_selected_node(2).unwrap();
        viewer.set_spanning_tree(true);
        let version = viewer.store().version();

        viewer.clear();
        assert!(viewer.store().version() > version);
        assert_eq!(viewer.store().read(Graph::node_count), 0);
        assert!(!viewer.options().spanning_tree);
        assert_eq!(viewer.selection(), Selection::default());
    }

    #[test]
    fn test_dynamic_kind_turns_bundling_off() {
        let mut viewer = viewer();
        viewer.load_graph(chain(3), true);
        viewer.set_layout_kind(LayoutKind::Static);
        viewer.set_bundling(true);
        assert!(viewer.options().bundling);

        viewer.set_layout_kind(LayoutKind::Dynamic);
        assert!(!viewer.options().bundling);
        assert!(!viewer.layout().is_bundling());
    }

    #[test]
    fn test_static_completion_recenters() {
        let mut config = ViewerConfig::default();
        config.layout.kind = LayoutKind::Static;
        config.layout.step_interval_ms = 0;
        config.layout.static_layout = FruchtermanConfig {
            iterations: 10,
            ..Default::default()
        };
        let mut viewer = Viewer::new(&config);
        viewer.seed(3);
        viewer.load_graph(chain(5), false);

        for _ in 0..500 {
            if !viewer.layout().is_running_kind(LayoutKind::Static) {
                break;
            }
            thread::sleep(Duration::from_millis(2));
        }
        let snapshot = viewer.begin_frame();
        let (center, _) = snapshot.locate();
        assert!(center.length() < 1e-3);
        assert!(viewer.layout().is_stopped());
    }

    #[test]
    fn test_pick_uses_snapshot() {
        let mut viewer = viewer();
        viewer.load_graph(chain(3), true);
        assert_eq!(viewer.pick(&TrackedDevice { position: Vec3::ZERO }), None);

        viewer.begin_frame();
        // Middle node sits at the physical origin.
        assert_eq!(viewer.pick(&TrackedDevice { position: Vec3::ZERO }), Some(1));

        let ray = RayDevice {
            origin: Vec3::new(-20.0, 0.0, 50.0),
            direction: Vec3::new(0.0, 0.0, -1.0),
        };
        assert_eq!(viewer.pick(&ray), Some(0));
    }

    #[test]
    fn test_navigation_moves_pick_target() {
        let mut viewer = viewer();
        viewer.load_graph(chain(3), true);
        viewer.begin_frame();
        // Node 0 starts at physical (-20, 0, 0).
        viewer.rotate_view(Quat::from_rotation_z(std::f32::consts::FRAC_PI_2));
        viewer.zoom_view(0.5);
        viewer.zoom_view(-3.0);

        assert!((viewer.nav().scale - 1.0).abs() < 1e-5);
        let target = Vec3::new(0.0, -10.0, 0.0);
        assert!(viewer.nav().transform_point(Vec3::new(-10.0, 0.0, 0.0)).distance(target) < 1e-4);
        assert_eq!(viewer.pick(&TrackedDevice { position: target }), Some(0));
        assert_eq!(viewer.pick(&TrackedDevice { position: Vec3::new(-20.0, 0.0, 0.0) }), None);
    }

    #[test]
    fn test_component_filter_refits_view() {
        let mut viewer = viewer();
        viewer.load_graph(chain(4), false);
        viewer.rotate_view(Quat::from_rotation_y(1.0));

        viewer.set_component_filter(true);
        assert_eq!(viewer.nav().rotation, Quat::IDENTITY);
        assert_eq!(viewer.nav().translation, Vec3::ZERO);
        viewer.stop();
    }

    #[test]
    fn test_draw_reuses_compiled_geometry() {
        let mut viewer = viewer();
        viewer.load_graph(chain(3), true);
        let (textures, _) = stub_cache(4, true);
        let mut cache = RenderResourceCache {
            textures,
            geometry: GeometryCache::new(),
        };

        viewer.begin_frame();
        assert_eq!(viewer.draw(&mut cache).compiled.shapes.len(), 3);
        viewer.begin_frame();
        viewer.draw(&mut cache);
        assert_eq!(cache.geometry.rebuilds(), 1);

        viewer.set_labels(true);
        viewer.begin_frame();
        viewer.draw(&mut cache);
        assert_eq!(cache.geometry.rebuilds(), 2);
    }
}
