//! Draw-list construction from a graph snapshot
//!
//! The compiled pass holds everything whose appearance depends only on the
//! graph version. The per-frame pass holds camera-aligned image nodes, labels
//! and algorithm overlays.

use std::collections::HashSet;

use glam::{Quat, Vec3};

use crate::constants::scale::NODE_LABEL_OFFSET;
use crate::graph::{path_to_root, Edge, EdgeId, Graph, MaterialId, Node, NodeId, TextureMode};
use crate::render::camera::NavTransform;
use crate::render::instance::DrawList;
use crate::render::resources::{RenderResourceCache, TextureCache};
use crate::render::scene::{SceneScale, Selection, ViewOptions};

/// Everything besides the graph that shapes a frame
#[derive(Debug, Clone, Copy)]
pub struct DrawContext<'a> {
    pub options: &'a ViewOptions,
    pub selection: &'a Selection,
    pub scale: &'a SceneScale,
    pub nav: &'a NavTransform,
    /// Predecessor tree for the path and spanning tree overlays
    pub predecessors: &'a [NodeId],
}

/// Draw lists for one frame
#[derive(Debug)]
pub struct FrameDraw<'a> {
    pub compiled: &'a DrawList,
    pub overlay: &'a DrawList,
}

/// Build the frame's draw lists, reusing compiled geometry when possible
pub fn draw_frame<'a>(
    graph: &Graph,
    ctx: &DrawContext<'_>,
    cache: &'a mut RenderResourceCache,
    overlay: &'a mut DrawList,
) -> FrameDraw<'a> {
    let RenderResourceCache { textures, geometry } = cache;

    overlay.clear();
    build_per_frame(graph, ctx, textures, overlay);

    let compiled = geometry.get_or_build(graph.version(), |list| {
        build_compiled(graph, ctx, textures, list);
    });

    FrameDraw { compiled, overlay }
}

/// True for image nodes that must face the camera every frame
pub fn is_camera_aligned(graph: &Graph, node: &Node) -> bool {
    node.is_image() && graph.texture_mode() == TextureMode::Align
}

/// Whether the component filter lets a node through
fn is_visible(graph: &Graph, ctx: &DrawContext<'_>, node: &Node) -> bool {
    if !ctx.options.component_filter {
        return true;
    }
    match ctx.selection.selected.and_then(|id| graph.node(id)) {
        Some(selected) => selected.component == node.component,
        None => true,
    }
}

/// Distance from the node center at which edges start or end
fn node_edge_offset(node: &Node, scale: &SceneScale, textures: &mut TextureCache) -> f32 {
    if node.is_image() && textures.get_or_load(node.image_path()).is_loaded() {
        scale.node_radius * node.image_scale()
    } else {
        scale.node_radius * node.size
    }
}

fn draw_node(
    id: NodeId,
    node: &Node,
    ctx: &DrawContext<'_>,
    rotation: Quat,
    textures: &mut TextureCache,
    list: &mut DrawList,
) {
    let radius = ctx.scale.node_radius;
    if node.is_image() {
        let entry = textures.get_or_load(node.image_path());
        if entry.is_loaded() {
            let half_height = radius * node.image_scale();
            let half_size = [half_height * entry.aspect(), half_height];
            list.push_billboard(node.position, half_size, rotation, entry.handle);
            return;
        }
    }
    // Shape nodes and images that failed to load
    let material = ctx.selection.material_for(id, node.material);
    list.push_shape(node.position, radius * node.size, material);
}

/// Everything that does not depend on the camera
pub fn build_compiled(graph: &Graph, ctx: &DrawContext<'_>, textures: &mut TextureCache, list: &mut DrawList) {
    for (id, node) in graph.nodes() {
        if !is_visible(graph, ctx, node) || is_camera_aligned(graph, node) {
            continue;
        }
        draw_node(id, node, ctx, Quat::IDENTITY, textures, list);
    }

    if !ctx.options.spanning_tree {
        draw_edges(graph, ctx, textures, list);
    }
}

/// Camera-aligned image nodes, labels and overlays
pub fn build_per_frame(graph: &Graph, ctx: &DrawContext<'_>, textures: &mut TextureCache, list: &mut DrawList) {
    let facing = ctx.nav.inverse_rotation();
    for (id, node) in graph.nodes() {
        if is_visible(graph, ctx, node) && is_camera_aligned(graph, node) {
            draw_node(id, node, ctx, facing, textures, list);
        }
    }

    if ctx.options.labels {
        let offset = Vec3::splat(NODE_LABEL_OFFSET * ctx.scale.node_radius);
        for (_, node) in graph.nodes() {
            if !node.label.is_empty() && is_visible(graph, ctx, node) {
                list.push_label(node.position + offset, node.label.as_str(), true);
            }
        }
    }

    if ctx.options.edge_labels {
        let offset = Vec3::splat(ctx.scale.node_radius);
        for edge in graph.edges() {
            if edge.label.is_empty() || !edge_visible(graph, ctx, edge) {
                continue;
            }
            if let (Some(a), Some(b)) = (graph.position(edge.source), graph.position(edge.target)) {
                list.push_label((a + b) * 0.5 + offset, edge.label.as_str(), false);
            }
        }
    }

    if ctx.options.spanning_tree {
        draw_spanning_tree(graph, ctx, textures, list);
    }
    if ctx.options.shortest_path {
        draw_shortest_path(graph, ctx, textures, list);
    }
}

fn edge_visible(graph: &Graph, ctx: &DrawContext<'_>, edge: &Edge) -> bool {
    match (graph.node(edge.source), graph.node(edge.target)) {
        (Some(a), Some(b)) => is_visible(graph, ctx, a) && is_visible(graph, ctx, b),
        _ => false,
    }
}

fn draw_edges(graph: &Graph, ctx: &DrawContext<'_>, textures: &mut TextureCache, list: &mut DrawList) {
    let mut drawn: HashSet<(NodeId, NodeId)> = HashSet::new();
    for (id, edge) in graph.edges().iter().enumerate() {
        if edge.source == edge.target || !edge_visible(graph, ctx, edge) {
            continue;
        }
        if !drawn.insert((edge.source, edge.target)) {
            continue;
        }
        if edge.bidirectional {
            // One segment with a head at each end covers both directions.
            drawn.insert((edge.target, edge.source));
        }
        draw_edge(graph, ctx, id, edge, textures, list);
    }
}

fn draw_edge(
    graph: &Graph,
    ctx: &DrawContext<'_>,
    id: EdgeId,
    edge: &Edge,
    textures: &mut TextureCache,
    list: &mut DrawList,
) {
    let (Some(source), Some(target)) = (graph.node(edge.source), graph.node(edge.target)) else {
        return;
    };
    let scale = ctx.scale;
    let source_gap = node_edge_offset(source, scale, textures);
    let target_gap = node_edge_offset(target, scale, textures);

    if let Some(path) = graph.edge_path(id) {
        draw_bundled(path, source_gap, target_gap, edge, ctx, list);
        return;
    }

    let delta = target.position - source.position;
    let distance = delta.length();
    if distance <= f32::EPSILON {
        return;
    }
    let direction = delta / distance;

    let mut source_offset = source_gap;
    let mut length = distance - source_gap - target_gap;
    if ctx.options.arrows {
        length -= scale.edge_offset;
        if edge.bidirectional {
            source_offset += scale.edge_offset;
            length -= scale.edge_offset;
        }
    }
    if length <= 0.0 {
        return;
    }

    let start = source.position + direction * source_offset;
    let end = start + direction * length;
    list.push_edge(start, end, scale.edge_thickness, edge.material);

    if ctx.options.arrows {
        list.push_arrow(end, end + direction * scale.arrow_height, scale.arrow_width, edge.material);
        if edge.bidirectional {
            list.push_arrow(start, start - direction * scale.arrow_height, scale.arrow_width, edge.material);
        }
    }
}

/// Polyline through the bundled control points, trimmed at both nodes
fn draw_bundled(
    path: &[Vec3],
    source_gap: f32,
    target_gap: f32,
    edge: &Edge,
    ctx: &DrawContext<'_>,
    list: &mut DrawList,
) {
    let last = path.len() - 1;
    let first_dir = (path[1] - path[0]).normalize_or_zero();
    let last_dir = (path[last] - path[last - 1]).normalize_or_zero();
    let tail_gap = if ctx.options.arrows {
        target_gap + ctx.scale.edge_offset
    } else {
        target_gap
    };

    let mut points: Vec<Vec3> = path.to_vec();
    points[0] += first_dir * source_gap;
    points[last] -= last_dir * tail_gap;

    for pair in points.windows(2) {
        list.push_edge(pair[0], pair[1], ctx.scale.edge_thickness, edge.material);
    }
    if ctx.options.arrows {
        let base = points[last];
        list.push_arrow(base, base + last_dir * ctx.scale.arrow_height, ctx.scale.arrow_width, edge.material);
    }
}

/// Edge between two nodes used by overlays: no arrows, trimmed at both ends
fn draw_link(
    a: &Node,
    b: &Node,
    ctx: &DrawContext<'_>,
    material: MaterialId,
    thickness: f32,
    textures: &mut TextureCache,
    list: &mut DrawList,
) {
    let delta = b.position - a.position;
    let distance = delta.length();
    let gap_a = node_edge_offset(a, ctx.scale, textures);
    let gap_b = node_edge_offset(b, ctx.scale, textures);
    if distance <= gap_a + gap_b {
        return;
    }
    let direction = delta / distance;
    list.push_edge(
        a.position + direction * gap_a,
        b.position - direction * gap_b,
        thickness,
        material,
    );
}

fn draw_spanning_tree(graph: &Graph, ctx: &DrawContext<'_>, textures: &mut TextureCache, list: &mut DrawList) {
    for (id, node) in graph.nodes() {
        let Some(&parent) = ctx.predecessors.get(id) else {
            continue;
        };
        if parent == id {
            continue;
        }
        if let Some(parent_node) = graph.node(parent) {
            if is_visible(graph, ctx, node) && is_visible(graph, ctx, parent_node) {
                draw_link(node, parent_node, ctx, MaterialId::DEFAULT, ctx.scale.edge_thickness, textures, list);
            }
        }
    }
}

fn draw_shortest_path(graph: &Graph, ctx: &DrawContext<'_>, textures: &mut TextureCache, list: &mut DrawList) {
    let (Some(selected), Some(previous)) = (ctx.selection.selected, ctx.selection.previous) else {
        return;
    };
    let path = path_to_root(ctx.predecessors, selected);
    if path.last() != Some(&previous) {
        return;
    }
    let thickness = ctx.scale.edge_thickness * 2.0;
    for pair in path.windows(2) {
        if let (Some(a), Some(b)) = (graph.node(pair[0]), graph.node(pair[1])) {
            draw_link(a, b, ctx, MaterialId::HIGHLIGHTED, thickness, textures, list);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::resources::tests::stub_cache;
    use crate::render::resources::GeometryCache;

    struct Fixture {
        options: ViewOptions,
        selection: Selection,
        scale: SceneScale,
        nav: NavTransform,
        predecessors: Vec<NodeId>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                options: ViewOptions::default(),
                selection: Selection::default(),
                scale: SceneScale::from_radius(80.0),
                nav: NavTransform::IDENTITY,
                predecessors: Vec::new(),
            }
        }

        fn ctx(&self) -> DrawContext<'_> {
            DrawContext {
                options: &self.options,
                selection: &self.selection,
                scale: &self.scale,
                nav: &self.nav,
                predecessors: &self.predecessors,
            }
        }
    }

    fn mixed_graph(mode: TextureMode) -> Graph {
        let mut graph = Graph::new();
        graph.add_node(Node::new(Vec3::ZERO));
        graph.add_node(Node::new(Vec3::new(10.0, 0.0, 0.0)).with_image("20x10", 1.0));
        graph.add_node(Node::new(Vec3::new(0.0, 10.0, 0.0)).with_label("c"));
        graph.add_edge(0, 1).unwrap();
        graph.add_edge(0, 2).unwrap();
        graph.set_texture_mode(mode);
        graph
    }

    #[test]
    fn test_aligned_images_excluded_from_compiled() {
        let fixture = Fixture::new();
        let graph = mixed_graph(TextureMode::Align);
        let (mut textures, _) = stub_cache(4, true);

        let mut compiled = DrawList::new();
        build_compiled(&graph, &fixture.ctx(), &mut textures, &mut compiled);
        assert_eq!(compiled.shapes.len(), 2);
        assert!(compiled.billboards.is_empty());

        let mut overlay = DrawList::new();
        build_per_frame(&graph, &fixture.ctx(), &mut textures, &mut overlay);
        assert_eq!(overlay.billboards.len(), 1);
        assert_eq!(overlay.billboards[0].half_size, [2.0, 1.0]);
    }

    #[test]
    fn test_rotate_mode_images_compiled() {
        let fixture = Fixture::new();
        let graph = mixed_graph(TextureMode::Rotate);
        let (mut textures, _) = stub_cache(4, true);

        let mut compiled = DrawList::new();
        build_compiled(&graph, &fixture.ctx(), &mut textures, &mut compiled);
        assert_eq!(compiled.billboards.len(), 1);

        let mut overlay = DrawList::new();
        build_per_frame(&graph, &fixture.ctx(), &mut textures, &mut overlay);
        assert!(overlay.billboards.is_empty());
    }

    #[test]
    fn test_failed_image_falls_back_to_shape() {
        let fixture = Fixture::new();
        let mut graph = Graph::new();
        graph.add_node(Node::new(Vec3::ZERO).with_image("missing.png", 2.0));
        let (mut textures, _) = stub_cache(4, true);

        let mut overlay = DrawList::new();
        build_per_frame(&graph, &fixture.ctx(), &mut textures, &mut overlay);
        assert_eq!(overlay.shapes.len(), 1);
        assert!(overlay.billboards.is_empty());
    }

    #[test]
    fn test_edge_leaves_room_for_arrow() {
        let fixture = Fixture::new();
        let mut graph = Graph::new();
        graph.add_node(Node::new(Vec3::ZERO));
        graph.add_node(Node::new(Vec3::new(10.0, 0.0, 0.0)));
        graph.add_edge(0, 1).unwrap();
        let (mut textures, _) = stub_cache(1, true);

        let mut list = DrawList::new();
        build_compiled(&graph, &fixture.ctx(), &mut textures, &mut list);
        assert_eq!(list.edges.len(), 1);
        assert_eq!(list.arrows.len(), 1);
        // node radius 1, arrow height 0.5
        assert_eq!(list.edges[0].start, [1.0, 0.0, 0.0]);
        assert_eq!(list.edges[0].end, [8.5, 0.0, 0.0]);
        assert_eq!(list.arrows[0].tip, [9.0, 0.0, 0.0]);
    }

    #[test]
    fn test_bidirectional_drawn_once_with_two_heads() {
        let fixture = Fixture::new();
        let mut graph = Graph::new();
        graph.add_node(Node::new(Vec3::ZERO));
        graph.add_node(Node::new(Vec3::new(10.0, 0.0, 0.0)));
        graph.add_edge(0, 1).unwrap();
        graph.add_edge(1, 0).unwrap();
        let (mut textures, _) = stub_cache(1, true);

        let mut list = DrawList::new();
        build_compiled(&graph, &fixture.ctx(), &mut textures, &mut list);
        assert_eq!(list.edges.len(), 1);
        assert_eq!(list.arrows.len(), 2);
        assert_eq!(list.edges[0].start, [1.5, 0.0, 0.0]);
        assert_eq!(list.edges[0].end, [8.5, 0.0, 0.0]);
    }

    #[test]
    fn test_component_filter_hides_other_components() {
        let mut fixture = Fixture::new();
        let mut graph = Graph::new();
        graph.add_node(Node::new(Vec3::ZERO));
        graph.add_node(Node::new(Vec3::X * 5.0));
        graph.add_node(Node::new(Vec3::Y * 5.0));
        graph.add_edge(0, 1).unwrap();
        graph.assign_components();
        fixture.options.component_filter = true;
        fixture.selection.selected = Some(2);
        let (mut textures, _) = stub_cache(1, true);

        let mut list = DrawList::new();
        build_compiled(&graph, &fixture.ctx(), &mut textures, &mut list);
        assert_eq!(list.shapes.len(), 1);
        assert!(list.edges.is_empty());
        assert_eq!(list.shapes[0].material, MaterialId::SELECTED.0);
    }

    #[test]
    fn test_labels_and_shortest_path_overlay() {
        let mut fixture = Fixture::new();
        let mut graph = Graph::new();
        for x in 0..3 {
            graph.add_node(Node::new(Vec3::new(x as f32 * 10.0, 0.0, 0.0)).with_label(format!("n{x}")));
        }
        graph.add_edge(0, 1).unwrap();
        graph.add_edge(1, 2).unwrap();
        fixture.options.labels = true;
        fixture.options.shortest_path = true;
        fixture.selection.previous = Some(0);
        fixture.selection.selected = Some(2);
        fixture.predecessors = graph.shortest_path_tree(0);
        let (mut textures, _) = stub_cache(1, true);

        let mut overlay = DrawList::new();
        build_per_frame(&graph, &fixture.ctx(), &mut textures, &mut overlay);
        assert_eq!(overlay.labels.len(), 3);
        assert_eq!(overlay.labels[0].position, Vec3::splat(1.1));
        assert!(overlay.labels[0].shadow);
        assert_eq!(overlay.edges.len(), 2);
        assert!(overlay.edges.iter().all(|e| e.material == MaterialId::HIGHLIGHTED.0));
    }

    #[test]
    fn test_spanning_tree_replaces_edges() {
        let mut fixture = Fixture::new();
        let mut graph = Graph::new();
        for x in 0..3 {
            graph.add_node(Node::new(Vec3::new(x as f32 * 10.0, 0.0, 0.0)));
        }
        graph.add_edge(0, 1).unwrap();
        graph.add_edge(1, 2).unwrap();
        graph.add_edge(0, 2).unwrap();
        fixture.options.spanning_tree = true;
        fixture.predecessors = graph.spanning_tree(None);
        let (mut textures, _) = stub_cache(1, true);

        let mut compiled = DrawList::new();
        build_compiled(&graph, &fixture.ctx(), &mut textures, &mut compiled);
        assert!(compiled.edges.is_empty());

        let mut overlay = DrawList::new();
        build_per_frame(&graph, &fixture.ctx(), &mut textures, &mut overlay);
        assert_eq!(overlay.edges.len(), 2);
    }

    #[test]
    fn test_draw_frame_reuses_compiled() {
        let fixture = Fixture::new();
        let mut graph = mixed_graph(TextureMode::Align);
        let (textures, _) = stub_cache(4, true);
        let mut cache = RenderResourceCache {
            textures,
            geometry: GeometryCache::new(),
        };
        let mut overlay = DrawList::new();

        draw_frame(&graph, &fixture.ctx(), &mut cache, &mut overlay);
        let frame = draw_frame(&graph, &fixture.ctx(), &mut cache, &mut overlay);
        assert_eq!(frame.overlay.billboards.len(), 1);
        assert_eq!(cache.geometry.rebuilds(), 1);

        graph.bump_version();
        draw_frame(&graph, &fixture.ctx(), &mut cache, &mut overlay);
        assert_eq!(cache.geometry.rebuilds(), 2);
    }
}
