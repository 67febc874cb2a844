//! Hyphae - headless demo of the layout/render/picking core
//!
//! Usage: `hyphae [config.json] [node count]`
//!
//! Builds a random graph, lets the dynamic layout run while frames are
//! snapshotted and drawn against a headless texture backend, and picks
//! through the screen center each frame.

use std::env;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use glam::Vec3;
use rand::Rng;

use hyphae::picking::MouseDevice;
use hyphae::render::{Camera3D, RenderResourceCache};
use hyphae::startup_checks::{check_resource_dir, resolve_resource_dir};
use hyphae::{Graph, Node, Viewer, ViewerConfig};

const FRAMES: usize = 120;

fn demo_graph(count: usize) -> Graph {
    let mut rng = rand::rng();
    let mut graph = Graph::new();
    for i in 0..count {
        let node = Node::new(Vec3::ZERO).with_label(format!("n{i}"));
        let node = if i == 0 { node.with_image("hyphae.png", 2.0) } else { node };
        graph.add_node(node);
    }
    for i in 1..count {
        // Random tree plus a few chords
        let parent = rng.random_range(0..i);
        if let Err(e) = graph.add_edge(parent, i) {
            log::warn!("Skipping demo edge {} -> {}: {}", parent, i, e);
        }
        if rng.random_bool(0.2) {
            let target = rng.random_range(0..count);
            if let Err(e) = graph.add_edge(i, target) {
                log::warn!("Skipping demo chord {} -> {}: {}", i, target, e);
            }
        }
    }
    graph
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = env::args().skip(1);
    let config_path = args.next().map(PathBuf::from);
    let count = args.next().and_then(|n| n.parse().ok()).unwrap_or(60);

    let config = ViewerConfig::load_or_default(config_path.as_deref());
    let resource_dir = resolve_resource_dir(config.resources.resource_dir.as_deref());
    check_resource_dir(&resource_dir);

    let mut viewer = Viewer::new(&config);
    let mut cache = RenderResourceCache::headless(resource_dir, &config.resources);
    let camera = Camera3D::new();

    viewer.load_graph(demo_graph(count), false);
    viewer.set_labels(true);

    for frame in 0..FRAMES {
        viewer.begin_frame();
        let hovered = viewer.pick(&MouseDevice::new(&camera, 0.5, 0.5));
        viewer.set_highlighted_node(hovered);

        let draw = viewer.draw(&mut cache);
        if frame % 30 == 0 {
            log::info!(
                "frame {}: {} shapes, {} edges compiled; {} billboards, {} labels per frame; hovered {:?}",
                frame,
                draw.compiled.shapes.len(),
                draw.compiled.edges.len(),
                draw.overlay.billboards.len(),
                draw.overlay.labels.len(),
                hovered
            );
        }
        thread::sleep(Duration::from_millis(16));
    }

    viewer.stop();
    let stats = cache.stats();
    log::info!(
        "Done: {} geometry rebuilds, texture hit ratio {:.2}, {} failed loads",
        stats.geometry_rebuilds,
        stats.hit_ratio(),
        stats.failures
    );
}
