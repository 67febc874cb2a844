//! Layout lifecycle
//!
//! [`LayoutEngine`] owns one runner per algorithm. Exactly one of the static
//! and dynamic layouts is active at a time; the edge bundler is a separate
//! process that never runs alongside either of them.

mod arf;
mod bundler;
mod fruchterman;
mod runner;

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use arf::{ArfConfig, ArfLayout};
pub use bundler::{BundlerConfig, EdgeBundler};
pub use fruchterman::{FruchtermanConfig, FruchtermanReingold};
pub use runner::{LayoutAlgorithm, LayoutFrame, LayoutRunner, StepOutcome};

use crate::constants::layout::DEFAULT_STEP_INTERVAL_MS;
use crate::graph::GraphStore;

/// Which layout algorithm drives node positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LayoutKind {
    /// Fixed-length pass that stops when finished
    Static,
    /// Runs continuously until stopped
    #[default]
    Dynamic,
}

/// Parameters for every layout algorithm
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    pub kind: LayoutKind,
    /// Pause between iterations (milliseconds)
    pub step_interval_ms: u64,
    #[serde(rename = "static")]
    pub static_layout: FruchtermanConfig,
    #[serde(rename = "dynamic")]
    pub dynamic_layout: ArfConfig,
    pub bundler: BundlerConfig,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            kind: LayoutKind::default(),
            step_interval_ms: DEFAULT_STEP_INTERVAL_MS,
            static_layout: FruchtermanConfig::default(),
            dynamic_layout: ArfConfig::default(),
            bundler: BundlerConfig::default(),
        }
    }
}

pub struct LayoutEngine {
    static_runner: LayoutRunner,
    dynamic_runner: LayoutRunner,
    bundler: LayoutRunner,
    active: LayoutKind,
    skip_layout: bool,
}

impl LayoutEngine {
    pub fn new(store: GraphStore, settings: &LayoutSettings) -> Self {
        let interval = Duration::from_millis(settings.step_interval_ms);
        Self::with_algorithms(
            store,
            settings.kind,
            Box::new(FruchtermanReingold::new(settings.static_layout.clone())),
            Box::new(ArfLayout::new(settings.dynamic_layout.clone())),
            Box::new(EdgeBundler::new(settings.bundler.clone())),
            interval,
        )
    }

    pub fn with_algorithms(
        store: GraphStore,
        kind: LayoutKind,
        static_layout: Box<dyn LayoutAlgorithm>,
        dynamic_layout: Box<dyn LayoutAlgorithm>,
        bundler: Box<dyn LayoutAlgorithm>,
        interval: Duration,
    ) -> Self {
        Self {
            static_runner: LayoutRunner::new(store.clone(), static_layout, interval),
            dynamic_runner: LayoutRunner::new(store.clone(), dynamic_layout, interval),
            bundler: LayoutRunner::new(store, bundler, interval),
            active: kind,
            skip_layout: false,
        }
    }

    fn active_runner(&mut self) -> &mut LayoutRunner {
        match self.active {
            LayoutKind::Static => &mut self.static_runner,
            LayoutKind::Dynamic => &mut self.dynamic_runner,
        }
    }

    pub fn active(&self) -> LayoutKind {
        self.active
    }

    /// Select the active algorithm
    ///
    /// A change of kind stops everything and drops the outgoing algorithm's
    /// working state.
    pub fn set_active(&mut self, kind: LayoutKind) {
        if kind != self.active {
            self.stop();
            self.active_runner().reset();
            log::info!("Layout switched to {:?}", kind);
        }
        self.active = kind;
    }

    pub fn skip_layout(&self) -> bool {
        self.skip_layout
    }

    pub fn set_skip_layout(&mut self, skip: bool) {
        self.skip_layout = skip;
    }

    /// Start the active algorithm; no-op if it is already running
    pub fn start(&mut self) {
        self.bundler.stop();
        self.active_runner().start();
    }

    /// Stop every algorithm and the bundler
    pub fn stop(&mut self) {
        self.static_runner.stop();
        self.dynamic_runner.stop();
        self.bundler.stop();
    }

    /// Restart a continuous layout after an interruption
    ///
    /// Static layouts are never resumed; they only run on an explicit start.
    pub fn resume(&mut self) {
        if self.active == LayoutKind::Dynamic && !self.skip_layout && !self.bundler.is_running() {
            self.dynamic_runner.start();
        }
    }

    pub fn is_running(&self) -> bool {
        self.static_runner.is_running() || self.dynamic_runner.is_running()
    }

    pub fn is_stopped(&self) -> bool {
        !self.is_running() && !self.bundler.is_running()
    }

    pub fn is_running_kind(&self, kind: LayoutKind) -> bool {
        match kind {
            LayoutKind::Static => self.static_runner.is_running(),
            LayoutKind::Dynamic => self.dynamic_runner.is_running(),
        }
    }

    /// Stop layout and begin routing edges into bundles
    pub fn start_bundling(&mut self) {
        self.static_runner.stop();
        self.dynamic_runner.stop();
        self.bundler.start();
    }

    pub fn stop_bundling(&mut self) {
        self.bundler.stop();
    }

    pub fn is_bundling(&self) -> bool {
        self.bundler.is_running()
    }

    /// Drop velocities and schedules of every algorithm
    pub fn reset_working_state(&mut self) {
        self.static_runner.reset();
        self.dynamic_runner.reset();
        self.bundler.reset();
    }

    /// True once after the static layout completes its schedule
    pub fn take_static_converged(&self) -> bool {
        self.static_runner.take_converged()
    }

    pub fn runner(&self, kind: LayoutKind) -> &LayoutRunner {
        match kind {
            LayoutKind::Static => &self.static_runner,
            LayoutKind::Dynamic => &self.dynamic_runner,
        }
    }

    pub fn bundler(&self) -> &LayoutRunner {
        &self.bundler
    }
}
