//! Deduplicated intersection monitors
//!
//! One native intersection subscription per distinct controller
//! configuration. The registry is append-only: monitors live as long as the
//! runtime that owns it.

use lazyact_dom::{DOMRect, DomTree, NodeId};

use crate::{ControllerOptions, IntersectionEntry, IntersectionObserver};

/// Configuration a monitor is keyed by; equality is deep, callbacks compare by identity
pub type MonitorConfig = ControllerOptions;

/// Monitor handle (index into the registry)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MonitorId(usize);

#[derive(Debug)]
struct Monitor {
    config: MonitorConfig,
    observer: IntersectionObserver,
}

/// Registry of {configuration, monitor} pairs
#[derive(Debug, Default)]
pub struct MonitorRegistry {
    monitors: Vec<Monitor>,
}

impl MonitorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the monitor for `config`, creating it on first use
    pub fn obtain(&mut self, config: &MonitorConfig) -> MonitorId {
        if let Some(index) = self.monitors.iter().position(|m| &m.config == config) {
            return MonitorId(index);
        }

        let id = MonitorId(self.monitors.len());
        tracing::debug!("Created monitor {:?} (margin {:?})", id, config.options.root_margin);
        self.monitors.push(Monitor {
            config: config.clone(),
            observer: IntersectionObserver::new(config.options.clone()),
        });
        id
    }

    /// Begin observing a node (no-op if already observed)
    pub fn register(&mut self, id: MonitorId, node: NodeId) {
        if let Some(monitor) = self.monitors.get_mut(id.0) {
            monitor.observer.observe(node);
        }
    }

    /// Stop observing a node (safe if not observed)
    pub fn unregister(&mut self, id: MonitorId, node: NodeId) {
        if let Some(monitor) = self.monitors.get_mut(id.0) {
            monitor.observer.unobserve(node);
        }
    }

    pub fn is_registered(&self, id: MonitorId, node: NodeId) -> bool {
        self.monitors
            .get(id.0)
            .is_some_and(|m| m.observer.is_observing(node))
    }

    pub fn config(&self, id: MonitorId) -> Option<&MonitorConfig> {
        self.monitors.get(id.0).map(|m| &m.config)
    }

    /// Number of monitors ever created
    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }

    /// Monitors currently observing `node`
    pub fn observing(&self, node: NodeId) -> Vec<MonitorId> {
        self.monitors
            .iter()
            .enumerate()
            .filter(|(_, m)| m.observer.is_observing(node))
            .map(|(index, _)| MonitorId(index))
            .collect()
    }

    /// Run a geometry check on every monitor
    pub(crate) fn check_all(
        &mut self,
        viewport: DOMRect,
        tree: &DomTree,
        time: u64,
    ) -> Vec<(MonitorId, Vec<IntersectionEntry>)> {
        self.monitors
            .iter_mut()
            .enumerate()
            .map(|(index, m)| (MonitorId(index), m.observer.check(viewport, tree, time)))
            .filter(|(_, entries)| !entries.is_empty())
            .collect()
    }

    pub(crate) fn record(&mut self, id: MonitorId, node: NodeId, is_intersecting: bool) {
        if let Some(monitor) = self.monitors.get_mut(id.0) {
            monitor.observer.record(node, is_intersecting);
        }
    }
}
