//! Scan-and-init orchestrator
//!
//! Runs every plugin's initializer over a container, then keeps watching the
//! container for added nodes and re-scans (debounced) when they appear.

use std::rc::Rc;

use lazyact_dom::{MutationRecord, NodeId};

use crate::plugins::LazyImages;
use crate::{EngineResult, Plugin, Runtime, TimerId};

/// Orchestrator options
pub struct LoadOptions {
    /// Container to scan and watch (`<body>` when unset)
    pub container: Option<NodeId>,
    /// Re-scan when nodes are added to the container
    pub use_mutation_observer: bool,
    /// Scan right away
    pub init: bool,
    pub plugins: Vec<Rc<dyn Plugin>>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            container: None,
            use_mutation_observer: true,
            init: true,
            plugins: vec![Rc::new(LazyImages::new())],
        }
    }
}

impl std::fmt::Debug for LoadOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadOptions")
            .field("container", &self.container)
            .field("use_mutation_observer", &self.use_mutation_observer)
            .field("init", &self.init)
            .field("plugins", &self.plugins.iter().map(|p| p.name()).collect::<Vec<_>>())
            .finish()
    }
}

pub(crate) struct OrchestratorState {
    container: NodeId,
    plugins: Vec<Rc<dyn Plugin>>,
    use_mutation_observer: bool,
    /// Receiving mutation records
    pub(crate) observing: bool,
    debounce: Option<TimerId>,
    scans: usize,
}

/// Handle of an orchestrator owned by the runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LazyLoadAssets {
    index: usize,
}

impl LazyLoadAssets {
    /// Create an orchestrator, scanning and watching unless `options.init` is false
    pub fn new(rt: &mut Runtime, options: LoadOptions) -> EngineResult<Self> {
        let container = options.container.unwrap_or_else(|| rt.document().body());
        let handle = Self {
            index: rt.orchestrators.len(),
        };
        rt.orchestrators.push(OrchestratorState {
            container,
            plugins: options.plugins,
            use_mutation_observer: options.use_mutation_observer,
            observing: false,
            debounce: None,
            scans: 0,
        });

        if options.init {
            handle.init(rt)?;
        }
        Ok(handle)
    }

    /// Scan once, then start watching for added nodes
    pub fn init(self, rt: &mut Runtime) -> EngineResult<()> {
        self.activate(rt)?;

        let state = &rt.orchestrators[self.index];
        if state.observing || !state.use_mutation_observer || !rt.capabilities().supports_mutation_observation {
            return Ok(());
        }
        // records from before observation started are not ours
        rt.collect_mutations();
        rt.orchestrators[self.index].observing = true;
        tracing::debug!("Watching {:?} for added nodes", self.container(rt));
        Ok(())
    }

    /// Run every plugin's initializer over the container
    pub fn activate(self, rt: &mut Runtime) -> EngineResult<()> {
        let state = &mut rt.orchestrators[self.index];
        state.scans += 1;
        let container = state.container;
        let plugins = state.plugins.clone();
        tracing::debug!("Scan {} of {:?} with {} plugins", state.scans, container, plugins.len());

        for plugin in plugins {
            plugin.initializer(rt, container)?;
        }
        Ok(())
    }

    /// Run every cleaner on `node`
    pub fn clean(self, rt: &mut Runtime, node: NodeId) {
        let plugins = rt.orchestrators[self.index].plugins.clone();
        for plugin in plugins.iter().filter(|p| p.cleans()) {
            plugin.clean(rt, node);
        }
    }

    /// Number of scans run so far
    pub fn scan_count(self, rt: &Runtime) -> usize {
        rt.orchestrators[self.index].scans
    }

    pub fn container(self, rt: &Runtime) -> NodeId {
        rt.orchestrators[self.index].container
    }

    fn schedule_activate(self, rt: &mut Runtime) {
        if let Some(timer) = rt.orchestrators[self.index].debounce.take() {
            rt.cancel_timer(timer);
        }
        let delay = rt.config().rescan_debounce_ms;
        let timer = rt.after(delay, move |rt| {
            rt.orchestrators[self.index].debounce = None;
            if let Err(e) = self.activate(rt) {
                tracing::warn!("Re-scan failed: {}", e);
            }
        });
        rt.orchestrators[self.index].debounce = Some(timer);
    }
}

impl Runtime {
    /// Mutation callback of orchestrator `index`
    pub(crate) fn handle_mutations(&mut self, index: usize, records: Vec<MutationRecord>) {
        let handle = LazyLoadAssets { index };
        let container = handle.container(self);
        let tree = self.tree();

        // the plugins append scripts and links themselves
        let added: Vec<NodeId> = records
            .iter()
            .filter(|record| tree.contains(container, record.target))
            .flat_map(|record| record.added_nodes.iter().copied())
            .filter(|&node| tree.is_element(node))
            .filter(|&node| !matches!(tree.tag_name(node), Some("script" | "link")))
            .collect();
        if added.is_empty() {
            return;
        }

        let markers: Vec<String> = self.orchestrators[index]
            .plugins
            .iter()
            .filter(|p| p.cleans())
            .map(|p| p.marker_attribute())
            .collect();

        tracing::trace!("{} nodes added to {:?}", added.len(), container);
        for node in added {
            handle.clean(self, node);

            // copies of already activated elements carry a marker but no controller
            let stale: Vec<NodeId> = self
                .tree()
                .descendants(node)
                .into_iter()
                .filter(|&item| markers.iter().any(|m| self.tree().has_attribute(item, m)))
                .filter(|&item| self.instance_of(item).is_none())
                .collect();
            for item in stale {
                handle.clean(self, item);
            }
        }

        handle.schedule_activate(self);
    }
}
