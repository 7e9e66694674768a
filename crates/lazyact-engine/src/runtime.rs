//! Runtime
//!
//! Owns the document, the task queues and every piece of shared state:
//! the monitor registry, the controller side-table, listeners and the
//! orchestrators. Hosts feed it geometry and ready-state changes and drive
//! it with [`Runtime::run_pending`] / [`Runtime::advance`].

use std::collections::HashMap;

use lazyact_dom::{DOMRect, Document, DomTree, NodeId, ReadyState};

use crate::orchestrator::OrchestratorState;
use crate::{
    Capabilities, Controller, ControllerId, EngineConfig, EventBus, EventKind, HostEnvironment,
    LifecycleEvent, MonitorRegistry, Scheduler, Task, TimerId,
};

/// Single-threaded activation runtime
pub struct Runtime {
    document: Document,
    config: EngineConfig,
    capabilities: Capabilities,
    scheduler: Scheduler<Runtime>,
    pub(crate) monitors: MonitorRegistry,
    /// Controller side-table, indexed by `ControllerId`
    pub(crate) controllers: Vec<Controller>,
    pub(crate) by_element: HashMap<NodeId, Vec<ControllerId>>,
    /// Live back-references (cleared once a one-shot controller activates)
    pub(crate) instances: HashMap<NodeId, ControllerId>,
    events: EventBus,
    /// Viewport in document coordinates
    viewport: DOMRect,
    geometry_dirty: bool,
    load_waiters: HashMap<NodeId, Vec<Task<Runtime>>>,
    pub(crate) ready_waiters: Vec<(Vec<ReadyState>, Task<Runtime>)>,
    pub(crate) resize_timer: Option<TimerId>,
    pub(crate) orchestrators: Vec<OrchestratorState>,
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("capabilities", &self.capabilities)
            .field("scheduler", &self.scheduler)
            .field("monitors", &self.monitors.len())
            .field("controllers", &self.controllers.len())
            .field("viewport", &self.viewport)
            .finish()
    }
}

impl Runtime {
    /// Create a runtime for a modern host with the default configuration
    pub fn new(document: Document) -> Self {
        Self::with_environment(document, HostEnvironment::default(), EngineConfig::default())
    }

    /// Create a runtime, probing `env` once for capabilities
    pub fn with_environment(document: Document, env: HostEnvironment, config: EngineConfig) -> Self {
        let capabilities = Capabilities::probe_document(&env, &document);
        let viewport = DOMRect::from_xywh(0.0, 0.0, config.viewport_width, config.viewport_height);
        tracing::debug!("Runtime for {} ({:?})", document.url(), capabilities);

        Self {
            document,
            config,
            capabilities,
            scheduler: Scheduler::new(),
            monitors: MonitorRegistry::new(),
            controllers: Vec::new(),
            by_element: HashMap::new(),
            instances: HashMap::new(),
            events: EventBus::new(),
            viewport,
            geometry_dirty: true,
            load_waiters: HashMap::new(),
            ready_waiters: Vec::new(),
            resize_timer: None,
            orchestrators: Vec::new(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn tree(&self) -> &DomTree {
        self.document.tree()
    }

    pub fn tree_mut(&mut self) -> &mut DomTree {
        self.document.tree_mut()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn monitors(&self) -> &MonitorRegistry {
        &self.monitors
    }

    /// Current virtual time (ms)
    pub fn now(&self) -> u64 {
        self.scheduler.now()
    }

    /// Number of animation frames run so far
    pub fn frame_count(&self) -> u64 {
        self.scheduler.frame_count()
    }

    // ------------------------------------------------------------------
    // Scheduling
    // ------------------------------------------------------------------

    /// Queue a microtask
    pub fn run_now(&mut self, task: impl FnOnce(&mut Runtime) + 'static) {
        self.scheduler.run_now(Box::new(task));
    }

    /// Queue a macrotask
    pub fn defer(&mut self, task: impl FnOnce(&mut Runtime) + 'static) -> TimerId {
        self.scheduler.defer(Box::new(task))
    }

    pub fn next_frame(&mut self, task: impl FnOnce(&mut Runtime) + 'static) {
        self.scheduler.next_frame(Box::new(task));
    }

    pub fn after(&mut self, delay_ms: u64, task: impl FnOnce(&mut Runtime) + 'static) -> TimerId {
        self.scheduler.after(delay_ms, Box::new(task))
    }

    pub fn cancel_timer(&mut self, id: TimerId) -> bool {
        self.scheduler.cancel(id)
    }

    /// Queue an idle callback
    pub fn idle(&mut self, task: impl FnOnce(&mut Runtime) + 'static) {
        self.scheduler.idle(Box::new(task));
    }

    /// Run everything runnable at the current time
    ///
    /// Pending mutations and geometry changes are turned into observer
    /// callbacks before each step.
    pub fn run_pending(&mut self) {
        loop {
            self.collect_mutations();
            self.collect_intersections();

            if let Some(task) = self.scheduler.pop_microtask() {
                task(self);
                continue;
            }
            if let Some(task) = self.scheduler.pop_due_timer() {
                task(self);
                continue;
            }
            let frame = self.scheduler.take_frame();
            if !frame.is_empty() {
                for task in frame {
                    task(self);
                }
                continue;
            }
            if let Some(task) = self.scheduler.pop_idle() {
                task(self);
                continue;
            }
            break;
        }
    }

    /// Move the clock forward by `ms`, firing timers on the way
    pub fn advance(&mut self, ms: u64) {
        let target = self.now() + ms;
        self.run_pending();
        while let Some(due) = self.scheduler.next_timer_due().filter(|&due| due <= target) {
            self.scheduler.set_now(due);
            self.run_pending();
        }
        self.scheduler.set_now(target);
        self.run_pending();
    }

    /// Check if any work is queued, including future timers
    pub fn has_pending_work(&self) -> bool {
        self.scheduler.has_pending_work() || self.tree().has_pending_mutations()
    }

    // ------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------

    pub(crate) fn mark_geometry_dirty(&mut self) {
        self.geometry_dirty = true;
    }

    /// Deliver pending child-list records to observing orchestrators
    pub(crate) fn collect_mutations(&mut self) {
        let records = self.document.tree_mut().take_mutations();
        if records.is_empty() {
            return;
        }
        self.geometry_dirty = true;
        if !self.capabilities.supports_mutation_observation {
            return;
        }

        for index in 0..self.orchestrators.len() {
            if !self.orchestrators[index].observing {
                continue;
            }
            let records = records.clone();
            self.run_now(move |rt| rt.handle_mutations(index, records));
        }
    }

    fn collect_intersections(&mut self) {
        if !self.geometry_dirty || !self.capabilities.supports_viewport_observation {
            return;
        }
        self.geometry_dirty = false;

        let now = self.now();
        let changes = self.monitors.check_all(self.viewport, self.document.tree(), now);
        for (monitor, entries) in changes {
            tracing::trace!("Monitor {:?}: {} entries", monitor, entries.len());
            self.defer(move |rt| rt.deliver_entries(monitor, entries));
        }
    }

    pub fn viewport(&self) -> DOMRect {
        self.viewport
    }

    /// Resize the viewport, keeping the scroll position
    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.viewport = DOMRect::from_xywh(self.viewport.x, self.viewport.y, width, height);
        self.geometry_dirty = true;
    }

    /// Scroll the viewport to a document position
    pub fn scroll_to(&mut self, x: f64, y: f64) {
        self.viewport = DOMRect::from_xywh(x, y, self.viewport.width, self.viewport.height);
        self.geometry_dirty = true;
    }

    /// Record the host's layout box for a node
    pub fn set_rect(&mut self, node: NodeId, rect: DOMRect) {
        self.tree_mut().set_rect(node, rect);
        self.geometry_dirty = true;
    }

    /// Report a visibility change for `node` as the host's observer would
    ///
    /// Every monitor observing the node receives the entry in a macrotask.
    pub fn simulate_intersection(&mut self, node: NodeId, is_intersecting: bool) {
        let time = self.now();
        for monitor in self.monitors.observing(node) {
            self.monitors.record(monitor, node, is_intersecting);
            let entry = crate::IntersectionEntry {
                target: node,
                is_intersecting,
                intersection_ratio: if is_intersecting { 1.0 } else { 0.0 },
                time,
            };
            self.defer(move |rt| rt.deliver_entries(monitor, vec![entry]));
        }
    }

    // ------------------------------------------------------------------
    // Asset loads
    // ------------------------------------------------------------------

    /// Run `task` once the asset of `node` has loaded
    pub fn when_loaded(&mut self, node: NodeId, task: impl FnOnce(&mut Runtime) + 'static) {
        if self.config.track_asset_loads {
            self.load_waiters.entry(node).or_default().push(Box::new(task));
        } else {
            self.defer(task);
        }
    }

    /// Host notification that the asset of `node` finished loading
    pub fn asset_loaded(&mut self, node: NodeId) {
        let Some(waiters) = self.load_waiters.remove(&node) else {
            return;
        };
        tracing::trace!("Asset of {:?} loaded, {} waiters", node, waiters.len());
        for task in waiters {
            self.scheduler.defer(task);
        }
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    /// Dispatch a lifecycle event, returns false if it was canceled
    pub fn dispatch(&mut self, event: &mut LifecycleEvent) -> bool {
        self.events.dispatch(self.document.tree(), event)
    }

    /// Listen for `kind` on `node` and everything below it
    pub fn add_listener(
        &mut self,
        node: NodeId,
        kind: EventKind,
        listener: impl Fn(&mut LifecycleEvent) + 'static,
    ) {
        self.events.add_listener(node, kind, std::rc::Rc::new(listener));
    }

    /// Remove every listener for `kind` registered on `node`
    pub fn remove_listeners(&mut self, node: NodeId, kind: EventKind) -> usize {
        self.events.remove_listeners(node, kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ControllerOptions, HostEnvironment};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn log() -> (Rc<RefCell<Vec<&'static str>>>, impl Fn(&'static str) -> Box<dyn FnOnce(&mut Runtime)>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        let push = move |label: &'static str| {
            let sink = sink.clone();
            Box::new(move |_: &mut Runtime| sink.borrow_mut().push(label)) as Box<dyn FnOnce(&mut Runtime)>
        };
        (log, push)
    }

    #[test]
    fn test_queue_order() {
        let mut rt = Runtime::new(Document::default());
        let (log, push) = log();

        rt.next_frame(push("frame"));
        rt.defer(push("macrotask"));
        rt.run_now(push("microtask"));
        rt.idle(push("idle"));
        rt.after(10, push("timer"));
        rt.run_pending();
        assert_eq!(*log.borrow(), vec!["microtask", "macrotask", "frame", "idle"]);

        rt.advance(10);
        assert_eq!(log.borrow().last(), Some(&"timer"));
        assert_eq!(rt.now(), 10);
    }

    #[test]
    fn test_cancel_timer() {
        let mut rt = Runtime::new(Document::default());
        let (log, push) = log();
        let id = rt.after(5, push("timer"));
        assert!(rt.cancel_timer(id));
        rt.advance(10);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_scroll_reports_intersection() {
        let mut doc = Document::default();
        let body = doc.body();
        let div = doc.tree_mut().create_element("div");
        doc.tree_mut().append_child(body, div).unwrap();
        let mut rt = Runtime::new(doc);
        rt.set_rect(div, DOMRect::from_xywh(0.0, 3000.0, 100.0, 100.0));

        let seen = Rc::new(RefCell::new(0));
        let count = seen.clone();
        rt.add_listener(body, EventKind::WillActivate, move |_| *count.borrow_mut() += 1);
        rt.attach(div, ControllerOptions::default()).unwrap();
        rt.run_pending();
        assert_eq!(*seen.borrow(), 0);

        // 300px margin: 2000 + 768 + 300 reaches 3000
        rt.scroll_to(0.0, 2000.0);
        rt.run_pending();
        assert_eq!(*seen.borrow(), 1);
    }

    #[test]
    fn test_no_observation_without_support() {
        let mut doc = Document::default();
        let body = doc.body();
        let mut rt = Runtime::with_environment(doc, HostEnvironment::legacy(), EngineConfig::default());
        let div = rt.tree_mut().create_element("div");
        rt.tree_mut().append_child(body, div).unwrap();
        rt.run_pending();

        assert!(rt.monitors().is_empty());
        assert!(!rt.has_pending_work());
    }
}
