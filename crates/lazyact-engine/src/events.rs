//! Lifecycle events
//!
//! The public signal surface: cancelable `WillActivate`, `Activated` and the
//! plugin completion events. Events bubble from the target up through its
//! ancestors.

use std::collections::HashMap;
use std::rc::Rc;

use lazyact_dom::{DomTree, NodeId};

use crate::{ControllerId, IntersectionEntry, MonitorId};

/// Event types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// An element is about to activate (cancelable)
    WillActivate,
    /// An element finished activating
    Activated,
    /// The animate plugin applied its class
    AnimationLoaded,
    /// The CSS background plugin saw its background load
    CssBackgroundLoaded,
    /// Window resize, dispatched on the document node
    Resize,
}

impl EventKind {
    /// DOM event name
    pub fn name(self) -> &'static str {
        match self {
            Self::WillActivate => "willActivateOnScroll",
            Self::Activated => "activatedOnScroll",
            Self::AnimationLoaded => "animateLoaded",
            Self::CssBackgroundLoaded => "lazyCssBgLoaded",
            Self::Resize => "resize",
        }
    }
}

/// Lifecycle event
#[derive(Debug, Clone)]
pub struct LifecycleEvent {
    pub kind: EventKind,
    pub target: NodeId,
    /// Node whose listeners are running
    pub current_target: Option<NodeId>,
    pub bubbles: bool,
    pub cancelable: bool,
    /// Controller the event is about
    pub instance: Option<ControllerId>,
    pub monitor: Option<MonitorId>,
    pub entry: Option<IntersectionEntry>,
    pub timestamp: u64,
    default_prevented: bool,
    propagation_stopped: bool,
}

impl LifecycleEvent {
    fn new(kind: EventKind, target: NodeId, cancelable: bool) -> Self {
        Self {
            kind,
            target,
            current_target: None,
            bubbles: true,
            cancelable,
            instance: None,
            monitor: None,
            entry: None,
            timestamp: 0,
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    /// Create the cancelable pre-activation event
    pub fn will_activate(
        entry: IntersectionEntry,
        monitor: MonitorId,
        instance: Option<ControllerId>,
    ) -> Self {
        let mut event = Self::new(EventKind::WillActivate, entry.target, true);
        event.timestamp = entry.time;
        event.monitor = Some(monitor);
        event.instance = instance;
        event.entry = Some(entry);
        event
    }

    /// Create the post-activation event
    pub fn activated(target: NodeId, instance: ControllerId, timestamp: u64) -> Self {
        let mut event = Self::new(EventKind::Activated, target, false);
        event.instance = Some(instance);
        event.timestamp = timestamp;
        event
    }

    /// Create a plain bubbling notification
    pub fn notify(kind: EventKind, target: NodeId, timestamp: u64) -> Self {
        let mut event = Self::new(kind, target, false);
        event.timestamp = timestamp;
        event
    }

    /// Prevent default action
    pub fn prevent_default(&mut self) {
        if self.cancelable {
            self.default_prevented = true;
        }
    }

    /// Stop propagation
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    /// Check if default was prevented
    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }
}

/// Event listener
pub type Listener = Rc<dyn Fn(&mut LifecycleEvent)>;

/// Listener registry keyed by node and event kind
#[derive(Default)]
pub struct EventBus {
    listeners: HashMap<(NodeId, EventKind), Vec<Listener>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.values().map(Vec::len).sum::<usize>())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&mut self, node: NodeId, kind: EventKind, listener: Listener) {
        self.listeners.entry((node, kind)).or_default().push(listener);
    }

    /// Drop the listeners for `kind` on `node`, returns how many there were
    pub fn remove_listeners(&mut self, node: NodeId, kind: EventKind) -> usize {
        self.listeners.remove(&(node, kind)).map_or(0, |listeners| listeners.len())
    }

    /// Dispatch along the target's ancestor path
    ///
    /// Returns false if a listener prevented the default action.
    pub fn dispatch(&self, tree: &DomTree, event: &mut LifecycleEvent) -> bool {
        let path: Vec<NodeId> = if event.bubbles {
            std::iter::once(event.target).chain(tree.ancestors(event.target)).collect()
        } else {
            vec![event.target]
        };

        for node in path {
            let Some(listeners) = self.listeners.get(&(node, event.kind)) else {
                continue;
            };
            event.current_target = Some(node);
            for listener in listeners {
                listener(event);
            }
            if event.propagation_stopped {
                break;
            }
        }
        event.current_target = None;
        tracing::trace!("Dispatched {} on {:?}", event.kind.name(), event.target);
        !event.default_prevented
    }
}
