//! Element activation controller
//!
//! A controller binds one element to a shared monitor and runs the
//! activation bookkeeping when the element becomes visible or is triggered
//! manually. Controllers live in a side-table on the [`Runtime`]; the element
//! only carries its initialization marker attribute.

use std::rc::Rc;

use lazyact_dom::{data_attribute_name, NodeId, Selector};

use crate::assets::AssetOptions;
use crate::{EngineResult, EventKind, LifecycleEvent, MonitorId, ObserverOptions, RootMargin, Runtime};

/// Class toggled while a lazy animation is pending
const OPACITY_HIDDEN_CLASS: &str = "opacity-0";

type CallbackFn = dyn Fn(&mut Runtime, NodeId, &ActivationContext);

/// Activation callback
///
/// Two callbacks are equal only if they are the same allocation, so clones
/// of one `Callback` share a monitor while separately built closures do not.
#[derive(Clone)]
pub struct Callback(Rc<CallbackFn>);

impl Callback {
    pub fn new(f: impl Fn(&mut Runtime, NodeId, &ActivationContext) + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn call(&self, rt: &mut Runtime, node: NodeId, context: &ActivationContext) {
        (self.0)(rt, node, context)
    }
}

impl PartialEq for Callback {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.0), Rc::as_ptr(&other.0))
    }
}

impl std::fmt::Debug for Callback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Callback({:p})", Rc::as_ptr(&self.0) as *const ())
    }
}

/// Controller configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerOptions {
    /// Class applied on activation
    pub activated_class: String,
    /// Descendant receiving the class instead of the element
    pub activated_class_target_selector: Option<String>,
    /// Dataset key of the initialization marker
    pub init_attribute: String,
    pub options: ObserverOptions,
    /// Invoked (macrotask-deferred) after activation
    pub callback: Option<Callback>,
    /// Unregister after the first activation
    pub removable: bool,
    pub fade_in: bool,
    /// A manual trigger on an ancestor also activates this element
    pub activate_with_parent: bool,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            activated_class: "animation-started".to_string(),
            activated_class_target_selector: None,
            init_attribute: "activateOnScrollInit".to_string(),
            options: ObserverOptions::with_margin(default_root_margin()),
            callback: None,
            removable: true,
            fade_in: false,
            activate_with_parent: true,
        }
    }
}

impl ControllerOptions {
    pub fn with_init_attribute(mut self, init_attribute: &str) -> Self {
        self.init_attribute = init_attribute.to_string();
        self
    }

    pub fn with_callback(mut self, callback: Callback) -> Self {
        self.callback = Some(callback);
        self
    }

    pub fn with_root_margin(mut self, root_margin: RootMargin) -> Self {
        self.options.root_margin = root_margin;
        self
    }

    pub fn with_activated_class(mut self, class: &str) -> Self {
        self.activated_class = class.to_string();
        self
    }

    pub fn with_target_selector(mut self, selector: &str) -> Self {
        self.activated_class_target_selector = Some(selector.to_string());
        self
    }

    pub fn removable(mut self, removable: bool) -> Self {
        self.removable = removable;
        self
    }

    pub fn fade_in(mut self, fade_in: bool) -> Self {
        self.fade_in = fade_in;
        self
    }

    pub fn activate_with_parent(mut self, activate_with_parent: bool) -> Self {
        self.activate_with_parent = activate_with_parent;
        self
    }

    /// Marker attribute name, e.g. `data-activate-on-scroll-init`
    pub fn marker_attribute(&self) -> String {
        data_attribute_name(&self.init_attribute)
    }
}

/// Default viewport margin, `300px 100px`
fn default_root_margin() -> RootMargin {
    RootMargin {
        top: crate::Length::Px(300.0),
        right: crate::Length::Px(100.0),
        bottom: crate::Length::Px(300.0),
        left: crate::Length::Px(100.0),
    }
}

/// Controller handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ControllerId(usize);

impl ControllerId {
    pub const fn from_raw(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// Per-element activation state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationState {
    /// Created, marker set, subscribed
    Registered,
    /// Waiting for the visibility signal
    PendingVisible,
    /// Running the callback and visual bookkeeping
    Activating,
    Activated,
}

/// Metadata handed to activation callbacks
#[derive(Debug, Clone, PartialEq)]
pub struct ActivationContext {
    pub activated_class: String,
    pub fade_in: bool,
    /// Value of `data-lazy-animation`, if the target had one
    pub lazy_animation_class: Option<String>,
    pub instance: ControllerId,
}

/// Activation controller record
#[derive(Debug, Clone)]
pub struct Controller {
    element: NodeId,
    options: ControllerOptions,
    target_selector: Option<Selector>,
    monitor: Option<MonitorId>,
    state: ActivationState,
    trigger_bound: bool,
    /// Current class; a `data-activated` override replaces it on trigger
    activated_class: String,
    fade_in: bool,
}

impl Controller {
    pub fn element(&self) -> NodeId {
        self.element
    }

    pub fn options(&self) -> &ControllerOptions {
        &self.options
    }

    /// Monitor the element is registered with (none in degraded mode)
    pub fn monitor(&self) -> Option<MonitorId> {
        self.monitor
    }

    pub fn state(&self) -> ActivationState {
        self.state
    }

    /// Whether initialization ran, i.e. this controller responds to triggers
    pub fn is_trigger_bound(&self) -> bool {
        self.trigger_bound
    }

    pub fn activated_class(&self) -> &str {
        &self.activated_class
    }
}

impl Runtime {
    /// Construct a controller for `node`
    ///
    /// The node is registered with the monitor for `options` even if it
    /// already carries the marker; in that case initialization is skipped and
    /// the controller never triggers.
    pub fn attach(&mut self, node: NodeId, options: ControllerOptions) -> EngineResult<ControllerId> {
        if !self.tree().is_element(node) {
            return Err(lazyact_dom::DomError::InvalidNodeType.into());
        }
        let target_selector = options
            .activated_class_target_selector
            .as_deref()
            .map(Selector::parse)
            .transpose()?;

        let monitor = if self.capabilities().supports_viewport_observation {
            let id = self.monitors.obtain(&options);
            self.monitors.register(id, node);
            self.mark_geometry_dirty();
            Some(id)
        } else {
            None
        };

        let id = ControllerId(self.controllers.len());
        self.controllers.push(Controller {
            element: node,
            activated_class: options.activated_class.clone(),
            fade_in: options.fade_in,
            options,
            target_selector,
            monitor,
            state: ActivationState::Registered,
            trigger_bound: false,
        });
        self.by_element.entry(node).or_default().push(id);
        self.instances.insert(node, id);

        self.init_controller(id);
        Ok(id)
    }

    fn init_controller(&mut self, id: ControllerId) {
        let controller = &self.controllers[id.0];
        let node = controller.element;
        let marker = controller.options.marker_attribute();
        if self.tree().has_attribute(node, &marker) {
            tracing::trace!("{:?} already carries {}", node, marker);
            return;
        }
        self.tree_mut().set_attribute(node, &marker, "true");

        if !self.capabilities().supports_viewport_observation {
            self.run_trigger(id);
            return;
        }

        let controller = &mut self.controllers[id.0];
        controller.trigger_bound = true;
        controller.state = ActivationState::PendingVisible;
    }

    /// Manual trigger
    ///
    /// Activates every initialized controller whose element is `target`, or
    /// lies inside `target` when the controller activates with its parent.
    pub fn trigger(&mut self, target: NodeId) {
        let mut ids: Vec<ControllerId> = std::iter::once(target)
            .chain(self.tree().descendants(target))
            .flat_map(|node| self.controllers_of(node))
            .filter(|id| {
                let c = &self.controllers[id.0];
                c.trigger_bound && (c.element == target || c.options.activate_with_parent)
            })
            .collect();
        ids.sort();

        tracing::debug!("Manual trigger on {:?} reached {} controllers", target, ids.len());
        for id in ids {
            self.run_trigger(id);
        }
    }

    /// Visibility callback of a monitor
    pub(crate) fn deliver_entries(&mut self, monitor: MonitorId, entries: Vec<crate::IntersectionEntry>) {
        let Some(removable) = self.monitors.config(monitor).map(|c| c.removable) else {
            return;
        };

        for entry in entries {
            let node = entry.target;
            if !entry.is_intersecting || !self.monitors.is_registered(monitor, node) {
                continue;
            }

            let instance = self.instances.get(&node).copied();
            let mut event = LifecycleEvent::will_activate(entry, monitor, instance);
            if !self.dispatch(&mut event) {
                tracing::debug!("Activation of {:?} vetoed", node);
                continue;
            }

            if removable {
                self.monitors.unregister(monitor, node);
            }

            let ids: Vec<ControllerId> = self
                .controllers_of(node)
                .into_iter()
                .filter(|id| {
                    let c = &self.controllers[id.0];
                    c.trigger_bound && c.monitor == Some(monitor)
                })
                .collect();
            for id in ids {
                self.run_trigger(id);
            }
        }
    }

    pub(crate) fn run_trigger(&mut self, id: ControllerId) {
        let Some(controller) = self.controllers.get(id.0) else {
            return;
        };
        if controller.options.removable && controller.state == ActivationState::Activated {
            return;
        }
        let element = controller.element;
        let removable = controller.options.removable;
        let monitor = controller.monitor;
        let callback = controller.options.callback.clone();

        let tree = self.tree();
        let target = controller
            .target_selector
            .as_ref()
            .and_then(|selector| tree.query_selector(element, selector))
            .unwrap_or(element);
        let class_override = tree
            .get_attribute(target, "data-activated")
            .filter(|class| !class.is_empty())
            .map(str::to_string);
        let fade_attribute = tree.has_attribute(element, "data-fade-in");
        let lazy_animation_class = tree
            .get_attribute(target, "data-lazy-animation")
            .filter(|class| !class.is_empty())
            .map(str::to_string);
        let in_picture = tree.tag_name(element) == Some("img")
            && tree
                .parent(element)
                .is_some_and(|parent| tree.tag_name(parent) == Some("picture"));

        let controller = &mut self.controllers[id.0];
        controller.state = ActivationState::Activating;
        if let Some(class) = class_override {
            controller.activated_class = class;
        }
        if fade_attribute {
            controller.fade_in = true;
        }
        let activated_class = controller.activated_class.clone();
        let fade_in = controller.fade_in;
        tracing::debug!("Activating {:?} ({:?})", element, id);

        match &lazy_animation_class {
            Some(animation) => {
                let animation = animation.clone();
                let delay = self.config().lazy_animation_delay_ms;
                self.next_frame(move |rt| {
                    rt.tree_mut().add_class(element, OPACITY_HIDDEN_CLASS);
                    rt.after(delay, move |rt| {
                        let tree = rt.tree_mut();
                        tree.add_class(element, &animation);
                        tree.remove_class(element, OPACITY_HIDDEN_CLASS);
                    });
                });
            }
            None if !activated_class.is_empty() => {
                let class = activated_class.clone();
                self.next_frame(move |rt| rt.tree_mut().add_class(target, &class));
            }
            None => {}
        }

        if let Some(callback) = callback {
            let context = ActivationContext {
                activated_class: activated_class.clone(),
                fade_in,
                lazy_animation_class,
                instance: id,
            };
            self.defer(move |rt| callback.call(rt, element, &context));
        }

        if in_picture {
            let sources: Vec<NodeId> = self
                .tree()
                .parent(element)
                .map(|parent| self.tree().descendants(parent))
                .unwrap_or_default()
                .into_iter()
                .filter(|&node| self.tree().tag_name(node) == Some("source"))
                .collect();
            for source in sources {
                self.activate_element(source, AssetOptions { in_picture: true, ..Default::default() });
            }
        }

        self.activate_element(
            element,
            AssetOptions {
                activated_class,
                fade_in,
                in_picture,
            },
        );

        self.controllers[id.0].state = ActivationState::Activated;
        let mut event = LifecycleEvent::activated(element, id, self.now());
        self.dispatch(&mut event);

        if removable {
            if let Some(monitor) = monitor {
                self.monitors.unregister(monitor, element);
            }
            if self.instances.get(&element) == Some(&id) {
                self.instances.remove(&element);
            }
            if let Some(ids) = self.by_element.get_mut(&element) {
                ids.retain(|&other| other != id);
                if ids.is_empty() {
                    self.by_element.remove(&element);
                }
            }
        }
    }

    /// Register a veto handler for `node`'s pre-activation event
    pub fn on_will_activate(&mut self, node: NodeId, handler: impl Fn(&mut LifecycleEvent) + 'static) {
        self.add_listener(node, EventKind::WillActivate, move |event| {
            if event.target == node {
                handler(event);
            }
        });
    }

    /// Register a handler for `node`'s activation
    pub fn on_activated(&mut self, node: NodeId, handler: impl Fn(&mut LifecycleEvent) + 'static) {
        self.add_listener(node, EventKind::Activated, move |event| {
            if event.target == node {
                handler(event);
            }
        });
    }

    /// Controller currently backing `node`
    pub fn instance_of(&self, node: NodeId) -> Option<ControllerId> {
        self.instances.get(&node).copied()
    }

    /// Controllers attached to `node` that can still activate
    ///
    /// One-shot controllers drop out once they have activated.
    pub fn controllers_of(&self, node: NodeId) -> Vec<ControllerId> {
        self.by_element.get(&node).cloned().unwrap_or_default()
    }

    pub fn controller(&self, id: ControllerId) -> Option<&Controller> {
        self.controllers.get(id.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Capabilities, EngineConfig, HostEnvironment};
    use lazyact_dom::{DOMRect, Document};
    use std::cell::RefCell;

    fn runtime(env: HostEnvironment) -> (Runtime, NodeId) {
        let mut doc = Document::new("https://example.com/");
        let body = doc.body();
        let div = doc.tree_mut().create_element("div");
        doc.tree_mut().append_child(body, div).unwrap();
        doc.tree_mut().set_rect(div, DOMRect::from_xywh(0.0, 2000.0, 100.0, 100.0));
        (Runtime::with_environment(doc, env, EngineConfig::default()), div)
    }

    #[test]
    fn test_default_options() {
        let options = ControllerOptions::default();
        assert_eq!(options.activated_class, "animation-started");
        assert_eq!(options.marker_attribute(), "data-activate-on-scroll-init");
        assert_eq!(options.options.root_margin, RootMargin::parse("300px 100px").unwrap());
        assert!(options.removable);
        assert!(options.activate_with_parent);
        assert!(!options.fade_in);
    }

    #[test]
    fn test_attach_sets_marker_and_waits() {
        let (mut rt, div) = runtime(HostEnvironment::default());
        let id = rt.attach(div, ControllerOptions::default()).unwrap();
        rt.run_pending();

        let controller = rt.controller(id).unwrap();
        assert_eq!(controller.state(), ActivationState::PendingVisible);
        assert!(controller.is_trigger_bound());
        assert!(controller.monitor().is_some());
        assert_eq!(rt.tree().get_attribute(div, "data-activate-on-scroll-init"), Some("true"));
        assert!(!rt.tree().has_class(div, "animation-started"));
        assert_eq!(rt.instance_of(div), Some(id));
    }

    #[test]
    fn test_attach_rejects_text() {
        let (mut rt, _) = runtime(HostEnvironment::default());
        let text = rt.tree_mut().create_text("hello");
        assert!(rt.attach(text, ControllerOptions::default()).is_err());
    }

    #[test]
    fn test_bad_target_selector() {
        let (mut rt, div) = runtime(HostEnvironment::default());
        let options = ControllerOptions::default().with_target_selector("[unterminated");
        assert!(rt.attach(div, options).is_err());
    }

    #[test]
    fn test_degraded_mode_activates_synchronously() {
        let (mut rt, div) = runtime(HostEnvironment::legacy());
        assert_eq!(rt.capabilities(), Capabilities::probe(&HostEnvironment::legacy()));

        let activated = Rc::new(RefCell::new(0));
        let count = activated.clone();
        rt.on_activated(div, move |_| *count.borrow_mut() += 1);

        let id = rt.attach(div, ControllerOptions::default()).unwrap();
        assert_eq!(*activated.borrow(), 1);
        assert_eq!(rt.controller(id).unwrap().state(), ActivationState::Activated);
        assert!(rt.controller(id).unwrap().monitor().is_none());
        assert_eq!(rt.instance_of(div), None);

        rt.run_pending();
        assert!(rt.tree().has_class(div, "animation-started"));
    }

    #[test]
    fn test_class_override_and_target_selector() {
        let (mut rt, div) = runtime(HostEnvironment::default());
        let inner = rt.tree_mut().create_element_with("span", &[("class", "inner"), ("data-activated", "pop")]);
        rt.tree_mut().append_child(div, inner).unwrap();

        let id = rt.attach(div, ControllerOptions::default().with_target_selector(".inner")).unwrap();
        rt.trigger(div);
        rt.run_pending();

        assert!(rt.tree().has_class(inner, "pop"));
        assert!(!rt.tree().has_class(div, "pop"));
        assert_eq!(rt.controller(id).unwrap().activated_class(), "pop");
    }

    #[test]
    fn test_lazy_animation_toggle() {
        let (mut rt, div) = runtime(HostEnvironment::default());
        rt.tree_mut().set_attribute(div, "data-lazy-animation", "slide-in");
        rt.attach(div, ControllerOptions::default()).unwrap();
        rt.trigger(div);

        rt.run_pending();
        assert!(rt.tree().has_class(div, "opacity-0"));
        assert!(!rt.tree().has_class(div, "slide-in"));
        assert!(!rt.tree().has_class(div, "animation-started"));

        rt.advance(50);
        assert!(rt.tree().has_class(div, "slide-in"));
        assert!(!rt.tree().has_class(div, "opacity-0"));
    }

    #[test]
    fn test_callback_is_deferred() {
        let (mut rt, div) = runtime(HostEnvironment::default());
        let seen = Rc::new(RefCell::new(None));
        let sink = seen.clone();
        let callback = Callback::new(move |_, node, context| {
            *sink.borrow_mut() = Some((node, context.instance, context.activated_class.clone()));
        });

        let id = rt.attach(div, ControllerOptions::default().with_callback(callback)).unwrap();
        rt.trigger(div);
        assert!(seen.borrow().is_none());

        rt.run_pending();
        assert_eq!(*seen.borrow(), Some((div, id, "animation-started".to_string())));
    }

    #[test]
    fn test_trigger_with_parent() {
        let (mut rt, div) = runtime(HostEnvironment::default());
        let child = rt.tree_mut().create_element("p");
        let orphan = rt.tree_mut().create_element("p");
        rt.tree_mut().append_child(div, child).unwrap();
        rt.tree_mut().append_child(div, orphan).unwrap();

        let follows = rt.attach(child, ControllerOptions::default()).unwrap();
        let exact = rt
            .attach(orphan, ControllerOptions::default().activate_with_parent(false))
            .unwrap();

        rt.trigger(div);
        assert_eq!(rt.controller(follows).unwrap().state(), ActivationState::Activated);
        assert_eq!(rt.controller(exact).unwrap().state(), ActivationState::PendingVisible);

        rt.trigger(orphan);
        assert_eq!(rt.controller(exact).unwrap().state(), ActivationState::Activated);
    }

    #[test]
    fn test_activated_one_shot_leaves_index() {
        let (mut rt, div) = runtime(HostEnvironment::default());
        let child = rt.tree_mut().create_element("p");
        rt.tree_mut().append_child(div, child).unwrap();
        let once = rt.attach(div, ControllerOptions::default()).unwrap();
        let repeating = rt
            .attach(child, ControllerOptions::default().removable(false))
            .unwrap();

        rt.trigger(div);
        assert_eq!(rt.controller(once).unwrap().state(), ActivationState::Activated);
        assert!(rt.controllers_of(div).is_empty());
        assert_eq!(rt.controllers_of(child), vec![repeating]);

        let activated = Rc::new(RefCell::new(Vec::new()));
        let sink = activated.clone();
        rt.add_listener(div, EventKind::Activated, move |event| sink.borrow_mut().push(event.target));
        rt.trigger(div);
        assert_eq!(*activated.borrow(), vec![child]);
    }
}
