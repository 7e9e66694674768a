//! Entrance animations
//!
//! `data-animate="fade-up"` adds `fade-up` once the element nears the
//! viewport. `data-root-margin` overrides the default margin per element.

use lazyact_dom::NodeId;

use crate::{Callback, ControllerOptions, EngineResult, EventKind, LifecycleEvent, Plugin, RootMargin, Runtime};

const SELECTOR: &str = "[data-animate]:not([data-animate-init])";

#[derive(Debug, Clone)]
pub struct Animate {
    options: ControllerOptions,
}

impl Animate {
    pub fn new() -> Self {
        let options = ControllerOptions::default()
            .with_init_attribute("animateInit")
            .with_callback(Callback::new(|rt, node, _| animate(rt, node)));
        Self { options }
    }

    fn options_for(&self, rt: &Runtime, element: NodeId) -> ControllerOptions {
        let Some(raw) = rt.tree().get_attribute(element, "data-root-margin") else {
            return self.options.clone();
        };
        match RootMargin::parse(raw) {
            Ok(margin) => self.options.clone().with_root_margin(margin),
            Err(e) => {
                tracing::warn!("animate: {} on {:?}, using the default margin", e, element);
                self.options.clone()
            }
        }
    }
}

impl Default for Animate {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for Animate {
    fn name(&self) -> &'static str {
        "animate"
    }

    fn marker(&self) -> &'static str {
        "animateInit"
    }

    fn initializer(&self, rt: &mut Runtime, container: NodeId) -> EngineResult<()> {
        let elements = rt.tree().select(container, SELECTOR)?;
        for element in elements {
            let options = self.options_for(rt, element);
            rt.attach(element, options)?;
        }
        Ok(())
    }

    fn cleans(&self) -> bool {
        true
    }
}

fn animate(rt: &mut Runtime, node: NodeId) {
    rt.next_frame(move |rt| {
        let tree = rt.tree_mut();
        tree.set_attribute(node, "data-animation-loaded", "true");
        let class = tree.get_attribute(node, "data-animate").unwrap_or_default().to_string();
        if !class.is_empty() {
            tree.add_class(node, &class);
        }
        let mut event = LifecycleEvent::notify(EventKind::AnimationLoaded, node, rt.now());
        rt.dispatch(&mut event);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use lazyact_dom::Document;

    fn element(rt: &mut Runtime, attrs: &[(&str, &str)]) -> NodeId {
        let body = rt.document().body();
        let node = rt.tree_mut().create_element_with("div", attrs);
        rt.tree_mut().append_child(body, node).unwrap();
        node
    }

    #[test]
    fn test_adds_class() {
        let mut rt = Runtime::new(Document::default());
        let node = element(&mut rt, &[("data-animate", "fade-up")]);
        let body = rt.document().body();

        Animate::new().initializer(&mut rt, body).unwrap();
        rt.trigger(node);
        rt.run_pending();
        assert!(rt.tree().has_class(node, "fade-up"));
        assert_eq!(rt.tree().get_attribute(node, "data-animation-loaded"), Some("true"));
    }

    #[test]
    fn test_root_margin_override() {
        let mut rt = Runtime::new(Document::default());
        let default = element(&mut rt, &[("data-animate", "a")]);
        let custom = element(&mut rt, &[("data-animate", "b"), ("data-root-margin", "0px")]);
        let broken = element(&mut rt, &[("data-animate", "c"), ("data-root-margin", "lots")]);
        let body = rt.document().body();

        Animate::new().initializer(&mut rt, body).unwrap();
        let monitor = |node| rt.controller(rt.instance_of(node).unwrap()).unwrap().monitor();
        assert_eq!(monitor(default), monitor(broken));
        assert_ne!(monitor(default), monitor(custom));
        assert_eq!(
            rt.monitors().config(monitor(custom).unwrap()).unwrap().options.root_margin,
            RootMargin::ZERO
        );
    }
}
