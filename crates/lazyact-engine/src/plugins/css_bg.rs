//! Lazy CSS backgrounds
//!
//! The element's stylesheet background only applies once the controller adds
//! its class; the plugin then waits for that background to load.

use lazyact_dom::NodeId;

use crate::{Callback, ControllerOptions, EngineResult, EventKind, LifecycleEvent, ObserverOptions, Plugin, Runtime};

const SELECTOR: &str = "[data-lazy-css-bg]:not([data-lazycssbg-init])";

#[derive(Debug, Clone)]
pub struct LazyCssBg {
    options: ControllerOptions,
}

impl LazyCssBg {
    pub fn new() -> Self {
        let options = ControllerOptions {
            init_attribute: "lazycssbgInit".to_string(),
            options: ObserverOptions::default(),
            ..Default::default()
        }
        .with_callback(Callback::new(|rt, node, _| watch_background(rt, node)));
        Self { options }
    }
}

impl Default for LazyCssBg {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for LazyCssBg {
    fn name(&self) -> &'static str {
        "lazy-css-bg"
    }

    fn marker(&self) -> &'static str {
        "lazycssbgInit"
    }

    fn initializer(&self, rt: &mut Runtime, container: NodeId) -> EngineResult<()> {
        super::attach_all(rt, container, SELECTOR, &self.options)?;
        Ok(())
    }

    fn cleans(&self) -> bool {
        true
    }
}

fn watch_background(rt: &mut Runtime, node: NodeId) {
    rt.next_frame(move |rt| {
        rt.when_loaded(node, move |rt| {
            rt.next_frame(move |rt| {
                rt.tree_mut().set_attribute(node, "data-css-bg-loaded", "true");
                let mut event = LifecycleEvent::notify(EventKind::CssBackgroundLoaded, node, rt.now());
                rt.dispatch(&mut event);
            });
        });
    });
}
