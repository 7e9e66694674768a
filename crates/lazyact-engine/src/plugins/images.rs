//! Lazy images, backgrounds and interchange rules

use lazyact_dom::NodeId;

use crate::{ControllerOptions, EngineResult, Plugin, Runtime};

const SELECTOR: &str = "[data-lazy-interchange]:not([data-lazyimg-init]), \
                        [data-lazy-bg]:not([data-lazyimg-init]), \
                        [data-lazy-img]:not([data-lazyimg-init])";

/// Swaps `data-src`/`data-srcset`/`data-sizes` and lazy backgrounds in on activation
#[derive(Debug, Clone)]
pub struct LazyImages {
    options: ControllerOptions,
}

impl LazyImages {
    pub fn new() -> Self {
        Self {
            options: ControllerOptions::default().with_init_attribute("lazyimgInit"),
        }
    }
}

impl Default for LazyImages {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for LazyImages {
    fn name(&self) -> &'static str {
        "lazy-images"
    }

    fn marker(&self) -> &'static str {
        "lazyimgInit"
    }

    fn initializer(&self, rt: &mut Runtime, container: NodeId) -> EngineResult<()> {
        let count = super::attach_all(rt, container, SELECTOR, &self.options)?;
        tracing::debug!("lazy-images: {} new elements", count);
        Ok(())
    }

    fn cleans(&self) -> bool {
        true
    }

    /// Also undoes a fade-in that never completed
    fn clean(&self, rt: &mut Runtime, node: NodeId) {
        let tree = rt.tree_mut();
        tree.remove_attribute(node, "data-lazyimg-init");
        if tree.style(node, "opacity") == Some("0") {
            tree.set_style(node, "opacity", "");
        }
    }
}
