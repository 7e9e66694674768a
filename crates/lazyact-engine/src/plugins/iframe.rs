//! Lazy iframes
//!
//! `data-lazy-iframe` marks either the iframe itself or a container holding
//! an `iframe[data-lazysrc]` next to placeholder markup.

use lazyact_dom::{NodeId, Selector};

use crate::{Callback, ControllerOptions, EngineResult, Plugin, RootMargin, Runtime};

const SELECTOR: &str = "[data-lazy-iframe]:not([data-lazyiframe-init])";
const LAZY_IFRAME: &str = "iframe[data-lazysrc]";
const KEPT_CONTENT: &str = ".iframe-content";
const VIDEO_BACKGROUND: &str = ".bg-video-container";

/// Assigns the deferred iframe `src` on activation
#[derive(Debug, Clone)]
pub struct LazyIframe {
    options: ControllerOptions,
}

impl LazyIframe {
    pub fn new() -> Self {
        let options = ControllerOptions::default()
            .with_activated_class("iframe-loaded")
            .with_root_margin(RootMargin::ZERO)
            .with_callback(Callback::new(|rt, node, _| {
                if let Err(e) = activate(rt, node) {
                    tracing::warn!("lazy-iframe: {}", e);
                }
            }));
        Self { options }
    }
}

impl Default for LazyIframe {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for LazyIframe {
    fn name(&self) -> &'static str {
        "lazy-iframe"
    }

    fn marker(&self) -> &'static str {
        "lazyiframeInit"
    }

    fn initializer(&self, rt: &mut Runtime, container: NodeId) -> EngineResult<()> {
        let elements = rt.tree().select(container, SELECTOR)?;
        for element in elements {
            rt.tree_mut().set_attribute(element, "data-lazyiframe-init", "true");
            let delay = rt
                .tree()
                .get_attribute(element, "data-lazy-iframe-delay")
                .and_then(|d| d.trim().parse::<u64>().ok())
                .unwrap_or(0);

            let options = self.options.clone();
            rt.after(delay, move |rt| {
                if let Err(e) = rt.attach(element, options) {
                    tracing::warn!("lazy-iframe: {}", e);
                }
            });
        }
        Ok(())
    }

    fn cleans(&self) -> bool {
        true
    }
}

fn activate(rt: &mut Runtime, element: NodeId) -> EngineResult<()> {
    let lazy_iframe = Selector::parse(LAZY_IFRAME)?;
    if rt.tree().tag_name(element) == Some("iframe") {
        load_iframe(rt, element)?;
        return Ok(());
    }

    // drop the placeholder
    let kept = Selector::parse(KEPT_CONTENT)?;
    let placeholders: Vec<NodeId> = rt
        .tree()
        .element_children(element)
        .into_iter()
        .filter(|&child| !rt.tree().matches(child, &lazy_iframe) && !rt.tree().matches(child, &kept))
        .collect();
    for placeholder in placeholders {
        rt.tree_mut().detach(placeholder);
    }
    rt.tree_mut().remove_attribute(element, "data-lazy-iframe");

    if let Some(iframe) = rt.tree().query_selector(element, &lazy_iframe) {
        load_iframe(rt, iframe)?;
    }
    Ok(())
}

fn load_iframe(rt: &mut Runtime, iframe: NodeId) -> EngineResult<()> {
    let background = rt.tree().closest(iframe, &Selector::parse(VIDEO_BACKGROUND)?);
    let tree = rt.tree_mut();
    if let Some(src) = tree.remove_attribute(iframe, "data-lazysrc") {
        tree.set_attribute(iframe, "src", &src);
    }

    if let Some(background) = background {
        let delay = rt.config().iframe_background_delay_ms;
        rt.when_loaded(iframe, move |rt| {
            rt.after(delay, move |rt| rt.tree_mut().set_style(background, "background", "none"));
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lazyact_dom::Document;

    fn setup() -> (Runtime, NodeId, NodeId, NodeId) {
        let mut rt = Runtime::new(Document::default());
        let body = rt.document().body();
        let tree = rt.tree_mut();
        let container = tree.create_element_with("div", &[("data-lazy-iframe", ""), ("class", "bg-video-container")]);
        let placeholder = tree.create_element_with("img", &[("src", "poster.jpg")]);
        let iframe = tree.create_element_with("iframe", &[("data-lazysrc", "https://video.example/embed")]);
        tree.append_child(body, container).unwrap();
        tree.append_child(container, placeholder).unwrap();
        tree.append_child(container, iframe).unwrap();
        (rt, container, placeholder, iframe)
    }

    #[test]
    fn test_container_activation() {
        let (mut rt, container, placeholder, iframe) = setup();
        let body = rt.document().body();
        LazyIframe::new().initializer(&mut rt, body).unwrap();
        assert_eq!(rt.tree().get_attribute(container, "data-lazyiframe-init"), Some("true"));
        rt.run_pending();

        rt.trigger(container);
        rt.run_pending();
        assert_eq!(rt.tree().get_attribute(iframe, "src"), Some("https://video.example/embed"));
        assert!(!rt.tree().has_attribute(iframe, "data-lazysrc"));
        assert!(!rt.tree().has_attribute(container, "data-lazy-iframe"));
        assert_eq!(rt.tree().parent(placeholder), None);
        assert!(rt.tree().has_class(container, "iframe-loaded"));

        rt.tree_mut().set_style(container, "background", "url(poster.jpg)");
        rt.advance(499);
        assert_eq!(rt.tree().style(container, "background"), Some("url(poster.jpg)"));
        rt.advance(1);
        assert_eq!(rt.tree().style(container, "background"), Some("none"));
    }

    #[test]
    fn test_delay_postpones_attach() {
        let (mut rt, container, _, _) = setup();
        rt.tree_mut().set_attribute(container, "data-lazy-iframe-delay", "3000");
        let body = rt.document().body();
        LazyIframe::new().initializer(&mut rt, body).unwrap();

        rt.advance(2999);
        assert!(rt.instance_of(container).is_none());
        rt.advance(1);
        assert!(rt.instance_of(container).is_some());
    }
}
