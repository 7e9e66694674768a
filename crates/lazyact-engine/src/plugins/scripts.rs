//! Lazy scripts
//!
//! `data-lazy-script` holds one URL or a JSON array of URLs, appended to
//! `<head>` as `<script>` tags in order once the element nears the viewport.

use lazyact_dom::NodeId;

use crate::plugin::flag_attribute;
use crate::{parse_url_list, Callback, ControllerOptions, EngineResult, ObserverOptions, Plugin, Runtime};

const SELECTOR: &str = "[data-lazy-script]:not([data-lazyscript-init])";

#[derive(Debug, Clone)]
pub struct LazyScripts {
    options: ControllerOptions,
}

impl LazyScripts {
    pub fn new() -> EngineResult<Self> {
        let options = ControllerOptions {
            init_attribute: "lazyscriptInit".to_string(),
            options: ObserverOptions::from_margin("600px 200px")?,
            ..Default::default()
        }
        .with_callback(Callback::new(|rt, node, _| inject_scripts(rt, node)));
        Ok(Self { options })
    }
}

impl Plugin for LazyScripts {
    fn name(&self) -> &'static str {
        "lazy-scripts"
    }

    fn marker(&self) -> &'static str {
        "lazyscriptInit"
    }

    fn initializer(&self, rt: &mut Runtime, container: NodeId) -> EngineResult<()> {
        let count = super::attach_all(rt, container, SELECTOR, &self.options)?;
        tracing::debug!("lazy-scripts: {} new elements", count);
        Ok(())
    }
}

fn inject_scripts(rt: &mut Runtime, node: NodeId) {
    let Some(raw) = rt.tree().get_attribute(node, "data-lazy-script").map(str::to_string) else {
        return;
    };
    let allow_multiple = flag_attribute(rt, node, "data-lazy-script-allow-multiple");
    let existing = rt.document().scripts();
    let head = rt.document().head();

    for url in parse_url_list(&raw) {
        if !allow_multiple && existing.contains(&url) {
            tracing::trace!("Script {} already present", url);
            continue;
        }
        let tree = rt.tree_mut();
        let script = tree.create_element_with("script", &[("src", url.as_str())]);
        if let Err(e) = tree.append_child(head, script) {
            tracing::warn!("lazy-scripts: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lazyact_dom::Document;

    fn script_srcs(rt: &Runtime) -> Vec<String> {
        let head = rt.document().head();
        rt.tree()
            .element_children(head)
            .into_iter()
            .filter(|&n| rt.tree().tag_name(n) == Some("script"))
            .filter_map(|n| rt.tree().get_attribute(n, "src").map(str::to_string))
            .collect()
    }

    fn element(rt: &mut Runtime, attrs: &[(&str, &str)]) -> NodeId {
        let body = rt.document().body();
        let node = rt.tree_mut().create_element_with("div", attrs);
        rt.tree_mut().append_child(body, node).unwrap();
        node
    }

    #[test]
    fn test_dedupes_against_document() {
        let mut rt = Runtime::new(Document::default());
        let head = rt.document().head();
        let present = rt.tree_mut().create_element_with("script", &[("src", "a.js")]);
        rt.tree_mut().append_child(head, present).unwrap();
        let node = element(&mut rt, &[("data-lazy-script", r#"["a.js","b.js"]"#)]);

        let body = rt.document().body();
        LazyScripts::new().unwrap().initializer(&mut rt, body).unwrap();
        rt.trigger(node);
        rt.run_pending();
        assert_eq!(script_srcs(&rt), vec!["a.js", "b.js"]);
    }

    #[test]
    fn test_allow_multiple() {
        let mut rt = Runtime::new(Document::default());
        let first = element(&mut rt, &[("data-lazy-script", "c.js")]);
        let second = element(
            &mut rt,
            &[("data-lazy-script", "c.js"), ("data-lazy-script-allow-multiple", "true")],
        );

        let body = rt.document().body();
        LazyScripts::new().unwrap().initializer(&mut rt, body).unwrap();
        rt.trigger(first);
        rt.run_pending();
        rt.trigger(second);
        rt.run_pending();
        assert_eq!(script_srcs(&rt), vec!["c.js", "c.js"]);
    }
}
