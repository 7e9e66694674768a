//! Lazy stylesheets

use lazyact_dom::NodeId;

use crate::plugin::flag_attribute;
use crate::{parse_url_list, Callback, ControllerOptions, EngineResult, ObserverOptions, Plugin, Runtime};

const SELECTOR: &str = "[data-lazy-stylesheet]:not([data-lazystylesheet-init])";

/// Appends `<link rel="stylesheet">` tags for `data-lazy-stylesheet` URLs
#[derive(Debug, Clone)]
pub struct LazyStyles {
    options: ControllerOptions,
}

impl LazyStyles {
    pub fn new() -> EngineResult<Self> {
        let options = ControllerOptions {
            init_attribute: "lazystylesheetInit".to_string(),
            options: ObserverOptions::from_margin("200px 100px")?,
            ..Default::default()
        }
        .with_callback(Callback::new(|rt, node, _| inject_styles(rt, node)));
        Ok(Self { options })
    }
}

impl Plugin for LazyStyles {
    fn name(&self) -> &'static str {
        "lazy-styles"
    }

    fn marker(&self) -> &'static str {
        "lazystylesheetInit"
    }

    fn initializer(&self, rt: &mut Runtime, container: NodeId) -> EngineResult<()> {
        super::attach_all(rt, container, SELECTOR, &self.options)?;
        Ok(())
    }
}

fn inject_styles(rt: &mut Runtime, node: NodeId) {
    let Some(raw) = rt
        .tree()
        .get_attribute(node, "data-lazy-stylesheet")
        .map(str::to_string)
    else {
        return;
    };
    let allow_multiple = flag_attribute(rt, node, "data-lazy-stylesheet-allow-multiple");
    let existing = rt.document().stylesheets();
    let head = rt.document().head();

    for href in parse_url_list(&raw) {
        if !allow_multiple && existing.contains(&href) {
            continue;
        }
        let tree = rt.tree_mut();
        let link = tree.create_element_with(
            "link",
            &[("rel", "stylesheet"), ("type", "text/css"), ("href", href.as_str())],
        );
        if let Err(e) = tree.append_child(head, link) {
            tracing::warn!("lazy-styles: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lazyact_dom::Document;

    #[test]
    fn test_appends_links() {
        let mut rt = Runtime::new(Document::default());
        let body = rt.document().body();
        let head = rt.document().head();
        let present = rt
            .tree_mut()
            .create_element_with("link", &[("rel", "stylesheet"), ("href", "base.css")]);
        rt.tree_mut().append_child(head, present).unwrap();
        let node = rt
            .tree_mut()
            .create_element_with("section", &[("data-lazy-stylesheet", r#"["base.css","late.css"]"#)]);
        rt.tree_mut().append_child(body, node).unwrap();

        LazyStyles::new().unwrap().initializer(&mut rt, body).unwrap();
        rt.trigger(node);
        rt.run_pending();

        assert_eq!(rt.document().stylesheets(), vec!["base.css", "late.css"]);
        let link = rt.tree().element_children(head)[1];
        assert_eq!(rt.tree().get_attribute(link, "type"), Some("text/css"));
    }
}
