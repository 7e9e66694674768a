//! Plugin contract
//!
//! A plugin discovers the elements carrying its data attribute inside a
//! container and attaches an activation controller to each. Plugins are
//! idempotent through their own initialization marker.

use lazyact_dom::{data_attribute_name, NodeId};
use serde::Deserialize;

use crate::{EngineResult, Runtime};

/// Lazy-activation plugin
pub trait Plugin {
    /// Plugin name, for logging
    fn name(&self) -> &'static str;

    /// Dataset key of the initialization marker, e.g. `lazyimgInit`
    fn marker(&self) -> &'static str;

    /// Attach controllers to the unmarked elements inside `container`
    fn initializer(&self, rt: &mut Runtime, container: NodeId) -> EngineResult<()>;

    /// Whether this plugin has a cleaner
    fn cleans(&self) -> bool {
        false
    }

    /// Make `node` eligible for initialization again
    fn clean(&self, rt: &mut Runtime, node: NodeId) {
        rt.tree_mut().remove_attribute(node, &self.marker_attribute());
    }

    /// Marker attribute name, e.g. `data-lazyimg-init`
    fn marker_attribute(&self) -> String {
        data_attribute_name(self.marker())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum UrlList {
    Many(Vec<String>),
    One(String),
}

/// Parse a data attribute holding one URL or a JSON array of URLs
///
/// Anything that isn't valid JSON is taken as a single URL.
pub fn parse_url_list(raw: &str) -> Vec<String> {
    match serde_json::from_str::<UrlList>(raw) {
        Ok(UrlList::Many(urls)) => urls,
        Ok(UrlList::One(url)) => vec![url],
        Err(_) => vec![raw.to_string()],
    }
}

/// `true` unless the attribute is missing, empty or `"false"`
pub(crate) fn flag_attribute(rt: &Runtime, node: NodeId, name: &str) -> bool {
    rt.tree()
        .get_attribute(node, name)
        .is_some_and(|value| !value.is_empty() && value != "false")
}
