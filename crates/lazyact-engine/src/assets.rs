//! Asset activation
//!
//! Swaps deferred sources (`data-src`, `data-srcset`, `data-sizes`, lazy
//! backgrounds, interchange rules) into place and finishes the element once
//! the asset has loaded.

use lazyact_dom::NodeId;

use crate::{EventKind, LifecycleEvent, Runtime};

/// Options for [`Runtime::activate_element`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetOptions {
    /// Class added once the asset has loaded (empty for none)
    pub activated_class: String,
    pub fade_in: bool,
    /// The element is an `<img>` or `<source>` of a `<picture>`
    pub in_picture: bool,
}

/// What an element asks to have swapped in
#[derive(Debug, Clone, Copy)]
struct AssetKind {
    interchange: bool,
    lazy_bg: bool,
    lazy_img: bool,
    interchange_sizes: bool,
}

impl Runtime {
    /// Activate the deferred assets of one element
    ///
    /// Elements without a lazy image, background or interchange marker are
    /// left untouched.
    pub fn activate_element(&mut self, node: NodeId, options: AssetOptions) {
        let into_view = self.now();
        let tree = self.tree();
        let interchange = tree
            .get_attribute(node, "data-lazy-interchange")
            .map(str::to_string);
        let kind = AssetKind {
            interchange: interchange.is_some(),
            lazy_bg: tree.has_attribute(node, "data-lazy-bg"),
            lazy_img: tree.has_attribute(node, "data-lazy-img") || tree.has_attribute(node, "data-srcset"),
            interchange_sizes: tree.has_attribute(node, "data-interchange-sizes"),
        };
        if !(kind.interchange || kind.lazy_bg || kind.lazy_img) {
            return;
        }
        let is_img = tree.tag_name(node) == Some("img");
        tracing::trace!("Activating assets of {:?}: {:?}", node, kind);

        let fade_in = options.fade_in;
        let in_picture = options.in_picture;
        let mut pending = Some(move |rt: &mut Runtime| rt.finish_element(node, kind, into_view, options));

        // picture sources don't load anything themselves
        if in_picture && !is_img {
            if let Some(finish) = pending.take() {
                finish(self);
            }
        }

        if fade_in {
            self.next_frame(move |rt| {
                rt.tree_mut().set_style(node, "opacity", "0");
                rt.tree_mut().set_style(node, "transition", "opacity 0.3s");
            });
        }

        if let Some(rule) = interchange {
            let tree = self.tree_mut();
            tree.set_attribute(node, "data-interchange", &rule);
            tree.remove_attribute(node, "data-lazy-interchange");
            tree.set_attribute(node, "data-foundation-loaded", "true");
        }

        if kind.lazy_bg || kind.lazy_img {
            self.next_frame(move |rt| {
                rt.swap_sources(node, kind);
                if let Some(finish) = pending {
                    rt.when_loaded(node, finish);
                }
            });
        } else if let Some(finish) = pending {
            self.when_loaded(node, finish);
        }
    }

    fn swap_sources(&mut self, node: NodeId, kind: AssetKind) {
        let tree = self.tree_mut();
        let url = tree.get_attribute(node, "data-src").map(str::to_string);

        if kind.lazy_bg {
            if let Some(url) = url {
                tree.set_style(node, "background-image", &format!("url({url})"));
            }
            tree.remove_attribute(node, "data-lazy-bg");
            return;
        }

        if let Some(url) = url {
            tree.set_attribute(node, "src", &url);
            tree.remove_attribute(node, "data-src");
        }
        tree.remove_attribute(node, "data-lazy-img");
        for name in ["srcset", "sizes"] {
            let shadow = format!("data-{name}");
            if let Some(value) = tree.remove_attribute(node, &shadow) {
                tree.set_attribute(node, name, &value);
            }
        }
    }

    fn finish_element(&mut self, node: NodeId, kind: AssetKind, into_view: u64, options: AssetOptions) {
        let class = options.activated_class;
        self.next_frame(move |rt| {
            let tree = rt.tree_mut();
            if !class.is_empty() {
                tree.add_class(node, &class);
            }
            tree.set_attribute(node, "data-lazy-loaded", "true");
        });

        if options.fade_in {
            let dwell = self.config().fade_min_dwell_ms;
            let interval = self.now().saturating_sub(into_view);
            let show = move |rt: &mut Runtime| {
                rt.next_frame(move |rt| rt.tree_mut().set_style(node, "opacity", "1"));
            };
            if self.tree().tag_name(node) == Some("img") || interval >= dwell {
                show(self);
            } else {
                self.after(dwell - interval, show);
            }
        }

        if kind.lazy_img && !kind.interchange_sizes && !options.in_picture {
            self.schedule_resize();
        }

        let foundation_loaded = self.tree().has_attribute(node, "data-foundation-loaded");
        if kind.interchange_sizes && (kind.lazy_img || (kind.interchange && foundation_loaded)) {
            let lazy_img = kind.lazy_img;
            self.next_frame(move |rt| {
                let tree = rt.tree_mut();
                if lazy_img {
                    tree.set_attribute(node, "data-img-loaded", "true");
                }
                tree.remove_attribute(node, "width");
                tree.remove_attribute(node, "height");
                tree.set_style(node, "height", "");
                tree.set_style(node, "width", "");
            });
        }
    }

    /// Debounced window resize, so layouts notice the newly sized images
    fn schedule_resize(&mut self) {
        if let Some(timer) = self.resize_timer.take() {
            self.cancel_timer(timer);
        }
        let delay = self.config().resize_debounce_ms;
        let timer = self.after(delay, |rt| {
            rt.resize_timer = None;
            let resize = |rt: &mut Runtime| {
                rt.next_frame(|rt| {
                    let mut event = LifecycleEvent::notify(EventKind::Resize, NodeId::ROOT, rt.now());
                    rt.dispatch(&mut event);
                });
            };
            if rt.capabilities().supports_idle_callback {
                rt.idle(resize);
            } else {
                resize(rt);
            }
        });
        self.resize_timer = Some(timer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EngineConfig, HostEnvironment};
    use lazyact_dom::Document;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn runtime_with(config: EngineConfig) -> Runtime {
        Runtime::with_environment(Document::new("https://example.com/"), HostEnvironment::default(), config)
    }

    fn element(rt: &mut Runtime, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let body = rt.document().body();
        let node = rt.tree_mut().create_element_with(tag, attrs);
        rt.tree_mut().append_child(body, node).unwrap();
        node
    }

    fn opts(class: &str) -> AssetOptions {
        AssetOptions {
            activated_class: class.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_image_swap() {
        let mut rt = runtime_with(EngineConfig::default());
        let img = element(
            &mut rt,
            "img",
            &[("data-lazy-img", ""), ("data-src", "a.png"), ("data-srcset", "a2.png 2x"), ("data-sizes", "50vw")],
        );

        rt.activate_element(img, opts("loaded"));
        assert_eq!(rt.tree().get_attribute(img, "src"), None);

        rt.run_pending();
        let tree = rt.tree();
        assert_eq!(tree.get_attribute(img, "src"), Some("a.png"));
        assert_eq!(tree.get_attribute(img, "srcset"), Some("a2.png 2x"));
        assert_eq!(tree.get_attribute(img, "sizes"), Some("50vw"));
        for shadow in ["data-src", "data-srcset", "data-sizes", "data-lazy-img"] {
            assert!(!tree.has_attribute(img, shadow), "{shadow} left behind");
        }
        assert!(tree.has_class(img, "loaded"));
        assert_eq!(tree.get_attribute(img, "data-lazy-loaded"), Some("true"));
    }

    #[test]
    fn test_background_swap() {
        let mut rt = runtime_with(EngineConfig::default());
        let div = element(&mut rt, "div", &[("data-lazy-bg", ""), ("data-src", "bg.jpg")]);

        rt.activate_element(div, AssetOptions::default());
        rt.run_pending();
        assert_eq!(rt.tree().style(div, "background-image"), Some("url(bg.jpg)"));
        assert!(!rt.tree().has_attribute(div, "data-lazy-bg"));
        assert_eq!(rt.tree().get_attribute(div, "data-lazy-loaded"), Some("true"));
    }

    #[test]
    fn test_interchange() {
        let mut rt = runtime_with(EngineConfig::default());
        let div = element(
            &mut rt,
            "div",
            &[("data-lazy-interchange", "[a.jpg, small]"), ("data-interchange-sizes", "{}"), ("width", "10")],
        );

        rt.activate_element(div, AssetOptions::default());
        assert_eq!(rt.tree().get_attribute(div, "data-interchange"), Some("[a.jpg, small]"));
        assert_eq!(rt.tree().get_attribute(div, "data-foundation-loaded"), Some("true"));
        assert!(!rt.tree().has_attribute(div, "data-lazy-interchange"));

        rt.run_pending();
        assert!(!rt.tree().has_attribute(div, "width"));
        assert!(!rt.tree().has_attribute(div, "data-img-loaded"));
    }

    #[test]
    fn test_plain_element_untouched() {
        let mut rt = runtime_with(EngineConfig::default());
        let div = element(&mut rt, "div", &[]);
        rt.activate_element(div, opts("loaded"));
        rt.run_pending();
        assert!(!rt.tree().has_class(div, "loaded"));
        assert!(!rt.tree().has_attribute(div, "data-lazy-loaded"));
    }

    #[test]
    fn test_fade_waits_for_dwell() {
        let mut rt = runtime_with(EngineConfig::default());
        let div = element(&mut rt, "div", &[("data-lazy-bg", ""), ("data-src", "bg.jpg")]);

        rt.activate_element(div, AssetOptions { fade_in: true, ..Default::default() });
        rt.run_pending();
        assert_eq!(rt.tree().style(div, "opacity"), Some("0"));
        assert_eq!(rt.tree().style(div, "transition"), Some("opacity 0.3s"));

        rt.advance(199);
        assert_eq!(rt.tree().style(div, "opacity"), Some("0"));
        rt.advance(1);
        assert_eq!(rt.tree().style(div, "opacity"), Some("1"));
    }

    #[test]
    fn test_fade_after_full_dwell_is_immediate() {
        let config = EngineConfig {
            track_asset_loads: true,
            ..Default::default()
        };
        let mut rt = runtime_with(config);
        let div = element(&mut rt, "div", &[("data-lazy-bg", ""), ("data-src", "bg.jpg")]);

        rt.activate_element(div, AssetOptions { fade_in: true, ..Default::default() });
        rt.advance(200);
        assert_eq!(rt.tree().style(div, "opacity"), Some("0"));

        // loaded exactly at the dwell boundary, shown without advancing
        rt.asset_loaded(div);
        rt.run_pending();
        assert_eq!(rt.tree().style(div, "opacity"), Some("1"));
        assert!(!rt.has_pending_work());
    }

    #[test]
    fn test_fade_image_is_immediate() {
        let mut rt = runtime_with(EngineConfig::default());
        let img = element(&mut rt, "img", &[("data-lazy-img", ""), ("data-src", "a.png")]);

        rt.activate_element(img, AssetOptions { fade_in: true, ..Default::default() });
        rt.run_pending();
        assert_eq!(rt.now(), 0);
        assert_eq!(rt.tree().style(img, "opacity"), Some("1"));
    }

    #[test]
    fn test_tracked_loads() {
        let config = EngineConfig {
            track_asset_loads: true,
            ..Default::default()
        };
        let mut rt = runtime_with(config);
        let img = element(&mut rt, "img", &[("data-lazy-img", ""), ("data-src", "a.png")]);

        rt.activate_element(img, opts("loaded"));
        rt.advance(1000);
        assert_eq!(rt.tree().get_attribute(img, "src"), Some("a.png"));
        assert!(!rt.tree().has_class(img, "loaded"));

        rt.asset_loaded(img);
        rt.run_pending();
        assert!(rt.tree().has_class(img, "loaded"));
    }

    #[test]
    fn test_resize_is_debounced() {
        let mut rt = runtime_with(EngineConfig::default());
        let resizes = Rc::new(RefCell::new(0));
        let count = resizes.clone();
        rt.add_listener(NodeId::ROOT, EventKind::Resize, move |_| *count.borrow_mut() += 1);

        let first = element(&mut rt, "img", &[("data-lazy-img", ""), ("data-src", "a.png")]);
        let second = element(&mut rt, "img", &[("data-lazy-img", ""), ("data-src", "b.png")]);
        rt.activate_element(first, AssetOptions::default());
        rt.advance(60);
        rt.activate_element(second, AssetOptions::default());
        rt.advance(99);
        assert_eq!(*resizes.borrow(), 0);

        rt.advance(1);
        assert_eq!(*resizes.borrow(), 1);
        rt.advance(500);
        assert_eq!(*resizes.borrow(), 1);
    }
}
