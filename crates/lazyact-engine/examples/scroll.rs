//! Example: scroll through a page of lazy assets
//!
//! Run with `RUST_LOG=lazyact_engine=debug` to watch the scans and activations.

use std::rc::Rc;

use lazyact_engine::dom::{DOMRect, Document, ReadyState};
use lazyact_engine::plugins::{Animate, LazyImages, LazyScripts};
use lazyact_engine::{LazyLoadAssets, LoadOptions, Plugin, Runtime};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut doc = Document::new("https://example.com/gallery");
    let body = doc.body();
    let mut images = Vec::new();
    for i in 0..6 {
        let src = format!("photo-{i}.jpg");
        let img = doc
            .tree_mut()
            .create_element_with("img", &[("data-lazy-img", ""), ("data-src", src.as_str())]);
        doc.tree_mut().append_child(body, img)?;
        doc.tree_mut().set_rect(img, DOMRect::from_xywh(0.0, 600.0 * i as f64, 800.0, 500.0));
        images.push(img);
    }
    let footer = doc
        .tree_mut()
        .create_element_with("footer", &[("data-animate", "fade-up"), ("data-lazy-script", "comments.js")]);
    doc.tree_mut().append_child(body, footer)?;
    doc.tree_mut().set_rect(footer, DOMRect::from_xywh(0.0, 3600.0, 800.0, 200.0));

    let plugins: Vec<Rc<dyn Plugin>> = vec![
        Rc::new(LazyImages::new()),
        Rc::new(Animate::new()),
        Rc::new(LazyScripts::new()?),
    ];

    let mut rt = Runtime::new(doc);
    rt.on_ready(move |rt| {
        let options = LoadOptions {
            plugins,
            ..Default::default()
        };
        if let Err(e) = LazyLoadAssets::new(rt, options) {
            tracing::error!("Failed to start: {}", e);
        }
    });
    rt.set_ready_state(ReadyState::Interactive);

    for step in 0..=8 {
        rt.scroll_to(0.0, 450.0 * step as f64);
        rt.advance(16);
        let loaded = images
            .iter()
            .filter(|&&img| rt.tree().has_attribute(img, "src"))
            .count();
        println!("scrollY={:>5}  images loaded: {}/{}", 450 * step, loaded, images.len());
    }

    println!(
        "footer animated: {}, scripts: {:?}",
        rt.tree().has_class(footer, "fade-up"),
        rt.document().scripts()
    );
    println!("monitors created: {}", rt.monitors().len());
    Ok(())
}
