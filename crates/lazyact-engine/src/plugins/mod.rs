//! Built-in plugins
//!
//! One plugin per kind of deferred asset. Each attaches controllers with its
//! own marker, margin and callback; the callback is built once so all of a
//! plugin's elements share one monitor.

mod animate;
mod css_bg;
mod iframe;
mod images;
mod scripts;
mod styles;
mod video;

pub use animate::Animate;
pub use css_bg::LazyCssBg;
pub use iframe::LazyIframe;
pub use images::LazyImages;
pub use scripts::LazyScripts;
pub use styles::LazyStyles;
pub use video::LazyVideo;

use lazyact_dom::NodeId;

use crate::{ControllerOptions, EngineResult, Runtime};

/// Attach a controller to every match of `selector` inside `container`
fn attach_all(
    rt: &mut Runtime,
    container: NodeId,
    selector: &str,
    options: &ControllerOptions,
) -> EngineResult<usize> {
    let elements = rt.tree().select(container, selector)?;
    for &element in &elements {
        rt.attach(element, options.clone())?;
    }
    Ok(elements.len())
}
