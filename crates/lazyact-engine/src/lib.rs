//! lazyact Engine
//!
//! Defers costly work (image decoding, iframe embedding, script and style
//! injection, video loading, entrance animations) until an element is about
//! to enter the viewport.
//!
//! # Pieces
//! - [`MonitorRegistry`]: one viewport subscription per distinct controller configuration
//! - [`Runtime::attach`]: the per-element activation controller
//! - [`LazyLoadAssets`]: scans a container with a set of [`Plugin`]s and re-scans on mutation
//!
//! # Example
//! ```rust,ignore
//! use lazyact_engine::{LazyLoadAssets, LoadOptions, Runtime};
//!
//! let mut rt = Runtime::new(document);
//! let assets = LazyLoadAssets::new(&mut rt, LoadOptions::default())?;
//! rt.scroll_to(0.0, 1200.0);
//! rt.run_pending();
//! ```

mod assets;
mod capabilities;
mod config;
mod controller;
mod error;
mod events;
mod intersection;
mod monitor;
mod orchestrator;
mod plugin;
pub mod plugins;
mod ready;
mod runtime;
mod scheduler;

pub use assets::AssetOptions;
pub use capabilities::{Capabilities, HostEnvironment};
pub use config::EngineConfig;
pub use controller::{
    ActivationContext, ActivationState, Callback, Controller, ControllerId, ControllerOptions,
};
pub use error::{EngineError, EngineResult};
pub use events::{EventBus, EventKind, LifecycleEvent, Listener};
pub use intersection::{IntersectionEntry, IntersectionObserver, Length, ObserverOptions, RootMargin};
pub use monitor::{MonitorConfig, MonitorId, MonitorRegistry};
pub use orchestrator::{LazyLoadAssets, LoadOptions};
pub use plugin::{parse_url_list, Plugin};
pub use runtime::Runtime;
pub use scheduler::{Scheduler, Task, TimerId};

// Re-export the document model for hosts
pub use lazyact_dom as dom;

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
