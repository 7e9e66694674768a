//! Engine Configuration

use serde::Deserialize;

use crate::EngineResult;

/// Engine configuration options
///
/// Every field has a default, so a partial JSON document is enough.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Trailing debounce for mutation-driven re-scans
    pub rescan_debounce_ms: u64,

    /// Trailing debounce for the synthetic window resize after image loads
    pub resize_debounce_ms: u64,

    /// Minimum time between entering the viewport and the fade-in
    pub fade_min_dwell_ms: u64,

    /// Delay between hiding and animating a lazy-animation element
    pub lazy_animation_delay_ms: u64,

    /// Delay before clearing a video container background after iframe load
    pub iframe_background_delay_ms: u64,

    /// Wait for `Runtime::asset_loaded` instead of assuming loads complete
    pub track_asset_loads: bool,

    /// Initial viewport width
    pub viewport_width: f64,

    /// Initial viewport height
    pub viewport_height: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rescan_debounce_ms: 100,
            resize_debounce_ms: 100,
            fade_min_dwell_ms: 200,
            lazy_animation_delay_ms: 50,
            iframe_background_delay_ms: 500,
            track_asset_loads: false,
            viewport_width: 1024.0,
            viewport_height: 768.0,
        }
    }
}

impl EngineConfig {
    /// Parse a (possibly partial) JSON configuration
    pub fn from_json(json: &str) -> EngineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
