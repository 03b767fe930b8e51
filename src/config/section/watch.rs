//! `[watch]` and `[styles]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [watch]
//! channel_capacity = 1     # queued filesystem events per listener
//! overflow = "drop"        # "drop" or "rescan"
//! debounce_ms = 100        # 0 dispatches every event immediately
//!
//! [styles]
//! minify = false
//! ```
//!
//! With `overflow = "drop"` a burst larger than the channel loses events and
//! the stores are only eventually consistent with the disk. `"rescan"`
//! re-lists the directory whenever an overflow was detected.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// What a listener does after its event channel overflowed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// Log and carry on; dropped events are lost.
    #[default]
    Drop,
    /// Re-list the watched directory and reconcile it with what was seen.
    Rescan,
}

/// Listener settings shared by every watched directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub channel_capacity: usize,
    pub overflow: OverflowPolicy,
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1,
            overflow: OverflowPolicy::Drop,
            debounce_ms: 100,
        }
    }
}

impl WatchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Stylesheet output settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StylesConfig {
    /// Minify compiled CSS.
    pub minify: bool,
}
