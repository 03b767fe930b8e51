//! Configuration section definitions.

mod info;
mod paths;
mod serve;
mod watch;

pub use info::SiteInfoConfig;
pub use paths::PathsConfig;
pub use serve::ServeConfig;
pub use watch::{OverflowPolicy, StylesConfig, WatchConfig};
