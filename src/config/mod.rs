//! Site configuration management for `prose.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── info       # [site]
//! │   ├── paths      # [paths]
//! │   ├── serve      # [serve]
//! │   └── watch      # [watch], [styles]
//! ├── error.rs       # ConfigError
//! └── mod.rs         # SiteConfig (this file)
//! ```
//!
//! # Sections
//!
//! | Section     | Purpose                                         |
//! |-------------|-------------------------------------------------|
//! | `[site]`    | Title, public URL and summary                   |
//! | `[paths]`   | Content directories and compiled CSS output     |
//! | `[serve]`   | HTTP server (interface, port, watch, threads)   |
//! | `[watch]`   | Listener channel capacity, overflow, debounce   |
//! | `[styles]`  | Stylesheet minification                         |
//!
//! The config file is optional. Without it every section takes its defaults
//! and the project root is the current directory (or `--root`).

mod error;
pub mod section;

pub use error::ConfigError;
pub use section::{OverflowPolicy, PathsConfig, ServeConfig, SiteInfoConfig, StylesConfig, WatchConfig};

use crate::{
    cli::{Cli, ServeArgs},
    debug, log,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing prose.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    #[serde(default)]
    pub site: SiteInfoConfig,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub serve: ServeConfig,

    #[serde(default)]
    pub watch: WatchConfig,

    #[serde(default)]
    pub styles: StylesConfig,
}

impl SiteConfig {
    /// Load configuration from CLI arguments.
    ///
    /// The root is `--root` or the current directory; the config file is
    /// resolved against it. A missing file is not an error.
    pub fn load(cli: &Cli) -> Result<Self> {
        let root = Self::resolve_root(cli)?;
        let config_path = if cli.config.is_absolute() {
            cli.config.clone()
        } else {
            root.join(&cli.config)
        };

        let mut config = if config_path.is_file() {
            debug!("config"; "loading {}", config_path.display());
            Self::from_path(&config_path)?
        } else {
            debug!("config"; "{} not found, using defaults", config_path.display());
            Self::default()
        };

        config.config_path = config_path;
        config.root = root;
        config.finalize(cli.serve_args());
        config.validate()?;
        Ok(config)
    }

    fn resolve_root(cli: &Cli) -> Result<PathBuf> {
        let root = match &cli.root {
            Some(root) => root.clone(),
            None => std::env::current_dir().context("Failed to read current directory")?,
        };
        // Canonicalize so static-file containment checks compare like with like
        fs::canonicalize(&root)
            .with_context(|| format!("Project root `{}` is not accessible", root.display()))
    }

    /// Resolve paths and apply CLI overrides.
    fn finalize(&mut self, args: Option<&ServeArgs>) {
        self.paths.resolve(&self.root);
        if let Some(args) = args {
            self.apply_serve_options(args);
        }
    }

    fn apply_serve_options(&mut self, args: &ServeArgs) {
        Self::update_option(&mut self.serve.interface, args.interface.as_ref());
        Self::update_option(&mut self.serve.port, args.port.as_ref());
        Self::update_option(&mut self.serve.watch, args.watch.as_ref());
    }

    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Toml)?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;

        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })
        .map_err(ConfigError::Toml)?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "ignoring unknown fields in {}: {}", display_path, fields.join(", "));
    }

    /// Reject values the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.serve.port == 0 {
            return Err(ConfigError::Validation("[serve] port must not be 0".into()).into());
        }
        if self.serve.threads == 0 {
            return Err(ConfigError::Validation("[serve] threads must be at least 1".into()).into());
        }
        if self.watch.channel_capacity == 0 {
            return Err(
                ConfigError::Validation("[watch] channel_capacity must be at least 1".into())
                    .into(),
            );
        }
        Ok(())
    }
}

// ============================================================================
// test helpers
// ============================================================================

/// Parse a config snippet. Panics on unknown fields to catch typos in tests.
#[cfg(test)]
pub fn test_parse_config(extra: &str) -> SiteConfig {
    let (parsed, ignored) = SiteConfig::parse_with_ignored(extra).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================
