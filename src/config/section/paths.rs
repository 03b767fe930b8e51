//! `[paths]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [paths]
//! posts = "posts"
//! templates = "templates"
//! styles = "styles"
//! static = "static"
//! fonts = "fonts"
//! css_output = "static/css"   # "" disables writing compiled stylesheets
//! ```
//!
//! Relative paths are resolved against the project root when the config is
//! loaded, so nothing downstream depends on the process working directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Content and output directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// One markdown file per post, slug = file stem.
    pub posts: PathBuf,

    /// One handlebars template per `.html` file.
    pub templates: PathBuf,

    /// `.scss` and `.css` sources.
    pub styles: PathBuf,

    /// Plain static files served as a fallback.
    #[serde(rename = "static")]
    pub static_dir: PathBuf,

    /// Font files used when drawing cards.
    pub fonts: PathBuf,

    /// Where compiled stylesheets are mirrored on disk.
    pub css_output: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            posts: "posts".into(),
            templates: "templates".into(),
            styles: "styles".into(),
            static_dir: "static".into(),
            fonts: "fonts".into(),
            css_output: Some("static/css".into()),
        }
    }
}

impl PathsConfig {
    /// Join every relative path onto `root`; an empty `css_output` disables it.
    pub fn resolve(&mut self, root: &Path) {
        for path in [
            &mut self.posts,
            &mut self.templates,
            &mut self.styles,
            &mut self.static_dir,
            &mut self.fonts,
        ] {
            *path = resolve_against(root, path);
        }

        self.css_output = self
            .css_output
            .take()
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| resolve_against(root, &p));
    }
}

fn resolve_against(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
