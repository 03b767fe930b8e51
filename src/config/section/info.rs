//! `[site]` section configuration.
//!
//! Site-wide text used by the home page and the site card.

use serde::{Deserialize, Serialize};

/// Site metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteInfoConfig {
    /// Site title, drawn on the site card.
    pub title: String,

    /// Public base URL. Post cards show `<url>/<slug>`.
    pub url: String,

    /// One-line description, used as the home page subtitle.
    pub summary: String,
}

impl Default for SiteInfoConfig {
    fn default() -> Self {
        Self {
            title: "Prose".into(),
            url: "http://localhost:8080".into(),
            summary: String::new(),
        }
    }
}

impl SiteInfoConfig {
    /// Public URL of a post, without a doubled slash.
    pub fn post_url(&self, slug: &str) -> String {
        format!("{}/{}", self.url.trim_end_matches('/'), slug)
    }
}
