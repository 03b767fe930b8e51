//! Shared fixtures for tests that need a site on disk.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use crate::config::SiteConfig;
use crate::site::Site;

const TEMPLATES: [(&str, &str); 5] = [
    (
        "page",
        "<html><title>{{title}}</title><h2>{{subtitle}}</h2>{{{contents}}}</html>",
    ),
    (
        "fullpost",
        "<article><h1>{{metadata.title}}</h1><time>{{datetime metadata.published_at}}</time>{{{contents}}}</article>",
    ),
    ("summary", "<li><a href=\"/{{slug}}\">{{metadata.summary}}</a></li>"),
    ("notfound", "<p>nothing at {{path}}</p>"),
    ("error", "<p>error {{code}}</p>"),
];

/// Write `posts/<slug>.md` with a title, a summary of `summary of <slug>`
/// and `time` set to `published_at`.
pub fn write_post(dir: &Path, slug: &str, title: &str, published_at: i64) {
    let source = format!(
        "---\ntitle: {title}\nsummary: summary of {slug}\ntime: {published_at}\n---\n\nBody of *{slug}*.\n"
    );
    fs::write(dir.join(format!("{slug}.md")), source).unwrap();
}

/// Poll `condition` until it holds or five seconds pass.
pub fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(20));
    }
    condition()
}

/// A throwaway site: every required template, one stylesheet, one static
/// file and an empty posts directory.
pub struct SiteFixture {
    dir: TempDir,
}

impl SiteFixture {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path().to_path_buf();
        for sub in ["posts", "templates", "styles", "static"] {
            fs::create_dir_all(root.join(sub)).unwrap();
        }
        fs::write(root.join("styles/site.scss"), "$accent: red;\nbody { color: $accent; }\n").unwrap();
        fs::write(root.join("static/robots.txt"), "User-agent: *\n").unwrap();

        let fixture = Self { dir };
        for (name, source) in TEMPLATES {
            fixture.write_template(name, source);
        }
        fixture
    }

    pub fn root(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    pub fn posts_dir(&self) -> PathBuf {
        self.dir.path().join("posts")
    }

    pub fn write_template(&self, name: &str, source: &str) {
        let path = self.dir.path().join("templates").join(format!("{name}.html"));
        fs::write(path, source).unwrap();
    }

    pub fn config(&self) -> SiteConfig {
        let mut config = SiteConfig::default();
        config.root = self.root();
        config.paths.resolve(&config.root);
        config.watch.debounce_ms = 20;
        config.watch.channel_capacity = 64;
        config
    }

    pub fn open(&self) -> Arc<Site> {
        Arc::new(Site::open(&self.config()).unwrap())
    }
}
