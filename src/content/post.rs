//! Blog posts: one markdown file per post, slug = file stem.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::Serialize;

use super::card::CardPainter;
use super::markdown::{PostMeta, render_markdown};
use crate::config::SiteInfoConfig;
use crate::store::{PostCollection, Timestamped};
use crate::watch::{ContentHandler, is_ignored};
use crate::{debug, log};

pub type PostStore = PostCollection<Post>;

/// A fully rendered post. Never partially updated: a reload builds a new one.
#[derive(Debug, Clone, Serialize)]
pub struct Post {
    pub slug: String,
    pub metadata: PostMeta,
    /// Rendered HTML body.
    pub contents: String,
    /// PNG card.
    #[serde(skip)]
    pub card: Vec<u8>,
}

impl Timestamped for Post {
    fn slug(&self) -> &str {
        &self.slug
    }

    fn published_at(&self) -> i64 {
        self.metadata.published_at
    }
}

/// Slug for a file in the posts directory, if it is a post.
pub fn post_slug(path: &Path) -> Option<&str> {
    if is_ignored(path) || path.extension().and_then(|e| e.to_str()) != Some("md") {
        return None;
    }
    path.file_stem().and_then(|s| s.to_str())
}

/// Builds posts from the posts directory.
#[derive(Debug, Clone)]
pub struct PostBuilder {
    dir: PathBuf,
    site: SiteInfoConfig,
    painter: CardPainter,
}

impl PostBuilder {
    pub fn new(dir: &Path, site: &SiteInfoConfig, painter: CardPainter) -> Self {
        Self {
            dir: dir.to_path_buf(),
            site: site.clone(),
            painter,
        }
    }

    /// Read, render and draw the card for `posts/<slug>.md`.
    pub fn build(&self, slug: &str) -> Result<Post> {
        let path = self.dir.join(format!("{slug}.md"));
        let source =
            fs::read_to_string(&path).with_context(|| format!("could not read {}", path.display()))?;

        let (contents, metadata) = render_markdown(&source)
            .with_context(|| format!("could not parse markdown in {slug}.md"))?;

        let card = self
            .painter
            .draw(&metadata.title, &metadata.summary, &self.site.post_url(slug))
            .with_context(|| format!("could not create card for {slug}"))?;

        Ok(Post {
            slug: slug.to_string(),
            metadata,
            contents,
            card,
        })
    }

    /// Build every post in the directory. One failure fails the whole load.
    pub fn build_all(&self) -> Result<Vec<Post>> {
        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("could not read posts directory {}", self.dir.display()))?;

        let mut files: Vec<PathBuf> = entries
            .flatten()
            .filter(|e| e.file_type().is_ok_and(|t| t.is_file()))
            .map(|e| PathBuf::from(e.file_name()))
            .collect();
        files.sort();

        let posts = files
            .par_iter()
            .filter_map(|file| post_slug(file).map(|slug| (file, slug)))
            .map(|(file, slug)| {
                let post = self
                    .build(slug)
                    .with_context(|| format!("could not render {}", file.display()))?;
                log!("post"; "loaded {}", file.display());
                Ok(post)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(posts)
    }
}

/// Reloads posts into a [`PostStore`].
pub struct PostLoader {
    builder: PostBuilder,
    posts: Arc<PostStore>,
}

impl PostLoader {
    pub fn new(builder: PostBuilder, posts: Arc<PostStore>) -> Self {
        Self { builder, posts }
    }
}

impl ContentHandler for PostLoader {
    fn upsert(&self, path: &Path) -> Result<()> {
        let Some(slug) = post_slug(path) else {
            debug!("post"; "skip {}", path.display());
            return Ok(());
        };
        // Built outside the lock; a failure leaves the old post in place
        let post = self.builder.build(slug)?;
        self.posts.upsert_post(post);
        log!("post"; "loaded {}", path.display());
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<()> {
        let Some(slug) = post_slug(path) else {
            return Ok(());
        };
        if self.posts.remove_post(slug) {
            log!("post"; "removed {}", path.display());
        }
        Ok(())
    }
}
