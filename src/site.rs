//! A loaded site: the three content stores, the site card, and the loaders
//! that keep the stores in sync with disk.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::{PathsConfig, SiteConfig, SiteInfoConfig, WatchConfig};
use crate::content::{
    CardPainter, PostBuilder, PostLoader, PostStore, StyleCompiler, StyleLoader, StyleStore,
    TemplateLoader, TemplateStore, load_styles, load_templates,
};
use crate::log;
use crate::watch::{Listener, ListenerHandle, WatchError};

pub struct Site {
    pub info: SiteInfoConfig,
    pub static_dir: PathBuf,
    pub templates: Arc<TemplateStore>,
    pub styles: Arc<StyleStore>,
    pub posts: Arc<PostStore>,
    /// PNG card for `/about.png`.
    pub card: Vec<u8>,
    paths: PathsConfig,
    builder: PostBuilder,
    compiler: StyleCompiler,
}

impl Site {
    /// Load every template, post and stylesheet. Any failure is fatal.
    pub fn open(config: &SiteConfig) -> Result<Self> {
        let paths = &config.paths;

        let templates = load_templates(&paths.templates).context("could not load templates")?;

        let painter = CardPainter::new(&paths.fonts);
        let builder = PostBuilder::new(&paths.posts, &config.site, painter.clone());
        let posts = builder.build_all().context("could not load posts")?;
        log!("post"; "loaded {} posts", posts.len());

        let compiler = StyleCompiler::new(paths, config.styles.minify);
        let styles = load_styles(&compiler).context("could not load styles")?;

        let info = &config.site;
        let card = painter
            .draw(&info.title, &info.summary, &info.url)
            .context("could not create site card")?;

        Ok(Self {
            info: info.clone(),
            static_dir: paths.static_dir.clone(),
            templates: Arc::new(templates),
            styles: Arc::new(styles),
            posts: Arc::new(PostStore::from_posts(posts)),
            card,
            paths: paths.clone(),
            builder,
            compiler,
        })
    }

    /// Start one listener per content directory. The stores stay in sync for
    /// as long as the returned handles are alive.
    pub fn watch(&self, config: &WatchConfig) -> Result<Vec<ListenerHandle>, WatchError> {
        let templates = Listener::new(&self.paths.templates, config).spawn(TemplateLoader::new(
            &self.paths.templates,
            Arc::clone(&self.templates),
        ))?;
        let posts = Listener::new(&self.paths.posts, config).spawn(PostLoader::new(
            self.builder.clone(),
            Arc::clone(&self.posts),
        ))?;
        let styles = Listener::new(&self.paths.styles, config).spawn(StyleLoader::new(
            self.compiler.clone(),
            Arc::clone(&self.styles),
        ))?;

        log!("watch"; "watching templates, posts and styles");
        Ok(vec![templates, posts, styles])
    }
}
