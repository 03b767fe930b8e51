//! Request routing.
//!
//! | Path                | Response                                   |
//! |---------------------|--------------------------------------------|
//! | `/`                 | `page` wrapping every post's `summary`     |
//! | `/about.png`        | site card                                  |
//! | `/<slug>`           | `page` wrapping the post's `fullpost`      |
//! | `/<slug>/about.png` | post card                                  |
//! | `/css/<name>`       | compiled stylesheet                        |
//! | anything else       | static file, else 404                      |
//!
//! Every response goes through an [`ErrorInterceptingResponse`], so 4xx and
//! 5xx statuses use the `notfound` and `error` templates when they render.
//!
//! Each store is read once per lookup and the values are cloned out as
//! `Arc`s; no lock is held while rendering and no two locks are held at once.

use std::fs;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use serde::Serialize;
use tiny_http::Method;

use super::intercept::{ErrorInterceptingResponse, ErrorPages};
use super::path::{request_path, resolve_path};
use super::response::ResponseSink;
use crate::content::{CompiledTemplate, Post};
use crate::site::Site;
use crate::utils::mime::{self, types};
use crate::log;

/// Context for the `page` template.
#[derive(Debug, Serialize)]
struct PageContext<'a> {
    title: &'a str,
    subtitle: &'a str,
    contents: &'a str,
}

pub struct Router {
    site: Arc<Site>,
}

impl Router {
    pub fn new(site: Arc<Site>) -> Self {
        Self { site }
    }

    /// Route one request into `sink`.
    pub fn handle<S: ResponseSink>(&self, method: &Method, url: &str, sink: &mut S) {
        let path = request_path(url);
        let pages = ErrorPages::snapshot(&self.site.templates);
        let mut res = ErrorInterceptingResponse::new(sink, pages, format!("/{path}"));

        if !matches!(method, Method::Get | Method::Head) {
            res.headers().set("Allow", "GET, HEAD");
            res.fail(405, "method not allowed");
            return;
        }

        self.dispatch(&path, &mut res);
    }

    fn dispatch(&self, path: &str, res: &mut impl ResponseSink) {
        if path.is_empty() {
            let page = self.render_home();
            return self.send_page(path, page, res);
        }
        if path == "about.png" {
            return res.send(200, types::PNG, &self.site.card);
        }
        if let Some(name) = path.strip_prefix("css/")
            && let Some(sheet) = self.site.styles.get(name)
        {
            return res.send(200, types::CSS, sheet.css.as_bytes());
        }
        if let Some(slug) = path.strip_suffix("/about.png")
            && let Some(post) = self.site.posts.get(slug)
        {
            return res.send(200, types::PNG, &post.card);
        }
        if !path.contains('/')
            && let Some(post) = self.site.posts.get(path)
        {
            let page = self.render_post(&post);
            return self.send_page(path, page, res);
        }

        self.serve_static(path, res);
    }

    fn serve_static(&self, path: &str, res: &mut impl ResponseSink) {
        let Some(file) = resolve_path(path, &self.site.static_dir) else {
            return res.fail(404, "404 page not found");
        };
        match fs::read(&file) {
            Ok(body) => res.send(200, mime::from_path(&file), &body),
            Err(e) => {
                log!("error"; "could not read {}: {}", file.display(), e);
                res.fail(404, "404 page not found");
            }
        }
    }

    fn send_page(&self, path: &str, page: Result<String>, res: &mut impl ResponseSink) {
        match page {
            Ok(html) => res.send(200, types::HTML, html.as_bytes()),
            Err(e) => {
                log!("error"; "/{}: {:#}", path, e);
                res.fail(500, "internal server error");
            }
        }
    }

    fn template(&self, name: &str) -> Result<Arc<CompiledTemplate>> {
        self.site
            .templates
            .get(name)
            .ok_or_else(|| anyhow!("template `{name}` is not loaded"))
    }

    /// Every post through `summary`, newest first, wrapped in `page`.
    fn render_home(&self) -> Result<String> {
        let posts = self.site.posts.list();
        let summary = self.template("summary")?;

        let mut contents = String::new();
        for post in &posts {
            contents.push_str(&summary.render(post.as_ref())?);
        }

        self.template("page")?.render(&PageContext {
            title: "Home",
            subtitle: &self.site.info.summary,
            contents: &contents,
        })
    }

    /// The post through `fullpost`, wrapped in `page`.
    fn render_post(&self, post: &Post) -> Result<String> {
        let contents = self.template("fullpost")?.render(post)?;

        self.template("page")?.render(&PageContext {
            title: &post.metadata.title,
            subtitle: &post.metadata.summary,
            contents: &contents,
        })
    }
}
