//! Markdown → HTML with front matter.
//!
//! Front matter is either YAML-like (`---` fences, `key: value` lines) or
//! TOML (`+++` fences). Recognised keys:
//!
//! | Key       | Meaning                                        |
//! |-----------|------------------------------------------------|
//! | `title`   | post title                                     |
//! | `summary` | one-line summary for the home page and card    |
//! | `time`    | publication time, unix seconds                 |
//! | `date`    | `YYYY-MM-DD` or RFC 3339, used when no `time`  |
//!
//! A post without `time` or `date` is rejected.
//!
//! Fenced code blocks with a language are highlighted with arborium; a block
//! in a language it does not know is rendered plain. Bare URLs in text become
//! links.

use std::cell::RefCell;
use std::mem;

use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, NaiveDate};
use linkify::{LinkFinder, LinkKind};
use pulldown_cmark::{CodeBlockKind, CowStr, Event, LinkType, Options, Parser, Tag, TagEnd, html};
use serde::Serialize;

use crate::debug;

/// Metadata shown on the home page and used for ordering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PostMeta {
    pub title: String,
    pub summary: String,
    /// Unix seconds.
    pub published_at: i64,
}

/// Parse front matter and render the body.
pub fn render_markdown(source: &str) -> Result<(String, PostMeta)> {
    let (raw, body) = match detect_frontmatter(source) {
        Some((fm, body, true)) => (parse_toml(fm)?, body),
        Some((fm, body, false)) => (parse_yaml_like(fm), body),
        None => bail!("missing front matter"),
    };

    let meta = raw.into_meta()?;
    Ok((to_html(body), meta))
}

/// Render markdown to HTML. Raw HTML is passed through.
pub fn to_html(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, options());
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, enrich(parser).into_iter());
    out
}

/// Highlight fenced code and autolink bare URLs outside links and code.
fn enrich<'a>(parser: impl Iterator<Item = Event<'a>>) -> Vec<Event<'a>> {
    let mut finder = LinkFinder::new();
    finder.kinds(&[LinkKind::Url]);

    let mut out = Vec::new();
    let mut code: Option<CodeBlock<'a>> = None;
    let mut link_depth = 0usize;
    // Adjacent text events, merged so a URL is never split
    let mut text = String::new();

    for event in parser {
        if let Some(block) = code.as_mut() {
            let end = matches!(event, Event::End(TagEnd::CodeBlock));
            if let Event::Text(chunk) = &event {
                block.source.push_str(chunk);
            }
            block.events.push(event);
            if end && let Some(block) = code.take() {
                out.extend(block.finish());
            }
            continue;
        }

        if let Event::Text(chunk) = &event
            && link_depth == 0
        {
            text.push_str(chunk);
            continue;
        }
        linkify(&finder, &mut text, &mut out);

        match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                code = Some(CodeBlock {
                    lang: fence_language(&kind),
                    source: String::new(),
                    events: vec![Event::Start(Tag::CodeBlock(kind))],
                });
            }
            Event::Start(Tag::Link { .. } | Tag::Image { .. }) => {
                link_depth += 1;
                out.push(event);
            }
            Event::End(TagEnd::Link | TagEnd::Image) => {
                link_depth = link_depth.saturating_sub(1);
                out.push(event);
            }
            other => out.push(other),
        }
    }
    linkify(&finder, &mut text, &mut out);

    out
}

/// Flush pending text, wrapping every URL in an autolink.
fn linkify<'a>(finder: &LinkFinder, text: &mut String, out: &mut Vec<Event<'a>>) {
    if text.is_empty() {
        return;
    }
    let text = mem::take(text);
    if finder.links(&text).next().is_none() {
        out.push(Event::Text(text.into()));
        return;
    }

    for span in finder.spans(&text) {
        let piece: CowStr<'a> = span.as_str().to_string().into();
        match span.kind() {
            Some(LinkKind::Url) => {
                out.push(Event::Start(Tag::Link {
                    link_type: LinkType::Autolink,
                    dest_url: piece.clone(),
                    title: CowStr::Borrowed(""),
                    id: CowStr::Borrowed(""),
                }));
                out.push(Event::Text(piece));
                out.push(Event::End(TagEnd::Link));
            }
            _ => out.push(Event::Text(piece)),
        }
    }
}

/// A code block being collected, with its original events as the fallback.
struct CodeBlock<'a> {
    lang: Option<String>,
    source: String,
    events: Vec<Event<'a>>,
}

impl<'a> CodeBlock<'a> {
    fn finish(self) -> Vec<Event<'a>> {
        let Some(lang) = &self.lang else {
            return self.events;
        };
        match highlight(lang, &self.source) {
            Some(html) => vec![Event::Html(
                format!("<pre><code class=\"language-{lang}\">{html}</code></pre>\n").into(),
            )],
            None => self.events,
        }
    }
}

/// First word of the fence info string (`rust,ignore` → `rust`).
fn fence_language(kind: &CodeBlockKind) -> Option<String> {
    let CodeBlockKind::Fenced(info) = kind else {
        return None;
    };
    let word = info.split([' ', '\t', ',']).next().unwrap_or_default();
    let lang: String = word
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '+' | '_'))
        .collect::<String>()
        .to_ascii_lowercase();
    (!lang.is_empty()).then_some(lang)
}

thread_local! {
    static HIGHLIGHTER: RefCell<arborium::Highlighter> = RefCell::new(arborium::Highlighter::new());
}

fn highlight(lang: &str, source: &str) -> Option<String> {
    let grammar = match lang {
        "js" => "javascript",
        "ts" => "typescript",
        "py" => "python",
        "rb" => "ruby",
        "sh" | "shell" => "bash",
        "yml" => "yaml",
        other => other,
    };
    HIGHLIGHTER.with_borrow_mut(|highlighter| match highlighter.highlight(grammar, source) {
        Ok(html) => Some(html),
        Err(e) => {
            debug!("markdown"; "rendering {} block plain: {}", lang, e);
            None
        }
    })
}

fn options() -> Options {
    let mut opts = Options::empty();
    opts.insert(Options::ENABLE_TABLES);
    opts.insert(Options::ENABLE_FOOTNOTES);
    opts.insert(Options::ENABLE_STRIKETHROUGH);
    opts.insert(Options::ENABLE_TASKLISTS);
    opts.insert(Options::ENABLE_SMART_PUNCTUATION);
    opts
}

/// Front matter fields before validation.
#[derive(Debug, Default)]
struct RawMeta {
    title: Option<String>,
    summary: Option<String>,
    time: Option<String>,
    date: Option<String>,
}

impl RawMeta {
    fn into_meta(self) -> Result<PostMeta> {
        let published_at = match (self.time, self.date) {
            (Some(time), _) => time
                .trim()
                .parse::<i64>()
                .with_context(|| format!("invalid `time` value `{time}`"))?,
            (None, Some(date)) => parse_date(&date)?,
            (None, None) => bail!("front matter has no `time` or `date`"),
        };

        Ok(PostMeta {
            title: self.title.unwrap_or_default(),
            summary: self.summary.unwrap_or_default(),
            published_at,
        })
    }
}

/// `YYYY-MM-DD` (midnight UTC) or RFC 3339.
fn parse_date(value: &str) -> Result<i64> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        let midnight = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| anyhow!("invalid date `{value}`"))?;
        return Ok(midnight.and_utc().timestamp());
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.timestamp())
        .with_context(|| format!("invalid `date` value `{value}`"))
}

/// Parse simple YAML-like front matter (`key: value`).
fn parse_yaml_like(content: &str) -> RawMeta {
    let mut meta = RawMeta::default();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some((key, value)) = line.split_once(':') {
            let value = unquote(value.trim()).to_string();
            match key.trim().to_lowercase().as_str() {
                "title" => meta.title = Some(value),
                "summary" => meta.summary = Some(value),
                "time" => meta.time = Some(value),
                "date" => meta.date = Some(value),
                _ => {}
            }
        }
    }

    meta
}

fn unquote(s: &str) -> &str {
    for quote in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(quote) && s.ends_with(quote) {
            return &s[1..s.len() - 1];
        }
    }
    s
}

/// Parse TOML front matter. Dates may be native TOML datetimes.
fn parse_toml(content: &str) -> Result<RawMeta> {
    let table: toml::Table =
        toml::from_str(content).map_err(|e| anyhow!("invalid TOML front matter: {}", e))?;

    let text = |key: &str| -> Option<String> {
        table.get(key).map(|value| match value {
            toml::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    };

    Ok(RawMeta {
        title: text("title"),
        summary: text("summary"),
        time: text("time"),
        date: text("date"),
    })
}

/// Detect and extract front matter.
/// Returns `(frontmatter, body, is_toml)` if found.
fn detect_frontmatter(content: &str) -> Option<(&str, &str, bool)> {
    let trimmed = content.trim_start_matches('\u{feff}').trim_start();

    for (fence, is_toml) in [("---", false), ("+++", true)] {
        if trimmed.starts_with(fence)
            && let Some(end) = trimmed[3..].find(&format!("\n{fence}"))
        {
            let fm = trimmed[3..3 + end].trim();
            let body = trimmed[3 + end + 4..].trim_start_matches(['\r', '\n']);
            return Some((fm, body, is_toml));
        }
    }

    None
}
