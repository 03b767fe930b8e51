//! Social card images.
//!
//! Layout (800px wide, height grows with the wrapped text):
//!
//! ```text
//! ┌────────────────────────────────────────┐
//! │  Title, 42px, #333, wrapped            │
//! │  Summary, 28px, #999, wrapped          │
//! │                          url, 18px, →  │
//! ├────────────────────────────────────────┤  5px #3498db accent
//! ```
//!
//! The card is built as SVG and rasterised with resvg. Fonts come from the
//! configured fonts directory plus the system fonts.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use resvg::usvg::{self, fontdb};

use crate::utils::html::escape;
use crate::{debug, log};

const WIDTH: u32 = 800;
const PADDING_X: u32 = 30;
const PADDING_Y: u32 = 60;
const TITLE_SIZE: f32 = 42.0;
const SUMMARY_SIZE: f32 = 28.0;
const URL_SIZE: f32 = 18.0;
const LINE_HEIGHT: f32 = 1.5;
const ACCENT_HEIGHT: u32 = 5;

const TITLE_FONT: &str = "Nunito, sans-serif";
const SUMMARY_FONT: &str = "Nunito, sans-serif";
const URL_FONT: &str = "JetBrains Mono, monospace";

/// Average advance width as a fraction of the font size, used for wrapping.
const PROPORTIONAL_ADVANCE: f32 = 0.52;
const MONOSPACE_ADVANCE: f32 = 0.6;

/// Draws PNG cards. Cheap to clone; the font database is shared.
#[derive(Clone)]
pub struct CardPainter {
    fontdb: Arc<fontdb::Database>,
}

impl std::fmt::Debug for CardPainter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardPainter")
            .field("faces", &self.fontdb.len())
            .finish()
    }
}

impl CardPainter {
    /// Load fonts from `fonts_dir` (if present) and the system.
    pub fn new(fonts_dir: &Path) -> Self {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        if fonts_dir.is_dir() {
            db.load_fonts_dir(fonts_dir);
        } else {
            debug!("card"; "fonts directory {} not found, using system fonts", fonts_dir.display());
        }
        if db.is_empty() {
            log!("warning"; "no fonts available, card text will not render");
        }
        Self { fontdb: Arc::new(db) }
    }

    /// Painter without any fonts. Cards still render, without text.
    pub fn empty() -> Self {
        Self {
            fontdb: Arc::new(fontdb::Database::new()),
        }
    }

    /// Draw a card and encode it as PNG.
    pub fn draw(&self, title: &str, summary: &str, url: &str) -> Result<Vec<u8>> {
        let layout = CardLayout::new(title, summary);
        let svg = layout.to_svg(url);

        let mut options = usvg::Options::default();
        options.fontdb = Arc::clone(&self.fontdb);
        let tree = usvg::Tree::from_str(&svg, &options).map_err(|e| anyhow!("SVG parse error: {e}"))?;

        let mut pixmap = resvg::tiny_skia::Pixmap::new(WIDTH, layout.height)
            .ok_or_else(|| anyhow!("failed to create {}x{} pixmap", WIDTH, layout.height))?;
        resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap.as_mut());

        pixmap.encode_png().map_err(|e| anyhow!("PNG encode error: {e}"))
    }
}

/// Wrapped text and the resulting image height.
struct CardLayout {
    title: Vec<String>,
    summary: Vec<String>,
    height: u32,
}

impl CardLayout {
    fn new(title: &str, summary: &str) -> Self {
        let text_width = (WIDTH - 2 * PADDING_X) as f32;
        let title = word_wrap(title, text_width, TITLE_SIZE * PROPORTIONAL_ADVANCE);
        let summary = word_wrap(summary, text_width, SUMMARY_SIZE * PROPORTIONAL_ADVANCE);

        let line = |size: f32| (LINE_HEIGHT * size).ceil() as u32;
        let height = 2 * PADDING_Y
            + title.len() as u32 * line(TITLE_SIZE)
            + summary.len() as u32 * line(SUMMARY_SIZE)
            + line(URL_SIZE);

        Self {
            title,
            summary,
            height,
        }
    }

    fn to_svg(&self, url: &str) -> String {
        let w = WIDTH;
        let h = self.height;
        let mut svg = String::with_capacity(2048);

        svg.push_str(&format!(
            r##"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}"><rect width="{w}" height="{h}" fill="#fff"/>"##
        ));
        svg.push_str(&format!(
            r##"<rect x="0" y="{y}" width="{w}" height="{ACCENT_HEIGHT}" fill="#3498db"/>"##,
            y = h - ACCENT_HEIGHT,
        ));

        // Lines are placed by baseline, starting at the top padding
        let mut offset = PADDING_Y as f32;
        for line in &self.title {
            push_text(&mut svg, line, PADDING_X as f32, offset, TITLE_SIZE, TITLE_FONT, "700", "normal", "#333", "start");
            offset += LINE_HEIGHT * TITLE_SIZE;
        }
        for line in &self.summary {
            push_text(&mut svg, line, PADDING_X as f32, offset, SUMMARY_SIZE, SUMMARY_FONT, "300", "italic", "#999", "start");
            offset += LINE_HEIGHT * SUMMARY_SIZE;
        }

        let url_y = (h - PADDING_Y) as f32 + URL_SIZE;
        let url_x = (WIDTH - PADDING_X) as f32;
        push_text(&mut svg, url, url_x, url_y, URL_SIZE, URL_FONT, "200", "normal", "#333", "end");

        svg.push_str("</svg>");
        svg
    }
}

#[allow(clippy::too_many_arguments)]
fn push_text(
    svg: &mut String,
    text: &str,
    x: f32,
    y: f32,
    size: f32,
    family: &str,
    weight: &str,
    style: &str,
    fill: &str,
    anchor: &str,
) {
    svg.push_str(&format!(
        r#"<text x="{x}" y="{y}" font-family="{family}" font-size="{size}" font-weight="{weight}" font-style="{style}" fill="{fill}" text-anchor="{anchor}">{}</text>"#,
        escape(text)
    ));
}

/// Greedy word wrap against an estimated per-character advance.
///
/// Words longer than a line are kept whole on their own line.
fn word_wrap(text: &str, max_width: f32, advance: f32) -> Vec<String> {
    let max_chars = ((max_width / advance).floor() as usize).max(1);
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let needed = current.chars().count() + usize::from(!current.is_empty()) + word.chars().count();
            if !current.is_empty() && needed > max_chars {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }

    lines
}
