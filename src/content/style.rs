//! Stylesheets: `.scss` compiled with grass, `.css` served as-is.
//!
//! Both map to a `.css` output name, so `styles/site.scss` is served at
//! `/css/site.css`. When `paths.css_output` is set the compiled CSS is also
//! mirrored to disk.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};

use crate::config::PathsConfig;
use crate::store::ContentStore;
use crate::watch::{ContentHandler, is_ignored};
use crate::{debug, log};

pub type StyleStore = ContentStore<Stylesheet>;

/// Compiled CSS, keyed in the store by its `.css` output name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stylesheet {
    pub css: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKind {
    Scss,
    Css,
}

/// `foo.scss` / `foo.css` → `foo.css`. Other files are not stylesheets.
pub fn output_name(path: &Path) -> Option<String> {
    source_kind(path)?;
    let stem = path.file_stem()?.to_str()?;
    Some(format!("{stem}.css"))
}

fn source_kind(path: &Path) -> Option<SourceKind> {
    if is_ignored(path) {
        return None;
    }
    match path.extension()?.to_str()? {
        "scss" => Some(SourceKind::Scss),
        "css" => Some(SourceKind::Css),
        _ => None,
    }
}

/// The other source that maps to the same output: `foo.scss` ↔ `foo.css`.
fn sibling(path: &Path) -> Option<PathBuf> {
    let ext = match source_kind(path)? {
        SourceKind::Scss => "css",
        SourceKind::Css => "scss",
    };
    Some(path.with_extension(ext))
}

/// Stylesheet compiler settings shared by startup and reload.
#[derive(Debug, Clone)]
pub struct StyleCompiler {
    dir: PathBuf,
    css_output: Option<PathBuf>,
    minify: bool,
}

impl StyleCompiler {
    pub fn new(paths: &PathsConfig, minify: bool) -> Self {
        Self {
            dir: paths.styles.clone(),
            css_output: paths.css_output.clone(),
            minify,
        }
    }

    /// Compile one source file (relative to the styles directory).
    ///
    /// Returns `None` for files that are not stylesheets.
    pub fn compile(&self, relative: &Path) -> Result<Option<(String, Stylesheet)>> {
        let (Some(kind), Some(name)) = (source_kind(relative), output_name(relative)) else {
            return Ok(None);
        };
        let path = self.dir.join(relative);

        let css = match kind {
            SourceKind::Scss => {
                let options = grass::Options::default().load_path(&self.dir);
                grass::from_path(&path, &options)
                    .map_err(|e| anyhow!("{e}"))
                    .with_context(|| format!("could not generate stylesheet {}", relative.display()))?
            }
            SourceKind::Css => fs::read_to_string(&path)
                .with_context(|| format!("could not read stylesheet {}", relative.display()))?,
        };

        let css = if self.minify { minify_css(&css, &name) } else { css };
        Ok(Some((name, Stylesheet { css })))
    }

    /// Write the compiled CSS next to the static files.
    fn mirror(&self, name: &str, sheet: &Stylesheet) -> Result<()> {
        let Some(out_dir) = &self.css_output else {
            return Ok(());
        };
        fs::create_dir_all(out_dir)
            .with_context(|| format!("could not create {}", out_dir.display()))?;
        let out = out_dir.join(name);
        fs::write(&out, &sheet.css).with_context(|| format!("could not write {}", out.display()))
    }

    fn unmirror(&self, name: &str) -> Result<()> {
        let Some(out_dir) = &self.css_output else {
            return Ok(());
        };
        let out = out_dir.join(name);
        match fs::remove_file(&out) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => {
                Err(e).with_context(|| format!("could not delete {}", out.display()))
            }
            _ => Ok(()),
        }
    }
}

/// Minify with lightningcss; unparseable CSS is kept as compiled.
fn minify_css(source: &str, name: &str) -> String {
    let minified = StyleSheet::parse(source, ParserOptions::default())
        .ok()
        .and_then(|sheet| {
            sheet
                .to_css(PrinterOptions {
                    minify: true,
                    ..PrinterOptions::default()
                })
                .ok()
        });

    match minified {
        Some(result) => result.code,
        None => {
            debug!("style"; "minify failed for {}, keeping unminified", name);
            source.to_string()
        }
    }
}

/// Compile every stylesheet in the styles directory. Any failure is fatal.
pub fn load_styles(compiler: &StyleCompiler) -> Result<StyleStore> {
    let store = StyleStore::new();
    let entries = fs::read_dir(&compiler.dir)
        .with_context(|| format!("could not load styles directory {}", compiler.dir.display()))?;

    let mut files: Vec<PathBuf> = entries
        .flatten()
        .filter(|e| e.file_type().is_ok_and(|t| t.is_file()))
        .map(|e| PathBuf::from(e.file_name()))
        .collect();
    files.sort();

    for relative in files {
        let Some((name, sheet)) = compiler.compile(&relative)? else {
            continue;
        };
        if let Err(e) = compiler.mirror(&name, &sheet) {
            log!("warning"; "{:#}", e);
        }
        log!("style"; "loaded {}", name);
        store.upsert(name, sheet);
    }

    Ok(store)
}

/// Reloads stylesheets into a [`StyleStore`].
pub struct StyleLoader {
    compiler: StyleCompiler,
    store: Arc<StyleStore>,
}

impl StyleLoader {
    pub fn new(compiler: StyleCompiler, store: Arc<StyleStore>) -> Self {
        Self { compiler, store }
    }
}

impl ContentHandler for StyleLoader {
    fn upsert(&self, path: &Path) -> Result<()> {
        let Some((name, sheet)) = self.compiler.compile(path)? else {
            debug!("style"; "skip {}", path.display());
            return Ok(());
        };
        if let Err(e) = self.compiler.mirror(&name, &sheet) {
            log!("warning"; "{:#}", e);
        }
        self.store.upsert(name.as_str(), sheet);
        log!("style"; "loaded {}", name);
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<()> {
        let Some(name) = output_name(path) else {
            return Ok(());
        };
        // The other source still provides this output
        if let Some(other) = sibling(path)
            && self.compiler.dir.join(&other).is_file()
        {
            debug!("style"; "{} removed, recompiling {}", path.display(), other.display());
            return self.upsert(&other);
        }
        self.store.remove(&name);
        self.compiler.unmirror(&name)?;
        log!("style"; "removed {}", name);
        Ok(())
    }
}
