//! Handlebars page templates.
//!
//! Every `templates/<name>.html` file compiles into its own registry holding
//! that one template plus the `datetime` helper. A compile failure leaves the
//! store untouched, so the previous version keeps serving.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result, anyhow, bail};
use chrono::{Local, TimeZone};
use handlebars::{
    Context, Handlebars, Helper, HelperResult, Output, RenderContext, RenderErrorReason,
};
use serde::Serialize;

use crate::store::ContentStore;
use crate::watch::{ContentHandler, is_ignored};
use crate::{debug, log};

/// Templates the server cannot start without.
pub const REQUIRED_TEMPLATES: [&str; 5] = ["page", "fullpost", "summary", "notfound", "error"];

/// Go-style reference layout `Jan 2 2006, 3:04 PM`.
const DATETIME_FORMAT: &str = "%b %-d %Y, %-I:%M %p";

pub type TemplateStore = ContentStore<CompiledTemplate>;

/// One compiled template.
pub struct CompiledTemplate {
    name: String,
    registry: Handlebars<'static>,
}

impl std::fmt::Debug for CompiledTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledTemplate").field("name", &self.name).finish()
    }
}

impl CompiledTemplate {
    /// Compile `source` under `name`.
    pub fn compile(name: &str, source: &str) -> Result<Self> {
        let mut registry = Handlebars::new();
        registry.register_helper("datetime", Box::new(datetime_helper));
        registry
            .register_template_string(name, source)
            .map_err(|e| anyhow!("{e}"))
            .with_context(|| format!("could not parse {name} template"))?;

        Ok(Self {
            name: name.to_string(),
            registry,
        })
    }

    /// Compile `templates/<name>.html`.
    pub fn load(dir: &Path, name: &str) -> Result<Self> {
        let path = dir.join(format!("{name}.html"));
        let source = fs::read_to_string(&path)
            .with_context(|| format!("could not read {}", path.display()))?;
        Self::compile(name, &source)
    }

    pub fn render<T: Serialize>(&self, context: &T) -> Result<String> {
        self.registry
            .render(&self.name, context)
            .map_err(|e| anyhow!("{e}"))
            .with_context(|| format!("could not render {} template", self.name))
    }
}

/// `{{datetime published_at}}`: unix seconds → `Jan 2 2006, 3:04 PM`.
///
/// Falls back to the current time when the value is not a timestamp.
fn datetime_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let value = h
        .param(0)
        .map(|p| p.value().clone())
        .ok_or(RenderErrorReason::ParamNotFoundForIndex("datetime", 0))?;

    let timestamp = match &value {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    let timestamp = timestamp.unwrap_or_else(|| {
        log!("template"; "could not parse timestamp '{}', falling back to current time", value);
        Local::now().timestamp()
    });

    out.write(&format_timestamp(&Local, timestamp))?;
    Ok(())
}

fn format_timestamp<Tz>(tz: &Tz, timestamp: i64) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    tz.timestamp_opt(timestamp, 0)
        .single()
        .map(|dt| dt.format(DATETIME_FORMAT).to_string())
        .unwrap_or_default()
}

/// Template name for a file in the templates directory.
fn template_name(path: &Path) -> Option<&str> {
    if is_ignored(path) || path.extension().and_then(|e| e.to_str()) != Some("html") {
        return None;
    }
    path.file_stem().and_then(|s| s.to_str())
}

/// Load every `.html` template in `dir` and require the full set.
pub fn load_templates(dir: &Path) -> Result<TemplateStore> {
    let store = TemplateStore::new();
    let entries =
        fs::read_dir(dir).with_context(|| format!("could not read {}", dir.display()))?;

    let mut files: Vec<PathBuf> = entries
        .flatten()
        .filter(|e| e.file_type().is_ok_and(|t| t.is_file()))
        .map(|e| e.path())
        .collect();
    files.sort();

    for path in &files {
        let Some(name) = path.file_name().map(Path::new).and_then(template_name) else {
            continue;
        };
        let template = CompiledTemplate::load(dir, name)?;
        log!("template"; "loaded {}", name);
        store.upsert(name, template);
    }

    let missing: Vec<_> = REQUIRED_TEMPLATES
        .iter()
        .filter(|name| !store.contains(name))
        .collect();
    if !missing.is_empty() {
        bail!(
            "missing required templates in {}: {:?}",
            dir.display(),
            missing
        );
    }

    Ok(store)
}

/// Reloads templates into a [`TemplateStore`].
pub struct TemplateLoader {
    dir: PathBuf,
    store: Arc<TemplateStore>,
}

impl TemplateLoader {
    pub fn new(dir: &Path, store: Arc<TemplateStore>) -> Self {
        Self {
            dir: dir.to_path_buf(),
            store,
        }
    }
}

impl ContentHandler for TemplateLoader {
    fn upsert(&self, path: &Path) -> Result<()> {
        let Some(name) = template_name(path) else {
            debug!("template"; "skip {}", path.display());
            return Ok(());
        };
        // Compile first; a failure returns before the store is touched
        let template = CompiledTemplate::load(&self.dir, name)?;
        self.store.upsert(name, template);
        log!("template"; "loaded {}", name);
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<()> {
        let Some(name) = template_name(path) else {
            return Ok(());
        };
        if self.store.remove(name) {
            log!("template"; "unloaded {}", name);
        }
        Ok(())
    }
}
