//! Prose - a blog server that hot-reloads posts, templates and stylesheets.

mod cli;
mod config;
mod content;
mod logger;
mod serve;
mod site;
mod store;
mod utils;
mod watch;

#[cfg(test)]
mod test_helpers;

use std::sync::Arc;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::Cli;
use config::SiteConfig;
use site::Site;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    serve::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = SiteConfig::load(&cli)?;
    let site = Site::open(&config)?;

    if cli.is_check() {
        log!(
            "check";
            "{} posts, {} templates, {} stylesheets ok",
            site.posts.len(),
            site.templates.len(),
            site.styles.len()
        );
        return Ok(());
    }

    // Listeners stop when the handles drop, so they live as long as the server
    let _listeners = if config.serve.watch {
        site.watch(&config.watch)?
    } else {
        Vec::new()
    };

    serve::serve(Arc::new(site), &config.serve)
}
