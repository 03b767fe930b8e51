//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Prose blog server CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Project root containing posts/, templates/, styles/ and static/
    #[arg(short, long, global = true, value_hint = clap::ValueHint::DirPath)]
    pub root: Option<PathBuf>,

    /// Config file path, relative to the project root (default: prose.toml)
    #[arg(short = 'C', long, global = true, default_value = "prose.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands (defaults to `serve`)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Load all content and serve it, reloading on change
    #[command(visible_alias = "s")]
    Serve {
        #[command(flatten)]
        args: ServeArgs,
    },

    /// Load all content once and report the first error
    #[command(visible_alias = "c")]
    Check,
}

/// Serve command arguments.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
    #[arg(short, long)]
    pub interface: Option<std::net::IpAddr>,

    /// Port number to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Reload content when files change on disk
    #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub watch: Option<bool>,
}

impl Cli {
    /// Serve arguments, if the resolved command is `serve`.
    pub fn serve_args(&self) -> Option<&ServeArgs> {
        match &self.command {
            Some(Commands::Serve { args }) => Some(args),
            _ => None,
        }
    }

    pub fn is_check(&self) -> bool {
        matches!(self.command, Some(Commands::Check))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_serve() {
        let cli = Cli::parse_from(["prose"]);
        assert!(cli.command.is_none());
        assert!(!cli.is_check());
        assert_eq!(cli.config, PathBuf::from("prose.toml"));
    }

    #[test]
    fn test_serve_overrides() {
        let cli = Cli::parse_from(["prose", "serve", "--port", "9000", "--watch", "false"]);
        let args = cli.serve_args().unwrap();
        assert_eq!(args.port, Some(9000));
        assert_eq!(args.watch, Some(false));
    }

    #[test]
    fn test_watch_flag_without_value() {
        let cli = Cli::parse_from(["prose", "serve", "-w"]);
        assert_eq!(cli.serve_args().unwrap().watch, Some(true));
    }

    #[test]
    fn test_check_with_global_root() {
        let cli = Cli::parse_from(["prose", "check", "--root", "/srv/blog"]);
        assert!(cli.is_check());
        assert_eq!(cli.root, Some(PathBuf::from("/srv/blog")));
    }
}
