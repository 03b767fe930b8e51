//! Listener startup errors.
//!
//! Every variant is fatal: a listener that cannot attach never starts, and the
//! server refuses to serve without it.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("watched directory `{0}` does not exist")]
    MissingDirectory(PathBuf),

    #[error("watched path `{0}` is not a directory")]
    NotADirectory(PathBuf),

    #[error("failed to watch `{path}`")]
    Attach {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("failed to start listener thread for `{path}`")]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
