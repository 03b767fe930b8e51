use std::path::Path;

/// Semantic action delivered to a [`ContentHandler`](super::ContentHandler).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Upsert,
    Remove,
}

impl Action {
    /// Upsert if `path` is a file on disk right now, remove otherwise.
    pub fn probe(path: &Path) -> Self {
        if path.is_file() {
            Self::Upsert
        } else {
            Self::Remove
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Upsert => "upsert",
            Self::Remove => "remove",
        }
    }
}
