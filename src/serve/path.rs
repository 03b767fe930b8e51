//! Request URL to route path, and route path to static file.

use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;

/// Strip the query and fragment, percent-decode, trim slashes.
///
/// The query is split off before decoding so an encoded `%3F` stays part of
/// the path.
pub fn request_path(url: &str) -> String {
    let raw = url.split(['?', '#']).next().unwrap_or_default();
    let decoded = percent_decode_str(raw).decode_utf8_lossy();
    decoded.trim_matches('/').to_string()
}

/// Resolve a route path to a file under `root`, handling index.html for
/// directories.
pub fn resolve_path(path: &str, root: &Path) -> Option<PathBuf> {
    // Reject paths with suspicious patterns early
    if path.split('/').any(|segment| segment == "..") {
        return None;
    }

    let local = root.join(path);

    // Canonicalize so symlinks cannot lead outside the root
    let canonical = local.canonicalize().ok()?;
    let root_canonical = root.canonicalize().ok()?;
    if !canonical.starts_with(&root_canonical) {
        return None;
    }

    if canonical.is_file() {
        return Some(canonical);
    }

    if canonical.is_dir() {
        let index = canonical.join("index.html");
        if index.is_file() {
            return Some(index);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_request_path() {
        assert_eq!(request_path("/"), "");
        assert_eq!(request_path("/hello/"), "hello");
        assert_eq!(request_path("/css/site.css?v=3"), "css/site.css");
        assert_eq!(request_path("/a%20b#top"), "a b");
        assert_eq!(request_path("/what%3Fnot"), "what?not");
    }

    #[test]
    fn test_resolve_file_and_index() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("robots.txt"), "ok").unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("docs/index.html"), "index").unwrap();
        fs::create_dir(dir.path().join("empty")).unwrap();

        let root = dir.path().canonicalize().unwrap();
        assert_eq!(resolve_path("robots.txt", dir.path()), Some(root.join("robots.txt")));
        assert_eq!(resolve_path("docs", dir.path()), Some(root.join("docs/index.html")));
        assert_eq!(resolve_path("empty", dir.path()), None);
        assert_eq!(resolve_path("missing", dir.path()), None);
    }

    #[test]
    fn test_resolve_rejects_escape() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("static");
        fs::create_dir(&root).unwrap();
        fs::write(dir.path().join("secret.txt"), "no").unwrap();

        assert_eq!(resolve_path("../secret.txt", &root), None);

        #[cfg(unix)]
        {
            std::os::unix::fs::symlink(dir.path().join("secret.txt"), root.join("link")).unwrap();
            assert_eq!(resolve_path("link", &root), None);
        }
    }

    #[test]
    fn test_resolve_missing_root() {
        let dir = TempDir::new().unwrap();
        assert_eq!(resolve_path("", &dir.path().join("nope")), None);
    }
}
