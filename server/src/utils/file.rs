//! File utility functions

use std::path::PathBuf;

/// Expand a path string to an absolute path.
///
/// Handles tilde expansion (`~`, `~/data`), relative paths (`.`, `../x`,
/// bare names) and passes absolute paths through unchanged.
pub fn expand_path(path: &str) -> PathBuf {
    let path = path.trim();

    if path.is_empty() {
        return std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    }

    if path == "~" {
        if let Some(home) = home_dir() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        if let Some(home) = home_dir() {
            return home.join(rest);
        }
    }

    let buf = PathBuf::from(path);
    if buf.is_absolute() {
        return buf;
    }

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let joined = cwd.join(&buf);
    joined.canonicalize().unwrap_or(joined)
}

fn home_dir() -> Option<PathBuf> {
    directories::UserDirs::new().map(|d| d.home_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_paths_pass_through() {
        assert_eq!(expand_path("/etc/whatsup"), PathBuf::from("/etc/whatsup"));
    }

    #[test]
    fn tilde_expands_to_home() {
        if let Some(home) = home_dir() {
            assert_eq!(expand_path("~"), home);
            assert_eq!(expand_path("~/data"), home.join("data"));
        }
    }

    #[test]
    fn relative_paths_become_absolute() {
        let expanded = expand_path("some-dir");
        assert!(expanded.is_absolute());
        assert!(expanded.ends_with("some-dir"));
    }

    #[test]
    fn blank_input_falls_back_to_cwd() {
        assert_eq!(expand_path("  "), std::env::current_dir().unwrap());
    }
}
