//! Project-relative path normalization.
//!
//! Claims identify documents by a canonical, forward-slash path relative to
//! the project root. The same document therefore produces the same claim
//! path on every host, and the output never contains a backslash.

use std::path::{Component, Path, PathBuf};

use super::SigningError;

/// Converts `path` into a forward-slash path relative to `project_root`.
///
/// Both paths are lexically normalized first (`.` segments dropped, `..`
/// segments folded), so `root/docs/../specs/a.md` normalizes to
/// `specs/a.md`. Relative inputs are interpreted relative to
/// `project_root`. Backslashes are treated as separators regardless of the
/// host OS.
///
/// # Errors
///
/// Returns [`SigningError::PathOutsideProject`] if the path does not lie
/// strictly under `project_root`.
///
/// # Examples
///
/// ```
/// use oracle_core::normalize_path;
///
/// let relative = normalize_path("/root/docs/specs/test.md", "/root").unwrap();
/// assert_eq!(relative, "docs/specs/test.md");
/// ```
pub fn normalize_path(
    path: impl AsRef<Path>,
    project_root: impl AsRef<Path>,
) -> Result<String, SigningError> {
    let path = path.as_ref();
    let project_root = project_root.as_ref();

    let outside = || SigningError::PathOutsideProject {
        path: path.to_path_buf(),
        project_root: project_root.to_path_buf(),
    };

    // An absolute path can only be compared against an absolute root.
    let absolute_root;
    let root = if is_absolute_like(path) && !is_absolute_like(project_root) {
        absolute_root = std::path::absolute(project_root).map_err(|_| outside())?;
        absolute_root.as_path()
    } else {
        project_root
    };

    let root_segments = lexical_segments(root);
    let full = if is_absolute_like(path) {
        lexical_segments(path)
    } else {
        lexical_segments(&root.join(path))
    };

    let relative = full.strip_prefix(root_segments.as_slice()).ok_or_else(outside)?;
    let anchored = relative
        .first()
        .is_some_and(|first| first == "/" || first.ends_with(':'));
    if relative.is_empty() || anchored || relative.iter().any(|segment| segment == "..") {
        return Err(outside());
    }
    Ok(relative.join("/"))
}

/// Resolves a normalized, project-relative claim path back to a filesystem
/// path under `project_root`.
#[must_use]
pub fn resolve_claim_path(project_root: &Path, claim_path: &str) -> PathBuf {
    claim_path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .fold(project_root.to_path_buf(), |acc, segment| acc.join(segment))
}

fn is_absolute_like(path: &Path) -> bool {
    path.is_absolute() || path.to_string_lossy().starts_with(['/', '\\'])
}

/// Splits a path into normalized segments, treating `\` as a separator.
///
/// A leading root or drive prefix is kept as the first segment so that
/// absolute and relative paths never compare equal.
fn lexical_segments(path: &Path) -> Vec<String> {
    let text = path.to_string_lossy().replace('\\', "/");
    let mut segments: Vec<String> = Vec::new();

    for component in Path::new(&text).components() {
        match component {
            Component::Prefix(prefix) => {
                segments.push(prefix.as_os_str().to_string_lossy().to_ascii_lowercase());
            },
            Component::RootDir => segments.push(String::from("/")),
            Component::CurDir => {},
            Component::ParentDir => {
                let can_pop = segments
                    .last()
                    .is_some_and(|last| last != "/" && last != ".." && !last.ends_with(':'));
                if can_pop {
                    segments.pop();
                } else if segments.last().is_none_or(|last| last == "..") {
                    segments.push(String::from(".."));
                }
            },
            Component::Normal(part) => segments.push(part.to_string_lossy().into_owned()),
        }
    }
    segments
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_normalize_absolute_path() {
        assert_eq!(
            normalize_path("/root/docs/specs/test.md", "/root").unwrap(),
            "docs/specs/test.md"
        );
    }

    #[test]
    fn test_normalize_with_trailing_slash_root() {
        assert_eq!(
            normalize_path("/root/docs/test.md", "/root/").unwrap(),
            "docs/test.md"
        );
    }

    #[test]
    fn test_normalize_backslash_separators() {
        assert_eq!(
            normalize_path("/root\\docs\\specs\\test.md", "/root").unwrap(),
            "docs/specs/test.md"
        );
    }

    #[test]
    fn test_normalize_relative_input() {
        assert_eq!(
            normalize_path("docs/./specs/../test.md", "/root").unwrap(),
            "docs/test.md"
        );
    }

    #[test]
    fn test_normalize_rejects_outside_root() {
        let result = normalize_path("/other/docs/test.md", "/root");
        assert!(matches!(result, Err(SigningError::PathOutsideProject { .. })));
    }

    #[test]
    fn test_normalize_rejects_sibling_prefix() {
        // `/rootfs` shares a string prefix with `/root` but is not under it.
        let result = normalize_path("/rootfs/test.md", "/root");
        assert!(matches!(result, Err(SigningError::PathOutsideProject { .. })));
    }

    #[test]
    fn test_normalize_rejects_escape_via_parent() {
        let result = normalize_path("/root/docs/../../etc/passwd", "/root");
        assert!(matches!(result, Err(SigningError::PathOutsideProject { .. })));

        let result = normalize_path("../outside.md", "/root");
        assert!(matches!(result, Err(SigningError::PathOutsideProject { .. })));
    }

    #[test]
    fn test_normalize_absolute_path_against_relative_root() {
        let result = normalize_path("/etc/passwd", ".");
        assert!(matches!(result, Err(SigningError::PathOutsideProject { .. })));

        let cwd = std::env::current_dir().unwrap();
        assert_eq!(
            normalize_path(cwd.join("docs/specs/test.md"), ".").unwrap(),
            "docs/specs/test.md"
        );
        assert_eq!(normalize_path("docs/specs/test.md", ".").unwrap(), "docs/specs/test.md");
    }

    #[test]
    fn test_normalize_rejects_root_itself() {
        let result = normalize_path("/root", "/root");
        assert!(matches!(result, Err(SigningError::PathOutsideProject { .. })));
    }

    #[test]
    fn test_resolve_claim_path() {
        let resolved = resolve_claim_path(Path::new("/root"), "docs/specs/test.md");
        assert_eq!(resolved, Path::new("/root/docs/specs/test.md"));
    }

    proptest! {
        #[test]
        fn normalized_path_never_contains_backslash(
            segments in prop::collection::vec("[a-zA-Z0-9_.-]{1,12}", 1..6),
            use_backslash in any::<bool>(),
        ) {
            prop_assume!(segments.iter().all(|s| s != "." && s != ".."));
            let separator = if use_backslash { "\\" } else { "/" };
            let path = format!("/project{separator}{}", segments.join(separator));

            let normalized = normalize_path(&path, "/project").unwrap();
            prop_assert!(!normalized.contains('\\'));
            prop_assert_eq!(normalized, segments.join("/"));
        }
    }
}
