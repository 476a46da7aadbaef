//! Project-relative sandbox paths
//!
//! Provides [`SandboxPath`], the single key format used by the cache, the
//! suppressor and the identifier map. Callers may hand in absolute or
//! platform-native paths; everything is relativised against the sandbox
//! root and rendered with forward slashes before use.

use crate::error::PathError;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Normalized, forward-slash, project-relative path
///
/// # Examples
/// - `/project/sandbox/src/page.tsx` → `src/page.tsx`
/// - `./src\\page.tsx` → `src/page.tsx`
/// - `/project/sandbox` → `` (the root itself)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SandboxPath(String);

impl SandboxPath {
    /// Normalize any caller-supplied path against the sandbox root
    #[must_use]
    pub fn normalize(input: &str, root: &str) -> Self {
        let input = input.replace('\\', "/");
        let root = root.replace('\\', "/");

        let absolute = if input.starts_with('/') {
            input
        } else {
            format!("{}/{}", root, input)
        };
        let root_segments = resolve_segments(&root);
        let target_segments = resolve_segments(&absolute);

        let common = root_segments
            .iter()
            .zip(target_segments.iter())
            .take_while(|(a, b)| a == b)
            .count();

        let mut out: Vec<&str> = Vec::with_capacity(target_segments.len());
        for _ in common..root_segments.len() {
            out.push("..");
        }
        out.extend(target_segments[common..].iter().copied());

        Self(out.join("/"))
    }

    /// Path as string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the owned string
    #[inline]
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }

    /// Whether this is the project root
    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Path segments
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// Last segment
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.segments().last()
    }

    /// File extension without the dot
    #[must_use]
    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name()?;
        let (stem, ext) = name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext)
    }

    /// Whether the extension is one of `extensions`
    #[must_use]
    pub fn has_extension<S: AsRef<str>>(&self, extensions: &[S]) -> bool {
        self.extension()
            .is_some_and(|ext| extensions.iter().any(|e| e.as_ref() == ext))
    }

    /// Append a child segment
    #[must_use]
    pub fn join(&self, name: &str) -> Self {
        if self.0.is_empty() {
            Self::normalize(name, "/")
        } else {
            Self::normalize(&format!("{}/{}", self.0, name), "/")
        }
    }

    /// Whether this path equals or lies under `dir`
    ///
    /// `dir` is compared segment-wise, so `src` contains `src/a.tsx` but
    /// not `srcs/a.tsx`.
    #[must_use]
    pub fn is_within(&self, dir: &Self) -> bool {
        if dir.is_root() {
            return true;
        }
        let mut own = self.segments();
        dir.segments().all(|d| own.next() == Some(d))
    }

    /// Whether any segment of this path is one of the excluded directory names
    ///
    /// Checked at event-handling time as well as at watch registration, so a
    /// path nested under an excluded ancestor is caught even if the remote
    /// watch lets it through.
    #[must_use]
    pub fn is_excluded<S: AsRef<str>>(&self, excluded: &[S]) -> bool {
        self.segments()
            .any(|segment| excluded.iter().any(|dir| dir.as_ref() == segment))
    }

    /// Whether the path climbs above the project root
    #[inline]
    #[must_use]
    pub fn escapes_root(&self) -> bool {
        self.segments().next() == Some("..")
    }

    /// Reject paths that leave the project root
    ///
    /// # Errors
    /// Returns [`PathError::EscapesRoot`] for `../`-prefixed paths
    pub fn confined(self) -> Result<Self, PathError> {
        if self.escapes_root() {
            return Err(PathError::EscapesRoot(self.0));
        }
        Ok(self)
    }
}

/// Resolve `.` and `..` lexically
fn resolve_segments(path: &str) -> Vec<&str> {
    let mut out: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                out.pop();
            }
            s => out.push(s),
        }
    }
    out
}

impl Display for SandboxPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SandboxPath {
    type Err = PathError;

    /// Parse an already project-relative path
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.starts_with('/') {
            return Err(PathError::NotRelative(s.to_string()));
        }
        let cleaned = s.replace('\\', "/");
        let mut out: Vec<&str> = Vec::new();
        for segment in cleaned.split('/') {
            match segment {
                "" | "." => {}
                ".." if out.last().is_some_and(|last| *last != "..") => {
                    out.pop();
                }
                other => out.push(other),
            }
        }
        Self(out.join("/")).confined()
    }
}

impl AsRef<str> for SandboxPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for SandboxPath {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<SandboxPath> for String {
    fn from(path: SandboxPath) -> Self {
        path.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{IGNORED_DIRECTORIES, SANDBOX_ROOT};

    fn norm(p: &str) -> String {
        SandboxPath::normalize(p, SANDBOX_ROOT).into_string()
    }

    #[test]
    fn absolute_paths_become_relative() {
        assert_eq!(norm("/project/sandbox/src/app/page.tsx"), "src/app/page.tsx");
        assert_eq!(norm("/project/sandbox"), "");
    }

    #[test]
    fn relative_paths_are_cleaned() {
        assert_eq!(norm("./src/app/page.tsx"), "src/app/page.tsx");
        assert_eq!(norm("src//app/./page.tsx"), "src/app/page.tsx");
        assert_eq!(norm("src/app/../page.tsx"), "src/page.tsx");
        assert_eq!(norm("./"), "");
    }

    #[test]
    fn backslashes_are_converted() {
        assert_eq!(norm("src\\app\\page.tsx"), "src/app/page.tsx");
    }

    #[test]
    fn outside_root_climbs() {
        let p = SandboxPath::normalize("/etc/passwd", SANDBOX_ROOT);
        assert_eq!(p.as_str(), "../../etc/passwd");
        assert!(p.escapes_root());
        assert!(p.confined().is_err());
    }

    #[test]
    fn extension_detection() {
        let p = SandboxPath::normalize("src/page.tsx", SANDBOX_ROOT);
        assert_eq!(p.extension(), Some("tsx"));
        assert!(p.has_extension(&["jsx", "tsx"]));
        assert_eq!(SandboxPath::normalize(".gitignore", SANDBOX_ROOT).extension(), None);
        assert_eq!(SandboxPath::normalize("Makefile", SANDBOX_ROOT).extension(), None);
    }

    #[test]
    fn excluded_ancestors() {
        let p = SandboxPath::normalize("node_modules/pkg/index.js", SANDBOX_ROOT);
        assert!(p.is_excluded(IGNORED_DIRECTORIES));

        let nested = SandboxPath::normalize("packages/ui/node_modules/x.js", SANDBOX_ROOT);
        assert!(nested.is_excluded(IGNORED_DIRECTORIES));

        let ok = SandboxPath::normalize("src/node_modules_like/x.js", SANDBOX_ROOT);
        assert!(!ok.is_excluded(IGNORED_DIRECTORIES));
    }

    #[test]
    fn within_is_segment_wise() {
        let src: SandboxPath = "src".parse().unwrap();
        let inside: SandboxPath = "src/a.tsx".parse().unwrap();
        let sibling: SandboxPath = "srcs/a.tsx".parse().unwrap();
        assert!(inside.is_within(&src));
        assert!(!sibling.is_within(&src));
        assert!(inside.is_within(&SandboxPath::default()));
    }

    #[test]
    fn join_child() {
        let root = SandboxPath::default();
        let src = root.join("src");
        assert_eq!(src.as_str(), "src");
        assert_eq!(src.join("page.tsx").as_str(), "src/page.tsx");
    }

    #[test]
    fn from_str_rejects_absolute() {
        assert!("/abs/path".parse::<SandboxPath>().is_err());
        assert!("../up".parse::<SandboxPath>().is_err());
    }
}
