use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Operating system flavor of the paths a finder is asked about.
///
/// Only one heuristic depends on it: on `Mac`, references pointing into an
/// `.app/Contents/Resources` bundle inside the project are not accepted as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsType {
    #[default]
    Linux,
    Mac,
    Windows,
}

impl OsType {
    pub fn host() -> Self {
        if cfg!(target_os = "macos") {
            OsType::Mac
        } else if cfg!(windows) {
            OsType::Windows
        } else {
            OsType::Linux
        }
    }
}

/// A `/`-separated path string.
///
/// References come from other machines and build trees, so this is kept as a
/// plain string rather than a host `PathBuf`: no normalization happens on
/// construction and comparisons are exact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilePath(String);

impl FilePath {
    pub fn new() -> Self {
        Self(String::new())
    }

    pub fn from_string(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Converts a host path, turning `\` separators into `/`.
    pub fn from_std_path(path: &Path) -> Self {
        let s = path.to_string_lossy();
        if cfg!(windows) {
            Self(s.replace('\\', "/"))
        } else {
            Self(s.into_owned())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_std_path(&self) -> PathBuf {
        PathBuf::from(&self.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Length in characters, the unit match lengths are counted in.
    pub fn char_count(&self) -> usize {
        self.0.chars().count()
    }

    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }

    pub fn ends_with(&self, suffix: &str) -> bool {
        self.0.ends_with(suffix)
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.0.contains(needle)
    }

    /// `/abs`, `//unc` and `C:/drive` forms count as absolute.
    pub fn is_absolute(&self) -> bool {
        self.0.starts_with('/') || drive_prefix_len(&self.0) > 0
    }

    /// Final segment; empty for a root such as `/` or `C:/`.
    pub fn file_name(&self) -> &str {
        match self.0.rfind('/') {
            Some(idx) => &self.0[idx + 1..],
            None if drive_prefix_len(&self.0) == 2 => "",
            None => &self.0,
        }
    }

    /// Parent directory. `/a` yields `/`, while `/`, `C:/` and single relative
    /// segments yield an empty path.
    pub fn parent_dir(&self) -> FilePath {
        let s = self.0.trim_end_matches('/');
        let root_len = drive_prefix_len(&self.0);
        if s.is_empty() || s.len() < root_len.max(1) || self.0.len() == root_len {
            return FilePath::new();
        }
        match s.rfind('/') {
            Some(0) => FilePath::from_string("/"),
            Some(idx) if idx + 1 == root_len => FilePath::from_string(&self.0[..root_len]),
            Some(idx) => FilePath::from_string(&s[..idx]),
            None => FilePath::new(),
        }
    }

    /// Appends `tail`, joining with exactly one `/`.
    pub fn path_appended(&self, tail: &str) -> FilePath {
        if self.0.is_empty() {
            return FilePath::from_string(tail);
        }
        if tail.is_empty() {
            return self.clone();
        }
        let head = self.0.trim_end_matches('/');
        let tail = tail.trim_start_matches('/');
        let mut joined = String::with_capacity(head.len() + tail.len() + 1);
        joined.push_str(head);
        joined.push('/');
        joined.push_str(tail);
        FilePath(joined)
    }

    /// Resolves `relative` against this directory. Absolute inputs are returned
    /// cleaned; `.` and `..` segments are folded.
    pub fn resolve_path(&self, relative: &str) -> FilePath {
        let relative = FilePath::from_string(relative);
        if relative.is_absolute() {
            return relative.cleaned();
        }
        self.path_appended(relative.as_str()).cleaned()
    }

    /// Collapses repeated separators and folds `.`/`..` segments.
    pub fn cleaned(&self) -> FilePath {
        let root_len = if self.0.starts_with('/') {
            1
        } else {
            drive_prefix_len(&self.0)
        };
        let (root, rest) = self.0.split_at(root_len);

        let mut parts: Vec<&str> = Vec::new();
        for segment in rest.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    if matches!(parts.last(), Some(last) if *last != "..") {
                        parts.pop();
                    } else if root.is_empty() {
                        parts.push("..");
                    }
                }
                other => parts.push(other),
            }
        }

        let mut cleaned = String::from(root);
        cleaned.push_str(&parts.join("/"));
        if cleaned.is_empty() && !self.0.is_empty() {
            cleaned.push('.');
        }
        FilePath(cleaned)
    }

    /// Non-empty `/`-separated segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }
}

/// Length of a `C:/` style drive root, or 0.
fn drive_prefix_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        if bytes.len() == 2 {
            2
        } else if bytes[2] == b'/' {
            3
        } else {
            0
        }
    } else {
        0
    }
}

/// Drops later duplicates, keeping first-seen order.
pub fn remove_duplicates(paths: &mut Vec<FilePath>) {
    let mut seen = std::collections::HashSet::with_capacity(paths.len());
    paths.retain(|p| seen.insert(p.clone()));
}

impl fmt::Display for FilePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FilePath {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for FilePath {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&Path> for FilePath {
    fn from(p: &Path) -> Self {
        Self::from_std_path(p)
    }
}

impl AsRef<str> for FilePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name() {
        assert_eq!(FilePath::from("/home/proj/main.qml").file_name(), "main.qml");
        assert_eq!(FilePath::from("main.qml").file_name(), "main.qml");
        assert_eq!(FilePath::from("/").file_name(), "");
        assert_eq!(FilePath::from("C:").file_name(), "");
    }

    #[test]
    fn test_parent_dir_chain() {
        let mut p = FilePath::from("/a/b/c.txt");
        let mut chain = Vec::new();
        while !p.is_empty() {
            chain.push(p.to_string());
            p = p.parent_dir();
        }
        assert_eq!(chain, vec!["/a/b/c.txt", "/a/b", "/a", "/"]);
    }

    #[test]
    fn test_parent_dir_relative_and_drive() {
        assert_eq!(FilePath::from("a/b").parent_dir(), FilePath::from("a"));
        assert!(FilePath::from("a").parent_dir().is_empty());
        assert_eq!(FilePath::from("C:/x").parent_dir(), FilePath::from("C:/"));
        assert!(FilePath::from("C:/").parent_dir().is_empty());
    }

    #[test]
    fn test_path_appended_single_separator() {
        let base = FilePath::from("/home/proj");
        assert_eq!(base.path_appended("/qml/main.qml").as_str(), "/home/proj/qml/main.qml");
        assert_eq!(base.path_appended("qml/main.qml").as_str(), "/home/proj/qml/main.qml");
        assert_eq!(FilePath::from("/root/").path_appended("//x").as_str(), "/root/x");
    }

    #[test]
    fn test_resolve_path() {
        let base = FilePath::from("/home/proj/res");
        assert_eq!(base.resolve_path("real/logo.png").as_str(), "/home/proj/res/real/logo.png");
        assert_eq!(base.resolve_path("../img/./a.png").as_str(), "/home/proj/img/a.png");
        assert_eq!(base.resolve_path("/abs//x.png").as_str(), "/abs/x.png");
    }

    #[test]
    fn test_is_absolute() {
        assert!(FilePath::from("/x").is_absolute());
        assert!(FilePath::from("C:/x").is_absolute());
        assert!(!FilePath::from("x/y").is_absolute());
        assert!(!FilePath::from(":/x").is_absolute());
    }

    #[test]
    fn test_remove_duplicates_keeps_order() {
        let mut paths: Vec<FilePath> = vec!["/b".into(), "/a".into(), "/b".into()];
        remove_duplicates(&mut paths);
        assert_eq!(paths, vec![FilePath::from("/b"), FilePath::from("/a")]);
    }
}
