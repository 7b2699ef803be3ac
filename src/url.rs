use crate::path::FilePath;
use percent_encoding::percent_decode_str;
use std::fmt;

/// A file reference as it appears in logs, stack traces and QML errors.
///
/// Accepts `scheme://host/path` and `scheme:path` URLs as well as bare
/// paths. Single-letter "schemes" are treated as Windows drive letters, and a
/// leading `:` marks a resource path without a scheme.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileUrl {
    raw: String,
    scheme: Option<String>,
    host: String,
    path: String,
}

impl FileUrl {
    pub fn parse(input: &str) -> Self {
        let (scheme, rest) = match split_scheme(input) {
            Some((scheme, rest)) => (Some(scheme.to_ascii_lowercase()), rest),
            None => (None, input),
        };

        let (host, path) = match (&scheme, rest.strip_prefix("//")) {
            (Some(_), Some(authority)) => match authority.find('/') {
                Some(idx) => (authority[..idx].to_string(), authority[idx..].to_string()),
                None => (authority.to_string(), String::new()),
            },
            _ => (String::new(), rest.to_string()),
        };

        Self {
            raw: input.to_string(),
            scheme,
            host,
            path,
        }
    }

    pub fn from_local_file(path: &FilePath) -> Self {
        Self {
            raw: path.as_str().to_string(),
            scheme: None,
            host: String::new(),
            path: path.as_str().to_string(),
        }
    }

    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// The path component, percent-decoded.
    pub fn path(&self) -> String {
        percent_decode_str(&self.path).decode_utf8_lossy().into_owned()
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// True for `qrc:` URLs and `:/`-style resource paths.
    pub fn is_resource(&self) -> bool {
        self.scheme.as_deref() == Some("qrc") || self.raw.starts_with(':')
    }

    /// The local file this URL names, or an empty path when it does not
    /// name one (any scheme other than `file`, or a resource path).
    pub fn to_local_file(&self) -> FilePath {
        match self.scheme.as_deref() {
            Some("file") => {
                let decoded = self.path();
                // file:///C:/x carries the drive after the authority slash
                let local = match decoded.strip_prefix('/') {
                    Some(rest) if is_drive(rest) => rest.to_string(),
                    _ => decoded,
                };
                if self.host.is_empty() || self.host == "localhost" {
                    FilePath::from(local)
                } else {
                    FilePath::from(format!("//{}{}", self.host, local))
                }
            }
            None if !self.raw.starts_with(':') => FilePath::from(self.raw.as_str()),
            _ => FilePath::new(),
        }
    }

    /// The path a project file lookup starts from: the local file, or the
    /// URL's path for resource and other non-local URLs.
    pub fn lookup_path(&self) -> FilePath {
        let local = self.to_local_file();
        if local.is_empty() {
            FilePath::from(self.path())
        } else {
            local
        }
    }
}

fn split_scheme(input: &str) -> Option<(&str, &str)> {
    let colon = input.find(':')?;
    let scheme = &input[..colon];
    let mut chars = scheme.chars();
    let first = chars.next()?;
    if !first.is_ascii_alphabetic() || scheme.len() == 1 {
        return None;
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) {
        return None;
    }
    Some((scheme, &input[colon + 1..]))
}

fn is_drive(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() >= 2 && b[0].is_ascii_alphabetic() && b[1] == b':'
}

impl fmt::Display for FileUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<&str> for FileUrl {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_url() {
        let url = FileUrl::parse("file:///home/proj/a%20b.qml");
        assert_eq!(url.scheme(), Some("file"));
        assert_eq!(url.to_local_file().as_str(), "/home/proj/a b.qml");
        assert!(!url.is_resource());
    }

    #[test]
    fn test_windows_file_url_and_drive_path() {
        let url = FileUrl::parse("file:///C:/src/main.qml");
        assert_eq!(url.to_local_file().as_str(), "C:/src/main.qml");

        let plain = FileUrl::parse("C:/src/main.qml");
        assert_eq!(plain.scheme(), None);
        assert_eq!(plain.to_local_file().as_str(), "C:/src/main.qml");
    }

    #[test]
    fn test_qrc_urls() {
        let url = FileUrl::parse("qrc:/images/logo.png");
        assert!(url.is_resource());
        assert!(url.to_local_file().is_empty());
        assert_eq!(url.path(), "/images/logo.png");

        let host = FileUrl::parse("qrc://images/logo.png");
        assert_eq!(host.host(), "images");
        assert_eq!(host.path(), "/logo.png");

        let colon = FileUrl::parse(":/images/logo.png");
        assert!(colon.is_resource());
        assert!(colon.to_local_file().is_empty());
    }

    #[test]
    fn test_bare_path_is_local() {
        let url = FileUrl::parse("/build/qml/main.qml");
        assert_eq!(url.scheme(), None);
        assert_eq!(url.to_local_file().as_str(), "/build/qml/main.qml");
        assert_eq!(FileUrl::from_local_file(&"x/y".into()).to_local_file().as_str(), "x/y");
    }

    #[test]
    fn test_lookup_path_falls_back_to_url_path() {
        assert_eq!(FileUrl::parse("/build/main.qml").lookup_path().as_str(), "/build/main.qml");
        assert_eq!(FileUrl::parse("qrc:/qml/main.qml").lookup_path().as_str(), "/qml/main.qml");
        assert_eq!(FileUrl::parse(":/qml/main.qml").lookup_path().as_str(), "/qml/main.qml");
    }
}
