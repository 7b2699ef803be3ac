//! Key normalization for resource paths.
//!
//! Index keys are built and queried with these functions only, so their
//! output must stay stable byte for byte.

/// Normalizes a resource file path: drops a `qrc:` or `:` prefix and any
/// extra leading slashes, and guarantees exactly one leading `/`.
///
/// `qrc:///a/b` → `/a/b`, `:/a` → `/a`, `a` → `/a`.
pub fn normalized_qrc_file_path(path: &str) -> String {
    let bytes = path.as_bytes();
    let mut end_prefix = if path.starts_with("qrc:/") {
        4
    } else if path.starts_with(":/") {
        1
    } else {
        0
    };
    if end_prefix < bytes.len() && bytes[end_prefix] == b'/' {
        while end_prefix + 1 < bytes.len() && bytes[end_prefix + 1] == b'/' {
            end_prefix += 1;
        }
    }

    let rest = &path[end_prefix..];
    if rest.starts_with('/') {
        rest.to_string()
    } else {
        format!("/{}", rest)
    }
}

/// Like [`normalized_qrc_file_path`], with exactly one trailing `/` added
/// when missing.
pub fn normalized_qrc_directory_path(path: &str) -> String {
    let mut normalized = normalized_qrc_file_path(path);
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    normalized
}

/// The resource directory holding `file`: everything before the last `/`.
/// A path without any `/` is returned unchanged.
pub fn qrc_directory_path_for_qrc_file_path(file: &str) -> &str {
    match file.rfind('/') {
        Some(idx) => &file[..idx],
        None => file,
    }
}

/// Normalizes a `prefix` attribute: single leading `/`, no repeated
/// slashes, single trailing `/`.
pub(crate) fn fix_prefix(prefix: &str) -> String {
    let mut result = String::with_capacity(prefix.len() + 2);
    result.push('/');
    for c in prefix.chars() {
        if c == '/' && result.ends_with('/') {
            continue;
        }
        result.push(c);
    }
    if !result.ends_with('/') {
        result.push('/');
    }
    result
}
