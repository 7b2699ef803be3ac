use crate::path::FilePath;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;

/// Synchronous view of a filesystem, as consulted by the finder and the
/// manifest parser.
///
/// Implementations report inaccessible entries as absent; there is no
/// distinction between "missing" and "permission denied".
pub trait FileSystem: Send + Sync {
    fn is_file(&self, path: &FilePath) -> bool;

    fn is_dir(&self, path: &FilePath) -> bool;

    fn exists(&self, path: &FilePath) -> bool {
        self.is_file(path) || self.is_dir(path)
    }

    /// Names of the entries in `path`, sorted, without hidden (dot) entries.
    fn entry_list(&self, path: &FilePath) -> Vec<String>;

    fn read_to_string(&self, path: &FilePath) -> io::Result<String>;
}

/// The host filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl FileSystem for LocalFs {
    fn is_file(&self, path: &FilePath) -> bool {
        !path.is_empty() && fs::metadata(path.to_std_path()).map(|m| m.is_file()).unwrap_or(false)
    }

    fn is_dir(&self, path: &FilePath) -> bool {
        !path.is_empty() && fs::metadata(path.to_std_path()).map(|m| m.is_dir()).unwrap_or(false)
    }

    fn entry_list(&self, path: &FilePath) -> Vec<String> {
        let Ok(entries) = fs::read_dir(path.to_std_path()) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .flatten()
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| !is_hidden(name))
            .collect();
        names.sort();
        names
    }

    fn read_to_string(&self, path: &FilePath) -> io::Result<String> {
        fs::read_to_string(path.to_std_path())
    }
}

/// An in-memory tree of files, addressed by absolute `/`-separated paths.
///
/// Directories are implied by the files below them and can also be added
/// empty. Mutation goes through `&self` so a shared handle can be changed
/// while a finder holds it.
#[derive(Debug, Default)]
pub struct MemoryFs {
    files: RwLock<BTreeMap<String, String>>,
    dirs: RwLock<BTreeSet<String>>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: &str, contents: &str) {
        let key = memory_key(path);
        self.add_ancestors(&key);
        self.files.write().insert(key, contents.to_string());
    }

    pub fn add_dir(&self, path: &str) {
        let key = memory_key(path);
        self.add_ancestors(&key);
        self.dirs.write().insert(key);
    }

    /// Removes a file; parent directories stay.
    pub fn remove_file(&self, path: &str) -> bool {
        self.files.write().remove(&memory_key(path)).is_some()
    }

    /// Removes a directory and everything below it.
    pub fn remove_dir(&self, path: &str) {
        let key = memory_key(path);
        let prefix = dir_prefix(&key);
        self.files.write().retain(|k, _| !k.starts_with(&prefix));
        self.dirs.write().retain(|k| k != &key && !k.starts_with(&prefix));
    }

    fn add_ancestors(&self, key: &str) {
        let mut dirs = self.dirs.write();
        let mut parent = FilePath::from(key).parent_dir();
        while !parent.is_empty() {
            if !dirs.insert(parent.as_str().to_string()) {
                break;
            }
            parent = parent.parent_dir();
        }
    }
}

impl FileSystem for MemoryFs {
    fn is_file(&self, path: &FilePath) -> bool {
        !path.is_empty() && self.files.read().contains_key(&memory_key(path.as_str()))
    }

    fn is_dir(&self, path: &FilePath) -> bool {
        !path.is_empty() && self.dirs.read().contains(&memory_key(path.as_str()))
    }

    fn entry_list(&self, path: &FilePath) -> Vec<String> {
        let key = memory_key(path.as_str());
        let prefix = dir_prefix(&key);
        let child = |k: &str| -> Option<String> {
            let rest = k.strip_prefix(prefix.as_str())?;
            (!rest.is_empty() && !rest.contains('/') && !is_hidden(rest)).then(|| rest.to_string())
        };

        let mut names: BTreeSet<String> = BTreeSet::new();
        names.extend(self.files.read().keys().filter_map(|k| child(k.as_str())));
        names.extend(self.dirs.read().iter().filter_map(|k| child(k.as_str())));
        names.into_iter().collect()
    }

    fn read_to_string(&self, path: &FilePath) -> io::Result<String> {
        self.files
            .read()
            .get(&memory_key(path.as_str()))
            .cloned()
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, format!("{}: no such file", path))
            })
    }
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

fn memory_key(path: &str) -> String {
    FilePath::from(path).cleaned().as_str().to_string()
}

fn dir_prefix(key: &str) -> String {
    if key.ends_with('/') {
        key.to_string()
    } else {
        format!("{}/", key)
    }
}
