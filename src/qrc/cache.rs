use crate::fs::{FileSystem, LocalFs};
use crate::path::FilePath;
use crate::qrc::parser::QrcParser;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tracing::warn;

struct CachedParser {
    parser: Arc<QrcParser>,
    ref_count: usize,
}

/// Parsed manifests shared between consumers, keyed by manifest path and
/// reference counted.
///
/// Every [`add_path`](Self::add_path) must be balanced by a
/// [`remove_path`](Self::remove_path); the last release evicts the entry.
/// Parsing happens outside the lock, so two first-time adders may both parse
/// the manifest; the first one installed wins and both references count.
pub struct QrcCache {
    fs: Arc<dyn FileSystem>,
    entries: RwLock<HashMap<FilePath, CachedParser>>,
}

impl QrcCache {
    /// A cache reading manifests from the host filesystem.
    pub fn new() -> Self {
        Self::with_file_system(Arc::new(LocalFs))
    }

    pub fn with_file_system(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// The process-wide cache over the host filesystem.
    pub fn global() -> &'static QrcCache {
        static GLOBAL: OnceLock<QrcCache> = OnceLock::new();
        GLOBAL.get_or_init(QrcCache::new)
    }

    /// Takes a reference on the manifest at `path`, parsing it on first use.
    /// A non-empty `contents` replaces reading the file.
    pub fn add_path(&self, path: &FilePath, contents: &str) -> Arc<QrcParser> {
        {
            let mut entries = self.entries.write();
            if let Some(entry) = entries.get_mut(path) {
                entry.ref_count += 1;
                return entry.parser.clone();
            }
        }

        let parsed = QrcParser::parse_qrc_file_with(self.fs.as_ref(), path, contents);
        if !parsed.is_valid() {
            warn!(
                manifest = %path,
                errors = ?parsed.error_messages(),
                "adding invalid resource manifest to the cache"
            );
        }

        let mut entries = self.entries.write();
        let entry = entries.entry(path.clone()).or_insert_with(|| CachedParser {
            parser: parsed,
            ref_count: 0,
        });
        entry.ref_count += 1;
        entry.parser.clone()
    }

    /// Releases one reference on `path`; the last one evicts it.
    pub fn remove_path(&self, path: &FilePath) {
        let mut entries = self.entries.write();
        match entries.get_mut(path) {
            Some(entry) if entry.ref_count > 1 => entry.ref_count -= 1,
            Some(_) => {
                entries.remove(path);
            }
            None => {}
        }
    }

    /// Reparses `path` and replaces the cached parser, keeping the reference
    /// count. A manifest nobody added yet is registered with one reference.
    pub fn update_path(&self, path: &FilePath, contents: &str) -> Arc<QrcParser> {
        let parsed = QrcParser::parse_qrc_file_with(self.fs.as_ref(), path, contents);

        let mut entries = self.entries.write();
        let entry = entries.entry(path.clone()).or_insert_with(|| CachedParser {
            parser: parsed.clone(),
            ref_count: 0,
        });
        entry.parser = parsed;
        if entry.ref_count == 0 {
            entry.ref_count = 1;
        }
        entry.parser.clone()
    }

    /// The cached parser for `path`, if any.
    pub fn parsed_path(&self, path: &FilePath) -> Option<Arc<QrcParser>> {
        self.entries.read().get(path).map(|e| e.parser.clone())
    }

    pub fn ref_count(&self, path: &FilePath) -> usize {
        self.entries.read().get(path).map_or(0, |e| e.ref_count)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl Default for QrcCache {
    fn default() -> Self {
        Self::new()
    }
}
