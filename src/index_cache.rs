use crate::path::FilePath;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;
use walkdir::WalkDir;

/// A persisted project file list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub project_dir: String,
    pub dir_hash: String,
    pub exclude: Vec<String>,
    pub last_scan: SystemTime,
    pub files: Vec<FilePath>,
}

/// Project file lists kept between runs, one bincode file per project named
/// by the blake3 hash of the project path.
///
/// An entry is only handed out while the project directory still hashes the
/// same (mtime and number of children of every directory in the tree) and
/// was scanned with the same exclude patterns.
pub struct IndexCache {
    cache_dir: PathBuf,
    entries: HashMap<PathBuf, IndexEntry>,
}

impl IndexCache {
    pub fn new(cache_dir: Option<PathBuf>) -> io::Result<Self> {
        let cache_dir = match cache_dir {
            Some(dir) => dir,
            None => default_cache_dir(),
        };

        fs::create_dir_all(&cache_dir)?;

        let mut cache = Self {
            cache_dir,
            entries: HashMap::new(),
        };

        cache.load_entries();
        Ok(cache)
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn load_entries(&mut self) {
        let Ok(entries) = fs::read_dir(&self.cache_dir) else {
            return;
        };
        for entry in entries.flatten() {
            if entry.path().extension().and_then(|s| s.to_str()) != Some("index") {
                continue;
            }
            match Self::read_cache_file(&entry.path()) {
                Ok(index_entry) => {
                    let project_dir = PathBuf::from(&index_entry.project_dir);
                    self.entries.insert(project_dir, index_entry);
                }
                Err(e) => debug!(file = %entry.path().display(), error = %e, "skipping unreadable index"),
            }
        }
    }

    fn read_cache_file(path: &Path) -> io::Result<IndexEntry> {
        let contents = fs::read(path)?;
        bincode::deserialize(&contents).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    fn write_cache_file(path: &Path, entry: &IndexEntry) -> io::Result<()> {
        let contents = bincode::serialize(entry).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, contents)
    }

    /// The file list stored for `project_dir`, if it is still current.
    pub fn get(&self, project_dir: &Path, exclude: &[String]) -> Option<&IndexEntry> {
        let entry = self.entries.get(project_dir)?;
        if entry.exclude != exclude {
            return None;
        }

        match Self::compute_dir_hash(project_dir) {
            Ok(current_hash) if entry.dir_hash == current_hash => Some(entry),
            _ => None,
        }
    }

    pub fn put(&mut self, project_dir: PathBuf, exclude: Vec<String>, files: Vec<FilePath>) -> io::Result<()> {
        let entry = IndexEntry {
            project_dir: project_dir.display().to_string(),
            dir_hash: Self::compute_dir_hash(&project_dir)?,
            exclude,
            last_scan: SystemTime::now(),
            files,
        };

        let cache_file = self.cache_file_path(&project_dir);
        Self::write_cache_file(&cache_file, &entry)?;

        self.entries.insert(project_dir, entry);
        Ok(())
    }

    fn cache_file_path(&self, project_dir: &Path) -> PathBuf {
        let hash = blake3::hash(project_dir.display().to_string().as_bytes());
        self.cache_dir.join(format!("{}.index", hash.to_hex()))
    }

    /// Hashes every directory of the tree: relative path, mtime and number
    /// of children. Adding or removing a file anywhere changes the result.
    fn compute_dir_hash(path: &Path) -> io::Result<String> {
        fs::metadata(path)?;

        let mut hasher = blake3::Hasher::new();
        let walker = WalkDir::new(path).sort_by_file_name().into_iter();
        for entry in walker.filter_map(|e| e.ok()).filter(|e| e.file_type().is_dir()) {
            let relative = entry.path().strip_prefix(path).unwrap_or(entry.path());
            hasher.update(relative.to_string_lossy().as_bytes());
            hasher.update(&[0]);

            if let Some(modified) = entry.metadata().ok().and_then(|m| m.modified().ok()) {
                if let Ok(duration) = modified.duration_since(SystemTime::UNIX_EPOCH) {
                    hasher.update(&duration.as_nanos().to_le_bytes());
                }
            }

            if let Ok(children) = fs::read_dir(entry.path()) {
                hasher.update(&(children.count() as u64).to_le_bytes());
            }
        }

        Ok(hasher.finalize().to_hex().to_string())
    }

    pub fn clear(&mut self) -> io::Result<()> {
        fs::remove_dir_all(&self.cache_dir)?;
        fs::create_dir_all(&self.cache_dir)?;
        self.entries.clear();
        Ok(())
    }
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("homing")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn files() -> Vec<FilePath> {
        vec![FilePath::from("/p/main.qml"), FilePath::from("/p/app.qrc")]
    }

    #[test]
    fn test_put_and_reload() {
        let project = tempdir().unwrap();
        let cache_dir = tempdir().unwrap();

        let mut cache = IndexCache::new(Some(cache_dir.path().to_path_buf())).unwrap();
        cache.put(project.path().to_path_buf(), vec![], files()).unwrap();

        let reloaded = IndexCache::new(Some(cache_dir.path().to_path_buf())).unwrap();
        let entry = reloaded.get(project.path(), &[]).unwrap();
        assert_eq!(entry.files, files());
    }

    #[test]
    fn test_new_child_invalidates() {
        let project = tempdir().unwrap();
        let cache_dir = tempdir().unwrap();

        let mut cache = IndexCache::new(Some(cache_dir.path().to_path_buf())).unwrap();
        cache.put(project.path().to_path_buf(), vec![], files()).unwrap();
        fs::write(project.path().join("new.qml"), "").unwrap();

        assert!(cache.get(project.path(), &[]).is_none());
    }

    #[test]
    fn test_file_added_in_subdirectory_invalidates() {
        let project = tempdir().unwrap();
        let cache_dir = tempdir().unwrap();
        fs::create_dir_all(project.path().join("qml/app")).unwrap();
        fs::write(project.path().join("qml/app/main.qml"), "").unwrap();

        let mut cache = IndexCache::new(Some(cache_dir.path().to_path_buf())).unwrap();
        cache.put(project.path().to_path_buf(), vec![], files()).unwrap();
        assert!(cache.get(project.path(), &[]).is_some());

        fs::write(project.path().join("qml/app/Extra.qml"), "").unwrap();
        assert!(cache.get(project.path(), &[]).is_none());
    }

    #[test]
    fn test_exclude_patterns_must_match() {
        let project = tempdir().unwrap();
        let cache_dir = tempdir().unwrap();

        let mut cache = IndexCache::new(Some(cache_dir.path().to_path_buf())).unwrap();
        cache.put(project.path().to_path_buf(), vec!["build".to_string()], files()).unwrap();

        assert!(cache.get(project.path(), &[]).is_none());
        assert!(cache.get(project.path(), &["build".to_string()]).is_some());
    }

    #[test]
    fn test_garbage_files_are_ignored() {
        let cache_dir = tempdir().unwrap();
        fs::write(cache_dir.path().join("junk.index"), b"not bincode").unwrap();

        let cache = IndexCache::new(Some(cache_dir.path().to_path_buf())).unwrap();
        assert!(cache.entries.is_empty());
    }

    #[test]
    fn test_clear() {
        let project = tempdir().unwrap();
        let cache_dir = tempdir().unwrap();

        let mut cache = IndexCache::new(Some(cache_dir.path().to_path_buf())).unwrap();
        cache.put(project.path().to_path_buf(), vec![], files()).unwrap();
        cache.clear().unwrap();

        assert!(cache.get(project.path(), &[]).is_none());
        assert_eq!(fs::read_dir(cache_dir.path()).unwrap().count(), 0);
    }
}
