use crate::path::FilePath;
use crate::progress::ScanProgress;
use crate::scanner::{is_excluded, ScanStats};
use crate::types::Warning;
use jwalk::WalkDir;
use parking_lot::Mutex;
use rayon::prelude::*;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

/// Parallel project enumeration using jwalk and rayon.
pub struct ParallelScanner {
    num_threads: usize,
    follow_symlinks: bool,
    max_depth: Option<usize>,
    exclude_patterns: Vec<String>,
}

impl ParallelScanner {
    pub fn new(num_threads: usize, follow_symlinks: bool, max_depth: Option<usize>, exclude_patterns: Vec<String>) -> Self {
        // Auto-detect thread count if 0
        let num_threads = if num_threads == 0 {
            rayon::current_num_threads()
        } else {
            num_threads
        };

        Self {
            num_threads,
            follow_symlinks,
            max_depth,
            exclude_patterns,
        }
    }

    /// Collects every file below `path`. The result is sorted so that it does
    /// not depend on thread scheduling.
    pub fn scan(&self, path: &Path, progress: &ScanProgress) -> (ScanStats, Vec<FilePath>) {
        let file_count = AtomicU64::new(0);
        let dir_count = AtomicU64::new(0);
        let warnings = Mutex::new(Vec::new());

        let mut walker = WalkDir::new(path)
            .follow_links(self.follow_symlinks)
            .skip_hidden(false)
            .parallelism(jwalk::Parallelism::RayonNewPool(self.num_threads));

        if let Some(depth) = self.max_depth {
            walker = walker.max_depth(depth);
        }

        let mut files: Vec<FilePath> = walker
            .into_iter()
            .par_bridge()
            .filter_map(|entry_result| match entry_result {
                Ok(entry) => {
                    let entry_path = entry.path();
                    if is_excluded(&self.exclude_patterns, &entry_path) {
                        return None;
                    }

                    let file_type = entry.file_type();
                    if file_type.is_dir() {
                        dir_count.fetch_add(1, Ordering::Relaxed);
                        None
                    } else if file_type.is_file() {
                        let count = file_count.fetch_add(1, Ordering::Relaxed) + 1;
                        if count % 1000 == 0 {
                            progress.update(count, &entry_path.to_string_lossy());
                        }
                        Some(FilePath::from_std_path(&entry_path))
                    } else {
                        None
                    }
                }
                Err(e) => {
                    warnings.lock().push(Warning {
                        path: e
                            .path()
                            .map(|p| p.display().to_string())
                            .unwrap_or_else(|| "unknown".to_string()),
                        error: e.to_string(),
                    });
                    None
                }
            })
            .collect();

        progress.finish();
        files.par_sort_unstable();

        let stats = ScanStats {
            file_count: file_count.into_inner(),
            dir_count: dir_count.into_inner(),
            warnings: warnings.into_inner(),
        };

        (stats, files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::Scanner;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_matches_sequential_scanner() {
        let dir = tempdir().unwrap();
        for i in 0..20 {
            let sub = dir.path().join(format!("dir{}", i % 4));
            fs::create_dir_all(&sub).unwrap();
            fs::write(sub.join(format!("file{}.qml", i)), "").unwrap();
        }
        fs::write(dir.path().join(".hidden"), "").unwrap();

        let (stats, parallel) = ParallelScanner::new(2, false, None, vec![]).scan(dir.path(), &ScanProgress::new(false));
        let (_, mut sequential) = Scanner::new(false, None, vec![]).collect(dir.path());
        sequential.sort();

        assert_eq!(stats.file_count, 21);
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_exclude() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("node_modules/x")).unwrap();
        fs::write(dir.path().join("node_modules/x/index.js"), "").unwrap();
        fs::write(dir.path().join("main.qml"), "").unwrap();

        let scanner = ParallelScanner::new(0, false, None, vec!["node_modules".to_string()]);
        let (_, files) = scanner.scan(dir.path(), &ScanProgress::new(false));

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file_name(), "main.qml");
    }
}
