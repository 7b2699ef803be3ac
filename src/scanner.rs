use crate::path::FilePath;
use crate::types::Warning;
use std::path::Path;
use walkdir::{DirEntry, WalkDir};

#[derive(Debug, Default)]
pub struct ScanStats {
    pub file_count: u64,
    pub dir_count: u64,
    pub warnings: Vec<Warning>,
}

/// Enumerates the files of a project checkout.
pub struct Scanner {
    follow_symlinks: bool,
    max_depth: Option<usize>,
    exclude_patterns: Vec<String>,
}

impl Scanner {
    pub fn new(follow_symlinks: bool, max_depth: Option<usize>, exclude_patterns: Vec<String>) -> Self {
        Self {
            follow_symlinks,
            max_depth,
            exclude_patterns,
        }
    }

    pub fn scan<F>(&self, path: &Path, mut callback: F) -> ScanStats
    where
        F: FnMut(FilePath),
    {
        let mut stats = ScanStats::default();

        let mut walker = WalkDir::new(path)
            .follow_links(self.follow_symlinks)
            .sort_by_file_name();

        if let Some(depth) = self.max_depth {
            walker = walker.max_depth(depth);
        }

        let walker = walker
            .into_iter()
            .filter_entry(|entry| !is_excluded(&self.exclude_patterns, entry.path()));

        for entry_result in walker {
            match entry_result {
                Ok(entry) => self.process_entry(&entry, &mut stats, &mut callback),
                Err(e) => {
                    stats.warnings.push(Warning {
                        path: e.path().map(|p| p.display().to_string()).unwrap_or_else(|| "unknown".to_string()),
                        error: e.to_string(),
                    });
                }
            }
        }

        stats
    }

    /// Collects every file below `path`, in walk order.
    pub fn collect(&self, path: &Path) -> (ScanStats, Vec<FilePath>) {
        let mut files = Vec::new();
        let stats = self.scan(path, |file| files.push(file));
        (stats, files)
    }

    fn process_entry<F>(&self, entry: &DirEntry, stats: &mut ScanStats, callback: &mut F)
    where
        F: FnMut(FilePath),
    {
        let file_type = entry.file_type();
        if file_type.is_dir() {
            stats.dir_count += 1;
        } else if file_type.is_file() {
            stats.file_count += 1;
            callback(FilePath::from_std_path(entry.path()));
        }
    }
}

/// Substring match against the whole path, the way `--exclude` is documented.
pub(crate) fn is_excluded(exclude_patterns: &[String], path: &Path) -> bool {
    if exclude_patterns.is_empty() {
        return false;
    }

    let path_str = path.to_string_lossy();
    exclude_patterns.iter().any(|pattern| path_str.contains(pattern.as_str()))
}
