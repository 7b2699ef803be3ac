use crate::fs::{FileSystem, LocalFs};
use crate::path::{remove_duplicates, FilePath, OsType};
use crate::path_map::PathMapTrie;
use crate::qrc::{normalized_qrc_file_path, QrcCache, QrcParser, QRC_EXTENSION};
use crate::url::FileUrl;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Marker of an application bundle's resource directory on macOS.
const APP_RESOURCE_PATH: &str = ".app/Contents/Resources";

/// Receives a file hit and the number of trailing characters it matched.
pub type FileHandler<'a> = &'a mut dyn FnMut(&FilePath, usize);
/// Receives the entry names of a directory hit and the match length.
pub type DirectoryHandler<'a> = &'a mut dyn FnMut(&[String], usize);

/// A remembered resolution: the candidates found for a query and how many
/// trailing characters of the query they matched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheEntry {
    pub paths: Vec<FilePath>,
    pub match_length: usize,
}

/// Answer of [`ProjectFileFinder::find_file`]. `paths` is never empty: when
/// nothing was found it holds the unresolved original path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindOutcome {
    pub paths: Vec<FilePath>,
    pub success: bool,
}

struct FoundHandlers<'f, 'd> {
    file: Option<FileHandler<'f>>,
    dir: Option<DirectoryHandler<'d>>,
}

impl FoundHandlers<'_, '_> {
    /// Reports `candidate` to whichever handler wants it, files first.
    fn check_path(&mut self, fs: &dyn FileSystem, candidate: &FilePath, match_length: usize) -> bool {
        if let Some(on_file) = self.file.as_mut() {
            if fs.is_file(candidate) {
                on_file(candidate, match_length);
                return true;
            }
        }
        if let Some(on_dir) = self.dir.as_mut() {
            if fs.is_dir(candidate) {
                on_dir(&fs.entry_list(candidate), match_length);
                return true;
            }
        }
        false
    }
}

type Strategy = fn(&mut ProjectFileFinder, &FilePath, &mut FoundHandlers<'_, '_>) -> bool;

/// Lookup strategies in the order they are tried; the first hit wins.
const STRATEGIES: [(&str, Strategy); 7] = [
    ("root directory", ProjectFileFinder::check_root_directory),
    ("mapped paths", ProjectFileFinder::check_mapped_path),
    ("cache", ProjectFileFinder::check_cache),
    ("project directory", ProjectFileFinder::check_project_directory),
    ("project files", ProjectFileFinder::check_project_files),
    ("search paths", ProjectFileFinder::check_search_paths),
    ("sysroot", ProjectFileFinder::check_sysroot),
];

/// Finds the original file in the project checkout for a path recorded
/// elsewhere.
///
/// Files are often copied during build and deployment, so references in
/// logs, crash reports and debugger output point into shadow build trees,
/// application bundles or devices. For a project in `/home/x/app`, all of
///
/// - `C:/app-build-desktop/qml/app/main.qml` (shadow build directory)
/// - `/Users/x/app-build-desktop/App.app/Contents/Resources/qml/app/main.qml`
///
/// resolve to `/home/x/app/qml/app/main.qml`.
///
/// Hits are cached per query. Cached candidates are re-checked against the
/// filesystem on every use and dropped once they disappear.
pub struct ProjectFileFinder {
    fs: Arc<dyn FileSystem>,
    os_type: OsType,
    project_dir: FilePath,
    project_files: Vec<FilePath>,
    sysroot: FilePath,
    search_dirs: Vec<FilePath>,
    path_map: PathMapTrie,
    cache: HashMap<FilePath, CacheEntry>,
    qrc_url_finder: QrcUrlFinder,
}

impl ProjectFileFinder {
    /// A finder over the host filesystem.
    pub fn new() -> Self {
        Self::with_file_system(Arc::new(LocalFs))
    }

    /// A finder over `fs`, with its own manifest cache on the same filesystem.
    pub fn with_file_system(fs: Arc<dyn FileSystem>) -> Self {
        let qrc_cache = Arc::new(QrcCache::with_file_system(fs.clone()));
        Self {
            fs,
            os_type: OsType::host(),
            project_dir: FilePath::new(),
            project_files: Vec::new(),
            sysroot: FilePath::new(),
            search_dirs: Vec::new(),
            path_map: PathMapTrie::new(),
            cache: HashMap::new(),
            qrc_url_finder: QrcUrlFinder::new(qrc_cache),
        }
    }

    /// Shares `cache` for parsing the project's resource manifests.
    pub fn set_qrc_cache(&mut self, cache: Arc<QrcCache>) {
        let qrc_files = std::mem::take(&mut self.qrc_url_finder.qrc_files);
        self.qrc_url_finder = QrcUrlFinder::new(cache);
        self.qrc_url_finder.qrc_files = qrc_files;
    }

    pub fn os_type(&self) -> OsType {
        self.os_type
    }

    /// Flavor of the paths being looked up.
    pub fn set_os_type(&mut self, os_type: OsType) {
        if self.os_type != os_type {
            self.os_type = os_type;
            self.cache.clear();
        }
    }

    pub fn project_directory(&self) -> &FilePath {
        &self.project_dir
    }

    /// Sets the root of the checkout, which should be empty or an existing
    /// absolute directory.
    pub fn set_project_directory(&mut self, absolute_project_path: FilePath) {
        if absolute_project_path == self.project_dir {
            return;
        }

        if !absolute_project_path.is_empty()
            && !(absolute_project_path.is_absolute() && self.fs.exists(&absolute_project_path))
        {
            warn!(
                project_dir = %absolute_project_path,
                "project directory is not an existing absolute path"
            );
        }

        self.project_dir = absolute_project_path;
        self.cache.clear();
    }

    pub fn project_files(&self) -> &[FilePath] {
        &self.project_files
    }

    /// Sets every file belonging to the project. Resource manifests among
    /// them back `qrc:` lookups.
    pub fn set_project_files(&mut self, project_files: Vec<FilePath>) {
        if self.project_files == project_files {
            return;
        }

        self.qrc_url_finder.set_project_files(&project_files);
        self.project_files = project_files;
        self.cache.clear();
    }

    pub fn sysroot(&self) -> &FilePath {
        &self.sysroot
    }

    pub fn set_sysroot(&mut self, sysroot: FilePath) {
        if self.sysroot == sysroot {
            return;
        }

        self.sysroot = sysroot;
        self.cache.clear();
    }

    pub fn search_directories(&self) -> &[FilePath] {
        &self.search_dirs
    }

    /// Directories probed after the project itself. Changing them keeps the
    /// cache: earlier hits stay valid as long as they exist.
    pub fn set_additional_search_directories(&mut self, search_directories: Vec<FilePath>) {
        self.search_dirs = search_directories;
    }

    /// Maps `remote_file_path`, e.g. a path on a device, to a local file.
    pub fn add_mapped_path(&mut self, local_file_path: FilePath, remote_file_path: &str) {
        self.path_map.insert(local_file_path, remote_file_path);
    }

    /// The remembered resolution for `original_path`, if any.
    pub fn cached(&self, original_path: &FilePath) -> Option<&CacheEntry> {
        self.cache.get(original_path)
    }

    /// Returns the best matches for `file_url` in the project.
    ///
    /// Resource URLs are looked up in the project's manifests first. Other
    /// references go through the strategies of
    /// [`find_file_or_directory`](Self::find_file_or_directory). When all
    /// fail the original path comes back with `success == false`.
    pub fn find_file(&mut self, file_url: &FileUrl) -> FindOutcome {
        debug!(url = %file_url, "trying to find file");

        if file_url.is_resource() {
            let paths = self.qrc_url_finder.find(file_url);
            if !paths.is_empty() {
                return FindOutcome {
                    paths,
                    success: true,
                };
            }
        }

        let original_path = file_url.lookup_path();

        let mut paths = Vec::new();
        let mut on_file = |path: &FilePath, _: usize| paths.push(path.clone());
        let found = self.find_file_or_directory(&original_path, Some(&mut on_file), None);
        if !found {
            paths.push(original_path);
        }

        FindOutcome {
            paths,
            success: found,
        }
    }

    /// Runs the lookup strategies for `original_path` and reports hits to the
    /// handlers. Directory hits are only reported when `on_directory` is set.
    pub fn find_file_or_directory(
        &mut self,
        original_path: &FilePath,
        on_file: Option<FileHandler<'_>>,
        on_directory: Option<DirectoryHandler<'_>>,
    ) -> bool {
        if original_path.is_empty() {
            debug!("malformed original path, returning");
            return false;
        }

        let mut handlers = FoundHandlers {
            file: on_file,
            dir: on_directory,
        };
        for (name, strategy) in STRATEGIES {
            if strategy(self, original_path, &mut handlers) {
                return true;
            }
            debug!(strategy = name, "no match");
        }

        debug!(path = %original_path, "couldn't find file");
        false
    }

    fn handle_success(
        &mut self,
        original_path: &FilePath,
        found: Vec<FilePath>,
        match_length: usize,
        source: &str,
    ) -> bool {
        debug!(found = ?found, source, "found");
        self.cache.insert(
            original_path.clone(),
            CacheEntry {
                paths: found,
                match_length,
            },
        );
        true
    }

    fn check_root_directory(&mut self, original_path: &FilePath, handlers: &mut FoundHandlers<'_, '_>) -> bool {
        let Some(on_dir) = handlers.dir.as_mut() else {
            return false;
        };
        if *original_path != self.project_dir || !self.fs.is_dir(original_path) {
            return false;
        }

        let entries = self.fs.entry_list(original_path);
        on_dir(&entries, original_path.char_count());
        true
    }

    fn check_mapped_path(&mut self, original_path: &FilePath, handlers: &mut FoundHandlers<'_, '_>) -> bool {
        let Some(node) = self.path_map.lookup(original_path.as_str()) else {
            return false;
        };
        let orig_length = original_path.char_count();

        if let Some(local_path) = node.local_path.clone() {
            if handlers.check_path(self.fs.as_ref(), &local_path, orig_length) {
                return self.handle_success(original_path, vec![local_path], orig_length, "in mapped paths");
            }
        } else if !node.children.is_empty() {
            if let Some(on_dir) = handlers.dir.as_mut() {
                on_dir(&self.path_map.child_names(node), orig_length);
                debug!(path = %original_path, "found virtual directory in mapped paths");
                return true;
            }
        }
        false
    }

    fn check_cache(&mut self, original_path: &FilePath, handlers: &mut FoundHandlers<'_, '_>) -> bool {
        let fs = &self.fs;
        let Some(entry) = self.cache.get_mut(original_path) else {
            return false;
        };

        debug!("checking cache");
        let match_length = entry.match_length;
        entry
            .paths
            .retain(|candidate| handlers.check_path(fs.as_ref(), candidate, match_length));

        if !entry.paths.is_empty() {
            debug!(found = ?entry.paths, "found in the cache");
            return true;
        }

        self.cache.remove(original_path);
        false
    }

    fn check_project_directory(&mut self, original_path: &FilePath, handlers: &mut FoundHandlers<'_, '_>) -> bool {
        if self.project_dir.is_empty() {
            return false;
        }

        debug!("checking project directory");

        let orig = original_path.as_str();
        let orig_length = original_path.char_count();
        let project_prefix = format!("{}/", self.project_dir.as_str().trim_end_matches('/'));

        let mut prefix_to_ignore = None;
        if orig.starts_with(&project_prefix) {
            // A copy inside MyApp.app/Contents/Resources of an in-source build
            // also starts with the project path; skip to after the bundle.
            if self.os_type == OsType::Mac {
                if let Some(idx) = orig.find(APP_RESOURCE_PATH) {
                    prefix_to_ignore = Some(idx + APP_RESOURCE_PATH.len());
                }
            }
            if prefix_to_ignore.is_none() && handlers.check_path(self.fs.as_ref(), original_path, orig_length) {
                return self.handle_success(
                    original_path,
                    vec![original_path.clone()],
                    orig_length,
                    "in project directory",
                );
            }
        }

        debug!("checking stripped paths in project directory");

        if prefix_to_ignore.is_none() {
            prefix_to_ignore = if !original_path.is_absolute() {
                Some(0)
            } else {
                orig.find('/')
            };
        }

        // Strip directories one by one from the front and look for the rest
        // below the project directory.
        while let Some(prefix) = prefix_to_ignore {
            let candidate = self.project_dir.path_appended(&orig[prefix..]);
            let match_length = orig[prefix..].chars().count();
            // FIXME: a later strategy may find a longer match than this one.
            if handlers.check_path(self.fs.as_ref(), &candidate, match_length) {
                return self.handle_success(original_path, vec![candidate], match_length, "in project directory");
            }
            // next '/' after the first character of the current remainder
            prefix_to_ignore = orig[prefix..]
                .char_indices()
                .nth(1)
                .map(|(idx, _)| prefix + idx)
                .and_then(|start| orig[start..].find('/').map(|idx| start + idx));
        }
        false
    }

    fn check_project_files(&mut self, original_path: &FilePath, handlers: &mut FoundHandlers<'_, '_>) -> bool {
        debug!("checking project files");

        let last_segment = original_path.file_name();
        let mut matches = Vec::new();
        if handlers.file.is_some() {
            matches.extend(self.files_with_same_file_name(last_segment));
        }
        if handlers.dir.is_some() {
            matches.extend(self.path_segments_with_same_name(last_segment));
        }

        let matched = best_matches(matches, original_path);
        let Some(first) = matched.first() else {
            return false;
        };

        let match_length = common_postfix_length(first, original_path);
        let fs = self.fs.as_ref();
        let hits: Vec<FilePath> = matched
            .into_iter()
            .filter(|candidate| handlers.check_path(fs, candidate, match_length))
            .collect();
        if hits.is_empty() {
            return false;
        }

        self.handle_success(original_path, hits, match_length, "when matching project files")
    }

    fn check_search_paths(&mut self, original_path: &FilePath, handlers: &mut FoundHandlers<'_, '_>) -> bool {
        let fs = self.fs.as_ref();
        let found = self
            .search_dirs
            .iter()
            .find_map(|dir| find_in_search_path(fs, dir, original_path, handlers));

        match found {
            Some(found) => self.handle_success(original_path, found.paths, found.match_length, "in search path"),
            None => false,
        }
    }

    fn check_sysroot(&mut self, original_path: &FilePath, handlers: &mut FoundHandlers<'_, '_>) -> bool {
        debug!("checking absolute path in sysroot");

        if self.sysroot.is_empty() {
            return false;
        }

        let orig_length = original_path.char_count();
        let sysroot_path = self.sysroot.path_appended(original_path.as_str());
        if !handlers.check_path(self.fs.as_ref(), &sysroot_path, orig_length) {
            return false;
        }

        self.handle_success(original_path, vec![sysroot_path], orig_length, "in sysroot")
    }

    fn files_with_same_file_name(&self, file_name: &str) -> Vec<FilePath> {
        self.project_files
            .iter()
            .filter(|f| f.file_name() == file_name)
            .cloned()
            .collect()
    }

    /// Ancestor directories of project files whose name is `segment`.
    fn path_segments_with_same_name(&self, segment: &str) -> Vec<FilePath> {
        let mut result: Vec<FilePath> = Vec::new();
        for file in &self.project_files {
            let mut current = file.parent_dir();
            while !current.is_empty() {
                if current.file_name() == segment && result.last() != Some(&current) {
                    result.push(current.clone());
                }
                current = current.parent_dir();
            }
        }
        remove_duplicates(&mut result);
        result
    }
}

impl Default for ProjectFileFinder {
    fn default() -> Self {
        Self::new()
    }
}

/// Looks for `file_path` below `search_path`, stripping leading directories
/// until something exists. A search directory whose own name equals the
/// last remaining segment is itself reported as a directory hit.
fn find_in_search_path(
    fs: &dyn FileSystem,
    search_path: &FilePath,
    file_path: &FilePath,
    handlers: &mut FoundHandlers<'_, '_>,
) -> Option<CacheEntry> {
    debug!(search_path = %search_path, "checking search path");

    let mut s = file_path.as_str();
    while !s.is_empty() {
        let candidate = search_path.path_appended(s);
        let match_length = s.chars().count() + 1;
        debug!(candidate = %candidate, "trying");

        if handlers.check_path(fs, &candidate, match_length) {
            return Some(CacheEntry {
                paths: vec![candidate],
                match_length,
            });
        }

        let next = chop_first_dir(s);
        if next.is_empty() {
            if let Some(on_dir) = handlers.dir.as_mut() {
                if search_path.file_name() == s {
                    on_dir(&fs.entry_list(search_path), match_length);
                    return Some(CacheEntry {
                        paths: vec![search_path.clone()],
                        match_length,
                    });
                }
            }
            break;
        }
        s = next;
    }
    None
}

fn chop_first_dir(dir_path: &str) -> &str {
    match dir_path.find('/') {
        Some(idx) => &dir_path[idx + 1..],
        None => "",
    }
}

/// Number of trailing characters `candidate` and `to_find` have in common.
pub fn common_postfix_length(candidate: &FilePath, to_find: &FilePath) -> usize {
    candidate
        .as_str()
        .chars()
        .rev()
        .zip(to_find.as_str().chars().rev())
        .take_while(|(a, b)| a == b)
        .count()
}

/// The candidates sharing the longest common suffix with `to_find`; ties are
/// all kept, in input order.
pub fn best_matches(file_paths: Vec<FilePath>, to_find: &FilePath) -> Vec<FilePath> {
    if file_paths.len() <= 1 {
        if let Some(only) = file_paths.first() {
            debug!(found = %only, "found in project files");
        }
        return file_paths;
    }

    let mut best_rank = 0;
    let mut best: Vec<FilePath> = Vec::new();
    for path in file_paths {
        let rank = common_postfix_length(&path, to_find);
        if rank < best_rank {
            continue;
        }
        if rank > best_rank {
            best_rank = rank;
            best.clear();
        }
        best.push(path);
    }
    best
}

/// Resolves `qrc:` URLs through the project's resource manifests.
///
/// Parsers come from a shared [`QrcCache`]; every manifest used holds one
/// reference there until the project files change or the finder is dropped.
struct QrcUrlFinder {
    cache: Arc<QrcCache>,
    qrc_files: Vec<FilePath>,
    parsers: HashMap<FilePath, Arc<QrcParser>>,
    file_cache: HashMap<String, Vec<FilePath>>,
}

impl QrcUrlFinder {
    fn new(cache: Arc<QrcCache>) -> Self {
        Self {
            cache,
            qrc_files: Vec::new(),
            parsers: HashMap::new(),
            file_cache: HashMap::new(),
        }
    }

    fn find(&mut self, file_url: &FileUrl) -> Vec<FilePath> {
        if let Some(hit) = self.file_cache.get(file_url.as_str()) {
            return hit.clone();
        }

        let resource_path = normalized_qrc_file_path(file_url.as_str());
        let mut result = Vec::new();
        for qrc_file in &self.qrc_files {
            let parser = self
                .parsers
                .entry(qrc_file.clone())
                .or_insert_with(|| self.cache.add_path(qrc_file, ""));
            if !parser.is_valid() {
                continue;
            }
            parser.collect_files_at_path(&resource_path, &mut result, None);
        }
        remove_duplicates(&mut result);

        self.file_cache.insert(file_url.as_str().to_string(), result.clone());
        result
    }

    fn set_project_files(&mut self, project_files: &[FilePath]) {
        self.release();
        self.qrc_files = project_files
            .iter()
            .filter(|f| f.ends_with(QRC_EXTENSION))
            .cloned()
            .collect();
        self.file_cache.clear();
    }

    fn release(&mut self) {
        for (path, _) in self.parsers.drain() {
            self.cache.remove_path(&path);
        }
    }
}

impl Drop for QrcUrlFinder {
    fn drop(&mut self) {
        self.release();
    }
}
