use crate::error::QrcError;
use crate::fs::{FileSystem, LocalFs};
use crate::locale::Locale;
use crate::path::FilePath;
use crate::qrc::normalize::fix_prefix;
use roxmltree::{Document, Node};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

const ROOT_ELEMENT: &str = "RCC";
const RESOURCE_ELEMENT: &str = "qresource";
const FILE_ELEMENT: &str = "file";
const PREFIX_ATTRIBUTE: &str = "prefix";
const LANG_ATTRIBUTE: &str = "lang";
const ALIAS_ATTRIBUTE: &str = "alias";

/// Result of [`QrcParser::longest_reverse_matches`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchResult {
    /// Number of `/`-separated segments of the reversed query that matched.
    pub match_depth: usize,
    /// Reversed access paths sharing the longest matched prefix.
    pub reversed_paths: Vec<String>,
    /// Real files behind `reversed_paths`, in the same order.
    pub source_files: Vec<FilePath>,
}

/// Index of one or more resource manifests (`.qrc` files).
///
/// A manifest maps resource paths to files on disk. Each `<qresource>` group
/// may carry a `lang` attribute, which becomes a raw prefix of the access
/// key: the French `/image/bla.png` is stored as `fr/image/bla.png`, the
/// default-language one as `/image/bla.png`.
///
/// Several manifests (for example per-platform variants) can contribute the
/// same key, so keys map to lists of files. Keys are kept sorted so that all
/// paths under a resource directory form one contiguous range.
#[derive(Debug, Default)]
pub struct QrcParser {
    resources: BTreeMap<String, Vec<FilePath>>,
    reverse_resources: BTreeMap<String, Vec<FilePath>>,
    files: HashMap<FilePath, Vec<String>>,
    languages: Vec<String>,
    errors: Vec<QrcError>,
}

impl QrcParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the manifest at `path` from the host filesystem and wraps the
    /// parser for sharing. An empty `path` yields an empty, valid parser; a
    /// failed parse yields an empty, invalid one.
    pub fn parse_qrc_file(path: &FilePath, contents: &str) -> Arc<QrcParser> {
        Self::parse_qrc_file_with(&LocalFs, path, contents)
    }

    pub fn parse_qrc_file_with(fs: &dyn FileSystem, path: &FilePath, contents: &str) -> Arc<QrcParser> {
        let mut parser = QrcParser::new();
        if !path.is_empty() {
            parser.parse_file_with(fs, path, contents);
        }
        Arc::new(parser)
    }

    /// Parses the manifest at `path`. When `contents` is non-empty it is used
    /// instead of reading the file. Returns whether parsing succeeded.
    pub fn parse_file(&mut self, path: &FilePath, contents: &str) -> bool {
        self.parse_file_with(&LocalFs, path, contents)
    }

    pub fn parse_file_with(&mut self, fs: &dyn FileSystem, path: &FilePath, contents: &str) -> bool {
        let loaded;
        let text = if contents.is_empty() {
            match fs.read_to_string(path) {
                Ok(text) => {
                    loaded = text;
                    loaded.as_str()
                }
                Err(source) => {
                    self.errors.push(QrcError::Read {
                        path: path.clone(),
                        source,
                    });
                    return false;
                }
            }
        } else {
            contents
        };

        let doc = match Document::parse(text) {
            Ok(doc) => doc,
            Err(e) => {
                self.errors.push(e.into());
                return false;
            }
        };

        let root = doc.root_element();
        if root.tag_name().name() != ROOT_ELEMENT {
            self.errors.push(QrcError::MissingRoot);
            return false;
        }

        let base_dir = path.parent_dir();
        for group in child_elements(root, RESOURCE_ELEMENT) {
            let prefix = fix_prefix(group.attribute(PREFIX_ATTRIBUTE).unwrap_or_default());
            let language = group.attribute(LANG_ATTRIBUTE).unwrap_or_default().to_string();
            if !self.languages.contains(&language) {
                self.languages.push(language.clone());
            }

            for file in child_elements(group, FILE_ELEMENT) {
                let file_name = element_text(file);
                let file_path = base_dir.resolve_path(&file_name);
                let access_path = match file.attribute(ALIAS_ATTRIBUTE) {
                    Some(alias) if !alias.is_empty() => format!("{}{}{}", language, prefix, alias),
                    _ => format!("{}{}{}", language, prefix, file_name),
                };
                self.insert(access_path, file_path);
            }
        }

        debug!(
            manifest = %path,
            entries = self.resources.len(),
            languages = ?self.languages,
            "parsed resource manifest"
        );
        true
    }

    fn insert(&mut self, access_path: String, file_path: FilePath) {
        let resources = self.resources.entry(access_path.clone()).or_default();
        if !resources.contains(&file_path) {
            resources.push(file_path.clone());
            let mut reversed: String = access_path.chars().rev().collect();
            if !reversed.ends_with('/') {
                reversed.push('/');
            }
            self.reverse_resources
                .entry(reversed)
                .or_default()
                .push(file_path.clone());
        }

        let names = self.files.entry(file_path).or_default();
        if !names.contains(&access_path) {
            names.push(access_path);
        }
    }

    /// The first file declared at the normalized resource `path`, trying the
    /// locale's languages from most to least specific. Empty when none match.
    pub fn first_file_at_path(&self, path: &str, locale: &Locale) -> FilePath {
        debug_assert!(path.starts_with('/'));
        for language in self.lookup_languages(Some(locale)) {
            if !self.languages.contains(&language) {
                continue;
            }
            if let Some(files) = self.resources.get(&format!("{}{}", language, path)) {
                if let Some(first) = files.first() {
                    return first.clone();
                }
            }
        }
        FilePath::new()
    }

    /// Appends every file declared at the normalized resource `path` for each
    /// matching language. `None` means all declared languages.
    pub fn collect_files_at_path(&self, path: &str, files: &mut Vec<FilePath>, locale: Option<&Locale>) {
        debug_assert!(path.starts_with('/'));
        for language in self.lookup_languages(locale) {
            if !self.languages.contains(&language) {
                continue;
            }
            if let Some(found) = self.resources.get(&format!("{}{}", language, path)) {
                files.extend(found.iter().cloned());
            }
        }
    }

    /// True if some resource lives below the directory `path`, which must
    /// start and end with `/`.
    pub fn has_dir_at_path(&self, path: &str, locale: Option<&Locale>) -> bool {
        debug_assert!(path.starts_with('/') && path.ends_with('/'));
        self.lookup_languages(locale)
            .into_iter()
            .filter(|language| self.languages.contains(language))
            .any(|language| {
                let key = format!("{}{}", language, path);
                self.resources
                    .range(key.clone()..)
                    .next()
                    .is_some_and(|(k, _)| k.starts_with(&key))
            })
    }

    /// One-level listing of the directory `path` (starting and ending with
    /// `/`). Files map to their backing files; sub-directories are added as
    /// `name/` with no files when `add_dirs` is set.
    pub fn collect_files_in_path(
        &self,
        path: &str,
        contents: &mut BTreeMap<String, Vec<FilePath>>,
        add_dirs: bool,
        locale: Option<&Locale>,
    ) {
        debug_assert!(path.starts_with('/') && path.ends_with('/'));
        for language in self.lookup_languages(locale) {
            let key = format!("{}{}", language, path);
            let mut entries = self.resources.range(key.clone()..).peekable();
            while let Some((actual_key, files)) = entries.next() {
                if !actual_key.starts_with(&key) {
                    break;
                }
                let rest = &actual_key[key.len()..];
                match rest.find('/') {
                    None => {
                        let listed = contents.entry(rest.to_string()).or_default();
                        for file in files {
                            if !listed.contains(file) {
                                listed.push(file.clone());
                            }
                        }
                    }
                    Some(end) => {
                        let dir_name = &rest[..=end];
                        if add_dirs {
                            contents.insert(dir_name.to_string(), Vec::new());
                        }
                        let dir_key = format!("{}{}", key, dir_name);
                        while entries.peek().is_some_and(|(k, _)| k.starts_with(&dir_key)) {
                            entries.next();
                        }
                    }
                }
            }
        }
    }

    /// Appends the access paths under which `source_file` is exposed,
    /// restricted to the matching languages.
    pub fn collect_resource_files_for_source_file(
        &self,
        source_file: &FilePath,
        results: &mut Vec<String>,
        locale: Option<&Locale>,
    ) {
        let Some(resources) = self.files.get(source_file) else {
            return;
        };
        let languages = self.lookup_languages(locale);
        for resource in resources {
            for language in &languages {
                if resource.starts_with(language.as_str()) && !results.contains(resource) {
                    results.push(resource.clone());
                }
            }
        }
    }

    /// Finds the access paths sharing the longest `/`-aligned suffix with a
    /// path, given that path reversed with a trailing `/` (so `/a/b.png` is
    /// queried as `gnp.b/a/`). Each segment costs one lower-bound lookup in
    /// the sorted reverse index; all entries tied at the deepest match are
    /// returned.
    pub fn longest_reverse_matches(&self, reversed_path: &str) -> MatchResult {
        let mut result = MatchResult::default();
        let bytes = reversed_path.as_bytes();
        if bytes.len() == 1 {
            return result;
        }

        let mut last_match: Option<&String> = None;
        let mut matched_until = 0;
        let mut i = 1;
        while i < bytes.len() {
            let j = bytes[i..]
                .iter()
                .position(|&b| b == b'/')
                .map(|p| p + i)
                .unwrap_or(bytes.len() - 1);
            let prefix = &reversed_path[..=j];
            match self.reverse_resources.range(prefix.to_string()..).next() {
                Some((key, _)) if key.starts_with(prefix) => {
                    result.match_depth += 1;
                    matched_until = j + 1;
                    last_match = Some(key);
                }
                _ => break,
            }
            i = j + 1;
        }

        let Some(start) = last_match else {
            return result;
        };
        let matched = &reversed_path[..matched_until];
        for (key, files) in self.reverse_resources.range(start.clone()..) {
            if !key.starts_with(matched) {
                break;
            }
            result.reversed_paths.push(key.clone());
            result.source_files.extend(files.iter().cloned());
        }
        result
    }

    /// The access path and files behind one key of
    /// [`MatchResult::reversed_paths`]. Keys of language groups were given a
    /// trailing `/` when reversed, which is dropped again here.
    pub fn reverse_entry(&self, reversed_key: &str) -> Option<(String, &[FilePath])> {
        let files = self.reverse_resources.get(reversed_key)?;
        let unreversed: String = reversed_key.chars().rev().collect();
        let access = if self.resources.contains_key(&unreversed) {
            unreversed
        } else {
            match unreversed.strip_prefix('/') {
                Some(stripped) if self.resources.contains_key(stripped) => stripped.to_string(),
                _ => unreversed,
            }
        };
        Some((access, files.as_slice()))
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[QrcError] {
        &self.errors
    }

    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(|e| e.to_string()).collect()
    }

    /// Languages declared across all `<qresource>` groups; `""` is the default.
    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    /// Every access key with its files, in key order.
    pub fn resources(&self) -> impl Iterator<Item = (&str, &[FilePath])> {
        self.resources.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    fn lookup_languages(&self, locale: Option<&Locale>) -> Vec<String> {
        match locale {
            Some(locale) => locale.lookup_languages(),
            None => self.languages.clone(),
        }
    }
}

fn child_elements<'a, 'input>(
    node: Node<'a, 'input>,
    name: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children()
        .filter(move |child| child.is_element() && child.tag_name().name() == name)
}

fn element_text(node: Node<'_, '_>) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFs;
    use crate::qrc::normalize::normalized_qrc_file_path;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const LOGO_QRC: &str = r#"<RCC>
    <qresource prefix="/images">
        <file alias="logo.png">real/logo_v2.png</file>
        <file>icons/open.png</file>
        <file>icons/save.png</file>
        <file>icons/small/x.png</file>
    </qresource>
</RCC>"#;

    const LOCALIZED_QRC: &str = r#"<RCC>
    <qresource lang="fr">
        <file>images/a.png</file>
    </qresource>
    <qresource>
        <file alias="images/a.png">default/a.png</file>
    </qresource>
</RCC>"#;

    fn parse(contents: &str) -> QrcParser {
        let mut parser = QrcParser::new();
        assert!(parser.parse_file(&"/proj/res/app.qrc".into(), contents));
        parser
    }

    #[test]
    fn test_alias_round_trip() {
        let parser = parse(LOGO_QRC);
        let real = FilePath::from("/proj/res/real/logo_v2.png");

        assert_eq!(parser.first_file_at_path("/images/logo.png", &Locale::default()), real);

        let mut names = Vec::new();
        parser.collect_resource_files_for_source_file(&real, &mut names, Some(&Locale::default()));
        assert_eq!(names, vec!["/images/logo.png"]);
    }

    #[test]
    fn test_locale_fallback_chain() {
        let parser = parse(LOCALIZED_QRC);
        assert_eq!(parser.languages(), &["fr".to_string(), String::new()]);

        let french = parser.first_file_at_path("/images/a.png", &Locale::new(["fr-CA"]));
        assert_eq!(french, FilePath::from("/proj/res/images/a.png"));

        let german = parser.first_file_at_path("/images/a.png", &Locale::new(["de-DE"]));
        assert_eq!(german, FilePath::from("/proj/res/default/a.png"));
    }

    #[test]
    fn test_collect_files_at_path_all_languages() {
        let parser = parse(LOCALIZED_QRC);
        let mut files = Vec::new();
        parser.collect_files_at_path("/images/a.png", &mut files, None);
        assert_eq!(
            files,
            vec![
                FilePath::from("/proj/res/images/a.png"),
                FilePath::from("/proj/res/default/a.png"),
            ]
        );
    }

    #[test]
    fn test_missing_path_is_empty() {
        let parser = parse(LOGO_QRC);
        assert!(parser.first_file_at_path("/images/nope.png", &Locale::default()).is_empty());
    }

    #[test]
    fn test_has_dir_at_path() {
        let parser = parse(LOGO_QRC);
        assert!(parser.has_dir_at_path("/images/", None));
        assert!(parser.has_dir_at_path("/images/icons/", Some(&Locale::default())));
        assert!(!parser.has_dir_at_path("/img/", None));
        assert!(!parser.has_dir_at_path("/images/logo.png/", None));
    }

    #[test]
    fn test_collect_files_in_path() {
        let parser = parse(LOGO_QRC);

        let mut listing = BTreeMap::new();
        parser.collect_files_in_path("/images/icons/", &mut listing, true, None);
        let keys: Vec<_> = listing.keys().cloned().collect();
        assert_eq!(keys, vec!["open.png", "save.png", "small/"]);
        assert!(listing["small/"].is_empty());
        assert_eq!(listing["open.png"], vec![FilePath::from("/proj/res/icons/open.png")]);

        let mut files_only = BTreeMap::new();
        parser.collect_files_in_path("/images/", &mut files_only, false, None);
        let keys: Vec<_> = files_only.keys().cloned().collect();
        assert_eq!(keys, vec!["logo.png"]);
    }

    #[test]
    fn test_duplicate_entries_across_manifests() {
        let mut parser = QrcParser::new();
        let desktop = r#"<RCC><qresource prefix="/"><file>main.qml</file></qresource></RCC>"#;
        assert!(parser.parse_file(&"/p/desktop/app.qrc".into(), desktop));
        assert!(parser.parse_file(&"/p/mobile/app.qrc".into(), desktop));
        assert!(parser.parse_file(&"/p/mobile/app.qrc".into(), desktop));

        let mut files = Vec::new();
        parser.collect_files_at_path("/main.qml", &mut files, None);
        assert_eq!(
            files,
            vec![FilePath::from("/p/desktop/main.qml"), FilePath::from("/p/mobile/main.qml")]
        );
        assert_eq!(parser.languages(), &[String::new()]);
    }

    #[test]
    fn test_longest_reverse_matches() {
        let parser = parse(LOGO_QRC);
        // "/other/icons/open.png" reversed, with a trailing separator
        let result = parser.longest_reverse_matches("gnp.nepo/snoci/rehto/");
        // "open.png" and "icons" match, "other" does not
        assert_eq!(result.match_depth, 2);
        assert_eq!(result.reversed_paths, vec!["gnp.nepo/snoci/segami/"]);
        assert_eq!(result.source_files, vec![FilePath::from("/proj/res/icons/open.png")]);
    }

    #[test]
    fn test_reverse_entry_restores_access_paths() {
        let parser = parse(
            r#"<RCC>
                <qresource prefix="/images"><file alias="logo.png">real/logo_v2.png</file></qresource>
                <qresource prefix="/images" lang="fr"><file alias="logo.png">real/logo_fr.png</file></qresource>
            </RCC>"#,
        );
        let result = parser.longest_reverse_matches("gnp.ogol/");
        let entries: Vec<(String, Vec<FilePath>)> = result
            .reversed_paths
            .iter()
            .filter_map(|key| parser.reverse_entry(key))
            .map(|(access, files)| (access, files.to_vec()))
            .collect();
        assert_eq!(
            entries,
            vec![
                ("/images/logo.png".to_string(), vec![FilePath::from("/proj/res/real/logo_v2.png")]),
                ("fr/images/logo.png".to_string(), vec![FilePath::from("/proj/res/real/logo_fr.png")]),
            ]
        );
        assert!(parser.reverse_entry("gnp.gnissim/").is_none());
    }

    #[test]
    fn test_longest_reverse_matches_keeps_ties() {
        let parser = parse(
            r#"<RCC>
                <qresource prefix="/a"><file>x.png</file></qresource>
                <qresource prefix="/b"><file alias="x.png">other/x.png</file></qresource>
            </RCC>"#,
        );
        let result = parser.longest_reverse_matches("gnp.x/z/");
        assert_eq!(result.match_depth, 1);
        assert_eq!(result.reversed_paths.len(), 2);
        assert_eq!(result.source_files.len(), 2);

        assert_eq!(parser.longest_reverse_matches("/").match_depth, 0);
        assert!(parser.longest_reverse_matches("gnp.y/").reversed_paths.is_empty());
    }

    #[test]
    fn test_invalid_xml_records_one_error() {
        let mut parser = QrcParser::new();
        assert!(!parser.parse_file(&"/p/broken.qrc".into(), "<RCC><qresource></RCC>"));
        assert!(!parser.is_valid());
        assert_eq!(parser.error_messages().len(), 1);
        assert!(parser.error_messages()[0].starts_with("XML error on line 1"));

        let mut files = Vec::new();
        parser.collect_files_at_path("/x", &mut files, None);
        assert!(files.is_empty());
    }

    #[test]
    fn test_missing_root_element() {
        let mut parser = QrcParser::new();
        assert!(!parser.parse_file(&"/p/x.qrc".into(), "<qresource/>"));
        assert_eq!(parser.error_messages(), vec!["The <RCC> root element is missing."]);
    }

    #[test]
    fn test_unreadable_file() {
        let mem = MemoryFs::new();
        let parser = QrcParser::parse_qrc_file_with(&mem, &"/p/gone.qrc".into(), "");
        assert!(!parser.is_valid());
        assert_eq!(parser.errors().len(), 1);
        assert!(matches!(parser.errors()[0], QrcError::Read { .. }));
    }

    #[test]
    fn test_empty_path_gives_valid_empty_parser() {
        let parser = QrcParser::parse_qrc_file(&FilePath::new(), "");
        assert!(parser.is_valid());
        assert!(parser.languages().is_empty());
    }

    #[test]
    fn test_parse_from_disk() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(LOGO_QRC.as_bytes()).unwrap();
        file.flush().unwrap();

        let path = FilePath::from_std_path(file.path());
        let parser = QrcParser::parse_qrc_file(&path, "");
        assert!(parser.is_valid());

        let expected = path.parent_dir().resolve_path("icons/save.png");
        let mut files = Vec::new();
        parser.collect_files_at_path(&normalized_qrc_file_path("qrc:/images/icons/save.png"), &mut files, None);
        assert_eq!(files, vec![expected]);
    }
}
