use crate::locale::Locale;
use crate::path::FilePath;
use crate::qrc::{normalized_qrc_directory_path, normalized_qrc_file_path, QrcParser};
use crate::types::{ManifestMatch, ManifestReport};
use std::collections::BTreeMap;
use std::fmt;

/// A single question asked of every manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestQuery {
    Files { path: String, first: bool },
    Directory { path: String, include_dirs: bool },
    Source(FilePath),
    Suffix(String),
}

impl fmt::Display for ManifestQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManifestQuery::Files { path, first: false } => write!(f, "files at {}", normalized_qrc_file_path(path)),
            ManifestQuery::Files { path, first: true } => write!(f, "first file at {}", normalized_qrc_file_path(path)),
            ManifestQuery::Directory { path, .. } => write!(f, "listing of {}", normalized_qrc_directory_path(path)),
            ManifestQuery::Source(file) => write!(f, "resource paths of {}", file),
            ManifestQuery::Suffix(suffix) => write!(f, "longest suffix match for {}", suffix),
        }
    }
}

/// Describes `parser` and answers `query` against it.
///
/// With a `locale`, lookups are limited to its languages in fallback order;
/// without one every language the manifest declares is searched, except for
/// `first` lookups which fall back to the environment's locale.
pub fn inspect_manifest(
    manifest: &FilePath,
    parser: &QrcParser,
    query: Option<&ManifestQuery>,
    locale: Option<&Locale>,
) -> ManifestReport {
    let matches = match query {
        Some(query) => answer(parser, query, locale),
        None => Vec::new(),
    };

    ManifestReport {
        manifest: manifest.to_string(),
        valid: parser.is_valid(),
        errors: parser.error_messages(),
        languages: parser.languages().to_vec(),
        resource_count: parser.resources().count(),
        query: query.map(|q| q.to_string()),
        matches,
    }
}

fn answer(parser: &QrcParser, query: &ManifestQuery, locale: Option<&Locale>) -> Vec<ManifestMatch> {
    match query {
        ManifestQuery::Files { path, first } => {
            let resource = normalized_qrc_file_path(path);
            let files = if *first {
                let env_locale;
                let locale = match locale {
                    Some(locale) => locale,
                    None => {
                        env_locale = Locale::from_env();
                        &env_locale
                    }
                };
                let found = parser.first_file_at_path(&resource, locale);
                if found.is_empty() {
                    Vec::new()
                } else {
                    vec![found]
                }
            } else {
                let mut files = Vec::new();
                parser.collect_files_at_path(&resource, &mut files, locale);
                files
            };

            if files.is_empty() {
                return Vec::new();
            }
            vec![ManifestMatch {
                resource,
                files: to_strings(&files),
            }]
        }
        ManifestQuery::Directory { path, include_dirs } => {
            let dir = normalized_qrc_directory_path(path);
            let mut contents = BTreeMap::new();
            parser.collect_files_in_path(&dir, &mut contents, *include_dirs, locale);
            contents
                .into_iter()
                .map(|(name, files)| ManifestMatch {
                    resource: format!("{}{}", dir, name),
                    files: to_strings(&files),
                })
                .collect()
        }
        ManifestQuery::Source(file) => {
            let mut resources = Vec::new();
            parser.collect_resource_files_for_source_file(file, &mut resources, locale);
            resources
                .into_iter()
                .map(|resource| ManifestMatch {
                    resource,
                    files: vec![file.to_string()],
                })
                .collect()
        }
        ManifestQuery::Suffix(suffix) => {
            let reversed: String = normalized_qrc_file_path(suffix).chars().rev().collect();
            let result = parser.longest_reverse_matches(&reversed);
            result
                .reversed_paths
                .iter()
                .filter_map(|key| parser.reverse_entry(key))
                .map(|(resource, files)| ManifestMatch {
                    resource,
                    files: to_strings(files),
                })
                .collect()
        }
    }
}

fn to_strings(files: &[FilePath]) -> Vec<String> {
    files.iter().map(|f| f.to_string()).collect()
}
