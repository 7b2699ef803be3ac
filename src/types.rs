use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindReport {
    pub project_dir: String,
    pub flavor: String,
    pub totals: Totals,
    pub resolutions: Vec<Resolution>,
    pub warnings: Vec<Warning>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Totals {
    pub project_files: u64,
    pub resolved: u64,
    pub unresolved: u64,
    pub skipped_paths: u64,
    pub from_cache: bool,
}

/// One looked-up reference and the files it resolved to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    pub reference: String,
    pub success: bool,
    pub paths: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_length: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestReport {
    pub manifest: String,
    pub valid: bool,
    pub errors: Vec<String>,
    pub languages: Vec<String>,
    pub resource_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    pub matches: Vec<ManifestMatch>,
}

/// A resource path and the files backing it. Directory entries end in `/`
/// and carry no files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMatch {
    pub resource: String,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Warning {
    pub path: String,
    pub error: String,
}
