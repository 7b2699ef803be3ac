use crate::path::OsType;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure for homing
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HomingConfig {
    /// Root of the project checkout
    #[serde(default)]
    pub project_dir: Option<PathBuf>,

    /// Target system image probed last
    #[serde(default)]
    pub sysroot: Option<PathBuf>,

    /// Extra directories probed after the project
    #[serde(default)]
    pub search_dirs: Vec<PathBuf>,

    /// Explicit remote → local overrides
    #[serde(default)]
    pub mappings: Vec<PathMapping>,

    /// Substrings of paths left out when enumerating the project
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Flavor of the paths being looked up
    #[serde(default)]
    pub path_flavor: PathFlavor,

    #[serde(default)]
    pub scan: ScanConfig,

    #[serde(default)]
    pub cache: CacheConfig,
}

/// A remote path (on a device, in a container) and the local file it stands for.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PathMapping {
    pub local: PathBuf,
    pub remote: String,
}

impl PathMapping {
    /// Parses `LOCAL=REMOTE`.
    pub fn parse(spec: &str) -> Result<Self, ConfigError> {
        let (local, remote) = spec
            .split_once('=')
            .ok_or_else(|| ConfigError::InvalidMapping(spec.to_string()))?;
        let mapping = Self {
            local: PathBuf::from(local.trim()),
            remote: remote.trim().to_string(),
        };
        mapping.validate()?;
        Ok(mapping)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.local.as_os_str().is_empty() || self.remote.is_empty() {
            return Err(ConfigError::InvalidMapping(format!(
                "{}={}",
                self.local.display(),
                self.remote
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PathFlavor {
    #[default]
    Host,
    Linux,
    Mac,
    Windows,
}

impl PathFlavor {
    pub fn os_type(self) -> OsType {
        match self {
            PathFlavor::Host => OsType::host(),
            PathFlavor::Linux => OsType::Linux,
            PathFlavor::Mac => OsType::Mac,
            PathFlavor::Windows => OsType::Windows,
        }
    }
}

/// How the project file list is enumerated
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ScanConfig {
    #[serde(default)]
    pub parallel: bool,

    /// Worker threads for parallel scanning (0 = auto-detect)
    #[serde(default)]
    pub threads: usize,

    #[serde(default)]
    pub follow_symlinks: bool,

    #[serde(default)]
    pub max_depth: Option<usize>,
}

/// Persisted project file lists
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Defaults to the platform cache directory
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl HomingConfig {
    /// Load config from custom path or default XDG location
    pub fn load(custom_path: Option<&PathBuf>) -> Result<Self, ConfigError> {
        let path = if let Some(p) = custom_path {
            p.clone()
        } else {
            match Self::default_config_path() {
                Ok(p) => p,
                Err(_) => return Ok(Self::default()),
            }
        };

        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io(path.clone(), e))?;

        let config: Self = toml::from_str(&contents).map_err(|e| ConfigError::Parse(path.clone(), e))?;
        for mapping in &config.mappings {
            mapping.validate()?;
        }
        Ok(config)
    }

    /// Get default config path: ~/.config/homing/config.toml
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;

        Ok(config_dir.join("homing").join("config.toml"))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read config at {path}: {err}", path = .0.display(), err = .1)]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse config at {path}: {err}", path = .0.display(), err = .1)]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("Invalid path mapping `{0}`, expected LOCAL=REMOTE")]
    InvalidMapping(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = HomingConfig::load(Some(&dir.path().join("absent.toml"))).unwrap();

        assert!(config.project_dir.is_none());
        assert_eq!(config.path_flavor, PathFlavor::Host);
        assert!(!config.cache.enabled);
    }

    #[test]
    fn test_load_full_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
project_dir = "/home/x/app"
sysroot = "/opt/sdk/sysroot"
search_dirs = ["/opt/qt/qml"]
exclude = ["build-"]
path_flavor = "mac"

[[mappings]]
local = "/home/x/app/main.qml"
remote = "/data/local/tmp/main.qml"

[scan]
parallel = true
threads = 4

[cache]
enabled = true
"#,
        )
        .unwrap();

        let config = HomingConfig::load(Some(&path)).unwrap();
        assert_eq!(config.project_dir, Some(PathBuf::from("/home/x/app")));
        assert_eq!(config.search_dirs, vec![PathBuf::from("/opt/qt/qml")]);
        assert_eq!(config.path_flavor.os_type(), OsType::Mac);
        assert_eq!(config.mappings[0].remote, "/data/local/tmp/main.qml");
        assert!(config.scan.parallel);
        assert_eq!(config.scan.threads, 4);
        assert!(config.cache.enabled);
        assert!(config.cache.dir.is_none());
    }

    #[test]
    fn test_parse_error_names_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "search_dirs = 3").unwrap();

        let err = HomingConfig::load(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(..)));
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn test_unreadable_config_is_io_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::create_dir(&path).unwrap();

        let err = HomingConfig::load(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Io(..)));
        let message = err.to_string();
        assert!(message.starts_with("Failed to read config at "));
        assert!(message.contains(&path.display().to_string()));
    }

    #[test]
    fn test_empty_mapping_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[[mappings]]\nlocal = \"/a\"\nremote = \"\"\n").unwrap();

        assert!(matches!(
            HomingConfig::load(Some(&path)),
            Err(ConfigError::InvalidMapping(_))
        ));
    }

    #[test]
    fn test_parse_mapping_spec() {
        let mapping = PathMapping::parse("/home/x/a.qml=/device/a.qml").unwrap();
        assert_eq!(mapping.local, PathBuf::from("/home/x/a.qml"));
        assert_eq!(mapping.remote, "/device/a.qml");

        assert!(PathMapping::parse("/home/x/a.qml").is_err());
        assert!(PathMapping::parse("=/device/a.qml").is_err());
    }
}
