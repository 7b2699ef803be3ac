use crate::config::{ConfigError, HomingConfig, PathFlavor, PathMapping};
use crate::inspect::ManifestQuery;
use crate::path::FilePath;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "homing", version)]
#[command(
    about = "Find the project files behind paths from build trees, app bundles, devices and Qt resources",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Config file (default: ~/.config/homing/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log every lookup step to stderr
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Output JSON to stdout
    #[arg(long, global = true)]
    pub json: bool,

    /// Write JSON output to file
    #[arg(long, global = true, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve file references against a project checkout
    Find(FindArgs),
    /// Inspect and query Qt resource manifests (.qrc)
    Qrc(QrcArgs),
}

#[derive(Args, Debug)]
pub struct FindArgs {
    /// Paths, file:// URLs, qrc: URLs or :/ resource paths
    #[arg(value_name = "REF", required = true)]
    pub references: Vec<String>,

    /// Project directory (defaults to config or current directory)
    #[arg(long, value_name = "DIR")]
    pub project: Option<PathBuf>,

    /// Sysroot probed after everything else
    #[arg(long, value_name = "DIR")]
    pub sysroot: Option<PathBuf>,

    /// Additional search directory (repeatable)
    #[arg(long = "search-dir", value_name = "DIR")]
    pub search_dirs: Vec<PathBuf>,

    /// Map a remote path to a local file (repeatable)
    #[arg(long = "map", value_name = "LOCAL=REMOTE")]
    pub mappings: Vec<String>,

    /// Flavor of the references' paths
    #[arg(long, value_enum, value_name = "FLAVOR")]
    pub flavor: Option<PathFlavor>,

    /// Substrings of paths to leave out of the project file list
    #[arg(long, value_name = "PATTERN")]
    pub exclude: Vec<String>,

    /// Maximum depth when enumerating the project
    #[arg(long, value_name = "N")]
    pub max_depth: Option<usize>,

    /// Follow symbolic links (disabled by default)
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Enumerate the project in parallel
    #[arg(long)]
    pub parallel: bool,

    /// Number of threads for parallel scanning (0 = auto-detect)
    #[arg(long, value_name = "N")]
    pub threads: Option<usize>,

    /// Show progress indicator while enumerating
    #[arg(long)]
    pub progress: bool,

    /// Reuse the project file list from the last run when unchanged
    #[arg(long)]
    pub cached: bool,

    /// Cache directory (default: ~/.cache/homing)
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,
}

impl FindArgs {
    /// Layers the flags over `config`: scalar flags win, lists append.
    pub fn apply_to(&self, config: &mut HomingConfig) -> Result<(), ConfigError> {
        if let Some(project) = &self.project {
            config.project_dir = Some(project.clone());
        }
        if let Some(sysroot) = &self.sysroot {
            config.sysroot = Some(sysroot.clone());
        }
        config.search_dirs.extend(self.search_dirs.iter().cloned());
        for spec in &self.mappings {
            config.mappings.push(PathMapping::parse(spec)?);
        }
        if let Some(flavor) = self.flavor {
            config.path_flavor = flavor;
        }
        config.exclude.extend(self.exclude.iter().cloned());

        if self.max_depth.is_some() {
            config.scan.max_depth = self.max_depth;
        }
        config.scan.follow_symlinks |= self.follow_symlinks;
        config.scan.parallel |= self.parallel;
        if let Some(threads) = self.threads {
            config.scan.threads = threads;
        }

        config.cache.enabled |= self.cached;
        if let Some(dir) = &self.cache_dir {
            config.cache.dir = Some(dir.clone());
        }
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct QrcArgs {
    /// Manifests to load
    #[arg(value_name = "MANIFEST", required = true)]
    pub manifests: Vec<PathBuf>,

    /// List the files at a resource path
    #[arg(long, value_name = "PATH")]
    pub path: Option<String>,

    /// With --path, only the first file for the most specific language
    /// (from --locale, or the environment)
    #[arg(long, requires = "path")]
    pub first: bool,

    /// List a resource directory one level deep
    #[arg(long, value_name = "DIR")]
    pub dir: Option<String>,

    /// With --dir, include sub-directories
    #[arg(long, requires = "dir")]
    pub dirs: bool,

    /// Show the resource paths a real file is exposed under
    #[arg(long, value_name = "FILE")]
    pub source: Option<PathBuf>,

    /// Find the resources sharing the longest path suffix
    #[arg(long, value_name = "PATH")]
    pub suffix: Option<String>,

    /// UI language, most specific first (repeatable; default: all languages)
    #[arg(long, value_name = "TAG")]
    pub locale: Vec<String>,
}

impl QrcArgs {
    pub fn validate(&self) -> Result<(), String> {
        let given = [
            self.path.is_some(),
            self.dir.is_some(),
            self.source.is_some(),
            self.suffix.is_some(),
        ];
        if given.iter().filter(|g| **g).count() > 1 {
            return Err("Only one of --path, --dir, --source and --suffix may be given".to_string());
        }
        Ok(())
    }

    pub fn query(&self) -> Option<ManifestQuery> {
        if let Some(path) = &self.path {
            return Some(ManifestQuery::Files {
                path: path.clone(),
                first: self.first,
            });
        }
        if let Some(path) = &self.dir {
            return Some(ManifestQuery::Directory {
                path: path.clone(),
                include_dirs: self.dirs,
            });
        }
        if let Some(source) = &self.source {
            let source = source.canonicalize().unwrap_or_else(|_| source.clone());
            return Some(ManifestQuery::Source(FilePath::from_std_path(&source)));
        }
        self.suffix.clone().map(ManifestQuery::Suffix)
    }
}

impl Cli {
    pub fn should_output_json(&self) -> bool {
        self.json || self.output.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("homing").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_flags_override_and_lists_append() {
        let cli = parse(&[
            "find",
            "/build/main.qml",
            "--project",
            "/home/x/app",
            "--search-dir",
            "/opt/b",
            "--map",
            "/l/a.qml=/r/a.qml",
            "--flavor",
            "windows",
            "--threads",
            "2",
        ]);
        let Command::Find(args) = cli.command else {
            panic!("expected find");
        };

        let mut config = HomingConfig {
            project_dir: Some(PathBuf::from("/old")),
            search_dirs: vec![PathBuf::from("/opt/a")],
            ..HomingConfig::default()
        };
        args.apply_to(&mut config).unwrap();

        assert_eq!(config.project_dir, Some(PathBuf::from("/home/x/app")));
        assert_eq!(config.search_dirs, vec![PathBuf::from("/opt/a"), PathBuf::from("/opt/b")]);
        assert_eq!(config.mappings.len(), 1);
        assert_eq!(config.path_flavor, PathFlavor::Windows);
        assert_eq!(config.scan.threads, 2);
        assert!(!config.cache.enabled);
    }

    #[test]
    fn test_bad_mapping_flag() {
        let cli = parse(&["find", "x", "--map", "nonsense"]);
        let Command::Find(args) = cli.command else {
            panic!("expected find");
        };
        assert!(args.apply_to(&mut HomingConfig::default()).is_err());
    }

    #[test]
    fn test_qrc_query_selection() {
        let cli = parse(&["qrc", "a.qrc", "--dir", "/images", "--dirs"]);
        let Command::Qrc(args) = cli.command else {
            panic!("expected qrc");
        };
        assert!(args.validate().is_ok());
        assert_eq!(
            args.query(),
            Some(ManifestQuery::Directory {
                path: "/images".to_string(),
                include_dirs: true
            })
        );
    }

    #[test]
    fn test_qrc_conflicting_queries() {
        let cli = parse(&["qrc", "a.qrc", "--path", "/a.png", "--suffix", "a.png"]);
        let Command::Qrc(args) = cli.command else {
            panic!("expected qrc");
        };
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = parse(&["qrc", "a.qrc", "--json", "-v"]);
        assert!(cli.should_output_json());
        assert!(cli.verbose);
    }
}
