use clap::Parser;
use homing::cli::{Cli, Command, FindArgs, QrcArgs};
use homing::config::HomingConfig;
use homing::index_cache::IndexCache;
use homing::inspect::inspect_manifest;
use homing::output::{JsonRenderer, TerminalRenderer};
use homing::parallel_scanner::ParallelScanner;
use homing::progress::ScanProgress;
use homing::scanner::Scanner;
use homing::types::{FindReport, Resolution, Totals, Warning};
use homing::{FilePath, FileUrl, Locale, ProjectFileFinder, QrcCache};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match HomingConfig::load(cli.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    let exit_code = match &cli.command {
        Command::Find(args) => run_find(&cli, args, config),
        Command::Qrc(args) => run_qrc(&cli, args),
    };
    std::process::exit(exit_code);
}

/// `HOMING_LOG` wins over `RUST_LOG`; without either, `-v` selects debug.
fn init_logging(verbose: bool) {
    let default_directive = if verbose { "homing=debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("HOMING_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run_find(cli: &Cli, args: &FindArgs, mut config: HomingConfig) -> i32 {
    if let Err(e) = args.apply_to(&mut config) {
        eprintln!("Error: {}", e);
        return 2;
    }

    let project_dir = config.project_dir.clone().unwrap_or_else(|| ".".into());
    let project_dir = match project_dir.canonicalize() {
        Ok(dir) if dir.is_dir() => dir,
        _ => {
            eprintln!("Error: Project directory does not exist: {}", project_dir.display());
            return 2;
        }
    };

    let (files, warnings, from_cache) = enumerate_project(&project_dir, &config, args.progress);
    let project_file_count = files.len() as u64;

    let mut finder = ProjectFileFinder::new();
    finder.set_os_type(config.path_flavor.os_type());
    finder.set_project_directory(FilePath::from_std_path(&project_dir));
    finder.set_project_files(files);
    if let Some(sysroot) = &config.sysroot {
        finder.set_sysroot(FilePath::from_std_path(sysroot));
    }
    finder.set_additional_search_directories(config.search_dirs.iter().map(|d| FilePath::from_std_path(d)).collect());
    for mapping in &config.mappings {
        finder.add_mapped_path(FilePath::from_std_path(&mapping.local), &mapping.remote);
    }

    let resolutions: Vec<Resolution> = args
        .references
        .iter()
        .map(|reference| {
            let url = FileUrl::parse(reference);
            let outcome = finder.find_file(&url);
            let match_length = finder.cached(&url.lookup_path()).map(|entry| entry.match_length);
            Resolution {
                reference: reference.clone(),
                success: outcome.success,
                paths: outcome.paths.iter().map(|p| p.to_string()).collect(),
                match_length: if outcome.success { match_length } else { None },
            }
        })
        .collect();

    let resolved = resolutions.iter().filter(|r| r.success).count() as u64;
    let report = FindReport {
        project_dir: project_dir.display().to_string(),
        flavor: format!("{:?}", finder.os_type()).to_lowercase(),
        totals: Totals {
            project_files: project_file_count,
            resolved,
            unresolved: resolutions.len() as u64 - resolved,
            skipped_paths: warnings.len() as u64,
            from_cache,
        },
        resolutions,
        warnings,
    };

    if let Err(code) = emit(cli, &report, |renderer| renderer.render_find(&report)) {
        return code;
    }

    if report.totals.unresolved == 0 {
        0
    } else {
        1
    }
}

/// Lists the project's files, from the index cache when it is enabled and
/// still current.
fn enumerate_project(project_dir: &Path, config: &HomingConfig, show_progress: bool) -> (Vec<FilePath>, Vec<Warning>, bool) {
    let mut index = if config.cache.enabled {
        match IndexCache::new(config.cache.dir.clone()) {
            Ok(index) => Some(index),
            Err(e) => {
                warn!(error = %e, "index cache unavailable");
                None
            }
        }
    } else {
        None
    };

    if let Some(entry) = index.as_ref().and_then(|index| index.get(project_dir, &config.exclude)) {
        debug!(files = entry.files.len(), "using cached project file list");
        return (entry.files.clone(), Vec::new(), true);
    }

    let progress = ScanProgress::new(show_progress);
    let scan = &config.scan;
    let (stats, files) = if scan.parallel {
        ParallelScanner::new(scan.threads, scan.follow_symlinks, scan.max_depth, config.exclude.clone())
            .scan(project_dir, &progress)
    } else {
        let scanner = Scanner::new(scan.follow_symlinks, scan.max_depth, config.exclude.clone());
        let mut files = Vec::new();
        let stats = scanner.scan(project_dir, |file| {
            if files.len() % 1000 == 999 {
                progress.update(files.len() as u64 + 1, file.as_str());
            }
            files.push(file);
        });
        progress.finish();
        (stats, files)
    };
    debug!(files = stats.file_count, dirs = stats.dir_count, "enumerated project");

    if let Some(index) = index.as_mut() {
        if let Err(e) = index.put(project_dir.to_path_buf(), config.exclude.clone(), files.clone()) {
            warn!(error = %e, "could not store project file list");
        }
    }

    (files, stats.warnings, false)
}

fn run_qrc(cli: &Cli, args: &QrcArgs) -> i32 {
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        return 2;
    }

    let cache = QrcCache::global();
    let query = args.query();
    let locale = (!args.locale.is_empty()).then(|| Locale::new(args.locale.iter().cloned()));

    let manifests: Vec<FilePath> = args
        .manifests
        .iter()
        .map(|m| FilePath::from_std_path(&m.canonicalize().unwrap_or_else(|_| m.clone())))
        .collect();

    let reports: Vec<_> = manifests
        .iter()
        .map(|manifest| {
            let parser = cache.add_path(manifest, "");
            inspect_manifest(manifest, &parser, query.as_ref(), locale.as_ref())
        })
        .collect();
    for manifest in &manifests {
        cache.remove_path(manifest);
    }

    if let Err(code) = emit(cli, &reports, |renderer| renderer.render_manifests(&reports)) {
        return code;
    }

    let all_valid = reports.iter().all(|r| r.valid);
    let answered = query.is_none() || reports.iter().any(|r| !r.matches.is_empty());
    if all_valid && answered {
        0
    } else {
        1
    }
}

fn emit<T, F>(cli: &Cli, value: &T, render_terminal: F) -> Result<(), i32>
where
    T: Serialize + ?Sized,
    F: FnOnce(&TerminalRenderer),
{
    if cli.should_output_json() {
        let renderer = JsonRenderer::new();
        if let Err(e) = renderer.render(value, cli.output.as_deref()) {
            eprintln!("Error writing JSON output: {}", e);
            return Err(3);
        }
    } else {
        let use_color = !cli.no_color && std::io::IsTerminal::is_terminal(&std::io::stdout());
        render_terminal(&TerminalRenderer::new(use_color, cli.verbose));
    }
    Ok(())
}
