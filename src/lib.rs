//! Maps file references found in logs, stack traces, debugger output and QML
//! errors back to the files of a project checkout.
//!
//! The references usually point somewhere else: a shadow build directory, an
//! application bundle, a device or a Qt resource (`qrc:`) URL.
//! [`ProjectFileFinder`] undoes those copies with a fixed sequence of
//! heuristics, and [`qrc`] indexes the resource manifests it needs for
//! resource URLs.

pub mod cli;
pub mod config;
pub mod error;
pub mod finder;
pub mod fs;
pub mod index_cache;
pub mod inspect;
pub mod locale;
pub mod output;
pub mod parallel_scanner;
pub mod path;
pub mod path_map;
pub mod progress;
pub mod qrc;
pub mod scanner;
pub mod types;
pub mod url;

pub use error::QrcError;
pub use finder::{CacheEntry, FindOutcome, ProjectFileFinder};
pub use fs::{FileSystem, LocalFs, MemoryFs};
pub use locale::Locale;
pub use path::{FilePath, OsType};
pub use path_map::{PathMapTrie, PathMappingNode};
pub use qrc::{QrcCache, QrcParser};
pub use url::FileUrl;
