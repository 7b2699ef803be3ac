//! Qt resource collection (`.qrc`) manifests: parsing, lookup and a shared
//! cache of parsed manifests.

mod cache;
mod normalize;
mod parser;

pub use cache::QrcCache;
pub use normalize::{
    normalized_qrc_directory_path, normalized_qrc_file_path, qrc_directory_path_for_qrc_file_path,
};
pub use parser::{MatchResult, QrcParser};

/// File extension of resource manifests.
pub const QRC_EXTENSION: &str = ".qrc";
