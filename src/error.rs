use crate::path::FilePath;
use std::io;

/// Why a resource manifest could not be indexed.
#[derive(Debug, thiserror::Error)]
pub enum QrcError {
    #[error("Cannot read {path}: {source}")]
    Read {
        path: FilePath,
        #[source]
        source: io::Error,
    },

    #[error("XML error on line {line}, col {column}: {message}")]
    Xml {
        line: u32,
        column: u32,
        message: String,
    },

    #[error("The <RCC> root element is missing.")]
    MissingRoot,
}

impl From<roxmltree::Error> for QrcError {
    fn from(e: roxmltree::Error) -> Self {
        let pos = e.pos();
        QrcError::Xml {
            line: pos.row,
            column: pos.col,
            message: e.to_string(),
        }
    }
}
