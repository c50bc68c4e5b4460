use std::path::PathBuf;
use thiserror::Error;

use crate::markup::MarkupError;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot open level {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed level markup: {0}")]
    Markup(#[from] MarkupError),
}
