use std::path::PathBuf;

use thiserror::Error;

use crate::data::model::DeclaredType;

/// Errors raised while loading, merging, summarising or plotting stamp data.
#[derive(Debug, Error)]
pub enum Error {
    /// The file content does not follow the stamp file layout.
    #[error("format error: {0}")]
    Format(String),

    #[error("missing field '{0}'")]
    MissingField(String),

    /// A container or file does not carry the declared type the caller asked for.
    #[error("data type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("cannot merge {left} with {right}")]
    UnsupportedMerge {
        left: DeclaredType,
        right: DeclaredType,
    },

    #[error("merge of {0} streams is not implemented")]
    MergeNotImplemented(DeclaredType),

    #[error("could not open path {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A style map does not cover every series that is about to be drawn.
    #[error("styles do not cover series: {}", missing.join(", "))]
    StyleKey { missing: Vec<String> },

    #[error("invalid style: {0}")]
    Style(String),

    #[error("invalid sampling: {0}")]
    Sampling(String),

    #[error("render error: {0}")]
    Render(String),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn type_mismatch(
        expected: impl std::fmt::Display,
        found: Option<DeclaredType>,
    ) -> Self {
        Error::TypeMismatch {
            expected: expected.to_string(),
            found: found.map_or_else(|| "<none>".to_string(), |t| t.to_string()),
        }
    }
}
