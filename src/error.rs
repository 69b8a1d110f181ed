use thiserror::Error;

/// Errors surfaced by the prompt store and the components layered on it.
#[derive(Error, Debug)]
pub enum Error {
    /// The underlying key-value store could not be read or written.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// An import payload was not parseable JSON.
    #[error("Invalid JSON document: {0}")]
    InvalidDocument(#[source] serde_json::Error),

    /// An import payload parsed, but has none of the accepted shapes.
    #[error(r#"Invalid file format: expected {{"prompts":[...]}}, {{"data":[...]}} or an array"#)]
    InvalidFormat,

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// A prompt was rejected before persisting (empty label or template).
    #[error("Invalid prompt: {0}")]
    InvalidPrompt(String),
}

impl Error {
    pub(crate) fn store(context: impl std::fmt::Display, err: impl std::fmt::Display) -> Self {
        Error::StoreUnavailable(format!("{}: {}", context, err))
    }

    pub(crate) fn prompt_not_found(id: &str) -> Self {
        Error::NotFound { kind: "Prompt", id: id.to_string() }
    }

    pub(crate) fn backup_not_found(id: &str) -> Self {
        Error::NotFound { kind: "Backup", id: id.to_string() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
