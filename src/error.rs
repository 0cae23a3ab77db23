use thiserror::Error;

/// Errors raised while loading a corpus or building indices over it.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Text field name is not one of `title` / `description`
    #[error("invalid field '{0}': expected one of title, description")]
    InvalidField(String),

    /// Feature name is not one of the configured categorical features
    #[error("invalid feature '{0}': expected one of brand, origin, colors, flavors")]
    InvalidFeature(String),

    /// Corpus file missing, unreadable or malformed
    #[error("failed to load corpus from {path}: {reason}")]
    CorpusLoad { path: String, reason: String },

    /// A corpus line that is not a valid document record
    #[error("line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    /// Two corpus records share the same URL
    #[error("duplicate document '{0}' in corpus")]
    DuplicateDocument(String),
}

impl SearchError {
    pub(crate) fn corpus_load(path: impl Into<String>, reason: impl ToString) -> Self {
        Self::CorpusLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn malformed(line: usize, reason: impl ToString) -> Self {
        Self::MalformedRecord {
            line,
            reason: reason.to_string(),
        }
    }
}
