// Re-export main components
pub mod api;
pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod index;
pub mod ranking;
pub mod storage;
pub mod synonyms;
pub mod tokenizer;

// Re-export commonly used types
pub use config::{Bm25Params, Feature, TextField, Weights};
pub use document::{Corpus, Document, Review};
pub use engine::{search, SearchEngine, SearchMode, SearchOptions, SearchResult};
pub use error::SearchError;
pub use index::{
    build_feature_index, build_indices, build_positional_index, build_review_index, FeatureIndex,
    IndexSet, PositionalIndex, Posting, ReviewStats,
};
pub use ranking::{phrase_match, rank_documents, review_boost, ScoredDocument, BM25};
pub use storage::Storage;
pub use synonyms::SynonymTable;
pub use tokenizer::{process, Tokenizer};

// Re-export error types
pub use anyhow::{Error, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
