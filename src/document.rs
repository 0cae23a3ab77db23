use crate::config::TextField;
use crate::error::SearchError;
use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use url::Url;

/// A single customer review. Only `rating` is used for ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub rating: f64,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Review {
    pub fn new(rating: f64) -> Self {
        Self {
            rating,
            extra: BTreeMap::new(),
        }
    }
}

/// Product page record, identified by its URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub product_features: BTreeMap<String, String>,
    #[serde(default)]
    pub product_reviews: Vec<Review>,
}

impl Document {
    pub fn new(url: String, title: String, description: String) -> Self {
        Self {
            url,
            title,
            description,
            product_features: BTreeMap::new(),
            product_reviews: Vec::new(),
        }
    }

    pub fn with_feature(mut self, key: &str, value: &str) -> Self {
        self.product_features.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_review(mut self, rating: f64) -> Self {
        self.product_reviews.push(Review::new(rating));
        self
    }

    pub fn field(&self, field: TextField) -> &str {
        match field {
            TextField::Title => &self.title,
            TextField::Description => &self.description,
        }
    }

    /// Product id from `/product/<id>` URLs
    pub fn product_id(&self) -> Option<String> {
        let url = Url::parse(&self.url).ok()?;
        let mut segments = url.path_segments()?;
        match (segments.next(), segments.next()) {
            (Some("product"), Some(id)) if !id.is_empty() => Some(id.to_string()),
            _ => None,
        }
    }

    /// Values of the `variant` query parameter, in URL order
    pub fn variants(&self) -> Vec<String> {
        Url::parse(&self.url)
            .map(|url| {
                url.query_pairs()
                    .filter(|(key, _)| key == "variant")
                    .map(|(_, value)| value.into_owned())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// The fixed, ordered batch of documents indices are built from.
///
/// Order matters: ranking ties are broken by corpus order.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    documents: Vec<Document>,
}

impl Corpus {
    /// Build a corpus, rejecting duplicate URLs
    pub fn new(documents: Vec<Document>) -> Result<Self, SearchError> {
        let mut seen = HashSet::new();
        for doc in &documents {
            if !seen.insert(doc.url.as_str()) {
                return Err(SearchError::DuplicateDocument(doc.url.clone()));
            }
        }
        Ok(Self { documents })
    }

    /// Load a JSONL corpus (gzip-compressed when the file ends in `.gz`).
    ///
    /// Loading is all-or-nothing: any unreadable or malformed line fails the
    /// whole load.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SearchError> {
        let path = path.as_ref();
        let shown = path.display().to_string();
        let file = File::open(path).map_err(|e| SearchError::corpus_load(&shown, e))?;

        let reader: Box<dyn Read> = if path.extension().map_or(false, |ext| ext == "gz") {
            Box::new(GzDecoder::new(file))
        } else {
            Box::new(file)
        };

        let corpus = Self::from_reader(BufReader::new(reader))
            .map_err(|e| SearchError::corpus_load(&shown, e))?;
        tracing::info!(path = %shown, documents = corpus.len(), "loaded corpus");
        Ok(corpus)
    }

    /// Parse JSONL records from any reader; blank lines are skipped
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, SearchError> {
        let mut documents = Vec::new();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| SearchError::malformed(line_no + 1, e))?;
            if line.trim().is_empty() {
                continue;
            }
            let doc: Document =
                serde_json::from_str(&line).map_err(|e| SearchError::malformed(line_no + 1, e))?;
            documents.push(doc);
        }
        Self::new(documents)
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn get(&self, url: &str) -> Option<&Document> {
        self.documents.iter().find(|doc| doc.url == url)
    }

    /// Document ids in corpus order
    pub fn urls(&self) -> Vec<String> {
        self.documents.iter().map(|doc| doc.url.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
