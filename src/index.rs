use crate::config::{Feature, TextField};
use crate::document::Corpus;
use crate::error::SearchError;
use crate::tokenizer::Tokenizer;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// One document's entry under a token: every position the token occupies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub url: String,
    pub positions: Vec<usize>,
}

/// Read access to a field's postings, as needed by BM25.
pub trait FieldIndex {
    /// `(document id, term frequency)` for every document holding `token`
    fn term_postings(&self, token: &str) -> Vec<(&str, usize)>;

    /// Length of the field in `doc_id`, or `None` when the document does not
    /// take part in this field at all
    fn field_length(&self, doc_id: &str) -> Option<usize>;
}

/// Positional inverted index over one text field: token -> postings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, Vec<Posting>>", into = "BTreeMap<String, Vec<Posting>>")]
pub struct PositionalIndex {
    postings: BTreeMap<String, Vec<Posting>>,
    doc_lengths: HashMap<String, usize>,
}

impl PositionalIndex {
    /// Build from raw postings, recomputing per-document field lengths
    pub fn from_postings(postings: BTreeMap<String, Vec<Posting>>) -> Self {
        let mut doc_lengths: HashMap<String, usize> = HashMap::new();
        for posting in postings.values().flatten() {
            *doc_lengths.entry(posting.url.clone()).or_insert(0) += posting.positions.len();
        }
        Self {
            postings,
            doc_lengths,
        }
    }

    pub fn get(&self, token: &str) -> Option<&Vec<Posting>> {
        self.postings.get(token)
    }

    /// Positions of `token` in `doc_id`; empty when absent
    pub fn positions(&self, token: &str, doc_id: &str) -> &[usize] {
        self.postings
            .get(token)
            .and_then(|list| list.iter().find(|p| p.url == doc_id))
            .map(|p| p.positions.as_slice())
            .unwrap_or(&[])
    }

    pub fn contains(&self, token: &str, doc_id: &str) -> bool {
        !self.positions(token, doc_id).is_empty()
    }

    /// Number of documents containing a token
    pub fn doc_frequency(&self, token: &str) -> usize {
        self.postings.get(token).map(|list| list.len()).unwrap_or(0)
    }

    pub fn doc_length(&self, doc_id: &str) -> usize {
        self.doc_lengths.get(doc_id).copied().unwrap_or(0)
    }

    /// Entries in ascending token order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<Posting>)> {
        self.postings.iter()
    }

    pub fn len(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }
}

impl From<BTreeMap<String, Vec<Posting>>> for PositionalIndex {
    fn from(postings: BTreeMap<String, Vec<Posting>>) -> Self {
        Self::from_postings(postings)
    }
}

impl From<PositionalIndex> for BTreeMap<String, Vec<Posting>> {
    fn from(index: PositionalIndex) -> Self {
        index.postings
    }
}

impl FieldIndex for PositionalIndex {
    fn term_postings(&self, token: &str) -> Vec<(&str, usize)> {
        self.postings
            .get(token)
            .map(|list| {
                list.iter()
                    .map(|p| (p.url.as_str(), p.positions.len()))
                    .collect()
            })
            .unwrap_or_default()
    }

    // Every document takes part; an empty field has length 0
    fn field_length(&self, doc_id: &str) -> Option<usize> {
        Some(self.doc_length(doc_id))
    }
}

/// Categorical feature index: lowercased value -> document ids
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, Vec<String>>", into = "BTreeMap<String, Vec<String>>")]
pub struct FeatureIndex {
    values: BTreeMap<String, Vec<String>>,
    holders: HashSet<String>,
}

impl FeatureIndex {
    pub fn from_values(values: BTreeMap<String, Vec<String>>) -> Self {
        let holders = values.values().flatten().cloned().collect();
        Self { values, holders }
    }

    pub fn get(&self, value: &str) -> Option<&Vec<String>> {
        self.values.get(value)
    }

    pub fn contains(&self, value: &str, doc_id: &str) -> bool {
        self.values
            .get(value)
            .map_or(false, |ids| ids.iter().any(|id| id == doc_id))
    }

    /// Whether the document carries this feature at all
    pub fn has_feature(&self, doc_id: &str) -> bool {
        self.holders.contains(doc_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<BTreeMap<String, Vec<String>>> for FeatureIndex {
    fn from(values: BTreeMap<String, Vec<String>>) -> Self {
        Self::from_values(values)
    }
}

impl From<FeatureIndex> for BTreeMap<String, Vec<String>> {
    fn from(index: FeatureIndex) -> Self {
        index.values
    }
}

impl FieldIndex for FeatureIndex {
    fn term_postings(&self, token: &str) -> Vec<(&str, usize)> {
        self.values
            .get(token)
            .map(|ids| ids.iter().map(|id| (id.as_str(), 1)).collect())
            .unwrap_or_default()
    }

    fn field_length(&self, doc_id: &str) -> Option<usize> {
        self.has_feature(doc_id).then_some(1)
    }
}

/// Review statistics for one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewStats {
    pub total_reviews: usize,
    pub mean_marks: Option<f64>,
    pub last_rating: Option<f64>,
}

pub type ReviewIndex = BTreeMap<String, ReviewStats>;

/// Every index built from one corpus
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexSet {
    /// Document ids in corpus order
    pub documents: Vec<String>,
    pub title: PositionalIndex,
    pub description: PositionalIndex,
    pub features: BTreeMap<Feature, FeatureIndex>,
    pub reviews: ReviewIndex,
}

impl IndexSet {
    pub fn text(&self, field: TextField) -> &PositionalIndex {
        match field {
            TextField::Title => &self.title,
            TextField::Description => &self.description,
        }
    }

    pub fn feature(&self, feature: Feature) -> Option<&FeatureIndex> {
        self.features.get(&feature)
    }

    pub fn total_documents(&self) -> usize {
        self.documents.len()
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            total_documents: self.documents.len(),
            title_tokens: self.title.len(),
            description_tokens: self.description.len(),
            feature_values: self
                .features
                .iter()
                .map(|(feature, index)| (feature.to_string(), index.len()))
                .collect(),
            reviewed_documents: self
                .reviews
                .values()
                .filter(|stats| stats.total_reviews > 0)
                .count(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    pub total_documents: usize,
    pub title_tokens: usize,
    pub description_tokens: usize,
    pub feature_values: BTreeMap<String, usize>,
    pub reviewed_documents: usize,
}

/// Build the positional index of a text field (`title` or `description`)
pub fn build_positional_index(corpus: &Corpus, field: &str) -> Result<PositionalIndex, SearchError> {
    let field: TextField = field.parse()?;
    Ok(build_text_index(corpus, field))
}

pub fn build_text_index(corpus: &Corpus, field: TextField) -> PositionalIndex {
    let tokenizer = Tokenizer::new();
    let mut postings: BTreeMap<String, Vec<Posting>> = BTreeMap::new();

    for doc in corpus.documents() {
        for (token, positions) in tokenizer.positions(doc.field(field)) {
            postings.entry(token).or_default().push(Posting {
                url: doc.url.clone(),
                positions,
            });
        }
    }

    tracing::debug!(field = %field, tokens = postings.len(), "built positional index");
    PositionalIndex::from_postings(postings)
}

/// Build the index of a categorical feature (`brand`, `origin`, `colors`, `flavors`)
pub fn build_feature_index(corpus: &Corpus, feature: &str) -> Result<FeatureIndex, SearchError> {
    let feature: Feature = feature.parse()?;
    Ok(build_categorical_index(corpus, feature))
}

pub fn build_categorical_index(corpus: &Corpus, feature: Feature) -> FeatureIndex {
    let key = feature.physical_key();
    let mut values: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for doc in corpus.documents() {
        if let Some(value) = doc.product_features.get(key) {
            values
                .entry(value.to_lowercase())
                .or_default()
                .push(doc.url.clone());
        }
    }

    tracing::debug!(feature = %feature, values = values.len(), "built feature index");
    FeatureIndex::from_values(values)
}

/// Count, mean and last rating of each document's reviews
pub fn build_review_index(corpus: &Corpus) -> ReviewIndex {
    corpus
        .documents()
        .iter()
        .map(|doc| {
            let ratings: Vec<f64> = doc.product_reviews.iter().map(|r| r.rating).collect();
            let stats = if ratings.is_empty() {
                ReviewStats {
                    total_reviews: 0,
                    mean_marks: None,
                    last_rating: None,
                }
            } else {
                ReviewStats {
                    total_reviews: ratings.len(),
                    mean_marks: Some(ratings.iter().sum::<f64>() / ratings.len() as f64),
                    last_rating: ratings.last().copied(),
                }
            };
            (doc.url.clone(), stats)
        })
        .collect()
}

/// Build every index over the corpus
pub fn build_indices(corpus: &Corpus) -> IndexSet {
    tracing::info!(documents = corpus.len(), "building indices");

    let indices = IndexSet {
        documents: corpus.urls(),
        title: build_text_index(corpus, TextField::Title),
        description: build_text_index(corpus, TextField::Description),
        features: Feature::ALL
            .into_iter()
            .map(|feature| (feature, build_categorical_index(corpus, feature)))
            .collect(),
        reviews: build_review_index(corpus),
    };

    tracing::info!(
        title_tokens = indices.title.len(),
        description_tokens = indices.description.len(),
        "indices built"
    );
    indices
}
