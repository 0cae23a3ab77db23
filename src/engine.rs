use crate::config::{Feature, TextField, Weights};
use crate::document::Corpus;
use crate::index::{build_indices, IndexSet, IndexStats};
use crate::ranking::{rank_documents, score_components, ScoreComponents, ScoredDocument};
use crate::storage::Storage;
use crate::synonyms::SynonymTable;
use crate::tokenizer::Tokenizer;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Candidate filter applied before ranking
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Rank every document
    #[default]
    Full,
    /// Documents containing at least one query token
    Or,
    /// Documents containing every query token
    And,
}

impl FromStr for SearchMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "full" => Ok(SearchMode::Full),
            "or" => Ok(SearchMode::Or),
            "and" => Ok(SearchMode::And),
            other => anyhow::bail!("unknown search mode '{}': expected full, or, and", other),
        }
    }
}

/// Search options
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub mode: SearchMode,
    pub limit: Option<usize>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            mode: SearchMode::Full,
            limit: Some(5),
        }
    }
}

/// Search result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Ranked documents, truncated to the requested limit
    pub documents: Vec<ScoredDocument>,
    /// Expanded query tokens the ranking used
    pub tokens: Vec<String>,
    pub total_documents: usize,
    /// Documents with a score above 0
    pub matched_documents: usize,
}

impl SearchResult {
    /// A query whose best score is 0 has no results
    pub fn has_results(&self) -> bool {
        self.documents.first().map_or(false, |doc| doc.score > 0.0)
    }
}

/// Read-only query pipeline over a set of indices
pub struct SearchEngine {
    indices: IndexSet,
    synonyms: SynonymTable,
    weights: Weights,
    tokenizer: Tokenizer,
}

impl SearchEngine {
    pub fn new(indices: IndexSet, synonyms: SynonymTable, weights: Weights) -> Self {
        Self {
            indices,
            synonyms,
            weights,
            tokenizer: Tokenizer::new(),
        }
    }

    /// Build indices straight from a corpus (for testing and small catalogs)
    pub fn from_corpus(corpus: &Corpus, synonyms: SynonymTable, weights: Weights) -> Self {
        Self::new(build_indices(corpus), synonyms, weights)
    }

    /// Load indices from an index directory, once
    pub fn open<P: AsRef<Path>>(index_dir: P, synonyms: SynonymTable, weights: Weights) -> Result<Self> {
        let indices = Storage::open(index_dir)?.load()?;
        Ok(Self::new(indices, synonyms, weights))
    }

    pub fn indices(&self) -> &IndexSet {
        &self.indices
    }

    pub fn weights(&self) -> &Weights {
        &self.weights
    }

    /// Processed query tokens followed by their synonyms
    pub fn expand_query(&self, query: &str) -> Vec<String> {
        self.synonyms.expand_query(&self.tokenizer, query)
    }

    /// Whether a token occurs in the document's title, description, brand or origin
    fn contains_token(&self, token: &str, doc_id: &str) -> bool {
        TextField::ALL
            .into_iter()
            .any(|field| self.indices.text(field).contains(token, doc_id))
            || [Feature::Brand, Feature::Origin].into_iter().any(|feature| {
                self.indices
                    .feature(feature)
                    .map_or(false, |index| index.contains(token, doc_id))
            })
    }

    /// Whether at least one query token occurs in the document
    pub fn contains_any(&self, tokens: &[String], doc_id: &str) -> bool {
        tokens.iter().any(|t| self.contains_token(t, doc_id))
    }

    /// Whether every query token occurs in the document
    pub fn contains_all(&self, tokens: &[String], doc_id: &str) -> bool {
        !tokens.is_empty() && tokens.iter().all(|t| self.contains_token(t, doc_id))
    }

    /// Rank every document for the query
    pub fn rank(&self, query: &str) -> Vec<ScoredDocument> {
        rank_documents(&self.expand_query(query), &self.indices, &self.weights)
    }

    /// Score breakdown for every document, in corpus order
    pub fn explain(&self, query: &str) -> Vec<(String, ScoreComponents)> {
        score_components(&self.expand_query(query), &self.indices, &self.weights)
    }

    /// Search for documents
    pub fn search(&self, query: &str, options: &SearchOptions) -> SearchResult {
        let tokens = self.expand_query(query);
        let ranked = rank_documents(&tokens, &self.indices, &self.weights);

        let matched_documents = ranked.iter().filter(|doc| doc.score > 0.0).count();

        let filtered: Vec<ScoredDocument> = match options.mode {
            SearchMode::Full => ranked,
            SearchMode::Or => ranked
                .into_iter()
                .filter(|doc| self.contains_any(&tokens, &doc.doc_id))
                .collect(),
            SearchMode::And => ranked
                .into_iter()
                .filter(|doc| self.contains_all(&tokens, &doc.doc_id))
                .collect(),
        };

        let documents = match options.limit {
            Some(limit) => filtered.into_iter().take(limit).collect(),
            None => filtered,
        };

        tracing::debug!(
            query,
            tokens = ?tokens,
            matched = matched_documents,
            returned = documents.len(),
            "search complete"
        );

        SearchResult {
            documents,
            tokens,
            total_documents: self.indices.total_documents(),
            matched_documents,
        }
    }

    /// Get index statistics
    pub fn stats(&self) -> IndexStats {
        self.indices.stats()
    }
}

/// One-shot search over already-built indices
pub fn search(
    query: &str,
    indices: &IndexSet,
    synonyms: &SynonymTable,
    weights: &Weights,
    top_k: usize,
) -> SearchResult {
    let tokens = synonyms.expand_query(&Tokenizer::new(), query);
    let ranked = rank_documents(&tokens, indices, weights);
    let matched_documents = ranked.iter().filter(|doc| doc.score > 0.0).count();

    SearchResult {
        documents: ranked.into_iter().take(top_k).collect(),
        tokens,
        total_documents: indices.total_documents(),
        matched_documents,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use std::collections::BTreeMap;

    fn corpus() -> Corpus {
        Corpus::new(vec![
            Document::new(
                "https://shop.test/product/1".into(),
                "Leather Sneakers".into(),
                "Classic white leather sneakers".into(),
            )
            .with_feature("brand", "MagicSteps")
            .with_feature("made in", "Italy")
            .with_review(5.0),
            Document::new(
                "https://shop.test/product/2".into(),
                "Box of Chocolate".into(),
                "Dark chocolate candy box".into(),
            )
            .with_feature("brand", "ChocoDelight")
            .with_feature("made in", "Belgium"),
            Document::new(
                "https://shop.test/product/3".into(),
                "Kids Sneakers".into(),
                "Bright sneakers for kids".into(),
            )
            .with_feature("made in", "USA"),
        ])
        .unwrap()
    }

    fn synonyms() -> SynonymTable {
        let mut groups = BTreeMap::new();
        groups.insert("usa".to_string(), vec!["america".to_string()]);
        SynonymTable::new(groups)
    }

    fn engine() -> SearchEngine {
        SearchEngine::from_corpus(&corpus(), synonyms(), Weights::default())
    }

    #[test]
    fn test_engine_search_reports_counts() {
        let result = engine().search("leather sneakers", &SearchOptions::default());

        assert_eq!(result.total_documents, 3);
        assert_eq!(result.matched_documents, 2);
        assert_eq!(result.documents[0].doc_id, "https://shop.test/product/1");
        assert!(result.has_results());
    }

    #[test]
    fn test_limit_truncates() {
        let options = SearchOptions {
            limit: Some(1),
            ..SearchOptions::default()
        };
        let result = engine().search("sneakers", &options);
        assert_eq!(result.documents.len(), 1);
        assert_eq!(result.matched_documents, 2);
    }

    #[test]
    fn test_no_results_when_top_score_zero() {
        let result = engine().search("umbrella", &SearchOptions::default());
        assert!(!result.has_results());
        assert_eq!(result.matched_documents, 0);
        assert_eq!(result.documents.len(), 3);
    }

    #[test]
    fn test_synonym_reaches_feature_index() {
        let engine = engine();
        assert_eq!(engine.expand_query("America"), vec!["america", "usa"]);

        let result = engine.search("america", &SearchOptions::default());
        assert_eq!(result.documents[0].doc_id, "https://shop.test/product/3");
        assert!(result.has_results());
    }

    #[test]
    fn test_and_or_modes() {
        let engine = engine();
        let or = SearchOptions {
            mode: SearchMode::Or,
            limit: None,
        };
        let and = SearchOptions {
            mode: SearchMode::And,
            limit: None,
        };

        let result = engine.search("leather kids", &or);
        assert_eq!(result.documents.len(), 2);

        let result = engine.search("leather kids", &and);
        assert!(result.documents.is_empty());

        let result = engine.search("chocodelight chocolate", &and);
        assert_eq!(result.documents.len(), 1);
        assert_eq!(result.documents[0].doc_id, "https://shop.test/product/2");
    }

    #[test]
    fn test_and_mode_checks_description() {
        let and = SearchOptions {
            mode: SearchMode::And,
            limit: None,
        };
        let result = engine().search("bright kids", &and);

        let ids: Vec<&str> = result.documents.iter().map(|d| d.doc_id.as_str()).collect();
        assert_eq!(ids, vec!["https://shop.test/product/3"]);
    }

    #[test]
    fn test_search_mode_parse() {
        assert_eq!("AND".parse::<SearchMode>().unwrap(), SearchMode::And);
        assert_eq!("full".parse::<SearchMode>().unwrap(), SearchMode::Full);
        assert!("xor".parse::<SearchMode>().is_err());
    }

    #[test]
    fn test_free_search_matches_engine() {
        let engine = engine();
        let free = search("sneakers", engine.indices(), &synonyms(), &Weights::default(), 5);
        let ranked = engine.rank("sneakers");
        assert_eq!(free.documents, ranked);
    }

    #[test]
    fn test_explain_combines_to_score() {
        let engine = engine();
        let weights = *engine.weights();
        let ranked = engine.rank("leather");
        for (doc_id, components) in engine.explain("leather") {
            let scored = ranked.iter().find(|d| d.doc_id == doc_id).unwrap();
            assert_eq!(components.combine(&weights), scored.score);
        }
    }
}
