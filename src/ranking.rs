use crate::config::{Bm25Params, Feature, Weights};
use crate::index::{FeatureIndex, FieldIndex, IndexSet, PositionalIndex, ReviewStats};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// BM25 scorer over a single field
#[derive(Debug, Clone, Copy, Default)]
pub struct BM25 {
    params: Bm25Params,
}

impl BM25 {
    pub fn new(k1: f64, b: f64) -> Self {
        Self {
            params: Bm25Params { k1, b },
        }
    }

    /// Saturated, length-normalized contribution of one query token
    pub fn term_score(&self, idf: f64, tf: f64, doc_length: f64, avg_doc_length: f64) -> f64 {
        let Bm25Params { k1, b } = self.params;
        idf * (tf * (k1 + 1.0)) / (tf + k1 * (1.0 - b + b * doc_length / avg_doc_length))
    }

    /// Score every document of `documents` against the query tokens.
    ///
    /// Every document starts at 0. Tokens absent from the field contribute
    /// nothing, and a repeated token is counted each time it appears.
    pub fn score_field<F: FieldIndex + ?Sized>(
        &self,
        query_tokens: &[String],
        field: &F,
        documents: &[String],
    ) -> HashMap<String, f64> {
        let total_docs = documents.len();
        if total_docs == 0 {
            return HashMap::new();
        }

        let lengths: Vec<usize> = documents
            .iter()
            .filter_map(|doc| field.field_length(doc))
            .collect();
        let avg_doc_length = if lengths.is_empty() {
            0.0
        } else {
            lengths.iter().sum::<usize>() as f64 / lengths.len() as f64
        };

        let mut scores: HashMap<String, f64> =
            documents.iter().map(|doc| (doc.clone(), 0.0)).collect();
        if avg_doc_length == 0.0 {
            return scores;
        }

        for token in query_tokens {
            let postings = field.term_postings(token);
            let doc_freq = postings.len();
            if doc_freq == 0 {
                continue;
            }
            let idf = (total_docs as f64 / doc_freq as f64).ln();

            for (doc_id, tf) in postings {
                if tf == 0 {
                    continue;
                }
                let Some(doc_length) = field.field_length(doc_id) else {
                    continue;
                };
                if let Some(score) = scores.get_mut(doc_id) {
                    *score += self.term_score(idf, tf as f64, doc_length as f64, avg_doc_length);
                }
            }
        }

        scores
    }
}

/// Whether `positions[i]` contains `p + i` for some start `p` and every `i`
pub fn positions_successive(positions: &[&[usize]]) -> bool {
    let Some(first) = positions.first() else {
        return false;
    };
    if positions.iter().any(|list| list.is_empty()) {
        return false;
    }

    first.iter().any(|&start| {
        positions
            .iter()
            .enumerate()
            .skip(1)
            .all(|(i, list)| list.binary_search(&(start + i)).is_ok())
    })
}

/// 1 for documents whose field holds the query tokens contiguously and in
/// order, 0 otherwise. The token sequence is checked as given, synonym
/// expansions included.
pub fn phrase_match(
    query_tokens: &[String],
    field: &PositionalIndex,
    documents: &[String],
) -> HashMap<String, u8> {
    // token -> doc -> positions
    let lookups: Vec<HashMap<&str, &[usize]>> = query_tokens
        .iter()
        .map(|token| {
            field
                .get(token)
                .map(|postings| {
                    postings
                        .iter()
                        .map(|p| (p.url.as_str(), p.positions.as_slice()))
                        .collect()
                })
                .unwrap_or_default()
        })
        .collect();

    documents
        .iter()
        .map(|doc| {
            let positions: Vec<&[usize]> = lookups
                .iter()
                .map(|lookup| lookup.get(doc.as_str()).copied().unwrap_or(&[]))
                .collect();
            (doc.clone(), u8::from(positions_successive(&positions)))
        })
        .collect()
}

/// Multiplicative popularity boost. Documents without reviews get exactly 1.0.
pub fn review_boost(stats: Option<&ReviewStats>, weights: &Weights) -> f64 {
    match stats {
        Some(ReviewStats {
            total_reviews,
            mean_marks: Some(mean),
            ..
        }) if *total_reviews > 0 => {
            let mark_factor = 1.0 + (mean / 5.0) * weights.avg_mark;
            let count_factor = 1.0 + ((*total_reviews + 1) as f64).log10() * weights.count_mark;
            mark_factor * count_factor
        }
        _ => 1.0,
    }
}

/// Ranked search result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub doc_id: String,
    pub score: f64,
}

impl ScoredDocument {
    pub fn new(doc_id: String, score: f64) -> Self {
        Self { doc_id, score }
    }
}

/// Per-document breakdown of the linear score
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponents {
    pub title: f64,
    pub description: f64,
    pub brand: f64,
    pub origin: f64,
    pub proximity: u8,
    pub boost: f64,
}

impl ScoreComponents {
    pub fn combine(&self, weights: &Weights) -> f64 {
        (self.title * weights.title
            + self.description * weights.description
            + (self.brand + self.origin) * weights.features
            + f64::from(self.proximity) * weights.proximity)
            * self.boost
    }
}

/// Compute the score components of every document, in corpus order
pub fn score_components(
    query_tokens: &[String],
    indices: &IndexSet,
    weights: &Weights,
) -> Vec<(String, ScoreComponents)> {
    let bm25 = BM25::default();
    let documents = &indices.documents;
    let empty = FeatureIndex::default();

    let title = bm25.score_field(query_tokens, &indices.title, documents);
    let description = bm25.score_field(query_tokens, &indices.description, documents);
    let brand = bm25.score_field(
        query_tokens,
        indices.feature(Feature::Brand).unwrap_or(&empty),
        documents,
    );
    let origin = bm25.score_field(
        query_tokens,
        indices.feature(Feature::Origin).unwrap_or(&empty),
        documents,
    );
    let proximity = phrase_match(query_tokens, &indices.title, documents);

    documents
        .iter()
        .map(|doc| {
            let components = ScoreComponents {
                title: title.get(doc).copied().unwrap_or(0.0),
                description: description.get(doc).copied().unwrap_or(0.0),
                brand: brand.get(doc).copied().unwrap_or(0.0),
                origin: origin.get(doc).copied().unwrap_or(0.0),
                proximity: proximity.get(doc).copied().unwrap_or(0),
                boost: review_boost(indices.reviews.get(doc), weights),
            };
            (doc.clone(), components)
        })
        .collect()
}

/// Rank every document, best first. Ties keep corpus order.
pub fn rank_documents(
    query_tokens: &[String],
    indices: &IndexSet,
    weights: &Weights,
) -> Vec<ScoredDocument> {
    let scored_docs = score_components(query_tokens, indices, weights)
        .into_iter()
        .map(|(doc_id, components)| ScoredDocument::new(doc_id, components.combine(weights)))
        .collect();
    sort_stable(scored_docs)
}

/// Sort by score descending; `sort_by` is stable so equal scores keep input order
pub fn sort_stable(mut scored_docs: Vec<ScoredDocument>) -> Vec<ScoredDocument> {
    scored_docs.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored_docs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TextField;
    use crate::document::{Corpus, Document};
    use crate::index::{build_indices, build_text_index};
    use crate::synonyms::SynonymTable;
    use crate::tokenizer::Tokenizer;
    use std::collections::BTreeMap;

    fn tokens(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    fn doc(url: &str, title: &str) -> Document {
        Document::new(url.into(), title.into(), String::new())
    }

    #[test]
    fn test_bm25_single_token_at_average_length() {
        let corpus = Corpus::new(vec![doc("A", "shoe"), doc("B", "boot")]).unwrap();
        let index = build_text_index(&corpus, TextField::Title);
        let scores = BM25::default().score_field(&tokens(&["shoe"]), &index, &corpus.urls());

        assert!((scores["A"] - 2f64.ln()).abs() < 1e-12);
        assert_eq!(scores["B"], 0.0);
    }

    #[test]
    fn test_bm25_empty_corpus() {
        let scores = BM25::default().score_field(&tokens(&["shoe"]), &PositionalIndex::default(), &[]);
        assert!(scores.is_empty());
    }

    #[test]
    fn test_bm25_unknown_token_contributes_nothing() {
        let corpus = Corpus::new(vec![doc("A", "shoe"), doc("B", "boot")]).unwrap();
        let index = build_text_index(&corpus, TextField::Title);
        let scores = BM25::default().score_field(&tokens(&["sandal"]), &index, &corpus.urls());
        assert_eq!(scores.len(), 2);
        assert!(scores.values().all(|&s| s == 0.0));
    }

    #[test]
    fn test_bm25_token_in_every_document_scores_zero() {
        let corpus = Corpus::new(vec![doc("A", "shoe"), doc("B", "shoe boot")]).unwrap();
        let index = build_text_index(&corpus, TextField::Title);
        let scores = BM25::default().score_field(&tokens(&["shoe"]), &index, &corpus.urls());
        assert_eq!(scores["A"], 0.0);
        assert_eq!(scores["B"], 0.0);
    }

    #[test]
    fn test_bm25_monotonic_in_term_frequency() {
        let bm25 = BM25::default();
        let idf = 3f64.ln();
        let mut previous = 0.0;
        for tf in 1..20 {
            let score = bm25.term_score(idf, tf as f64, 8.0, 5.0);
            assert!(score > previous, "tf={tf}: {score} <= {previous}");
            previous = score;
        }
    }

    #[test]
    fn test_phrase_contiguity() {
        let corpus = Corpus::new(vec![doc("A", "red leather shoes")]).unwrap();
        let index = build_text_index(&corpus, TextField::Title);
        let urls = corpus.urls();

        assert_eq!(phrase_match(&tokens(&["leather", "shoes"]), &index, &urls)["A"], 1);
        assert_eq!(phrase_match(&tokens(&["shoes", "leather"]), &index, &urls)["A"], 0);
        assert_eq!(phrase_match(&tokens(&["red", "leather", "shoes"]), &index, &urls)["A"], 1);
        assert_eq!(phrase_match(&tokens(&["red", "shoes"]), &index, &urls)["A"], 0);
    }

    #[test]
    fn test_phrase_single_and_missing_tokens() {
        let corpus = Corpus::new(vec![doc("A", "red leather shoes")]).unwrap();
        let index = build_text_index(&corpus, TextField::Title);
        let urls = corpus.urls();

        assert_eq!(phrase_match(&tokens(&["shoes"]), &index, &urls)["A"], 1);
        assert_eq!(phrase_match(&tokens(&["boots"]), &index, &urls)["A"], 0);
        assert_eq!(phrase_match(&tokens(&["leather", "boots"]), &index, &urls)["A"], 0);
        assert_eq!(phrase_match(&[], &index, &urls)["A"], 0);
    }

    #[test]
    fn test_phrase_runs_over_expanded_tokens() {
        let mut groups = BTreeMap::new();
        groups.insert("italy".to_string(), vec!["italia".to_string()]);
        let query = SynonymTable::new(groups).expand_query(&Tokenizer::new(), "italy shoes");
        assert_eq!(query, tokens(&["italy", "shoes", "italia"]));

        let corpus = Corpus::new(vec![doc("A", "italy shoes italia"), doc("B", "italy shoes")]).unwrap();
        let index = build_text_index(&corpus, TextField::Title);
        let matches = phrase_match(&query, &index, &corpus.urls());

        assert_eq!(matches["A"], 1);
        assert_eq!(matches["B"], 0);
    }

    #[test]
    fn test_positions_successive_with_repeats() {
        assert!(positions_successive(&[&[0, 5], &[2, 6], &[7]]));
        assert!(!positions_successive(&[&[0, 5], &[2, 7]]));
    }

    #[test]
    fn test_review_boost_neutral_without_reviews() {
        let none = ReviewStats {
            total_reviews: 0,
            mean_marks: None,
            last_rating: None,
        };
        let skewed = Weights {
            avg_mark: 9.0,
            count_mark: -3.0,
            ..Weights::default()
        };
        for weights in [Weights::default(), Weights::zero(), skewed] {
            assert_eq!(review_boost(Some(&none), &weights), 1.0);
            assert_eq!(review_boost(None, &weights), 1.0);
        }
    }

    #[test]
    fn test_review_boost_formula() {
        let stats = ReviewStats {
            total_reviews: 9,
            mean_marks: Some(4.0),
            last_rating: Some(5.0),
        };
        let weights = Weights::default();
        let expected = (1.0 + 0.8 * 0.4) * (1.0 + 1.0 * 0.2);
        assert!((review_boost(Some(&stats), &weights) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_ranking_stability() {
        let ranked = sort_stable(vec![
            ScoredDocument::new("a".into(), 5.0),
            ScoredDocument::new("b".into(), 5.0),
            ScoredDocument::new("c".into(), 2.0),
        ]);
        let ids: Vec<&str> = ranked.iter().map(|d| d.doc_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);

        let ranked = sort_stable(vec![
            ScoredDocument::new("c".into(), 2.0),
            ScoredDocument::new("b".into(), 5.0),
            ScoredDocument::new("a".into(), 5.0),
        ]);
        let ids: Vec<&str> = ranked.iter().map(|d| d.doc_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_sort_orders_nan_consistently() {
        let ranked = sort_stable(vec![
            ScoredDocument::new("a".into(), 1.0),
            ScoredDocument::new("b".into(), f64::NAN),
            ScoredDocument::new("c".into(), 3.0),
            ScoredDocument::new("d".into(), 1.0),
        ]);
        let ids: Vec<&str> = ranked.iter().map(|d| d.doc_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a", "d"]);
    }

    #[test]
    fn test_rank_end_to_end() {
        let corpus = Corpus::new(vec![doc("A", "shoe"), doc("B", "boot")]).unwrap();
        let indices = build_indices(&corpus);
        let weights = Weights {
            title: 3.0,
            proximity: 2.0,
            ..Weights::zero()
        };

        let ranked = rank_documents(&tokens(&["shoe"]), &indices, &weights);
        assert_eq!(ranked[0].doc_id, "A");
        assert!((ranked[0].score - (2f64.ln() * 3.0 + 2.0)).abs() < 1e-9);
        assert!((ranked[0].score - 4.07944).abs() < 1e-5);
        assert_eq!(ranked[1], ScoredDocument::new("B".into(), 0.0));
    }

    #[test]
    fn test_feature_fields_score_exact_values() {
        let corpus = Corpus::new(vec![
            doc("A", "sneakers").with_feature("brand", "MagicSteps"),
            doc("B", "sneakers").with_feature("made in", "Italy"),
            doc("C", "sandals"),
        ])
        .unwrap();
        let indices = build_indices(&corpus);
        let weights = Weights {
            features: 1.0,
            ..Weights::zero()
        };

        let components = score_components(&tokens(&["magicsteps"]), &indices, &weights);
        assert!((components[0].1.brand - 3f64.ln()).abs() < 1e-12);
        assert_eq!(components[1].1.brand, 0.0);
        assert_eq!(components[2].1.brand, 0.0);

        let ranked = rank_documents(&tokens(&["italy"]), &indices, &weights);
        assert_eq!(ranked[0].doc_id, "B");
        assert!(ranked[0].score > 0.0);
    }

    #[test]
    fn test_reviews_lift_equal_text_scores() {
        let corpus = Corpus::new(vec![
            doc("A", "chocolate box"),
            doc("B", "chocolate box").with_review(5.0).with_review(4.0),
            doc("C", "leather shoes"),
        ])
        .unwrap();
        let indices = build_indices(&corpus);

        let ranked = rank_documents(&tokens(&["chocolate"]), &indices, &Weights::default());
        assert_eq!(ranked[0].doc_id, "B");
        assert_eq!(ranked[1].doc_id, "A");
        assert_eq!(ranked[2].score, 0.0);
    }
}
