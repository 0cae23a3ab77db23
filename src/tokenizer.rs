use std::collections::{HashMap, HashSet};

lazy_static::lazy_static! {
    static ref STOPWORDS: HashSet<&'static str> = {
        [
            "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're",
            "you've", "you'll", "you'd", "your", "yours", "yourself", "yourselves", "he",
            "him", "his", "himself", "she", "she's", "her", "hers", "herself", "it", "it's",
            "its", "itself", "they", "them", "their", "theirs", "themselves", "what", "which",
            "who", "whom", "this", "that", "that'll", "these", "those", "am", "is", "are",
            "was", "were", "be", "been", "being", "have", "has", "had", "having", "do",
            "does", "did", "doing", "a", "an", "the", "and", "but", "if", "or", "because",
            "as", "until", "while", "of", "at", "by", "for", "with", "about", "against",
            "between", "into", "through", "during", "before", "after", "above", "below",
            "to", "from", "up", "down", "in", "out", "on", "off", "over", "under", "again",
            "further", "then", "once", "here", "there", "when", "where", "why", "how", "all",
            "any", "both", "each", "few", "more", "most", "other", "some", "such", "no",
            "nor", "not", "only", "own", "same", "so", "than", "too", "very", "s", "t",
            "can", "will", "just", "don", "don't", "should", "should've", "now", "d", "ll",
            "m", "o", "re", "ve", "y", "ain", "aren", "aren't", "couldn", "couldn't",
            "didn", "didn't", "doesn", "doesn't", "hadn", "hadn't", "hasn", "hasn't",
            "haven", "haven't", "isn", "isn't", "ma", "mightn", "mightn't", "mustn",
            "mustn't", "needn", "needn't", "shan", "shan't", "shouldn", "shouldn't",
            "wasn", "wasn't", "weren", "weren't", "won", "won't", "wouldn", "wouldn't",
        ]
        .iter()
        .copied()
        .collect()
    };
}

/// Text normalizer shared by index building and query processing.
///
/// The position of a token in the sequence returned by [`Tokenizer::process`]
/// is the coordinate stored in positional postings, so both sides must go
/// through the same pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tokenizer;

impl Tokenizer {
    pub fn new() -> Self {
        Self
    }

    /// Replace ASCII punctuation with whitespace and split
    fn tokenize(&self, text: &str) -> Vec<String> {
        text.chars()
            .map(|c| if c.is_ascii_punctuation() { ' ' } else { c })
            .collect::<String>()
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }

    /// Convert tokens to lowercase
    fn lowercase_filter(&self, tokens: Vec<String>) -> Vec<String> {
        tokens.into_iter().map(|t| t.to_lowercase()).collect()
    }

    /// Remove stopwords
    fn stopword_filter(&self, tokens: Vec<String>) -> Vec<String> {
        tokens
            .into_iter()
            .filter(|t| !is_stopword(t))
            .collect()
    }

    /// Full processing pipeline
    pub fn process(&self, text: &str) -> Vec<String> {
        let tokens = self.tokenize(text);
        let tokens = self.lowercase_filter(tokens);
        self.stopword_filter(tokens)
    }

    /// Group the processed sequence by token, keeping every 0-based position
    pub fn positions(&self, text: &str) -> HashMap<String, Vec<usize>> {
        let mut positions: HashMap<String, Vec<usize>> = HashMap::new();
        for (pos, token) in self.process(text).into_iter().enumerate() {
            positions.entry(token).or_default().push(pos);
        }
        positions
    }
}

pub fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(token)
}

/// Shorthand for `Tokenizer::new().process(text)`.
pub fn process(text: &str) -> Vec<String> {
    Tokenizer::new().process(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize() {
        let tokenizer = Tokenizer::new();
        let tokens = tokenizer.tokenize("Hello, World! This is a test.");
        assert_eq!(tokens, vec!["Hello", "World", "This", "is", "a", "test"]);
    }

    #[test]
    fn test_process() {
        let tokens = process("The Red leather-shoes, for KIDS!");
        assert_eq!(tokens, vec!["red", "leather", "shoes", "kids"]);
    }

    #[test]
    fn test_apostrophes_split_into_stopwords() {
        // "don't" becomes "don" + "t", both stopwords
        assert_eq!(process("Don't stop"), vec!["stop"]);
    }

    #[test]
    fn test_empty_and_punctuation_only() {
        assert!(process("").is_empty());
        assert!(process("?!... --- ,;").is_empty());
        assert!(process("the and of").is_empty());
    }

    #[test]
    fn test_non_ascii_kept() {
        assert_eq!(process("Café crème"), vec!["café", "crème"]);
    }

    #[test]
    fn test_positions_use_processed_sequence() {
        let positions = Tokenizer::new().positions("The box of chocolate, chocolate box");
        assert_eq!(positions["box"], vec![0, 3]);
        assert_eq!(positions["chocolate"], vec![1, 2]);
        assert_eq!(positions.len(), 2);
    }
}
