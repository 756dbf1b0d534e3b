use std::{collections::HashSet, sync::OnceLock};

/// English stopwords, the NLTK corpus list.
pub const STOPWORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're", "you've",
    "you'll", "you'd", "your", "yours", "yourself", "yourselves", "he", "him", "his", "himself",
    "she", "she's", "her", "hers", "herself", "it", "it's", "its", "itself", "they", "them",
    "their", "theirs", "themselves", "what", "which", "who", "whom", "this", "that", "that'll",
    "these", "those", "am", "is", "are", "was", "were", "be", "been", "being", "have", "has",
    "had", "having", "do", "does", "did", "doing", "a", "an", "the", "and", "but", "if", "or",
    "because", "as", "until", "while", "of", "at", "by", "for", "with", "about", "against",
    "between", "into", "through", "during", "before", "after", "above", "below", "to", "from",
    "up", "down", "in", "out", "on", "off", "over", "under", "again", "further", "then", "once",
    "here", "there", "when", "where", "why", "how", "all", "any", "both", "each", "few", "more",
    "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than",
    "too", "very", "s", "t", "can", "will", "just", "don", "don't", "should", "should've", "now",
    "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren", "aren't", "couldn", "couldn't", "didn",
    "didn't", "doesn", "doesn't", "hadn", "hadn't", "hasn", "hasn't", "haven", "haven't", "isn",
    "isn't", "ma", "mightn", "mightn't", "mustn", "mustn't", "needn", "needn't", "shan",
    "shan't", "shouldn", "shouldn't", "wasn", "wasn't", "weren", "weren't", "won", "won't",
    "wouldn", "wouldn't",
];

fn stopword_set() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| STOPWORDS.iter().copied().collect())
}

/// Contraction suffixes split off a word the way the Penn Treebank
/// tokenizer does. `n't` is checked first so `can't` leaves `ca`.
const CLITICS: &[&str] = &["n't", "'s", "'re", "'ve", "'ll", "'d", "'m"];

fn strip_clitic(token: &str) -> &str {
    CLITICS
        .iter()
        .find_map(|suffix| token.strip_suffix(suffix).filter(|stem| !stem.is_empty()))
        .unwrap_or(token)
}

/// Lowercases and tokenizes `text`, keeping only purely alphanumeric
/// tokens joined by single spaces.
///
/// Leading and trailing punctuation is split off each whitespace token
/// first, so `"end."` still yields `end` while `"e-mail"` is dropped.
/// Possessive and contraction suffixes are split off and discarded,
/// keeping the stem: `manager's` yields `manager`, `can't` yields `ca`.
pub fn preprocess(text: &str, remove_stopwords: bool) -> String {
    let lowered = text.to_lowercase();
    let stopwords = stopword_set();

    lowered
        .split_whitespace()
        .map(|token| strip_clitic(token.trim_matches(|c: char| !c.is_alphanumeric())))
        .filter(|token| !token.is_empty() && token.chars().all(char::is_alphanumeric))
        .filter(|token| !remove_stopwords || !stopwords.contains(token))
        .collect::<Vec<_>>()
        .join(" ")
}
