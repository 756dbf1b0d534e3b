//! Text similarity scoring for uploaded documents.
//!
//! Scores are the difflib-style ratio of two preprocessed texts, in `0.0..=1.0`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod matcher;
mod preprocess;

pub use matcher::{Match, SequenceMatcher};
pub use preprocess::{preprocess, STOPWORDS};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimilarityError {
    #[error("One or both PDFs contain no extractable text")]
    EmptyText,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringOptions {
    pub remove_stopwords: bool,
}

impl Default for ScoringOptions {
    fn default() -> Self {
        Self {
            remove_stopwords: true,
        }
    }
}

pub fn check_similarity(
    text1: &str,
    text2: &str,
    options: ScoringOptions,
) -> Result<f64, SimilarityError> {
    if text1.is_empty() || text2.is_empty() {
        return Err(SimilarityError::EmptyText);
    }
    let a: Vec<char> = preprocess(text1, options.remove_stopwords).chars().collect();
    let b: Vec<char> = preprocess(text2, options.remove_stopwords).chars().collect();
    Ok(SequenceMatcher::new(&a, &b).ratio())
}

/// Describes the longest run shared by the two raw texts.
pub fn longest_match_details(text1: &str, text2: &str) -> String {
    let a: Vec<char> = text1.chars().collect();
    let b: Vec<char> = text2.chars().collect();
    let longest = SequenceMatcher::new(&a, &b)
        .matching_blocks()
        .into_iter()
        .map(|block| block.size)
        .max()
        .unwrap_or(0);
    if longest == 0 {
        "No significant matches found".to_string()
    } else {
        format!("Longest matching block: {longest} characters")
    }
}

pub fn format_percentage(score: f64) -> String {
    format!("{:.2}%", score * 100.0)
}

/// Percentage rounded to 2 decimals, ties to even.
pub fn round_percent(score: f64) -> f64 {
    (score * 100.0 * 100.0).round_ties_even() / 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn from_score(score: f64) -> Self {
        let percentage = score * 100.0;
        if percentage > 80.0 {
            Self::High
        } else if percentage > 50.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
