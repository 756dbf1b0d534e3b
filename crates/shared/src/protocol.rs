use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::FileId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSummary {
    pub id: FileId,
    pub filename: String,
    pub upload_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub file_id: FileId,
    pub filename: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub message: String,
    pub file_id: FileId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareSelectedRequest {
    #[serde(default)]
    pub file_ids: Option<Vec<FileId>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PairOutcome {
    Scored {
        similarity: f64,
        similarity_percentage: String,
    },
    Failed {
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairResult {
    pub file1_id: FileId,
    pub file2_id: FileId,
    pub file1_name: String,
    pub file2_name: String,
    #[serde(flatten)]
    pub outcome: PairOutcome,
}

impl PairResult {
    /// Sort key for result lists; failed pairs rank as zero.
    pub fn similarity_or_zero(&self) -> f64 {
        match self.outcome {
            PairOutcome::Scored { similarity, .. } => similarity,
            PairOutcome::Failed { .. } => 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareResponse {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_files: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_comparisons: Option<usize>,
    pub results: Vec<PairResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairCompareResponse {
    pub similarity: f64,
    pub message: String,
    pub file1: String,
    pub file2: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileComparison {
    pub file_name: String,
    /// Percentage, rounded to two decimals.
    pub similarity: f64,
    pub details: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckFileResponse {
    /// Mean of the per-file percentages, rounded to two decimals.
    pub similarity: f64,
    pub comparisons: Vec<FileComparison>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_result_flattens_outcome() {
        let scored = PairResult {
            file1_id: FileId(1),
            file2_id: FileId(2),
            file1_name: "a.pdf".into(),
            file2_name: "b.pdf".into(),
            outcome: PairOutcome::Scored {
                similarity: 0.5,
                similarity_percentage: "50.00%".into(),
            },
        };
        let json = serde_json::to_value(&scored).expect("json");
        assert_eq!(json["similarity"], 0.5);
        assert_eq!(json["similarity_percentage"], "50.00%");
        assert!(json.get("outcome").is_none());

        let failed: PairResult = serde_json::from_value(serde_json::json!({
            "file1_id": 1,
            "file2_id": 3,
            "file1_name": "a.pdf",
            "file2_name": "c.pdf",
            "error": "One or both PDFs contain no extractable text"
        }))
        .expect("failed pair");
        assert_eq!(failed.similarity_or_zero(), 0.0);
        assert!(matches!(failed.outcome, PairOutcome::Failed { .. }));
    }

    #[test]
    fn compare_response_accepts_missing_totals() {
        let response: CompareResponse = serde_json::from_value(serde_json::json!({
            "message": "Successfully compared 0 file pairs",
            "results": []
        }))
        .expect("response");
        assert!(response.total_files.is_none());
        assert!(response.results.is_empty());
    }
}
