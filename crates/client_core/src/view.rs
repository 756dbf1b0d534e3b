use std::collections::HashSet;

use shared::protocol::{CompareResponse, FileSummary, PairOutcome, PairResult};
use similarity::Severity;

/// One row of the comparison results list.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultView {
    Scored {
        title: String,
        label: String,
        severity: Severity,
        /// Bar fill in percent, within `0..=100`.
        bar_width: f64,
    },
    Failed {
        title: String,
        error: String,
    },
}

impl ResultView {
    pub fn from_pair(pair: &PairResult) -> Self {
        let title = format!("{} vs {}", pair.file1_name, pair.file2_name);
        match &pair.outcome {
            PairOutcome::Scored {
                similarity,
                similarity_percentage,
            } => ResultView::Scored {
                title,
                label: similarity_percentage.clone(),
                severity: Severity::from_score(*similarity),
                bar_width: (similarity * 100.0).clamp(0.0, 100.0),
            },
            PairOutcome::Failed { error } => ResultView::Failed {
                title,
                error: error.clone(),
            },
        }
    }
}

/// Header counts for a batch comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompareSummary {
    pub total_files: usize,
    pub total_comparisons: usize,
}

impl CompareSummary {
    pub fn from_response(response: &CompareResponse) -> Self {
        let total_files = response.total_files.unwrap_or_else(|| {
            response
                .results
                .iter()
                .flat_map(|r| [r.file1_id, r.file2_id])
                .collect::<HashSet<_>>()
                .len()
        });
        Self {
            total_files,
            total_comparisons: response
                .total_comparisons
                .unwrap_or(response.results.len()),
        }
    }
}

/// Files for the dropdown menu, newest upload first.
pub fn file_menu(files: &[FileSummary]) -> Vec<&FileSummary> {
    let mut menu: Vec<&FileSummary> = files.iter().collect();
    menu.sort_by(|a, b| b.upload_date.cmp(&a.upload_date).then(b.id.cmp(&a.id)));
    menu
}

pub fn files_button_label(count: usize) -> String {
    if count == 0 {
        "Uploaded Files".to_string()
    } else {
        format!("Uploaded Files ({count})")
    }
}

/// Fixed-width text bar, e.g. `[#####-----]` for 50%.
pub fn text_bar(percent: f64, width: usize) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * width as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}
