use console::{style, Style, Term};
use client_core::view::{
    file_menu, files_button_label, text_bar, CompareSummary, ResultView,
};
use shared::protocol::{CheckFileResponse, CompareResponse, FileSummary, PairCompareResponse};
use similarity::Severity;

const BAR_WIDTH: usize = 30;

/// A "busy" line on stderr, cleared when dropped.
pub struct Busy {
    term: Term,
}

impl Busy {
    pub fn start(label: &str) -> Self {
        let term = Term::stderr();
        if term.is_term() {
            let _ = term.write_str(&style(label).dim().to_string());
        }
        Self { term }
    }
}

impl Drop for Busy {
    fn drop(&mut self) {
        if self.term.is_term() {
            let _ = self.term.clear_line();
        }
    }
}

pub fn banner(message: &str) {
    eprintln!("{} {message}", style("Error:").red().bold());
}

pub fn success(message: &str) {
    println!("{} {message}", style("✓").green().bold());
}

/// Asks on stderr and reads a y/n answer from the terminal.
pub fn confirm(question: &str) -> bool {
    let term = Term::stderr();
    if term.write_str(&format!("{question} [y/N] ")).is_err() {
        return false;
    }
    term.read_line()
        .map(|answer| is_yes(&answer))
        .unwrap_or(false)
}

pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

pub fn files(files: &[FileSummary]) {
    println!("{}", style(files_button_label(files.len())).bold());
    if files.is_empty() {
        println!("No files uploaded yet");
        return;
    }
    for file in file_menu(files) {
        println!(
            "  {:>4}  {}  {}",
            file.id,
            file.filename,
            style(file.upload_date.format("%Y-%m-%d %H:%M")).dim()
        );
    }
}

pub fn comparison(response: &CompareResponse) {
    let summary = CompareSummary::from_response(response);
    println!("{}", style("Comparison Results").bold());
    println!(
        "Total files: {}  Total comparisons: {}",
        summary.total_files, summary.total_comparisons
    );
    for line in response.results.iter().map(ResultView::from_pair).map(|view| result_line(&view)) {
        println!("{line}");
    }
}

pub fn result_line(view: &ResultView) -> String {
    match view {
        ResultView::Scored {
            title,
            label,
            severity,
            bar_width,
        } => {
            let colour = severity_style(*severity);
            format!(
                "{title}\n  {} {}",
                colour.apply_to(text_bar(*bar_width, BAR_WIDTH)),
                colour.clone().bold().apply_to(label)
            )
        }
        ResultView::Failed { title, error } => {
            format!("{title}\n  {}", style(error).red())
        }
    }
}

pub fn pair(response: &PairCompareResponse) {
    let colour = severity_style(Severity::from_score(response.similarity));
    println!("{} vs {}", response.file1, response.file2);
    println!(
        "  {} {}",
        colour.apply_to(text_bar(response.similarity * 100.0, BAR_WIDTH)),
        colour.clone().bold().apply_to(&response.message)
    );
}

pub fn check_file(response: &CheckFileResponse) {
    println!(
        "{} {}",
        style(format!("Similarity: {}%", response.similarity)).bold(),
        text_bar(response.similarity, BAR_WIDTH)
    );
    for comparison in &response.comparisons {
        println!(
            "  {}  {}%\n    {}",
            comparison.file_name,
            comparison.similarity,
            style(&comparison.details).dim()
        );
    }
}

fn severity_style(severity: Severity) -> Style {
    match severity {
        Severity::High => Style::new().red(),
        Severity::Medium => Style::new().yellow(),
        Severity::Low => Style::new().green(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use client_core::view::ResultView;

    #[test]
    fn yes_answers_are_case_insensitive() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes(""));
        assert!(!is_yes("nope"));
    }

    #[test]
    fn scored_line_shows_bar_and_label() {
        console::set_colors_enabled(false);
        let line = result_line(&ResultView::Scored {
            title: "a.pdf vs b.pdf".to_string(),
            label: "50.00%".to_string(),
            severity: Severity::Low,
            bar_width: 50.0,
        });
        assert_eq!(
            line,
            format!("a.pdf vs b.pdf\n  [{}{}] 50.00%", "#".repeat(15), "-".repeat(15))
        );
    }

    #[test]
    fn failed_line_shows_error() {
        console::set_colors_enabled(false);
        let line = result_line(&ResultView::Failed {
            title: "a.pdf vs c.pdf".to_string(),
            error: "One or both PDFs contain no extractable text".to_string(),
        });
        assert!(line.ends_with("One or both PDFs contain no extractable text"));
    }
}
