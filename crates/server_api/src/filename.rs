use std::sync::OnceLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

fn unsafe_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9_.-]").expect("static regex"))
}

/// Reduces an uploaded name to a flat ASCII name safe to join onto the
/// upload directory.
///
/// The name is NFKD-decomposed so accented letters keep their base
/// letter, then remaining non-ASCII characters are dropped. Path
/// separators and whitespace runs become `_`, and leading or trailing
/// dots and underscores are stripped.
/// The result may be empty.
pub fn secure_filename(name: &str) -> String {
    let ascii: String = name.nfkd().filter(char::is_ascii).collect();
    let spaced = ascii.replace(['/', '\\'], " ");
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    unsafe_chars()
        .replace_all(&joined, "")
        .trim_matches(|c| c == '.' || c == '_')
        .to_string()
}
