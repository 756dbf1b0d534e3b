use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(FileId);

/// Only extension accepted for uploads, compared case-insensitively.
pub const ALLOWED_EXTENSION: &str = "pdf";

pub fn has_allowed_extension(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case(ALLOWED_EXTENSION))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_check_is_case_insensitive() {
        assert!(has_allowed_extension("report.PDF"));
        assert!(has_allowed_extension("a.b.pdf"));
        assert!(!has_allowed_extension("pdf"));
        assert!(!has_allowed_extension("notes.txt"));
    }

    #[test]
    fn file_id_is_a_bare_integer_on_the_wire() {
        assert_eq!(serde_json::to_string(&FileId(7)).expect("json"), "7");
    }
}
