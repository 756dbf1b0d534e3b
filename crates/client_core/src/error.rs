use reqwest::StatusCode;
use shared::error::ApiError;
use thiserror::Error;

/// A user action, used to pick the message shown when a request fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    LoadFiles,
    Upload,
    Delete,
    CheckAll,
    CompareSelected,
    ComparePair,
    CheckFile,
}

impl Action {
    pub fn transport_failure_message(self) -> &'static str {
        match self {
            Action::LoadFiles => "An error occurred while loading files.",
            Action::Upload => "An error occurred while uploading the file.",
            Action::Delete => "An error occurred while deleting the file",
            Action::CheckAll => "An error occurred while checking all files.",
            Action::CompareSelected => "An error occurred while comparing selected files.",
            Action::ComparePair => "An error occurred while comparing the files.",
            Action::CheckFile => "An error occurred while checking the file.",
        }
    }

    /// Whether the banner shows the server's longer `message` hint.
    fn prefers_hint(self) -> bool {
        matches!(self, Action::CheckAll | Action::CompareSelected)
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("server returned {status}: {}", error.error)]
    Server { status: StatusCode, error: ApiError },
    #[error("{}: {source}", action.transport_failure_message())]
    Transport {
        action: Action,
        #[source]
        source: reqwest::Error,
    },
    #[error("{0}")]
    Validation(String),
    #[error("invalid server url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ClientError {
    /// Text for the error banner of `action`.
    pub fn banner(&self, action: Action) -> String {
        match self {
            ClientError::Server { error, .. } if action.prefers_hint() => {
                error.banner_text().to_string()
            }
            ClientError::Server { error, .. } => error.error.clone(),
            ClientError::Transport { action, .. } => {
                action.transport_failure_message().to_string()
            }
            other => other.to_string(),
        }
    }
}
