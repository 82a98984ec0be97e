use serde::de::DeserializeOwned;
use shared::{
    protocol::{CampaignRejected, InvalidParameters, StatusMessage},
    validation::FieldErrors,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid server url: {0}")]
    Url(#[from] url::ParseError),
}

/// What a failed request means to a form: per-field messages to show inline,
/// or one message for a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    Fields(FieldErrors),
    Message(Option<String>),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Reads the server's error body. Only a `Status` error carries one.
    pub fn rejection(&self) -> Rejection {
        let Self::Status { body, .. } = self else {
            return Rejection::Message(None);
        };

        if let Some(invalid) = parse::<InvalidParameters>(body) {
            if !invalid.errors.is_empty() {
                return Rejection::Fields(invalid.errors);
            }
            return Rejection::Message(Some(invalid.message));
        }
        if let Some(rejected) = parse::<CampaignRejected>(body) {
            return Rejection::Message(Some(rejected.campaign.join(" ")));
        }
        Rejection::Message(parse::<StatusMessage>(body).map(|reply| reply.message))
    }
}

fn parse<T: DeserializeOwned>(body: &str) -> Option<T> {
    serde_json::from_str(body).ok()
}
