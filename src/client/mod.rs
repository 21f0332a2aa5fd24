//! Client library for the Zikroullah API.
//!
//! Mirrors what the web client does: keeps the logged-in user in a durable
//! session store, moves between screens through an explicit state machine,
//! counts a session locally and polls the server on a fixed interval.

mod api;
mod counter;
mod poller;
mod session;
mod view;

pub use api::ApiClient;
pub use counter::TallyCounter;
pub use poller::{Generation, Poller, DEFAULT_POLL_INTERVAL};
pub use session::{SessionStore, SESSION_KEY};
pub use view::{AppView, Screen};

use thiserror::Error;

/// Errors surfaced to the client user.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered with a non-success status and a `{message}` body
    #[error("{message}")]
    Api { status: u16, message: String },
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("session storage failed: {0}")]
    Storage(#[from] std::io::Error),
    #[error("invalid session data: {0}")]
    Json(#[from] serde_json::Error),
    #[error("cannot {action} from the {from} screen")]
    InvalidTransition { from: &'static str, action: &'static str },
    #[error("{0}")]
    Tally(String),
}

impl ClientError {
    /// HTTP status for server-side rejections.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
