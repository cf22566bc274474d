use clauseguard_core::auth::CredentialError;
use clauseguard_core::upload::UploadRejection;
use thiserror::Error;

pub const ANALYSIS_TIMEOUT_MESSAGE: &str =
    "Analysis is taking longer than expected. Please refresh the page.";

const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please sign in again.";
const NETWORK_MESSAGE: &str = "Network error. Please check your connection and try again.";

#[derive(Debug, Error)]
pub enum ClientError {
    /// Rejected before any network call.
    #[error(transparent)]
    Validation(#[from] UploadRejection),

    #[error(transparent)]
    Credentials(#[from] CredentialError),

    #[error("not signed in")]
    NotAuthenticated,

    /// The backend answered 401; the session has already been cleared.
    #[error("unauthorized; signed out")]
    Unauthorized,

    #[error("{message}")]
    Api { status: u16, message: String },

    /// The analyze request was refused; the text is the server's, verbatim.
    #[error("{0}")]
    Rejected(String),

    /// The identity provider refused the request.
    #[error("{0}")]
    Auth(String),

    #[error("identity provider is not configured")]
    NotConfigured,

    #[error("analysis did not complete after {attempts} status checks")]
    Timeout { attempts: u32 },

    #[error("an analysis is already running for this contract")]
    AlreadyRunning,

    #[error("cancelled")]
    Cancelled,

    #[error("request failed: {0:#}")]
    Transport(anyhow::Error),

    #[error("unexpected response: {0:#}")]
    Decode(anyhow::Error),
}

impl ClientError {
    /// Text shown to the user for this error.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Timeout { .. } => ANALYSIS_TIMEOUT_MESSAGE.into(),
            ClientError::Unauthorized | ClientError::NotAuthenticated => {
                SESSION_EXPIRED_MESSAGE.into()
            }
            ClientError::Transport(_) => NETWORK_MESSAGE.into(),
            ClientError::Decode(_) => "Unexpected response from the server.".into(),
            other => other.to_string(),
        }
    }

    /// True when the caller should treat the user as signed out.
    pub fn is_auth_loss(&self) -> bool {
        matches!(self, ClientError::Unauthorized | ClientError::NotAuthenticated)
    }
}
