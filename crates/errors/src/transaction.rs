//! Transaction orchestration error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum TransactionError {
    #[error("cancelled by user")]
    UserDeclined,

    #[error("The daemon crashed mid transaction. This is bad")]
    RemoteDisconnect,

    #[error("interrupted")]
    Interrupted,

    #[error("prompt input closed")]
    PromptClosed,

    #[error("prompt failed: {message}")]
    Prompt { message: String },

    #[error("failed to requeue action: {message}")]
    RequeueFailed { message: String },

    #[error("failed to write output: {message}")]
    Output { message: String },
}

impl UserFacingError for TransactionError {
    fn user_message(&self) -> Cow<'_, str> {
        match self {
            Self::UserDeclined => Cow::Borrowed("Cancelled!"),
            _ => Cow::Owned(self.to_string()),
        }
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::PromptClosed => Some("Run the command from an interactive terminal."),
            _ => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::UserDeclined => "transaction.user_declined",
            Self::RemoteDisconnect => "transaction.remote_disconnect",
            Self::Interrupted => "transaction.interrupted",
            Self::PromptClosed => "transaction.prompt_closed",
            Self::Prompt { .. } => "transaction.prompt",
            Self::RequeueFailed { .. } => "transaction.requeue_failed",
            Self::Output { .. } => "transaction.output",
        };
        Some(code)
    }
}

impl From<std::io::Error> for TransactionError {
    fn from(err: std::io::Error) -> Self {
        Self::Output {
            message: err.to_string(),
        }
    }
}
