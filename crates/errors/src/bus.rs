//! Event bus error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

/// Remote error names in this namespace are authorization refusals raised by
/// the service's policy layer.
pub const PRIVILEGE_ERROR_PREFIX: &str = "org.freedesktop.packagekit.";

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum BusError {
    #[error("operation not supported by the service: {role}")]
    UnsupportedOperation { role: String },

    #[error("cannot {role} while offline")]
    Offline { role: String },

    #[error("handle {handle} already has an operation in progress")]
    HandleBusy { handle: u64 },

    #[error("handle {handle} has no previous request to requeue")]
    NothingToRequeue { handle: u64 },

    #[error("handle {handle} is closed")]
    HandleClosed { handle: u64 },

    #[error("failed to connect to {path}: {message}")]
    ConnectionFailed { path: String, message: String },

    #[error("the service disconnected")]
    Disconnected,

    #[error("{name}: {message}")]
    Remote { name: String, message: String },

    #[error("protocol error: {message}")]
    Protocol { message: String },
}

impl BusError {
    /// Whether the service refused the call for lack of privileges
    #[must_use]
    pub fn is_privilege_failure(&self) -> bool {
        match self {
            Self::Remote { name, message } => {
                name.starts_with(PRIVILEGE_ERROR_PREFIX)
                    || message.starts_with(PRIVILEGE_ERROR_PREFIX)
            }
            _ => false,
        }
    }
}

impl UserFacingError for BusError {
    fn user_message(&self) -> Cow<'_, str> {
        if self.is_privilege_failure() {
            return Cow::Borrowed("You don't have the necessary privileges for this operation");
        }
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::Offline { .. } => Some("Connect to a network and retry the command."),
            Self::ConnectionFailed { .. } => {
                Some("Check that the package service is running and the socket path is correct.")
            }
            Self::UnsupportedOperation { .. } => {
                Some("Run `pkcon get-actions` to list what the service supports.")
            }
            Self::Remote { .. } if self.is_privilege_failure() => {
                Some("Retry as a user allowed to manage packages.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::Offline { .. } | Self::ConnectionFailed { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::UnsupportedOperation { .. } => "bus.unsupported_operation",
            Self::Offline { .. } => "bus.offline",
            Self::HandleBusy { .. } => "bus.handle_busy",
            Self::NothingToRequeue { .. } => "bus.nothing_to_requeue",
            Self::HandleClosed { .. } => "bus.handle_closed",
            Self::ConnectionFailed { .. } => "bus.connection_failed",
            Self::Disconnected => "bus.disconnected",
            Self::Remote { .. } if self.is_privilege_failure() => "bus.not_authorized",
            Self::Remote { .. } => "bus.remote",
            Self::Protocol { .. } => "bus.protocol",
        };
        Some(code)
    }
}
