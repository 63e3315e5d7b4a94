//! CLI error handling

use std::fmt;

use pkc_errors::UserFacingError;

pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_DISCONNECTED: i32 = 2;
pub const EXIT_INTERRUPTED: i32 = 130;

/// CLI-specific error type
#[derive(Debug)]
pub enum CliError {
    /// Configuration error
    Config(pkc_errors::ConfigError),
    /// Bus or transaction error
    Client(pkc_errors::Error),
    /// I/O error
    Io(std::io::Error),
}

impl CliError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Client(e) if e.is_interrupted() => EXIT_INTERRUPTED,
            CliError::Client(e) if e.is_disconnect() => EXIT_DISCONNECTED,
            _ => EXIT_FAILURE,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(e) => {
                write!(f, "Configuration error: {}", e.user_message())?;
                if let Some(hint) = e.user_hint() {
                    write!(f, "\n  Hint: {hint}")?;
                }
                Ok(())
            }
            CliError::Client(e) => {
                let message = e.user_message();
                write!(f, "{message}")?;
                if let Some(code) = e.user_code() {
                    write!(f, "\n  Code: {code}")?;
                }
                if let Some(hint) = e.user_hint() {
                    write!(f, "\n  Hint: {hint}")?;
                }
                if e.is_retryable() {
                    write!(f, "\n  Retry: safe to retry this operation.")?;
                }
                Ok(())
            }
            CliError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Client(e) => Some(e),
            CliError::Io(e) => Some(e),
        }
    }
}

impl From<pkc_errors::ConfigError> for CliError {
    fn from(e: pkc_errors::ConfigError) -> Self {
        CliError::Config(e)
    }
}

impl From<pkc_errors::Error> for CliError {
    fn from(e: pkc_errors::Error) -> Self {
        match e {
            pkc_errors::Error::Config(e) => CliError::Config(e),
            other => CliError::Client(other),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkc_errors::{BusError, ConfigError, TransactionError};

    #[test]
    fn test_exit_codes() {
        let interrupted: CliError = pkc_errors::Error::from(TransactionError::Interrupted).into();
        assert_eq!(interrupted.exit_code(), EXIT_INTERRUPTED);

        let gone: CliError = pkc_errors::Error::from(TransactionError::RemoteDisconnect).into();
        assert_eq!(gone.exit_code(), EXIT_DISCONNECTED);

        let declined: CliError = pkc_errors::Error::from(TransactionError::UserDeclined).into();
        assert_eq!(declined.exit_code(), EXIT_FAILURE);
        assert!(declined.to_string().starts_with("Cancelled!"));
    }

    #[test]
    fn test_config_errors_unwrap_from_client_error() {
        let err: CliError = pkc_errors::Error::from(ConfigError::NoConfigDir).into();
        assert!(matches!(err, CliError::Config(_)));
        assert!(err.to_string().starts_with("Configuration error: "));

        let err: CliError = pkc_errors::Error::from(BusError::Disconnected).into();
        assert!(matches!(err, CliError::Client(_)));
    }
}
