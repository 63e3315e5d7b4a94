//! Parse error types for wire and command-line values

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ParseError {
    #[error("invalid package id '{input}': expected name;version;arch;data")]
    InvalidPackageId { input: String },

    #[error("unknown role '{input}'")]
    UnknownRole { input: String },

    #[error("unknown filter '{input}'")]
    UnknownFilter { input: String },

    #[error("unknown signature type '{input}'")]
    UnknownSigType { input: String },

    #[error("unknown provides kind '{input}'")]
    UnknownProvides { input: String },
}
