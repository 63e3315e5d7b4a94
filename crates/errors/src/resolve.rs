//! Package name resolution error types

use std::borrow::Cow;

use crate::{BusError, UserFacingError};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum ResolveError {
    #[error("Resolve is not supported in this backend")]
    ResolveUnsupported,

    #[error("WhatProvides is not supported in this backend")]
    ProvidesUnsupported,

    #[error("GetRequires is not supported in this backend")]
    RequiresUnsupported,

    #[error("Could not find a package match for '{input}'")]
    NoMatch { input: String },

    #[error("lookup failed: {0}")]
    Lookup(#[from] BusError),
}

impl UserFacingError for ResolveError {
    fn user_message(&self) -> Cow<'_, str> {
        match self {
            Self::Lookup(err) => err.user_message(),
            _ => Cow::Owned(self.to_string()),
        }
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::NoMatch { .. } => {
                Some("Check the package name, or pass a full name;version;arch;data identifier.")
            }
            Self::Lookup(err) => err.user_hint(),
            _ => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        match self {
            Self::ResolveUnsupported => Some("resolve.unsupported"),
            Self::ProvidesUnsupported => Some("resolve.provides_unsupported"),
            Self::RequiresUnsupported => Some("resolve.requires_unsupported"),
            Self::NoMatch { .. } => Some("resolve.no_match"),
            Self::Lookup(err) => err.user_code(),
        }
    }
}
