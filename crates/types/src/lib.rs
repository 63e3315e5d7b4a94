#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core type definitions for the pkcon package console
//!
//! This crate provides the value types shared between the bus, the
//! transaction driver and the command line: canonical package identifiers,
//! roles and filters, operation requests and progress snapshots.

pub mod filter;
pub mod package;
pub mod progress;
pub mod request;
pub mod role;
pub mod status;

// Re-export commonly used types
pub use filter::{Filter, FilterSet};
pub use package::{InfoKind, PackageId, PackageItem};
pub use progress::{Percentage, ProgressSnapshot};
pub use request::{OperationRequest, ProvidesKind, RequestOptions, SigType, Target};
pub use role::{Role, RoleSet};
pub use status::{ErrorKind, ExitReason, RestartKind};

use serde::{Deserialize, Serialize};

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ColorChoice {
    Always,
    Auto,
    Never,
}

impl Default for ColorChoice {
    fn default() -> Self {
        Self::Auto
    }
}

/// Whether progress bars are drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProgressMode {
    /// Draw bars when stdout is a terminal
    Auto,
    /// Always draw bars
    Always,
    /// Print plain percentages only
    Never,
}

impl Default for ProgressMode {
    fn default() -> Self {
        Self::Auto
    }
}

impl ProgressMode {
    /// Resolve the mode against whether stdout is a terminal
    #[must_use]
    pub fn is_interactive(self, stdout_is_term: bool) -> bool {
        match self {
            Self::Auto => stdout_is_term,
            Self::Always => true,
            Self::Never => false,
        }
    }
}

/// Network connectivity as reported by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkState {
    Online,
    Offline,
    Unknown,
}

impl NetworkState {
    /// Unknown connectivity is treated as online so the service can decide
    #[must_use]
    pub fn is_online(self) -> bool {
        !matches!(self, Self::Offline)
    }
}

/// What the service advertises it can do
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub roles: RoleSet,
    #[serde(default)]
    pub filters: FilterSet,
    #[serde(default)]
    pub groups: Vec<String>,
}

impl Capabilities {
    /// Create capabilities advertising the given roles
    #[must_use]
    pub fn with_roles(roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            roles: roles.into_iter().collect(),
            filters: FilterSet::default(),
            groups: Vec::new(),
        }
    }

    /// Whether the service supports a role
    #[must_use]
    pub fn supports(&self, role: Role) -> bool {
        self.roles.contains(role)
    }
}
