//! Exit reasons, error kinds and restart requirements

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why an operation finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExitReason {
    Success,
    Failed,
    Cancelled,
    KeyRequired,
    EulaRequired,
    Killed,
    #[serde(other)]
    Unknown,
}

impl ExitReason {
    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::KeyRequired => "key-required",
            Self::EulaRequired => "eula-required",
            Self::Killed => "killed",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error classification carried by error events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    Oom,
    NoNetwork,
    NotSupported,
    InternalError,
    GpgFailure,
    PackageIdInvalid,
    PackageNotInstalled,
    PackageNotFound,
    PackageAlreadyInstalled,
    PackageDownloadFailed,
    GroupNotFound,
    DepResolutionFailed,
    FilterInvalid,
    CreateThreadFailed,
    TransactionError,
    TransactionCancelled,
    NoCache,
    RepoNotFound,
    CannotRemoveSystemPackage,
    ProcessKill,
    FailedInitialization,
    FailedFinalise,
    FailedConfigParsing,
    CannotCancel,
    CannotGetLock,
    NoPackagesToUpdate,
    CannotWriteRepoConfig,
    LocalInstallFailed,
    BadGpgSignature,
    #[serde(other)]
    Unknown,
}

impl ErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Oom => "oom",
            Self::NoNetwork => "no-network",
            Self::NotSupported => "not-supported",
            Self::InternalError => "internal-error",
            Self::GpgFailure => "gpg-failure",
            Self::PackageIdInvalid => "package-id-invalid",
            Self::PackageNotInstalled => "package-not-installed",
            Self::PackageNotFound => "package-not-found",
            Self::PackageAlreadyInstalled => "package-already-installed",
            Self::PackageDownloadFailed => "package-download-failed",
            Self::GroupNotFound => "group-not-found",
            Self::DepResolutionFailed => "dep-resolution-failed",
            Self::FilterInvalid => "filter-invalid",
            Self::CreateThreadFailed => "create-thread-failed",
            Self::TransactionError => "transaction-error",
            Self::TransactionCancelled => "transaction-cancelled",
            Self::NoCache => "no-cache",
            Self::RepoNotFound => "repo-not-found",
            Self::CannotRemoveSystemPackage => "cannot-remove-system-package",
            Self::ProcessKill => "process-kill",
            Self::FailedInitialization => "failed-initialization",
            Self::FailedFinalise => "failed-finalise",
            Self::FailedConfigParsing => "failed-config-parsing",
            Self::CannotCancel => "cannot-cancel",
            Self::CannotGetLock => "cannot-get-lock",
            Self::NoPackagesToUpdate => "no-packages-to-update",
            Self::CannotWriteRepoConfig => "cannot-write-repo-config",
            Self::LocalInstallFailed => "local-install-failed",
            Self::BadGpgSignature => "bad-gpg-signature",
            Self::Unknown => "unknown",
        }
    }

    /// Signature trust failures that key import can remedy
    #[must_use]
    pub fn is_trust_failure(self) -> bool {
        matches!(self, Self::GpgFailure | Self::BadGpgSignature)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What has to be restarted after an operation
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RestartKind {
    #[default]
    None,
    Application,
    Session,
    System,
}

impl RestartKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Application => "application",
            Self::Session => "session",
            Self::System => "system",
        }
    }

    #[must_use]
    pub fn is_required(self) -> bool {
        self != Self::None
    }
}

impl fmt::Display for RestartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
