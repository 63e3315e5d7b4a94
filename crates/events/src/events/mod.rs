use serde::{Deserialize, Serialize};
use std::time::Duration;

use pkc_types::{ErrorKind, ExitReason, PackageItem, ProgressSnapshot, RestartKind};

pub mod detail;
pub mod remediation;

pub use detail::{Description, FileList, RepoDetail, TransactionMeta, UpdateDetail};
pub use remediation::{EulaRequired, SignatureRequired};

/// Everything a handle can deliver, in the order the service emits it
///
/// `Finished` is terminal: nothing follows it on the same run of a handle.
/// `ConnectionChanged` is synthesised by the transport when the service
/// goes away.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ServiceEvent {
    Package(PackageItem),

    Progress(ProgressSnapshot),

    RepoSignatureRequired(SignatureRequired),

    EulaRequired(EulaRequired),

    UpdateDetail(UpdateDetail),

    Description(Description),

    Files(FileList),

    RepoDetail(RepoDetail),

    Transaction(TransactionMeta),

    ErrorCode {
        code: ErrorKind,
        #[serde(default)]
        details: String,
    },

    RequireRestart {
        restart: RestartKind,
        #[serde(default)]
        package_id: String,
    },

    Finished {
        exit: ExitReason,
        runtime_ms: u64,
    },

    ConnectionChanged {
        connected: bool,
    },
}

impl ServiceEvent {
    #[must_use]
    pub fn finished(exit: ExitReason, runtime: Duration) -> Self {
        Self::Finished {
            exit,
            runtime_ms: u64::try_from(runtime.as_millis()).unwrap_or(u64::MAX),
        }
    }

    #[must_use]
    pub fn error_code(code: ErrorKind, details: impl Into<String>) -> Self {
        Self::ErrorCode {
            code,
            details: details.into(),
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished { .. })
    }

    /// Wire name of the event kind
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Package(_) => "package",
            Self::Progress(_) => "progress",
            Self::RepoSignatureRequired(_) => "repo-signature-required",
            Self::EulaRequired(_) => "eula-required",
            Self::UpdateDetail(_) => "update-detail",
            Self::Description(_) => "description",
            Self::Files(_) => "files",
            Self::RepoDetail(_) => "repo-detail",
            Self::Transaction(_) => "transaction",
            Self::ErrorCode { .. } => "error-code",
            Self::RequireRestart { .. } => "require-restart",
            Self::Finished { .. } => "finished",
            Self::ConnectionChanged { .. } => "connection-changed",
        }
    }

    /// Determine the appropriate tracing log level for this event
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        use tracing::Level;

        match self {
            Self::ConnectionChanged { connected: false } => Level::ERROR,

            Self::ErrorCode { .. }
            | Self::RepoSignatureRequired(_)
            | Self::EulaRequired(_) => Level::WARN,

            Self::Finished { exit, .. } if !exit.is_success() => Level::WARN,

            Self::Progress(_) => Level::TRACE,

            Self::Package(_)
            | Self::UpdateDetail(_)
            | Self::Description(_)
            | Self::Files(_)
            | Self::RepoDetail(_)
            | Self::Transaction(_) => Level::DEBUG,

            _ => Level::INFO,
        }
    }

    /// Get the log target for this event (for structured logging)
    #[must_use]
    pub fn log_target(&self) -> &'static str {
        match self {
            Self::Package(_) => "pkcon::events::package",
            Self::Progress(_) => "pkcon::events::progress",
            Self::RepoSignatureRequired(_) | Self::EulaRequired(_) => {
                "pkcon::events::remediation"
            }
            Self::UpdateDetail(_)
            | Self::Description(_)
            | Self::Files(_)
            | Self::RepoDetail(_)
            | Self::Transaction(_) => "pkcon::events::detail",
            Self::ErrorCode { .. } => "pkcon::events::error",
            Self::RequireRestart { .. } | Self::Finished { .. } => "pkcon::events::lifecycle",
            Self::ConnectionChanged { .. } => "pkcon::events::connection",
        }
    }
}
