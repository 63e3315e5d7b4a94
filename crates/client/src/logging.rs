//! Structured logging of service events
//!
//! Every event received on a handle is recorded with its own target and
//! fields, at the level the event itself asks for. Nothing here reaches the
//! console; the subscriber set up by the binary decides where it goes.

use pkc_bus::HandleId;
use pkc_events::ServiceEvent;
use tracing::{debug, error, info, trace, warn, Level};

// Targets must be literals; keep them in step with `ServiceEvent::log_target`.
macro_rules! log_at {
    ($level:expr, target: $target:literal, $($rest:tt)+) => {
        match $level {
            Level::ERROR => error!(target: $target, $($rest)+),
            Level::WARN => warn!(target: $target, $($rest)+),
            Level::INFO => info!(target: $target, $($rest)+),
            Level::DEBUG => debug!(target: $target, $($rest)+),
            _ => trace!(target: $target, $($rest)+),
        }
    };
}

/// Log one event received on `handle`
pub fn log_event(handle: HandleId, event: &ServiceEvent) {
    let level = event.log_level();
    match event {
        ServiceEvent::Package(item) => log_at!(
            level,
            target: "pkcon::events::package",
            handle = %handle,
            info = item.info.as_str(),
            package_id = %item.package_id,
            summary = %item.summary,
            "Package"
        ),
        ServiceEvent::Progress(snapshot) => log_at!(
            level,
            target: "pkcon::events::progress",
            handle = %handle,
            percentage = %snapshot.percentage,
            subpercentage = %snapshot.subpercentage,
            elapsed_secs = snapshot.elapsed.as_secs(),
            remaining_secs = snapshot.remaining.as_secs(),
            "Progress"
        ),
        ServiceEvent::RepoSignatureRequired(sig) => log_at!(
            level,
            target: "pkcon::events::remediation",
            handle = %handle,
            package_id = %sig.package_id,
            repository = %sig.repository_name,
            key_id = %sig.key_id,
            key_url = %sig.key_url,
            sig_type = %sig.sig_type,
            "Repository signature required"
        ),
        ServiceEvent::EulaRequired(eula) => log_at!(
            level,
            target: "pkcon::events::remediation",
            handle = %handle,
            eula_id = %eula.eula_id,
            package_id = %eula.package_id,
            vendor = %eula.vendor_name,
            "Licence agreement required"
        ),
        ServiceEvent::UpdateDetail(detail) => log_at!(
            level,
            target: "pkcon::events::detail",
            handle = %handle,
            package_id = %detail.package_id,
            restart = %detail.restart,
            "Update detail"
        ),
        ServiceEvent::Description(description) => log_at!(
            level,
            target: "pkcon::events::detail",
            handle = %handle,
            package_id = %description.package_id,
            group = %description.group,
            size = description.size,
            "Description"
        ),
        ServiceEvent::Files(files) => log_at!(
            level,
            target: "pkcon::events::detail",
            handle = %handle,
            package_id = %files.package_id,
            count = files.files.len(),
            "File list"
        ),
        ServiceEvent::RepoDetail(repo) => log_at!(
            level,
            target: "pkcon::events::detail",
            handle = %handle,
            repo_id = %repo.repo_id,
            enabled = repo.enabled,
            "Repository"
        ),
        ServiceEvent::Transaction(meta) => log_at!(
            level,
            target: "pkcon::events::detail",
            handle = %handle,
            tid = %meta.tid,
            role = %meta.role,
            succeeded = meta.succeeded,
            duration_secs = meta.duration,
            "Past transaction"
        ),
        ServiceEvent::ErrorCode { code, details } => log_at!(
            level,
            target: "pkcon::events::error",
            handle = %handle,
            code = %code,
            details = %details,
            "Service reported an error"
        ),
        ServiceEvent::RequireRestart {
            restart,
            package_id,
        } => log_at!(
            level,
            target: "pkcon::events::lifecycle",
            handle = %handle,
            restart = %restart,
            package_id = %package_id,
            "Restart required"
        ),
        ServiceEvent::Finished { exit, runtime_ms } => log_at!(
            level,
            target: "pkcon::events::lifecycle",
            handle = %handle,
            exit = %exit,
            runtime_ms = runtime_ms,
            "Finished"
        ),
        ServiceEvent::ConnectionChanged { connected } => log_at!(
            level,
            target: "pkcon::events::connection",
            handle = %handle,
            connected = connected,
            "Connection changed"
        ),
    }
}
