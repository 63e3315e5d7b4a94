#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Typed events delivered by the package service
//!
//! Each open handle owns one event stream. The transport pushes
//! [`ServiceEvent`] values into the stream in arrival order and the
//! transaction driver matches on them exhaustively, so scripted event
//! sequences can be fed without a real service.

pub mod events;
pub use events::{
    Description, EulaRequired, FileList, RepoDetail, ServiceEvent, SignatureRequired,
    TransactionMeta, UpdateDetail,
};

use pkc_types::{ErrorKind, ExitReason, InfoKind, PackageId, PackageItem, ProgressSnapshot};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

/// Type alias for the sending half of a handle's event stream
pub type EventSender = UnboundedSender<ServiceEvent>;

/// Type alias for the receiving half of a handle's event stream
pub type EventReceiver = tokio::sync::mpsc::UnboundedReceiver<ServiceEvent>;

/// Create a new event stream
#[must_use]
pub fn channel() -> (EventSender, EventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}

/// Single API for pushing events into a handle's stream
///
/// Implemented for the raw [`EventSender`] and for anything that owns one.
pub trait EventEmitter {
    /// Get the event sender for this emitter
    fn event_sender(&self) -> Option<&EventSender>;

    /// Emit an event; a dropped receiver is not an error
    fn emit(&self, event: ServiceEvent) {
        if let Some(sender) = self.event_sender() {
            let _ = sender.send(event);
        }
    }

    fn emit_package(&self, info: InfoKind, package_id: PackageId, summary: impl Into<String>) {
        self.emit(ServiceEvent::Package(PackageItem {
            info,
            package_id,
            summary: summary.into(),
        }));
    }

    fn emit_progress(&self, snapshot: ProgressSnapshot) {
        self.emit(ServiceEvent::Progress(snapshot));
    }

    fn emit_error_code(&self, code: ErrorKind, details: impl Into<String>) {
        self.emit(ServiceEvent::error_code(code, details));
    }

    fn emit_finished(&self, exit: ExitReason, runtime: Duration) {
        self.emit(ServiceEvent::finished(exit, runtime));
    }

    /// Tell the consumer the service connection is gone
    fn emit_disconnected(&self) {
        self.emit(ServiceEvent::ConnectionChanged { connected: false });
    }
}

impl EventEmitter for EventSender {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(self)
    }
}
