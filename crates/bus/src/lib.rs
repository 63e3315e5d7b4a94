#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Client side of the package service bus
//!
//! [`EventChannel`] is the seam between the transaction logic and the
//! transport. [`socket::SocketBus`] talks to a running service over a Unix
//! socket; [`memory::MemoryBus`] is an in-process service that replays
//! scripted events and records every call.
//!
//! [`Channel`] is one client handle on top of either transport: it owns the
//! handle's event stream, buffers reported packages and enforces the
//! one-request-per-handle rule.

mod channel;
pub mod memory;
pub mod socket;

pub use channel::Channel;

use async_trait::async_trait;
use pkc_errors::Error;
use pkc_events::EventReceiver;
use pkc_types::{Capabilities, NetworkState, OperationRequest, Role};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Service-assigned identifier of an open handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandleId(pub u64);

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Connection to the package service
///
/// Every handle gets its own event stream from [`EventChannel::open`];
/// events for one handle arrive in the order the service emits them.
#[async_trait]
pub trait EventChannel: Send + Sync {
    /// Roles, filters and groups the service advertises
    async fn capabilities(&self) -> Result<Capabilities, Error>;

    async fn network_state(&self) -> Result<NetworkState, Error>;

    /// Open a new handle and its event stream
    async fn open(&self) -> Result<(HandleId, EventReceiver), Error>;

    /// Issue a request on a handle
    async fn start(&self, handle: HandleId, request: &OperationRequest) -> Result<(), Error>;

    /// Ask the service to stop whatever runs on the handle
    ///
    /// Cancelling a finished or already cancelling handle is a no-op.
    async fn cancel(&self, handle: HandleId) -> Result<(), Error>;

    /// Time since the service last performed an operation of this role
    async fn time_since_action(&self, role: Role) -> Result<Duration, Error>;

    /// Stop routing events for a handle the client no longer holds
    fn release(&self, handle: HandleId);
}
