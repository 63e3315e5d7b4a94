use crate::{EventChannel, HandleId};
use pkc_errors::{BusError, Error};
use pkc_events::{EventReceiver, ServiceEvent};
use pkc_types::{Capabilities, ExitReason, OperationRequest, PackageItem, Role};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HandleState {
    Fresh,
    Running,
    Finished(ExitReason),
}

/// One client handle on the service
///
/// A handle carries one request at a time. After it finishes the same
/// request may be requeued, or the handle may be [`reset`](Self::reset)
/// to issue a different one.
pub struct Channel {
    bus: Arc<dyn EventChannel>,
    capabilities: Arc<Capabilities>,
    id: HandleId,
    events: EventReceiver,
    state: HandleState,
    request: Option<OperationRequest>,
    packages: Vec<PackageItem>,
}

impl Channel {
    /// Open a new handle on the bus
    ///
    /// # Errors
    ///
    /// Returns an error if the service refuses to open a handle.
    pub async fn open(
        bus: Arc<dyn EventChannel>,
        capabilities: Arc<Capabilities>,
    ) -> Result<Self, Error> {
        let (id, events) = bus.open().await?;
        debug!(handle = %id, "opened handle");
        Ok(Self {
            bus,
            capabilities,
            id,
            events,
            state: HandleState::Fresh,
            request: None,
            packages: Vec::new(),
        })
    }

    #[must_use]
    pub fn id(&self) -> HandleId {
        self.id
    }

    /// Role of the current or last request
    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.request.as_ref().map(|request| request.role)
    }

    #[must_use]
    pub fn request(&self) -> Option<&OperationRequest> {
        self.request.as_ref()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state == HandleState::Running
    }

    /// Exit reason of the last run, if it finished
    #[must_use]
    pub fn exit(&self) -> Option<ExitReason> {
        match self.state {
            HandleState::Finished(exit) => Some(exit),
            _ => None,
        }
    }

    /// Packages reported since the last reset, in arrival order
    #[must_use]
    pub fn packages(&self) -> &[PackageItem] {
        &self.packages
    }

    /// Issue a request on a fresh handle
    ///
    /// # Errors
    ///
    /// Fails with `UnsupportedOperation` when the service does not advertise
    /// the role, `Offline` when the role needs the network and the service
    /// has none, and `HandleBusy` when the handle already carries a request.
    pub async fn start(&mut self, request: OperationRequest) -> Result<(), Error> {
        if self.state != HandleState::Fresh {
            return Err(BusError::HandleBusy { handle: self.id.0 }.into());
        }
        if !self.capabilities.supports(request.role) {
            return Err(BusError::UnsupportedOperation {
                role: request.role.to_string(),
            }
            .into());
        }
        if request.requires_network() && !self.bus.network_state().await?.is_online() {
            return Err(BusError::Offline {
                role: request.role.to_string(),
            }
            .into());
        }

        debug!(handle = %self.id, role = %request.role, "starting request");
        self.bus.start(self.id, &request).await?;
        self.request = Some(request);
        self.state = HandleState::Running;
        Ok(())
    }

    /// Resubmit the last request unchanged
    ///
    /// # Errors
    ///
    /// Fails with `NothingToRequeue` if no request was issued yet and with
    /// `HandleBusy` while the previous run is still going.
    pub async fn requeue(&mut self) -> Result<(), Error> {
        let Some(request) = self.request.as_ref() else {
            return Err(BusError::NothingToRequeue { handle: self.id.0 }.into());
        };
        if self.state == HandleState::Running {
            return Err(BusError::HandleBusy { handle: self.id.0 }.into());
        }

        debug!(handle = %self.id, role = %request.role, "requeueing request");
        self.bus.start(self.id, request).await?;
        self.state = HandleState::Running;
        Ok(())
    }

    /// Forget the last request and its buffered packages
    ///
    /// # Errors
    ///
    /// Fails with `HandleBusy` while a request is running.
    pub fn reset(&mut self) -> Result<(), Error> {
        if self.state == HandleState::Running {
            return Err(BusError::HandleBusy { handle: self.id.0 }.into());
        }
        self.state = HandleState::Fresh;
        self.request = None;
        self.packages.clear();
        Ok(())
    }

    /// Cancel the running request; a no-op on an idle handle
    ///
    /// # Errors
    ///
    /// Returns the bus error if the service rejects the cancel.
    pub async fn cancel(&self) -> Result<(), Error> {
        if self.state != HandleState::Running {
            return Ok(());
        }
        self.bus.cancel(self.id).await
    }

    /// Wait for the next event on this handle
    ///
    /// Returns `None` once the transport has dropped the stream.
    pub async fn next_event(&mut self) -> Option<ServiceEvent> {
        let event = self.events.recv().await?;
        self.observe(&event);
        Some(event)
    }

    fn observe(&mut self, event: &ServiceEvent) {
        match event {
            ServiceEvent::Package(item) => self.packages.push(item.clone()),
            ServiceEvent::Finished { exit, .. } => self.state = HandleState::Finished(*exit),
            _ => {}
        }
    }

    /// Drain events until the current run finishes
    ///
    /// Used for lookups whose only output is the package buffer.
    ///
    /// # Errors
    ///
    /// Returns `Disconnected` if the service goes away before finishing.
    pub async fn wait_finished(&mut self) -> Result<ExitReason, Error> {
        if let HandleState::Finished(exit) = self.state {
            return Ok(exit);
        }
        while let Some(event) = self.next_event().await {
            match event {
                ServiceEvent::Finished { exit, .. } => return Ok(exit),
                ServiceEvent::ConnectionChanged { connected: false } => {
                    return Err(BusError::Disconnected.into());
                }
                ServiceEvent::ErrorCode { code, details } => {
                    warn!(handle = %self.id, %code, %details, "lookup reported an error");
                }
                _ => {}
            }
        }
        Err(BusError::Disconnected.into())
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        self.bus.release(self.id);
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("request", &self.request)
            .field("packages", &self.packages.len())
            .finish_non_exhaustive()
    }
}
