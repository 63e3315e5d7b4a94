//! In-process service double
//!
//! Each `start` pops the next scripted event sequence for the request's
//! role and pushes it into the handle's stream at once. Roles without a
//! script finish successfully with no other output. Every call is recorded
//! so tests can assert on exactly what the client asked for.

use crate::{EventChannel, HandleId};
use async_trait::async_trait;
use pkc_errors::{BusError, Error};
use pkc_events::{EventEmitter, EventReceiver, EventSender, ServiceEvent};
use pkc_types::{Capabilities, ExitReason, NetworkState, OperationRequest, Role, RoleSet};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// A call the client made on the bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusCall {
    Capabilities,
    NetworkState,
    Open { handle: HandleId },
    Start { handle: HandleId, request: OperationRequest },
    Cancel { handle: HandleId },
    TimeSinceAction { role: Role },
    Release { handle: HandleId },
}

struct Slot {
    sender: EventSender,
    running: bool,
}

struct Inner {
    capabilities: Capabilities,
    network: NetworkState,
    scripts: HashMap<Role, VecDeque<Vec<ServiceEvent>>>,
    start_failures: HashMap<Role, BusError>,
    time_since: HashMap<Role, Duration>,
    handles: HashMap<HandleId, Slot>,
    next_handle: u64,
    calls: Vec<BusCall>,
    connected: bool,
}

pub struct MemoryBus {
    inner: Mutex<Inner>,
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::new(Capabilities {
            roles: RoleSet::all(),
            ..Capabilities::default()
        })
    }
}

impl MemoryBus {
    #[must_use]
    pub fn new(capabilities: Capabilities) -> Self {
        Self {
            inner: Mutex::new(Inner {
                capabilities,
                network: NetworkState::Online,
                scripts: HashMap::new(),
                start_failures: HashMap::new(),
                time_since: HashMap::new(),
                handles: HashMap::new(),
                next_handle: 1,
                calls: Vec::new(),
                connected: true,
            }),
        }
    }

    /// Service advertising only the given roles
    #[must_use]
    pub fn with_roles(roles: impl IntoIterator<Item = Role>) -> Self {
        Self::new(Capabilities::with_roles(roles))
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // a panic while holding the lock only happens in a failing test
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Queue the events delivered by the next `start` of `role`
    pub fn script(&self, role: Role, events: Vec<ServiceEvent>) {
        self.lock()
            .scripts
            .entry(role)
            .or_default()
            .push_back(events);
    }

    pub fn set_network(&self, state: NetworkState) {
        self.lock().network = state;
    }

    pub fn set_time_since(&self, role: Role, elapsed: Duration) {
        self.lock().time_since.insert(role, elapsed);
    }

    /// Make every `start` of `role` fail with `error`
    pub fn fail_start(&self, role: Role, error: BusError) {
        self.lock().start_failures.insert(role, error);
    }

    /// Drop the connection: every open handle sees `ConnectionChanged`
    /// and later calls fail with `Disconnected`
    pub fn disconnect(&self) {
        let mut inner = self.lock();
        inner.connected = false;
        for slot in inner.handles.values() {
            slot.sender.emit_disconnected();
        }
    }

    #[must_use]
    pub fn calls(&self) -> Vec<BusCall> {
        self.lock().calls.clone()
    }

    /// Requests issued through `start`, in order
    #[must_use]
    pub fn started(&self) -> Vec<OperationRequest> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                BusCall::Start { request, .. } => Some(request.clone()),
                _ => None,
            })
            .collect()
    }

    /// Push `event` into an open handle's stream outside any script
    ///
    /// A terminal event marks the handle idle, as if the service had
    /// finished the run.
    pub fn emit(&self, handle: HandleId, event: ServiceEvent) {
        let mut inner = self.lock();
        if let Some(slot) = inner.handles.get_mut(&handle) {
            if event.is_terminal() {
                slot.running = false;
            }
            slot.sender.emit(event);
        }
    }

    /// Handles `start` was called on, in order
    #[must_use]
    pub fn started_handles(&self) -> Vec<HandleId> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                BusCall::Start { handle, .. } => Some(*handle),
                _ => None,
            })
            .collect()
    }

    /// Handles the client let go of, in order
    #[must_use]
    pub fn released(&self) -> Vec<HandleId> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                BusCall::Release { handle } => Some(*handle),
                _ => None,
            })
            .collect()
    }

    /// Handles `cancel` was called on, in order
    #[must_use]
    pub fn cancelled(&self) -> Vec<HandleId> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                BusCall::Cancel { handle } => Some(*handle),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: BusCall) -> Result<MutexGuard<'_, Inner>, Error> {
        let mut inner = self.lock();
        if !inner.connected {
            return Err(BusError::Disconnected.into());
        }
        inner.calls.push(call);
        Ok(inner)
    }
}

#[async_trait]
impl EventChannel for MemoryBus {
    async fn capabilities(&self) -> Result<Capabilities, Error> {
        let inner = self.record(BusCall::Capabilities)?;
        Ok(inner.capabilities.clone())
    }

    async fn network_state(&self) -> Result<NetworkState, Error> {
        let inner = self.record(BusCall::NetworkState)?;
        Ok(inner.network)
    }

    async fn open(&self) -> Result<(HandleId, EventReceiver), Error> {
        let mut inner = self.lock();
        if !inner.connected {
            return Err(BusError::Disconnected.into());
        }
        let handle = HandleId(inner.next_handle);
        inner.next_handle += 1;
        let (sender, receiver) = pkc_events::channel();
        inner.handles.insert(
            handle,
            Slot {
                sender,
                running: false,
            },
        );
        inner.calls.push(BusCall::Open { handle });
        Ok((handle, receiver))
    }

    async fn start(&self, handle: HandleId, request: &OperationRequest) -> Result<(), Error> {
        let mut inner = self.record(BusCall::Start {
            handle,
            request: request.clone(),
        })?;
        if let Some(error) = inner.start_failures.get(&request.role) {
            return Err(error.clone().into());
        }

        let events = inner
            .scripts
            .get_mut(&request.role)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| vec![ServiceEvent::finished(ExitReason::Success, Duration::ZERO)]);
        let finishes = events.iter().any(ServiceEvent::is_terminal);

        let slot = inner
            .handles
            .get_mut(&handle)
            .ok_or(BusError::HandleClosed { handle: handle.0 })?;
        for event in events {
            slot.sender.emit(event);
        }
        slot.running = !finishes;
        Ok(())
    }

    async fn cancel(&self, handle: HandleId) -> Result<(), Error> {
        let mut inner = self.record(BusCall::Cancel { handle })?;
        if let Some(slot) = inner.handles.get_mut(&handle) {
            if slot.running {
                slot.running = false;
                slot.sender
                    .emit_finished(ExitReason::Cancelled, Duration::ZERO);
            }
        }
        Ok(())
    }

    async fn time_since_action(&self, role: Role) -> Result<Duration, Error> {
        let inner = self.record(BusCall::TimeSinceAction { role })?;
        Ok(inner.time_since.get(&role).copied().unwrap_or_default())
    }

    fn release(&self, handle: HandleId) {
        let mut inner = self.lock();
        if inner.handles.remove(&handle).is_some() {
            inner.calls.push(BusCall::Release { handle });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkc_types::{FilterSet, InfoKind, PackageId, PackageItem};

    fn package(id: &str) -> ServiceEvent {
        ServiceEvent::Package(PackageItem {
            info: InfoKind::Available,
            package_id: PackageId::parse(id).unwrap(),
            summary: String::new(),
        })
    }

    #[tokio::test]
    async fn test_scripts_replay_in_order_per_role() {
        let bus = MemoryBus::default();
        bus.script(Role::Resolve, vec![package("a;1;noarch;x")]);
        bus.script(Role::Resolve, vec![package("b;1;noarch;x")]);

        let (handle, mut events) = bus.open().await.unwrap();
        let request = OperationRequest::resolve(FilterSet::none(), "a");
        bus.start(handle, &request).await.unwrap();
        bus.start(handle, &request).await.unwrap();

        assert_eq!(events.recv().await, Some(package("a;1;noarch;x")));
        assert_eq!(events.recv().await, Some(package("b;1;noarch;x")));
        assert_eq!(bus.started().len(), 2);
    }

    #[tokio::test]
    async fn test_unscripted_role_finishes_successfully() {
        let bus = MemoryBus::default();
        let (handle, mut events) = bus.open().await.unwrap();
        bus.start(handle, &OperationRequest::refresh(false)).await.unwrap();
        assert!(matches!(
            events.recv().await,
            Some(ServiceEvent::Finished {
                exit: ExitReason::Success,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_cancel_only_finishes_running_handles() {
        let bus = MemoryBus::default();
        bus.script(Role::UpdateSystem, vec![package("a;1;noarch;x")]);
        let (handle, mut events) = bus.open().await.unwrap();
        bus.start(handle, &OperationRequest::update_system()).await.unwrap();
        assert!(matches!(events.recv().await, Some(ServiceEvent::Package(_))));

        bus.cancel(handle).await.unwrap();
        bus.cancel(handle).await.unwrap();
        assert!(matches!(
            events.recv().await,
            Some(ServiceEvent::Finished {
                exit: ExitReason::Cancelled,
                ..
            })
        ));
        assert!(events.try_recv().is_err());
        assert_eq!(bus.cancelled(), vec![handle, handle]);
    }

    #[tokio::test]
    async fn test_disconnect_notifies_handles_and_fails_calls() {
        let bus = MemoryBus::default();
        let (_, mut events) = bus.open().await.unwrap();
        bus.disconnect();
        assert_eq!(
            events.recv().await,
            Some(ServiceEvent::ConnectionChanged { connected: false })
        );
        assert!(bus.capabilities().await.unwrap_err().is_disconnect());
    }

    #[tokio::test]
    async fn test_released_handle_is_forgotten() {
        let bus = MemoryBus::default();
        let (handle, mut events) = bus.open().await.unwrap();
        bus.release(handle);
        bus.release(handle);
        assert_eq!(bus.released(), vec![handle]);

        bus.emit(handle, ServiceEvent::ConnectionChanged { connected: true });
        assert!(events.try_recv().is_err());
        assert!(bus.start(handle, &OperationRequest::refresh(false)).await.is_err());
    }
}
