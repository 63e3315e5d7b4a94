//! Unix socket transport
//!
//! Frames are single lines of JSON. The client sends
//! `{"id":N,"call":{"method":...}}` and the service answers with
//! `{"type":"reply","id":N,"result":...}` or
//! `{"type":"reply","id":N,"error":{"name":...,"message":...}}`.
//! Events arrive unsolicited as `{"type":"signal","handle":H,"event":{...}}`.

use crate::{EventChannel, HandleId};
use async_trait::async_trait;
use pkc_errors::{BusError, Error};
use pkc_events::{EventEmitter, EventReceiver, EventSender, ServiceEvent};
use pkc_types::{Capabilities, NetworkState, OperationRequest, Role};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Outbound call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "kebab-case")]
pub enum Call {
    Capabilities,
    NetworkState,
    Open,
    Start {
        handle: HandleId,
        request: OperationRequest,
    },
    Cancel {
        handle: HandleId,
    },
    TimeSinceAction {
        role: Role,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub id: u64,
    pub call: Call,
}

/// Error raised by the service for a call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFault {
    pub name: String,
    #[serde(default)]
    pub message: String,
}

/// Inbound frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Frame {
    Reply {
        id: u64,
        #[serde(default)]
        result: serde_json::Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<RemoteFault>,
    },
    Signal {
        handle: HandleId,
        event: ServiceEvent,
    },
}

#[derive(Debug, Deserialize)]
struct Opened {
    handle: HandleId,
}

#[derive(Debug, Deserialize)]
struct Elapsed {
    seconds: u64,
}

type ReplySender = oneshot::Sender<Result<serde_json::Value, BusError>>;

#[derive(Default)]
struct Shared {
    pending: Mutex<HashMap<u64, ReplySender>>,
    handles: Mutex<HashMap<HandleId, EventSender>>,
    closed: AtomicBool,
}

impl Shared {
    fn pending(&self) -> MutexGuard<'_, HashMap<u64, ReplySender>> {
        self.pending
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn handles(&self) -> MutexGuard<'_, HashMap<HandleId, EventSender>> {
        self.handles
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Stop routing signals for `handle`; false if it was not routed
    fn forget(&self, handle: HandleId) -> bool {
        self.handles().remove(&handle).is_some()
    }

    fn dispatch(&self, frame: Frame) {
        match frame {
            Frame::Reply { id, result, error } => {
                let Some(reply) = self.pending().remove(&id) else {
                    warn!(id, "reply for unknown call");
                    return;
                };
                let outcome = match error {
                    Some(fault) => Err(BusError::Remote {
                        name: fault.name,
                        message: fault.message,
                    }),
                    None => Ok(result),
                };
                let _ = reply.send(outcome);
            }
            Frame::Signal { handle, event } => match self.handles().get(&handle) {
                Some(sender) => sender.emit(event),
                None => debug!(%handle, kind = event.kind(), "signal for unknown handle"),
            },
        }
    }

    /// Mark the connection dead and tell every handle
    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        // dropping the senders wakes every waiting caller with Disconnected
        self.pending().clear();
        for sender in self.handles().values() {
            sender.emit_disconnected();
        }
    }
}

/// Client connection to the package service
pub struct SocketBus {
    writer: tokio::sync::Mutex<OwnedWriteHalf>,
    next_id: AtomicU64,
    shared: Arc<Shared>,
    reader: JoinHandle<()>,
}

impl SocketBus {
    /// Connect to the service socket
    ///
    /// # Errors
    ///
    /// Returns `ConnectionFailed` if the socket cannot be reached.
    pub async fn connect(path: &Path) -> Result<Self, Error> {
        let stream = UnixStream::connect(path)
            .await
            .map_err(|e| BusError::ConnectionFailed {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        debug!(path = %path.display(), "connected to service");
        Ok(Self::from_stream(stream))
    }

    /// Wrap an already connected stream
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn from_stream(stream: UnixStream) -> Self {
        let (read_half, write_half) = stream.into_split();
        let shared = Arc::new(Shared::default());
        let reader = tokio::spawn(read_frames(read_half, Arc::clone(&shared)));
        Self {
            writer: tokio::sync::Mutex::new(write_half),
            next_id: AtomicU64::new(1),
            shared,
            reader,
        }
    }

    async fn call<T: DeserializeOwned>(&self, call: Call) -> Result<T, Error> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.shared.pending();
            if self.shared.closed.load(Ordering::SeqCst) {
                return Err(BusError::Disconnected.into());
            }
            pending.insert(id, tx);
        }

        let mut line = serde_json::to_string(&Request { id, call })?;
        line.push('\n');
        {
            let mut writer = self.writer.lock().await;
            if let Err(e) = writer.write_all(line.as_bytes()).await {
                debug!(error = %e, "write to service failed");
                self.shared.pending().remove(&id);
                self.shared.close();
                return Err(BusError::Disconnected.into());
            }
        }

        let value = rx.await.map_err(|_| BusError::Disconnected)??;
        serde_json::from_value(value).map_err(Into::into)
    }
}

async fn read_frames(read_half: OwnedReadHalf, shared: Arc<Shared>) {
    let mut lines = BufReader::new(read_half).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim().is_empty() => {}
            Ok(Some(line)) => match serde_json::from_str::<Frame>(&line) {
                Ok(frame) => shared.dispatch(frame),
                Err(e) => warn!(error = %e, "dropping malformed frame"),
            },
            Ok(None) => {
                debug!("service closed the connection");
                break;
            }
            Err(e) => {
                warn!(error = %e, "reading from service failed");
                break;
            }
        }
    }
    shared.close();
}

impl Drop for SocketBus {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

#[async_trait]
impl EventChannel for SocketBus {
    async fn capabilities(&self) -> Result<Capabilities, Error> {
        self.call(Call::Capabilities).await
    }

    async fn network_state(&self) -> Result<NetworkState, Error> {
        self.call(Call::NetworkState).await
    }

    async fn open(&self) -> Result<(HandleId, EventReceiver), Error> {
        let opened: Opened = self.call(Call::Open).await?;
        let (sender, receiver) = pkc_events::channel();
        let mut handles = self.shared.handles();
        // close() flips the flag before it walks the handles
        if self.shared.closed.load(Ordering::SeqCst) {
            return Err(BusError::Disconnected.into());
        }
        handles.insert(opened.handle, sender);
        Ok((opened.handle, receiver))
    }

    async fn start(&self, handle: HandleId, request: &OperationRequest) -> Result<(), Error> {
        self.call::<serde_json::Value>(Call::Start {
            handle,
            request: request.clone(),
        })
        .await
        .map(drop)
    }

    async fn cancel(&self, handle: HandleId) -> Result<(), Error> {
        self.call::<serde_json::Value>(Call::Cancel { handle })
            .await
            .map(drop)
    }

    async fn time_since_action(&self, role: Role) -> Result<Duration, Error> {
        let elapsed: Elapsed = self.call(Call::TimeSinceAction { role }).await?;
        Ok(Duration::from_secs(elapsed.seconds))
    }

    fn release(&self, handle: HandleId) {
        if self.shared.forget(handle) {
            debug!(%handle, "released handle");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_frame_shape() {
        let line = serde_json::to_string(&Request {
            id: 3,
            call: Call::Cancel {
                handle: HandleId(7),
            },
        })
        .unwrap();
        assert_eq!(line, r#"{"id":3,"call":{"method":"cancel","handle":7}}"#);
    }

    #[test]
    fn test_reply_frames() {
        let frame: Frame =
            serde_json::from_str(r#"{"type":"reply","id":1,"result":{"handle":4}}"#).unwrap();
        assert!(matches!(frame, Frame::Reply { id: 1, error: None, .. }));

        let frame: Frame = serde_json::from_str(
            r#"{"type":"reply","id":2,"error":{"name":"org.freedesktop.packagekit.denied","message":"no"}}"#,
        )
        .unwrap();
        let Frame::Reply { error: Some(fault), .. } = frame else {
            panic!("expected a fault");
        };
        assert_eq!(fault.name, "org.freedesktop.packagekit.denied");
    }

    #[test]
    fn test_signal_frame() {
        let frame: Frame = serde_json::from_str(
            r#"{"type":"signal","handle":4,"event":{"event":"connection-changed","connected":true}}"#,
        )
        .unwrap();
        assert_eq!(
            frame,
            Frame::Signal {
                handle: HandleId(4),
                event: ServiceEvent::ConnectionChanged { connected: true },
            }
        );
    }

    #[test]
    fn test_forgotten_handle_gets_no_signals() {
        let shared = Shared::default();
        let (sender, mut events) = pkc_events::channel();
        shared.handles().insert(HandleId(4), sender);
        let signal = || Frame::Signal {
            handle: HandleId(4),
            event: ServiceEvent::ConnectionChanged { connected: true },
        };

        shared.dispatch(signal());
        assert!(events.try_recv().is_ok());

        assert!(shared.forget(HandleId(4)));
        assert!(!shared.forget(HandleId(4)));
        shared.dispatch(signal());
        assert!(shared.handles().is_empty());
        assert!(events.try_recv().is_err());
    }
}
