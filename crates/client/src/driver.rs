//! The event loop of one transaction
//!
//! [`TransactionDriver`] issues the primary request and then waits on the
//! primary handle, the signature handle and the pulse timer at once. Every
//! handler runs on that single loop, so console output, prompts and
//! remediation state never interleave.
//!
//! The loop ends on the first terminal event of the primary handle, except
//! when the run finished with `key-required` while an accepted key is still
//! being installed: the driver then waits for the key, resubmits the same
//! request and reports the terminal event of that second run instead.

use crate::context::TransactionContext;
use crate::logging::log_event;
use crate::remediation::RemediationCoordinator;
use pkc_bus::Channel;
use pkc_errors::{Error, TransactionError, UserFacingError};
use pkc_events::ServiceEvent;
use pkc_types::{ErrorKind, ExitReason, OperationRequest, RestartKind};
use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, warn};

/// How a transaction ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The primary handle reported a terminal event
    Finished(ExitReason),
    /// The request was issued and not waited for
    Detached,
}

impl Outcome {
    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(self, Self::Finished(ExitReason::Success) | Self::Detached)
    }

    #[must_use]
    pub fn exit(self) -> Option<ExitReason> {
        match self {
            Self::Finished(exit) => Some(exit),
            Self::Detached => None,
        }
    }
}

enum Step {
    Continue,
    Done(ExitReason),
}

pub struct TransactionDriver<'a> {
    ctx: &'a mut TransactionContext,
    primary: Channel,
    remediation: RemediationCoordinator,
    pulse: Option<Interval>,
    restart: RestartKind,
    deferred: Option<ExitReason>,
    /// Trust failure held back while a key import was pending
    withheld: Option<(ErrorKind, String)>,
}

impl<'a> TransactionDriver<'a> {
    #[must_use]
    pub fn new(ctx: &'a mut TransactionContext, primary: Channel) -> Self {
        Self {
            ctx,
            primary,
            remediation: RemediationCoordinator::new(),
            pulse: None,
            restart: RestartKind::None,
            deferred: None,
            withheld: None,
        }
    }

    /// Driver on a freshly opened primary handle
    ///
    /// # Errors
    ///
    /// Returns an error if the service refuses to open a handle.
    pub async fn open(ctx: &'a mut TransactionContext) -> Result<Self, Error> {
        let primary = ctx.open_channel().await?;
        Ok(Self::new(ctx, primary))
    }

    #[must_use]
    pub fn primary(&self) -> &Channel {
        &self.primary
    }

    #[must_use]
    pub fn remediation(&self) -> &RemediationCoordinator {
        &self.remediation
    }

    /// Issue `request` and wait for its outcome
    ///
    /// # Errors
    ///
    /// Returns the start error (unsupported, offline, bus), output and
    /// prompt errors, and `RemoteDisconnect` if the service goes away
    /// before the transaction ends.
    pub async fn run(mut self, request: OperationRequest) -> Result<Outcome, Error> {
        self.primary.start(request).await?;
        if self.ctx.nowait {
            debug!(handle = %self.primary.id(), "not waiting for the transaction");
            return Ok(Outcome::Detached);
        }
        let result = self.drive().await;
        self.release();
        result
    }

    async fn drive(&mut self) -> Result<Outcome, Error> {
        loop {
            let step = tokio::select! {
                biased;
                event = self.primary.next_event() => self.on_primary(event).await?,
                event = self.remediation.next_event() => {
                    self.remediation.on_signature_event(self.ctx, event)?;
                    Step::Continue
                }
                () = next_tick(&mut self.pulse) => {
                    self.ctx.console.tick()?;
                    Step::Continue
                }
            };
            self.sync_pulse();

            if let Step::Done(exit) = step {
                return self.finish(exit);
            }
            if self.remediation.ready_to_requeue(&self.primary) {
                if let Err(e) = self.remediation.requeue(&mut self.primary).await {
                    self.ctx.console.failure(&e.user_message())?;
                    let exit = self
                        .deferred
                        .take()
                        .or_else(|| self.primary.exit())
                        .unwrap_or(ExitReason::KeyRequired);
                    return self.finish(exit);
                }
                self.deferred = None;
                self.withheld = None;
            } else if !self.remediation.requeue_pending() {
                if let Some(exit) = self.deferred.take() {
                    return self.finish(exit);
                }
            }
        }
    }

    /// End the loop, reporting a trust failure no requeue will fix
    fn finish(&mut self, exit: ExitReason) -> Result<Outcome, Error> {
        if let Some((code, details)) = self.withheld.take() {
            self.ctx.console.error_code(code, &details)?;
        }
        Ok(Outcome::Finished(exit))
    }

    async fn on_primary(&mut self, event: Option<ServiceEvent>) -> Result<Step, Error> {
        let Some(event) = event else {
            return self.disconnected();
        };
        log_event(self.primary.id(), &event);

        let console = &mut self.ctx.console;
        match event {
            ServiceEvent::Package(item) => console.package(self.primary.role(), &item)?,
            ServiceEvent::Progress(snapshot) => console.progress(snapshot)?,
            ServiceEvent::RepoSignatureRequired(sig) => {
                let role = self.primary.role();
                self.remediation
                    .on_signature_required(self.ctx, &sig, role)
                    .await?;
            }
            ServiceEvent::EulaRequired(eula) => {
                self.remediation.on_eula_required(self.ctx, &eula)?;
            }
            ServiceEvent::UpdateDetail(detail) => console.update_detail(&detail)?,
            ServiceEvent::Description(description) => console.description(&description)?,
            ServiceEvent::Files(files) => console.files(&files)?,
            ServiceEvent::RepoDetail(repo) => console.repo_detail(&repo)?,
            ServiceEvent::Transaction(meta) => console.transaction(&meta)?,
            ServiceEvent::ErrorCode { code, details } => {
                if code.is_trust_failure() && self.remediation.requeue_pending() {
                    debug!(%code, "key import pending, not reporting");
                    self.withheld = Some((code, details));
                } else {
                    console.error_code(code, &details)?;
                }
            }
            ServiceEvent::RequireRestart { restart, .. } => {
                self.restart = self.restart.max(restart);
            }
            ServiceEvent::Finished { exit, runtime_ms } => {
                console.finished(
                    self.primary.role(),
                    Duration::from_millis(runtime_ms),
                    self.restart,
                )?;
                if exit == ExitReason::KeyRequired && self.remediation.requeue_pending() {
                    debug!("waiting for the key before requeueing");
                    self.deferred = Some(exit);
                } else {
                    return Ok(Step::Done(exit));
                }
            }
            ServiceEvent::ConnectionChanged { connected: false } => return self.disconnected(),
            ServiceEvent::ConnectionChanged { connected: true } => {}
        }
        Ok(Step::Continue)
    }

    fn disconnected(&mut self) -> Result<Step, Error> {
        warn!(handle = %self.primary.id(), "service went away mid transaction");
        self.pulse = None;
        self.ctx.console.end_line()?;
        Err(TransactionError::RemoteDisconnect.into())
    }

    /// Run the pulse timer exactly while the console shows a pulse
    fn sync_pulse(&mut self) {
        match (self.ctx.console.is_pulsing(), self.pulse.is_some()) {
            (true, false) => {
                let period = self.ctx.pulse_interval.max(Duration::from_millis(1));
                let mut interval = interval_at(Instant::now() + period, period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
                self.pulse = Some(interval);
            }
            (false, true) => self.pulse = None,
            _ => {}
        }
    }

    fn release(&self) {
        self.ctx.cancellation.unregister(self.primary.id());
        if let Some(handle) = self.remediation.signature_handle() {
            self.ctx.cancellation.unregister(handle);
        }
    }
}

async fn next_tick(pulse: &mut Option<Interval>) {
    match pulse {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

impl std::fmt::Debug for TransactionDriver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionDriver")
            .field("primary", &self.primary)
            .field("remediation", &self.remediation)
            .field("pulsing", &self.pulse.is_some())
            .field("restart", &self.restart)
            .field("deferred", &self.deferred)
            .field("withheld", &self.withheld)
            .finish_non_exhaustive()
    }
}
