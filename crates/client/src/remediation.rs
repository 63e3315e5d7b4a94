//! Recovering from trust and consent failures mid-transaction
//!
//! When the service needs a repository key, the user is asked whether to
//! import it. An accepted key is installed on a separate signature handle;
//! once that succeeds and the primary run has finished, a primary request
//! that changes the system is resubmitted unchanged. Queries keep their
//! failure. Licence agreements are shown and answered but never lead to a
//! requeue.

use crate::context::TransactionContext;
use pkc_bus::{Channel, HandleId};
use pkc_errors::{Error, TransactionError};
use pkc_events::{EulaRequired, ServiceEvent, SignatureRequired};
use pkc_types::{ExitReason, OperationRequest, Role};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemediationState {
    /// Nothing asked of the user yet
    Active,
    /// A key was accepted and is being installed; a mutating primary
    /// request is requeued once `key_installed` is set and its run is over
    RemediationRequested { key_installed: bool },
    /// The primary request was resubmitted
    Requeued,
    /// The user declined or the key could not be installed
    Done,
}

#[derive(Debug)]
pub struct RemediationCoordinator {
    signature: Option<Channel>,
    state: RemediationState,
    requeue_allowed: bool,
}

impl Default for RemediationCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl RemediationCoordinator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            signature: None,
            state: RemediationState::Active,
            requeue_allowed: false,
        }
    }

    #[must_use]
    pub fn state(&self) -> RemediationState {
        self.state
    }

    /// Whether a requeue is still expected
    #[must_use]
    pub fn requeue_pending(&self) -> bool {
        self.requeue_allowed && self.installing()
    }

    fn installing(&self) -> bool {
        matches!(self.state, RemediationState::RemediationRequested { .. })
    }

    #[must_use]
    pub fn signature_handle(&self) -> Option<HandleId> {
        self.signature.as_ref().map(Channel::id)
    }

    /// The key is in and the primary run is over
    #[must_use]
    pub fn ready_to_requeue(&self, primary: &Channel) -> bool {
        self.state == RemediationState::RemediationRequested { key_installed: true }
            && !primary.is_running()
    }

    /// Show the key and install it if the user agrees
    ///
    /// `primary_role` decides whether the primary request is resubmitted
    /// once the key is in.
    ///
    /// # Errors
    ///
    /// Returns prompt and output errors. A key that cannot be submitted is
    /// reported and leaves the primary failure in place.
    pub async fn on_signature_required(
        &mut self,
        ctx: &mut TransactionContext,
        sig: &SignatureRequired,
        primary_role: Option<Role>,
    ) -> Result<(), Error> {
        ctx.console.signature_required(sig)?;
        if !ctx.prompt.confirm("Okay to import key?", false)? {
            ctx.console.line("Did not import key, task will fail")?;
            self.state = RemediationState::Done;
            return Ok(());
        }

        let request =
            OperationRequest::install_signature(sig.sig_type, &sig.key_id, sig.package_id.clone());
        if let Err(e) = self.install(ctx, request).await {
            warn!(key_id = %sig.key_id, error = %e, "failed to install signature");
            ctx.console
                .failure(&format!("Failed to install signature: {e}"))?;
            self.state = RemediationState::Done;
            return Ok(());
        }
        self.requeue_allowed = primary_role.is_some_and(Role::is_mutating);
        debug!(key_id = %sig.key_id, requeue = self.requeue_allowed, "installing signature");
        self.state = RemediationState::RemediationRequested {
            key_installed: false,
        };
        Ok(())
    }

    async fn install(
        &mut self,
        ctx: &TransactionContext,
        request: OperationRequest,
    ) -> Result<(), Error> {
        let channel = match self.signature.take() {
            Some(mut channel) => {
                channel.reset()?;
                channel
            }
            None => ctx.open_channel().await?,
        };
        self.signature.insert(channel).start(request).await
    }

    /// Show a licence and record the answer
    ///
    /// # Errors
    ///
    /// Returns prompt and output errors.
    pub fn on_eula_required(
        &mut self,
        ctx: &mut TransactionContext,
        eula: &EulaRequired,
    ) -> Result<(), Error> {
        ctx.console.eula_required(eula)?;
        if ctx.prompt.confirm("Do you agree?", false)? {
            debug!(eula_id = %eula.eula_id, "licence accepted");
            ctx.console.line("Importing licences is not yet supported!")?;
        } else {
            ctx.console.line("Did not agree to licence, task will fail")?;
        }
        Ok(())
    }

    /// Next event on the signature handle; pending while there is none
    pub async fn next_event(&mut self) -> Option<ServiceEvent> {
        match self.signature.as_mut() {
            Some(channel) => channel.next_event().await,
            None => std::future::pending().await,
        }
    }

    /// Apply an event from the signature handle
    ///
    /// # Errors
    ///
    /// Returns `RemoteDisconnect` when the service went away, and output
    /// errors.
    pub fn on_signature_event(
        &mut self,
        ctx: &mut TransactionContext,
        event: Option<ServiceEvent>,
    ) -> Result<(), Error> {
        let Some(event) = event else {
            return Err(TransactionError::RemoteDisconnect.into());
        };
        match event {
            ServiceEvent::Finished { exit, .. } => self.signature_finished(ctx, exit)?,
            ServiceEvent::ErrorCode { code, details } => ctx.console.error_code(code, &details)?,
            ServiceEvent::ConnectionChanged { connected: false } => {
                return Err(TransactionError::RemoteDisconnect.into());
            }
            other => debug!(kind = other.kind(), "ignoring signature handle event"),
        }
        Ok(())
    }

    fn signature_finished(
        &mut self,
        ctx: &mut TransactionContext,
        exit: ExitReason,
    ) -> Result<(), Error> {
        if !self.installing() {
            return Ok(());
        }
        if exit.is_success() && !self.requeue_allowed {
            debug!("signature installed, query is not resubmitted");
            self.state = RemediationState::Done;
        } else if exit.is_success() {
            debug!("signature installed");
            self.state = RemediationState::RemediationRequested {
                key_installed: true,
            };
        } else {
            warn!(%exit, "signature install did not succeed");
            ctx.console
                .failure(&format!("Failed to install signature: {exit}"))?;
            self.state = RemediationState::Done;
        }
        Ok(())
    }

    /// Resubmit the primary request
    ///
    /// # Errors
    ///
    /// Returns `RequeueFailed` if the service refuses the resubmission.
    pub async fn requeue(&mut self, primary: &mut Channel) -> Result<(), Error> {
        debug!(handle = %primary.id(), "trying to requeue");
        self.state = RemediationState::Requeued;
        primary.requeue().await.map_err(|e| {
            warn!(error = %e, "failed to requeue action");
            TransactionError::RequeueFailed {
                message: e.to_string(),
            }
            .into()
        })
    }
}
