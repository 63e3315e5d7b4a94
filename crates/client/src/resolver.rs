//! Turning what the user typed into a canonical package id
//!
//! Lookups run on a dedicated handle that is opened on first use and reset
//! between requests. A canonical id is returned as is without touching the
//! bus.

use crate::context::TransactionContext;
use pkc_bus::Channel;
use pkc_errors::{BusError, Error, ResolveError};
use pkc_types::{FilterSet, OperationRequest, PackageId, PackageItem, ProvidesKind};
use tracing::debug;

const PICK_QUESTION: &str = "Please enter the package number: ";

#[derive(Debug, Default)]
pub struct Resolver {
    lookup: Option<Channel>,
}

impl Resolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle used for lookups, if one was opened
    #[must_use]
    pub fn lookup(&self) -> Option<&Channel> {
        self.lookup.as_ref()
    }

    /// Resolve `raw` to exactly one package
    ///
    /// Tries an exact name match first and falls back to a provider lookup
    /// when nothing matches. Several candidates are listed and the user
    /// picks one.
    ///
    /// # Errors
    ///
    /// Returns `ResolveUnsupported` or `ProvidesUnsupported` when the
    /// service lacks the lookup, `NoMatch` when both lookups come back
    /// empty, and prompt or bus errors otherwise.
    pub async fn resolve(
        &mut self,
        ctx: &mut TransactionContext,
        raw: &str,
        filters: FilterSet,
    ) -> Result<PackageId, Error> {
        if let Ok(id) = PackageId::parse(raw) {
            debug!(%id, "input is already canonical");
            return Ok(id);
        }

        let request = OperationRequest::resolve(filters.clone(), raw);
        let mut candidates = self
            .run(ctx, request)
            .await
            .map_err(|e| unsupported_as(e, ResolveError::ResolveUnsupported))?;

        if candidates.is_empty() {
            debug!(input = raw, "no exact match, trying providers");
            let request = OperationRequest::what_provides(filters, ProvidesKind::Any, raw);
            candidates = self
                .run(ctx, request)
                .await
                .map_err(|e| unsupported_as(e, ResolveError::ProvidesUnsupported))?;
        }

        match candidates.as_slice() {
            [] => Err(ResolveError::NoMatch {
                input: raw.to_string(),
            }
            .into()),
            [only] => Ok(only.package_id.clone()),
            many => {
                ctx.console.multiple_matches(many)?;
                let picked = ctx.prompt.select_number(PICK_QUESTION, many.len())?;
                let item = many
                    .get(picked.wrapping_sub(1))
                    .ok_or_else(|| Error::internal(format!("prompt returned {picked}")))?;
                debug!(package_id = %item.package_id, "picked candidate");
                Ok(item.package_id.clone())
            }
        }
    }

    /// Installed packages that depend on `package_id`, recursively
    ///
    /// # Errors
    ///
    /// Returns `RequiresUnsupported` when the service cannot look up
    /// reverse dependencies, or the bus error.
    pub async fn requires(
        &mut self,
        ctx: &mut TransactionContext,
        package_id: &PackageId,
    ) -> Result<Vec<PackageItem>, Error> {
        debug!(%package_id, "getting installed requires");
        let request = OperationRequest::get_requires(FilterSet::installed(), package_id.clone(), true);
        self.run(ctx, request)
            .await
            .map_err(|e| unsupported_as(e, ResolveError::RequiresUnsupported))
    }

    async fn run(
        &mut self,
        ctx: &TransactionContext,
        request: OperationRequest,
    ) -> Result<Vec<PackageItem>, Error> {
        let lookup = match self.lookup.take() {
            Some(mut lookup) => {
                lookup.reset()?;
                lookup
            }
            None => ctx.open_channel().await?,
        };
        let lookup = self.lookup.insert(lookup);
        lookup.start(request).await?;
        let exit = lookup.wait_finished().await?;
        debug!(handle = %lookup.id(), %exit, found = lookup.packages().len(), "lookup finished");
        Ok(lookup.packages().to_vec())
    }
}

fn unsupported_as(error: Error, replacement: ResolveError) -> Error {
    match error {
        Error::Bus(BusError::UnsupportedOperation { .. }) => replacement.into(),
        other => other,
    }
}
