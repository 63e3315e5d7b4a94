//! Console commands
//!
//! Each command turns into at most one primary request. Commands that act
//! on a package resolve what the user typed first, on the lookup handle,
//! with a filter set suited to the command.

use crate::cancel::CancellationCoordinator;
use crate::context::TransactionContext;
use crate::driver::{Outcome, TransactionDriver};
use crate::resolver::Resolver;
use pkc_errors::{Error, ResolveError, TransactionError};
use pkc_types::{
    ExitReason, FilterSet, OperationRequest, PackageId, ProvidesKind, Role, SigType,
};
use std::path::Path;
use tracing::debug;

const HISTORY_LENGTH: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    Name,
    Details,
    Group,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Install a package by name, or a local package file
    Install { package: String },
    InstallSignature {
        sig_type: SigType,
        key_id: String,
        package_id: String,
    },
    Remove { package: String },
    /// Update one package, or the whole system
    Update { package: Option<String> },
    Refresh { force: bool },
    Resolve { package: String },
    Search { kind: SearchKind, term: String },
    WhatProvides { term: String },
    GetDepends { package: String },
    GetRequires { package: String },
    GetDescription { package: String },
    GetFiles { package: String },
    GetUpdateDetail { package: String },
    GetUpdates,
    GetPackages,
    RepoList,
    RepoEnable { repo_id: String },
    RepoDisable { repo_id: String },
    RepoSetData {
        repo_id: String,
        parameter: String,
        value: String,
    },
    GetTransactions,
    GetTime { role: Role },
    GetActions,
    GetFilters,
    GetGroups,
}

impl Command {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Install { .. } => "install",
            Self::InstallSignature { .. } => "install-sig",
            Self::Remove { .. } => "remove",
            Self::Update { .. } => "update",
            Self::Refresh { .. } => "refresh",
            Self::Resolve { .. } => "resolve",
            Self::Search { .. } => "search",
            Self::WhatProvides { .. } => "what-provides",
            Self::GetDepends { .. } => "get-depends",
            Self::GetRequires { .. } => "get-requires",
            Self::GetDescription { .. } => "get-description",
            Self::GetFiles { .. } => "get-files",
            Self::GetUpdateDetail { .. } => "get-update-detail",
            Self::GetUpdates => "get-updates",
            Self::GetPackages => "get-packages",
            Self::RepoList => "repo-list",
            Self::RepoEnable { .. } => "repo-enable",
            Self::RepoDisable { .. } => "repo-disable",
            Self::RepoSetData { .. } => "repo-set-data",
            Self::GetTransactions => "get-transactions",
            Self::GetTime { .. } => "get-time",
            Self::GetActions => "get-actions",
            Self::GetFilters => "get-filters",
            Self::GetGroups => "get-groups",
        }
    }

    /// Filter set used to resolve the package argument
    #[must_use]
    pub fn lookup_filters(&self) -> FilterSet {
        match self {
            Self::Install { .. } => FilterSet::not_installed(),
            Self::Remove { .. } | Self::Update { .. } | Self::GetUpdateDetail { .. } => {
                FilterSet::installed()
            }
            _ => FilterSet::none(),
        }
    }

    /// Printed when the package argument matches nothing
    #[must_use]
    pub fn not_found_message(&self) -> &'static str {
        match self {
            Self::Install { .. } => {
                "Could not find a package with that name to install, or package already installed"
            }
            Self::Remove { .. } => "Could not find a package with that name to remove",
            Self::Update { .. } => "Could not find a package with that name to update",
            Self::GetRequires { .. } => "Could not find a package with that name to get requires",
            Self::GetDepends { .. } => "Could not find a package with that name to get depends",
            Self::GetDescription { .. } => {
                "Could not find a package with that name to get description"
            }
            Self::GetFiles { .. } => "Could not find a package with that name to get files",
            Self::GetUpdateDetail { .. } => {
                "Could not find a package with that name to get update details"
            }
            _ => "Could not find a package with that name",
        }
    }

    /// Run the command to completion
    ///
    /// # Errors
    ///
    /// Returns resolution failures, `UserDeclined` when a confirmation is
    /// refused, and whatever the transaction itself fails with.
    pub async fn execute(self, ctx: &mut TransactionContext) -> Result<Outcome, Error> {
        debug!(command = self.name(), "executing command");
        let lookup = Lookup {
            filters: ctx.filters_or(self.lookup_filters()),
            not_found: self.not_found_message(),
            resolver: Resolver::new(),
            cancellation: ctx.cancellation.clone(),
        };
        match self.into_request(ctx, lookup).await? {
            Some(request) => TransactionDriver::open(ctx).await?.run(request).await,
            None => Ok(Outcome::Finished(ExitReason::Success)),
        }
    }

    /// Build the primary request; `None` when the command was answered
    /// without one
    async fn into_request(
        self,
        ctx: &mut TransactionContext,
        mut lookup: Lookup,
    ) -> Result<Option<OperationRequest>, Error> {
        let listing = ctx.filters_or(FilterSet::none());
        let request = match self {
            Self::Install { package } => {
                let path = Path::new(&package);
                if path.exists() {
                    debug!(path = %path.display(), "installing local file");
                    OperationRequest::install_file(path)
                } else {
                    OperationRequest::install(lookup.resolve(ctx, &package).await?)
                }
            }
            Self::InstallSignature {
                sig_type,
                key_id,
                package_id,
            } => OperationRequest::install_signature(sig_type, key_id, PackageId::parse(&package_id)?),
            Self::Remove { package } => {
                let package_id = lookup.resolve(ctx, &package).await?;
                remove_request(ctx, &mut lookup.resolver, package_id).await?
            }
            Self::Update { package: None } => OperationRequest::update_system(),
            Self::Update {
                package: Some(package),
            } => OperationRequest::update(lookup.resolve(ctx, &package).await?),
            Self::Refresh { force } => OperationRequest::refresh(force),
            // a plain listing of every match; nothing to pick here
            Self::Resolve { package } => OperationRequest::resolve(listing, package),
            Self::Search { kind, term } => match kind {
                SearchKind::Name => OperationRequest::search_name(listing, term),
                SearchKind::Details => OperationRequest::search_details(listing, term),
                SearchKind::Group => OperationRequest::search_group(listing, term),
                SearchKind::File => OperationRequest::search_file(listing, term),
            },
            Self::WhatProvides { term } => {
                OperationRequest::what_provides(listing, ProvidesKind::Codec, term)
            }
            Self::GetDepends { package } => {
                let package_id = lookup.resolve(ctx, &package).await?;
                OperationRequest::get_depends(listing, package_id, false)
            }
            Self::GetRequires { package } => {
                let package_id = lookup.resolve(ctx, &package).await?;
                OperationRequest::get_requires(listing, package_id, false)
            }
            Self::GetDescription { package } => {
                OperationRequest::get_description(lookup.resolve(ctx, &package).await?)
            }
            Self::GetFiles { package } => {
                OperationRequest::get_files(lookup.resolve(ctx, &package).await?)
            }
            Self::GetUpdateDetail { package } => {
                OperationRequest::get_update_detail(lookup.resolve(ctx, &package).await?)
            }
            Self::GetUpdates => OperationRequest::get_updates(listing),
            Self::GetPackages => OperationRequest::get_packages(listing),
            Self::RepoList => OperationRequest::repo_list(listing),
            Self::RepoEnable { repo_id } => OperationRequest::repo_enable(repo_id),
            Self::RepoDisable { repo_id } => OperationRequest::repo_disable(repo_id),
            Self::RepoSetData {
                repo_id,
                parameter,
                value,
            } => OperationRequest::repo_set_data(repo_id, parameter, value),
            Self::GetTransactions => OperationRequest::get_old_transactions(HISTORY_LENGTH),
            Self::GetTime { role } => {
                let elapsed = ctx.bus.time_since_action(role).await?;
                ctx.console
                    .line(&format!("time since {role} is {}s", elapsed.as_secs()))?;
                return Ok(None);
            }
            Self::GetActions => {
                let roles = ctx.capabilities.roles.to_string();
                ctx.console.line(&format!("roles={roles}"))?;
                return Ok(None);
            }
            Self::GetFilters => {
                let filters = ctx.capabilities.filters.to_string();
                ctx.console.line(&format!("filters={filters}"))?;
                return Ok(None);
            }
            Self::GetGroups => {
                let groups = ctx.capabilities.groups.join(";");
                ctx.console.line(&format!("groups={groups}"))?;
                return Ok(None);
            }
        };
        Ok(Some(request))
    }
}

struct Lookup {
    filters: FilterSet,
    not_found: &'static str,
    resolver: Resolver,
    cancellation: CancellationCoordinator,
}

impl Drop for Lookup {
    fn drop(&mut self) {
        if let Some(lookup) = self.resolver.lookup() {
            self.cancellation.unregister(lookup.id());
        }
    }
}

impl Lookup {
    async fn resolve(
        &mut self,
        ctx: &mut TransactionContext,
        raw: &str,
    ) -> Result<PackageId, Error> {
        match self.resolver.resolve(ctx, raw, self.filters.clone()).await {
            Err(e @ Error::Resolve(ResolveError::NoMatch { .. })) => {
                ctx.console.failure(self.not_found)?;
                Err(e)
            }
            other => other,
        }
    }
}

/// Removal request, asking first when other installed packages depend on
/// the target
async fn remove_request(
    ctx: &mut TransactionContext,
    resolver: &mut Resolver,
    package_id: PackageId,
) -> Result<OperationRequest, Error> {
    if !ctx.capabilities.supports(Role::GetRequires) {
        debug!("service cannot list dependents, removing without checking");
        return Ok(OperationRequest::remove(package_id, false));
    }

    let dependents = resolver.requires(ctx, &package_id).await?;
    if dependents.is_empty() {
        return Ok(OperationRequest::remove(package_id, false));
    }

    ctx.console.dependents(&dependents)?;
    if !ctx
        .prompt
        .confirm("Okay to remove additional packages?", false)?
    {
        return Err(TransactionError::UserDeclined.into());
    }
    Ok(OperationRequest::remove(package_id, true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_filters_per_command() {
        let install = Command::Install {
            package: "vim".into(),
        };
        assert_eq!(install.lookup_filters(), FilterSet::not_installed());

        let update = Command::Update {
            package: Some("vim".into()),
        };
        assert_eq!(update.lookup_filters(), FilterSet::installed());

        let files = Command::GetFiles {
            package: "vim".into(),
        };
        assert_eq!(files.lookup_filters(), FilterSet::none());
    }

    #[test]
    fn test_install_not_found_mentions_installed() {
        let install = Command::Install {
            package: "vim".into(),
        };
        assert!(install
            .not_found_message()
            .ends_with("or package already installed"));
        assert_eq!(
            Command::GetUpdateDetail {
                package: "vim".into()
            }
            .not_found_message(),
            "Could not find a package with that name to get update details"
        );
    }
}
