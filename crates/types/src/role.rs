//! Operation roles and the role sets a service advertises

use pkc_errors::ParseError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// The kind of operation a request asks the service to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    InstallPackage,
    InstallFile,
    InstallSignature,
    RemovePackage,
    UpdatePackage,
    UpdateSystem,
    Resolve,
    SearchName,
    SearchDetails,
    SearchGroup,
    SearchFile,
    WhatProvides,
    GetDepends,
    GetRequires,
    GetFiles,
    GetDescription,
    GetUpdateDetail,
    GetUpdates,
    GetPackages,
    GetRepoList,
    RepoEnable,
    RepoDisable,
    RepoSetData,
    RefreshCache,
    GetOldTransactions,
    GetTimeSinceAction,
}

impl Role {
    /// Every role, in declaration order
    pub const ALL: [Role; 26] = [
        Self::InstallPackage,
        Self::InstallFile,
        Self::InstallSignature,
        Self::RemovePackage,
        Self::UpdatePackage,
        Self::UpdateSystem,
        Self::Resolve,
        Self::SearchName,
        Self::SearchDetails,
        Self::SearchGroup,
        Self::SearchFile,
        Self::WhatProvides,
        Self::GetDepends,
        Self::GetRequires,
        Self::GetFiles,
        Self::GetDescription,
        Self::GetUpdateDetail,
        Self::GetUpdates,
        Self::GetPackages,
        Self::GetRepoList,
        Self::RepoEnable,
        Self::RepoDisable,
        Self::RepoSetData,
        Self::RefreshCache,
        Self::GetOldTransactions,
        Self::GetTimeSinceAction,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InstallPackage => "install-package",
            Self::InstallFile => "install-file",
            Self::InstallSignature => "install-signature",
            Self::RemovePackage => "remove-package",
            Self::UpdatePackage => "update-package",
            Self::UpdateSystem => "update-system",
            Self::Resolve => "resolve",
            Self::SearchName => "search-name",
            Self::SearchDetails => "search-details",
            Self::SearchGroup => "search-group",
            Self::SearchFile => "search-file",
            Self::WhatProvides => "what-provides",
            Self::GetDepends => "get-depends",
            Self::GetRequires => "get-requires",
            Self::GetFiles => "get-files",
            Self::GetDescription => "get-description",
            Self::GetUpdateDetail => "get-update-detail",
            Self::GetUpdates => "get-updates",
            Self::GetPackages => "get-packages",
            Self::GetRepoList => "get-repo-list",
            Self::RepoEnable => "repo-enable",
            Self::RepoDisable => "repo-disable",
            Self::RepoSetData => "repo-set-data",
            Self::RefreshCache => "refresh-cache",
            Self::GetOldTransactions => "get-old-transactions",
            Self::GetTimeSinceAction => "get-time-since-action",
        }
    }

    /// Install, update and refresh need the service to be online
    #[must_use]
    pub fn requires_network(self) -> bool {
        matches!(
            self,
            Self::InstallPackage | Self::UpdatePackage | Self::UpdateSystem | Self::RefreshCache
        )
    }

    /// Roles that change what is installed on the system
    #[must_use]
    pub fn is_mutating(self) -> bool {
        matches!(
            self,
            Self::InstallPackage
                | Self::InstallFile
                | Self::RemovePackage
                | Self::UpdatePackage
                | Self::UpdateSystem
        )
    }

    /// Roles whose package events are a listing rather than work in progress
    #[must_use]
    pub fn lists_packages(self) -> bool {
        matches!(
            self,
            Self::Resolve
                | Self::SearchName
                | Self::SearchDetails
                | Self::SearchGroup
                | Self::SearchFile
                | Self::WhatProvides
                | Self::GetDepends
                | Self::GetRequires
                | Self::GetUpdates
                | Self::GetPackages
        )
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| ParseError::UnknownRole {
                input: s.to_string(),
            })
    }
}

/// Set of roles, rendered as `;`-separated text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet(BTreeSet<Role>);

impl RoleSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set containing every known role
    #[must_use]
    pub fn all() -> Self {
        Role::ALL.into_iter().collect()
    }

    pub fn insert(&mut self, role: Role) -> bool {
        self.0.insert(role)
    }

    pub fn remove(&mut self, role: Role) -> bool {
        self.0.remove(&role)
    }

    #[must_use]
    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<T: IntoIterator<Item = Role>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text: Vec<&str> = self.iter().map(Role::as_str).collect();
        f.write_str(&text.join(";"))
    }
}

impl FromStr for RoleSet {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(';')
            .filter(|part| !part.trim().is_empty())
            .map(str::parse::<Role>)
            .collect()
    }
}
