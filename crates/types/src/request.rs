//! Operation requests issued onto the bus

use crate::{FilterSet, PackageId, Role};
use pkc_errors::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Kind of capability a provider lookup matches against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProvidesKind {
    #[default]
    Any,
    Modalias,
    Codec,
    Mimetype,
}

impl ProvidesKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Modalias => "modalias",
            Self::Codec => "codec",
            Self::Mimetype => "mimetype",
        }
    }
}

impl FromStr for ProvidesKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "any" => Ok(Self::Any),
            "modalias" => Ok(Self::Modalias),
            "codec" => Ok(Self::Codec),
            "mimetype" => Ok(Self::Mimetype),
            other => Err(ParseError::UnknownProvides {
                input: other.to_string(),
            }),
        }
    }
}

/// Signature scheme of a repository key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SigType {
    #[default]
    Gpg,
}

impl fmt::Display for SigType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("gpg")
    }
}

impl FromStr for SigType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("gpg") {
            Ok(Self::Gpg)
        } else {
            Err(ParseError::UnknownSigType {
                input: s.to_string(),
            })
        }
    }
}

/// What an operation acts on
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Target {
    #[default]
    None,
    Package {
        package_id: PackageId,
    },
    /// Free-text term: a name to resolve, a search term or a capability
    Term {
        term: String,
    },
    Path {
        path: PathBuf,
    },
    Repo {
        repo_id: String,
    },
    RepoData {
        repo_id: String,
        parameter: String,
        value: String,
    },
    Signature {
        sig_type: SigType,
        key_id: String,
        package_id: PackageId,
    },
    Count {
        count: u32,
    },
}

/// Flags that only some roles honour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestOptions {
    /// Remove packages that depend on the target too
    pub allow_deps: bool,
    pub autoremove: bool,
    pub recursive: bool,
    pub force: bool,
    pub provides: ProvidesKind,
}

/// One operation to run on the service
///
/// Built once per command and never mutated; a requeue resubmits an
/// identical copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRequest {
    pub role: Role,
    #[serde(default)]
    pub filters: FilterSet,
    #[serde(default)]
    pub target: Target,
    #[serde(default)]
    pub options: RequestOptions,
}

impl OperationRequest {
    #[must_use]
    pub fn new(role: Role, filters: FilterSet, target: Target) -> Self {
        Self {
            role,
            filters,
            target,
            options: RequestOptions::default(),
        }
    }

    fn package(role: Role, package_id: PackageId) -> Self {
        Self::new(role, FilterSet::none(), Target::Package { package_id })
    }

    fn term(role: Role, filters: FilterSet, term: impl Into<String>) -> Self {
        Self::new(role, filters, Target::Term { term: term.into() })
    }

    #[must_use]
    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn install(package_id: PackageId) -> Self {
        Self::package(Role::InstallPackage, package_id)
    }

    #[must_use]
    pub fn install_file(path: impl Into<PathBuf>) -> Self {
        Self::new(
            Role::InstallFile,
            FilterSet::none(),
            Target::Path { path: path.into() },
        )
    }

    #[must_use]
    pub fn install_signature(sig_type: SigType, key_id: impl Into<String>, package_id: PackageId) -> Self {
        Self::new(
            Role::InstallSignature,
            FilterSet::none(),
            Target::Signature {
                sig_type,
                key_id: key_id.into(),
                package_id,
            },
        )
    }

    #[must_use]
    pub fn remove(package_id: PackageId, allow_deps: bool) -> Self {
        Self::package(Role::RemovePackage, package_id).with_options(RequestOptions {
            allow_deps,
            ..RequestOptions::default()
        })
    }

    #[must_use]
    pub fn update(package_id: PackageId) -> Self {
        Self::package(Role::UpdatePackage, package_id)
    }

    #[must_use]
    pub fn update_system() -> Self {
        Self::new(Role::UpdateSystem, FilterSet::none(), Target::None)
    }

    #[must_use]
    pub fn resolve(filters: FilterSet, name: impl Into<String>) -> Self {
        Self::term(Role::Resolve, filters, name)
    }

    #[must_use]
    pub fn what_provides(filters: FilterSet, provides: ProvidesKind, term: impl Into<String>) -> Self {
        Self::term(Role::WhatProvides, filters, term).with_options(RequestOptions {
            provides,
            ..RequestOptions::default()
        })
    }

    #[must_use]
    pub fn search_name(filters: FilterSet, term: impl Into<String>) -> Self {
        Self::term(Role::SearchName, filters, term)
    }

    #[must_use]
    pub fn search_details(filters: FilterSet, term: impl Into<String>) -> Self {
        Self::term(Role::SearchDetails, filters, term)
    }

    #[must_use]
    pub fn search_group(filters: FilterSet, term: impl Into<String>) -> Self {
        Self::term(Role::SearchGroup, filters, term)
    }

    #[must_use]
    pub fn search_file(filters: FilterSet, term: impl Into<String>) -> Self {
        Self::term(Role::SearchFile, filters, term)
    }

    #[must_use]
    pub fn get_depends(filters: FilterSet, package_id: PackageId, recursive: bool) -> Self {
        Self::new(Role::GetDepends, filters, Target::Package { package_id }).with_options(
            RequestOptions {
                recursive,
                ..RequestOptions::default()
            },
        )
    }

    #[must_use]
    pub fn get_requires(filters: FilterSet, package_id: PackageId, recursive: bool) -> Self {
        Self::new(Role::GetRequires, filters, Target::Package { package_id }).with_options(
            RequestOptions {
                recursive,
                ..RequestOptions::default()
            },
        )
    }

    #[must_use]
    pub fn get_files(package_id: PackageId) -> Self {
        Self::package(Role::GetFiles, package_id)
    }

    #[must_use]
    pub fn get_description(package_id: PackageId) -> Self {
        Self::package(Role::GetDescription, package_id)
    }

    #[must_use]
    pub fn get_update_detail(package_id: PackageId) -> Self {
        Self::package(Role::GetUpdateDetail, package_id)
    }

    #[must_use]
    pub fn get_updates(filters: FilterSet) -> Self {
        Self::new(Role::GetUpdates, filters, Target::None)
    }

    #[must_use]
    pub fn get_packages(filters: FilterSet) -> Self {
        Self::new(Role::GetPackages, filters, Target::None)
    }

    #[must_use]
    pub fn repo_list(filters: FilterSet) -> Self {
        Self::new(Role::GetRepoList, filters, Target::None)
    }

    #[must_use]
    pub fn repo_enable(repo_id: impl Into<String>) -> Self {
        Self::new(
            Role::RepoEnable,
            FilterSet::none(),
            Target::Repo {
                repo_id: repo_id.into(),
            },
        )
    }

    #[must_use]
    pub fn repo_disable(repo_id: impl Into<String>) -> Self {
        Self::new(
            Role::RepoDisable,
            FilterSet::none(),
            Target::Repo {
                repo_id: repo_id.into(),
            },
        )
    }

    #[must_use]
    pub fn repo_set_data(
        repo_id: impl Into<String>,
        parameter: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::new(
            Role::RepoSetData,
            FilterSet::none(),
            Target::RepoData {
                repo_id: repo_id.into(),
                parameter: parameter.into(),
                value: value.into(),
            },
        )
    }

    #[must_use]
    pub fn refresh(force: bool) -> Self {
        Self::new(Role::RefreshCache, FilterSet::none(), Target::None).with_options(
            RequestOptions {
                force,
                ..RequestOptions::default()
            },
        )
    }

    #[must_use]
    pub fn get_old_transactions(count: u32) -> Self {
        Self::new(
            Role::GetOldTransactions,
            FilterSet::none(),
            Target::Count { count },
        )
    }

    /// Whether issuing this request needs network connectivity
    #[must_use]
    pub fn requires_network(&self) -> bool {
        self.role.requires_network()
    }
}
