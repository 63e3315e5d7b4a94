//! Package-related type definitions

use pkc_errors::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canonical reference to exactly one package: `name;version;arch;data`
///
/// The version may be empty. Instances only come from a well-formed
/// four-field encoding, never from partial user input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PackageId {
    name: String,
    version: String,
    arch: String,
    data: String,
}

impl PackageId {
    const SEPARATOR: char = ';';

    /// Parse a canonical identifier
    ///
    /// # Errors
    ///
    /// Returns `ParseError::InvalidPackageId` unless the input has exactly
    /// four `;`-separated fields and a non-empty name.
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let invalid = || ParseError::InvalidPackageId {
            input: input.to_string(),
        };

        let fields: Vec<&str> = input.split(Self::SEPARATOR).collect();
        let [name, version, arch, data] = fields.as_slice() else {
            return Err(invalid());
        };
        if name.trim().is_empty() || name.contains(char::is_whitespace) {
            return Err(invalid());
        }

        Ok(Self {
            name: (*name).to_string(),
            version: (*version).to_string(),
            arch: (*arch).to_string(),
            data: (*data).to_string(),
        })
    }

    /// Whether the input already is a canonical identifier
    #[must_use]
    pub fn is_canonical(input: &str) -> bool {
        Self::parse(input).is_ok()
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    #[must_use]
    pub fn arch(&self) -> &str {
        &self.arch
    }

    /// Source tag (repository or installation origin)
    #[must_use]
    pub fn data(&self) -> &str {
        &self.data
    }

    /// `name-version`, or just the name when the version is empty
    #[must_use]
    pub fn name_version(&self) -> String {
        if self.version.is_empty() {
            self.name.clone()
        } else {
            format!("{}-{}", self.name, self.version)
        }
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{sep}{}{sep}{}{sep}{}",
            self.name,
            self.version,
            self.arch,
            self.data,
            sep = Self::SEPARATOR
        )
    }
}

impl FromStr for PackageId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PackageId {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PackageId> for String {
    fn from(id: PackageId) -> Self {
        id.to_string()
    }
}

/// Classification the service attaches to each package it reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InfoKind {
    Installed,
    Available,
    Low,
    Normal,
    Important,
    Security,
    Bugfix,
    Enhancement,
    Blocked,
    Downloading,
    Updating,
    Installing,
    Removing,
    Cleanup,
    Obsoleting,
    #[serde(other)]
    Unknown,
}

impl InfoKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Installed => "installed",
            Self::Available => "available",
            Self::Low => "low",
            Self::Normal => "normal",
            Self::Important => "important",
            Self::Security => "security",
            Self::Bugfix => "bugfix",
            Self::Enhancement => "enhancement",
            Self::Blocked => "blocked",
            Self::Downloading => "downloading",
            Self::Updating => "updating",
            Self::Installing => "installing",
            Self::Removing => "removing",
            Self::Cleanup => "cleanup",
            Self::Obsoleting => "obsoleting",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for InfoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One package reported by the service, as buffered by a handle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageItem {
    pub info: InfoKind,
    pub package_id: PackageId,
    pub summary: String,
}
