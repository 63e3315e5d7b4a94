//! Descriptive payloads printed as they arrive

use pkc_types::{RestartKind, Role};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateDetail {
    pub package_id: String,
    pub updates: String,
    pub obsoletes: String,
    pub vendor_url: String,
    pub bugzilla_url: String,
    pub cve_url: String,
    pub restart: RestartKind,
    pub update_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Description {
    pub package_id: String,
    pub license: String,
    pub group: String,
    pub description: String,
    pub url: String,
    /// Installed size in bytes
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileList {
    pub package_id: String,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoDetail {
    pub repo_id: String,
    #[serde(default)]
    pub description: String,
    pub enabled: bool,
}

/// One entry of the service's transaction history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionMeta {
    pub tid: String,
    pub timespec: String,
    pub succeeded: bool,
    pub role: Role,
    /// Seconds
    pub duration: u64,
    #[serde(default)]
    pub data: String,
}
