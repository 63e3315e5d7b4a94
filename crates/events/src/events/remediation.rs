use pkc_types::{PackageId, SigType};
use serde::{Deserialize, Serialize};

/// The service needs a repository signing key the system does not trust yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureRequired {
    pub package_id: PackageId,
    pub repository_name: String,
    pub key_url: String,
    pub key_userid: String,
    pub key_id: String,
    pub key_fingerprint: String,
    pub key_timestamp: String,
    #[serde(default)]
    pub sig_type: SigType,
}

/// The service needs the user to accept a license agreement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EulaRequired {
    pub eula_id: String,
    pub package_id: String,
    pub vendor_name: String,
    pub license_agreement: String,
}
