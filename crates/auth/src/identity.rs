//! Resolved head-of-department identity.

use serde::{Deserialize, Serialize};

use edugate_core::{PortalRole, UserId};

/// Approval state of an elevated-role account.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl core::fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ApprovalStatus::Pending => f.write_str("pending"),
            ApprovalStatus::Approved => f.write_str("approved"),
            ApprovalStatus::Rejected => f.write_str("rejected"),
        }
    }
}

/// Fully resolved head-of-department identity.
///
/// Constructed only by the resolver, and only after both the allow-list
/// membership check and the profile fetch succeeded; a live instance
/// therefore always carries `role == Hod` and `approval_status == Approved`.
///
/// Field names are camelCase on the wire so the persisted session document
/// stays readable by earlier portal releases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HodIdentity {
    pub id: UserId,
    pub display_name: String,
    pub email: String,
    pub role: PortalRole,
    pub email_verified: bool,
    pub profile_complete: bool,
    pub approval_status: ApprovalStatus,
}
