//! Portal roles.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Role a portal account acts under.
///
/// The portal serves one dashboard per role. The set is closed by design;
/// only `Hod` carries an elevated-access gate.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortalRole {
    Student,
    Faculty,
    Hod,
}

impl PortalRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            PortalRole::Student => "student",
            PortalRole::Faculty => "faculty",
            PortalRole::Hod => "hod",
        }
    }
}

impl core::fmt::Display for PortalRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PortalRole {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(PortalRole::Student),
            "faculty" => Ok(PortalRole::Faculty),
            "hod" => Ok(PortalRole::Hod),
            other => Err(DomainError::validation(format!("unknown role '{other}'"))),
        }
    }
}
