use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::error::UnknownRole;

/// Role
///
/// The closed set of session classifications. Every `match` over `Role` in this crate
/// is exhaustive, so adding a variant forces each partition, landing path and guard
/// table to be revisited at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    Admin,
    Seller,
    Shipper,
    Buyer,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::Seller, Role::Shipper, Role::Buyer];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Seller => "seller",
            Role::Shipper => "shipper",
            Role::Buyer => "buyer",
        }
    }

    /// Base path under which this role's partition is mounted.
    /// Distinct per role so colliding relative paths never cross partitions.
    pub fn mount_path(self) -> &'static str {
        match self {
            Role::Admin => "/admin",
            Role::Seller => "/seller",
            Role::Shipper => "/shipper",
            Role::Buyer => "/buyer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}
