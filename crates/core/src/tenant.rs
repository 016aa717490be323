//! Tenant axes.

use serde::{Deserialize, Serialize};

/// The two independent tenant axes a user holds a current context for.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantKind {
    Store,
    Warehouse,
}

impl TenantKind {
    pub const ALL: [TenantKind; 2] = [TenantKind::Store, TenantKind::Warehouse];

    pub fn as_str(&self) -> &'static str {
        match self {
            TenantKind::Store => "store",
            TenantKind::Warehouse => "warehouse",
        }
    }
}

impl core::fmt::Display for TenantKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
