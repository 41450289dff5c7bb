use serde::{Deserialize, Serialize};

/// Account lifecycle state for a principal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Pending,
    Rejected,
}

/// A principal resolvable from a bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub roles: Vec<String>,
    pub account_status: AccountStatus,
    pub permissions: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl User {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }

    /// `agent_auth` requires role `agent` or `admin`.
    pub fn can_authenticate_as_agent(&self) -> bool {
        self.has_role("agent") || self.has_role("admin")
    }
}
