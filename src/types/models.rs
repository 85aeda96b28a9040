use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Module, Permission};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub company_id: String,
    pub email: String,
    pub display_name: String,
    /// Built-in role names (see `access::roles`) or custom role ids.
    pub roles: Vec<String>,
    #[serde(skip)]
    pub password_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub id: String,
    #[serde(skip)]
    pub token_hash: String,
    #[serde(skip)]
    pub token_lookup: String,
    pub is_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvitationCode {
    pub code: String,
    pub company_id: String,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    pub max_uses: i64,
    pub uses: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl InvitationCode {
    #[must_use]
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.uses < self.max_uses && self.expires_at.is_none_or(|exp| exp > now)
    }
}

/// Grant of actions on one module within a custom role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleGrant {
    pub module: Module,
    pub allow: Permission,
    #[serde(default)]
    pub deny: Permission,
}

impl ModuleGrant {
    #[must_use]
    pub fn effective(&self) -> Permission {
        self.allow.expand_implied().difference(self.deny)
    }
}

/// Company-defined role managed through access management.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomRole {
    pub id: String,
    pub company_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub grants: Vec<ModuleGrant>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CustomRole {
    #[must_use]
    pub fn permission_for(&self, module: Module) -> Permission {
        self.grants
            .iter()
            .filter(|g| g.module == module)
            .fold(Permission::default(), |acc, g| acc.union(g.effective()))
    }
}
