use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{
    Company, CustomRole, Module, ModuleGrant, Record, Subscription, SubscriptionPlan, Token, User,
};

#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    #[serde(default)]
    pub cursor: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserListParams {
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default)]
    pub company_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TokenListParams {
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default)]
    pub company_id: Option<String>,
}

/// The user a session token belongs to and their company.
#[derive(Debug, Clone, Serialize)]
pub struct TokenOwner {
    pub email: String,
    pub display_name: String,
    pub company_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub id: String,
    pub is_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub expired: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<TokenOwner>,
}

impl TokenResponse {
    #[must_use]
    pub fn with_owner(mut self, owner: Option<TokenOwner>) -> Self {
        self.owner = owner;
        self
    }
}

impl From<Token> for TokenResponse {
    fn from(token: Token) -> Self {
        Self {
            expired: token.expires_at.is_some_and(|at| at <= Utc::now()),
            id: token.id,
            is_admin: token.is_admin,
            user_id: token.user_id,
            created_at: token.created_at,
            expires_at: token.expires_at,
            last_used_at: token.last_used_at,
            owner: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateTokenResponse {
    pub token: String,
    pub metadata: TokenResponse,
}

// Companies and subscriptions

#[derive(Debug, Deserialize)]
pub struct CreateCompanyRequest {
    #[serde(flatten)]
    pub company: Company,
    #[serde(default)]
    pub plan: Option<SubscriptionPlan>,
}

#[derive(Debug, Serialize)]
pub struct CompanyResponse {
    #[serde(flatten)]
    pub company: Record<Company>,
    pub subscription: Option<Record<Subscription>>,
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionRequest {
    pub plan: SubscriptionPlan,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub max_products: Option<u32>,
    #[serde(default)]
    pub max_users: Option<u32>,
}

// Users

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub company_id: String,
    pub email: String,
    pub display_name: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub roles: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct CreateUserResponse {
    pub user: User,
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub roles: Option<Vec<String>>,
}

// Invitation codes

#[derive(Debug, Deserialize)]
pub struct CreateInvitationRequest {
    pub role: String,
    #[serde(default)]
    pub max_uses: Option<i64>,
    #[serde(default)]
    pub expires_in_days: Option<i64>,
}

// Custom roles

#[derive(Debug, Deserialize)]
pub struct GrantRequest {
    pub module: Module,
    pub allow: Vec<String>,
    #[serde(default)]
    pub deny: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub grants: Vec<GrantRequest>,
}

#[derive(Debug, Serialize)]
pub struct GrantResponse {
    pub module: Module,
    pub allow: Vec<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub deny: Vec<&'static str>,
}

impl From<&ModuleGrant> for GrantResponse {
    fn from(grant: &ModuleGrant) -> Self {
        Self {
            module: grant.module,
            allow: grant.allow.to_strings(),
            deny: grant.deny.to_strings(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RoleResponse {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub grants: Vec<GrantResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CustomRole> for RoleResponse {
    fn from(role: CustomRole) -> Self {
        Self {
            grants: role.grants.iter().map(GrantResponse::from).collect(),
            id: role.id,
            name: role.name,
            description: role.description,
            created_at: role.created_at,
            updated_at: role.updated_at,
        }
    }
}

// Sessions

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub code: String,
    pub email: String,
    pub password: String,
    pub display_name: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: User,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<Record<Company>>,
    pub departments: Vec<Module>,
    pub permissions: BTreeMap<Module, Vec<&'static str>>,
}

// Sales documents

#[derive(Debug, Deserialize)]
pub struct StatusRequest<S> {
    pub status: S,
}

#[derive(Debug, Default, Deserialize)]
pub struct AccessCodeRequest {
    /// A new code; one is generated when omitted. An empty string clears it.
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AccessCodeResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SendDocumentRequest {
    #[serde(default)]
    pub to: Option<Vec<String>>,
    #[serde(default)]
    pub cc: Vec<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PublicViewParams {
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approve,
    Reject,
}

#[derive(Debug, Deserialize)]
pub struct RespondRequest {
    #[serde(default)]
    pub code: Option<String>,
    pub decision: Decision,
}

// CMS

#[derive(Debug, Deserialize)]
pub struct TimelineRequest {
    pub start: NaiveTime,
    pub spot_duration_secs: u32,
    pub spots_per_loop: u32,
    #[serde(default)]
    pub loops: Option<u32>,
    /// Fill loops up to this time instead of giving a count.
    #[serde(default)]
    pub end: Option<NaiveTime>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductTimelineParams {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub loops: Option<u32>,
}

// Integrations

#[derive(Debug, Deserialize)]
pub struct PlacesParams {
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct ProxyParams {
    pub url: String,
}
