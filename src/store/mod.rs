mod records;
mod schema;
mod sqlite;

pub use records::{RecordStore, merge_patch};
pub use sqlite::SqliteStore;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::*;

/// A document as persisted: bookkeeping columns plus the raw JSON body.
#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub collection: Collection,
    pub id: String,
    pub company_id: String,
    pub data: serde_json::Value,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Filters for listing documents of one collection.
///
/// Field filters are equality tests on top-level JSON fields. Values are
/// compared as text; `true`/`false` match boolean fields.
#[derive(Debug, Clone, Default)]
pub struct DocumentQuery {
    pub company_id: Option<String>,
    pub filters: Vec<(String, String)>,
    pub include_deleted: bool,
    pub cursor: String,
    pub limit: Option<i32>,
}

impl DocumentQuery {
    #[must_use]
    pub fn for_company(company_id: impl Into<String>) -> Self {
        Self {
            company_id: Some(company_id.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn filter(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    #[must_use]
    pub fn after(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = cursor.into();
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: i32) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn with_deleted(mut self) -> Self {
        self.include_deleted = true;
        self
    }
}

/// Store defines the database interface.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // Document operations
    fn insert_document(&self, doc: &StoredDocument) -> Result<()>;
    fn get_document(&self, collection: Collection, id: &str) -> Result<Option<StoredDocument>>;
    fn list_documents(
        &self,
        collection: Collection,
        query: &DocumentQuery,
    ) -> Result<Vec<StoredDocument>>;
    fn count_documents(&self, collection: Collection, query: &DocumentQuery) -> Result<i64>;
    fn update_document(&self, doc: &StoredDocument) -> Result<()>;
    fn soft_delete_document(&self, collection: Collection, id: &str) -> Result<bool>;

    // Document numbering and public access
    fn next_sequence(&self, name: &str) -> Result<i64>;
    fn set_access_code(&self, collection: Collection, id: &str, code_hash: Option<&str>)
    -> Result<()>;
    fn get_access_code(&self, collection: Collection, id: &str) -> Result<Option<String>>;

    // User operations
    fn create_user(&self, user: &User) -> Result<()>;
    fn get_user(&self, id: &str) -> Result<Option<User>>;
    fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;
    fn list_users(&self, company_id: Option<&str>, cursor: &str, limit: i32) -> Result<Vec<User>>;
    fn count_company_users(&self, company_id: &str) -> Result<i64>;
    fn update_user(&self, user: &User) -> Result<()>;
    fn delete_user(&self, id: &str) -> Result<bool>;

    // Token operations
    fn create_token(&self, token: &Token) -> Result<()>;
    fn get_token_by_id(&self, id: &str) -> Result<Option<Token>>;
    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>>;
    /// Tokens ordered by id, optionally only those of one company's users.
    fn list_tokens(&self, company_id: Option<&str>, cursor: &str, limit: i32)
    -> Result<Vec<Token>>;
    fn list_user_tokens(&self, user_id: &str) -> Result<Vec<Token>>;
    fn delete_token(&self, id: &str) -> Result<bool>;
    fn update_token_last_used(&self, id: &str) -> Result<()>;

    // Invitation code operations
    fn create_invitation(&self, invite: &InvitationCode) -> Result<()>;
    fn get_invitation(&self, code: &str) -> Result<Option<InvitationCode>>;
    fn list_invitations(&self, company_id: &str) -> Result<Vec<InvitationCode>>;
    fn delete_invitation(&self, code: &str) -> Result<bool>;
    /// Counts one use of the code. Returns false when it has no uses left.
    fn redeem_invitation(&self, code: &str) -> Result<bool>;

    // Custom role operations
    fn create_role(&self, role: &CustomRole) -> Result<()>;
    fn get_role(&self, id: &str) -> Result<Option<CustomRole>>;
    fn get_role_by_name(&self, company_id: &str, name: &str) -> Result<Option<CustomRole>>;
    fn list_roles(&self, company_id: &str) -> Result<Vec<CustomRole>>;
    fn update_role(&self, role: &CustomRole) -> Result<()>;
    fn delete_role(&self, id: &str) -> Result<bool>;

    // Admin token check
    fn has_admin_token(&self) -> Result<bool>;

    fn close(&self) -> Result<()>;
}
