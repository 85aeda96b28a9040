use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};

use super::schema::SCHEMA;
use super::{DocumentQuery, Store, StoredDocument};
use crate::error::{Error, Result};
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn json_column<T: serde::de::DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Booleans live in JSON as `true`/`false` but `json_extract` yields 1/0.
fn normalize_filter_value(value: &str) -> String {
    match value {
        "true" => "1".to_string(),
        "false" => "0".to_string(),
        other => other.to_string(),
    }
}

fn is_valid_field(field: &str) -> bool {
    !field.is_empty() && field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

const DOCUMENT_COLUMNS: &str = "id, company_id, data, deleted, created_at, updated_at";

fn document_from_row(collection: Collection, row: &Row<'_>) -> rusqlite::Result<StoredDocument> {
    Ok(StoredDocument {
        collection,
        id: row.get(0)?,
        company_id: row.get(1)?,
        data: json_column(row, 2)?,
        deleted: row.get(3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
        updated_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

/// Builds the WHERE clause shared by list and count.
fn document_filter(
    collection: Collection,
    query: &DocumentQuery,
) -> Result<(String, Vec<Value>)> {
    let mut sql = String::from(" WHERE collection = ?");
    let mut values: Vec<Value> = vec![Value::from(collection.as_str().to_string())];

    if let Some(company_id) = &query.company_id {
        sql.push_str(" AND company_id = ?");
        values.push(Value::from(company_id.clone()));
    }
    if !query.include_deleted {
        sql.push_str(" AND deleted = 0");
    }
    for (field, value) in &query.filters {
        if !is_valid_field(field) {
            return Err(Error::BadRequest(format!("invalid filter field: {field}")));
        }
        sql.push_str(" AND CAST(json_extract(data, ?) AS TEXT) = ?");
        values.push(Value::from(format!("$.{field}")));
        values.push(Value::from(normalize_filter_value(value)));
    }
    Ok((sql, values))
}

const USER_COLUMNS: &str =
    "id, company_id, email, display_name, roles, password_hash, created_at, updated_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        company_id: row.get(1)?,
        email: row.get(2)?,
        display_name: row.get(3)?,
        roles: json_column(row, 4)?,
        password_hash: row.get(5)?,
        created_at: parse_datetime(&row.get::<_, String>(6)?),
        updated_at: parse_datetime(&row.get::<_, String>(7)?),
    })
}

const TOKEN_COLUMNS: &str =
    "id, token_hash, token_lookup, is_admin, user_id, created_at, expires_at, last_used_at";

fn token_from_row(row: &Row<'_>) -> rusqlite::Result<Token> {
    Ok(Token {
        id: row.get(0)?,
        token_hash: row.get(1)?,
        token_lookup: row.get(2)?,
        is_admin: row.get(3)?,
        user_id: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
        expires_at: row.get::<_, Option<String>>(6)?.map(|s| parse_datetime(&s)),
        last_used_at: row.get::<_, Option<String>>(7)?.map(|s| parse_datetime(&s)),
    })
}

const INVITATION_COLUMNS: &str =
    "code, company_id, role, created_by, max_uses, uses, expires_at, created_at";

fn invitation_from_row(row: &Row<'_>) -> rusqlite::Result<InvitationCode> {
    Ok(InvitationCode {
        code: row.get(0)?,
        company_id: row.get(1)?,
        role: row.get(2)?,
        created_by: row.get(3)?,
        max_uses: row.get(4)?,
        uses: row.get(5)?,
        expires_at: row.get::<_, Option<String>>(6)?.map(|s| parse_datetime(&s)),
        created_at: parse_datetime(&row.get::<_, String>(7)?),
    })
}

const ROLE_COLUMNS: &str = "id, company_id, name, description, grants, created_at, updated_at";

fn role_from_row(row: &Row<'_>) -> rusqlite::Result<CustomRole> {
    Ok(CustomRole {
        id: row.get(0)?,
        company_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        grants: json_column(row, 4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
        updated_at: parse_datetime(&row.get::<_, String>(6)?),
    })
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // Document operations

    fn insert_document(&self, doc: &StoredDocument) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO documents (collection, id, company_id, data, deleted, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                doc.collection.as_str(),
                doc.id,
                doc.company_id,
                serde_json::to_string(&doc.data)?,
                doc.deleted,
                format_datetime(&doc.created_at),
                format_datetime(&doc.updated_at),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => Err(Error::AlreadyExists),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_document(&self, collection: Collection, id: &str) -> Result<Option<StoredDocument>> {
        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE collection = ?1 AND id = ?2"
            ),
            params![collection.as_str(), id],
            |row| document_from_row(collection, row),
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_documents(
        &self,
        collection: Collection,
        query: &DocumentQuery,
    ) -> Result<Vec<StoredDocument>> {
        let (filter, mut values) = document_filter(collection, query)?;
        let mut sql = format!("SELECT {DOCUMENT_COLUMNS} FROM documents{filter}");
        if !query.cursor.is_empty() {
            sql.push_str(" AND id > ?");
            values.push(Value::from(query.cursor.clone()));
        }
        sql.push_str(" ORDER BY id");
        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            values.push(Value::from(i64::from(limit)));
        }

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), |row| {
            document_from_row(collection, row)
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn count_documents(&self, collection: Collection, query: &DocumentQuery) -> Result<i64> {
        let (filter, values) = document_filter(collection, query)?;
        let conn = self.conn();
        let count = conn.query_row(
            &format!("SELECT COUNT(*) FROM documents{filter}"),
            params_from_iter(values.iter()),
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn update_document(&self, doc: &StoredDocument) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE documents SET company_id = ?1, data = ?2, deleted = ?3, updated_at = ?4
             WHERE collection = ?5 AND id = ?6",
            params![
                doc.company_id,
                serde_json::to_string(&doc.data)?,
                doc.deleted,
                format_datetime(&doc.updated_at),
                doc.collection.as_str(),
                doc.id,
            ],
        )?;
        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn soft_delete_document(&self, collection: Collection, id: &str) -> Result<bool> {
        let rows = self.conn().execute(
            "UPDATE documents SET deleted = 1, updated_at = ?1
             WHERE collection = ?2 AND id = ?3 AND deleted = 0",
            params![format_datetime(&Utc::now()), collection.as_str(), id],
        )?;
        Ok(rows > 0)
    }

    // Numbering and access codes

    fn next_sequence(&self, name: &str) -> Result<i64> {
        let conn = self.conn();
        let value = conn.query_row(
            "INSERT INTO sequences (name, value) VALUES (?1, 1)
             ON CONFLICT(name) DO UPDATE SET value = value + 1
             RETURNING value",
            params![name],
            |row| row.get(0),
        )?;
        Ok(value)
    }

    fn set_access_code(
        &self,
        collection: Collection,
        id: &str,
        code_hash: Option<&str>,
    ) -> Result<()> {
        let conn = self.conn();
        match code_hash {
            Some(hash) => conn.execute(
                "INSERT INTO document_access (collection, id, code_hash) VALUES (?1, ?2, ?3)
                 ON CONFLICT(collection, id) DO UPDATE SET code_hash = excluded.code_hash",
                params![collection.as_str(), id, hash],
            )?,
            None => conn.execute(
                "DELETE FROM document_access WHERE collection = ?1 AND id = ?2",
                params![collection.as_str(), id],
            )?,
        };
        Ok(())
    }

    fn get_access_code(&self, collection: Collection, id: &str) -> Result<Option<String>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT code_hash FROM document_access WHERE collection = ?1 AND id = ?2",
            params![collection.as_str(), id],
            |row| row.get(0),
        )
        .optional()
        .map_err(Error::from)
    }

    // User operations

    fn create_user(&self, user: &User) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO users (id, company_id, email, display_name, roles, password_hash, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                user.id,
                user.company_id,
                user.email,
                user.display_name,
                serde_json::to_string(&user.roles)?,
                user.password_hash,
                format_datetime(&user.created_at),
                format_datetime(&user.updated_at),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => {
                Err(Error::AlreadyExists)
            }
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_user(&self, id: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1 AND deleted = 0"),
            params![id],
            user_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1 AND deleted = 0"),
            params![email],
            user_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_users(&self, company_id: Option<&str>, cursor: &str, limit: i32) -> Result<Vec<User>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users
             WHERE deleted = 0 AND (?1 IS NULL OR company_id = ?1) AND id > ?2
             ORDER BY id LIMIT ?3"
        ))?;

        let rows = stmt.query_map(params![company_id, cursor, limit], user_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn count_company_users(&self, company_id: &str) -> Result<i64> {
        let conn = self.conn();
        let count = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE company_id = ?1 AND deleted = 0",
            params![company_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn update_user(&self, user: &User) -> Result<()> {
        let result = self.conn().execute(
            "UPDATE users SET email = ?1, display_name = ?2, roles = ?3, password_hash = ?4, updated_at = ?5
             WHERE id = ?6 AND deleted = 0",
            params![
                user.email,
                user.display_name,
                serde_json::to_string(&user.roles)?,
                user.password_hash,
                format_datetime(&user.updated_at),
                user.id,
            ],
        );

        match result {
            Ok(0) => Err(Error::NotFound),
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => {
                Err(Error::AlreadyExists)
            }
            Err(e) => Err(Error::from(e)),
        }
    }

    fn delete_user(&self, id: &str) -> Result<bool> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        // Free the email for reuse; the row stays for audit.
        let rows = tx.execute(
            "UPDATE users SET deleted = 1, email = id || ':' || email, updated_at = ?1
             WHERE id = ?2 AND deleted = 0",
            params![format_datetime(&Utc::now()), id],
        )?;
        tx.execute("DELETE FROM tokens WHERE user_id = ?1", params![id])?;
        tx.commit()?;
        Ok(rows > 0)
    }

    // Token operations

    fn create_token(&self, token: &Token) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO tokens (id, token_hash, token_lookup, is_admin, user_id, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                token.id,
                token.token_hash,
                token.token_lookup,
                token.is_admin,
                token.user_id,
                format_datetime(&token.created_at),
                token.expires_at.as_ref().map(format_datetime),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => Err(Error::TokenLookupCollision),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_token_by_id(&self, id: &str) -> Result<Option<Token>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {TOKEN_COLUMNS} FROM tokens WHERE id = ?1"),
            params![id],
            token_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {TOKEN_COLUMNS} FROM tokens WHERE token_lookup = ?1"),
            params![lookup],
            token_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_tokens(
        &self,
        company_id: Option<&str>,
        cursor: &str,
        limit: i32,
    ) -> Result<Vec<Token>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TOKEN_COLUMNS} FROM tokens
             WHERE (?1 IS NULL OR user_id IN (SELECT id FROM users WHERE company_id = ?1))
               AND id > ?2
             ORDER BY id LIMIT ?3"
        ))?;

        let rows = stmt.query_map(params![company_id, cursor, limit], token_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_user_tokens(&self, user_id: &str) -> Result<Vec<Token>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TOKEN_COLUMNS} FROM tokens WHERE user_id = ?1 ORDER BY created_at DESC"
        ))?;

        let rows = stmt.query_map(params![user_id], token_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_token(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM tokens WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn update_token_last_used(&self, id: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE tokens SET last_used_at = ?1 WHERE id = ?2",
            params![format_datetime(&Utc::now()), id],
        )?;
        Ok(())
    }

    // Invitation code operations

    fn create_invitation(&self, invite: &InvitationCode) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO invitation_codes (code, company_id, role, created_by, max_uses, uses, expires_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                invite.code,
                invite.company_id,
                invite.role,
                invite.created_by,
                invite.max_uses,
                invite.uses,
                invite.expires_at.as_ref().map(format_datetime),
                format_datetime(&invite.created_at),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => {
                Err(Error::AlreadyExists)
            }
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_invitation(&self, code: &str) -> Result<Option<InvitationCode>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {INVITATION_COLUMNS} FROM invitation_codes WHERE code = ?1"),
            params![code],
            invitation_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_invitations(&self, company_id: &str) -> Result<Vec<InvitationCode>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {INVITATION_COLUMNS} FROM invitation_codes
             WHERE company_id = ?1 ORDER BY created_at DESC"
        ))?;

        let rows = stmt.query_map(params![company_id], invitation_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_invitation(&self, code: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM invitation_codes WHERE code = ?1", params![code])?;
        Ok(rows > 0)
    }

    fn redeem_invitation(&self, code: &str) -> Result<bool> {
        let rows = self.conn().execute(
            "UPDATE invitation_codes SET uses = uses + 1 WHERE code = ?1 AND uses < max_uses",
            params![code],
        )?;
        Ok(rows > 0)
    }

    // Custom role operations

    fn create_role(&self, role: &CustomRole) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO custom_roles (id, company_id, name, description, grants, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                role.id,
                role.company_id,
                role.name,
                role.description,
                serde_json::to_string(&role.grants)?,
                format_datetime(&role.created_at),
                format_datetime(&role.updated_at),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => {
                Err(Error::AlreadyExists)
            }
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_role(&self, id: &str) -> Result<Option<CustomRole>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {ROLE_COLUMNS} FROM custom_roles WHERE id = ?1"),
            params![id],
            role_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_role_by_name(&self, company_id: &str, name: &str) -> Result<Option<CustomRole>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {ROLE_COLUMNS} FROM custom_roles WHERE company_id = ?1 AND name = ?2"),
            params![company_id, name],
            role_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_roles(&self, company_id: &str) -> Result<Vec<CustomRole>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ROLE_COLUMNS} FROM custom_roles WHERE company_id = ?1 ORDER BY name"
        ))?;

        let rows = stmt.query_map(params![company_id], role_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_role(&self, role: &CustomRole) -> Result<()> {
        let result = self.conn().execute(
            "UPDATE custom_roles SET name = ?1, description = ?2, grants = ?3, updated_at = ?4
             WHERE id = ?5",
            params![
                role.name,
                role.description,
                serde_json::to_string(&role.grants)?,
                format_datetime(&role.updated_at),
                role.id,
            ],
        );

        match result {
            Ok(0) => Err(Error::NotFound),
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => {
                Err(Error::AlreadyExists)
            }
            Err(e) => Err(Error::from(e)),
        }
    }

    fn delete_role(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM custom_roles WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn has_admin_token(&self) -> Result<bool> {
        let conn = self.conn();
        let count: i32 = conn.query_row(
            "SELECT COUNT(*) FROM tokens WHERE is_admin = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn test_store() -> (TempDir, SqliteStore) {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();
        (temp, store)
    }

    fn doc(collection: Collection, id: &str, company_id: &str, data: serde_json::Value) -> StoredDocument {
        let now = Utc::now();
        StoredDocument {
            collection,
            id: id.to_string(),
            company_id: company_id.to_string(),
            data,
            deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn user(id: &str, company_id: &str, email: &str) -> User {
        let now = Utc::now();
        User {
            id: id.to_string(),
            company_id: company_id.to_string(),
            email: email.to_string(),
            display_name: "Test User".to_string(),
            roles: vec!["sales".to_string()],
            password_hash: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_initialize_creates_tables() {
        let (_temp, store) = test_store();

        let conn = store.conn();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        for table in [
            "users",
            "tokens",
            "invitation_codes",
            "custom_roles",
            "documents",
            "document_access",
            "sequences",
        ] {
            assert!(tables.contains(&table.to_string()), "missing {table}");
        }
    }

    #[test]
    fn test_document_crud_and_soft_delete() {
        let (_temp, store) = test_store();
        let mut client = doc(
            Collection::Clients,
            "c-1",
            "co-1",
            json!({"name": "Juan", "company_name": "Acme"}),
        );
        store.insert_document(&client).unwrap();
        assert!(matches!(
            store.insert_document(&client),
            Err(Error::AlreadyExists)
        ));

        client.data = json!({"name": "Juan", "company_name": "Acme Corp"});
        store.update_document(&client).unwrap();
        let fetched = store.get_document(Collection::Clients, "c-1").unwrap().unwrap();
        assert_eq!(fetched.data["company_name"], "Acme Corp");

        assert!(store.soft_delete_document(Collection::Clients, "c-1").unwrap());
        assert!(!store.soft_delete_document(Collection::Clients, "c-1").unwrap());

        let query = DocumentQuery::for_company("co-1");
        assert!(store.list_documents(Collection::Clients, &query).unwrap().is_empty());
        let with_deleted = query.with_deleted();
        assert_eq!(store.list_documents(Collection::Clients, &with_deleted).unwrap().len(), 1);
        assert!(store.get_document(Collection::Clients, "c-1").unwrap().unwrap().deleted);
    }

    #[test]
    fn test_list_documents_scoped_and_filtered() {
        let (_temp, store) = test_store();
        store
            .insert_document(&doc(Collection::Products, "p-1", "co-1", json!({"content_type": "digital"})))
            .unwrap();
        store
            .insert_document(&doc(Collection::Products, "p-2", "co-1", json!({"content_type": "static"})))
            .unwrap();
        store
            .insert_document(&doc(Collection::Products, "p-3", "co-2", json!({"content_type": "digital"})))
            .unwrap();
        store
            .insert_document(&doc(Collection::Notifications, "n-1", "co-1", json!({"read": false})))
            .unwrap();

        let digital = DocumentQuery::for_company("co-1").filter("content_type", "digital");
        let found = store.list_documents(Collection::Products, &digital).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "p-1");

        let all = DocumentQuery::default();
        assert_eq!(store.count_documents(Collection::Products, &all).unwrap(), 3);

        let page = DocumentQuery::for_company("co-1").after("p-1").limit(10);
        let rest = store.list_documents(Collection::Products, &page).unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].id, "p-2");

        let unread = DocumentQuery::for_company("co-1").filter("read", "false");
        assert_eq!(store.count_documents(Collection::Notifications, &unread).unwrap(), 1);

        let bad = DocumentQuery::default().filter("data') OR 1=1 --", "x");
        assert!(matches!(
            store.list_documents(Collection::Products, &bad),
            Err(Error::BadRequest(_))
        ));
    }

    #[test]
    fn test_next_sequence_increments_per_name() {
        let (_temp, store) = test_store();
        assert_eq!(store.next_sequence("co-1:proposals").unwrap(), 1);
        assert_eq!(store.next_sequence("co-1:proposals").unwrap(), 2);
        assert_eq!(store.next_sequence("co-1:quotations").unwrap(), 1);
    }

    #[test]
    fn test_access_code_set_and_clear() {
        let (_temp, store) = test_store();
        store
            .insert_document(&doc(Collection::Proposals, "pp-1", "co-1", json!({})))
            .unwrap();

        store
            .set_access_code(Collection::Proposals, "pp-1", Some("hash-a"))
            .unwrap();
        store
            .set_access_code(Collection::Proposals, "pp-1", Some("hash-b"))
            .unwrap();
        assert_eq!(
            store.get_access_code(Collection::Proposals, "pp-1").unwrap().as_deref(),
            Some("hash-b")
        );

        store.set_access_code(Collection::Proposals, "pp-1", None).unwrap();
        assert!(store.get_access_code(Collection::Proposals, "pp-1").unwrap().is_none());
    }

    #[test]
    fn test_user_crud() {
        let (_temp, store) = test_store();
        let mut u = user("u-1", "co-1", "ana@example.com");
        store.create_user(&u).unwrap();
        assert!(matches!(
            store.create_user(&user("u-2", "co-1", "ANA@example.com")),
            Err(Error::AlreadyExists)
        ));

        u.roles = vec!["sales".to_string(), "cms".to_string()];
        store.update_user(&u).unwrap();
        let fetched = store.get_user_by_email("ana@example.com").unwrap().unwrap();
        assert_eq!(fetched.roles, vec!["sales", "cms"]);
        assert_eq!(store.count_company_users("co-1").unwrap(), 1);
        assert_eq!(store.list_users(Some("co-2"), "", 10).unwrap().len(), 0);

        assert!(store.delete_user("u-1").unwrap());
        assert!(store.get_user("u-1").unwrap().is_none());
        assert_eq!(store.count_company_users("co-1").unwrap(), 0);

        // Email can be reused after deletion.
        store.create_user(&user("u-3", "co-1", "ana@example.com")).unwrap();
    }

    #[test]
    fn test_token_lookup_collision() {
        let (_temp, store) = test_store();
        let now = Utc::now();
        let token = Token {
            id: "abcdefgh-1".to_string(),
            token_hash: "hash".to_string(),
            token_lookup: "abcdefgh".to_string(),
            is_admin: true,
            user_id: None,
            created_at: now,
            expires_at: None,
            last_used_at: None,
        };
        store.create_token(&token).unwrap();
        assert!(store.has_admin_token().unwrap());

        let clash = Token {
            id: "abcdefgh-2".to_string(),
            ..token
        };
        assert!(matches!(
            store.create_token(&clash),
            Err(Error::TokenLookupCollision)
        ));
    }

    #[test]
    fn test_user_delete_revokes_tokens() {
        let (_temp, store) = test_store();
        store.create_user(&user("u-1", "co-1", "ben@example.com")).unwrap();
        store
            .create_token(&Token {
                id: "t-1".to_string(),
                token_hash: "hash".to_string(),
                token_lookup: "lookup01".to_string(),
                is_admin: false,
                user_id: Some("u-1".to_string()),
                created_at: Utc::now(),
                expires_at: None,
                last_used_at: None,
            })
            .unwrap();

        store.delete_user("u-1").unwrap();
        assert!(store.get_token_by_id("t-1").unwrap().is_none());
    }

    #[test]
    fn test_list_tokens_by_company() {
        let (_temp, store) = test_store();
        store.create_user(&user("u-1", "co-1", "ben@example.com")).unwrap();
        store.create_user(&user("u-2", "co-2", "cora@example.com")).unwrap();
        let token = |id: &str, lookup: &str, user_id: Option<&str>| Token {
            id: id.to_string(),
            token_hash: "hash".to_string(),
            token_lookup: lookup.to_string(),
            is_admin: user_id.is_none(),
            user_id: user_id.map(str::to_string),
            created_at: Utc::now(),
            expires_at: None,
            last_used_at: None,
        };
        store.create_token(&token("t-0", "lookup00", None)).unwrap();
        store.create_token(&token("t-1", "lookup01", Some("u-1"))).unwrap();
        store.create_token(&token("t-2", "lookup02", Some("u-2"))).unwrap();
        store.create_token(&token("t-3", "lookup03", Some("u-1"))).unwrap();

        let ids = |tokens: Vec<Token>| tokens.into_iter().map(|t| t.id).collect::<Vec<_>>();
        assert_eq!(ids(store.list_tokens(None, "", 10).unwrap()).len(), 4);
        assert_eq!(ids(store.list_tokens(Some("co-1"), "", 10).unwrap()), vec!["t-1", "t-3"]);
        assert_eq!(ids(store.list_tokens(Some("co-1"), "t-1", 10).unwrap()), vec!["t-3"]);
        assert!(store.list_tokens(Some("co-9"), "", 10).unwrap().is_empty());
    }

    #[test]
    fn test_invitation_redeem_respects_max_uses() {
        let (_temp, store) = test_store();
        store
            .create_invitation(&InvitationCode {
                code: "JOIN2345".to_string(),
                company_id: "co-1".to_string(),
                role: "sales".to_string(),
                created_by: None,
                max_uses: 2,
                uses: 0,
                expires_at: None,
                created_at: Utc::now(),
            })
            .unwrap();

        assert!(store.redeem_invitation("JOIN2345").unwrap());
        assert!(store.redeem_invitation("JOIN2345").unwrap());
        assert!(!store.redeem_invitation("JOIN2345").unwrap());
        assert_eq!(store.get_invitation("JOIN2345").unwrap().unwrap().uses, 2);
    }

    #[test]
    fn test_custom_role_unique_per_company() {
        let (_temp, store) = test_store();
        let now = Utc::now();
        let role = CustomRole {
            id: "r-1".to_string(),
            company_id: "co-1".to_string(),
            name: "site-viewer".to_string(),
            description: None,
            grants: vec![ModuleGrant {
                module: Module::Business,
                allow: Permission::VIEW,
                deny: Permission::default(),
            }],
            created_at: now,
            updated_at: now,
        };
        store.create_role(&role).unwrap();

        let dup = CustomRole {
            id: "r-2".to_string(),
            ..role.clone()
        };
        assert!(matches!(store.create_role(&dup), Err(Error::AlreadyExists)));

        let other_company = CustomRole {
            id: "r-3".to_string(),
            company_id: "co-2".to_string(),
            ..role
        };
        store.create_role(&other_company).unwrap();

        let fetched = store.get_role_by_name("co-1", "site-viewer").unwrap().unwrap();
        assert_eq!(fetched.grants[0].module, Module::Business);
        assert_eq!(store.list_roles("co-1").unwrap().len(), 1);
    }
}
