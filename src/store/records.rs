use chrono::Utc;
use serde_json::{Map, Value};

use super::{DocumentQuery, Store, StoredDocument};
use crate::error::{Error, Result};
use crate::types::{Document, Record};

/// Bookkeeping keys owned by the store, never by a patch body.
const RESERVED_FIELDS: &[&str] = &["id", "company_id", "created_at", "updated_at", "deleted"];

fn into_record<T: Document>(doc: StoredDocument) -> Result<Record<T>> {
    Ok(Record {
        id: doc.id,
        company_id: doc.company_id,
        created_at: doc.created_at,
        updated_at: doc.updated_at,
        deleted: doc.deleted,
        data: serde_json::from_value(doc.data)?,
    })
}

/// Typed access to the document store.
///
/// Implemented for every [`Store`]; the collection comes from the
/// document type.
pub trait RecordStore {
    fn create_record<T: Document>(&self, company_id: &str, data: T) -> Result<Record<T>>;
    /// Like `create_record` with a caller-chosen id, for one-per-company
    /// documents such as the company profile and its subscription.
    fn create_record_with_id<T: Document>(
        &self,
        id: &str,
        company_id: &str,
        data: T,
    ) -> Result<Record<T>>;
    /// Returns the record unless it is missing or soft-deleted.
    fn get_record<T: Document>(&self, id: &str) -> Result<Option<Record<T>>>;
    fn list_records<T: Document>(&self, query: &DocumentQuery) -> Result<Vec<Record<T>>>;
    fn count_records<T: Document>(&self, query: &DocumentQuery) -> Result<i64>;
    fn save_record<T: Document>(&self, record: &mut Record<T>) -> Result<()>;
    fn delete_record<T: Document>(&self, id: &str) -> Result<bool>;
}

impl<S: Store + ?Sized> RecordStore for S {
    fn create_record<T: Document>(&self, company_id: &str, data: T) -> Result<Record<T>> {
        self.create_record_with_id(&uuid::Uuid::new_v4().to_string(), company_id, data)
    }

    fn create_record_with_id<T: Document>(
        &self,
        id: &str,
        company_id: &str,
        mut data: T,
    ) -> Result<Record<T>> {
        data.prepare();
        let now = Utc::now();
        let doc = StoredDocument {
            collection: T::COLLECTION,
            id: id.to_string(),
            company_id: company_id.to_string(),
            data: serde_json::to_value(&data)?,
            deleted: false,
            created_at: now,
            updated_at: now,
        };
        self.insert_document(&doc)?;

        Ok(Record {
            id: doc.id,
            company_id: doc.company_id,
            created_at: now,
            updated_at: now,
            deleted: false,
            data,
        })
    }

    fn get_record<T: Document>(&self, id: &str) -> Result<Option<Record<T>>> {
        match self.get_document(T::COLLECTION, id)? {
            Some(doc) if !doc.deleted => into_record(doc).map(Some),
            _ => Ok(None),
        }
    }

    fn list_records<T: Document>(&self, query: &DocumentQuery) -> Result<Vec<Record<T>>> {
        self.list_documents(T::COLLECTION, query)?
            .into_iter()
            .map(into_record)
            .collect()
    }

    fn count_records<T: Document>(&self, query: &DocumentQuery) -> Result<i64> {
        self.count_documents(T::COLLECTION, query)
    }

    fn save_record<T: Document>(&self, record: &mut Record<T>) -> Result<()> {
        record.data.prepare();
        record.updated_at = Utc::now();
        self.update_document(&StoredDocument {
            collection: T::COLLECTION,
            id: record.id.clone(),
            company_id: record.company_id.clone(),
            data: serde_json::to_value(&record.data)?,
            deleted: record.deleted,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    fn delete_record<T: Document>(&self, id: &str) -> Result<bool> {
        self.soft_delete_document(T::COLLECTION, id)
    }
}

/// Applies a shallow merge of `patch` onto `current`.
///
/// Top-level keys replace the stored value; `null` clears the field.
/// Keys listed in `T::PROTECTED` and store bookkeeping keys are rejected.
pub fn merge_patch<T: Document>(current: &T, patch: Map<String, Value>) -> Result<T> {
    if let Some(key) = patch
        .keys()
        .find(|k| RESERVED_FIELDS.contains(&k.as_str()) || T::PROTECTED.contains(&k.as_str()))
    {
        return Err(Error::BadRequest(format!("field '{key}' cannot be updated")));
    }

    let mut value = serde_json::to_value(current)?;
    let Value::Object(fields) = &mut value else {
        return Err(Error::BadRequest("document is not an object".to_string()));
    };
    for (key, new_value) in patch {
        if new_value.is_null() {
            fields.remove(&key);
        } else {
            fields.insert(key, new_value);
        }
    }

    serde_json::from_value(value).map_err(|e| Error::BadRequest(format!("invalid update: {e}")))
}
