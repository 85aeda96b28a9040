use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{ensure_success, is_safe_segment};
use crate::config::AlgoliaConfig;
use crate::error::{Error, Result};

/// Index holding billboard sites.
pub const PRODUCTS_INDEX: &str = "products";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub filters: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub hits_per_page: Option<u32>,
}

impl SearchRequest {
    /// Query body with the tenant filter always applied.
    fn to_body(&self, company_id: &str) -> Value {
        let tenant = format!("company_id:\"{}\"", company_id.replace('"', ""));
        let filters = match self.filters.as_deref().map(str::trim) {
            Some(extra) if !extra.is_empty() => format!("({extra}) AND {tenant}"),
            _ => tenant,
        };

        let mut body = json!({ "query": self.query, "filters": filters });
        if let Some(page) = self.page {
            body["page"] = json!(page);
        }
        if let Some(hits) = self.hits_per_page {
            body["hitsPerPage"] = json!(hits.min(100));
        }
        body
    }
}

/// Algolia relay. Records are always scoped by `company_id`.
pub struct SearchClient {
    http: reqwest::Client,
    app_id: String,
    api_key: String,
    base_url: String,
}

impl SearchClient {
    pub fn new(http: reqwest::Client, config: &AlgoliaConfig) -> Self {
        Self {
            http,
            app_id: config.app_id.clone(),
            api_key: config.api_key.clone(),
            base_url: config.base_url().trim_end_matches('/').to_string(),
        }
    }

    fn index_url(&self, index: &str) -> Result<String> {
        if !is_safe_segment(index) {
            return Err(Error::BadRequest(format!("invalid index name: {index}")));
        }
        Ok(format!("{}/1/indexes/{index}", self.base_url))
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .header("X-Algolia-Application-Id", &self.app_id)
            .header("X-Algolia-API-Key", &self.api_key)
    }

    pub async fn query(&self, index: &str, company_id: &str, request: &SearchRequest) -> Result<Value> {
        let url = format!("{}/query", self.index_url(index)?);
        let response = self
            .request(reqwest::Method::POST, url)
            .json(&request.to_body(company_id))
            .send()
            .await?;
        Ok(ensure_success("algolia", response).await?.json().await?)
    }

    /// Adds or replaces one record; `company_id` is stamped onto it.
    pub async fn index_record<T: Serialize>(
        &self,
        index: &str,
        object_id: &str,
        company_id: &str,
        record: &T,
    ) -> Result<()> {
        let mut body = serde_json::to_value(record)?;
        if let Value::Object(fields) = &mut body {
            fields.insert("objectID".to_string(), json!(object_id));
            fields.insert("company_id".to_string(), json!(company_id));
        }
        let url = format!("{}/{object_id}", self.index_url(index)?);
        let response = self.request(reqwest::Method::PUT, url).json(&body).send().await?;
        ensure_success("algolia", response).await?;
        Ok(())
    }

    pub async fn delete_record(&self, index: &str, object_id: &str) -> Result<()> {
        let url = format!("{}/{object_id}", self.index_url(index)?);
        let response = self.request(reqwest::Method::DELETE, url).send().await?;
        ensure_success("algolia", response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_filter_always_applied() {
        let plain = SearchRequest {
            query: "edsa".to_string(),
            ..Default::default()
        };
        assert_eq!(plain.to_body("co-1")["filters"], "company_id:\"co-1\"");

        let scoped = SearchRequest {
            query: "edsa".to_string(),
            filters: Some("content_type:digital OR company_id:co-2".to_string()),
            page: Some(2),
            hits_per_page: Some(500),
        };
        let body = scoped.to_body("co-1");
        assert_eq!(
            body["filters"],
            "(content_type:digital OR company_id:co-2) AND company_id:\"co-1\""
        );
        assert_eq!(body["page"], 2);
        assert_eq!(body["hitsPerPage"], 100);
    }
}
