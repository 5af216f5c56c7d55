use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Method, StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use shared_config::AppConfig;

use crate::query::Query;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Invalid client configuration: {0}")]
    Config(String),

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// A unique or exclusion constraint rejected the write.
    #[error("Constraint violation: {0}")]
    Conflict(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Write returned no rows")]
    EmptyResult,
}

/// Thin PostgREST client authenticated with the service key.
#[derive(Clone)]
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    service_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            service_key: config.supabase_service_key.clone(),
        }
    }

    fn get_headers(&self) -> Result<HeaderMap, DatabaseError> {
        let mut headers = HeaderMap::new();

        let key = HeaderValue::from_str(&self.service_key)
            .map_err(|_| DatabaseError::Config("service key is not a valid header value".to_string()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.service_key))
            .map_err(|_| DatabaseError::Config("service key is not a valid header value".to_string()))?;

        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        Ok(headers)
    }

    pub async fn request<T>(&self, method: Method, path: &str, body: Option<Value>) -> Result<T, DatabaseError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut req = self.client
            .request(method, &url)
            .headers(self.get_headers()?);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("API error ({}): {}", status, error_text);

            return Err(match status {
                StatusCode::CONFLICT => DatabaseError::Conflict(error_text),
                StatusCode::NOT_FOUND => DatabaseError::NotFound(error_text),
                _ => DatabaseError::Api {
                    status: status.as_u16(),
                    message: error_text,
                },
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| DatabaseError::Decode(e.to_string()))
    }

    pub async fn select<T>(&self, query: &Query) -> Result<Vec<T>, DatabaseError>
    where
        T: DeserializeOwned,
    {
        self.request(Method::GET, &query.to_path(), None).await
    }

    pub async fn select_one<T>(&self, query: &Query) -> Result<Option<T>, DatabaseError>
    where
        T: DeserializeOwned,
    {
        let rows: Vec<T> = self.select(&query.clone().limit(1)).await?;
        Ok(rows.into_iter().next())
    }

    /// Returns true when at least one row matches.
    pub async fn exists(&self, query: &Query) -> Result<bool, DatabaseError> {
        let rows: Vec<Value> = self.select(&query.clone().select("id").limit(1)).await?;
        Ok(!rows.is_empty())
    }

    pub async fn count(&self, query: &Query) -> Result<usize, DatabaseError> {
        let rows: Vec<Value> = self.select(&query.clone().select("id")).await?;
        Ok(rows.len())
    }

    pub async fn insert<T>(&self, table: &'static str, row: Value) -> Result<T, DatabaseError>
    where
        T: DeserializeOwned,
    {
        let path = Query::table(table).to_path();
        let rows: Vec<T> = self.request(Method::POST, &path, Some(row)).await?;
        rows.into_iter().next().ok_or(DatabaseError::EmptyResult)
    }

    pub async fn insert_many(&self, table: &'static str, rows: Vec<Value>) -> Result<usize, DatabaseError> {
        let path = Query::table(table).to_path();
        let inserted: Vec<Value> = self.request(Method::POST, &path, Some(Value::Array(rows))).await?;
        Ok(inserted.len())
    }

    pub async fn update<T>(&self, query: &Query, patch: Value) -> Result<Vec<T>, DatabaseError>
    where
        T: DeserializeOwned,
    {
        self.request(Method::PATCH, &query.to_path(), Some(patch)).await
    }

    pub async fn delete(&self, query: &Query) -> Result<usize, DatabaseError> {
        let deleted: Vec<Value> = self.request(Method::DELETE, &query.to_path(), None).await?;
        Ok(deleted.len())
    }
}
