use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use shared_config::AppConfig;

/// Errors surfaced by the PostgREST data layer.
///
/// `UniqueViolation` is kept separate from the generic `Api` case: the
/// partial unique indexes over active rows are the authoritative uniqueness
/// invariant, and callers translate a violation into a different business
/// error than their own pre-checks raise.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("authentication rejected: {0}")]
    Unauthorized(String),

    #[error("data API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to decode row: {0}")]
    Decode(#[from] serde_json::Error),
}

pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.clone(),
            anon_key: config.supabase_anon_key.clone(),
        }
    }

    fn headers(&self, auth_token: Option<&str>, returning: bool) -> HeaderMap {
        let mut headers = HeaderMap::new();

        headers.insert("apikey", HeaderValue::from_str(&self.anon_key).unwrap());
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = auth_token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
            );
        }

        if returning {
            headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        }

        headers
    }

    pub async fn request<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
    ) -> Result<T, DatabaseError>
    where
        T: DeserializeOwned,
    {
        self.request_inner(method, path, auth_token, body, false).await
    }

    /// Same as `request` but asks PostgREST to echo the affected rows back
    /// (`Prefer: return=representation`), for inserts and updates.
    pub async fn request_returning<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
    ) -> Result<T, DatabaseError>
    where
        T: DeserializeOwned,
    {
        self.request_inner(method, path, auth_token, body, true).await
    }

    async fn request_inner<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
        returning: bool,
    ) -> Result<T, DatabaseError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making request to {}", url);

        let mut req = self
            .client
            .request(method, &url)
            .headers(self.headers(auth_token, returning));

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Data API error ({}): {}", status, error_text);

            return Err(match status.as_u16() {
                401 | 403 => DatabaseError::Unauthorized(error_text),
                404 => DatabaseError::NotFound(error_text),
                409 => DatabaseError::UniqueViolation(error_text),
                code => DatabaseError::Api {
                    status: code,
                    message: error_text,
                },
            });
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }

    /// Fetch every row of `table` matching the PostgREST filter string.
    pub async fn fetch_all<T>(
        &self,
        table: &str,
        filters: &str,
        auth_token: Option<&str>,
    ) -> Result<Vec<T>, DatabaseError>
    where
        T: DeserializeOwned,
    {
        let path = if filters.is_empty() {
            format!("/rest/v1/{}", table)
        } else {
            format!("/rest/v1/{}?{}", table, filters)
        };

        let rows: Vec<Value> = self.request(Method::GET, &path, auth_token, None).await?;

        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(DatabaseError::from))
            .collect()
    }

    /// Fetch at most one row of `table` matching the filter string.
    pub async fn fetch_optional<T>(
        &self,
        table: &str,
        filters: &str,
        auth_token: Option<&str>,
    ) -> Result<Option<T>, DatabaseError>
    where
        T: DeserializeOwned,
    {
        let path = format!("/rest/v1/{}?{}&limit=1", table, filters);
        let rows: Vec<Value> = self.request(Method::GET, &path, auth_token, None).await?;

        match rows.into_iter().next() {
            Some(row) => Ok(Some(serde_json::from_value(row)?)),
            None => Ok(None),
        }
    }

    /// Insert a row and return the stored representation.
    pub async fn insert_returning<T>(
        &self,
        table: &str,
        row: Value,
        auth_token: Option<&str>,
    ) -> Result<T, DatabaseError>
    where
        T: DeserializeOwned,
    {
        let path = format!("/rest/v1/{}", table);
        let rows: Vec<Value> = self
            .request_returning(Method::POST, &path, auth_token, Some(row))
            .await?;

        let first = rows.into_iter().next().ok_or(DatabaseError::Api {
            status: 200,
            message: format!("insert into {} returned no rows", table),
        })?;

        Ok(serde_json::from_value(first)?)
    }

    /// Patch rows matching the filter string and return the first updated row.
    pub async fn update_returning<T>(
        &self,
        table: &str,
        filters: &str,
        patch: Value,
        auth_token: Option<&str>,
    ) -> Result<T, DatabaseError>
    where
        T: DeserializeOwned,
    {
        let path = format!("/rest/v1/{}?{}", table, filters);
        let rows: Vec<Value> = self
            .request_returning(Method::PATCH, &path, auth_token, Some(patch))
            .await?;

        let first = rows.into_iter().next().ok_or_else(|| {
            DatabaseError::NotFound(format!("update on {} matched no rows", table))
        })?;

        Ok(serde_json::from_value(first)?)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
