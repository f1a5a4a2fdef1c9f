//! HTTP client for a PostgREST-compatible row store
//!
//! Reads map to `GET /rest/v1/<table>?select=..&<col>=eq.<value>&order=..&limit=..`,
//! writes to `POST`/`PATCH`/`DELETE` on the same resource. Requests are never
//! retried; a failed call is reported to the caller once.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;

use super::{Query, RowStore, Table};
use crate::config::StoreConfig;
use crate::error::{Error, Result};

/// PostgREST client with its own single-threaded runtime.
pub struct RemoteStore {
    base_url: String,
    http_client: reqwest::Client,
    runtime: tokio::runtime::Runtime,
}

impl RemoteStore {
    /// Create a remote store from configuration
    ///
    /// Returns an error if the configuration is invalid or missing required fields.
    pub fn new(config: &StoreConfig) -> Result<Self> {
        config.validate()?;

        let base_url = config
            .url
            .clone()
            .ok_or_else(|| Error::Config("store.url is required".to_string()))?
            .trim_end_matches('/')
            .to_string();
        let api_key = config
            .resolved_api_key()
            .ok_or_else(|| Error::Config("store.api_key is required".to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            "apikey",
            HeaderValue::from_str(&api_key)
                .map_err(|e| Error::Config(format!("invalid api_key: {}", e)))?,
        );
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| Error::Config(format!("invalid api_key: {}", e)))?,
        );

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::Config(format!("failed to build tokio runtime: {e}")))?;

        Ok(Self {
            base_url,
            http_client,
            runtime,
        })
    }

    fn table_url(&self, table: Table) -> String {
        format!("{}/rest/v1/{}", self.base_url, table.as_str())
    }

    /// Full URL for a read.
    pub fn select_url(&self, query: &Query) -> String {
        let select = if query.columns.is_empty() {
            "*".to_string()
        } else {
            query.columns.join(",")
        };

        let mut params = vec![format!("select={}", urlencoding::encode(&select))];
        for (column, value) in &query.filters {
            params.push(filter_param(column, value));
        }
        if let Some((column, direction)) = &query.order {
            params.push(format!(
                "order={}.{}",
                urlencoding::encode(column),
                direction.as_str()
            ));
        }
        if let Some(limit) = query.limit {
            params.push(format!("limit={}", limit));
        }

        format!("{}?{}", self.table_url(query.table), params.join("&"))
    }

    /// Full URL addressing one row of an event.
    pub fn row_url(&self, table: Table, id: &str, event_id: &str) -> String {
        let mut url = format!(
            "{}?id=eq.{}",
            self.table_url(table),
            urlencoding::encode(id)
        );
        if table != Table::Events {
            url.push_str(&format!("&event_id=eq.{}", urlencoding::encode(event_id)));
        }
        url
    }
}

/// `<col>=eq.<value>`, or `<col>=is.null` for null.
fn filter_param(column: &str, value: &Value) -> String {
    let column = urlencoding::encode(column);
    match value {
        Value::Null => format!("{}=is.null", column),
        Value::String(s) => format!("{}=eq.{}", column, urlencoding::encode(s)),
        other => format!("{}=eq.{}", column, urlencoding::encode(&other.to_string())),
    }
}

/// Send a request and decode the JSON array PostgREST answers with.
async fn fetch_rows(request: reqwest::RequestBuilder) -> Result<Vec<Value>> {
    let response = request
        .send()
        .await
        .map_err(|e| Error::transport(format!("HTTP request failed: {}", e)))?;

    let status = response.status();

    if status.is_success() {
        if status == reqwest::StatusCode::NO_CONTENT {
            return Ok(Vec::new());
        }
        let rows: Vec<Value> = response
            .json()
            .await
            .map_err(|e| Error::transport(format!("failed to parse response: {}", e)))?;
        Ok(rows)
    } else {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown".to_string());
        Err(Error::Store {
            status: status.as_u16(),
            message: error_text,
        })
    }
}

impl RowStore for RemoteStore {
    fn select(&self, query: &Query) -> Result<Vec<Value>> {
        let url = self.select_url(query);
        tracing::debug!(%url, "remote select");
        self.runtime
            .block_on(fetch_rows(self.http_client.get(url)))
    }

    fn select_many(&self, queries: &[Query]) -> Vec<Result<Vec<Value>>> {
        self.runtime.block_on(async {
            let mut tasks = tokio::task::JoinSet::new();
            for (index, query) in queries.iter().enumerate() {
                let request = self.http_client.get(self.select_url(query));
                tasks.spawn(async move { (index, fetch_rows(request).await) });
            }

            let mut results: Vec<Option<Result<Vec<Value>>>> =
                queries.iter().map(|_| None).collect();
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok((index, result)) => results[index] = Some(result),
                    Err(e) => tracing::warn!(error = %e, "remote select task failed"),
                }
            }

            results
                .into_iter()
                .map(|r| r.unwrap_or_else(|| Err(Error::transport("select task did not finish"))))
                .collect()
        })
    }

    fn insert(&self, table: Table, row: Value) -> Result<Value> {
        let request = self
            .http_client
            .post(self.table_url(table))
            .header("Prefer", "return=representation,resolution=merge-duplicates")
            .json(&row);
        let rows = self.runtime.block_on(fetch_rows(request))?;
        Ok(rows.into_iter().next().unwrap_or(row))
    }

    fn update(&self, table: Table, id: &str, event_id: &str, patch: Value) -> Result<usize> {
        let request = self
            .http_client
            .patch(self.row_url(table, id, event_id))
            .header("Prefer", "return=representation")
            .json(&patch);
        Ok(self.runtime.block_on(fetch_rows(request))?.len())
    }

    fn delete(&self, table: Table, id: &str, event_id: &str) -> Result<usize> {
        let request = self
            .http_client
            .delete(self.row_url(table, id, event_id))
            .header("Prefer", "return=representation");
        Ok(self.runtime.block_on(fetch_rows(request))?.len())
    }
}
