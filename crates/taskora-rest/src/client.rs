//! [`DataBackend`] over the hosted REST data API
//!
//! Reads map onto `GET /rest/v1/<table>` with the rendered filter parameters,
//! the row window in a `Range` header and `Prefer: count=exact` when a total
//! is wanted. Writes go through `POST`/`PATCH`/`DELETE` on the same path with
//! `Prefer: return=representation`, and stored procedures through
//! `POST /rest/v1/rpc/<function>`.

use crate::error::RestError;
use crate::render::{filter_params, select_params};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;
use taskora_config::{BackendCredentials, TaskoraConfig};
use taskora_core::{
    BackendError, BackendResult, DataBackend, QueryPayload, Row, SelectRequest, TablePredicates,
};
use tracing::{debug, error};

const PREFER_COUNT: &str = "count=exact";
const PREFER_RETURN: &str = "return=representation";

/// REST transport holding one key (anon or service) for every call
#[derive(Clone)]
pub struct RestBackend {
    client: Client,
    base_url: String,
    key: String,
    timeout: Option<Duration>,
}

impl RestBackend {
    /// `timeout` bounds every request; `None` waits indefinitely
    pub fn new(
        credentials: BackendCredentials<'_>,
        timeout: Option<Duration>,
    ) -> Result<Self, RestError> {
        let client = Client::builder().build()?;
        Ok(Self::with_client(client, credentials, timeout))
    }

    /// Reuse an existing client, e.g. one shared with other services
    pub fn with_client(
        client: Client,
        credentials: BackendCredentials<'_>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            client,
            base_url: credentials.url.trim_end_matches('/').to_string(),
            key: credentials.key.to_string(),
            timeout,
        }
    }

    /// Transport with the public key and the environment's timeout policy
    pub fn from_config(config: &TaskoraConfig) -> Result<Self, RestError> {
        Self::new(config.backend.client_credentials()?, config.backend_timeout())
    }

    /// Transport with the privileged service key
    pub fn service_from_config(config: &TaskoraConfig) -> Result<Self, RestError> {
        Self::new(config.backend.service_credentials()?, config.backend_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, urlencoding::encode(table))
    }

    /// Authenticated request with the timeout policy applied
    pub(crate) fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .header("apikey", &self.key)
            .bearer_auth(&self.key);

        match self.timeout {
            Some(timeout) => builder.timeout(timeout),
            None => builder,
        }
    }

    pub(crate) async fn send(&self, builder: RequestBuilder) -> BackendResult<Response> {
        let response = builder.send().await.map_err(|e| self.transport_error(e))?;
        if response.status().is_success() {
            return Ok(response);
        }
        Err(status_error(response).await)
    }

    pub(crate) fn transport_error(&self, e: reqwest::Error) -> BackendError {
        if e.is_timeout() {
            let duration_ms = self
                .timeout
                .map(|t| t.as_millis() as u64)
                .unwrap_or_default();
            error!(duration_ms, "Backend request timed out");
            return BackendError::Timeout { duration_ms };
        }
        if e.is_decode() {
            return BackendError::Decode(e.to_string());
        }
        error!(error = %e, "Backend request failed");
        BackendError::network(e.to_string())
    }

    async fn rows(&self, builder: RequestBuilder) -> BackendResult<Vec<Row>> {
        let response = self.send(builder).await?;
        response.json().await.map_err(|e| self.transport_error(e))
    }
}

/// Turn a non-2xx response into a status error, preferring the API's own
/// `message` field over the raw body
async fn status_error(response: Response) -> BackendError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or(body);

    error!(status, message = %message, "Backend returned an error status");
    BackendError::status(status, message)
}

/// Total from a `Content-Range` header such as `0-9/42` or `*/0`
///
/// `None` when the total is unknown (`*`) or the header is malformed.
pub fn parse_content_range(header: &str) -> Option<u64> {
    header
        .rsplit_once('/')
        .and_then(|(_, total)| total.trim().parse().ok())
}

fn content_range_total(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(reqwest::header::CONTENT_RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_content_range)
}

#[async_trait]
impl DataBackend for RestBackend {
    async fn select(&self, request: &SelectRequest) -> BackendResult<QueryPayload> {
        let mut params = select_params(request);
        let mut builder = self.request(Method::GET, &self.table_url(request.table()));

        match request.range.inclusive_bounds() {
            Some((from, to)) => {
                builder = builder
                    .header("Range-Unit", "items")
                    .header(reqwest::header::RANGE, format!("{from}-{to}"));
            }
            None if request.range.offset > 0 => {
                params.push(("offset".to_string(), request.range.offset.to_string()));
            }
            None => {}
        }
        if request.count {
            builder = builder.header("Prefer", PREFER_COUNT);
        }

        debug!(table = request.table(), ?params, "Selecting rows");
        let response = builder
            .query(&params)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        // A window past the end of the table; the total is still reported
        if response.status() == StatusCode::RANGE_NOT_SATISFIABLE {
            let payload = QueryPayload::default();
            return Ok(match content_range_total(&response) {
                Some(total) if request.count => payload.with_count(total),
                _ => payload,
            });
        }
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let total = content_range_total(&response);
        let rows: Vec<Row> = response.json().await.map_err(|e| self.transport_error(e))?;
        let payload = QueryPayload::new(rows);

        Ok(match total {
            Some(total) if request.count => payload.with_count(total),
            _ => payload,
        })
    }

    async fn insert(&self, table: &str, rows: Vec<Row>) -> BackendResult<Vec<Row>> {
        debug!(table, rows = rows.len(), "Inserting rows");
        let builder = self
            .request(Method::POST, &self.table_url(table))
            .header("Prefer", PREFER_RETURN)
            .json(&rows);
        self.rows(builder).await
    }

    async fn update(&self, target: &TablePredicates, patch: Row) -> BackendResult<Vec<Row>> {
        debug!(table = %target.table, "Updating rows");
        let builder = self
            .request(Method::PATCH, &self.table_url(&target.table))
            .header("Prefer", PREFER_RETURN)
            .query(&filter_params(target))
            .json(&patch);
        self.rows(builder).await
    }

    async fn delete(&self, target: &TablePredicates) -> BackendResult<Vec<Row>> {
        debug!(table = %target.table, "Deleting rows");
        let builder = self
            .request(Method::DELETE, &self.table_url(&target.table))
            .header("Prefer", PREFER_RETURN)
            .query(&filter_params(target));
        self.rows(builder).await
    }

    async fn rpc(&self, function: &str, args: Value) -> BackendResult<Value> {
        let url = format!(
            "{}/rest/v1/rpc/{}",
            self.base_url,
            urlencoding::encode(function)
        );
        debug!(function, "Calling stored procedure");

        let response = self
            .send(self.request(Method::POST, &url).json(&args))
            .await?;
        let body = response.text().await.map_err(|e| self.transport_error(e))?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| BackendError::Decode(e.to_string()))
    }
}
