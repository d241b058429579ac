//! REST access to the document backend.
//!
//! Every endpoint answers with an [`Envelope`]; responses are decoded through
//! it so backend failures surface as [`ServiceError`]s.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use superate_core::{
    ActivityWriter, DataService, Envelope, ServiceError, SuperateConfig, SuperateResult, UserId,
};

use crate::error::{ClientError, ClientResult};

/// Collection holding user profiles (and their last-seen timestamp).
const USERS_COLLECTION: &str = "users";

/// Longest slice of an unparseable error body kept in the error message.
const MAX_ERROR_BODY_CHARS: usize = 200;

#[derive(Deserialize)]
struct Created {
    id: String,
}

/// [`DataService`] and [`ActivityWriter`] over HTTP.
#[derive(Clone)]
pub struct RestDataService {
    client: reqwest::Client,
    base_url: String,
    headers: HeaderMap,
}

impl std::fmt::Debug for RestDataService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestDataService")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl RestDataService {
    pub fn new(
        base_url: &str,
        api_key: &SecretString,
        project_id: &str,
        timeout: Duration,
    ) -> ClientResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let headers = build_headers(api_key, project_id)?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            headers,
        })
    }

    /// Build against the endpoints of the configured environment.
    pub fn from_config(config: &SuperateConfig) -> ClientResult<Self> {
        Self::new(
            &config.active_endpoints().data_api_url,
            &config.credentials.api_key,
            &config.credentials.project_id,
            config.request_timeout(),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, collection: &str, id: Option<&str>) -> String {
        match id {
            Some(id) => format!("{}/{}/{}", self.base_url, collection, id),
            None => format!("{}/{}", self.base_url, collection),
        }
    }

    async fn send(
        &self,
        operation: &str,
        request: reqwest::RequestBuilder,
    ) -> SuperateResult<reqwest::Response> {
        request
            .headers(self.headers.clone())
            .send()
            .await
            .map_err(|e| transport(operation, e).into())
    }
}

fn build_headers(api_key: &SecretString, project_id: &str) -> ClientResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    let mut key = HeaderValue::from_str(api_key.expose_secret()).map_err(|e| {
        ClientError::InvalidHeader {
            header: "x-api-key",
            reason: e.to_string(),
        }
    })?;
    key.set_sensitive(true);
    headers.insert(HeaderName::from_static("x-api-key"), key);
    headers.insert(
        HeaderName::from_static("x-project-id"),
        HeaderValue::from_str(project_id).map_err(|e| ClientError::InvalidHeader {
            header: "x-project-id",
            reason: e.to_string(),
        })?,
    );
    Ok(headers)
}

fn transport(operation: &str, err: reqwest::Error) -> ServiceError {
    ServiceError::Transport {
        operation: operation.to_string(),
        reason: err.to_string(),
    }
}

/// Decode an envelope response into its payload.
async fn decode<T: DeserializeOwned>(
    operation: &str,
    response: reqwest::Response,
) -> SuperateResult<T> {
    let status = response.status();
    let body = response.text().await.map_err(|e| transport(operation, e))?;

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(ServiceError::QuotaExceeded {
            operation: operation.to_string(),
        }
        .into());
    }

    match serde_json::from_str::<Envelope<T>>(&body) {
        Ok(envelope) => envelope.into_result(operation),
        Err(err) if status.is_success() => Err(ServiceError::MalformedResponse {
            operation: operation.to_string(),
            reason: err.to_string(),
        }
        .into()),
        Err(_) => {
            let snippet: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
            Err(ServiceError::rejected(
                operation,
                Some(status.as_u16().to_string()),
                format!("HTTP {}: {}", status.as_u16(), snippet),
            )
            .into())
        }
    }
}

#[async_trait]
impl DataService for RestDataService {
    async fn list(
        &self,
        collection: &str,
        filter: &[(String, String)],
    ) -> SuperateResult<Vec<Value>> {
        let operation = format!("list {}", collection);
        let request = self.client.get(self.url(collection, None)).query(filter);
        let response = self.send(&operation, request).await?;
        decode(&operation, response).await
    }

    async fn get(&self, collection: &str, id: &str) -> SuperateResult<Option<Value>> {
        let operation = format!("get {}", collection);
        let request = self.client.get(self.url(collection, Some(id)));
        let response = self.send(&operation, request).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let value: Option<Value> = decode(&operation, response).await?;
        Ok(value.filter(|v| !v.is_null()))
    }

    async fn create(&self, collection: &str, document: Value) -> SuperateResult<String> {
        let operation = format!("create {}", collection);
        let request = self.client.post(self.url(collection, None)).json(&document);
        let response = self.send(&operation, request).await?;
        let created: Created = decode(&operation, response).await?;
        Ok(created.id)
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> SuperateResult<()> {
        let operation = format!("update {}", collection);
        let request = self.client.patch(self.url(collection, Some(id))).json(&patch);
        let response = self.send(&operation, request).await?;
        let _: Value = decode(&operation, response).await?;
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> SuperateResult<()> {
        let operation = format!("delete {}", collection);
        let request = self.client.delete(self.url(collection, Some(id)));
        let response = self.send(&operation, request).await?;
        let _: Value = decode(&operation, response).await?;
        Ok(())
    }
}

#[async_trait]
impl ActivityWriter for RestDataService {
    async fn record_last_seen(&self, user: &UserId, at: DateTime<Utc>) -> SuperateResult<()> {
        self.update(
            USERS_COLLECTION,
            user.as_str(),
            json!({ "last_seen": at.to_rfc3339() }),
        )
        .await
    }
}
