//! Authenticated JSON client for one OTC service endpoint
//!
//! Every request carries the `X-Auth-Token` header. Non-2xx responses are
//! classified into [`TransportError`] by HTTP status; the error message is
//! taken from the response body when the service sends one.

use crate::error::Result;
use reqwest::header::ACCEPT;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use stratus_cloud::{RequestPayload, TransportError, Value};

const AUTH_HEADER: &str = "X-Auth-Token";

/// Client bound to one service and region
#[derive(Clone)]
pub struct ServiceClient {
    http: reqwest::Client,
    endpoint: String,
    project_id: String,
    token: String,
}

impl std::fmt::Debug for ServiceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceClient")
            .field("endpoint", &self.endpoint)
            .field("project_id", &self.project_id)
            .finish_non_exhaustive()
    }
}

impl ServiceClient {
    pub fn new(
        endpoint: impl Into<String>,
        project_id: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("stratus/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            project_id: project_id.into(),
            token: token.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> std::result::Result<T, TransportError> {
        tracing::debug!("GET {} {:?}", path, query);
        let response = self.send(self.http.get(self.url(path)).query(query)).await?;
        decode(response).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> std::result::Result<T, TransportError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        tracing::debug!("POST {}", path);
        let response = self.send(self.http.post(self.url(path)).json(body)).await?;
        decode(response).await
    }

    /// POST whose response body is ignored
    pub async fn post_empty<B>(&self, path: &str, body: &B) -> std::result::Result<(), TransportError>
    where
        B: Serialize + ?Sized,
    {
        tracing::debug!("POST {}", path);
        self.send(self.http.post(self.url(path)).json(body)).await?;
        Ok(())
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> std::result::Result<T, TransportError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        tracing::debug!("PUT {}", path);
        let response = self.send(self.http.put(self.url(path)).json(body)).await?;
        decode(response).await
    }

    /// PUT whose response body is ignored
    pub async fn put_empty<B>(&self, path: &str, body: &B) -> std::result::Result<(), TransportError>
    where
        B: Serialize + ?Sized,
    {
        tracing::debug!("PUT {}", path);
        self.send(self.http.put(self.url(path)).json(body)).await?;
        Ok(())
    }

    pub async fn delete(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> std::result::Result<(), TransportError> {
        tracing::debug!("DELETE {} {:?}", path, query);
        self.send(self.http.delete(self.url(path)).query(query)).await?;
        Ok(())
    }

    async fn send(&self, request: RequestBuilder) -> std::result::Result<Response, TransportError> {
        let response = request
            .header(AUTH_HEADER, &self.token)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| TransportError::unexpected(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body, status);
        tracing::debug!("Request failed with {}: {}", status, message);
        Err(TransportError::from_status(status.as_u16(), message))
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> std::result::Result<T, TransportError> {
    response
        .json::<T>()
        .await
        .map_err(|e| TransportError::unexpected(format!("failed to decode response: {}", e)))
}

/// First `message` field anywhere in a JSON error body, else the raw body
fn error_message(body: &str, status: StatusCode) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| find_message(&v))
        .unwrap_or_else(|| {
            let body = body.trim();
            if body.is_empty() {
                status.to_string()
            } else {
                body.to_string()
            }
        })
}

fn find_message(value: &serde_json::Value) -> Option<String> {
    let map = value.as_object()?;
    map.get("message")
        .and_then(|m| m.as_str())
        .map(String::from)
        .or_else(|| map.values().find_map(find_message))
}

// ============ Payload helpers ============

pub(crate) fn payload_string(payload: &RequestPayload, name: &str) -> Option<String> {
    payload.get_str(name).map(String::from)
}

pub(crate) fn payload_strings(payload: &RequestPayload, name: &str) -> Option<Vec<String>> {
    payload.get(name).filter(|v| !v.is_null()).map(Value::string_items)
}

/// Like [`payload_string`], but a null entry clears the remote value
pub(crate) fn payload_string_or_cleared(payload: &RequestPayload, name: &str) -> Option<String> {
    payload
        .contains(name)
        .then(|| payload_string(payload, name).unwrap_or_default())
}

pub(crate) fn payload_strings_or_cleared(
    payload: &RequestPayload,
    name: &str,
) -> Option<Vec<String>> {
    payload
        .contains(name)
        .then(|| payload_strings(payload, name).unwrap_or_default())
}
