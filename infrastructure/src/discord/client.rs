//! Thin authenticated HTTP client for the Discord REST API.
//!
//! Maps response statuses onto [`DiscordError`]: 403 is `Forbidden`, 404 is
//! `NotFound`, 429 is `RateLimited`. Requests are never retried here; the
//! reconciliation loops pick up whatever a failed call left behind.

use super::error::{DiscordError, Result};
use super::models::{ApiErrorBody, RateLimitBody};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

const AUDIT_LOG_REASON: &str = "X-Audit-Log-Reason";
const USER_AGENT: &str = concat!(
    "DiscordBot (https://github.com/mnemotechnician/kindergarten, ",
    env!("CARGO_PKG_VERSION"),
    ")"
);

#[derive(Debug, Clone)]
pub struct DiscordClient {
    http: reqwest::Client,
    base_url: String,
}

impl DiscordClient {
    pub fn new(token: &str, base_url: &str, timeout: Duration) -> Result<Self> {
        if token.trim().is_empty() {
            return Err(DiscordError::MissingToken);
        }

        let mut auth = HeaderValue::from_str(&format!("Bot {}", token.trim()))
            .map_err(|_| DiscordError::MissingToken)?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn request(&self, method: Method, path: &str, reason: Option<&str>) -> RequestBuilder {
        let builder = self
            .http
            .request(method, format!("{}{}", self.base_url, path));
        match reason.and_then(audit_reason_header) {
            Some(value) => builder.header(AUDIT_LOG_REASON, value),
            None => builder,
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = send(self.request(Method::GET, path, None)).await?;
        decode(response).await
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        reason: Option<&str>,
    ) -> Result<T> {
        let response = send(self.request(Method::POST, path, reason).json(body)).await?;
        decode(response).await
    }

    pub async fn patch<B: Serialize>(&self, path: &str, body: &B, reason: Option<&str>) -> Result<()> {
        send(self.request(Method::PATCH, path, reason).json(body)).await?;
        Ok(())
    }

    /// PUT with an optional JSON body; the response body is ignored
    pub async fn put<B: Serialize>(
        &self,
        path: &str,
        body: Option<&B>,
        reason: Option<&str>,
    ) -> Result<()> {
        let mut builder = self.request(Method::PUT, path, reason);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        send(builder).await?;
        Ok(())
    }

    pub async fn delete(&self, path: &str, reason: Option<&str>) -> Result<()> {
        send(self.request(Method::DELETE, path, reason)).await?;
        Ok(())
    }
}

async fn send(builder: RequestBuilder) -> Result<Response> {
    let response = builder.send().await?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let header_retry = retry_after_header(&response);
    let body = response.text().await.unwrap_or_default();
    let error = classify(status, &body, header_retry);
    match &error {
        DiscordError::RateLimited { retry_after } => {
            warn!(retry_after = ?retry_after, "Discord rate limit hit")
        }
        other => debug!(status = status.as_u16(), error = %other, "Discord request failed"),
    }
    Err(error)
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| DiscordError::Decode(e.to_string()))
}

fn retry_after_header(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<f64>().ok())
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
}

/// Turn a non-success response into an error
pub(crate) fn classify(status: StatusCode, body: &str, header_retry: Option<Duration>) -> DiscordError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| format!("{} (code {})", b.message, b.code))
        .unwrap_or_else(|_| {
            status
                .canonical_reason()
                .unwrap_or("Unknown")
                .to_string()
        });

    match status {
        StatusCode::FORBIDDEN => DiscordError::Forbidden(message),
        StatusCode::NOT_FOUND => DiscordError::NotFound(message),
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = serde_json::from_str::<RateLimitBody>(body)
                .ok()
                .and_then(|b| Duration::try_from_secs_f64(b.retry_after).ok())
                .or(header_retry);
            DiscordError::RateLimited { retry_after }
        }
        _ => DiscordError::Status {
            status: status.as_u16(),
            message,
        },
    }
}

/// Audit-log reasons must be valid header values; anything else is dropped
fn audit_reason_header(reason: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(reason).ok()
}
