use crate::ports::{RepositoryError, RepositoryResult};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Thin reqwest wrapper for the task API. The bearer token travels with
/// every call rather than living in the client, so one client can serve any
/// session.
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("todo-cli/0.1.0")
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, token: &str) -> RepositoryResult<T> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| RepositoryError::Network(e.to_string()))?;

        Self::handle_response(response).await
    }

    pub async fn post<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        token: &str,
        body: &B,
    ) -> RepositoryResult<T> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|e| RepositoryError::Network(e.to_string()))?;

        Self::handle_response(response).await
    }

    pub async fn put<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        token: &str,
        body: &B,
    ) -> RepositoryResult<T> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .put(&url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|e| RepositoryError::Network(e.to_string()))?;

        Self::handle_response(response).await
    }

    pub async fn patch<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        token: &str,
        body: &B,
    ) -> RepositoryResult<T> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .patch(&url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|e| RepositoryError::Network(e.to_string()))?;

        Self::handle_response(response).await
    }

    /// For endpoints answering 204 with no body.
    pub async fn delete(&self, path: &str, token: &str) -> RepositoryResult<()> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .delete(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| RepositoryError::Network(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::error_from(response).await)
        }
    }

    async fn handle_response<T: DeserializeOwned>(response: Response) -> RepositoryResult<T> {
        if response.status().is_success() {
            let response_text = response
                .text()
                .await
                .map_err(|e| RepositoryError::Network(e.to_string()))?;

            tracing::debug!("API response: {}", response_text);

            serde_json::from_str(&response_text).map_err(|e| {
                RepositoryError::Serialization(format!(
                    "Failed to parse response: {}. Response was: {}",
                    e, response_text
                ))
            })
        } else {
            Err(Self::error_from(response).await)
        }
    }

    async fn error_from(response: Response) -> RepositoryError {
        let status = response.status();

        match status.as_u16() {
            401 => RepositoryError::Authentication("Invalid API token".to_string()),
            403 => RepositoryError::Forbidden("Not authorized for this resource".to_string()),
            404 => RepositoryError::NotFound("Resource not found".to_string()),
            429 => {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60);
                RepositoryError::RateLimit(retry_after)
            }
            _ => {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                RepositoryError::Api(format!("HTTP {}: {}", status, error_text))
            }
        }
    }
}
