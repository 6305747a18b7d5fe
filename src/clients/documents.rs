//! Contract with the remote document store that keeps the last grouped
//! snapshot per item, used to seed diff baselines across sessions.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::instrument;

use crate::errors::ServiceError;
use crate::models::GroupedSnapshot;

#[async_trait]
pub trait GroupHistoryStore: Send + Sync {
    /// The last snapshot recorded for `item_code`, if any.
    async fn fetch_group_history(
        &self,
        item_code: &str,
    ) -> Result<Option<GroupedSnapshot>, ServiceError>;
}

#[derive(Debug, Clone)]
pub struct HttpDocumentStoreClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpDocumentStoreClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::InternalError(format!("http client build failed: {}", e)))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl GroupHistoryStore for HttpDocumentStoreClient {
    #[instrument(skip(self))]
    async fn fetch_group_history(
        &self,
        item_code: &str,
    ) -> Result<Option<GroupedSnapshot>, ServiceError> {
        let url = format!("{}/groups/{}", self.base_url, item_code);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::ExternalServiceError(format!(
                "document store returned {}: {}",
                status, body
            )));
        }

        response
            .json::<GroupedSnapshot>()
            .await
            .map(Some)
            .map_err(|e| ServiceError::ExternalServiceError(e.to_string()))
    }
}
