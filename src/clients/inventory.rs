//! Contract with the upstream inventory system, reduced to the two calls
//! the engine needs: fetch a unit's full update template, and submit an
//! updated template back.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::errors::ServiceError;

/// The root update payload the upstream API expects: one product plus its
/// nested sub-units keyed by code. Field names follow the upstream wire
/// format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExternalUnitTemplate {
    pub product: ExternalProduct,
}

/// `Compare*` fields echo the value a field held before this update; the
/// upstream system uses them to detect which fields actually changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExternalProduct {
    pub id: i64,
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub full_name: String,
    pub base_price: Decimal,
    pub cost: Decimal,
    pub on_hand: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compare_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compare_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compare_base_price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compare_cost: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compare_on_hand: Option<Decimal>,
    #[serde(default)]
    pub product_units: Vec<ExternalSubUnit>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExternalSubUnit {
    pub id: i64,
    pub code: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub unit: String,
    pub conversion_value: Decimal,
    pub base_price: Decimal,
    pub cost: Decimal,
    pub on_hand: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compare_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compare_base_price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compare_cost: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compare_on_hand: Option<Decimal>,
}

#[async_trait]
pub trait InventoryApi: Send + Sync {
    async fn fetch_unit_template(&self, unit_id: i64)
        -> Result<ExternalUnitTemplate, ServiceError>;

    async fn submit_update(&self, template: &ExternalUnitTemplate) -> Result<(), ServiceError>;
}

/// reqwest-backed implementation of [`InventoryApi`].
#[derive(Debug, Clone)]
pub struct HttpInventoryClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpInventoryClient {
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::InternalError(format!("http client build failed: {}", e)))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

#[async_trait]
impl InventoryApi for HttpInventoryClient {
    #[instrument(skip(self))]
    async fn fetch_unit_template(
        &self,
        unit_id: i64,
    ) -> Result<ExternalUnitTemplate, ServiceError> {
        let url = format!("{}/products/{}/template", self.base_url, unit_id);
        let response = self
            .authorized(self.http.get(&url))
            .send()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ServiceError::NotFound(format!(
                "No update template for unit {}",
                unit_id
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::ExternalServiceError(format!(
                "inventory API returned {}: {}",
                status, body
            )));
        }

        response
            .json::<ExternalUnitTemplate>()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(e.to_string()))
    }

    #[instrument(skip(self, template), fields(product_id = template.product.id))]
    async fn submit_update(&self, template: &ExternalUnitTemplate) -> Result<(), ServiceError> {
        let url = format!("{}/products/update", self.base_url);
        let response = self
            .authorized(self.http.post(&url))
            .json(template)
            .send()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::ExternalServiceError(format!(
                "inventory API returned {}: {}",
                status, body
            )));
        }
        Ok(())
    }
}
