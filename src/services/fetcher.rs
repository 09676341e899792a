// src/services/fetcher.rs

//! Appointment listing fetcher.
//!
//! Issues the listing request and validates the response shape. Elements that
//! are not JSON objects are skipped one by one; only a body that is not a JSON
//! list fails the whole fetch. Mistyped fields inside an object are dropped
//! field by field when the record is read.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{ApiConfig, AppointmentRecord};
use crate::utils::http;

/// Validated listing returned by a fetch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Listing {
    pub records: Vec<AppointmentRecord>,
    /// Elements dropped during validation
    pub rejected: usize,
}

impl Listing {
    /// Validate a decoded response body.
    pub fn from_value(value: Value) -> Result<Self> {
        let items = match value {
            Value::Array(items) => items,
            other => {
                return Err(AppError::transport(format!(
                    "expected a JSON list, got {}",
                    json_kind(&other)
                )));
            }
        };

        let mut listing = Listing::default();
        for (index, item) in items.into_iter().enumerate() {
            if !item.is_object() {
                log::debug!("Skipping listing element {}: not an object", index);
                listing.rejected += 1;
                continue;
            }
            match serde_json::from_value::<AppointmentRecord>(item) {
                Ok(record) => listing.records.push(record),
                Err(e) => {
                    log::warn!("Skipping listing element {}: {}", index, e);
                    listing.rejected += 1;
                }
            }
        }
        Ok(listing)
    }

    /// Decode and validate a raw response body.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| AppError::transport(format!("response is not JSON: {e}")))?;
        Self::from_value(value)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

/// Source of appointment listings.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Retrieve the current listing. No retries: the next cycle is the retry.
    async fn fetch(&self) -> Result<Listing>;
}

/// Listing source backed by the public JSON endpoint.
pub struct HttpListingSource {
    client: Client,
    url: String,
}

impl HttpListingSource {
    /// Create a source with the configured endpoint and timeout.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = http::create_listing_client(config)?;
        Ok(Self::with_client(client, &config.listing_url))
    }

    pub fn with_client(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl ListingSource for HttpListingSource {
    async fn fetch(&self) -> Result<Listing> {
        log::debug!("Fetching listing from {}", self.url);
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(AppError::transport)?;
        let body = response.bytes().await.map_err(AppError::transport)?;

        let listing = Listing::from_slice(&body)?;
        log::debug!(
            "Fetched {} records ({} rejected)",
            listing.records.len(),
            listing.rejected
        );
        Ok(listing)
    }
}
