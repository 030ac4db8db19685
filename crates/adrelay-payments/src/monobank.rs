// SPDX-FileCopyrightText: 2026 Adrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Monobank personal statement API.
//!
//! Provides [`MonobankClient`], which implements [`BankStatementClient`] by
//! fetching `GET /personal/statement/{account}/{from}` and retrying
//! transient errors.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use tracing::{debug, warn};

use adrelay_config::model::BankConfig;
use adrelay_core::{
    AdapterType, AdrelayError, BankStatementClient, HealthStatus, PluginAdapter, Transaction,
    TransactionStream,
};

/// The statement endpoint serves at most 31 days and one hour per request.
const MAX_LOOKBACK: Duration = Duration::from_secs((31 * 24 + 1) * 3600);

/// One line of a Monobank statement. Only the fields matching needs.
#[derive(Debug, Deserialize)]
struct StatementItem {
    id: String,
    #[serde(default)]
    comment: Option<String>,
    amount: i64,
    #[serde(rename = "currencyCode")]
    currency_code: u16,
}

impl From<StatementItem> for Transaction {
    fn from(item: StatementItem) -> Self {
        Transaction {
            id: item.id,
            comment: item.comment.unwrap_or_default(),
            amount: item.amount,
            currency: item.currency_code,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    #[serde(rename = "errorDescription")]
    error_description: String,
}

/// Monobank statement feed.
#[derive(Debug, Clone)]
pub struct MonobankClient {
    client: reqwest::Client,
    base_url: String,
    account: String,
    max_retries: u32,
}

impl MonobankClient {
    /// Builds a client from the `[bank]` config section. The token is required.
    pub fn new(config: &BankConfig) -> Result<Self, AdrelayError> {
        let token = config
            .token
            .as_deref()
            .ok_or_else(|| AdrelayError::Config("bank.token is required".into()))?;

        let mut headers = HeaderMap::new();
        let mut token_value = HeaderValue::from_str(token)
            .map_err(|e| AdrelayError::Config(format!("invalid bank token header value: {e}")))?;
        token_value.set_sensitive(true);
        headers.insert("x-token", token_value);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AdrelayError::Bank {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            account: config.account.clone(),
            max_retries: config.max_retries,
        })
    }

    /// Overrides the base URL (for testing with wiremock).
    #[cfg(test)]
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    /// Fetches statement lines booked within `lookback` of now.
    ///
    /// On transient errors (429, 500, 502, 503), retries after a 1-second delay.
    pub async fn fetch_statement(&self, lookback: Duration) -> Result<Vec<Transaction>, AdrelayError> {
        let lookback = lookback.min(MAX_LOOKBACK);
        let from = Utc::now().timestamp() - lookback.as_secs() as i64;
        let url = format!(
            "{}/personal/statement/{}/{}",
            self.base_url, self.account, from
        );

        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying statement request after transient error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }

            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| AdrelayError::Bank {
                    message: format!("HTTP request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(status = %status, attempt, "statement response received");

            if status.is_success() {
                let body = response.text().await.map_err(|e| AdrelayError::Bank {
                    message: format!("failed to read response body: {e}"),
                    source: Some(Box::new(e)),
                })?;
                let items: Vec<StatementItem> =
                    serde_json::from_str(&body).map_err(|e| AdrelayError::Bank {
                        message: format!("failed to parse statement: {e}"),
                        source: Some(Box::new(e)),
                    })?;
                return Ok(items.into_iter().map(Transaction::from).collect());
            }

            if is_transient_error(status) && attempt < self.max_retries {
                let body = response.text().await.unwrap_or_default();
                warn!(status = %status, body = %body, "transient error, will retry");
                last_error = Some(AdrelayError::Bank {
                    message: format!("statement API returned {status}: {body}"),
                    source: None,
                });
                continue;
            }

            // Non-transient error or exhausted retries.
            let body = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(api_err) => format!(
                    "statement API error ({status}): {}",
                    api_err.error_description
                ),
                Err(_) => format!("statement API returned {status}: {body}"),
            };
            return Err(AdrelayError::Bank {
                message,
                source: None,
            });
        }

        Err(last_error.unwrap_or_else(|| AdrelayError::Bank {
            message: "statement request failed after retries".into(),
            source: None,
        }))
    }
}

/// Returns true for HTTP status codes that indicate transient errors worth retrying.
fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503)
}

#[async_trait]
impl PluginAdapter for MonobankClient {
    fn name(&self) -> &str {
        "monobank"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Bank
    }

    /// The statement endpoint is rate limited, so health is not checked remotely.
    async fn health_check(&self) -> Result<HealthStatus, AdrelayError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), AdrelayError> {
        Ok(())
    }
}

#[async_trait]
impl BankStatementClient for MonobankClient {
    async fn fetch_transactions(
        &self,
        lookback: Duration,
    ) -> Result<TransactionStream, AdrelayError> {
        let transactions = self.fetch_statement(lookback).await?;
        debug!(count = transactions.len(), "fetched bank transactions");
        Ok(Box::pin(futures::stream::iter(
            transactions.into_iter().map(Ok),
        )))
    }
}
