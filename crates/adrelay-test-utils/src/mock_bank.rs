// SPDX-FileCopyrightText: 2026 Adrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock bank statement feed.
//!
//! `MockBank` serves whatever statement the test scripted. Like the real
//! feed it returns the same transactions on every call until told otherwise.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use adrelay_core::traits::adapter::PluginAdapter;
use adrelay_core::types::{AdapterType, HealthStatus, Transaction};
use adrelay_core::{AdrelayError, BankStatementClient, TransactionStream};

#[derive(Default)]
pub struct MockBank {
    transactions: Mutex<Vec<Transaction>>,
    fail_next: Mutex<bool>,
    fetches: Mutex<Vec<Duration>>,
}

impl MockBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_transactions(&self, transactions: Vec<Transaction>) {
        *self.transactions.lock().await = transactions;
    }

    pub async fn push_transaction(&self, transaction: Transaction) {
        self.transactions.lock().await.push(transaction);
    }

    /// Make the next fetch fail with a bank error.
    pub async fn fail_next_fetch(&self) {
        *self.fail_next.lock().await = true;
    }

    /// Lookback windows requested so far.
    pub async fn fetches(&self) -> Vec<Duration> {
        self.fetches.lock().await.clone()
    }
}

#[async_trait]
impl PluginAdapter for MockBank {
    fn name(&self) -> &str {
        "mock-bank"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Bank
    }

    async fn health_check(&self) -> Result<HealthStatus, AdrelayError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), AdrelayError> {
        Ok(())
    }
}

#[async_trait]
impl BankStatementClient for MockBank {
    async fn fetch_transactions(
        &self,
        lookback: Duration,
    ) -> Result<TransactionStream, AdrelayError> {
        self.fetches.lock().await.push(lookback);
        {
            let mut fail = self.fail_next.lock().await;
            if *fail {
                *fail = false;
                return Err(AdrelayError::Bank {
                    message: "mock statement unavailable".into(),
                    source: None,
                });
            }
        }
        let items: Vec<Result<Transaction, AdrelayError>> = self
            .transactions
            .lock()
            .await
            .iter()
            .cloned()
            .map(Ok)
            .collect();
        Ok(Box::pin(futures::stream::iter(items)))
    }
}
