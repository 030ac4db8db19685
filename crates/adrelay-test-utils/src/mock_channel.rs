// SPDX-FileCopyrightText: 2026 Adrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock channel-side collaborators for deterministic testing.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use adrelay_core::traits::adapter::PluginAdapter;
use adrelay_core::types::{AdapterType, ChannelMessageId, DeleteOutcome, Draft, HealthStatus, OwnerId, PostId};
use adrelay_core::{AdrelayError, MembershipChecker, Notifier, Publisher};

/// A mock channel publisher.
///
/// Hands out increasing message ids starting at 1000, remembers every post,
/// and answers deletions with a configurable outcome (default `Deleted`).
pub struct MockPublisher {
    next_id: AtomicI32,
    published: Mutex<Vec<(PostId, ChannelMessageId)>>,
    publish_calls: Mutex<HashMap<PostId, usize>>,
    failures_left: Mutex<usize>,
    publish_delay: Mutex<Option<Duration>>,
    delete_outcome: Mutex<DeleteOutcome>,
    deleted: Mutex<Vec<ChannelMessageId>>,
}

impl MockPublisher {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI32::new(1000),
            published: Mutex::new(Vec::new()),
            publish_calls: Mutex::new(HashMap::new()),
            failures_left: Mutex::new(0),
            publish_delay: Mutex::new(None),
            delete_outcome: Mutex::new(DeleteOutcome::Deleted),
            deleted: Mutex::new(Vec::new()),
        }
    }

    /// Make the next `n` publish calls fail with a transient channel error.
    pub async fn fail_next_publishes(&self, n: usize) {
        *self.failures_left.lock().await = n;
    }

    /// Sleep this long inside every publish call.
    pub async fn set_publish_delay(&self, delay: Duration) {
        *self.publish_delay.lock().await = Some(delay);
    }

    pub async fn set_delete_outcome(&self, outcome: DeleteOutcome) {
        *self.delete_outcome.lock().await = outcome;
    }

    /// Successful posts, in order.
    pub async fn published(&self) -> Vec<(PostId, ChannelMessageId)> {
        self.published.lock().await.clone()
    }

    /// Publish calls made for `post_id`, failed ones included.
    pub async fn publish_count(&self, post_id: &PostId) -> usize {
        self.publish_calls.lock().await.get(post_id).copied().unwrap_or(0)
    }

    /// Successful posts across all drafts.
    pub async fn total_publishes(&self) -> usize {
        self.published.lock().await.len()
    }

    /// Message ids passed to `delete`, in order.
    pub async fn deleted(&self) -> Vec<ChannelMessageId> {
        self.deleted.lock().await.clone()
    }
}

impl Default for MockPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockPublisher {
    fn name(&self) -> &str {
        "mock-publisher"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, AdrelayError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), AdrelayError> {
        Ok(())
    }
}

#[async_trait]
impl Publisher for MockPublisher {
    async fn publish(&self, draft: &Draft) -> Result<ChannelMessageId, AdrelayError> {
        *self
            .publish_calls
            .lock()
            .await
            .entry(draft.id.clone())
            .or_insert(0) += 1;

        let delay = *self.publish_delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        {
            let mut failures = self.failures_left.lock().await;
            if *failures > 0 {
                *failures -= 1;
                return Err(AdrelayError::Channel {
                    message: "mock publish failure".into(),
                    source: None,
                });
            }
        }

        let id = ChannelMessageId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.published.lock().await.push((draft.id.clone(), id));
        Ok(id)
    }

    async fn delete(&self, message_id: ChannelMessageId) -> DeleteOutcome {
        self.deleted.lock().await.push(message_id);
        self.delete_outcome.lock().await.clone()
    }
}

/// Captures notifications instead of sending them.
#[derive(Default)]
pub struct MockNotifier {
    sent: Mutex<Vec<(OwnerId, String)>>,
    failing: Mutex<bool>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every notify call fail.
    pub async fn set_failing(&self, failing: bool) {
        *self.failing.lock().await = failing;
    }

    pub async fn sent(&self) -> Vec<(OwnerId, String)> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_to(&self, owner: OwnerId) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|(to, _)| *to == owner)
            .map(|(_, text)| text.clone())
            .collect()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn notify(&self, owner: OwnerId, text: &str) -> Result<(), AdrelayError> {
        if *self.failing.lock().await {
            return Err(AdrelayError::Channel {
                message: "mock notify failure".into(),
                source: None,
            });
        }
        self.sent.lock().await.push((owner, text.to_string()));
        Ok(())
    }
}

/// Answers subscription checks from an in-memory set.
#[derive(Default)]
pub struct MockMembership {
    subscribers: Mutex<HashSet<OwnerId>>,
}

impl MockMembership {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn subscribe(&self, owner: OwnerId) {
        self.subscribers.lock().await.insert(owner);
    }

    pub async fn unsubscribe(&self, owner: OwnerId) {
        self.subscribers.lock().await.remove(&owner);
    }
}

#[async_trait]
impl MembershipChecker for MockMembership {
    async fn is_subscribed(&self, owner: OwnerId) -> Result<bool, AdrelayError> {
        Ok(self.subscribers.lock().await.contains(&owner))
    }
}
