// SPDX-FileCopyrightText: 2026 Adrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade so whichever recorder the host installs
//! collects these values. Without a recorder every call is a no-op.

use metrics::{describe_counter, describe_gauge};

/// Register all adrelay metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!(
        "adrelay_publications_total",
        "Posts published to the channel, by path (paid, free, recovered)"
    );
    describe_counter!(
        "adrelay_publish_failures_total",
        "Publish attempts the channel rejected or failed"
    );
    describe_counter!(
        "adrelay_payments_matched_total",
        "Bank transactions matched to pending requests"
    );
    describe_counter!(
        "adrelay_quota_claims_total",
        "Daily quota claims, by result (granted, exhausted)"
    );
    describe_gauge!("adrelay_quota_used", "Publications counted against today's quota");
    describe_counter!(
        "adrelay_posts_expired_total",
        "Published posts removed by the expiry cleaner"
    );
    describe_counter!(
        "adrelay_expiry_deferred_total",
        "Expired posts left in place because the channel refused deletion"
    );
    describe_counter!(
        "adrelay_reaped_total",
        "Abandoned rows removed by the reaper, by kind (pending, draft)"
    );
    describe_counter!(
        "adrelay_task_panics_total",
        "Background cycles that panicked, by task"
    );
}

/// Record a post landing in the channel.
pub fn record_publication(path: &'static str) {
    metrics::counter!("adrelay_publications_total", "path" => path).increment(1);
}

pub fn record_publish_failure() {
    metrics::counter!("adrelay_publish_failures_total").increment(1);
}

pub fn record_payments_matched(count: usize) {
    metrics::counter!("adrelay_payments_matched_total").increment(count as u64);
}

/// Record a quota claim and whether it was granted.
pub fn record_quota_claim(granted: bool) {
    let result = if granted { "granted" } else { "exhausted" };
    metrics::counter!("adrelay_quota_claims_total", "result" => result).increment(1);
}

pub fn set_quota_used(count: u32) {
    metrics::gauge!("adrelay_quota_used").set(f64::from(count));
}

pub fn record_post_expired() {
    metrics::counter!("adrelay_posts_expired_total").increment(1);
}

pub fn record_expiry_deferred() {
    metrics::counter!("adrelay_expiry_deferred_total").increment(1);
}

/// Record rows removed by the reaper.
pub fn record_reaped(kind: &'static str, count: u64) {
    metrics::counter!("adrelay_reaped_total", "kind" => kind).increment(count);
}

pub fn record_task_panic(task: &str) {
    metrics::counter!("adrelay_task_panics_total", "task" => task.to_string()).increment(1);
}
