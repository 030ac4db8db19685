// SPDX-FileCopyrightText: 2026 Adrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pairing of pending requests with incoming bank transactions.
//!
//! Matching is pure: it reads its inputs and returns pairs. Persisting the
//! outcome is the caller's job.

use std::collections::HashSet;

use adrelay_core::{PendingRequest, Transaction};

use crate::codes::normalize_code;

/// Amount and currency rules a transaction must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchPolicy {
    /// ISO 4217 numeric settlement currency.
    pub currency: u16,
    /// Minimum amount in minor units.
    pub min_amount: i64,
}

impl MatchPolicy {
    fn accepts(&self, tx: &Transaction) -> bool {
        tx.currency == self.currency && tx.amount >= self.min_amount
    }
}

/// A pending request paired with the transaction that paid for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentMatch {
    pub request: PendingRequest,
    pub transaction: Transaction,
}

/// Pair pending requests with eligible transactions.
///
/// Requests are served oldest first (ties by id). Each request takes the
/// first eligible transaction in feed order whose comment contains its
/// code, compared after [`normalize_code`]. A transaction is eligible when
/// it meets `policy`, is not in `consumed`, and has not been taken earlier
/// in this pass. No request and no transaction id appears twice in the result.
pub fn match_payments(
    pending: &[PendingRequest],
    transactions: &[Transaction],
    consumed: &HashSet<String>,
    policy: &MatchPolicy,
) -> Vec<PaymentMatch> {
    let candidates: Vec<(&Transaction, String)> = transactions
        .iter()
        .filter(|tx| policy.accepts(tx) && !consumed.contains(&tx.id))
        .map(|tx| (tx, normalize_code(&tx.comment)))
        .collect();

    let mut ordered: Vec<&PendingRequest> = pending.iter().collect();
    ordered.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

    let mut taken: HashSet<&str> = HashSet::new();
    let mut served: HashSet<&str> = HashSet::new();
    let mut matches = Vec::new();

    for request in ordered {
        if served.contains(request.id.as_str()) {
            continue;
        }
        let code = normalize_code(&request.code);
        if code.is_empty() {
            continue;
        }

        let hit = candidates
            .iter()
            .find(|(tx, comment)| !taken.contains(tx.id.as_str()) && comment.contains(&code));

        if let Some((tx, _)) = hit {
            taken.insert(tx.id.as_str());
            served.insert(request.id.as_str());
            matches.push(PaymentMatch {
                request: request.clone(),
                transaction: (*tx).clone(),
            });
        }
    }

    matches
}
