// SPDX-FileCopyrightText: 2026 Adrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Publication lifecycle for adrelay.
//!
//! Everything that moves a draft from "requested" to "published" to "gone":
//! request intake, the shared publication service, the payment poller, the
//! expiry cleaner, the stale-pending reaper, and the supervision that keeps
//! those loops alive until shutdown.

pub mod expiry;
pub mod intake;
pub mod metrics;
pub mod poller;
pub mod publication;
pub mod reaper;
pub mod shutdown;
pub mod supervisor;

pub use expiry::{ExpiryCleaner, ExpiryReport};
pub use intake::{IntakeService, QuotaSnapshot};
pub use poller::{PaymentPoller, PollReport};
pub use publication::{DeletionOutcome, PublicationService, PublishOutcome, RecoveryReport};
pub use reaper::{ReapReport, StaleReaper};
pub use supervisor::{spawn_periodic, CycleTask, Supervisor};
