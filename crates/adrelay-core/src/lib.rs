// SPDX-FileCopyrightText: 2026 Adrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for adrelay.
//!
//! This crate provides the domain types, the error type, and the traits
//! through which the lifecycle tasks reach storage and external services.

pub mod error;
pub mod traits;
pub mod types;

pub use error::AdrelayError;
pub use types::{
    AdData, AdapterType, ChannelMessageId, ConfirmedRecord, DeleteOutcome, Draft, HealthStatus,
    NewConfirmation, OwnerId, PendingRequest, PostId, Publication, PublishedPost, QuotaEntry,
    Transaction, FREE_CODE,
};

pub use traits::{
    BankStatementClient, ConfirmedStore, DraftStore, ListingParser, MembershipChecker, Notifier,
    PendingStore, PluginAdapter, Publisher, QuotaCounter, StorageAdapter, Store,
    TransactionStream,
};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn adrelay_error_has_all_variants() {
        let _config = AdrelayError::Config("test".into());
        let _storage = AdrelayError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _channel = AdrelayError::Channel {
            message: "test".into(),
            source: None,
        };
        let _rejected = AdrelayError::Rejected {
            message: "test".into(),
        };
        let _bank = AdrelayError::Bank {
            message: "test".into(),
            source: None,
        };
        let _parse = AdrelayError::Parse {
            message: "test".into(),
        };
        let _timeout = AdrelayError::Timeout {
            duration: std::time::Duration::from_secs(30),
        };
        let _internal = AdrelayError::Internal("test".into());
    }

    #[test]
    fn only_refusals_and_config_are_permanent() {
        assert!(AdrelayError::Rejected { message: "no rights".into() }.is_permanent());
        assert!(AdrelayError::Config("bad".into()).is_permanent());
        assert!(
            !AdrelayError::Channel {
                message: "timeout".into(),
                source: None
            }
            .is_permanent()
        );
        assert!(!AdrelayError::Internal("x".into()).is_permanent());
    }

    #[test]
    fn adapter_type_round_trips_through_strings() {
        use std::str::FromStr;

        for variant in [
            AdapterType::Storage,
            AdapterType::Channel,
            AdapterType::Bank,
            AdapterType::Parser,
        ] {
            let s = variant.to_string();
            assert_eq!(AdapterType::from_str(&s).expect("should parse back"), variant);
        }
    }

    #[test]
    fn adapter_type_serialization() {
        let bank = AdapterType::Bank;
        let json = serde_json::to_string(&bank).expect("should serialize");
        let parsed: AdapterType = serde_json::from_str(&json).expect("should deserialize");
        assert_eq!(bank, parsed);
    }

    #[test]
    fn delete_outcome_gone_only_for_deleted_and_not_found() {
        assert!(DeleteOutcome::Deleted.is_gone());
        assert!(DeleteOutcome::NotFound.is_gone());
        assert!(!DeleteOutcome::Forbidden("too old".into()).is_gone());
        assert!(!DeleteOutcome::Failed("network".into()).is_gone());
    }

    #[test]
    fn draft_from_ad_starts_unpublished() {
        let ad = AdData {
            title: "Stroller".into(),
            price: "1200 грн".into(),
            description: "Barely used".into(),
            image_url: None,
            source_url: "https://www.olx.ua/d/obyavlenie/stroller".into(),
        };
        let draft = Draft::from_ad(PostId("p1".into()), OwnerId(42), ad, Utc::now());
        assert!(!draft.is_published());
        assert_eq!(draft.owner, OwnerId(42));
        assert_eq!(draft.title, "Stroller");
    }

    #[test]
    fn all_trait_modules_are_exported() {
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_storage_adapter<T: StorageAdapter>() {}
        fn _assert_store<T: Store + ?Sized>() {}
        fn _assert_publisher<T: Publisher>() {}
        fn _assert_bank<T: BankStatementClient>() {}
        fn _assert_notifier<T: Notifier + ?Sized>() {}
        fn _assert_membership<T: MembershipChecker + ?Sized>() {}
        fn _assert_parser<T: ListingParser + ?Sized>() {}
        _assert_store::<dyn Store>();
    }
}
