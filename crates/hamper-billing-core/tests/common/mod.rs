//! Shared test fixtures

pub mod mock_repos;

use std::sync::Arc;

use chrono::NaiveDate;
use hamper_billing_core::{BillingConfig, BillingService};

use self::mock_repos::MemoryStore;

/// Shorthand for building test dates
pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// A billing service over a fresh in-memory store with the default config
pub fn setup() -> (Arc<MemoryStore>, BillingService) {
    setup_with_config(BillingConfig::new())
}

/// A billing service over a fresh in-memory store with the given config
#[allow(dead_code)]
pub fn setup_with_config(config: BillingConfig) -> (Arc<MemoryStore>, BillingService) {
    let store = Arc::new(MemoryStore::new());
    let service = BillingService::new(mock_repos::stores(&store), config);
    (store, service)
}
