//! Billing configuration

use std::time::Duration;

use crate::policy::FailurePolicy;

/// Subscription discount applied to every billed unit price, in basis points
pub const DEFAULT_DISCOUNT_BPS: u32 = 1_500;

/// Billing service configuration
#[derive(Debug, Clone)]
pub struct BillingConfig {
    /// Subscription discount in basis points (1500 = 15%)
    pub discount_bps: u32,
    /// What to do with subscriptions that keep failing to bill
    pub failure_policy: FailurePolicy,
    /// How long catalog lookups may be served from cache during a sweep
    pub product_cache_ttl: Duration,
    /// Product cache capacity
    pub product_cache_capacity: u64,
}

impl BillingConfig {
    /// Create a config with the default discount and retry-forever policy
    pub fn new() -> Self {
        Self {
            discount_bps: DEFAULT_DISCOUNT_BPS,
            failure_policy: FailurePolicy::RetryForever,
            product_cache_ttl: Duration::from_secs(60),
            product_cache_capacity: 10_000,
        }
    }

    /// Set the subscription discount in basis points
    pub fn with_discount_bps(mut self, bps: u32) -> Self {
        self.discount_bps = bps;
        self
    }

    /// Set the failure-escalation policy
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Set the product cache time-to-live
    pub fn with_product_cache_ttl(mut self, ttl: Duration) -> Self {
        self.product_cache_ttl = ttl;
        self
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self::new()
    }
}
