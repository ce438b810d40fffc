//! The billing sweep
//!
//! A pure function of its as-of date: discover due subscriptions, bill each
//! one atomically, and report what happened. Re-running for the same date
//! finds nothing due because every successful cycle advances the
//! subscription's due date past it.

use chrono::NaiveDate;
use serde::Serialize;

use hamper_db::{ApplyCycle, CreateLedgerEntry, CycleOutcome, SubscriptionRow};
use hamper_types::{
    EntryDirection, EntryStatus, LedgerEntryId, OrderId, SubscriptionId, SubscriptionStatus,
    UserId,
};

use crate::{
    cadence,
    emitter::{self, ResolvedLine},
    error::BillingError,
    service::BillingService,
};

/// Outcome of one subscription's billing cycle within a sweep
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CycleStatus {
    /// Wallet debited, order emitted, due date advanced
    Billed {
        /// The emitted order
        order_id: OrderId,
        /// Cycle total in cents
        total_cents: i64,
    },
    /// Balance below the cycle total; a failed debit was recorded and the
    /// subscription is retried next tick
    InsufficientFunds {
        /// Cycle total in cents
        required_cents: i64,
        /// Balance at decision time
        balance_cents: i64,
    },
    /// The failure policy paused the subscription after repeated failures
    Paused {
        /// Consecutive failed attempts including this one
        consecutive_failures: u32,
    },
    /// Nothing billable this cycle; no writes
    Skipped {
        /// Why the cycle was skipped
        reason: String,
    },
    /// The cycle errored; other subscriptions are unaffected
    Failed {
        /// Rendered error
        error: String,
    },
}

impl CycleStatus {
    fn label(&self) -> &'static str {
        match self {
            Self::Billed { .. } => "billed",
            Self::InsufficientFunds { .. } => "insufficient_funds",
            Self::Paused { .. } => "paused",
            Self::Skipped { .. } => "skipped",
            Self::Failed { .. } => "failed",
        }
    }
}

/// One subscription's result within a sweep
#[derive(Debug, Clone, Serialize)]
pub struct CycleResult {
    /// Billed subscription
    pub subscription_id: SubscriptionId,
    /// Owning user
    pub user_id: UserId,
    /// What happened
    #[serde(flatten)]
    pub outcome: CycleStatus,
}

/// Summary of one sweep run
#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    /// The date the sweep billed as of
    pub as_of: NaiveDate,
    /// How many subscriptions were due
    pub due: usize,
    /// Successfully billed cycles
    pub billed: usize,
    /// Cycles left for retry on insufficient funds
    pub insufficient_funds: usize,
    /// Subscriptions paused by the failure policy
    pub paused: usize,
    /// Cycles skipped without writes
    pub skipped: usize,
    /// Cycles that errored
    pub failed: usize,
    /// Per-subscription outcomes
    pub cycles: Vec<CycleResult>,
}

impl SweepReport {
    fn new(as_of: NaiveDate, due: usize) -> Self {
        Self {
            as_of,
            due,
            billed: 0,
            insufficient_funds: 0,
            paused: 0,
            skipped: 0,
            failed: 0,
            cycles: Vec::with_capacity(due),
        }
    }

    fn record(&mut self, result: CycleResult) {
        match result.outcome {
            CycleStatus::Billed { .. } => self.billed += 1,
            CycleStatus::InsufficientFunds { .. } => self.insufficient_funds += 1,
            CycleStatus::Paused { .. } => self.paused += 1,
            CycleStatus::Skipped { .. } => self.skipped += 1,
            CycleStatus::Failed { .. } => self.failed += 1,
        }
        self.cycles.push(result);
    }
}

impl BillingService {
    /// Run one billing sweep as of the given date
    ///
    /// Each due subscription is billed independently; one cycle's failure
    /// never aborts or rolls back another's.
    pub async fn run_sweep(&self, as_of: NaiveDate) -> Result<SweepReport, BillingError> {
        let due = self.stores.subscriptions.find_due(as_of).await?;

        tracing::info!(%as_of, due = due.len(), "Billing sweep started");

        let mut report = SweepReport::new(as_of, due.len());
        for row in due {
            let subscription_id = SubscriptionId(row.id);
            let user_id = UserId(row.user_id);

            let outcome = self.bill_subscription(row, as_of).await;

            metrics::counter!("billing_cycles_total", "outcome" => outcome.label()).increment(1);
            report.record(CycleResult {
                subscription_id,
                user_id,
                outcome,
            });
        }

        tracing::info!(
            %as_of,
            due = report.due,
            billed = report.billed,
            insufficient_funds = report.insufficient_funds,
            paused = report.paused,
            skipped = report.skipped,
            failed = report.failed,
            "Billing sweep finished"
        );

        Ok(report)
    }

    /// Bill one subscription, absorbing its failures into a cycle outcome
    async fn bill_subscription(&self, row: SubscriptionRow, as_of: NaiveDate) -> CycleStatus {
        let subscription_id = SubscriptionId(row.id);

        match self.try_bill(&row, as_of).await {
            Ok(status) => status,
            Err(BillingError::InsufficientFunds {
                required_cents,
                balance_cents,
            }) => match self.record_failed_attempt(&row, required_cents).await {
                Ok(Some(consecutive_failures)) => CycleStatus::Paused {
                    consecutive_failures,
                },
                Ok(None) => {
                    tracing::warn!(
                        subscription_id = %subscription_id,
                        required_cents,
                        balance_cents,
                        "Insufficient funds; cycle left for retry"
                    );
                    CycleStatus::InsufficientFunds {
                        required_cents,
                        balance_cents,
                    }
                }
                Err(e) => CycleStatus::Failed {
                    error: e.to_string(),
                },
            },
            Err(BillingError::MissingReference(what)) => {
                tracing::warn!(subscription_id = %subscription_id, %what, "Cycle skipped");
                CycleStatus::Skipped { reason: what }
            }
            Err(e) => {
                tracing::error!(subscription_id = %subscription_id, error = %e, "Cycle failed");
                CycleStatus::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    async fn try_bill(
        &self,
        row: &SubscriptionRow,
        as_of: NaiveDate,
    ) -> Result<CycleStatus, BillingError> {
        let items = self.stores.subscriptions.find_items(row.id).await?;
        let subscription = row.clone().into_subscription(items)?;

        if self
            .stores
            .addresses
            .find_by_id(subscription.delivery_address_id.0)
            .await?
            .is_none()
        {
            return Err(BillingError::MissingReference(format!(
                "delivery address {} not found",
                subscription.delivery_address_id
            )));
        }

        // Resolve lines against the catalog; vanished products drop out of
        // the cycle rather than failing it
        let mut lines = Vec::with_capacity(subscription.items.len());
        for item in &subscription.items {
            let Some(product) = self.lookup_product(item.product_id()).await? else {
                tracing::warn!(
                    subscription_id = %subscription.id,
                    product_id = %item.product_id(),
                    "Product missing from catalog; line not billed"
                );
                continue;
            };

            let unit_price_cents = emitter::discounted_unit_price(
                item.unit_price_cents(product.price_cents),
                self.config.discount_bps,
            );
            lines.push(ResolvedLine {
                product_id: item.product_id(),
                name: product.name,
                quantity: item.quantity(),
                unit_price_cents,
                variant_weight: item.variant_weight().map(str::to_string),
            });
        }

        let total_cents = emitter::cycle_total(&lines);
        if total_cents == 0 {
            return Ok(CycleStatus::Skipped {
                reason: "cycle total is zero".to_string(),
            });
        }

        // Advance from the current due date, not from today
        let next_delivery_date = cadence::advance(subscription.frequency, subscription.next_delivery_date);

        let order = emitter::build_order(
            OrderId::new().0,
            subscription.user_id,
            subscription.id,
            subscription.delivery_address_id,
            lines,
            as_of,
        );

        let outcome = self
            .stores
            .cycles
            .apply_cycle(ApplyCycle {
                subscription_id: subscription.id.0,
                user_id: subscription.user_id.0,
                total_cents,
                expected_next_delivery_date: subscription.next_delivery_date,
                next_delivery_date,
                billed_on: as_of,
                ledger_entry_id: LedgerEntryId::new().0,
                description: format!("subscription billing for {}", subscription.id),
                order,
            })
            .await?;

        match outcome {
            CycleOutcome::Applied { order_id } => {
                tracing::info!(
                    subscription_id = %subscription.id,
                    order_id = %order_id,
                    total_cents,
                    %next_delivery_date,
                    "Cycle billed"
                );
                Ok(CycleStatus::Billed {
                    order_id: OrderId(order_id),
                    total_cents,
                })
            }
            CycleOutcome::InsufficientFunds { balance_cents } => {
                Err(BillingError::InsufficientFunds {
                    required_cents: total_cents,
                    balance_cents,
                })
            }
            CycleOutcome::AlreadyBilled => Ok(CycleStatus::Skipped {
                reason: "cycle already billed".to_string(),
            }),
        }
    }

    /// Record a failed debit and consult the failure policy. Returns the
    /// consecutive-failure count when the policy paused the subscription.
    async fn record_failed_attempt(
        &self,
        row: &SubscriptionRow,
        required_cents: i64,
    ) -> Result<Option<u32>, BillingError> {
        self.stores
            .ledger
            .create(CreateLedgerEntry {
                id: LedgerEntryId::new().0,
                user_id: row.user_id,
                subscription_id: Some(row.id),
                amount_cents: required_cents,
                direction: EntryDirection::Debit.to_string(),
                status: EntryStatus::Failed.to_string(),
                description: format!("insufficient funds for subscription {}", row.id),
            })
            .await?;

        let failures = self
            .stores
            .ledger
            .count_failures_since_success(row.id)
            .await
            .map(|n| n.max(0) as u32)?;

        if self.config.failure_policy.should_pause(failures) {
            self.stores
                .subscriptions
                .update_status(row.id, &SubscriptionStatus::Paused.to_string())
                .await?;
            tracing::warn!(
                subscription_id = %row.id,
                consecutive_failures = failures,
                "Failure policy paused subscription"
            );
            return Ok(Some(failures));
        }

        Ok(None)
    }
}
