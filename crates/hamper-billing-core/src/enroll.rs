//! Enrollment and conflict resolution
//!
//! Enrollment is the only way subscriptions are created. Each requested item
//! is checked against the user's active subscriptions for a
//! (product, variant, frequency) match; matches either block the whole
//! request with a typed conflict (no partial writes) or, under force-merge,
//! fold their quantity into the existing subscription.

use chrono::NaiveDate;
use std::collections::HashMap;

use hamper_db::{CreateSubscription, CreateSubscriptionItem, SubscriptionRow};
use hamper_types::{
    AddressId, Frequency, LineItem, Product, ProductId, Subscription, SubscriptionId,
    SubscriptionStatus, UserId,
};

use crate::{error::BillingError, payment::PaymentMethod, service::BillingService};

/// Enrollment request
#[derive(Debug, Clone)]
pub struct EnrollmentRequest {
    /// Enrolling user
    pub user_id: UserId,
    /// Requested product lines
    pub items: Vec<LineItem>,
    /// Delivery cadence for every line in the request
    pub frequency: Frequency,
    /// Delivery address, must belong to the user
    pub delivery_address_id: AddressId,
    /// First due date; defaults to today
    pub start_date: Option<NaiveDate>,
    /// Merge into existing matching subscriptions instead of blocking
    pub force_merge: bool,
    /// Payment method to tokenize
    pub payment_method: PaymentMethod,
}

/// An item that collides with an existing active subscription
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SubscriptionConflict {
    /// Conflicting product
    pub product_id: ProductId,
    /// Product name, for the confirmation dialog
    pub product_name: String,
    /// The subscription already covering this item
    pub subscription_id: SubscriptionId,
}

/// Result of an enrollment attempt
///
/// A conflict is a confirmation round-trip to the caller, not an error:
/// the caller re-submits with force-merge or abandons.
#[derive(Debug, Clone)]
pub enum EnrollmentOutcome {
    /// Subscriptions created or merged into
    Enrolled(Vec<Subscription>),
    /// At least one item matched an active subscription and force-merge was
    /// not set; nothing was written
    Conflict(Vec<SubscriptionConflict>),
}

impl BillingService {
    /// Enroll a bundle of items at the given cadence
    ///
    /// `today` is the fallback start date; passing it in keeps enrollment a
    /// pure function of its inputs.
    pub async fn enroll(
        &self,
        request: EnrollmentRequest,
        today: NaiveDate,
    ) -> Result<EnrollmentOutcome, BillingError> {
        let products = self.validate(&request).await?;
        let token = self.tokenizer.tokenize(&request.payment_method);

        // Scan before any write so a blocked request leaves no partial state
        let mut merges: Vec<(&LineItem, SubscriptionRow)> = Vec::new();
        let mut fresh: Vec<&LineItem> = Vec::new();
        let mut conflicts = Vec::new();

        for item in &request.items {
            let existing = self
                .stores
                .subscriptions
                .find_active_matching(
                    request.user_id.0,
                    item.product_id().0,
                    item.variant_weight(),
                    &request.frequency.to_string(),
                )
                .await?;

            match existing {
                Some(row) => {
                    let name = products
                        .get(&item.product_id())
                        .map(|p| p.name.clone())
                        .unwrap_or_default();
                    conflicts.push(SubscriptionConflict {
                        product_id: item.product_id(),
                        product_name: name,
                        subscription_id: SubscriptionId(row.id),
                    });
                    merges.push((item, row));
                }
                None => fresh.push(item),
            }
        }

        if !conflicts.is_empty() && !request.force_merge {
            tracing::info!(
                user_id = %request.user_id,
                conflicts = conflicts.len(),
                "Enrollment blocked on existing subscriptions"
            );
            return Ok(EnrollmentOutcome::Conflict(conflicts));
        }

        let start_date = request.start_date.unwrap_or(today);
        let mut affected = Vec::new();

        for (item, row) in merges {
            self.stores
                .subscriptions
                .add_item_quantity(
                    row.id,
                    item.product_id().0,
                    item.variant_weight(),
                    item.quantity(),
                )
                .await?;
            affected.push(row.id);
        }

        for item in fresh {
            let row = self
                .stores
                .subscriptions
                .create(CreateSubscription {
                    id: SubscriptionId::new().0,
                    user_id: request.user_id.0,
                    delivery_address_id: request.delivery_address_id.0,
                    frequency: request.frequency.to_string(),
                    status: SubscriptionStatus::Active.to_string(),
                    next_delivery_date: start_date,
                    payment_token: token.clone(),
                    items: vec![CreateSubscriptionItem {
                        product_id: item.product_id().0,
                        quantity: item.quantity(),
                        variant_weight: item.variant_weight().map(str::to_string),
                        variant_price_cents: match item {
                            LineItem::Standard { .. } => None,
                            LineItem::Variant { price_cents, .. } => Some(*price_cents),
                        },
                    }],
                })
                .await?;
            affected.push(row.id);
        }

        // Enrollment consumes the cart
        let cleared = self.stores.carts.clear_for_user(request.user_id.0).await?;

        tracing::info!(
            user_id = %request.user_id,
            subscriptions = affected.len(),
            cart_items_cleared = cleared,
            "Enrollment complete"
        );

        let mut subscriptions = Vec::with_capacity(affected.len());
        for id in affected {
            let row = self
                .stores
                .subscriptions
                .find_by_id(id)
                .await?
                .ok_or(BillingError::SubscriptionNotFound)?;
            subscriptions.push(self.load_subscription(row).await?);
        }

        Ok(EnrollmentOutcome::Enrolled(subscriptions))
    }

    /// Validate the request and resolve every product it references
    async fn validate(
        &self,
        request: &EnrollmentRequest,
    ) -> Result<HashMap<ProductId, Product>, BillingError> {
        if request.items.is_empty() {
            return Err(BillingError::Validation(
                "enrollment requires at least one item".to_string(),
            ));
        }

        self.stores
            .users
            .find_by_id(request.user_id.0)
            .await?
            .ok_or(BillingError::UserNotFound)?;

        let mut products = HashMap::new();
        let mut seen = Vec::new();

        for item in &request.items {
            if item.quantity() < 1 {
                return Err(BillingError::Validation(format!(
                    "quantity for product {} must be at least 1",
                    item.product_id()
                )));
            }

            let key = (item.product_id(), item.variant_weight().map(str::to_string));
            if seen.contains(&key) {
                return Err(BillingError::Validation(format!(
                    "duplicate line for product {}",
                    item.product_id()
                )));
            }
            seen.push(key);

            // Read the catalog directly: enrollment must see the current
            // active flag, not a sweep-cached row
            let product = self
                .stores
                .products
                .find_by_id(item.product_id().0)
                .await?
                .map(|row| row.into_product())
                .filter(|p| p.active)
                .ok_or_else(|| {
                    BillingError::Validation(format!(
                        "unknown or inactive product {}",
                        item.product_id()
                    ))
                })?;
            products.insert(item.product_id(), product);
        }

        let address = self
            .stores
            .addresses
            .find_by_id(request.delivery_address_id.0)
            .await?;
        match address {
            Some(row) if row.user_id == request.user_id.0 => {}
            _ => {
                return Err(BillingError::Validation(format!(
                    "unknown delivery address {}",
                    request.delivery_address_id
                )))
            }
        }

        Ok(products)
    }
}
