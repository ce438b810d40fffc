//! Subscription handlers

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::instrument;
use uuid::Uuid;

use hamper_billing_core::{EnrollmentOutcome, EnrollmentRequest, PaymentMethod};
use hamper_types::{
    Address, AddressId, Frequency, LineItem, Order, ProductId, Subscription, SubscriptionId,
    UserId,
};

use crate::error::{ApiError, ApiResult};
use crate::handlers::shared::record_op_duration;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct EnrollRequest {
    pub user_id: String,
    pub items: Vec<EnrollItem>,
    pub frequency: String,
    pub delivery_address_id: String,
    pub start_date: Option<chrono::NaiveDate>,
    #[serde(default)]
    pub force_merge: bool,
    pub payment_method: PaymentMethod,
}

/// One requested line; variant fields come together or not at all
#[derive(Debug, Deserialize)]
pub struct EnrollItem {
    pub product_id: String,
    pub quantity: u32,
    pub variant_weight: Option<String>,
    pub variant_price_cents: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct EnrollResponse {
    pub subscriptions: Vec<SubscriptionResponse>,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    pub id: String,
    pub user_id: String,
    pub delivery_address_id: String,
    pub frequency: String,
    pub status: String,
    pub next_delivery_date: String,
    pub last_delivery_date: Option<String>,
    pub items: Vec<ItemResponse>,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct ItemResponse {
    pub product_id: String,
    pub quantity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_weight: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_price_cents: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UserParams {
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct ListSubscriptionsResponse {
    pub subscriptions: Vec<SubscriptionResponse>,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionDetailResponse {
    pub subscription: SubscriptionResponse,
    pub orders: Vec<OrderResponse>,
    pub addresses: Vec<AddressResponse>,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub subscription_id: Option<String>,
    pub status: String,
    pub payment_status: String,
    pub order_type: String,
    pub total_cents: i64,
    pub placed_on: String,
    pub created_at: String,
    pub items: Vec<OrderItemResponse>,
}

#[derive(Debug, Serialize)]
pub struct OrderItemResponse {
    pub product_id: String,
    pub name: String,
    pub unit_price_cents: i64,
    pub quantity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_weight: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AddressResponse {
    pub id: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub postal_code: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/subscriptions
#[instrument(skip(state, req), fields(user_id = %req.user_id, items = req.items.len()))]
pub async fn enroll(
    State(state): State<AppState>,
    Json(req): Json<EnrollRequest>,
) -> ApiResult<(StatusCode, Json<EnrollResponse>)> {
    let start = Instant::now();

    let user_id = parse_user_id(&req.user_id)?;
    let delivery_address_id = AddressId(parse_uuid(&req.delivery_address_id, "delivery_address_id")?);

    let frequency: Frequency = req
        .frequency
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid frequency: {}", req.frequency)))?;

    let items = req
        .items
        .iter()
        .map(item_to_line)
        .collect::<Result<Vec<_>, _>>()?;

    let outcome = state
        .billing
        .enroll(
            EnrollmentRequest {
                user_id,
                items,
                frequency,
                delivery_address_id,
                start_date: req.start_date,
                force_merge: req.force_merge,
                payment_method: req.payment_method,
            },
            chrono::Utc::now().date_naive(),
        )
        .await?;

    match outcome {
        EnrollmentOutcome::Enrolled(subscriptions) => {
            metrics::counter!("billing_enrollments_total", "result" => "enrolled").increment(1);
            record_op_duration("enroll", start, true);

            tracing::info!(user_id = %user_id, count = subscriptions.len(), "Enrollment accepted");

            Ok((
                StatusCode::CREATED,
                Json(EnrollResponse {
                    subscriptions: subscriptions
                        .into_iter()
                        .map(subscription_to_response)
                        .collect(),
                }),
            ))
        }
        EnrollmentOutcome::Conflict(conflicts) => {
            metrics::counter!("billing_enrollments_total", "result" => "conflict").increment(1);
            record_op_duration("enroll", start, true);

            Err(ApiError::SubscriptionConflict(conflicts))
        }
    }
}

/// GET /api/v1/subscriptions
#[instrument(skip(state, params), fields(user_id = %params.user_id))]
pub async fn list_subscriptions(
    State(state): State<AppState>,
    Query(params): Query<UserParams>,
) -> ApiResult<Json<ListSubscriptionsResponse>> {
    let start = Instant::now();

    let user_id = parse_user_id(&params.user_id)?;
    let subscriptions = state.billing.list_subscriptions(user_id).await?;

    record_op_duration("list_subscriptions", start, true);

    Ok(Json(ListSubscriptionsResponse {
        subscriptions: subscriptions
            .into_iter()
            .map(subscription_to_response)
            .collect(),
    }))
}

/// GET /api/v1/subscriptions/{id}
#[instrument(skip(state, params), fields(subscription_id = %subscription_id))]
pub async fn get_subscription(
    State(state): State<AppState>,
    Path(subscription_id): Path<Uuid>,
    Query(params): Query<UserParams>,
) -> ApiResult<Json<SubscriptionDetailResponse>> {
    let start = Instant::now();

    let user_id = parse_user_id(&params.user_id)?;
    let detail = state
        .billing
        .subscription_detail(user_id, SubscriptionId(subscription_id))
        .await?;

    record_op_duration("get_subscription", start, true);

    Ok(Json(SubscriptionDetailResponse {
        subscription: subscription_to_response(detail.subscription),
        orders: detail.orders.into_iter().map(order_to_response).collect(),
        addresses: detail
            .addresses
            .into_iter()
            .map(address_to_response)
            .collect(),
    }))
}

/// DELETE /api/v1/subscriptions/{id}
#[instrument(skip(state, params), fields(subscription_id = %subscription_id))]
pub async fn cancel_subscription(
    State(state): State<AppState>,
    Path(subscription_id): Path<Uuid>,
    Query(params): Query<UserParams>,
) -> ApiResult<Json<SubscriptionResponse>> {
    let start = Instant::now();

    let user_id = parse_user_id(&params.user_id)?;
    let subscription = state
        .billing
        .cancel(user_id, SubscriptionId(subscription_id))
        .await?;

    metrics::counter!("billing_subscriptions_cancelled_total").increment(1);
    record_op_duration("cancel_subscription", start, true);

    Ok(Json(subscription_to_response(subscription)))
}

/// POST /api/v1/subscriptions/{id}/pause
#[instrument(skip(state, req), fields(subscription_id = %subscription_id))]
pub async fn pause_subscription(
    State(state): State<AppState>,
    Path(subscription_id): Path<Uuid>,
    Json(req): Json<UserParams>,
) -> ApiResult<Json<SubscriptionResponse>> {
    let start = Instant::now();

    let user_id = parse_user_id(&req.user_id)?;
    let subscription = state
        .billing
        .pause(user_id, SubscriptionId(subscription_id))
        .await?;

    record_op_duration("pause_subscription", start, true);

    Ok(Json(subscription_to_response(subscription)))
}

/// POST /api/v1/subscriptions/{id}/resume
#[instrument(skip(state, req), fields(subscription_id = %subscription_id))]
pub async fn resume_subscription(
    State(state): State<AppState>,
    Path(subscription_id): Path<Uuid>,
    Json(req): Json<UserParams>,
) -> ApiResult<Json<SubscriptionResponse>> {
    let start = Instant::now();

    let user_id = parse_user_id(&req.user_id)?;
    let subscription = state
        .billing
        .resume(user_id, SubscriptionId(subscription_id))
        .await?;

    record_op_duration("resume_subscription", start, true);

    Ok(Json(subscription_to_response(subscription)))
}

// ============================================================================
// Conversions
// ============================================================================

fn parse_user_id(raw: &str) -> Result<UserId, ApiError> {
    UserId::parse(raw).map_err(|_| ApiError::BadRequest("Invalid user_id".to_string()))
}

fn parse_uuid(raw: &str, field: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest(format!("Invalid {field}")))
}

fn item_to_line(item: &EnrollItem) -> Result<LineItem, ApiError> {
    let product_id = ProductId(parse_uuid(&item.product_id, "product_id")?);

    match (&item.variant_weight, item.variant_price_cents) {
        (Some(weight), Some(price_cents)) => Ok(LineItem::Variant {
            product_id,
            quantity: item.quantity,
            weight: weight.clone(),
            price_cents,
        }),
        (None, None) => Ok(LineItem::Standard {
            product_id,
            quantity: item.quantity,
        }),
        _ => Err(ApiError::BadRequest(
            "variant_weight and variant_price_cents must be provided together".to_string(),
        )),
    }
}

fn subscription_to_response(sub: Subscription) -> SubscriptionResponse {
    SubscriptionResponse {
        id: sub.id.to_string(),
        user_id: sub.user_id.to_string(),
        delivery_address_id: sub.delivery_address_id.to_string(),
        frequency: sub.frequency.to_string(),
        status: sub.status.to_string(),
        next_delivery_date: sub.next_delivery_date.to_string(),
        last_delivery_date: sub.last_delivery_date.map(|d| d.to_string()),
        items: sub
            .items
            .into_iter()
            .map(|item| ItemResponse {
                product_id: item.product_id().to_string(),
                quantity: item.quantity(),
                variant_weight: item.variant_weight().map(str::to_string),
                variant_price_cents: match item {
                    LineItem::Standard { .. } => None,
                    LineItem::Variant { price_cents, .. } => Some(price_cents),
                },
            })
            .collect(),
        created_at: sub.created_at.to_rfc3339(),
    }
}

fn order_to_response(order: Order) -> OrderResponse {
    OrderResponse {
        id: order.id.to_string(),
        subscription_id: order.subscription_id.map(|id| id.to_string()),
        status: order.status.to_string(),
        payment_status: order.payment_status.to_string(),
        order_type: order.order_type.to_string(),
        total_cents: order.total_cents,
        placed_on: order.placed_on.to_string(),
        created_at: order.created_at.to_rfc3339(),
        items: order
            .items
            .into_iter()
            .map(|item| OrderItemResponse {
                product_id: item.product_id.to_string(),
                name: item.name,
                unit_price_cents: item.unit_price_cents,
                quantity: item.quantity,
                variant_weight: item.variant_weight,
            })
            .collect(),
    }
}

fn address_to_response(address: Address) -> AddressResponse {
    AddressResponse {
        id: address.id.to_string(),
        line1: address.line1,
        line2: address.line2,
        city: address.city,
        postal_code: address.postal_code,
    }
}
