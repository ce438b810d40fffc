//! Wallet handlers

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::instrument;

use hamper_types::{LedgerEntry, UserId};

use crate::error::{ApiError, ApiResult};
use crate::handlers::shared::record_op_duration;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct WalletParams {
    pub user_id: String,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct WalletResponse {
    pub balance_cents: i64,
    pub entries: Vec<LedgerEntryResponse>,
}

#[derive(Debug, Serialize)]
pub struct LedgerEntryResponse {
    pub id: String,
    pub subscription_id: Option<String>,
    pub amount_cents: i64,
    pub direction: String,
    pub status: String,
    pub description: String,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct TopUpRequest {
    pub user_id: String,
    pub amount_cents: i64,
}

#[derive(Debug, Serialize)]
pub struct TopUpResponse {
    pub balance_cents: i64,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/wallet
#[instrument(skip(state, params), fields(user_id = %params.user_id, limit))]
pub async fn get_wallet(
    State(state): State<AppState>,
    Query(params): Query<WalletParams>,
) -> ApiResult<Json<WalletResponse>> {
    let start = Instant::now();

    let user_id = UserId::parse(&params.user_id)
        .map_err(|_| ApiError::BadRequest("Invalid user_id".to_string()))?;

    let limit = params.limit.unwrap_or(20).clamp(1, 100);
    tracing::Span::current().record("limit", limit);

    let wallet = state.billing.wallet(user_id, limit).await?;

    record_op_duration("get_wallet", start, true);

    Ok(Json(WalletResponse {
        balance_cents: wallet.balance_cents,
        entries: wallet.entries.into_iter().map(entry_to_response).collect(),
    }))
}

/// POST /api/v1/wallet/topup
#[instrument(skip(state, req), fields(user_id = %req.user_id, amount_cents = req.amount_cents))]
pub async fn top_up_wallet(
    State(state): State<AppState>,
    Json(req): Json<TopUpRequest>,
) -> ApiResult<Json<TopUpResponse>> {
    let start = Instant::now();

    let user_id = UserId::parse(&req.user_id)
        .map_err(|_| ApiError::BadRequest("Invalid user_id".to_string()))?;

    let balance_cents = state.billing.top_up(user_id, req.amount_cents).await?;

    metrics::counter!("billing_wallet_topups_total").increment(1);
    record_op_duration("top_up_wallet", start, true);

    Ok(Json(TopUpResponse { balance_cents }))
}

fn entry_to_response(entry: LedgerEntry) -> LedgerEntryResponse {
    LedgerEntryResponse {
        id: entry.id.to_string(),
        subscription_id: entry.subscription_id.map(|id| id.to_string()),
        amount_cents: entry.amount_cents,
        direction: entry.direction.to_string(),
        status: entry.status.to_string(),
        description: entry.description,
        created_at: entry.created_at.to_rfc3339(),
    }
}
