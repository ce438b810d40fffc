//! Manual sweep trigger
//!
//! Ops/test hook: runs the billing sweep synchronously, optionally as of a
//! past or future date for backfill and dry runs against seeded data.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use std::time::Instant;
use tracing::instrument;

use hamper_billing_core::SweepReport;

use crate::error::ApiResult;
use crate::handlers::shared::record_op_duration;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SweepRequest {
    pub as_of: Option<chrono::NaiveDate>,
}

/// POST /internal/billing/sweep
#[instrument(skip(state, req), fields(as_of))]
pub async fn trigger_sweep(
    State(state): State<AppState>,
    req: Option<Json<SweepRequest>>,
) -> ApiResult<Json<SweepReport>> {
    let start = Instant::now();

    let as_of = req
        .and_then(|Json(r)| r.as_of)
        .unwrap_or_else(|| chrono::Utc::now().date_naive());
    tracing::Span::current().record("as_of", tracing::field::display(as_of));

    let report = state.billing.run_sweep(as_of).await?;

    record_op_duration("trigger_sweep", start, true);

    Ok(Json(report))
}
