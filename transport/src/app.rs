use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use smol::Timer;
use smol::lock::RwLock;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("voucher '{0}' already redeemed")]
    AlreadyRedeemed(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::AlreadyRedeemed(code) => (
                StatusCode::CONFLICT,
                format!("voucher '{}' already redeemed", code),
            ),
        };
        (status, message).into_response()
    }
}

#[derive(Clone, Default)]
pub struct AppState {
    redeemed: Arc<RwLock<HashSet<String>>>,
    ticks: Arc<AtomicU64>,
}

#[derive(Serialize, Deserialize)]
pub struct RedeemResponse {
    pub code: String,
    pub credited: bool,
}

#[derive(Serialize, Deserialize)]
pub struct CounterResponse {
    pub tick: String,
}

/// Demo target for burst tests. `/api/redeem` has a deliberately widened
/// check-then-act window, so near-simultaneous redeems of the same voucher
/// can all observe it as fresh; `/api/counter` answers every request with a
/// distinct fixed-width body; `/api/static` always answers the same.
pub fn race_app() -> Router {
    Router::new()
        .route("/api/redeem/{code}", post(redeem))
        .route("/api/counter", get(counter))
        .route("/api/static", get(static_page))
        .with_state(AppState::default())
}

async fn redeem(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<RedeemResponse>, ApiError> {
    let taken = state.redeemed.read().await.contains(&code);
    if taken {
        return Err(ApiError::AlreadyRedeemed(code));
    }

    // the race window between check and act
    Timer::after(Duration::from_millis(20)).await;

    state.redeemed.write().await.insert(code.clone());
    Ok(Json(RedeemResponse {
        code,
        credited: true,
    }))
}

async fn counter(State(state): State<AppState>) -> Json<CounterResponse> {
    let tick = state.ticks.fetch_add(1, Ordering::SeqCst);
    Json(CounterResponse {
        tick: format!("{tick:08}"),
    })
}

async fn static_page() -> &'static str {
    "steady"
}
