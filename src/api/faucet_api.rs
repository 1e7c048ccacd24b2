//! Faucet relay HTTP surface.
//!
//! One endpoint: `POST /api/faucet {address}`. The outcome shape mirrors
//! [`FaucetOutcome`]; errors are returned in-band with `success: false`.

use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use ethers::types::Address;
use serde::Deserialize;

use crate::{
    domain::types::FaucetOutcome,
    service::faucet_service::{FaucetAction, FaucetService},
};

#[derive(Debug, Deserialize)]
pub struct FaucetRequest {
    pub address: String,
}

#[derive(Clone)]
pub struct FaucetApiState {
    /// `None` when no relay key is configured; requests then fail in-band.
    pub faucet: Option<Arc<FaucetService>>,
}

pub fn router(state: FaucetApiState) -> Router {
    Router::new()
        .route("/api/faucet", post(request_faucet))
        .with_state(state)
}

async fn request_faucet(
    State(state): State<FaucetApiState>,
    Json(request): Json<FaucetRequest>,
) -> Json<FaucetOutcome> {
    let Some(faucet) = state.faucet else {
        return Json(FaucetOutcome::failure("Faucet configuration missing"));
    };

    let Ok(address) = request.address.trim().parse::<Address>() else {
        return Json(FaucetOutcome::failure("Invalid address provided"));
    };

    Json(faucet.send_faucet(address).await)
}
