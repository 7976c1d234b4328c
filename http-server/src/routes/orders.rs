use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use clob::{OrderId, Side, SizeLots, UserOrders};
use serde::{Deserialize, Serialize};

use super::{bad_request, reject, ErrorResponse};
use crate::AppState;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderKind {
    Limit,
    Market,
}

// Place order request
#[derive(Deserialize)]
pub struct PlaceOrderRequest {
    pub market: String,
    #[serde(rename = "type")]
    pub kind: OrderKind,
    pub side: Side,
    pub size: SizeLots,
    // Required for LIMIT, ignored for MARKET.
    #[serde(default)]
    pub price: Option<u64>,
    pub user_id: u64,
}

#[derive(Serialize)]
pub struct PlaceOrderResponse {
    pub order_id: OrderId,
}

#[derive(Serialize)]
pub struct CancelOrderResponse {
    pub ok: bool,
}

// Place order endpoint
pub async fn place_order(
    State(state): State<AppState>,
    Json(payload): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<PlaceOrderResponse>), (StatusCode, Json<ErrorResponse>)> {
    let order_id = match payload.kind {
        OrderKind::Limit => {
            let Some(price) = payload.price else {
                return Err(bad_request("limit orders require a price"));
            };
            state
                .engine
                .place_limit(
                    &payload.market,
                    payload.user_id,
                    payload.side,
                    price,
                    payload.size,
                )
                .map_err(reject)?
        }
        OrderKind::Market => {
            let (order_id, _matches) = state
                .engine
                .place_market(&payload.market, payload.user_id, payload.side, payload.size)
                .map_err(reject)?;
            order_id
        }
    };

    Ok((StatusCode::CREATED, Json(PlaceOrderResponse { order_id })))
}

// Cancel order endpoint
pub async fn cancel_order(
    State(state): State<AppState>,
    Path(order_id): Path<OrderId>,
) -> Result<Json<CancelOrderResponse>, (StatusCode, Json<ErrorResponse>)> {
    state.engine.cancel(order_id).map_err(reject)?;
    Ok(Json(CancelOrderResponse { ok: true }))
}

// Resting orders for one user
pub async fn get_user_orders(
    State(state): State<AppState>,
    Path(user_id): Path<u64>,
) -> Json<UserOrders> {
    Json(state.engine.user_orders(user_id))
}
