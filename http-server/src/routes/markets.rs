use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use clob::{BestQuote, LevelView, SizeLots, Trade};
use serde::Serialize;

use super::{reject, ErrorResponse};
use crate::{market_scale, AppState};

#[derive(Serialize)]
pub struct BookResponse {
    pub market: String,
    pub bids: Vec<LevelView>,
    pub asks: Vec<LevelView>,
    pub total_bid_volume: SizeLots,
    pub total_ask_volume: SizeLots,
}

#[derive(Serialize)]
pub struct MarketInfo {
    pub symbol: String,
    pub scale: u64,
}

// Aggregated book snapshot, levels in match order
pub async fn get_book(
    State(state): State<AppState>,
    Path(market): Path<String>,
) -> Result<Json<BookResponse>, (StatusCode, Json<ErrorResponse>)> {
    let view = state.engine.book_view(&market).map_err(reject)?;
    Ok(Json(BookResponse {
        market,
        bids: view.bids,
        asks: view.asks,
        total_bid_volume: view.total_bid_volume,
        total_ask_volume: view.total_ask_volume,
    }))
}

// Trade log in execution order
pub async fn get_trades(
    State(state): State<AppState>,
    Path(market): Path<String>,
) -> Result<Json<Vec<Trade>>, (StatusCode, Json<ErrorResponse>)> {
    let trades = state.engine.trades(&market).map_err(reject)?;
    Ok(Json(trades))
}

// Best bid: highest resting buy price and its user, null when empty
pub async fn get_best_bid(
    State(state): State<AppState>,
    Path(market): Path<String>,
) -> Result<Json<Option<BestQuote>>, (StatusCode, Json<ErrorResponse>)> {
    let quote = state.engine.best_bid(&market).map_err(reject)?;
    Ok(Json(quote))
}

// Best ask: lowest resting sell price and its user, null when empty
pub async fn get_best_ask(
    State(state): State<AppState>,
    Path(market): Path<String>,
) -> Result<Json<Option<BestQuote>>, (StatusCode, Json<ErrorResponse>)> {
    let quote = state.engine.best_ask(&market).map_err(reject)?;
    Ok(Json(quote))
}

// Registered markets
pub async fn get_markets(State(state): State<AppState>) -> Json<Vec<MarketInfo>> {
    let markets = state
        .engine
        .markets()
        .into_iter()
        .map(|symbol| {
            let scale = market_scale(&symbol);
            MarketInfo { symbol, scale }
        })
        .collect();
    Json(markets)
}
