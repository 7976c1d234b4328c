use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};
use clob::engine::Engine;
use clob::settlement::spawn_settlement_worker;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

mod models;
mod routes;
mod settlement;

use models::AccountStore;
use routes::markets::{get_best_ask, get_best_bid, get_book, get_markets, get_trades};
use routes::orders::{cancel_order, get_user_orders, place_order};
use routes::users::{get_account, register_user};
use settlement::LedgerSettler;

/// Registered markets and the scale converting price ticks and size lots to
/// asset units (100 = two decimal places).
const MARKETS: &[(&str, u64)] = &[("ETH", 100)];

pub fn market_scale(market: &str) -> u64 {
    MARKETS
        .iter()
        .find(|(symbol, _)| *symbol == market)
        .map(|(_, scale)| *scale)
        .unwrap_or(100)
}

// Application state shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub accounts: AccountStore,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // initialize tracing
    tracing_subscriber::fmt::init();

    let (engine, batches) = Engine::new(MARKETS.iter().map(|(symbol, _)| *symbol));
    let engine = Arc::new(engine);
    for market in engine.markets() {
        tracing::info!(market = %market, "registered market");
    }

    // Seed a few accounts so orders can settle out of the box.
    let accounts = AccountStore::new();
    for email in [
        "alice@example.com",
        "bob@example.com",
        "carol@example.com",
    ] {
        let account = accounts.get_or_create(email);
        tracing::info!(user_id = account.user_id, email, "seeded account");
    }

    // The settlement worker consumes match batches off the matching path.
    spawn_settlement_worker(batches, Arc::new(LedgerSettler::new(accounts.clone())));

    let state = AppState { engine, accounts };

    // build our application with routes
    let app = Router::new()
        .route("/", get(root))
        .route("/order", post(place_order))
        .route("/order/{id}", delete(cancel_order))
        .route("/order/user/{user_id}", get(get_user_orders))
        .route("/book/{market}", get(get_book))
        .route("/book/{market}/bid", get(get_best_bid))
        .route("/book/{market}/ask", get(get_best_ask))
        .route("/trades/{market}", get(get_trades))
        .route("/markets", get(get_markets))
        .route("/users/register", post(register_user))
        .route("/users/{user_id}", get(get_account))
        .route("/health", get(health_check))
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
    tracing::info!("server running on http://0.0.0.0:3000");
    axum::serve(listener, app).await?;

    Ok(())
}

// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

// Root endpoint
async fn root() -> &'static str {
    "Exchange API - POST /order to place orders, DELETE /order/{id} to cancel, GET /book/{market} for depth"
}
