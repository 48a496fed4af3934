//! HTTP API server for the cart checkout service.
//!
//! Exposes the cart engine over REST, with structured logging (tracing) and
//! Prometheus metrics.

pub mod caller;
pub mod catalog;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get};
use cart_store::{CartRepository, ProductStore};
use domain::CartService;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use routes::carts::AppState;
pub use routes::system::SystemState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<R, P>(state: Arc<AppState<R, P>>, system: SystemState) -> Router
where
    R: CartRepository + 'static,
    P: ProductStore + 'static,
{
    use routes::carts;

    let system_router = Router::new()
        .route("/health", get(routes::system::health))
        .route("/metrics", get(routes::system::metrics))
        .with_state(system);

    Router::new()
        .route(
            "/carts",
            get(carts::current::<R, P>)
                .post(carts::add::<R, P>)
                .patch(carts::checkout::<R, P>)
                .delete(carts::delete_all::<R, P>),
        )
        .route("/carts/history", get(carts::history::<R, P>))
        .route("/carts/all", get(carts::all::<R, P>))
        .route("/carts/current", delete(carts::clear::<R, P>))
        .route("/carts/products/{model}", delete(carts::remove_product::<R, P>))
        .with_state(state)
        .merge(system_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state over the given stores.
pub fn create_state<R: CartRepository, P: ProductStore>(
    carts: R,
    products: P,
) -> Arc<AppState<R, P>> {
    Arc::new(AppState {
        cart_service: CartService::new(carts, products),
    })
}
