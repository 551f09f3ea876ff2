//! Router setup and shared application context

use crate::sse::CatalogBroadcaster;
use crate::vote::VoteEngine;
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use fcat_common::events::EventBus;
use sqlx::{Pool, Sqlite};
use tower_http::cors::CorsLayer;

/// Shared application context passed to all handlers
///
/// **Note:** AppContext implements Clone, which gives us `FromRef<AppContext>`
/// for free via Axum's blanket implementation.
#[derive(Clone)]
pub struct AppContext {
    pub db_pool: Pool<Sqlite>,
    pub engine: VoteEngine,
    pub broadcaster: CatalogBroadcaster,
    pub bus: EventBus,
    /// Shared admin secret checked by the admin middleware.
    /// Empty string means admin endpoints are open (development mode).
    pub admin_key: String,
}

impl AppContext {
    pub fn new(db_pool: Pool<Sqlite>, bus: EventBus, admin_key: String) -> Self {
        Self {
            engine: VoteEngine::new(db_pool.clone(), bus.clone()),
            broadcaster: CatalogBroadcaster::new(bus.clone()),
            db_pool,
            bus,
            admin_key,
        }
    }
}

/// Build the application router
pub fn create_router(ctx: AppContext) -> Router {
    let admin_routes = Router::new()
        .route("/formats", post(super::handlers::admin_create_format))
        .route("/formats/:id/status", put(super::handlers::admin_update_status))
        .route("/formats/:id", delete(super::handlers::admin_delete_format))
        .layer(super::admin_middleware::AdminLayer {
            admin_key: ctx.admin_key.clone(),
        });

    Router::new()
        // Catalog UI (embedded HTML)
        .route("/", get(super::handlers::catalog_ui))
        // Health endpoint
        .route("/health", get(super::handlers::health))
        // Catalog + voting
        .route(
            "/api/formats",
            get(super::handlers::list_formats).post(super::handlers::submit_format),
        )
        .route("/api/formats/:id/vote", post(super::handlers::toggle_vote))
        .route("/api/votes", get(super::handlers::votes_by_device))
        // SSE event stream
        .route("/api/events", get(super::sse::event_stream))
        // Admin surface
        .nest("/api/admin", admin_routes)
        // Attach application context
        .with_state(ctx)
        // Enable CORS for local access
        .layer(CorsLayer::permissive())
}
