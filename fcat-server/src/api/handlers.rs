//! HTTP request handlers
//!
//! Implements the catalog, voting, and admin endpoints. The vote-eligibility
//! policy (only `requested` formats accept votes) is enforced here at the
//! edge; the vote engine trusts its callers on status and only guarantees
//! atomicity and pair uniqueness.

use crate::api::server::AppContext;
use crate::db::formats;
use crate::vote::ToggleOutcome;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Html,
    Json,
};
use fcat_common::db::models::{Format, FormatStatus};
use fcat_common::events::CatalogEvent;
use fcat_common::reconcile::{CatalogFilter, CatalogSort};
use fcat_common::{device, Error};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    status: String,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub kind: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub device_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VotesQuery {
    pub device_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitFormatRequest {
    pub name: String,
    pub kind: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateFormatRequest {
    pub name: String,
    pub kind: String,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

type HandlerError = (StatusCode, Json<StatusResponse>);

/// Map a store/engine error to an HTTP error response
fn error_response(err: &Error) -> HandlerError {
    let code = match err {
        Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::Conflict(_) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        code,
        Json(StatusResponse {
            status: format!("error: {}", err),
        }),
    )
}

fn bad_request(message: &str) -> HandlerError {
    (
        StatusCode::BAD_REQUEST,
        Json(StatusResponse {
            status: format!("error: {}", message),
        }),
    )
}

// ============================================================================
// UI + Health Endpoints
// ============================================================================

/// GET / - embedded catalog UI
pub async fn catalog_ui() -> Html<&'static str> {
    Html(include_str!("catalog_ui.html"))
}

/// GET /health - Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "fcat-server".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============================================================================
// Catalog Endpoints
// ============================================================================

/// GET /api/formats - filtered/sorted catalog listing
pub async fn list_formats(
    State(ctx): State<AppContext>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Format>>, HandlerError> {
    let status = match &query.status {
        Some(s) => Some(
            FormatStatus::from_str(s).ok_or_else(|| bad_request(&format!("unknown status '{}'", s)))?,
        ),
        None => None,
    };

    let sort = match query.sort.as_deref() {
        None | Some("votes") => CatalogSort::Votes,
        Some("name") => CatalogSort::Name,
        Some("newest") => CatalogSort::Newest,
        Some(other) => return Err(bad_request(&format!("unknown sort '{}'", other))),
    };

    let filter = CatalogFilter {
        kind: query.kind,
        status,
        search: query.search,
    };

    match formats::list(&ctx.db_pool, &filter, sort).await {
        Ok(rows) => Ok(Json(rows)),
        Err(e) => {
            error!("Failed to list formats: {}", e);
            Err(error_response(&e))
        }
    }
}

/// POST /api/formats - public submission, lands in `requested` status
pub async fn submit_format(
    State(ctx): State<AppContext>,
    Json(req): Json<SubmitFormatRequest>,
) -> Result<(StatusCode, Json<Format>), HandlerError> {
    create_format(&ctx, &req.name, &req.kind, FormatStatus::Requested).await
}

/// POST /api/formats/:id/vote - toggle this device's vote
pub async fn toggle_vote(
    State(ctx): State<AppContext>,
    Path(format_id): Path<Uuid>,
    Json(req): Json<VoteRequest>,
) -> Result<Json<ToggleOutcome>, HandlerError> {
    let device_id = req
        .device_id
        .as_deref()
        .filter(|id| device::validate(id))
        .ok_or_else(|| bad_request("missing or invalid device_id"))?;

    // Edge policy: only `requested` formats accept votes. The lookup also
    // gives the 404 before the engine runs a transaction for nothing.
    let format = formats::get(&ctx.db_pool, format_id)
        .await
        .map_err(|e| error_response(&e))?;
    if !format.status.accepts_votes() {
        return Err((
            StatusCode::CONFLICT,
            Json(StatusResponse {
                status: format!("error: format is {} and not accepting votes", format.status),
            }),
        ));
    }

    match ctx.engine.toggle(device_id, format_id).await {
        Ok(outcome) => Ok(Json(outcome)),
        Err(e @ Error::Conflict(_)) => {
            // A racing toggle for the same pair won; the whole toggle rolled
            // back, so the client can simply retry.
            Err((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(StatusResponse {
                    status: format!("error: {}", e),
                }),
            ))
        }
        Err(e) => {
            error!("Vote toggle failed for {}: {}", format_id, e);
            Err(error_response(&e))
        }
    }
}

/// GET /api/votes?device_id= - format ids this device has voted for,
/// as a bare array
pub async fn votes_by_device(
    State(ctx): State<AppContext>,
    Query(query): Query<VotesQuery>,
) -> Result<Json<Vec<Uuid>>, HandlerError> {
    let device_id = query
        .device_id
        .as_deref()
        .filter(|id| device::validate(id))
        .ok_or_else(|| bad_request("missing or invalid device_id"))?;

    match ctx.engine.votes_by_device(device_id).await {
        Ok(format_ids) => Ok(Json(format_ids)),
        Err(e) => {
            error!("Failed to list votes for device: {}", e);
            Err(error_response(&e))
        }
    }
}

// ============================================================================
// Admin Endpoints
// ============================================================================

/// POST /api/admin/formats - create a format with an explicit status
pub async fn admin_create_format(
    State(ctx): State<AppContext>,
    Json(req): Json<CreateFormatRequest>,
) -> Result<(StatusCode, Json<Format>), HandlerError> {
    let status = match &req.status {
        Some(s) => FormatStatus::from_str(s)
            .ok_or_else(|| bad_request(&format!("unknown status '{}'", s)))?,
        None => FormatStatus::Requested,
    };
    create_format(&ctx, &req.name, &req.kind, status).await
}

/// PUT /api/admin/formats/:id/status - change a format's lifecycle status
pub async fn admin_update_status(
    State(ctx): State<AppContext>,
    Path(format_id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<Format>, HandlerError> {
    let status = FormatStatus::from_str(&req.status)
        .ok_or_else(|| bad_request(&format!("unknown status '{}'", req.status)))?;

    match formats::update_status(&ctx.db_pool, format_id, status).await {
        Ok(format) => {
            info!("Format {} status set to {}", format_id, status);
            ctx.bus.emit_lossy(CatalogEvent::FormatStatusChanged {
                format_id,
                status,
                timestamp: chrono::Utc::now(),
            });
            Ok(Json(format))
        }
        Err(e) => {
            error!("Failed to update status for {}: {}", format_id, e);
            Err(error_response(&e))
        }
    }
}

/// DELETE /api/admin/formats/:id - delete a format (votes cascade with it)
pub async fn admin_delete_format(
    State(ctx): State<AppContext>,
    Path(format_id): Path<Uuid>,
) -> Result<StatusCode, HandlerError> {
    match formats::delete(&ctx.db_pool, format_id).await {
        Ok(()) => {
            info!("Format {} deleted", format_id);
            ctx.bus.emit_lossy(CatalogEvent::FormatRemoved {
                format_id,
                timestamp: chrono::Utc::now(),
            });
            Ok(StatusCode::NO_CONTENT)
        }
        Err(e) => {
            error!("Failed to delete format {}: {}", format_id, e);
            Err(error_response(&e))
        }
    }
}

async fn create_format(
    ctx: &AppContext,
    name: &str,
    kind: &str,
    status: FormatStatus,
) -> Result<(StatusCode, Json<Format>), HandlerError> {
    match formats::insert(&ctx.db_pool, name, kind, status).await {
        Ok(format) => {
            info!("Format '{}' created as {}", format.name, format.status);
            ctx.bus.emit_lossy(CatalogEvent::FormatAdded {
                format: format.clone(),
                timestamp: chrono::Utc::now(),
            });
            Ok((StatusCode::CREATED, Json(format)))
        }
        Err(e) => {
            error!("Failed to create format '{}': {}", name, e);
            Err(error_response(&e))
        }
    }
}
