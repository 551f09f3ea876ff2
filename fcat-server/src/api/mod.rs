//! HTTP API for the format catalog
//!
//! Route layout:
//! - `GET  /` - embedded catalog UI
//! - `GET  /health` - health check
//! - `GET  /api/formats` - filtered/sorted catalog listing
//! - `POST /api/formats` - public submission (lands in `requested`)
//! - `POST /api/formats/:id/vote` - toggle this device's vote
//! - `GET  /api/votes?device_id=` - format ids this device voted for
//! - `GET  /api/events` - SSE stream of catalog events
//! - `POST   /api/admin/formats` - admin create
//! - `PUT    /api/admin/formats/:id/status` - admin status change
//! - `DELETE /api/admin/formats/:id` - admin delete (cascades votes)

pub mod admin_middleware;
pub mod handlers;
pub mod server;
pub mod sse;

pub use server::{create_router, AppContext};
