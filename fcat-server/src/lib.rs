//! Format Catalog server (fcat-server)
//!
//! Crowd-sourced catalog of media-format support requests: browse and filter
//! formats, cast one vote per device per format, and watch counts update live
//! over SSE. Admin endpoints manage the format lifecycle.

pub mod api;
pub mod db;
pub mod sse;
pub mod vote;

pub use fcat_common::{Error, Result};
