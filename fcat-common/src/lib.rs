//! # FCAT Common Library
//!
//! Shared code for the FCAT format catalog service:
//! - Database models and initialization
//! - Catalog event types (CatalogEvent enum) and EventBus
//! - Configuration loading
//! - Client reconciliation state machine
//! - Device token helpers

pub mod config;
pub mod db;
pub mod device;
pub mod error;
pub mod events;
pub mod reconcile;

pub use error::{Error, Result};
