//! Server-Sent Events support
//!
//! Streams catalog events to connected browsers.

mod broadcaster;

pub use broadcaster::CatalogBroadcaster;
