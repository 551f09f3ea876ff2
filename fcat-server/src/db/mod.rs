//! Database queries for the format catalog

pub mod formats;
pub mod votes;
