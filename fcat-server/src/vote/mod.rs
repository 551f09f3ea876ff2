//! Vote toggle engine

mod engine;

pub use engine::{ToggleOutcome, VoteEngine};
