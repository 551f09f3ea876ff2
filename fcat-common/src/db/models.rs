//! Database models

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a catalog format
///
/// Only `Requested` formats accept votes; the other states are set by admin
/// action as a request moves through triage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatStatus {
    Requested,
    Planned,
    InReview,
    Supported,
}

impl FormatStatus {
    /// Storage representation (snake_case, matches JSON)
    pub fn as_str(&self) -> &'static str {
        match self {
            FormatStatus::Requested => "requested",
            FormatStatus::Planned => "planned",
            FormatStatus::InReview => "in_review",
            FormatStatus::Supported => "supported",
        }
    }

    /// Parse from storage representation
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "requested" => Some(FormatStatus::Requested),
            "planned" => Some(FormatStatus::Planned),
            "in_review" => Some(FormatStatus::InReview),
            "supported" => Some(FormatStatus::Supported),
            _ => None,
        }
    }

    /// Whether the format accepts votes in this state
    pub fn accepts_votes(&self) -> bool {
        matches!(self, FormatStatus::Requested)
    }
}

impl std::fmt::Display for FormatStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A catalog format row
///
/// Invariant: `votes` always equals the number of vote rows referencing
/// `guid`. All counter mutation goes through the vote engine's relative
/// update inside a single transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Format {
    pub guid: Uuid,
    pub name: String,
    /// Open category set (image/video/audio/...); free-form by design
    pub kind: String,
    pub status: FormatStatus,
    pub votes: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// A vote row; its existence is the "this device voted for this format" fact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    pub device_id: String,
    pub format_id: Uuid,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_storage_form() {
        for status in [
            FormatStatus::Requested,
            FormatStatus::Planned,
            FormatStatus::InReview,
            FormatStatus::Supported,
        ] {
            assert_eq!(FormatStatus::from_str(status.as_str()), Some(status));
        }
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert_eq!(FormatStatus::from_str("archived"), None);
        assert_eq!(FormatStatus::from_str(""), None);
    }

    #[test]
    fn only_requested_accepts_votes() {
        assert!(FormatStatus::Requested.accepts_votes());
        assert!(!FormatStatus::Planned.accepts_votes());
        assert!(!FormatStatus::InReview.accepts_votes());
        assert!(!FormatStatus::Supported.accepts_votes());
    }

    #[test]
    fn status_serializes_as_snake_case() {
        let json = serde_json::to_string(&FormatStatus::InReview).unwrap();
        assert_eq!(json, "\"in_review\"");
    }
}
