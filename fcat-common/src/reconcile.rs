//! Client-side catalog reconciliation
//!
//! State machine behind the browser catalog view: it applies optimistic vote
//! toggles for zero-latency feedback, then merges authoritative data as it
//! arrives, whether that is the toggle response or a broadcast event, in
//! either order. Authoritative values always win; the "have I voted"
//! membership is device-local knowledge and is never changed by broadcast
//! events.
//!
//! All merging happens through the `apply_*` methods here. Call sites never
//! mutate the cached rows directly.

use crate::db::models::{Format, FormatStatus};
use crate::events::CatalogEvent;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// How long after a local vote the current sort order is held, so the voted
/// row does not jump while its counter animates. Presentation affordance
/// only; correctness never depends on it.
pub const SORT_HOLD_WINDOW_MS: i64 = 2000;

/// Active catalog filter parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogFilter {
    pub kind: Option<String>,
    pub status: Option<FormatStatus>,
    /// Case-insensitive name substring
    pub search: Option<String>,
}

impl CatalogFilter {
    fn matches(&self, format: &Format) -> bool {
        if let Some(kind) = &self.kind {
            if !format.kind.eq_ignore_ascii_case(kind) {
                return false;
            }
        }
        if let Some(status) = self.status {
            if format.status != status {
                return false;
            }
        }
        if let Some(search) = &self.search {
            if !format
                .name
                .to_lowercase()
                .contains(&search.to_lowercase())
            {
                return false;
            }
        }
        true
    }
}

/// Catalog sort order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CatalogSort {
    /// Highest vote count first (ties broken by name)
    #[default]
    Votes,
    /// Case-insensitive name, ascending
    Name,
    /// Most recently created first
    Newest,
}

/// Browser-side catalog state
///
/// Holds the locally cached format collection, the set of format ids this
/// device has voted for, and the active filter/sort parameters. The cache
/// survives transient network loss; a full `apply_catalog` refresh restores
/// authoritative truth.
#[derive(Debug, Clone, Default)]
pub struct CatalogState {
    formats: HashMap<Uuid, Format>,
    voted: HashSet<Uuid>,
    pub filter: CatalogFilter,
    pub sort: CatalogSort,
    hold_sort_until: Option<DateTime<Utc>>,
    last_order: Vec<Uuid>,
}

/// Local outcome of an optimistic toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptimisticToggle {
    /// Local guess at the new voted state
    pub voted: bool,
    /// Local guess at the new counter value
    pub votes: i64,
}

impl CatalogState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cached catalog with a full authoritative fetch.
    ///
    /// The voted set is device-local and survives the refresh; entries for
    /// formats that no longer exist are dropped.
    pub fn apply_catalog(&mut self, formats: Vec<Format>) {
        self.formats = formats.into_iter().map(|f| (f.guid, f)).collect();
        self.voted.retain(|id| self.formats.contains_key(id));
        self.last_order.retain(|id| self.formats.contains_key(id));
    }

    /// Replace the voted set from an authoritative votes-by-device fetch
    pub fn apply_voted(&mut self, format_ids: Vec<Uuid>) {
        self.voted = format_ids.into_iter().collect();
    }

    /// Apply an optimistic local toggle before the request is issued.
    ///
    /// Flips local membership, adjusts the counter by one (clamped at zero),
    /// and opens the sort-hold window. Returns `None` when the format is not
    /// in the local cache or its status no longer accepts votes; the edge
    /// policy lives here, not in the server's vote engine.
    pub fn apply_optimistic_toggle(
        &mut self,
        format_id: Uuid,
        now: DateTime<Utc>,
    ) -> Option<OptimisticToggle> {
        let format = self.formats.get_mut(&format_id)?;
        if !format.status.accepts_votes() {
            return None;
        }

        let voted = if self.voted.contains(&format_id) {
            self.voted.remove(&format_id);
            format.votes = (format.votes - 1).max(0);
            false
        } else {
            self.voted.insert(format_id);
            format.votes += 1;
            true
        };
        self.hold_sort_until = Some(now + Duration::milliseconds(SORT_HOLD_WINDOW_MS));

        Some(OptimisticToggle {
            voted,
            votes: format.votes,
        })
    }

    /// Merge the authoritative toggle response.
    ///
    /// Under a race the server's result may differ from the optimistic guess;
    /// the authoritative value wins for both counter and membership.
    pub fn apply_toggle_response(&mut self, format_id: Uuid, voted: bool, votes: i64) {
        if let Some(format) = self.formats.get_mut(&format_id) {
            format.votes = votes;
        }
        if voted {
            self.voted.insert(format_id);
        } else {
            self.voted.remove(&format_id);
        }
    }

    /// Merge a broadcast event.
    ///
    /// Counter, row, and status updates only; never the voted membership
    /// (that is local, device-scoped knowledge, not broadcast).
    pub fn apply_event(&mut self, event: &CatalogEvent) {
        match event {
            CatalogEvent::VoteCountChanged {
                format_id, votes, ..
            } => {
                if let Some(format) = self.formats.get_mut(format_id) {
                    format.votes = *votes;
                }
            }
            CatalogEvent::FormatAdded { format, .. } => {
                self.formats.insert(format.guid, format.clone());
            }
            CatalogEvent::FormatStatusChanged {
                format_id, status, ..
            } => {
                if let Some(format) = self.formats.get_mut(format_id) {
                    format.status = *status;
                }
            }
            CatalogEvent::FormatRemoved { format_id, .. } => {
                self.formats.remove(format_id);
                self.voted.remove(format_id);
                self.last_order.retain(|id| id != format_id);
            }
        }
    }

    /// Whether this device has voted for the given format
    pub fn has_voted(&self, format_id: Uuid) -> bool {
        self.voted.contains(&format_id)
    }

    /// Cached counter for a format, if present
    pub fn votes_for(&self, format_id: Uuid) -> Option<i64> {
        self.formats.get(&format_id).map(|f| f.votes)
    }

    /// Number of cached formats
    pub fn len(&self) -> usize {
        self.formats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }

    /// The filtered, sorted view for display.
    ///
    /// While the sort-hold window from a recent local vote is open, rows keep
    /// the order they were last presented in; rows new to the view are
    /// appended. After the window closes the configured sort applies again.
    pub fn visible(&mut self, now: DateTime<Utc>) -> Vec<Format> {
        let mut rows: Vec<Format> = self
            .formats
            .values()
            .filter(|f| self.filter.matches(f))
            .cloned()
            .collect();

        let holding = self
            .hold_sort_until
            .map(|until| now < until)
            .unwrap_or(false);

        if holding && !self.last_order.is_empty() {
            let position: HashMap<Uuid, usize> = self
                .last_order
                .iter()
                .enumerate()
                .map(|(i, id)| (*id, i))
                .collect();
            rows.sort_by_key(|f| position.get(&f.guid).copied().unwrap_or(usize::MAX));
        } else {
            match self.sort {
                CatalogSort::Votes => rows.sort_by(|a, b| {
                    b.votes
                        .cmp(&a.votes)
                        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
                }),
                CatalogSort::Name => {
                    rows.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
                }
                CatalogSort::Newest => rows.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            }
        }

        self.last_order = rows.iter().map(|f| f.guid).collect();
        rows
    }
}
