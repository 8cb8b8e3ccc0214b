//! Observable state of the controllers.
//!
//! Each controller owns one of these behind a `tokio::sync::watch` channel
//! and is the only writer. The transition helpers below are the complete set
//! of state changes a controller performs.

use rollcall_core::{Entity, EntityId, ListResult};

/// Lifecycle phase of a list fetch.
///
/// State machine: Idle -> Loading -> (Success | Error), and Loading -> Idle
/// when the live request is abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing fetched yet, or the last request was abandoned.
    Idle,
    /// A request is in flight.
    Loading,
    /// The last request succeeded.
    Success,
    /// The last request failed; rows hold the last successful page.
    Error,
}

// ---------------------------------------------------------------------------
// SynchronizerState
// ---------------------------------------------------------------------------

/// Rows, total, and fetch status of a list view.
#[derive(Debug, Clone, PartialEq)]
pub struct SynchronizerState<T> {
    pub rows: Vec<T>,
    pub total: u64,
    pub loading: bool,
    pub error: Option<String>,
    pub phase: Phase,
}

impl<T> Default for SynchronizerState<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            total: 0,
            loading: false,
            error: None,
            phase: Phase::Idle,
        }
    }
}

impl<T: Entity> SynchronizerState<T> {
    pub(crate) fn begin(&mut self) {
        self.loading = true;
        self.error = None;
        self.phase = Phase::Loading;
    }

    pub(crate) fn succeed(&mut self, result: ListResult<T>) {
        self.rows = result.rows;
        self.total = result.total;
        self.loading = false;
        self.error = None;
        self.phase = Phase::Success;
    }

    /// Keeps rows and total so stale-but-valid data stays on screen.
    pub(crate) fn fail(&mut self, message: String) {
        self.loading = false;
        self.error = Some(message);
        self.phase = Phase::Error;
    }

    pub(crate) fn abandon(&mut self) {
        self.loading = false;
        self.phase = Phase::Idle;
    }

    /// Row with the given id on the current page.
    #[must_use]
    pub fn row(&self, id: &EntityId) -> Option<&T> {
        self.rows.iter().find(|row| row.id() == id)
    }

    /// Replaces the row sharing `row`'s id. Returns `false` if it is not on
    /// the current page.
    pub(crate) fn replace_row(&mut self, row: T) -> bool {
        match self.rows.iter_mut().find(|r| r.id() == row.id()) {
            Some(slot) => {
                *slot = row;
                true
            }
            None => false,
        }
    }

    /// Drops the row with the given id, adjusting the total.
    pub(crate) fn remove_row(&mut self, id: &EntityId) -> Option<T> {
        let index = self.rows.iter().position(|r| r.id() == id)?;
        self.total = self.total.saturating_sub(1);
        Some(self.rows.remove(index))
    }
}

// ---------------------------------------------------------------------------
// MutationState
// ---------------------------------------------------------------------------

/// Status of the create/update/delete calls of one view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationState {
    pub loading: bool,
    pub error: Option<String>,
    /// Mutations currently awaiting the server.
    pub pending: u32,
}

impl MutationState {
    /// Starting from idle clears the previous error.
    pub(crate) fn begin(&mut self) {
        if self.pending == 0 {
            self.error = None;
        }
        self.pending += 1;
        self.loading = true;
    }

    /// The first failure among overlapping mutations is the one reported.
    pub(crate) fn finish(&mut self, error: Option<String>) {
        self.pending = self.pending.saturating_sub(1);
        self.loading = self.pending > 0;
        if self.error.is_none() {
            self.error = error;
        }
    }
}

// ---------------------------------------------------------------------------
// DetailState
// ---------------------------------------------------------------------------

/// The record currently open in a detail view.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailState<T> {
    pub loading: bool,
    pub entity: Option<T>,
    pub error: Option<String>,
    /// Id of the most recent `fetch`.
    pub requested_id: Option<EntityId>,
}

impl<T> Default for DetailState<T> {
    fn default() -> Self {
        Self {
            loading: false,
            entity: None,
            error: None,
            requested_id: None,
        }
    }
}

impl<T: Entity> DetailState<T> {
    /// A different id clears the viewed entity so the view never shows one
    /// record under another's id.
    pub(crate) fn begin(&mut self, id: &EntityId) {
        if self.requested_id.as_ref() != Some(id) {
            self.entity = None;
        }
        self.requested_id = Some(id.clone());
        self.loading = true;
        self.error = None;
    }

    pub(crate) fn succeed(&mut self, entity: T) {
        self.entity = Some(entity);
        self.loading = false;
        self.error = None;
    }

    pub(crate) fn fail(&mut self, message: String) {
        self.entity = None;
        self.loading = false;
        self.error = Some(message);
    }

    pub(crate) fn abandon(&mut self) {
        self.loading = false;
    }
}
