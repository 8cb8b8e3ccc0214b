//! In-flight request tracking with last-request-wins semantics.
//!
//! A stream (one list view, one detail view) has at most one live request.
//! Issuing a new [`RequestHandle`] cancels the previous one's token and makes
//! its id stale, so whatever the old request eventually resolves to is
//! rejected by [`InFlightTracker::complete`].

use tokio_util::sync::CancellationToken;

/// Identity and cancellation token of one issued request.
#[derive(Debug, Clone)]
pub struct RequestHandle {
    id: u64,
    token: CancellationToken,
}

impl RequestHandle {
    /// Monotonic id within the issuing tracker.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Token to hand to the remote call.
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Issues request handles for one stream and remembers which one is live.
///
/// Not synchronized on its own; owners keep it behind the same lock that
/// guards their issuance decisions.
#[derive(Debug, Default)]
pub struct InFlightTracker {
    next_id: u64,
    live: Option<(u64, CancellationToken)>,
}

impl InFlightTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels the live request, if any, and issues a new one.
    pub fn issue(&mut self) -> RequestHandle {
        self.cancel_all();
        self.next_id += 1;
        let token = CancellationToken::new();
        self.live = Some((self.next_id, token.clone()));
        RequestHandle {
            id: self.next_id,
            token,
        }
    }

    /// Marks `handle` settled.
    ///
    /// Returns `true` only if it was still the live request; the caller must
    /// discard the result otherwise.
    pub fn complete(&mut self, handle: &RequestHandle) -> bool {
        if self.is_live(handle.id) {
            self.live = None;
            true
        } else {
            false
        }
    }

    /// Cancels the live request. Its result will be rejected by `complete`.
    pub fn cancel_all(&mut self) {
        if let Some((_, token)) = self.live.take() {
            token.cancel();
        }
    }

    #[must_use]
    pub fn is_live(&self, id: u64) -> bool {
        matches!(&self.live, Some((live, _)) if *live == id)
    }

    #[must_use]
    pub fn has_live(&self) -> bool {
        self.live.is_some()
    }
}
