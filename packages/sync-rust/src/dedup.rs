//! Skips list requests whose query matches the last one issued.

use rollcall_core::QueryFingerprint;

/// Remembers the fingerprint of the last issued list request.
#[derive(Debug, Default)]
pub struct RequestDeduplicator {
    last: Option<QueryFingerprint>,
}

impl RequestDeduplicator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a request for `fingerprint` should go out.
    ///
    /// Forced requests always go out.
    #[must_use]
    pub fn should_issue(&self, fingerprint: &QueryFingerprint, force: bool) -> bool {
        force || self.last.as_ref() != Some(fingerprint)
    }

    /// Records `fingerprint` as the last issued request.
    pub fn record(&mut self, fingerprint: QueryFingerprint) {
        self.last = Some(fingerprint);
    }

    /// Forgets the last issued fingerprint so the same query can be re-issued.
    pub fn forget(&mut self) {
        self.last = None;
    }

    #[must_use]
    pub fn last(&self) -> Option<&QueryFingerprint> {
        self.last.as_ref()
    }
}
