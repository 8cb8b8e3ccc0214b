//! `Rollcall` Sync: async controllers that keep list and detail views of a
//! REST collection consistent with the server.
//!
//! One generic controller per concern, instantiated per entity:
//!
//! - [`ListSynchronizer`]: debounced, deduplicated, last-request-wins list fetching;
//! - [`MutationCoordinator`]: create/update/delete with list reconciliation;
//! - [`DetailFetcher`]: one full record "currently viewing".
//!
//! Controllers talk to the server through [`RemoteCollection`], implemented
//! here by [`HttpCollection`] and [`InMemoryRemote`].

pub mod config;
pub mod debounce;
pub mod dedup;
pub mod detail;
pub mod http;
pub mod inflight;
pub mod list;
pub mod memory;
pub mod mutation;
pub mod state;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{ConfigError, SyncConfig};
pub use debounce::DebounceGate;
pub use dedup::RequestDeduplicator;
pub use detail::DetailFetcher;
pub use http::HttpCollection;
pub use inflight::{InFlightTracker, RequestHandle};
pub use list::ListSynchronizer;
pub use memory::{CallCounts, InMemoryRemote};
pub use mutation::{MutationCoordinator, MutationOutcome, Reconcile};
pub use state::{DetailState, MutationState, Phase, SynchronizerState};
pub use traits::RemoteCollection;
