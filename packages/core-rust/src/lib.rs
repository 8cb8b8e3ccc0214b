//! `Rollcall` Core: query model, query composer, fingerprints, and entities.
//!
//! Everything here is synchronous and runtime-free; the async controllers
//! live in `rollcall-sync`.

pub mod compose;
pub mod entities;
pub mod error;
pub mod fingerprint;
pub mod hash;
pub mod query;
pub mod traits;
pub mod types;

pub use compose::{compose, QueryVocabulary, SortOrder, TransportQuery, TransportSort};
pub use error::{extract_message, RemoteError};
pub use fingerprint::QueryFingerprint;
pub use query::{Filters, Query, QueryDefaults, SortSpec};
pub use traits::Entity;
pub use types::{EntityId, ListResult, Scalar};
