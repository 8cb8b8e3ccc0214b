use async_trait::async_trait;
use rollcall_core::{Entity, EntityId, ListResult, RemoteError, TransportQuery};
use tokio_util::sync::CancellationToken;

/// Remote API of one entity collection.
/// Implementations: HTTP (`HttpCollection`), memory (`InMemoryRemote`), scripted (tests).
///
/// Read operations receive a [`CancellationToken`]. Implementations that can
/// abort the underlying request should do so and return
/// [`RemoteError::Cancelled`]; those that cannot may ignore the token, since
/// callers discard results of superseded requests anyway.
#[async_trait]
pub trait RemoteCollection<T: Entity>: Send + Sync + 'static {
    /// Fetch one page of the collection.
    async fn list(
        &self,
        query: &TransportQuery,
        cancel: CancellationToken,
    ) -> Result<ListResult<T>, RemoteError>;

    /// Fetch one full record.
    async fn get(&self, id: &EntityId, cancel: CancellationToken) -> Result<T, RemoteError>;

    /// Create a record, returning it as stored by the server.
    async fn create(&self, draft: &T::Draft) -> Result<T, RemoteError>;

    /// Update a record, returning it as stored by the server.
    async fn update(&self, id: &EntityId, draft: &T::Draft) -> Result<T, RemoteError>;

    /// Delete a record.
    async fn delete(&self, id: &EntityId) -> Result<(), RemoteError>;
}
