//! In-memory [`RemoteCollection`] backed by [`DashMap`].
//!
//! Behaves like the REST backend closely enough to drive the controllers
//! without a server: filtering through [`Entity::matches`], sorting through
//! [`Entity::field`] with the id as tie-break, 1-based pagination, server-side
//! validation on create, and `404` answers for unknown ids. Latency and
//! failures can be injected for demos and tests.

use std::cmp::Ordering as CmpOrdering;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use rand::Rng;
use rollcall_core::{Entity, EntityId, ListResult, RemoteError, SortOrder, TransportQuery};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::traits::RemoteCollection;

/// Number of calls each operation has received.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub list: u64,
    pub get: u64,
    pub create: u64,
    pub update: u64,
    pub delete: u64,
}

#[derive(Debug, Default)]
struct Counters {
    list: AtomicU64,
    get: AtomicU64,
    create: AtomicU64,
    update: AtomicU64,
    delete: AtomicU64,
}

/// In-memory entity collection.
pub struct InMemoryRemote<T: Entity> {
    records: DashMap<EntityId, T>,
    latency: Duration,
    failures: Mutex<VecDeque<RemoteError>>,
    counters: Counters,
}

impl<T: Entity> InMemoryRemote<T> {
    /// Creates an empty collection that answers immediately.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            latency: Duration::ZERO,
            failures: Mutex::new(VecDeque::new()),
            counters: Counters::default(),
        }
    }

    /// Delays every call by `latency` plus up to 25% random jitter.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Stores the given records, replacing any with the same id.
    #[must_use]
    pub fn with_rows(self, rows: impl IntoIterator<Item = T>) -> Self {
        for row in rows {
            self.insert(row);
        }
        self
    }

    pub fn insert(&self, row: T) -> Option<T> {
        self.records.insert(row.id().clone(), row)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: &EntityId) -> bool {
        self.records.contains_key(id)
    }

    /// Makes the next call, whichever operation it is, fail with `error`.
    /// Queued failures are consumed in order.
    pub fn fail_next(&self, error: RemoteError) {
        self.failures.lock().push_back(error);
    }

    #[must_use]
    pub fn calls(&self) -> CallCounts {
        CallCounts {
            list: self.counters.list.load(Ordering::Relaxed),
            get: self.counters.get.load(Ordering::Relaxed),
            create: self.counters.create.load(Ordering::Relaxed),
            update: self.counters.update.load(Ordering::Relaxed),
            delete: self.counters.delete.load(Ordering::Relaxed),
        }
    }

    /// Simulated round trip: latency, then any injected failure.
    async fn round_trip(
        &self,
        counter: &AtomicU64,
        cancel: Option<&CancellationToken>,
    ) -> Result<(), RemoteError> {
        counter.fetch_add(1, Ordering::Relaxed);

        if !self.latency.is_zero() {
            let delay = {
                let quarter = u64::try_from(self.latency.as_millis() / 4).unwrap_or(u64::MAX);
                let jitter = rand::rng().random_range(0..=quarter);
                self.latency + Duration::from_millis(jitter)
            };
            match cancel {
                Some(token) => tokio::select! {
                    biased;
                    () = token.cancelled() => return Err(RemoteError::Cancelled),
                    () = tokio::time::sleep(delay) => {}
                },
                None => tokio::time::sleep(delay).await,
            }
        }

        match self.failures.lock().pop_front() {
            Some(error) => {
                debug!(entity = T::RESOURCE, error = %error, "injected failure");
                Err(error)
            }
            None => Ok(()),
        }
    }

    fn not_found(id: &EntityId) -> RemoteError {
        RemoteError::Server {
            status: Some(404),
            message: Some(format!("Registro {id} não encontrado")),
        }
    }

    fn page(&self, query: &TransportQuery) -> ListResult<T> {
        let mut rows: Vec<T> = self
            .records
            .iter()
            .map(|entry| entry.value().clone())
            .filter(|row| {
                query
                    .filters
                    .iter()
                    .all(|(param, value)| row.matches(param, value))
            })
            .collect();

        rows.sort_by(|a, b| {
            let by_field = query.sort.as_ref().map_or(CmpOrdering::Equal, |sort| {
                let ordering = a.field(&sort.field).cmp(&b.field(&sort.field));
                match sort.order {
                    SortOrder::Asc => ordering,
                    SortOrder::Desc => ordering.reverse(),
                }
            });
            by_field.then_with(|| a.id().cmp(b.id()))
        });

        let total = rows.len() as u64;
        let rows = rows
            .into_iter()
            .skip(query.offset())
            .take(query.limit as usize)
            .collect();
        ListResult::new(rows, total)
    }
}

impl<T: Entity> Default for InMemoryRemote<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Entity> RemoteCollection<T> for InMemoryRemote<T> {
    async fn list(
        &self,
        query: &TransportQuery,
        cancel: CancellationToken,
    ) -> Result<ListResult<T>, RemoteError> {
        self.round_trip(&self.counters.list, Some(&cancel)).await?;
        Ok(self.page(query))
    }

    async fn get(&self, id: &EntityId, cancel: CancellationToken) -> Result<T, RemoteError> {
        self.round_trip(&self.counters.get, Some(&cancel)).await?;
        self.records
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Self::not_found(id))
    }

    async fn create(&self, draft: &T::Draft) -> Result<T, RemoteError> {
        self.round_trip(&self.counters.create, None).await?;
        T::validate(draft).map_err(|message| RemoteError::Server {
            status: Some(400),
            message: Some(message),
        })?;
        let id = EntityId::from(uuid::Uuid::new_v4().to_string());
        let row = T::from_draft(id, draft);
        self.insert(row.clone());
        Ok(row)
    }

    async fn update(&self, id: &EntityId, draft: &T::Draft) -> Result<T, RemoteError> {
        self.round_trip(&self.counters.update, None).await?;
        let mut entry = self.records.get_mut(id).ok_or_else(|| Self::not_found(id))?;
        entry.apply_draft(draft);
        Ok(entry.value().clone())
    }

    async fn delete(&self, id: &EntityId) -> Result<(), RemoteError> {
        self.round_trip(&self.counters.delete, None).await?;
        self.records
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Self::not_found(id))
    }
}
