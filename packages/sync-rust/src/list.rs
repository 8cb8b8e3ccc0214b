//! List Synchronizer: keeps one paginated, filtered, sorted view of an entity
//! collection in step with the server.
//!
//! Page, size, sort, and filter changes go through a [`DebounceGate`]; a
//! driver task turns each quiet period into at most one fetch of whatever the
//! query is at that moment. Issuance
//! decisions (dedup, cancellation of the previous request, the `loading`
//! transition) happen synchronously under one lock, and so do settlements,
//! so only the most recently issued request can ever write rows.
//!
//! # Lifecycle
//!
//! ```text
//! new() -> start() -> set_page/set_page_size/set_sort/set_filters/refresh ... -> dispose()
//! ```
//!
//! After `dispose()` every operation is a no-op.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use rollcall_core::{
    compose, Entity, EntityId, Filters, ListResult, Query, QueryDefaults, QueryFingerprint,
    RemoteError, SortSpec, TransportQuery,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info_span, warn, Instrument};

use crate::config::SyncConfig;
use crate::debounce::DebounceGate;
use crate::dedup::RequestDeduplicator;
use crate::inflight::{InFlightTracker, RequestHandle};
use crate::state::SynchronizerState;
use crate::traits::RemoteCollection;

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

struct Control {
    query: Query,
    dedup: RequestDeduplicator,
    inflight: InFlightTracker,
    disposed: bool,
}

struct Issued {
    handle: RequestHandle,
    transport: TransportQuery,
}

struct Inner<T: Entity, R> {
    remote: Arc<R>,
    defaults: QueryDefaults,
    control: Mutex<Control>,
    state: watch::Sender<SynchronizerState<T>>,
    gate: DebounceGate<()>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Entity, R: RemoteCollection<T>> Inner<T, R> {
    /// Decides whether the current query goes out and, if so, issues it.
    fn begin(&self, force: bool) -> Option<Issued> {
        let mut control = self.control.lock();
        if control.disposed {
            return None;
        }

        let fingerprint = QueryFingerprint::of(&control.query);
        if !control.dedup.should_issue(&fingerprint, force) {
            debug!(
                entity = T::RESOURCE,
                fingerprint = %fingerprint,
                "list query unchanged, skipping fetch"
            );
            return None;
        }

        let handle = control.inflight.issue();
        debug!(
            entity = T::RESOURCE,
            request_id = handle.id(),
            fingerprint = %fingerprint,
            forced = force,
            "issuing list fetch"
        );
        control.dedup.record(fingerprint);
        self.state.send_modify(SynchronizerState::begin);

        Some(Issued {
            handle,
            transport: compose(&control.query, &T::VOCABULARY),
        })
    }

    async fn run(&self, issued: &Issued) -> Result<ListResult<T>, RemoteError> {
        let token = issued.handle.token();
        tokio::select! {
            biased;
            () = token.cancelled() => Err(RemoteError::Cancelled),
            result = self.remote.list(&issued.transport, issued.handle.token()) => result,
        }
    }

    fn settle(&self, issued: &Issued, result: Result<ListResult<T>, RemoteError>) {
        let mut control = self.control.lock();
        if !control.inflight.complete(&issued.handle) {
            debug!(
                entity = T::RESOURCE,
                request_id = issued.handle.id(),
                "discarding superseded list response"
            );
            return;
        }

        match result {
            Ok(page) => {
                debug!(
                    entity = T::RESOURCE,
                    request_id = issued.handle.id(),
                    rows = page.rows.len(),
                    total = page.total,
                    "list fetch settled"
                );
                self.state.send_modify(|state| state.succeed(page));
            }
            Err(error) if error.is_cancelled() => {
                control.dedup.forget();
                self.state.send_modify(SynchronizerState::abandon);
            }
            Err(error) => {
                warn!(
                    entity = T::RESOURCE,
                    request_id = issued.handle.id(),
                    error = %error,
                    "list fetch failed"
                );
                control.dedup.forget();
                let message = error.user_message(&format!("Erro ao listar {}", T::PLURAL));
                self.state.send_modify(|state| state.fail(message));
            }
        }
    }

    /// Issues the current query synchronously and spawns the network part.
    fn launch(self: &Arc<Self>, force: bool) -> Option<JoinHandle<()>> {
        let issued = self.begin(force)?;
        let span = info_span!(
            "list_fetch",
            entity = T::RESOURCE,
            request_id = issued.handle.id(),
            page = issued.transport.page,
            limit = issued.transport.limit,
        );
        let inner = Arc::clone(self);
        Some(tokio::spawn(
            async move {
                let result = inner.run(&issued).await;
                inner.settle(&issued, result);
            }
            .instrument(span),
        ))
    }
}

impl<T: Entity, R> Drop for Inner<T, R> {
    fn drop(&mut self) {
        if let Some(driver) = self.driver.get_mut().take() {
            driver.abort();
        }
    }
}

// ---------------------------------------------------------------------------
// ListSynchronizer
// ---------------------------------------------------------------------------

/// Controller of one list view. Cheap to clone; clones share state.
pub struct ListSynchronizer<T: Entity, R> {
    inner: Arc<Inner<T, R>>,
}

impl<T: Entity, R> Clone for ListSynchronizer<T, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Entity, R: RemoteCollection<T>> ListSynchronizer<T, R> {
    /// Synchronizer starting from the entity's default sort and the configured
    /// page size.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn new(remote: Arc<R>, config: &SyncConfig) -> Self {
        let defaults = QueryDefaults::for_entity::<T>(config.default_page_size);
        Self::with_defaults(remote, defaults, config)
    }

    /// Synchronizer starting from caller-supplied defaults.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn with_defaults(remote: Arc<R>, defaults: QueryDefaults, config: &SyncConfig) -> Self {
        let (gate, mut debounced) = DebounceGate::spawn(config.debounce);
        let (state, _) = watch::channel(SynchronizerState::default());

        let inner = Arc::new(Inner {
            remote,
            control: Mutex::new(Control {
                query: Query::new(&defaults),
                dedup: RequestDeduplicator::new(),
                inflight: InFlightTracker::new(),
                disposed: false,
            }),
            defaults,
            state,
            gate,
            driver: Mutex::new(None),
        });

        let weak: Weak<Inner<T, R>> = Arc::downgrade(&inner);
        let driver = tokio::spawn(async move {
            while debounced.recv().await.is_some() {
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                inner.launch(false);
            }
        });
        *inner.driver.lock() = Some(driver);

        Self { inner }
    }

    /// Mount: fetches the initial query right away.
    pub fn start(&self) {
        self.inner.launch(false);
    }

    /// Moves to the 0-based page `page_index`.
    pub fn set_page(&self, page_index: u32) {
        self.update_query(|query| query.page_index = page_index);
    }

    /// Changes the page size (at least 1) and returns to the first page.
    pub fn set_page_size(&self, page_size: u32) {
        self.update_query(|query| {
            query.page_size = page_size.max(1);
            query.page_index = 0;
        });
    }

    /// Changes the sort and returns to the first page. `None` restores the
    /// default sort.
    pub fn set_sort(&self, sort: Option<SortSpec>) {
        let fallback = self.inner.defaults.sort.clone();
        self.update_query(|query| {
            query.sort = sort.or(fallback);
            query.page_index = 0;
        });
    }

    /// Edits the filters in place and returns to the first page.
    pub fn set_filters(&self, update: impl FnOnce(&mut Filters)) {
        self.update_query(|query| {
            update(&mut query.filters);
            query.page_index = 0;
        });
    }

    /// Fetches the current query now, bypassing dedup and any pending
    /// debounce, and waits until that fetch settles.
    pub async fn refresh(&self) {
        self.inner.gate.cancel();
        if let Some(task) = self.inner.launch(true) {
            // A fetch task only ends early if the runtime shuts down.
            let _ = task.await;
        }
    }

    /// Tears the view down: drops the pending debounce, cancels the in-flight
    /// request, and stops the driver.
    pub fn dispose(&self) {
        {
            let mut control = self.inner.control.lock();
            if control.disposed {
                return;
            }
            control.disposed = true;
            control.inflight.cancel_all();
        }
        self.inner.gate.cancel();
        self.inner.gate.close();
        if let Some(driver) = self.inner.driver.lock().take() {
            driver.abort();
        }
        debug!(entity = T::RESOURCE, "list synchronizer disposed");
    }

    fn update_query(&self, edit: impl FnOnce(&mut Query)) {
        {
            let mut control = self.inner.control.lock();
            if control.disposed {
                return;
            }
            edit(&mut control.query);
        }
        self.inner.gate.push(());
    }
}

impl<T: Entity, R> ListSynchronizer<T, R> {
    /// Snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> SynchronizerState<T> {
        self.inner.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SynchronizerState<T>> {
        self.inner.state.subscribe()
    }

    /// Snapshot of the current query, including edits still being debounced.
    #[must_use]
    pub fn query(&self) -> Query {
        self.inner.control.lock().query.clone()
    }

    #[must_use]
    pub fn defaults(&self) -> &QueryDefaults {
        &self.inner.defaults
    }

    #[must_use]
    pub fn remote(&self) -> &Arc<R> {
        &self.inner.remote
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.control.lock().disposed
    }

    /// Row with the given id on the current page.
    #[must_use]
    pub fn row(&self, id: &EntityId) -> Option<T> {
        self.inner.state.borrow().row(id).cloned()
    }

    /// Swaps in `row` where its id sits on the current page.
    pub fn replace_row(&self, row: T) -> bool {
        self.inner.state.send_if_modified(|state| state.replace_row(row))
    }

    /// Edits the row with the given id in place.
    pub fn patch_row(&self, id: &EntityId, patch: impl FnOnce(&mut T)) -> bool {
        self.inner
            .state
            .send_if_modified(|state| match state.rows.iter_mut().find(|r| r.id() == id) {
                Some(row) => {
                    patch(row);
                    true
                }
                None => false,
            })
    }

    /// Drops the row with the given id from the current page.
    pub fn remove_row(&self, id: &EntityId) -> Option<T> {
        let mut removed = None;
        self.inner.state.send_if_modified(|state| {
            removed = state.remove_row(id);
            removed.is_some()
        });
        removed
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rollcall_core::entities::{Shelter, ShelterDraft};
    use rollcall_core::{Scalar, SortOrder};

    use super::*;
    use crate::state::Phase;
    use crate::testing::{scripted, ScriptedRemote};

    type Shelters = ListSynchronizer<Shelter, ScriptedRemote<Shelter>>;

    fn shelter(id: &str) -> Shelter {
        Shelter::from_draft(
            EntityId::from(id),
            &ShelterDraft {
                name: Some(format!("Abrigo {id}")),
                city: Some("Recife".into()),
                ..ShelterDraft::default()
            },
        )
    }

    fn ids(state: &SynchronizerState<Shelter>) -> Vec<&str> {
        state.rows.iter().map(|r| r.id.as_str()).collect()
    }

    async fn settled(list: &Shelters) -> SynchronizerState<Shelter> {
        let mut rx = list.subscribe();
        let state = rx.wait_for(|s| !s.loading).await.expect("state channel open");
        state.clone()
    }

    fn search(list: &Shelters, text: &str) {
        let text = text.to_string();
        list.set_filters(move |filters| {
            filters.insert("search".into(), Some(Scalar::Text(text)));
        });
    }

    #[tokio::test(start_paused = true)]
    async fn start_fetches_first_page_with_defaults() {
        let (remote, mut script) = scripted::<Shelter>();
        let list = ListSynchronizer::new(remote, &SyncConfig::default());
        list.start();
        assert!(list.state().loading);
        assert_eq!(list.state().phase, Phase::Loading);

        let call = script.next_list().await;
        assert_eq!(call.query.page, 1);
        assert_eq!(call.query.limit, 12);
        let sort = call.query.sort.clone().expect("default sort");
        assert_eq!(sort.field, "name");
        assert_eq!(sort.order, SortOrder::Asc);

        call.respond(vec![shelter("a"), shelter("b")], 2);
        let state = settled(&list).await;
        assert_eq!(ids(&state), ["a", "b"]);
        assert_eq!(state.total, 2);
        assert_eq!(state.phase, Phase::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_response_is_suppressed() {
        let (remote, mut script) = scripted::<Shelter>();
        let list = ListSynchronizer::new(remote, &SyncConfig::default());
        list.start();
        let first = script.next_list().await;

        list.set_page(1);
        let second = script.next_list().await;
        assert_eq!(second.query.page, 2);
        assert!(first.cancel.is_cancelled());

        second.respond(vec![shelter("y")], 13);
        let state = settled(&list).await;
        assert_eq!(ids(&state), ["y"]);

        first.respond(vec![shelter("x")], 13);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(ids(&list.state()), ["y"]);
        assert_eq!(list.state().total, 13);
    }

    #[tokio::test(start_paused = true)]
    async fn identical_query_is_not_refetched() {
        let (remote, mut script) = scripted::<Shelter>();
        let list = ListSynchronizer::new(remote.clone(), &SyncConfig::default());
        list.start();
        script.next_list().await.respond(vec![shelter("a")], 1);
        settled(&list).await;

        // Typed and erased within one window: the final query is unchanged.
        search(&list, "lar");
        list.set_filters(|filters| {
            filters.insert("search".into(), Some(Scalar::Text(String::new())));
        });
        list.set_page(0);
        list.start();

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(script.try_next_list().is_none());
        assert_eq!(remote.list_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_bypasses_dedup() {
        let (remote, mut script) = scripted::<Shelter>();
        let list = ListSynchronizer::new(remote.clone(), &SyncConfig::default());
        list.start();
        script.next_list().await.respond(vec![shelter("a")], 1);
        settled(&list).await;

        tokio::join!(list.refresh(), async {
            let call = script.next_list().await;
            assert_eq!(call.query.page, 1);
            call.respond(vec![shelter("a"), shelter("b")], 2);
        });

        assert_eq!(remote.list_calls(), 2);
        assert_eq!(ids(&list.state()), ["a", "b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_drops_pending_debounce() {
        let (remote, mut script) = scripted::<Shelter>();
        let list = ListSynchronizer::new(remote.clone(), &SyncConfig::default());
        list.start();
        script.next_list().await.respond(vec![shelter("a")], 1);
        settled(&list).await;

        search(&list, "lar");
        tokio::join!(list.refresh(), async {
            let call = script.next_list().await;
            assert_eq!(call.query.filters["searchString"], "lar");
            call.respond(vec![shelter("a")], 1);
        });

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(script.try_next_list().is_none());
        assert_eq!(remote.list_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn late_debounce_tick_after_refresh_keeps_refreshed_page() {
        let (remote, mut script) = scripted::<Shelter>();
        let list = ListSynchronizer::new(remote.clone(), &SyncConfig::default());
        list.start();
        script.next_list().await.respond(vec![shelter("a")], 40);
        settled(&list).await;

        list.set_page(1);
        list.set_page(2);
        tokio::join!(list.refresh(), async {
            let call = script.next_list().await;
            assert_eq!(call.query.page, 3);
            call.respond(vec![shelter("p3")], 40);
        });

        // A quiet period for the page-1 edit that elapsed just before the
        // refresh is only handled by the driver now.
        assert!(list.inner.launch(false).is_none());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(script.try_next_list().is_none());
        assert_eq!(remote.list_calls(), 2);
        assert_eq!(list.query().page_index, 2);
        let state = list.state();
        assert_eq!(ids(&state), ["p3"]);
        assert_eq!(state.phase, Phase::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn page_size_change_returns_to_first_page() {
        let (remote, mut script) = scripted::<Shelter>();
        let list = ListSynchronizer::new(remote, &SyncConfig::default());
        list.start();
        script.next_list().await.respond(vec![shelter("a")], 40);
        settled(&list).await;

        list.set_page(2);
        let call = script.next_list().await;
        assert_eq!(call.query.page, 3);
        call.respond(vec![shelter("c")], 40);
        settled(&list).await;

        list.set_page_size(24);
        assert_eq!(list.query().page_index, 0);
        let call = script.next_list().await;
        assert_eq!(call.query.page, 1);
        assert_eq!(call.query.limit, 24);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_page_size_is_clamped() {
        let (remote, mut script) = scripted::<Shelter>();
        let list = ListSynchronizer::new(remote, &SyncConfig::default());
        list.set_page_size(0);
        assert_eq!(list.query().page_size, 1);
        assert_eq!(script.next_list().await.query.limit, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn typing_burst_issues_one_fetch() {
        let (remote, mut script) = scripted::<Shelter>();
        let list = ListSynchronizer::new(remote.clone(), &SyncConfig::default());
        list.start();
        script.next_list().await.respond(vec![], 0);
        settled(&list).await;

        list.set_page(3);
        for text in ["l", "la", "lar"] {
            search(&list, text);
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        let call = script.next_list().await;
        assert_eq!(call.query.filters["searchString"], "lar");
        // Filter edits reset the page chosen earlier in the burst.
        assert_eq!(call.query.page, 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(script.try_next_list().is_none());
        assert_eq!(remote.list_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn sort_maps_to_server_fields_and_falls_back_to_default() {
        let (remote, mut script) = scripted::<Shelter>();
        let list = ListSynchronizer::new(remote, &SyncConfig::default());

        list.set_page(4);
        list.set_sort(Some(SortSpec::desc("city")));
        let call = script.next_list().await;
        assert_eq!(call.query.page, 1);
        let sort = call.query.sort.clone().expect("sort");
        assert_eq!(sort.field, "address.city");
        assert_eq!(sort.order, SortOrder::Desc);
        call.respond(vec![], 0);

        list.set_sort(None);
        assert_eq!(list.query().sort, Some(SortSpec::asc("name")));
        let call = script.next_list().await;
        assert_eq!(call.query.sort.map(|s| s.field), Some("name".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn failure_keeps_rows_and_reports_message() {
        let (remote, mut script) = scripted::<Shelter>();
        let list = ListSynchronizer::new(remote, &SyncConfig::default());
        list.start();
        script.next_list().await.respond(vec![shelter("a")], 1);
        settled(&list).await;

        tokio::join!(list.refresh(), async {
            script
                .next_list()
                .await
                .fail(RemoteError::server("Serviço indisponível"));
        });
        let state = list.state();
        assert_eq!(ids(&state), ["a"]);
        assert_eq!(state.total, 1);
        assert!(!state.loading);
        assert_eq!(state.phase, Phase::Error);
        assert_eq!(state.error.as_deref(), Some("Serviço indisponível"));

        tokio::join!(list.refresh(), async {
            script.next_list().await.fail(RemoteError::Server {
                status: Some(500),
                message: None,
            });
        });
        assert_eq!(list.state().error.as_deref(), Some("Erro ao listar abrigos"));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_query_can_be_retried_without_force() {
        let (remote, mut script) = scripted::<Shelter>();
        let list = ListSynchronizer::new(remote.clone(), &SyncConfig::default());
        list.start();
        script
            .next_list()
            .await
            .fail(RemoteError::Transport("connection reset".into()));
        let state = settled(&list).await;
        assert_eq!(state.error.as_deref(), Some("connection reset"));

        list.set_page(0);
        let retry = script.next_list().await;
        assert_eq!(retry.query.page, 1);
        retry.respond(vec![shelter("a")], 1);
        let state = settled(&list).await;
        assert_eq!(state.error, None);
        assert_eq!(remote.list_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn dispose_drops_pending_and_in_flight_work() {
        let (remote, mut script) = scripted::<Shelter>();
        let list = ListSynchronizer::new(remote.clone(), &SyncConfig::default());
        list.start();
        let first = script.next_list().await;

        list.set_page(1);
        list.dispose();
        assert!(list.is_disposed());
        assert!(first.cancel.is_cancelled());

        first.respond(vec![shelter("x")], 1);
        list.set_page(2);
        list.refresh().await;
        list.start();
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert!(script.try_next_list().is_none());
        assert_eq!(remote.list_calls(), 1);
        assert!(list.state().rows.is_empty());
        assert_eq!(list.query().page_index, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn row_edits_notify_subscribers() {
        let (remote, mut script) = scripted::<Shelter>();
        let list = ListSynchronizer::new(remote, &SyncConfig::default());
        list.start();
        script
            .next_list()
            .await
            .respond(vec![shelter("a"), shelter("b"), shelter("c")], 3);
        settled(&list).await;

        let mut rx = list.subscribe();
        rx.borrow_and_update();

        assert!(list.patch_row(&EntityId::from("a"), |row| row.name = "Lar Novo".into()));
        assert!(rx.has_changed().expect("open"));
        assert_eq!(list.row(&EntityId::from("a")).map(|r| r.name), Some("Lar Novo".into()));

        let mut replaced = shelter("b");
        replaced.city = "Olinda".into();
        assert!(list.replace_row(replaced));
        assert!(!list.replace_row(shelter("zz")));

        assert!(list.remove_row(&EntityId::from("c")).is_some());
        assert!(list.remove_row(&EntityId::from("c")).is_none());
        let state = list.state();
        assert_eq!(ids(&state), ["a", "b"]);
        assert_eq!(state.total, 2);
        assert_eq!(state.rows[1].city, "Olinda");
    }
}
