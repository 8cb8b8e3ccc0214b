//! Detail-on-demand fetcher: loads one full record as "currently viewing".
//!
//! Every `fetch` is issued unconditionally and supersedes the previous one;
//! only the most recent fetch may write the state.

use std::sync::Arc;

use parking_lot::Mutex;
use rollcall_core::{Entity, EntityId, RemoteError};
use tokio::sync::watch;
use tracing::{debug, info_span, warn, Instrument};

use crate::inflight::{InFlightTracker, RequestHandle};
use crate::state::DetailState;
use crate::traits::RemoteCollection;

struct Control {
    inflight: InFlightTracker,
    disposed: bool,
}

struct Inner<T: Entity, R> {
    remote: Arc<R>,
    control: Mutex<Control>,
    state: watch::Sender<DetailState<T>>,
}

/// Controller of one detail view. Cheap to clone; clones share state.
pub struct DetailFetcher<T: Entity, R> {
    inner: Arc<Inner<T, R>>,
}

impl<T: Entity, R> Clone for DetailFetcher<T, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Entity, R: RemoteCollection<T>> Inner<T, R> {
    fn settle(
        &self,
        handle: &RequestHandle,
        id: &EntityId,
        result: Result<T, RemoteError>,
    ) -> Option<T> {
        let mut control = self.control.lock();
        if !control.inflight.complete(handle) {
            debug!(
                entity = T::RESOURCE,
                request_id = handle.id(),
                "discarding superseded detail response"
            );
            return None;
        }

        match result {
            Ok(entity) => {
                self.state.send_modify(|state| state.succeed(entity.clone()));
                Some(entity)
            }
            Err(error) if error.is_cancelled() => {
                self.state.send_modify(DetailState::abandon);
                None
            }
            Err(error) => {
                warn!(entity = T::RESOURCE, id = %id, error = %error, "detail fetch failed");
                let message = error.user_message(&format!("Erro ao carregar {}", T::SINGULAR));
                self.state.send_modify(|state| state.fail(message));
                None
            }
        }
    }
}

impl<T: Entity, R: RemoteCollection<T>> DetailFetcher<T, R> {
    #[must_use]
    pub fn new(remote: Arc<R>) -> Self {
        let (state, _) = watch::channel(DetailState::default());
        Self {
            inner: Arc::new(Inner {
                remote,
                control: Mutex::new(Control {
                    inflight: InFlightTracker::new(),
                    disposed: false,
                }),
                state,
            }),
        }
    }

    /// Loads `id`, cancelling any fetch still in flight.
    ///
    /// Returns the record if this fetch was still the latest one when it
    /// succeeded; superseded, cancelled, and failed fetches return `None`.
    /// The request runs on its own task, so dropping the returned future
    /// does not leave the view loading.
    pub async fn fetch(&self, id: &EntityId) -> Option<T> {
        let handle = {
            let mut control = self.inner.control.lock();
            if control.disposed {
                return None;
            }
            let handle = control.inflight.issue();
            self.inner.state.send_modify(|state| state.begin(id));
            handle
        };

        let span = info_span!(
            "detail_fetch",
            entity = T::RESOURCE,
            request_id = handle.id(),
            id = %id,
        );
        let inner = Arc::clone(&self.inner);
        let id = id.clone();
        let task = tokio::spawn(
            async move {
                let token = handle.token();
                let result = tokio::select! {
                    biased;
                    () = token.cancelled() => Err(RemoteError::Cancelled),
                    result = inner.remote.get(&id, handle.token()) => result,
                };
                inner.settle(&handle, &id, result)
            }
            .instrument(span),
        );
        // A fetch task only ends early if the runtime shuts down.
        task.await.ok().flatten()
    }
}

impl<T: Entity, R> DetailFetcher<T, R> {
    /// Shows `entity` as the viewed record, superseding any fetch in flight.
    pub fn set_entity(&self, entity: T) {
        let mut control = self.inner.control.lock();
        if control.disposed {
            return;
        }
        control.inflight.cancel_all();
        self.inner.state.send_modify(|state| {
            state.requested_id = Some(entity.id().clone());
            state.succeed(entity);
        });
    }

    /// Closes the detail view.
    pub fn clear(&self) {
        let mut control = self.inner.control.lock();
        control.inflight.cancel_all();
        self.inner.state.send_replace(DetailState::default());
    }

    /// Cancels the fetch in flight; later operations are no-ops.
    pub fn dispose(&self) {
        let mut control = self.inner.control.lock();
        control.disposed = true;
        control.inflight.cancel_all();
    }

    /// Whether `id` is the record currently requested or shown.
    #[must_use]
    pub fn is_viewing(&self, id: &EntityId) -> bool {
        self.inner.state.borrow().requested_id.as_ref() == Some(id)
    }

    #[must_use]
    pub fn state(&self) -> DetailState<T> {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<DetailState<T>> {
        self.inner.state.subscribe()
    }
}
