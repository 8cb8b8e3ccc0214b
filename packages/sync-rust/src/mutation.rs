//! Mutation Coordinator: create/update/delete against an entity remote, then
//! reconcile the associated list view.
//!
//! The coordinator has its own `{loading, error}` state. A failed mutation
//! never touches the list's rows, total, or status, with one exception: an
//! optimistic patch is rolled back to the original row.
//!
//! Every step is awaited in order: server call, in-place patch or rollback,
//! then the forced refresh. A mutation returns only after its reconciliation
//! has settled.

use std::sync::Arc;

use rollcall_core::{Entity, EntityId, RemoteError};
use tokio::sync::watch;
use tracing::{debug, info_span, warn, Instrument};

use crate::detail::DetailFetcher;
use crate::list::ListSynchronizer;
use crate::state::MutationState;
use crate::traits::RemoteCollection;

/// How the list view catches up after a successful update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Reconcile {
    /// Forced refresh of the list.
    #[default]
    Refresh,
    /// Patch the row in place, optimistically, then optionally refresh.
    Patch { background_refresh: bool },
}

/// What a successful mutation did to the list view.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationOutcome<T> {
    /// The row was patched in place with the server's version.
    Patched(T),
    /// The list was reconciled by a forced refresh. Carries the stored record
    /// for create and update; `None` for delete.
    RefreshRequired(Option<T>),
}

impl<T> MutationOutcome<T> {
    /// The stored record, if the server returned one.
    #[must_use]
    pub fn entity(&self) -> Option<&T> {
        match self {
            MutationOutcome::Patched(entity) => Some(entity),
            MutationOutcome::RefreshRequired(entity) => entity.as_ref(),
        }
    }
}

/// Mutation controller bound to one list view.
pub struct MutationCoordinator<T: Entity, R> {
    list: ListSynchronizer<T, R>,
    detail: Option<DetailFetcher<T, R>>,
    reconcile: Reconcile,
    state: Arc<watch::Sender<MutationState>>,
}

impl<T: Entity, R> Clone for MutationCoordinator<T, R> {
    fn clone(&self) -> Self {
        Self {
            list: self.list.clone(),
            detail: self.detail.clone(),
            reconcile: self.reconcile,
            state: Arc::clone(&self.state),
        }
    }
}

impl<T: Entity, R: RemoteCollection<T>> MutationCoordinator<T, R> {
    /// Coordinator using the list's remote.
    #[must_use]
    pub fn new(list: &ListSynchronizer<T, R>, reconcile: Reconcile) -> Self {
        let (state, _) = watch::channel(MutationState::default());
        Self {
            list: list.clone(),
            detail: None,
            reconcile,
            state: Arc::new(state),
        }
    }

    /// Also hydrates `detail` with the stored record after an update of the
    /// record it is showing.
    #[must_use]
    pub fn with_detail(mut self, detail: &DetailFetcher<T, R>) -> Self {
        self.detail = Some(detail.clone());
        self
    }

    /// Creates a record, then refreshes the list.
    ///
    /// # Errors
    ///
    /// Returns the remote's error; the coordinator state carries its
    /// user-facing message.
    pub async fn create(&self, draft: &T::Draft) -> Result<MutationOutcome<T>, RemoteError> {
        self.begin();
        let span = info_span!("mutation", entity = T::RESOURCE, op = "create");
        let created = match self.list.remote().create(draft).instrument(span).await {
            Ok(created) => created,
            Err(error) => return Err(self.fail(error, "criar")),
        };
        debug!(entity = T::RESOURCE, id = %created.id(), "created, refreshing list");

        self.list.refresh().await;
        self.finish(None);
        Ok(MutationOutcome::RefreshRequired(Some(created)))
    }

    /// Updates a record and reconciles the list per the configured strategy.
    ///
    /// # Errors
    ///
    /// Returns the remote's error after rolling back any optimistic patch.
    pub async fn update(
        &self,
        id: &EntityId,
        draft: &T::Draft,
    ) -> Result<MutationOutcome<T>, RemoteError> {
        self.begin();

        let original = match self.reconcile {
            Reconcile::Patch { .. } => self.list.row(id).inspect(|row| {
                let mut optimistic = row.clone();
                optimistic.apply_draft(draft);
                self.list.replace_row(optimistic);
            }),
            Reconcile::Refresh => None,
        };

        let span = info_span!("mutation", entity = T::RESOURCE, op = "update", id = %id);
        let stored = match self.list.remote().update(id, draft).instrument(span).await {
            Ok(stored) => stored,
            Err(error) => {
                if let Some(original) = original {
                    debug!(entity = T::RESOURCE, id = %id, "rolling back optimistic patch");
                    self.list.replace_row(original);
                }
                return Err(self.fail(error, "atualizar"));
            }
        };

        if let Some(detail) = &self.detail {
            if detail.is_viewing(id) {
                detail.set_entity(stored.clone());
            }
        }

        let outcome = match self.reconcile {
            Reconcile::Patch { background_refresh } => {
                self.list.replace_row(stored.clone());
                if background_refresh {
                    self.list.refresh().await;
                }
                MutationOutcome::Patched(stored)
            }
            Reconcile::Refresh => {
                self.list.refresh().await;
                MutationOutcome::RefreshRequired(Some(stored))
            }
        };
        self.finish(None);
        Ok(outcome)
    }

    /// Deletes a record, drops its row, then refreshes the list.
    ///
    /// The refresh cancels any list fetch issued before the delete, so a slow
    /// pre-delete page can never bring the row back.
    ///
    /// # Errors
    ///
    /// Returns the remote's error; the list is left untouched.
    pub async fn delete(&self, id: &EntityId) -> Result<MutationOutcome<T>, RemoteError> {
        self.begin();
        let span = info_span!("mutation", entity = T::RESOURCE, op = "delete", id = %id);
        if let Err(error) = self.list.remote().delete(id).instrument(span).await {
            return Err(self.fail(error, "excluir"));
        }

        self.list.remove_row(id);
        if let Some(detail) = &self.detail {
            if detail.is_viewing(id) {
                detail.clear();
            }
        }
        self.list.refresh().await;
        self.finish(None);
        Ok(MutationOutcome::RefreshRequired(None))
    }
}

impl<T: Entity, R> MutationCoordinator<T, R> {
    #[must_use]
    pub fn state(&self) -> MutationState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<MutationState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn reconcile(&self) -> Reconcile {
        self.reconcile
    }

    fn begin(&self) {
        self.state.send_modify(MutationState::begin);
    }

    fn finish(&self, error: Option<String>) {
        self.state.send_modify(|state| state.finish(error));
    }

    fn fail(&self, error: RemoteError, verb: &str) -> RemoteError {
        warn!(entity = T::RESOURCE, error = %error, "{verb} failed");
        let message = error.user_message(&format!("Erro ao {verb} {}", T::SINGULAR));
        self.finish(Some(message));
        error
    }
}
