//! Scripted remote for controller tests.
//!
//! Every call is parked on a `oneshot` and handed to the test through an
//! mpsc channel, so the test decides when and in which order requests
//! resolve. Cancellation tokens are deliberately ignored: stale results must
//! be suppressed by the controllers' request-id checks alone.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use rollcall_core::{Entity, EntityId, ListResult, RemoteError, TransportQuery};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::traits::RemoteCollection;

type Reply<V> = oneshot::Sender<Result<V, RemoteError>>;

pub(crate) struct PendingList<T> {
    pub query: TransportQuery,
    pub cancel: CancellationToken,
    reply: Reply<ListResult<T>>,
}

impl<T> PendingList<T> {
    pub fn respond(self, rows: Vec<T>, total: u64) {
        let _ = self.reply.send(Ok(ListResult::new(rows, total)));
    }

    pub fn fail(self, error: RemoteError) {
        let _ = self.reply.send(Err(error));
    }
}

pub(crate) struct PendingGet<T> {
    pub id: EntityId,
    reply: Reply<T>,
}

impl<T> PendingGet<T> {
    pub fn respond(self, entity: T) {
        let _ = self.reply.send(Ok(entity));
    }

    pub fn fail(self, error: RemoteError) {
        let _ = self.reply.send(Err(error));
    }
}

#[derive(Debug)]
pub(crate) enum MutationCall<D> {
    Create(D),
    Update(EntityId, D),
    Delete(EntityId),
}

pub(crate) struct PendingMutation<T: Entity> {
    pub call: MutationCall<T::Draft>,
    reply: Reply<Option<T>>,
}

impl<T: Entity> PendingMutation<T> {
    /// Resolves create/update with the stored record, or delete with `None`.
    pub fn respond(self, stored: Option<T>) {
        let _ = self.reply.send(Ok(stored));
    }

    pub fn fail(self, error: RemoteError) {
        let _ = self.reply.send(Err(error));
    }
}

pub(crate) struct ScriptedRemote<T: Entity> {
    lists: mpsc::UnboundedSender<PendingList<T>>,
    gets: mpsc::UnboundedSender<PendingGet<T>>,
    mutations: mpsc::UnboundedSender<PendingMutation<T>>,
    list_calls: AtomicU64,
}

impl<T: Entity> ScriptedRemote<T> {
    pub fn list_calls(&self) -> u64 {
        self.list_calls.load(Ordering::SeqCst)
    }

    async fn park<V>(&self, send: impl FnOnce(Reply<V>) -> bool) -> Result<V, RemoteError> {
        let (tx, rx) = oneshot::channel();
        if !send(tx) {
            return Err(RemoteError::Transport("script closed".into()));
        }
        // A dropped reply (test lost interest) reads as a cancellation.
        rx.await.unwrap_or(Err(RemoteError::Cancelled))
    }
}

/// Test side of a [`ScriptedRemote`].
pub(crate) struct Script<T: Entity> {
    lists: mpsc::UnboundedReceiver<PendingList<T>>,
    gets: mpsc::UnboundedReceiver<PendingGet<T>>,
    mutations: mpsc::UnboundedReceiver<PendingMutation<T>>,
}

impl<T: Entity> Script<T> {
    pub async fn next_list(&mut self) -> PendingList<T> {
        self.lists.recv().await.expect("remote dropped")
    }

    pub fn try_next_list(&mut self) -> Option<PendingList<T>> {
        self.lists.try_recv().ok()
    }

    pub async fn next_get(&mut self) -> PendingGet<T> {
        self.gets.recv().await.expect("remote dropped")
    }

    pub fn try_next_get(&mut self) -> Option<PendingGet<T>> {
        self.gets.try_recv().ok()
    }

    pub async fn next_mutation(&mut self) -> PendingMutation<T> {
        self.mutations.recv().await.expect("remote dropped")
    }
}

pub(crate) fn scripted<T: Entity>() -> (Arc<ScriptedRemote<T>>, Script<T>) {
    let (lists_tx, lists) = mpsc::unbounded_channel();
    let (gets_tx, gets) = mpsc::unbounded_channel();
    let (mutations_tx, mutations) = mpsc::unbounded_channel();
    let remote = ScriptedRemote {
        lists: lists_tx,
        gets: gets_tx,
        mutations: mutations_tx,
        list_calls: AtomicU64::new(0),
    };
    (
        Arc::new(remote),
        Script {
            lists,
            gets,
            mutations,
        },
    )
}

fn missing_body() -> RemoteError {
    RemoteError::Transport("scripted reply carried no record".into())
}

#[async_trait]
impl<T: Entity> RemoteCollection<T> for ScriptedRemote<T> {
    async fn list(
        &self,
        query: &TransportQuery,
        cancel: CancellationToken,
    ) -> Result<ListResult<T>, RemoteError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let query = query.clone();
        self.park(|reply| {
            self.lists
                .send(PendingList {
                    query,
                    cancel,
                    reply,
                })
                .is_ok()
        })
        .await
    }

    async fn get(&self, id: &EntityId, _cancel: CancellationToken) -> Result<T, RemoteError> {
        let id = id.clone();
        self.park(|reply| self.gets.send(PendingGet { id, reply }).is_ok())
            .await
    }

    async fn create(&self, draft: &T::Draft) -> Result<T, RemoteError> {
        let call = MutationCall::Create(draft.clone());
        self.park(|reply| self.mutations.send(PendingMutation { call, reply }).is_ok())
            .await?
            .ok_or_else(missing_body)
    }

    async fn update(&self, id: &EntityId, draft: &T::Draft) -> Result<T, RemoteError> {
        let call = MutationCall::Update(id.clone(), draft.clone());
        self.park(|reply| self.mutations.send(PendingMutation { call, reply }).is_ok())
            .await?
            .ok_or_else(missing_body)
    }

    async fn delete(&self, id: &EntityId) -> Result<(), RemoteError> {
        let call = MutationCall::Delete(id.clone());
        self.park(|reply| self.mutations.send(PendingMutation { call, reply }).is_ok())
            .await
            .map(|_| ())
    }
}
