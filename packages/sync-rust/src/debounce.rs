//! Debounce gate: forwards the latest value once input has been quiet.
//!
//! The gate is a spawned tokio task fed through an unbounded mpsc channel.
//! Every value restarts the quiet-period timer; when the timer expires the
//! value held at that moment is sent on the output channel. Dropping the gate
//! aborts the task, so no timer outlives its owner.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug)]
enum Signal<V> {
    Value(V),
    Cancel,
}

/// Input side of a debounced value stream.
#[derive(Debug)]
pub struct DebounceGate<V> {
    tx: mpsc::UnboundedSender<Signal<V>>,
    handle: JoinHandle<()>,
}

impl<V: Send + 'static> DebounceGate<V> {
    /// Spawns the gate task and returns the gate with its output receiver.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn spawn(quiet: Duration) -> (Self, mpsc::UnboundedReceiver<V>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<Signal<V>>();
        let (out_tx, out_rx) = mpsc::unbounded_channel::<V>();

        let handle = tokio::spawn(async move {
            let mut pending: Option<V> = None;

            loop {
                let Some(value) = pending.take() else {
                    match rx.recv().await {
                        Some(Signal::Value(v)) => pending = Some(v),
                        Some(Signal::Cancel) => {}
                        None => break,
                    }
                    continue;
                };

                // A fresh sleep per iteration restarts the quiet period.
                tokio::select! {
                    biased;
                    signal = rx.recv() => match signal {
                        Some(Signal::Value(v)) => pending = Some(v),
                        Some(Signal::Cancel) => {}
                        // Owner gone: drop the pending value.
                        None => break,
                    },
                    () = tokio::time::sleep(quiet) => {
                        if out_tx.send(value).is_err() {
                            break;
                        }
                    }
                }
            }
        });

        (Self { tx, handle }, out_rx)
    }
}

impl<V> DebounceGate<V> {
    /// Feeds a new value, restarting the quiet period.
    ///
    /// Returns `false` if the gate has been closed.
    pub fn push(&self, value: V) -> bool {
        self.tx.send(Signal::Value(value)).is_ok()
    }

    /// Discards the pending value, if any, without emitting it.
    pub fn cancel(&self) {
        let _ = self.tx.send(Signal::Cancel);
    }

    /// Stops the gate. Pending values are dropped and nothing is emitted afterwards.
    pub fn close(&self) {
        self.handle.abort();
    }

    /// Whether the gate task has stopped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.handle.is_finished()
    }
}

impl<V> Drop for DebounceGate<V> {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
