//! Versioned stream subscription
//!
//! Keeps one reconstructor per stream of the selected thread, refreshes them
//! from a [`DeltaSource`] and publishes the live messages on a watch channel.
//! Every refresh, thread switch, reset and close bumps a version counter; a
//! refresh only publishes if nothing bumped it while it was reading.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use strand_persist::{DeltaSync, Result, SyncedStream};
use strand_types::Cursor;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info};

use crate::reconstructor::StreamReconstructor;
use crate::ui::UiMessage;

/// Where a subscription reads its deltas from
#[async_trait]
pub trait DeltaSource: Send + Sync {
    async fn sync(&self, thread_id: &str, cursors: &HashMap<String, Cursor>) -> Result<Vec<SyncedStream>>;
}

#[async_trait]
impl DeltaSource for DeltaSync {
    async fn sync(&self, thread_id: &str, cursors: &HashMap<String, Cursor>) -> Result<Vec<SyncedStream>> {
        self.sync_streams(thread_id, cursors).await
    }
}

#[derive(Default)]
struct State {
    thread_id: Option<String>,
    streams: HashMap<String, StreamReconstructor>,
    closed: bool,
}

impl State {
    fn messages(&self) -> Vec<UiMessage> {
        let mut messages: Vec<UiMessage> = self.streams.values().map(|r| r.message().clone()).collect();
        messages.sort_by_key(|m| m.order_key());
        messages
    }
}

pub struct StreamSubscription<S: DeltaSource> {
    source: Arc<S>,
    state: Mutex<State>,
    version: AtomicU64,
    tx: watch::Sender<Vec<UiMessage>>,
}

impl<S: DeltaSource> StreamSubscription<S> {
    pub fn new(source: Arc<S>, thread_id: Option<String>) -> Self {
        let (tx, _) = watch::channel(Vec::new());
        Self {
            source,
            state: Mutex::new(State {
                thread_id,
                ..State::default()
            }),
            version: AtomicU64::new(0),
            tx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<UiMessage>> {
        self.tx.subscribe()
    }

    /// Last published live messages, ordered by key
    pub fn messages(&self) -> Vec<UiMessage> {
        self.tx.borrow().clone()
    }

    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    fn bump(&self) -> u64 {
        self.version.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Read what is new on every stream of the thread and publish the result.
    ///
    /// Returns `false` when nothing changed or the pass was superseded.
    pub async fn refresh(&self) -> Result<bool> {
        let version = self.bump();

        let (thread_id, cursors) = {
            let state = self.state.lock().await;
            if state.closed {
                return Ok(false);
            }
            let Some(thread_id) = state.thread_id.clone() else {
                return Ok(false);
            };
            let cursors: HashMap<String, Cursor> = state
                .streams
                .iter()
                .map(|(id, r)| (id.clone(), r.cursor()))
                .collect();
            (thread_id, cursors)
        };

        let synced = self.source.sync(&thread_id, &cursors).await?;

        let mut state = self.state.lock().await;
        if state.closed || self.version() != version {
            debug!(thread_id = %thread_id, version, "dropping superseded refresh");
            return Ok(false);
        }

        let mut changed = false;
        for SyncedStream { stream, batch } in synced {
            match stream {
                Some(stream) => {
                    let reconstructor = state
                        .streams
                        .entry(batch.stream_id.clone())
                        .or_insert_with(|| StreamReconstructor::new(stream.clone()));
                    reconstructor.update_stream(stream);
                    changed |= reconstructor.apply(&batch);
                }
                None => {
                    if state.streams.remove(&batch.stream_id).is_some() {
                        debug!(stream_id = %batch.stream_id, "stream vanished");
                        changed = true;
                    }
                }
            }
        }

        if changed {
            self.tx.send_replace(state.messages());
        }
        Ok(changed)
    }

    /// Follow another thread, or none. Pending refreshes are discarded.
    pub async fn set_thread(&self, thread_id: Option<String>) {
        self.bump();
        let mut state = self.state.lock().await;
        state.streams.clear();
        state.thread_id = thread_id;
        self.tx.send_replace(Vec::new());
    }

    /// Forget every stream and replay from the start on the next refresh.
    pub async fn reset(&self) {
        self.bump();
        let mut state = self.state.lock().await;
        state.streams.clear();
        self.tx.send_replace(Vec::new());
    }

    pub async fn close(&self) {
        self.bump();
        let mut state = self.state.lock().await;
        state.closed = true;
        state.streams.clear();
        self.tx.send_replace(Vec::new());
        info!(thread_id = ?state.thread_id, "closed subscription");
    }

    pub async fn is_closed(&self) -> bool {
        self.state.lock().await.closed
    }

    /// Refresh every `every` until closed.
    pub async fn follow(&self, every: Duration) -> Result<()> {
        while !self.is_closed().await {
            self.refresh().await?;
            tokio::time::sleep(every).await;
        }
        Ok(())
    }
}
