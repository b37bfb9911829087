//! Queues are bounded `tokio::sync::mpsc` channels. A stage queue with many
//! concurrent consumers (every worker pool in this crate) shares one
//! `Receiver` behind a mutex — the standard competing-consumers idiom for
//! `tokio::sync::mpsc`, since `Receiver` itself is not `Clone`.
//!
//! Producers never need special handling: a queue "closes" exactly when its
//! last `Sender` clone is dropped, which happens automatically once every
//! producer task has exited. This is the Rust-idiomatic replacement for the
//! original's explicit `close(channel)` calls guarded by `sync.WaitGroup`.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

pub type SharedReceiver<T> = Arc<Mutex<mpsc::Receiver<T>>>;

pub fn shared<T>(rx: mpsc::Receiver<T>) -> SharedReceiver<T> {
    Arc::new(Mutex::new(rx))
}

/// Pops the next item off a shared queue, holding the lock only for the
/// duration of the `recv` call so sibling workers aren't starved while one
/// worker processes an item.
pub async fn recv<T>(rx: &SharedReceiver<T>) -> Option<T> {
    rx.lock().await.recv().await
}
