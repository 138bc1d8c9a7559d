//! In-process [`ProcessBus`] implementation backed by tokio channels
//!
//! Serves two purposes: it is the bus the test suite runs multi-process
//! scenarios on, and it is a usable transport for pools whose "processes" are
//! tasks within a single host process.

use crate::bus::{inbound_channel, ProcessBus, ProcessDescriptor, ProcessIdentity};
use crate::{BoxedError, EmptyResult};
use async_trait::async_trait;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

struct Subscription {
    owner: u64,
    sender: mpsc::UnboundedSender<Vec<u8>>,
}

#[derive(Default)]
struct PoolState {
    directory: Mutex<Vec<ProcessDescriptor>>,
    channels: Mutex<HashMap<String, Vec<Subscription>>>,
    next_handle: AtomicU64,
}

/// Shared in-memory pool every [`MemoryBusHandle`] attaches to
///
/// The directory is populated explicitly through
/// [`announce`](MemoryBus::announce); delivery between handles is best-effort
/// in the same sense as a real transport: frames published to a channel
/// nobody subscribed to are dropped.
#[derive(Default, Clone)]
pub struct MemoryBus {
    state: Arc<PoolState>,
}

impl MemoryBus {
    /// Creates a new, empty pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a process descriptor with the directory
    pub fn announce(&self, descriptor: ProcessDescriptor) {
        self.state
            .directory
            .lock()
            .expect("directory lock poisoned")
            .push(descriptor);
    }

    /// Creates a fresh connection handle onto the pool
    ///
    /// Each handle owns its subscriptions; disconnecting one handle leaves the
    /// subscriptions of all others untouched.
    pub fn handle(&self) -> MemoryBusHandle {
        MemoryBusHandle {
            state: self.state.clone(),
            owner: self.state.next_handle.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Number of live subscriptions on a channel, across all handles
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.state
            .channels
            .lock()
            .expect("channel table lock poisoned")
            .get(channel)
            .map(|subscriptions| {
                subscriptions
                    .iter()
                    .filter(|s| !s.sender.is_closed())
                    .count()
            })
            .unwrap_or_default()
    }

    /// Number of live subscriptions across the whole pool, all channels included
    pub fn live_subscription_count(&self) -> usize {
        self.state
            .channels
            .lock()
            .expect("channel table lock poisoned")
            .values()
            .flatten()
            .filter(|s| !s.sender.is_closed())
            .count()
    }
}

/// One process's connection onto a [`MemoryBus`]
///
/// Cloning mints an independent handle with its own subscription ownership,
/// equivalent to calling [`MemoryBus::handle`] again.
pub struct MemoryBusHandle {
    state: Arc<PoolState>,
    owner: u64,
}

impl Clone for MemoryBusHandle {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            owner: self.state.next_handle.fetch_add(1, Ordering::Relaxed),
        }
    }
}

impl MemoryBusHandle {
    fn deliver(&self, channel: &str, frame: Vec<u8>) {
        let mut channels = self
            .state
            .channels
            .lock()
            .expect("channel table lock poisoned");

        if let Some(subscriptions) = channels.get_mut(channel) {
            subscriptions.retain(|subscription| subscription.sender.send(frame.clone()).is_ok());
        }
    }
}

#[async_trait]
impl ProcessBus for MemoryBusHandle {
    async fn connect(&self) -> EmptyResult {
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ProcessDescriptor>, BoxedError> {
        Ok(self
            .state
            .directory
            .lock()
            .expect("directory lock poisoned")
            .clone())
    }

    async fn subscribe(&self, channel: &str) -> Result<BoxStream<'static, Vec<u8>>, BoxedError> {
        let (sender, receiver) = mpsc::unbounded_channel();

        self.state
            .channels
            .lock()
            .expect("channel table lock poisoned")
            .entry(channel.to_owned())
            .or_default()
            .push(Subscription {
                owner: self.owner,
                sender,
            });

        let stream = stream::unfold(receiver, |mut receiver| async move {
            receiver.recv().await.map(|frame| (frame, receiver))
        });

        Ok(stream.boxed())
    }

    async fn send_to(&self, target: ProcessIdentity, frame: Vec<u8>) -> EmptyResult {
        self.deliver(&inbound_channel(target), frame);
        Ok(())
    }

    async fn publish(&self, channel: &str, frame: Vec<u8>) -> EmptyResult {
        self.deliver(channel, frame);
        Ok(())
    }

    async fn disconnect(&self) {
        let mut channels = self
            .state
            .channels
            .lock()
            .expect("channel table lock poisoned");

        for subscriptions in channels.values_mut() {
            subscriptions.retain(|subscription| subscription.owner != self.owner);
        }
    }
}
