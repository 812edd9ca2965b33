//! Publishing the store's collections to observers.
//!
//! After every successful mutating call the store publishes the full
//! property and record collections here, once, before the call returns.
//! A call that changed nothing republishes the unchanged collections. Observers either register a callback or take a channel
//! receiver.
//!
//! ```rust,ignore
//! let store = Store::open_in_memory()?;
//! let _sub = store.subscribe(|collections| {
//!     println!("{} records", collections.records.len());
//! });
//! let rx = store.watch();
//! store.create_property("Sunrise Apt", "1 Main St")?;
//! assert_eq!(rx.recv()?.properties.len(), 1);
//! ```

use crate::model::{Property, Record};
use crate::types::SequenceNumber;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Weak};

/// Everything the store holds, as of one commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Collections {
    /// Commit this snapshot reflects.
    pub sequence: SequenceNumber,
    /// Properties in insertion order.
    pub properties: Vec<Property>,
    /// Records, with rooms, in insertion order.
    pub records: Vec<Record>,
}

type Callback = Arc<dyn Fn(&Arc<Collections>) + Send + Sync>;

struct Shared {
    current: RwLock<Arc<Collections>>,
    callbacks: RwLock<Vec<(u64, Callback)>>,
    channels: RwLock<Vec<Sender<Arc<Collections>>>>,
    next_id: AtomicU64,
}

/// Fan-out of published collections.
///
/// Callbacks run synchronously on the publishing thread, in registration
/// order. They must not call mutating store operations.
#[derive(Clone)]
pub struct CollectionFeed {
    shared: Arc<Shared>,
}

impl CollectionFeed {
    /// Creates a feed whose current value is `initial`.
    #[must_use]
    pub fn new(initial: Collections) -> Self {
        Self {
            shared: Arc::new(Shared {
                current: RwLock::new(Arc::new(initial)),
                callbacks: RwLock::new(Vec::new()),
                channels: RwLock::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// The last published collections.
    #[must_use]
    pub fn current(&self) -> Arc<Collections> {
        Arc::clone(&self.shared.current.read())
    }

    /// Registers a callback; it stays registered until the handle is dropped.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Arc<Collections>) + Send + Sync + 'static,
    {
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        self.shared.callbacks.write().push((id, Arc::new(callback)));
        Subscription {
            id,
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Returns a receiver for every future publish.
    pub fn watch(&self) -> Receiver<Arc<Collections>> {
        let (tx, rx) = mpsc::channel();
        self.shared.channels.write().push(tx);
        rx
    }

    /// Replaces the current collections and notifies everyone.
    pub(crate) fn publish(&self, collections: Collections) {
        let collections = Arc::new(collections);
        *self.shared.current.write() = Arc::clone(&collections);
        self.notify(&collections);
    }

    /// Notifies everyone with the current collections again.
    pub(crate) fn republish(&self) {
        self.notify(&self.current());
    }

    fn notify(&self, collections: &Arc<Collections>) {
        // Snapshot the list so callbacks may subscribe or cancel.
        let callbacks: Vec<Callback> = self
            .shared
            .callbacks
            .read()
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();
        for callback in callbacks {
            callback(collections);
        }

        self.shared
            .channels
            .write()
            .retain(|tx| tx.send(Arc::clone(collections)).is_ok());
    }

    /// Number of live callbacks and channels.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.shared.callbacks.read().len() + self.shared.channels.read().len()
    }
}

impl Default for CollectionFeed {
    fn default() -> Self {
        Self::new(Collections::default())
    }
}

impl std::fmt::Debug for CollectionFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionFeed")
            .field("sequence", &self.current().sequence)
            .field("observers", &self.observer_count())
            .finish()
    }
}

/// Handle for a registered callback. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    shared: Weak<Shared>,
}

impl Subscription {
    /// Unsubscribes now.
    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.callbacks.write().retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use parking_lot::Mutex;
    use std::time::Duration;

    fn collections(seq: u64) -> Collections {
        Collections {
            sequence: SequenceNumber::new(seq),
            properties: vec![Property::new("P", "", Utc::now())],
            records: Vec::new(),
        }
    }

    #[test]
    fn callbacks_see_every_publish_in_order() {
        let feed = CollectionFeed::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = feed.subscribe(move |c| sink.lock().push(c.sequence.as_u64()));

        feed.publish(collections(1));
        feed.publish(collections(2));
        assert_eq!(*seen.lock(), vec![1, 2]);
        assert_eq!(feed.current().sequence, SequenceNumber::new(2));
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let feed = CollectionFeed::default();
        let count = Arc::new(AtomicU64::new(0));
        let sink = Arc::clone(&count);
        let sub = feed.subscribe(move |_| {
            sink.fetch_add(1, Ordering::SeqCst);
        });
        feed.publish(collections(1));
        sub.cancel();
        feed.publish(collections(2));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(feed.observer_count(), 0);
    }

    #[test]
    fn watch_receives_full_collections() {
        let feed = CollectionFeed::default();
        let rx = feed.watch();
        feed.publish(collections(3));
        let got = rx.recv_timeout(Duration::from_millis(100)).unwrap();
        assert_eq!(got.sequence, SequenceNumber::new(3));
        assert_eq!(got.properties.len(), 1);
    }

    #[test]
    fn republish_sends_the_same_snapshot() {
        let feed = CollectionFeed::default();
        feed.publish(collections(4));
        let rx = feed.watch();
        feed.republish();
        let got = rx.try_recv().unwrap();
        assert!(Arc::ptr_eq(&got, &feed.current()));
        assert_eq!(got.sequence, SequenceNumber::new(4));
    }

    #[test]
    fn dead_receivers_are_pruned() {
        let feed = CollectionFeed::default();
        let rx = feed.watch();
        assert_eq!(feed.observer_count(), 1);
        drop(rx);
        feed.publish(collections(1));
        assert_eq!(feed.observer_count(), 0);
    }

    #[test]
    fn callback_may_subscribe_during_publish() {
        let feed = CollectionFeed::default();
        let inner_feed = feed.clone();
        let extra = Arc::new(Mutex::new(Vec::new()));
        let holder = Arc::clone(&extra);
        let _sub = feed.subscribe(move |_| {
            holder.lock().push(inner_feed.subscribe(|_| {}));
        });
        feed.publish(collections(1));
        assert_eq!(extra.lock().len(), 1);
    }
}
