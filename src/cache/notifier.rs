//! Removal Notifier Module
//!
//! Delivers removal notifications to the listener in the order the removals
//! happened, outside the cache lock, with listener failures contained.

use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::warn;

use crate::cache::{RemovalListener, RemovalNotification};
use crate::error::ListenerError;

/// Side channel receiving listener failures.
pub type ListenerErrorHandler = Box<dyn Fn(&ListenerError) + Send + Sync + 'static>;

// == Delivery Ticket ==
/// Position of the last notification queued by one mutation.
///
/// `None` means nothing was queued and there is nothing to wait for.
pub type Ticket = Option<u64>;

#[derive(Debug)]
struct Queue<K, V> {
    pending: VecDeque<RemovalNotification<K, V>>,
    /// Number of notifications ever queued
    queued: u64,
    /// Number of notifications ever delivered
    delivered: u64,
    /// Thread currently running the delivery loop
    drainer: Option<ThreadId>,
}

// == Notifier ==
/// Ordered, synchronous dispatcher for removal notifications.
///
/// Mutations [`enqueue`](Notifier::enqueue) while holding the cache lock, so
/// queue order is mutation order, then [`flush`](Notifier::flush) after
/// releasing it. One thread at a time drains the queue; other flushing
/// threads wait until their own notifications are delivered. A listener that
/// re-enters the cache does not wait on itself: its notifications are
/// delivered by the enclosing drain once it returns.
pub struct Notifier<K, V> {
    listener: Option<Box<dyn RemovalListener<K, V>>>,
    error_handler: Option<ListenerErrorHandler>,
    queue: Mutex<Queue<K, V>>,
    drained: Condvar,
}

impl<K: 'static, V: 'static> Notifier<K, V> {
    // == Constructor ==
    pub fn new(
        listener: Option<Box<dyn RemovalListener<K, V>>>,
        error_handler: Option<ListenerErrorHandler>,
    ) -> Self {
        Self {
            listener,
            error_handler,
            queue: Mutex::new(Queue {
                pending: VecDeque::new(),
                queued: 0,
                delivered: 0,
                drainer: None,
            }),
            drained: Condvar::new(),
        }
    }

    /// Returns true if a listener is registered.
    pub fn has_listener(&self) -> bool {
        self.listener.is_some()
    }

    // == Enqueue ==
    /// Queues notifications for delivery. Must be called under the cache lock.
    pub fn enqueue(&self, notifications: Vec<RemovalNotification<K, V>>) -> Ticket {
        if notifications.is_empty() || self.listener.is_none() {
            return None;
        }
        let mut queue = self.queue.lock();
        queue.queued += notifications.len() as u64;
        queue.pending.extend(notifications);
        Some(queue.queued)
    }

    // == Flush ==
    /// Returns once every notification up to `ticket` has been delivered,
    /// delivering them on this thread if no other thread is draining.
    pub fn flush(&self, ticket: Ticket) {
        let Some(ticket) = ticket else {
            return;
        };
        let Some(listener) = self.listener.as_deref() else {
            return;
        };
        let me = thread::current().id();
        let mut queue = self.queue.lock();

        loop {
            if queue.delivered >= ticket {
                return;
            }
            match queue.drainer {
                // Re-entered from the listener; the outer drain delivers these.
                Some(drainer) if drainer == me => return,
                Some(_) => self.drained.wait(&mut queue),
                None => {
                    queue.drainer = Some(me);
                    self.drain(listener, &mut queue);
                    queue.drainer = None;
                    self.drained.notify_all();
                }
            }
        }
    }

    fn drain(&self, listener: &dyn RemovalListener<K, V>, queue: &mut MutexGuard<'_, Queue<K, V>>) {
        while let Some(notification) = queue.pending.pop_front() {
            MutexGuard::unlocked(queue, || self.dispatch(listener, notification));
            queue.delivered += 1;
        }
    }

    // == Dispatch ==
    /// Invokes the listener once, containing errors and panics.
    fn dispatch(&self, listener: &dyn RemovalListener<K, V>, notification: RemovalNotification<K, V>) {
        let cause = notification.cause;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| listener.on_removal(notification)));
        let error = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(error)) => error,
            Err(payload) => ListenerError::Panicked(panic_message(payload.as_ref())),
        };

        warn!("Removal listener failed for {} removal: {}", cause, error);

        if let Some(handler) = &self.error_handler {
            if panic::catch_unwind(AssertUnwindSafe(|| handler(&error))).is_err() {
                warn!("Listener error handler panicked");
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{FnListener, RemovalCause};
    use std::sync::Arc;

    type Log = Arc<Mutex<Vec<(u32, RemovalCause)>>>;

    fn recording_notifier() -> (Notifier<u32, u32>, Log) {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let listener = FnListener(move |n: RemovalNotification<u32, u32>| {
            sink.lock().push((n.key, n.cause));
        });
        (Notifier::new(Some(Box::new(listener)), None), log)
    }

    fn notification(key: u32, cause: RemovalCause) -> RemovalNotification<u32, u32> {
        RemovalNotification::new(key, key * 10, cause)
    }

    struct FailingListener;

    impl RemovalListener<u32, u32> for FailingListener {
        fn on_removal(&self, _: RemovalNotification<u32, u32>) -> Result<(), ListenerError> {
            Err(ListenerError::Failed("sink unavailable".to_string()))
        }
    }

    #[test]
    fn test_enqueue_without_listener_is_noop() {
        let notifier: Notifier<u32, u32> = Notifier::new(None, None);

        let ticket = notifier.enqueue(vec![notification(1, RemovalCause::Size)]);

        assert_eq!(ticket, None);
        notifier.flush(ticket);
        assert!(!notifier.has_listener());
    }

    #[test]
    fn test_enqueue_empty_returns_no_ticket() {
        let (notifier, log) = recording_notifier();

        assert_eq!(notifier.enqueue(Vec::new()), None);
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_flush_delivers_in_order() {
        let (notifier, log) = recording_notifier();

        let first = notifier.enqueue(vec![notification(1, RemovalCause::Size)]);
        let second = notifier.enqueue(vec![
            notification(2, RemovalCause::Explicit),
            notification(3, RemovalCause::Replaced),
        ]);
        assert_eq!(first, Some(1));
        assert_eq!(second, Some(3));

        notifier.flush(second);

        assert_eq!(
            *log.lock(),
            vec![
                (1, RemovalCause::Size),
                (2, RemovalCause::Explicit),
                (3, RemovalCause::Replaced)
            ]
        );

        // Already delivered; flushing again does nothing
        notifier.flush(first);
        assert_eq!(log.lock().len(), 3);
    }

    #[test]
    fn test_listener_error_goes_to_handler() {
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&errors);
        let notifier: Notifier<u32, u32> = Notifier::new(
            Some(Box::new(FailingListener)),
            Some(Box::new(move |e: &ListenerError| sink.lock().push(e.clone()))),
        );

        let ticket = notifier.enqueue(vec![notification(1, RemovalCause::Size)]);
        notifier.flush(ticket);

        assert_eq!(
            *errors.lock(),
            vec![ListenerError::Failed("sink unavailable".to_string())]
        );
    }

    #[test]
    fn test_listener_panic_is_contained() {
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&errors);
        let listener = FnListener(|_: RemovalNotification<u32, u32>| panic!("listener exploded"));
        let notifier: Notifier<u32, u32> = Notifier::new(
            Some(Box::new(listener)),
            Some(Box::new(move |e: &ListenerError| sink.lock().push(e.clone()))),
        );

        let ticket = notifier.enqueue(vec![
            notification(1, RemovalCause::Size),
            notification(2, RemovalCause::Size),
        ]);
        notifier.flush(ticket);

        let errors = errors.lock();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0], ListenerError::Panicked("listener exploded".to_string()));
    }

    #[test]
    fn test_concurrent_flush_waits_for_delivery() {
        let (notifier, log) = recording_notifier();
        let notifier = Arc::new(notifier);

        let handles: Vec<_> = (0..8u32)
            .map(|i| {
                let notifier = Arc::clone(&notifier);
                let log = Arc::clone(&log);
                std::thread::spawn(move || {
                    let ticket = notifier.enqueue(vec![notification(i, RemovalCause::Explicit)]);
                    notifier.flush(ticket);
                    // Own notification is delivered by the time flush returns
                    assert!(log.lock().iter().any(|(k, _)| *k == i));
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let mut keys: Vec<u32> = log.lock().iter().map(|(k, _)| *k).collect();
        keys.sort_unstable();
        assert_eq!(keys, (0..8).collect::<Vec<_>>());
    }
}
