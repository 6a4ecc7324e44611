//! Single-slot overwrite mailbox between the frame producer and the worker.
//!
//! The producer never waits on analysis: `put` swaps the slot contents under a
//! short lock. The worker blocks in `take` until a value arrives or the
//! mailbox closes.

use std::{
    sync::{Condvar, Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

/// What happened to a value handed to [`Mailbox::put`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Deposit {
    /// The slot was empty.
    Stored,
    /// A value that had not started yet was overwritten.
    Replaced,
    /// The consumer is gone; the value was dropped.
    Closed,
}

struct Slot<T> {
    pending: Option<T>,
    busy: bool,
    closed: bool,
}

pub(crate) struct Mailbox<T> {
    slot: Mutex<Slot<T>>,
    changed: Condvar,
}

impl<T> Mailbox<T> {
    pub(crate) fn new() -> Self {
        Self {
            slot: Mutex::new(Slot {
                pending: None,
                busy: false,
                closed: false,
            }),
            changed: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store `value`, dropping whatever was waiting.
    ///
    /// After `close` the value is dropped instead of stored.
    pub(crate) fn put(&self, value: T) -> Deposit {
        let (dropped, deposit) = {
            let mut slot = self.lock();
            if slot.closed {
                (Some(value), Deposit::Closed)
            } else {
                match slot.pending.replace(value) {
                    Some(old) => (Some(old), Deposit::Replaced),
                    None => (None, Deposit::Stored),
                }
            }
        };
        if deposit != Deposit::Closed {
            self.changed.notify_all();
        }
        // Dropped outside the lock.
        drop(dropped);
        deposit
    }

    /// Block until a value is available and mark the consumer busy.
    ///
    /// Returns `None` once the mailbox is closed.
    pub(crate) fn take(&self) -> Option<T> {
        let mut slot = self.lock();
        loop {
            if slot.closed {
                return None;
            }
            if let Some(value) = slot.pending.take() {
                slot.busy = true;
                return Some(value);
            }
            slot = self
                .changed
                .wait(slot)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Mark the value returned by the last `take` as finished.
    pub(crate) fn finish(&self) {
        self.lock().busy = false;
        self.changed.notify_all();
    }

    pub(crate) fn close(&self) {
        let dropped = {
            let mut slot = self.lock();
            slot.closed = true;
            slot.pending.take()
        };
        drop(dropped);
        self.changed.notify_all();
    }

    pub(crate) fn has_pending(&self) -> bool {
        self.lock().pending.is_some()
    }

    #[cfg(test)]
    pub(crate) fn is_busy(&self) -> bool {
        self.lock().busy
    }

    /// Wait until nothing is pending or in progress, up to `timeout`.
    pub(crate) fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut slot = self.lock();
        while slot.pending.is_some() || slot.busy {
            if slot.closed {
                return false;
            }
            let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                return false;
            };
            slot = self
                .changed
                .wait_timeout(slot, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::*;

    #[test]
    fn put_overwrites_the_pending_value() {
        let mailbox = Mailbox::new();
        assert_eq!(mailbox.put(1), Deposit::Stored);
        assert_eq!(mailbox.put(2), Deposit::Replaced);
        assert_eq!(mailbox.put(3), Deposit::Replaced);

        assert_eq!(mailbox.take(), Some(3));
        assert!(mailbox.is_busy());
        assert!(!mailbox.has_pending());
        mailbox.finish();
        assert!(!mailbox.is_busy());
    }

    #[test]
    fn take_blocks_until_put_and_returns_none_after_close() {
        let mailbox = Arc::new(Mailbox::new());
        let consumer = {
            let mailbox = mailbox.clone();
            thread::spawn(move || {
                let first = mailbox.take();
                mailbox.finish();
                let second = mailbox.take();
                (first, second)
            })
        };

        mailbox.put("frame");
        assert!(mailbox.wait_idle(Duration::from_secs(5)));
        mailbox.close();

        let (first, second) = consumer.join().expect("consumer thread");
        assert_eq!(first, Some("frame"));
        assert_eq!(second, None);
    }

    #[test]
    fn put_after_close_drops_the_value() {
        let mailbox = Mailbox::new();
        mailbox.close();
        assert_eq!(mailbox.put(1), Deposit::Closed);
        assert!(!mailbox.has_pending());
        assert_eq!(mailbox.take(), None);
    }

    #[test]
    fn wait_idle_times_out_while_busy() {
        let mailbox = Mailbox::new();
        mailbox.put(7);
        let _ = mailbox.take();
        assert!(!mailbox.wait_idle(Duration::from_millis(20)));
    }
}
