//! Bounded blocking queue with two-band hysteresis.
//!
//! [`HysteresisQueue`] connects pipeline stages. It is the only
//! synchronization point between them: producers block while the queue is
//! full, consumers block while it is empty, and the queue closes once the
//! last registered producer unregisters.
//!
//! # Hysteresis
//!
//! Waking a thread for every item is expensive when many workers hammer the
//! same queue. Instead, a consumer that finds the queue empty latches the
//! "consumers starved" flag; subsequent pushes buffer silently until the
//! occupancy reaches `ceil((1 - watermark) * capacity)`, and only then are
//! all waiting consumers woken at once. Symmetrically, a producer that finds
//! the queue full latches "producers stalled", and waiting producers are
//! woken together once occupancy drops to `floor(watermark * capacity)`.
//! While neither flag is set, every push and pop wakes exactly one waiter.
//!
//! # Example
//!
//! ```
//! use blocksig::HysteresisQueue;
//!
//! let queue = HysteresisQueue::new(4, 0.25);
//! queue.register_producer();
//! queue.push(1);
//! queue.push(2);
//! queue.unregister_producer();
//!
//! assert!(queue.is_closed());
//! assert_eq!(queue.pop(), Some(1));
//! assert_eq!(queue.pop(), Some(2));
//! assert_eq!(queue.pop(), None);
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{Condvar, Mutex};

use crate::config::DEFAULT_WATERMARK;

/// A capacity-bounded, multi-producer multi-consumer blocking queue.
///
/// Items are moved in and out; FIFO order is preserved per producer. A
/// capacity of 0 means unbounded: `push` never blocks.
///
/// Producers must call [`register_producer`](Self::register_producer) before
/// their first push and [`unregister_producer`](Self::unregister_producer)
/// when done. Forgetting to unregister leaves consumers blocked forever.
pub struct HysteresisQueue<T> {
    state: Mutex<QueueState<T>>,
    producers: AtomicUsize,
    capacity: usize,
    low_mark: usize,
    high_mark: usize,
    /// Signalled on new items and on close.
    item_added: Condvar,
    item_removed: Condvar,
}

struct QueueState<T> {
    items: VecDeque<T>,
    closed: bool,
    consumers_starved: bool,
    producers_stalled: bool,
}

impl<T> HysteresisQueue<T> {
    /// Creates a queue holding at most `capacity` items.
    ///
    /// `watermark` is the fraction in (0, 1) defining both bands. Values
    /// outside [0, 1] are clamped into it and NaN falls back to
    /// [`DEFAULT_WATERMARK`], so both marks always lie within the capacity.
    pub fn new(capacity: usize, watermark: f32) -> Self {
        let (low_mark, high_mark) = marks(capacity, watermark);
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::with_capacity(capacity.min(4096)),
                closed: false,
                consumers_starved: false,
                producers_stalled: false,
            }),
            producers: AtomicUsize::new(0),
            capacity,
            low_mark,
            high_mark,
            item_added: Condvar::new(),
            item_removed: Condvar::new(),
        }
    }

    /// Announces a new producer.
    pub fn register_producer(&self) {
        self.producers.fetch_add(1, Ordering::AcqRel);
    }

    /// Withdraws a producer. The last one to leave closes the queue and wakes
    /// every blocked consumer.
    pub fn unregister_producer(&self) {
        let previous = self.producers.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "unregister without a registered producer");
        if previous == 1 {
            let mut state = self.state.lock();
            state.closed = true;
            drop(state);
            self.item_added.notify_all();
        }
    }

    /// Appends an item, blocking while the queue is full.
    pub fn push(&self, item: T) {
        debug_assert!(
            self.producers.load(Ordering::Acquire) > 0,
            "push on a queue without registered producers"
        );
        let mut state = self.state.lock();
        if self.capacity > 0 {
            while state.items.len() >= self.capacity {
                state.producers_stalled = true;
                self.item_removed.wait(&mut state);
            }
        }
        state.items.push_back(item);

        if state.consumers_starved {
            if state.items.len() >= self.high_mark {
                state.consumers_starved = false;
                self.item_added.notify_all();
            }
        } else {
            self.item_added.notify_one();
        }
    }

    /// Removes the oldest item, blocking while the queue is empty.
    ///
    /// Returns `None` once the queue is closed and drained (end of stream).
    pub fn pop(&self) -> Option<T> {
        let mut state = self.state.lock();
        while state.items.is_empty() {
            if state.closed {
                return None;
            }
            state.consumers_starved = true;
            self.item_added.wait(&mut state);
        }
        let item = state.items.pop_front();

        if state.producers_stalled {
            if state.items.len() <= self.low_mark {
                state.producers_stalled = false;
                self.item_removed.notify_all();
            }
        } else {
            self.item_removed.notify_one();
        }
        item
    }

    /// Returns the current occupancy.
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    /// Returns true if no items are buffered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true once every producer has unregistered.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Returns the declared capacity (0 = unbounded).
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of registered producers.
    pub fn producers(&self) -> usize {
        self.producers.load(Ordering::Acquire)
    }

    /// Returns true while consumers wait for the queue to refill.
    pub fn consumers_starved(&self) -> bool {
        self.state.lock().consumers_starved
    }

    /// Returns true while producers wait for the queue to drain.
    pub fn producers_stalled(&self) -> bool {
        self.state.lock().producers_stalled
    }
}

impl<T> fmt::Debug for HysteresisQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("HysteresisQueue")
            .field("len", &state.items.len())
            .field("capacity", &self.capacity)
            .field("producers", &self.producers.load(Ordering::Relaxed))
            .field("closed", &state.closed)
            .field("consumers_starved", &state.consumers_starved)
            .field("producers_stalled", &state.producers_stalled)
            .finish()
    }
}

/// Drain (low) and refill (high) thresholds.
fn marks(capacity: usize, watermark: f32) -> (usize, usize) {
    let watermark = if watermark.is_nan() {
        DEFAULT_WATERMARK
    } else {
        watermark.clamp(0.0, 1.0)
    };
    let capacity = capacity as f64;
    let watermark = f64::from(watermark);
    let low = (watermark * capacity).floor() as usize;
    let high = ((1.0 - watermark) * capacity).ceil() as usize;
    (low, high)
}
