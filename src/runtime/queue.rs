//! Unbounded FIFO feeding a blocking rendezvous channel.
//!
//! `push` only appends to the backlog. A single drain thread is started on demand, hands items
//! to the consumer one at a time and exits as soon as the backlog is empty; the next `push`
//! starts a new one.

use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TryRecvError};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

struct State<T> {
    backlog: VecDeque<T>,
    draining: bool,
    closed: bool,
    sender: Option<SyncSender<T>>,
}

fn lock<S>(mutex: &Mutex<S>) -> MutexGuard<'_, S> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Handles share the backlog and the receiver. The drain thread holds only the backlog, so
/// dropping the last handle drops the receiver and ends a blocked `send`.
pub struct Queue<T> {
    state: Arc<Mutex<State<T>>>,
    receiver: Arc<Mutex<Receiver<T>>>,
}

impl<T> std::fmt::Debug for Queue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("Queue")
            .field("backlog", &state.backlog.len())
            .field("draining", &state.draining)
            .field("closed", &state.closed)
            .finish()
    }
}

impl<T> Clone for Queue<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            receiver: Arc::clone(&self.receiver),
        }
    }
}

impl<T: Send + 'static> Default for Queue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> Queue<T> {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::sync_channel(0);
        Self {
            state: Arc::new(Mutex::new(State {
                backlog: VecDeque::new(),
                draining: false,
                closed: false,
                sender: Some(sender),
            })),
            receiver: Arc::new(Mutex::new(receiver)),
        }
    }

    /// Append an item. Never blocks; items pushed after [`Queue::close`] are dropped.
    pub fn push(&self, item: T) {
        let mut state = lock(&self.state);
        if state.closed {
            return;
        }
        state.backlog.push_back(item);
        if state.draining {
            return;
        }
        let Some(sender) = state.sender.clone() else {
            return;
        };
        state.draining = true;
        drop(state);

        let shared = Arc::clone(&self.state);
        let spawned = thread::Builder::new()
            .name("tape-vt-queue".to_string())
            .spawn(move || drain(shared, sender));
        if let Err(err) = spawned {
            tracing::warn!(error = %err, "failed to start queue drain thread");
            lock(&self.state).draining = false;
        }
    }

    /// Block until an item arrives. `None` once the queue is closed and drained.
    pub fn pop(&self) -> Option<T> {
        lock(&self.receiver).recv().ok()
    }

    pub fn pop_timeout(&self, timeout: Duration) -> Result<T, RecvTimeoutError> {
        lock(&self.receiver).recv_timeout(timeout)
    }

    /// Take an item the drain thread is currently offering, without blocking.
    pub fn try_pop(&self) -> Option<T> {
        match lock(&self.receiver).try_recv() {
            Ok(item) => Some(item),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Stop accepting items. Items already queued are still delivered; after the last one,
    /// consumers see `None`.
    pub fn close(&self) {
        let mut state = lock(&self.state);
        state.closed = true;
        state.sender = None;
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.state).closed
    }

    /// Items waiting behind the one currently offered to the consumer.
    pub fn backlog_len(&self) -> usize {
        lock(&self.state).backlog.len()
    }
}

fn drain<T>(state: Arc<Mutex<State<T>>>, sender: SyncSender<T>) {
    loop {
        let item = {
            let mut state = lock(&state);
            match state.backlog.pop_front() {
                Some(item) => item,
                None => {
                    state.draining = false;
                    return;
                }
            }
        };
        // Fails once every handle, and with them the receiver, is gone.
        if sender.send(item).is_err() {
            let mut state = lock(&state);
            state.draining = false;
            state.backlog.clear();
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Queue;
    use std::sync::mpsc::RecvTimeoutError;
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    #[test]
    fn sequential_pushes_are_fifo() {
        let queue = Queue::new();
        for i in 0..100 {
            queue.push(i);
        }
        let drained: Vec<i32> = (0..100).filter_map(|_| queue.pop()).collect();
        assert_eq!(drained, (0..100).collect::<Vec<_>>());
        assert_eq!(queue.backlog_len(), 0);
    }

    #[test]
    fn pop_timeout_on_empty_queue() {
        let queue: Queue<u8> = Queue::new();
        assert_eq!(
            queue.pop_timeout(Duration::from_millis(20)),
            Err(RecvTimeoutError::Timeout)
        );
    }

    #[test]
    fn try_pop_never_blocks() {
        let queue: Queue<u8> = Queue::new();
        assert_eq!(queue.try_pop(), None);
    }

    #[test]
    fn drain_worker_restarts_after_idle() {
        let queue = Queue::new();
        queue.push("first");
        assert_eq!(queue.pop(), Some("first"));
        thread::sleep(Duration::from_millis(20));
        queue.push("second");
        assert_eq!(queue.pop(), Some("second"));
    }

    #[test]
    fn dropping_every_handle_mid_burst_stops_the_drain_thread() {
        let token = Arc::new(());
        let queue = Queue::new();
        for _ in 0..16 {
            queue.push(Arc::clone(&token));
        }
        assert!(queue.pop().is_some());
        drop(queue);

        let deadline = Instant::now() + Duration::from_secs(5);
        while Arc::strong_count(&token) > 1 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(Arc::strong_count(&token), 1);
    }

    #[test]
    fn close_delivers_backlog_first() {
        let queue = Queue::new();
        queue.push(1);
        queue.push(2);
        queue.close();
        queue.push(3);
        assert_eq!(queue.pop(), Some(1));
        assert_eq!(queue.pop(), Some(2));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn close_wakes_consumer_and_drops_pushes() {
        let queue: Queue<u8> = Queue::new();
        let consumer = {
            let queue = queue.clone();
            thread::spawn(move || queue.pop())
        };
        thread::sleep(Duration::from_millis(20));
        queue.close();
        assert_eq!(consumer.join().unwrap(), None);
        queue.push(1);
        assert!(queue.is_closed());
        assert_eq!(queue.pop_timeout(Duration::from_millis(20)), Err(RecvTimeoutError::Disconnected));
    }
}
