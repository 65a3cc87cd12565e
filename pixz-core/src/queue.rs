//! Tagged FIFO queue (C2).
//!
//! A `crossbeam-channel` unbounded channel serves the original's single
//! mutex + condition variable queue: `push` maps to `send`, blocking `pop`
//! maps to `recv`. The channel is unbounded because backpressure already
//! comes from the finite [`crate::pool::Pool`] — there can never be more
//! in-flight items than the pool has, so an unbounded channel never grows
//! past that bound in practice.

use crossbeam_channel::{Receiver, Sender};

/// A message carried on a [`Queue`]: either a real payload, or the STOP
/// sentinel that propagates shutdown to one consumer.
pub enum Message<T> {
    /// A live payload.
    Data(T),
    /// Sentinel: this consumer should stop popping and exit.
    Stop,
}

/// Thread-safe FIFO queue of tagged messages.
pub struct Queue<T> {
    tx: Sender<Message<T>>,
    rx: Receiver<Message<T>>,
}

impl<T> Queue<T> {
    /// Creates a new, empty queue.
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self { tx, rx }
    }

    /// Returns a handle producers can use to push without sharing `&Queue`.
    #[must_use]
    pub fn sender(&self) -> QueueSender<T> {
        QueueSender {
            tx: self.tx.clone(),
        }
    }

    /// Returns a handle consumers can use to pop without sharing `&Queue`.
    #[must_use]
    pub fn receiver(&self) -> QueueReceiver<T> {
        QueueReceiver {
            rx: self.rx.clone(),
        }
    }

    /// Pushes a payload onto the queue. Never blocks (unbounded channel).
    pub fn push(&self, payload: T) {
        // An unbounded sender only errs when every receiver has been
        // dropped, which never happens while `self` is alive.
        let _ = self.tx.send(Message::Data(payload));
    }

    /// Pushes a STOP sentinel onto the queue.
    pub fn push_stop(&self) {
        let _ = self.tx.send(Message::Stop);
    }

    /// Blocks until a message is available and returns it, or `None` if
    /// every sender has been dropped and the queue is permanently empty.
    pub fn pop(&self) -> Option<Message<T>> {
        self.rx.recv().ok()
    }
}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A cloneable producer handle for a [`Queue`].
#[derive(Clone)]
pub struct QueueSender<T> {
    tx: Sender<Message<T>>,
}

impl<T> QueueSender<T> {
    /// Pushes a payload onto the queue.
    pub fn push(&self, payload: T) {
        let _ = self.tx.send(Message::Data(payload));
    }

    /// Pushes a STOP sentinel onto the queue.
    pub fn push_stop(&self) {
        let _ = self.tx.send(Message::Stop);
    }
}

/// A cloneable consumer handle for a [`Queue`].
#[derive(Clone)]
pub struct QueueReceiver<T> {
    rx: Receiver<Message<T>>,
}

impl<T> QueueReceiver<T> {
    /// Blocks until a message is available.
    pub fn pop(&self) -> Option<Message<T>> {
        self.rx.recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_then_pop_preserves_fifo_order() {
        let queue: Queue<u32> = Queue::new();
        queue.push(1);
        queue.push(2);
        queue.push(3);

        assert!(matches!(queue.pop(), Some(Message::Data(1))));
        assert!(matches!(queue.pop(), Some(Message::Data(2))));
        assert!(matches!(queue.pop(), Some(Message::Data(3))));
    }

    #[test]
    fn stop_sentinel_is_delivered() {
        let queue: Queue<u32> = Queue::new();
        queue.push(1);
        queue.push_stop();

        assert!(matches!(queue.pop(), Some(Message::Data(1))));
        assert!(matches!(queue.pop(), Some(Message::Stop)));
    }

    #[test]
    fn sender_and_receiver_handles_work_across_threads() {
        let queue: Queue<u32> = Queue::new();
        let sender = queue.sender();
        let handle = std::thread::spawn(move || {
            for i in 0..10 {
                sender.push(i);
            }
            sender.push_stop();
        });

        let receiver = queue.receiver();
        let mut seen = Vec::new();
        loop {
            match receiver.pop() {
                Some(Message::Data(v)) => seen.push(v),
                Some(Message::Stop) | None => break,
            }
        }
        handle.join().unwrap();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
    }
}
