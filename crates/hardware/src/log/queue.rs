//! In-memory log sink.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use super::Log;
use super::message::Message;

/// Log sink that stores messages in arrival order.
///
/// Intended for test harnesses: a test installs a `QueueLog` on a component,
/// drives it, then pops the messages and asserts on them.
#[derive(Debug, Default)]
pub struct QueueLog {
    queue: Mutex<VecDeque<Message>>,
}

impl QueueLog {
    /// Creates an empty queue sink.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Message>> {
        // A writer panicking mid-push leaves the deque itself consistent.
        self.queue.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Returns `true` when no message is queued.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Returns the number of queued messages.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Removes and returns the oldest message.
    pub fn pop(&self) -> Option<Message> {
        self.lock().pop_front()
    }

    /// Removes and returns every queued message, oldest first.
    pub fn drain(&self) -> Vec<Message> {
        self.lock().drain(..).collect()
    }

    /// Drops every queued message.
    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl Log for QueueLog {
    fn out(&self, message: Message) {
        self.lock().push_back(message);
    }
}
