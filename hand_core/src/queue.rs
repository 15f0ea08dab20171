//! Bounded FIFO command queue.
//!
//! Written by the network-ingress side, drained by the control loop.
//! Backed by a fixed-capacity `heapless::Deque` so steady-state operation
//! never allocates; when the queue is full, `push` reports
//! [`QueueError::Exhausted`] and the caller decides whether to drop or
//! retry. Push and pop are serialized internally by a [`SpinGuard`], so any
//! number of producers may push concurrently; each producer's own pushes
//! keep their relative order.

use core::cell::UnsafeCell;
use static_assertions::const_assert;
use thiserror::Error;

use hand::command::Command;

use crate::guard::{SpinGuard, YieldPolicy};

/// Compile-time queue depth.
///
/// Chosen bound policy: the queue never grows. At a 20 ms control cadence
/// even a 64-deep backlog is over a second of buffered commands; anything
/// deeper means the consumer is gone, and fresh commands are more useful
/// than stale ones.
pub const COMMAND_QUEUE_DEPTH: usize = 64;

const_assert!(COMMAND_QUEUE_DEPTH > 0);

/// Queue operation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    /// `pop` on an empty queue. Check `len()` first or treat as a checked
    /// precondition violation.
    #[error("command queue is empty")]
    Empty,

    /// `push` on a full queue; the command was not enqueued.
    #[error("command queue exhausted (depth {COMMAND_QUEUE_DEPTH})")]
    Exhausted,
}

/// FIFO queue of actuator commands.
///
/// Dequeue order equals enqueue order; `pop` transfers ownership of the
/// command to the caller.
#[derive(Debug)]
pub struct CommandQueue {
    guard: SpinGuard,
    inner: UnsafeCell<heapless::Deque<Command, COMMAND_QUEUE_DEPTH>>,
}

// SAFETY: `inner` is only touched while `guard` is held; every method below
// brackets its access with acquire/release.
unsafe impl Sync for CommandQueue {}

impl CommandQueue {
    /// Create an empty queue.
    pub const fn new() -> Self {
        Self {
            guard: SpinGuard::new(),
            inner: UnsafeCell::new(heapless::Deque::new()),
        }
    }

    /// Append a command at the tail.
    ///
    /// # Errors
    ///
    /// [`QueueError::Exhausted`] when the queue is full; the command is
    /// returned to the caller implicitly by not being enqueued.
    pub fn push(&self, command: Command) -> Result<(), QueueError> {
        self.guard.acquire(YieldPolicy::Task);
        // SAFETY: guard held.
        let inner = unsafe { &mut *self.inner.get() };
        let result = inner.push_back(command).map_err(|_| QueueError::Exhausted);
        self.guard.release();
        result
    }

    /// Remove and return the head command.
    ///
    /// # Errors
    ///
    /// [`QueueError::Empty`] when there is nothing to pop.
    pub fn pop(&self) -> Result<Command, QueueError> {
        self.guard.acquire(YieldPolicy::Task);
        // SAFETY: guard held.
        let inner = unsafe { &mut *self.inner.get() };
        let result = inner.pop_front().ok_or(QueueError::Empty);
        self.guard.release();
        result
    }

    /// Current queue length.
    pub fn len(&self) -> usize {
        self.guard.acquire(YieldPolicy::Task);
        // SAFETY: guard held.
        let len = unsafe { &*self.inner.get() }.len();
        self.guard.release();
        len
    }

    /// True when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fixed capacity of the queue.
    pub const fn capacity(&self) -> usize {
        COMMAND_QUEUE_DEPTH
    }
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hand::command::{GoToAngle, HoldGesture, Lock};

    fn angle_cmd(servo: u8, angle_deg: u16) -> Command {
        Command::GoToAngle(GoToAngle { servo, angle_deg })
    }

    #[test]
    fn pop_on_fresh_queue_is_empty_error() {
        let queue = CommandQueue::new();
        assert_eq!(queue.pop(), Err(QueueError::Empty));
    }

    #[test]
    fn fifo_order_preserved() {
        let queue = CommandQueue::new();
        for i in 0..5 {
            queue.push(angle_cmd(i, u16::from(i) * 10)).unwrap();
        }
        assert_eq!(queue.len(), 5);

        for i in 0..5 {
            let cmd = queue.pop().unwrap();
            assert_eq!(cmd, angle_cmd(i, u16::from(i) * 10));
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn push_on_full_queue_is_exhausted() {
        let queue = CommandQueue::new();
        for _ in 0..COMMAND_QUEUE_DEPTH {
            queue.push(Command::Lock(Lock { servo: 0 })).unwrap();
        }
        assert_eq!(
            queue.push(Command::Lock(Lock { servo: 0 })),
            Err(QueueError::Exhausted)
        );
        // A pop makes room again.
        queue.pop().unwrap();
        queue.push(Command::Lock(Lock { servo: 0 })).unwrap();
    }

    #[test]
    fn variant_survives_queue_transit() {
        let queue = CommandQueue::new();
        let cmd = Command::HoldGesture(HoldGesture {
            gesture: 4,
            hold_ms: 1500,
        });
        queue.push(cmd).unwrap();

        let popped = queue.pop().unwrap();
        assert_eq!(popped.kind(), cmd.kind());
        assert_eq!(popped, cmd);
    }

    #[test]
    fn concurrent_producers_each_keep_internal_order() {
        use std::sync::Arc;

        let queue = Arc::new(CommandQueue::new());
        let mut handles = Vec::new();
        // 4 producers * 10 commands fits the depth with room to spare.
        for producer in 0..4u8 {
            let queue = queue.clone();
            handles.push(std::thread::spawn(move || {
                for seq in 0..10u16 {
                    queue.push(angle_cmd(producer, seq)).unwrap();
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        // Interleaving across producers is unspecified; per-producer
        // sequence numbers must still come out ascending.
        let mut last_seq = [None::<u16>; 4];
        while let Ok(cmd) = queue.pop() {
            let payload = cmd.as_go_to_angle().unwrap();
            let slot = &mut last_seq[payload.servo as usize];
            if let Some(prev) = *slot {
                assert!(payload.angle_deg > prev);
            }
            *slot = Some(payload.angle_deg);
        }
        assert_eq!(last_seq, [Some(9); 4]);
    }
}
