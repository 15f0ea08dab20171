//! Spin guard shared by the state store and the command queue.
//!
//! A plain atomic-flag spinlock: acquisition busy-waits instead of parking
//! the caller in a scheduler queue, which makes it usable uniformly from
//! task context and from interrupt-style contexts where blocking primitives
//! would deadlock the scheduler. The cost is wasted cycles under contention;
//! acceptable because every critical section in this crate is O(one
//! instance) of work.
//!
//! The guard is NOT reentrant. Acquiring twice from the same execution
//! context without releasing spins forever. It must never be held across a
//! call that may itself block.

use core::hint;
use core::sync::atomic::{AtomicBool, Ordering};
use std::thread;

/// How to relax the CPU between failed acquisition attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum YieldPolicy {
    /// Task context: yield the processor to the scheduler on each miss.
    #[default]
    Task,
    /// Interrupt context: never call into the scheduler, only emit a
    /// spin-loop hint and retry.
    Interrupt,
}

/// Non-reentrant atomic-flag spinlock.
///
/// Release-store on unlock and acquire-ordering on lock give the next
/// acquirer read-after-write visibility of everything written inside the
/// previous critical section.
#[derive(Debug)]
pub struct SpinGuard {
    flag: AtomicBool,
}

impl SpinGuard {
    /// Create an unlocked guard.
    pub const fn new() -> Self {
        Self {
            flag: AtomicBool::new(false),
        }
    }

    /// Acquire the guard, spinning until it is free.
    pub fn acquire(&self, policy: YieldPolicy) {
        while self
            .flag
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            match policy {
                YieldPolicy::Task => thread::yield_now(),
                YieldPolicy::Interrupt => hint::spin_loop(),
            }
        }
    }

    /// Try to acquire the guard without spinning. Returns `true` on success.
    pub fn try_acquire(&self) -> bool {
        self.flag
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// Release the guard. Caller must currently hold it.
    pub fn release(&self) {
        self.flag.store(false, Ordering::Release);
    }

    /// Current lock state. Advisory only, stale the moment it returns.
    pub fn is_locked(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

impl Default for SpinGuard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn acquire_release_cycle() {
        let guard = SpinGuard::new();
        assert!(!guard.is_locked());

        guard.acquire(YieldPolicy::Task);
        assert!(guard.is_locked());

        guard.release();
        assert!(!guard.is_locked());
    }

    #[test]
    fn try_acquire_fails_while_held() {
        let guard = SpinGuard::new();
        assert!(guard.try_acquire());
        assert!(!guard.try_acquire());
        guard.release();
        assert!(guard.try_acquire());
        guard.release();
    }

    #[test]
    fn contended_counter_stays_exact() {
        const THREADS: usize = 8;
        const INCREMENTS: usize = 10_000;

        struct Shared(std::cell::UnsafeCell<u64>);
        unsafe impl Sync for Shared {}

        let guard = Arc::new(SpinGuard::new());
        let shared = Arc::new(Shared(std::cell::UnsafeCell::new(0u64)));

        let mut handles = Vec::new();
        for i in 0..THREADS {
            let guard = guard.clone();
            let shared = shared.clone();
            // Alternate policies so both relax paths see contention.
            let policy = if i % 2 == 0 {
                YieldPolicy::Task
            } else {
                YieldPolicy::Interrupt
            };
            handles.push(std::thread::spawn(move || {
                for _ in 0..INCREMENTS {
                    guard.acquire(policy);
                    unsafe { *shared.0.get() += 1 };
                    guard.release();
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        guard.acquire(YieldPolicy::Task);
        let total = unsafe { *shared.0.get() };
        guard.release();
        assert_eq!(total, (THREADS * INCREMENTS) as u64);
    }
}
