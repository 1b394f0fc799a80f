//! Counting semaphore bounding in-flight requests of one API family
//!
//! Backed by `tokio::sync::Semaphore`, which queues waiters fairly: a freed
//! slot goes to the earliest waiter, so sustained load cannot starve anyone.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Admission control for one category of upstream operations
#[derive(Debug)]
pub struct ConcurrencyGate {
    name: &'static str,
    capacity: usize,
    semaphore: Arc<Semaphore>,
    held: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

/// A held slot; dropping it releases the slot to the next waiter
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
    held: Arc<AtomicUsize>,
}

impl GatePermit {
    /// Release explicitly (same as dropping)
    pub fn release(self) {}
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        self.held.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ConcurrencyGate {
    pub fn new(name: &'static str, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            name,
            capacity,
            semaphore: Arc::new(Semaphore::new(capacity)),
            held: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Wait (FIFO) until a slot is free and take it
    pub async fn acquire(&self) -> GatePermit {
        let permit = match Arc::clone(&self.semaphore).acquire_owned().await {
            Ok(p) => p,
            // The semaphore is owned here and never closed
            Err(_) => unreachable!("gate {} semaphore closed", self.name),
        };
        let now = self.held.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        GatePermit {
            _permit: permit,
            held: Arc::clone(&self.held),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently held
    pub fn in_flight(&self) -> usize {
        self.held.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously held slots since creation
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_zero_capacity_is_raised_to_one() {
        let gate = ConcurrencyGate::new("test", 0);
        assert_eq!(gate.capacity(), 1);
        let permit = gate.acquire().await;
        assert_eq!(gate.in_flight(), 1);
        permit.release();
        assert_eq!(gate.in_flight(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_peak_never_exceeds_capacity() {
        let gate = Arc::new(ConcurrencyGate::new("test", 3));
        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..40 {
            let gate = Arc::clone(&gate);
            tasks.spawn(async move {
                let _permit = gate.acquire().await;
                tokio::time::sleep(Duration::from_millis(2)).await;
            });
        }
        while tasks.join_next().await.is_some() {}

        assert!(gate.peak_in_flight() <= 3);
        assert!(gate.peak_in_flight() >= 1);
        assert_eq!(gate.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_waiters_are_served_in_order() {
        let gate = Arc::new(ConcurrencyGate::new("test", 1));
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let first = gate.acquire().await;

        let mut handles = Vec::new();
        for i in 0..5 {
            let gate = Arc::clone(&gate);
            let order = Arc::clone(&order);
            handles.push(tokio::spawn(async move {
                let _permit = gate.acquire().await;
                order.lock().unwrap().push(i);
            }));
            // Let each waiter enqueue before the next one is spawned
            tokio::task::yield_now().await;
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        drop(first);
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }
}
