//! Admission control for model invocations.
//!
//! A fixed pool of permits bounds how many predictions run at once. Callers
//! wait at most `max_wait` for a permit and are turned away otherwise, so a
//! burst turns into fast fallbacks instead of an ever-growing queue.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{trace, warn};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("no prediction slot became free within {waited_ms}ms")]
pub struct GateTimeout {
    pub waited_ms: u64,
}

pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    max_wait: Duration,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    timeouts: AtomicU64,
}

/// One admission slot. The permit goes back to the pool when the token is
/// dropped, on every path including unwinding.
pub struct AdmissionToken {
    _permit: OwnedSemaphorePermit,
    in_flight: Arc<AtomicUsize>,
}

impl AdmissionToken {
    /// Return the slot now rather than at end of scope
    pub fn release(self) {}
}

impl Drop for AdmissionToken {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        trace!("Admission token released");
    }
}

/// Gate statistics
#[derive(Debug, Clone, Serialize)]
pub struct GateStats {
    pub capacity: usize,
    pub available_permits: usize,
    pub in_flight: usize,
    pub peak_in_flight: usize,
    pub timeouts: u64,
}

impl ConcurrencyGate {
    pub fn new(capacity: usize, max_wait: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            max_wait,
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
            timeouts: AtomicU64::new(0),
        }
    }

    /// Wait up to the configured bound for a slot
    pub async fn try_acquire(&self) -> Result<AdmissionToken, GateTimeout> {
        self.try_acquire_within(self.max_wait).await
    }

    pub async fn try_acquire_within(&self, max_wait: Duration) -> Result<AdmissionToken, GateTimeout> {
        let acquire = Arc::clone(&self.semaphore).acquire_owned();
        let permit = match tokio::time::timeout(max_wait, acquire).await {
            Ok(Ok(permit)) => permit,
            // The semaphore is never closed; treat it like exhaustion if it ever is
            Ok(Err(_)) | Err(_) => {
                self.timeouts.fetch_add(1, Ordering::Relaxed);
                warn!("Prediction gate saturated after waiting {:?}", max_wait);
                return Err(GateTimeout {
                    waited_ms: max_wait.as_millis() as u64,
                });
            }
        };

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        Ok(AdmissionToken {
            _permit: permit,
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn max_wait(&self) -> Duration {
        self.max_wait
    }

    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Tokens currently held
    pub fn outstanding(&self) -> usize {
        self.capacity - self.available_permits()
    }

    pub fn stats(&self) -> GateStats {
        GateStats {
            capacity: self.capacity,
            available_permits: self.available_permits(),
            in_flight: self.in_flight.load(Ordering::SeqCst),
            peak_in_flight: self.peak.load(Ordering::SeqCst),
            timeouts: self.timeouts.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_acquire_and_release() {
        let gate = ConcurrencyGate::new(2, Duration::from_millis(50));
        let a = gate.try_acquire().await.unwrap();
        let b = gate.try_acquire().await.unwrap();
        assert_eq!(gate.outstanding(), 2);
        assert_eq!(
            gate.try_acquire().await.err(),
            Some(GateTimeout { waited_ms: 50 })
        );

        a.release();
        assert_eq!(gate.outstanding(), 1);
        drop(b);
        assert_eq!(gate.outstanding(), 0);
        assert_eq!(gate.stats().timeouts, 1);
    }

    #[tokio::test]
    async fn test_waiter_gets_released_permit() {
        let gate = Arc::new(ConcurrencyGate::new(1, Duration::from_millis(500)));
        let held = gate.try_acquire().await.unwrap();

        let waiter = {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move { gate.try_acquire().await.is_ok() })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(held);
        assert!(waiter.await.unwrap());
        assert_eq!(gate.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_token_returned_on_panic() {
        let gate = Arc::new(ConcurrencyGate::new(3, Duration::from_millis(10)));
        let task = {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move {
                let _token = gate.try_acquire().await.unwrap();
                panic!("model blew up");
            })
        };
        assert!(task.await.is_err());
        assert_eq!(gate.outstanding(), 0);
        assert_eq!(gate.stats().in_flight, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_never_exceeds_capacity() {
        let gate = Arc::new(ConcurrencyGate::new(4, Duration::from_millis(1000)));
        let handles: Vec<_> = (0..40)
            .map(|_| {
                let gate = Arc::clone(&gate);
                tokio::spawn(async move {
                    if let Ok(_token) = gate.try_acquire().await {
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }
        let stats = gate.stats();
        assert!(stats.peak_in_flight <= 4);
        assert_eq!(stats.available_permits, 4);
    }
}
