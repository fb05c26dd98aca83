//! Mock implementations of core providers.
//!
//! Every repository keeps its rows in an `Arc<Mutex<HashMap>>` and hands out
//! ids from an atomic counter, so clones share the same data.

use chrono::{DateTime, Duration, Utc};
use shopfront_core::environment::Clock;
use shopfront_core::providers::RepositoryError;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

mod category;
mod order;
mod product;
mod user;

pub use category::InMemoryCategoryRepository;
pub use order::InMemoryOrderRepository;
pub use product::InMemoryProductRepository;
pub use user::InMemoryUserRepository;

/// Fixed clock for deterministic tests
///
/// Returns the same time until explicitly advanced, making tests
/// reproducible.
///
/// # Example
///
/// ```
/// use shopfront_testing::mocks::FixedClock;
/// use shopfront_core::environment::Clock;
/// use chrono::Utc;
///
/// let clock = FixedClock::new(Utc::now());
/// let time1 = clock.now();
/// let time2 = clock.now();
/// assert_eq!(time1, time2);
/// ```
#[derive(Debug, Clone)]
pub struct FixedClock {
    time: Arc<Mutex<DateTime<Utc>>>,
}

impl FixedClock {
    /// Create a new fixed clock with the given time
    #[must_use]
    pub fn new(time: DateTime<Utc>) -> Self {
        Self {
            time: Arc::new(Mutex::new(time)),
        }
    }

    /// Move the clock forward by `duration`.
    pub fn advance(&self, duration: Duration) {
        let mut time = self.time.lock().unwrap_or_else(PoisonError::into_inner);
        *time += duration;
    }

    /// Set the clock to `time`.
    pub fn set(&self, time: DateTime<Utc>) {
        *self.time.lock().unwrap_or_else(PoisonError::into_inner) = time;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.time.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
#[must_use]
pub fn test_clock() -> FixedClock {
    FixedClock::new(DateTime::<Utc>::UNIX_EPOCH + Duration::seconds(1_735_689_600))
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Internal("in-memory store lock poisoned".to_string()))
}
