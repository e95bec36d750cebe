use std::time::Duration;

use rand::Rng;

/// Mandatory wait between consecutive outbound sends, drawn at random from a
/// configured window so the traffic pattern does not look machine-generated.
#[derive(Debug, Clone, Copy)]
pub struct Pacer {
    min: Duration,
    max: Duration,
}

impl Pacer {
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        let (min_ms, max_ms) = if min_ms <= max_ms {
            (min_ms, max_ms)
        } else {
            (max_ms, min_ms)
        };
        Self {
            min: Duration::from_millis(min_ms),
            max: Duration::from_millis(max_ms),
        }
    }

    /// No delay at all. Used by tests.
    pub fn none() -> Self {
        Self::new(0, 0)
    }

    pub async fn pause(&self) {
        let delay = if self.max > self.min {
            let span = (self.max - self.min).as_millis() as u64;
            self.min + Duration::from_millis(rand::thread_rng().gen_range(0..=span))
        } else {
            self.min
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}
