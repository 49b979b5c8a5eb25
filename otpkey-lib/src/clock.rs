//! Free-running session timestamp.
//!
//! In the hardware original a periodic timer interrupt advances a
//! split high/low timestamp pair while the foreground path reads it.
//! Here the whole 24-bit value lives in one atomic, so the generation
//! path can never observe a torn pair while an external ticker
//! advances it.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::record::TIMESTAMP_MASK;

/// Cloneable handle to the 24-bit session timestamp.
#[derive(Debug, Clone, Default)]
pub struct SessionTimer {
    ticks: Arc<AtomicU32>,
}

impl SessionTimer {
    /// Fresh timer at zero, as on boot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance by one tick, wrapping at 2^24.
    pub fn tick(&self) {
        // the closure always returns Some, so this cannot fail
        let _ = self
            .ticks
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |t| {
                Some(t.wrapping_add(1) & TIMESTAMP_MASK)
            });
    }

    /// Snapshot the current 24-bit value.
    pub fn now(&self) -> u32 {
        self.ticks.load(Ordering::Acquire)
    }

    /// Zero the timestamp. The timer is never persisted; every boot
    /// starts from zero.
    pub fn reset(&self) {
        self.ticks.store(0, Ordering::Release);
    }

    #[cfg(test)]
    pub(crate) fn set(&self, value: u32) {
        self.ticks.store(value & TIMESTAMP_MASK, Ordering::Release);
    }

    /// Run [`SessionTimer::tick`] at a fixed period from a background
    /// task, standing in for the firmware's periodic timer interrupt.
    pub fn spawn_ticker(&self, period: Duration) -> JoinHandle<()> {
        let timer = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                timer.tick();
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_advances() {
        let timer = SessionTimer::new();
        assert_eq!(timer.now(), 0);
        for expected in 1..=5 {
            timer.tick();
            assert_eq!(timer.now(), expected);
        }
        timer.reset();
        assert_eq!(timer.now(), 0);
    }

    #[test]
    fn test_wraps_at_24_bits() {
        let timer = SessionTimer::new();
        timer.set(TIMESTAMP_MASK);
        timer.tick();
        assert_eq!(timer.now(), 0);
    }

    #[tokio::test]
    async fn test_background_ticker() {
        let timer = SessionTimer::new();
        let handle = timer.spawn_ticker(Duration::from_millis(1));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(timer.now() > 0);
        handle.abort();
    }
}
