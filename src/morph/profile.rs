//! Weighted-random traffic profiles.
//!
//! A profile is a pair of weighted distributions - target packet sizes and
//! inter-packet delays - plus two one-shot override slots that the peer can
//! set through control frames. The distributions are immutable after
//! construction; only the override slots mutate, guarded by a mutex that is
//! never held across I/O or sleep.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::core::SessionError;

/// One bucket of the packet-size distribution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeBucket {
    /// Target wire size in bytes.
    pub size: usize,
    /// Non-negative sampling weight.
    pub weight: f64,
}

/// One bucket of the inter-packet delay distribution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayBucket {
    /// Delay inserted after a morphed write.
    pub delay: Duration,
    /// Non-negative sampling weight.
    pub weight: f64,
}

/// One-shot overrides set by control frames, consumed by the next sample.
#[derive(Debug, Default)]
struct Overrides {
    next_size: Option<usize>,
    next_delay: Option<Duration>,
}

/// A statistical cover-traffic profile.
///
/// Samples target packet sizes and inter-packet delays so that the on-wire
/// distribution of a session mimics the named cover application.
#[derive(Debug)]
pub struct TrafficProfile {
    name: String,
    packet_sizes: Vec<SizeBucket>,
    delays: Vec<DelayBucket>,
    overrides: Mutex<Overrides>,
}

impl TrafficProfile {
    /// Create a profile from explicit distributions.
    ///
    /// Each distribution needs at least one bucket; weights must be finite,
    /// non-negative, and sum to more than zero. Weights need not sum to 1.0;
    /// the sampler walks them cumulatively.
    pub fn new(
        name: impl Into<String>,
        packet_sizes: Vec<SizeBucket>,
        delays: Vec<DelayBucket>,
    ) -> Result<Self, SessionError> {
        let name = name.into();
        validate_weights(&name, "packet_sizes", packet_sizes.iter().map(|b| b.weight))?;
        validate_weights(&name, "delays", delays.iter().map(|b| b.weight))?;
        Ok(Self::from_parts(name, packet_sizes, delays))
    }

    /// Build a known-valid profile, bypassing validation. Used for the
    /// built-in registry entries whose distributions are compile-time fixed.
    pub(crate) fn from_parts(
        name: String,
        packet_sizes: Vec<SizeBucket>,
        delays: Vec<DelayBucket>,
    ) -> Self {
        Self {
            name,
            packet_sizes,
            delays,
            overrides: Mutex::new(Overrides::default()),
        }
    }

    /// Get the profile name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sample a target packet size.
    ///
    /// A pending one-shot override is returned and cleared first; otherwise a
    /// uniform `[0,1)` draw selects a bucket by cumulative weight. If floating
    /// rounding leaves the draw above the cumulative total, the first bucket
    /// wins.
    pub fn sample_size(&self) -> usize {
        if let Some(size) = self.take_next_size() {
            return size;
        }

        let r: f64 = rand::random();
        let total: f64 = self.packet_sizes.iter().map(|b| b.weight).sum();
        let mut cumsum = 0.0;
        for bucket in &self.packet_sizes {
            cumsum += bucket.weight / total;
            if r <= cumsum {
                return bucket.size;
            }
        }
        self.packet_sizes[0].size
    }

    /// Sample an inter-packet delay. Same override-then-weighted policy as
    /// [`sample_size`](Self::sample_size).
    pub fn sample_delay(&self) -> Duration {
        if let Some(delay) = self.take_next_delay() {
            return delay;
        }

        let r: f64 = rand::random();
        let total: f64 = self.delays.iter().map(|b| b.weight).sum();
        let mut cumsum = 0.0;
        for bucket in &self.delays {
            cumsum += bucket.weight / total;
            if r <= cumsum {
                return bucket.delay;
            }
        }
        self.delays[0].delay
    }

    /// Store a one-shot size override; the next `sample_size` returns it.
    pub fn set_next_size(&self, size: usize) {
        self.lock_overrides().next_size = Some(size);
    }

    /// Store a one-shot delay override; the next `sample_delay` returns it.
    pub fn set_next_delay(&self, delay: Duration) {
        self.lock_overrides().next_delay = Some(delay);
    }

    fn take_next_size(&self) -> Option<usize> {
        self.lock_overrides().next_size.take()
    }

    fn take_next_delay(&self) -> Option<Duration> {
        self.lock_overrides().next_delay.take()
    }

    fn lock_overrides(&self) -> std::sync::MutexGuard<'_, Overrides> {
        // A poisoned lock only means a panicking thread held it; the slots
        // stay usable.
        self.overrides.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn validate_weights(
    name: &str,
    which: &str,
    weights: impl Iterator<Item = f64>,
) -> Result<(), SessionError> {
    let mut total = 0.0;
    let mut count = 0usize;
    for w in weights {
        if !w.is_finite() || w < 0.0 {
            return Err(SessionError::Config(format!(
                "profile {name}: {which} has an invalid weight {w}"
            )));
        }
        total += w;
        count += 1;
    }
    if count == 0 {
        return Err(SessionError::Config(format!(
            "profile {name}: {which} distribution is empty"
        )));
    }
    if total <= 0.0 {
        return Err(SessionError::Config(format!(
            "profile {name}: {which} weights sum to zero"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_profile() -> TrafficProfile {
        TrafficProfile::new(
            "test",
            vec![
                SizeBucket { size: 1400, weight: 0.4 },
                SizeBucket { size: 1200, weight: 0.3 },
                SizeBucket { size: 1000, weight: 0.2 },
                SizeBucket { size: 800, weight: 0.1 },
            ],
            vec![
                DelayBucket { delay: Duration::from_millis(10), weight: 0.5 },
                DelayBucket { delay: Duration::from_millis(20), weight: 0.3 },
                DelayBucket { delay: Duration::from_millis(30), weight: 0.2 },
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_sample_size_in_support() {
        let profile = test_profile();
        for _ in 0..1000 {
            let size = profile.sample_size();
            assert!(matches!(size, 800 | 1000 | 1200 | 1400), "got {size}");
        }
    }

    #[test]
    fn test_sample_delay_in_support() {
        let profile = test_profile();
        for _ in 0..1000 {
            let ms = profile.sample_delay().as_millis();
            assert!(matches!(ms, 10 | 20 | 30), "got {ms}");
        }
    }

    #[test]
    fn test_size_override_is_one_shot() {
        let profile = test_profile();

        profile.set_next_size(4321);
        assert_eq!(profile.sample_size(), 4321);

        // Cleared after one use
        for _ in 0..100 {
            assert_ne!(profile.sample_size(), 4321);
        }
    }

    #[test]
    fn test_delay_override_is_one_shot() {
        let profile = test_profile();

        profile.set_next_delay(Duration::from_millis(777));
        assert_eq!(profile.sample_delay(), Duration::from_millis(777));
        assert_ne!(profile.sample_delay(), Duration::from_millis(777));
    }

    #[test]
    fn test_latest_override_wins() {
        let profile = test_profile();

        profile.set_next_size(100);
        profile.set_next_size(200);
        assert_eq!(profile.sample_size(), 200);
    }

    #[test]
    fn test_empty_distribution_rejected() {
        let result = TrafficProfile::new(
            "empty",
            vec![],
            vec![DelayBucket { delay: Duration::from_millis(10), weight: 1.0 }],
        );
        assert!(matches!(result, Err(SessionError::Config(_))));
    }

    #[test]
    fn test_negative_weight_rejected() {
        let result = TrafficProfile::new(
            "negative",
            vec![SizeBucket { size: 100, weight: -1.0 }],
            vec![DelayBucket { delay: Duration::from_millis(10), weight: 1.0 }],
        );
        assert!(matches!(result, Err(SessionError::Config(_))));
    }

    #[test]
    fn test_zero_total_weight_rejected() {
        let result = TrafficProfile::new(
            "zero",
            vec![SizeBucket { size: 100, weight: 0.0 }],
            vec![DelayBucket { delay: Duration::from_millis(10), weight: 1.0 }],
        );
        assert!(matches!(result, Err(SessionError::Config(_))));
    }

    #[test]
    fn test_weights_need_not_sum_to_one() {
        let profile = TrafficProfile::new(
            "scaled",
            vec![
                SizeBucket { size: 100, weight: 3.0 },
                SizeBucket { size: 200, weight: 7.0 },
            ],
            vec![DelayBucket { delay: Duration::from_millis(5), weight: 2.5 }],
        )
        .unwrap();

        for _ in 0..200 {
            assert!(matches!(profile.sample_size(), 100 | 200));
            assert_eq!(profile.sample_delay(), Duration::from_millis(5));
        }
    }
}
