//! Built-in cover profiles.
//!
//! The registry is process-wide and immutable after first use; profiles are
//! shared by `Arc` and carry the only per-profile mutable state (the one-shot
//! override slots).

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use super::profile::{DelayBucket, SizeBucket, TrafficProfile};

static PROFILES: OnceLock<HashMap<&'static str, Arc<TrafficProfile>>> = OnceLock::new();

/// Look up a built-in profile by name (case-insensitive).
pub fn lookup(name: &str) -> Option<Arc<TrafficProfile>> {
    profiles().get(name.to_ascii_lowercase().as_str()).cloned()
}

/// Names of all registered profiles.
pub fn names() -> impl Iterator<Item = &'static str> {
    profiles().keys().copied()
}

fn profiles() -> &'static HashMap<&'static str, Arc<TrafficProfile>> {
    PROFILES.get_or_init(|| {
        let mut map = HashMap::new();
        map.insert("youtube", Arc::new(youtube()));
        map.insert("zoom", Arc::new(zoom()));
        map
    })
}

/// Video-streaming cover: large packets, short gaps.
fn youtube() -> TrafficProfile {
    build(
        "YouTube",
        &[(1400, 0.4), (1200, 0.3), (1000, 0.2), (800, 0.1)],
        &[(10, 0.5), (20, 0.3), (30, 0.2)],
    )
}

/// Video-conference cover: medium packets, steady cadence.
fn zoom() -> TrafficProfile {
    build(
        "Zoom",
        &[(500, 0.3), (600, 0.4), (700, 0.3)],
        &[(30, 0.4), (40, 0.4), (50, 0.2)],
    )
}

fn build(name: &str, sizes: &[(usize, f64)], delays_ms: &[(u64, f64)]) -> TrafficProfile {
    TrafficProfile::from_parts(
        name.to_owned(),
        sizes
            .iter()
            .map(|&(size, weight)| SizeBucket { size, weight })
            .collect(),
        delays_ms
            .iter()
            .map(|&(ms, weight)| DelayBucket {
                delay: Duration::from_millis(ms),
                weight,
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_profiles_registered() {
        assert!(lookup("youtube").is_some());
        assert!(lookup("zoom").is_some());
        assert!(lookup("netflix").is_none());
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert!(lookup("YouTube").is_some());
        assert!(lookup("ZOOM").is_some());
    }

    #[test]
    fn test_lookup_shares_one_instance() {
        let a = lookup("youtube").unwrap();
        let b = lookup("youtube").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_youtube_distribution_support() {
        let profile = lookup("youtube").unwrap();
        for _ in 0..200 {
            assert!(matches!(profile.sample_size(), 800 | 1000 | 1200 | 1400));
            assert!(matches!(profile.sample_delay().as_millis(), 10 | 20 | 30));
        }
    }

    #[test]
    fn test_zoom_distribution_support() {
        let profile = lookup("zoom").unwrap();
        for _ in 0..200 {
            assert!(matches!(profile.sample_size(), 500 | 600 | 700));
            assert!(matches!(profile.sample_delay().as_millis(), 30 | 40 | 50));
        }
    }

    #[test]
    fn test_names_lists_builtins() {
        let mut names: Vec<_> = names().collect();
        names.sort_unstable();
        assert_eq!(names, vec!["youtube", "zoom"]);
    }
}
