//! Zoom-banded cache lifetimes.

use std::time::Duration;

const HOUR: u64 = 3600;

/// Cache lifetime per zoom band.
///
/// Low-zoom tiles change rarely and are expensive to build, so they live
/// longest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    /// Lifetime for zoom `0..=low_max_zoom`.
    pub low: Duration,
    pub low_max_zoom: u8,
    /// Lifetime for zoom `low_max_zoom+1..=mid_max_zoom`.
    pub mid: Duration,
    pub mid_max_zoom: u8,
    /// Lifetime above `mid_max_zoom`.
    pub high: Duration,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            low: Duration::from_secs(24 * HOUR),
            low_max_zoom: 8,
            mid: Duration::from_secs(12 * HOUR),
            mid_max_zoom: 12,
            high: Duration::from_secs(HOUR),
        }
    }
}

impl TtlPolicy {
    pub fn ttl_for_zoom(&self, zoom: u8) -> Duration {
        if zoom <= self.low_max_zoom {
            self.low
        } else if zoom <= self.mid_max_zoom {
            self.mid
        } else {
            self.high
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bands() {
        let policy = TtlPolicy::default();
        assert_eq!(policy.ttl_for_zoom(0), Duration::from_secs(86_400));
        assert_eq!(policy.ttl_for_zoom(8), Duration::from_secs(86_400));
        assert_eq!(policy.ttl_for_zoom(9), Duration::from_secs(43_200));
        assert_eq!(policy.ttl_for_zoom(12), Duration::from_secs(43_200));
        assert_eq!(policy.ttl_for_zoom(13), Duration::from_secs(3_600));
        assert_eq!(policy.ttl_for_zoom(30), Duration::from_secs(3_600));
    }

    #[test]
    fn test_non_increasing() {
        let policy = TtlPolicy::default();
        for zoom in 0..30 {
            assert!(policy.ttl_for_zoom(zoom + 1) <= policy.ttl_for_zoom(zoom));
        }
    }
}
