/// Default slack above the average load a single host may absorb.
///
/// See "Consistent Hashing with Bounded Loads" (Mirrokni, Thorup, Zadimoghaddam).
pub const DEFAULT_LOAD_FACTOR: f64 = 0.25;

/// Per-host load ceiling.
///
/// The ceiling is derived from the current total load and number of hosts:
/// `ceil((total_load + 1) / host_count * (1 + factor))`. The average is
/// computed with real-valued division, so that small loads are not truncated
/// to zero before the factor is applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadBound {
    factor: f64,
}

impl Default for LoadBound {
    fn default() -> Self {
        Self::new(DEFAULT_LOAD_FACTOR)
    }
}

impl LoadBound {
    /// Creates load bound with a given slack factor.
    ///
    /// Negative or non-finite factors fall back to [`DEFAULT_LOAD_FACTOR`].
    pub fn new(factor: f64) -> Self {
        let factor = if factor.is_finite() && factor >= 0.0 {
            factor
        } else {
            DEFAULT_LOAD_FACTOR
        };
        Self { factor }
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    /// Returns the maximum load a single host may carry.
    ///
    /// Returns `None` when there are no hosts to spread the load over.
    pub fn ceiling(&self, total_load: i64, host_count: usize) -> Option<i64> {
        if host_count == 0 {
            return None;
        }

        // Unpaired decrements may push the total below zero, clamping keeps
        // the average positive.
        let avg = (total_load.max(0) + 1) as f64 / host_count as f64;
        Some((avg * (1.0 + self.factor)).ceil() as i64)
    }

    /// Checks whether a host carrying `load` can take one more unit without
    /// crossing the ceiling.
    pub fn has_headroom(&self, load: i64, total_load: i64, host_count: usize) -> bool {
        self.ceiling(total_load, host_count)
            .is_some_and(|ceiling| load < ceiling)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ceiling() {
        let bound = LoadBound::default();
        assert_eq!(bound.factor(), DEFAULT_LOAD_FACTOR);
        assert_eq!(bound.ceiling(0, 0), None);

        // Every host admits at least one unit of load.
        assert_eq!(bound.ceiling(0, 1), Some(2));
        assert_eq!(bound.ceiling(0, 3), Some(1));
        assert_eq!(bound.ceiling(0, 100), Some(1));
        assert_eq!(bound.ceiling(-5, 3), Some(1));

        // (7 + 1) / 3 * 1.25 = 3.33..
        assert_eq!(bound.ceiling(7, 3), Some(4));
        // (11 + 1) / 3 * 1.25 = 5
        assert_eq!(bound.ceiling(11, 3), Some(5));
        // (99 + 1) / 10 * 1.25 = 12.5
        assert_eq!(bound.ceiling(99, 10), Some(13));
    }

    #[test]
    fn real_valued_average() {
        let bound = LoadBound::default();
        // (4 + 1) / 3 * 1.25 = 2.08.., integer division gives 2.
        assert_eq!(bound.ceiling(4, 3), Some(3));
        // (5 + 1) / 4 * 1.25 = 1.875
        assert_eq!(bound.ceiling(5, 4), Some(2));
        // (6 + 1) / 4 * 1.25 = 2.1875, integer division gives 2.
        assert_eq!(bound.ceiling(6, 4), Some(3));
    }

    #[test]
    fn headroom() {
        let bound = LoadBound::default();
        assert!(bound.has_headroom(0, 0, 3));
        assert!(!bound.has_headroom(1, 1, 3));
        assert!(bound.has_headroom(0, 1, 3));
        assert!(!bound.has_headroom(0, 0, 0));

        // Unpaired decrements never block a host.
        assert!(bound.has_headroom(-1, -1, 2));
    }

    #[test]
    fn custom_factor() {
        assert_eq!(LoadBound::new(f64::NAN).factor(), DEFAULT_LOAD_FACTOR);
        assert_eq!(LoadBound::new(-1.0).factor(), DEFAULT_LOAD_FACTOR);

        let strict = LoadBound::new(0.0);
        // (8 + 1) / 3 = 3
        assert_eq!(strict.ceiling(8, 3), Some(3));

        let loose = LoadBound::new(1.0);
        // (8 + 1) / 3 * 2 = 6
        assert_eq!(loose.ceiling(8, 3), Some(6));
    }
}
