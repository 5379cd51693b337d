use super::{DEFAULT_LOAD_FACTOR, DEFAULT_REPLICAS, HashRing, KeyHasher, LoadBound, Sha512Hasher};

/// Hash ring builder.
///
/// Ring configuration is fixed once the ring is built.
#[derive(Debug, Clone)]
pub struct HashRingBuilder<H = Sha512Hasher> {
    replicas: usize,
    load_factor: f64,
    hasher: H,
}

impl Default for HashRingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HashRingBuilder {
    /// Create new ring builder with default settings.
    pub fn new() -> Self {
        Self {
            replicas: DEFAULT_REPLICAS,
            load_factor: DEFAULT_LOAD_FACTOR,
            hasher: Sha512Hasher,
        }
    }
}

impl<H: KeyHasher> HashRingBuilder<H> {
    /// Set the number of virtual nodes per host.
    ///
    /// Zero falls back to [`DEFAULT_REPLICAS`].
    pub fn replicas(mut self, replicas: usize) -> Self {
        self.replicas = replicas;
        self
    }

    /// Set the slack above the average load a single host may absorb.
    ///
    /// Negative or non-finite factors fall back to [`DEFAULT_LOAD_FACTOR`].
    pub fn load_factor(mut self, load_factor: f64) -> Self {
        self.load_factor = load_factor;
        self
    }

    /// Transform the builder into one with a different hasher.
    pub fn hasher<CustomH: KeyHasher>(self, hasher: CustomH) -> HashRingBuilder<CustomH> {
        HashRingBuilder {
            replicas: self.replicas,
            load_factor: self.load_factor,
            hasher,
        }
    }

    /// Build the ring.
    pub fn build(self) -> HashRing<H> {
        HashRing::from_parts(self.replicas, LoadBound::new(self.load_factor), self.hasher)
    }
}

#[cfg(test)]
mod tests {
    use {super::*, crate::RapidHasher};

    #[test]
    fn defaults() {
        let ring = HashRingBuilder::new().build();
        assert_eq!(ring.replicas(), DEFAULT_REPLICAS);
        assert_eq!(ring.load_factor(), DEFAULT_LOAD_FACTOR);

        let ring = HashRingBuilder::default()
            .replicas(0)
            .load_factor(f64::INFINITY)
            .build();
        assert_eq!(ring.replicas(), DEFAULT_REPLICAS);
        assert_eq!(ring.load_factor(), DEFAULT_LOAD_FACTOR);
    }

    #[test]
    fn custom_hasher() {
        // Settings survive the hasher swap, in either order.
        let ring = HashRingBuilder::new()
            .replicas(7)
            .hasher(RapidHasher)
            .load_factor(0.5)
            .build();
        assert_eq!(ring.replicas(), 7);
        assert_eq!(ring.load_factor(), 0.5);
        assert_eq!(ring.position("key"), RapidHasher.hash(b"key"));

        ring.register_host("127.0.0.1:8080").unwrap();
        assert_eq!(ring.positions().len(), 7);
    }
}
