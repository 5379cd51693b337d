use {
    auto_impl::auto_impl,
    rapidhash::v3::rapidhash_v3,
    sha2::{Digest, Sha512},
};

/// Strategy that maps arbitrary bytes onto the ring.
///
/// Both keys and virtual node names go through the same hasher, so the
/// hasher must be pure: equal input, equal output, for the lifetime of the
/// ring.
#[auto_impl(&, Box, Arc)]
pub trait KeyHasher {
    fn hash(&self, bytes: &[u8]) -> u64;
}

/// Default hasher of the ring.
///
/// Computes SHA-512 digest of the input and interprets its first 8 bytes as
/// a little-endian `u64`. Slower than non-cryptographic hashes, but output is
/// uniformly distributed and portable across platforms and releases.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha512Hasher;

impl KeyHasher for Sha512Hasher {
    fn hash(&self, bytes: &[u8]) -> u64 {
        let digest = Sha512::digest(bytes);
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        u64::from_le_bytes(head)
    }
}

/// Fast non-cryptographic hasher.
///
/// Uses the rapidhash V3 algorithm with the default seed and secrets.
#[derive(Debug, Default, Clone, Copy)]
pub struct RapidHasher;

impl KeyHasher for RapidHasher {
    fn hash(&self, bytes: &[u8]) -> u64 {
        rapidhash_v3(bytes)
    }
}

/// Adapts a plain function or closure into a [`KeyHasher`].
#[derive(Clone, Copy)]
pub struct FnHasher<F>(pub F);

impl<F> KeyHasher for FnHasher<F>
where
    F: Fn(&[u8]) -> u64,
{
    fn hash(&self, bytes: &[u8]) -> u64 {
        (self.0)(bytes)
    }
}

#[cfg(test)]
mod tests {
    use {super::*, std::sync::Arc};

    #[test]
    fn sanity_checks() {
        // Same input, same output.
        let data = b"hello world";
        assert_eq!(Sha512Hasher.hash(data), Sha512Hasher.hash(data));
        assert_eq!(RapidHasher.hash(data), RapidHasher.hash(data));
        assert_ne!(Sha512Hasher.hash(b"127.0.0.10"), Sha512Hasher.hash(b"127.0.0.11"));

        // Digest prefix is read as little-endian.
        let digest = Sha512::digest(data);
        let expected = digest[..8]
            .iter()
            .rev()
            .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte));
        assert_eq!(Sha512Hasher.hash(data), expected);
    }

    #[test]
    fn wrappers() {
        let hasher = FnHasher(|bytes: &[u8]| bytes.len() as u64);
        assert_eq!(hasher.hash(b"abc"), 3);
        let by_ref = &hasher;
        assert_eq!(by_ref.hash(b"abcd"), 4);

        let boxed: Box<dyn KeyHasher> = Box::new(RapidHasher);
        assert_eq!(boxed.hash(b"key"), RapidHasher.hash(b"key"));

        let shared = Arc::new(Sha512Hasher);
        assert_eq!(shared.hash(b"key"), Sha512Hasher.hash(b"key"));
    }
}
