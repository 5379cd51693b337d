//! Consistent hashing with bounded loads.
//!
//! Routes string keys to one of a dynamic set of backend hosts, so that
//! adding or removing a host remaps only a small fraction of keys, and no
//! single host is driven far above the average load.
//!
//! ```
//! use loadring::HashRing;
//!
//! let ring = HashRing::new(10);
//! ring.register_host("127.0.0.1:8001").unwrap();
//! ring.register_host("127.0.0.1:8002").unwrap();
//!
//! // Plain consistent hashing.
//! let host = ring.get_host_by_key("user:42").unwrap();
//! assert!(ring.contains(&host));
//!
//! // Bounded-load routing, load is released when the guard is dropped.
//! let guard = ring.acquire_least("user:42").unwrap();
//! assert_eq!(ring.load(guard.address()), Ok(1));
//! drop(guard);
//! assert_eq!(ring.total_load(), 0);
//! ```

mod builder;
mod error;
mod hash;
mod host;
mod load;
mod ring;

pub use {
    builder::HashRingBuilder,
    error::{RingError, RingResult},
    hash::{FnHasher, KeyHasher, RapidHasher, Sha512Hasher},
    host::{Host, Position},
    load::{DEFAULT_LOAD_FACTOR, LoadBound},
    ring::{DEFAULT_REPLICAS, HashRing, LoadGuard},
};
