use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicI64, Ordering},
    },
};

/// Ring position of a virtual node.
pub type Position = u64;

/// Backend host that keys are routed to.
///
/// Host owns a fixed set of virtual node positions on the ring and a load
/// counter. The counter is updated concurrently by load tracking calls, while
/// the rest of the host is immutable after registration.
#[derive(Debug)]
pub struct Host {
    address: String,
    positions: Vec<Position>,
    load: AtomicI64,
}

impl Host {
    pub(crate) fn new(address: String, positions: Vec<Position>) -> Self {
        Self {
            address,
            positions,
            load: AtomicI64::new(0),
        }
    }

    /// Address of the host, normally `host:port`.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Virtual node positions claimed by the host, in replica index order.
    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    /// Number of requests currently in flight on the host.
    pub fn load(&self) -> i64 {
        self.load.load(Ordering::Acquire)
    }

    pub(crate) fn inc_load(&self) -> i64 {
        self.load.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub(crate) fn dec_load(&self) -> i64 {
        self.load.fetch_sub(1, Ordering::AcqRel) - 1
    }
}

/// Hosts collection.
///
/// Hosts are keyed by address. Every insertion or removal bumps the version
/// of the collection, which doubles as the topology version of the ring.
///
/// Hosts are shared, so that a load charge can tell whether the host it was
/// taken on is still registered, or was replaced by a host with the same
/// address.
#[derive(Debug, Default)]
pub(crate) struct Hosts {
    hosts: HashMap<String, Arc<Host>>,
    version: u64,
}

impl Hosts {
    /// Adds a host to the collection, replacing any host with the same
    /// address.
    pub fn insert(&mut self, host: Host) {
        self.hosts.insert(host.address.clone(), Arc::new(host));
        self.version += 1;
    }

    /// Removes and returns (if existed) a host from the collection.
    pub fn remove(&mut self, address: &str) -> Option<Arc<Host>> {
        self.hosts.remove(address).inspect(|_| {
            self.version += 1;
        })
    }

    pub fn get(&self, address: &str) -> Option<&Arc<Host>> {
        self.hosts.get(address)
    }

    pub fn contains(&self, address: &str) -> bool {
        self.hosts.contains_key(address)
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Host>> {
        self.hosts.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_host(host: &Host, address: &str, positions: &[Position], load: i64) {
        assert_eq!(host.address(), address);
        assert_eq!(host.positions(), positions);
        assert_eq!(host.load(), load);
    }

    #[test]
    fn basic_ops() {
        let mut hosts = Hosts::default();
        assert!(hosts.is_empty());

        (0..5).for_each(|i| {
            let address = format!("127.0.0.1:{}", 8000 + i);
            hosts.insert(Host::new(address.clone(), vec![i, i + 10]));
            check_host(hosts.get(&address).unwrap(), &address, &[i, i + 10], 0);
        });
        assert_eq!(hosts.len(), 5);
        assert_eq!(hosts.version(), 5);

        // Load counters move independently per host.
        let host = hosts.get("127.0.0.1:8001").unwrap();
        assert_eq!(host.inc_load(), 1);
        assert_eq!(host.inc_load(), 2);
        assert_eq!(host.dec_load(), 1);
        check_host(hosts.get("127.0.0.1:8001").unwrap(), "127.0.0.1:8001", &[1, 11], 1);
        check_host(hosts.get("127.0.0.1:8002").unwrap(), "127.0.0.1:8002", &[2, 12], 0);

        // Remove host and check that it is gone.
        let removed = hosts.remove("127.0.0.1:8003").unwrap();
        assert_eq!(removed.address(), "127.0.0.1:8003");
        assert_eq!(hosts.len(), 4);
        assert_eq!(hosts.version(), 6);
        assert!(!hosts.contains("127.0.0.1:8003"));
        assert!(hosts.get("127.0.0.1:8003").is_none());

        // Removing missing host leaves version untouched.
        assert!(hosts.remove("127.0.0.1:8003").is_none());
        assert_eq!(hosts.version(), 6);
        assert_eq!(hosts.iter().count(), 4);
    }
}
