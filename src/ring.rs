use {
    crate::{
        HashRingBuilder,
        Host,
        KeyHasher,
        LoadBound,
        Position,
        RingError,
        RingResult,
        Sha512Hasher,
        host::Hosts,
    },
    parking_lot::RwLock,
    std::{
        collections::{HashMap, HashSet},
        fmt,
        sync::{
            Arc,
            atomic::{AtomicI64, Ordering},
        },
    },
    tracing::{debug, info, trace, warn},
};

/// Number of virtual nodes per host, used when zero is requested.
pub const DEFAULT_REPLICAS: usize = 10;

/// Ring topology: registered hosts and their virtual nodes.
///
/// Guarded as a whole, so that lookups never observe a half-populated or
/// half-sorted ring.
#[derive(Debug, Default)]
struct Topology {
    hosts: Hosts,

    /// Position of a virtual node -> address of the owning host.
    owners: HashMap<Position, String>,

    /// Positions of all virtual nodes, sorted ascending.
    sorted: Vec<Position>,
}

impl Topology {
    /// Index of the first virtual node at or after `position`, wrapping
    /// around to the start of the ring.
    ///
    /// Returns `None` if the ring is empty.
    fn search(&self, position: Position) -> Option<usize> {
        if self.sorted.is_empty() {
            return None;
        }

        let idx = self.sorted.partition_point(|p| *p < position);
        Some(if idx == self.sorted.len() { 0 } else { idx })
    }

    /// Host owning the virtual node at a given index of the sorted sequence.
    fn host_at(&self, idx: usize) -> RingResult<&Arc<Host>> {
        let position = self.sorted[idx];
        self.owners
            .get(&position)
            .and_then(|address| self.hosts.get(address))
            .ok_or_else(|| RingError::HostNotFound(position.to_string()))
    }
}

/// Consistent hashing ring with bounded loads.
///
/// Each registered host claims a fixed number of virtual nodes on a `u64`
/// ring. Keys are routed to the host owning the first virtual node at or
/// after the key's position, so adding or removing a host remaps only the keys
/// that land on its virtual nodes.
///
/// On top of the plain lookup, the ring keeps per-host load counters and can
/// route keys with a load ceiling: whenever the natural host of a key is above
/// `ceil(avg_load * (1 + load_factor))`, the key goes to the next host along
/// the ring that still has headroom.
///
/// The ring is meant to be shared between threads (normally behind an `Arc`).
/// Topology changes take an exclusive lock, lookups and load updates take a
/// shared one, load counters themselves are atomics.
pub struct HashRing<H = Sha512Hasher> {
    topology: RwLock<Topology>,
    total_load: AtomicI64,
    replicas: usize,
    load_bound: LoadBound,
    hasher: H,
}

impl Default for HashRing {
    fn default() -> Self {
        HashRingBuilder::new().build()
    }
}

impl<H> fmt::Debug for HashRing<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashRing")
            .field("topology", &*self.topology.read())
            .field("total_load", &self.total_load.load(Ordering::Acquire))
            .field("replicas", &self.replicas)
            .field("load_bound", &self.load_bound)
            .finish_non_exhaustive()
    }
}

impl HashRing {
    /// Creates an empty ring with the default hasher.
    ///
    /// Zero `replicas` falls back to [`DEFAULT_REPLICAS`].
    pub fn new(replicas: usize) -> Self {
        HashRingBuilder::new().replicas(replicas).build()
    }

    /// Returns a builder to configure the ring.
    pub fn builder() -> HashRingBuilder {
        HashRingBuilder::new()
    }
}

impl<H: KeyHasher> HashRing<H> {
    /// Creates an empty ring with a custom hasher.
    pub fn with_hasher(replicas: usize, hasher: H) -> Self {
        HashRingBuilder::new()
            .replicas(replicas)
            .hasher(hasher)
            .build()
    }

    pub(crate) fn from_parts(replicas: usize, load_bound: LoadBound, hasher: H) -> Self {
        let replicas = if replicas == 0 {
            DEFAULT_REPLICAS
        } else {
            replicas
        };

        Self {
            topology: RwLock::new(Topology::default()),
            total_load: AtomicI64::new(0),
            replicas,
            load_bound,
            hasher,
        }
    }

    /// Registers a host, placing its virtual nodes on the ring.
    ///
    /// Virtual node `i` of a host is positioned at `hash(address ++ i)`, where
    /// `i` is written in decimal. Fails if the host is already registered, or
    /// if any of its virtual nodes lands on an occupied position. On failure
    /// the ring is left untouched.
    pub fn register_host(&self, address: &str) -> RingResult<()> {
        let mut guard = self.topology.write();
        let topology = &mut *guard;

        if topology.hosts.contains(address) {
            return Err(RingError::HostAlreadyExists(address.to_owned()));
        }

        let positions = self.virtual_nodes(address);
        let mut claimed = HashSet::with_capacity(positions.len());
        for &position in &positions {
            let owner = match topology.owners.get(&position) {
                Some(owner) => owner.clone(),
                None if claimed.insert(position) => continue,
                None => address.to_owned(),
            };
            warn!(address, position, %owner, "virtual node position is taken");
            return Err(RingError::PositionCollision {
                address: address.to_owned(),
                position,
                owner,
            });
        }

        for &position in &positions {
            trace!(address, position, "placing virtual node");
            topology.owners.insert(position, address.to_owned());
            topology.sorted.push(position);
        }
        topology.sorted.sort_unstable();
        topology
            .hosts
            .insert(Host::new(address.to_owned(), positions));

        info!(address, replicas = self.replicas, "registered host");
        Ok(())
    }

    /// Unregisters a host, removing its virtual nodes from the ring.
    ///
    /// Load still carried by the host is subtracted from the total load.
    pub fn unregister_host(&self, address: &str) -> RingResult<()> {
        let mut guard = self.topology.write();
        let topology = &mut *guard;

        let host = topology
            .hosts
            .remove(address)
            .ok_or_else(|| RingError::HostNotFound(address.to_owned()))?;

        for &position in host.positions() {
            trace!(address, position, "removing virtual node");
            topology.owners.remove(&position);
            if let Ok(idx) = topology.sorted.binary_search(&position) {
                topology.sorted.remove(idx);
            }
        }
        self.total_load.fetch_sub(host.load(), Ordering::AcqRel);

        info!(address, load = host.load(), "unregistered host");
        Ok(())
    }

    /// Returns the host responsible for the given key.
    ///
    /// Fails with [`RingError::HostNotFound`] if no host is registered.
    pub fn get_host_by_key(&self, key: &str) -> RingResult<String> {
        let topology = self.topology.read();
        let idx = topology
            .search(self.position(key))
            .ok_or_else(|| RingError::HostNotFound(key.to_owned()))?;

        topology.host_at(idx).map(|host| host.address().to_owned())
    }

    /// Returns the host responsible for the given key, respecting the load
    /// ceiling.
    ///
    /// Starts at the host returned by [`get_host_by_key()`](Self::get_host_by_key)
    /// and walks along the ring until a host with headroom is found.
    /// The returned host is not charged with the load, see
    /// [`acquire_least()`](Self::acquire_least) for selection and accounting
    /// in one step.
    pub fn get_host_by_key_least(&self, key: &str) -> RingResult<String> {
        let topology = self.topology.read();
        self.select_least(&topology, key)
            .map(|host| host.address().to_owned())
    }

    /// Increments the load of the given host.
    pub fn inc_load(&self, address: &str) -> RingResult<()> {
        let topology = self.topology.read();
        let host = topology
            .hosts
            .get(address)
            .ok_or_else(|| RingError::HostNotFound(address.to_owned()))?;

        host.inc_load();
        self.total_load.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    /// Decrements the load of the given host.
    ///
    /// Calls are expected to pair up with [`inc_load()`](Self::inc_load),
    /// this is not enforced.
    pub fn dec_load(&self, address: &str) -> RingResult<()> {
        let topology = self.topology.read();
        let host = topology
            .hosts
            .get(address)
            .ok_or_else(|| RingError::HostNotFound(address.to_owned()))?;

        host.dec_load();
        self.total_load.fetch_sub(1, Ordering::AcqRel);
        Ok(())
    }

    /// Charges the given host with one unit of load, released once the
    /// returned guard is dropped.
    pub fn acquire(&self, address: &str) -> RingResult<LoadGuard<'_, H>> {
        let topology = self.topology.read();
        let host = topology
            .hosts
            .get(address)
            .ok_or_else(|| RingError::HostNotFound(address.to_owned()))?;

        Ok(self.charge(host))
    }

    /// Selects a host for the key respecting the load ceiling, and charges it
    /// with one unit of load.
    ///
    /// Selection and accounting happen under the same lock, so the topology
    /// cannot change in between.
    pub fn acquire_least(&self, key: &str) -> RingResult<LoadGuard<'_, H>> {
        let topology = self.topology.read();
        let host = self.select_least(&topology, key)?;

        Ok(self.charge(host))
    }

    /// Snapshot of current loads of all registered hosts.
    pub fn get_loads(&self) -> HashMap<String, i64> {
        self.topology
            .read()
            .hosts
            .iter()
            .map(|host| (host.address().to_owned(), host.load()))
            .collect()
    }

    /// Current load of the given host.
    pub fn load(&self, address: &str) -> RingResult<i64> {
        self.topology
            .read()
            .hosts
            .get(address)
            .map(|host| host.load())
            .ok_or_else(|| RingError::HostNotFound(address.to_owned()))
    }

    /// Sum of loads of all registered hosts.
    pub fn total_load(&self) -> i64 {
        self.total_load.load(Ordering::Acquire)
    }

    /// Maximum load a single host may currently carry.
    ///
    /// Returns `None` if no host is registered.
    pub fn max_load(&self) -> Option<i64> {
        let host_count = self.topology.read().hosts.len();
        self.load_bound.ceiling(self.total_load(), host_count)
    }

    /// Position of a key on the ring.
    pub fn position(&self, key: &str) -> Position {
        self.hasher.hash(key.as_bytes())
    }

    /// Snapshot of all virtual node positions, sorted ascending.
    pub fn positions(&self) -> Vec<Position> {
        self.topology.read().sorted.clone()
    }

    /// Addresses of all registered hosts, sorted.
    pub fn hosts(&self) -> Vec<String> {
        let mut addresses: Vec<String> = self
            .topology
            .read()
            .hosts
            .iter()
            .map(|host| host.address().to_owned())
            .collect();
        addresses.sort_unstable();
        addresses
    }

    pub fn contains(&self, address: &str) -> bool {
        self.topology.read().hosts.contains(address)
    }

    /// Number of registered hosts.
    pub fn len(&self) -> usize {
        self.topology.read().hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topology.read().hosts.is_empty()
    }

    /// Number of virtual nodes per host.
    pub fn replicas(&self) -> usize {
        self.replicas
    }

    pub fn load_factor(&self) -> f64 {
        self.load_bound.factor()
    }

    /// Topology version.
    ///
    /// Incremented on every successful registration or unregistration.
    pub fn version(&self) -> u64 {
        self.topology.read().hosts.version()
    }

    /// Charges a registered host with one unit of load.
    ///
    /// Must be called with the topology lock held, so that the host cannot be
    /// unregistered in between.
    fn charge(&self, host: &Arc<Host>) -> LoadGuard<'_, H> {
        host.inc_load();
        self.total_load.fetch_add(1, Ordering::AcqRel);
        LoadGuard {
            ring: self,
            host: Arc::clone(host),
        }
    }

    /// Releases a unit of load taken with [`charge()`](Self::charge).
    ///
    /// Returns `false` if the host is no longer registered: its load left the
    /// ring together with it, even if another host took over the address.
    fn release(&self, host: &Arc<Host>) -> bool {
        let topology = self.topology.read();
        match topology.hosts.get(host.address()) {
            Some(current) if Arc::ptr_eq(current, host) => {
                host.dec_load();
                self.total_load.fetch_sub(1, Ordering::AcqRel);
                true
            }
            _ => false,
        }
    }

    fn virtual_nodes(&self, address: &str) -> Vec<Position> {
        (0..self.replicas)
            .map(|i| self.hasher.hash(format!("{address}{i}").as_bytes()))
            .collect()
    }

    /// Walks the ring from the key's position until a host with headroom is
    /// found.
    ///
    /// As long as load updates are paired, the least loaded host always has
    /// headroom, so the walk ends within one lap. Concurrent load updates may
    /// only delay that.
    fn select_least<'a>(&self, topology: &'a Topology, key: &str) -> RingResult<&'a Arc<Host>> {
        let not_found = || RingError::HostNotFound(key.to_owned());
        let start = topology.search(self.position(key)).ok_or_else(not_found)?;
        let host_count = topology.hosts.len();

        let mut idx = start;
        loop {
            let ceiling = self
                .load_bound
                .ceiling(self.total_load(), host_count)
                .ok_or_else(not_found)?;
            let host = topology.host_at(idx)?;
            let load = host.load();
            if load < ceiling {
                return Ok(host);
            }

            debug!(
                address = host.address(),
                load,
                ceiling,
                "host is over capacity, probing next"
            );
            idx = (idx + 1) % topology.sorted.len();
        }
    }
}

/// Unit of load charged to a host.
///
/// Released (the host load decremented) when dropped.
#[must_use = "load is released as soon as the guard is dropped"]
pub struct LoadGuard<'a, H: KeyHasher> {
    ring: &'a HashRing<H>,
    host: Arc<Host>,
}

impl<H: KeyHasher> LoadGuard<'_, H> {
    /// Address of the charged host.
    pub fn address(&self) -> &str {
        self.host.address()
    }
}

impl<H: KeyHasher> fmt::Debug for LoadGuard<'_, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadGuard")
            .field("address", &self.host.address())
            .finish_non_exhaustive()
    }
}

impl<H: KeyHasher> Drop for LoadGuard<'_, H> {
    fn drop(&mut self) {
        if !self.ring.release(&self.host) {
            debug!(
                address = self.host.address(),
                "load released after host was unregistered"
            );
        }
    }
}
