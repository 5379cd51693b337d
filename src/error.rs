/// Errors returned by the hash ring.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RingError {
    /// Host with the same address is already registered.
    #[error("Host already exists: {0}")]
    HostAlreadyExists(String),

    /// Unknown host address, or no host at all to route a key to.
    #[error("Host not found: {0}")]
    HostNotFound(String),

    /// Virtual node of a registering host lands on an occupied position.
    #[error("Virtual node of {address} collides with {owner} at position {position}")]
    PositionCollision {
        address: String,
        position: u64,
        owner: String,
    },
}

pub type RingResult<T> = Result<T, RingError>;
