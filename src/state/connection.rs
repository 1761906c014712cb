//! Connection identity.
//!
//! The transport hands every live connection an opaque handle. The session
//! model never looks inside it; it only compares handles and uses them as map
//! keys when binding a connection to a session.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque handle for one live transport connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Hands out connection handles that are unique for the process lifetime.
#[derive(Debug)]
pub struct ConnectionIds {
    next: AtomicU64,
}

impl Default for ConnectionIds {
    fn default() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }
}

impl ConnectionIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next handle.
    pub fn allocate(&self) -> ConnectionId {
        ConnectionId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}
