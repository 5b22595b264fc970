use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{Components, Config, Error, FlakeId, Minter, StdSystemTime, TimeSource};

/// A cloneable handle that serializes calls to one [`Minter`] across threads.
///
/// Clones share the same minter, so identifiers from all clones are unique and follow the order
/// in which the calls acquired the lock.
#[derive(Debug)]
pub struct SharedMinter<T = StdSystemTime> {
    inner: Arc<Mutex<Minter<T>>>,
}

impl<T> Clone for SharedMinter<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl SharedMinter<StdSystemTime> {
    /// Creates a shared minter with the default configuration and the system clock.
    pub fn new(node_id: i64) -> Result<Self, Error> {
        Minter::new(node_id).map(Self::from)
    }

    /// Creates a shared minter from a configuration and the system clock.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        Minter::from_config(config, StdSystemTime).map(Self::from)
    }
}

impl<T: TimeSource> SharedMinter<T> {
    /// Generates a new identifier while holding the lock.
    pub fn generate(&self) -> Result<FlakeId, Error> {
        self.lock().generate()
    }

    /// Decomposes an identifier, measuring time from the epoch of the shared minter.
    pub fn parse(&self, id: u64) -> Components {
        self.lock().parse(id)
    }
}

impl<T> SharedMinter<T> {
    /// Returns the node ID.
    pub fn node_id(&self) -> u16 {
        self.lock().node_id()
    }

    /// Locks the minter.
    ///
    /// A poisoned lock is taken over as is: the minter writes its state only after every check
    /// has passed, so a panicking holder cannot leave it half-updated.
    fn lock(&self) -> MutexGuard<'_, Minter<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> From<Minter<T>> for SharedMinter<T> {
    fn from(minter: Minter<T>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(minter)),
        }
    }
}
