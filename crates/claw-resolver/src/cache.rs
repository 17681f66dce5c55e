//! TTL cache in front of a slow resolver.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::address::Address;
use crate::error::Result;
use crate::resolver::AddressResolver;

#[derive(Debug)]
struct Snapshot {
    addresses: Arc<[Address]>,
    fetched_at: Instant,
}

/// Caches the last successful, non-empty answer of another resolver.
///
/// The cached list is swapped as a whole under a write lock, so concurrent
/// callers see either the old snapshot or the new one. Failed or empty
/// lookups are passed through to the caller and leave the cache as it was.
/// Concurrent misses may each query the inner resolver.
#[derive(Debug)]
pub struct CachingResolver<R> {
    inner: R,
    ttl: Duration,
    snapshot: RwLock<Option<Snapshot>>,
}

impl<R: AddressResolver> CachingResolver<R> {
    /// Wraps `inner`, reusing its answers for `ttl`.
    #[must_use]
    pub fn new(inner: R, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            snapshot: RwLock::new(None),
        }
    }

    /// Returns the time-to-live for cached answers.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the wrapped resolver.
    #[must_use]
    pub fn inner(&self) -> &R {
        &self.inner
    }

    /// Drops the cached answer so the next call queries the inner resolver.
    pub fn invalidate(&self) {
        *self.snapshot.write() = None;
    }

    /// Returns true if a fresh answer is cached.
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        self.fresh().is_some()
    }

    fn fresh(&self) -> Option<Arc<[Address]>> {
        let guard = self.snapshot.read();
        guard
            .as_ref()
            .filter(|s| s.fetched_at.elapsed() < self.ttl)
            .map(|s| Arc::clone(&s.addresses))
    }
}

impl<R: AddressResolver> AddressResolver for CachingResolver<R> {
    fn resolve(&self) -> Result<Vec<Address>> {
        if let Some(addresses) = self.fresh() {
            trace!(source = %self.inner.describe(), "Serving cached addresses");
            return Ok(addresses.to_vec());
        }

        let addresses = self.inner.resolve()?;
        if addresses.is_empty() {
            return Ok(addresses);
        }

        debug!(
            source = %self.inner.describe(),
            count = addresses.len(),
            ttl_ms = self.ttl.as_millis() as u64,
            "Refreshed cached addresses"
        );
        *self.snapshot.write() = Some(Snapshot {
            addresses: addresses.as_slice().into(),
            fetched_at: Instant::now(),
        });

        Ok(addresses)
    }

    fn describe(&self) -> String {
        format!("cached {}", self.inner.describe())
    }
}
