//! The address provider contract and the static list provider.

use std::sync::Arc;

use tracing::trace;

use crate::address::{self, Address};
use crate::error::Result;

/// Produces the current set of broker addresses to try.
///
/// Called once per connect or reconnect cycle, possibly from several
/// threads at once. Each call returns a fresh list that the caller owns;
/// implementations must keep source order (configuration order, DNS answer
/// order) intact so deterministic ordering policies can rely on it.
pub trait AddressResolver: Send + Sync {
    /// Returns the candidate addresses.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying source cannot be consulted.
    fn resolve(&self) -> Result<Vec<Address>>;

    /// Short human-readable description of the source, used in logs and
    /// error messages.
    fn describe(&self) -> String {
        "custom resolver".to_string()
    }
}

impl<T: AddressResolver + ?Sized> AddressResolver for Arc<T> {
    fn resolve(&self) -> Result<Vec<Address>> {
        (**self).resolve()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

impl<T: AddressResolver + ?Sized> AddressResolver for Box<T> {
    fn resolve(&self) -> Result<Vec<Address>> {
        (**self).resolve()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Resolver over a fixed list of addresses.
///
/// Always returns the list it was built with, in the same order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticResolver {
    addresses: Arc<[Address]>,
}

impl StaticResolver {
    /// Creates a resolver over the given addresses.
    #[must_use]
    pub fn new(addresses: impl IntoIterator<Item = Address>) -> Self {
        Self {
            addresses: addresses.into_iter().collect(),
        }
    }

    /// Creates a resolver from a comma separated address list.
    ///
    /// # Errors
    ///
    /// Returns an error if any entry fails to parse.
    pub fn parse(list: &str, default_port: u16) -> address::Result<Self> {
        Ok(Self::new(Address::parse_list(list, default_port)?))
    }

    /// Returns the configured addresses.
    #[must_use]
    pub fn addresses(&self) -> &[Address] {
        &self.addresses
    }
}

impl AddressResolver for StaticResolver {
    fn resolve(&self) -> Result<Vec<Address>> {
        trace!(count = self.addresses.len(), "Returning static address list");
        Ok(self.addresses.to_vec())
    }

    fn describe(&self) -> String {
        format!("static list of {}", self.addresses.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResolutionError;

    fn two_nodes() -> Vec<Address> {
        vec![Address::new("a", 5672), Address::new("b", 5672)]
    }

    #[test]
    fn test_static_returns_configured_list_every_call() {
        let resolver = StaticResolver::new(two_nodes());

        for _ in 0..5 {
            assert_eq!(resolver.resolve().unwrap(), two_nodes());
        }
    }

    #[test]
    fn test_static_result_is_a_snapshot() {
        let resolver = StaticResolver::new(two_nodes());

        let mut first = resolver.resolve().unwrap();
        first.reverse();
        first.push(Address::new("c", 5672));

        assert_eq!(resolver.resolve().unwrap(), two_nodes());
        assert_eq!(resolver.addresses(), two_nodes().as_slice());
    }

    #[test]
    fn test_static_parse() {
        let resolver = StaticResolver::parse("a, b:5673", 5671).unwrap();
        assert_eq!(
            resolver.addresses(),
            &[Address::new("a", 5671), Address::new("b", 5673)]
        );
        assert!(StaticResolver::parse("a:nope", 5672).is_err());
    }

    #[test]
    fn test_describe() {
        assert_eq!(StaticResolver::new(two_nodes()).describe(), "static list of 2");
    }

    struct Failing;

    impl AddressResolver for Failing {
        fn resolve(&self) -> Result<Vec<Address>> {
            Err(ResolutionError::InvalidConfig("broken".to_string()))
        }
    }

    #[test]
    fn test_boxed_and_shared_resolvers_delegate() {
        let boxed: Box<dyn AddressResolver> = Box::new(StaticResolver::new(two_nodes()));
        assert_eq!(boxed.resolve().unwrap(), two_nodes());

        let shared: Arc<dyn AddressResolver> = Arc::new(Failing);
        assert!(shared.resolve().is_err());
        assert_eq!(shared.describe(), "custom resolver");
    }

    #[test]
    fn test_concurrent_resolve() {
        let resolver = StaticResolver::new(two_nodes());

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..100 {
                        assert_eq!(resolver.resolve().unwrap(), two_nodes());
                    }
                });
            }
        });
    }
}
