//! Resolve, validate, and arrange candidates for one connection cycle.
//!
//! A reconnecting client runs one cycle per attempt round:
//!
//! ```text
//! resolve() ──▶ reject empty ──▶ arrange() ──▶ try each in order
//!                                                  │
//!                              first success ◀─────┤
//!                                                  ▼
//!                                exhausted: caller backs off, runs again
//! ```
//!
//! Backoff between cycles belongs to the caller. Each cycle re-resolves, so
//! cluster membership changes are picked up on the next round.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::address::Address;
use crate::error::{ResolutionError, Result};
use crate::ordering::{OrderingPolicy, RandomShuffle};
use crate::resolver::AddressResolver;

/// A resolver paired with an ordering policy.
///
/// Cheap to clone; clones share the same resolver and policy.
#[derive(Clone)]
pub struct EndpointStrategy {
    resolver: Arc<dyn AddressResolver>,
    policy: Arc<dyn OrderingPolicy>,
}

impl EndpointStrategy {
    /// Creates a strategy from a resolver and an ordering policy.
    pub fn new(
        resolver: impl AddressResolver + 'static,
        policy: impl OrderingPolicy + 'static,
    ) -> Self {
        Self::from_parts(Arc::new(resolver), Arc::new(policy))
    }

    /// Creates a strategy that shuffles candidates randomly.
    pub fn shuffled(resolver: impl AddressResolver + 'static) -> Self {
        Self::new(resolver, RandomShuffle::new())
    }

    /// Creates a strategy from shared parts.
    #[must_use]
    pub fn from_parts(
        resolver: Arc<dyn AddressResolver>,
        policy: Arc<dyn OrderingPolicy>,
    ) -> Self {
        Self { resolver, policy }
    }

    /// Returns the resolver.
    #[must_use]
    pub fn resolver(&self) -> &Arc<dyn AddressResolver> {
        &self.resolver
    }

    /// Returns the ordering policy.
    #[must_use]
    pub fn policy(&self) -> &Arc<dyn OrderingPolicy> {
        &self.policy
    }

    /// Resolves and arranges the candidates for one cycle.
    ///
    /// Calls the resolver once and the policy once.
    ///
    /// # Errors
    ///
    /// Returns the resolver's error, or [`ResolutionError::EmptyResult`] if
    /// the resolver produced no candidates.
    pub fn candidates(&self) -> Result<Vec<Address>> {
        let source = self.resolver.describe();

        let resolved = self.resolver.resolve().inspect_err(|e| {
            warn!(source = %source, error = %e, "Address resolution failed");
        })?;

        if resolved.is_empty() {
            warn!(source = %source, "Address resolution yielded no candidates");
            return Err(ResolutionError::EmptyResult(source));
        }

        let arranged = self.policy.arrange(&resolved);
        debug!(
            source = %source,
            count = arranged.len(),
            first = ?arranged.first(),
            "Resolved connection candidates"
        );
        Ok(arranged)
    }

    /// Runs one cycle: tries each candidate in order with `connect`.
    ///
    /// Stops at the first success and returns it along with the address it
    /// connected to. Does not sleep or retry; the caller decides when to
    /// start the next cycle.
    ///
    /// # Errors
    ///
    /// Returns [`CycleError::Resolution`] if no candidates could be produced
    /// and [`CycleError::Exhausted`] if every candidate failed.
    pub fn try_each<T, E, F>(
        &self,
        mut connect: F,
    ) -> std::result::Result<(Address, T), CycleError<E>>
    where
        F: FnMut(&Address) -> std::result::Result<T, E>,
        E: fmt::Display,
    {
        let candidates = self.candidates()?;

        let mut failures = Vec::with_capacity(candidates.len());
        for address in candidates {
            trace!(address = %address, "Attempting connection");
            match connect(&address) {
                Ok(value) => {
                    debug!(address = %address, failed = failures.len(), "Connected");
                    return Ok((address, value));
                }
                Err(error) => {
                    debug!(address = %address, error = %error, "Connection attempt failed");
                    failures.push(FailedAttempt { address, error });
                }
            }
        }

        warn!(attempts = failures.len(), "All connection candidates failed");
        Err(CycleError::Exhausted(failures))
    }
}

impl fmt::Debug for EndpointStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointStrategy")
            .field("resolver", &self.resolver.describe())
            .finish_non_exhaustive()
    }
}

/// One failed connection attempt within a cycle.
#[derive(Debug)]
pub struct FailedAttempt<E> {
    /// Address that was tried.
    pub address: Address,
    /// Error the connect function returned.
    pub error: E,
}

/// Outcome of a cycle that did not connect.
#[derive(Debug)]
pub enum CycleError<E> {
    /// No candidates could be produced.
    Resolution(ResolutionError),
    /// Every candidate was tried and failed, in attempt order.
    Exhausted(Vec<FailedAttempt<E>>),
}

impl<E> CycleError<E> {
    /// Returns the failed attempts, empty if resolution failed.
    #[must_use]
    pub fn attempts(&self) -> &[FailedAttempt<E>] {
        match self {
            Self::Resolution(_) => &[],
            Self::Exhausted(attempts) => attempts,
        }
    }
}

impl<E> From<ResolutionError> for CycleError<E> {
    fn from(err: ResolutionError) -> Self {
        Self::Resolution(err)
    }
}

impl<E: fmt::Display> fmt::Display for CycleError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolution(err) => write!(f, "resolution failed: {err}"),
            Self::Exhausted(attempts) => {
                write!(f, "all {} candidate addresses failed", attempts.len())?;
                if let Some(last) = attempts.last() {
                    write!(f, " (last: {}: {})", last.address, last.error)?;
                }
                Ok(())
            }
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for CycleError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Resolution(err) => Some(err),
            Self::Exhausted(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ordering::NoShuffle;
    use crate::resolver::StaticResolver;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn two_nodes() -> Vec<Address> {
        vec![Address::new("a", 5672), Address::new("b", 5672)]
    }

    struct Empty;

    impl AddressResolver for Empty {
        fn resolve(&self) -> Result<Vec<Address>> {
            Ok(Vec::new())
        }

        fn describe(&self) -> String {
            "empty".to_string()
        }
    }

    struct Unreachable;

    impl AddressResolver for Unreachable {
        fn resolve(&self) -> Result<Vec<Address>> {
            Err(ResolutionError::lookup(
                "_amqp._tcp.mq",
                std::io::Error::from(std::io::ErrorKind::TimedOut),
            ))
        }
    }

    /// Policy that counts calls and reverses its input.
    #[derive(Default)]
    struct CountingReverse {
        calls: AtomicUsize,
    }

    impl OrderingPolicy for CountingReverse {
        fn arrange(&self, candidates: &[Address]) -> Vec<Address> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            candidates.iter().rev().cloned().collect()
        }
    }

    // ==================== Candidate Tests ====================

    #[test]
    fn test_candidates_static_no_shuffle() {
        let strategy = EndpointStrategy::new(StaticResolver::new(two_nodes()), NoShuffle);
        assert_eq!(strategy.candidates().unwrap(), two_nodes());
    }

    #[test]
    fn test_candidates_shuffled_is_permutation() {
        let strategy = EndpointStrategy::shuffled(StaticResolver::new(two_nodes()));
        let mut candidates = strategy.candidates().unwrap();
        candidates.sort();
        assert_eq!(candidates, two_nodes());
    }

    #[test]
    fn test_candidates_rejects_empty_resolution() {
        let strategy = EndpointStrategy::new(Empty, NoShuffle);

        let err = strategy.candidates().unwrap_err();
        assert!(err.is_empty_result());
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_candidates_rejects_empty_static_list() {
        let strategy = EndpointStrategy::new(StaticResolver::new([]), NoShuffle);
        assert!(strategy.candidates().unwrap_err().is_empty_result());
    }

    #[test]
    fn test_candidates_surfaces_lookup_failure() {
        let strategy = EndpointStrategy::new(Unreachable, NoShuffle);
        assert!(matches!(
            strategy.candidates(),
            Err(ResolutionError::Lookup { .. })
        ));
    }

    #[test]
    fn test_policy_runs_once_per_cycle_and_not_on_failure() {
        let policy = Arc::new(CountingReverse::default());

        let ok = EndpointStrategy::from_parts(
            Arc::new(StaticResolver::new(two_nodes())),
            Arc::clone(&policy) as Arc<dyn OrderingPolicy>,
        );
        let arranged = ok.candidates().unwrap();
        assert_eq!(arranged, vec![Address::new("b", 5672), Address::new("a", 5672)]);
        assert_eq!(policy.calls.load(Ordering::SeqCst), 1);

        let failing = EndpointStrategy::from_parts(
            Arc::new(Unreachable),
            Arc::clone(&policy) as Arc<dyn OrderingPolicy>,
        );
        assert!(failing.candidates().is_err());

        let empty = EndpointStrategy::from_parts(
            Arc::new(Empty),
            Arc::clone(&policy) as Arc<dyn OrderingPolicy>,
        );
        assert!(empty.candidates().is_err());

        assert_eq!(policy.calls.load(Ordering::SeqCst), 1);
    }

    // ==================== Cycle Tests ====================

    #[test]
    fn test_try_each_stops_at_first_success() {
        let nodes = vec![
            Address::new("a", 5672),
            Address::new("b", 5672),
            Address::new("c", 5672),
        ];
        let strategy = EndpointStrategy::new(StaticResolver::new(nodes), NoShuffle);

        let mut tried = Vec::new();
        let (address, value) = strategy
            .try_each(|address| {
                tried.push(address.clone());
                if address.host() == "b" {
                    Ok(42)
                } else {
                    Err("connection refused")
                }
            })
            .unwrap();

        assert_eq!(address, Address::new("b", 5672));
        assert_eq!(value, 42);
        assert_eq!(tried, vec![Address::new("a", 5672), Address::new("b", 5672)]);
    }

    #[test]
    fn test_try_each_exhausted_lists_every_failure() {
        let strategy = EndpointStrategy::new(StaticResolver::new(two_nodes()), NoShuffle);

        let err = strategy
            .try_each(|address| -> std::result::Result<(), String> {
                Err(format!("refused by {}", address.host()))
            })
            .unwrap_err();

        let attempts = err.attempts();
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[0].address, Address::new("a", 5672));
        assert_eq!(attempts[1].error, "refused by b");
        assert_eq!(
            err.to_string(),
            "all 2 candidate addresses failed (last: b:5672: refused by b)"
        );
    }

    #[test]
    fn test_try_each_resolution_failure_attempts_nothing() {
        let strategy = EndpointStrategy::new(Unreachable, NoShuffle);

        let mut attempts = 0;
        let err = strategy
            .try_each(|_| -> std::result::Result<(), String> {
                attempts += 1;
                Ok(())
            })
            .unwrap_err();

        assert_eq!(attempts, 0);
        assert!(matches!(err, CycleError::Resolution(_)));
        assert!(err.attempts().is_empty());
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_debug_shows_source() {
        let strategy = EndpointStrategy::shuffled(StaticResolver::new(two_nodes()));
        let debug = format!("{strategy:?}");
        assert!(debug.contains("static list of 2"));
    }
}
