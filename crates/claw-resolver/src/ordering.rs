//! Ordering policies that decide the order candidates are tried in.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::address::Address;

/// Arranges resolved candidates into the order they will be attempted.
///
/// Implementations must return a new list holding exactly the same
/// addresses as the input (same length, same multiset) and must not fail.
pub trait OrderingPolicy: Send + Sync {
    /// Returns the candidates in attempt order.
    fn arrange(&self, candidates: &[Address]) -> Vec<Address>;
}

impl<T: OrderingPolicy + ?Sized> OrderingPolicy for Arc<T> {
    fn arrange(&self, candidates: &[Address]) -> Vec<Address> {
        (**self).arrange(candidates)
    }
}

impl<T: OrderingPolicy + ?Sized> OrderingPolicy for Box<T> {
    fn arrange(&self, candidates: &[Address]) -> Vec<Address> {
        (**self).arrange(candidates)
    }
}

#[derive(Debug, Default)]
enum RandomSource {
    #[default]
    ThreadLocal,
    Seeded(Mutex<StdRng>),
}

/// Uniformly random permutation of the candidates.
///
/// This is the default policy: across many clients reconnecting at once it
/// spreads first attempts over every node instead of piling onto the first
/// configured one.
#[derive(Debug, Default)]
pub struct RandomShuffle {
    source: RandomSource,
}

impl RandomShuffle {
    /// Creates a policy backed by the thread-local generator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a policy with a reproducible sequence of permutations.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    /// Creates a policy backed by the given generator.
    #[must_use]
    pub fn from_rng(rng: StdRng) -> Self {
        Self {
            source: RandomSource::Seeded(Mutex::new(rng)),
        }
    }

    /// Returns true if this policy uses a caller-provided generator.
    #[must_use]
    pub fn is_seeded(&self) -> bool {
        matches!(self.source, RandomSource::Seeded(_))
    }

    fn shuffle(&self, list: &mut [Address]) {
        match &self.source {
            RandomSource::ThreadLocal => list.shuffle(&mut rand::thread_rng()),
            RandomSource::Seeded(rng) => list.shuffle(&mut *rng.lock()),
        }
    }
}

impl OrderingPolicy for RandomShuffle {
    fn arrange(&self, candidates: &[Address]) -> Vec<Address> {
        let mut arranged = candidates.to_vec();
        self.shuffle(&mut arranged);
        arranged
    }
}

/// Keeps the resolver's order untouched.
///
/// Useful when the candidate source already encodes a preference, such as
/// SRV priority or a primary listed first.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoShuffle;

impl OrderingPolicy for NoShuffle {
    fn arrange(&self, candidates: &[Address]) -> Vec<Address> {
        candidates.to_vec()
    }
}

/// Tries designated primaries first, then the rest in random order.
///
/// Primaries appear in the order they were given. A primary missing from
/// the resolved candidates is skipped.
#[derive(Debug)]
pub struct PrimaryFirst {
    primaries: Vec<Address>,
    rest: RandomShuffle,
}

impl PrimaryFirst {
    /// Creates a policy pinning `primaries` to the front.
    #[must_use]
    pub fn new(primaries: impl IntoIterator<Item = Address>) -> Self {
        Self::with_shuffle(primaries, RandomShuffle::new())
    }

    /// Creates a policy using `rest` to order the non-primary candidates.
    #[must_use]
    pub fn with_shuffle(
        primaries: impl IntoIterator<Item = Address>,
        rest: RandomShuffle,
    ) -> Self {
        let mut seen = HashSet::new();
        let primaries = primaries
            .into_iter()
            .filter(|a| seen.insert(a.clone()))
            .collect();
        Self { primaries, rest }
    }

    /// Returns the pinned addresses.
    #[must_use]
    pub fn primaries(&self) -> &[Address] {
        &self.primaries
    }
}

impl OrderingPolicy for PrimaryFirst {
    fn arrange(&self, candidates: &[Address]) -> Vec<Address> {
        let pinned: HashSet<&Address> = self.primaries.iter().collect();

        let mut arranged = Vec::with_capacity(candidates.len());
        for primary in &self.primaries {
            arranged.extend(candidates.iter().filter(|c| *c == primary).cloned());
        }

        let mut rest: Vec<Address> = candidates
            .iter()
            .filter(|c| !pinned.contains(c))
            .cloned()
            .collect();
        self.rest.shuffle(&mut rest);

        arranged.extend(rest);
        arranged
    }
}
