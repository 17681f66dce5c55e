//! # claw-resolver
//!
//! Broker endpoint resolution for Clawbernetes messaging clients.
//!
//! A client talking to a clustered message broker should not hard-code one
//! node. On first connect and after every connection loss it asks this crate
//! which nodes to try and in which order:
//!
//! - **Address resolvers** - produce the current candidate list from a static
//!   list, DNS host records, DNS SRV records, or a custom source
//! - **Ordering policies** - arrange the candidates; random by default so
//!   reconnecting clients spread across nodes
//! - **Endpoint strategy** - resolve, reject empty results, arrange, and
//!   walk the candidates for one connection cycle
//!
//! ## Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    Endpoint Strategy                     │
//! │                                                          │
//! │  ┌──────────────┐    ┌──────────────┐   ┌─────────────┐  │
//! │  │   Address    │    │   Ordering   │   │  Connect    │  │
//! │  │   Resolver   │───▶│    Policy    │──▶│  each in    │  │
//! │  └──────────────┘    └──────────────┘   │  order      │  │
//! │   static / dns / srv  random / none /   └─────────────┘  │
//! │   (optionally cached) primary-first                      │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use claw_resolver::{Address, EndpointStrategy, StaticResolver};
//!
//! let resolver = StaticResolver::new([
//!     Address::new("rabbit-1", 5672),
//!     Address::new("rabbit-2", 5672),
//! ]);
//! let strategy = EndpointStrategy::shuffled(resolver);
//!
//! // One connection cycle: candidates arrive in random order
//! let candidates = strategy.candidates().expect("candidates");
//! assert_eq!(candidates.len(), 2);
//! ```
//!
//! ## Custom Strategies
//!
//! Both extension points are small traits. A policy that always prefers the
//! lowest port, for example:
//!
//! ```rust
//! use claw_resolver::{Address, EndpointStrategy, OrderingPolicy, StaticResolver};
//!
//! struct LowestPortFirst;
//!
//! impl OrderingPolicy for LowestPortFirst {
//!     fn arrange(&self, candidates: &[Address]) -> Vec<Address> {
//!         let mut arranged = candidates.to_vec();
//!         arranged.sort_by_key(Address::port);
//!         arranged
//!     }
//! }
//!
//! let resolver = StaticResolver::new([Address::new("b", 5673), Address::new("a", 5672)]);
//! let strategy = EndpointStrategy::new(resolver, LowestPortFirst);
//! assert_eq!(strategy.candidates().expect("candidates")[0].port(), 5672);
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use claw_resolver::{EndpointStrategy, ResolverConfig};
//!
//! let config = ResolverConfig::from_json(
//!     r#"{ "source": { "type": "static", "addresses": ["rabbit-1", "rabbit-2:5673"] },
//!          "ordering": { "type": "seeded", "seed": 7 } }"#,
//! )
//! .expect("config");
//! let strategy = EndpointStrategy::from_config(&config).expect("strategy");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod address;
pub mod cache;
pub mod config;
pub mod dns;
pub mod error;
pub mod ordering;
pub mod resolver;
pub mod strategy;

// Re-export main types for convenience
pub use address::{
    Address, AddressParseError, DEFAULT_AMQP_PORT, DEFAULT_AMQP_TLS_PORT, default_port,
};
pub use cache::CachingResolver;
pub use config::{ConfigError, OrderingConfig, ResolverConfig, SourceConfig};
pub use dns::{DnsHostResolver, HostLookup, SrvLookup, SrvRecord, SrvResolver, SystemLookup};
pub use error::ResolutionError;
pub use ordering::{NoShuffle, OrderingPolicy, PrimaryFirst, RandomShuffle};
pub use resolver::{AddressResolver, StaticResolver};
pub use strategy::{CycleError, EndpointStrategy, FailedAttempt};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::address::Address;
    pub use crate::error::ResolutionError;
    pub use crate::ordering::{NoShuffle, OrderingPolicy, RandomShuffle};
    pub use crate::resolver::{AddressResolver, StaticResolver};
    pub use crate::strategy::EndpointStrategy;
}

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
