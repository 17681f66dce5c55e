//! Resolver configuration.
//!
//! A [`ResolverConfig`] is a plain value: build it in code or load it from
//! JSON, validate it, then turn it into an [`EndpointStrategy`]. Nothing is
//! read from the process environment.
//!
//! ```json
//! {
//!   "source": { "type": "static", "addresses": ["rabbit-1", "rabbit-2:5673"] },
//!   "tls": false,
//!   "ordering": { "type": "seeded", "seed": 7 },
//!   "cache_ttl_secs": null
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::address::{self, Address, AddressParseError};
use crate::cache::CachingResolver;
use crate::dns::DnsHostResolver;
use crate::ordering::{NoShuffle, OrderingPolicy, PrimaryFirst, RandomShuffle};
use crate::resolver::{AddressResolver, StaticResolver};
use crate::strategy::EndpointStrategy;

/// Errors in resolver configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A static source lists no addresses.
    #[error("static address list is empty")]
    NoAddresses,

    /// An address failed to parse.
    #[error("invalid address: {0}")]
    InvalidAddress(#[from] AddressParseError),

    /// A DNS source has no host name.
    #[error("DNS source requires a host name")]
    EmptyDnsHost,

    /// A cache TTL of zero seconds was given.
    #[error("cache TTL must be greater than zero")]
    ZeroCacheTtl,

    /// The configuration could not be parsed.
    #[error("failed to parse resolver configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Where candidate addresses come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    /// A fixed list of `host[:port]` entries.
    Static {
        /// Addresses in preference order.
        addresses: Vec<String>,
    },
    /// Every IP behind one DNS name.
    Dns {
        /// Host name to look up.
        host: String,
        /// Port for every resolved IP; the transport default if absent.
        #[serde(default)]
        port: Option<u16>,
    },
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self::Static {
            addresses: vec!["localhost".to_string()],
        }
    }
}

/// How candidates are ordered before each cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderingConfig {
    /// Uniform random order from the thread-local generator.
    #[default]
    Random,
    /// Random order from a seeded generator, reproducible across runs.
    Seeded {
        /// Generator seed.
        seed: u64,
    },
    /// Keep source order.
    #[serde(rename = "none")]
    Unshuffled,
    /// Pin these addresses first, shuffle the rest.
    PrimaryFirst {
        /// Addresses to try first, in order.
        primaries: Vec<String>,
    },
}

/// Configuration for building an [`EndpointStrategy`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ResolverConfig {
    /// Candidate source.
    pub source: SourceConfig,
    /// Use TLS default ports (5671) instead of plain ones (5672).
    pub tls: bool,
    /// Ordering policy.
    pub ordering: OrderingConfig,
    /// Cache resolved addresses for this many seconds.
    pub cache_ttl_secs: Option<u64>,
}

impl ResolverConfig {
    /// Creates a static configuration from `host[:port]` entries.
    #[must_use]
    pub fn with_addresses<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            source: SourceConfig::Static {
                addresses: addresses.into_iter().map(Into::into).collect(),
            },
            ..Self::default()
        }
    }

    /// Creates a DNS host configuration.
    #[must_use]
    pub fn with_dns(host: impl Into<String>, port: Option<u16>) -> Self {
        Self {
            source: SourceConfig::Dns {
                host: host.into(),
                port,
            },
            ..Self::default()
        }
    }

    /// Sets the ordering policy.
    #[must_use]
    pub fn ordering(mut self, ordering: OrderingConfig) -> Self {
        self.ordering = ordering;
        self
    }

    /// Enables or disables TLS default ports.
    #[must_use]
    pub fn tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    /// Sets the cache TTL.
    ///
    /// The TTL is stored in whole seconds; a partial second rounds up.
    #[must_use]
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        let partial = u64::from(ttl.subsec_nanos() > 0);
        self.cache_ttl_secs = Some(ttl.as_secs().saturating_add(partial));
        self
    }

    /// Parses and validates a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the configuration is
    /// invalid.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Returns the port used for addresses without one.
    #[must_use]
    pub fn default_port(&self) -> u16 {
        address::default_port(self.tls)
    }

    /// Returns the cache TTL, if caching is enabled.
    #[must_use]
    pub fn cache_ttl_duration(&self) -> Option<Duration> {
        self.cache_ttl_secs.map(Duration::from_secs)
    }

    /// Checks the configuration without building anything.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<()> {
        match &self.source {
            SourceConfig::Static { addresses } => {
                self.parse_addresses(addresses)?;
            }
            SourceConfig::Dns { host, .. } => {
                if host.trim().is_empty() {
                    return Err(ConfigError::EmptyDnsHost);
                }
            }
        }

        if let OrderingConfig::PrimaryFirst { primaries } = &self.ordering {
            for primary in primaries {
                Address::parse_with_default(primary, self.default_port())?;
            }
        }

        if self.cache_ttl_secs == Some(0) {
            return Err(ConfigError::ZeroCacheTtl);
        }

        Ok(())
    }

    /// Builds the resolver described by `source` and `cache_ttl_secs`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build_resolver(&self) -> Result<Arc<dyn AddressResolver>> {
        self.validate()?;

        let resolver: Arc<dyn AddressResolver> = match &self.source {
            SourceConfig::Static { addresses } => {
                let addresses = self.parse_addresses(addresses)?;
                self.maybe_cached(StaticResolver::new(addresses))
            }
            SourceConfig::Dns { host, port } => {
                let port = port.unwrap_or_else(|| self.default_port());
                self.maybe_cached(DnsHostResolver::new(host.trim(), port))
            }
        };

        Ok(resolver)
    }

    /// Builds the ordering policy described by `ordering`.
    ///
    /// # Errors
    ///
    /// Returns an error if a primary address fails to parse.
    pub fn build_policy(&self) -> Result<Arc<dyn OrderingPolicy>> {
        let policy: Arc<dyn OrderingPolicy> = match &self.ordering {
            OrderingConfig::Random => Arc::new(RandomShuffle::new()),
            OrderingConfig::Seeded { seed } => Arc::new(RandomShuffle::seeded(*seed)),
            OrderingConfig::Unshuffled => Arc::new(NoShuffle),
            OrderingConfig::PrimaryFirst { primaries } => {
                let primaries = primaries
                    .iter()
                    .map(|p| Address::parse_with_default(p, self.default_port()))
                    .collect::<address::Result<Vec<_>>>()?;
                Arc::new(PrimaryFirst::new(primaries))
            }
        };
        Ok(policy)
    }

    fn parse_addresses(&self, entries: &[String]) -> Result<Vec<Address>> {
        let mut addresses = Vec::with_capacity(entries.len());
        for entry in entries {
            addresses.extend(Address::parse_list(entry, self.default_port())?);
        }
        if addresses.is_empty() {
            return Err(ConfigError::NoAddresses);
        }
        Ok(addresses)
    }

    fn maybe_cached<R>(&self, resolver: R) -> Arc<dyn AddressResolver>
    where
        R: AddressResolver + 'static,
    {
        match self.cache_ttl_duration() {
            Some(ttl) => Arc::new(CachingResolver::new(resolver, ttl)),
            None => Arc::new(resolver),
        }
    }
}

impl EndpointStrategy {
    /// Builds a strategy from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn from_config(config: &ResolverConfig) -> Result<Self> {
        let resolver = config.build_resolver()?;
        let policy = config.build_policy()?;
        debug!(
            source = %resolver.describe(),
            ordering = ?config.ordering,
            "Built endpoint strategy from configuration"
        );
        Ok(Self::from_parts(resolver, policy))
    }
}
