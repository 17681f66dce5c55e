//! DNS-backed address resolvers.
//!
//! Two styles of cluster discovery are supported:
//!
//! - **Host records** - one DNS name maps to every broker IP (A/AAAA
//!   records). Each IP is paired with a configured port.
//! - **SRV records** - `_amqp._tcp.<domain>` lists each broker with its own
//!   port and priority.
//!
//! The crate does not speak DNS itself. Lookups go through [`HostLookup`]
//! and [`SrvLookup`]; [`SystemLookup`] uses the operating system resolver
//! for host records, and SRV lookups are supplied by the caller.

use std::collections::HashSet;
use std::io;
use std::net::{IpAddr, ToSocketAddrs};

use tracing::{debug, trace, warn};

use crate::address::Address;
use crate::error::{ResolutionError, Result};
use crate::resolver::AddressResolver;

/// Looks up the IP addresses a host name maps to.
pub trait HostLookup: Send + Sync {
    /// Returns the addresses for `host`, in answer order.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    fn lookup_host(&self, host: &str) -> io::Result<Vec<IpAddr>>;
}

impl<F> HostLookup for F
where
    F: Fn(&str) -> io::Result<Vec<IpAddr>> + Send + Sync,
{
    fn lookup_host(&self, host: &str) -> io::Result<Vec<IpAddr>> {
        self(host)
    }
}

/// Host lookup through the operating system resolver.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLookup;

impl HostLookup for SystemLookup {
    fn lookup_host(&self, host: &str) -> io::Result<Vec<IpAddr>> {
        Ok((host, 0)
            .to_socket_addrs()?
            .map(|addr| addr.ip())
            .collect())
    }
}

/// A single SRV answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrvRecord {
    /// Priority (lower is preferred).
    pub priority: u16,
    /// Relative weight among records of the same priority.
    pub weight: u16,
    /// Port the broker listens on.
    pub port: u16,
    /// Target host name, possibly with a trailing dot.
    pub target: String,
}

impl SrvRecord {
    /// Creates a new SRV record.
    #[must_use]
    pub fn new(priority: u16, weight: u16, port: u16, target: impl Into<String>) -> Self {
        Self {
            priority,
            weight,
            port,
            target: target.into(),
        }
    }

    /// Returns the broker address this record points at.
    #[must_use]
    pub fn address(&self) -> Address {
        let host = self.target.strip_suffix('.').unwrap_or(&self.target);
        Address::new(host, self.port)
    }
}

/// Looks up SRV records for a service name.
pub trait SrvLookup: Send + Sync {
    /// Returns the SRV records for `service`, in answer order.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    fn lookup_srv(&self, service: &str) -> io::Result<Vec<SrvRecord>>;
}

impl<F> SrvLookup for F
where
    F: Fn(&str) -> io::Result<Vec<SrvRecord>> + Send + Sync,
{
    fn lookup_srv(&self, service: &str) -> io::Result<Vec<SrvRecord>> {
        self(service)
    }
}

/// Resolves every IP behind one host name, all on the same port.
#[derive(Debug, Clone)]
pub struct DnsHostResolver<L = SystemLookup> {
    host: String,
    port: u16,
    lookup: L,
}

impl DnsHostResolver<SystemLookup> {
    /// Creates a resolver that uses the operating system resolver.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self::with_lookup(host, port, SystemLookup)
    }
}

impl<L: HostLookup> DnsHostResolver<L> {
    /// Creates a resolver with a custom lookup implementation.
    #[must_use]
    pub fn with_lookup(host: impl Into<String>, port: u16, lookup: L) -> Self {
        Self {
            host: host.into(),
            port,
            lookup,
        }
    }

    /// Returns the host name being resolved.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the port paired with every resolved IP.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl<L: HostLookup> AddressResolver for DnsHostResolver<L> {
    fn resolve(&self) -> Result<Vec<Address>> {
        if self.host.trim().is_empty() {
            return Err(ResolutionError::InvalidConfig(
                "empty host name for DNS resolution".to_string(),
            ));
        }

        debug!(host = %self.host, port = self.port, "Resolving broker host records");

        let ips = self.lookup.lookup_host(&self.host).map_err(|e| {
            warn!(host = %self.host, error = %e, "Host lookup failed");
            ResolutionError::lookup(&self.host, e)
        })?;

        // The system resolver repeats an IP once per socket type.
        let mut seen = HashSet::new();
        let addresses: Vec<Address> = ips
            .into_iter()
            .filter(|ip| seen.insert(*ip))
            .map(|ip| Address::new(ip.to_string(), self.port))
            .collect();

        if addresses.is_empty() {
            warn!(host = %self.host, "Host lookup returned no records");
            return Err(ResolutionError::EmptyResult(self.host.clone()));
        }

        trace!(host = %self.host, addresses = ?addresses, "Host resolution complete");
        Ok(addresses)
    }

    fn describe(&self) -> String {
        format!("dns host {}", Address::new(self.host.clone(), self.port))
    }
}

/// Resolves brokers from SRV records.
///
/// Records are ordered by priority, lowest first. Records that share a
/// priority keep their answer order.
#[derive(Debug, Clone)]
pub struct SrvResolver<L> {
    service: String,
    lookup: L,
}

impl<L: SrvLookup> SrvResolver<L> {
    /// Creates a resolver for `service` (for example `_amqp._tcp.mq.internal`).
    #[must_use]
    pub fn new(service: impl Into<String>, lookup: L) -> Self {
        Self {
            service: service.into(),
            lookup,
        }
    }

    /// Returns the SRV service name.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }
}

impl<L: SrvLookup> AddressResolver for SrvResolver<L> {
    fn resolve(&self) -> Result<Vec<Address>> {
        if self.service.trim().is_empty() {
            return Err(ResolutionError::InvalidConfig(
                "empty SRV service name".to_string(),
            ));
        }

        debug!(service = %self.service, "Resolving broker SRV records");

        let mut records = self.lookup.lookup_srv(&self.service).map_err(|e| {
            warn!(service = %self.service, error = %e, "SRV lookup failed");
            ResolutionError::lookup(&self.service, e)
        })?;

        if records.is_empty() {
            warn!(service = %self.service, "SRV lookup returned no records");
            return Err(ResolutionError::EmptyResult(self.service.clone()));
        }

        // Stable: equal priorities stay in answer order.
        records.sort_by_key(|r| r.priority);
        let addresses: Vec<Address> = records.iter().map(SrvRecord::address).collect();

        trace!(service = %self.service, addresses = ?addresses, "SRV resolution complete");
        Ok(addresses)
    }

    fn describe(&self) -> String {
        format!("dns srv {}", self.service)
    }
}
