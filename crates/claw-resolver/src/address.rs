//! Broker address type and parsing.
//!
//! Addresses are written the way operators put them in configuration:
//!
//! - `host` - uses the default port
//! - `host:port`
//! - `[v6-literal]` or `[v6-literal]:port`
//! - a bare IPv6 literal such as `::1` - uses the default port
//!
//! Lists are comma separated: `rabbit-1:5672, rabbit-2, [fd00::3]:5673`.

use std::fmt;
use std::net::Ipv6Addr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default AMQP port for plain TCP connections.
pub const DEFAULT_AMQP_PORT: u16 = 5672;

/// Default AMQP port for TLS connections.
pub const DEFAULT_AMQP_TLS_PORT: u16 = 5671;

/// Returns the default broker port for the given transport.
#[must_use]
pub const fn default_port(tls: bool) -> u16 {
    if tls {
        DEFAULT_AMQP_TLS_PORT
    } else {
        DEFAULT_AMQP_PORT
    }
}

/// Errors produced while parsing an address string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressParseError {
    /// The input was empty or whitespace.
    #[error("empty address")]
    Empty,

    /// The host part was empty.
    #[error("missing host in address '{0}'")]
    EmptyHost(String),

    /// An IPv6 literal was opened with `[` but never closed.
    #[error("unclosed '[' in address '{0}'")]
    UnclosedBracket(String),

    /// Trailing characters after a bracketed IPv6 literal.
    #[error("unexpected characters after ']' in address '{0}'")]
    TrailingCharacters(String),

    /// The port was not a number in `1..=65535`.
    #[error("invalid port '{port}' in address '{input}'")]
    InvalidPort {
        /// The full address string.
        input: String,
        /// The offending port text.
        port: String,
    },

    /// Several colons outside brackets that do not form an IPv6 literal.
    #[error("unexpected ':' in address '{0}' (bracket IPv6 literals as [addr]:port)")]
    StrayColon(String),
}

/// Result type for address parsing.
pub type Result<T> = std::result::Result<T, AddressParseError>;

/// A broker node to connect to.
///
/// Equality and hashing are structural over `(host, port)`. The host is kept
/// as given: it may be a DNS name or an IP literal, and is only resolved by
/// the transport layer when a connection is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawAddress")]
pub struct Address {
    host: String,
    port: u16,
}

impl Address {
    /// Creates an address from a host and port.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Creates an address on the default AMQP port.
    #[must_use]
    pub fn with_default_port(host: impl Into<String>, tls: bool) -> Self {
        Self::new(host, default_port(tls))
    }

    /// Returns the host name or IP literal.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Parses an address, using `default_port` when none is given.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, the host is missing, a
    /// bracketed literal is malformed, or the port is not a valid number.
    pub fn parse_with_default(input: &str, default_port: u16) -> Result<Self> {
        let s = input.trim();
        if s.is_empty() {
            return Err(AddressParseError::Empty);
        }

        if let Some(rest) = s.strip_prefix('[') {
            let close = rest
                .find(']')
                .ok_or_else(|| AddressParseError::UnclosedBracket(s.to_string()))?;
            let host = &rest[..close];
            if host.is_empty() {
                return Err(AddressParseError::EmptyHost(s.to_string()));
            }
            let port = match &rest[close + 1..] {
                "" => default_port,
                tail => {
                    let port = tail
                        .strip_prefix(':')
                        .ok_or_else(|| AddressParseError::TrailingCharacters(s.to_string()))?;
                    parse_port(s, port)?
                }
            };
            return Ok(Self::new(host, port));
        }

        if s.matches(':').count() > 1 {
            if s.parse::<Ipv6Addr>().is_err() {
                return Err(AddressParseError::StrayColon(s.to_string()));
            }
            return Ok(Self::new(s, default_port));
        }

        match s.split_once(':') {
            Some((host, port)) => {
                if host.is_empty() {
                    return Err(AddressParseError::EmptyHost(s.to_string()));
                }
                Ok(Self::new(host, parse_port(s, port)?))
            }
            None => Ok(Self::new(s, default_port)),
        }
    }

    /// Parses a comma separated list of addresses.
    ///
    /// Blank entries (for example a trailing comma) are skipped; order is
    /// preserved.
    ///
    /// # Errors
    ///
    /// Returns the first parse error encountered.
    pub fn parse_list(input: &str, default_port: u16) -> Result<Vec<Self>> {
        input
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| Self::parse_with_default(part, default_port))
            .collect()
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_with_default(s, DEFAULT_AMQP_PORT)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Wire form of [`Address`], checked before it becomes one.
#[derive(Deserialize)]
struct RawAddress {
    host: String,
    port: u16,
}

impl TryFrom<RawAddress> for Address {
    type Error = AddressParseError;

    fn try_from(raw: RawAddress) -> Result<Self> {
        if raw.host.trim().is_empty() {
            return Err(AddressParseError::EmptyHost(format!("{}:{}", raw.host, raw.port)));
        }
        if raw.port == 0 {
            return Err(AddressParseError::InvalidPort {
                input: format!("{}:0", raw.host),
                port: "0".to_string(),
            });
        }
        Ok(Self::new(raw.host, raw.port))
    }
}

fn parse_port(input: &str, port: &str) -> Result<u16> {
    match port.parse::<u16>() {
        Ok(p) if p != 0 => Ok(p),
        _ => Err(AddressParseError::InvalidPort {
            input: input.to_string(),
            port: port.to_string(),
        }),
    }
}
