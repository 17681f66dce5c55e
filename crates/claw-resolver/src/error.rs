//! Resolution errors reported to the reconnecting caller.

use std::io;

use thiserror::Error;

/// Errors that can occur while producing candidate addresses.
///
/// Every variant is recoverable: the caller is expected to back off and
/// run another resolution cycle later. Nothing in this crate retries on
/// its own.
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// The candidate source could not be consulted.
    #[error("lookup of '{target}' failed: {source}")]
    Lookup {
        /// Name that was being looked up.
        target: String,
        /// Underlying I/O or resolver error.
        #[source]
        source: io::Error,
    },

    /// The resolver was constructed with unusable settings.
    #[error("invalid resolver configuration: {0}")]
    InvalidConfig(String),

    /// Resolution succeeded but produced no candidates.
    #[error("resolution of '{0}' yielded no candidate addresses")]
    EmptyResult(String),
}

impl ResolutionError {
    /// Creates a lookup error for `target`.
    pub fn lookup(target: impl Into<String>, source: io::Error) -> Self {
        Self::Lookup {
            target: target.into(),
            source,
        }
    }

    /// Returns true if the source answered but had nothing to offer.
    #[must_use]
    pub fn is_empty_result(&self) -> bool {
        matches!(self, Self::EmptyResult(_))
    }
}

/// Result type for resolution operations.
pub type Result<T> = std::result::Result<T, ResolutionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ResolutionError::lookup(
            "_amqp._tcp.mq.internal",
            io::Error::new(io::ErrorKind::TimedOut, "timed out"),
        );
        assert_eq!(
            err.to_string(),
            "lookup of '_amqp._tcp.mq.internal' failed: timed out"
        );

        let err = ResolutionError::InvalidConfig("empty host".to_string());
        assert!(err.to_string().contains("empty host"));

        let err = ResolutionError::EmptyResult("static list".to_string());
        assert!(err.to_string().contains("no candidate addresses"));
    }

    #[test]
    fn test_lookup_keeps_source() {
        use std::error::Error as _;

        let err = ResolutionError::lookup("mq", io::Error::from(io::ErrorKind::NotFound));
        assert!(err.source().is_some());
        assert!(!err.is_empty_result());
        assert!(ResolutionError::EmptyResult("mq".to_string()).is_empty_result());
    }
}
