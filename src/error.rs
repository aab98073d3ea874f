//! Error types for the adacache library.
//!
//! The cache contract itself has no recoverable errors: missing keys are
//! `None`, capacity zero is a supported no-cache mode, and contract
//! violations (double release, unsupported adaptive operations, dropping a
//! cache with outstanding handles) are programming errors that assert or
//! panic. What remains:
//!
//! - [`ConfigError`]: returned by fallible constructors
//!   ([`CacheBuilder::try_build_block`](crate::builder::CacheBuilder::try_build_block)
//!   and friends) when configuration parameters are invalid.
//! - [`InvariantError`]: describes a violated internal structural invariant;
//!   used by debug-only validation helpers.

use std::fmt;

// ---------------------------------------------------------------------------
// InvariantError
// ---------------------------------------------------------------------------

/// Error describing a violated internal cache invariant.
///
/// Carries a human-readable description of which invariant failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantError(String);

impl InvariantError {
    /// Creates a new `InvariantError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for InvariantError {}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when cache configuration parameters are invalid.
///
/// Produced by the builder's `try_build_*` methods. Carries a human-readable
/// description of which parameter failed validation.
///
/// # Example
///
/// ```
/// use adacache::builder::CacheBuilder;
///
/// let err = CacheBuilder::new(1 << 20)
///     .shard_bits(12)
///     .try_build_lru::<u64>()
///     .unwrap_err();
/// assert!(err.to_string().contains("shard_bits"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(String);

impl ConfigError {
    /// Creates a new `ConfigError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
