//! Error types for the observa slot registry and bucket codec.
//!
//! Descriptor parsing never produces an error: problems in the descriptor
//! file are reported through [`crate::loader::RefreshOutcome`] instead. The
//! errors here cover the cases a caller can actually act on.

use std::path::PathBuf;

use thiserror::Error;

/// The main error type for all observa operations.
#[derive(Error, Debug)]
pub enum ObservaError {
    /// Error reading a slot attribute.
    #[error("slot error: {0}")]
    Slot(#[from] SlotError),

    /// Error mapping a timestamp onto the bucket calendar.
    #[error("bucket error: {0}")]
    Bucket(#[from] BucketError),

    /// Error loading registry configuration.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Error opening a bucket store.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors raised by slot lookups.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SlotError {
    /// The index lies outside `[0, OBSERVABLE_COUNT)`.
    #[error("observable index {index} is out of range (max {max})")]
    IndexOutOfRange {
        /// The rejected index.
        index: usize,
        /// The number of observables.
        max: usize,
    },

    /// The extension slot at this index has not been defined by the
    /// descriptor file. Call `has_slot` before reading extension attributes.
    #[error("observable {index} has no slot defined")]
    Unpopulated {
        /// The observable index.
        index: usize,
    },
}

/// Errors raised by the time bucket codec.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BucketError {
    /// The timestamp cannot be broken down into a UTC calendar date.
    #[error("timestamp {timestamp} is outside the representable calendar range")]
    TimestampOutOfRange {
        /// The offending Unix timestamp in seconds.
        timestamp: i64,
    },
}

/// Errors that can occur when loading a [`crate::config::RegistryConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config '{}': {source}", path.display())]
    Read {
        /// The config file path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for this schema.
    #[error("failed to parse config '{}': {source}", path.display())]
    Parse {
        /// The config file path.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The configured descriptor file name is unusable.
    #[error("invalid descriptor file name '{name}': {reason}")]
    InvalidDescriptorName {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Errors that can occur when opening a read-only bucket store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store file could not be read.
    #[error("failed to read bucket store '{}': {source}", path.display())]
    Read {
        /// The store file path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The store file is not a JSON object of key to value arrays.
    #[error("failed to parse bucket store '{}': {source}", path.display())]
    Parse {
        /// The store file path.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

/// Type alias for `Result<T, ObservaError>`.
pub type Result<T> = std::result::Result<T, ObservaError>;
