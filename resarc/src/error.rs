//! Error types for resource container operations

use std::io;
use thiserror::Error;

/// Errors raised while reading or mutating resource containers
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error (container unreadable, short read during write-back)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Container layout violates the format (counts overrun the buffer,
    /// bad magic, truncated tables)
    #[error("Invalid container format: {0}")]
    Format(String),

    /// Bad user-supplied input (malformed manifest, unusable mod file)
    #[error("Invalid mod data: {0}")]
    UserData(String),

    /// Missing external tool or collaborator resource
    #[error("Environment error: {0}")]
    Environment(String),

    /// Named chunk or container is not present
    #[error("Not found: {0}")]
    NotFound(String),

    /// Compression or decompression of a payload failed
    #[error("Codec error: {0}")]
    Codec(String),
}

impl Error {
    /// Create a format error
    pub fn format<S: Into<String>>(msg: S) -> Self {
        Error::Format(msg.into())
    }

    /// Create a user-data error
    pub fn user_data<S: Into<String>>(msg: S) -> Self {
        Error::UserData(msg.into())
    }

    /// Create an environment error
    pub fn environment<S: Into<String>>(msg: S) -> Self {
        Error::Environment(msg.into())
    }

    /// Create a not-found error
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Error::NotFound(msg.into())
    }

    /// Create a codec error
    pub fn codec<S: Into<String>>(msg: S) -> Self {
        Error::Codec(msg.into())
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;
