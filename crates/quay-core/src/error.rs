//! # Quay Core Errors
//!
//! Every fallible operation in `quay-core` returns [`Error`]. There is one
//! variant per failure kind: malformed configuration, unusable libraries,
//! load cycles, name collisions and failed lookups. All of them are
//! recoverable by the caller.
use std::error::Error as StdError;
use std::fmt;

use thiserror::Error as ThisError;

/// Boxed underlying cause attached to configuration and library errors.
pub type BoxedSource = Box<dyn StdError + Send + Sync>;

#[derive(Debug, ThisError)]
pub enum Error {
    /// A search path list or plugin-list file could not be used.
    #[error("Bad configuration: {message}")]
    BadConfig {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// A shared library could not be opened or does not hold a usable
    /// registration record.
    #[error("Bad library: {message}")]
    BadLibrary {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// A plugin was asked to load while it was already loading.
    #[error("Circular dependency: {0}")]
    CircularDependency(String),

    /// A name was registered twice in the same place.
    #[error("Redefined: {0}")]
    Redefined(String),

    /// A name was looked up that was never registered.
    #[error("Undefined: {0}")]
    Undefined(String),
}

/// The kind of an [`Error`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadConfig,
    BadLibrary,
    CircularDependency,
    Redefined,
    Undefined,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::BadConfig => "bad configuration",
            ErrorKind::BadLibrary => "bad library",
            ErrorKind::CircularDependency => "circular dependency",
            ErrorKind::Redefined => "redefined",
            ErrorKind::Undefined => "undefined",
        };
        f.write_str(name)
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::BadConfig { .. } => ErrorKind::BadConfig,
            Error::BadLibrary { .. } => ErrorKind::BadLibrary,
            Error::CircularDependency(_) => ErrorKind::CircularDependency,
            Error::Redefined(_) => ErrorKind::Redefined,
            Error::Undefined(_) => ErrorKind::Undefined,
        }
    }

    pub fn bad_config(message: impl Into<String>) -> Self {
        Error::BadConfig { message: message.into(), source: None }
    }

    pub fn bad_config_with<E>(message: impl Into<String>, source: E) -> Self
    where
        E: Into<BoxedSource>,
    {
        Error::BadConfig { message: message.into(), source: Some(source.into()) }
    }

    pub fn bad_library(message: impl Into<String>) -> Self {
        Error::BadLibrary { message: message.into(), source: None }
    }

    pub fn bad_library_with<E>(message: impl Into<String>, source: E) -> Self
    where
        E: Into<BoxedSource>,
    {
        Error::BadLibrary { message: message.into(), source: Some(source.into()) }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
