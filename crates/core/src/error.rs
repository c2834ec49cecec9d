//! Error types for objcat

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for a conversion run
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input: {0}")]
    Input(String),

    #[error("Cannot encode {symbol}.{field}: character {character:?} is not allowed in a catalog")]
    Serialization {
        symbol: String,
        field: String,
        character: char,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn serialization(symbol: impl Into<String>, field: impl Into<String>, character: char) -> Self {
        Self::Serialization {
            symbol: symbol.into(),
            field: field.into(),
            character,
        }
    }

    /// Process exit code for a run that failed with this error.
    ///
    /// Bad input paths and bad configuration are `1`; everything that stops a
    /// run after input was accepted is `3`.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Input(_) | Error::Config(_) | Error::Parse(_) => 1,
            Error::Io(_) | Error::Serialization { .. } | Error::Write { .. } => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(Error::input("missing").exit_code(), 1);
        assert_eq!(Error::config("bad").exit_code(), 1);
        assert_eq!(Error::serialization("Foo", "name", '\u{1}').exit_code(), 3);
    }

    #[test]
    fn test_serialization_message_names_field() {
        let err = Error::serialization("Foo", "methods[0].displayName", '\u{1}');
        let msg = err.to_string();
        assert!(msg.contains("Foo.methods[0].displayName"));
        assert!(msg.contains("\\u{1}"));
    }
}
