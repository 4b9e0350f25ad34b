//! Error types for data store reading and writing.
//!
//! This module provides the error taxonomy shared by the reader and writer
//! cores, every backend and the basic-type codecs.
//!
//! ## Error Categories
//!
//! - **Format Errors**: Structural problems (name mismatch, wrong token kind,
//!   premature end, unbalanced nesting, duplicate child names, second root)
//! - **Usage Errors**: Operating on a closed reader/writer, or asking for a
//!   binary handle on a text value (and vice versa)
//! - **Codec Errors**: Malformed textual or binary representation of a basic type
//! - **Backend Errors**: I/O, XML and JSON plumbing failures
//!
//! ## Error Context
//!
//! Format errors raised by the reader and writer cores carry a [`Position`]
//! snapshot: the current token, name, depth and path at the point of failure.
//!
//! ## Examples
//!
//! ```rust
//! use data_store::{DataStoreReader, Error, Token};
//! use data_store::node_io::NodeReader;
//!
//! let mut reader = DataStoreReader::new(NodeReader::empty());
//! assert_eq!(reader.advance().unwrap(), Token::DataStoreEnd);
//!
//! let err = reader.read_object_start(Some("missing")).unwrap_err();
//! assert!(matches!(err, Error::Format { .. }));
//! ```

use crate::token::Token;
use std::fmt;
use thiserror::Error;

/// A snapshot of the cursor, attached to format errors.
///
/// Building one never fails, so it can be taken even when the reader is in a
/// corrupted or terminal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub token: Token,
    pub name: Option<String>,
    pub depth: usize,
    pub path: String,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "token: {}, name: ", self.token)?;
        match &self.name {
            Some(name) => write!(f, "{:?}", name)?,
            None => f.write_str("<none>")?,
        }
        write!(f, ", depth: {}, path: {:?}", self.depth, self.path)
    }
}

fn position_suffix(position: &Option<Position>) -> String {
    position
        .as_ref()
        .map(|p| format!(" ({})", p))
        .unwrap_or_default()
}

/// Represents all possible errors that can occur while reading or writing a data store.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Structural or format error, optionally with cursor diagnostics
    #[error("Format error: {msg}{}", position_suffix(.position))]
    Format {
        msg: String,
        position: Option<Position>,
    },

    /// The API was used incorrectly
    #[error("Usage error: {0}")]
    Usage(String),

    /// A value codec rejected its input
    #[error("Codec error for {type_name}: {msg}")]
    Codec { type_name: String, msg: String },

    /// IO error during reading or writing
    #[error("IO error: {0}")]
    Io(String),

    /// XML backend error
    #[error("XML error: {0}")]
    Xml(String),

    /// JSON backend error
    #[error("JSON error: {0}")]
    Json(String),

    /// Unsupported type for serialization
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    /// Custom error
    #[error("Error: {0}")]
    Custom(String),
}

impl Error {
    /// Creates a format error without cursor diagnostics.
    ///
    /// Backends use this; the reader and writer cores attach a [`Position`]
    /// with [`Error::with_position`] when the error passes through them.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use data_store::Error;
    ///
    /// let err = Error::format("unexpected end of stream");
    /// assert!(err.to_string().contains("unexpected end"));
    /// ```
    pub fn format<T: fmt::Display>(msg: T) -> Self {
        Error::Format {
            msg: msg.to_string(),
            position: None,
        }
    }

    /// Creates a format error carrying a cursor snapshot.
    pub fn format_at<T: fmt::Display>(msg: T, position: Position) -> Self {
        Error::Format {
            msg: msg.to_string(),
            position: Some(position),
        }
    }

    /// Attaches a position to a format error that does not have one yet.
    ///
    /// Other variants are returned unchanged.
    #[must_use]
    pub fn with_position(self, at: Position) -> Self {
        match self {
            Error::Format {
                msg,
                position: None,
            } => Error::Format {
                msg,
                position: Some(at),
            },
            other => other,
        }
    }

    /// Creates a usage error.
    pub fn usage<T: fmt::Display>(msg: T) -> Self {
        Error::Usage(msg.to_string())
    }

    /// Creates a codec error for the named value type.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use data_store::Error;
    ///
    /// let err = Error::codec("bool", "invalid literal: \"yes\"");
    /// assert!(err.to_string().contains("bool"));
    /// ```
    pub fn codec<T: fmt::Display>(type_name: &str, msg: T) -> Self {
        Error::Codec {
            type_name: type_name.to_string(),
            msg: msg.to_string(),
        }
    }

    /// Creates an I/O error for stream reading/writing failures.
    pub fn io<T: fmt::Display>(msg: T) -> Self {
        Error::Io(msg.to_string())
    }

    pub fn xml<T: fmt::Display>(msg: T) -> Self {
        Error::Xml(msg.to_string())
    }

    pub fn json<T: fmt::Display>(msg: T) -> Self {
        Error::Json(msg.to_string())
    }

    /// Creates an unsupported type error for types the serde bridge cannot map.
    pub fn unsupported_type(msg: &str) -> Self {
        Error::UnsupportedType(msg.to_string())
    }

    /// Creates a custom error with a display message.
    pub fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }

    /// Returns `true` for structural/format errors.
    #[must_use]
    pub fn is_format(&self) -> bool {
        matches!(self, Error::Format { .. })
    }

    /// Returns the cursor snapshot of a format error, if one was attached.
    #[must_use]
    pub fn position(&self) -> Option<&Position> {
        match self {
            Error::Format { position, .. } => position.as_ref(),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

impl serde::de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error_renders_position() {
        let err = Error::format_at(
            "unbalanced object end",
            Position {
                token: Token::ObjectEnd,
                name: None,
                depth: 0,
                path: String::new(),
            },
        );
        let text = err.to_string();
        assert!(text.contains("unbalanced object end"));
        assert!(text.contains("depth: 0"));
        assert!(text.contains("ObjectEnd"));
    }

    #[test]
    fn test_with_position_keeps_existing() {
        let first = Position {
            token: Token::Value,
            name: Some("a".to_string()),
            depth: 1,
            path: "root/a".to_string(),
        };
        let second = Position {
            token: Token::ObjectEnd,
            name: None,
            depth: 0,
            path: String::new(),
        };
        let err = Error::format_at("x", first.clone()).with_position(second);
        assert_eq!(err.position(), Some(&first));
    }

    #[test]
    fn test_with_position_ignores_other_variants() {
        let err = Error::usage("closed").with_position(Position {
            token: Token::Value,
            name: None,
            depth: 0,
            path: String::new(),
        });
        assert!(err.position().is_none());
        assert!(!err.is_format());
    }
}
