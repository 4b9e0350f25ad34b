//! Structural tokens reported while traversing a data store.
//!
//! A data store is read as a flat sequence of tokens:
//!
//! ```text
//! DataStoreStart -> { Value | ObjectStart | DataStoreEnd }
//! ObjectStart    -> first child, or ObjectEnd if the object is empty
//! Value          -> next sibling, or ObjectEnd / DataStoreEnd
//! ObjectEnd      -> next sibling, or ObjectEnd / DataStoreEnd
//! DataStoreEnd   -> (terminal)
//! ```
//!
//! [`Token::DataStoreStart`] is the pseudo-state of a reader that has not
//! been advanced yet; backends never report it.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Token {
    /// Nothing has been read yet.
    #[default]
    DataStoreStart,
    /// A named leaf value.
    Value,
    /// The start of a named object.
    ObjectStart,
    /// The end of the innermost open object.
    ObjectEnd,
    /// The end of the data store.
    DataStoreEnd,
}

impl Token {
    /// Returns `true` for tokens that carry a node name when reported by a backend.
    #[inline]
    #[must_use]
    pub const fn starts_node(&self) -> bool {
        matches!(self, Token::Value | Token::ObjectStart)
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Token::DataStoreStart => "DataStoreStart",
            Token::Value => "Value",
            Token::ObjectStart => "ObjectStart",
            Token::ObjectEnd => "ObjectEnd",
            Token::DataStoreEnd => "DataStoreEnd",
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The physical encoding available for a value.
///
/// A value node is either text or binary, never both. Readers report which
/// one a backend offers; writers let the backend choose.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum ValueKind {
    #[default]
    Text,
    Binary,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Text => f.write_str("text"),
            ValueKind::Binary => f.write_str("binary"),
        }
    }
}
