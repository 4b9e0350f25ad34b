//! Node name and path rules.
//!
//! Every structural identifier in a data store is a *name*: non-empty, at
//! most [`MAX_NAME_LENGTH`] characters, starting with an ASCII letter or `_`
//! and continuing with ASCII letters, digits or `_`. Comparison is ordinal
//! and case-sensitive.
//!
//! Names are joined into *paths* with [`SEPARATOR`]. The empty path denotes
//! the virtual parent of the root node.
//!
//! Arbitrary strings can be mapped onto (usually) valid names with
//! [`escape`], and mapped back with [`unescape`]:
//!
//! ```rust
//! use data_store::name;
//!
//! assert_eq!(name::escape("a b"), "a_0020b");
//! assert_eq!(name::escape("a_b"), "a__b");
//! assert_eq!(name::unescape("a_0020b").unwrap(), "a b");
//! ```

use crate::{Error, Result};
use std::fmt::Write;

/// Separates names in a path.
pub const SEPARATOR: char = '/';

/// Maximum length of a name, in characters.
pub const MAX_NAME_LENGTH: usize = 255;

/// Introduces an escape sequence in escaped names.
pub const ESCAPE_CHAR: char = '_';

#[inline]
fn is_valid_first(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

#[inline]
fn is_valid_rest(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

/// Returns `true` if `s` is a valid node name.
///
/// # Examples
///
/// ```rust
/// use data_store::name::is_valid_name;
///
/// assert!(is_valid_name("_a1"));
/// assert!(!is_valid_name(""));
/// assert!(!is_valid_name("1abc"));
/// assert!(!is_valid_name("a-b"));
/// ```
#[must_use]
pub fn is_valid_name(s: &str) -> bool {
    // all valid names are ASCII, so byte length equals character count
    if s.is_empty() || s.len() > MAX_NAME_LENGTH {
        return false;
    }

    let mut chars = s.chars();
    match chars.next() {
        Some(first) if is_valid_first(first) => chars.all(is_valid_rest),
        _ => false,
    }
}

/// Returns an error unless `s` is a valid node name.
pub fn validate_name(s: &str) -> Result<()> {
    if is_valid_name(s) {
        Ok(())
    } else {
        Err(Error::format(format!("invalid name: {:?}", s)))
    }
}

/// Appends a name (or a relative path) to a path.
///
/// Combining with the empty path returns the second operand unchanged.
///
/// # Examples
///
/// ```rust
/// use data_store::name::combine;
///
/// assert_eq!(combine("", "root"), "root");
/// assert_eq!(combine("root", "child"), "root/child");
/// assert_eq!(combine("root", "a/b"), "root/a/b");
/// ```
#[must_use]
pub fn combine(path: &str, name_or_path: &str) -> String {
    if path.is_empty() {
        return name_or_path.to_string();
    }

    let mut result = String::with_capacity(path.len() + 1 + name_or_path.len());
    result.push_str(path);
    result.push(SEPARATOR);
    result.push_str(name_or_path);
    result
}

/// Builds a path from a sequence of names, root first.
#[must_use]
pub fn join<'a, I>(names: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut result = String::new();
    for name in names {
        if !result.is_empty() {
            result.push(SEPARATOR);
        }
        result.push_str(name);
    }
    result
}

/// Maps an arbitrary string to a string that is usually a valid name.
///
/// The escape character is doubled; any UTF-16 code unit that is not allowed
/// at its position becomes the escape character followed by four uppercase
/// hex digits. The result is not a valid name when `s` is empty or the
/// escaped form grows past [`MAX_NAME_LENGTH`].
#[must_use]
pub fn escape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());

    for (index, unit) in s.encode_utf16().enumerate() {
        let allowed = match char::from_u32(u32::from(unit)) {
            Some(ESCAPE_CHAR) => {
                result.push(ESCAPE_CHAR);
                result.push(ESCAPE_CHAR);
                continue;
            }
            Some(ch) if index == 0 => ch.is_ascii_alphabetic(),
            Some(ch) => ch.is_ascii_alphanumeric(),
            None => false,
        };

        if allowed {
            // allowed units are ASCII
            result.push(unit as u8 as char);
        } else {
            let _ = write!(result, "{}{:04X}", ESCAPE_CHAR, unit);
        }
    }

    result
}

/// The positional name of the `index`th element of a sequence: `i0`, `i1`, ...
///
/// Used for JSON arrays and for serialized sequences and tuples.
#[must_use]
pub fn index_name(index: usize) -> String {
    format!("i{}", index)
}

/// Reverses [`index_name`].
#[must_use]
pub fn parse_index_name(name: &str) -> Option<usize> {
    let digits = name.strip_prefix('i')?;
    if digits.is_empty() || (digits.len() > 1 && digits.starts_with('0')) {
        return None;
    }
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Reverses [`escape`].
///
/// # Errors
///
/// Returns a format error if an escape character is followed by neither a
/// second escape character nor exactly four hex digits, or if the escaped
/// code units do not form valid UTF-16.
pub fn unescape(s: &str) -> Result<String> {
    let mut units: Vec<u16> = Vec::with_capacity(s.len());
    let mut chars = s.chars();
    let mut buf = [0u16; 2];

    while let Some(ch) = chars.next() {
        if ch != ESCAPE_CHAR {
            units.extend_from_slice(ch.encode_utf16(&mut buf));
            continue;
        }

        match chars.next() {
            Some(ESCAPE_CHAR) => units.push(ESCAPE_CHAR as u16),
            Some(first) => {
                let mut value = hex_digit(first, s)?;
                for _ in 0..3 {
                    let next = chars.next().ok_or_else(|| truncated(s))?;
                    value = (value << 4) | hex_digit(next, s)?;
                }
                units.push(value);
            }
            None => return Err(truncated(s)),
        }
    }

    String::from_utf16(&units)
        .map_err(|_| Error::format(format!("escaped name {:?} is not valid UTF-16", s)))
}

fn hex_digit(ch: char, source: &str) -> Result<u16> {
    ch.to_digit(16).map(|d| d as u16).ok_or_else(|| {
        Error::format(format!(
            "invalid escape sequence in {:?}: {:?} is not a hex digit",
            source, ch
        ))
    })
}

fn truncated(source: &str) -> Error {
    Error::format(format!("truncated escape sequence in {:?}", source))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert!(is_valid_name("_a1"));
        assert!(is_valid_name("a"));
        assert!(is_valid_name("_"));
        assert!(is_valid_name("Root_Node_2"));
        assert!(is_valid_name(&"a".repeat(MAX_NAME_LENGTH)));
    }

    #[test]
    fn test_invalid_names() {
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("1abc"));
        assert!(!is_valid_name("a-b"));
        assert!(!is_valid_name("a b"));
        assert!(!is_valid_name("é"));
        assert!(!is_valid_name(&"a".repeat(MAX_NAME_LENGTH + 1)));
    }

    #[test]
    fn test_validate_name_error() {
        let err = validate_name("a-b").unwrap_err();
        assert!(err.is_format());
        assert!(err.to_string().contains("a-b"));
    }

    #[test]
    fn test_combine() {
        assert_eq!(combine("", "a"), "a");
        assert_eq!(combine("a", "b"), "a/b");
        assert_eq!(combine("a/b", "c/d"), "a/b/c/d");
    }

    #[test]
    fn test_join() {
        assert_eq!(join(Vec::<&str>::new()), "");
        assert_eq!(join(["root"]), "root");
        assert_eq!(join(["root", "x", "y"]), "root/x/y");
    }

    #[test]
    fn test_escape_examples() {
        assert_eq!(escape("a b"), "a_0020b");
        assert_eq!(escape("a_b"), "a__b");
        assert_eq!(escape("1abc"), "_0031abc");
        assert_eq!(escape("abc1"), "abc1");
        assert_eq!(escape(""), "");
    }

    #[test]
    fn test_escape_non_bmp() {
        // one char, two UTF-16 code units
        assert_eq!(escape("😀"), "_D83D_DE00");
        assert_eq!(unescape("_D83D_DE00").unwrap(), "😀");
    }

    #[test]
    fn test_unescape_examples() {
        assert_eq!(unescape("a_0020b").unwrap(), "a b");
        assert_eq!(unescape("a__b").unwrap(), "a_b");
        assert_eq!(unescape("___0020").unwrap(), "_ ");
        assert_eq!(unescape("a_002db").unwrap(), "a-b");
    }

    #[test]
    fn test_unescape_errors() {
        assert!(unescape("a_").unwrap_err().is_format());
        assert!(unescape("a_12").unwrap_err().is_format());
        assert!(unescape("a_12G4").unwrap_err().is_format());
        // lone surrogate
        assert!(unescape("_D83D").unwrap_err().is_format());
    }

    #[test]
    fn test_index_names() {
        assert_eq!(index_name(0), "i0");
        assert_eq!(index_name(12), "i12");
        assert_eq!(parse_index_name("i12"), Some(12));
        assert_eq!(parse_index_name("i"), None);
        assert_eq!(parse_index_name("i01"), None);
        assert_eq!(parse_index_name("i+1"), None);
        assert_eq!(parse_index_name("x1"), None);
    }

    #[test]
    fn test_escape_makes_valid_names() {
        for s in ["a b", "1", "x-y.z", "ümlaut", "__init__"] {
            assert!(is_valid_name(&escape(s)), "escape({:?})", s);
        }
    }
}
