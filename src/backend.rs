//! The contract between the reader/writer cores and physical formats.
//!
//! A backend only knows how to pull raw tokens out of (or push them into) its
//! format. Everything structural (name validation, depth and path tracking,
//! the single-root rule, balanced nesting, value handle lifecycle) lives in
//! [`DataStoreReader`](crate::DataStoreReader) and
//! [`DataStoreWriter`](crate::DataStoreWriter).
//!
//! ## Value handles
//!
//! Values are accessed through transient handles bound to exactly one value
//! node: [`TextReader`]/[`BinaryReader`] on the read side and
//! [`TextWriter`]/[`BinaryWriter`] on the write side. Handles borrow the
//! reader or writer, so two live handles for the same cursor cannot exist.
//!
//! ## Format quirks
//!
//! Backends hide their format-specific noise: XML skips whitespace and
//! comments and reports empty elements as empty text values; JSON presents
//! arrays as objects with positional names (`i0`, `i1`, ...) and `null` as an
//! empty text value.

use crate::token::{Token, ValueKind};
use crate::Result;
use std::borrow::Cow;
use std::fmt;
use std::io;

/// The payload of one value node, as handed between a backend and the cores.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValueData<'a> {
    Text(Cow<'a, str>),
    Binary(Cow<'a, [u8]>),
}

impl ValueData<'_> {
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            ValueData::Text(_) => ValueKind::Text,
            ValueData::Binary(_) => ValueKind::Binary,
        }
    }
}

/// Text access to the current value.
#[derive(Debug)]
pub struct TextReader<'a> {
    text: Cow<'a, str>,
}

impl<'a> TextReader<'a> {
    pub fn new(text: Cow<'a, str>) -> Self {
        TextReader { text }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.text.into_owned()
    }
}

/// Binary access to the current value.
///
/// Implements [`io::Read`], so codecs can use `byteorder::ReadBytesExt`.
#[derive(Debug)]
pub struct BinaryReader<'a> {
    bytes: Cow<'a, [u8]>,
    position: usize,
}

impl<'a> BinaryReader<'a> {
    pub fn new(bytes: Cow<'a, [u8]>) -> Self {
        BinaryReader { bytes, position: 0 }
    }

    /// The bytes not consumed yet.
    #[must_use]
    pub fn remaining(&self) -> &[u8] {
        &self.bytes[self.position..]
    }

    #[must_use]
    pub fn is_at_end(&self) -> bool {
        self.position >= self.bytes.len()
    }

    /// Consumes and returns everything that has not been read yet.
    pub fn read_to_vec(&mut self) -> Vec<u8> {
        let rest = self.remaining().to_vec();
        self.position = self.bytes.len();
        rest
    }
}

impl io::Read for BinaryReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let rest = &self.bytes[self.position..];
        let n = rest.len().min(buf.len());
        buf[..n].copy_from_slice(&rest[..n]);
        self.position += n;
        Ok(n)
    }
}

/// A handle on the current value, in whichever encoding the backend stores it.
#[derive(Debug)]
pub enum ValueReader<'a> {
    Text(TextReader<'a>),
    Binary(BinaryReader<'a>),
}

impl ValueReader<'_> {
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            ValueReader::Text(_) => ValueKind::Text,
            ValueReader::Binary(_) => ValueKind::Binary,
        }
    }
}

impl<'a> From<ValueData<'a>> for ValueReader<'a> {
    fn from(data: ValueData<'a>) -> Self {
        match data {
            ValueData::Text(text) => ValueReader::Text(TextReader::new(text)),
            ValueData::Binary(bytes) => ValueReader::Binary(BinaryReader::new(bytes)),
        }
    }
}

/// Text output for one value. Implements [`fmt::Write`].
#[derive(Debug)]
pub struct TextWriter<'a> {
    buf: &'a mut String,
}

impl<'a> TextWriter<'a> {
    pub fn new(buf: &'a mut String) -> Self {
        TextWriter { buf }
    }

    pub fn push_str(&mut self, s: &str) {
        self.buf.push_str(s);
    }
}

impl fmt::Write for TextWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.buf.push_str(s);
        Ok(())
    }
}

/// Binary output for one value. Implements [`io::Write`], so codecs can use
/// `byteorder::WriteBytesExt`.
#[derive(Debug)]
pub struct BinaryWriter<'a> {
    buf: &'a mut Vec<u8>,
}

impl<'a> BinaryWriter<'a> {
    pub fn new(buf: &'a mut Vec<u8>) -> Self {
        BinaryWriter { buf }
    }
}

impl io::Write for BinaryWriter<'_> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A handle for writing one value, in the encoding the backend asked for.
#[derive(Debug)]
pub enum ValueWriter<'a> {
    Text(TextWriter<'a>),
    Binary(BinaryWriter<'a>),
}

/// The primitives a physical format must supply to be read by a
/// [`DataStoreReader`](crate::DataStoreReader).
pub trait ReadBackend {
    /// Pulls the next structural token.
    ///
    /// `Value` and `ObjectStart` must come with the node name. `ObjectEnd`
    /// and `DataStoreEnd` carry no name; a backend that does report a name
    /// for `ObjectEnd` has it checked against the object being closed.
    fn read_token(&mut self) -> Result<(Token, Option<String>)>;

    /// Opens the current value. Only called while the cursor is on a value.
    fn open_value(&mut self) -> Result<ValueData<'_>>;

    /// Releases whatever [`open_value`](ReadBackend::open_value) acquired.
    fn close_value(&mut self) -> Result<()> {
        Ok(())
    }
}

/// The primitives a physical format must supply to be written by a
/// [`DataStoreWriter`](crate::DataStoreWriter).
pub trait WriteBackend {
    /// The encoding this backend wants for the named value.
    fn value_kind(&self, name: &str) -> ValueKind;

    fn write_value(&mut self, name: &str, value: ValueData<'_>) -> Result<()>;

    fn write_object_start(&mut self, name: &str) -> Result<()>;

    fn write_object_end(&mut self) -> Result<()>;

    /// Flushes buffered output. Called once, after every open object was closed.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<B: ReadBackend + ?Sized> ReadBackend for Box<B> {
    fn read_token(&mut self) -> Result<(Token, Option<String>)> {
        (**self).read_token()
    }

    fn open_value(&mut self) -> Result<ValueData<'_>> {
        (**self).open_value()
    }

    fn close_value(&mut self) -> Result<()> {
        (**self).close_value()
    }
}

impl<B: WriteBackend + ?Sized> WriteBackend for Box<B> {
    fn value_kind(&self, name: &str) -> ValueKind {
        (**self).value_kind(name)
    }

    fn write_value(&mut self, name: &str, value: ValueData<'_>) -> Result<()> {
        (**self).write_value(name, value)
    }

    fn write_object_start(&mut self, name: &str) -> Result<()> {
        (**self).write_object_start(name)
    }

    fn write_object_end(&mut self) -> Result<()> {
        (**self).write_object_end()
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}
