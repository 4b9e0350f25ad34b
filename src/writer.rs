//! The writer core: the mirror image of the reader.
//!
//! [`DataStoreWriter`] validates names, tracks the open objects, enforces a
//! single root node, rejects duplicate sibling names and unbalanced object
//! ends, then hands the physical work to a [`WriteBackend`].
//!
//! The backend, not the caller, decides whether a value is written as text
//! or binary: an XML backend always asks for text, a node tree can be
//! configured either way.
//!
//! ## Usage
//!
//! ```rust
//! use data_store::DataStoreWriter;
//! use data_store::node_io::NodeWriter;
//!
//! let mut writer = DataStoreWriter::new(NodeWriter::new());
//! writer.write_object_start("point").unwrap();
//! writer.write("x", &1i32).unwrap();
//! writer.write("y", &2i32).unwrap();
//! writer.write_object_end().unwrap();
//!
//! let tree = writer.into_inner().unwrap().into_root().unwrap();
//! assert_eq!(tree.name(), "point");
//! ```
//!
//! Dropping a writer closes it: objects still open are ended and the backend
//! is flushed. Use [`DataStoreWriter::close`] to see errors from that step.

use crate::backend::{BinaryWriter, TextWriter, ValueData, ValueWriter, WriteBackend};
use crate::codec::{CodecRegistry, ValueCodec};
use crate::error::Position;
use crate::name::{self, is_valid_name};
use crate::token::{Token, ValueKind};
use crate::{Error, Result};
use log::{debug, trace, warn};
use std::borrow::Cow;
use std::collections::HashSet;
use std::rc::Rc;

/// Writes the children of an object.
pub trait ObjectSerializer<T: ?Sized> {
    fn serialize<B: WriteBackend>(&self, value: &T, writer: &mut DataStoreWriter<B>) -> Result<()>;
}

pub struct DataStoreWriter<B: WriteBackend> {
    // only `None` after `into_inner`
    backend: Option<B>,
    codecs: Rc<CodecRegistry>,
    parents: Vec<String>,
    siblings: Vec<HashSet<String>>,
    root_written: bool,
    closed: bool,
}

impl<B: WriteBackend> DataStoreWriter<B> {
    /// Creates a writer using the basic codecs.
    pub fn new(backend: B) -> Self {
        Self::with_codecs(backend, Rc::new(CodecRegistry::default()))
    }

    pub fn with_codecs(backend: B, codecs: Rc<CodecRegistry>) -> Self {
        DataStoreWriter {
            backend: Some(backend),
            codecs,
            parents: Vec::new(),
            siblings: Vec::new(),
            root_written: false,
            closed: false,
        }
    }

    #[must_use]
    pub fn codecs(&self) -> &Rc<CodecRegistry> {
        &self.codecs
    }

    /// The number of open objects.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.parents.len()
    }

    /// The path of the innermost open object.
    #[must_use]
    pub fn path(&self) -> String {
        name::join(self.parents.iter().map(String::as_str))
    }

    fn position(&self, token: Token, name: Option<&str>) -> Position {
        let parent = self.path();
        let path = match name {
            Some(name) => name::combine(&parent, name),
            None => parent,
        };
        Position {
            token,
            name: name.map(str::to_string),
            depth: self.depth(),
            path,
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed || self.backend.is_none() {
            Err(Error::usage("the data store writer is closed"))
        } else {
            Ok(())
        }
    }

    fn backend_mut(&mut self) -> Result<&mut B> {
        self.backend
            .as_mut()
            .ok_or_else(|| Error::usage("the data store writer is closed"))
    }

    /// Checks a node about to be written: name syntax, uniqueness among its
    /// siblings and the single-root rule. Nothing is recorded until the
    /// backend has accepted the node.
    fn begin_node(&self, token: Token, name: &str) -> Result<()> {
        self.ensure_open()?;
        if !is_valid_name(name) {
            return Err(Error::format_at(
                format!("invalid node name {:?}", name),
                self.position(token, Some(name)),
            ));
        }

        match self.siblings.last() {
            Some(names) if names.contains(name) => Err(Error::format_at(
                format!("duplicate node name {:?}", name),
                self.position(token, Some(name)),
            )),
            None if self.root_written => Err(Error::format_at(
                "a data store has at most one root node",
                self.position(token, Some(name)),
            )),
            _ => Ok(()),
        }
    }

    fn commit_node(&mut self, name: &str) {
        match self.siblings.last_mut() {
            Some(names) => {
                names.insert(name.to_string());
            }
            None => self.root_written = true,
        }
    }

    /// Writes a value through a raw handle.
    ///
    /// The handle is text or binary, depending on what the backend asks for.
    pub fn write_value_with<F>(&mut self, name: &str, f: F) -> Result<()>
    where
        F: FnOnce(ValueWriter<'_>) -> Result<()>,
    {
        self.begin_node(Token::Value, name)?;

        let kind = match &self.backend {
            Some(backend) => backend.value_kind(name),
            None => return Err(Error::usage("the data store writer is closed")),
        };
        let data = match kind {
            ValueKind::Text => {
                let mut buf = String::new();
                f(ValueWriter::Text(TextWriter::new(&mut buf)))?;
                ValueData::Text(Cow::Owned(buf))
            }
            ValueKind::Binary => {
                let mut buf = Vec::new();
                f(ValueWriter::Binary(BinaryWriter::new(&mut buf)))?;
                ValueData::Binary(Cow::Owned(buf))
            }
        };

        let at = self.position(Token::Value, Some(name));
        trace!("{} {:?} ({}) at depth {}", Token::Value, name, kind, self.depth());
        self.backend_mut()?
            .write_value(name, data)
            .map_err(|e| e.with_position(at))?;
        self.commit_node(name);
        Ok(())
    }

    /// Writes a value with an explicit codec.
    pub fn serialize<T, C>(&mut self, name: &str, value: &T, codec: &C) -> Result<()>
    where
        C: ValueCodec<T> + ?Sized,
    {
        self.write_value_with(name, |handle| match handle {
            ValueWriter::Text(mut text) => codec.write_text(value, &mut text),
            ValueWriter::Binary(mut binary) => codec.write_binary(value, &mut binary),
        })
    }

    /// Writes a value with the registered codec for `T`.
    pub fn write<T: 'static>(&mut self, name: &str, value: &T) -> Result<()> {
        let codec = self.codecs.get::<T>()?;
        self.serialize(name, value, &*codec)
    }

    pub fn write_object_start(&mut self, name: &str) -> Result<()> {
        self.begin_node(Token::ObjectStart, name)?;
        let at = self.position(Token::ObjectStart, Some(name));
        trace!("{} {:?} at depth {}", Token::ObjectStart, name, self.depth());
        self.backend_mut()?
            .write_object_start(name)
            .map_err(|e| e.with_position(at))?;
        self.commit_node(name);
        self.parents.push(name.to_string());
        self.siblings.push(HashSet::new());
        Ok(())
    }

    /// Ends the innermost open object.
    ///
    /// # Errors
    ///
    /// Returns a format error if no object is open.
    pub fn write_object_end(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.parents.is_empty() {
            return Err(Error::format_at(
                "unbalanced object end: no object is open",
                self.position(Token::ObjectEnd, None),
            ));
        }

        trace!("{} at depth {}", Token::ObjectEnd, self.depth());
        self.backend_mut()?.write_object_end()?;
        self.parents.pop();
        self.siblings.pop();
        Ok(())
    }

    /// Writes an object: start, the serializer's children, end.
    ///
    /// If the serializer fails, the error is returned as is and no end is
    /// written for this object; closing the writer still ends it.
    pub fn write_object<T, S>(&mut self, name: &str, value: &T, serializer: &S) -> Result<()>
    where
        T: ?Sized,
        S: ObjectSerializer<T>,
    {
        self.write_object_with(name, |writer| serializer.serialize(value, writer))
    }

    /// Closure form of [`write_object`](DataStoreWriter::write_object).
    pub fn write_object_with<F>(&mut self, name: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        self.write_object_start(name)?;
        let depth = self.depth();
        f(self)?;
        if self.depth() != depth {
            return Err(Error::format_at(
                format!("the children of {:?} left unbalanced objects", name),
                self.position(Token::ObjectEnd, None),
            ));
        }
        self.write_object_end()
    }

    /// Ends every open object and flushes the backend.
    ///
    /// Closing twice is a no-op; writing after closing is a usage error.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let Some(backend) = self.backend.as_mut() else {
            return Ok(());
        };
        if !self.parents.is_empty() {
            debug!("closing {} open object(s)", self.parents.len());
        }
        while self.parents.pop().is_some() {
            self.siblings.pop();
            backend.write_object_end()?;
        }
        backend.finish()?;
        debug!("closed data store writer");
        Ok(())
    }

    /// Closes the writer and returns the backend.
    pub fn into_inner(mut self) -> Result<B> {
        self.close()?;
        self.backend
            .take()
            .ok_or_else(|| Error::usage("the data store writer is closed"))
    }
}

impl<B: WriteBackend> Drop for DataStoreWriter<B> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("failed to close data store writer: {}", e);
        }
    }
}
