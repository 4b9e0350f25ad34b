//! The reader core: a forward-only cursor over a backend's token stream.
//!
//! [`DataStoreReader`] drives any [`ReadBackend`] and adds everything the
//! backends share:
//!
//! - **Bookkeeping**: current token, name, depth and path, with the ancestor
//!   names kept on an explicit stack
//! - **Validation**: backends may only report the four structural tokens,
//!   node names must be valid, there is at most one root node and objects
//!   are balanced
//! - **Lazy values**: value handles are opened on request and closed before
//!   the cursor moves on
//! - **Object reads**: [`DataStoreReader::deserialize_object`] skips
//!   whatever children the object deserializer left unread
//!
//! ## Usage
//!
//! ```rust
//! use data_store::{DataStoreNode, DataStoreReader, ObjectNode, Token};
//! use data_store::node_io::NodeReader;
//!
//! let mut root = ObjectNode::new("point").unwrap();
//! root.insert(DataStoreNode::text("x", "1").unwrap()).unwrap();
//! root.insert(DataStoreNode::text("y", "2").unwrap()).unwrap();
//! let tree = DataStoreNode::Object(root);
//!
//! let mut reader = DataStoreReader::new(NodeReader::new(&tree));
//! reader.advance().unwrap();
//! reader.read_object_start(Some("point")).unwrap();
//! assert_eq!(reader.path(), "point/x");
//! let x: i32 = reader.read_value(Some("x")).unwrap();
//! let y: i32 = reader.read_value(Some("y")).unwrap();
//! reader.read_object_end().unwrap();
//! assert_eq!((x, y), (1, 2));
//! assert_eq!(reader.token(), Token::DataStoreEnd);
//! ```

use crate::backend::{BinaryReader, ReadBackend, TextReader, ValueReader};
use crate::codec::{CodecRegistry, ValueCodec};
use crate::error::Position;
use crate::name::{self, is_valid_name};
use crate::token::Token;
use crate::{Error, Result};
use log::{debug, trace, warn};
use std::cell::OnceCell;
use std::rc::Rc;

/// Reads an object's children from a reader positioned on its first child.
///
/// Implementations do not have to consume every child: the reader skips
/// whatever is left before returning to the caller.
pub trait ObjectDeserializer<T> {
    fn deserialize<B: ReadBackend>(&self, reader: &mut DataStoreReader<B>) -> Result<T>;
}

/// A forward-only cursor over a data store.
pub struct DataStoreReader<B: ReadBackend> {
    backend: B,
    codecs: Rc<CodecRegistry>,
    token: Token,
    name: Option<String>,
    parents: Vec<String>,
    // object ends passed so far, per depth
    ends: Vec<usize>,
    path: OnceCell<String>,
    root_seen: bool,
    value_open: bool,
    closed: bool,
}

impl<B: ReadBackend> DataStoreReader<B> {
    /// Creates a reader using the basic codecs.
    pub fn new(backend: B) -> Self {
        Self::with_codecs(backend, Rc::new(CodecRegistry::default()))
    }

    /// Creates a reader resolving value codecs from `codecs`.
    pub fn with_codecs(backend: B, codecs: Rc<CodecRegistry>) -> Self {
        DataStoreReader {
            backend,
            codecs,
            token: Token::DataStoreStart,
            name: None,
            parents: Vec::new(),
            ends: Vec::new(),
            path: OnceCell::new(),
            root_seen: false,
            value_open: false,
            closed: false,
        }
    }

    #[must_use]
    pub fn codecs(&self) -> &Rc<CodecRegistry> {
        &self.codecs
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[inline]
    #[must_use]
    pub fn token(&self) -> Token {
        self.token
    }

    /// The name of the current node.
    ///
    /// On `ObjectEnd` this is the name of the object being closed. There is
    /// no name before the first token and at the end of the data store.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The number of open ancestor objects.
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.parents.len()
    }

    #[must_use]
    pub fn is_end(&self) -> bool {
        self.token == Token::DataStoreEnd
    }

    /// The path of the current node's parent. Empty at the root level.
    #[must_use]
    pub fn parent_path(&self) -> String {
        name::join(self.parents.iter().map(String::as_str))
    }

    /// The path of the current node, from the root.
    ///
    /// Never fails, so it is safe to use while reporting errors.
    pub fn path(&self) -> &str {
        self.path.get_or_init(|| {
            let parent = self.parent_path();
            match &self.name {
                Some(name) => name::combine(&parent, name),
                None => parent,
            }
        })
    }

    /// A snapshot of the cursor for diagnostics.
    #[must_use]
    pub fn position(&self) -> Position {
        Position {
            token: self.token,
            name: self.name.clone(),
            depth: self.depth(),
            path: self.path().to_string(),
        }
    }

    fn error(&self, msg: impl std::fmt::Display) -> Error {
        Error::format_at(msg, self.position())
    }

    fn error_at(&self, token: Token, name: Option<String>, msg: impl std::fmt::Display) -> Error {
        let parent = self.parent_path();
        let path = match &name {
            Some(name) => name::combine(&parent, name),
            None => parent,
        };
        Error::format_at(
            msg,
            Position {
                token,
                name,
                depth: self.depth(),
                path,
            },
        )
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(Error::usage("the data store reader is closed"))
        } else {
            Ok(())
        }
    }

    fn expect_token(&self, expected: Token) -> Result<()> {
        if self.token == expected {
            Ok(())
        } else {
            Err(self.error(format!("expected {} but found {}", expected, self.token)))
        }
    }

    fn expect_name(&self, expected: Option<&str>) -> Result<()> {
        match expected {
            Some(expected) if self.name.as_deref() != Some(expected) => Err(self.error(format!(
                "name mismatch: expected {:?}, found {:?}",
                expected,
                self.name.as_deref().unwrap_or("")
            ))),
            _ => Ok(()),
        }
    }

    fn close_value_handle(&mut self) -> Result<()> {
        if self.value_open {
            self.value_open = false;
            self.backend.close_value()?;
        }
        Ok(())
    }

    /// Moves to the next token.
    ///
    /// Once `DataStoreEnd` has been reached, further calls return it again.
    ///
    /// # Errors
    ///
    /// Returns a format error if the backend reports an invalid token or
    /// name, a second root node, an `ObjectEnd` with no open object, or the
    /// end of the data store while objects are still open.
    pub fn advance(&mut self) -> Result<Token> {
        self.ensure_open()?;
        if self.token == Token::DataStoreEnd {
            return Ok(Token::DataStoreEnd);
        }

        self.close_value_handle()?;

        // the next token is read as a child of the object just started
        if self.token == Token::ObjectStart {
            if let Some(name) = self.name.take() {
                self.parents.push(name);
            }
        }
        self.path = OnceCell::new();

        let (token, name) = self.backend.read_token().map_err(|e| {
            e.with_position(Position {
                token: self.token,
                name: None,
                depth: self.parents.len(),
                path: name::join(self.parents.iter().map(String::as_str)),
            })
        })?;

        let name = match token {
            Token::Value | Token::ObjectStart => {
                let name = match name {
                    Some(name) if is_valid_name(&name) => name,
                    Some(name) => {
                        let msg = format!("invalid node name {:?}", name);
                        return Err(self.error_at(token, Some(name), msg));
                    }
                    None => return Err(self.error_at(token, None, "node without a name")),
                };
                if self.parents.is_empty() {
                    if self.root_seen {
                        return Err(self.error_at(
                            token,
                            Some(name),
                            "a data store has at most one root node",
                        ));
                    }
                    self.root_seen = true;
                }
                Some(name)
            }
            Token::ObjectEnd => {
                let Some(closed) = self.parents.pop() else {
                    return Err(self.error_at(token, name, "unbalanced object end"));
                };
                if let Some(reported) = name {
                    if reported != closed {
                        let msg = format!(
                            "object end for {:?} while {:?} is open",
                            reported, closed
                        );
                        self.parents.push(closed);
                        return Err(self.error_at(token, Some(reported), msg));
                    }
                }
                let depth = self.parents.len();
                if self.ends.len() <= depth {
                    self.ends.resize(depth + 1, 0);
                }
                self.ends[depth] += 1;
                Some(closed)
            }
            Token::DataStoreEnd => {
                if !self.parents.is_empty() {
                    let msg = format!(
                        "unexpected end of data store with {} open object(s)",
                        self.parents.len()
                    );
                    return Err(self.error_at(token, None, msg));
                }
                None
            }
            Token::DataStoreStart => {
                return Err(self.error_at(token, name, "backend reported an invalid token"));
            }
        };

        self.token = token;
        self.name = name;
        self.path = OnceCell::new();
        trace!("{} {:?} at depth {}", token, self.name, self.depth());
        Ok(token)
    }

    /// Opens a handle on the current value, closing any handle opened before.
    ///
    /// # Errors
    ///
    /// Returns a format error if the cursor is not on a value.
    pub fn value(&mut self) -> Result<ValueReader<'_>> {
        self.ensure_open()?;
        self.expect_token(Token::Value)?;
        self.close_value_handle()?;

        let data = self.backend.open_value()?;
        self.value_open = true;
        Ok(ValueReader::from(data))
    }

    /// Opens a text handle on the current value.
    ///
    /// # Errors
    ///
    /// Returns a usage error if the backend stores the value as binary.
    pub fn text(&mut self) -> Result<TextReader<'_>> {
        match self.value()? {
            ValueReader::Text(text) => Ok(text),
            ValueReader::Binary(_) => Err(Error::usage(
                "the current value is binary; no text handle is available",
            )),
        }
    }

    /// Opens a binary handle on the current value.
    ///
    /// # Errors
    ///
    /// Returns a usage error if the backend stores the value as text.
    pub fn binary(&mut self) -> Result<BinaryReader<'_>> {
        match self.value()? {
            ValueReader::Binary(binary) => Ok(binary),
            ValueReader::Text(_) => Err(Error::usage(
                "the current value is text; no binary handle is available",
            )),
        }
    }

    /// Deserializes the current value with `codec`, without advancing.
    ///
    /// # Errors
    ///
    /// Returns a format error if the cursor is not on a value or its name
    /// differs from `expected`. Codec errors are returned unchanged.
    pub fn deserialize<T, C>(&mut self, codec: &C, expected: Option<&str>) -> Result<T>
    where
        C: ValueCodec<T> + ?Sized,
    {
        self.ensure_open()?;
        self.expect_token(Token::Value)?;
        self.expect_name(expected)?;

        match self.value()? {
            ValueReader::Text(mut text) => codec.read_text(&mut text),
            ValueReader::Binary(mut binary) => codec.read_binary(&mut binary),
        }
    }

    /// Deserializes the current value with the registered codec for `T`,
    /// then advances past it.
    pub fn read_value<T: 'static>(&mut self, expected: Option<&str>) -> Result<T> {
        let codec = self.codecs.get::<T>()?;
        let value = self.deserialize(&*codec, expected)?;
        self.advance()?;
        Ok(value)
    }

    /// Reads the current object with `deserializer` and advances past its end.
    ///
    /// The deserializer is called with the cursor on the object's first child
    /// (or on its `ObjectEnd`). Children it leaves unread are skipped.
    ///
    /// # Errors
    ///
    /// Returns a format error if the cursor is not on an object start, the
    /// name differs from `expected`, or the deserializer reads past the end
    /// of the object. Errors from the deserializer are returned unchanged and
    /// leave the cursor somewhere inside the object.
    pub fn deserialize_object<T, D>(&mut self, deserializer: &D, expected: Option<&str>) -> Result<T>
    where
        D: ObjectDeserializer<T>,
    {
        self.read_object(expected, |reader| deserializer.deserialize(reader))
    }

    /// Closure form of [`deserialize_object`](DataStoreReader::deserialize_object).
    pub fn read_object<T, F>(&mut self, expected: Option<&str>, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        self.ensure_open()?;
        self.expect_token(Token::ObjectStart)?;
        self.expect_name(expected)?;

        let (depth, ends) = self.object_mark();
        self.advance()?;
        let value = f(self)?;
        self.finish_object(depth, ends)?;
        Ok(value)
    }

    /// The depth of the object starting at the cursor, with the number of
    /// object ends passed at that depth so far.
    fn object_mark(&self) -> (usize, usize) {
        let depth = self.depth();
        (depth, self.ends.get(depth).copied().unwrap_or(0))
    }

    /// Advances to the `ObjectEnd` of the object started at `depth`, then past it.
    ///
    /// `ends` is the count from [`object_mark`](Self::object_mark) taken on
    /// the object's start, so the end of a later sibling is not mistaken for
    /// the object's own.
    fn finish_object(&mut self, depth: usize, ends: usize) -> Result<()> {
        let mut skipped = 0usize;
        loop {
            match self.token {
                Token::ObjectEnd if self.depth() == depth => {
                    if self.ends.get(depth).copied().unwrap_or(0) != ends + 1 {
                        return Err(self.error("read past the end of the object"));
                    }
                    break;
                }
                Token::DataStoreEnd | Token::DataStoreStart => {
                    return Err(self.error("read past the end of the object"));
                }
                _ if self.depth() <= depth => {
                    return Err(self.error("read past the end of the object"));
                }
                _ => {
                    skipped += 1;
                    self.advance()?;
                }
            }
        }

        if skipped > 0 {
            debug!("skipped {} unread token(s) in {:?}", skipped, self.path());
        }
        self.advance()?;
        Ok(())
    }

    /// Checks that the cursor is on the named object start and moves to its
    /// first child.
    pub fn read_object_start(&mut self, expected: Option<&str>) -> Result<()> {
        self.ensure_open()?;
        self.expect_token(Token::ObjectStart)?;
        self.expect_name(expected)?;
        self.advance()?;
        Ok(())
    }

    /// Checks that the cursor is on an object end and moves past it.
    pub fn read_object_end(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.expect_token(Token::ObjectEnd)?;
        self.advance()?;
        Ok(())
    }

    /// Skips the current node, including the whole subtree of an object.
    pub fn skip(&mut self) -> Result<()> {
        self.ensure_open()?;
        match self.token {
            Token::Value => {
                self.advance()?;
                Ok(())
            }
            Token::ObjectStart => {
                let (depth, ends) = self.object_mark();
                self.advance()?;
                self.finish_object(depth, ends)
            }
            other => Err(self.error(format!("cannot skip {}", other))),
        }
    }

    /// Closes any open value handle. Further use of the reader is an error.
    ///
    /// Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        debug!("closing data store reader at {:?}", self.path());
        self.close_value_handle()
    }
}

impl<B: ReadBackend> Drop for DataStoreReader<B> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("failed to close data store reader: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ValueData;
    use crate::codec::BasicCodec;
    use std::borrow::Cow;
    use std::collections::VecDeque;

    type Step = (Token, Option<&'static str>, &'static str);

    /// Replays a fixed token sequence and counts value handles.
    #[derive(Default)]
    struct Scripted {
        steps: VecDeque<Step>,
        current: &'static str,
        open: usize,
        max_open: usize,
        opened: usize,
    }

    impl Scripted {
        fn new(steps: Vec<Step>) -> Self {
            Scripted {
                steps: steps.into(),
                ..Default::default()
            }
        }
    }

    impl ReadBackend for Scripted {
        fn read_token(&mut self) -> Result<(Token, Option<String>)> {
            match self.steps.pop_front() {
                Some((token, name, value)) => {
                    self.current = value;
                    Ok((token, name.map(str::to_string)))
                }
                None => Ok((Token::DataStoreEnd, None)),
            }
        }

        fn open_value(&mut self) -> Result<ValueData<'_>> {
            self.open += 1;
            self.opened += 1;
            self.max_open = self.max_open.max(self.open);
            Ok(ValueData::Text(Cow::Borrowed(self.current)))
        }

        fn close_value(&mut self) -> Result<()> {
            self.open -= 1;
            Ok(())
        }
    }

    fn sample() -> Scripted {
        // {root: {x: "1", y: {z: "2"}}}
        Scripted::new(vec![
            (Token::ObjectStart, Some("root"), ""),
            (Token::Value, Some("x"), "1"),
            (Token::ObjectStart, Some("y"), ""),
            (Token::Value, Some("z"), "2"),
            (Token::ObjectEnd, None, ""),
            (Token::ObjectEnd, None, ""),
        ])
    }

    #[test]
    fn test_advance_tracks_depth_and_path() {
        let mut reader = DataStoreReader::new(sample());
        assert_eq!(reader.token(), Token::DataStoreStart);
        assert_eq!(reader.path(), "");

        let expected = [
            (Token::ObjectStart, Some("root"), 0, "root"),
            (Token::Value, Some("x"), 1, "root/x"),
            (Token::ObjectStart, Some("y"), 1, "root/y"),
            (Token::Value, Some("z"), 2, "root/y/z"),
            (Token::ObjectEnd, Some("y"), 1, "root/y"),
            (Token::ObjectEnd, Some("root"), 0, "root"),
            (Token::DataStoreEnd, None, 0, ""),
        ];
        for (token, name, depth, path) in expected {
            assert_eq!(reader.advance().unwrap(), token);
            assert_eq!(reader.name(), name);
            assert_eq!(reader.depth(), depth);
            assert_eq!(reader.path(), path);
        }
    }

    #[test]
    fn test_advance_after_end_is_noop() {
        let mut reader = DataStoreReader::new(Scripted::new(vec![]));
        assert_eq!(reader.advance().unwrap(), Token::DataStoreEnd);
        assert_eq!(reader.advance().unwrap(), Token::DataStoreEnd);
        assert!(reader.is_end());
        assert_eq!(reader.depth(), 0);
        assert_eq!(reader.path(), "");
    }

    #[test]
    fn test_second_root_rejected() {
        let mut reader = DataStoreReader::new(Scripted::new(vec![
            (Token::Value, Some("a"), "1"),
            (Token::Value, Some("b"), "2"),
        ]));
        reader.advance().unwrap();
        let err = reader.advance().unwrap_err();
        assert!(err.is_format());
        assert!(err.to_string().contains("at most one root"));
    }

    #[test]
    fn test_extra_object_end_reports_depth() {
        let mut reader = DataStoreReader::new(Scripted::new(vec![
            (Token::ObjectStart, Some("a"), ""),
            (Token::ObjectStart, Some("b"), ""),
            (Token::ObjectEnd, None, ""),
            (Token::ObjectEnd, None, ""),
            (Token::ObjectEnd, None, ""),
        ]));
        for _ in 0..4 {
            reader.advance().unwrap();
        }
        assert_eq!(reader.name(), Some("a"));

        let err = reader.advance().unwrap_err();
        let position = err.position().unwrap();
        assert_eq!(position.token, Token::ObjectEnd);
        assert_eq!(position.depth, 0);
        assert!(err.to_string().contains("unbalanced"));
        // accessors stay usable after the failure
        assert_eq!(reader.depth(), 0);
        let _ = reader.path();
    }

    #[test]
    fn test_unexpected_end_inside_object() {
        let mut reader = DataStoreReader::new(Scripted::new(vec![
            (Token::ObjectStart, Some("a"), ""),
            (Token::Value, Some("b"), "1"),
        ]));
        reader.advance().unwrap();
        reader.advance().unwrap();
        let err = reader.advance().unwrap_err();
        assert_eq!(err.position().unwrap().depth, 1);
        assert!(err.to_string().contains("open object"));
    }

    #[test]
    fn test_invalid_tokens_and_names_rejected() {
        let mut reader =
            DataStoreReader::new(Scripted::new(vec![(Token::Value, Some("1x"), "")]));
        assert!(reader.advance().unwrap_err().is_format());

        let mut reader = DataStoreReader::new(Scripted::new(vec![(Token::ObjectStart, None, "")]));
        assert!(reader.advance().unwrap_err().is_format());

        let mut reader =
            DataStoreReader::new(Scripted::new(vec![(Token::DataStoreStart, None, "")]));
        assert!(reader.advance().unwrap_err().is_format());
    }

    #[test]
    fn test_object_end_name_checked() {
        let mut reader = DataStoreReader::new(Scripted::new(vec![
            (Token::ObjectStart, Some("a"), ""),
            (Token::ObjectEnd, Some("b"), ""),
        ]));
        reader.advance().unwrap();
        assert!(reader.advance().unwrap_err().is_format());
    }

    #[test]
    fn test_value_handle_discipline() {
        let mut reader = DataStoreReader::new(sample());
        reader.advance().unwrap();
        reader.advance().unwrap();

        assert_eq!(reader.text().unwrap().as_str(), "1");
        assert_eq!(reader.text().unwrap().as_str(), "1");
        assert_eq!(reader.backend().opened, 2);
        assert_eq!(reader.backend().max_open, 1);

        reader.advance().unwrap();
        assert_eq!(reader.backend().open, 0);
    }

    #[test]
    fn test_advance_without_handle() {
        let mut reader = DataStoreReader::new(sample());
        while !reader.is_end() {
            reader.advance().unwrap();
        }
        assert_eq!(reader.backend().opened, 0);
    }

    #[test]
    fn test_binary_handle_on_text_value() {
        let mut reader = DataStoreReader::new(sample());
        reader.advance().unwrap();
        reader.advance().unwrap();
        assert!(matches!(reader.binary(), Err(Error::Usage(_))));
    }

    #[test]
    fn test_value_handle_requires_value_token() {
        let mut reader = DataStoreReader::new(sample());
        reader.advance().unwrap();
        assert!(reader.value().unwrap_err().is_format());
    }

    #[test]
    fn test_deserialize_checks_token_and_name() {
        let mut reader = DataStoreReader::new(sample());
        reader.advance().unwrap();
        assert!(reader
            .deserialize::<i32, _>(&BasicCodec, None)
            .unwrap_err()
            .is_format());

        reader.advance().unwrap();
        let err = reader
            .deserialize::<i32, _>(&BasicCodec, Some("X"))
            .unwrap_err();
        assert!(err.to_string().contains("name mismatch"));

        // does not advance
        assert_eq!(reader.deserialize::<i32, _>(&BasicCodec, Some("x")).unwrap(), 1);
        assert_eq!(reader.name(), Some("x"));
    }

    #[test]
    fn test_codec_errors_pass_through() {
        let mut reader =
            DataStoreReader::new(Scripted::new(vec![(Token::Value, Some("v"), "abc")]));
        reader.advance().unwrap();
        let err = reader.read_value::<i32>(Some("v")).unwrap_err();
        assert!(matches!(err, Error::Codec { .. }));
    }

    struct FirstChildOnly;

    impl ObjectDeserializer<String> for FirstChildOnly {
        fn deserialize<B: ReadBackend>(&self, reader: &mut DataStoreReader<B>) -> Result<String> {
            reader.read_value::<String>(Some("x"))
        }
    }

    #[test]
    fn test_deserialize_object_skips_unread_children() {
        let mut reader = DataStoreReader::new(Scripted::new(vec![
            (Token::ObjectStart, Some("list"), ""),
            (Token::ObjectStart, Some("first"), ""),
            (Token::Value, Some("x"), "1"),
            (Token::ObjectStart, Some("y"), ""),
            (Token::Value, Some("z"), "2"),
            (Token::ObjectEnd, None, ""),
            (Token::Value, Some("w"), "3"),
            (Token::ObjectEnd, None, ""),
            (Token::Value, Some("second"), "4"),
            (Token::ObjectEnd, None, ""),
        ]));
        reader.advance().unwrap();
        reader.read_object_start(Some("list")).unwrap();

        let x = reader.deserialize_object(&FirstChildOnly, Some("first")).unwrap();
        assert_eq!(x, "1");
        assert_eq!(reader.token(), Token::Value);
        assert_eq!(reader.name(), Some("second"));
        assert_eq!(reader.depth(), 1);

        assert_eq!(reader.read_value::<i32>(Some("second")).unwrap(), 4);
        reader.read_object_end().unwrap();
        assert!(reader.is_end());
    }

    #[test]
    fn test_read_object_detects_over_read() {
        let mut reader = DataStoreReader::new(Scripted::new(vec![
            (Token::ObjectStart, Some("a"), ""),
            (Token::ObjectStart, Some("b"), ""),
            (Token::ObjectEnd, None, ""),
            (Token::Value, Some("c"), "1"),
            (Token::ObjectEnd, None, ""),
        ]));
        reader.advance().unwrap();
        reader.advance().unwrap();
        let err = reader
            .read_object(Some("b"), |r| {
                r.read_object_end()?;
                Ok(())
            })
            .unwrap_err();
        assert!(err.to_string().contains("past the end"));
    }

    #[test]
    fn test_read_object_detects_over_read_into_sibling_object() {
        let mut reader = DataStoreReader::new(Scripted::new(vec![
            (Token::ObjectStart, Some("a"), ""),
            (Token::ObjectStart, Some("b"), ""),
            (Token::Value, Some("x"), "1"),
            (Token::ObjectEnd, None, ""),
            (Token::ObjectStart, Some("c"), ""),
            (Token::Value, Some("y"), "2"),
            (Token::ObjectEnd, None, ""),
            (Token::ObjectEnd, None, ""),
        ]));
        reader.advance().unwrap();
        reader.advance().unwrap();
        let err = reader
            .read_object(Some("b"), |r| {
                r.read_value::<i32>(Some("x"))?;
                r.read_object_end()?;
                r.read_object_start(Some("c"))?;
                r.read_value::<i32>(Some("y"))
            })
            .unwrap_err();
        assert!(err.to_string().contains("past the end"));
    }

    #[test]
    fn test_skip_subtree() {
        let mut reader = DataStoreReader::new(sample());
        reader.advance().unwrap();
        reader.advance().unwrap();
        reader.skip().unwrap();
        assert_eq!(reader.name(), Some("y"));
        reader.skip().unwrap();
        assert_eq!(reader.token(), Token::ObjectEnd);
        assert_eq!(reader.name(), Some("root"));
        assert!(reader.skip().unwrap_err().is_format());
    }

    #[test]
    fn test_closed_reader_is_unusable() {
        let mut reader = DataStoreReader::new(sample());
        reader.advance().unwrap();
        reader.close().unwrap();
        reader.close().unwrap();
        assert!(matches!(reader.advance(), Err(Error::Usage(_))));
        assert_eq!(reader.path(), "root");
    }

    #[test]
    fn test_close_releases_open_handle() {
        let mut reader = DataStoreReader::new(sample());
        reader.advance().unwrap();
        reader.advance().unwrap();
        reader.value().unwrap();
        reader.close().unwrap();
        assert_eq!(reader.backend().open, 0);
    }
}
