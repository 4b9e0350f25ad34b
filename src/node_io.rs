//! Reading and writing [`DataStoreNode`] trees.
//!
//! [`NodeReader`] walks a borrowed tree depth first and hands out values
//! without copying them. [`NodeWriter`] builds a tree as tokens arrive. Both
//! are plain backends, so every structural check still happens in the
//! reader and writer cores.
//!
//! [`read_tree`] and [`write_tree`] move whole trees through any other
//! backend, which is how formats are compared: write a tree, read it back,
//! compare the trees.
//!
//! ```rust
//! use data_store::{DataStoreNode, DataStoreReader, DataStoreWriter, ObjectNode};
//! use data_store::node_io::{read_tree, write_tree};
//! use data_store::xml::{XmlReader, XmlWriter};
//!
//! let mut root = ObjectNode::new("root").unwrap();
//! root.insert(DataStoreNode::text("x", "1").unwrap()).unwrap();
//! let tree = DataStoreNode::Object(root);
//!
//! let mut writer = DataStoreWriter::new(XmlWriter::new(Vec::new()));
//! write_tree(&mut writer, &tree).unwrap();
//! let xml = writer.into_inner().unwrap().into_inner();
//!
//! let mut reader = DataStoreReader::new(XmlReader::new(&xml[..]));
//! assert_eq!(read_tree(&mut reader).unwrap(), Some(tree));
//! ```

use crate::backend::{ReadBackend, ValueData, ValueReader, ValueWriter, WriteBackend};
use crate::codec::BasicCodec;
use crate::node::{DataStoreNode, ObjectNode, ValueContent, ValueNode};
use crate::token::{Token, ValueKind};
use crate::{DataStoreReader, DataStoreWriter, Error, Result};
use std::borrow::Cow;
use std::io::Write;

type Children<'a> = indexmap::map::Values<'a, String, DataStoreNode>;

/// A [`ReadBackend`] over an in-memory tree.
#[derive(Debug)]
pub struct NodeReader<'a> {
    root: Option<&'a DataStoreNode>,
    // one iterator per open object
    stack: Vec<(&'a str, Children<'a>)>,
    current: Option<&'a ValueNode>,
}

impl<'a> NodeReader<'a> {
    pub fn new(root: &'a DataStoreNode) -> Self {
        NodeReader {
            root: Some(root),
            stack: Vec::new(),
            current: None,
        }
    }

    /// A reader over a data store with no root node.
    #[must_use]
    pub fn empty() -> Self {
        NodeReader {
            root: None,
            stack: Vec::new(),
            current: None,
        }
    }

    fn enter(&mut self, node: &'a DataStoreNode) -> (Token, Option<String>) {
        match node {
            DataStoreNode::Object(object) => {
                self.current = None;
                self.stack.push((object.name(), object.children()));
                (Token::ObjectStart, Some(object.name().to_string()))
            }
            DataStoreNode::Value(value) => {
                self.current = Some(value);
                (Token::Value, Some(value.name().to_string()))
            }
        }
    }
}

impl<'a> ReadBackend for NodeReader<'a> {
    fn read_token(&mut self) -> Result<(Token, Option<String>)> {
        if let Some(root) = self.root.take() {
            return Ok(self.enter(root));
        }

        let next = match self.stack.last_mut() {
            Some((_, children)) => children.next(),
            None => {
                self.current = None;
                return Ok((Token::DataStoreEnd, None));
            }
        };
        match next {
            Some(node) => Ok(self.enter(node)),
            None => {
                self.current = None;
                let name = self.stack.pop().map(|(name, _)| name.to_string());
                Ok((Token::ObjectEnd, name))
            }
        }
    }

    fn open_value(&mut self) -> Result<ValueData<'_>> {
        let value = self
            .current
            .ok_or_else(|| Error::usage("no value node to open"))?;
        Ok(match value.content() {
            ValueContent::Text(text) => ValueData::Text(Cow::Borrowed(text.as_str())),
            ValueContent::Binary(bytes) => ValueData::Binary(Cow::Borrowed(bytes.as_slice())),
        })
    }
}

/// A [`WriteBackend`] that builds a tree.
///
/// Values are stored in the encoding given at construction: text for
/// [`NodeWriter::new`], binary for [`NodeWriter::binary`].
#[derive(Debug)]
pub struct NodeWriter {
    kind: ValueKind,
    stack: Vec<ObjectNode>,
    root: Option<DataStoreNode>,
}

impl NodeWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::with_kind(ValueKind::Text)
    }

    #[must_use]
    pub fn binary() -> Self {
        Self::with_kind(ValueKind::Binary)
    }

    #[must_use]
    pub fn with_kind(kind: ValueKind) -> Self {
        NodeWriter {
            kind,
            stack: Vec::new(),
            root: None,
        }
    }

    /// The finished tree, or `None` if nothing was written.
    ///
    /// Objects still open are attached to their parents first.
    pub fn into_root(mut self) -> Option<DataStoreNode> {
        while self.write_object_end().is_ok() {}
        self.root
    }

    fn attach(&mut self, node: DataStoreNode) -> Result<()> {
        match self.stack.last_mut() {
            Some(parent) => parent.insert(node),
            None if self.root.is_some() => Err(Error::format(
                "a data store has at most one root node",
            )),
            None => {
                self.root = Some(node);
                Ok(())
            }
        }
    }
}

impl Default for NodeWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl WriteBackend for NodeWriter {
    fn value_kind(&self, _name: &str) -> ValueKind {
        self.kind
    }

    fn write_value(&mut self, name: &str, value: ValueData<'_>) -> Result<()> {
        let content = match value {
            ValueData::Text(text) => ValueContent::Text(text.into_owned()),
            ValueData::Binary(bytes) => ValueContent::Binary(bytes.into_owned()),
        };
        self.attach(ValueNode::new(name, content)?.into())
    }

    fn write_object_start(&mut self, name: &str) -> Result<()> {
        self.stack.push(ObjectNode::new(name)?);
        Ok(())
    }

    fn write_object_end(&mut self) -> Result<()> {
        let object = self
            .stack
            .pop()
            .ok_or_else(|| Error::format("unbalanced object end: no object is open"))?;
        self.attach(object.into())
    }
}

/// Reads the node under the cursor, with its whole subtree, and advances
/// past it.
///
/// # Errors
///
/// Returns a format error if the cursor is not on a value or object start.
pub fn read_node<B: ReadBackend>(reader: &mut DataStoreReader<B>) -> Result<DataStoreNode> {
    let name = reader.name().unwrap_or_default().to_string();
    match reader.token() {
        Token::Value => {
            let node = match reader.value()? {
                ValueReader::Text(text) => DataStoreNode::text(name, text.into_string())?,
                ValueReader::Binary(mut binary) => DataStoreNode::binary(name, binary.read_to_vec())?,
            };
            reader.advance()?;
            Ok(node)
        }
        Token::ObjectStart => reader.read_object(None, |reader| {
            let mut object = ObjectNode::new(name)?;
            while reader.token() != Token::ObjectEnd {
                object.insert(read_node(reader)?)?;
            }
            Ok(object.into())
        }),
        other => Err(Error::format(format!("expected a node but found {}", other))
            .with_position(reader.position())),
    }
}

/// Reads a whole data store, starting the reader if needed.
///
/// Returns `None` for a data store without a root node.
pub fn read_tree<B: ReadBackend>(reader: &mut DataStoreReader<B>) -> Result<Option<DataStoreNode>> {
    if reader.token() == Token::DataStoreStart {
        reader.advance()?;
    }
    if reader.is_end() {
        return Ok(None);
    }
    let root = read_node(reader)?;
    if !reader.is_end() {
        return Err(Error::format("content after the root node").with_position(reader.position()));
    }
    Ok(Some(root))
}

/// Writes a node and its subtree.
///
/// Text content goes through the `String` codec, so a binary backend stores
/// it in the binary string encoding. Binary content can only be written to a
/// backend that asks for binary.
pub fn write_node<B: WriteBackend>(writer: &mut DataStoreWriter<B>, node: &DataStoreNode) -> Result<()> {
    match node {
        DataStoreNode::Value(value) => match value.content() {
            ValueContent::Text(text) => writer.serialize(value.name(), text, &BasicCodec),
            ValueContent::Binary(bytes) => writer.write_value_with(value.name(), |handle| match handle {
                ValueWriter::Binary(mut out) => Ok(out.write_all(bytes)?),
                ValueWriter::Text(_) => Err(Error::usage(format!(
                    "binary value {:?} cannot be written to a text backend",
                    value.name()
                ))),
            }),
        },
        DataStoreNode::Object(object) => writer.write_object_with(object.name(), |writer| {
            object
                .children()
                .try_for_each(|child| write_node(writer, child))
        }),
    }
}

/// Writes a whole data store and closes the writer.
pub fn write_tree<B: WriteBackend>(writer: &mut DataStoreWriter<B>, root: &DataStoreNode) -> Result<()> {
    write_node(writer, root)?;
    writer.close()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DataStoreReader, DataStoreWriter};

    fn sample() -> DataStoreNode {
        let mut root = ObjectNode::new("root").unwrap();
        root.insert(DataStoreNode::text("x", "1").unwrap()).unwrap();
        let mut y = ObjectNode::new("y").unwrap();
        y.insert(DataStoreNode::text("z", "2").unwrap()).unwrap();
        root.insert(y).unwrap();
        root.into()
    }

    fn tokens(tree: &DataStoreNode) -> Vec<(Token, Option<String>)> {
        let mut reader = DataStoreReader::new(NodeReader::new(tree));
        let mut out = Vec::new();
        loop {
            let token = reader.advance().unwrap();
            out.push((token, reader.name().map(str::to_string)));
            if token == Token::DataStoreEnd {
                return out;
            }
        }
    }

    #[test]
    fn test_reader_token_sequence() {
        let seen = tokens(&sample());
        let names: Vec<_> = seen
            .iter()
            .map(|(t, n)| format!("{}:{}", t, n.as_deref().unwrap_or("-")))
            .collect();
        assert_eq!(
            names,
            vec![
                "ObjectStart:root",
                "Value:x",
                "ObjectStart:y",
                "Value:z",
                "ObjectEnd:y",
                "ObjectEnd:root",
                "DataStoreEnd:-",
            ]
        );
    }

    #[test]
    fn test_empty_reader() {
        let mut reader = DataStoreReader::new(NodeReader::empty());
        assert_eq!(reader.advance().unwrap(), Token::DataStoreEnd);
    }

    #[test]
    fn test_empty_object() {
        let tree = DataStoreNode::object("e").unwrap();
        let seen: Vec<_> = tokens(&tree).into_iter().map(|(t, _)| t).collect();
        assert_eq!(
            seen,
            vec![Token::ObjectStart, Token::ObjectEnd, Token::DataStoreEnd]
        );
    }

    #[test]
    fn test_round_trip_through_writer() {
        let tree = sample();
        let mut reader = DataStoreReader::new(NodeReader::new(&tree));
        let mut writer = DataStoreWriter::new(NodeWriter::new());

        reader.advance().unwrap();
        loop {
            match reader.token() {
                Token::ObjectStart => {
                    writer.write_object_start(reader.name().unwrap()).unwrap();
                }
                Token::ObjectEnd => writer.write_object_end().unwrap(),
                Token::Value => {
                    let name = reader.name().unwrap().to_string();
                    let text = reader.text().unwrap().into_string();
                    writer.write(&name, &text).unwrap();
                }
                _ => break,
            }
            reader.advance().unwrap();
        }

        let copy = writer.into_inner().unwrap().into_root().unwrap();
        assert_eq!(copy, tree);
    }

    #[test]
    fn test_binary_writer_stores_bytes() {
        let mut writer = DataStoreWriter::new(NodeWriter::binary());
        writer.write("v", &7i32).unwrap();
        let tree = writer.into_inner().unwrap().into_root().unwrap();
        assert_eq!(tree.as_bytes(), Some(&[7u8, 0, 0, 0][..]));

        let mut reader = DataStoreReader::new(NodeReader::new(&tree));
        reader.advance().unwrap();
        assert_eq!(reader.read_value::<i32>(Some("v")).unwrap(), 7);
    }

    #[test]
    fn test_into_root_closes_open_objects() {
        let mut backend = NodeWriter::new();
        backend.write_object_start("a").unwrap();
        backend.write_object_start("b").unwrap();
        let tree = backend.into_root().unwrap();
        assert!(tree.as_object().unwrap().get("b").unwrap().is_object());
    }

    #[test]
    fn test_tree_helpers_round_trip_binary() {
        let mut root = ObjectNode::new("r").unwrap();
        root.insert(DataStoreNode::binary("raw", vec![1u8, 2, 3]).unwrap()).unwrap();
        let tree: DataStoreNode = root.into();

        let mut writer = DataStoreWriter::new(NodeWriter::binary());
        write_tree(&mut writer, &tree).unwrap();
        let copy = writer.into_inner().unwrap().into_root().unwrap();
        assert_eq!(copy, tree);

        let mut reader = DataStoreReader::new(NodeReader::new(&copy));
        assert_eq!(read_tree(&mut reader).unwrap(), Some(tree));
    }

    #[test]
    fn test_binary_content_needs_binary_backend() {
        let tree = DataStoreNode::binary("raw", vec![1u8]).unwrap();
        let mut writer = DataStoreWriter::new(NodeWriter::new());
        assert!(matches!(write_tree(&mut writer, &tree), Err(Error::Usage(_))));
    }

    #[test]
    fn test_text_content_on_binary_backend_uses_string_encoding() {
        let tree = DataStoreNode::text("s", "A").unwrap();
        let mut writer = DataStoreWriter::new(NodeWriter::binary());
        write_tree(&mut writer, &tree).unwrap();
        let copy = writer.into_inner().unwrap().into_root().unwrap();
        assert_eq!(copy.as_bytes(), Some(&[1u8, 0, 0, 0, 0x41, 0][..]));
    }

    #[test]
    fn test_read_tree_of_empty_store() {
        let mut reader = DataStoreReader::new(NodeReader::empty());
        assert_eq!(read_tree(&mut reader).unwrap(), None);
    }
}
