//! JSON backend.
//!
//! Data store JSON, the shape [`JsonWriter`] produces, wraps the root node in
//! an outer object keyed by the root's name. Every value is a JSON string:
//!
//! ```text
//! {"root":{"x":"1","y":{"z":"2"}}}
//! ```
//!
//! An empty data store is `{}`.
//!
//! Foreign JSON (see [`JsonOptions::foreign`]) is read more leniently: the
//! whole document becomes one root node named after
//! [`JsonOptions::root_name`], member names are escaped with
//! [`name::escape`](crate::name::escape), arrays become objects whose
//! children are named `i0`, `i1`, ..., `null` becomes an empty text value
//! and numbers and booleans become their JSON text. None of this can be
//! undone, so foreign JSON does not round trip.
//!
//! JSON has no binary values: the writer always asks for text.

use crate::backend::{ReadBackend, ValueData, WriteBackend};
use crate::name;
use crate::options::JsonOptions;
use crate::token::{Token, ValueKind};
use crate::{Error, Result};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::io::{self, Write};
use std::iter::Enumerate;

enum Frame {
    Object(serde_json::map::IntoIter),
    Array(Enumerate<std::vec::IntoIter<Value>>),
}

/// A [`ReadBackend`] over a parsed JSON document.
pub struct JsonReader {
    root: Option<(String, Value)>,
    stack: Vec<Frame>,
    escape_names: bool,
    value: String,
}

impl JsonReader {
    /// Wraps an already parsed document.
    ///
    /// # Errors
    ///
    /// In data store mode, returns a format error unless the document is an
    /// object with at most one member. In foreign mode, returns a format
    /// error if the configured root name is not a valid node name.
    pub fn from_value(document: Value, options: &JsonOptions) -> Result<Self> {
        let root = if options.data_store_json {
            match document {
                Value::Object(map) if map.len() <= 1 => map.into_iter().next(),
                Value::Object(map) => {
                    return Err(Error::format(format!(
                        "data store JSON has at most one root member, found {}",
                        map.len()
                    )));
                }
                _ => return Err(Error::format("data store JSON must be an object")),
            }
        } else {
            name::validate_name(&options.root_name)?;
            Some((options.root_name.clone(), document))
        };

        Ok(JsonReader {
            root,
            stack: Vec::new(),
            escape_names: !options.data_store_json,
            value: String::new(),
        })
    }

    pub fn from_str(json: &str, options: &JsonOptions) -> Result<Self> {
        let document = serde_json::from_str(json).map_err(Error::json)?;
        Self::from_value(document, options)
    }

    pub fn from_reader<R: io::Read>(reader: R, options: &JsonOptions) -> Result<Self> {
        let document = serde_json::from_reader(reader).map_err(Error::json)?;
        Self::from_value(document, options)
    }

    fn enter(&mut self, name: String, value: Value) -> (Token, Option<String>) {
        let token = match value {
            Value::Object(map) => {
                self.stack.push(Frame::Object(map.into_iter()));
                Token::ObjectStart
            }
            Value::Array(items) => {
                self.stack.push(Frame::Array(items.into_iter().enumerate()));
                Token::ObjectStart
            }
            Value::String(text) => {
                self.value = text;
                Token::Value
            }
            Value::Null => {
                self.value.clear();
                Token::Value
            }
            Value::Bool(flag) => {
                self.value = flag.to_string();
                Token::Value
            }
            Value::Number(number) => {
                self.value = number.to_string();
                Token::Value
            }
        };
        (token, Some(name))
    }
}

impl ReadBackend for JsonReader {
    fn read_token(&mut self) -> Result<(Token, Option<String>)> {
        if let Some((name, value)) = self.root.take() {
            return Ok(self.enter(name, value));
        }

        let escape = self.escape_names;
        let next = match self.stack.last_mut() {
            None => return Ok((Token::DataStoreEnd, None)),
            Some(Frame::Object(members)) => members
                .next()
                .map(|(key, value)| (if escape { name::escape(&key) } else { key }, value)),
            Some(Frame::Array(items)) => items
                .next()
                .map(|(index, value)| (name::index_name(index), value)),
        };

        match next {
            Some((name, value)) => Ok(self.enter(name, value)),
            None => {
                self.stack.pop();
                Ok((Token::ObjectEnd, None))
            }
        }
    }

    fn open_value(&mut self) -> Result<ValueData<'_>> {
        Ok(ValueData::Text(Cow::Borrowed(self.value.as_str())))
    }
}

/// A [`WriteBackend`] producing a JSON document.
///
/// The document is built in memory and written to the stream when the data
/// store writer is closed.
pub struct JsonWriter<W: Write> {
    out: W,
    options: JsonOptions,
    stack: Vec<(String, Map<String, Value>)>,
    root: Option<(String, Value)>,
    finished: bool,
}

impl<W: Write> JsonWriter<W> {
    pub fn new(out: W) -> Self {
        Self::with_options(out, JsonOptions::default())
    }

    pub fn with_options(out: W, options: JsonOptions) -> Self {
        JsonWriter {
            out,
            options,
            stack: Vec::new(),
            root: None,
            finished: false,
        }
    }

    #[must_use]
    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn member_name(&self, name: &str) -> Result<String> {
        if self.options.data_store_json {
            Ok(name.to_string())
        } else {
            name::unescape(name)
        }
    }

    fn attach(&mut self, name: String, value: Value) -> Result<()> {
        match self.stack.last_mut() {
            Some((parent, members)) => {
                if members.contains_key(&name) {
                    return Err(Error::format(format!(
                        "duplicate member {:?} in {:?}",
                        name, parent
                    )));
                }
                members.insert(name, value);
                Ok(())
            }
            None if self.root.is_some() => {
                Err(Error::format("a data store has at most one root node"))
            }
            None => {
                self.root = Some((name, value));
                Ok(())
            }
        }
    }

    fn document(&mut self) -> Value {
        match self.root.take() {
            Some((_, value)) if !self.options.data_store_json => value,
            Some((name, value)) => {
                let mut outer = Map::new();
                outer.insert(name, value);
                Value::Object(outer)
            }
            None if self.options.data_store_json => Value::Object(Map::new()),
            None => Value::Null,
        }
    }
}

impl<W: Write> WriteBackend for JsonWriter<W> {
    fn value_kind(&self, _name: &str) -> ValueKind {
        ValueKind::Text
    }

    fn write_value(&mut self, name: &str, value: ValueData<'_>) -> Result<()> {
        let ValueData::Text(text) = value else {
            return Err(Error::usage("JSON cannot hold binary values"));
        };
        let name = self.member_name(name)?;
        self.attach(name, Value::String(text.into_owned()))
    }

    fn write_object_start(&mut self, name: &str) -> Result<()> {
        let name = self.member_name(name)?;
        self.stack.push((name, Map::new()));
        Ok(())
    }

    fn write_object_end(&mut self) -> Result<()> {
        let (name, members) = self
            .stack
            .pop()
            .ok_or_else(|| Error::format("unbalanced object end: no object is open"))?;
        self.attach(name, Value::Object(members))
    }

    fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        while !self.stack.is_empty() {
            self.write_object_end()?;
        }

        let document = self.document();
        if self.options.pretty {
            serde_json::to_writer_pretty(&mut self.out, &document).map_err(Error::json)?;
        } else {
            serde_json::to_writer(&mut self.out, &document).map_err(Error::json)?;
        }
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{DataStoreNode, ObjectNode};
    use crate::node_io::{read_tree, write_tree};
    use crate::{DataStoreReader, DataStoreWriter};

    fn sample() -> DataStoreNode {
        let mut root = ObjectNode::new("root").unwrap();
        root.insert(DataStoreNode::text("x", "1").unwrap()).unwrap();
        let mut y = ObjectNode::new("y").unwrap();
        y.insert(DataStoreNode::text("z", "2").unwrap()).unwrap();
        root.insert(y).unwrap();
        root.into()
    }

    fn write(tree: &DataStoreNode, options: JsonOptions) -> String {
        let mut writer = DataStoreWriter::new(JsonWriter::with_options(Vec::new(), options));
        write_tree(&mut writer, tree).unwrap();
        String::from_utf8(writer.into_inner().unwrap().into_inner()).unwrap()
    }

    fn read(json: &str, options: &JsonOptions) -> Result<Option<DataStoreNode>> {
        let mut reader = DataStoreReader::new(JsonReader::from_str(json, options)?);
        read_tree(&mut reader)
    }

    #[test]
    fn test_write_data_store_json() {
        assert_eq!(
            write(&sample(), JsonOptions::new()),
            r#"{"root":{"x":"1","y":{"z":"2"}}}"#
        );
    }

    #[test]
    fn test_round_trip() {
        let tree = sample();
        let json = write(&tree, JsonOptions::new());
        assert_eq!(read(&json, &JsonOptions::new()).unwrap(), Some(tree));
    }

    #[test]
    fn test_round_trip_pretty() {
        let tree = sample();
        let json = write(&tree, JsonOptions::pretty());
        assert!(json.contains('\n'));
        assert_eq!(read(&json, &JsonOptions::new()).unwrap(), Some(tree));
    }

    #[test]
    fn test_member_order_preserved() {
        let json = r#"{"r":{"b":"1","a":"2"}}"#;
        let tree = read(json, &JsonOptions::new()).unwrap().unwrap();
        let names: Vec<_> = tree
            .as_object()
            .unwrap()
            .children()
            .map(DataStoreNode::name)
            .collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn test_empty_data_store() {
        let writer = DataStoreWriter::new(JsonWriter::new(Vec::new()));
        let bytes = writer.into_inner().unwrap().into_inner();
        assert_eq!(bytes, b"{}");
        assert_eq!(read("{}", &JsonOptions::new()).unwrap(), None);
    }

    #[test]
    fn test_data_store_json_shape_checked() {
        assert!(read("[1]", &JsonOptions::new()).unwrap_err().is_format());
        assert!(read(r#"{"a":"1","b":"2"}"#, &JsonOptions::new())
            .unwrap_err()
            .is_format());
        assert!(matches!(read("{", &JsonOptions::new()), Err(Error::Json(_))));
    }

    #[test]
    fn test_foreign_json_conversion() {
        let json = r#"{"first name":"Ada","tags":["a",null],"age":36,"ok":true}"#;
        let tree = read(json, &JsonOptions::foreign()).unwrap().unwrap();
        let root = tree.as_object().unwrap();
        assert_eq!(root.name(), "root");
        assert_eq!(root.find("first_0020name").and_then(DataStoreNode::as_text), Some("Ada"));
        assert_eq!(root.find("tags/i0").and_then(DataStoreNode::as_text), Some("a"));
        assert_eq!(root.find("tags/i1").and_then(DataStoreNode::as_text), Some(""));
        assert_eq!(root.find("age").and_then(DataStoreNode::as_text), Some("36"));
        assert_eq!(root.find("ok").and_then(DataStoreNode::as_text), Some("true"));
    }

    #[test]
    fn test_foreign_scalar_document() {
        let options = JsonOptions::foreign().with_root_name("answer");
        let tree = read("42", &options).unwrap().unwrap();
        assert_eq!(tree.name(), "answer");
        assert_eq!(tree.as_text(), Some("42"));
    }

    #[test]
    fn test_foreign_invalid_root_name_rejected() {
        let options = JsonOptions::foreign().with_root_name("my root");
        assert!(JsonReader::from_str("42", &options).err().unwrap().is_format());
    }

    #[test]
    fn test_foreign_writer_unescapes_names() {
        let mut root = ObjectNode::new("root").unwrap();
        root.insert(DataStoreNode::text("first_0020name", "Ada").unwrap())
            .unwrap();
        let json = write(&root.into(), JsonOptions::foreign());
        assert_eq!(json, r#"{"first name":"Ada"}"#);
    }

    #[test]
    fn test_binary_value_rejected() {
        let mut backend = JsonWriter::new(Vec::new());
        let err = backend
            .write_value("v", ValueData::Binary(Cow::Borrowed(&[1u8][..])))
            .unwrap_err();
        assert!(matches!(err, Error::Usage(_)));
    }

    #[test]
    fn test_duplicate_member_rejected_by_backend() {
        let mut backend = JsonWriter::new(Vec::new());
        backend.write_object_start("r").unwrap();
        backend
            .write_value("a", ValueData::Text(Cow::Borrowed("1")))
            .unwrap();
        let err = backend
            .write_value("a", ValueData::Text(Cow::Borrowed("2")))
            .unwrap_err();
        assert!(err.is_format());
    }
}
