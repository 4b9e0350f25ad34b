//! # data_store
//!
//! A format-agnostic framework for serializing hierarchical data.
//!
//! ## What is a data store?
//!
//! A data store is a tree of named nodes with at most one root. A node is
//! either an *object*, an ordered container of uniquely named children, or a
//! *value*, a leaf holding text or binary content. Application code reads and
//! writes data stores through a streaming cursor, independent of the storage
//! format underneath.
//!
//! ## Key Features
//!
//! - **Streaming cursor**: [`DataStoreReader`] moves forward through
//!   [`Token`]s; [`DataStoreWriter`] emits them and checks structure as it goes
//! - **Pluggable formats**: backends for an in-memory node tree
//!   ([`node_io`]), XML ([`xml`]) and JSON ([`json`]) behind the
//!   [`ReadBackend`]/[`WriteBackend`] traits
//! - **Value codecs**: basic types are converted through a [`CodecRegistry`],
//!   in text or compact binary form depending on the backend
//! - **Serde compatible**: any `Serialize`/`Deserialize` type can be written
//!   as a node and read back
//!
//! ## Quick Start
//!
//! ```rust
//! use serde::{Deserialize, Serialize};
//! use data_store::{from_xml_str, to_xml_string};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct User {
//!     id: u32,
//!     name: String,
//!     active: bool,
//! }
//!
//! let user = User {
//!     id: 123,
//!     name: "Alice".to_string(),
//!     active: true,
//! };
//!
//! let xml = to_xml_string("user", &user).unwrap();
//! assert_eq!(
//!     xml,
//!     "<root><user><id>123</id><name>Alice</name><active>true</active></user></root>"
//! );
//!
//! let user_back: User = from_xml_str(&xml).unwrap();
//! assert_eq!(user, user_back);
//! ```
//!
//! ### Driving the cursor by hand
//!
//! ```rust
//! use data_store::{DataStoreReader, DataStoreWriter, Token};
//! use data_store::node_io::{NodeReader, NodeWriter};
//!
//! let mut writer = DataStoreWriter::new(NodeWriter::new());
//! writer.write_object_start("config").unwrap();
//! writer.write("port", &8080u16).unwrap();
//! writer.write_object_end().unwrap();
//! let tree = writer.into_inner().unwrap().into_root().unwrap();
//!
//! let mut reader = DataStoreReader::new(NodeReader::new(&tree));
//! reader.advance().unwrap();
//! reader.read_object_start(Some("config")).unwrap();
//! assert_eq!(reader.read_value::<u16>(Some("port")).unwrap(), 8080);
//! reader.read_object_end().unwrap();
//! assert_eq!(reader.token(), Token::DataStoreEnd);
//! ```
//!
//! ## Examples
//!
//! See the `demos/` directory:
//!
//! - **`simple.rs`** - serde types through the node tree, XML and JSON
//! - **`cursor.rs`** - hand-written object serializers and the raw cursor
//! - **`formats.rs`** - converting documents between formats
//!
//! Run any demo with: `cargo run --example <name>`

pub mod backend;
pub mod codec;
pub mod de;
pub mod error;
pub mod json;
pub mod name;
pub mod node;
pub mod node_io;
pub mod options;
pub mod reader;
pub mod ser;
pub mod token;
pub mod writer;
pub mod xml;

pub use backend::{ReadBackend, ValueReader, ValueWriter, WriteBackend};
pub use codec::{BasicCodec, CodecRegistry, ValueCodec};
pub use de::NodeDeserializer;
pub use error::{Error, Position, Result};
pub use node::{DataStoreNode, ObjectNode, ValueContent, ValueNode};
pub use options::{JsonOptions, XmlOptions};
pub use reader::{DataStoreReader, ObjectDeserializer};
pub use ser::NodeSerializer;
pub use token::{Token, ValueKind};
pub use writer::{DataStoreWriter, ObjectSerializer};

use json::{JsonReader, JsonWriter};
use node_io::{NodeReader, NodeWriter};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io;
use xml::{XmlReader, XmlWriter};

/// Serialize any `T: Serialize` to a node tree with a root named `name`.
///
/// # Examples
///
/// ```rust
/// use data_store::to_node;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Point { x: i32, y: i32 }
///
/// let node = to_node("point", &Point { x: 1, y: 2 }).unwrap();
/// let point = node.as_object().unwrap();
/// assert_eq!(point.get("x").and_then(|x| x.as_text()), Some("1"));
/// ```
///
/// # Errors
///
/// Returns an error if `name` is not a valid node name, the value cannot be
/// serialized, or it writes no node at all (a top-level `None`).
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_node<T>(name: &str, value: &T) -> Result<DataStoreNode>
where
    T: ?Sized + Serialize,
{
    let mut writer = DataStoreWriter::new(NodeWriter::new());
    ser::to_writer(&mut writer, name, value)?;
    writer
        .into_inner()?
        .into_root()
        .ok_or_else(|| Error::usage("the value did not write a node"))
}

/// Deserialize an instance of type `T` from a node tree.
///
/// # Errors
///
/// Returns an error if the tree does not have the shape `T` expects.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_node<T>(node: &DataStoreNode) -> Result<T>
where
    T: DeserializeOwned,
{
    de::from_reader(&mut DataStoreReader::new(NodeReader::new(node)))
}

/// Serialize any `T: Serialize` to an XML string, as a root node named `name`.
///
/// # Examples
///
/// ```rust
/// use data_store::to_xml_string;
///
/// let xml = to_xml_string("greeting", "hello").unwrap();
/// assert_eq!(xml, "<root><greeting>hello</greeting></root>");
/// ```
///
/// # Errors
///
/// Returns an error if `name` is not a valid node name or the value cannot
/// be serialized.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_xml_string<T>(name: &str, value: &T) -> Result<String>
where
    T: ?Sized + Serialize,
{
    to_xml_string_with_options(name, value, XmlOptions::default())
}

/// Serialize any `T: Serialize` to an XML string with custom options.
///
/// # Examples
///
/// ```rust
/// use data_store::{to_xml_string_with_options, XmlOptions};
///
/// let options = XmlOptions::new().with_root_name("doc");
/// let xml = to_xml_string_with_options("n", &7, options).unwrap();
/// assert_eq!(xml, "<doc><n>7</n></doc>");
/// ```
///
/// # Errors
///
/// Returns an error if the value cannot be serialized.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_xml_string_with_options<T>(name: &str, value: &T, options: XmlOptions) -> Result<String>
where
    T: ?Sized + Serialize,
{
    let bytes = to_xml_writer(Vec::new(), name, value, options)?;
    String::from_utf8(bytes).map_err(Error::xml)
}

/// Serialize any `T: Serialize` as XML into `out`, returning `out` once the
/// document is complete.
///
/// # Errors
///
/// Returns an error if serialization fails or writing to `out` fails.
pub fn to_xml_writer<W, T>(out: W, name: &str, value: &T, options: XmlOptions) -> Result<W>
where
    W: io::Write,
    T: ?Sized + Serialize,
{
    let mut writer = DataStoreWriter::new(XmlWriter::with_options(out, options));
    ser::to_writer(&mut writer, name, value)?;
    Ok(writer.into_inner()?.into_inner())
}

/// Deserialize an instance of type `T` from an XML document.
///
/// # Examples
///
/// ```rust
/// use data_store::from_xml_str;
///
/// let tags: Vec<String> = from_xml_str("<root><tags><i0>a</i0><i1>b</i1></tags></root>").unwrap();
/// assert_eq!(tags, vec!["a", "b"]);
/// ```
///
/// # Errors
///
/// Returns an error if the document is not well formed XML, does not follow
/// the data store layout, or cannot be deserialized to type `T`.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_xml_str<T>(s: &str) -> Result<T>
where
    T: DeserializeOwned,
{
    from_xml_reader(s.as_bytes())
}

/// Deserialize an instance of type `T` from an XML stream.
///
/// # Errors
///
/// Returns an error if reading fails or the document cannot be deserialized
/// to type `T`.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_xml_reader<R, T>(input: R) -> Result<T>
where
    R: io::BufRead,
    T: DeserializeOwned,
{
    de::from_reader(&mut DataStoreReader::new(XmlReader::new(input)))
}

/// Serialize any `T: Serialize` to a data store JSON string.
///
/// # Examples
///
/// ```rust
/// use data_store::to_json_string;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Point { x: i32, y: i32 }
///
/// let json = to_json_string("point", &Point { x: 1, y: 2 }).unwrap();
/// assert_eq!(json, r#"{"point":{"x":"1","y":"2"}}"#);
/// ```
///
/// # Errors
///
/// Returns an error if `name` is not a valid node name or the value cannot
/// be serialized.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_json_string<T>(name: &str, value: &T) -> Result<String>
where
    T: ?Sized + Serialize,
{
    to_json_string_with_options(name, value, JsonOptions::default())
}

/// Serialize any `T: Serialize` to a JSON string with custom options.
///
/// With [`JsonOptions::foreign`] the root's name is dropped and only its
/// content is written.
///
/// # Errors
///
/// Returns an error if the value cannot be serialized.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_json_string_with_options<T>(name: &str, value: &T, options: JsonOptions) -> Result<String>
where
    T: ?Sized + Serialize,
{
    let mut writer = DataStoreWriter::new(JsonWriter::with_options(Vec::new(), options));
    ser::to_writer(&mut writer, name, value)?;
    let bytes = writer.into_inner()?.into_inner();
    String::from_utf8(bytes).map_err(Error::json)
}

/// Deserialize an instance of type `T` from a data store JSON string.
///
/// # Examples
///
/// ```rust
/// use data_store::from_json_str;
/// use serde::Deserialize;
///
/// #[derive(Deserialize, PartialEq, Debug)]
/// struct Point { x: i32, y: i32 }
///
/// let point: Point = from_json_str(r#"{"point":{"x":"1","y":"2"}}"#).unwrap();
/// assert_eq!(point, Point { x: 1, y: 2 });
/// ```
///
/// # Errors
///
/// Returns an error if the input is not valid JSON, does not have the data
/// store shape, or cannot be deserialized to type `T`.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_json_str<T>(s: &str) -> Result<T>
where
    T: DeserializeOwned,
{
    from_json_str_with_options(s, &JsonOptions::default())
}

/// Deserialize an instance of type `T` from a JSON string with custom options.
///
/// # Examples
///
/// ```rust
/// use data_store::{from_json_str_with_options, JsonOptions};
/// use serde::Deserialize;
///
/// #[derive(Deserialize, PartialEq, Debug)]
/// struct Server { host: String, port: u16 }
///
/// let json = r#"{"host": "localhost", "port": 8080}"#;
/// let server: Server = from_json_str_with_options(json, &JsonOptions::foreign()).unwrap();
/// assert_eq!(server.port, 8080);
/// ```
///
/// # Errors
///
/// Returns an error if the input is not valid JSON or cannot be deserialized
/// to type `T`.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_json_str_with_options<T>(s: &str, options: &JsonOptions) -> Result<T>
where
    T: DeserializeOwned,
{
    let backend = JsonReader::from_str(s, options)?;
    de::from_reader(&mut DataStoreReader::new(backend))
}

/// Deserialize an instance of type `T` from a JSON stream.
///
/// # Errors
///
/// Returns an error if reading fails, the input is not valid JSON, or it
/// cannot be deserialized to type `T`.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_json_reader<R, T>(input: R, options: &JsonOptions) -> Result<T>
where
    R: io::Read,
    T: DeserializeOwned,
{
    let backend = JsonReader::from_reader(input, options)?;
    de::from_reader(&mut DataStoreReader::new(backend))
}
