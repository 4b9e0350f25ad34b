//! Serde serialization onto a [`DataStoreWriter`].
//!
//! This module provides [`NodeSerializer`], which writes any `Serialize`
//! value as one named node:
//!
//! - **Primitives**: value nodes, encoded by the writer's codec registry (so
//!   a binary backend gets the binary encoding)
//! - **Structs and maps**: objects; map keys are escaped with
//!   [`name::escape`]
//! - **Sequences and tuples**: objects with children `i0`, `i1`, ...
//! - **`None`**: nothing is written
//! - **Enums**: unit variants are text values, other variants are objects
//!   holding a single child named after the variant
//!
//! ## Usage
//!
//! Most users should use the functions in the crate root:
//!
//! ```rust
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct Point { x: i32, y: i32 }
//!
//! let xml = data_store::to_xml_string("point", &Point { x: 1, y: 2 }).unwrap();
//! assert_eq!(xml, "<root><point><x>1</x><y>2</y></point></root>");
//! ```
//!
//! ## Direct Serializer Usage
//!
//! Values can also be written in the middle of a hand-driven writer:
//!
//! ```rust
//! use data_store::DataStoreWriter;
//! use data_store::node_io::NodeWriter;
//! use data_store::ser::to_writer;
//!
//! let mut writer = DataStoreWriter::new(NodeWriter::new());
//! writer.write_object_start("doc").unwrap();
//! to_writer(&mut writer, "tags", &vec!["a", "b"]).unwrap();
//! writer.write_object_end().unwrap();
//!
//! let tree = writer.into_inner().unwrap().into_root().unwrap();
//! let doc = tree.as_object().unwrap();
//! assert_eq!(doc.find("tags/i1").and_then(|n| n.as_text()), Some("b"));
//! ```

use crate::backend::WriteBackend;
use crate::name;
use crate::{DataStoreWriter, Error, Result};
use serde::ser::{self, Impossible, Serialize};
use std::borrow::Cow;

/// Writes `value` as a node called `name`.
pub fn to_writer<B, T>(writer: &mut DataStoreWriter<B>, name: &str, value: &T) -> Result<()>
where
    B: WriteBackend,
    T: ?Sized + Serialize,
{
    value.serialize(NodeSerializer::new(writer, name))
}

/// A serializer writing one named node.
pub struct NodeSerializer<'a, B: WriteBackend> {
    writer: &'a mut DataStoreWriter<B>,
    name: Cow<'a, str>,
}

impl<'a, B: WriteBackend> NodeSerializer<'a, B> {
    pub fn new(writer: &'a mut DataStoreWriter<B>, name: &'a str) -> Self {
        NodeSerializer {
            writer,
            name: Cow::Borrowed(name),
        }
    }

    fn write_primitive<T: 'static>(self, value: &T) -> Result<()> {
        self.writer.write(&self.name, value)
    }

    fn begin(self) -> Result<Compound<'a, B>> {
        self.writer.write_object_start(&self.name)?;
        Ok(Compound {
            writer: self.writer,
            index: 0,
            key: None,
            depth: 1,
        })
    }

    /// Starts the outer object and the variant object inside it.
    fn begin_variant(self, variant: &'static str) -> Result<Compound<'a, B>> {
        let compound = self.begin()?;
        compound.writer.write_object_start(variant)?;
        Ok(Compound { depth: 2, ..compound })
    }
}

impl<'a, B: WriteBackend> ser::Serializer for NodeSerializer<'a, B> {
    type Ok = ();
    type Error = Error;

    type SerializeSeq = Compound<'a, B>;
    type SerializeTuple = Compound<'a, B>;
    type SerializeTupleStruct = Compound<'a, B>;
    type SerializeTupleVariant = Compound<'a, B>;
    type SerializeMap = Compound<'a, B>;
    type SerializeStruct = Compound<'a, B>;
    type SerializeStructVariant = Compound<'a, B>;

    fn serialize_bool(self, v: bool) -> Result<()> {
        self.write_primitive(&v)
    }

    fn serialize_i8(self, v: i8) -> Result<()> {
        self.write_primitive(&v)
    }

    fn serialize_i16(self, v: i16) -> Result<()> {
        self.write_primitive(&v)
    }

    fn serialize_i32(self, v: i32) -> Result<()> {
        self.write_primitive(&v)
    }

    fn serialize_i64(self, v: i64) -> Result<()> {
        self.write_primitive(&v)
    }

    fn serialize_u8(self, v: u8) -> Result<()> {
        self.write_primitive(&v)
    }

    fn serialize_u16(self, v: u16) -> Result<()> {
        self.write_primitive(&v)
    }

    fn serialize_u32(self, v: u32) -> Result<()> {
        self.write_primitive(&v)
    }

    fn serialize_u64(self, v: u64) -> Result<()> {
        self.write_primitive(&v)
    }

    fn serialize_f32(self, v: f32) -> Result<()> {
        self.write_primitive(&v)
    }

    fn serialize_f64(self, v: f64) -> Result<()> {
        self.write_primitive(&v)
    }

    fn serialize_char(self, v: char) -> Result<()> {
        self.write_primitive(&v)
    }

    fn serialize_str(self, v: &str) -> Result<()> {
        self.write_primitive(&v.to_string())
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<()> {
        use ser::SerializeSeq;
        let mut seq = self.serialize_seq(Some(v.len()))?;
        for byte in v {
            seq.serialize_element(byte)?;
        }
        seq.end()
    }

    fn serialize_none(self) -> Result<()> {
        Ok(())
    }

    fn serialize_some<T>(self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<()> {
        self.writer.write_value_with(&self.name, |_| Ok(()))
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<()> {
        self.serialize_unit()
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<()> {
        self.serialize_str(variant)
    }

    fn serialize_newtype_struct<T>(self, _name: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        let compound = self.begin()?;
        value.serialize(NodeSerializer {
            writer: &mut *compound.writer,
            name: Cow::Borrowed(variant),
        })?;
        ser::SerializeStruct::end(compound)
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        self.begin()
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
        self.begin()
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        self.begin()
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        self.begin_variant(variant)
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        self.begin()
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        self.begin()
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        self.begin_variant(variant)
    }
}

/// Writes the children of an object opened by [`NodeSerializer`].
pub struct Compound<'a, B: WriteBackend> {
    writer: &'a mut DataStoreWriter<B>,
    index: usize,
    key: Option<String>,
    // objects to end: 2 for enum variants
    depth: usize,
}

impl<'a, B: WriteBackend> Compound<'a, B> {
    fn element<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        let name = name::index_name(self.index);
        self.index += 1;
        value.serialize(NodeSerializer {
            writer: &mut *self.writer,
            name: Cow::Owned(name),
        })
    }

    fn field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(NodeSerializer {
            writer: &mut *self.writer,
            name: Cow::Borrowed(key),
        })
    }

    fn finish(self) -> Result<()> {
        for _ in 0..self.depth {
            self.writer.write_object_end()?;
        }
        Ok(())
    }
}

impl<'a, B: WriteBackend> ser::SerializeSeq for Compound<'a, B> {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.element(value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl<'a, B: WriteBackend> ser::SerializeTuple for Compound<'a, B> {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.element(value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl<'a, B: WriteBackend> ser::SerializeTupleStruct for Compound<'a, B> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.element(value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl<'a, B: WriteBackend> ser::SerializeTupleVariant for Compound<'a, B> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.element(value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl<'a, B: WriteBackend> ser::SerializeMap for Compound<'a, B> {
    type Ok = ();
    type Error = Error;

    fn serialize_key<T>(&mut self, key: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        let key = key.serialize(KeySerializer)?;
        self.key = Some(name::escape(&key));
        Ok(())
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        let key = self
            .key
            .take()
            .ok_or_else(|| Error::custom("serialize_value called without serialize_key"))?;
        value.serialize(NodeSerializer {
            writer: &mut *self.writer,
            name: Cow::Owned(key),
        })
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl<'a, B: WriteBackend> ser::SerializeStruct for Compound<'a, B> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.field(key, value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl<'a, B: WriteBackend> ser::SerializeStructVariant for Compound<'a, B> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.field(key, value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

/// Turns a map key into the string that gets escaped into a node name.
struct KeySerializer;

fn key_error() -> Error {
    Error::unsupported_type("map keys must be strings, characters, integers or booleans")
}

macro_rules! key_to_string {
    ($($method:ident: $ty:ty),* $(,)?) => {
        $(
            fn $method(self, v: $ty) -> Result<String> {
                Ok(v.to_string())
            }
        )*
    };
}

impl ser::Serializer for KeySerializer {
    type Ok = String;
    type Error = Error;

    type SerializeSeq = Impossible<String, Error>;
    type SerializeTuple = Impossible<String, Error>;
    type SerializeTupleStruct = Impossible<String, Error>;
    type SerializeTupleVariant = Impossible<String, Error>;
    type SerializeMap = Impossible<String, Error>;
    type SerializeStruct = Impossible<String, Error>;
    type SerializeStructVariant = Impossible<String, Error>;

    key_to_string! {
        serialize_bool: bool,
        serialize_i8: i8,
        serialize_i16: i16,
        serialize_i32: i32,
        serialize_i64: i64,
        serialize_u8: u8,
        serialize_u16: u16,
        serialize_u32: u32,
        serialize_u64: u64,
        serialize_char: char,
        serialize_str: &str,
    }

    fn serialize_f32(self, _v: f32) -> Result<String> {
        Err(key_error())
    }

    fn serialize_f64(self, _v: f64) -> Result<String> {
        Err(key_error())
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<String> {
        Err(key_error())
    }

    fn serialize_none(self) -> Result<String> {
        Err(key_error())
    }

    fn serialize_some<T>(self, value: &T) -> Result<String>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<String> {
        Err(key_error())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<String> {
        Err(key_error())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<String> {
        Ok(variant.to_string())
    }

    fn serialize_newtype_struct<T>(self, _name: &'static str, value: &T) -> Result<String>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<String>
    where
        T: ?Sized + Serialize,
    {
        Err(key_error())
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        Err(key_error())
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
        Err(key_error())
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        Err(key_error())
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Err(key_error())
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        Err(key_error())
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        Err(key_error())
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Err(key_error())
    }
}
