//! Serde deserialization from a [`DataStoreReader`].
//!
//! This module provides [`NodeDeserializer`], which reads the node under the
//! reader's cursor into any `Deserialize` type and leaves the cursor on the
//! node after it. It accepts what [`ser`](crate::ser) writes:
//!
//! - **Objects**: read as structs or maps; children the target type does not
//!   know are skipped
//! - **Positional children** (`i0`, `i1`, ...): read as sequences and tuples;
//!   a gap in the numbering reads as `None`
//! - **Missing struct fields**: read as `None` for `Option` fields
//! - **Empty text values**: read as empty sequences, maps and structs too,
//!   since formats like XML cannot tell an empty object from an empty value
//!
//! ## Usage
//!
//! ```rust
//! use serde::Deserialize;
//!
//! #[derive(Deserialize, Debug, PartialEq)]
//! struct Point { x: i32, y: i32 }
//!
//! let xml = "<root><point><x>1</x><y>2</y></point></root>";
//! let point: Point = data_store::from_xml_str(xml).unwrap();
//! assert_eq!(point, Point { x: 1, y: 2 });
//! ```

use crate::backend::{ReadBackend, ValueReader};
use crate::name;
use crate::node::ValueContent;
use crate::token::Token;
use crate::{DataStoreReader, Error, Result};
use serde::de::value::StringDeserializer;
use serde::de::{self, DeserializeOwned};
use serde::forward_to_deserialize_any;

/// Reads the root node of a data store.
///
/// An empty data store reads as `None` when `T` is an `Option`, and is an
/// error otherwise.
///
/// # Errors
///
/// Returns a format error if the store has content after its root node.
/// Codec and structural errors from the reader are passed through.
pub fn from_reader<B, T>(reader: &mut DataStoreReader<B>) -> Result<T>
where
    B: ReadBackend,
    T: DeserializeOwned,
{
    if reader.token() == Token::DataStoreStart {
        reader.advance()?;
    }
    if reader.is_end() {
        return T::deserialize(Absent);
    }

    let value = T::deserialize(NodeDeserializer::new(reader))?;
    if !reader.is_end() {
        return Err(Error::format("content after the root node").with_position(reader.position()));
    }
    Ok(value)
}

/// A deserializer for the node under a reader's cursor.
pub struct NodeDeserializer<'a, B: ReadBackend> {
    reader: &'a mut DataStoreReader<B>,
}

impl<'a, B: ReadBackend> NodeDeserializer<'a, B> {
    pub fn new(reader: &'a mut DataStoreReader<B>) -> Self {
        NodeDeserializer { reader }
    }

    /// Reads the current value's raw content and advances past it.
    fn take_content(&mut self) -> Result<ValueContent> {
        let content = match self.reader.value()? {
            ValueReader::Text(text) => ValueContent::Text(text.into_string()),
            ValueReader::Binary(mut binary) => ValueContent::Binary(binary.read_to_vec()),
        };
        self.reader.advance()?;
        Ok(content)
    }

    fn is_empty_value(&mut self) -> Result<bool> {
        if self.reader.token() != Token::Value {
            return Ok(false);
        }
        Ok(match self.reader.value()? {
            ValueReader::Text(text) => text.as_str().is_empty(),
            ValueReader::Binary(binary) => binary.is_at_end(),
        })
    }

    /// Reads the current object, or an empty value standing in for one, as a
    /// map of its children.
    fn read_children<'de, V>(mut self, visitor: V, unescape_keys: bool) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        if self.is_empty_value()? {
            self.reader.advance()?;
            return visitor.visit_map(Empty);
        }
        self.reader.read_object(None, |reader| {
            visitor.visit_map(ChildrenAccess {
                reader,
                unescape_keys,
            })
        })
    }
}

macro_rules! deserialize_primitive {
    ($($method:ident => $visit:ident: $ty:ty),* $(,)?) => {
        $(
            fn $method<V>(self, visitor: V) -> Result<V::Value>
            where
                V: de::Visitor<'de>,
            {
                let value: $ty = self.reader.read_value(None)?;
                visitor.$visit(value)
            }
        )*
    };
}

impl<'de, 'a, B: ReadBackend> de::Deserializer<'de> for NodeDeserializer<'a, B> {
    type Error = Error;

    fn deserialize_any<V>(mut self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.reader.token() {
            Token::Value => match self.take_content()? {
                ValueContent::Text(text) => visitor.visit_string(text),
                ValueContent::Binary(bytes) => visitor.visit_byte_buf(bytes),
            },
            _ => self.deserialize_map(visitor),
        }
    }

    deserialize_primitive! {
        deserialize_bool => visit_bool: bool,
        deserialize_i8 => visit_i8: i8,
        deserialize_i16 => visit_i16: i16,
        deserialize_i32 => visit_i32: i32,
        deserialize_i64 => visit_i64: i64,
        deserialize_u8 => visit_u8: u8,
        deserialize_u16 => visit_u16: u16,
        deserialize_u32 => visit_u32: u32,
        deserialize_u64 => visit_u64: u64,
        deserialize_f32 => visit_f32: f32,
        deserialize_f64 => visit_f64: f64,
        deserialize_char => visit_char: char,
        deserialize_string => visit_string: String,
    }

    fn deserialize_str<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_string(visitor)
    }

    fn deserialize_bytes<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_byte_buf(visitor)
    }

    fn deserialize_byte_buf<V>(mut self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.reader.token() {
            Token::Value => match self.take_content()? {
                ValueContent::Binary(bytes) => visitor.visit_byte_buf(bytes),
                ValueContent::Text(text) => visitor.visit_byte_buf(text.into_bytes()),
            },
            _ => self.deserialize_seq(visitor),
        }
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_some(self)
    }

    fn deserialize_unit<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        self.reader.skip()?;
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V>(mut self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        if self.is_empty_value()? {
            self.reader.advance()?;
            return visitor.visit_seq(Empty);
        }
        self.reader
            .read_object(None, |reader| visitor.visit_seq(ElementsAccess { reader, index: 0 }))
    }

    fn deserialize_tuple<V>(self, _len: usize, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        self.read_children(visitor, true)
    }

    // Field names are written verbatim, so they are read back verbatim.
    fn deserialize_struct<V>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        self.read_children(visitor, false)
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.reader.token() {
            Token::Value => {
                let variant: String = self.reader.read_value(None)?;
                visitor.visit_enum(StringDeserializer::<Error>::new(variant))
            }
            _ => self
                .reader
                .read_object(None, |reader| visitor.visit_enum(VariantAccess { reader })),
        }
    }

    fn deserialize_identifier<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_string(visitor)
    }

    fn deserialize_ignored_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        self.reader.skip()?;
        visitor.visit_unit()
    }
}

/// The children of an object as sequence elements.
struct ElementsAccess<'a, B: ReadBackend> {
    reader: &'a mut DataStoreReader<B>,
    index: usize,
}

impl<'de, 'a, B: ReadBackend> de::SeqAccess<'de> for ElementsAccess<'a, B> {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
    where
        T: de::DeserializeSeed<'de>,
    {
        if self.reader.token() == Token::ObjectEnd {
            return Ok(None);
        }

        let index = self.index;
        self.index += 1;
        // `None` elements are not written, leaving a gap in the numbering
        let skipped = self
            .reader
            .name()
            .and_then(name::parse_index_name)
            .map_or(false, |found| found > index);
        if skipped {
            return seed.deserialize(Absent).map(Some);
        }
        seed.deserialize(NodeDeserializer::new(&mut *self.reader))
            .map(Some)
    }
}

/// The children of an object as map entries keyed by node name.
struct ChildrenAccess<'a, B: ReadBackend> {
    reader: &'a mut DataStoreReader<B>,
    unescape_keys: bool,
}

impl<'de, 'a, B: ReadBackend> de::MapAccess<'de> for ChildrenAccess<'a, B> {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
    where
        K: de::DeserializeSeed<'de>,
    {
        if self.reader.token() == Token::ObjectEnd {
            return Ok(None);
        }

        let name = self.reader.name().unwrap_or_default();
        let key = if self.unescape_keys {
            name::unescape(name)?
        } else {
            name.to_string()
        };
        seed.deserialize(KeyDeserializer { key }).map(Some)
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
    where
        V: de::DeserializeSeed<'de>,
    {
        seed.deserialize(NodeDeserializer::new(&mut *self.reader))
    }
}

/// An object holding a single child named after the enum variant.
struct VariantAccess<'a, B: ReadBackend> {
    reader: &'a mut DataStoreReader<B>,
}

impl<'de, 'a, B: ReadBackend> de::EnumAccess<'de> for VariantAccess<'a, B> {
    type Error = Error;
    type Variant = Self;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self)>
    where
        V: de::DeserializeSeed<'de>,
    {
        let variant = match self.reader.token() {
            Token::Value | Token::ObjectStart => self.reader.name().unwrap_or_default().to_string(),
            other => {
                return Err(Error::format(format!("expected an enum variant but found {}", other))
                    .with_position(self.reader.position()));
            }
        };
        let value = seed.deserialize(StringDeserializer::<Error>::new(variant))?;
        Ok((value, self))
    }
}

impl<'de, 'a, B: ReadBackend> de::VariantAccess<'de> for VariantAccess<'a, B> {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        self.reader.skip()
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value>
    where
        T: de::DeserializeSeed<'de>,
    {
        seed.deserialize(NodeDeserializer::new(self.reader))
    }

    fn tuple_variant<V>(self, len: usize, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        de::Deserializer::deserialize_tuple(NodeDeserializer::new(self.reader), len, visitor)
    }

    fn struct_variant<V>(self, fields: &'static [&'static str], visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        de::Deserializer::deserialize_struct(NodeDeserializer::new(self.reader), "", fields, visitor)
    }
}

/// A map key taken from a node name.
struct KeyDeserializer {
    key: String,
}

macro_rules! parse_key {
    ($($method:ident => $visit:ident),* $(,)?) => {
        $(
            fn $method<V>(self, visitor: V) -> Result<V::Value>
            where
                V: de::Visitor<'de>,
            {
                match self.key.parse() {
                    Ok(value) => visitor.$visit(value),
                    Err(_) => Err(Error::custom(format!("invalid map key {:?}", self.key))),
                }
            }
        )*
    };
}

impl<'de> de::Deserializer<'de> for KeyDeserializer {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_string(self.key)
    }

    parse_key! {
        deserialize_bool => visit_bool,
        deserialize_i8 => visit_i8,
        deserialize_i16 => visit_i16,
        deserialize_i32 => visit_i32,
        deserialize_i64 => visit_i64,
        deserialize_u8 => visit_u8,
        deserialize_u16 => visit_u16,
        deserialize_u32 => visit_u32,
        deserialize_u64 => visit_u64,
    }

    fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_enum(StringDeserializer::<Error>::new(self.key))
    }

    forward_to_deserialize_any! {
        i128 u128 f32 f64 char str string bytes byte_buf option unit
        unit_struct seq tuple tuple_struct map struct identifier ignored_any
    }
}

/// Stands in for a node that was not written.
struct Absent;

impl<'de> de::Deserializer<'de> for Absent {
    type Error = Error;

    fn deserialize_any<V>(self, _visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        Err(Error::format("expected a node but none was written"))
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_none()
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct newtype_struct seq tuple
        tuple_struct map struct enum identifier ignored_any
    }
}

/// An object without children.
struct Empty;

impl<'de> de::SeqAccess<'de> for Empty {
    type Error = Error;

    fn next_element_seed<T>(&mut self, _seed: T) -> Result<Option<T::Value>>
    where
        T: de::DeserializeSeed<'de>,
    {
        Ok(None)
    }
}

impl<'de> de::MapAccess<'de> for Empty {
    type Error = Error;

    fn next_key_seed<K>(&mut self, _seed: K) -> Result<Option<K::Value>>
    where
        K: de::DeserializeSeed<'de>,
    {
        Ok(None)
    }

    fn next_value_seed<V>(&mut self, _seed: V) -> Result<V::Value>
    where
        V: de::DeserializeSeed<'de>,
    {
        Err(Error::custom("next_value_seed called on an empty object"))
    }
}
