//! An in-memory data store tree.
//!
//! [`DataStoreNode`] is either an [`ObjectNode`] owning an ordered list of
//! uniquely named children, or a [`ValueNode`] holding text or binary
//! content. Trees are read and written through the backends in
//! [`node_io`](crate::node_io), which makes them the simplest reference
//! format and a convenient comparison target: two data stores are equal when
//! their trees are, regardless of how either was formatted.
//!
//! Children are kept in an [`IndexMap`], so lookups by name are fast while
//! insertion order is preserved. Equality is order-sensitive.
//!
//! ## Examples
//!
//! ```rust
//! use data_store::{DataStoreNode, ObjectNode};
//!
//! let mut root = ObjectNode::new("root").unwrap();
//! root.insert(DataStoreNode::text("x", "1").unwrap()).unwrap();
//!
//! let mut y = ObjectNode::new("y").unwrap();
//! y.insert(DataStoreNode::text("z", "2").unwrap()).unwrap();
//! root.insert(DataStoreNode::Object(y)).unwrap();
//!
//! assert_eq!(root.find("y/z").and_then(|n| n.as_text()), Some("2"));
//! assert!(root.insert(DataStoreNode::text("x", "again").unwrap()).is_err());
//! ```

use crate::name::{validate_name, SEPARATOR};
use crate::token::ValueKind;
use crate::{Error, Result};
use indexmap::IndexMap;

/// A node of a data store tree.
#[derive(Clone, Debug, PartialEq)]
pub enum DataStoreNode {
    Object(ObjectNode),
    Value(ValueNode),
}

impl DataStoreNode {
    /// Creates a text value node.
    pub fn text(name: impl Into<String>, content: impl Into<String>) -> Result<Self> {
        ValueNode::text(name, content).map(DataStoreNode::Value)
    }

    /// Creates a binary value node.
    pub fn binary(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Result<Self> {
        ValueNode::binary(name, content).map(DataStoreNode::Value)
    }

    /// Creates an empty object node.
    pub fn object(name: impl Into<String>) -> Result<Self> {
        ObjectNode::new(name).map(DataStoreNode::Object)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            DataStoreNode::Object(object) => object.name(),
            DataStoreNode::Value(value) => value.name(),
        }
    }

    #[must_use]
    pub fn is_object(&self) -> bool {
        matches!(self, DataStoreNode::Object(_))
    }

    #[must_use]
    pub fn is_value(&self) -> bool {
        matches!(self, DataStoreNode::Value(_))
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&ObjectNode> {
        match self {
            DataStoreNode::Object(object) => Some(object),
            DataStoreNode::Value(_) => None,
        }
    }

    #[must_use]
    pub fn as_object_mut(&mut self) -> Option<&mut ObjectNode> {
        match self {
            DataStoreNode::Object(object) => Some(object),
            DataStoreNode::Value(_) => None,
        }
    }

    #[must_use]
    pub fn as_value(&self) -> Option<&ValueNode> {
        match self {
            DataStoreNode::Value(value) => Some(value),
            DataStoreNode::Object(_) => None,
        }
    }

    /// The content of a text value node.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        self.as_value().and_then(ValueNode::as_text)
    }

    /// The content of a binary value node.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        self.as_value().and_then(ValueNode::as_bytes)
    }
}

impl From<ObjectNode> for DataStoreNode {
    fn from(object: ObjectNode) -> Self {
        DataStoreNode::Object(object)
    }
}

impl From<ValueNode> for DataStoreNode {
    fn from(value: ValueNode) -> Self {
        DataStoreNode::Value(value)
    }
}

/// A named container of uniquely named children.
#[derive(Clone, Debug)]
pub struct ObjectNode {
    name: String,
    children: IndexMap<String, DataStoreNode>,
}

impl ObjectNode {
    /// Creates an empty object.
    ///
    /// # Errors
    ///
    /// Returns a format error if `name` is not a valid node name.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_name(&name)?;
        Ok(ObjectNode {
            name,
            children: IndexMap::new(),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Appends a child.
    ///
    /// # Errors
    ///
    /// Returns a format error if a child with the same name exists.
    pub fn insert(&mut self, child: impl Into<DataStoreNode>) -> Result<()> {
        let child = child.into();
        if self.children.contains_key(child.name()) {
            return Err(Error::format(format!(
                "duplicate node name {:?} in object {:?}",
                child.name(),
                self.name
            )));
        }
        self.children.insert(child.name().to_string(), child);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&DataStoreNode> {
        self.children.get(name)
    }

    #[must_use]
    pub fn get_mut(&mut self, name: &str) -> Option<&mut DataStoreNode> {
        self.children.get_mut(name)
    }

    /// Removes a child, keeping the order of the others.
    pub fn remove(&mut self, name: &str) -> Option<DataStoreNode> {
        self.children.shift_remove(name)
    }

    /// Looks up a descendant by a path relative to this object.
    #[must_use]
    pub fn find(&self, path: &str) -> Option<&DataStoreNode> {
        let mut names = path.split(SEPARATOR);
        let mut node = self.children.get(names.next()?)?;
        for name in names {
            node = node.as_object()?.children.get(name)?;
        }
        Some(node)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Returns an iterator over the children, in insertion order.
    pub fn children(&self) -> indexmap::map::Values<'_, String, DataStoreNode> {
        self.children.values()
    }
}

impl PartialEq for ObjectNode {
    fn eq(&self, other: &Self) -> bool {
        // IndexMap equality ignores order; child order matters here
        self.name == other.name
            && self.children.len() == other.children.len()
            && self
                .children
                .values()
                .zip(other.children.values())
                .all(|(a, b)| a == b)
    }
}

/// The content of a value node: text or binary, never both.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValueContent {
    Text(String),
    Binary(Vec<u8>),
}

/// A named leaf.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValueNode {
    name: String,
    content: ValueContent,
}

impl ValueNode {
    pub fn new(name: impl Into<String>, content: ValueContent) -> Result<Self> {
        let name = name.into();
        validate_name(&name)?;
        Ok(ValueNode { name, content })
    }

    pub fn text(name: impl Into<String>, content: impl Into<String>) -> Result<Self> {
        Self::new(name, ValueContent::Text(content.into()))
    }

    pub fn binary(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Result<Self> {
        Self::new(name, ValueContent::Binary(content.into()))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn content(&self) -> &ValueContent {
        &self.content
    }

    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self.content {
            ValueContent::Text(_) => ValueKind::Text,
            ValueContent::Binary(_) => ValueKind::Binary,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match &self.content {
            ValueContent::Text(text) => Some(text),
            ValueContent::Binary(_) => None,
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match &self.content {
            ValueContent::Binary(bytes) => Some(bytes),
            ValueContent::Text(_) => None,
        }
    }
}
