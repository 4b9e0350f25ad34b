//! Configuration options for the XML and JSON backends.
//!
//! This module provides:
//!
//! - [`XmlOptions`]: synthetic root element name and indentation
//! - [`JsonOptions`]: data store JSON vs foreign JSON, default root name,
//!   pretty output
//!
//! ## Examples
//!
//! ```rust
//! use data_store::{JsonOptions, XmlOptions};
//!
//! let xml = XmlOptions::pretty().with_root_name("document");
//! assert_eq!(xml.root_name, "document");
//! assert_eq!(xml.indent, Some(2));
//!
//! let json = JsonOptions::foreign().with_root_name("config");
//! assert!(!json.data_store_json);
//! ```

/// The root name used when none is configured.
pub const DEFAULT_ROOT_NAME: &str = "root";

/// Configuration options for the XML backend.
///
/// An XML document has exactly one root element while a data store may have
/// none, so the data store's root node is wrapped in a synthetic element
/// named [`root_name`](XmlOptions::root_name).
///
/// # Examples
///
/// ```rust
/// use data_store::XmlOptions;
///
/// let options = XmlOptions::new();
/// assert_eq!(options.root_name, "root");
/// assert_eq!(options.indent, None);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct XmlOptions {
    pub root_name: String,
    pub indent: Option<usize>,
}

impl Default for XmlOptions {
    fn default() -> Self {
        XmlOptions {
            root_name: DEFAULT_ROOT_NAME.to_string(),
            indent: None,
        }
    }
}

impl XmlOptions {
    /// Creates default options (compact output, `root` wrapper element).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options for indented output, two spaces per level.
    #[must_use]
    pub fn pretty() -> Self {
        XmlOptions {
            indent: Some(2),
            ..Default::default()
        }
    }

    /// Sets the name of the synthetic root element.
    ///
    /// The name must be a valid node name; the writer fails with a format
    /// error otherwise. The reader does not check the name of the wrapper, so
    /// documents written with a different name can still be read.
    #[must_use]
    pub fn with_root_name(mut self, name: impl Into<String>) -> Self {
        self.root_name = name.into();
        self
    }

    #[must_use]
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = Some(indent);
        self
    }
}

/// Configuration options for the JSON backend.
///
/// With [`data_store_json`](JsonOptions::data_store_json) set (the default),
/// documents have the shape this crate writes: an outer object with a single
/// member carrying the data store root's name, or `{}` for an empty store.
///
/// Otherwise the document is treated as foreign JSON. The whole document
/// becomes a root node named [`root_name`](JsonOptions::root_name), member
/// names are escaped into valid node names, arrays become objects with
/// positional names (`i0`, `i1`, ...) and `null` becomes an empty text
/// value. That conversion is lossy and does not round trip.
///
/// # Examples
///
/// ```rust
/// use data_store::JsonOptions;
///
/// let options = JsonOptions::new();
/// assert!(options.data_store_json);
/// assert!(!options.pretty);
///
/// let options = JsonOptions::foreign();
/// assert_eq!(options.root_name, "root");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JsonOptions {
    pub data_store_json: bool,
    pub root_name: String,
    pub pretty: bool,
}

impl Default for JsonOptions {
    fn default() -> Self {
        JsonOptions {
            data_store_json: true,
            root_name: DEFAULT_ROOT_NAME.to_string(),
            pretty: false,
        }
    }
}

impl JsonOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Options for reading JSON that was not written by this crate.
    #[must_use]
    pub fn foreign() -> Self {
        JsonOptions {
            data_store_json: false,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn pretty() -> Self {
        JsonOptions {
            pretty: true,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_data_store_json(mut self, data_store_json: bool) -> Self {
        self.data_store_json = data_store_json;
        self
    }

    /// Sets the root name given to foreign JSON documents.
    ///
    /// The name must be a valid node name; the reader fails with a format
    /// error otherwise.
    #[must_use]
    pub fn with_root_name(mut self, name: impl Into<String>) -> Self {
        self.root_name = name.into();
        self
    }

    #[must_use]
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}
