//! XML backend.
//!
//! A data store maps onto XML as follows:
//!
//! - the document element is a synthetic wrapper (named `root` by default,
//!   see [`XmlOptions`]) around the data store's root node, so an empty data
//!   store is just `<root/>`
//! - an element containing elements is an object
//! - an element containing only text is a text value; an empty element is an
//!   empty text value
//!
//! ```text
//! <root><root><x>1</x><y><z>2</z></y></root></root>
//! ```
//!
//! XML has no binary values: the writer always asks for text.
//!
//! An element with no content at all reads back as an empty value, so an
//! empty object does not survive a round trip through XML.
//!
//! Both ends wrap a stream supplied by the caller. Passing `&mut stream`
//! keeps ownership with the caller; passing the stream by value hands it
//! over, and [`XmlReader::into_inner`]/[`XmlWriter::into_inner`] give it
//! back.

use crate::backend::{ReadBackend, ValueData, WriteBackend};
use crate::name::validate_name;
use crate::options::XmlOptions;
use crate::token::{Token, ValueKind};
use crate::{Error, Result};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use std::borrow::Cow;
use std::io::{BufRead, Write};

/// The events the reader cares about, detached from the read buffer.
#[derive(Debug)]
enum XmlEvent {
    Start(String),
    Empty(String),
    End,
    Text(String),
    Eof,
}

fn element_name(raw: &[u8]) -> Result<String> {
    std::str::from_utf8(raw)
        .map(str::to_string)
        .map_err(Error::xml)
}

/// A [`ReadBackend`] over an XML document.
pub struct XmlReader<R: BufRead> {
    reader: quick_xml::Reader<R>,
    buf: Vec<u8>,
    pending: Option<XmlEvent>,
    // open objects below the wrapper element
    depth: usize,
    started: bool,
    finished: bool,
    value: String,
}

impl<R: BufRead> XmlReader<R> {
    pub fn new(inner: R) -> Self {
        XmlReader {
            reader: quick_xml::Reader::from_reader(inner),
            buf: Vec::new(),
            pending: None,
            depth: 0,
            started: false,
            finished: false,
            value: String::new(),
        }
    }

    #[must_use]
    pub fn get_ref(&self) -> &R {
        self.reader.get_ref()
    }

    pub fn into_inner(self) -> R {
        self.reader.into_inner()
    }

    fn next_event(&mut self) -> Result<XmlEvent> {
        loop {
            self.buf.clear();
            let event = match self.reader.read_event_into(&mut self.buf).map_err(Error::xml)? {
                Event::Start(e) => XmlEvent::Start(element_name(e.name().as_ref())?),
                Event::Empty(e) => XmlEvent::Empty(element_name(e.name().as_ref())?),
                Event::End(_) => XmlEvent::End,
                Event::Text(e) => XmlEvent::Text(e.unescape().map_err(Error::xml)?.into_owned()),
                Event::CData(e) => {
                    XmlEvent::Text(String::from_utf8(e.into_inner().into_owned()).map_err(Error::xml)?)
                }
                Event::Eof => XmlEvent::Eof,
                // declarations, comments, processing instructions
                _ => continue,
            };
            return Ok(event);
        }
    }

    /// The next event that is not whitespace between elements.
    fn next_structural(&mut self) -> Result<XmlEvent> {
        if let Some(event) = self.pending.take() {
            return Ok(event);
        }
        loop {
            match self.next_event()? {
                XmlEvent::Text(text) if text.trim().is_empty() => continue,
                event => return Ok(event),
            }
        }
    }

    /// Decides whether a started element is a value or an object.
    fn read_element(&mut self, name: String) -> Result<(Token, Option<String>)> {
        let mut text = String::new();
        loop {
            match self.next_event()? {
                XmlEvent::Text(chunk) => text.push_str(&chunk),
                XmlEvent::End => {
                    self.value = text;
                    return Ok((Token::Value, Some(name)));
                }
                event @ (XmlEvent::Start(_) | XmlEvent::Empty(_)) => {
                    if !text.trim().is_empty() {
                        return Err(Error::format(format!(
                            "element {:?} mixes text and elements",
                            name
                        )));
                    }
                    self.pending = Some(event);
                    self.depth += 1;
                    return Ok((Token::ObjectStart, Some(name)));
                }
                XmlEvent::Eof => {
                    return Err(Error::format(format!(
                        "unexpected end of XML inside element {:?}",
                        name
                    )));
                }
            }
        }
    }
}

impl<R: BufRead> ReadBackend for XmlReader<R> {
    fn read_token(&mut self) -> Result<(Token, Option<String>)> {
        if self.finished {
            return Ok((Token::DataStoreEnd, None));
        }

        if !self.started {
            self.started = true;
            match self.next_structural()? {
                XmlEvent::Start(_) => {}
                XmlEvent::Empty(_) => {
                    self.finished = true;
                    return Ok((Token::DataStoreEnd, None));
                }
                XmlEvent::Eof => return Err(Error::format("the XML document has no root element")),
                _ => return Err(Error::format("unexpected content before the XML root element")),
            }
        }

        match self.next_structural()? {
            XmlEvent::Start(name) => self.read_element(name),
            XmlEvent::Empty(name) => {
                self.value.clear();
                Ok((Token::Value, Some(name)))
            }
            XmlEvent::End if self.depth == 0 => {
                self.finished = true;
                Ok((Token::DataStoreEnd, None))
            }
            XmlEvent::End => {
                self.depth -= 1;
                Ok((Token::ObjectEnd, None))
            }
            XmlEvent::Text(text) => Err(Error::format(format!(
                "unexpected text {:?} between elements",
                text.trim()
            ))),
            XmlEvent::Eof => Err(Error::format("unexpected end of XML document")),
        }
    }

    fn open_value(&mut self) -> Result<ValueData<'_>> {
        Ok(ValueData::Text(Cow::Borrowed(self.value.as_str())))
    }
}

/// A [`WriteBackend`] producing an XML document.
pub struct XmlWriter<W: Write> {
    writer: quick_xml::Writer<W>,
    root_name: String,
    // open objects; the flag is set once the start tag has been written
    stack: Vec<(String, bool)>,
    started: bool,
    finished: bool,
}

impl<W: Write> XmlWriter<W> {
    pub fn new(inner: W) -> Self {
        Self::with_options(inner, XmlOptions::default())
    }

    pub fn with_options(inner: W, options: XmlOptions) -> Self {
        let writer = match options.indent {
            Some(indent) => quick_xml::Writer::new_with_indent(inner, b' ', indent),
            None => quick_xml::Writer::new(inner),
        };
        XmlWriter {
            writer,
            root_name: options.root_name,
            stack: Vec::new(),
            started: false,
            finished: false,
        }
    }

    #[must_use]
    pub fn get_ref(&self) -> &W {
        self.writer.get_ref()
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn emit(&mut self, event: Event<'_>) -> Result<()> {
        self.writer.write_event(event).map_err(Error::xml)
    }

    fn root_element(&self) -> Result<BytesStart<'static>> {
        validate_name(&self.root_name)?;
        Ok(BytesStart::new(self.root_name.clone()))
    }

    fn start_document(&mut self) -> Result<()> {
        if !self.started {
            let root = self.root_element()?;
            self.started = true;
            self.emit(Event::Start(root))?;
        }
        Ok(())
    }

    /// Writes the start tag of the innermost open object before its first
    /// child.
    fn open_parent(&mut self) -> Result<()> {
        self.start_document()?;
        let name = match self.stack.last_mut() {
            Some((name, written)) if !*written => {
                *written = true;
                name.clone()
            }
            _ => return Ok(()),
        };
        self.emit(Event::Start(BytesStart::new(name)))
    }
}

impl<W: Write> WriteBackend for XmlWriter<W> {
    fn value_kind(&self, _name: &str) -> ValueKind {
        ValueKind::Text
    }

    fn write_value(&mut self, name: &str, value: ValueData<'_>) -> Result<()> {
        let ValueData::Text(text) = value else {
            return Err(Error::usage("XML cannot hold binary values"));
        };
        self.open_parent()?;
        if text.is_empty() {
            return self.emit(Event::Empty(BytesStart::new(name)));
        }
        self.emit(Event::Start(BytesStart::new(name)))?;
        self.emit(Event::Text(BytesText::new(text.as_ref())))?;
        self.emit(Event::End(BytesEnd::new(name)))
    }

    fn write_object_start(&mut self, name: &str) -> Result<()> {
        self.open_parent()?;
        self.stack.push((name.to_string(), false));
        Ok(())
    }

    fn write_object_end(&mut self) -> Result<()> {
        let (name, written) = self
            .stack
            .pop()
            .ok_or_else(|| Error::format("unbalanced object end: no element is open"))?;
        if written {
            self.emit(Event::End(BytesEnd::new(name)))
        } else {
            self.emit(Event::Empty(BytesStart::new(name)))
        }
    }

    fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        while !self.stack.is_empty() {
            self.write_object_end()?;
        }
        if self.started {
            let root = BytesEnd::new(self.root_name.clone());
            self.emit(Event::End(root))?;
        } else {
            let root = self.root_element()?;
            self.emit(Event::Empty(root))?;
        }
        self.writer.get_mut().flush()?;
        Ok(())
    }
}
