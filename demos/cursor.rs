//! Hand-written object serializers and the raw cursor.
//!
//! Run with: cargo run --example cursor

use chrono::{DateTime, TimeZone, Utc};
use data_store::node_io::NodeWriter;
use data_store::xml::{XmlReader, XmlWriter};
use data_store::{
    DataStoreReader, DataStoreWriter, ObjectDeserializer, ObjectSerializer, ReadBackend, Token,
    WriteBackend, XmlOptions,
};
use std::error::Error;

#[derive(Debug, PartialEq)]
struct Event {
    title: String,
    at: DateTime<Utc>,
    attendees: u32,
}

struct EventCodec;

impl ObjectSerializer<Event> for EventCodec {
    fn serialize<B: WriteBackend>(
        &self,
        event: &Event,
        writer: &mut DataStoreWriter<B>,
    ) -> data_store::Result<()> {
        writer.write("title", &event.title)?;
        writer.write("at", &event.at)?;
        writer.write("attendees", &event.attendees)
    }
}

impl ObjectDeserializer<Event> for EventCodec {
    fn deserialize<B: ReadBackend>(
        &self,
        reader: &mut DataStoreReader<B>,
    ) -> data_store::Result<Event> {
        Ok(Event {
            title: reader.read_value(Some("title"))?,
            at: reader.read_value(Some("at"))?,
            attendees: reader.read_value(Some("attendees"))?,
        })
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let event = Event {
        title: "Launch".to_string(),
        at: Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap(),
        attendees: 120,
    };

    let mut writer = DataStoreWriter::new(XmlWriter::with_options(Vec::new(), XmlOptions::pretty()));
    writer.write_object("event", &event, &EventCodec)?;
    let xml = writer.into_inner()?.into_inner();
    println!("XML output:\n{}\n", String::from_utf8(xml.clone())?);

    // walk the raw token stream
    let mut reader = DataStoreReader::new(XmlReader::new(xml.as_slice()));
    while reader.advance()? != Token::DataStoreEnd {
        println!("{:<12} {:<10} {}", reader.token().as_str(), reader.name().unwrap_or(""), reader.path());
    }
    println!();

    let mut reader = DataStoreReader::new(XmlReader::new(xml.as_slice()));
    reader.advance()?;
    let event_back = reader.deserialize_object(&EventCodec, Some("event"))?;
    assert_eq!(event, event_back);

    // the same serializer on a binary backend
    let mut writer = DataStoreWriter::new(NodeWriter::binary());
    writer.write_object("event", &event, &EventCodec)?;
    if let Some(tree) = writer.into_inner()?.into_root() {
        println!("Binary node tree:\n{:#?}", tree);
    }

    println!("✓ Round-trip successful");
    Ok(())
}
