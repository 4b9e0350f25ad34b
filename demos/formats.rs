//! Converting documents between formats through the node tree.
//!
//! Run with: cargo run --example formats

use data_store::json::{JsonReader, JsonWriter};
use data_store::node_io::{read_tree, write_tree};
use data_store::xml::{XmlReader, XmlWriter};
use data_store::{DataStoreReader, DataStoreWriter, JsonOptions, XmlOptions};
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    let foreign = r#"{
        "service name": "billing",
        "replicas": 3,
        "ports": [8080, 8443],
        "tls": {"enabled": true, "cert": null}
    }"#;

    // JSON not written by this crate: member names are escaped, arrays get
    // positional names and the document gets a root name
    let options = JsonOptions::foreign().with_root_name("service");
    let mut reader = DataStoreReader::new(JsonReader::from_str(foreign, &options)?);
    let Some(tree) = read_tree(&mut reader)? else {
        return Err("empty document".into());
    };

    let mut writer = DataStoreWriter::new(XmlWriter::with_options(Vec::new(), XmlOptions::pretty()));
    write_tree(&mut writer, &tree)?;
    let xml = writer.into_inner()?.into_inner();
    println!("As XML:\n{}\n", String::from_utf8(xml.clone())?);

    let mut reader = DataStoreReader::new(XmlReader::new(xml.as_slice()));
    let Some(tree) = read_tree(&mut reader)? else {
        return Err("empty document".into());
    };

    let mut writer = DataStoreWriter::new(JsonWriter::with_options(Vec::new(), JsonOptions::pretty()));
    write_tree(&mut writer, &tree)?;
    let json = writer.into_inner()?.into_inner();
    println!("As data store JSON:\n{}", String::from_utf8(json)?);

    Ok(())
}
