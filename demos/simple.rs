//! Serde types through the node tree, XML and JSON.
//!
//! Run with: cargo run --example simple

use data_store::{from_json_str, from_node, from_xml_str, to_json_string, to_node, to_xml_string};
use serde::{Deserialize, Serialize};
use std::error::Error;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct User {
    id: u32,
    name: String,
    email: Option<String>,
}

fn main() -> Result<(), Box<dyn Error>> {
    let users = vec![
        User {
            id: 42,
            name: "Alice Johnson".to_string(),
            email: Some("alice@example.com".to_string()),
        },
        User {
            id: 43,
            name: "Bob Smith".to_string(),
            email: None,
        },
    ];

    let node = to_node("users", &users)?;
    println!("Node tree:\n{:#?}\n", node);
    let users_back: Vec<User> = from_node(&node)?;
    assert_eq!(users, users_back);

    let xml = to_xml_string("users", &users)?;
    println!("XML output:\n{}\n", xml);
    let users_back: Vec<User> = from_xml_str(&xml)?;
    assert_eq!(users, users_back);

    let json = to_json_string("users", &users)?;
    println!("JSON output:\n{}\n", json);
    let users_back: Vec<User> = from_json_str(&json)?;
    assert_eq!(users, users_back);

    println!("✓ Round-trip successful");
    Ok(())
}
