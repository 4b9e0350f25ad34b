use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use data_store::json::{JsonReader, JsonWriter};
use data_store::node_io::{read_tree, write_tree, NodeReader, NodeWriter};
use data_store::xml::{XmlReader, XmlWriter};
use data_store::{
    from_json_str, from_node, from_xml_str, to_json_string, to_node, to_xml_string, DataStoreNode,
    DataStoreReader, DataStoreWriter, Error, JsonOptions, ObjectDeserializer, ObjectNode,
    ObjectSerializer, ReadBackend, Token, WriteBackend, XmlOptions,
};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct User {
    id: u32,
    name: String,
    active: bool,
    tags: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct Product {
    sku: String,
    price: f64,
    quantity: u32,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct Order {
    order_id: u32,
    customer: User,
    items: Vec<Product>,
    total: f64,
    note: Option<String>,
}

fn sample_order() -> Order {
    Order {
        order_id: 12345,
        customer: User {
            id: 123,
            name: "Alice".to_string(),
            active: true,
            tags: vec!["vip".to_string()],
        },
        items: vec![
            Product {
                sku: "WIDGET-001".to_string(),
                price: 29.99,
                quantity: 2,
            },
            Product {
                sku: "GADGET-002".to_string(),
                price: 49.5,
                quantity: 1,
            },
        ],
        total: 109.48,
        note: None,
    }
}

/// `{root: {x: "1", y: {z: "2"}}}`
fn sample_tree() -> DataStoreNode {
    let mut root = ObjectNode::new("root").unwrap();
    root.insert(DataStoreNode::text("x", "1").unwrap()).unwrap();
    let mut y = ObjectNode::new("y").unwrap();
    y.insert(DataStoreNode::text("z", "2").unwrap()).unwrap();
    root.insert(y).unwrap();
    root.into()
}

fn tokens<B: ReadBackend>(backend: B) -> Vec<(Token, Option<String>, String)> {
    let mut reader = DataStoreReader::new(backend);
    let mut out = Vec::new();
    loop {
        let token = reader.advance().unwrap();
        out.push((token, reader.name().map(str::to_string), reader.path().to_string()));
        if token == Token::DataStoreEnd {
            return out;
        }
    }
}

fn expected_tokens() -> Vec<(Token, Option<String>, String)> {
    let t = |token, name: Option<&str>, path: &str| (token, name.map(str::to_string), path.to_string());
    vec![
        t(Token::ObjectStart, Some("root"), "root"),
        t(Token::Value, Some("x"), "root/x"),
        t(Token::ObjectStart, Some("y"), "root/y"),
        t(Token::Value, Some("z"), "root/y/z"),
        t(Token::ObjectEnd, Some("y"), "root/y"),
        t(Token::ObjectEnd, Some("root"), "root"),
        t(Token::DataStoreEnd, None, ""),
    ]
}

#[test]
fn test_node_tree_tokens() {
    let tree = sample_tree();
    assert_eq!(tokens(NodeReader::new(&tree)), expected_tokens());
}

#[test]
fn test_xml_tokens_match_node_tree() {
    let tree = sample_tree();
    let mut writer = DataStoreWriter::new(XmlWriter::new(Vec::new()));
    write_tree(&mut writer, &tree).unwrap();
    let xml = writer.into_inner().unwrap().into_inner();

    assert_eq!(tokens(XmlReader::new(xml.as_slice())), expected_tokens());
}

#[test]
fn test_json_tokens_match_node_tree() {
    let tree = sample_tree();
    let mut writer = DataStoreWriter::new(JsonWriter::new(Vec::new()));
    write_tree(&mut writer, &tree).unwrap();
    let json = writer.into_inner().unwrap().into_inner();
    assert_eq!(
        String::from_utf8(json.clone()).unwrap(),
        r#"{"root":{"x":"1","y":{"z":"2"}}}"#
    );

    let backend = JsonReader::from_reader(json.as_slice(), &JsonOptions::new()).unwrap();
    assert_eq!(tokens(backend), expected_tokens());
}

fn copy_tree<R: ReadBackend, W: WriteBackend>(from: R, to: W) -> W {
    let mut reader = DataStoreReader::new(from);
    let tree = read_tree(&mut reader).unwrap().unwrap();
    let mut writer = DataStoreWriter::new(to);
    write_tree(&mut writer, &tree).unwrap();
    writer.into_inner().unwrap()
}

#[test]
fn test_conversion_chain() {
    let tree = sample_tree();

    let xml = copy_tree(NodeReader::new(&tree), XmlWriter::with_options(Vec::new(), XmlOptions::pretty()))
        .into_inner();
    let json = copy_tree(XmlReader::new(xml.as_slice()), JsonWriter::new(Vec::new())).into_inner();
    let backend = JsonReader::from_reader(json.as_slice(), &JsonOptions::new()).unwrap();
    let back = copy_tree(backend, NodeWriter::new()).into_root().unwrap();

    assert_eq!(back, tree);
}

#[test]
fn test_serde_round_trip_all_formats() {
    let order = sample_order();

    let node = to_node("order", &order).unwrap();
    assert_eq!(from_node::<Order>(&node).unwrap(), order);

    let xml = to_xml_string("order", &order).unwrap();
    assert_eq!(from_xml_str::<Order>(&xml).unwrap(), order);

    let json = to_json_string("order", &order).unwrap();
    assert_eq!(from_json_str::<Order>(&json).unwrap(), order);
}

#[test]
fn test_serde_binary_node_tree() {
    let order = sample_order();
    let mut writer = DataStoreWriter::new(NodeWriter::binary());
    data_store::ser::to_writer(&mut writer, "order", &order).unwrap();
    let tree = writer.into_inner().unwrap().into_root().unwrap();

    let total = tree.as_object().unwrap().get("total").unwrap();
    assert_eq!(total.as_bytes(), Some(&109.48f64.to_le_bytes()[..]));
    assert_eq!(from_node::<Order>(&tree).unwrap(), order);
}

#[test]
fn test_second_root_rejected() {
    let mut writer = DataStoreWriter::new(NodeWriter::new());
    writer.write("a", &1i32).unwrap();
    let err = writer.write("b", &2i32).unwrap_err();
    assert!(err.is_format());
    assert!(err.to_string().contains("root"));
}

#[test]
fn test_unbalanced_object_end_rejected() {
    let mut writer = DataStoreWriter::new(NodeWriter::new());
    writer.write_object_start("a").unwrap();
    writer.write_object_end().unwrap();
    let err = writer.write_object_end().unwrap_err();
    assert!(err.is_format());
    assert_eq!(err.position().map(|p| p.depth), Some(0));
}

#[test]
fn test_duplicate_sibling_rejected_on_every_backend() {
    fn check<B: WriteBackend>(backend: B) {
        let mut writer = DataStoreWriter::new(backend);
        writer.write_object_start("root").unwrap();
        writer.write("x", &1i32).unwrap();
        let err = writer.write("x", &2i32).unwrap_err();
        assert!(err.is_format());
    }

    check(NodeWriter::new());
    check(XmlWriter::new(Vec::new()));
    check(JsonWriter::new(Vec::new()));
}

#[test]
fn test_invalid_names_rejected() {
    let mut writer = DataStoreWriter::new(NodeWriter::new());
    assert!(writer.write("9lives", &1i32).unwrap_err().is_format());
    assert!(writer.write_object_start("a b").unwrap_err().is_format());
    assert!(writer.write_object_start("").unwrap_err().is_format());
}

#[test]
fn test_writer_unusable_after_close() {
    let mut writer = DataStoreWriter::new(NodeWriter::new());
    writer.write_object_start("root").unwrap();
    writer.close().unwrap();
    writer.close().unwrap();
    assert!(matches!(writer.write("x", &1i32), Err(Error::Usage(_))));
}

#[test]
fn test_close_ends_open_objects() {
    let mut writer = DataStoreWriter::new(XmlWriter::new(Vec::new()));
    writer.write_object_start("a").unwrap();
    writer.write_object_start("b").unwrap();
    writer.write("c", &true).unwrap();
    let xml = writer.into_inner().unwrap().into_inner();
    assert_eq!(
        String::from_utf8(xml).unwrap(),
        "<root><a><b><c>true</c></b></a></root>"
    );
}

#[test]
fn test_name_mismatch_reports_position() {
    let tree = sample_tree();
    let mut reader = DataStoreReader::new(NodeReader::new(&tree));
    reader.advance().unwrap();
    reader.read_object_start(Some("root")).unwrap();

    let err = reader.read_value::<i32>(Some("wrong")).unwrap_err();
    let position = err.position().unwrap();
    assert_eq!(position.token, Token::Value);
    assert_eq!(position.name.as_deref(), Some("x"));
    assert_eq!(position.path, "root/x");
}

#[test]
fn test_wrong_token_kind() {
    let tree = sample_tree();
    let mut reader = DataStoreReader::new(NodeReader::new(&tree));
    reader.advance().unwrap();
    assert!(reader.read_value::<String>(None).unwrap_err().is_format());
    reader.read_object_start(None).unwrap();
    assert!(reader.read_object_start(None).unwrap_err().is_format());
    assert!(reader.read_object_end().unwrap_err().is_format());
}

#[test]
fn test_skip_subtree() {
    let tree = sample_tree();
    let mut reader = DataStoreReader::new(NodeReader::new(&tree));
    reader.advance().unwrap();
    reader.read_object_start(Some("root")).unwrap();
    reader.skip().unwrap();
    assert_eq!(reader.name(), Some("y"));
    reader.skip().unwrap();
    assert_eq!(reader.token(), Token::ObjectEnd);
    assert_eq!(reader.parent_path(), "");
    reader.read_object_end().unwrap();
    assert!(reader.is_end());
}

struct Point {
    x: i32,
    y: i32,
}

struct PointCodec;

impl ObjectSerializer<Point> for PointCodec {
    fn serialize<B: WriteBackend>(&self, value: &Point, writer: &mut DataStoreWriter<B>) -> data_store::Result<()> {
        writer.write("x", &value.x)?;
        writer.write("y", &value.y)?;
        writer.write("comment", &"ignored on read".to_string())
    }
}

impl ObjectDeserializer<Point> for PointCodec {
    fn deserialize<B: ReadBackend>(&self, reader: &mut DataStoreReader<B>) -> data_store::Result<Point> {
        let x = reader.read_value(Some("x"))?;
        let y = reader.read_value(Some("y"))?;
        Ok(Point { x, y })
    }
}

#[test]
fn test_object_codec_with_auto_skip() {
    let mut writer = DataStoreWriter::new(XmlWriter::new(Vec::new()));
    writer.write_object_start("shapes").unwrap();
    writer.write_object("a", &Point { x: 1, y: 2 }, &PointCodec).unwrap();
    writer.write_object("b", &Point { x: -3, y: 4 }, &PointCodec).unwrap();
    writer.write_object_end().unwrap();
    let xml = writer.into_inner().unwrap().into_inner();

    let mut reader = DataStoreReader::new(XmlReader::new(xml.as_slice()));
    reader.advance().unwrap();
    reader.read_object_start(Some("shapes")).unwrap();
    let a = reader.deserialize_object(&PointCodec, Some("a")).unwrap();
    let b = reader.deserialize_object(&PointCodec, Some("b")).unwrap();
    reader.read_object_end().unwrap();

    assert_eq!((a.x, a.y, b.x, b.y), (1, 2, -3, 4));
    assert!(reader.is_end());
}

#[test]
fn test_date_time_and_time_span_values() {
    let when: DateTime<Utc> = Utc.with_ymd_and_hms(2024, 2, 29, 12, 30, 0).unwrap();
    let span = TimeDelta::hours(26) + TimeDelta::minutes(5);

    for backend in [NodeWriter::new(), NodeWriter::binary()] {
        let mut writer = DataStoreWriter::new(backend);
        writer.write_object_start("event").unwrap();
        writer.write("when", &when).unwrap();
        writer.write("duration", &span).unwrap();
        writer.write_object_end().unwrap();
        let tree = writer.into_inner().unwrap().into_root().unwrap();

        let mut reader = DataStoreReader::new(NodeReader::new(&tree));
        reader.advance().unwrap();
        reader.read_object_start(Some("event")).unwrap();
        assert_eq!(reader.read_value::<DateTime<Utc>>(Some("when")).unwrap(), when);
        assert_eq!(reader.read_value::<TimeDelta>(Some("duration")).unwrap(), span);
        reader.read_object_end().unwrap();
    }
}

#[test]
fn test_date_time_text_form() {
    let when: DateTime<Utc> = Utc.with_ymd_and_hms(2024, 2, 29, 12, 30, 0).unwrap();
    let mut writer = DataStoreWriter::new(XmlWriter::new(Vec::new()));
    writer.write("when", &when).unwrap();
    let xml = String::from_utf8(writer.into_inner().unwrap().into_inner()).unwrap();
    assert_eq!(xml, "<root><when>2024-02-29T12:30:00.0000000Z</when></root>");
}

#[test]
fn test_foreign_json_document() {
    let json = r#"{"server name": "alpha", "ports": [80, 443], "debug": null, "ratio": 0.5}"#;
    let backend = JsonReader::from_str(json, &JsonOptions::foreign().with_root_name("config")).unwrap();
    let tree = read_tree(&mut DataStoreReader::new(backend)).unwrap().unwrap();

    let config = tree.as_object().unwrap();
    assert_eq!(config.name(), "config");
    assert_eq!(config.find("server_0020name").and_then(DataStoreNode::as_text), Some("alpha"));
    assert_eq!(config.find("ports/i1").and_then(DataStoreNode::as_text), Some("443"));
    assert_eq!(config.find("debug").and_then(DataStoreNode::as_text), Some(""));
    assert_eq!(config.find("ratio").and_then(DataStoreNode::as_text), Some("0.5"));
}

#[test]
fn test_malformed_documents() {
    assert!(from_xml_str::<User>("<root><user><id>1</id>").is_err());
    assert!(from_xml_str::<User>("<root><user>text<id>1</id></user></root>").is_err());
    assert!(from_json_str::<User>(r#"{"a": {}, "b": {}}"#).is_err());
    assert!(from_json_str::<User>("[1, 2]").is_err());
    assert!(from_json_str::<User>("{").is_err());
}
