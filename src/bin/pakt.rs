//! Demo CLI: builds the worked-example schemas and round-trips a record
//! through `encode`/`decode`, printing the wire bytes as hex.

use std::collections::HashMap;

use clap::{Parser, Subcommand};
use pakt::{
    ByteOrder, ChildCount, ChildSlotSpec, ConstantSlotSpec, FormatSpec, PrimitiveSlotSpec, Record, RepeatCount,
    Schema, SchemaBuilder, Transform, Value,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "round-trip a sample packet schema", long_about = None)]
struct Cli {
    #[command(subcommand)]
    scenario: Scenario,
}

#[derive(Debug, Subcommand)]
enum Scenario {
    /// Fixed-size two-field record with a scaling transform (Scenario A).
    Point,
    /// Length-prefixed string field driven by a metadata slot (Scenario B).
    Person,
    /// Constant-tagged record rejected on tamper (Scenario C).
    Time,
    /// Nested record with a count-metadata child list (Scenario D).
    Player,
}

fn main() {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    match cli.scenario {
        Scenario::Point => run_point(),
        Scenario::Person => run_person(),
        Scenario::Time => run_time(),
        Scenario::Player => run_player(),
    }
}

fn scaled_transform() -> Transform {
    Transform::new(
        |v| match v {
            Value::F64(v) => Ok(Value::U16((v * 100.0).round() as u16)),
            other => Err(pakt::TransformError(format!("expected f64, got {other:?}"))),
        },
        |v| match v {
            Value::U16(v) => Ok(Value::F64(f64::from(*v) / 100.0)),
            other => Err(pakt::TransformError(format!("expected u16, got {other:?}"))),
        },
    )
}

fn point_schema() -> Schema {
    SchemaBuilder::new("Point")
        .slot(
            "x",
            PrimitiveSlotSpec::new(FormatSpec::U16).order(ByteOrder::Little).transform(scaled_transform()),
        )
        .slot(
            "y",
            PrimitiveSlotSpec::new(FormatSpec::U16).order(ByteOrder::Native).transform(scaled_transform()),
        )
        .build()
        .expect("Point schema compiles")
}

fn run_point() {
    let schema = point_schema();
    let mut fields = HashMap::new();
    fields.insert("x".to_string(), Value::F64(420.69));
    fields.insert("y".to_string(), Value::F64(13.37));
    let record = Record::new("Point", fields);
    roundtrip(&schema, &record);
}

fn person_schema() -> Schema {
    SchemaBuilder::new("Person")
        .slot("age", PrimitiveSlotSpec::new(FormatSpec::U8))
        .slot("height", PrimitiveSlotSpec::new(FormatSpec::F32))
        .slot("weight", PrimitiveSlotSpec::new(FormatSpec::F32))
        .slot("name_size", PrimitiveSlotSpec::new(FormatSpec::U8).meta())
        .slot(
            "name",
            PrimitiveSlotSpec::new(FormatSpec::Bytes(RepeatCount::Meta("name_size".into()))).transform(Transform::utf8()),
        )
        .build()
        .expect("Person schema compiles")
}

fn run_person() {
    let schema = person_schema();
    let record = Record::new("Person", person_fields("Fogell McLovin"));
    roundtrip(&schema, &record);
}

fn time_schema() -> Schema {
    SchemaBuilder::new("Time")
        .slot("_id", ConstantSlotSpec::new(Value::U8(0x45), FormatSpec::U8))
        .slot("_version", ConstantSlotSpec::new(Value::U8(0x01), FormatSpec::U8))
        .slot("unixtime", PrimitiveSlotSpec::new(FormatSpec::U32))
        .build()
        .expect("Time schema compiles")
}

fn run_time() {
    let schema = time_schema();
    let mut fields = HashMap::new();
    fields.insert("unixtime".to_string(), Value::U32(1_697_915_180));
    let record = Record::new("Time", fields);
    roundtrip(&schema, &record);
}

fn player_schema() -> Schema {
    SchemaBuilder::new("Player")
        .slot("self", ChildSlotSpec::new(vec![person_schema()], ChildCount::ExactlyOne))
        .slot("friend_count", PrimitiveSlotSpec::new(FormatSpec::U8).meta())
        .slot(
            "friends",
            ChildSlotSpec::new(vec![person_schema()], ChildCount::CountOf("friend_count".into())),
        )
        .build()
        .expect("Player schema compiles")
}

fn run_player() {
    let schema = player_schema();
    let player = Record::new("Person", person_fields("Fogell McLovin"));
    let mut fields = HashMap::new();
    fields.insert("self".to_string(), Value::Record(Box::new(player)));
    fields.insert(
        "friends".to_string(),
        Value::List(vec![
            Value::Record(Box::new(Record::new("Person", person_fields("Evan")))),
            Value::Record(Box::new(Record::new("Person", person_fields("Seth")))),
        ]),
    );
    let record = Record::new("Player", fields);
    roundtrip(&schema, &record);
}

fn person_fields(name: &str) -> HashMap<String, Value> {
    let mut fields = HashMap::new();
    fields.insert("age".to_string(), Value::U8(22));
    fields.insert("height".to_string(), Value::F32(180.0));
    fields.insert("weight".to_string(), Value::F32(66.75));
    fields.insert("name".to_string(), Value::Str(name.to_string()));
    fields
}

fn roundtrip(schema: &Schema, record: &Record) {
    let bytes = pakt::encode(schema, record).expect("encode succeeds");
    println!("{} -> {} ({} bytes)", schema.name(), hex::encode(&bytes), bytes.len());
    let decoded = pakt::decode(schema, &bytes).expect("decode succeeds");
    assert_eq!(&decoded, record, "round-trip mismatch");
    println!("decoded: {decoded}");
}
