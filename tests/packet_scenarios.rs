//! Integration tests for the worked round-trip scenarios.

use std::collections::HashMap;

use pakt::{
    ByteOrder, ChildCount, ChildSlotSpec, ConstantSlotSpec, DecodeError, FormatSpec, PrimitiveError, PrimitiveSlotSpec,
    Record, RepeatCount, Schema, SchemaBuilder, StopDecodePipeline, StopEncodePipeline, StopSpec, Transform,
    TransformError, Value,
};

fn scaled_transform() -> Transform {
    Transform::new(
        |v| match v {
            Value::F64(v) => Ok(Value::U16((v * 100.0).round() as u16)),
            other => Err(TransformError(format!("expected f64, got {other:?}"))),
        },
        |v| match v {
            Value::U16(v) => Ok(Value::F64(f64::from(*v) / 100.0)),
            other => Err(TransformError(format!("expected u16, got {other:?}"))),
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
        .unwrap()
}

// Assumes a little-endian host for the `Native`-order field's literal bytes.
#[test]
fn scenario_a_fixed_size_point() {
    let schema = point_schema();
    let mut fields = HashMap::new();
    fields.insert("x".to_string(), Value::F64(420.69));
    fields.insert("y".to_string(), Value::F64(13.37));
    let record = Record::new("Point", fields);

    let bytes = pakt::encode(&schema, &record).unwrap();
    assert_eq!(bytes, vec![0x55, 0xa4, 0x39, 0x05]);
    assert_eq!(pakt::calcsize(&schema, &record).unwrap(), 4);

    let decoded = pakt::decode(&schema, &bytes).unwrap();
    assert_eq!(decoded.get("x"), Some(&Value::F64(420.69)));
    assert_eq!(decoded.get("y"), Some(&Value::F64(13.37)));
}

fn person_schema_little_endian() -> Schema {
    SchemaBuilder::new("Person")
        .slot("age", PrimitiveSlotSpec::new(FormatSpec::U8))
        .slot("height", PrimitiveSlotSpec::new(FormatSpec::F32).order(ByteOrder::Little))
        .slot("weight", PrimitiveSlotSpec::new(FormatSpec::F32).order(ByteOrder::Little))
        .slot("name_size", PrimitiveSlotSpec::new(FormatSpec::U8).meta())
        .slot(
            "name",
            PrimitiveSlotSpec::new(FormatSpec::Bytes(RepeatCount::Meta("name_size".into()))).transform(Transform::utf8()),
        )
        .build()
        .unwrap()
}

fn person_record(age: u8, height: f32, weight: f32, name: &str) -> Record {
    let mut fields = HashMap::new();
    fields.insert("age".to_string(), Value::U8(age));
    fields.insert("height".to_string(), Value::F32(height));
    fields.insert("weight".to_string(), Value::F32(weight));
    fields.insert("name".to_string(), Value::Str(name.to_string()));
    Record::new("Person", fields)
}

#[test]
fn scenario_b_length_prefixed_string() {
    let schema = person_schema_little_endian();
    let record = person_record(22, 180.0, 66.75, "Fogell McLovin");

    let bytes = pakt::encode(&schema, &record).unwrap();
    assert_eq!(
        bytes,
        vec![
            0x16, 0x00, 0x00, 0x34, 0x43, 0x00, 0x00, 0x85, 0x42, 0x0e, 0x46, 0x6f, 0x67, 0x65, 0x6c, 0x6c, 0x20,
            0x4d, 0x63, 0x4c, 0x6f, 0x76, 0x69, 0x6e,
        ]
    );
    assert_eq!(bytes.len(), 24);
    assert_eq!(pakt::calcsize(&schema, &record).unwrap(), bytes.len());

    let decoded = pakt::decode(&schema, &bytes).unwrap();
    assert_eq!(decoded.get("name"), Some(&Value::Str("Fogell McLovin".to_string())));
    assert_eq!(decoded.get("name_size"), None);
}

fn time_schema() -> Schema {
    SchemaBuilder::new("Time")
        .slot("_id", ConstantSlotSpec::new(Value::U8(0x45), FormatSpec::U8))
        .slot("_version", ConstantSlotSpec::new(Value::U8(0x01), FormatSpec::U8))
        .slot("unixtime", PrimitiveSlotSpec::new(FormatSpec::U32))
        .build()
        .unwrap()
}

fn time_record(unixtime: u32) -> Record {
    let mut fields = HashMap::new();
    fields.insert("unixtime".to_string(), Value::U32(unixtime));
    Record::new("Time", fields)
}

#[test]
fn offset_transparency() {
    let schema = time_schema();
    let record = time_record(1_697_915_180);

    let mut at_zero = Vec::new();
    let written = pakt::encode_into(&schema, &record, &mut at_zero, 0).unwrap();

    let mut at_k = vec![0xaa, 0xbb, 0xcc];
    let k = at_k.len();
    let written_at_k = pakt::encode_into(&schema, &record, &mut at_k, k).unwrap();

    assert_eq!(written, written_at_k);
    assert_eq!(&at_k[k..], &at_zero[..]);

    let (decoded, consumed) = pakt::decode_from(&schema, &at_k, k).unwrap();
    assert_eq!(consumed, written);
    assert_eq!(decoded, record);
}

#[test]
fn scenario_c_constants_roundtrip_and_reject_tamper() {
    let schema = time_schema();
    let record = time_record(1_697_915_180);

    let bytes = pakt::encode(&schema, &record).unwrap();
    assert_eq!(bytes, vec![0x45, 0x01, 0x65, 0x34, 0x21, 0x2c]);

    let decoded = pakt::decode(&schema, &bytes).unwrap();
    assert_eq!(decoded.get("unixtime"), Some(&Value::U32(1_697_915_180)));

    let mut tampered = bytes.clone();
    tampered[0] = 0x46;
    let err = pakt::decode(&schema, &tampered).unwrap_err();
    assert!(matches!(
        err,
        DecodeError::ConstantMismatch { expected: 0x45, actual: 0x46, .. }
    ));
}

fn mini_person_schema() -> Schema {
    SchemaBuilder::new("Person")
        .slot("age", PrimitiveSlotSpec::new(FormatSpec::U8))
        .build()
        .unwrap()
}

fn player_schema() -> Schema {
    SchemaBuilder::new("Player")
        .slot("_tag", ConstantSlotSpec::new(Value::U8(0xfe), FormatSpec::U8))
        .slot("self", ChildSlotSpec::new(vec![mini_person_schema()], ChildCount::ExactlyOne))
        .slot("time", ChildSlotSpec::new(vec![time_schema()], ChildCount::ExactlyOne))
        .slot("friends_size", PrimitiveSlotSpec::new(FormatSpec::U16).meta())
        .slot(
            "friends_sized",
            ChildSlotSpec::new(vec![mini_person_schema()], ChildCount::SizeOf("friends_size".into())),
        )
        .slot("friends_count", PrimitiveSlotSpec::new(FormatSpec::U8).meta())
        .slot(
            "friends_counted",
            ChildSlotSpec::new(vec![mini_person_schema()], ChildCount::CountOf("friends_count".into())),
        )
        .build()
        .unwrap()
}

fn mini_person(age: u8) -> Value {
    let mut fields = HashMap::new();
    fields.insert("age".to_string(), Value::U8(age));
    Value::Record(Box::new(Record::new("Person", fields)))
}

#[test]
fn scenario_d_nested_size_and_count_metadata() {
    let schema = player_schema();

    let mut fields = HashMap::new();
    fields.insert("self".to_string(), mini_person(22));
    fields.insert(
        "time".to_string(),
        Value::Record(Box::new(time_record(1_697_915_180))),
    );
    fields.insert(
        "friends_sized".to_string(),
        Value::List(vec![mini_person(1), mini_person(2), mini_person(3)]),
    );
    fields.insert(
        "friends_counted".to_string(),
        Value::List(vec![mini_person(4), mini_person(5)]),
    );
    let record = Record::new("Player", fields);

    let bytes = pakt::encode(&schema, &record).unwrap();
    assert_eq!(pakt::calcsize(&schema, &record).unwrap(), bytes.len());

    let decoded = pakt::decode(&schema, &bytes).unwrap();
    assert_eq!(decoded.get("friends_sized").unwrap().as_list().unwrap().len(), 3);
    assert_eq!(decoded.get("friends_counted").unwrap().as_list().unwrap().len(), 2);
    assert_eq!(decoded, record);
}

#[test]
fn scenario_e_greedy_fixed_points() {
    let schema = SchemaBuilder::new("PointList")
        .slot(
            "points",
            ChildSlotSpec::new(
                vec![SchemaBuilder::new("Point")
                    .slot("x", PrimitiveSlotSpec::new(FormatSpec::U16))
                    .slot("y", PrimitiveSlotSpec::new(FormatSpec::U16))
                    .build()
                    .unwrap()],
                ChildCount::Greedy,
            ),
        )
        .build()
        .unwrap();

    let point = |x: u16, y: u16| {
        let mut fields = HashMap::new();
        fields.insert("x".to_string(), Value::U16(x));
        fields.insert("y".to_string(), Value::U16(y));
        Value::Record(Box::new(Record::new("Point", fields)))
    };
    let mut fields = HashMap::new();
    fields.insert("points".to_string(), Value::List(vec![point(7, 9); 5]));
    let record = Record::new("PointList", fields);

    let bytes = pakt::encode(&schema, &record).unwrap();
    assert_eq!(bytes.len(), 20);

    let decoded = pakt::decode(&schema, &bytes).unwrap();
    assert_eq!(decoded.get("points").unwrap().as_list().unwrap().len(), 5);
}

#[test]
fn scenario_f_heterogeneous_alternatives_dispatch_by_dynamic_type() {
    let schema = SchemaBuilder::new("Dummy")
        .slot(
            "objects",
            ChildSlotSpec::new(vec![time_schema(), player_schema()], ChildCount::Greedy),
        )
        .build()
        .unwrap();

    let time_value = |t: u32| Value::Record(Box::new(time_record(t)));
    let mut player_fields = HashMap::new();
    player_fields.insert("self".to_string(), mini_person(1));
    player_fields.insert("time".to_string(), Value::Record(Box::new(time_record(1))));
    player_fields.insert("friends_sized".to_string(), Value::List(vec![]));
    player_fields.insert("friends_counted".to_string(), Value::List(vec![]));
    let player_value = Value::Record(Box::new(Record::new("Player", player_fields)));

    let mut fields = HashMap::new();
    fields.insert(
        "objects".to_string(),
        Value::List(vec![time_value(1), player_value, time_value(2)]),
    );
    let record = Record::new("Dummy", fields);

    let bytes = pakt::encode(&schema, &record).unwrap();
    let decoded = pakt::decode(&schema, &bytes).unwrap();
    let items = decoded.get("objects").unwrap().as_list().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0].as_record().unwrap().type_name(), "Time");
    assert_eq!(items[1].as_record().unwrap().type_name(), "Player");
    assert_eq!(items[2].as_record().unwrap().type_name(), "Time");
}

fn string_schema() -> Schema {
    let encode = StopEncodePipeline::new(
        |v| match v {
            Value::Str(s) => Ok(Value::Bytes(pakt::utf8_to_bytes(s))),
            other => Err(TransformError(format!("expected str, got {other:?}"))),
        },
        |v| match v {
            Value::Bytes(b) => Ok(Value::List(b.iter().map(|byte| Value::U8(*byte)).collect())),
            other => Err(TransformError(format!("expected bytes, got {other:?}"))),
        },
    );
    let decode = StopDecodePipeline::new(
        |v| Ok(v.clone()),
        |v| match v {
            Value::List(items) => {
                let bytes: Vec<u8> = items
                    .iter()
                    .map(|item| match item {
                        Value::U8(b) => *b,
                        _ => 0,
                    })
                    .collect();
                pakt::utf8_from_bytes(&bytes)
                    .map(Value::Str)
                    .map_err(|e| TransformError(e.to_string()))
            }
            other => Err(TransformError(format!("expected list, got {other:?}"))),
        },
    );
    SchemaBuilder::new("StopString")
        .slot(
            "text",
            PrimitiveSlotSpec::new(FormatSpec::U8).stop(StopSpec { sentinel: 0x00, encode, decode }),
        )
        .build()
        .unwrap()
}

#[test]
fn scenario_g_stop_sentinel_string() {
    let schema = string_schema();
    let text = "this is a stop test, is it working?";
    let mut fields = HashMap::new();
    fields.insert("text".to_string(), Value::Str(text.to_string()));
    let record = Record::new("StopString", fields);

    let bytes = pakt::encode(&schema, &record).unwrap();
    assert_eq!(bytes.len(), pakt::utf8_size(text) + 1);
    assert_eq!(*bytes.last().unwrap(), 0x00);

    let decoded = pakt::decode(&schema, &bytes).unwrap();
    assert_eq!(decoded.get("text"), Some(&Value::Str(text.to_string())));
}

#[test]
fn scenario_g_missing_sentinel_is_buffer_underflow() {
    let schema = string_schema();
    let bytes = pakt::utf8_to_bytes("no terminator here");
    let err = pakt::decode(&schema, &bytes).unwrap_err();
    assert!(matches!(
        err,
        DecodeError::Primitive { source: PrimitiveError::BufferUnderflow { .. }, .. }
    ));
}
