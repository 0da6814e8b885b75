//! The Size Oracle: computes a record's exact wire length without producing
//! bytes, and derives metadata values shared with the Encoder.

use crate::error::SizeError;
use crate::schema::{CompiledKind, Schema, SlotFormat};
use crate::value::{Record, Value};

/// Computes the exact number of bytes `encode` would write for `record`
/// against `schema`.
pub fn calcsize(schema: &Schema, record: &Record) -> Result<usize, SizeError> {
    let mut total = 0;
    for (idx, slot) in schema.0.slots.iter().enumerate() {
        total += match &slot.kind {
            CompiledKind::Primitive(p) if p.spec.meta => {
                let value = derive_metadata(schema, record, idx)?;
                slot_width(&p.format, &value)?
            }
            CompiledKind::Primitive(p) => {
                let value = record
                    .get(&slot.name)
                    .ok_or_else(|| SizeError::UnknownField { slot: slot.name.to_string() })?;
                let value = encode_transform(&slot.name, p.spec.transform.as_ref(), value)?;
                if let Some(stop) = &p.spec.stop {
                    let elements = stop
                        .encode
                        .elements(&value)
                        .map_err(|e| SizeError::TransformFailed { slot: slot.name.to_string(), reason: e.0 })?;
                    elements.len() * element_width(&p.format) + 1
                } else {
                    slot_width(&p.format, &value)?
                }
            }
            CompiledKind::Constant(c) => c.format.width(),
            CompiledKind::Child(c) => {
                let value = record
                    .get(&slot.name)
                    .ok_or_else(|| SizeError::UnknownField { slot: slot.name.to_string() })?;
                match value {
                    Value::Record(inner) => {
                        let alt = find_alternative(&c.spec.alternatives, inner).ok_or_else(|| {
                            SizeError::ChildTypeNotInAlternatives {
                                slot: slot.name.to_string(),
                                type_name: inner.type_name().to_string(),
                            }
                        })?;
                        calcsize(alt, inner)?
                    }
                    Value::List(items) => {
                        let mut sum = 0;
                        for item in items {
                            let inner = item.as_record().ok_or_else(|| SizeError::UnknownField {
                                slot: slot.name.to_string(),
                            })?;
                            let alt = find_alternative(&c.spec.alternatives, inner).ok_or_else(|| {
                                SizeError::ChildTypeNotInAlternatives {
                                    slot: slot.name.to_string(),
                                    type_name: inner.type_name().to_string(),
                                }
                            })?;
                            sum += calcsize(alt, inner)?;
                        }
                        sum
                    }
                    _ => return Err(SizeError::UnknownField { slot: slot.name.to_string() }),
                }
            }
        };
    }
    Ok(total)
}

/// Looks up the compiled alternative schema whose name matches `record`'s
/// dynamic type tag.
pub(crate) fn find_alternative<'a>(alternatives: &'a [Schema], record: &Record) -> Option<&'a Schema> {
    alternatives.iter().find(|schema| schema.name() == record.type_name())
}

fn encode_transform(
    slot: &str,
    transform: Option<&crate::transform::Transform>,
    value: &Value,
) -> Result<Value, SizeError> {
    match transform {
        Some(t) => t.encode(value).map_err(|e| SizeError::TransformFailed { slot: slot.to_string(), reason: e.0 }),
        None => Ok(value.clone()),
    }
}

/// Width of one non-stop-sentinel primitive value, given its resolved
/// format. `MetaBytes` formats resolve their width from `value`'s own byte
/// length rather than from the (unrelated) metadata slot.
fn slot_width(format: &SlotFormat, value: &Value) -> Result<usize, SizeError> {
    Ok(match format {
        SlotFormat::Fixed(crate::primitive::Format::Bytes(_)) | SlotFormat::MetaBytes(_) => value
            .as_bytes()
            .map(|b| b.len())
            .unwrap_or(0),
        SlotFormat::Fixed(fmt) => fmt.width(),
    })
}

fn element_width(format: &SlotFormat) -> usize {
    match format {
        SlotFormat::Fixed(fmt) => fmt.width(),
        SlotFormat::MetaBytes(_) => 1,
    }
}

/// Derives the wire value for the metadata slot at `meta_idx`: the byte
/// length or element count of whichever slot references it. Computed
/// directly from the referent's value rather than a user-supplied
/// accessor callback.
pub(crate) fn derive_metadata(schema: &Schema, record: &Record, meta_idx: usize) -> Result<Value, SizeError> {
    let meta_slot = &schema.0.slots[meta_idx];
    let meta_format = match &meta_slot.kind {
        CompiledKind::Primitive(p) => &p.format,
        _ => unreachable!("metadata slots are always primitive"),
    };
    let consumer_idx = *schema
        .0
        .metadata_uses
        .get(&meta_idx)
        .ok_or_else(|| SizeError::UnreferencedMetadataSlot { slot: meta_slot.name.to_string() })?;
    let consumer = &schema.0.slots[consumer_idx];

    let count = match &consumer.kind {
        CompiledKind::Primitive(p) => {
            let value = record
                .get(&consumer.name)
                .ok_or_else(|| SizeError::UnknownField { slot: consumer.name.to_string() })?;
            let value = encode_transform(&consumer.name, p.spec.transform.as_ref(), value)?;
            slot_width(&p.format, &value)?
        }
        CompiledKind::Child(c) => {
            let value = record
                .get(&consumer.name)
                .ok_or_else(|| SizeError::UnknownField { slot: consumer.name.to_string() })?;
            let items = value.as_list().ok_or_else(|| SizeError::UnknownField { slot: consumer.name.to_string() })?;
            match &c.spec.count {
                crate::slot::ChildCount::CountOf(_) => items.len(),
                crate::slot::ChildCount::SizeOf(_) => {
                    let mut sum = 0;
                    for item in items {
                        let inner = item
                            .as_record()
                            .ok_or_else(|| SizeError::UnknownField { slot: consumer.name.to_string() })?;
                        let alt = find_alternative(&c.spec.alternatives, inner).ok_or_else(|| {
                            SizeError::ChildTypeNotInAlternatives {
                                slot: consumer.name.to_string(),
                                type_name: inner.type_name().to_string(),
                            }
                        })?;
                        sum += calcsize(alt, inner)?;
                    }
                    sum
                }
                _ => unreachable!("only CountOf/SizeOf children use a metadata slot"),
            }
        }
        CompiledKind::Constant(_) => unreachable!("constants never consume metadata"),
    };

    Ok(value_from_count(meta_format, count))
}

fn value_from_count(format: &SlotFormat, count: usize) -> Value {
    match format {
        SlotFormat::Fixed(crate::primitive::Format::U8) => Value::U8(count as u8),
        SlotFormat::Fixed(crate::primitive::Format::I8) => Value::I8(count as i8),
        SlotFormat::Fixed(crate::primitive::Format::U16) => Value::U16(count as u16),
        SlotFormat::Fixed(crate::primitive::Format::I16) => Value::I16(count as i16),
        SlotFormat::Fixed(crate::primitive::Format::U32) => Value::U32(count as u32),
        SlotFormat::Fixed(crate::primitive::Format::I32) => Value::I32(count as i32),
        SlotFormat::Fixed(crate::primitive::Format::U64) => Value::U64(count as u64),
        SlotFormat::Fixed(crate::primitive::Format::I64) => Value::I64(count as i64),
        _ => Value::U64(count as u64),
    }
}
