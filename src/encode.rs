//! The Encoder: walks a [`Schema`] against a [`Record`], writing bytes to
//! an output buffer at a cursor.

use tracing::trace;

use crate::error::EncodeError;
use crate::primitive::{self, Format};
use crate::schema::{CompiledKind, Schema, SlotFormat};
use crate::size::{derive_metadata, find_alternative};
use crate::slot::ChildCount;
use crate::value::{Record, Value};

/// Encodes `record` against `schema` into a fresh buffer, returning the
/// encoded bytes.
pub fn encode(schema: &Schema, record: &Record) -> Result<Vec<u8>, EncodeError> {
    let mut buf = Vec::new();
    encode_into(schema, record, &mut buf, 0)?;
    Ok(buf)
}

/// Encodes `record` against `schema` into `buf` starting at `offset`,
/// growing `buf` as needed. Returns the number of bytes written.
pub fn encode_into(
    schema: &Schema,
    record: &Record,
    buf: &mut Vec<u8>,
    offset: usize,
) -> Result<usize, EncodeError> {
    let mut cursor = offset;
    for (idx, slot) in schema.0.slots.iter().enumerate() {
        match &slot.kind {
            CompiledKind::Primitive(p) if p.spec.meta => {
                let value = derive_metadata(schema, record, idx)?;
                let format = resolve_format(&p.format, &value);
                cursor += primitive::write(buf, cursor, format, p.spec.order, &value)
                    .map_err(|e| EncodeError::primitive(&slot.name, cursor, e))?;
            }
            CompiledKind::Primitive(p) => {
                let raw = record
                    .get(&slot.name)
                    .ok_or_else(|| EncodeError::UnknownField { slot: slot.name.to_string(), offset: cursor })?;
                let value = match &p.spec.transform {
                    Some(t) => t.encode(raw).map_err(|e| EncodeError::TransformFailed {
                        slot: slot.name.to_string(),
                        offset: cursor,
                        reason: e.0,
                    })?,
                    None => raw.clone(),
                };
                if let Some(stop) = &p.spec.stop {
                    let elements = stop.encode.elements(&value).map_err(|e| EncodeError::TransformFailed {
                        slot: slot.name.to_string(),
                        offset: cursor,
                        reason: e.0,
                    })?;
                    let element_format = fixed_scalar_format(&p.format);
                    for element in &elements {
                        cursor += primitive::write(buf, cursor, element_format, p.spec.order, element)
                            .map_err(|e| EncodeError::primitive(&slot.name, cursor, e))?;
                    }
                    cursor += primitive::write(buf, cursor, element_format, p.spec.order, &Value::U8(stop.sentinel))
                        .map_err(|e| EncodeError::primitive(&slot.name, cursor, e))?;
                } else {
                    let format = resolve_format(&p.format, &value);
                    cursor += primitive::write(buf, cursor, format, p.spec.order, &value)
                        .map_err(|e| EncodeError::primitive(&slot.name, cursor, e))?;
                }
            }
            CompiledKind::Constant(c) => {
                cursor += primitive::write(buf, cursor, c.format, c.spec.order, &c.spec.value)
                    .map_err(|e| EncodeError::primitive(&slot.name, cursor, e))?;
            }
            CompiledKind::Child(c) => {
                let raw = record
                    .get(&slot.name)
                    .ok_or_else(|| EncodeError::UnknownField { slot: slot.name.to_string(), offset: cursor })?;
                match &c.spec.count {
                    ChildCount::ExactlyOne => {
                        let inner = raw.as_record().ok_or_else(|| EncodeError::UnknownField {
                            slot: slot.name.to_string(),
                            offset: cursor,
                        })?;
                        let alt = find_alternative(&c.spec.alternatives, inner).ok_or_else(|| {
                            EncodeError::ChildTypeNotInAlternatives {
                                slot: slot.name.to_string(),
                                offset: cursor,
                                type_name: inner.type_name().to_string(),
                            }
                        })?;
                        cursor += encode_into(alt, inner, buf, cursor)?;
                    }
                    ChildCount::Fixed(_) | ChildCount::CountOf(_) | ChildCount::SizeOf(_) | ChildCount::Greedy => {
                        let items = raw.as_list().ok_or_else(|| EncodeError::UnknownField {
                            slot: slot.name.to_string(),
                            offset: cursor,
                        })?;
                        for item in items {
                            let inner = item.as_record().ok_or_else(|| EncodeError::UnknownField {
                                slot: slot.name.to_string(),
                                offset: cursor,
                            })?;
                            let alt = find_alternative(&c.spec.alternatives, inner).ok_or_else(|| {
                                EncodeError::ChildTypeNotInAlternatives {
                                    slot: slot.name.to_string(),
                                    offset: cursor,
                                    type_name: inner.type_name().to_string(),
                                }
                            })?;
                            cursor += encode_into(alt, inner, buf, cursor)?;
                        }
                    }
                }
            }
        }
        trace!(schema = schema.name(), slot = %slot.name, cursor, "encoded slot");
    }
    Ok(cursor - offset)
}

fn resolve_format(format: &SlotFormat, value: &Value) -> Format {
    match format {
        SlotFormat::Fixed(fmt) => *fmt,
        SlotFormat::MetaBytes(_) => Format::Bytes(value.as_bytes().map(|b| b.len()).unwrap_or(0)),
    }
}

fn fixed_scalar_format(format: &SlotFormat) -> Format {
    match format {
        SlotFormat::Fixed(fmt) => *fmt,
        SlotFormat::MetaBytes(_) => Format::U8,
    }
}
