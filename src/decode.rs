//! The Decoder: walks a [`Schema`] against a byte buffer, producing a
//! [`Record`].

use std::collections::HashMap;

use tracing::{error, trace, warn};

use crate::error::DecodeError;
use crate::primitive::{self, Format};
use crate::schema::{self, CompiledKind, Schema, SlotFormat};
use crate::slot::ChildCount;
use crate::value::{Record, Value};

/// Decodes a `Record` matching `schema` from the start of `buf`.
pub fn decode(schema: &Schema, buf: &[u8]) -> Result<Record, DecodeError> {
    let (record, _) = decode_from(schema, buf, 0)?;
    Ok(record)
}

/// Decodes a `Record` matching `schema` from `buf` starting at `offset`.
/// Returns the record and the number of bytes consumed.
pub fn decode_from(schema: &Schema, buf: &[u8], offset: usize) -> Result<(Record, usize), DecodeError> {
    let mut cursor = offset;
    let mut scratch: HashMap<usize, Value> = HashMap::new();
    let mut fields = HashMap::new();

    for (idx, slot) in schema.0.slots.iter().enumerate() {
        let start = cursor;
        match &slot.kind {
            CompiledKind::Primitive(p) if p.spec.meta => {
                let format = match p.format {
                    SlotFormat::Fixed(fmt) => fmt,
                    SlotFormat::MetaBytes(_) => unreachable!("metadata slots are always fixed-width"),
                };
                let (value, n) = primitive::read(buf, cursor, format, p.spec.order)
                    .map_err(|e| DecodeError::from((slot.name.as_ref(), start, e)))?;
                cursor += n;
                scratch.insert(idx, value);
            }
            CompiledKind::Primitive(p) => {
                if let Some(stop) = &p.spec.stop {
                    let element_format = fixed_scalar_format(&p.format);
                    let sentinel = i64::from(stop.sentinel);
                    let mut elements = Vec::new();
                    loop {
                        let (raw, n) = primitive::read(buf, cursor, element_format, p.spec.order)
                            .map_err(|e| DecodeError::from((slot.name.as_ref(), cursor, e)))?;
                        cursor += n;
                        if raw.as_i64() == Some(sentinel) {
                            break;
                        }
                        let assembled = stop.decode.assemble_element(&raw).map_err(|e| DecodeError::TransformFailed {
                            slot: slot.name.to_string(),
                            offset: start,
                            reason: e.0,
                        })?;
                        elements.push(assembled);
                    }
                    let mut value = stop.decode.finish(elements).map_err(|e| DecodeError::TransformFailed {
                        slot: slot.name.to_string(),
                        offset: start,
                        reason: e.0,
                    })?;
                    if let Some(t) = &p.spec.transform {
                        value = t.decode(&value).map_err(|e| DecodeError::TransformFailed {
                            slot: slot.name.to_string(),
                            offset: start,
                            reason: e.0,
                        })?;
                    }
                    fields.insert(slot.name.to_string(), value);
                } else {
                    let format = resolve_decode_format(schema, &p.format, &scratch, &slot.name)?;
                    let (raw, n) = primitive::read(buf, cursor, format, p.spec.order)
                        .map_err(|e| DecodeError::from((slot.name.as_ref(), start, e)))?;
                    cursor += n;
                    let value = match &p.spec.transform {
                        Some(t) => t.decode(&raw).map_err(|e| DecodeError::TransformFailed {
                            slot: slot.name.to_string(),
                            offset: start,
                            reason: e.0,
                        })?,
                        None => raw,
                    };
                    fields.insert(slot.name.to_string(), value);
                }
            }
            CompiledKind::Constant(c) => {
                let (raw, n) = primitive::read(buf, cursor, c.format, c.spec.order)
                    .map_err(|e| DecodeError::from((slot.name.as_ref(), start, e)))?;
                cursor += n;
                let expected = c.spec.value.as_i64().unwrap_or_default();
                let actual = raw.as_i64().unwrap_or_default();
                if expected != actual {
                    warn!(schema = schema.name(), slot = %slot.name, offset = start, expected, actual, "constant mismatch");
                    return Err(DecodeError::ConstantMismatch { slot: slot.name.to_string(), offset: start, expected, actual });
                }
            }
            CompiledKind::Child(c) => {
                let value = match &c.spec.count {
                    ChildCount::ExactlyOne => {
                        let alt_idx = schema::dispatch(c, buf, cursor)
                            .ok_or_else(|| DecodeError::NoMatchingAlternative { slot: slot.name.to_string(), offset: cursor })?;
                        let alt = &c.spec.alternatives[alt_idx];
                        let (inner, n) = decode_from(alt, buf, cursor)?;
                        cursor += n;
                        Value::Record(Box::new(inner))
                    }
                    ChildCount::Fixed(count) => {
                        let mut items = Vec::with_capacity(*count);
                        for _ in 0..*count {
                            items.push(decode_one_child(c, buf, &mut cursor, &slot.name)?);
                        }
                        Value::List(items)
                    }
                    ChildCount::CountOf(_) => {
                        let meta_idx = schema.0.metadata_consumers[&idx];
                        let count = scratch
                            .get(&meta_idx)
                            .ok_or_else(|| {
                                let meta_name = schema.0.slots[meta_idx].name.to_string();
                                error!(schema = schema.name(), slot = %slot.name, %meta_name, "metadata slot not yet decoded");
                                DecodeError::SchemaOrderError { slot: slot.name.to_string(), meta_name }
                            })?
                            .as_usize()
                            .unwrap_or(0);
                        let mut items = Vec::with_capacity(count);
                        for _ in 0..count {
                            items.push(decode_one_child(c, buf, &mut cursor, &slot.name)?);
                        }
                        Value::List(items)
                    }
                    ChildCount::SizeOf(_) => {
                        let meta_idx = schema.0.metadata_consumers[&idx];
                        let budget = scratch
                            .get(&meta_idx)
                            .ok_or_else(|| {
                                let meta_name = schema.0.slots[meta_idx].name.to_string();
                                error!(schema = schema.name(), slot = %slot.name, %meta_name, "metadata slot not yet decoded");
                                DecodeError::SchemaOrderError { slot: slot.name.to_string(), meta_name }
                            })?
                            .as_usize()
                            .unwrap_or(0);
                        let budget_start = cursor;
                        let mut items = Vec::new();
                        while cursor - budget_start < budget {
                            items.push(decode_one_child(c, buf, &mut cursor, &slot.name)?);
                            let consumed = cursor - budget_start;
                            if consumed > budget {
                                error!(schema = schema.name(), slot = %slot.name, offset = budget_start, budget, consumed, "child slot overran its size budget");
                                return Err(DecodeError::ChildSizeOverrun {
                                    slot: slot.name.to_string(),
                                    offset: budget_start,
                                    budget,
                                    consumed,
                                });
                            }
                        }
                        Value::List(items)
                    }
                    ChildCount::Greedy => {
                        let mut items = Vec::new();
                        loop {
                            let remaining = buf.len().saturating_sub(cursor);
                            if remaining == 0 {
                                break;
                            }
                            let min_needed = c.spec.alternatives.iter().map(schema::min_size).min().unwrap_or(0).max(1);
                            if remaining < min_needed || schema::dispatch(c, buf, cursor).is_none() {
                                warn!(schema = schema.name(), slot = %slot.name, offset = cursor, residual = remaining, "greedy child left unconsumed residual bytes");
                                return Err(DecodeError::GreedyResidual { slot: slot.name.to_string(), offset: cursor, residual: remaining });
                            }
                            items.push(decode_one_child(c, buf, &mut cursor, &slot.name)?);
                        }
                        Value::List(items)
                    }
                };
                fields.insert(slot.name.to_string(), value);
            }
        }
        trace!(schema = schema.name(), slot = %slot.name, cursor, "decoded slot");
    }

    Ok((Record::new(schema.0.name.clone(), fields), cursor - offset))
}

fn decode_one_child(
    c: &crate::schema::CompiledChild,
    buf: &[u8],
    cursor: &mut usize,
    slot_name: &str,
) -> Result<Value, DecodeError> {
    let alt_idx = schema::dispatch(c, buf, *cursor)
        .ok_or_else(|| DecodeError::NoMatchingAlternative { slot: slot_name.to_string(), offset: *cursor })?;
    let alt = &c.spec.alternatives[alt_idx];
    let (inner, n) = decode_from(alt, buf, *cursor)?;
    *cursor += n;
    Ok(Value::Record(Box::new(inner)))
}

fn resolve_decode_format(
    schema: &Schema,
    format: &SlotFormat,
    scratch: &HashMap<usize, Value>,
    slot_name: &str,
) -> Result<Format, DecodeError> {
    match format {
        SlotFormat::Fixed(fmt) => Ok(*fmt),
        SlotFormat::MetaBytes(meta_idx) => {
            let count = scratch
                .get(meta_idx)
                .ok_or_else(|| {
                    let meta_name = schema.0.slots[*meta_idx].name.to_string();
                    error!(schema = schema.name(), slot = slot_name, %meta_name, "metadata slot not yet decoded");
                    DecodeError::SchemaOrderError { slot: slot_name.to_string(), meta_name }
                })?
                .as_usize()
                .unwrap_or(0);
            Ok(Format::Bytes(count))
        }
    }
}

fn fixed_scalar_format(format: &SlotFormat) -> Format {
    match format {
        SlotFormat::Fixed(fmt) => *fmt,
        SlotFormat::MetaBytes(_) => Format::U8,
    }
}
