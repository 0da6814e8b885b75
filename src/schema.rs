//! The Schema Compiler: turns an ordered list of `(name, SlotSpec)`
//! declarations into an immutable, `Arc`-shared [`Schema`].

use std::collections::HashMap;
use std::sync::Arc;

use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::error::SchemaError;
use crate::primitive::{self, ByteOrder, Format};
use crate::slot::{ChildCount, ChildSlotSpec, ConstantSlotSpec, FormatSpec, PrimitiveSlotSpec, RepeatCount, SlotSpec};

/// How a primitive slot's wire width is determined.
#[derive(Debug, Clone)]
pub(crate) enum SlotFormat {
    Fixed(Format),
    /// Byte-array width resolved at encode/decode time from the metadata
    /// slot at this index.
    MetaBytes(usize),
}

#[derive(Debug, Clone)]
pub(crate) struct CompiledPrimitive {
    pub spec: PrimitiveSlotSpec,
    pub format: SlotFormat,
}

#[derive(Debug, Clone)]
pub(crate) struct CompiledConstant {
    pub spec: ConstantSlotSpec,
    pub format: Format,
}

/// A dispatch prefix: almost always one to a handful of leading constant
/// bytes, so it lives inline rather than heap-allocated.
pub(crate) type Prefix = SmallVec<[u8; 4]>;

#[derive(Clone)]
pub(crate) struct CompiledChild {
    pub spec: ChildSlotSpec,
    /// Parallel to `spec.alternatives`: the leading constant-byte pattern
    /// used to dispatch on decode. Empty when there is only one alternative.
    pub prefixes: Vec<Prefix>,
}

impl std::fmt::Debug for CompiledChild {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledChild").field("spec", &self.spec).finish()
    }
}

#[derive(Debug, Clone)]
pub(crate) enum CompiledKind {
    Primitive(CompiledPrimitive),
    Constant(CompiledConstant),
    Child(CompiledChild),
}

#[derive(Debug, Clone)]
pub(crate) struct CompiledSlot {
    pub name: Arc<str>,
    pub kind: CompiledKind,
}

pub(crate) struct SchemaData {
    pub name: Arc<str>,
    pub slots: Vec<CompiledSlot>,
    pub index_of: HashMap<String, usize>,
    /// metadata slot name -> its slot index
    pub metadata_providers: HashMap<String, usize>,
    /// consumer slot index -> the metadata slot index it reads
    pub metadata_consumers: HashMap<usize, usize>,
    /// metadata slot index -> the consumer slot index that uses it
    pub metadata_uses: HashMap<usize, usize>,
}

/// A compiled, immutable schema. Cheap to clone (reference-counted).
#[derive(Clone)]
pub struct Schema(pub(crate) Arc<SchemaData>);

impl Schema {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.0.slots.len()
    }

    pub(crate) fn slot_index(&self, name: &str) -> Option<usize> {
        self.0.index_of.get(name).copied()
    }
}

impl std::fmt::Debug for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.0.name)
            .field("slots", &self.0.slots.iter().map(|s| &*s.name).collect::<Vec<_>>())
            .finish()
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Builds a [`Schema`] from an ordered list of named slot declarations.
pub struct SchemaBuilder {
    name: String,
    slots: Vec<(String, SlotSpec)>,
}

impl SchemaBuilder {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), slots: Vec::new() }
    }

    #[must_use]
    pub fn slot(mut self, name: impl Into<String>, spec: impl Into<SlotSpec>) -> Self {
        self.slots.push((name.into(), spec.into()));
        self
    }

    /// Validates and compiles the declaration into an immutable [`Schema`].
    pub fn build(self) -> Result<Schema, SchemaError> {
        let name: Arc<str> = Arc::from(self.name.as_str());
        debug!(schema = %name, slots = self.slots.len(), "compiling schema");

        let mut index_of = HashMap::with_capacity(self.slots.len());
        for (i, (slot_name, _)) in self.slots.iter().enumerate() {
            if index_of.insert(slot_name.clone(), i).is_some() {
                return Err(SchemaError::DuplicateSlotName(slot_name.clone()));
            }
        }

        let mut metadata_providers = HashMap::new();
        for (slot_name, spec) in &self.slots {
            if let SlotSpec::Primitive(p) = spec {
                if p.meta {
                    metadata_providers.insert(slot_name.clone(), index_of[slot_name]);
                }
            }
        }

        let mut metadata_consumers = HashMap::new();
        let mut metadata_uses: HashMap<usize, usize> = HashMap::new();

        let mut link_meta = |consumer: &str, consumer_idx: usize, meta_name: &str| -> Result<(), SchemaError> {
            let meta_idx = *index_of
                .get(meta_name)
                .ok_or_else(|| SchemaError::UnknownMetadataReference {
                    slot: consumer.to_string(),
                    meta_name: meta_name.to_string(),
                })?;
            if !metadata_providers.contains_key(meta_name) {
                return Err(SchemaError::NonMetadataReferenced {
                    slot: consumer.to_string(),
                    meta_name: meta_name.to_string(),
                });
            }
            if metadata_uses.insert(meta_idx, consumer_idx).is_some() {
                return Err(SchemaError::MetadataReferencedTwice(meta_name.to_string()));
            }
            metadata_consumers.insert(consumer_idx, meta_idx);
            Ok(())
        };

        for (slot_name, spec) in &self.slots {
            let consumer_idx = index_of[slot_name];
            match spec {
                SlotSpec::Primitive(p) => {
                    if let FormatSpec::Bytes(RepeatCount::Meta(meta_name)) = &p.format {
                        link_meta(slot_name, consumer_idx, meta_name)?;
                    }
                }
                SlotSpec::Child(c) => match &c.count {
                    ChildCount::CountOf(meta_name) | ChildCount::SizeOf(meta_name) => {
                        link_meta(slot_name, consumer_idx, meta_name)?;
                    }
                    ChildCount::ExactlyOne | ChildCount::Fixed(_) | ChildCount::Greedy => {}
                },
                SlotSpec::Constant(_) => {}
            }
        }

        for (meta_name, meta_idx) in &metadata_providers {
            if !metadata_uses.contains_key(meta_idx) {
                return Err(SchemaError::UnreferencedMetadataSlot(meta_name.clone()));
            }
        }

        let mut compiled_slots = Vec::with_capacity(self.slots.len());
        for (slot_name, spec) in self.slots {
            let idx = index_of[&slot_name];
            let kind = match spec {
                SlotSpec::Primitive(p) => {
                    let format = match &p.format {
                        FormatSpec::Bytes(RepeatCount::Meta(_)) => SlotFormat::MetaBytes(metadata_consumers[&idx]),
                        FormatSpec::Bytes(RepeatCount::Literal(n)) => SlotFormat::Fixed(Format::Bytes(*n)),
                        other => SlotFormat::Fixed(scalar_format(other)),
                    };
                    CompiledKind::Primitive(CompiledPrimitive { spec: p, format })
                }
                SlotSpec::Constant(c) => {
                    let format = match &c.format {
                        FormatSpec::Bytes(RepeatCount::Literal(n)) => Format::Bytes(*n),
                        FormatSpec::Bytes(RepeatCount::Meta(_)) => {
                            return Err(SchemaError::UnsupportedFormat { slot: slot_name, format: 's' });
                        }
                        other => scalar_format(other),
                    };
                    CompiledKind::Constant(CompiledConstant { spec: c, format })
                }
                SlotSpec::Child(c) => {
                    let prefixes = if c.alternatives.is_empty() {
                        return Err(SchemaError::EmptyAlternatives(slot_name));
                    } else if c.alternatives.len() == 1 {
                        vec![Prefix::new()]
                    } else {
                        compute_dispatch_prefixes(&slot_name, &c.alternatives)?
                    };
                    CompiledKind::Child(CompiledChild { spec: c, prefixes })
                }
            };
            compiled_slots.push(CompiledSlot { name: Arc::from(slot_name.as_str()), kind });
        }

        trace!(schema = %name, metadata_links = metadata_consumers.len(), "schema compiled");

        Ok(Schema(Arc::new(SchemaData {
            name,
            slots: compiled_slots,
            index_of,
            metadata_providers,
            metadata_consumers,
            metadata_uses,
        })))
    }
}

fn scalar_format(format: &FormatSpec) -> Format {
    match format {
        FormatSpec::U8 => Format::U8,
        FormatSpec::I8 => Format::I8,
        FormatSpec::U16 => Format::U16,
        FormatSpec::I16 => Format::I16,
        FormatSpec::U32 => Format::U32,
        FormatSpec::I32 => Format::I32,
        FormatSpec::U64 => Format::U64,
        FormatSpec::I64 => Format::I64,
        FormatSpec::F32 => Format::F32,
        FormatSpec::F64 => Format::F64,
        FormatSpec::Bytes(_) => unreachable!("bytes formats are handled by their caller"),
    }
}

/// Computes, for each alternative, the bytes its leading run of
/// `ConstantSlot`s would encode to, and rejects the set if any two
/// alternatives' prefixes can't be told apart.
fn compute_dispatch_prefixes(slot_name: &str, alternatives: &[Schema]) -> Result<Vec<Prefix>, SchemaError> {
    let mut prefixes = Vec::with_capacity(alternatives.len());
    for alt in alternatives {
        let mut bytes = Vec::new();
        for slot in &alt.0.slots {
            let CompiledKind::Constant(c) = &slot.kind else { break };
            primitive::write(&mut bytes, bytes.len(), c.format, c.spec.order, &c.spec.value)
                .map_err(|_| SchemaError::UnsupportedFormat { slot: slot_name.to_string(), format: c.format.code() })?;
        }
        if bytes.is_empty() {
            return Err(SchemaError::UntaggedAlternatives {
                slot: slot_name.to_string(),
                alternative: alt.name().to_string(),
            });
        }
        prefixes.push(Prefix::from_vec(bytes));
    }

    for i in 0..prefixes.len() {
        for j in (i + 1)..prefixes.len() {
            let (a, b) = (&prefixes[i], &prefixes[j]);
            let min_len = a.len().min(b.len());
            if a.as_slice()[..min_len] == b.as_slice()[..min_len] {
                return Err(SchemaError::AmbiguousSubtypeDispatch {
                    slot: slot_name.to_string(),
                    alternatives: (alternatives[i].name().to_string(), alternatives[j].name().to_string()),
                });
            }
        }
    }

    Ok(prefixes)
}

/// Picks the alternative index whose dispatch prefix matches `buf` starting
/// at `offset`, trying alternatives in declared order.
pub(crate) fn dispatch(child: &CompiledChild, buf: &[u8], offset: usize) -> Option<usize> {
    if child.spec.alternatives.len() == 1 {
        return Some(0);
    }
    for (i, prefix) in child.prefixes.iter().enumerate() {
        if buf.get(offset..offset + prefix.len()) == Some(&prefix[..]) {
            return Some(i);
        }
    }
    None
}

/// The smallest number of bytes any instance of `schema` could encode to.
/// Used by a `Greedy` child decode to tell "ran out of buffer" apart from
/// "leftover bytes too short to be another element".
pub(crate) fn min_size(schema: &Schema) -> usize {
    schema.0.slots.iter().map(min_slot_size).sum()
}

fn min_slot_size(slot: &CompiledSlot) -> usize {
    match &slot.kind {
        CompiledKind::Constant(c) => c.format.width(),
        CompiledKind::Primitive(p) if p.spec.stop.is_some() => 1,
        CompiledKind::Primitive(p) => match &p.format {
            SlotFormat::Fixed(fmt) => fmt.width(),
            SlotFormat::MetaBytes(_) => 0,
        },
        CompiledKind::Child(c) => match &c.spec.count {
            ChildCount::ExactlyOne => c.spec.alternatives.iter().map(min_size).min().unwrap_or(0),
            ChildCount::Fixed(n) => n * c.spec.alternatives.iter().map(min_size).min().unwrap_or(0),
            ChildCount::CountOf(_) | ChildCount::SizeOf(_) | ChildCount::Greedy => 0,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slot::{ChildCount, ChildSlotSpec, ConstantSlotSpec, PrimitiveSlotSpec};
    use crate::value::Value;

    #[test]
    fn rejects_duplicate_slot_names() {
        let err = SchemaBuilder::new("Dup")
            .slot("x", PrimitiveSlotSpec::new(FormatSpec::U8))
            .slot("x", PrimitiveSlotSpec::new(FormatSpec::U8))
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateSlotName(n) if n == "x"));
    }

    #[test]
    fn rejects_unknown_metadata_reference() {
        let err = SchemaBuilder::new("Bad")
            .slot("name", PrimitiveSlotSpec::new(FormatSpec::Bytes(RepeatCount::Meta("missing".into()))))
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::UnknownMetadataReference { .. }));
    }

    #[test]
    fn rejects_non_metadata_reference() {
        let err = SchemaBuilder::new("Bad")
            .slot("name_size", PrimitiveSlotSpec::new(FormatSpec::U8))
            .slot("name", PrimitiveSlotSpec::new(FormatSpec::Bytes(RepeatCount::Meta("name_size".into()))))
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::NonMetadataReferenced { .. }));
    }

    #[test]
    fn rejects_unreferenced_metadata_slot() {
        let err = SchemaBuilder::new("Bad")
            .slot("extra_meta", PrimitiveSlotSpec::new(FormatSpec::U8).meta())
            .slot("x", PrimitiveSlotSpec::new(FormatSpec::U8))
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::UnreferencedMetadataSlot(n) if n == "extra_meta"));
    }

    #[test]
    fn accepts_valid_meta_reference() {
        let schema = SchemaBuilder::new("Person")
            .slot("name_size", PrimitiveSlotSpec::new(FormatSpec::U8).meta())
            .slot("name", PrimitiveSlotSpec::new(FormatSpec::Bytes(RepeatCount::Meta("name_size".into()))))
            .build()
            .unwrap();
        assert_eq!(schema.slot_count(), 2);
    }

    fn time_schema(id: u8) -> Schema {
        SchemaBuilder::new(format!("Time{id}"))
            .slot("_id", ConstantSlotSpec::new(Value::U8(id), FormatSpec::U8))
            .slot("unixtime", PrimitiveSlotSpec::new(FormatSpec::U32))
            .build()
            .unwrap()
    }

    #[test]
    fn untagged_alternative_rejected() {
        let untagged = SchemaBuilder::new("Untagged")
            .slot("unixtime", PrimitiveSlotSpec::new(FormatSpec::U32))
            .build()
            .unwrap();
        let err = SchemaBuilder::new("Dummy")
            .slot(
                "objects",
                ChildSlotSpec::new(vec![time_schema(1), untagged], ChildCount::Greedy),
            )
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::UntaggedAlternatives { .. }));
    }

    #[test]
    fn ambiguous_dispatch_rejected() {
        let err = SchemaBuilder::new("Dummy")
            .slot(
                "objects",
                ChildSlotSpec::new(vec![time_schema(1), time_schema(1)], ChildCount::Greedy),
            )
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::AmbiguousSubtypeDispatch { .. }));
    }

    #[test]
    fn distinct_constants_dispatch_cleanly() {
        let schema = SchemaBuilder::new("Dummy")
            .slot(
                "objects",
                ChildSlotSpec::new(vec![time_schema(1), time_schema(2)], ChildCount::Greedy),
            )
            .build()
            .unwrap();
        assert_eq!(schema.slot_count(), 1);
    }
}
