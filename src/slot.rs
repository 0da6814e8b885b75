//! User-facing slot descriptors: the uncompiled shape of a schema
//! declaration, before [`crate::SchemaBuilder::build`] resolves metadata
//! links and prefix dispatch.

use crate::primitive::ByteOrder;
use crate::schema::Schema;
use crate::transform::{StopDecodePipeline, StopEncodePipeline, Transform};
use crate::value::Value;

/// A primitive slot's format: a scalar type, or a byte array whose length is
/// either a literal or resolved from a metadata slot at encode/decode time.
#[derive(Debug, Clone)]
pub enum FormatSpec {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F32,
    F64,
    Bytes(RepeatCount),
}

impl FormatSpec {
    #[must_use]
    pub fn code(&self) -> char {
        match self {
            Self::U8 => 'B',
            Self::I8 => 'b',
            Self::U16 => 'H',
            Self::I16 => 'h',
            Self::U32 => 'L',
            Self::I32 => 'l',
            Self::U64 => 'Q',
            Self::I64 => 'q',
            Self::F32 => 'f',
            Self::F64 => 'd',
            Self::Bytes(_) => 's',
        }
    }
}

/// A primitive slot's repeat count, either fixed at declaration time or
/// resolved from a named metadata slot.
#[derive(Debug, Clone)]
pub enum RepeatCount {
    Literal(usize),
    Meta(String),
}

/// A stop-sentinel spec: the terminating byte plus the two-stage
/// encode/decode pipelines that bridge the aggregate attribute value and
/// the per-element wire sequence.
#[derive(Clone)]
pub struct StopSpec {
    pub sentinel: u8,
    pub encode: StopEncodePipeline,
    pub decode: StopDecodePipeline,
}

impl std::fmt::Debug for StopSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StopSpec").field("sentinel", &self.sentinel).finish()
    }
}

/// A scalar, possibly variable-length, possibly stop-terminated slot.
#[derive(Debug, Clone)]
pub struct PrimitiveSlotSpec {
    pub format: FormatSpec,
    pub order: ByteOrder,
    pub transform: Option<Transform>,
    pub meta: bool,
    pub stop: Option<StopSpec>,
}

impl PrimitiveSlotSpec {
    #[must_use]
    pub fn new(format: FormatSpec) -> Self {
        Self { format, order: ByteOrder::Big, transform: None, meta: false, stop: None }
    }

    #[must_use]
    pub fn order(mut self, order: ByteOrder) -> Self {
        self.order = order;
        self
    }

    #[must_use]
    pub fn transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    #[must_use]
    pub fn meta(mut self) -> Self {
        self.meta = true;
        self
    }

    #[must_use]
    pub fn stop(mut self, stop: StopSpec) -> Self {
        self.stop = Some(stop);
        self
    }
}

/// A fixed scalar written verbatim on encode and validated on decode.
#[derive(Debug, Clone)]
pub struct ConstantSlotSpec {
    pub value: Value,
    pub format: FormatSpec,
    pub order: ByteOrder,
}

impl ConstantSlotSpec {
    #[must_use]
    pub fn new(value: Value, format: FormatSpec) -> Self {
        Self { value, format, order: ByteOrder::Big }
    }

    #[must_use]
    pub fn order(mut self, order: ByteOrder) -> Self {
        self.order = order;
        self
    }
}

/// How many child records a [`ChildSlotSpec`] expects.
#[derive(Debug, Clone)]
pub enum ChildCount {
    /// A scalar field: exactly one child record, not a list.
    ExactlyOne,
    /// A literal fixed count of child records.
    Fixed(usize),
    /// The element count is read from a named metadata slot.
    CountOf(String),
    /// The total byte budget is read from a named metadata slot.
    SizeOf(String),
    /// Consume child records until the buffer/budget is exhausted.
    Greedy,
}

/// A nested field of one or more alternative sub-schemas.
#[derive(Clone)]
pub struct ChildSlotSpec {
    pub alternatives: Vec<Schema>,
    pub count: ChildCount,
}

impl std::fmt::Debug for ChildSlotSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChildSlotSpec")
            .field("alternatives", &self.alternatives.iter().map(Schema::name).collect::<Vec<_>>())
            .field("count", &self.count)
            .finish()
    }
}

impl ChildSlotSpec {
    #[must_use]
    pub fn new(alternatives: Vec<Schema>, count: ChildCount) -> Self {
        Self { alternatives, count }
    }
}

/// One uncompiled slot declaration.
#[derive(Debug, Clone)]
pub enum SlotSpec {
    Primitive(PrimitiveSlotSpec),
    Constant(ConstantSlotSpec),
    Child(ChildSlotSpec),
}

impl From<PrimitiveSlotSpec> for SlotSpec {
    fn from(spec: PrimitiveSlotSpec) -> Self {
        Self::Primitive(spec)
    }
}

impl From<ConstantSlotSpec> for SlotSpec {
    fn from(spec: ConstantSlotSpec) -> Self {
        Self::Constant(spec)
    }
}

impl From<ChildSlotSpec> for SlotSpec {
    fn from(spec: ChildSlotSpec) -> Self {
        Self::Child(spec)
    }
}
