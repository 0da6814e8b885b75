use std::{error, fmt};

use crate::primitive::PrimitiveError;

/// Errors raised while compiling a [`crate::SchemaBuilder`] into a
/// [`crate::Schema`].
#[derive(Debug, Clone)]
pub enum SchemaError {
    DuplicateSlotName(String),
    UnknownMetadataReference { slot: String, meta_name: String },
    NonMetadataReferenced { slot: String, meta_name: String },
    MetadataReferencedTwice(String),
    UnreferencedMetadataSlot(String),
    EmptyAlternatives(String),
    UntaggedAlternatives { slot: String, alternative: String },
    AmbiguousSubtypeDispatch { slot: String, alternatives: (String, String) },
    UnsupportedFormat { slot: String, format: char },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateSlotName(name) => write!(f, "duplicate slot name `{name}`"),
            Self::UnknownMetadataReference { slot, meta_name } => write!(
                f,
                "slot `{slot}` references unknown metadata slot `{meta_name}`"
            ),
            Self::NonMetadataReferenced { slot, meta_name } => write!(
                f,
                "slot `{slot}` references `{meta_name}`, which is not a metadata slot"
            ),
            Self::MetadataReferencedTwice(name) => {
                write!(f, "metadata slot `{name}` is referenced by more than one slot")
            }
            Self::UnreferencedMetadataSlot(name) => {
                write!(f, "metadata slot `{name}` is never referenced by a `{{name}}` placeholder or child count/size")
            }
            Self::EmptyAlternatives(slot) => {
                write!(f, "child slot `{slot}` declares no alternative schemas")
            }
            Self::UntaggedAlternatives { slot, alternative } => write!(
                f,
                "child slot `{slot}`'s alternative `{alternative}` has no leading constant, \
                 but the slot has more than one alternative"
            ),
            Self::AmbiguousSubtypeDispatch {
                slot,
                alternatives: (a, b),
            } => write!(
                f,
                "child slot `{slot}`'s alternatives `{a}` and `{b}` share an indistinguishable \
                 leading constant prefix"
            ),
            Self::UnsupportedFormat { slot, format } => {
                write!(f, "slot `{slot}` uses unsupported format code `{format}`")
            }
        }
    }
}

impl error::Error for SchemaError {}

/// Errors raised while encoding a [`crate::Record`] against a [`crate::Schema`].
#[derive(Debug, Clone)]
pub enum EncodeError {
    UnknownField { slot: String, offset: usize },
    TransformFailed { slot: String, offset: usize, reason: String },
    Primitive { slot: String, offset: usize, source: PrimitiveError },
    ChildTypeNotInAlternatives { slot: String, offset: usize, type_name: String },
}

impl EncodeError {
    #[must_use]
    pub fn offset(&self) -> usize {
        match self {
            Self::UnknownField { offset, .. }
            | Self::TransformFailed { offset, .. }
            | Self::Primitive { offset, .. }
            | Self::ChildTypeNotInAlternatives { offset, .. } => *offset,
        }
    }

    #[must_use]
    pub fn slot(&self) -> &str {
        match self {
            Self::UnknownField { slot, .. }
            | Self::TransformFailed { slot, .. }
            | Self::Primitive { slot, .. }
            | Self::ChildTypeNotInAlternatives { slot, .. } => slot,
        }
    }
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownField { slot, offset } => {
                write!(f, "at offset {offset}: record has no field named `{slot}`")
            }
            Self::TransformFailed { slot, offset, reason } => write!(
                f,
                "at offset {offset}: encode transform for `{slot}` failed: {reason}"
            ),
            Self::Primitive { slot, offset, source } => {
                write!(f, "at offset {offset}: slot `{slot}`: {source}")
            }
            Self::ChildTypeNotInAlternatives { slot, offset, type_name } => write!(
                f,
                "at offset {offset}: child slot `{slot}` got a record of type `{type_name}`, \
                 which is not one of its declared alternatives"
            ),
        }
    }
}

impl error::Error for EncodeError {}

impl EncodeError {
    pub(crate) fn primitive(slot: &str, offset: usize, source: PrimitiveError) -> Self {
        Self::Primitive { slot: slot.to_string(), offset, source }
    }
}

/// Errors raised while decoding a byte buffer against a [`crate::Schema`].
#[derive(Debug, Clone)]
pub enum DecodeError {
    Primitive { slot: String, offset: usize, source: PrimitiveError },
    ConstantMismatch { slot: String, offset: usize, expected: i64, actual: i64 },
    NoMatchingAlternative { slot: String, offset: usize },
    ChildSizeOverrun { slot: String, offset: usize, budget: usize, consumed: usize },
    GreedyResidual { slot: String, offset: usize, residual: usize },
    SchemaOrderError { slot: String, meta_name: String },
    TransformFailed { slot: String, offset: usize, reason: String },
}

impl DecodeError {
    #[must_use]
    pub fn slot(&self) -> &str {
        match self {
            Self::Primitive { slot, .. }
            | Self::ConstantMismatch { slot, .. }
            | Self::NoMatchingAlternative { slot, .. }
            | Self::ChildSizeOverrun { slot, .. }
            | Self::GreedyResidual { slot, .. }
            | Self::SchemaOrderError { slot, .. }
            | Self::TransformFailed { slot, .. } => slot,
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive { slot, offset, source } => {
                write!(f, "at offset {offset}: slot `{slot}`: {source}")
            }
            Self::ConstantMismatch { slot, offset, expected, actual } => write!(
                f,
                "at offset {offset}: constant slot `{slot}` expected {expected}, got {actual}"
            ),
            Self::NoMatchingAlternative { slot, offset } => write!(
                f,
                "at offset {offset}: no alternative of child slot `{slot}` matched the buffer"
            ),
            Self::ChildSizeOverrun { slot, offset, budget, consumed } => write!(
                f,
                "at offset {offset}: child slot `{slot}` overran its {budget}-byte budget by \
                 reading {consumed} bytes"
            ),
            Self::GreedyResidual { slot, offset, residual } => write!(
                f,
                "at offset {offset}: greedy child slot `{slot}` left {residual} unconsumed \
                 residual bytes that matched no alternative"
            ),
            Self::SchemaOrderError { slot, meta_name } => write!(
                f,
                "slot `{slot}` references metadata slot `{meta_name}`, which is declared later \
                 in wire order and has not been read yet"
            ),
            Self::TransformFailed { slot, offset, reason } => write!(
                f,
                "at offset {offset}: decode transform for `{slot}` failed: {reason}"
            ),
        }
    }
}

impl error::Error for DecodeError {}

impl From<(&str, usize, PrimitiveError)> for DecodeError {
    fn from((slot, offset, source): (&str, usize, PrimitiveError)) -> Self {
        Self::Primitive { slot: slot.to_string(), offset, source }
    }
}

/// Errors raised while computing a record's serialized size.
#[derive(Debug, Clone)]
pub enum SizeError {
    UnknownField { slot: String },
    Primitive { slot: String, source: PrimitiveError },
    ChildTypeNotInAlternatives { slot: String, type_name: String },
    TransformFailed { slot: String, reason: String },
    UnreferencedMetadataSlot { slot: String },
}

impl fmt::Display for SizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownField { slot } => write!(f, "record has no field named `{slot}`"),
            Self::Primitive { slot, source } => write!(f, "slot `{slot}`: {source}"),
            Self::ChildTypeNotInAlternatives { slot, type_name } => write!(
                f,
                "child slot `{slot}` got a record of type `{type_name}`, which is not one of \
                 its declared alternatives"
            ),
            Self::TransformFailed { slot, reason } => {
                write!(f, "encode transform for `{slot}` failed while sizing: {reason}")
            }
            Self::UnreferencedMetadataSlot { slot } => {
                write!(f, "metadata slot `{slot}` has no consumer; the schema should have rejected this at compile time")
            }
        }
    }
}

impl error::Error for SizeError {}

// `calcsize` shares its metadata derivation with the Encoder; the offset a
// `SizeError` is promoted at is always 0 because the derivation walks the
// referent's own value, not the parent cursor.
impl From<SizeError> for EncodeError {
    fn from(err: SizeError) -> Self {
        match err {
            SizeError::UnknownField { slot } => Self::UnknownField { slot, offset: 0 },
            SizeError::Primitive { slot, source } => {
                Self::Primitive { slot, offset: 0, source }
            }
            SizeError::ChildTypeNotInAlternatives { slot, type_name } => {
                Self::ChildTypeNotInAlternatives { slot, offset: 0, type_name }
            }
            SizeError::TransformFailed { slot, reason } => {
                Self::TransformFailed { slot, offset: 0, reason }
            }
            SizeError::UnreferencedMetadataSlot { slot } => Self::UnknownField { slot, offset: 0 },
        }
    }
}
