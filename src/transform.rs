//! First-class encode/decode transforms: user-provided functions modeled
//! as opaque callables rather than a trait.

use std::fmt;
use std::sync::Arc;

use crate::value::{utf8_from_bytes, utf8_to_bytes, Value};

/// Failure returned by a user-supplied transform closure.
#[derive(Debug, Clone)]
pub struct TransformError(pub String);

impl fmt::Display for TransformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for TransformError {}

type TransformFn = Arc<dyn Fn(&Value) -> Result<Value, TransformError> + Send + Sync>;

/// A pair of encode/decode functions attached to a slot. Either side may be
/// omitted (identity).
#[derive(Clone)]
pub struct Transform {
    encode_fn: Option<TransformFn>,
    decode_fn: Option<TransformFn>,
}

impl Transform {
    #[must_use]
    pub fn new(
        encode_fn: impl Fn(&Value) -> Result<Value, TransformError> + Send + Sync + 'static,
        decode_fn: impl Fn(&Value) -> Result<Value, TransformError> + Send + Sync + 'static,
    ) -> Self {
        Self { encode_fn: Some(Arc::new(encode_fn)), decode_fn: Some(Arc::new(decode_fn)) }
    }

    #[must_use]
    pub fn encode_only(
        encode_fn: impl Fn(&Value) -> Result<Value, TransformError> + Send + Sync + 'static,
    ) -> Self {
        Self { encode_fn: Some(Arc::new(encode_fn)), decode_fn: None }
    }

    #[must_use]
    pub fn decode_only(
        decode_fn: impl Fn(&Value) -> Result<Value, TransformError> + Send + Sync + 'static,
    ) -> Self {
        Self { encode_fn: None, decode_fn: Some(Arc::new(decode_fn)) }
    }

    /// Bridges a `Bytes`-format slot to a `Value::Str` attribute: encodes a
    /// `Str` to its UTF-8 bytes, decodes raw bytes back to a `Str`. The
    /// primitive layer only ever sees `Value::Bytes`; this is what lets a
    /// `name: bytes` slot round-trip as a string on the record.
    #[must_use]
    pub fn utf8() -> Self {
        Self::new(
            |v| match v {
                Value::Str(s) => Ok(Value::Bytes(utf8_to_bytes(s))),
                Value::Bytes(b) => Ok(Value::Bytes(b.clone())),
                other => Err(TransformError(format!("expected str, got {other:?}"))),
            },
            |v| match v {
                Value::Bytes(b) => utf8_from_bytes(b).map(Value::Str).map_err(|e| TransformError(e.to_string())),
                other => Err(TransformError(format!("expected bytes, got {other:?}"))),
            },
        )
    }

    pub(crate) fn encode(&self, value: &Value) -> Result<Value, TransformError> {
        match &self.encode_fn {
            Some(f) => f(value),
            None => Ok(value.clone()),
        }
    }

    pub(crate) fn decode(&self, value: &Value) -> Result<Value, TransformError> {
        match &self.decode_fn {
            Some(f) => f(value),
            None => Ok(value.clone()),
        }
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transform")
            .field("encode_fn", &self.encode_fn.as_ref().map(|_| "<fn>"))
            .field("decode_fn", &self.decode_fn.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// The two-stage encode pipeline for a stop-sentinel slot: the aggregate
/// user value (e.g. a `String`) is first reduced to an intermediate
/// wire-shaped value (e.g. its UTF-8 bytes), then disassembled into the
/// per-element wire values that get written one at a time.
#[derive(Clone)]
pub struct StopEncodePipeline {
    to_intermediate: TransformFn,
    disassemble: TransformFn,
}

impl StopEncodePipeline {
    #[must_use]
    pub fn new(
        to_intermediate: impl Fn(&Value) -> Result<Value, TransformError> + Send + Sync + 'static,
        disassemble: impl Fn(&Value) -> Result<Value, TransformError> + Send + Sync + 'static,
    ) -> Self {
        Self { to_intermediate: Arc::new(to_intermediate), disassemble: Arc::new(disassemble) }
    }

    /// Produce the ordered list of per-element wire values for `value`.
    pub(crate) fn elements(&self, value: &Value) -> Result<Vec<Value>, TransformError> {
        let intermediate = (self.to_intermediate)(value)?;
        let disassembled = (self.disassemble)(&intermediate)?;
        match disassembled {
            Value::List(items) => Ok(items),
            other => Ok(vec![other]),
        }
    }
}

impl fmt::Debug for StopEncodePipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StopEncodePipeline { .. }")
    }
}

/// The two-stage decode pipeline for a stop-sentinel slot: each raw element
/// read off the wire is assembled individually (e.g. `u8` -> one-byte
/// `Bytes`), then the collected sequence is reduced to the final aggregate
/// value (e.g. joined `Bytes` -> UTF-8 `String`).
#[derive(Clone)]
pub struct StopDecodePipeline {
    assemble_element: TransformFn,
    from_intermediate: TransformFn,
}

impl StopDecodePipeline {
    #[must_use]
    pub fn new(
        assemble_element: impl Fn(&Value) -> Result<Value, TransformError> + Send + Sync + 'static,
        from_intermediate: impl Fn(&Value) -> Result<Value, TransformError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            assemble_element: Arc::new(assemble_element),
            from_intermediate: Arc::new(from_intermediate),
        }
    }

    pub(crate) fn assemble_element(&self, raw: &Value) -> Result<Value, TransformError> {
        (self.assemble_element)(raw)
    }

    pub(crate) fn finish(&self, elements: Vec<Value>) -> Result<Value, TransformError> {
        (self.from_intermediate)(&Value::List(elements))
    }
}

impl fmt::Debug for StopDecodePipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StopDecodePipeline { .. }")
    }
}
