//! Declarative binary packet serialization: compile a [`Schema`] once,
//! then encode/decode/size [`Record`]s against it.
//!
//! ```
//! use pakt::{FormatSpec, PrimitiveSlotSpec, Record, Schema, SchemaBuilder, Value};
//! use std::collections::HashMap;
//!
//! let schema: Schema = SchemaBuilder::new("Point")
//!     .slot("x", PrimitiveSlotSpec::new(FormatSpec::I32))
//!     .slot("y", PrimitiveSlotSpec::new(FormatSpec::I32))
//!     .build()
//!     .unwrap();
//!
//! let mut fields = HashMap::new();
//! fields.insert("x".to_string(), Value::I32(3));
//! fields.insert("y".to_string(), Value::I32(-7));
//! let record = Record::new("Point", fields);
//!
//! let bytes = pakt::encode(&schema, &record).unwrap();
//! assert_eq!(bytes.len(), pakt::calcsize(&schema, &record).unwrap());
//! let decoded = pakt::decode(&schema, &bytes).unwrap();
//! assert_eq!(decoded.get("x"), record.get("x"));
//! ```

mod decode;
mod encode;
mod error;
mod primitive;
mod schema;
mod size;
mod slot;
mod transform;
mod value;

pub use crate::decode::{decode, decode_from};
pub use crate::encode::{encode, encode_into};
pub use crate::error::{DecodeError, EncodeError, SchemaError, SizeError};
pub use crate::primitive::{ByteOrder, Format, PrimitiveError, ResolvedOrder};
pub use crate::schema::{Schema, SchemaBuilder};
pub use crate::size::calcsize;
pub use crate::slot::{
    ChildCount, ChildSlotSpec, ConstantSlotSpec, FormatSpec, PrimitiveSlotSpec, RepeatCount, SlotSpec, StopSpec,
};
pub use crate::transform::{StopDecodePipeline, StopEncodePipeline, Transform, TransformError};
pub use crate::value::{utf8_from_bytes, utf8_size, utf8_to_bytes, Record, Value};
