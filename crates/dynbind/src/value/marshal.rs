// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Marshalling hook: turn a value into a byte buffer.

use crate::value::{Value, ValueType};
use serde_json::{json, Map, Value as Json};

/// Produces a byte buffer from a value. `None` when the value cannot be
/// represented.
pub trait Marshaller {
    fn marshal(&self, value: &Value) -> Option<Vec<u8>>;
}

/// JSON marshaller.
///
/// Scalars, strings and matrices map directly. Struct and union values
/// carrying a descriptor are walked field by field; opaque pointers,
/// lists and element references are not representable.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonMarshaller {
    pub pretty: bool,
}

impl JsonMarshaller {
    pub fn to_json(&self, value: &Value) -> Option<Json> {
        let json = match value.value_type() {
            ValueType::Bool => json!(value.as_bool()),
            ValueType::Int8 => json!(value.as_int8()),
            ValueType::Uint8 => json!(value.as_uint8()),
            ValueType::Int32 => json!(value.as_int32()),
            ValueType::Uint32 => json!(value.as_uint32()),
            ValueType::Int64 => json!(value.as_int64()),
            ValueType::Uint64 => json!(value.as_uint64()),
            ValueType::Double => json!(value.as_double()),
            ValueType::String => value.as_string().map_or(Json::Null, Json::String),
            ValueType::Matrix => json!(value.as_matrix().to_array()),
            ValueType::Struct | ValueType::Union => self.aggregate(value)?,
            ValueType::Pointer | ValueType::List | ValueType::Element | ValueType::Object => {
                return None
            }
        };
        Some(json)
    }

    fn aggregate(&self, value: &Value) -> Option<Json> {
        let descriptor = value.container().descriptor()?;
        if value.as_ptr().is_null() {
            return Some(Json::Null);
        }
        let mut fields = Map::new();
        for name in descriptor.property_names() {
            let field = value.struct_get(&name)?;
            fields.insert(name, self.to_json(&field).unwrap_or(Json::Null));
        }
        Some(Json::Object(fields))
    }
}

impl Marshaller for JsonMarshaller {
    fn marshal(&self, value: &Value) -> Option<Vec<u8>> {
        let json = self.to_json(value)?;
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(&json)
        } else {
            serde_json::to_vec(&json)
        };
        match bytes {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                log::warn!("failed to marshal {} value: {}", value.value_type(), e);
                None
            }
        }
    }
}
