// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Accessor binding: payloads move through native getter/setter calls.
//!
//! Native signatures, by container tag:
//!
//! | tag                               | get                      | set / add / remove  |
//! |-----------------------------------|--------------------------|---------------------|
//! | scalars                           | `fn(obj, *mut T)`        | `fn(obj, T)`        |
//! | matrix                            | `fn(obj, *mut Matrix)`   | `fn(obj, *const Matrix)` |
//! | string, pointer, list, object     | `fn(obj, *mut *mut void)`| `fn(obj, *mut void)`|
//! | struct, union                     | `fn(obj, *mut void)` copies into the value | `fn(obj, *mut void)` |
//! | element                           | `fn(obj, *mut *mut void)`| `fn(obj, *mut void)` with the element's object |
//!
//! Relative writes take the parent object and the child object as the
//! two leading arguments. `clear` is `fn(obj)`, `is_set` is
//! `fn(obj) -> bool`.

use super::{Operation, PropertyBinding, Target};
use crate::element::ElementIndex;
use crate::native::{NativeObject, NativeSymbol};
use crate::value::{Data, Matrix, Value, ValueType};
use std::ffi::c_void;
use std::ptr;

/// Entry points of a property on a live native object. Any of them may be
/// missing; missing operations are no-ops.
#[derive(Debug, Default, Clone)]
pub struct ObjectAccessorBinding {
    pub get: Option<NativeSymbol>,
    pub set: Option<NativeSymbol>,
    pub add: Option<NativeSymbol>,
    pub remove: Option<NativeSymbol>,
    pub clear: Option<NativeSymbol>,
    pub is_set: Option<NativeSymbol>,
}

impl ObjectAccessorBinding {
    /// True when no entry point was bound at all.
    pub fn is_empty(&self) -> bool {
        self.get.is_none()
            && self.set.is_none()
            && self.add.is_none()
            && self.remove.is_none()
            && self.clear.is_none()
            && self.is_set.is_none()
    }

    fn symbol(&self, op: Operation) -> Option<NativeSymbol> {
        match op {
            Operation::Get => self.get,
            Operation::Set => self.set,
            Operation::Add => self.add,
            Operation::Remove => self.remove,
            Operation::Clear => self.clear,
            Operation::IsSet => self.is_set,
        }
    }
}

macro_rules! read_scalar {
    ($symbol:expr, $object:expr, $variant:ident, $ty:ty) => {{
        let mut out = <$ty>::default();
        invoke!($symbol, ($object => NativeObject, &mut out as *mut $ty => *mut $ty));
        Data::$variant(out)
    }};
}

macro_rules! write_payload {
    ($symbol:expr, $value:expr, $($lead:expr),+) => {
        match $value.data() {
            Data::Bool(v) => invoke!($symbol, ($($lead => NativeObject,)+ *v => bool)),
            Data::Int8(v) => invoke!($symbol, ($($lead => NativeObject,)+ *v => i8)),
            Data::Uint8(v) => invoke!($symbol, ($($lead => NativeObject,)+ *v => u8)),
            Data::Int32(v) => invoke!($symbol, ($($lead => NativeObject,)+ *v => i32)),
            Data::Uint32(v) => invoke!($symbol, ($($lead => NativeObject,)+ *v => u32)),
            Data::Int64(v) => invoke!($symbol, ($($lead => NativeObject,)+ *v => i64)),
            Data::Uint64(v) => invoke!($symbol, ($($lead => NativeObject,)+ *v => u64)),
            Data::Double(v) => invoke!($symbol, ($($lead => NativeObject,)+ *v => f64)),
            Data::Matrix(m) => {
                invoke!($symbol, ($($lead => NativeObject,)+ m as *const Matrix => *const Matrix))
            }
            Data::Pointer(p) => invoke!($symbol, ($($lead => NativeObject,)+ *p => *mut c_void)),
            Data::Element(_) => {
                invoke!($symbol, ($($lead => NativeObject,)+ $value.element_object() => *mut c_void))
            }
        }
    };
}

impl PropertyBinding for ObjectAccessorBinding {
    fn supports(&self, op: Operation) -> bool {
        self.symbol(op).is_some()
    }

    fn supports_relative(&self) -> bool {
        true
    }

    fn get(&self, object: NativeObject, value: &mut Value, elements: &ElementIndex) {
        let Some(symbol) = self.get else {
            return;
        };
        let data = match value.value_type() {
            ValueType::Bool => read_scalar!(symbol, object, Bool, bool),
            ValueType::Int8 => read_scalar!(symbol, object, Int8, i8),
            ValueType::Uint8 => read_scalar!(symbol, object, Uint8, u8),
            ValueType::Int32 => read_scalar!(symbol, object, Int32, i32),
            ValueType::Uint32 => read_scalar!(symbol, object, Uint32, u32),
            ValueType::Int64 => read_scalar!(symbol, object, Int64, i64),
            ValueType::Uint64 => read_scalar!(symbol, object, Uint64, u64),
            ValueType::Double => read_scalar!(symbol, object, Double, f64),
            ValueType::Matrix => read_scalar!(symbol, object, Matrix, Matrix),
            ValueType::String | ValueType::Pointer | ValueType::List | ValueType::Object => {
                let mut out: *mut c_void = ptr::null_mut();
                invoke!(symbol, (object => NativeObject, &mut out as *mut *mut c_void => *mut *mut c_void));
                Data::Pointer(out)
            }
            ValueType::Struct | ValueType::Union => {
                // The native copies into the value's own storage.
                let storage = value.as_ptr();
                if storage.is_null() {
                    log::warn!(
                        "no storage to receive {} value, descriptor size unknown",
                        value.value_type()
                    );
                    return;
                }
                invoke!(symbol, (object => NativeObject, storage => *mut c_void));
                return;
            }
            ValueType::Element => {
                let mut out: *mut c_void = ptr::null_mut();
                invoke!(symbol, (object => NativeObject, &mut out as *mut *mut c_void => *mut *mut c_void));
                Data::Element(elements.lookup(out))
            }
        };
        value.store(data);
    }

    fn write(&self, op: Operation, target: Target, value: &Value) {
        let symbol = match op {
            Operation::Set | Operation::Add | Operation::Remove => self.symbol(op),
            _ => None,
        };
        let Some(symbol) = symbol else {
            return;
        };
        match target {
            Target::Local(object) => write_payload!(symbol, value, object),
            Target::Relative { parent, child } => write_payload!(symbol, value, parent, child),
        }
    }

    fn clear(&self, object: NativeObject) {
        if let Some(symbol) = self.clear {
            invoke!(symbol, (object => NativeObject));
        }
    }

    fn is_set(&self, object: NativeObject) -> bool {
        match self.is_set {
            Some(symbol) => invoke!(symbol, (object => NativeObject) -> bool),
            None => false,
        }
    }
}
