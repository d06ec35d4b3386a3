// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Raw-offset binding: payloads are read and written at a fixed byte
//! offset from the object pointer. Aggregate and reference fields hold a
//! pointer.
//!
//! A field may carry native accessors on top of its slot. Each operation
//! then goes through the accessor when one is bound and falls back to the
//! raw slot otherwise.

use super::{ObjectAccessorBinding, Operation, PropertyBinding, Target};
use crate::element::ElementIndex;
use crate::native::NativeObject;
use crate::value::{Data, Matrix, Value, ValueType};
use std::ffi::c_void;

#[derive(Debug, Clone, Default)]
pub struct RawOffsetBinding {
    offset: usize,
    accessors: ObjectAccessorBinding,
}

impl RawOffsetBinding {
    pub fn new(offset: usize) -> Self {
        Self {
            offset,
            accessors: ObjectAccessorBinding::default(),
        }
    }

    /// Route operations with a bound entry point through `accessors`.
    pub fn with_accessors(mut self, accessors: ObjectAccessorBinding) -> Self {
        self.accessors = accessors;
        self
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn accessors(&self) -> &ObjectAccessorBinding {
        &self.accessors
    }

    fn slot(&self, object: NativeObject) -> *mut u8 {
        object.cast::<u8>().wrapping_add(self.offset)
    }
}

macro_rules! read_at {
    ($slot:expr, $ty:ty) => {
        // SAFETY: the slot lies inside the aggregate this field was laid out in.
        unsafe { $slot.cast::<$ty>().read_unaligned() }
    };
}

macro_rules! write_at {
    ($slot:expr, $ty:ty, $v:expr) => {
        // SAFETY: see read_at.
        unsafe { $slot.cast::<$ty>().write_unaligned($v) }
    };
}

impl PropertyBinding for RawOffsetBinding {
    fn supports(&self, op: Operation) -> bool {
        matches!(op, Operation::Get | Operation::Set) || self.accessors.supports(op)
    }

    fn get(&self, object: NativeObject, value: &mut Value, elements: &ElementIndex) {
        if object.is_null() {
            return;
        }
        if self.accessors.supports(Operation::Get) {
            self.accessors.get(object, value, elements);
            return;
        }
        let slot = self.slot(object);
        let data = match value.value_type() {
            ValueType::Bool => Data::Bool(read_at!(slot, u8) != 0),
            ValueType::Int8 => Data::Int8(read_at!(slot, i8)),
            ValueType::Uint8 => Data::Uint8(read_at!(slot, u8)),
            ValueType::Int32 => Data::Int32(read_at!(slot, i32)),
            ValueType::Uint32 => Data::Uint32(read_at!(slot, u32)),
            ValueType::Int64 => Data::Int64(read_at!(slot, i64)),
            ValueType::Uint64 => Data::Uint64(read_at!(slot, u64)),
            ValueType::Double => Data::Double(read_at!(slot, f64)),
            ValueType::Matrix => Data::Matrix(read_at!(slot, Matrix)),
            ValueType::Element => Data::Element(elements.lookup(read_at!(slot, *mut c_void))),
            _ => Data::Pointer(read_at!(slot, *mut c_void)),
        };
        value.store(data);
    }

    fn write(&self, op: Operation, target: Target, value: &Value) {
        let object = match target {
            Target::Local(object) => object,
            Target::Relative { .. } => {
                log::warn!("struct fields cannot be written relative to a parent");
                return;
            }
        };
        if object.is_null() {
            return;
        }
        if self.accessors.supports(op) {
            self.accessors.write(op, target, value);
            return;
        }
        if op != Operation::Set {
            return;
        }
        let slot = self.slot(object);
        match value.data() {
            Data::Bool(v) => write_at!(slot, u8, u8::from(*v)),
            Data::Int8(v) => write_at!(slot, i8, *v),
            Data::Uint8(v) => write_at!(slot, u8, *v),
            Data::Int32(v) => write_at!(slot, i32, *v),
            Data::Uint32(v) => write_at!(slot, u32, *v),
            Data::Int64(v) => write_at!(slot, i64, *v),
            Data::Uint64(v) => write_at!(slot, u64, *v),
            Data::Double(v) => write_at!(slot, f64, *v),
            Data::Matrix(m) => write_at!(slot, Matrix, *m),
            Data::Pointer(p) => write_at!(slot, *mut c_void, *p),
            Data::Element(_) => write_at!(slot, *mut c_void, value.element_object()),
        }
    }

    fn clear(&self, object: NativeObject) {
        self.accessors.clear(object);
    }

    fn is_set(&self, object: NativeObject) -> bool {
        self.accessors.is_set(object)
    }
}
