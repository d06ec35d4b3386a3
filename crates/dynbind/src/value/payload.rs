// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type-erased value bound to a container.

use crate::element::{Element, ElementIndex};
use crate::native::NativeObject;
use crate::property::{Operation, Property, Target};
use crate::value::{Container, Marshaller, Matrix, ValueType};
use std::ffi::{c_void, CStr, CString};
use std::fmt;
use std::mem;
use std::ptr;
use std::rc::Rc;

/// Release hook for externally owned pointer payloads. Receives the
/// payload pointer when the value is dropped or overwritten.
pub type FreeCallback = Box<dyn FnOnce(*mut c_void)>;

/// Who owns the memory a pointer payload refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// Caller or native memory; never released by the value.
    Borrowed,
    /// Allocated by the value and freed with it.
    Owned,
    /// Released through a [`FreeCallback`].
    External,
}

enum Storage {
    Borrowed,
    Buffer(Vec<u64>),
    /// Keeps the string the payload points into alive.
    Text { _owned: CString },
    External(FreeCallback),
}

/// Payload. Its variant always agrees with the container tag; every
/// pointer-like tag shares `Pointer`.
#[derive(Debug, Clone)]
pub(crate) enum Data {
    Bool(bool),
    Int8(i8),
    Uint8(u8),
    Int32(i32),
    Uint32(u32),
    Int64(i64),
    Uint64(u64),
    Double(f64),
    Matrix(Matrix),
    Pointer(*mut c_void),
    Element(Option<Rc<Element>>),
}

impl Data {
    fn zeroed(value_type: ValueType) -> Self {
        match value_type {
            ValueType::Bool => Self::Bool(false),
            ValueType::Int8 => Self::Int8(0),
            ValueType::Uint8 => Self::Uint8(0),
            ValueType::Int32 => Self::Int32(0),
            ValueType::Uint32 => Self::Uint32(0),
            ValueType::Int64 => Self::Int64(0),
            ValueType::Uint64 => Self::Uint64(0),
            ValueType::Double => Self::Double(0.0),
            ValueType::Matrix => Self::Matrix(Matrix::default()),
            ValueType::Element => Self::Element(None),
            _ => Self::Pointer(ptr::null_mut()),
        }
    }
}

/// A tagged value slot.
///
/// Accessors for the wrong tag are silent no-ops: setters leave the value
/// untouched and getters return zero, null or `None`.
pub struct Value {
    container: Rc<Container>,
    data: Data,
    storage: Storage,
}

impl Value {
    /// Zeroed value for `container`.
    pub fn new(container: Rc<Container>) -> Self {
        let data = Data::zeroed(container.value_type());
        Self {
            container,
            data,
            storage: Storage::Borrowed,
        }
    }

    /// Zeroed value that also owns backing memory for a struct or union,
    /// sized from the container's descriptor. Other tags behave like
    /// [`Value::new`].
    pub fn new_static(container: Rc<Container>) -> Self {
        let mut value = Self::new(container);
        if !matches!(value.value_type(), ValueType::Struct | ValueType::Union) {
            return value;
        }
        let size = value
            .container
            .descriptor()
            .map(|d| d.size())
            .unwrap_or(0);
        if size > 0 {
            let mut buffer = vec![0u64; size.div_ceil(8)];
            value.data = Data::Pointer(buffer.as_mut_ptr().cast());
            value.storage = Storage::Buffer(buffer);
        }
        value
    }

    pub fn container(&self) -> &Rc<Container> {
        &self.container
    }

    pub fn value_type(&self) -> ValueType {
        self.container.value_type()
    }

    pub fn ownership(&self) -> Ownership {
        match self.storage {
            Storage::Borrowed => Ownership::Borrowed,
            Storage::Buffer(_) | Storage::Text { .. } => Ownership::Owned,
            Storage::External(_) => Ownership::External,
        }
    }

    pub(crate) fn data(&self) -> &Data {
        &self.data
    }

    /// Store a payload read back from a native. The variant must match
    /// the tag. A stored pointer is borrowed from the native side.
    pub(crate) fn store(&mut self, data: Data) {
        debug_assert_eq!(
            mem::discriminant(&data),
            mem::discriminant(&Data::zeroed(self.value_type()))
        );
        if let Data::Pointer(ptr) = data {
            self.replace_pointer(ptr, Storage::Borrowed);
            return;
        }
        self.data = data;
    }

    fn release(&mut self) {
        if let Storage::External(free) = mem::replace(&mut self.storage, Storage::Borrowed) {
            free(self.as_ptr());
        }
    }

    fn replace_pointer(&mut self, ptr: *mut c_void, storage: Storage) {
        self.release();
        self.data = Data::Pointer(ptr);
        self.storage = storage;
    }

    fn set_pointer_tagged(&mut self, tag: ValueType, ptr: *mut c_void, free: Option<FreeCallback>) {
        if self.value_type() != tag {
            return;
        }
        let storage = match free {
            Some(free) => Storage::External(free),
            None => Storage::Borrowed,
        };
        self.replace_pointer(ptr, storage);
    }

    fn pointer_tagged(&self, tag: ValueType) -> *mut c_void {
        if self.value_type() == tag {
            self.as_ptr()
        } else {
            ptr::null_mut()
        }
    }

    /// Raw payload pointer for any pointer-like tag, null otherwise.
    pub fn as_ptr(&self) -> *mut c_void {
        match self.data {
            Data::Pointer(p) => p,
            _ => ptr::null_mut(),
        }
    }

    /// Copy `text` into storage owned by the value.
    pub fn set_string(&mut self, text: &str) {
        if self.value_type() != ValueType::String {
            return;
        }
        match CString::new(text) {
            Ok(owned) => {
                let raw = owned.as_ptr().cast_mut().cast();
                self.replace_pointer(raw, Storage::Text { _owned: owned });
            }
            Err(_) => log::warn!("string value contains an interior NUL, ignored"),
        }
    }

    /// Borrow a NUL-terminated string the caller keeps alive.
    ///
    /// # Safety
    ///
    /// `text` must be null or a NUL-terminated string valid for as long as
    /// the value is used.
    pub unsafe fn set_string_ptr(&mut self, text: *const std::ffi::c_char) {
        if self.value_type() == ValueType::String {
            self.replace_pointer(text.cast_mut().cast(), Storage::Borrowed);
        }
    }

    pub fn as_string(&self) -> Option<String> {
        let raw = self.pointer_tagged(ValueType::String);
        if raw.is_null() {
            return None;
        }
        // SAFETY: string payloads are NUL-terminated, either our own
        // CString or a buffer handed out by a native getter.
        let text = unsafe { CStr::from_ptr(raw.cast()) };
        Some(text.to_string_lossy().into_owned())
    }

    /// Set a pointer payload, optionally handing over its release.
    pub fn set_pointer(&mut self, ptr: *mut c_void, free: Option<FreeCallback>) {
        self.set_pointer_tagged(ValueType::Pointer, ptr, free);
    }

    pub fn as_pointer(&self) -> *mut c_void {
        self.pointer_tagged(ValueType::Pointer)
    }

    /// Point the value at caller-owned struct memory.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or point to memory laid out as the container's
    /// descriptor describes, valid for as long as the value is used.
    pub unsafe fn set_struct(&mut self, ptr: *mut c_void) {
        self.set_pointer_tagged(ValueType::Struct, ptr, None);
    }

    pub fn as_struct(&self) -> *mut c_void {
        self.pointer_tagged(ValueType::Struct)
    }

    /// Point the value at caller-owned union memory and write its
    /// discriminant into the leading `i32`.
    ///
    /// # Safety
    ///
    /// Same contract as [`Value::set_struct`]; the memory must also be
    /// writable.
    pub unsafe fn set_union(&mut self, ptr: *mut c_void, discriminant: i32) {
        self.set_pointer_tagged(ValueType::Union, ptr, None);
        self.set_union_discriminant(discriminant);
    }

    pub fn as_union(&self) -> *mut c_void {
        self.pointer_tagged(ValueType::Union)
    }

    /// Write the discriminant of the union memory the value refers to.
    /// No-op for other tags or without memory.
    pub fn set_union_discriminant(&mut self, discriminant: i32) {
        let raw = self.pointer_tagged(ValueType::Union);
        if raw.is_null() {
            return;
        }
        // SAFETY: union memory always starts with the i32 discriminant.
        unsafe { raw.cast::<i32>().write_unaligned(discriminant) };
    }

    /// Discriminant of the union memory the value refers to, zero for
    /// other tags or without memory.
    pub fn union_discriminant(&self) -> i32 {
        let raw = self.pointer_tagged(ValueType::Union);
        if raw.is_null() {
            return 0;
        }
        // SAFETY: see set_union_discriminant.
        unsafe { raw.cast::<i32>().read_unaligned() }
    }

    pub fn set_list(&mut self, ptr: *mut c_void, free: Option<FreeCallback>) {
        self.set_pointer_tagged(ValueType::List, ptr, free);
    }

    pub fn as_list(&self) -> *mut c_void {
        self.pointer_tagged(ValueType::List)
    }

    pub fn set_object(&mut self, ptr: *mut c_void) {
        self.set_pointer_tagged(ValueType::Object, ptr, None);
    }

    pub fn as_object(&self) -> *mut c_void {
        self.pointer_tagged(ValueType::Object)
    }

    pub fn set_element(&mut self, element: Option<Rc<Element>>) {
        if self.value_type() == ValueType::Element {
            self.data = Data::Element(element);
        }
    }

    pub fn as_element(&self) -> Option<Rc<Element>> {
        match &self.data {
            Data::Element(e) => e.clone(),
            _ => None,
        }
    }

    /// Native object of the referenced element, null when unset.
    pub(crate) fn element_object(&self) -> NativeObject {
        match &self.data {
            Data::Element(Some(e)) => e.object(),
            _ => ptr::null_mut(),
        }
    }

    pub fn set_matrix(&mut self, matrix: Matrix) {
        if self.value_type() == ValueType::Matrix {
            self.data = Data::Matrix(matrix);
        }
    }

    pub fn as_matrix(&self) -> Matrix {
        match self.data {
            Data::Matrix(m) => m,
            _ => Matrix::default(),
        }
    }

    /// Read a field of a struct or union value through its descriptor.
    pub fn struct_get(&self, name: &str) -> Option<Value> {
        let (property, object) = self.field(name)?;
        if !property.supports(Operation::Get) {
            return None;
        }
        let mut out = Value::new_static(property.container().clone());
        property.get(object, &mut out, &ElementIndex::default());
        Some(out)
    }

    /// Write a field of a struct or union value through its descriptor.
    pub fn struct_set(&mut self, name: &str, value: &Value) -> bool {
        let Some((property, object)) = self.field(name) else {
            return false;
        };
        if !property.supports(Operation::Set) {
            return false;
        }
        property.write(Operation::Set, Target::Local(object), value);
        true
    }

    fn field(&self, name: &str) -> Option<(Rc<Property>, NativeObject)> {
        if !matches!(self.value_type(), ValueType::Struct | ValueType::Union) {
            return None;
        }
        let property = self.container.descriptor()?.find_property(name)?;
        let object = self.as_ptr();
        if object.is_null() {
            return None;
        }
        Some((property, object))
    }

    /// Serialize through a marshalling hook.
    pub fn marshal(&self, marshaller: &dyn Marshaller) -> Option<Vec<u8>> {
        marshaller.marshal(self)
    }
}

macro_rules! scalar_accessors {
    ($($tag:ident, $ty:ty, $get:ident, $set:ident;)*) => {
        impl Value {
            $(
                #[doc = concat!("Set the `", stringify!($ty), "` payload.")]
                pub fn $set(&mut self, v: $ty) {
                    if self.value_type() == ValueType::$tag {
                        self.data = Data::$tag(v);
                    }
                }

                #[doc = concat!("The `", stringify!($ty), "` payload, or zero for another tag.")]
                pub fn $get(&self) -> $ty {
                    match self.data {
                        Data::$tag(v) => v,
                        _ => <$ty>::default(),
                    }
                }
            )*
        }

        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    let mut value = Value::new(Container::new(ValueType::$tag));
                    value.data = Data::$tag(v);
                    value
                }
            }
        )*
    };
}

scalar_accessors! {
    Bool, bool, as_bool, set_bool;
    Int8, i8, as_int8, set_int8;
    Uint8, u8, as_uint8, set_uint8;
    Int32, i32, as_int32, set_int32;
    Uint32, u32, as_uint32, set_uint32;
    Int64, i64, as_int64, set_int64;
    Uint64, u64, as_uint64, set_uint64;
    Double, f64, as_double, set_double;
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        let mut value = Value::new(Container::new(ValueType::String));
        value.set_string(text);
        value
    }
}

impl From<Matrix> for Value {
    fn from(m: Matrix) -> Self {
        let mut value = Value::new(Container::new(ValueType::Matrix));
        value.data = Data::Matrix(m);
        value
    }
}

impl From<Rc<Element>> for Value {
    fn from(element: Rc<Element>) -> Self {
        let container = Container::constrained(ValueType::Element, element.descriptor().clone());
        let mut value = Value::new(container);
        value.data = Data::Element(Some(element));
        value
    }
}

impl Drop for Value {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value")
            .field("type", &self.value_type())
            .field("data", &self.data)
            .field("ownership", &self.ownership())
            .finish()
    }
}
