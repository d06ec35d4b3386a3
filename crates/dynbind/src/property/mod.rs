// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Properties and their native bindings
//!
//! A [`Property`] names a slot on a descriptor and moves [`Value`]s in and
//! out of native memory through a [`PropertyBinding`]. Two bindings exist:
//!
//! - [`ObjectAccessorBinding`]: getter/setter entry points on a live object
//! - [`RawOffsetBinding`]: a fixed byte offset inside a struct or union
//!
//! Both dispatch on the container tag. Tags a binding cannot carry are
//! no-ops, never a crash.

use crate::element::ElementIndex;
use crate::native::NativeObject;
use crate::value::{Container, Value, ValueType};
use std::fmt;
use std::rc::Rc;

/// Call a native symbol with an explicit C signature.
macro_rules! invoke {
    ($symbol:expr, ($($arg:expr => $ty:ty),*) $(-> $ret:ty)?) => {{
        // SAFETY: the signature comes from the container tag, which the
        // native was bound against.
        let f: unsafe extern "C" fn($($ty),*) $(-> $ret)? = unsafe { $symbol.cast() };
        unsafe { f($($arg),*) }
    }};
}

mod accessor;
mod offset;

pub use accessor::ObjectAccessorBinding;
pub use offset::RawOffsetBinding;

/// Property operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Get,
    Set,
    Add,
    Remove,
    Clear,
    IsSet,
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Self::Get,
        Self::Set,
        Self::Add,
        Self::Remove,
        Self::Clear,
        Self::IsSet,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Set => "set",
            Self::Add => "add",
            Self::Remove => "remove",
            Self::Clear => "clear",
            Self::IsSet => "is_set",
        }
    }

    /// Operations that only make sense on list properties.
    pub fn is_list_only(self) -> bool {
        matches!(self, Self::Add | Self::Remove | Self::Clear)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors raised by element property operations.
#[derive(Debug, thiserror::Error)]
pub enum PropertyError {
    #[error("'{descriptor}' has no property '{name}'")]
    Unknown { descriptor: String, name: String },

    #[error("property '{name}' does not support {op}")]
    Unsupported { name: String, op: Operation },

    #[error("property '{name}' expects {expected}, got {got}")]
    TypeMismatch {
        name: String,
        expected: ValueType,
        got: ValueType,
    },

    #[error("relative property '{0}' cannot be read")]
    RelativeGet(String),

    #[error("relative property '{0}' needs a parent element")]
    NoParent(String),
}

/// Where a write lands.
#[derive(Debug, Clone, Copy)]
pub enum Target {
    /// The object owning the property.
    Local(NativeObject),
    /// Relative write: stored on `parent` on behalf of `child`.
    Relative {
        parent: NativeObject,
        child: NativeObject,
    },
}

/// Moves payloads between values and native storage.
pub trait PropertyBinding: fmt::Debug {
    fn supports(&self, op: Operation) -> bool;

    /// Whether writes may be redirected to a parent object.
    fn supports_relative(&self) -> bool {
        false
    }

    /// Read into `value`. Element references are resolved via `elements`.
    fn get(&self, object: NativeObject, value: &mut Value, elements: &ElementIndex);

    /// Apply a set, add or remove.
    fn write(&self, op: Operation, target: Target, value: &Value);

    fn clear(&self, object: NativeObject);

    fn is_set(&self, object: NativeObject) -> bool;
}

/// A named, typed slot on a descriptor.
pub struct Property {
    name: String,
    owner: String,
    container: Rc<Container>,
    relative: bool,
    binding: Box<dyn PropertyBinding>,
}

impl Property {
    pub(crate) fn new(
        name: &str,
        owner: &str,
        container: Rc<Container>,
        binding: Box<dyn PropertyBinding>,
        relative: bool,
    ) -> Self {
        Self {
            name: name.to_string(),
            owner: owner.to_string(),
            container,
            relative,
            binding,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the declaring descriptor.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn container(&self) -> &Rc<Container> {
        &self.container
    }

    pub fn value_type(&self) -> ValueType {
        self.container.value_type()
    }

    pub fn is_relative(&self) -> bool {
        self.relative
    }

    /// Whether the binding provides `op`. List-only operations are never
    /// available on non-list properties.
    pub fn supports(&self, op: Operation) -> bool {
        if op.is_list_only() && !self.container.is_list() {
            return false;
        }
        self.binding.supports(op)
    }

    pub(crate) fn get(&self, object: NativeObject, value: &mut Value, elements: &ElementIndex) {
        self.binding.get(object, value, elements);
    }

    pub(crate) fn write(&self, op: Operation, target: Target, value: &Value) {
        self.binding.write(op, target, value);
    }

    pub(crate) fn clear(&self, object: NativeObject) {
        self.binding.clear(object);
    }

    pub(crate) fn is_set(&self, object: NativeObject) -> bool {
        self.binding.is_set(object)
    }
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.name)
            .field("owner", &self.owner)
            .field("container", &self.container)
            .field("relative", &self.relative)
            .field("binding", &self.binding)
            .finish()
    }
}
