// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Value type tags and the containers that carry them.

use crate::descriptor::Descriptor;
use crate::value::Matrix;
use serde::{Deserialize, Serialize};
use std::ffi::c_void;
use std::fmt;
use std::mem;
use std::rc::Rc;

/// Tag of a value slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Bool,
    Int8,
    Uint8,
    Int32,
    Uint32,
    Int64,
    Uint64,
    Double,
    String,
    Pointer,
    Matrix,
    List,
    Struct,
    Union,
    /// Reference to another live element.
    Element,
    /// Opaque native object that is not tracked as an element.
    Object,
}

impl ValueType {
    /// Tags served by the built-in primitive namespace.
    pub const PRIMITIVES: [ValueType; 11] = [
        Self::Bool,
        Self::Int8,
        Self::Uint8,
        Self::Int32,
        Self::Uint32,
        Self::Int64,
        Self::Uint64,
        Self::Double,
        Self::String,
        Self::Pointer,
        Self::Matrix,
    ];

    /// Lowercase name, as used in description files.
    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int8 => "int8",
            Self::Uint8 => "uint8",
            Self::Int32 => "int32",
            Self::Uint32 => "uint32",
            Self::Int64 => "int64",
            Self::Uint64 => "uint64",
            Self::Double => "double",
            Self::String => "string",
            Self::Pointer => "pointer",
            Self::Matrix => "matrix",
            Self::List => "list",
            Self::Struct => "struct",
            Self::Union => "union",
            Self::Element => "element",
            Self::Object => "object",
        }
    }

    /// Parse a lowercase tag name.
    pub fn from_name(name: &str) -> Option<Self> {
        let found = match name {
            "bool" => Self::Bool,
            "int8" => Self::Int8,
            "uint8" => Self::Uint8,
            "int32" => Self::Int32,
            "uint32" => Self::Uint32,
            "int64" => Self::Int64,
            "uint64" => Self::Uint64,
            "double" => Self::Double,
            "string" => Self::String,
            "pointer" => Self::Pointer,
            "matrix" => Self::Matrix,
            "list" => Self::List,
            "struct" => Self::Struct,
            "union" => Self::Union,
            "element" => Self::Element,
            "object" => Self::Object,
            _ => return None,
        };
        Some(found)
    }

    /// Size of the slot inside a native struct.
    ///
    /// Aggregates and references are stored as pointers.
    pub fn size(self) -> usize {
        match self {
            Self::Bool | Self::Int8 | Self::Uint8 => 1,
            Self::Int32 | Self::Uint32 => 4,
            Self::Int64 | Self::Uint64 | Self::Double => 8,
            Self::Matrix => mem::size_of::<Matrix>(),
            _ => mem::size_of::<*mut c_void>(),
        }
    }

    /// Natural C alignment of the slot.
    pub fn alignment(self) -> usize {
        match self {
            Self::Bool | Self::Int8 | Self::Uint8 => 1,
            Self::Int32 | Self::Uint32 => 4,
            Self::Int64 | Self::Uint64 | Self::Double => 8,
            Self::Matrix => mem::align_of::<Matrix>(),
            _ => mem::align_of::<*mut c_void>(),
        }
    }

    /// True when the payload travels as a raw pointer.
    pub fn is_pointer_like(self) -> bool {
        matches!(
            self,
            Self::String | Self::Pointer | Self::List | Self::Struct | Self::Union | Self::Object
        )
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Describes a value slot: its tag, the element type of a list, and an
/// optional descriptor constraint for struct, union and element slots.
#[derive(Clone)]
pub struct Container {
    value_type: ValueType,
    child: Option<Rc<Container>>,
    descriptor: Option<Rc<Descriptor>>,
}

impl Container {
    /// Plain container of the given tag.
    pub fn new(value_type: ValueType) -> Rc<Self> {
        Rc::new(Self {
            value_type,
            child: None,
            descriptor: None,
        })
    }

    /// List container whose items are described by `child`.
    pub fn list(child: Rc<Container>) -> Rc<Self> {
        Rc::new(Self {
            value_type: ValueType::List,
            child: Some(child),
            descriptor: None,
        })
    }

    /// Container constrained to a descriptor.
    pub fn constrained(value_type: ValueType, descriptor: Rc<Descriptor>) -> Rc<Self> {
        Rc::new(Self {
            value_type,
            child: None,
            descriptor: Some(descriptor),
        })
    }

    /// Container for a reference to `descriptor`, with the tag derived
    /// from the descriptor kind.
    pub fn defined(descriptor: Rc<Descriptor>) -> Rc<Self> {
        let value_type = descriptor.kind().value_type();
        Self::constrained(value_type, descriptor)
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// Item container, for lists only.
    pub fn child(&self) -> Option<&Rc<Container>> {
        self.child.as_ref()
    }

    pub fn descriptor(&self) -> Option<&Rc<Descriptor>> {
        self.descriptor.as_ref()
    }

    pub fn is_list(&self) -> bool {
        self.value_type == ValueType::List
    }

    /// True for a list whose items carry `item`.
    pub fn is_list_of(&self, item: ValueType) -> bool {
        self.is_list() && self.child.as_ref().is_some_and(|c| c.value_type == item)
    }

    /// Tag of the list items, or of the container itself otherwise.
    pub fn item_type(&self) -> ValueType {
        match &self.child {
            Some(child) if self.is_list() => child.value_type,
            _ => self.value_type,
        }
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Container");
        s.field("type", &self.value_type);
        if let Some(child) = &self.child {
            s.field("child", child);
        }
        if let Some(descriptor) = &self.descriptor {
            s.field("descriptor", &descriptor.name());
        }
        s.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for tag in ValueType::PRIMITIVES {
            assert_eq!(ValueType::from_name(tag.name()), Some(tag));
        }
        assert_eq!(ValueType::from_name("element"), Some(ValueType::Element));
        assert_eq!(ValueType::from_name("float"), None);
    }

    #[test]
    fn list_item_type() {
        let list = Container::list(Container::new(ValueType::Int32));
        assert!(list.is_list());
        assert_eq!(list.item_type(), ValueType::Int32);
        assert!(list.is_list_of(ValueType::Int32));
        assert!(!list.is_list_of(ValueType::Element));
        assert_eq!(Container::new(ValueType::Double).item_type(), ValueType::Double);
    }

    #[test]
    fn scalar_slots_use_c_sizes() {
        assert_eq!(ValueType::Bool.size(), 1);
        assert_eq!(ValueType::Int32.alignment(), 4);
        assert_eq!(ValueType::Double.size(), 8);
        assert_eq!(ValueType::Struct.size(), mem::size_of::<usize>());
    }
}
