// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Named literals exported by a namespace.

use crate::value::{Container, Value, ValueType};
use std::fmt;
use std::rc::Rc;

/// Untyped literal as written in a description.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::Double(v) => write!(f, "{:?}", v),
            Self::String(v) => write!(f, "{:?}", v),
        }
    }
}

/// A typed, named literal.
#[derive(Debug)]
pub struct Constant {
    name: String,
    container: Rc<Container>,
    literal: Literal,
}

impl Constant {
    /// `None` when the literal does not fit the container tag: wrong kind,
    /// out of range for the integer width, or a non-scalar tag.
    pub fn new(name: &str, container: Rc<Container>, literal: Literal) -> Option<Self> {
        typed(&container, &literal)?;
        Some(Self {
            name: name.to_string(),
            container,
            literal,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn container(&self) -> &Rc<Container> {
        &self.container
    }

    pub fn value_type(&self) -> ValueType {
        self.container.value_type()
    }

    pub fn literal(&self) -> &Literal {
        &self.literal
    }

    /// A fresh value holding the constant.
    pub fn value(&self) -> Value {
        typed(&self.container, &self.literal).unwrap_or_else(|| Value::new(self.container.clone()))
    }
}

fn typed(container: &Rc<Container>, literal: &Literal) -> Option<Value> {
    let mut value = Value::new(container.clone());
    match (container.value_type(), literal) {
        (ValueType::Bool, Literal::Bool(v)) => value.set_bool(*v),
        (ValueType::Int8, Literal::Int(v)) => value.set_int8(i8::try_from(*v).ok()?),
        (ValueType::Uint8, Literal::Int(v)) => value.set_uint8(u8::try_from(*v).ok()?),
        (ValueType::Int32, Literal::Int(v)) => value.set_int32(i32::try_from(*v).ok()?),
        (ValueType::Uint32, Literal::Int(v)) => value.set_uint32(u32::try_from(*v).ok()?),
        (ValueType::Int64, Literal::Int(v)) => value.set_int64(*v),
        (ValueType::Uint64, Literal::Int(v)) => value.set_uint64(u64::try_from(*v).ok()?),
        (ValueType::Double, Literal::Double(v)) => value.set_double(*v),
        (ValueType::Double, Literal::Int(v)) => value.set_double(*v as f64),
        (ValueType::String, Literal::String(s)) if !s.contains('\0') => value.set_string(s),
        _ => return None,
    }
    Some(value)
}
