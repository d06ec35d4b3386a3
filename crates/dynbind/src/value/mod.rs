// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Values and containers
//!
//! A [`Container`] describes a slot (tag, list item type, descriptor
//! constraint); a [`Value`] is one tagged payload bound to a container.
//! Values are the only currency between callers and bound natives.
//!
//! # Example
//!
//! ```rust
//! use dynbind::value::{Container, Value, ValueType};
//!
//! let mut v = Value::new(Container::new(ValueType::Int32));
//! v.set_int32(42);
//! assert_eq!(v.as_int32(), 42);
//!
//! // Wrong-tag access is a silent no-op.
//! v.set_double(1.5);
//! assert_eq!(v.as_double(), 0.0);
//! assert_eq!(v.as_int32(), 42);
//! ```

mod container;
mod marshal;
mod matrix;
mod payload;

pub use container::{Container, ValueType};
pub use marshal::{JsonMarshaller, Marshaller};
pub use matrix::Matrix;
pub(crate) use payload::Data;
pub use payload::{FreeCallback, Ownership, Value};
