// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # dynbind
//!
//! Runtime type introspection and dynamic binding of native libraries.
//!
//! Native libraries are described by small description files: namespaces,
//! the types they export, the properties and functions of each type. The
//! [`Loader`] reads those descriptions, opens the backing modules and binds
//! every declared item to its entry point by naming convention. Bound
//! types are then driven generically through [`Element`] and [`Value`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dynbind::{Loader, LoaderConfig, Registry, Value};
//! use std::rc::Rc;
//!
//! let registry = Rc::new(Registry::new());
//! let loader = Loader::new(registry.clone(), LoaderConfig::default());
//! loader.load("enesim_renderer")?;
//!
//! let rect = registry.new_element("rectangle")?;
//! rect.value_set("width", &Value::from(120.0))?;
//! println!("{}", rect.value_get("width")?.as_double());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! description files ──► Loader ──► Registry ──► Namespace ──► Descriptor ──► Property
//!                          │                        │                          │
//!                          ▼                        ▼                          ▼
//!                    ModuleOpener ──────────────► Module ◄──── symbols ── PropertyBinding
//!                                                                              │
//!                                   Element ── value_get / value_set ──────────┘
//! ```
//!
//! Everything is single threaded: registries, elements and values are
//! `Rc`-shared and must stay on the thread that created them.

pub mod config;
pub mod constant;
pub mod descriptor;
pub mod element;
pub mod loader;
pub mod module;
pub mod namespace;
pub mod native;
pub mod property;
pub mod registry;
pub mod value;

pub use config::{ConfigError, LoaderConfig};
pub use constant::{Constant, Literal};
pub use descriptor::{Descriptor, DescriptorBuilder, DescriptorType, Function};
pub use element::{Element, ElementError, ListenerId};
pub use loader::{LoadError, Loader};
pub use module::{Module, ModuleError, ModuleOpener, SymbolResolver};
pub use namespace::Namespace;
pub use property::{Property, PropertyError};
pub use registry::Registry;
pub use value::{Container, Matrix, Value, ValueType};

#[cfg(test)]
mod tests;
