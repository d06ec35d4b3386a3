// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Description tree and its producers.
//!
//! A producer walks a description and reports it to a
//! [`DescriptionSink`] in document order: `using` references first, then
//! each namespace followed by its constants and natives, each native
//! followed by its properties and functions.
//!
//! The bundled producer reads TOML:
//!
//! ```toml
//! using = ["eina"]
//!
//! [[namespace]]
//! name = "enesim.renderer"
//! version = 0
//!
//! [[namespace.constant]]
//! name = "max_quality"
//! type = "int32"
//! value = 3
//!
//! [[namespace.native]]
//! name = "shape"
//! type = "abstract"
//!
//! [[namespace.native.property]]
//! name = "stroke_weight"
//! type = "double"
//!
//! [[namespace.native.property]]
//! name = "children"
//! type = "list"
//! item = { defined = "shape" }
//!
//! [[namespace.native.function]]
//! name = "draw"
//! ret = { type = "bool" }
//! args = [{ type = "pointer" }]
//! ```

use crate::constant::Literal;
use crate::descriptor::DescriptorType;
use crate::value::ValueType;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Errors raised by a description producer.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed description {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Kind of a declared native type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NativeKind {
    Abstract,
    #[default]
    Class,
    Struct,
    Union,
}

impl From<NativeKind> for DescriptorType {
    fn from(kind: NativeKind) -> Self {
        match kind {
            NativeKind::Abstract => DescriptorType::Abstract,
            NativeKind::Class => DescriptorType::Class,
            NativeKind::Struct => DescriptorType::Struct,
            NativeKind::Union => DescriptorType::Union,
        }
    }
}

/// Shape of a slot: a plain tag, a list with one item node, or a
/// reference to a declared type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerDescription {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<ValueType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defined: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<Box<ContainerDescription>>,
}

impl ContainerDescription {
    pub fn of(value_type: ValueType) -> Self {
        Self {
            value_type: Some(value_type),
            ..Self::default()
        }
    }

    pub fn defined(name: impl Into<String>) -> Self {
        Self {
            defined: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn list(item: ContainerDescription) -> Self {
        Self {
            value_type: Some(ValueType::List),
            item: Some(Box::new(item)),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDescription {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(flatten)]
    pub container: ContainerDescription,
    /// Writes are redirected to the parent element.
    #[serde(default)]
    pub relative: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDescription {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ret: Option<ContainerDescription>,
    #[serde(default)]
    pub args: Vec<ContainerDescription>,
}

/// A named literal; `value` must fit the declared type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstantDescription {
    pub name: String,
    #[serde(flatten)]
    pub container: ContainerDescription,
    pub value: toml::Value,
}

impl ConstantDescription {
    /// The literal, if `value` is a scalar or a string.
    pub fn literal(&self) -> Option<Literal> {
        match &self.value {
            toml::Value::Boolean(v) => Some(Literal::Bool(*v)),
            toml::Value::Integer(v) => Some(Literal::Int(*v)),
            toml::Value::Float(v) => Some(Literal::Double(*v)),
            toml::Value::String(v) => Some(Literal::String(v.clone())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeDescription {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: NativeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(rename = "property", default)]
    pub properties: Vec<PropertyDescription>,
    #[serde(rename = "function", default)]
    pub functions: Vec<FunctionDescription>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamespaceDescription {
    pub name: String,
    #[serde(default)]
    pub version: i32,
    #[serde(rename = "constant", default)]
    pub constants: Vec<ConstantDescription>,
    #[serde(rename = "native", default)]
    pub natives: Vec<NativeDescription>,
}

/// One description file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DescriptionFile {
    #[serde(default)]
    pub using: Vec<String>,
    #[serde(rename = "namespace", default)]
    pub namespaces: Vec<NamespaceDescription>,
}

impl DescriptionFile {
    /// Report the tree to `sink` in document order.
    pub fn replay(&self, sink: &mut dyn DescriptionSink) {
        for unit in &self.using {
            sink.add_using(unit);
        }
        for namespace in &self.namespaces {
            sink.add_namespace(&namespace.name, namespace.version);
            for constant in &namespace.constants {
                sink.add_constant(constant);
            }
            for native in &namespace.natives {
                sink.add_native(
                    &native.name,
                    native.alias.as_deref(),
                    native.kind,
                    native.parent.as_deref(),
                );
                for property in &native.properties {
                    sink.add_property(property);
                }
                for function in &native.functions {
                    sink.add_function(function);
                }
            }
        }
    }
}

/// Receives a description tree, one node at a time.
pub trait DescriptionSink {
    fn add_using(&mut self, unit: &str);
    fn add_namespace(&mut self, name: &str, version: i32);
    fn add_constant(&mut self, constant: &ConstantDescription);
    fn add_native(&mut self, name: &str, alias: Option<&str>, kind: NativeKind, parent: Option<&str>);
    fn add_property(&mut self, property: &PropertyDescription);
    fn add_function(&mut self, function: &FunctionDescription);
}

/// Produces a description tree from a file.
pub trait DescriptionParser {
    fn parse(&self, path: &Path, sink: &mut dyn DescriptionSink) -> Result<(), ParseError>;
}

/// TOML description producer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TomlDescriptionParser;

impl TomlDescriptionParser {
    pub fn parse_str(&self, text: &str) -> Result<DescriptionFile, toml::de::Error> {
        toml::from_str(text)
    }
}

impl DescriptionParser for TomlDescriptionParser {
    fn parse(&self, path: &Path, sink: &mut dyn DescriptionSink) -> Result<(), ParseError> {
        let text = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file = self.parse_str(&text).map_err(|source| ParseError::Toml {
            path: path.to_path_buf(),
            source,
        })?;
        file.replay(sink);
        Ok(())
    }
}
