// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type descriptors: named nodes carrying a native lifecycle, an ordered
//! property table and callable functions.

use crate::module::Module;
use crate::namespace::Namespace;
use crate::native::{Constructor, Destructor, NativeSymbol};
use crate::property::{ObjectAccessorBinding, Property, PropertyBinding, RawOffsetBinding};
use crate::value::{Container, ValueType};
use indexmap::IndexMap;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::mem;
use std::rc::{Rc, Weak};

/// Kind of a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorType {
    /// Built-in primitive of the given tag.
    Primitive(ValueType),
    /// Object type that cannot be instantiated directly.
    Abstract,
    /// Instantiable object type.
    Class,
    /// Plain value aggregate, fields at fixed offsets.
    Struct,
    /// Discriminated aggregate, fields overlap after the discriminant.
    Union,
}

impl DescriptorType {
    /// Tag of a container that references a descriptor of this kind.
    pub fn value_type(self) -> ValueType {
        match self {
            Self::Primitive(tag) => tag,
            Self::Abstract | Self::Class => ValueType::Element,
            Self::Struct => ValueType::Struct,
            Self::Union => ValueType::Union,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Primitive(tag) => tag.name(),
            Self::Abstract => "abstract",
            Self::Class => "class",
            Self::Struct => "struct",
            Self::Union => "union",
        }
    }

    /// True for value aggregates laid out in raw memory.
    pub fn is_aggregate(self) -> bool {
        matches!(self, Self::Struct | Self::Union)
    }
}

impl fmt::Display for DescriptorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A native function attached to a descriptor. Recorded for
/// introspection; invoking it is left to the caller.
#[derive(Debug)]
pub struct Function {
    name: String,
    symbol: NativeSymbol,
    ret: Option<Rc<Container>>,
    args: Vec<Rc<Container>>,
}

impl Function {
    pub fn new(
        name: impl Into<String>,
        symbol: NativeSymbol,
        ret: Option<Rc<Container>>,
        args: Vec<Rc<Container>>,
    ) -> Self {
        Self {
            name: name.into(),
            symbol,
            ret,
            args,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> NativeSymbol {
        self.symbol
    }

    /// Return container, `None` for void.
    pub fn ret(&self) -> Option<&Rc<Container>> {
        self.ret.as_ref()
    }

    pub fn args(&self) -> &[Rc<Container>] {
        &self.args
    }
}

/// Fluent builder for descriptors; registered through
/// [`Registry::register`](crate::Registry::register).
#[derive(Debug)]
pub struct DescriptorBuilder {
    name: String,
    kind: DescriptorType,
    parent: Option<Rc<Descriptor>>,
    constructor: Option<Constructor>,
    destructor: Option<Destructor>,
}

impl DescriptorBuilder {
    pub fn new(name: impl Into<String>, kind: DescriptorType) -> Self {
        Self {
            name: name.into(),
            kind,
            parent: None,
            constructor: None,
            destructor: None,
        }
    }

    /// Inherit property lookup from `parent`.
    pub fn parent(mut self, parent: Rc<Descriptor>) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn constructor(mut self, constructor: Constructor) -> Self {
        self.constructor = Some(constructor);
        self
    }

    pub fn destructor(mut self, destructor: Destructor) -> Self {
        self.destructor = Some(destructor);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn build(self, namespace: &Rc<Namespace>) -> Rc<Descriptor> {
        let (end, align) = match self.kind {
            DescriptorType::Union => (mem::size_of::<i32>(), mem::align_of::<i32>()),
            _ => (0, 1),
        };
        Rc::new(Descriptor {
            name: self.name,
            kind: self.kind,
            parent: self.parent,
            constructor: self.constructor,
            destructor: self.destructor,
            namespace: Rc::downgrade(namespace),
            module: namespace.module().cloned(),
            properties: RefCell::new(IndexMap::new()),
            functions: RefCell::new(IndexMap::new()),
            end: Cell::new(end),
            align: Cell::new(align),
        })
    }
}

/// A named type node.
pub struct Descriptor {
    name: String,
    kind: DescriptorType,
    parent: Option<Rc<Descriptor>>,
    constructor: Option<Constructor>,
    destructor: Option<Destructor>,
    namespace: Weak<Namespace>,
    // Keeps the code behind constructor/destructor mapped.
    module: Option<Rc<Module>>,
    properties: RefCell<IndexMap<String, Rc<Property>>>,
    functions: RefCell<IndexMap<String, Rc<Function>>>,
    // Raw layout of aggregates: end of the last field and overall alignment.
    end: Cell<usize>,
    align: Cell<usize>,
}

impl Descriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> DescriptorType {
        self.kind
    }

    pub fn parent(&self) -> Option<&Rc<Descriptor>> {
        self.parent.as_ref()
    }

    /// Owning namespace, while the registry is alive.
    pub fn namespace(&self) -> Option<Rc<Namespace>> {
        self.namespace.upgrade()
    }

    pub(crate) fn module(&self) -> Option<&Rc<Module>> {
        self.module.as_ref()
    }

    pub fn constructor(&self) -> Option<Constructor> {
        self.constructor
    }

    pub fn destructor(&self) -> Option<Destructor> {
        self.destructor
    }

    /// Native size of an aggregate, padded to its alignment.
    pub fn size(&self) -> usize {
        align_up(self.end.get(), self.align.get())
    }

    pub fn alignment(&self) -> usize {
        self.align.get()
    }

    /// True when `name` is this descriptor or one of its ancestors.
    pub fn is_a(&self, name: &str) -> bool {
        self.ancestors().any(|d| d.name == name)
    }

    fn ancestors(&self) -> impl Iterator<Item = &Descriptor> {
        std::iter::successors(Some(self), |d| d.parent.as_deref())
    }

    /// Register a property. A duplicate local name is rejected; names on
    /// ancestors may be shadowed.
    pub fn add_property(
        &self,
        name: &str,
        container: Rc<Container>,
        binding: Box<dyn PropertyBinding>,
        relative: bool,
    ) -> Option<Rc<Property>> {
        if relative && self.kind.is_aggregate() {
            log::error!(
                "property '{}' on '{}': a {} does not support relative properties",
                name,
                self.name,
                self.kind
            );
            return None;
        }
        if relative && !binding.supports_relative() {
            log::error!(
                "property '{}' on '{}': binding does not support relative access",
                name,
                self.name
            );
            return None;
        }
        let mut properties = self.properties.borrow_mut();
        if properties.contains_key(name) {
            log::warn!("property '{}' already exists on '{}'", name, self.name);
            return None;
        }
        let property = Rc::new(Property::new(name, &self.name, container, binding, relative));
        properties.insert(name.to_string(), property.clone());
        log::debug!("property '{}' added to '{}'", name, self.name);
        Some(property)
    }

    /// Append a raw-memory field at the next naturally aligned offset.
    /// Union fields all start right after the discriminant.
    pub fn add_field(&self, name: &str, container: Rc<Container>) -> Option<Rc<Property>> {
        self.add_bound_field(name, container, ObjectAccessorBinding::default())
    }

    /// Append a field at the next slot whose operations go through
    /// `accessors` where an entry point is bound.
    pub fn add_bound_field(
        &self,
        name: &str,
        container: Rc<Container>,
        accessors: ObjectAccessorBinding,
    ) -> Option<Rc<Property>> {
        let offset = self.next_offset(container.value_type());
        self.place_field(
            name,
            container,
            RawOffsetBinding::new(offset).with_accessors(accessors),
        )
    }

    /// Add a raw-memory field at an explicit byte offset.
    pub fn add_field_at(
        &self,
        name: &str,
        container: Rc<Container>,
        offset: usize,
    ) -> Option<Rc<Property>> {
        self.place_field(name, container, RawOffsetBinding::new(offset))
    }

    fn next_offset(&self, value_type: ValueType) -> usize {
        let base = match self.kind {
            DescriptorType::Union => mem::size_of::<i32>(),
            _ => self.end.get(),
        };
        align_up(base, value_type.alignment())
    }

    fn place_field(
        &self,
        name: &str,
        container: Rc<Container>,
        binding: RawOffsetBinding,
    ) -> Option<Rc<Property>> {
        if !self.kind.is_aggregate() {
            log::warn!(
                "'{}' is a {}, raw fields need a struct or union",
                self.name,
                self.kind
            );
            return None;
        }
        let value_type = container.value_type();
        let offset = binding.offset();
        let property = self.add_property(name, container, Box::new(binding), false)?;
        self.end.set(self.end.get().max(offset + value_type.size()));
        self.align.set(self.align.get().max(value_type.alignment()));
        Some(property)
    }

    /// Local property, ignoring ancestors.
    pub fn property(&self, name: &str) -> Option<Rc<Property>> {
        self.properties.borrow().get(name).cloned()
    }

    /// Look a property up on this descriptor, then up the parent chain.
    pub fn find_property(&self, name: &str) -> Option<Rc<Property>> {
        self.ancestors().find_map(|d| d.property(name))
    }

    /// Local properties in declaration order.
    pub fn properties(&self) -> Vec<Rc<Property>> {
        self.properties.borrow().values().cloned().collect()
    }

    /// Own properties first, then each ancestor's, nearest first.
    pub fn properties_recursive(&self) -> Vec<Rc<Property>> {
        self.ancestors().flat_map(|d| d.properties()).collect()
    }

    pub fn property_names(&self) -> Vec<String> {
        self.properties.borrow().keys().cloned().collect()
    }

    /// Register a function. Duplicate local names are rejected.
    pub fn add_function(&self, function: Function) -> Option<Rc<Function>> {
        let mut functions = self.functions.borrow_mut();
        if functions.contains_key(function.name()) {
            log::warn!(
                "function '{}' already exists on '{}'",
                function.name(),
                self.name
            );
            return None;
        }
        let function = Rc::new(function);
        functions.insert(function.name().to_string(), function.clone());
        Some(function)
    }

    pub fn find_function(&self, name: &str) -> Option<Rc<Function>> {
        self.ancestors()
            .find_map(|d| d.functions.borrow().get(name).cloned())
    }

    pub fn functions(&self) -> Vec<Rc<Function>> {
        self.functions.borrow().values().cloned().collect()
    }

    /// Drop property and function tables; containers may point back at
    /// descriptors, so this breaks the cycles on teardown.
    pub(crate) fn clear(&self) {
        self.properties.borrow_mut().clear();
        self.functions.borrow_mut().clear();
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("parent", &self.parent.as_ref().map(|p| p.name()))
            .field("properties", &self.property_names())
            .finish()
    }
}

fn align_up(offset: usize, align: usize) -> usize {
    (offset + align - 1) & !(align - 1)
}
