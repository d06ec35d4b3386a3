// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Namespaces: versioned groups of descriptors backed by one module.

use crate::constant::Constant;
use crate::descriptor::Descriptor;
use crate::module::Module;
use crate::property::Operation;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt::{self, Write as _};
use std::rc::Rc;

/// Name of the built-in primitive namespace.
pub const BUILTIN_NAMESPACE: &str = "c";

pub struct Namespace {
    name: String,
    version: i32,
    descriptors: RefCell<IndexMap<String, Rc<Descriptor>>>,
    constants: RefCell<IndexMap<String, Rc<Constant>>>,
    dependencies: RefCell<Vec<Rc<Namespace>>>,
    module: Option<Rc<Module>>,
    // Built-in primitives, consulted last. None for the built-in itself.
    fallback: Option<Rc<Namespace>>,
}

impl Namespace {
    pub(crate) fn new(
        name: &str,
        version: i32,
        module: Option<Rc<Module>>,
        fallback: Option<Rc<Namespace>>,
    ) -> Rc<Self> {
        Rc::new(Self {
            name: name.to_string(),
            version,
            descriptors: RefCell::new(IndexMap::new()),
            constants: RefCell::new(IndexMap::new()),
            dependencies: RefCell::new(Vec::new()),
            module,
            fallback,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn module(&self) -> Option<&Rc<Module>> {
        self.module.as_ref()
    }

    pub fn is_builtin(&self) -> bool {
        self.fallback.is_none() && self.module.is_none() && self.name == BUILTIN_NAMESPACE
    }

    /// Run the backing module's initializer, once.
    pub fn initialize(&self) {
        if let Some(module) = &self.module {
            module.initialize();
        }
    }

    pub(crate) fn insert(&self, descriptor: Rc<Descriptor>) {
        self.descriptors
            .borrow_mut()
            .insert(descriptor.name().to_string(), descriptor);
    }

    /// Descriptor declared by this namespace itself.
    pub fn descriptor(&self, name: &str) -> Option<Rc<Descriptor>> {
        self.descriptors.borrow().get(name).cloned()
    }

    pub fn descriptors(&self) -> Vec<Rc<Descriptor>> {
        self.descriptors.borrow().values().cloned().collect()
    }

    pub fn descriptor_names(&self) -> Vec<String> {
        self.descriptors.borrow().keys().cloned().collect()
    }

    /// Register a constant. A duplicate name is rejected.
    pub fn add_constant(&self, constant: Constant) -> Option<Rc<Constant>> {
        let mut constants = self.constants.borrow_mut();
        if constants.contains_key(constant.name()) {
            log::warn!("constant '{}' already exists in {}", constant.name(), self.name);
            return None;
        }
        let constant = Rc::new(constant);
        constants.insert(constant.name().to_string(), constant.clone());
        Some(constant)
    }

    /// Constant declared by this namespace itself.
    pub fn constant(&self, name: &str) -> Option<Rc<Constant>> {
        self.constants.borrow().get(name).cloned()
    }

    pub fn constants(&self) -> Vec<Rc<Constant>> {
        self.constants.borrow().values().cloned().collect()
    }

    /// Record a namespace this one was declared against. Self and
    /// duplicate edges are ignored.
    pub fn add_dependency(&self, dependency: Rc<Namespace>) {
        if std::ptr::eq(dependency.as_ref(), self) {
            return;
        }
        let mut deps = self.dependencies.borrow_mut();
        if deps.iter().any(|d| Rc::ptr_eq(d, &dependency)) {
            return;
        }
        log::debug!("namespace {} depends on {}", self.name, dependency.name);
        deps.push(dependency);
    }

    pub fn dependencies(&self) -> Vec<Rc<Namespace>> {
        self.dependencies.borrow().clone()
    }

    /// Resolve a type name: own table, then dependencies in declaration
    /// order (transitively), then the built-in primitives.
    pub fn find_item(&self, name: &str) -> Option<Rc<Descriptor>> {
        let mut visited = Vec::new();
        self.search(&|ns| ns.descriptor(name), &mut visited).or_else(|| {
            self.fallback
                .as_ref()
                .and_then(|builtin| builtin.descriptor(name))
        })
    }

    /// Resolve a constant: own table, then dependencies in declaration
    /// order (transitively).
    pub fn find_constant(&self, name: &str) -> Option<Rc<Constant>> {
        let mut visited = Vec::new();
        self.search(&|ns| ns.constant(name), &mut visited)
    }

    fn search<T>(
        &self,
        lookup: &dyn Fn(&Namespace) -> Option<T>,
        visited: &mut Vec<*const Namespace>,
    ) -> Option<T> {
        let me: *const Namespace = self;
        if visited.contains(&me) {
            return None;
        }
        visited.push(me);
        if let Some(found) = lookup(self) {
            return Some(found);
        }
        let deps = self.dependencies();
        deps.iter().find_map(|dep| dep.search(lookup, visited))
    }

    /// Human readable listing of the namespace: module, dependencies,
    /// descriptors with their layout and lifecycle, properties with the
    /// operations they support, functions.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        let module = self.module.as_ref().map_or("-", |m| m.file_name());
        let _ = writeln!(
            out,
            "namespace \"{}\" version {} (module {}) {{",
            self.name, self.version, module
        );
        let deps: Vec<String> = self
            .dependencies()
            .iter()
            .map(|d| d.name().to_string())
            .collect();
        if !deps.is_empty() {
            let _ = writeln!(out, "\tusing {};", deps.join(", "));
        }
        for constant in self.constants() {
            let _ = writeln!(
                out,
                "\tconst {} {} = {};",
                constant.value_type(),
                constant.name(),
                constant.literal()
            );
        }
        for descriptor in self.descriptors() {
            dump_descriptor(&mut out, &descriptor);
        }
        let _ = writeln!(out, "}};");
        out
    }

    /// Drop descriptors and dependency edges on teardown.
    pub(crate) fn clear(&self) {
        for descriptor in self.descriptors.borrow().values() {
            descriptor.clear();
        }
        self.descriptors.borrow_mut().clear();
        self.constants.borrow_mut().clear();
        self.dependencies.borrow_mut().clear();
    }
}

fn dump_descriptor(out: &mut String, descriptor: &Descriptor) {
    let _ = write!(out, "\t{} \"{}\"", descriptor.kind(), descriptor.name());
    if let Some(parent) = descriptor.parent() {
        let _ = write!(out, " : \"{}\"", parent.name());
    }
    if descriptor.kind().is_aggregate() {
        let _ = write!(out, " [{} bytes]", descriptor.size());
    }
    let lifecycle: Vec<&str> = [
        descriptor.constructor().map(|_| "new"),
        descriptor.destructor().map(|_| "free"),
    ]
    .into_iter()
    .flatten()
    .collect();
    if !lifecycle.is_empty() {
        let _ = write!(out, " ({})", lifecycle.join(", "));
    }
    let _ = writeln!(out, " {{");

    for property in descriptor.properties() {
        let container = property.container();
        let _ = write!(out, "\t\t{} {}", container.value_type(), property.name());
        if let Some(item) = container.child() {
            let _ = write!(out, " of {}", item.value_type());
        }
        if let Some(constraint) = container.descriptor() {
            let _ = write!(out, " ({})", constraint.name());
        }
        if property.is_relative() {
            let _ = write!(out, " relative");
        }
        let ops: Vec<&str> = Operation::ALL
            .into_iter()
            .filter(|op| property.supports(*op))
            .map(Operation::name)
            .collect();
        let _ = writeln!(out, " [{}];", ops.join(" "));
    }
    for function in descriptor.functions() {
        let ret = function
            .ret()
            .map_or("void", |c| c.value_type().name());
        let args: Vec<&str> = function
            .args()
            .iter()
            .map(|a| a.value_type().name())
            .collect();
        let _ = writeln!(out, "\t\t{} {}({});", ret, function.name(), args.join(", "));
    }
    let _ = writeln!(out, "\t}};");
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Namespace")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("descriptors", &self.descriptor_names())
            .field("module", &self.module.as_ref().map(|m| m.file_name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{DescriptorBuilder, DescriptorType};

    fn declare(ns: &Rc<Namespace>, name: &str) -> Rc<Descriptor> {
        let d = DescriptorBuilder::new(name, DescriptorType::Class).build(ns);
        ns.insert(d.clone());
        d
    }

    #[test]
    fn find_item_walks_dependencies_then_builtin() {
        let builtin = Namespace::new(BUILTIN_NAMESPACE, 0, None, None);
        let int32 =
            DescriptorBuilder::new("int32", DescriptorType::Primitive(crate::ValueType::Int32))
                .build(&builtin);
        builtin.insert(int32);

        let base = Namespace::new("base", 0, None, Some(builtin.clone()));
        let shape = declare(&base, "shape");
        let app = Namespace::new("app", 0, None, Some(builtin.clone()));
        app.add_dependency(base.clone());

        assert!(Rc::ptr_eq(&app.find_item("shape").unwrap(), &shape));
        assert_eq!(app.find_item("int32").unwrap().name(), "int32");
        assert!(app.find_item("missing").is_none());
        assert!(builtin.is_builtin());
        assert!(!app.is_builtin());
    }

    #[test]
    fn own_table_wins_over_dependencies() {
        let base = Namespace::new("base", 0, None, None);
        declare(&base, "node");
        let app = Namespace::new("app", 0, None, None);
        let mine = declare(&app, "node");
        app.add_dependency(base);
        assert!(Rc::ptr_eq(&app.find_item("node").unwrap(), &mine));
    }

    #[test]
    fn dependency_cycles_terminate() {
        let a = Namespace::new("a", 0, None, None);
        let b = Namespace::new("b", 0, None, None);
        a.add_dependency(b.clone());
        b.add_dependency(a.clone());
        a.add_dependency(a.clone());
        assert!(a.find_item("nowhere").is_none());
        assert_eq!(a.dependencies().len(), 1);
        a.clear();
        b.clear();
    }
}
