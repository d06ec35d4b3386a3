// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Process-scoped registry of namespaces, descriptors and live elements.
//!
//! The registry is an explicit value: construct it once, hand it to a
//! [`Loader`](crate::Loader), and drop it (or call
//! [`Registry::shutdown`]) on teardown.

use crate::descriptor::{Descriptor, DescriptorBuilder, DescriptorType};
use crate::element::{Element, ElementError, ElementIndex};
use crate::module::Module;
use crate::namespace::{Namespace, BUILTIN_NAMESPACE};
use crate::value::ValueType;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Symbol prefix of a dotted namespace name: `enesim.renderer` becomes
/// `enesim_renderer`.
pub fn symbol_prefix(namespace: &str) -> String {
    namespace.replace('.', "_")
}

pub struct Registry {
    // Unqualified lookups: the most recent registration of a name wins.
    descriptors: RefCell<IndexMap<String, Rc<Descriptor>>>,
    namespaces: RefCell<IndexMap<String, Rc<Namespace>>>,
    builtin: Rc<Namespace>,
    elements: Rc<ElementIndex>,
}

impl Registry {
    /// Empty registry holding only the built-in primitive namespace.
    pub fn new() -> Self {
        let builtin = Namespace::new(BUILTIN_NAMESPACE, 0, None, None);
        let registry = Self {
            descriptors: RefCell::new(IndexMap::new()),
            namespaces: RefCell::new(IndexMap::new()),
            builtin: builtin.clone(),
            elements: Rc::new(ElementIndex::default()),
        };
        registry
            .namespaces
            .borrow_mut()
            .insert(BUILTIN_NAMESPACE.to_string(), builtin.clone());
        for tag in ValueType::PRIMITIVES {
            registry.register(
                &builtin,
                DescriptorBuilder::new(tag.name(), DescriptorType::Primitive(tag)),
            );
        }
        registry
    }

    /// The built-in primitive namespace.
    pub fn builtin(&self) -> &Rc<Namespace> {
        &self.builtin
    }

    pub fn elements(&self) -> &Rc<ElementIndex> {
        &self.elements
    }

    /// Create a namespace, or return the existing one of that name.
    pub fn add_namespace(
        &self,
        name: &str,
        version: i32,
        module: Option<Rc<Module>>,
    ) -> Rc<Namespace> {
        let key = symbol_prefix(name);
        if let Some(existing) = self.namespaces.borrow().get(&key) {
            if existing.version() != version {
                log::warn!(
                    "namespace '{}' already registered with version {}, ignoring version {}",
                    key,
                    existing.version(),
                    version
                );
            }
            return existing.clone();
        }
        let namespace = Namespace::new(&key, version, module, Some(self.builtin.clone()));
        self.namespaces
            .borrow_mut()
            .insert(key.clone(), namespace.clone());
        log::debug!("namespace '{}' version {} created", key, version);
        namespace
    }

    pub fn namespace(&self, name: &str) -> Option<Rc<Namespace>> {
        self.namespaces.borrow().get(&symbol_prefix(name)).cloned()
    }

    pub fn namespace_names(&self) -> Vec<String> {
        self.namespaces.borrow().keys().cloned().collect()
    }

    /// Register a descriptor in `namespace`.
    ///
    /// Re-declaring a name inside the same namespace returns the existing
    /// descriptor. A name already owned by another namespace is shadowed
    /// for unqualified lookups.
    pub fn register(&self, namespace: &Rc<Namespace>, builder: DescriptorBuilder) -> Rc<Descriptor> {
        if let Some(existing) = namespace.descriptor(builder.name()) {
            log::debug!(
                "descriptor '{}' already declared in '{}'",
                builder.name(),
                namespace.name()
            );
            return existing;
        }
        if let Some(existing) = self.descriptors.borrow().get(builder.name()) {
            let owner = existing
                .namespace()
                .map(|ns| ns.name().to_string())
                .unwrap_or_default();
            log::warn!(
                "descriptor '{}' of namespace '{}' shadowed by namespace '{}'",
                builder.name(),
                owner,
                namespace.name()
            );
        }
        let descriptor = builder.build(namespace);
        namespace.insert(descriptor.clone());
        self.descriptors
            .borrow_mut()
            .insert(descriptor.name().to_string(), descriptor.clone());
        log::debug!(
            "descriptor '{}' ({}) registered in '{}'",
            descriptor.name(),
            descriptor.kind(),
            namespace.name()
        );
        descriptor
    }

    /// Unqualified lookup.
    pub fn find_descriptor(&self, name: &str) -> Option<Rc<Descriptor>> {
        self.descriptors.borrow().get(name).cloned()
    }

    /// Lookup restricted to one namespace's own table.
    pub fn find_descriptor_in(&self, name: &str, namespace: &str) -> Option<Rc<Descriptor>> {
        self.namespace(namespace)?.descriptor(name)
    }

    pub fn descriptor_names(&self) -> Vec<String> {
        self.descriptors.borrow().keys().cloned().collect()
    }

    pub fn descriptor_count(&self) -> usize {
        self.descriptors.borrow().len()
    }

    /// Instantiate the descriptor called `name`.
    pub fn new_element(&self, name: &str) -> Result<Rc<Element>, ElementError> {
        let Some(descriptor) = self.find_descriptor(name) else {
            log::warn!("no descriptor named '{}'", name);
            return Err(ElementError::UnknownDescriptor(name.to_string()));
        };
        Element::create(descriptor, &self.elements)
    }

    /// Listing of one namespace.
    pub fn dump(&self, namespace: &str) -> Option<String> {
        self.namespace(namespace).map(|ns| ns.dump())
    }

    /// Drop every namespace and descriptor. Elements still alive keep
    /// their descriptor and module, but lose property tables.
    pub fn shutdown(&self) {
        let namespaces: Vec<Rc<Namespace>> = self
            .namespaces
            .borrow_mut()
            .drain(..)
            .map(|(_, ns)| ns)
            .collect();
        for namespace in &namespaces {
            namespace.clear();
        }
        self.descriptors.borrow_mut().clear();
        if !namespaces.is_empty() {
            log::debug!("registry shut down, {} namespaces released", namespaces.len());
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("namespaces", &self.namespace_names())
            .field("descriptors", &self.descriptor_count())
            .field("elements", &self.elements.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_primitives_are_registered() {
        let registry = Registry::new();
        for tag in ValueType::PRIMITIVES {
            let d = registry.find_descriptor(tag.name()).unwrap();
            assert_eq!(d.kind(), DescriptorType::Primitive(tag));
            assert!(d.namespace().unwrap().is_builtin());
        }
        assert_eq!(registry.namespace_names(), vec!["c".to_string()]);
    }

    #[test]
    fn redeclaring_in_same_namespace_is_idempotent() {
        let registry = Registry::new();
        let ns = registry.add_namespace("shapes", 1, None);
        let first = registry.register(&ns, DescriptorBuilder::new("circle", DescriptorType::Class));
        let count = registry.descriptor_count();
        let second = registry.register(&ns, DescriptorBuilder::new("circle", DescriptorType::Struct));
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(second.kind(), DescriptorType::Class);
        assert_eq!(registry.descriptor_count(), count);
    }

    #[test]
    fn last_registration_wins_unqualified() {
        let registry = Registry::new();
        let a = registry.add_namespace("alpha", 0, None);
        let b = registry.add_namespace("beta", 0, None);
        let from_a = registry.register(&a, DescriptorBuilder::new("node", DescriptorType::Class));
        let from_b = registry.register(&b, DescriptorBuilder::new("node", DescriptorType::Class));

        assert!(Rc::ptr_eq(&registry.find_descriptor("node").unwrap(), &from_b));
        assert!(Rc::ptr_eq(
            &registry.find_descriptor_in("node", "alpha").unwrap(),
            &from_a
        ));
        assert!(Rc::ptr_eq(
            &registry.find_descriptor_in("node", "beta").unwrap(),
            &from_b
        ));
    }

    #[test]
    fn dotted_namespace_names_are_normalised() {
        let registry = Registry::new();
        let ns = registry.add_namespace("enesim.renderer", 0, None);
        assert_eq!(ns.name(), "enesim_renderer");
        assert!(Rc::ptr_eq(&registry.namespace("enesim.renderer").unwrap(), &ns));
        assert!(Rc::ptr_eq(&registry.add_namespace("enesim_renderer", 0, None), &ns));
    }

    #[test]
    fn unknown_element_name() {
        let registry = Registry::new();
        assert!(matches!(
            registry.new_element("ghost"),
            Err(ElementError::UnknownDescriptor(_))
        ));
        assert!(matches!(
            registry.new_element("int32"),
            Err(ElementError::NoConstructor(_))
        ));
    }

    #[test]
    fn shutdown_empties_tables() {
        let registry = Registry::new();
        registry.add_namespace("shapes", 0, None);
        registry.shutdown();
        assert!(registry.namespace_names().is_empty());
        assert_eq!(registry.descriptor_count(), 0);
    }
}
