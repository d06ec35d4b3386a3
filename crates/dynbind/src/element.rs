// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Elements: live native objects driven through their descriptor.

use crate::descriptor::Descriptor;
use crate::native::NativeObject;
use crate::property::{Operation, Property, PropertyError, Target};
use crate::registry::Registry;
use crate::value::{Value, ValueType};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

/// Errors raised while instantiating an element.
#[derive(Debug, thiserror::Error)]
pub enum ElementError {
    #[error("unknown descriptor '{0}'")]
    UnknownDescriptor(String),

    #[error("descriptor '{0}' has no constructor")]
    NoConstructor(String),

    #[error("constructor of '{0}' returned a null object")]
    NullObject(String),
}

/// Event listener callback: element, event name, payload.
pub type EventCallback = Rc<dyn Fn(&Element, &str, &dyn Any)>;

/// Handle returned by [`Element::listener_add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Listener {
    id: ListenerId,
    callback: EventCallback,
}

/// Live elements keyed by native object address.
#[derive(Debug, Default)]
pub struct ElementIndex {
    live: RefCell<HashMap<usize, Weak<Element>>>,
}

impl ElementIndex {
    fn insert(&self, object: NativeObject, element: Weak<Element>) {
        self.live.borrow_mut().insert(object as usize, element);
    }

    fn remove(&self, object: NativeObject, element: &Weak<Element>) {
        let mut live = self.live.borrow_mut();
        if live
            .get(&(object as usize))
            .is_some_and(|stored| Weak::ptr_eq(stored, element))
        {
            live.remove(&(object as usize));
        }
    }

    /// Live element wrapping `object`.
    pub fn lookup(&self, object: NativeObject) -> Option<Rc<Element>> {
        if object.is_null() {
            return None;
        }
        let found = self.live.borrow().get(&(object as usize))?.upgrade();
        if found.is_none() {
            log::debug!("native object {:p} has no live element", object);
        }
        found
    }

    pub fn len(&self) -> usize {
        self.live.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.borrow().is_empty()
    }
}

/// A live instance of a descriptor.
///
/// The native object is created by the descriptor's constructor and
/// handed to its destructor when the last reference drops.
pub struct Element {
    descriptor: Rc<Descriptor>,
    object: NativeObject,
    parent: RefCell<Weak<Element>>,
    listeners: RefCell<HashMap<String, Vec<Listener>>>,
    next_listener: Cell<u64>,
    index: Rc<ElementIndex>,
    me: Weak<Element>,
}

impl Element {
    pub(crate) fn create(
        descriptor: Rc<Descriptor>,
        index: &Rc<ElementIndex>,
    ) -> Result<Rc<Self>, ElementError> {
        let constructor = descriptor
            .constructor()
            .ok_or_else(|| ElementError::NoConstructor(descriptor.name().to_string()))?;
        if let Some(module) = descriptor.module() {
            module.initialize();
        }
        // SAFETY: bound from `<ns>_<type>_new`, which takes no arguments.
        let object = unsafe { constructor() };
        if object.is_null() {
            log::warn!("constructor of '{}' returned null", descriptor.name());
            return Err(ElementError::NullObject(descriptor.name().to_string()));
        }
        let element = Rc::new_cyclic(|me| Self {
            descriptor,
            object,
            parent: RefCell::new(Weak::new()),
            listeners: RefCell::new(HashMap::new()),
            next_listener: Cell::new(0),
            index: index.clone(),
            me: me.clone(),
        });
        index.insert(object, Rc::downgrade(&element));
        log::debug!("element '{}' created at {:p}", element.name(), object);
        Ok(element)
    }

    /// Live element wrapping a native object.
    pub fn from_object(registry: &Registry, object: NativeObject) -> Option<Rc<Self>> {
        registry.elements().lookup(object)
    }

    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    pub fn descriptor(&self) -> &Rc<Descriptor> {
        &self.descriptor
    }

    pub fn object(&self) -> NativeObject {
        self.object
    }

    pub fn parent(&self) -> Option<Rc<Element>> {
        self.parent.borrow().upgrade()
    }

    /// Set or clear the parent back-reference.
    pub fn set_parent(&self, parent: Option<&Rc<Element>>) {
        *self.parent.borrow_mut() = parent.map(Rc::downgrade).unwrap_or_default();
    }

    /// Resolve a property: own descriptor chain first, then relative
    /// properties declared on the parent's descriptor.
    pub fn property(&self, name: &str) -> Option<Rc<Property>> {
        if let Some(property) = self.descriptor.find_property(name) {
            return Some(property);
        }
        self.parent()?
            .descriptor
            .find_property(name)
            .filter(|p| p.is_relative())
    }

    fn lookup(&self, name: &str) -> Result<Rc<Property>, PropertyError> {
        self.property(name).ok_or_else(|| {
            log::warn!("'{}' has no property '{}'", self.name(), name);
            PropertyError::Unknown {
                descriptor: self.name().to_string(),
                name: name.to_string(),
            }
        })
    }

    fn require(&self, property: &Property, op: Operation) -> Result<(), PropertyError> {
        if property.supports(op) {
            return Ok(());
        }
        log::warn!(
            "property '{}' of '{}' has no {} entry point",
            property.name(),
            self.name(),
            op
        );
        Err(PropertyError::Unsupported {
            name: property.name().to_string(),
            op,
        })
    }

    pub fn value_get(&self, name: &str) -> Result<Value, PropertyError> {
        let property = self.lookup(name)?;
        if property.is_relative() {
            log::warn!("relative property '{}' cannot be read", name);
            return Err(PropertyError::RelativeGet(name.to_string()));
        }
        self.require(&property, Operation::Get)?;
        let mut value = Value::new_static(property.container().clone());
        property.get(self.object, &mut value, &self.index);
        Ok(value)
    }

    pub fn value_set(&self, name: &str, value: &Value) -> Result<(), PropertyError> {
        self.write(name, Operation::Set, value)
    }

    /// Append an item to a list property.
    pub fn value_add(&self, name: &str, value: &Value) -> Result<(), PropertyError> {
        self.write(name, Operation::Add, value)
    }

    /// Remove an item from a list property.
    pub fn value_remove(&self, name: &str, value: &Value) -> Result<(), PropertyError> {
        self.write(name, Operation::Remove, value)
    }

    /// Empty a list property. Always acts on this element's own object.
    pub fn value_clear(&self, name: &str) -> Result<(), PropertyError> {
        let property = self.lookup(name)?;
        self.require(&property, Operation::Clear)?;
        property.clear(self.object);
        Ok(())
    }

    /// Whether the native reports the property as set. Always asks this
    /// element's own object.
    pub fn value_is_set(&self, name: &str) -> Result<bool, PropertyError> {
        let property = self.lookup(name)?;
        self.require(&property, Operation::IsSet)?;
        Ok(property.is_set(self.object))
    }

    fn write(&self, name: &str, op: Operation, value: &Value) -> Result<(), PropertyError> {
        let property = self.lookup(name)?;
        self.require(&property, op)?;

        let expected = match op {
            Operation::Set => property.value_type(),
            _ => property.container().item_type(),
        };
        if value.value_type() != expected {
            log::warn!(
                "property '{}' of '{}' expects {}, got {}",
                name,
                self.name(),
                expected,
                value.value_type()
            );
            return Err(PropertyError::TypeMismatch {
                name: name.to_string(),
                expected,
                got: value.value_type(),
            });
        }

        let target = if property.is_relative() {
            let Some(parent) = self.parent() else {
                log::warn!(
                    "relative property '{}' on '{}' needs a parent element",
                    name,
                    self.name()
                );
                return Err(PropertyError::NoParent(name.to_string()));
            };
            Target::Relative {
                parent: parent.object,
                child: self.object,
            }
        } else {
            Target::Local(self.object)
        };

        self.adopt(&property, value);
        property.write(op, target, value);
        Ok(())
    }

    // Element references stored through a property point back at us.
    fn adopt(&self, property: &Property, value: &Value) {
        let container = property.container();
        let holds_elements = container.value_type() == ValueType::Element
            || container.is_list_of(ValueType::Element);
        if !holds_elements {
            return;
        }
        if let Some(child) = value.as_element() {
            if !std::ptr::eq(child.as_ref(), self) {
                *child.parent.borrow_mut() = self.me.clone();
            }
        }
    }

    /// Set several properties in order, stopping at the first unknown
    /// name. Returns how many entries were processed.
    pub fn set_many(&self, entries: &[(&str, Value)]) -> usize {
        let mut processed = 0;
        for (name, value) in entries {
            if self.property(name).is_none() {
                log::debug!("set_many on '{}' stops at '{}'", self.name(), name);
                break;
            }
            if let Err(e) = self.value_set(name, value) {
                log::warn!("set_many on '{}': {}", self.name(), e);
            }
            processed += 1;
        }
        processed
    }

    /// Read several properties in order, stopping at the first unknown
    /// name.
    pub fn get_many(&self, names: &[&str]) -> Vec<Result<Value, PropertyError>> {
        names
            .iter()
            .take_while(|name| self.property(name).is_some())
            .map(|name| self.value_get(name))
            .collect()
    }

    pub fn listener_add<F>(&self, event: &str, callback: F) -> ListenerId
    where
        F: Fn(&Element, &str, &dyn Any) + 'static,
    {
        let id = ListenerId(self.next_listener.get());
        self.next_listener.set(id.0 + 1);
        self.listeners
            .borrow_mut()
            .entry(event.to_string())
            .or_default()
            .push(Listener {
                id,
                callback: Rc::new(callback),
            });
        id
    }

    /// Remove a listener. Returns false when it was not registered.
    pub fn listener_remove(&self, event: &str, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let Some(list) = listeners.get_mut(event) else {
            return false;
        };
        let before = list.len();
        list.retain(|l| l.id != id);
        let removed = list.len() != before;
        if list.is_empty() {
            listeners.remove(event);
        }
        removed
    }

    /// Invoke every listener of `event`, in registration order.
    pub fn dispatch(&self, event: &str, payload: &dyn Any) {
        let snapshot: Vec<EventCallback> = self
            .listeners
            .borrow()
            .get(event)
            .map(|list| list.iter().map(|l| l.callback.clone()).collect())
            .unwrap_or_default();
        for callback in snapshot {
            callback(self, event, payload);
        }
    }
}

impl Drop for Element {
    fn drop(&mut self) {
        self.index.remove(self.object, &self.me);
        if let Some(destructor) = self.descriptor.destructor() {
            // SAFETY: the object came from the matching constructor and is
            // released exactly once, here.
            unsafe { destructor(self.object) };
        }
        log::debug!("element '{}' at {:p} destroyed", self.name(), self.object);
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("descriptor", &self.descriptor.name())
            .field("object", &self.object)
            .field("parent", &self.parent().map(|p| p.object))
            .finish()
    }
}
