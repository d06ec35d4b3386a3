// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! End-to-end flows: descriptions loaded against in-process natives, then
//! driven through elements and values.

use crate::descriptor::{DescriptorBuilder, DescriptorType};
use crate::element::Element;
use crate::loader::Loader;
use crate::module::{StaticOpener, SymbolTable};
use crate::native::{NativeObject, NativeSymbol};
use crate::property::{ObjectAccessorBinding, PropertyError, RawOffsetBinding};
use crate::registry::Registry;
use crate::value::{Container, Value, ValueType};
use crate::LoaderConfig;
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::ffi::c_void;
use std::path::Path;
use std::rc::Rc;

// ---------------------------------------------------------------------------
// "ui" natives
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Node {
    spacing: i32,
    visible: bool,
    children: Vec<usize>,
    weights: Vec<(usize, f64)>,
}

thread_local! {
    static INIT: Cell<u32> = const { Cell::new(0) };
    static SHUTDOWN: Cell<u32> = const { Cell::new(0) };
    static DELETED: Cell<u32> = const { Cell::new(0) };
    static UNREF: Cell<u32> = const { Cell::new(0) };
}

fn reset_counters() {
    for counter in [&INIT, &SHUTDOWN, &DELETED, &UNREF] {
        counter.with(|c| c.set(0));
    }
}

fn count(counter: &'static std::thread::LocalKey<Cell<u32>>) -> u32 {
    counter.with(|c| c.get())
}

fn bump(counter: &'static std::thread::LocalKey<Cell<u32>>) {
    counter.with(|c| c.set(c.get() + 1));
}

fn node<'a>(object: NativeObject) -> &'a mut Node {
    unsafe { &mut *object.cast::<Node>() }
}

extern "C" fn ui_init() {
    bump(&INIT);
}

extern "C" fn ui_shutdown() {
    bump(&SHUTDOWN);
}

extern "C" fn ui_new() -> NativeObject {
    Box::into_raw(Box::<Node>::default()).cast()
}

extern "C" fn ui_layout_delete(object: NativeObject) {
    bump(&DELETED);
    drop(unsafe { Box::from_raw(object.cast::<Node>()) });
}

extern "C" fn ui_item_unref(object: NativeObject) {
    bump(&UNREF);
    drop(unsafe { Box::from_raw(object.cast::<Node>()) });
}

extern "C" fn ui_layout_children_add(object: NativeObject, child: NativeObject) {
    node(object).children.push(child as usize);
}

extern "C" fn ui_layout_children_remove(object: NativeObject, child: NativeObject) {
    node(object).children.retain(|c| *c != child as usize);
}

extern "C" fn ui_layout_children_clear(object: NativeObject) {
    node(object).children.clear();
}

extern "C" fn ui_layout_weight_set(parent: NativeObject, child: NativeObject, weight: f64) {
    node(parent).weights.push((child as usize, weight));
}

extern "C" fn ui_layout_spacing_get(object: NativeObject, out: *mut i32) {
    unsafe { *out = node(object).spacing };
}

extern "C" fn ui_layout_spacing_set(object: NativeObject, v: i32) {
    node(object).spacing = v;
}

extern "C" fn ui_layout_spacing_is_set(object: NativeObject) -> bool {
    node(object).spacing != 0
}

extern "C" fn ui_layout_visible_get(object: NativeObject, out: *mut bool) {
    unsafe { *out = node(object).visible };
}

extern "C" fn ui_layout_visible_set(object: NativeObject, v: bool) {
    node(object).visible = v;
}

fn ui_symbols() -> SymbolTable {
    SymbolTable::new()
        .with("ui_init", ui_init as *const c_void)
        .with("ui_shutdown", ui_shutdown as *const c_void)
        .with("ui_layout_new", ui_new as *const c_void)
        .with("ui_layout_delete", ui_layout_delete as *const c_void)
        .with("ui_item_new", ui_new as *const c_void)
        .with("ui_item_unref", ui_item_unref as *const c_void)
        .with("ui_layout_children_add", ui_layout_children_add as *const c_void)
        .with("ui_layout_children_remove", ui_layout_children_remove as *const c_void)
        .with("ui_layout_children_clear", ui_layout_children_clear as *const c_void)
        .with("ui_layout_weight_set", ui_layout_weight_set as *const c_void)
        .with("ui_layout_spacing_get", ui_layout_spacing_get as *const c_void)
        .with("ui_layout_spacing_set", ui_layout_spacing_set as *const c_void)
        .with("ui_layout_spacing_is_set", ui_layout_spacing_is_set as *const c_void)
        .with("ui_layout_visible_get", ui_layout_visible_get as *const c_void)
        .with("ui_layout_visible_set", ui_layout_visible_set as *const c_void)
}

const UI: &str = r#"
[[namespace]]
name = "ui"
version = 0

[[namespace.native]]
name = "widget"
type = "abstract"

[[namespace.native]]
name = "item"
parent = "widget"

[[namespace.native]]
name = "layout"
parent = "widget"

[[namespace.native.property]]
name = "children"
type = "list"
item = { defined = "widget" }

[[namespace.native.property]]
name = "weight"
type = "double"
relative = true

[[namespace.native.property]]
name = "spacing"
type = "int32"

[[namespace.native.property]]
name = "visible"
type = "bool"
"#;

fn ui_loader(dir: &Path) -> Loader {
    std::fs::write(dir.join("ui.ender"), UI).unwrap();
    let registry = Rc::new(Registry::new());
    let loader = Loader::new(registry, LoaderConfig::with_descriptions_dir(dir))
        .with_opener(StaticOpener::new().module("ui", 0, ui_symbols()));
    assert!(loader.load("ui").unwrap());
    loader
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn test_point_struct_fields_land_at_offsets() {
    let registry = Registry::new();
    let geo = registry.add_namespace("geo", 0, None);
    let point = registry.register(&geo, DescriptorBuilder::new("point", DescriptorType::Struct));
    point.add_field("x", Container::new(ValueType::Int32)).unwrap();
    point.add_field("y", Container::new(ValueType::Int32)).unwrap();
    assert_eq!(point.size(), 8);

    let mut p = Value::new_static(Container::defined(point));
    assert!(p.struct_set("x", &Value::from(3i32)));
    assert!(p.struct_set("y", &Value::from(4i32)));
    assert_eq!(p.struct_get("x").unwrap().as_int32(), 3);
    assert_eq!(p.struct_get("y").unwrap().as_int32(), 4);

    let bytes = unsafe { std::slice::from_raw_parts(p.as_struct().cast::<u8>(), 8) };
    assert_eq!(&bytes[0..4], &3i32.to_ne_bytes());
    assert_eq!(&bytes[4..8], &4i32.to_ne_bytes());

    assert!(!p.struct_set("z", &Value::from(1i32)));
    assert!(p.struct_get("z").is_none());
}

#[test]
fn test_property_lookup_walks_and_shadows() {
    let registry = Registry::new();
    let ns = registry.add_namespace("tree", 0, None);
    let a = registry.register(&ns, DescriptorBuilder::new("a", DescriptorType::Class));
    let b = registry.register(
        &ns,
        DescriptorBuilder::new("b", DescriptorType::Class).parent(a.clone()),
    );
    let c = registry.register(
        &ns,
        DescriptorBuilder::new("c", DescriptorType::Class).parent(b.clone()),
    );
    let int32 = || Container::new(ValueType::Int32);
    let accessor = || Box::new(ObjectAccessorBinding::default());

    a.add_property("x", int32(), accessor(), false).unwrap();
    assert_eq!(c.find_property("x").unwrap().owner(), "a");
    assert!(c.property("x").is_none());

    b.add_property("x", int32(), accessor(), false).unwrap();
    assert_eq!(c.find_property("x").unwrap().owner(), "b");
    assert_eq!(b.find_property("x").unwrap().owner(), "b");
    assert_eq!(a.find_property("x").unwrap().owner(), "a");

    // Duplicate on the same descriptor is refused.
    assert!(b.add_property("x", int32(), accessor(), false).is_none());

    let names: Vec<String> = c
        .properties_recursive()
        .iter()
        .map(|p| p.owner().to_string())
        .collect();
    assert_eq!(names, vec!["b", "a"]);
    assert!(c.is_a("a"));
    assert!(!a.is_a("c"));
}

#[test]
fn test_unref_used_when_delete_missing() {
    reset_counters();
    let dir = tempfile::tempdir().unwrap();
    let loader = ui_loader(dir.path());
    let registry = loader.registry();

    let item = registry.new_element("item").unwrap();
    let layout = registry.new_element("layout").unwrap();
    drop(item);
    assert_eq!(count(&UNREF), 1);
    assert_eq!(count(&DELETED), 0);
    drop(layout);
    assert_eq!(count(&DELETED), 1);
    assert_eq!(count(&UNREF), 1);
}

#[test]
fn test_abstract_type_cannot_be_instantiated() {
    let dir = tempfile::tempdir().unwrap();
    let loader = ui_loader(dir.path());
    assert!(matches!(
        loader.registry().new_element("widget"),
        Err(crate::ElementError::NoConstructor(_))
    ));
}

#[test]
fn test_module_init_once_and_shutdown_on_teardown() {
    reset_counters();
    let dir = tempfile::tempdir().unwrap();
    let loader = ui_loader(dir.path());
    let registry = loader.registry().clone();
    assert_eq!(count(&INIT), 0);

    let first = registry.new_element("layout").unwrap();
    let second = registry.new_element("item").unwrap();
    assert_eq!(count(&INIT), 1);
    assert_eq!(count(&SHUTDOWN), 0);

    drop(first);
    drop(second);
    drop(loader);
    drop(registry);
    assert_eq!(count(&INIT), 1);
    assert_eq!(count(&SHUTDOWN), 1);
}

#[test]
fn test_relative_set_without_parent_fails_cleanly() {
    let registry = Registry::new();
    let ns = registry.add_namespace("ui", 0, None);
    let host = registry.register(
        &ns,
        DescriptorBuilder::new("host", DescriptorType::Class)
            .constructor(ui_new)
            .destructor(ui_layout_delete),
    );
    let binding = ObjectAccessorBinding {
        set: NativeSymbol::from_ptr(ui_layout_weight_set as *const c_void),
        ..ObjectAccessorBinding::default()
    };
    host.add_property("weight", Container::new(ValueType::Double), Box::new(binding), true)
        .unwrap();

    let element = registry.new_element("host").unwrap();
    assert!(matches!(
        element.value_set("weight", &Value::from(2.0)),
        Err(PropertyError::NoParent(_))
    ));
    assert!(node(element.object()).weights.is_empty());
    assert!(element.parent().is_none());

    // Raw-offset fields cannot be relative.
    let plain = registry.register(&ns, DescriptorBuilder::new("plain", DescriptorType::Struct));
    assert!(plain
        .add_property(
            "w",
            Container::new(ValueType::Double),
            Box::new(RawOffsetBinding::new(0)),
            true
        )
        .is_none());
}

#[test]
fn test_relative_lookup_follows_live_parent() {
    let dir = tempfile::tempdir().unwrap();
    let loader = ui_loader(dir.path());
    let registry = loader.registry();
    let layout = registry.new_element("layout").unwrap();
    let item = registry.new_element("item").unwrap();

    // Declared on the layout, so invisible until the item is adopted.
    assert!(matches!(
        item.value_set("weight", &Value::from(2.0)),
        Err(PropertyError::Unknown { .. })
    ));

    layout
        .value_add("children", &Value::from(item.clone()))
        .unwrap();
    assert!(item.property("weight").is_some());
    assert!(node(layout.object()).weights.is_empty());

    drop(layout);
    assert!(item.parent().is_none());
    assert!(item.property("weight").is_none());
}

#[test]
fn test_relative_write_goes_to_parent() {
    let dir = tempfile::tempdir().unwrap();
    let loader = ui_loader(dir.path());
    let registry = loader.registry();
    let layout = registry.new_element("layout").unwrap();
    let item = registry.new_element("item").unwrap();

    layout
        .value_add("children", &Value::from(item.clone()))
        .unwrap();
    assert!(Rc::ptr_eq(&item.parent().unwrap(), &layout));
    assert_eq!(node(layout.object()).children, vec![item.object() as usize]);

    item.value_set("weight", &Value::from(2.5)).unwrap();
    assert_eq!(
        node(layout.object()).weights,
        vec![(item.object() as usize, 2.5)]
    );
    assert!(node(item.object()).weights.is_empty());

    assert!(matches!(
        item.value_get("weight"),
        Err(PropertyError::RelativeGet(_))
    ));
    assert!(matches!(
        item.value_set("weight", &Value::from(1i32)),
        Err(PropertyError::TypeMismatch { .. })
    ));

    layout
        .value_remove("children", &Value::from(item.clone()))
        .unwrap();
    assert!(node(layout.object()).children.is_empty());
    layout
        .value_add("children", &Value::from(item.clone()))
        .unwrap();
    layout.value_clear("children").unwrap();
    assert!(node(layout.object()).children.is_empty());
}

#[test]
fn test_set_many_and_get_many_stop_at_unknown() {
    let dir = tempfile::tempdir().unwrap();
    let loader = ui_loader(dir.path());
    let layout = loader.registry().new_element("layout").unwrap();

    let processed = layout.set_many(&[
        ("spacing", Value::from(4i32)),
        ("visible", Value::from(true)),
        ("bogus", Value::from(1i32)),
        ("spacing", Value::from(9i32)),
    ]);
    assert_eq!(processed, 2);
    assert_eq!(node(layout.object()).spacing, 4);
    assert!(node(layout.object()).visible);

    let values = layout.get_many(&["spacing", "visible", "bogus", "spacing"]);
    assert_eq!(values.len(), 2);
    assert_eq!(values[0].as_ref().unwrap().as_int32(), 4);
    assert!(values[1].as_ref().unwrap().as_bool());
}

#[test]
fn test_is_set_and_unsupported_operations() {
    let dir = tempfile::tempdir().unwrap();
    let loader = ui_loader(dir.path());
    let layout = loader.registry().new_element("layout").unwrap();

    assert!(!layout.value_is_set("spacing").unwrap());
    layout.value_set("spacing", &Value::from(2i32)).unwrap();
    assert!(layout.value_is_set("spacing").unwrap());

    assert!(matches!(
        layout.value_is_set("visible"),
        Err(PropertyError::Unsupported { .. })
    ));
    assert!(matches!(
        layout.value_add("spacing", &Value::from(1i32)),
        Err(PropertyError::Unsupported { .. })
    ));
    assert!(matches!(
        layout.value_get("children"),
        Err(PropertyError::Unsupported { .. })
    ));
}

#[test]
fn test_element_from_object() {
    let dir = tempfile::tempdir().unwrap();
    let loader = ui_loader(dir.path());
    let registry = loader.registry();
    let item = registry.new_element("item").unwrap();

    let found = Element::from_object(registry, item.object()).unwrap();
    assert!(Rc::ptr_eq(&found, &item));
    assert!(Element::from_object(registry, std::ptr::null_mut()).is_none());

    let object = item.object();
    drop(found);
    drop(item);
    assert!(Element::from_object(registry, object).is_none());
}

#[test]
fn test_listeners_fire_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let loader = ui_loader(dir.path());
    let layout = loader.registry().new_element("layout").unwrap();
    let calls = Rc::new(RefCell::new(Vec::new()));

    let log = calls.clone();
    let first = layout.listener_add("resized", move |element, event, payload: &dyn Any| {
        let width = payload.downcast_ref::<i32>().copied().unwrap_or(-1);
        log.borrow_mut()
            .push(format!("first {} {} {}", element.name(), event, width));
    });
    let log = calls.clone();
    layout.listener_add("resized", move |_, _, _| {
        log.borrow_mut().push("second".to_string());
    });
    let log = calls.clone();
    layout.listener_add("hidden", move |_, _, _| {
        log.borrow_mut().push("hidden".to_string());
    });

    layout.dispatch("resized", &640i32);
    assert_eq!(
        *calls.borrow(),
        vec!["first layout resized 640".to_string(), "second".to_string()]
    );

    calls.borrow_mut().clear();
    assert!(layout.listener_remove("resized", first));
    assert!(!layout.listener_remove("resized", first));
    layout.dispatch("resized", &0i32);
    layout.dispatch("nobody", &());
    assert_eq!(*calls.borrow(), vec!["second".to_string()]);
}

#[test]
fn test_listener_may_register_during_dispatch() {
    let dir = tempfile::tempdir().unwrap();
    let loader = ui_loader(dir.path());
    let layout = loader.registry().new_element("layout").unwrap();
    let hits = Rc::new(Cell::new(0));

    let counter = hits.clone();
    layout.listener_add("tick", move |element, _, _| {
        counter.set(counter.get() + 1);
        let inner = counter.clone();
        element.listener_add("tick", move |_, _, _| inner.set(inner.get() + 10));
    });

    layout.dispatch("tick", &());
    assert_eq!(hits.get(), 1);
    layout.dispatch("tick", &());
    assert_eq!(hits.get(), 1 + 1 + 10);
}

#[test]
fn test_namespace_dump_lists_items() {
    let dir = tempfile::tempdir().unwrap();
    let loader = ui_loader(dir.path());
    let dump = loader.registry().dump("ui").unwrap();
    assert!(dump.starts_with("namespace \"ui\" version 0 (module "));
    assert!(dump.contains("layout"));
    assert!(dump.contains("(new, free)"));
    assert!(dump.contains("int32 spacing [get set is_set];"));
    assert!(dump.contains("double weight relative [set];"));
    assert!(dump.contains("children"));
    assert!(dump.contains("[add remove clear]"));
    assert!(loader.registry().dump("nowhere").is_none());
}
