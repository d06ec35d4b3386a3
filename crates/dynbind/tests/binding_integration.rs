// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test/bench code readability over pedantic
#![allow(clippy::float_cmp)] // Test assertions with constants
#![allow(clippy::missing_panics_doc)] // Tests/examples panic on failure
#![allow(clippy::items_after_statements)] // Test helpers

//! Binding integration tests
//!
//! Two description files, one `using` the other, loaded against
//! statically linked natives: aggregate values through accessors, element
//! references, functions, cross-file type resolution.

use dynbind::loader::{DescriptionLocator, LoadError};
use dynbind::module::{StaticOpener, SymbolTable};
use dynbind::native::NativeObject;
use dynbind::value::JsonMarshaller;
use dynbind::{DescriptorType, Loader, LoaderConfig, Registry, Value, ValueType};
use std::ffi::c_void;
use std::path::Path;
use std::rc::Rc;

#[repr(C)]
#[derive(Default)]
struct Rect {
    size: [i32; 2],
    owner: usize,
}

fn rect<'a>(object: NativeObject) -> &'a mut Rect {
    unsafe { &mut *object.cast::<Rect>() }
}

extern "C" fn shapes_rect_new() -> NativeObject {
    Box::into_raw(Box::<Rect>::default()).cast()
}

extern "C" fn shapes_rect_delete(object: NativeObject) {
    drop(unsafe { Box::from_raw(object.cast::<Rect>()) });
}

extern "C" fn shapes_rect_size_get(object: NativeObject, out: *mut c_void) {
    unsafe { out.cast::<[i32; 2]>().write(rect(object).size) };
}

extern "C" fn shapes_rect_size_set(object: NativeObject, extent: *mut c_void) {
    rect(object).size = unsafe { extent.cast::<[i32; 2]>().read() };
}

extern "C" fn shapes_rect_owner_get(object: NativeObject, out: *mut *mut c_void) {
    unsafe { *out = rect(object).owner as *mut c_void };
}

extern "C" fn shapes_rect_owner_set(object: NativeObject, owner: *mut c_void) {
    rect(object).owner = owner as usize;
}

extern "C" fn shapes_rect_area(object: NativeObject) -> i32 {
    let [w, h] = rect(object).size;
    w * h
}

const BASE: &str = r#"
[[namespace]]
name = "base"
version = 0

[[namespace.constant]]
name = "unit"
defined = "int32"
value = 1

[[namespace.native]]
name = "extent"
type = "struct"

[[namespace.native.property]]
name = "w"
type = "int32"

[[namespace.native.property]]
name = "h"
type = "int32"

[[namespace.native]]
name = "number"
type = "union"

[[namespace.native.property]]
name = "i"
type = "int32"

[[namespace.native.property]]
name = "d"
type = "double"
"#;

const SHAPES: &str = r#"
using = ["base"]

[[namespace]]
name = "shapes"
version = 1

[[namespace.native]]
name = "rect"

[[namespace.native.property]]
name = "size"
defined = "extent"

[[namespace.native.property]]
name = "owner"
defined = "rect"

[[namespace.native.function]]
name = "area"
ret = { type = "int32" }
"#;

fn opener() -> StaticOpener {
    let shapes = SymbolTable::new()
        .with("shapes_rect_new", shapes_rect_new as *const c_void)
        .with("shapes_rect_delete", shapes_rect_delete as *const c_void)
        .with("shapes_rect_size_get", shapes_rect_size_get as *const c_void)
        .with("shapes_rect_size_set", shapes_rect_size_set as *const c_void)
        .with("shapes_rect_owner_get", shapes_rect_owner_get as *const c_void)
        .with("shapes_rect_owner_set", shapes_rect_owner_set as *const c_void)
        .with("shapes_rect_area", shapes_rect_area as *const c_void);
    StaticOpener::new()
        .module("base", 0, SymbolTable::new())
        .module("shapes", 1, shapes)
}

fn setup(dir: &Path) -> Loader {
    std::fs::write(dir.join("base.ender"), BASE).unwrap();
    std::fs::write(dir.join("shapes.ender"), SHAPES).unwrap();
    let registry = Rc::new(Registry::new());
    let loader =
        Loader::new(registry, LoaderConfig::with_descriptions_dir(dir)).with_opener(opener());
    assert!(loader.load("shapes").unwrap());
    loader
}

#[test]
fn test_using_loads_dependency_first() {
    let dir = tempfile::tempdir().unwrap();
    let loader = setup(dir.path());
    let registry = loader.registry();

    assert_eq!(loader.loaded_files().len(), 2);
    assert!(!loader.load("base").unwrap());

    let shapes = registry.namespace("shapes").unwrap();
    let deps: Vec<String> = shapes
        .dependencies()
        .iter()
        .map(|ns| ns.name().to_string())
        .collect();
    assert_eq!(deps, vec!["base".to_string()]);

    assert_eq!(shapes.find_item("extent").unwrap().name(), "extent");
    assert_eq!(
        shapes.find_item("int32").unwrap().kind(),
        DescriptorType::Primitive(ValueType::Int32)
    );
    assert_eq!(shapes.find_constant("unit").unwrap().value().as_int32(), 1);
    assert!(shapes.constant("unit").is_none());

    let base = registry.namespace("base").unwrap();
    assert!(base.find_item("rect").is_none());
    assert!(base.dependencies().is_empty());
}

#[test]
fn test_aggregate_layouts() {
    let dir = tempfile::tempdir().unwrap();
    let loader = setup(dir.path());
    let registry = loader.registry();

    let extent = registry.find_descriptor("extent").unwrap();
    assert_eq!(extent.kind(), DescriptorType::Struct);
    assert_eq!(extent.size(), 8);

    let number = registry.find_descriptor("number").unwrap();
    assert_eq!(number.kind(), DescriptorType::Union);
    assert_eq!(number.size(), 16);
    assert_eq!(number.alignment(), 8);

    let prop = number.find_property("d").unwrap();
    let mut n = Value::new_static(dynbind::Container::defined(number));
    n.set_union_discriminant(2);
    assert!(n.struct_set("d", &Value::from(0.5)));
    assert_eq!(n.union_discriminant(), 2);
    assert_eq!(n.struct_get("d").unwrap().as_double(), 0.5);
    assert_eq!(prop.value_type(), ValueType::Double);
}

#[test]
fn test_struct_property_through_accessors() {
    let dir = tempfile::tempdir().unwrap();
    let loader = setup(dir.path());
    let registry = loader.registry();
    let r = registry.new_element("rect").unwrap();

    let size = r.descriptor().find_property("size").unwrap();
    assert_eq!(size.value_type(), ValueType::Struct);
    let mut extent = Value::new_static(size.container().clone());
    assert!(extent.struct_set("w", &Value::from(3i32)));
    assert!(extent.struct_set("h", &Value::from(4i32)));
    r.value_set("size", &extent).unwrap();
    assert_eq!(rect(r.object()).size, [3, 4]);

    let back = r.value_get("size").unwrap();
    assert_eq!(back.struct_get("w").unwrap().as_int32(), 3);
    assert_eq!(back.struct_get("h").unwrap().as_int32(), 4);

    let json = JsonMarshaller::default().to_json(&back).unwrap();
    assert_eq!(json, serde_json::json!({ "w": 3, "h": 4 }));

    let area = r.descriptor().find_function("area").unwrap();
    assert_eq!(area.ret().unwrap().value_type(), ValueType::Int32);
    assert!(area.args().is_empty());
    let call: unsafe extern "C" fn(NativeObject) -> i32 = unsafe { area.symbol().cast() };
    assert_eq!(unsafe { call(r.object()) }, 12);
}

#[test]
fn test_element_reference_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let loader = setup(dir.path());
    let registry = loader.registry();
    let child = registry.new_element("rect").unwrap();
    let owner = registry.new_element("rect").unwrap();

    child.value_set("owner", &Value::from(owner.clone())).unwrap();
    assert_eq!(rect(child.object()).owner, owner.object() as usize);
    assert!(Rc::ptr_eq(&owner.parent().unwrap(), &child));

    let got = child.value_get("owner").unwrap();
    assert!(Rc::ptr_eq(&got.as_element().unwrap(), &owner));

    // A native pointer with no live element reads back as empty.
    rect(child.object()).owner = 0x10;
    assert!(child.value_get("owner").unwrap().as_element().is_none());
}

#[test]
fn test_load_all_scans_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("base.ender"), BASE).unwrap();
    std::fs::write(dir.path().join("shapes.ender"), SHAPES).unwrap();
    std::fs::write(dir.path().join("broken.ender"), "[[namespace\n").unwrap();
    std::fs::write(dir.path().join("readme.txt"), "ignored").unwrap();

    let registry = Rc::new(Registry::new());
    let loader = Loader::new(registry.clone(), LoaderConfig::with_descriptions_dir(dir.path()))
        .with_opener(opener());

    assert_eq!(loader.load_all().unwrap(), 2);
    assert!(registry.find_descriptor("rect").is_some());
    assert!(registry.find_descriptor("extent").is_some());
    assert_eq!(loader.modules().len(), 2);
}

#[test]
fn test_load_all_missing_directory() {
    let registry = Rc::new(Registry::new());
    let loader = Loader::new(
        registry,
        LoaderConfig::with_descriptions_dir("/nonexistent/dynbind/descriptions"),
    );
    assert!(matches!(loader.load_all(), Err(LoadError::Scan { .. })));
}

#[test]
fn test_locator_prefers_given_path() {
    let dir = tempfile::tempdir().unwrap();
    let other = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("base.ender"), BASE).unwrap();
    std::fs::write(other.path().join("base.ender"), BASE).unwrap();

    let locator = DescriptionLocator::new(dir.path(), "ender");
    let explicit = other.path().join("base");
    assert_eq!(
        locator.locate(explicit.to_str().unwrap()),
        Some(other.path().join("base.ender"))
    );
    assert_eq!(locator.locate("base"), Some(dir.path().join("base.ender")));
}
