// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Description loader
//!
//! Turns description files into namespaces, descriptors, properties and
//! functions, binding each one to its native entry points by name:
//!
//! | Item      | Symbols                                              |
//! |-----------|------------------------------------------------------|
//! | type      | `<ns>_<type>_new`, `<ns>_<type>_delete` or `_unref`  |
//! | property  | `<ns>_<type>_<prop>_get`, `_set`, `_is_set`          |
//! | list prop | also `_add`, `_remove`, `_clear`                     |
//! | function  | `<ns>_<type>_<func>`                                 |
//!
//! Constants carry their value in the description and bind no symbol.
//!
//! Dots in namespace names become underscores in symbol prefixes. The
//! module file comes from the first component of the namespace name and
//! its version, see [`module_file_name`].
//!
//! Every file is parsed at most once per loader, keyed by its path
//! string. A missing module abandons the namespace that needed it, and
//! loading moves on.

mod description;
mod locator;

pub use description::{
    ConstantDescription, ContainerDescription, DescriptionFile, DescriptionParser, DescriptionSink,
    FunctionDescription, NamespaceDescription, NativeDescription, NativeKind, ParseError,
    PropertyDescription, TomlDescriptionParser,
};
pub use locator::DescriptionLocator;

use crate::config::LoaderConfig;
use crate::constant::Constant;
use crate::descriptor::{Descriptor, DescriptorBuilder, DescriptorType, Function};
use crate::module::{module_file_name, LibraryOpener, Module, ModuleError, ModuleOpener};
use crate::namespace::Namespace;
use crate::property::ObjectAccessorBinding;
use crate::registry::{symbol_prefix, Registry};
use crate::value::{Container, ValueType};
use indexmap::{IndexMap, IndexSet};
use std::cell::RefCell;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Errors raised while loading descriptions.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("description '{0}' not found")]
    NotFound(String),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("cannot scan {path}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Callback run by [`Loader::load_all`] before any file is read.
pub type PreloadCallback = Box<dyn Fn(&Registry)>;

pub struct Loader {
    registry: Rc<Registry>,
    config: LoaderConfig,
    locator: DescriptionLocator,
    opener: Box<dyn ModuleOpener>,
    parser: Box<dyn DescriptionParser>,
    modules: RefCell<IndexMap<String, Rc<Module>>>,
    parsed: RefCell<IndexSet<String>>,
    // Namespaces each parsed file declared, for `using` edges.
    produced: RefCell<IndexMap<String, Vec<Rc<Namespace>>>>,
    preload: RefCell<Vec<PreloadCallback>>,
}

impl Loader {
    /// Loader opening shared libraries from `config.library_dirs` and the
    /// system path, reading TOML descriptions.
    pub fn new(registry: Rc<Registry>, config: LoaderConfig) -> Self {
        Self {
            locator: DescriptionLocator::from_config(&config),
            opener: Box::new(LibraryOpener::new(config.library_dirs.clone())),
            parser: Box::new(TomlDescriptionParser),
            registry,
            config,
            modules: RefCell::new(IndexMap::new()),
            parsed: RefCell::new(IndexSet::new()),
            produced: RefCell::new(IndexMap::new()),
            preload: RefCell::new(Vec::new()),
        }
    }

    pub fn with_opener(mut self, opener: impl ModuleOpener + 'static) -> Self {
        self.opener = Box::new(opener);
        self
    }

    pub fn with_parser(mut self, parser: impl DescriptionParser + 'static) -> Self {
        self.parser = Box::new(parser);
        self
    }

    pub fn registry(&self) -> &Rc<Registry> {
        &self.registry
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn locator(&self) -> &DescriptionLocator {
        &self.locator
    }

    /// Register a callback for [`Loader::load_all`].
    pub fn add_preload<F>(&self, callback: F)
    where
        F: Fn(&Registry) + 'static,
    {
        self.preload.borrow_mut().push(Box::new(callback));
    }

    /// Load a description unit by name or path.
    ///
    /// Returns `Ok(false)` when the file was already parsed.
    pub fn load(&self, unit: &str) -> Result<bool, LoadError> {
        let path = self
            .locator
            .locate(unit)
            .ok_or_else(|| LoadError::NotFound(unit.to_string()))?;
        self.load_path(&path)
    }

    /// Parse one description file unless it was already parsed.
    pub fn load_path(&self, path: &Path) -> Result<bool, LoadError> {
        let key = path_key(path);
        if self.parsed.borrow().contains(&key) {
            log::debug!("description {} already loaded", key);
            return Ok(false);
        }
        // Marked before parsing so `using` cycles terminate.
        self.parsed.borrow_mut().insert(key.clone());
        log::info!("loading description {}", key);

        let mut session = FileSession::new(self);
        if let Err(e) = self.parser.parse(path, &mut session) {
            self.parsed.borrow_mut().shift_remove(&key);
            log::error!("{}", e);
            return Err(e.into());
        }
        let namespaces = session.finish();
        self.produced.borrow_mut().insert(key, namespaces);
        Ok(true)
    }

    /// Run the pre-load callbacks, load the configured preload units,
    /// then every description in the descriptions directory. Files that
    /// fail are logged and skipped. Returns how many files were parsed.
    pub fn load_all(&self) -> Result<usize, LoadError> {
        for callback in self.preload.borrow().iter() {
            callback(&self.registry);
        }

        let mut loaded = 0;
        for unit in &self.config.preload {
            match self.load(unit) {
                Ok(true) => loaded += 1,
                Ok(false) => {}
                Err(e) => log::warn!("preload '{}' failed: {}", unit, e),
            }
        }

        let files = self.locator.scan().map_err(|source| LoadError::Scan {
            path: self.locator.dir().to_path_buf(),
            source,
        })?;
        for path in files {
            match self.load_path(&path) {
                Ok(true) => loaded += 1,
                Ok(false) => {}
                Err(e) => log::warn!("skipping {}: {}", path.display(), e),
            }
        }
        log::info!(
            "{} descriptions loaded from {}",
            loaded,
            self.locator.dir().display()
        );
        Ok(loaded)
    }

    pub fn is_loaded(&self, path: &Path) -> bool {
        self.parsed.borrow().contains(&path_key(path))
    }

    /// Parsed file keys, in load order.
    pub fn loaded_files(&self) -> Vec<String> {
        self.parsed.borrow().iter().cloned().collect()
    }

    /// Modules opened so far.
    pub fn modules(&self) -> Vec<Rc<Module>> {
        self.modules.borrow().values().cloned().collect()
    }

    fn namespaces_of(&self, key: &str) -> Vec<Rc<Namespace>> {
        self.produced.borrow().get(key).cloned().unwrap_or_default()
    }

    fn module(&self, stem: &str, version: i32) -> Result<Rc<Module>, ModuleError> {
        let file_name = module_file_name(stem, version);
        if let Some(module) = self.modules.borrow().get(&file_name) {
            return Ok(module.clone());
        }
        let resolver = self.opener.open(&file_name)?;
        let module = Rc::new(Module::new(file_name.clone(), stem, resolver));
        self.modules.borrow_mut().insert(file_name, module.clone());
        Ok(module)
    }
}

impl fmt::Debug for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Loader")
            .field("descriptions_dir", &self.config.descriptions_dir)
            .field("parsed", &self.parsed.borrow().len())
            .field("modules", &self.modules.borrow().len())
            .finish()
    }
}

// Relative paths are anchored at the working directory; nothing else is
// normalised, so two spellings of one file are two keys.
fn path_key(path: &Path) -> String {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    absolute.to_string_lossy().into_owned()
}

struct CurrentNative {
    descriptor: Rc<Descriptor>,
    // `<ns>_<type>`
    prefix: String,
}

/// Intake state for one file.
struct FileSession<'a> {
    loader: &'a Loader,
    using: Vec<Rc<Namespace>>,
    namespace: Option<Rc<Namespace>>,
    native: Option<CurrentNative>,
    produced: Vec<Rc<Namespace>>,
}

impl<'a> FileSession<'a> {
    fn new(loader: &'a Loader) -> Self {
        Self {
            loader,
            using: Vec::new(),
            namespace: None,
            native: None,
            produced: Vec::new(),
        }
    }

    fn finish(self) -> Vec<Rc<Namespace>> {
        self.produced
    }

    fn registry(&self) -> &Registry {
        &self.loader.registry
    }

    fn resolve_descriptor(&self, namespace: &Namespace, name: &str) -> Option<Rc<Descriptor>> {
        namespace
            .find_item(name)
            .or_else(|| self.registry().find_descriptor(name))
    }

    fn resolve_container(
        &self,
        namespace: &Namespace,
        node: &ContainerDescription,
    ) -> Option<Rc<Container>> {
        if let Some(name) = &node.defined {
            let Some(descriptor) = self.resolve_descriptor(namespace, name) else {
                log::warn!("type '{}' not found from namespace '{}'", name, namespace.name());
                return None;
            };
            return Some(Container::defined(descriptor));
        }
        match node.value_type {
            Some(ValueType::List) => {
                let Some(item) = &node.item else {
                    log::warn!("list container without an item type");
                    return None;
                };
                let child = self.resolve_container(namespace, item)?;
                Some(Container::list(child))
            }
            Some(tag) => Some(Container::new(tag)),
            None => {
                log::warn!("container needs a 'type' or a 'defined' reference");
                None
            }
        }
    }
}

impl DescriptionSink for FileSession<'_> {
    fn add_using(&mut self, unit: &str) {
        let unit = symbol_prefix(unit);
        let Some(path) = self.loader.locator.locate(&unit) else {
            log::warn!("using '{}': no description found", unit);
            return;
        };
        if let Err(e) = self.loader.load_path(&path) {
            log::warn!("using '{}': {}", unit, e);
            return;
        }
        for namespace in self.loader.namespaces_of(&path_key(&path)) {
            if !self.using.iter().any(|ns| Rc::ptr_eq(ns, &namespace)) {
                self.using.push(namespace);
            }
        }
    }

    fn add_namespace(&mut self, name: &str, version: i32) {
        self.namespace = None;
        self.native = None;

        let stem = name.split('.').next().unwrap_or(name);
        let module = match self.loader.module(stem, version) {
            Ok(module) => module,
            Err(e) => {
                log::error!("namespace '{}' abandoned: {}", name, e);
                return;
            }
        };
        let namespace = self.registry().add_namespace(name, version, Some(module));
        for dependency in &self.using {
            namespace.add_dependency(dependency.clone());
        }
        if !self.produced.iter().any(|ns| Rc::ptr_eq(ns, &namespace)) {
            self.produced.push(namespace.clone());
        }
        self.namespace = Some(namespace);
    }

    fn add_constant(&mut self, constant: &ConstantDescription) {
        let Some(namespace) = self.namespace.clone() else {
            log::debug!("constant '{}' outside a usable namespace, skipped", constant.name);
            return;
        };
        let Some(container) = self.resolve_container(&namespace, &constant.container) else {
            log::warn!("constant '{}': unknown type, skipped", constant.name);
            return;
        };
        let value_type = container.value_type();
        let built = constant
            .literal()
            .and_then(|literal| Constant::new(&constant.name, container, literal));
        match built {
            Some(built) => {
                namespace.add_constant(built);
            }
            None => log::warn!(
                "constant '{}': value {} does not fit {}, skipped",
                constant.name,
                constant.value,
                value_type
            ),
        }
    }

    fn add_native(&mut self, name: &str, alias: Option<&str>, kind: NativeKind, parent: Option<&str>) {
        self.native = None;
        let Some(namespace) = self.namespace.clone() else {
            log::debug!("native '{}' outside a usable namespace, skipped", name);
            return;
        };

        let parent = match parent {
            Some(parent_name) => match self.resolve_descriptor(&namespace, parent_name) {
                Some(descriptor) => Some(descriptor),
                None => {
                    log::warn!("native '{}': parent '{}' not found", name, parent_name);
                    return;
                }
            },
            None => None,
        };

        let kind = DescriptorType::from(kind);
        let prefix = format!("{}_{}", namespace.name(), name);
        let mut builder = DescriptorBuilder::new(alias.unwrap_or(name), kind);
        if let Some(parent) = parent {
            builder = builder.parent(parent);
        }

        if let Some(module) = namespace.module() {
            match module.symbol(&format!("{}_new", prefix)) {
                // SAFETY: `_new` entry points take nothing and return the object.
                Some(symbol) => builder = builder.constructor(unsafe { symbol.constructor() }),
                None if kind == DescriptorType::Class => {
                    log::warn!("no constructor {}_new", prefix)
                }
                None => log::debug!("no constructor {}_new", prefix),
            }
            let destructor = module
                .symbol(&format!("{}_delete", prefix))
                .or_else(|| module.symbol(&format!("{}_unref", prefix)));
            match destructor {
                // SAFETY: `_delete` and `_unref` take the object and return nothing.
                Some(symbol) => builder = builder.destructor(unsafe { symbol.destructor() }),
                None if kind == DescriptorType::Class => {
                    log::warn!("no destructor {}_delete or {}_unref", prefix, prefix)
                }
                None => log::debug!("no destructor for {}", prefix),
            }
        }

        let descriptor = self.loader.registry.register(&namespace, builder);
        self.native = Some(CurrentNative { descriptor, prefix });
    }

    fn add_property(&mut self, property: &PropertyDescription) {
        let (Some(namespace), Some(native)) = (&self.namespace, &self.native) else {
            return;
        };
        let Some(container) = self.resolve_container(namespace, &property.container) else {
            log::warn!(
                "property '{}' of '{}' skipped",
                property.name,
                native.descriptor.name()
            );
            return;
        };

        let base = format!("{}_{}", native.prefix, property.name);
        let lookup = |op: &str| {
            namespace
                .module()
                .and_then(|module| module.symbol(&format!("{}_{}", base, op)))
        };
        let mut binding = ObjectAccessorBinding {
            get: lookup("get"),
            set: lookup("set"),
            is_set: lookup("is_set"),
            ..ObjectAccessorBinding::default()
        };
        if container.is_list() {
            binding.add = lookup("add");
            binding.remove = lookup("remove");
            binding.clear = lookup("clear");
        }

        let name = property.alias.as_deref().unwrap_or(&property.name);
        let descriptor = &native.descriptor;
        if descriptor.kind().is_aggregate() {
            if property.relative {
                log::error!(
                    "property '{}' of {} '{}': relative properties need an object type, skipped",
                    property.name,
                    descriptor.kind(),
                    descriptor.name()
                );
                return;
            }
            descriptor.add_bound_field(name, container, binding);
            return;
        }

        if binding.get.is_none() && !property.relative {
            log::debug!("no getter {}_get", base);
        }
        if binding.set.is_none() {
            log::debug!("no setter {}_set", base);
        }
        if container.is_list() && binding.add.is_none() {
            log::debug!("no {}_add, list is read-only", base);
        }
        descriptor.add_property(name, container, Box::new(binding), property.relative);
    }

    fn add_function(&mut self, function: &FunctionDescription) {
        let (Some(namespace), Some(native)) = (&self.namespace, &self.native) else {
            return;
        };
        let symbol_name = format!("{}_{}", native.prefix, function.name);
        let Some(symbol) = namespace.module().and_then(|m| m.symbol(&symbol_name)) else {
            log::warn!("function {} not found, skipped", symbol_name);
            return;
        };
        let ret = match &function.ret {
            Some(node) => match self.resolve_container(namespace, node) {
                Some(container) => Some(container),
                None => {
                    log::warn!("function {}: bad return type, skipped", symbol_name);
                    return;
                }
            },
            None => None,
        };
        let mut args = Vec::with_capacity(function.args.len());
        for node in &function.args {
            match self.resolve_container(namespace, node) {
                Some(container) => args.push(container),
                None => {
                    log::warn!("function {}: bad argument type, skipped", symbol_name);
                    return;
                }
            }
        }
        let name = function.alias.as_deref().unwrap_or(&function.name);
        native
            .descriptor
            .add_function(Function::new(name, symbol, ret, args));
    }
}
