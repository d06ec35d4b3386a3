// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Native modules and symbol resolution.
//!
//! A [`Module`] wraps whatever resolved the library's symbols. The loader
//! goes through a [`ModuleOpener`], so shared libraries (via `libloading`)
//! and in-process symbol tables are interchangeable.

use crate::native::{LifecycleHook, NativeSymbol};
use std::cell::Cell;
use std::collections::HashMap;
use std::ffi::c_void;
use std::fmt;
use std::path::PathBuf;

/// Errors raised while opening a module.
#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    #[error("failed to open module {file}: {source}")]
    Open {
        file: String,
        #[source]
        source: libloading::Error,
    },

    #[error("module {0} not found")]
    NotFound(String),
}

/// Resolves symbol names to entry points.
pub trait SymbolResolver {
    fn resolve(&self, name: &str) -> Option<NativeSymbol>;
}

/// Opens a module by file name.
pub trait ModuleOpener {
    fn open(&self, file_name: &str) -> Result<Box<dyn SymbolResolver>, ModuleError>;
}

/// Platform file name of a module: `libfoo.so.1`, `libfoo-1.dll` or
/// `libfoo.1.dylib`.
pub fn module_file_name(stem: &str, version: i32) -> String {
    if cfg!(target_os = "windows") {
        format!("lib{}-{}.dll", stem, version)
    } else if cfg!(target_os = "macos") {
        format!("lib{}.{}.dylib", stem, version)
    } else {
        format!("lib{}.so.{}", stem, version)
    }
}

/// Opens shared libraries, trying each search directory before the
/// system loader path.
#[derive(Debug, Default, Clone)]
pub struct LibraryOpener {
    search_dirs: Vec<PathBuf>,
}

impl LibraryOpener {
    pub fn new(search_dirs: Vec<PathBuf>) -> Self {
        Self { search_dirs }
    }
}

impl ModuleOpener for LibraryOpener {
    fn open(&self, file_name: &str) -> Result<Box<dyn SymbolResolver>, ModuleError> {
        let candidates = self
            .search_dirs
            .iter()
            .map(|dir| dir.join(file_name))
            .filter(|path| path.exists())
            .chain(std::iter::once(PathBuf::from(file_name)));

        let mut last_error = None;
        for path in candidates {
            // SAFETY: running the library's static initializers is the
            // point of loading a described module.
            match unsafe { libloading::Library::new(&path) } {
                Ok(library) => {
                    log::info!("opened module {}", path.display());
                    return Ok(Box::new(SharedLibrary { library }));
                }
                Err(e) => {
                    log::debug!("cannot open {}: {}", path.display(), e);
                    last_error = Some(e);
                }
            }
        }
        match last_error {
            Some(source) => Err(ModuleError::Open {
                file: file_name.to_string(),
                source,
            }),
            None => Err(ModuleError::NotFound(file_name.to_string())),
        }
    }
}

struct SharedLibrary {
    library: libloading::Library,
}

impl SymbolResolver for SharedLibrary {
    fn resolve(&self, name: &str) -> Option<NativeSymbol> {
        // SAFETY: only the address is taken; callers cast it to the
        // signature it was declared with.
        let symbol = unsafe { self.library.get::<unsafe extern "C" fn()>(name.as_bytes()) }.ok()?;
        NativeSymbol::from_ptr(*symbol as *const c_void)
    }
}

/// In-process symbol table, for statically linked natives.
#[derive(Debug, Default, Clone)]
pub struct SymbolTable {
    symbols: HashMap<String, NativeSymbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry point. Null addresses are ignored.
    pub fn with(mut self, name: impl Into<String>, address: *const c_void) -> Self {
        self.insert(name, address);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, address: *const c_void) {
        if let Some(symbol) = NativeSymbol::from_ptr(address) {
            self.symbols.insert(name.into(), symbol);
        }
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl SymbolResolver for SymbolTable {
    fn resolve(&self, name: &str) -> Option<NativeSymbol> {
        self.symbols.get(name).copied()
    }
}

/// Serves [`SymbolTable`]s registered under module file names.
#[derive(Debug, Default, Clone)]
pub struct StaticOpener {
    modules: HashMap<String, SymbolTable>,
}

impl StaticOpener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `table` as the module `<stem>` at `version`.
    pub fn module(mut self, stem: &str, version: i32, table: SymbolTable) -> Self {
        self.modules.insert(module_file_name(stem, version), table);
        self
    }
}

impl ModuleOpener for StaticOpener {
    fn open(&self, file_name: &str) -> Result<Box<dyn SymbolResolver>, ModuleError> {
        self.modules
            .get(file_name)
            .map(|table| Box::new(table.clone()) as Box<dyn SymbolResolver>)
            .ok_or_else(|| ModuleError::NotFound(file_name.to_string()))
    }
}

/// An opened native module.
///
/// `<stem>_init` runs at most once, on first use; `<stem>_shutdown` runs
/// when the module is released.
pub struct Module {
    file_name: String,
    stem: String,
    resolver: Box<dyn SymbolResolver>,
    initialized: Cell<bool>,
}

impl Module {
    pub fn new(
        file_name: impl Into<String>,
        stem: impl Into<String>,
        resolver: Box<dyn SymbolResolver>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            stem: stem.into(),
            resolver,
            initialized: Cell::new(false),
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.get()
    }

    pub fn symbol(&self, name: &str) -> Option<NativeSymbol> {
        let symbol = self.resolver.resolve(name);
        if symbol.is_none() {
            log::trace!("symbol {} not found in {}", name, self.file_name);
        }
        symbol
    }

    fn run_hook(&self, suffix: &str) {
        let name = format!("{}_{}", self.stem, suffix);
        if let Some(symbol) = self.resolver.resolve(&name) {
            log::debug!("calling {} from {}", name, self.file_name);
            // SAFETY: lifecycle hooks take no arguments and return nothing.
            let hook: LifecycleHook = unsafe { symbol.cast() };
            unsafe { hook() };
        }
    }

    /// Run the module initializer unless it already ran.
    pub fn initialize(&self) {
        if self.initialized.replace(true) {
            return;
        }
        self.run_hook("init");
    }
}

impl Drop for Module {
    fn drop(&mut self) {
        self.run_hook("shutdown");
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("file_name", &self.file_name)
            .field("stem", &self.stem)
            .field("initialized", &self.initialized.get())
            .finish()
    }
}
