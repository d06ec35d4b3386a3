// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Raw native handles.
//!
//! Everything crossing into a bound library goes through the C ABI. Entry
//! points are resolved as untyped addresses and cast to the signature the
//! caller knows they have.

use std::ffi::c_void;
use std::fmt;
use std::mem;
use std::ptr::NonNull;

/// Opaque pointer to an object owned by a native library.
pub type NativeObject = *mut c_void;

/// Native constructor: `<ns>_<type>_new`.
pub type Constructor = unsafe extern "C" fn() -> NativeObject;

/// Native destructor: `<ns>_<type>_delete` or `<ns>_<type>_unref`.
pub type Destructor = unsafe extern "C" fn(NativeObject);

/// Module lifecycle hook: `<stem>_init` / `<stem>_shutdown`.
pub type LifecycleHook = unsafe extern "C" fn();

/// Address of a resolved native entry point.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeSymbol(NonNull<c_void>);

impl NativeSymbol {
    /// Wrap a raw address. Returns `None` for null.
    pub fn from_ptr(ptr: *const c_void) -> Option<Self> {
        NonNull::new(ptr.cast_mut()).map(Self)
    }

    /// Raw address of the entry point.
    pub fn as_ptr(self) -> *const c_void {
        self.0.as_ptr().cast_const()
    }

    /// Reinterpret the address as a function pointer of type `F`.
    ///
    /// # Safety
    ///
    /// `F` must be a function pointer type matching the real signature and
    /// calling convention of the native entry point.
    pub unsafe fn cast<F: Copy>(self) -> F {
        debug_assert_eq!(mem::size_of::<F>(), mem::size_of::<*const c_void>());
        let raw = self.0.as_ptr();
        // SAFETY: sizes match and the caller guarantees the signature.
        unsafe { mem::transmute_copy::<*mut c_void, F>(&raw) }
    }

    /// Cast to a constructor.
    ///
    /// # Safety
    ///
    /// The symbol must have the [`Constructor`] signature.
    pub unsafe fn constructor(self) -> Constructor {
        unsafe { self.cast() }
    }

    /// Cast to a destructor.
    ///
    /// # Safety
    ///
    /// The symbol must have the [`Destructor`] signature.
    pub unsafe fn destructor(self) -> Destructor {
        unsafe { self.cast() }
    }
}

impl fmt::Debug for NativeSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeSymbol({:p})", self.0.as_ptr())
    }
}
