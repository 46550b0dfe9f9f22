//! # Plugin Libraries
//!
//! The only place that touches untyped shared-library memory. A library is
//! opened, the `<plugin>__plugin` symbol is looked up, and the memory behind
//! it is checked for [`REGISTRATION_MAGIC`] before anything else sees it.
//! The result is a [`DynamicLibrary`], which keeps the library mapped for as
//! long as the record is reachable and only exposes the record once its
//! layout version is known.
use std::ffi::OsString;
use std::path::MAIN_SEPARATOR;
use std::ptr::NonNull;

use libloading::{Library, Symbol};
use log::debug;

use crate::constants::{REGISTRATION_MAGIC, REGISTRATION_SYMBOL_SUFFIX, REGISTRATION_VERSION};
use crate::error::{Error, Result};
use crate::plugin::PluginRegistration;

/// The fields every registration record layout starts with.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
struct RegistrationHeader {
    magic: u32,
    version: u32,
}

/// Turn a short library name (`greek`) into this platform's file name
/// (`libgreek.so`, `libgreek.dylib`, `greek.dll`). Names containing a path
/// separator are used verbatim.
pub fn library_filename(library_name: &str) -> OsString {
    if library_name.contains('/') || library_name.contains(MAIN_SEPARATOR) {
        OsString::from(library_name)
    } else {
        libloading::library_filename(library_name)
    }
}

/// Name of the symbol holding the registration record for `plugin_name`.
pub fn registration_symbol(plugin_name: &str) -> String {
    format!("{}{}", plugin_name, REGISTRATION_SYMBOL_SUFFIX)
}

/// An opened plugin library together with a validated record pointer.
pub struct DynamicLibrary {
    record: NonNull<RegistrationHeader>,
    library_name: String,
    // Keeps `record` mapped; must outlive every use of it.
    _library: Library,
}

// The record is immutable static data inside `_library`, which is itself Send
// and Sync.
unsafe impl Send for DynamicLibrary {}
unsafe impl Sync for DynamicLibrary {}

impl DynamicLibrary {
    /// Open `library_name` and locate the registration record of
    /// `plugin_name` in it. Every failure is an [`Error::BadLibrary`].
    pub fn open(plugin_name: &str, library_name: &str) -> Result<Self> {
        let filename = library_filename(library_name);
        debug!(
            target: "quay::plugins",
            "Load library {} for plugin {}",
            filename.to_string_lossy(),
            plugin_name
        );

        // SAFETY: loading a library runs its initialisers; plugin libraries are
        // trusted code by contract.
        let library = unsafe { Library::new(&filename) }.map_err(|e| {
            Error::bad_library_with(format!("Cannot open library {}: {}", library_name, e), e)
        })?;

        debug!(target: "quay::plugins", "Load registration for plugin {}", plugin_name);
        let symbol_name = registration_symbol(plugin_name);
        let address = {
            // SAFETY: the symbol is a data symbol; we only take its address
            // here and validate the memory behind it below.
            let symbol: Symbol<*mut RegistrationHeader> =
                unsafe { library.get(symbol_name.as_bytes()) }.map_err(|e| {
                    Error::bad_library_with(
                        format!(
                            "Cannot find registration for plugin {} in library {}: {}",
                            plugin_name, library_name, e
                        ),
                        e,
                    )
                })?;
            *symbol
        };

        let record = NonNull::new(address).ok_or_else(|| {
            Error::bad_library(format!(
                "Registration symbol {} in library {} is null",
                symbol_name, library_name
            ))
        })?;

        // SAFETY: the symbol exists in a library we keep open. Every record
        // layout starts with the header, so reading it is valid for any
        // symbol that really is a registration; a foreign symbol is rejected
        // by the magic check.
        let header = unsafe { record.as_ptr().read_unaligned() };
        if header.magic != REGISTRATION_MAGIC {
            return Err(Error::bad_library(format!(
                "{} does not contain a valid plugin registration for plugin {}",
                library_name, plugin_name
            )));
        }

        Ok(Self {
            record,
            library_name: library_name.to_string(),
            _library: library,
        })
    }

    pub fn library_name(&self) -> &str {
        &self.library_name
    }

    fn header(&self) -> RegistrationHeader {
        // SAFETY: validated in `open`; the library is still mapped.
        unsafe { self.record.as_ptr().read_unaligned() }
    }

    /// Layout version declared by the record.
    pub fn version(&self) -> u32 {
        self.header().version
    }

    /// The typed record, if its layout version is one this engine knows.
    pub fn registration(&self) -> Option<&PluginRegistration> {
        if self.version() != REGISTRATION_VERSION {
            return None;
        }
        // SAFETY: magic and version identify the memory as a
        // `PluginRegistration`; the borrow cannot outlive the library.
        Some(unsafe { self.record.cast::<PluginRegistration>().as_ref() })
    }

    /// Whether `registration` is the record this library exported.
    pub(crate) fn is_record(&self, registration: &PluginRegistration) -> bool {
        std::ptr::eq(
            self.record.as_ptr().cast::<PluginRegistration>(),
            registration,
        )
    }
}

impl std::fmt::Debug for DynamicLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicLibrary")
            .field("library_name", &self.library_name)
            .field("version", &self.version())
            .finish_non_exhaustive()
    }
}
