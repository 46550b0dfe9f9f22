//! # Plugins
//!
//! A [`Plugin`] is a named unit of functionality backed by a
//! [`PluginRegistration`] record. The record either lives in the host
//! process (a *static* plugin) or is located inside a shared library the
//! first time the plugin is loaded (a *dynamic* plugin).
//!
//! Registration records share one fixed layout, so a host can validate a
//! record found through an untyped symbol lookup before trusting it: the
//! record starts with [`REGISTRATION_MAGIC`] and a layout version.
//!
//! Shared libraries export their records with [`export_plugin!`]. Because the
//! registration routine is an ordinary Rust function, plugin libraries must be
//! built with the same toolchain and `quay-core` version as the host.
use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::constants::{DEFAULT_LIBRARY, REGISTRATION_MAGIC, REGISTRATION_VERSION};
use crate::context::Registrar;
use crate::error::{Error, Result};
use crate::extension::ExtensionKey;
use crate::library::DynamicLibrary;

/// Handle to a plugin inside its owning context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PluginId(pub(crate) usize);

impl PluginId {
    /// Position of the plugin in registration order.
    pub fn index(self) -> usize {
        self.0
    }
}

/// The registration routine of a plugin.
///
/// It runs once, when the plugin is loaded. It may require other plugins
/// (which loads them first) and contribute extensions through the
/// [`Registrar`]. Returning an error aborts the load.
pub type RegisterFn = fn(&mut Registrar<'_>) -> Result<()>;

/// Fixed-layout registration record.
///
/// The first two fields never change position; `name` and `register` are
/// only read once `version` is known to be [`REGISTRATION_VERSION`].
#[repr(C)]
pub struct PluginRegistration {
    pub magic: u32,
    pub version: u32,
    pub name: &'static str,
    pub register: RegisterFn,
}

impl PluginRegistration {
    pub const fn new(name: &'static str, register: RegisterFn) -> Self {
        Self {
            magic: REGISTRATION_MAGIC,
            version: REGISTRATION_VERSION,
            name,
            register,
        }
    }
}

impl fmt::Debug for PluginRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistration")
            .field("magic", &format_args!("{:#010x}", self.magic))
            .field("version", &self.version)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Export a registration record from a plugin library.
///
/// The symbol must be named `<plugin name>__plugin` for the loader to find
/// it:
///
/// ```ignore
/// fn register(registrar: &mut quay_core::Registrar<'_>) -> quay_core::Result<()> {
///     Ok(())
/// }
///
/// quay_core::export_plugin!(logging__plugin, "logging", register);
/// ```
#[macro_export]
macro_rules! export_plugin {
    ($symbol:ident, $name:literal, $register:path) => {
        #[unsafe(no_mangle)]
        #[allow(non_upper_case_globals)]
        pub static $symbol: $crate::plugin::PluginRegistration =
            $crate::plugin::PluginRegistration::new($name, $register);
    };
}

/// Registrations linked into the host process, keyed by plugin name.
///
/// A context consults this table when a plugin list names a plugin without a
/// library (`~` or the empty string).
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    entries: HashMap<&'static str, &'static PluginRegistration>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`register`](Self::register) for tables assembled
    /// from distinct records. A conflicting record is ignored and logged.
    pub fn with(mut self, registration: &'static PluginRegistration) -> Self {
        if let Err(e) = self.register(registration) {
            log::warn!(target: "quay::plugins", "{}", e);
        }
        self
    }

    /// Add a record. Registering the same record twice is a no-op; a
    /// different record under a taken name is [`Error::Redefined`].
    pub fn register(&mut self, registration: &'static PluginRegistration) -> Result<()> {
        match self.entries.get(registration.name) {
            Some(existing) if std::ptr::eq(*existing, registration) => Ok(()),
            Some(_) => Err(Error::Redefined(format!(
                "Static plugin {} is already registered",
                registration.name
            ))),
            None => {
                self.entries.insert(registration.name, registration);
                Ok(())
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&'static PluginRegistration> {
        self.entries.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered plugin names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.entries.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

/// Load progress of a plugin. There is no way back to `Unloaded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadState {
    Unloaded,
    Loading,
    Loaded,
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self {
            LoadState::Unloaded => "unloaded",
            LoadState::Loading => "loading",
            LoadState::Loaded => "loaded",
        };
        f.write_str(state)
    }
}

/// Where a plugin's registration record comes from.
pub(crate) enum Binding {
    /// Dynamic placeholder; resolved on first load.
    Unresolved,
    Static(&'static PluginRegistration),
    Dynamic(DynamicLibrary),
}

pub struct Plugin {
    id: PluginId,
    name: String,
    /// `None` means the host process itself.
    library_name: Option<String>,
    pub(crate) binding: Binding,
    pub(crate) state: LoadState,
    pub(crate) extensions: Vec<ExtensionKey>,
}

impl Plugin {
    pub(crate) fn new_static(id: PluginId, registration: &'static PluginRegistration) -> Self {
        Self {
            id,
            name: registration.name.to_string(),
            library_name: None,
            binding: Binding::Static(registration),
            state: LoadState::Unloaded,
            extensions: Vec::new(),
        }
    }

    pub(crate) fn new_dynamic(id: PluginId, name: &str, library_name: Option<&str>) -> Self {
        Self {
            id,
            name: name.to_string(),
            library_name: library_name.map(str::to_string),
            binding: Binding::Unresolved,
            state: LoadState::Unloaded,
            extensions: Vec::new(),
        }
    }

    pub fn id(&self) -> PluginId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Library the plugin was declared in, or `[default]` for the host.
    pub fn library_name(&self) -> &str {
        self.library_name.as_deref().unwrap_or(DEFAULT_LIBRARY)
    }

    pub(crate) fn raw_library_name(&self) -> Option<&str> {
        self.library_name.as_deref()
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn is_loaded(&self) -> bool {
        self.state == LoadState::Loaded
    }

    /// Whether the registration record has been located.
    pub fn is_resolved(&self) -> bool {
        !matches!(self.binding, Binding::Unresolved)
    }

    /// Extensions this plugin contributed, in contribution order.
    pub fn extensions(&self) -> &[ExtensionKey] {
        &self.extensions
    }

    /// Whether `registration` is the record this plugin is bound to.
    pub(crate) fn is_bound_to(&self, registration: &PluginRegistration) -> bool {
        match &self.binding {
            Binding::Unresolved => false,
            Binding::Static(existing) => std::ptr::eq(*existing, registration),
            Binding::Dynamic(library) => library.is_record(registration),
        }
    }

    /// Validate the bound record and hand out its registration routine.
    pub(crate) fn register_fn(&self) -> Result<RegisterFn> {
        let registration = match &self.binding {
            Binding::Unresolved => {
                return Err(Error::bad_library(format!(
                    "Plugin {} has no registration",
                    self.name
                )));
            }
            Binding::Static(registration) if registration.version == REGISTRATION_VERSION => {
                *registration
            }
            Binding::Static(registration) => {
                return Err(self.unknown_version(registration.version));
            }
            Binding::Dynamic(library) => library
                .registration()
                .ok_or_else(|| self.unknown_version(library.version()))?,
        };

        if registration.name != self.name {
            return Err(Error::bad_library(format!(
                "{} holds a registration for plugin {}, not {}",
                self.library_name(),
                registration.name,
                self.name
            )));
        }
        Ok(registration.register)
    }

    fn unknown_version(&self, version: u32) -> Error {
        Error::bad_library(format!(
            "Cannot handle plugin version {} for {}",
            version, self.name
        ))
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("library_name", &self.library_name())
            .field("resolved", &self.is_resolved())
            .field("state", &self.state)
            .field("extensions", &self.extensions)
            .finish()
    }
}
