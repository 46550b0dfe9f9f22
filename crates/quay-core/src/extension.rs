//! # Extension Points
//!
//! An [`ExtensionPoint`] is a named, insertion-ordered collection of
//! [`Extension`]s with unique names. Extension points are owned by a
//! [`Context`](crate::context::Context) and addressed through
//! [`ExtensionPointId`]s; extensions never outlive the extension point that
//! holds them.
use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use log::debug;

use crate::error::{Error, Result};
use crate::plugin::PluginId;

/// Handle to an extension point inside its owning context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExtensionPointId(pub(crate) usize);

impl ExtensionPointId {
    /// Position of the extension point in creation order.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Handle to one extension: the extension point plus its position in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExtensionKey {
    pub extension_point: ExtensionPointId,
    pub index: usize,
}

/// What an extension carries. The context's own registries hold typed
/// handles so that lookups never depend on `TypeId`s, which differ between
/// copies of this crate linked into separate plugin libraries.
pub(crate) enum Payload {
    ExtensionPoint(ExtensionPointId),
    Plugin(PluginId),
    User(Box<dyn Any + Send>),
}

/// A single named contribution to an extension point.
///
/// The payload's `Drop` implementation is its release callback: it runs
/// exactly once, when the owning context is dropped.
pub struct Extension {
    name: String,
    extension_point: ExtensionPointId,
    plugin: Option<PluginId>,
    payload: Payload,
}

impl Extension {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn extension_point(&self) -> ExtensionPointId {
        self.extension_point
    }

    /// The plugin that contributed this extension, if any.
    pub fn plugin(&self) -> Option<PluginId> {
        self.plugin
    }

    /// Borrow the payload as a `T`, or `None` if it holds something else.
    pub fn payload<T: Any>(&self) -> Option<&T> {
        match &self.payload {
            Payload::ExtensionPoint(id) => (id as &dyn Any).downcast_ref::<T>(),
            Payload::Plugin(id) => (id as &dyn Any).downcast_ref::<T>(),
            Payload::User(payload) => payload.downcast_ref::<T>(),
        }
    }

    pub(crate) fn extension_point_handle(&self) -> Option<ExtensionPointId> {
        match self.payload {
            Payload::ExtensionPoint(id) => Some(id),
            _ => None,
        }
    }

    pub(crate) fn plugin_handle(&self) -> Option<PluginId> {
        match self.payload {
            Payload::Plugin(id) => Some(id),
            _ => None,
        }
    }
}

impl fmt::Debug for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extension")
            .field("name", &self.name)
            .field("extension_point", &self.extension_point)
            .field("plugin", &self.plugin)
            .finish_non_exhaustive()
    }
}

/// A named registry of extensions, keyed by unique name.
pub struct ExtensionPoint {
    id: ExtensionPointId,
    name: String,
    entries: Vec<Extension>,
    by_name: HashMap<String, usize>,
}

impl ExtensionPoint {
    pub(crate) fn new(id: ExtensionPointId, name: &str) -> Self {
        debug!(target: "quay::extensions", "Create new extension point: {}", name);
        Self {
            id,
            name: name.to_string(),
            entries: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    pub fn id(&self) -> ExtensionPointId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Insert a new extension. Fails with [`Error::Redefined`] if the name is
    /// taken; the extension point is left untouched in that case.
    pub(crate) fn add(
        &mut self,
        plugin: Option<PluginId>,
        name: &str,
        payload: Payload,
    ) -> Result<ExtensionKey> {
        if self.by_name.contains_key(name) {
            return Err(Error::Redefined(format!(
                "Already have a {} named \"{}\"",
                self.name, name
            )));
        }

        Ok(self.push(plugin, name, payload))
    }

    /// Insert without the uniqueness check; the caller has already made sure
    /// `name` is free.
    pub(crate) fn push(
        &mut self,
        plugin: Option<PluginId>,
        name: &str,
        payload: Payload,
    ) -> ExtensionKey {
        debug!(target: "quay::extensions", "Register {} \"{}\"", self.name, name);
        let index = self.entries.len();
        self.entries.push(Extension {
            name: name.to_string(),
            extension_point: self.id,
            plugin,
            payload,
        });
        self.by_name.insert(name.to_string(), index);
        ExtensionKey { extension_point: self.id, index }
    }

    /// Look up an extension by name.
    pub fn extension(&self, name: &str) -> Option<&Extension> {
        self.by_name.get(name).map(|&index| &self.entries[index])
    }

    /// Look up a payload by name. Returns `None` when the name is unknown or
    /// the payload is not a `T`.
    pub fn get<T: Any>(&self, name: &str) -> Option<&T> {
        self.extension(name).and_then(Extension::payload::<T>)
    }

    /// Like [`get`](Self::get), but absence is an [`Error::Undefined`].
    pub fn require<T: Any>(&self, name: &str) -> Result<&T> {
        let extension = self.extension(name).ok_or_else(|| {
            Error::Undefined(format!("No {} named \"{}\"", self.name, name))
        })?;
        extension.payload::<T>().ok_or_else(|| {
            Error::Undefined(format!(
                "{} \"{}\" does not hold a {}",
                self.name,
                name,
                std::any::type_name::<T>()
            ))
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The extension at `index`, in insertion order.
    pub fn at(&self, index: usize) -> Option<&Extension> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Extension> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a ExtensionPoint {
    type Item = &'a Extension;
    type IntoIter = std::slice::Iter<'a, Extension>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Debug for ExtensionPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionPoint")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("entries", &self.entries)
            .finish()
    }
}
