//! # Context
//!
//! The [`Context`] owns every extension point, extension and plugin it
//! creates. Two root extension points exist from the start:
//!
//! - `"extension point"`, the registry of root extension points (itself
//!   included), whose payloads are [`ExtensionPointId`]s;
//! - `"plugin"`, the registry of plugins, whose payloads are [`PluginId`]s.
//!
//! Loading is a recursive, depth-first walk driven by the registration
//! routines themselves: a routine that requires another plugin loads it on
//! the spot. A plugin is marked [`LoadState::Loading`] while its routine
//! runs, so meeting it again on the same call stack is a cycle.
//!
//! A context is single-threaded. Share one across threads only behind a
//! mutex so that overlapping loads are serialized.
use std::any::Any;

use log::debug;

use crate::constants::{DEFAULT_LIBRARY, EXTENSION_POINT_REGISTRY, PLUGIN_REGISTRY};
use crate::error::{Error, Result};
use crate::extension::{Extension, ExtensionKey, ExtensionPoint, ExtensionPointId, Payload};
use crate::library::DynamicLibrary;
use crate::plugin::{Binding, LoadState, Plugin, PluginId, PluginRegistration, StaticRegistry};

pub struct Context {
    // Field order is drop order: payloads may carry drop glue that lives in a
    // plugin library, so extension points go before the plugins holding the
    // libraries open.
    extension_points: Vec<ExtensionPoint>,
    plugins: Vec<Plugin>,
    static_plugins: StaticRegistry,
    root_registry: ExtensionPointId,
    plugin_registry: ExtensionPointId,
}

impl Context {
    pub fn new() -> Self {
        Self::with_static_plugins(StaticRegistry::new())
    }

    /// Create a context whose `[default]` plugins resolve against `registry`.
    pub fn with_static_plugins(registry: StaticRegistry) -> Self {
        let mut ctx = Self {
            extension_points: Vec::new(),
            plugins: Vec::new(),
            static_plugins: registry,
            root_registry: ExtensionPointId(0),
            plugin_registry: ExtensionPointId(0),
        };
        ctx.root_registry = ctx.push_extension_point(EXTENSION_POINT_REGISTRY);
        ctx.register_root(ctx.root_registry);
        ctx.plugin_registry = ctx.root_extension_point(PLUGIN_REGISTRY);
        ctx
    }

    pub fn static_plugins(&self) -> &StaticRegistry {
        &self.static_plugins
    }

    // --- Extension points ---

    fn push_extension_point(&mut self, name: &str) -> ExtensionPointId {
        let id = ExtensionPointId(self.extension_points.len());
        self.extension_points.push(ExtensionPoint::new(id, name));
        id
    }

    fn register_root(&mut self, id: ExtensionPointId) {
        let name = self.extension_points[id.0].name().to_string();
        self.extension_points[self.root_registry.0].push(None, &name, Payload::ExtensionPoint(id));
    }

    /// Create an extension point that is owned by this context but not
    /// listed among the root extension points.
    pub fn new_extension_point(&mut self, name: &str) -> ExtensionPointId {
        self.push_extension_point(name)
    }

    /// Get the root extension point called `name`, creating and registering
    /// it on first use.
    pub fn root_extension_point(&mut self, name: &str) -> ExtensionPointId {
        if let Some(id) = self.find_extension_point(name) {
            return id;
        }
        let id = self.push_extension_point(name);
        self.register_root(id);
        id
    }

    pub fn find_extension_point(&self, name: &str) -> Option<ExtensionPointId> {
        self.root_extension_points()
            .extension(name)
            .and_then(Extension::extension_point_handle)
    }

    /// Like [`find_extension_point`](Self::find_extension_point), but an
    /// unknown name is [`Error::Undefined`].
    pub fn require_extension_point(&self, name: &str) -> Result<ExtensionPointId> {
        self.find_extension_point(name).ok_or_else(|| {
            Error::Undefined(format!("No {} named \"{}\"", EXTENSION_POINT_REGISTRY, name))
        })
    }

    /// # Panics
    ///
    /// Panics if `id` was handed out by a different context.
    pub fn extension_point(&self, id: ExtensionPointId) -> &ExtensionPoint {
        &self.extension_points[id.0]
    }

    /// The `"extension point"` registry.
    pub fn root_extension_points(&self) -> &ExtensionPoint {
        &self.extension_points[self.root_registry.0]
    }

    /// The `"plugin"` registry.
    pub fn plugin_extension_point(&self) -> &ExtensionPoint {
        &self.extension_points[self.plugin_registry.0]
    }

    /// Number of extension points ever created, root or not.
    pub fn extension_point_count(&self) -> usize {
        self.extension_points.len()
    }

    pub fn extension_point_at(&self, index: usize) -> Option<&ExtensionPoint> {
        self.extension_points.get(index)
    }

    /// Every extension point in creation order.
    pub fn extension_points(&self) -> impl Iterator<Item = &ExtensionPoint> {
        self.extension_points.iter()
    }

    /// Add an extension to `extension_point`, attributing it to `plugin`.
    pub fn add_extension<T: Any + Send>(
        &mut self,
        extension_point: ExtensionPointId,
        plugin: Option<PluginId>,
        name: &str,
        payload: T,
    ) -> Result<ExtensionKey> {
        let key = self.extension_points[extension_point.0].add(
            plugin,
            name,
            Payload::User(Box::new(payload)),
        )?;
        if let Some(plugin) = plugin {
            self.plugins[plugin.0].extensions.push(key);
        }
        Ok(key)
    }

    pub fn extension(&self, key: ExtensionKey) -> Option<&Extension> {
        self.extension_points
            .get(key.extension_point.0)
            .and_then(|point| point.at(key.index))
    }

    // --- Plugins ---

    fn push_plugin(&mut self, plugin: Plugin) -> PluginId {
        let id = plugin.id();
        let name = plugin.name().to_string();
        self.plugins.push(plugin);
        // Name uniqueness was checked by the caller.
        let key = self.extension_points[self.plugin_registry.0].push(Some(id), &name, Payload::Plugin(id));
        self.plugins[id.0].extensions.push(key);
        id
    }

    /// Add a plugin whose registration record is linked into the host.
    ///
    /// Adding the same record again is a no-op. A record may take over an
    /// unresolved dynamic plugin of the same name; any other name clash is
    /// [`Error::Redefined`].
    pub fn add_static_plugin(&mut self, registration: &'static PluginRegistration) -> Result<PluginId> {
        let Some(id) = self.find_plugin(registration.name) else {
            debug!(target: "quay::plugins", "Add static plugin {}", registration.name);
            let id = PluginId(self.plugins.len());
            return Ok(self.push_plugin(Plugin::new_static(id, registration)));
        };

        let plugin = &mut self.plugins[id.0];
        if !plugin.is_resolved() {
            debug!(
                target: "quay::plugins",
                "Static plugin {} shadows dynamic plugin from {}",
                registration.name,
                plugin.library_name()
            );
            plugin.binding = Binding::Static(registration);
            Ok(id)
        } else if plugin.is_bound_to(registration) {
            debug!(target: "quay::plugins", "Static plugin {} already added", registration.name);
            Ok(id)
        } else {
            Err(Error::Redefined(format!(
                "Plugin {} already exists in library {}",
                registration.name,
                plugin.library_name()
            )))
        }
    }

    /// Add a placeholder for a plugin that lives in `library_name` (`None`
    /// for the host process). Nothing is opened until the plugin is loaded.
    pub fn add_dynamic_plugin(&mut self, name: &str, library_name: Option<&str>) -> Result<PluginId> {
        if let Some(id) = self.find_plugin(name) {
            return Err(Error::Redefined(format!(
                "Plugin {} already exists in library {}",
                name,
                self.plugins[id.0].library_name()
            )));
        }
        debug!(
            target: "quay::plugins",
            "Add dynamic plugin {} from {}",
            name,
            library_name.unwrap_or(DEFAULT_LIBRARY)
        );
        let id = PluginId(self.plugins.len());
        Ok(self.push_plugin(Plugin::new_dynamic(id, name, library_name)))
    }

    pub fn find_plugin(&self, name: &str) -> Option<PluginId> {
        self.plugin_extension_point()
            .extension(name)
            .and_then(Extension::plugin_handle)
    }

    fn require_plugin_id(&self, name: &str) -> Result<PluginId> {
        self.find_plugin(name)
            .ok_or_else(|| Error::Undefined(format!("No {} named \"{}\"", PLUGIN_REGISTRY, name)))
    }

    /// Look up a plugin by name; unknown names are [`Error::Undefined`].
    pub fn get_plugin(&self, name: &str) -> Result<&Plugin> {
        let id = self.require_plugin_id(name)?;
        Ok(&self.plugins[id.0])
    }

    /// # Panics
    ///
    /// Panics if `id` was handed out by a different context.
    pub fn plugin(&self, id: PluginId) -> &Plugin {
        &self.plugins[id.0]
    }

    pub fn plugin_count(&self) -> usize {
        self.plugins.len()
    }

    /// The plugin at `index` in registration order.
    pub fn plugin_at(&self, index: usize) -> Option<&Plugin> {
        self.plugins.get(index)
    }

    pub fn plugins(&self) -> impl Iterator<Item = &Plugin> {
        self.plugins.iter()
    }

    /// Extensions `plugin` contributed, in contribution order.
    pub fn plugin_extensions(&self, plugin: PluginId) -> impl Iterator<Item = &Extension> + '_ {
        self.plugins[plugin.0]
            .extensions()
            .iter()
            .filter_map(|key| self.extension(*key))
    }

    // --- Loading ---

    /// Locate the registration record of an unresolved plugin. On failure
    /// the plugin stays unresolved and may be retried.
    fn resolve(&mut self, id: PluginId) -> Result<()> {
        let plugin = &self.plugins[id.0];
        if plugin.is_resolved() {
            return Ok(());
        }

        let binding = match plugin.raw_library_name() {
            None => {
                let registration = self.static_plugins.get(plugin.name()).ok_or_else(|| {
                    Error::bad_library(format!(
                        "Cannot find registration for plugin {} in library {}",
                        plugin.name(),
                        DEFAULT_LIBRARY
                    ))
                })?;
                Binding::Static(registration)
            }
            Some(library_name) => Binding::Dynamic(DynamicLibrary::open(plugin.name(), library_name)?),
        };
        self.plugins[id.0].binding = binding;
        Ok(())
    }

    /// Load a plugin, loading whatever its registration routine requires
    /// first. Loading a loaded plugin does nothing.
    ///
    /// A plugin whose routine fails stays [`LoadState::Loading`]; later
    /// attempts report [`Error::CircularDependency`].
    pub fn load_plugin(&mut self, id: PluginId) -> Result<()> {
        self.resolve(id)?;

        let plugin = &self.plugins[id.0];
        match plugin.state() {
            LoadState::Loaded => return Ok(()),
            LoadState::Loading => {
                return Err(Error::CircularDependency(format!(
                    "Circular dependency when loading plugin {}",
                    plugin.name()
                )));
            }
            LoadState::Unloaded => {}
        }

        let register = plugin.register_fn()?;
        debug!(target: "quay::plugins", "Load plugin {}", plugin.name());
        self.plugins[id.0].state = LoadState::Loading;
        register(&mut Registrar { context: self, plugin: id })?;
        self.plugins[id.0].state = LoadState::Loaded;
        Ok(())
    }

    /// Load every plugin, including any added while loading.
    pub fn load_plugins(&mut self) -> Result<()> {
        let mut index = 0;
        while index < self.plugins.len() {
            self.load_plugin(PluginId(index))?;
            index += 1;
        }
        Ok(())
    }

    /// Look up a plugin by name and load it.
    pub fn require_plugin(&mut self, name: &str) -> Result<()> {
        let id = self.require_plugin_id(name)?;
        self.load_plugin(id)
    }

    /// Load the named plugins, in order, with their dependencies.
    pub fn load_named<S: AsRef<str>>(&mut self, names: &[S]) -> Result<()> {
        for name in names {
            self.require_plugin(name.as_ref())?;
        }
        Ok(())
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("extension_points", &self.extension_points)
            .field("plugins", &self.plugins)
            .finish_non_exhaustive()
    }
}

/// What a registration routine works with: the context, plus the plugin
/// being loaded as the owner of everything it contributes.
pub struct Registrar<'a> {
    context: &'a mut Context,
    plugin: PluginId,
}

impl Registrar<'_> {
    pub fn plugin_id(&self) -> PluginId {
        self.plugin
    }

    pub fn plugin(&self) -> &Plugin {
        self.context.plugin(self.plugin)
    }

    pub fn context(&self) -> &Context {
        self.context
    }

    pub fn context_mut(&mut self) -> &mut Context {
        self.context
    }

    /// Load a plugin the context already knows by name.
    pub fn require_plugin(&mut self, name: &str) -> Result<()> {
        self.context.require_plugin(name)
    }

    /// Add `registration` to the context if needed and load it.
    pub fn require_static_plugin(&mut self, registration: &'static PluginRegistration) -> Result<()> {
        let id = self.context.add_static_plugin(registration)?;
        self.context.load_plugin(id)
    }

    pub fn root_extension_point(&mut self, name: &str) -> ExtensionPointId {
        self.context.root_extension_point(name)
    }

    pub fn new_extension_point(&mut self, name: &str) -> ExtensionPointId {
        self.context.new_extension_point(name)
    }

    /// Contribute an extension on behalf of the plugin being loaded.
    pub fn add_extension<T: Any + Send>(
        &mut self,
        extension_point: ExtensionPointId,
        name: &str,
        payload: T,
    ) -> Result<ExtensionKey> {
        self.context.add_extension(extension_point, Some(self.plugin), name, payload)
    }
}
