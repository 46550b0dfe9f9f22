//! # Quay Core
//!
//! A host defines named extension points; plugins, either linked into the
//! host or loaded from shared libraries, contribute named extensions to
//! them. Plugins declare their dependencies by requiring other plugins from
//! their registration routine, and the [`Context`] loads those first,
//! reporting cycles as [`Error::CircularDependency`].
//!
//! ```
//! use quay_core::{Context, PluginRegistration, Registrar, Result};
//!
//! fn register_greeter(registrar: &mut Registrar<'_>) -> Result<()> {
//!     let greetings = registrar.root_extension_point("greeting");
//!     registrar.add_extension(greetings, "hello", "Hello, world!")?;
//!     Ok(())
//! }
//!
//! static GREETER: PluginRegistration = PluginRegistration::new("greeter", register_greeter);
//!
//! let mut ctx = Context::new();
//! ctx.add_static_plugin(&GREETER)?;
//! ctx.load_plugins()?;
//!
//! let greetings = ctx.require_extension_point("greeting")?;
//! assert_eq!(
//!     ctx.extension_point(greetings).get::<&str>("hello"),
//!     Some(&"Hello, world!")
//! );
//! # Ok::<(), quay_core::Error>(())
//! ```
pub mod constants;
pub mod context;
pub mod discovery;
pub mod error;
pub mod extension;
pub mod library;
pub mod plugin;
pub mod snapshot;
pub mod utils;

pub use context::{Context, Registrar};
pub use discovery::{PluginListEntry, PluginListFormat};
pub use error::{Error, ErrorKind, Result};
pub use extension::{Extension, ExtensionKey, ExtensionPoint, ExtensionPointId};
pub use plugin::{LoadState, Plugin, PluginId, PluginRegistration, RegisterFn, StaticRegistry};
pub use snapshot::ContextSnapshot;

#[cfg(test)]
mod tests;
