//! Plugins linked into the `quay` binary.
use quay_core::{Context, PluginRegistration, Registrar, Result, StaticRegistry};

/// Root extension point the `host` plugin fills with facts about the binary.
pub const HOST_INFO: &str = "host info";

fn register_host(registrar: &mut Registrar<'_>) -> Result<()> {
    let info = registrar.root_extension_point(HOST_INFO);
    registrar.add_extension(info, "version", env!("CARGO_PKG_VERSION"))?;
    Ok(())
}

pub static HOST: PluginRegistration = PluginRegistration::new("host", register_host);

/// Records plugin lists can refer to with a `~` library.
pub fn static_plugins() -> StaticRegistry {
    StaticRegistry::new().with(&HOST)
}

/// Make the built-in plugins known to `ctx`. A discovered placeholder of the
/// same name is taken over.
pub fn add_to(ctx: &mut Context) -> Result<()> {
    ctx.add_static_plugin(&HOST)?;
    Ok(())
}
