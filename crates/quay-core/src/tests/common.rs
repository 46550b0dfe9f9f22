//! Static test plugins mirroring a small dependency chain:
//! `beta` requires `alpha`, `gamma` requires `beta`, and `circular`
//! requires `gamma` and then itself.
use crate::context::Registrar;
use crate::error::{Error, Result};
use crate::plugin::PluginRegistration;

pub const LETTERS: &str = "letters";

fn letter(registrar: &mut Registrar<'_>, name: &str, position: u32) -> Result<()> {
    let letters = registrar.root_extension_point(LETTERS);
    registrar.add_extension(letters, name, position)?;
    Ok(())
}

fn register_alpha(registrar: &mut Registrar<'_>) -> Result<()> {
    letter(registrar, "alpha", 1)
}

fn register_beta(registrar: &mut Registrar<'_>) -> Result<()> {
    registrar.require_static_plugin(&ALPHA)?;
    letter(registrar, "beta", 2)
}

fn register_gamma(registrar: &mut Registrar<'_>) -> Result<()> {
    registrar.require_static_plugin(&BETA)?;
    letter(registrar, "gamma", 3)
}

fn register_circular(registrar: &mut Registrar<'_>) -> Result<()> {
    registrar.require_static_plugin(&GAMMA)?;
    registrar.require_static_plugin(&CIRCULAR)
}

fn register_broken(_registrar: &mut Registrar<'_>) -> Result<()> {
    Err(Error::Undefined("No widget named \"sprocket\"".to_string()))
}

fn register_nothing(_registrar: &mut Registrar<'_>) -> Result<()> {
    Ok(())
}

pub static ALPHA: PluginRegistration = PluginRegistration::new("alpha", register_alpha);
pub static BETA: PluginRegistration = PluginRegistration::new("beta", register_beta);
pub static GAMMA: PluginRegistration = PluginRegistration::new("gamma", register_gamma);
pub static CIRCULAR: PluginRegistration = PluginRegistration::new("circular", register_circular);
pub static BROKEN: PluginRegistration = PluginRegistration::new("broken", register_broken);

/// A second, distinct record named `alpha`.
pub static OTHER_ALPHA: PluginRegistration = PluginRegistration::new("alpha", register_nothing);

/// A record from a newer layout this engine cannot read.
pub static FUTURE: PluginRegistration = PluginRegistration {
    magic: crate::constants::REGISTRATION_MAGIC,
    version: 2,
    name: "future",
    register: register_nothing,
};
