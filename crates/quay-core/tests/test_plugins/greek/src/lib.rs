//! Test plugins shipped in one library.
//!
//! - `alpha` creates the root extension point `letters`;
//! - `beta` requires `alpha` by name;
//! - `gamma` requires `beta` through its record;
//! - `circular` requires `gamma`, then itself;
//! - `impostor` exports a record named `delta`.
use quay_core::{export_plugin, Registrar, Result};

fn letter(registrar: &mut Registrar<'_>, name: &str, position: u32) -> Result<()> {
    let letters = registrar.root_extension_point("letters");
    registrar.add_extension(letters, name, position)?;
    Ok(())
}

fn register_alpha(registrar: &mut Registrar<'_>) -> Result<()> {
    letter(registrar, "alpha", 1)
}

fn register_beta(registrar: &mut Registrar<'_>) -> Result<()> {
    registrar.require_plugin("alpha")?;
    letter(registrar, "beta", 2)
}

fn register_gamma(registrar: &mut Registrar<'_>) -> Result<()> {
    registrar.require_static_plugin(&beta__plugin)?;
    letter(registrar, "gamma", 3)
}

fn register_circular(registrar: &mut Registrar<'_>) -> Result<()> {
    registrar.require_static_plugin(&gamma__plugin)?;
    registrar.require_plugin("circular")
}

fn register_impostor(_registrar: &mut Registrar<'_>) -> Result<()> {
    Ok(())
}

export_plugin!(alpha__plugin, "alpha", register_alpha);
export_plugin!(beta__plugin, "beta", register_beta);
export_plugin!(gamma__plugin, "gamma", register_gamma);
export_plugin!(circular__plugin, "circular", register_circular);
export_plugin!(impostor__plugin, "delta", register_impostor);
