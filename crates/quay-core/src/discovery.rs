//! # Plugin Discovery
//!
//! Plugin lists are flat mappings from plugin name to library name:
//!
//! ```yaml
//! logging: quay-logging
//! metrics: /opt/quay/lib/libmetrics.so
//! host: ~
//! ```
//!
//! A library of `~` (or the empty string) means the plugin is linked into the
//! host. [`Context::find_plugins`] walks search paths for list files and adds
//! a dynamic plugin for every entry; nothing is loaded.
use std::path::{Path, PathBuf};

use log::debug;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::utils::find_files_with_extensions;

/// Supported plugin-list file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginListFormat {
    /// YAML format (.yaml, .yml) - requires "yaml-config" feature
    #[cfg(feature = "yaml-config")]
    Yaml,
    /// TOML format (.toml) - requires "toml-config" feature
    #[cfg(feature = "toml-config")]
    Toml,
}

impl PluginListFormat {
    /// File extensions recognised for the enabled formats.
    pub fn extensions() -> &'static [&'static str] {
        &[
            #[cfg(feature = "yaml-config")]
            "yaml",
            #[cfg(feature = "yaml-config")]
            "yml",
            #[cfg(feature = "toml-config")]
            "toml",
        ]
    }

    /// Determine format from file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_lowercase().as_str() {
                #[cfg(feature = "yaml-config")]
                "yaml" | "yml" => Some(PluginListFormat::Yaml),
                #[cfg(feature = "toml-config")]
                "toml" => Some(PluginListFormat::Toml),
                _ => None,
            })
    }
}

/// One line of a plugin list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginListEntry {
    pub name: String,
    /// `None` for plugins linked into the host.
    pub library: Option<String>,
}

impl PluginListEntry {
    fn new(name: String, library: Option<String>) -> Self {
        let library = library.filter(|lib| !lib.is_empty() && lib != "~");
        Self { name, library }
    }
}

/// Parse a plugin list, keeping the order entries appear in.
pub fn parse_plugin_list(text: &str, format: PluginListFormat) -> Result<Vec<PluginListEntry>> {
    match format {
        #[cfg(feature = "yaml-config")]
        PluginListFormat::Yaml => parse_yaml(text),
        #[cfg(feature = "toml-config")]
        PluginListFormat::Toml => parse_toml(text),
    }
}

#[cfg(feature = "yaml-config")]
fn parse_yaml(text: &str) -> Result<Vec<PluginListEntry>> {
    use serde_yaml::Value;

    fn scalar(value: &Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    let document: Value = serde_yaml::from_str(text)
        .map_err(|e| Error::bad_config_with(format!("Invalid YAML plugin list: {}", e), e))?;
    let Value::Mapping(mapping) = document else {
        return Err(Error::bad_config("Expected a mapping value for plugin list"));
    };

    mapping
        .iter()
        .map(|(key, value)| {
            let name = scalar(key)
                .ok_or_else(|| Error::bad_config("Expected a scalar value for plugin name"))?;
            let library = match value {
                Value::Null => None,
                other => Some(scalar(other).ok_or_else(|| {
                    Error::bad_config(format!("Expected a scalar value for library name of plugin {}", name))
                })?),
            };
            Ok(PluginListEntry::new(name, library))
        })
        .collect()
}

#[cfg(feature = "toml-config")]
fn parse_toml(text: &str) -> Result<Vec<PluginListEntry>> {
    use toml::Value;

    let table: toml::Table = toml::from_str(text)
        .map_err(|e| Error::bad_config_with(format!("Invalid TOML plugin list: {}", e), e))?;

    table
        .into_iter()
        .map(|(name, value)| {
            let library = match value {
                Value::String(s) => s,
                Value::Array(_) | Value::Table(_) => {
                    return Err(Error::bad_config(format!(
                        "Expected a scalar value for library name of plugin {}",
                        name
                    )));
                }
                other => other.to_string(),
            };
            Ok(PluginListEntry::new(name, Some(library)))
        })
        .collect()
}

/// Read and parse one plugin-list file; the format follows its extension.
pub fn read_plugin_list<P: AsRef<Path>>(path: P) -> Result<Vec<PluginListEntry>> {
    let path = path.as_ref();
    debug!(target: "quay::discovery", "Load plugin list from {}", path.display());
    let format = PluginListFormat::from_path(path).ok_or_else(|| {
        Error::bad_config(format!("Unsupported plugin list format: {}", path.display()))
    })?;
    let text = std::fs::read_to_string(path).map_err(|e| {
        Error::bad_config_with(format!("Cannot read plugin list {}: {}", path.display(), e), e)
    })?;
    parse_plugin_list(&text, format).map_err(|e| match e {
        Error::BadConfig { message, source } => Error::BadConfig {
            message: format!("{}: {}", path.display(), message),
            source,
        },
        other => other,
    })
}

/// Plugin-list files under `search_path`, in walk order.
pub fn plugin_list_files<P: AsRef<Path>>(search_path: P) -> Result<Vec<PathBuf>> {
    let search_path = search_path.as_ref();
    debug!(target: "quay::discovery", "Look for plugins in {}", search_path.display());
    find_files_with_extensions(search_path, PluginListFormat::extensions()).map_err(|e| {
        Error::bad_config_with(
            format!("Cannot search plugin registry {}: {}", search_path.display(), e),
            e,
        )
    })
}

impl Context {
    /// Add a dynamic plugin for every entry, skipping names not in `filter`
    /// when one is given. Returns how many plugins were added.
    pub fn add_plugin_list(&mut self, entries: &[PluginListEntry], filter: Option<&[&str]>) -> Result<usize> {
        let mut added = 0;
        for entry in entries {
            let library = entry.library.as_deref();
            if let Some(filter) = filter {
                if !filter.contains(&entry.name.as_str()) {
                    debug!(
                        target: "quay::discovery",
                        "Skip plugin {} from library {}",
                        entry.name,
                        library.unwrap_or(crate::constants::DEFAULT_LIBRARY)
                    );
                    continue;
                }
            }
            self.add_dynamic_plugin(&entry.name, library)?;
            added += 1;
        }
        Ok(added)
    }

    /// Walk each search path for plugin lists and add the plugins they name.
    ///
    /// An empty `search_paths` is [`Error::BadConfig`]. Stops at the first
    /// failure; plugins added before it stay added.
    pub fn find_plugins<P: AsRef<Path>>(&mut self, search_paths: &[P], filter: Option<&[&str]>) -> Result<usize> {
        if search_paths.is_empty() {
            return Err(Error::bad_config("No registry paths given"));
        }

        let mut added = 0;
        for search_path in search_paths {
            for file in plugin_list_files(search_path)? {
                let entries = read_plugin_list(&file)?;
                added += self.add_plugin_list(&entries, filter)?;
            }
        }
        Ok(added)
    }
}
