//! Point-in-time, serializable view of a [`Context`].
use std::fmt;

use serde::Serialize;

use crate::context::Context;
use crate::plugin::LoadState;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextSnapshot {
    pub extension_points: Vec<ExtensionPointSnapshot>,
    pub plugins: Vec<PluginSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtensionPointSnapshot {
    pub name: String,
    /// Whether the extension point is listed in the root registry.
    pub root: bool,
    pub extensions: Vec<ExtensionSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtensionSnapshot {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PluginSnapshot {
    pub name: String,
    pub library: String,
    pub state: LoadState,
    /// Contributed extensions as `extension point/extension`.
    pub extensions: Vec<String>,
}

impl Context {
    pub fn snapshot(&self) -> ContextSnapshot {
        let plugin_name = |id| self.plugin(id).name().to_string();

        let extension_points = self
            .extension_points()
            .map(|point| ExtensionPointSnapshot {
                name: point.name().to_string(),
                root: self.find_extension_point(point.name()) == Some(point.id()),
                extensions: point
                    .iter()
                    .map(|extension| ExtensionSnapshot {
                        name: extension.name().to_string(),
                        plugin: extension.plugin().map(plugin_name),
                    })
                    .collect(),
            })
            .collect();

        let plugins = self
            .plugins()
            .map(|plugin| PluginSnapshot {
                name: plugin.name().to_string(),
                library: plugin.library_name().to_string(),
                state: plugin.state(),
                extensions: self
                    .plugin_extensions(plugin.id())
                    .map(|extension| {
                        format!(
                            "{}/{}",
                            self.extension_point(extension.extension_point()).name(),
                            extension.name()
                        )
                    })
                    .collect(),
            })
            .collect();

        ContextSnapshot { extension_points, plugins }
    }
}

impl ContextSnapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for ContextSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Extension points:")?;
        for point in &self.extension_points {
            let marker = if point.root { "" } else { " (unlisted)" };
            writeln!(f, "  {}{}", point.name, marker)?;
            for extension in &point.extensions {
                match &extension.plugin {
                    Some(plugin) => writeln!(f, "    - {} [{}]", extension.name, plugin)?,
                    None => writeln!(f, "    - {}", extension.name)?,
                }
            }
        }
        writeln!(f, "Plugins:")?;
        for plugin in &self.plugins {
            writeln!(f, "  {} ({}, {})", plugin.name, plugin.library, plugin.state)?;
        }
        Ok(())
    }
}
