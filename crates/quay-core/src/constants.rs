/// Marker every plugin registration record starts with ("PLUG" in ASCII).
pub const REGISTRATION_MAGIC: u32 = 0x504c_5547;

/// Registration record layout version this engine writes and understands.
pub const REGISTRATION_VERSION: u32 = 1;

/// Suffix appended to a plugin name to form its registration symbol.
pub const REGISTRATION_SYMBOL_SUFFIX: &str = "__plugin";

/// Library name reported for plugins that live in the host process.
pub const DEFAULT_LIBRARY: &str = "[default]";

/// Name of the root extension point that lists every root extension point.
pub const EXTENSION_POINT_REGISTRY: &str = "extension point";

/// Name of the root extension point holding every plugin.
pub const PLUGIN_REGISTRY: &str = "plugin";
