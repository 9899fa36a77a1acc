pub mod auth_plugin_names;
pub mod capability_flags;
