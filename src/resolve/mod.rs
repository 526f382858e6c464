//! Module resolution.
//!
//! Names from the three module lists are looked up in the built-in
//! namespace of their category, then in the fallback sources (normally the
//! working directory). Dependencies declared by the resolved modules are
//! then appended once each.

pub mod dependencies;
pub mod plugin;
pub mod resolver;

pub use dependencies::{DependencyExpander, MissingDependencyPolicy};
pub use plugin::{DynamicModule, PluginManifest, WorkingDirSource, PLUGIN_ABI_VERSION};
pub use resolver::{ModuleOrigin, ModuleResolver, ModuleSource, ResolvedModule, StaticExtensions};
