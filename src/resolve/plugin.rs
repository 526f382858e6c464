//! Working-directory plugins.
//!
//! A user module `<name>` lives next to the parameter file as a manifest,
//! `<name>.toml`, and a dynamic library:
//!
//! ```toml
//! name = "volume_check"
//! version = "0.1.0"
//! api = "^0.9"
//! description = "Report the ice volume at the end of the run"
//! # library = "target/release/libvolume_check.so"
//! dependencies = ["time"]
//! ```
//!
//! `library` defaults to the platform file name for `<name>`
//! (`lib<name>.so`, `lib<name>.dylib` or `<name>.dll`), relative to the
//! working directory.
//!
//! The library exports `icesheet_abi_version` and the entry points it
//! implements (`icesheet_register_params`, `icesheet_initialize`,
//! `icesheet_update`, `icesheet_finalize`). Use [`export_module!`] to
//! generate them from a [`Module`] implementation. Host and plugin must be
//! built with the same toolchain.
//!
//! [`export_module!`]: crate::export_module

use crate::core::error::{ModuleError, ModuleResult, PluginError};
use crate::core::module::{Capability, CapabilitySet, Category, Module, ModuleMetadata};
use crate::core::state::State;
use crate::params::registry::ParamRegistry;
use crate::params::set::ParameterSet;
use crate::resolve::resolver::ModuleSource;
use libloading::Library;
use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Layout version of the exported entry points.
pub const PLUGIN_ABI_VERSION: u32 = 1;

/// Version of the module API offered to plugins.
pub fn host_api_version() -> Version {
    Version::new(0, 9, 0)
}

/// Signature of `icesheet_abi_version`.
pub type AbiVersionFn = extern "C" fn() -> u32;
/// Signature of `icesheet_register_params`.
pub type RegisterParamsFn = fn(&mut ParamRegistry);
/// Signature of the three lifecycle entry points.
pub type LifecycleFn = fn(&ParameterSet, &mut State) -> ModuleResult;

const ABI_SYMBOL: &[u8] = b"icesheet_abi_version\0";
const REGISTER_SYMBOL: &[u8] = b"icesheet_register_params\0";
const INITIALIZE_SYMBOL: &[u8] = b"icesheet_initialize\0";
const UPDATE_SYMBOL: &[u8] = b"icesheet_update\0";
const FINALIZE_SYMBOL: &[u8] = b"icesheet_finalize\0";

/// Plugin manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Module name
    pub name: String,
    /// Plugin version
    #[serde(default = "default_version")]
    pub version: String,
    /// Module API versions the plugin works with
    pub api: VersionReq,
    /// Library path, relative to the manifest
    #[serde(default)]
    pub library: Option<PathBuf>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author: String,
    /// Namespace the module would belong to if it were built in
    #[serde(default)]
    pub category: Option<Category>,
    /// Names of modules this one needs in the pipeline
    #[serde(default)]
    pub dependencies: Vec<String>,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

impl PluginManifest {
    /// Parse a manifest. `path` is only used in error messages.
    pub fn parse(text: &str, path: &Path) -> Result<Self, PluginError> {
        toml::from_str(text).map_err(|e| PluginError::InvalidManifest {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Read and parse a manifest file.
    pub fn load(path: &Path) -> Result<Self, PluginError> {
        let text = fs::read_to_string(path).map_err(|e| PluginError::InvalidManifest {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        Self::parse(&text, path)
    }

    /// Fail if this host does not offer an API version the plugin accepts.
    pub fn check_api(&self) -> Result<(), PluginError> {
        let host = host_api_version();
        if self.api.matches(&host) {
            Ok(())
        } else {
            Err(PluginError::IncompatibleVersion {
                name: self.name.clone(),
                required: self.api.clone(),
                host,
            })
        }
    }

    /// Library path for a manifest found in `dir`.
    pub fn library_path(&self, dir: &Path) -> PathBuf {
        match &self.library {
            Some(library) => dir.join(library),
            None => dir.join(libloading::library_filename(&self.name)),
        }
    }

    fn metadata(&self) -> ModuleMetadata {
        ModuleMetadata::builder(self.name.clone(), self.category.unwrap_or(Category::Process))
            .description(self.description.clone())
            .version(self.version.clone())
            .author(self.author.clone())
            .dependencies(self.dependencies.clone())
            .build()
    }
}

/// Entry points found in a plugin library.
#[derive(Clone, Copy, Default)]
pub struct EntryPoints {
    pub register_params: Option<RegisterParamsFn>,
    pub initialize: Option<LifecycleFn>,
    pub update: Option<LifecycleFn>,
    pub finalize: Option<LifecycleFn>,
}

impl EntryPoints {
    /// Capabilities backed by an exported symbol.
    pub fn capabilities(&self) -> CapabilitySet {
        let mut set = CapabilitySet::empty();
        if self.register_params.is_some() {
            set.insert(Capability::RegisterParams);
        }
        if self.initialize.is_some() {
            set.insert(Capability::Initialize);
        }
        if self.update.is_some() {
            set.insert(Capability::Update);
        }
        if self.finalize.is_some() {
            set.insert(Capability::Finalize);
        }
        set
    }

    fn call(
        entry: Option<LifecycleFn>,
        capability: Capability,
        params: &ParameterSet,
        state: &mut State,
    ) -> ModuleResult {
        match entry {
            Some(f) => f(params, state),
            None => Err(ModuleError::Unsupported(capability.name())),
        }
    }
}

/// A module backed by a dynamic library.
pub struct DynamicModule {
    manifest: PluginManifest,
    entry: EntryPoints,
    // Keeps the code behind `entry` mapped; must outlive it.
    _library: Library,
}

impl DynamicModule {
    /// Load the library a manifest points at.
    pub fn load(manifest: PluginManifest, dir: &Path) -> Result<Self, PluginError> {
        manifest.check_api()?;
        let path = manifest.library_path(dir);

        // SAFETY: loading runs the library's initializers; plugins are
        // trusted code placed in the working directory by the user.
        let library = unsafe { Library::new(&path) }.map_err(|e| PluginError::LoadFailed {
            path: path.clone(),
            error: e.to_string(),
        })?;

        // SAFETY: symbol types follow the documented plugin ABI, checked
        // through `icesheet_abi_version` before any other symbol is used.
        let entry = unsafe {
            let abi = library
                .get::<AbiVersionFn>(ABI_SYMBOL)
                .map_err(|e| PluginError::LoadFailed {
                    path: path.clone(),
                    error: e.to_string(),
                })?;
            let plugin_abi = abi();
            if plugin_abi != PLUGIN_ABI_VERSION {
                return Err(PluginError::AbiMismatch {
                    name: manifest.name.clone(),
                    plugin_abi,
                    host_abi: PLUGIN_ABI_VERSION,
                });
            }

            EntryPoints {
                register_params: library.get::<RegisterParamsFn>(REGISTER_SYMBOL).ok().map(|s| *s),
                initialize: library.get::<LifecycleFn>(INITIALIZE_SYMBOL).ok().map(|s| *s),
                update: library.get::<LifecycleFn>(UPDATE_SYMBOL).ok().map(|s| *s),
                finalize: library.get::<LifecycleFn>(FINALIZE_SYMBOL).ok().map(|s| *s),
            }
        };

        log::info!(
            "loaded plugin '{}' v{} from {} ({})",
            manifest.name,
            manifest.version,
            path.display(),
            entry.capabilities()
        );

        Ok(Self {
            manifest,
            entry,
            _library: library,
        })
    }

    pub fn manifest(&self) -> &PluginManifest {
        &self.manifest
    }
}

impl Module for DynamicModule {
    fn metadata(&self) -> ModuleMetadata {
        self.manifest.metadata()
    }

    fn capabilities(&self) -> CapabilitySet {
        self.entry.capabilities()
    }

    fn register_params(&self, params: &mut ParamRegistry) {
        if let Some(f) = self.entry.register_params {
            f(params);
        }
    }

    fn initialize(&self, params: &ParameterSet, state: &mut State) -> ModuleResult {
        EntryPoints::call(self.entry.initialize, Capability::Initialize, params, state)
    }

    fn update(&self, params: &ParameterSet, state: &mut State) -> ModuleResult {
        EntryPoints::call(self.entry.update, Capability::Update, params, state)
    }

    fn finalize(&self, params: &ParameterSet, state: &mut State) -> ModuleResult {
        EntryPoints::call(self.entry.finalize, Capability::Finalize, params, state)
    }
}

/// Plugins in a working directory.
#[derive(Debug, Clone)]
pub struct WorkingDirSource {
    dir: PathBuf,
}

impl WorkingDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Manifest path for a module name.
    pub fn manifest_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.toml"))
    }
}

impl ModuleSource for WorkingDirSource {
    fn location(&self) -> String {
        format!("working directory {}", self.dir.display())
    }

    fn load(&self, name: &str) -> Result<Option<Box<dyn Module>>, PluginError> {
        let path = self.manifest_path(name);
        if !path.is_file() {
            return Ok(None);
        }
        let manifest = PluginManifest::load(&path)?;
        let module = DynamicModule::load(manifest, &self.dir)?;
        Ok(Some(Box::new(module)))
    }

    fn available(&self) -> Vec<String> {
        let pattern = format!(
            "{}/*.toml",
            glob::Pattern::escape(&self.dir.display().to_string())
        );
        let Ok(paths) = glob::glob(&pattern) else {
            return Vec::new();
        };
        paths
            .filter_map(Result::ok)
            .filter(|path| PluginManifest::load(path).is_ok())
            .filter_map(|path| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .collect()
    }
}

/// Export a [`Module`] from a plugin library.
///
/// Takes an expression building the module; it is evaluated on every call,
/// so it should be cheap (typically a unit struct).
///
/// ```ignore
/// icesheet::export_module!(VolumeCheck);
/// ```
#[macro_export]
macro_rules! export_module {
    ($module:expr) => {
        #[no_mangle]
        pub extern "C" fn icesheet_abi_version() -> u32 {
            $crate::resolve::plugin::PLUGIN_ABI_VERSION
        }

        #[no_mangle]
        pub fn icesheet_register_params(params: &mut $crate::params::registry::ParamRegistry) {
            $crate::core::module::Module::register_params(&$module, params)
        }

        #[no_mangle]
        pub fn icesheet_initialize(
            params: &$crate::params::set::ParameterSet,
            state: &mut $crate::core::state::State,
        ) -> $crate::core::error::ModuleResult {
            $crate::core::module::Module::initialize(&$module, params, state)
        }

        #[no_mangle]
        pub fn icesheet_update(
            params: &$crate::params::set::ParameterSet,
            state: &mut $crate::core::state::State,
        ) -> $crate::core::error::ModuleResult {
            $crate::core::module::Module::update(&$module, params, state)
        }

        #[no_mangle]
        pub fn icesheet_finalize(
            params: &$crate::params::set::ParameterSet,
            state: &mut $crate::core::state::State,
        ) -> $crate::core::error::ModuleResult {
            $crate::core::module::Module::finalize(&$module, params, state)
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"
name = "volume_check"
version = "0.2.0"
api = "^0.9"
description = "Report the ice volume"
dependencies = ["time"]
"#;

    fn noop_init(_: &ParameterSet, state: &mut State) -> ModuleResult {
        state.set("initialized", true);
        Ok(())
    }

    #[test]
    fn test_manifest_parse() {
        let manifest = PluginManifest::parse(MANIFEST, Path::new("volume_check.toml")).unwrap();
        assert_eq!(manifest.name, "volume_check");
        assert!(manifest.check_api().is_ok());

        let metadata = manifest.metadata();
        assert_eq!(metadata.version, "0.2.0");
        assert_eq!(metadata.category, Category::Process);
        assert_eq!(metadata.dependencies, vec!["time".to_string()]);
    }

    #[test]
    fn test_manifest_invalid() {
        let err = PluginManifest::parse("name = ", Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, PluginError::InvalidManifest { .. }));

        let err = PluginManifest::parse("name = \"x\"", Path::new("x.toml")).unwrap_err();
        assert!(err.to_string().contains("api"));
    }

    #[test]
    fn test_incompatible_api() {
        let manifest =
            PluginManifest::parse("name = \"old\"\napi = \"^0.4\"", Path::new("old.toml")).unwrap();
        let err = manifest.check_api().unwrap_err();
        assert!(matches!(err, PluginError::IncompatibleVersion { .. }));
        assert!(err.to_string().contains("0.9.0"));
    }

    #[test]
    fn test_default_library_path() {
        let manifest = PluginManifest::parse(MANIFEST, Path::new("m.toml")).unwrap();
        let path = manifest.library_path(Path::new("/run"));
        assert_eq!(path.parent(), Some(Path::new("/run")));
        assert!(path.to_string_lossy().contains("volume_check"));
    }

    #[test]
    fn test_entry_point_capabilities() {
        let entry = EntryPoints {
            initialize: Some(noop_init),
            ..EntryPoints::default()
        };
        let caps = entry.capabilities();
        assert!(caps.contains(Capability::Initialize));
        assert_eq!(caps.missing().to_string(), "register_params, update, finalize");

        let mut state = State::default();
        let params = ParameterSet::default();
        EntryPoints::call(entry.initialize, Capability::Initialize, &params, &mut state).unwrap();
        assert_eq!(state.get_bool("initialized"), Ok(true));

        let err = EntryPoints::call(entry.update, Capability::Update, &params, &mut state)
            .unwrap_err();
        assert!(matches!(err, ModuleError::Unsupported("update")));
    }

    #[test]
    fn test_working_dir_source() {
        let temp = tempfile::tempdir().unwrap();
        let source = WorkingDirSource::new(temp.path());

        // no manifest: not found, not an error
        assert!(source.load("volume_check").unwrap().is_none());

        // manifest without a library: a load error
        fs::write(source.manifest_path("volume_check"), MANIFEST).unwrap();
        assert!(matches!(
            source.load("volume_check"),
            Err(PluginError::LoadFailed { .. })
        ));

        fs::write(temp.path().join("notes.toml"), "not = [valid").unwrap();
        assert_eq!(source.available(), vec!["volume_check".to_string()]);
        assert!(source.location().starts_with("working directory "));
    }
}
