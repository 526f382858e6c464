//! Module trait and module metadata.
//!
//! A module is a stateless unit of behavior. It registers the options it
//! understands, then takes part in the three lifecycle phases of a run,
//! reading and writing the shared [`State`].

use crate::core::error::ModuleResult;
use crate::core::state::State;
use crate::params::registry::ParamRegistry;
use crate::params::set::ParameterSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Namespace a module is looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Pre-processing: loads or synthesizes the initial state.
    Preproc,
    /// Processing: the physics, run every time step.
    Process,
    /// Post-processing: output and diagnostics.
    Postproc,
}

impl Category {
    /// Namespace name used for lookup and in messages.
    pub fn namespace(&self) -> &'static str {
        match self {
            Category::Preproc => "preproc",
            Category::Process => "process",
            Category::Postproc => "postproc",
        }
    }

    /// Name of the parameter holding this category's module list.
    pub fn list_key(&self) -> &'static str {
        match self {
            Category::Preproc => "modules_preproc",
            Category::Process => "modules_process",
            Category::Postproc => "modules_postproc",
        }
    }

    /// All categories in pipeline order.
    pub fn all() -> &'static [Category] {
        &[Category::Preproc, Category::Process, Category::Postproc]
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.namespace())
    }
}

/// One of the entry points every module must provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    RegisterParams,
    Initialize,
    Update,
    Finalize,
}

impl Capability {
    /// The capabilities a module needs to be admitted into a pipeline.
    pub const REQUIRED: [Capability; 4] = [
        Capability::RegisterParams,
        Capability::Initialize,
        Capability::Update,
        Capability::Finalize,
    ];

    /// Entry point name.
    pub fn name(&self) -> &'static str {
        match self {
            Capability::RegisterParams => "register_params",
            Capability::Initialize => "initialize",
            Capability::Update => "update",
            Capability::Finalize => "finalize",
        }
    }

    fn bit(&self) -> u8 {
        1 << (*self as u8)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Set of capabilities a module exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CapabilitySet(u8);

impl CapabilitySet {
    /// The empty set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// All required capabilities.
    pub fn all() -> Self {
        Capability::REQUIRED
            .iter()
            .fold(Self::empty(), |set, cap| set.with(*cap))
    }

    /// Return a copy with `capability` added.
    pub fn with(mut self, capability: Capability) -> Self {
        self.insert(capability);
        self
    }

    /// Return a copy with `capability` removed.
    pub fn without(mut self, capability: Capability) -> Self {
        self.0 &= !capability.bit();
        self
    }

    /// Add a capability.
    pub fn insert(&mut self, capability: Capability) {
        self.0 |= capability.bit();
    }

    /// Check for a capability.
    pub fn contains(&self, capability: Capability) -> bool {
        self.0 & capability.bit() != 0
    }

    /// Required capabilities not in this set.
    pub fn missing(&self) -> CapabilitySet {
        Self(Self::all().0 & !self.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterate in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        Capability::REQUIRED
            .into_iter()
            .filter(move |cap| self.contains(*cap))
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), |set, cap| set.with(cap))
    }
}

impl fmt::Display for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(|c| c.name()).collect();
        f.write_str(&names.join(", "))
    }
}

/// A lifecycle call the executor makes on a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    Initialize,
    Update,
    Finalize,
}

impl Lifecycle {
    /// The capability backing this call.
    pub fn capability(&self) -> Capability {
        match self {
            Lifecycle::Initialize => Capability::Initialize,
            Lifecycle::Update => Capability::Update,
            Lifecycle::Finalize => Capability::Finalize,
        }
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.capability().name())
    }
}

/// Metadata describing a module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleMetadata {
    /// Unique identifier, also the lookup name (e.g., "time")
    pub name: String,
    /// Namespace the module ships in
    pub category: Category,
    /// Detailed description
    pub description: String,
    /// Version string
    pub version: String,
    /// Author or source
    pub author: String,
    /// Names of modules this one needs in the pipeline
    pub dependencies: Vec<String>,
}

impl ModuleMetadata {
    /// Create a new metadata builder.
    pub fn builder(name: impl Into<String>, category: Category) -> ModuleMetadataBuilder {
        ModuleMetadataBuilder::new(name, category)
    }

    /// Whether the module declares any dependency.
    pub fn has_dependencies(&self) -> bool {
        !self.dependencies.is_empty()
    }
}

/// Builder for ModuleMetadata.
pub struct ModuleMetadataBuilder {
    name: String,
    category: Category,
    description: String,
    version: String,
    author: String,
    dependencies: Vec<String>,
}

impl ModuleMetadataBuilder {
    /// Create a new builder with required fields.
    pub fn new(name: impl Into<String>, category: Category) -> Self {
        Self {
            name: name.into(),
            category,
            description: String::new(),
            version: "1.0.0".to_string(),
            author: "Icesheet".to_string(),
            dependencies: Vec::new(),
        }
    }

    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the version.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Set the author.
    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    /// Add a dependency.
    pub fn dependency(mut self, name: impl Into<String>) -> Self {
        self.dependencies.push(name.into());
        self
    }

    /// Add multiple dependencies.
    pub fn dependencies(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.dependencies.extend(names.into_iter().map(|n| n.into()));
        self
    }

    /// Build the metadata.
    pub fn build(self) -> ModuleMetadata {
        ModuleMetadata {
            name: self.name,
            category: self.category,
            description: self.description,
            version: self.version,
            author: self.author,
            dependencies: self.dependencies,
        }
    }
}

/// The core trait for simulation modules.
///
/// # Lifecycle
///
/// 1. `register_params`: called once while the parameter schema is built.
/// 2. `initialize`: called once, in pipeline order, before any update.
/// 3. `update`: called once per time step, in pipeline order.
/// 4. `finalize`: called once after the last update.
///
/// Modules keep no run data of their own; everything they produce goes into
/// the [`State`], which lets the same module instance be reused across runs.
///
/// # Example Implementation
///
/// ```ignore
/// struct Smb;
///
/// impl Module for Smb {
///     fn metadata(&self) -> ModuleMetadata {
///         ModuleMetadata::builder("smb_simple", Category::Process)
///             .description("Linear mass balance with elevation")
///             .dependency("time")
///             .build()
///     }
///
///     fn register_params(&self, params: &mut ParamRegistry) {
///         params.add("smb_ela", 3000.0, "Equilibrium line altitude (m)");
///     }
///
///     fn initialize(&self, _params: &ParameterSet, state: &mut State) -> ModuleResult {
///         let usurf = state.get_grid("usurf")?.clone();
///         state.set("smb", Grid::zeros(usurf.rows(), usurf.cols()));
///         Ok(())
///     }
///
///     fn update(&self, params: &ParameterSet, state: &mut State) -> ModuleResult {
///         let ela = params.get_float("smb_ela")?;
///         // ...
///         Ok(())
///     }
///
///     fn finalize(&self, _params: &ParameterSet, _state: &mut State) -> ModuleResult {
///         Ok(())
///     }
/// }
/// ```
pub trait Module: Send + Sync {
    /// Get the metadata for this module.
    fn metadata(&self) -> ModuleMetadata;

    /// Entry points this module actually provides.
    ///
    /// Statically compiled modules provide all of them. Modules loaded from
    /// dynamic libraries report the symbols they export, and the validator
    /// rejects any module with gaps.
    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::all()
    }

    /// Register the options this module understands.
    fn register_params(&self, params: &mut ParamRegistry);

    /// Prepare the state before the first time step.
    fn initialize(&self, params: &ParameterSet, state: &mut State) -> ModuleResult;

    /// Advance the state by one time step.
    fn update(&self, params: &ParameterSet, state: &mut State) -> ModuleResult;

    /// Wrap up after the last time step.
    fn finalize(&self, params: &ParameterSet, state: &mut State) -> ModuleResult;
}

/// Module lists per category, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleLists {
    pub preproc: Vec<String>,
    pub process: Vec<String>,
    pub postproc: Vec<String>,
}

impl ModuleLists {
    /// Names declared for a category.
    pub fn get(&self, category: Category) -> &[String] {
        match category {
            Category::Preproc => &self.preproc,
            Category::Process => &self.process,
            Category::Postproc => &self.postproc,
        }
    }

    /// Replace the names declared for a category.
    pub fn set(&mut self, category: Category, names: Vec<String>) {
        match category {
            Category::Preproc => self.preproc = names,
            Category::Process => self.process = names,
            Category::Postproc => self.postproc = names,
        }
    }

    /// All names in pipeline order.
    pub fn iter(&self) -> impl Iterator<Item = (Category, &str)> {
        Category::all()
            .iter()
            .flat_map(move |c| self.get(*c).iter().map(move |n| (*c, n.as_str())))
    }
}

/// A module that does nothing.
///
/// Useful as a placeholder and as a template for new modules.
#[derive(Debug, Clone)]
pub struct NoopModule {
    name: String,
    category: Category,
    dependencies: Vec<String>,
}

impl NoopModule {
    pub fn new(name: impl Into<String>, category: Category) -> Self {
        Self {
            name: name.into(),
            category,
            dependencies: Vec::new(),
        }
    }

    /// Declare a dependency.
    pub fn with_dependency(mut self, name: impl Into<String>) -> Self {
        self.dependencies.push(name.into());
        self
    }
}

impl Module for NoopModule {
    fn metadata(&self) -> ModuleMetadata {
        ModuleMetadata::builder(self.name.clone(), self.category)
            .description("Does nothing")
            .dependencies(self.dependencies.clone())
            .build()
    }

    fn register_params(&self, _params: &mut ParamRegistry) {}

    fn initialize(&self, _params: &ParameterSet, _state: &mut State) -> ModuleResult {
        Ok(())
    }

    fn update(&self, _params: &ParameterSet, _state: &mut State) -> ModuleResult {
        Ok(())
    }

    fn finalize(&self, _params: &ParameterSet, _state: &mut State) -> ModuleResult {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_builder() {
        let metadata = ModuleMetadata::builder("print_info", Category::Postproc)
            .description("Prints run information")
            .dependency("time")
            .build();

        assert_eq!(metadata.name, "print_info");
        assert_eq!(metadata.category, Category::Postproc);
        assert_eq!(metadata.dependencies, vec!["time".to_string()]);
        assert!(metadata.has_dependencies());
    }

    #[test]
    fn test_capability_set() {
        let all = CapabilitySet::all();
        assert_eq!(all.len(), 4);
        assert!(all.missing().is_empty());

        let partial = all.without(Capability::Update).without(Capability::Finalize);
        assert!(!partial.contains(Capability::Update));
        assert_eq!(partial.missing().to_string(), "update, finalize");

        let collected: CapabilitySet =
            [Capability::Initialize, Capability::RegisterParams].into_iter().collect();
        assert_eq!(collected.to_string(), "register_params, initialize");
    }

    #[test]
    fn test_module_lists_order() {
        let lists = ModuleLists {
            preproc: vec!["a".into()],
            process: vec!["b".into(), "c".into()],
            postproc: vec!["d".into()],
        };
        let names: Vec<_> = lists.iter().map(|(_, n)| n).collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
        assert_eq!(lists.get(Category::Process).len(), 2);
    }

    #[test]
    fn test_category_keys() {
        assert_eq!(Category::Process.to_string(), "process");
        assert_eq!(Category::Postproc.list_key(), "modules_postproc");
    }
}
