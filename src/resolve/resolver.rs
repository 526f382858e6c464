//! Turning module names into module instances.

use crate::core::error::{ModuleNotFoundError, PluginError, ResolveError};
use crate::core::module::{Category, Module, ModuleLists};
use crate::modules::registry::{ModuleFactory, ModuleRegistry};
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// A place outside the built-in namespaces where modules can be found.
pub trait ModuleSource: Send + Sync {
    /// Human-readable description of where this source looks.
    fn location(&self) -> String;

    /// Load the module called `name`.
    ///
    /// `Ok(None)` means this source has no such module. An error means the
    /// module exists but could not be loaded.
    fn load(&self, name: &str) -> Result<Option<Box<dyn Module>>, PluginError>;

    /// Names of the modules this source can provide.
    fn available(&self) -> Vec<String>;
}

/// Where a resolved module was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleOrigin {
    /// A built-in namespace.
    Builtin(Category),
    /// A fallback source, identified by its location.
    Extension(String),
}

impl fmt::Display for ModuleOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleOrigin::Builtin(category) => write!(f, "built-in namespace '{}'", category),
            ModuleOrigin::Extension(location) => write!(f, "{}", location),
        }
    }
}

/// A loaded module together with how it was found.
pub struct ResolvedModule {
    /// Name the module was requested under.
    pub name: String,
    /// Module list it was declared in, `None` for injected dependencies.
    pub declared: Option<Category>,
    /// Where it was found.
    pub origin: ModuleOrigin,
    /// The module itself.
    pub module: Box<dyn Module>,
}

impl fmt::Debug for ResolvedModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedModule")
            .field("name", &self.name)
            .field("declared", &self.declared)
            .field("origin", &self.origin)
            .finish()
    }
}

/// Resolves module names against the built-in registry, then fallback sources.
pub struct ModuleResolver {
    registry: ModuleRegistry,
    sources: Vec<Box<dyn ModuleSource>>,
}

impl ModuleResolver {
    /// Resolver over `registry` with no fallback.
    pub fn new(registry: ModuleRegistry) -> Self {
        Self {
            registry,
            sources: Vec::new(),
        }
    }

    /// Add a fallback source, searched after the ones already added.
    pub fn with_source(mut self, source: impl ModuleSource + 'static) -> Self {
        self.add_source(Box::new(source));
        self
    }

    pub fn add_source(&mut self, source: Box<dyn ModuleSource>) {
        self.sources.push(source);
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn sources(&self) -> impl Iterator<Item = &dyn ModuleSource> {
        self.sources.iter().map(|s| s.as_ref())
    }

    /// Resolve an ordered list of names declared under `category`.
    ///
    /// The output has the same order as `names`. The first name that
    /// cannot be found stops resolution.
    pub fn resolve(
        &self,
        names: &[String],
        category: Category,
    ) -> Result<Vec<ResolvedModule>, ResolveError> {
        names
            .iter()
            .map(|name| self.resolve_one(name, category))
            .collect()
    }

    /// Resolve the three module lists and concatenate them in category order.
    ///
    /// A name declared more than once keeps its first position; later
    /// occurrences are dropped with a warning.
    pub fn resolve_lists(&self, lists: &ModuleLists) -> Result<Vec<ResolvedModule>, ResolveError> {
        let mut seen: IndexMap<&str, Category> = IndexMap::new();
        let mut resolved = Vec::new();
        for (category, name) in lists.iter() {
            if let Some(first) = seen.get(name) {
                log::warn!(
                    "module '{}' in {} is already declared in {} and is ignored",
                    name,
                    category.list_key(),
                    first.list_key()
                );
                continue;
            }
            seen.insert(name, category);
            resolved.push(self.resolve_one(name, category)?);
        }
        Ok(resolved)
    }

    /// Resolve one name declared under `category`.
    pub fn resolve_one(&self, name: &str, category: Category) -> Result<ResolvedModule, ResolveError> {
        if let Some(module) = self.registry.create(category, name) {
            log::debug!("module '{}' found in namespace '{}'", name, category);
            return Ok(ResolvedModule {
                name: name.to_string(),
                declared: Some(category),
                origin: ModuleOrigin::Builtin(category),
                module,
            });
        }

        for source in &self.sources {
            if let Some(module) = source.load(name)? {
                log::debug!("module '{}' found in {}", name, source.location());
                return Ok(ResolvedModule {
                    name: name.to_string(),
                    declared: Some(category),
                    origin: ModuleOrigin::Extension(source.location()),
                    module,
                });
            }
        }

        Err(ModuleNotFoundError {
            name: name.to_string(),
            category: Some(category),
            searched: self.searched(&[category]),
        }
        .into())
    }

    /// Look a dependency up in every namespace, then in the fallbacks.
    ///
    /// The first location holding the name wins. Misses and load failures
    /// at one location are logged and the search moves on, so `None` means
    /// no location could provide the module.
    pub fn resolve_dependency(&self, name: &str) -> Option<ResolvedModule> {
        for category in Category::all() {
            match self.registry.create(*category, name) {
                Some(module) => {
                    return Some(ResolvedModule {
                        name: name.to_string(),
                        declared: None,
                        origin: ModuleOrigin::Builtin(*category),
                        module,
                    })
                }
                None => log::info!("dependency '{}' not in namespace '{}'", name, category),
            }
        }

        for source in &self.sources {
            match source.load(name) {
                Ok(Some(module)) => {
                    return Some(ResolvedModule {
                        name: name.to_string(),
                        declared: None,
                        origin: ModuleOrigin::Extension(source.location()),
                        module,
                    })
                }
                Ok(None) => log::info!("dependency '{}' not in {}", name, source.location()),
                Err(e) => log::warn!("dependency '{}' skipped: {}", name, e),
            }
        }

        None
    }

    /// Locations searched for a name, in search order.
    pub fn searched(&self, categories: &[Category]) -> Vec<String> {
        categories
            .iter()
            .map(|c| ModuleOrigin::Builtin(*c).to_string())
            .chain(self.sources.iter().map(|s| s.location()))
            .collect()
    }
}

/// Modules provided in-process rather than from the built-in namespaces.
///
/// Behaves like a working directory full of modules, for hosts that link
/// their own modules in and for tests.
#[derive(Clone, Default)]
pub struct StaticExtensions {
    location: String,
    factories: IndexMap<String, ModuleFactory>,
}

impl StaticExtensions {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            factories: IndexMap::new(),
        }
    }

    /// Add a module under the name its metadata reports.
    pub fn with<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Module> + Send + Sync + 'static,
    {
        let name = factory().metadata().name;
        self.factories.insert(name, Arc::new(factory));
        self
    }
}

impl ModuleSource for StaticExtensions {
    fn location(&self) -> String {
        self.location.clone()
    }

    fn load(&self, name: &str) -> Result<Option<Box<dyn Module>>, PluginError> {
        Ok(self.factories.get(name).map(|f| f()))
    }

    fn available(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }
}
