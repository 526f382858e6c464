//! Module registry: the framework's built-in namespaces.

use crate::core::module::{Category, Module, ModuleMetadata};
use indexmap::IndexMap;
use std::sync::Arc;

/// Factory function for creating module instances.
pub type ModuleFactory = Arc<dyn Fn() -> Box<dyn Module> + Send + Sync>;

/// Registry entry containing metadata and factory.
#[derive(Clone)]
pub struct RegistryEntry {
    /// Factory function to create instances.
    pub factory: ModuleFactory,
    /// Cached metadata (avoids creating instance just to get metadata).
    pub metadata: ModuleMetadata,
    /// Whether this module can be created.
    pub enabled: bool,
}

/// Registry of the modules compiled into the framework.
///
/// Modules live in one of three namespaces (`preproc`, `process`,
/// `postproc`). A name is unique within its namespace; the same name may
/// exist in two namespaces.
pub struct ModuleRegistry {
    namespaces: IndexMap<Category, IndexMap<String, RegistryEntry>>,
}

impl ModuleRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        let namespaces = Category::all()
            .iter()
            .map(|c| (*c, IndexMap::new()))
            .collect();
        Self { namespaces }
    }

    /// Create a registry pre-populated with built-in modules.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::modules::builtin::register_all(&mut registry);
        registry
    }

    /// Register a module in the namespace named by its metadata.
    pub fn register<F>(&mut self, factory: F)
    where
        F: Fn() -> Box<dyn Module> + Send + Sync + 'static,
    {
        let category = factory().metadata().category;
        self.register_in(category, factory);
    }

    /// Register a module in an explicit namespace.
    pub fn register_in<F>(&mut self, category: Category, factory: F)
    where
        F: Fn() -> Box<dyn Module> + Send + Sync + 'static,
    {
        // Create a temporary instance to get metadata
        let metadata = factory().metadata();
        let name = metadata.name.clone();

        let entry = RegistryEntry {
            factory: Arc::new(factory),
            metadata,
            enabled: true,
        };

        if self.namespace_mut(category).insert(name.clone(), entry).is_some() {
            log::debug!("module '{}' re-registered in '{}'", name, category);
        }
    }

    /// Create a new instance of a module.
    pub fn create(&self, category: Category, name: &str) -> Option<Box<dyn Module>> {
        self.get_entry(category, name)
            .filter(|e| e.enabled)
            .map(|e| (e.factory)())
    }

    /// Get metadata for a module without creating an instance.
    pub fn get_metadata(&self, category: Category, name: &str) -> Option<&ModuleMetadata> {
        self.get_entry(category, name).map(|e| &e.metadata)
    }

    /// Get a registry entry.
    pub fn get_entry(&self, category: Category, name: &str) -> Option<&RegistryEntry> {
        self.namespaces.get(&category).and_then(|ns| ns.get(name))
    }

    /// Check if a module is registered in a namespace.
    pub fn contains(&self, category: Category, name: &str) -> bool {
        self.get_entry(category, name).is_some()
    }

    /// Module names of one namespace, in registration order.
    pub fn names(&self, category: Category) -> Vec<&str> {
        self.namespaces
            .get(&category)
            .map(|ns| ns.keys().map(|k| k.as_str()).collect())
            .unwrap_or_default()
    }

    /// All entries, namespace by namespace.
    pub fn entries(&self) -> impl Iterator<Item = (Category, &RegistryEntry)> {
        self.namespaces
            .iter()
            .flat_map(|(c, ns)| ns.values().map(move |e| (*c, e)))
    }

    /// First namespace holding an enabled module called `name`, searching
    /// preproc, process, then postproc.
    pub fn find(&self, name: &str) -> Option<Category> {
        Category::all().iter().copied().find(|c| {
            self.get_entry(*c, name)
                .map(|e| e.enabled)
                .unwrap_or(false)
        })
    }

    /// Enable or disable a module.
    pub fn set_enabled(&mut self, category: Category, name: &str, enabled: bool) -> bool {
        match self.namespace_mut(category).get_mut(name) {
            Some(entry) => {
                entry.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Unregister a module.
    pub fn unregister(&mut self, category: Category, name: &str) -> bool {
        self.namespace_mut(category).shift_remove(name).is_some()
    }

    /// Get the total number of registered modules.
    pub fn len(&self) -> usize {
        self.namespaces.values().map(|ns| ns.len()).sum()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn namespace_mut(&mut self, category: Category) -> &mut IndexMap<String, RegistryEntry> {
        self.namespaces.entry(category).or_default()
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Builder for creating a customized registry.
pub struct RegistryBuilder {
    registry: ModuleRegistry,
    include_builtins: bool,
}

impl RegistryBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            registry: ModuleRegistry::new(),
            include_builtins: true,
        }
    }

    /// Include or exclude built-in modules.
    pub fn with_builtins(mut self, include: bool) -> Self {
        self.include_builtins = include;
        self
    }

    /// Register a custom module.
    pub fn register<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Module> + Send + Sync + 'static,
    {
        self.registry.register(factory);
        self
    }

    /// Register a custom module in an explicit namespace.
    pub fn register_in<F>(mut self, category: Category, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Module> + Send + Sync + 'static,
    {
        self.registry.register_in(category, factory);
        self
    }

    /// Build the registry.
    ///
    /// Custom modules registered under a built-in name replace the built-in.
    pub fn build(self) -> ModuleRegistry {
        if !self.include_builtins {
            return self.registry;
        }
        let mut registry = ModuleRegistry::with_builtins();
        for (category, entry) in self.registry.entries() {
            registry
                .namespace_mut(category)
                .insert(entry.metadata.name.clone(), entry.clone());
        }
        registry
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
