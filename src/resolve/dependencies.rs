//! Dependency expansion.
//!
//! Modules may name other modules they need. After the declared lists are
//! resolved and validated, each missing dependency is looked up and
//! appended to the pipeline once.

use crate::core::error::{IcesheetResult, ModuleNotFoundError};
use crate::core::module::Category;
use crate::resolve::resolver::{ModuleResolver, ResolvedModule};
use crate::validation::ModuleValidator;
use indexmap::IndexMap;
use std::collections::HashSet;

/// What to do with a dependency no location provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingDependencyPolicy {
    /// Log a warning and leave it out of the pipeline.
    #[default]
    Skip,
    /// Fail with a [`ModuleNotFoundError`].
    Fail,
}

/// Appends the dependencies of already resolved modules.
///
/// Single pass: dependencies of injected dependencies are not followed.
#[derive(Debug, Clone, Default)]
pub struct DependencyExpander {
    policy: MissingDependencyPolicy,
}

impl DependencyExpander {
    pub fn new(policy: MissingDependencyPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> MissingDependencyPolicy {
        self.policy
    }

    /// Return `modules` followed by the dependencies they declare.
    ///
    /// A dependency already in the pipeline, or required by several
    /// modules, is added once. Every injected dependency is validated
    /// before it is accepted.
    pub fn expand(
        &self,
        resolver: &ModuleResolver,
        validator: &ModuleValidator,
        mut modules: Vec<ResolvedModule>,
    ) -> IcesheetResult<Vec<ResolvedModule>> {
        let present: HashSet<String> = modules.iter().map(|m| m.name.clone()).collect();
        let mut skipped: HashSet<String> = HashSet::new();
        let mut added: IndexMap<String, ResolvedModule> = IndexMap::new();

        for resolved in &modules {
            let metadata = resolved.module.metadata();
            for dependency in &metadata.dependencies {
                if present.contains(dependency)
                    || added.contains_key(dependency)
                    || skipped.contains(dependency)
                {
                    continue;
                }

                match resolver.resolve_dependency(dependency) {
                    Some(found) => {
                        for warning in validator.validate(&found)? {
                            log::warn!("{}: {}", warning.module, warning.message);
                        }
                        log::info!(
                            "dependency '{}' of '{}' found in {}",
                            dependency,
                            resolved.name,
                            found.origin
                        );
                        added.insert(dependency.clone(), found);
                    }
                    None => match self.policy {
                        MissingDependencyPolicy::Skip => {
                            log::warn!(
                                "dependency '{}' of '{}' was not found anywhere and is left out",
                                dependency,
                                resolved.name
                            );
                            skipped.insert(dependency.clone());
                        }
                        MissingDependencyPolicy::Fail => {
                            return Err(ModuleNotFoundError {
                                name: dependency.clone(),
                                category: None,
                                searched: resolver.searched(Category::all()),
                            }
                            .into())
                        }
                    },
                }
            }
        }

        modules.extend(added.into_values());
        Ok(modules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::IcesheetError;
    use crate::core::module::{ModuleLists, NoopModule};
    use crate::modules::registry::ModuleRegistry;
    use crate::resolve::resolver::StaticExtensions;

    fn resolver() -> ModuleResolver {
        let mut registry = ModuleRegistry::new();
        registry.register(|| Box::new(NoopModule::new("a", Category::Preproc)));
        registry.register(|| {
            Box::new(NoopModule::new("b", Category::Process).with_dependency("d"))
        });
        registry.register(|| {
            Box::new(
                NoopModule::new("c", Category::Postproc)
                    .with_dependency("d")
                    .with_dependency("b"),
            )
        });
        registry.register(|| {
            Box::new(NoopModule::new("d", Category::Preproc).with_dependency("e"))
        });
        registry.register(|| Box::new(NoopModule::new("e", Category::Preproc)));
        registry.register(|| {
            Box::new(NoopModule::new("lonely", Category::Process).with_dependency("ghost"))
        });
        ModuleResolver::new(registry).with_source(
            StaticExtensions::new("working directory /run")
                .with(|| Box::new(NoopModule::new("user", Category::Process))),
        )
    }

    fn lists(pre: &[&str], process: &[&str], post: &[&str]) -> ModuleLists {
        let v = |l: &[&str]| l.iter().map(|s| s.to_string()).collect();
        ModuleLists {
            preproc: v(pre),
            process: v(process),
            postproc: v(post),
        }
    }

    fn names(modules: &[ResolvedModule]) -> Vec<&str> {
        modules.iter().map(|m| m.name.as_str()).collect()
    }

    #[test]
    fn test_shared_dependency_added_once() {
        let resolver = resolver();
        let declared = resolver.resolve_lists(&lists(&["a"], &["b"], &["c"])).unwrap();

        let expanded = DependencyExpander::default()
            .expand(&resolver, &ModuleValidator::new(), declared)
            .unwrap();

        // "b" is already in the pipeline; "d" is wanted twice; "e" is only a
        // dependency of a dependency
        assert_eq!(names(&expanded), vec!["a", "b", "c", "d"]);
        assert_eq!(expanded[3].declared, None);
    }

    #[test]
    fn test_missing_dependency_skipped_by_default() {
        let resolver = resolver();
        let declared = resolver.resolve_lists(&lists(&[], &["lonely"], &[])).unwrap();

        let expanded = DependencyExpander::default()
            .expand(&resolver, &ModuleValidator::new(), declared)
            .unwrap();
        assert_eq!(names(&expanded), vec!["lonely"]);
    }

    #[test]
    fn test_missing_dependency_fails_when_strict() {
        let resolver = resolver();
        let declared = resolver.resolve_lists(&lists(&[], &["lonely"], &[])).unwrap();

        let err = DependencyExpander::new(MissingDependencyPolicy::Fail)
            .expand(&resolver, &ModuleValidator::new(), declared)
            .unwrap_err();
        match err {
            IcesheetError::Resolve(e) => {
                let msg = e.to_string();
                assert!(msg.contains("'ghost'"));
                assert!(msg.contains("a built-in module of any category"));
                assert!(!msg.contains("built-in process module"));
                assert!(msg.contains("built-in namespace 'preproc'"));
                assert!(msg.contains("working directory /run"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_expand_without_dependencies_is_identity() {
        let resolver = resolver();
        let declared = resolver.resolve_lists(&lists(&["a"], &["user"], &[])).unwrap();
        let expanded = DependencyExpander::default()
            .expand(&resolver, &ModuleValidator::new(), declared)
            .unwrap();
        assert_eq!(names(&expanded), vec!["a", "user"]);
    }
}
