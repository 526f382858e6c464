//! End-to-end tests of resolution, validation, dependency expansion and
//! execution through the public API.

use icesheet::prelude::*;

/// Appends "<name>.<lifecycle>" to the `calls` state field.
struct Recorder {
    name: &'static str,
    category: Category,
    dependencies: Vec<&'static str>,
    capabilities: CapabilitySet,
}

impl Recorder {
    fn new(name: &'static str, category: Category) -> Self {
        Self {
            name,
            category,
            dependencies: Vec::new(),
            capabilities: CapabilitySet::all(),
        }
    }

    fn depends_on(mut self, name: &'static str) -> Self {
        self.dependencies.push(name);
        self
    }

    fn without(mut self, capability: Capability) -> Self {
        self.capabilities = self.capabilities.without(capability);
        self
    }

    fn record(&self, lifecycle: Lifecycle, state: &mut State) -> ModuleResult {
        let mut calls = state
            .get("calls")
            .ok()
            .and_then(Value::as_list)
            .map(<[Value]>::to_vec)
            .unwrap_or_default();
        calls.push(Value::from(format!("{}.{}", self.name, lifecycle)));
        state.set("calls", calls);
        Ok(())
    }
}

impl Module for Recorder {
    fn metadata(&self) -> ModuleMetadata {
        ModuleMetadata::builder(self.name, self.category)
            .dependencies(self.dependencies.clone())
            .build()
    }

    fn capabilities(&self) -> CapabilitySet {
        self.capabilities
    }

    fn register_params(&self, params: &mut ParamRegistry) {
        params.add(&format!("{}_enabled", self.name), true, "Test option");
    }

    fn initialize(&self, _params: &ParameterSet, state: &mut State) -> ModuleResult {
        self.record(Lifecycle::Initialize, state)
    }

    fn update(&self, _params: &ParameterSet, state: &mut State) -> ModuleResult {
        self.record(Lifecycle::Update, state)
    }

    fn finalize(&self, _params: &ParameterSet, state: &mut State) -> ModuleResult {
        self.record(Lifecycle::Finalize, state)
    }
}

fn lists(pre: &[&str], process: &[&str], post: &[&str]) -> ModuleLists {
    let v = |l: &[&str]| l.iter().map(|s| s.to_string()).collect();
    ModuleLists {
        preproc: v(pre),
        process: v(process),
        postproc: v(post),
    }
}

fn registry() -> ModuleRegistry {
    RegistryBuilder::new()
        .with_builtins(false)
        .register(|| Box::new(Recorder::new("A", Category::Preproc)))
        .register(|| Box::new(Recorder::new("B", Category::Process).depends_on("D")))
        .register(|| Box::new(Recorder::new("C", Category::Postproc)))
        .register(|| Box::new(Recorder::new("D", Category::Preproc)))
        .register(|| Box::new(Recorder::new("E", Category::Process).depends_on("D")))
        .register(|| {
            Box::new(Recorder::new("broken", Category::Process).without(Capability::Finalize))
        })
        .build()
}

fn build(
    resolver: &ModuleResolver,
    lists: &ModuleLists,
) -> IcesheetResult<Vec<ResolvedModule>> {
    let validator = ModuleValidator::new();
    let resolved = resolver.resolve_lists(lists)?;
    validator.check(&resolved)?;
    DependencyExpander::default().expand(resolver, &validator, resolved)
}

fn names(modules: &[ResolvedModule]) -> Vec<&str> {
    modules.iter().map(|m| m.name.as_str()).collect()
}

fn calls(state: &State) -> Vec<String> {
    state.get("calls").unwrap().as_string_list().unwrap()
}

#[test]
fn test_order_follows_categories() {
    let resolver = ModuleResolver::new(registry());
    // declaration order inside a category is kept, categories are concatenated
    let modules = build(&resolver, &lists(&["D", "A"], &[], &["C"])).unwrap();
    assert_eq!(names(&modules), vec!["D", "A", "C"]);
}

#[test]
fn test_dependency_runs_after_declared_modules() {
    let resolver = ModuleResolver::new(registry());
    let modules = build(&resolver, &lists(&["A"], &["B"], &["C"])).unwrap();
    assert_eq!(names(&modules), vec!["A", "B", "C", "D"]);
    assert_eq!(modules[3].origin, ModuleOrigin::Builtin(Category::Preproc));
    assert_eq!(modules[3].declared, None);

    let mut pipeline = Pipeline::new(modules);
    let params = ParameterSet::default();
    let mut state = State::default();
    pipeline.initialize(&params, &mut state).unwrap();
    pipeline.update(&params, &mut state).unwrap();
    pipeline.finalize(&params, &mut state).unwrap();

    let calls = calls(&state);
    assert_eq!(
        &calls[..4],
        &["A.initialize", "B.initialize", "C.initialize", "D.initialize"]
    );
    assert_eq!(&calls[4..8], &["A.update", "B.update", "C.update", "D.update"]);
    assert_eq!(calls.iter().filter(|c| c.ends_with(".initialize")).count(), 4);
}

#[test]
fn test_shared_dependency_single_instance() {
    let resolver = ModuleResolver::new(registry());
    let modules = build(&resolver, &lists(&[], &["B", "E"], &[])).unwrap();
    assert_eq!(names(&modules), vec!["B", "E", "D"]);
}

#[test]
fn test_declared_dependency_not_duplicated() {
    let resolver = ModuleResolver::new(registry());
    let modules = build(&resolver, &lists(&["D"], &["B"], &[])).unwrap();
    assert_eq!(names(&modules), vec!["D", "B"]);
}

#[test]
fn test_fallback_module_behaves_like_builtin() {
    let resolver = ModuleResolver::new(registry()).with_source(
        StaticExtensions::new("working directory /glacier")
            .with(|| Box::new(Recorder::new("user", Category::Process).depends_on("D"))),
    );
    let modules = build(&resolver, &lists(&["A"], &["user"], &[])).unwrap();

    assert_eq!(names(&modules), vec!["A", "user", "D"]);
    assert_eq!(
        modules[1].origin,
        ModuleOrigin::Extension("working directory /glacier".to_string())
    );

    let mut pipeline = Pipeline::new(modules);
    let params = ParameterSet::default();
    let mut state = State::default();
    pipeline.initialize(&params, &mut state).unwrap();
    assert!(calls(&state).contains(&"user.initialize".to_string()));
}

#[test]
fn test_builtin_shadows_fallback() {
    let resolver = ModuleResolver::new(registry()).with_source(
        StaticExtensions::new("working directory /glacier")
            .with(|| Box::new(Recorder::new("A", Category::Preproc))),
    );
    let modules = build(&resolver, &lists(&["A"], &[], &[])).unwrap();
    assert_eq!(modules[0].origin, ModuleOrigin::Builtin(Category::Preproc));
}

#[test]
fn test_wrong_namespace_not_found() {
    let resolver = ModuleResolver::new(registry());
    // "A" lives in preproc only
    let err = build(&resolver, &lists(&[], &["A"], &[])).unwrap_err();
    match err {
        IcesheetError::Resolve(ResolveError::NotFound(err)) => {
            assert_eq!(err.name, "A");
            assert_eq!(err.searched, vec!["built-in namespace 'process'".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_missing_capability_rejected_before_expansion() {
    let resolver = ModuleResolver::new(registry());
    let err = build(&resolver, &lists(&[], &["broken"], &[])).unwrap_err();
    match err {
        IcesheetError::InvalidModule(err) => {
            assert_eq!(err.module(), "broken");
            assert!(err.to_string().contains("finalize"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_missing_dependency_policies() {
    let registry = RegistryBuilder::new()
        .with_builtins(false)
        .register(|| Box::new(Recorder::new("orphan", Category::Process).depends_on("ghost")))
        .build();
    let resolver = ModuleResolver::new(registry);
    let validator = ModuleValidator::new();
    let declared = || resolver.resolve_lists(&lists(&[], &["orphan"], &[])).unwrap();

    let skipped = DependencyExpander::new(MissingDependencyPolicy::Skip)
        .expand(&resolver, &validator, declared())
        .unwrap();
    assert_eq!(names(&skipped), vec!["orphan"]);

    let err = DependencyExpander::new(MissingDependencyPolicy::Fail)
        .expand(&resolver, &validator, declared())
        .unwrap_err();
    assert!(err.to_string().contains("'ghost'"));
}

#[test]
fn test_module_options_owned_by_module() {
    let resolver = ModuleResolver::new(registry());
    let modules = build(&resolver, &lists(&["A"], &["B"], &[])).unwrap();

    let mut schema = ParamRegistry::with_core();
    for module in &modules {
        schema.set_owner(module.name.clone());
        module.module.register_params(&mut schema);
    }
    assert_eq!(schema.get("D_enabled").unwrap().owner, "D");

    let params = ParameterSet::defaults(&schema).unwrap();
    assert_eq!(params.get_bool("B_enabled"), Ok(true));
    assert!(!params.contains("C_enabled"));
}
