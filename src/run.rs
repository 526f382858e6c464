//! Run driver.
//!
//! [`Simulation`] performs the whole setup sequence (options, module lists,
//! resolution, validation, dependency expansion, parameter merge) and then
//! drives the pipeline until the simulated time reaches `time_end`.

use crate::core::error::IcesheetResult;
use crate::core::module::{Category, ModuleLists};
use crate::core::state::{RunId, State};
use crate::core::types::Value;
use crate::execution::engine::{ExecutionOptions, ExecutionStats, Pipeline, PipelinePhase};
use crate::logging::RunLogger;
use crate::modules::registry::ModuleRegistry;
use crate::params::cli;
use crate::params::file::{check_deprecated_entries, param_file_path, ParamFile};
use crate::params::registry::{
    register_core_params, CollisionPolicy, ParamRegistry, CORE_OWNER, DEFAULT_PARAM_FILE,
};
use crate::params::set::ParameterSet;
use crate::resolve::dependencies::{DependencyExpander, MissingDependencyPolicy};
use crate::resolve::plugin::WorkingDirSource;
use crate::resolve::resolver::{ModuleResolver, ModuleSource};
use crate::validation::pipeline::ModuleValidator;
use indexmap::IndexMap;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Builder for a [`Simulation`].
pub struct SimulationBuilder {
    registry: Option<ModuleRegistry>,
    sources: Vec<Box<dyn ModuleSource>>,
    validator: ModuleValidator,
    collision_policy: CollisionPolicy,
    dependency_policy: MissingDependencyPolicy,
    execution: ExecutionOptions,
}

impl SimulationBuilder {
    pub fn new() -> Self {
        Self {
            registry: None,
            sources: Vec::new(),
            validator: ModuleValidator::new(),
            collision_policy: CollisionPolicy::default(),
            dependency_policy: MissingDependencyPolicy::default(),
            execution: ExecutionOptions::default(),
        }
    }

    /// Use a custom built-in registry instead of the default one.
    pub fn with_registry(mut self, registry: ModuleRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Add a fallback source, searched after the working directory.
    pub fn with_source(mut self, source: impl ModuleSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    pub fn with_validator(mut self, validator: ModuleValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.collision_policy = policy;
        self
    }

    pub fn with_dependency_policy(mut self, policy: MissingDependencyPolicy) -> Self {
        self.dependency_policy = policy;
        self
    }

    pub fn with_execution_options(mut self, options: ExecutionOptions) -> Self {
        self.execution = options;
        self
    }

    /// Run the setup sequence for the given command-line arguments.
    ///
    /// `args` holds option overrides only (`--name value` pairs), without a
    /// program or subcommand name.
    pub fn setup(self, args: &[String]) -> IcesheetResult<Simulation> {
        let start = Instant::now();

        let mut schema = ParamRegistry::with_policy(self.collision_policy);
        register_core_params(&mut schema);

        let working_dir = match cli::peek(args, "working_dir") {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => PathBuf::from("."),
        };
        let param_file =
            cli::peek(args, "param_file").unwrap_or_else(|| DEFAULT_PARAM_FILE.to_string());
        let param_path = param_file_path(&working_dir, &param_file);

        let file = if param_path.is_file() {
            log::info!("reading parameters from {}", param_path.display());
            Some(ParamFile::load(&param_path)?)
        } else {
            log::info!(
                "no parameter file at {}, using default module lists",
                param_path.display()
            );
            None
        };

        let module_lists = module_lists(&schema, file.as_ref(), args)?;

        let mut resolver = ModuleResolver::new(self.registry.unwrap_or_default())
            .with_source(WorkingDirSource::new(&working_dir));
        for source in self.sources {
            resolver.add_source(source);
        }

        let resolved = resolver.resolve_lists(&module_lists)?;
        self.validator.check(&resolved)?;
        let modules = DependencyExpander::new(self.dependency_policy).expand(
            &resolver,
            &self.validator,
            resolved,
        )?;

        for resolved in &modules {
            schema.set_owner(resolved.name.clone());
            resolved.module.register_params(&mut schema);
        }
        schema.set_owner(CORE_OWNER);

        let file_values = match &file {
            Some(file) => file.overrides(&schema)?.accepted,
            None => IndexMap::new(),
        };
        let cli_values = cli::parse_overrides(&schema, args)?;
        let params = ParameterSet::finalize(&schema, [&file_values, &cli_values])?;

        let saved_params = if params.get_bool("print_params").unwrap_or(false) {
            Some(params.save(&working_dir)?)
        } else {
            None
        };

        let state = State::new(RunLogger::from_params(&params)?);
        let pipeline = Pipeline::with_options(modules, self.execution);

        log::info!(
            "run {} set up in {:?}: {}",
            state.run_id(),
            start.elapsed(),
            pipeline.names().join(", ")
        );
        state
            .logger()
            .info(format_args!("modules: {}", pipeline.names().join(", ")));

        Ok(Simulation {
            working_dir,
            module_lists,
            schema,
            params,
            state,
            pipeline,
            saved_params,
        })
    }
}

impl Default for SimulationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Module lists from the parameter file (or core defaults), with command-line
/// lists taking precedence. Retired entries are rejected here, before any
/// module is looked up.
fn module_lists(
    schema: &ParamRegistry,
    file: Option<&ParamFile>,
    args: &[String],
) -> IcesheetResult<ModuleLists> {
    let mut lists = match file {
        Some(file) => file.module_lists()?,
        None => default_lists(schema),
    };

    for category in Category::all() {
        if let Some(names) = cli::peek_list(args, category.list_key())? {
            lists.set(*category, names);
        }
    }

    let values: IndexMap<String, Value> = Category::all()
        .iter()
        .map(|c| {
            let names = lists.get(*c).iter().map(|n| Value::from(n.as_str())).collect();
            (c.list_key().to_string(), Value::List(names))
        })
        .collect();
    check_deprecated_entries(|key| values.get(key))?;

    Ok(lists)
}

fn default_lists(schema: &ParamRegistry) -> ModuleLists {
    let mut lists = ModuleLists::default();
    for category in Category::all() {
        let names = schema
            .get(category.list_key())
            .and_then(|d| d.default_value.as_string_list())
            .unwrap_or_default();
        lists.set(*category, names);
    }
    lists
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: RunId,
    /// Executed modules, in order.
    pub modules: Vec<String>,
    pub iterations: u64,
    /// Wall time from initialize to the end of finalize.
    pub duration: Duration,
    pub stats: ExecutionStats,
}

/// A fully set up run.
pub struct Simulation {
    working_dir: PathBuf,
    module_lists: ModuleLists,
    schema: ParamRegistry,
    params: ParameterSet,
    state: State,
    pipeline: Pipeline,
    saved_params: Option<PathBuf>,
}

impl Simulation {
    pub fn builder() -> SimulationBuilder {
        SimulationBuilder::new()
    }

    /// Set up a run with the default built-in modules.
    pub fn setup(args: &[String]) -> IcesheetResult<Self> {
        SimulationBuilder::new().setup(args)
    }

    /// Initialize, update until `t` reaches `time_end`, finalize.
    ///
    /// Without a `t` state field or a `time_end` option no update is run.
    pub fn run(&mut self) -> IcesheetResult<RunSummary> {
        let start = Instant::now();

        self.pipeline.initialize(&self.params, &mut self.state)?;
        while self.should_continue() {
            self.pipeline.update(&self.params, &mut self.state)?;
        }
        self.pipeline.finalize(&self.params, &mut self.state)?;

        let summary = RunSummary {
            run_id: self.state.run_id(),
            modules: self.pipeline.names().iter().map(|n| n.to_string()).collect(),
            iterations: self.pipeline.stats().iterations,
            duration: start.elapsed(),
            stats: self.pipeline.stats().clone(),
        };
        log::info!(
            "run {} finished after {} iterations in {:?}",
            summary.run_id,
            summary.iterations,
            summary.duration
        );
        self.state.logger().flush();
        Ok(summary)
    }

    fn should_continue(&self) -> bool {
        match (self.state.get_float("t"), self.params.get_float("time_end")) {
            (Ok(t), Ok(end)) => t < end,
            _ => false,
        }
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Module lists as declared, before dependency expansion.
    pub fn module_lists(&self) -> &ModuleLists {
        &self.module_lists
    }

    /// The full option schema (core and every pipeline module).
    pub fn schema(&self) -> &ParamRegistry {
        &self.schema
    }

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut State {
        &mut self.state
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn phase(&self) -> PipelinePhase {
        self.pipeline.phase()
    }

    /// Where the merged parameters were written, if `print_params` was set.
    pub fn saved_params(&self) -> Option<&Path> {
        self.saved_params.as_deref()
    }
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("working_dir", &self.working_dir)
            .field("pipeline", &self.pipeline)
            .field("run_id", &self.state.run_id())
            .finish()
    }
}
