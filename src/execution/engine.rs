//! Pipeline execution.
//!
//! A [`Pipeline`] owns the final module list and drives the three lifecycle
//! passes over it. The caller decides how many update passes to run.

use crate::core::error::ExecutionError;
use crate::core::module::Lifecycle;
use crate::core::state::State;
use crate::execution::progress::{ProgressCallback, ProgressUpdate};
use crate::params::set::ParameterSet;
use crate::resolve::resolver::ResolvedModule;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Where a pipeline is in its lifecycle.
///
/// `Init -> Running -> Done`, or `Aborted` as soon as any module call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelinePhase {
    /// Built, nothing called yet.
    Init,
    /// Every module initialized; updates may run.
    Running,
    /// Every module finalized.
    Done,
    /// A module call failed.
    Aborted,
}

impl fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelinePhase::Init => "init",
            PipelinePhase::Running => "running",
            PipelinePhase::Done => "done",
            PipelinePhase::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Execution options.
#[derive(Clone)]
pub struct ExecutionOptions {
    /// Whether to store each module's cumulative update time in the state
    /// as `tcomp_<module>` (seconds).
    pub record_timings: bool,
    /// Progress callback.
    pub progress_callback: Option<Arc<ProgressCallback>>,
}

impl fmt::Debug for ExecutionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionOptions")
            .field("record_timings", &self.record_timings)
            .field("progress_callback", &self.progress_callback.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            record_timings: true,
            progress_callback: None,
        }
    }
}

impl ExecutionOptions {
    /// Create a new options builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable/disable `tcomp_<module>` state fields.
    pub fn with_record_timings(mut self, record: bool) -> Self {
        self.record_timings = record;
        self
    }

    /// Set progress callback.
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(Box::new(callback)));
        self
    }
}

/// Time spent in one module.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModuleTiming {
    pub initialize: Duration,
    pub update: Duration,
    pub finalize: Duration,
    /// Number of update calls.
    pub updates: u64,
}

impl ModuleTiming {
    fn record(&mut self, lifecycle: Lifecycle, elapsed: Duration) {
        match lifecycle {
            Lifecycle::Initialize => self.initialize += elapsed,
            Lifecycle::Update => {
                self.update += elapsed;
                self.updates += 1;
            }
            Lifecycle::Finalize => self.finalize += elapsed,
        }
    }

    pub fn total(&self) -> Duration {
        self.initialize + self.update + self.finalize
    }
}

/// Execution statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExecutionStats {
    /// Number of completed update passes.
    pub iterations: u64,
    /// Total time spent inside module calls.
    pub total_duration: Duration,
    /// Per-module timings, in pipeline order.
    pub module_timings: IndexMap<String, ModuleTiming>,
}

/// The ordered module list of a run.
pub struct Pipeline {
    modules: Vec<ResolvedModule>,
    phase: PipelinePhase,
    options: ExecutionOptions,
    stats: ExecutionStats,
}

impl Pipeline {
    /// Create a pipeline in the [`PipelinePhase::Init`] phase.
    pub fn new(modules: Vec<ResolvedModule>) -> Self {
        Self::with_options(modules, ExecutionOptions::default())
    }

    pub fn with_options(modules: Vec<ResolvedModule>, options: ExecutionOptions) -> Self {
        let module_timings = modules
            .iter()
            .map(|m| (m.name.clone(), ModuleTiming::default()))
            .collect();
        Self {
            modules,
            phase: PipelinePhase::Init,
            options,
            stats: ExecutionStats {
                module_timings,
                ..ExecutionStats::default()
            },
        }
    }

    pub fn phase(&self) -> PipelinePhase {
        self.phase
    }

    pub fn stats(&self) -> &ExecutionStats {
        &self.stats
    }

    pub fn modules(&self) -> &[ResolvedModule] {
        &self.modules
    }

    /// Module names, in execution order.
    pub fn names(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Call `initialize` on every module, once.
    pub fn initialize(
        &mut self,
        params: &ParameterSet,
        state: &mut State,
    ) -> Result<(), ExecutionError> {
        self.transition(Lifecycle::Initialize, PipelinePhase::Init)?;
        self.run_pass(Lifecycle::Initialize, params, state)?;
        self.phase = PipelinePhase::Running;
        Ok(())
    }

    /// Call `update` on every module. May be repeated.
    pub fn update(&mut self, params: &ParameterSet, state: &mut State) -> Result<(), ExecutionError> {
        self.transition(Lifecycle::Update, PipelinePhase::Running)?;
        self.run_pass(Lifecycle::Update, params, state)?;
        self.stats.iterations += 1;
        Ok(())
    }

    /// Call `finalize` on every module, once.
    pub fn finalize(
        &mut self,
        params: &ParameterSet,
        state: &mut State,
    ) -> Result<(), ExecutionError> {
        self.transition(Lifecycle::Finalize, PipelinePhase::Running)?;
        self.run_pass(Lifecycle::Finalize, params, state)?;
        self.phase = PipelinePhase::Done;
        Ok(())
    }

    fn transition(&self, requested: Lifecycle, required: PipelinePhase) -> Result<(), ExecutionError> {
        if self.phase == required {
            Ok(())
        } else {
            Err(ExecutionError::InvalidTransition {
                current: self.phase,
                requested,
            })
        }
    }

    fn run_pass(
        &mut self,
        lifecycle: Lifecycle,
        params: &ParameterSet,
        state: &mut State,
    ) -> Result<(), ExecutionError> {
        let pass_start = Instant::now();
        let total = self.modules.len();
        let iteration = match lifecycle {
            Lifecycle::Update => self.stats.iterations + 1,
            _ => 0,
        };
        self.send_update(ProgressUpdate::PassStarted {
            lifecycle,
            iteration,
            total_modules: total,
        });

        for (index, resolved) in self.modules.iter().enumerate() {
            let start = Instant::now();
            let result = match lifecycle {
                Lifecycle::Initialize => resolved.module.initialize(params, state),
                Lifecycle::Update => resolved.module.update(params, state),
                Lifecycle::Finalize => resolved.module.finalize(params, state),
            };
            let elapsed = start.elapsed();

            if let Err(source) = result {
                self.phase = PipelinePhase::Aborted;
                log::error!("module '{}' failed during {}: {}", resolved.name, lifecycle, source);
                send(
                    &self.options,
                    ProgressUpdate::Error {
                        module: resolved.name.clone(),
                        lifecycle,
                        message: source.to_string(),
                    },
                );
                return Err(ExecutionError::Lifecycle {
                    module: resolved.name.clone(),
                    lifecycle,
                    source,
                });
            }

            let timing = self
                .stats
                .module_timings
                .entry(resolved.name.clone())
                .or_default();
            timing.record(lifecycle, elapsed);
            self.stats.total_duration += elapsed;

            if self.options.record_timings && lifecycle == Lifecycle::Update {
                state.set(format!("tcomp_{}", resolved.name), timing.update.as_secs_f64());
            }

            send(
                &self.options,
                ProgressUpdate::ModuleCompleted {
                    module: resolved.name.clone(),
                    lifecycle,
                    index,
                    total,
                    duration_us: elapsed.as_micros() as u64,
                },
            );
        }

        self.send_update(ProgressUpdate::PassCompleted {
            lifecycle,
            iteration,
            duration_us: pass_start.elapsed().as_micros() as u64,
        });
        Ok(())
    }

    fn send_update(&self, update: ProgressUpdate) {
        send(&self.options, update);
    }
}

fn send(options: &ExecutionOptions, update: ProgressUpdate) {
    if let Some(callback) = &options.progress_callback {
        callback(update);
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("modules", &self.names())
            .field("phase", &self.phase)
            .finish()
    }
}
