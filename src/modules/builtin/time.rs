//! The simulation clock.

use crate::core::error::{ModuleError, ModuleResult};
use crate::core::module::{Category, Module, ModuleMetadata};
use crate::core::state::State;
use crate::modules::registry::ModuleRegistry;
use crate::params::registry::ParamRegistry;
use crate::params::set::ParameterSet;

/// Register time stepping modules.
pub fn register(registry: &mut ModuleRegistry) {
    registry.register(|| Box::new(Time));
}

/// Relative tolerance when comparing times.
const EPS: f64 = 1e-9;

/// Maintains `t`, `dt`, `it` and the `saveresult` flag.
///
/// Each update advances `t` by at most `time_step_max`, shortened so the
/// clock lands exactly on every multiple of `time_save` and on
/// `time_end`. `saveresult` is set on the steps that land on a save time.
#[derive(Debug, Clone, Copy, Default)]
pub struct Time;

struct Clock {
    start: f64,
    end: f64,
    save: f64,
    step_max: f64,
}

impl Clock {
    fn from_params(params: &ParameterSet) -> Result<Self, ModuleError> {
        let clock = Self {
            start: params.get_float("time_start")?,
            end: params.get_float("time_end")?,
            save: params.get_float("time_save")?,
            step_max: params.get_float("time_step_max")?,
        };
        if clock.step_max <= 0.0 || clock.save <= 0.0 {
            return Err(ModuleError::Failed(format!(
                "time_step_max ({}) and time_save ({}) must be positive",
                clock.step_max, clock.save
            )));
        }
        if clock.end < clock.start {
            return Err(ModuleError::Failed(format!(
                "time_end ({}) is before time_start ({})",
                clock.end, clock.start
            )));
        }
        Ok(clock)
    }

    /// First save time strictly after `t`.
    fn next_save(&self, t: f64) -> f64 {
        let k = ((t - self.start) / self.save + EPS).floor() + 1.0;
        (self.start + k * self.save).min(self.end)
    }
}

impl Module for Time {
    fn metadata(&self) -> ModuleMetadata {
        ModuleMetadata::builder("time", Category::Process)
            .description("Advance the simulation clock and flag save times")
            .build()
    }

    fn register_params(&self, params: &mut ParamRegistry) {
        params.add_float("time_start", 2000.0, "Start time (y)");
        params.add_float("time_end", 2100.0, "End time (y)");
        params.add_float("time_save", 10.0, "Save period (y)");
        params.add_float("time_step_max", 1.0, "Maximum time step (y)");
    }

    fn initialize(&self, params: &ParameterSet, state: &mut State) -> ModuleResult {
        let clock = Clock::from_params(params)?;
        state.set("t", clock.start);
        state.set("dt", clock.step_max);
        state.set("it", 0i64);
        state.set("saveresult", true);
        Ok(())
    }

    fn update(&self, params: &ParameterSet, state: &mut State) -> ModuleResult {
        let clock = Clock::from_params(params)?;
        let t = state.get_float("t")?;
        let it = state.get_integer("it")?;

        let next_save = clock.next_save(t);
        let dt = clock.step_max.min(next_save - t).max(0.0);
        let t_new = if (next_save - (t + dt)).abs() <= EPS * next_save.abs().max(1.0) {
            next_save
        } else {
            t + dt
        };

        state.set("dt", dt);
        state.set("t", t_new);
        state.set("it", it + 1);
        state.set("saveresult", t_new == next_save);
        Ok(())
    }

    fn finalize(&self, _params: &ParameterSet, _state: &mut State) -> ModuleResult {
        Ok(())
    }
}
