//! Progress output.

use crate::core::error::ModuleResult;
use crate::core::module::{Category, Module, ModuleMetadata};
use crate::core::state::State;
use crate::modules::builtin::ice_volume;
use crate::modules::registry::ModuleRegistry;
use crate::params::registry::ParamRegistry;
use crate::params::set::ParameterSet;

/// Register output modules.
pub fn register(registry: &mut ModuleRegistry) {
    registry.register(|| Box::new(PrintInfo));
}

/// Reports time, iteration and ice volume at every save time.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrintInfo;

impl PrintInfo {
    fn line(state: &State) -> String {
        let t = state.get_float("t").unwrap_or(f64::NAN);
        let it = state.get_integer("it").unwrap_or(0);
        match ice_volume(state) {
            Some(vol) => format!("t: {t:>10.2} | it: {it:>6} | vol: {vol:>10.4} km3"),
            None => format!("t: {t:>10.2} | it: {it:>6}"),
        }
    }
}

impl Module for PrintInfo {
    fn metadata(&self) -> ModuleMetadata {
        ModuleMetadata::builder("print_info", Category::Postproc)
            .description("Print time, iteration and ice volume at save times")
            .dependency("time")
            .build()
    }

    fn register_params(&self, params: &mut ParamRegistry) {
        params.add("print_info_stdout", true, "Also print progress lines to stdout");
    }

    fn initialize(&self, _params: &ParameterSet, state: &mut State) -> ModuleResult {
        state
            .logger()
            .info(format_args!("run {} started", state.run_id()));
        Ok(())
    }

    fn update(&self, params: &ParameterSet, state: &mut State) -> ModuleResult {
        if !state.get_bool("saveresult").unwrap_or(false) {
            return Ok(());
        }
        let line = Self::line(state);
        if params.get_bool("print_info_stdout")? {
            println!("{line}");
        }
        state.logger().info(format_args!("{line}"));
        Ok(())
    }

    fn finalize(&self, _params: &ParameterSet, state: &mut State) -> ModuleResult {
        let it = state.get_integer("it").unwrap_or(0);
        state
            .logger()
            .info(format_args!("run {} done after {} iterations", state.run_id(), it));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Grid;

    #[test]
    fn test_depends_on_time() {
        assert_eq!(PrintInfo.metadata().dependencies, vec!["time".to_string()]);
    }

    #[test]
    fn test_line_format() {
        let mut state = State::default();
        state.set("t", 2010.0);
        state.set("it", 10i64);
        assert_eq!(PrintInfo::line(&state), "t:    2010.00 | it:     10");

        state.set("thk", Grid::filled(10, 10, 100.0));
        state.set("dx", 100.0);
        assert!(PrintInfo::line(&state).ends_with("vol:     0.1000 km3"));
    }

    #[test]
    fn test_update_skips_between_saves() {
        let mut registry = ParamRegistry::new();
        PrintInfo.register_params(&mut registry);
        let mut params = ParameterSet::defaults(&registry).unwrap();
        params.set("print_info_stdout", false);

        let mut state = State::default();
        state.set("saveresult", false);
        assert!(PrintInfo.update(&params, &mut state).is_ok());

        // a save step without the clock fields still reports
        state.set("saveresult", true);
        assert!(PrintInfo.update(&params, &mut state).is_ok());
    }
}
