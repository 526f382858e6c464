//! Volume check plugin for icesheet.
//!
//! Records the ice volume at initialize and compares it at finalize, then
//! reports the time spent in each module from the `tcomp_<module>` fields.

use icesheet::core::error::{ModuleError, ModuleResult};
use icesheet::core::module::{Category, Module, ModuleMetadata};
use icesheet::core::state::State;
use icesheet::modules::builtin::ice_volume;
use icesheet::params::registry::ParamRegistry;
use icesheet::params::set::ParameterSet;

const INITIAL_FIELD: &str = "volume_check_initial";

/// Checks that the ice volume does not drift more than allowed.
#[derive(Debug, Clone, Copy, Default)]
pub struct VolumeCheck;

impl Module for VolumeCheck {
    fn metadata(&self) -> ModuleMetadata {
        ModuleMetadata::builder("volume_check", Category::Postproc)
            .description("Report the ice volume change and the time spent per module")
            .author("Icesheet Contributors")
            .dependency("time")
            .build()
    }

    fn register_params(&self, params: &mut ParamRegistry) {
        params.add_float(
            "volume_check_max_change",
            1.0,
            "Largest accepted relative volume change over the run; negative disables the check",
        );
    }

    fn initialize(&self, _params: &ParameterSet, state: &mut State) -> ModuleResult {
        if let Some(volume) = ice_volume(state) {
            state.set(INITIAL_FIELD, volume);
        }
        Ok(())
    }

    fn update(&self, _params: &ParameterSet, _state: &mut State) -> ModuleResult {
        Ok(())
    }

    fn finalize(&self, params: &ParameterSet, state: &mut State) -> ModuleResult {
        let max_change = params.get_float("volume_check_max_change")?;

        for (name, seconds) in compute_times(state) {
            state
                .logger()
                .info(format_args!("time spent in {}: {:.3} s", name, seconds));
        }

        let (Ok(initial), Some(last)) = (state.get_float(INITIAL_FIELD), ice_volume(state)) else {
            log::warn!("volume_check: no thk/dx fields, nothing to check");
            return Ok(());
        };
        let change = relative_change(initial, last);
        state.logger().info(format_args!(
            "ice volume {:.4} km3 -> {:.4} km3 ({:+.2}%)",
            initial,
            last,
            change * 100.0
        ));

        if max_change >= 0.0 && change.abs() > max_change {
            return Err(ModuleError::Failed(format!(
                "ice volume changed by {:.2}%, more than volume_check_max_change ({:.2}%)",
                change * 100.0,
                max_change * 100.0
            )));
        }
        Ok(())
    }
}

/// Cumulative update time per module, from the `tcomp_<module>` fields.
pub fn compute_times(state: &State) -> Vec<(String, f64)> {
    state
        .fields()
        .filter_map(|(name, value)| {
            let module = name.strip_prefix("tcomp_")?;
            Some((module.to_string(), value.as_float()?))
        })
        .collect()
}

fn relative_change(initial: f64, last: f64) -> f64 {
    if initial == 0.0 {
        if last == 0.0 {
            0.0
        } else {
            f64::INFINITY
        }
    } else {
        (last - initial) / initial
    }
}

icesheet::export_module!(VolumeCheck);

#[cfg(test)]
mod tests {
    use super::*;
    use icesheet::core::types::Grid;
    use icesheet::modules::module_params;

    fn params(max_change: f64) -> ParameterSet {
        let registry = module_params(&VolumeCheck);
        let mut params = ParameterSet::defaults(&registry).unwrap();
        params.set("volume_check_max_change", max_change);
        params
    }

    fn glacier(thk: f64) -> State {
        let mut state = State::default();
        state.set("dx", 100.0);
        state.set("thk", Grid::filled(10, 10, thk));
        state
    }

    #[test]
    fn test_accepts_small_change() {
        let params = params(0.5);
        let mut state = glacier(100.0);
        VolumeCheck.initialize(&params, &mut state).unwrap();
        state.set("thk", Grid::filled(10, 10, 120.0));
        assert!(VolumeCheck.finalize(&params, &mut state).is_ok());
    }

    #[test]
    fn test_rejects_large_change() {
        let params = params(0.1);
        let mut state = glacier(100.0);
        VolumeCheck.initialize(&params, &mut state).unwrap();
        state.set("thk", Grid::filled(10, 10, 50.0));
        let err = VolumeCheck.finalize(&params, &mut state).unwrap_err();
        assert!(err.to_string().contains("-50.00%"));
    }

    #[test]
    fn test_negative_limit_disables_check() {
        let params = params(-1.0);
        let mut state = glacier(100.0);
        VolumeCheck.initialize(&params, &mut state).unwrap();
        state.set("thk", Grid::zeros(10, 10));
        assert!(VolumeCheck.finalize(&params, &mut state).is_ok());
    }

    #[test]
    fn test_without_geometry() {
        let params = params(0.1);
        let mut state = State::default();
        VolumeCheck.initialize(&params, &mut state).unwrap();
        assert!(!state.contains(INITIAL_FIELD));
        assert!(VolumeCheck.finalize(&params, &mut state).is_ok());
    }

    #[test]
    fn test_compute_times() {
        let mut state = State::default();
        state.set("tcomp_time", 0.25);
        state.set("tcomp_print_info", 0.5);
        state.set("t", 2000.0);
        assert_eq!(
            compute_times(&state),
            vec![("time".to_string(), 0.25), ("print_info".to_string(), 0.5)]
        );
    }
}
