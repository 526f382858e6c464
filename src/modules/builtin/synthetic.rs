//! Synthetic initial geometry: a tilted bed under a slab of ice.

use crate::core::error::{ModuleError, ModuleResult};
use crate::core::module::{Category, Module, ModuleMetadata};
use crate::core::state::State;
use crate::core::types::Grid;
use crate::modules::registry::ModuleRegistry;
use crate::params::registry::ParamRegistry;
use crate::params::set::ParameterSet;

/// Register synthetic geometry modules.
pub fn register(registry: &mut ModuleRegistry) {
    registry.register(|| Box::new(Synthetic));
}

/// Builds `topg`, `thk` and `usurf` grids plus the `dx` cell size.
///
/// The bed descends along x with the given slope and ends at zero
/// elevation on the last column.
#[derive(Debug, Clone, Copy, Default)]
pub struct Synthetic;

impl Module for Synthetic {
    fn metadata(&self) -> ModuleMetadata {
        ModuleMetadata::builder("synthetic", Category::Preproc)
            .description("Create a synthetic tilted bed covered by uniform ice")
            .build()
    }

    fn register_params(&self, params: &mut ParamRegistry) {
        params.add("synthetic_nx", 50i64, "Number of cells along x");
        params.add("synthetic_ny", 30i64, "Number of cells along y");
        params.add_float("synthetic_dx", 100.0, "Cell size (m)");
        params.add_float("synthetic_slope", 0.05, "Bed slope along x (m/m)");
        params.add_float("synthetic_thk", 100.0, "Initial ice thickness (m)");
    }

    fn initialize(&self, params: &ParameterSet, state: &mut State) -> ModuleResult {
        let nx = params.get_integer("synthetic_nx")?;
        let ny = params.get_integer("synthetic_ny")?;
        if nx <= 0 || ny <= 0 {
            return Err(ModuleError::Failed(format!(
                "grid size must be positive, got {nx}x{ny}"
            )));
        }
        let dx = params.get_float("synthetic_dx")?;
        if dx <= 0.0 {
            return Err(ModuleError::Failed(format!("cell size must be positive, got {dx}")));
        }
        let slope = params.get_float("synthetic_slope")?;
        let thk0 = params.get_float("synthetic_thk")?;

        let (rows, cols) = (ny as usize, nx as usize);
        let topg = Grid::from_fn(rows, cols, |_, c| slope * dx * (cols - 1 - c) as f64);
        let thk = Grid::filled(rows, cols, thk0);
        let usurf = topg
            .add(&thk)
            .ok_or_else(|| ModuleError::Failed("grid shape mismatch".to_string()))?;

        state.set("dx", dx);
        state.set("topg", topg);
        state.set("thk", thk);
        state.set("usurf", usurf);

        state
            .logger()
            .info(format_args!("synthetic geometry: {ny}x{nx} cells of {dx} m"));
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

    fn params() -> ParameterSet {
        let mut registry = ParamRegistry::new();
        Synthetic.register_params(&mut registry);
        ParameterSet::defaults(&registry).unwrap()
    }

    #[test]
    fn test_creates_geometry() {
        let mut state = State::default();
        Synthetic.initialize(&params(), &mut state).unwrap();

        let topg = state.get_grid("topg").unwrap();
        assert_eq!((topg.rows(), topg.cols()), (30, 50));
        assert_eq!(topg.get(0, 49), Some(0.0));
        assert!(topg.get(0, 0).unwrap() > topg.get(0, 1).unwrap());

        let usurf = state.get_grid("usurf").unwrap();
        assert_eq!(usurf.get(3, 49), Some(100.0));
        assert_eq!(state.get_float("dx"), Ok(100.0));
    }

    #[test]
    fn test_rejects_empty_grid() {
        let mut params = params();
        params.set("synthetic_nx", 0i64);
        let err = Synthetic.initialize(&params, &mut State::default()).unwrap_err();
        assert!(err.to_string().contains("positive"));
    }
}
