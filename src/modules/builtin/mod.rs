//! Built-in modules.
//!
//! These only keep the books (initial geometry, the clock, progress
//! output) so that a run works out of the box. Physics modules are plugged
//! in from outside.

mod print_info;
mod synthetic;
mod time;

use crate::core::state::State;
use crate::modules::registry::ModuleRegistry;

/// Register all built-in modules.
pub fn register_all(registry: &mut ModuleRegistry) {
    synthetic::register(registry);
    time::register(registry);
    print_info::register(registry);
}

// Re-export for direct access
pub use print_info::PrintInfo;
pub use synthetic::Synthetic;
pub use time::Time;

/// Ice volume in km³, from the `thk` grid and the `dx` cell size.
///
/// `None` if either field is missing.
pub fn ice_volume(state: &State) -> Option<f64> {
    let thk = state.get_grid("thk").ok()?;
    let dx = state.get_float("dx").ok()?;
    Some(thk.sum() * dx * dx / 1e9)
}
