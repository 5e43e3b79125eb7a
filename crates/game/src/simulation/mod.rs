mod movement;
mod tick;

pub use movement::{DASH_MULTIPLIER, WALK_SPEED, movement_system};
pub use tick::{FixedTimestep, SimulationLoop};
