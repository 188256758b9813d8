/// Session layer: levels, world state, the per-tick step, and records.

pub mod event;
pub mod level;
pub mod records;
pub mod step;
pub mod world;
