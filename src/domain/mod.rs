/// Pure simulation rules. Nothing here touches the terminal, the clock,
/// or the filesystem; `sim` drives these with explicit state.

pub mod detection;
pub mod entity;
pub mod grid;
pub mod path;
pub mod sentry;
pub mod sonar;
pub mod visibility;
