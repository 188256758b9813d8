/// Deep Echo: a stealth maze game played by sonar.
///
/// `domain` holds the pure rules, `sim` drives a level session tick by
/// tick. The terminal front end lives in the binary.

pub mod config;
pub mod domain;
pub mod error;
pub mod sim;
