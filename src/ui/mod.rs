/// Terminal front end: keyboard, drawing, audio.

pub mod input;
pub mod renderer;
pub mod sound;
