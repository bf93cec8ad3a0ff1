pub mod affinity;
pub mod color_space;
pub mod colorize;
pub mod compose;
pub mod linear_system;
pub mod scribble_mask;
pub mod solver;
