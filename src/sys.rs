pub mod display;
pub mod geometry;
pub mod input;
pub mod remote;
pub mod screen;
pub mod vsync;
