pub mod display;
pub mod minimize;
pub mod screen;
pub mod window;
pub mod window_root;
