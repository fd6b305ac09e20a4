pub mod actor;
pub mod common;
pub mod model;
pub mod server;
pub mod sys;

#[cfg(test)]
mod testing;
