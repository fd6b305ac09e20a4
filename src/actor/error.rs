use thiserror::Error;

use crate::model::screen::ScreenId;
use crate::model::window::WindowId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WmError {
    #[error("Remote animation is disabled or has no controller")]
    NoRemoteAnimation,
    #[error("Required object is missing")]
    NullPtr,
    #[error("Could not allocate animation resources")]
    NoMem,
    #[error("Window not found: {0:?}")]
    InvalidWindow(WindowId),
    #[error("Invalid parameter: {0}")]
    InvalidParam(String),
    #[error("Remote call failed: {0}")]
    IpcFailed(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DmError {
    #[error("Required object is missing")]
    NullPtr,
    #[error("Invalid screen: {0:?}")]
    InvalidScreen(ScreenId),
    #[error("Invalid parameter: {0}")]
    InvalidParam(String),
    #[error("Remote call failed: {0}")]
    IpcFailed(String),
    #[error("Display service unavailable")]
    ServiceUnavailable,
}

#[derive(Debug, Error)]
pub enum InnerManagerError {
    #[error("Failed to spawn inner manager thread: {0}")]
    ThreadSpawn(#[from] std::io::Error),
    #[error("Could not install the pointer event consumer")]
    InputConsumer,
}
