//! Interfaces of the processes and services this server talks to. Every call
//! here is a request to something outside the server; implementations must
//! tolerate the remote side having already gone away.

use std::sync::Arc;

use serde_json::{Map, Value};

use super::geometry::{Point, Rect, RoundedRect};
use super::input::PointerEvent;
use crate::actor::error::WmError;
use crate::model::display::{DisplayId, VirtualDisplayInfo};
use crate::model::screen::{ScreenId, ScreenModeInfo};
use crate::model::window::{
    DragEvent, WindowId, WindowMode, WindowSizeChangeReason, WindowType,
};

pub const SPLIT_SCREEN_EVENT: &str = "common.event.SPLIT_SCREEN";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SurfaceHandle(u64);

impl SurfaceHandle {
    pub const fn new(id: u64) -> SurfaceHandle { SurfaceHandle(id) }

    pub fn get(&self) -> u64 { self.0 }
}

/// Identifies the ability (application component) that owns a window.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct AbilityToken(u64);

impl AbilityToken {
    pub const fn new(id: u64) -> AbilityToken { AbilityToken(id) }

    pub fn get(&self) -> u64 { self.0 }
}

/// The client side of a window.
pub trait WindowToken: Send + Sync {
    fn update_window_drag_info(&self, point: Point, event: DragEvent);
    fn update_window_mode(&self, mode: WindowMode);
    fn update_window_rect(&self, rect: Rect, reason: WindowSizeChangeReason);
    fn notify_window_client_point_up(&self, event: &PointerEvent);
}

pub trait AbilityManager: Send + Sync {
    fn minimize_ability(&self, token: AbilityToken, from_user: bool) -> Result<(), WmError>;
    fn close_ability(&self, token: AbilityToken) -> Result<(), WmError>;
    fn terminate_ability(&self, token: AbilityToken) -> Result<(), WmError>;
    fn mission_id_by_token(&self, token: AbilityToken) -> Option<i32>;
    fn update_mission_snapshot(&self, token: AbilityToken);
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommonEvent {
    pub action: String,
    pub params: Map<String, Value>,
}

impl CommonEvent {
    pub fn new(action: impl Into<String>) -> CommonEvent {
        CommonEvent { action: action.into(), params: Map::new() }
    }

    pub fn with_param(mut self, key: &str, value: impl Into<Value>) -> CommonEvent {
        self.params.insert(key.to_string(), value.into());
        self
    }

    pub fn param(&self, key: &str) -> Option<&Value> { self.params.get(key) }
}

pub trait BroadcastPublisher: Send + Sync {
    fn publish(&self, event: CommonEvent) -> bool;
}

/// The identity attached to outgoing requests.
pub trait CallingIdentity: Send + Sync {
    /// Switches to the server's own identity and returns the previous one.
    fn reset_calling_identity(&self) -> String;
    fn set_calling_identity(&self, identity: &str);
}

/// Runs requests as the server itself until dropped.
pub struct IdentityGuard<'a> {
    identity: &'a dyn CallingIdentity,
    saved: String,
}

impl<'a> IdentityGuard<'a> {
    pub fn reset(identity: &'a dyn CallingIdentity) -> IdentityGuard<'a> {
        let saved = identity.reset_calling_identity();
        IdentityGuard { identity, saved }
    }
}

impl Drop for IdentityGuard<'_> {
    fn drop(&mut self) { self.identity.set_calling_identity(&self.saved); }
}

/// Owner of the server's own windows (split divider, placeholder).
pub trait InnerWindowHost: Send + Sync {
    fn create(&self, name: &str, display: DisplayId, rect: Rect, window_type: WindowType, mode: WindowMode);
    fn destroy(&self, display: DisplayId, window_type: WindowType);
    fn update(&self, display: DisplayId, window_type: WindowType, width: u32, height: u32);
}

#[derive(Debug, Clone, PartialEq)]
pub struct PixelMap {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

pub type CaptureCallback = Box<dyn FnOnce(Option<PixelMap>) + Send>;

/// Render service side of screens.
pub trait Compositor: Send + Sync {
    fn default_screen_id(&self) -> ScreenId;
    fn screen_active_mode(&self, id: ScreenId) -> Option<ScreenModeInfo>;
    fn create_virtual_screen(
        &self,
        info: &VirtualDisplayInfo,
        surface: Option<SurfaceHandle>,
    ) -> ScreenId;
    fn remove_virtual_screen(&self, id: ScreenId);
    /// Starts an asynchronous capture. `done` may run on any thread, or never.
    fn take_surface_capture(&self, id: ScreenId, done: CaptureCallback) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum StartingAppType {
    FromLauncher,
    FromRecent,
    FromOther,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationTarget {
    pub bundle_name: String,
    pub ability_name: String,
    pub window_id: WindowId,
    pub display_id: DisplayId,
    pub surface: SurfaceHandle,
    pub bounds: RoundedRect,
}

/// Run once by the animation side when an animation completes.
pub struct FinishedCallback(Box<dyn FnOnce() + Send>);

impl FinishedCallback {
    pub fn new(f: impl FnOnce() + Send + 'static) -> FinishedCallback { FinishedCallback(Box::new(f)) }

    pub fn on_animation_finished(self) { (self.0)() }
}

impl std::fmt::Debug for FinishedCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FinishedCallback(...)")
    }
}

pub trait WindowAnimationController: Send + Sync {
    fn on_start_app(&self, kind: StartingAppType, target: AnimationTarget, finished: FinishedCallback);
    fn on_app_transition(
        &self,
        from: Option<AnimationTarget>,
        to: AnimationTarget,
        finished: FinishedCallback,
    );
    fn on_minimize_window(&self, target: AnimationTarget, finished: FinishedCallback);
    fn on_close_window(&self, target: AnimationTarget, finished: FinishedCallback);
    fn on_minimize_all_window(&self, targets: Vec<AnimationTarget>, finished: FinishedCallback);
    fn on_screen_unlock(&self, finished: FinishedCallback);
}

/// Compares trait objects by allocation, ignoring vtables.
pub fn same_object<T: ?Sized, U: ?Sized>(a: &Arc<T>, b: &Arc<U>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
