use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::sys::geometry::Point;
use crate::sys::remote::SurfaceHandle;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct ScreenId(u64);

impl ScreenId {
    pub const INVALID: ScreenId = ScreenId(u64::MAX);

    pub const fn new(id: u64) -> ScreenId { ScreenId(id) }

    pub fn get(&self) -> u64 { self.0 }

    pub fn is_valid(&self) -> bool { *self != Self::INVALID }
}

impl From<ScreenId> for u64 {
    fn from(val: ScreenId) -> Self { val.get() }
}

impl std::fmt::Display for ScreenId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_valid() { write!(f, "{}", self.0) } else { f.write_str("invalid") }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScreenModeInfo {
    pub id: i32,
    pub width: u32,
    pub height: u32,
    pub refresh_rate: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum_macros::Display)]
pub enum ScreenType {
    #[default]
    Undefined,
    Real,
    Virtual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum_macros::Display)]
pub enum ScreenCombination {
    #[default]
    Alone,
    Expand,
    Mirror,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum ScreenChangeEvent {
    UpdateOrientation,
    UpdateRotation,
    ChangeMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum ScreenGroupChangeEvent {
    AddToGroup,
    RemoveFromGroup,
    ChangeGroup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum_macros::Display)]
pub enum ScreenPowerState {
    On,
    Standby,
    Suspend,
    Off,
    #[default]
    Invalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum PowerStateChangeReason {
    PowerButton,
    Application,
}

/// Server-side description of one screen, as reported by the display service.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScreenInfo {
    pub id: ScreenId,
    pub name: String,
    pub screen_type: ScreenType,
    pub parent: ScreenId,
    pub modes: Vec<ScreenModeInfo>,
    pub active_mode_idx: u32,
    pub virtual_width: u32,
    pub virtual_height: u32,
}

impl Default for ScreenId {
    fn default() -> Self { ScreenId::INVALID }
}

impl ScreenInfo {
    pub fn new(id: ScreenId, screen_type: ScreenType) -> ScreenInfo {
        ScreenInfo { id, screen_type, ..Default::default() }
    }

    pub fn with_mode(mut self, mode: ScreenModeInfo) -> ScreenInfo {
        self.active_mode_idx = self.modes.len() as u32;
        self.modes.push(mode);
        self
    }

    pub fn with_parent(mut self, parent: ScreenId) -> ScreenInfo {
        self.parent = parent;
        self
    }

    pub fn active_mode(&self) -> Option<ScreenModeInfo> {
        self.modes.get(self.active_mode_idx as usize).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScreenGroupInfo {
    pub info: ScreenInfo,
    pub combination: ScreenCombination,
    pub children: Vec<ScreenId>,
    pub positions: Vec<Point>,
}

/// Cached screen. Refreshes replace the contents, so holders of the `Arc`
/// always see the latest info.
#[derive(Debug)]
pub struct Screen {
    info: RwLock<ScreenInfo>,
}

impl Screen {
    pub fn new(info: ScreenInfo) -> Arc<Screen> { Arc::new(Screen { info: RwLock::new(info) }) }

    pub fn id(&self) -> ScreenId { self.info.read().id }

    pub fn info(&self) -> ScreenInfo { self.info.read().clone() }

    pub fn screen_type(&self) -> ScreenType { self.info.read().screen_type }

    pub fn parent_id(&self) -> ScreenId { self.info.read().parent }

    pub fn active_mode(&self) -> Option<ScreenModeInfo> { self.info.read().active_mode() }

    pub fn modes(&self) -> Vec<ScreenModeInfo> { self.info.read().modes.clone() }

    pub(crate) fn update(&self, info: ScreenInfo) { *self.info.write() = info; }
}

#[derive(Debug)]
pub struct ScreenGroup {
    info: RwLock<ScreenGroupInfo>,
}

impl ScreenGroup {
    pub fn new(info: ScreenGroupInfo) -> Arc<ScreenGroup> {
        Arc::new(ScreenGroup { info: RwLock::new(info) })
    }

    pub fn id(&self) -> ScreenId { self.info.read().info.id }

    pub fn combination(&self) -> ScreenCombination { self.info.read().combination }

    pub fn children(&self) -> Vec<ScreenId> { self.info.read().children.clone() }

    pub fn child_positions(&self) -> Vec<Point> { self.info.read().positions.clone() }

    pub(crate) fn update(&self, info: ScreenGroupInfo) { *self.info.write() = info; }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct VirtualScreenOption {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub density: f32,
    pub surface: Option<SurfaceHandle>,
    pub flags: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpandOption {
    pub screen_id: ScreenId,
    pub start_x: i32,
    pub start_y: i32,
}
