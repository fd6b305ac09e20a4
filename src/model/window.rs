use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bitflags::bitflags;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::display::DisplayId;
use crate::sys::geometry::{Point, Rect};
use crate::sys::remote::{AbilityToken, SurfaceHandle, WindowToken};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct WindowId(u32);

impl WindowId {
    pub const INVALID: WindowId = WindowId(0);

    pub const fn new(id: u32) -> WindowId { WindowId(id) }

    pub fn get(&self) -> u32 { self.0 }

    pub fn is_valid(&self) -> bool { *self != Self::INVALID }
}

impl std::fmt::Display for WindowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "{}", self.0) }
}

#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    IntoPrimitive,
    TryFromPrimitive,
    strum_macros::Display
)]
#[repr(u32)]
pub enum WindowType {
    AppMainWindow = 1,
    AppSubWindow = 1000,
    MediaWindow = 1001,
    AppComponent = 1002,
    Wallpaper = 1100,
    Desktop = 1101,
    AppLaunching = 2000,
    DockSlice = 2001,
    IncomingCall = 2002,
    SearchingBar = 2003,
    SystemAlarmWindow = 2004,
    InputMethodFloat = 2005,
    Float = 2006,
    Toast = 2007,
    StatusBar = 2008,
    Panel = 2009,
    Keyguard = 2010,
    VolumeOverlay = 2011,
    NavigationBar = 2012,
    DraggingEffect = 2013,
    Pointer = 2014,
    LauncherRecent = 2015,
    LauncherDock = 2016,
    BootAnimation = 2017,
    FreezeDisplay = 2018,
    VoiceInteraction = 2019,
    FloatCamera = 2020,
    Placeholder = 2021,
    Dialog = 2022,
}

impl WindowType {
    pub fn is_main_window(self) -> bool { self == WindowType::AppMainWindow }

    pub fn is_sub_window(self) -> bool {
        matches!(
            self,
            WindowType::AppSubWindow | WindowType::MediaWindow | WindowType::AppComponent
        )
    }

    pub fn is_app_window(self) -> bool { self.is_main_window() || self.is_sub_window() }
}

#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Default,
    IntoPrimitive,
    TryFromPrimitive,
    strum_macros::Display
)]
#[repr(u32)]
pub enum WindowMode {
    #[default]
    Undefined = 0,
    Fullscreen = 1,
    SplitPrimary = 2,
    SplitSecondary = 3,
    Floating = 4,
    Pip = 5,
}

impl WindowMode {
    pub fn is_split(self) -> bool {
        matches!(self, WindowMode::SplitPrimary | WindowMode::SplitSecondary)
    }

    /// The other half of a split, for split modes only.
    pub fn complementary(self) -> Option<WindowMode> {
        match self {
            WindowMode::SplitPrimary => Some(WindowMode::SplitSecondary),
            WindowMode::SplitSecondary => Some(WindowMode::SplitPrimary),
            _ => None,
        }
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ModeSupport: u32 {
        const FULLSCREEN = 1 << 0;
        const FLOATING = 1 << 1;
        const SPLIT_PRIMARY = 1 << 2;
        const SPLIT_SECONDARY = 1 << 3;
        const PIP = 1 << 4;

        const SPLIT = Self::SPLIT_PRIMARY.bits() | Self::SPLIT_SECONDARY.bits();
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct WindowFlags: u32 {
        const NEED_AVOID = 1 << 0;
        const PARENT_LIMIT = 1 << 1;
        const SHOW_WHEN_LOCKED = 1 << 2;
        const FORBID_SPLIT_MOVE = 1 << 3;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum_macros::Display)]
pub enum WindowSizeChangeReason {
    #[default]
    Undefined,
    Maximize,
    Recover,
    Rotation,
    Drag,
    DragStart,
    DragEnd,
    Resize,
    Move,
    Hide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum_macros::Display)]
pub enum DragType {
    #[default]
    Undefined,
    Width,
    Height,
    Corner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum PropertyChangeAction {
    UpdateRect,
    UpdateMode,
    UpdateFlags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum DragEvent {
    In,
    Out,
    Move,
    End,
}

/// Everything the server tracks about a window that the client may also see.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowProperty {
    pub window_id: WindowId,
    pub name: String,
    pub display_id: DisplayId,
    pub window_type: WindowType,
    mode: WindowMode,
    last_mode: WindowMode,
    pub flags: WindowFlags,
    pub mode_support: ModeSupport,
    pub window_rect: Rect,
    pub request_rect: Rect,
    pub hit_offset: Point,
    pub size_change_reason: WindowSizeChangeReason,
    pub drag_type: DragType,
    pub corner_radius: f32,
}

impl WindowProperty {
    pub fn new(window_id: WindowId, window_type: WindowType, mode: WindowMode) -> WindowProperty {
        WindowProperty {
            window_id,
            name: String::new(),
            display_id: DisplayId::DEFAULT,
            window_type,
            mode,
            last_mode: WindowMode::Fullscreen,
            flags: WindowFlags::empty(),
            mode_support: ModeSupport::all(),
            window_rect: Rect::ZERO,
            request_rect: Rect::ZERO,
            hit_offset: Point::ZERO,
            size_change_reason: WindowSizeChangeReason::Undefined,
            drag_type: DragType::Undefined,
            corner_radius: 0.0,
        }
    }

    pub fn mode(&self) -> WindowMode { self.mode }

    pub fn last_mode(&self) -> WindowMode { self.last_mode }

    /// Non-split modes are remembered so leaving a split can restore them.
    pub fn set_mode(&mut self, mode: WindowMode) {
        if mode == WindowMode::Undefined {
            return;
        }
        if !self.mode.is_split() {
            self.last_mode = self.mode;
        }
        self.mode = mode;
    }

    pub fn resume_last_mode(&mut self) { self.mode = self.last_mode; }

    pub fn set_rect(&mut self, rect: Rect) {
        self.window_rect = rect;
        self.request_rect = rect;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MoveDragProperty {
    pub start_move_flag: bool,
    pub start_drag_flag: bool,
    pub start_pointer_id: i32,
    pub start_point_pos: Point,
    pub start_point_rect: Rect,
    pub start_rect_except_frame: Rect,
    pub start_rect_except_corner: Rect,
    pub drag_type: DragType,
}

impl MoveDragProperty {
    pub fn is_active(&self) -> bool { self.start_move_flag || self.start_drag_flag }
}

/// A server-side window. Shared between the per-display containers, the
/// split pair and in-flight animations.
pub struct WindowNode {
    property: RwLock<WindowProperty>,
    window_token: Option<Arc<dyn WindowToken>>,
    ability_token: Option<AbilityToken>,
    surface: Option<SurfaceHandle>,
    leash_surface: Option<SurfaceHandle>,
    starting_window_shown: AtomicBool,
    play_animation_show: AtomicBool,
    play_animation_hide: AtomicBool,
}

impl WindowNode {
    pub fn new(property: WindowProperty) -> WindowNode {
        WindowNode {
            property: RwLock::new(property),
            window_token: None,
            ability_token: None,
            surface: None,
            leash_surface: None,
            starting_window_shown: AtomicBool::new(false),
            play_animation_show: AtomicBool::new(false),
            play_animation_hide: AtomicBool::new(false),
        }
    }

    pub fn with_window_token(mut self, token: Arc<dyn WindowToken>) -> WindowNode {
        self.window_token = Some(token);
        self
    }

    pub fn with_ability_token(mut self, token: AbilityToken) -> WindowNode {
        self.ability_token = Some(token);
        self
    }

    pub fn with_surfaces(
        mut self,
        surface: Option<SurfaceHandle>,
        leash: Option<SurfaceHandle>,
    ) -> WindowNode {
        self.surface = surface;
        self.leash_surface = leash;
        self
    }

    pub fn into_ref(self) -> Arc<WindowNode> { Arc::new(self) }

    pub fn id(&self) -> WindowId { self.property.read().window_id }

    pub fn display_id(&self) -> DisplayId { self.property.read().display_id }

    pub fn window_type(&self) -> WindowType { self.property.read().window_type }

    pub fn window_mode(&self) -> WindowMode { self.property.read().mode() }

    pub fn set_window_mode(&self, mode: WindowMode) { self.property.write().set_mode(mode) }

    pub fn is_split_mode(&self) -> bool { self.window_mode().is_split() }

    pub fn window_rect(&self) -> Rect { self.property.read().window_rect }

    pub fn flags(&self) -> WindowFlags { self.property.read().flags }

    pub fn mode_support(&self) -> ModeSupport { self.property.read().mode_support }

    /// Snapshot of the current property.
    pub fn property(&self) -> WindowProperty { self.property.read().clone() }

    pub fn update_property<R>(&self, f: impl FnOnce(&mut WindowProperty) -> R) -> R {
        f(&mut self.property.write())
    }

    pub fn window_token(&self) -> Option<&Arc<dyn WindowToken>> { self.window_token.as_ref() }

    pub fn ability_token(&self) -> Option<AbilityToken> { self.ability_token }

    pub fn surface(&self) -> Option<SurfaceHandle> { self.surface }

    pub fn leash_surface(&self) -> Option<SurfaceHandle> { self.leash_surface }

    pub fn has_surface(&self) -> bool { self.surface.is_some() || self.leash_surface.is_some() }

    pub fn starting_window_shown(&self) -> bool { self.starting_window_shown.load(Ordering::Acquire) }

    pub fn set_starting_window_shown(&self, shown: bool) {
        self.starting_window_shown.store(shown, Ordering::Release)
    }

    pub fn is_play_animation_show(&self) -> bool { self.play_animation_show.load(Ordering::Acquire) }

    pub fn set_play_animation_show(&self, value: bool) {
        self.play_animation_show.store(value, Ordering::Release)
    }

    pub fn is_play_animation_hide(&self) -> bool { self.play_animation_hide.load(Ordering::Acquire) }

    pub fn set_play_animation_hide(&self, value: bool) {
        self.play_animation_hide.store(value, Ordering::Release)
    }
}

impl std::fmt::Debug for WindowNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let property = self.property.read();
        f.debug_struct("WindowNode")
            .field("id", &property.window_id)
            .field("type", &property.window_type)
            .field("mode", &property.mode())
            .field("display", &property.display_id)
            .finish_non_exhaustive()
    }
}
