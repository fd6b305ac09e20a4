use std::mem;

use serde::{Deserialize, Serialize};

use super::screen::ScreenId;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct DisplayId(u64);

impl DisplayId {
    pub const INVALID: DisplayId = DisplayId(u64::MAX);
    pub const DEFAULT: DisplayId = DisplayId(0);

    pub const fn new(id: u64) -> DisplayId { DisplayId(id) }

    pub fn get(&self) -> u64 { self.0 }

    pub fn is_valid(&self) -> bool { *self != Self::INVALID }
}

impl std::fmt::Display for DisplayId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_valid() { write!(f, "{}", self.0) } else { f.write_str("invalid") }
    }
}

/// Which screen, if any, a display currently renders to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScreenBinding {
    #[default]
    Unbound,
    BoundTo(ScreenId),
}

impl ScreenBinding {
    pub fn screen(&self) -> Option<ScreenId> {
        match self {
            ScreenBinding::Unbound => None,
            ScreenBinding::BoundTo(id) => Some(*id),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Display {
    pub id: DisplayId,
    pub binding: ScreenBinding,
    pub width: u32,
    pub height: u32,
    pub refresh_rate: u32,
    /// Screens mirroring this display's output.
    pub mirrors: Vec<ScreenId>,
}

impl Display {
    pub fn new(id: DisplayId, width: u32, height: u32, refresh_rate: u32) -> Display {
        Display {
            id,
            binding: ScreenBinding::Unbound,
            width,
            height,
            refresh_rate,
            mirrors: Vec::new(),
        }
    }

    pub fn screen_id(&self) -> ScreenId { self.binding.screen().unwrap_or(ScreenId::INVALID) }

    pub fn shows(&self, screen: ScreenId) -> bool {
        self.binding == ScreenBinding::BoundTo(screen) || self.mirrors.contains(&screen)
    }
}

/// Placeholder display slot. A dummy waits for the first standalone real
/// screen and is consumed exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DummyDisplay {
    #[default]
    Absent,
    Awaiting(DisplayId),
}

impl DummyDisplay {
    pub fn take(&mut self) -> DummyDisplay { mem::take(self) }

    pub fn is_absent(&self) -> bool { matches!(self, DummyDisplay::Absent) }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct VirtualDisplayInfo {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub display_id_to_mirror: Option<DisplayId>,
    pub flags: i32,
}

/// What display-level listeners are told about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayEvent {
    Created { display: DisplayId, screen: ScreenId },
    DummyBound { display: DisplayId, screen: ScreenId },
    MirrorAttached { display: DisplayId, screen: ScreenId },
    ScreenDisconnected { display: Option<DisplayId>, screen: ScreenId },
    ScreenChanged { display: Option<DisplayId>, screen: ScreenId },
}
