use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use num_enum::{IntoPrimitive, TryFromPrimitive};

use super::geometry::Point;
use crate::model::window::WindowId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive, strum_macros::Display)]
#[repr(i32)]
pub enum PointerAction {
    Cancel = 1,
    Down = 2,
    Move = 3,
    Up = 4,
    AxisBegin = 5,
    AxisUpdate = 6,
    AxisEnd = 7,
    ButtonDown = 8,
    ButtonUp = 9,
}

impl PointerAction {
    /// Actions that end a gesture.
    pub fn is_terminal(self) -> bool {
        matches!(self, PointerAction::Up | PointerAction::ButtonUp | PointerAction::Cancel)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerItem {
    pub pointer_id: i32,
    pub display_pos: Point,
}

/// A pointer event as delivered by the input service. Clones share the
/// processed flag, so whoever handles the event can acknowledge it for
/// every holder.
#[derive(Debug, Clone)]
pub struct PointerEvent {
    pub agent_window_id: WindowId,
    pub pointer_id: i32,
    pub action: PointerAction,
    items: Vec<PointerItem>,
    processed: Arc<AtomicBool>,
}

impl PointerEvent {
    pub fn new(
        agent_window_id: WindowId,
        action: PointerAction,
        pointer_id: i32,
        display_pos: Point,
    ) -> PointerEvent {
        PointerEvent {
            agent_window_id,
            pointer_id,
            action,
            items: vec![PointerItem { pointer_id, display_pos }],
            processed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_item(mut self, item: PointerItem) -> PointerEvent {
        self.items.push(item);
        self
    }

    pub fn pointer_item(&self, pointer_id: i32) -> Option<&PointerItem> {
        self.items.iter().find(|item| item.pointer_id == pointer_id)
    }

    pub fn mark_processed(&self) { self.processed.store(true, Ordering::Release) }

    pub fn is_processed(&self) -> bool { self.processed.load(Ordering::Acquire) }
}

pub trait PointerEventConsumer: Send + Sync {
    fn on_pointer_event(&self, event: PointerEvent);
}

pub trait InputEventSource: Send + Sync {
    fn set_window_input_event_consumer(&self, consumer: Arc<dyn PointerEventConsumer>) -> bool;
}
