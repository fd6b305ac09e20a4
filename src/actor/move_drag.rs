//! Server-side window moving and edge dragging.
//!
//! A session starts when a client reports it is ready to move or drag one
//! of its windows and ends when the client says it is done or the window
//! goes away. Pointer moves are coalesced to at most one geometry update per
//! frame; everything else is applied immediately.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use tracing::{debug, error, info, trace, warn};

use super::Sender;
use super::inner_manager::Event;
use crate::model::window::{
    MoveDragProperty, PropertyChangeAction, WindowId, WindowProperty, WindowSizeChangeReason,
};
use crate::sys::geometry::{Point, Rect};
use crate::sys::input::{PointerAction, PointerEvent};
use crate::sys::vsync::VsyncSource;

/// Where geometry decided by the server is written back.
pub trait WindowUpdateSink: Send + Sync {
    fn update_property(&self, property: &WindowProperty, action: PropertyChangeAction, from_server: bool);
    fn notify_window_client_point_up(&self, id: WindowId, event: &PointerEvent);
}

pub struct MoveDragController {
    /// Shared with the handle so callers can check the session without
    /// waiting on the loop.
    active_window: Arc<AtomicU32>,
    session_window: WindowId,
    window_property: Option<WindowProperty>,
    move_drag: MoveDragProperty,
    pending_move: Option<PointerEvent>,
    vsync_requested: bool,
    generation: u64,
    vsync: Arc<dyn VsyncSource>,
    updates: Arc<dyn WindowUpdateSink>,
    events_tx: Sender<Event>,
}

impl MoveDragController {
    pub fn new(
        active_window: Arc<AtomicU32>,
        vsync: Arc<dyn VsyncSource>,
        updates: Arc<dyn WindowUpdateSink>,
        events_tx: Sender<Event>,
    ) -> MoveDragController {
        MoveDragController {
            active_window,
            session_window: WindowId::INVALID,
            window_property: None,
            move_drag: MoveDragProperty::default(),
            pending_move: None,
            vsync_requested: false,
            generation: 0,
            vsync,
            updates,
            events_tx,
        }
    }

    pub fn active_window_id(&self) -> WindowId { self.session_window }

    pub fn handle_ready_to_move_or_drag(
        &mut self,
        id: WindowId,
        property: WindowProperty,
        move_drag: MoveDragProperty,
    ) -> bool {
        if self.session_window.is_valid() && self.session_window != id {
            warn!(%id, active = %self.session_window, "another window is already moving or dragging");
            return false;
        }
        info!(%id, moving = move_drag.start_move_flag, dragging = move_drag.start_drag_flag, "move or drag session started");
        self.session_window = id;
        self.active_window.store(id.get(), Ordering::Release);
        self.window_property = Some(property);
        self.move_drag = move_drag;
        true
    }

    pub fn handle_end_up_moving_or_dragging(&mut self, id: WindowId) {
        if self.session_window != id {
            debug!(%id, active = %self.session_window, "not the window being moved or dragged");
            return;
        }
        info!(%id, "move or drag session ended");
        self.reset();
    }

    pub fn handle_window_removed_or_destroyed(&mut self, id: WindowId) {
        if !self.move_drag.is_active() {
            return;
        }
        info!(%id, "window went away during move or drag");
        self.reset();
    }

    pub fn consume_pointer_event(&mut self, event: PointerEvent) {
        if event.action == PointerAction::Move {
            if let Some(superseded) = self.pending_move.replace(event) {
                superseded.mark_processed();
            }
            if !self.vsync_requested {
                self.request_vsync();
            }
            return;
        }
        debug!(action = %event.action, "dispatching pointer event");
        self.handle_pointer_event(&event);
        event.mark_processed();
    }

    /// Replays the latest coalesced move, unless the frame was requested by
    /// a session that has since been torn down.
    pub fn on_receive_vsync(&mut self, timestamp: i64, generation: u64) {
        if generation != self.generation {
            trace!(timestamp, "stale frame");
            return;
        }
        self.vsync_requested = false;
        let Some(event) = self.pending_move.take() else {
            trace!(timestamp, "no move to replay");
            return;
        };
        self.handle_pointer_event(&event);
        event.mark_processed();
    }

    fn request_vsync(&mut self) {
        self.vsync_requested = true;
        let tx = self.events_tx.clone();
        let generation = self.generation;
        self.vsync.request_vsync(Box::new(move |timestamp| tx.send(Event::Vsync { timestamp, generation })));
    }

    fn cancel_pending_frame(&mut self) {
        self.generation += 1;
        self.vsync_requested = false;
        if let Some(event) = self.pending_move.take() {
            event.mark_processed();
        }
    }

    fn reset(&mut self) {
        self.cancel_pending_frame();
        self.session_window = WindowId::INVALID;
        self.active_window.store(WindowId::INVALID.get(), Ordering::Release);
        self.window_property = None;
        self.move_drag = MoveDragProperty::default();
    }

    fn handle_pointer_event(&mut self, event: &PointerEvent) {
        let Some(item) = event.pointer_item(event.pointer_id) else {
            error!(pointer_id = event.pointer_id, "pointer event has no item for its pointer");
            return;
        };
        let pos = item.display_pos;
        match event.action {
            PointerAction::Move => {
                self.handle_move_event(pos, event.pointer_id);
                self.handle_drag_event(pos, event.pointer_id);
            }
            action if action.is_terminal() => {
                self.updates.notify_window_client_point_up(self.session_window, event);
            }
            _ => {}
        }
    }

    /// Edges the start point lies outside of are the ones being dragged. A
    /// start point clear of the corners is tested against the frame.
    fn hot_zone(&self) -> Rect {
        let except_corner = self.move_drag.start_rect_except_corner;
        if except_corner.strictly_contains(self.move_drag.start_point_pos) {
            self.move_drag.start_rect_except_frame
        } else {
            except_corner
        }
    }

    fn handle_drag_event(&mut self, pos: Point, pointer_id: i32) {
        if !self.move_drag.start_drag_flag || pointer_id != self.move_drag.start_pointer_id {
            return;
        }
        let hot = self.hot_zone();
        let start = self.move_drag.start_point_pos;
        let mut rect = self.move_drag.start_point_rect;
        resize_axis(start.x, hot.pos_x, hot.right(), pos.x - start.x, &mut rect.pos_x, &mut rect.width);
        resize_axis(start.y, hot.pos_y, hot.bottom(), pos.y - start.y, &mut rect.pos_y, &mut rect.height);
        let drag_type = self.move_drag.drag_type;
        self.apply(rect, WindowSizeChangeReason::Drag, |p| p.drag_type = drag_type);
    }

    fn handle_move_event(&mut self, pos: Point, pointer_id: i32) {
        if !self.move_drag.start_move_flag || pointer_id != self.move_drag.start_pointer_id {
            return;
        }
        let Some(property) = &self.window_property else { return };
        let start = self.move_drag.start_point_pos;
        let origin = self.move_drag.start_point_rect.origin();
        let size = property.request_rect;
        let rect = Rect::new(
            origin.x + pos.x - start.x,
            origin.y + pos.y - start.y,
            size.width,
            size.height,
        );
        self.apply(rect, WindowSizeChangeReason::Move, |_| {});
    }

    fn apply(&mut self, rect: Rect, reason: WindowSizeChangeReason, extra: impl FnOnce(&mut WindowProperty)) {
        let Some(property) = &mut self.window_property else {
            warn!("no window property for the active session");
            return;
        };
        property.request_rect = rect;
        property.size_change_reason = reason;
        extra(property);
        trace!(id = %property.window_id, ?rect, %reason, "applying geometry");
        self.updates.update_property(property, PropertyChangeAction::UpdateRect, true);
    }
}

/// Moves the near edge or the far edge of one axis by `delta`, never
/// letting the extent go below zero.
fn resize_axis(start: i32, hot_near: i32, hot_far: i32, delta: i32, origin: &mut i32, extent: &mut u32) {
    let size = *extent as i64;
    let delta = delta as i64;
    if start <= hot_near {
        let delta = delta.min(size);
        *origin = (*origin as i64 + delta) as i32;
        *extent = (size - delta) as u32;
    } else if start >= hot_far {
        let delta = delta.max(-size);
        *extent = (size + delta) as u32;
    }
}
