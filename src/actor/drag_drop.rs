use std::sync::Arc;

use tracing::{debug, error, info};

use crate::model::display::DisplayId;
use crate::model::window::{DragEvent, WindowId, WindowNode, WindowType};
use crate::model::window_root::WindowRoot;
use crate::sys::geometry::Point;

/// Tracks which window a drag-and-drop effect window is hovering over and
/// tells the windows it enters and leaves.
pub struct DragController {
    root: WindowRoot,
    hit_window: Option<WindowId>,
}

impl DragController {
    pub fn new(root: WindowRoot) -> DragController { DragController { root, hit_window: None } }

    pub fn hit_window_id(&self) -> Option<WindowId> { self.hit_window }

    pub fn start_drag(&mut self, window_id: WindowId) {
        let Some((display, point)) = self.drag_position(window_id) else {
            error!(%window_id, "cannot start drag without a hit point");
            return;
        };
        let Some(hit) = self.hit_window(display, point) else {
            error!(?point, "no window under the drag point");
            return;
        };
        send_drag_info(&hit, point, DragEvent::In);
        self.hit_window = Some(hit.id());
        info!(%window_id, hit = %hit.id(), "start drag");
    }

    pub fn update_drag_info(&mut self, window_id: WindowId) {
        let Some((display, point)) = self.drag_position(window_id) else { return };
        let Some(hit) = self.hit_window(display, point) else {
            error!(?point, "no window under the drag point");
            return;
        };
        if Some(hit.id()) == self.hit_window {
            send_drag_info(&hit, point, DragEvent::Move);
            return;
        }
        send_drag_info(&hit, point, DragEvent::In);
        if let Some(old) = self.hit_window.and_then(|id| self.root.window_node(id)) {
            send_drag_info(&old, point, DragEvent::Out);
        }
        debug!(from = ?self.hit_window, to = %hit.id(), "drag moved to another window");
        self.hit_window = Some(hit.id());
    }

    pub fn finish_drag(&mut self, window_id: WindowId) {
        let Some((_, point)) = self.drag_position(window_id) else { return };
        if let Some(hit) = self.hit_window.and_then(|id| self.root.window_node(id)) {
            send_drag_info(&hit, point, DragEvent::End);
        }
        self.hit_window = None;
        info!(%window_id, "end drag");
    }

    /// Topmost window on `display` under `point`, ignoring panels and
    /// everything stacked above them by type.
    pub fn hit_window(&self, display: DisplayId, point: Point) -> Option<Arc<WindowNode>> {
        self.root
            .nodes_top_down(display)
            .into_iter()
            .filter(|node| node.window_type() < WindowType::Panel)
            .find(|node| node.window_rect().contains(point))
    }

    /// Display and hit point of a dragging-effect window.
    fn drag_position(&self, window_id: WindowId) -> Option<(DisplayId, Point)> {
        let node = self.root.window_node(window_id)?;
        if node.window_type() != WindowType::DraggingEffect {
            debug!(%window_id, "not a dragging effect window");
            return None;
        }
        let property = node.property();
        Some((property.display_id, property.window_rect.origin().offset(property.hit_offset)))
    }
}

fn send_drag_info(node: &WindowNode, point: Point, event: DragEvent) {
    if let Some(token) = node.window_token() {
        token.update_window_drag_info(point, event);
    }
}
