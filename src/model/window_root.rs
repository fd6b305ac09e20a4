use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use super::display::DisplayId;
use super::window::{PropertyChangeAction, WindowId, WindowNode, WindowProperty};
use crate::actor::move_drag::WindowUpdateSink;
use crate::common::collections::HashMap;
use crate::sys::input::PointerEvent;

/// Source of truth for which windows exist. Each display keeps its windows
/// in stacking order, bottom first.
#[derive(Clone, Default)]
pub struct WindowRoot(Arc<RootInner>);

#[derive(Default)]
struct RootInner {
    nodes: DashMap<WindowId, Arc<WindowNode>>,
    stacks: Mutex<HashMap<DisplayId, Vec<WindowId>>>,
}

impl WindowRoot {
    pub fn new() -> WindowRoot { WindowRoot::default() }

    /// Adds the node on top of its display. Re-adding raises it.
    pub fn add_window_node(&self, node: Arc<WindowNode>) {
        let id = node.id();
        let display_id = node.display_id();
        self.0.nodes.insert(id, node);
        let mut stacks = self.0.stacks.lock();
        for stack in stacks.values_mut() {
            stack.retain(|w| *w != id);
        }
        stacks.entry(display_id).or_default().push(id);
        trace!(%id, %display_id, "window added");
    }

    pub fn remove_window_node(&self, id: WindowId) -> Option<Arc<WindowNode>> {
        let (_, node) = self.0.nodes.remove(&id)?;
        let mut stacks = self.0.stacks.lock();
        for stack in stacks.values_mut() {
            stack.retain(|w| *w != id);
        }
        debug!(%id, "window removed");
        Some(node)
    }

    pub fn window_node(&self, id: WindowId) -> Option<Arc<WindowNode>> {
        self.0.nodes.get(&id).map(|node| node.value().clone())
    }

    pub fn contains(&self, id: WindowId) -> bool { self.0.nodes.contains_key(&id) }

    pub fn len(&self) -> usize { self.0.nodes.len() }

    pub fn is_empty(&self) -> bool { self.0.nodes.is_empty() }

    pub fn raise_to_top(&self, id: WindowId) -> bool {
        let Some(node) = self.window_node(id) else { return false };
        let mut stacks = self.0.stacks.lock();
        let stack = stacks.entry(node.display_id()).or_default();
        stack.retain(|w| *w != id);
        stack.push(id);
        true
    }

    /// Windows on `display`, topmost first.
    pub fn nodes_top_down(&self, display: DisplayId) -> Vec<Arc<WindowNode>> {
        let ids = self.0.stacks.lock().get(&display).cloned().unwrap_or_default();
        ids.iter().rev().filter_map(|id| self.window_node(*id)).collect()
    }
}

impl WindowUpdateSink for WindowRoot {
    fn update_property(&self, property: &WindowProperty, action: PropertyChangeAction, from_server: bool) {
        let Some(node) = self.window_node(property.window_id) else {
            warn!(id = %property.window_id, "property update for unknown window");
            return;
        };
        match action {
            PropertyChangeAction::UpdateRect => {
                let rect = property.request_rect;
                let reason = property.size_change_reason;
                node.update_property(|p| {
                    p.set_rect(rect);
                    p.size_change_reason = reason;
                    p.drag_type = property.drag_type;
                });
                if from_server && let Some(token) = node.window_token() {
                    token.update_window_rect(rect, reason);
                }
            }
            PropertyChangeAction::UpdateMode => {
                let mode = property.mode();
                node.set_window_mode(mode);
                if from_server && let Some(token) = node.window_token() {
                    token.update_window_mode(mode);
                }
            }
            PropertyChangeAction::UpdateFlags => node.update_property(|p| p.flags = property.flags),
        }
    }

    fn notify_window_client_point_up(&self, id: WindowId, event: &PointerEvent) {
        let Some(node) = self.window_node(id) else {
            debug!(%id, "point up for a window that is gone");
            return;
        };
        if let Some(token) = node.window_token() {
            token.notify_window_client_point_up(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;
    use crate::model::window::{WindowMode, WindowSizeChangeReason, WindowType};
    use crate::sys::geometry::{Point, Rect};
    use crate::sys::input::PointerAction;
    use crate::testing::{TestWindow, TokenCall};

    fn ids(nodes: Vec<Arc<WindowNode>>) -> Vec<u32> { nodes.iter().map(|n| n.id().get()).collect() }

    #[test]
    fn stacking_order_follows_insertion_and_raise() {
        let root = WindowRoot::new();
        for id in 1..=3 {
            root.add_window_node(TestWindow::new(id, WindowType::AppMainWindow, WindowMode::Fullscreen).node);
        }
        assert_eq!(ids(root.nodes_top_down(DisplayId::DEFAULT)), vec![3, 2, 1]);

        assert!(root.raise_to_top(WindowId::new(1)));
        assert_eq!(ids(root.nodes_top_down(DisplayId::DEFAULT)), vec![1, 3, 2]);

        assert!(root.remove_window_node(WindowId::new(3)).is_some());
        assert_eq!(ids(root.nodes_top_down(DisplayId::DEFAULT)), vec![1, 2]);
        assert!(root.remove_window_node(WindowId::new(3)).is_none());
        assert!(!root.raise_to_top(WindowId::new(3)));
        assert_eq!(root.len(), 2);
    }

    #[test]
    fn rect_updates_reach_node_and_client() {
        let root = WindowRoot::new();
        let window = TestWindow::new(4, WindowType::AppMainWindow, WindowMode::Floating);
        root.add_window_node(window.node.clone());

        let mut property = window.node.property();
        property.request_rect = Rect::new(10, 20, 300, 400);
        property.size_change_reason = WindowSizeChangeReason::Drag;
        root.update_property(&property, PropertyChangeAction::UpdateRect, true);

        assert_eq!(window.node.window_rect(), Rect::new(10, 20, 300, 400));
        assert_eq!(
            window.token.calls(),
            vec![TokenCall::Rect(Rect::new(10, 20, 300, 400), WindowSizeChangeReason::Drag)]
        );
    }

    #[test]
    fn point_up_goes_to_the_named_window() {
        let root = WindowRoot::new();
        let window = TestWindow::new(5, WindowType::AppMainWindow, WindowMode::Floating);
        root.add_window_node(window.node.clone());

        let event = PointerEvent::new(WindowId::new(5), PointerAction::Up, 0, Point::new(1, 1));
        root.notify_window_client_point_up(WindowId::new(5), &event);
        root.notify_window_client_point_up(WindowId::new(6), &event);

        assert_eq!(window.token.calls(), vec![TokenCall::PointUp(PointerAction::Up)]);
    }
}
