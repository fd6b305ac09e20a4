use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, info};

use super::window::WindowNode;
use crate::actor::inner_manager::InnerManagerHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, strum_macros::Display)]
pub enum MinimizeReason {
    MinimizeButton,
    MinimizeAll,
    SplitReplace,
    SplitQuit,
    OtherWindow,
    GestureAnimation,
}

impl MinimizeReason {
    /// Whether the user asked for it, as opposed to the server deciding.
    pub fn is_from_user(self) -> bool {
        matches!(self, MinimizeReason::MinimizeButton | MinimizeReason::MinimizeAll)
    }
}

/// Windows waiting to be minimized, grouped by why. Entries are weak: a
/// window destroyed in the meantime is simply skipped.
#[derive(Clone)]
pub struct MinimizeQueue {
    pending: Arc<Mutex<BTreeMap<MinimizeReason, Vec<Weak<WindowNode>>>>>,
    manager: InnerManagerHandle,
}

impl MinimizeQueue {
    pub fn new(manager: InnerManagerHandle) -> MinimizeQueue {
        MinimizeQueue { pending: Arc::default(), manager }
    }

    pub fn add_need_minimize_app(&self, node: &Arc<WindowNode>, reason: MinimizeReason) {
        let mut pending = self.pending.lock();
        let entries = pending.entry(reason).or_default();
        if entries.iter().any(|w| w.as_ptr() == Arc::as_ptr(node)) {
            return;
        }
        debug!(id = %node.id(), %reason, "queued for minimize");
        entries.push(Arc::downgrade(node));
    }

    pub fn is_node_need_minimize(&self, node: &Arc<WindowNode>) -> bool {
        let pending = self.pending.lock();
        pending.values().flatten().any(|w| w.as_ptr() == Arc::as_ptr(node))
    }

    pub fn need_minimize_app_nodes(&self) -> Vec<Arc<WindowNode>> {
        let pending = self.pending.lock();
        let mut nodes: Vec<Arc<WindowNode>> = Vec::new();
        for node in pending.values().flatten().filter_map(Weak::upgrade) {
            if !nodes.iter().any(|n| Arc::ptr_eq(n, &node)) {
                nodes.push(node);
            }
        }
        nodes
    }

    pub fn clear_nodes_by_reason(&self, reason: MinimizeReason) { self.pending.lock().remove(&reason); }

    pub fn execute_minimize_target_reason(&self, reason: MinimizeReason) {
        let Some(entries) = self.pending.lock().remove(&reason) else { return };
        self.minimize(reason, entries);
    }

    pub fn execute_minimize_all(&self) {
        let pending = std::mem::take(&mut *self.pending.lock());
        info!(reasons = pending.len(), "minimizing all queued windows");
        for (reason, entries) in pending {
            self.minimize(reason, entries);
        }
    }

    fn minimize(&self, reason: MinimizeReason, entries: Vec<Weak<WindowNode>>) {
        for node in entries.iter().filter_map(Weak::upgrade) {
            self.manager.minimize_ability(&node, reason.is_from_user());
        }
    }
}
