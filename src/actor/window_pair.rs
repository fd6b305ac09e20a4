//! Split-screen bookkeeping for one display.
//!
//! A pair holds up to three windows: the primary half, the secondary half
//! and the divider between them. Its status is always derived from which
//! slots are filled, and the side effects (creating the divider, tearing the
//! pair down) follow from the status transition alone.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use super::inner_manager::InnerManagerHandle;
use crate::common::config::Config;
use crate::model::display::DisplayId;
use crate::model::minimize::{MinimizeQueue, MinimizeReason};
use crate::model::window::{ModeSupport, WindowFlags, WindowMode, WindowNode, WindowType};
use crate::sys::geometry::Rect;
use crate::sys::remote::{
    AbilityManager, BroadcastPublisher, CallingIdentity, CommonEvent, IdentityGuard,
    SPLIT_SCREEN_EVENT,
};

pub const DIVIDER_WINDOW_NAME: &str = "dialog_divider_ui";
pub const PLACEHOLDER_WINDOW_NAME: &str = "place_holder";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum_macros::Display)]
pub enum WindowPairStatus {
    #[default]
    Empty,
    SinglePrimary,
    SingleSecondary,
    Pairing,
    PairedDone,
}

impl WindowPairStatus {
    fn is_paired_or_pairing(self) -> bool {
        matches!(self, WindowPairStatus::Pairing | WindowPairStatus::PairedDone)
    }
}

/// Services a pair reaches out to.
#[derive(Clone)]
pub struct PairDeps {
    pub inner: InnerManagerHandle,
    pub minimize: MinimizeQueue,
    pub ability: Arc<dyn AbilityManager>,
    pub broadcast: Arc<dyn BroadcastPublisher>,
    pub identity: Arc<dyn CallingIdentity>,
}

/// Not synchronized: each display's pair is only touched from the thread
/// handling window updates.
pub struct WindowPair {
    display_id: DisplayId,
    primary: Option<Arc<WindowNode>>,
    secondary: Option<Arc<WindowNode>>,
    divider: Option<Arc<WindowNode>>,
    status: WindowPairStatus,
    ratio: f32,
    divider_rect: Rect,
    placeholder_rect: Rect,
    restoring_all: bool,
    deps: PairDeps,
}

fn same_window(slot: &Option<Arc<WindowNode>>, node: &WindowNode) -> bool {
    slot.as_ref().is_some_and(|n| n.id() == node.id())
}

impl WindowPair {
    pub fn new(display_id: DisplayId, deps: PairDeps, config: &Config) -> WindowPair {
        WindowPair {
            display_id,
            primary: None,
            secondary: None,
            divider: None,
            status: WindowPairStatus::Empty,
            ratio: config.split.default_ratio,
            divider_rect: config.split.divider_rect,
            placeholder_rect: config.inner_window.placeholder_rect,
            restoring_all: false,
            deps,
        }
    }

    pub fn display_id(&self) -> DisplayId { self.display_id }

    pub fn status(&self) -> WindowPairStatus { self.status }

    pub fn primary(&self) -> Option<&Arc<WindowNode>> { self.primary.as_ref() }

    pub fn secondary(&self) -> Option<&Arc<WindowNode>> { self.secondary.as_ref() }

    pub fn divider(&self) -> Option<&Arc<WindowNode>> { self.divider.as_ref() }

    pub fn split_ratio(&self) -> f32 { self.ratio }

    pub fn set_split_ratio(&mut self, ratio: f32) { self.ratio = ratio; }

    pub fn divider_rect(&self) -> Rect { self.divider_rect }

    pub fn set_divider_rect(&mut self, rect: Rect) { self.divider_rect = rect; }

    /// While every split app is being restored at once, no placeholder or
    /// broadcast is produced for the first half.
    pub fn set_all_app_windows_restoring(&mut self, restoring: bool) { self.restoring_all = restoring; }

    pub fn find(&self, node: &WindowNode) -> Option<&Arc<WindowNode>> {
        [&self.primary, &self.secondary, &self.divider]
            .into_iter()
            .find(|slot| same_window(slot, node))
            .and_then(Option::as_ref)
    }

    pub fn is_paired(&self) -> bool {
        let (Some(primary), Some(secondary)) = (&self.primary, &self.secondary) else {
            return false;
        };
        primary.window_mode() == WindowMode::SplitPrimary
            && secondary.window_mode() == WindowMode::SplitSecondary
            && self.divider.is_some()
    }

    pub fn is_split_related(&self, node: &WindowNode) -> bool {
        node.is_split_mode() || node.window_type() == WindowType::DockSlice
    }

    /// Dragging the divider is refused once either half asks for it.
    pub fn is_forbid_dock_slice_move(&self) -> bool {
        if self.status != WindowPairStatus::PairedDone {
            return false;
        }
        [&self.primary, &self.secondary]
            .into_iter()
            .flatten()
            .any(|n| n.flags().contains(WindowFlags::FORBID_SPLIT_MOVE))
    }

    /// `exit_band` holds the lowest and highest divider origin that keeps
    /// the split alive.
    pub fn is_dock_slice_in_exit_split_mode_area(&self, exit_band: [i32; 2]) -> bool {
        if !self.is_paired() {
            return false;
        }
        let Some(divider) = &self.divider else { return false };
        let rect = divider.window_rect();
        let origin = if rect.width < rect.height { rect.pos_x } else { rect.pos_y };
        origin < exit_band[0] || origin > exit_band[1]
    }

    /// Minimizes the smaller half, leaving the other one to go full screen.
    #[instrument(skip(self), fields(display = %self.display_id))]
    pub fn exit_split_mode(&mut self) {
        if !self.is_paired() {
            return;
        }
        let (Some(primary), Some(secondary), Some(divider)) = (&self.primary, &self.secondary, &self.divider)
        else {
            return;
        };
        let divider_rect = divider.window_rect();
        let stacked = divider_rect.height < divider_rect.width;
        let (p, s) = (primary.window_rect(), secondary.window_rect());
        let primary_smaller = if stacked { p.height < s.height } else { p.width < s.width };
        let hide = if primary_smaller { primary } else { secondary };
        info!(id = %hide.id(), "exiting split mode");
        self.deps.minimize.add_need_minimize_app(hide, MinimizeReason::SplitQuit);
        self.deps.minimize.execute_minimize_target_reason(MinimizeReason::SplitQuit);
    }

    /// App windows of the pair starting with the side `node` is on, then
    /// the divider. Empty when `node` is not part of the pair.
    pub fn ordered_pair(&self, node: &WindowNode) -> Vec<Arc<WindowNode>> {
        if self.find(node).is_none() {
            return Vec::new();
        }
        let app = |slot: &Option<Arc<WindowNode>>| {
            slot.as_ref().filter(|n| n.window_type().is_app_window()).cloned()
        };
        let mut ordered = Vec::with_capacity(3);
        if node.window_mode() == WindowMode::SplitSecondary || node.window_type() == WindowType::DockSlice {
            ordered.extend(app(&self.secondary));
            ordered.extend(app(&self.primary));
        } else if node.window_mode() == WindowMode::SplitPrimary {
            ordered.extend(app(&self.primary));
            ordered.extend(app(&self.secondary));
        }
        ordered.extend(self.divider.clone());
        ordered
    }

    pub fn paired_windows(&self) -> Vec<Arc<WindowNode>> {
        [&self.primary, &self.secondary, &self.divider].into_iter().flatten().cloned().collect()
    }

    /// Entry point for any window whose mode or state changed.
    #[instrument(skip(self, node), fields(display = %self.display_id, id = %node.id(), mode = %node.window_mode()))]
    pub fn update_if_split_related(&mut self, node: &Arc<WindowNode>) {
        let tracked = self.find(node).is_some();
        if !tracked && !self.is_split_related(node) {
            debug!("window is neither split related nor paired");
            return;
        }
        if node.window_type() == WindowType::Placeholder {
            let mode = node.window_mode();
            let taken = [&self.primary, &self.secondary]
                .into_iter()
                .flatten()
                .any(|n| n.window_mode() == mode);
            if taken {
                self.deps.inner.destroy_inner_window(self.display_id, WindowType::Placeholder);
                return;
            }
        }
        debug!(status = %self.status, "updating window pair");
        if self.status == WindowPairStatus::Empty {
            self.insert(node);
            if !self.restoring_all {
                let holder_mode = node.window_mode().complementary().unwrap_or(WindowMode::SplitPrimary);
                self.deps.inner.create_inner_window(
                    PLACEHOLDER_WINDOW_NAME,
                    self.display_id,
                    self.placeholder_rect,
                    WindowType::Placeholder,
                    holder_mode,
                );
                self.send_broadcast_msg(node);
            }
        } else if tracked {
            self.handle_paired_nodes_change();
        } else {
            self.insert(node);
        }
    }

    /// Puts the node in the slot its mode or type calls for. A different
    /// app window already in that slot is queued for minimizing.
    pub fn insert(&mut self, node: &Arc<WindowNode>) {
        info!(id = %node.id(), "insert window into pair");
        let slot = match node.window_mode() {
            WindowMode::SplitPrimary => Some(&mut self.primary),
            WindowMode::SplitSecondary => Some(&mut self.secondary),
            _ if node.window_type() == WindowType::DockSlice => Some(&mut self.divider),
            _ => None,
        };
        if let Some(slot) = slot
            && let Some(evicted) = slot.replace(node.clone())
            && evicted.id() != node.id()
            && evicted.ability_token().is_some()
        {
            self.deps.minimize.add_need_minimize_app(&evicted, MinimizeReason::SplitReplace);
        }
        self.update_window_pair_status();
    }

    /// Resets every slot. Halves that can only run split are minimized,
    /// the others go back to the mode they had before the split.
    #[instrument(skip(self), fields(display = %self.display_id))]
    pub fn clear(&mut self) {
        info!("clear window pair");
        self.dump_pair_info();
        for node in [self.primary.take(), self.secondary.take()].into_iter().flatten() {
            let Some(token) = node.window_token() else { continue };
            if node.mode_support() == ModeSupport::SPLIT {
                self.deps.minimize.add_need_minimize_app(&node, MinimizeReason::SplitQuit);
                self.deps.minimize.execute_minimize_target_reason(MinimizeReason::SplitQuit);
            } else {
                let mode = node.update_property(|p| {
                    p.resume_last_mode();
                    p.mode()
                });
                token.update_window_mode(mode);
            }
        }
        if self.divider.take().is_some() {
            self.deps.inner.destroy_inner_window(self.display_id, WindowType::DockSlice);
        }
        self.status = WindowPairStatus::Empty;
    }

    pub fn handle_remove_window(&mut self, node: &Arc<WindowNode>) {
        if self.find(node).is_some() {
            info!(id = %node.id(), "paired window removed, clearing pair");
            self.clear();
            return;
        }
        if node.is_split_mode() {
            info!(id = %node.id(), "resuming unpaired split window");
            let Some(token) = node.window_token() else { return };
            let mode = node.update_property(|p| {
                p.resume_last_mode();
                p.mode()
            });
            token.update_window_mode(mode);
        }
    }

    /// Follows a display rotation.
    pub fn rotate_divider_window(&mut self, rect: Rect) {
        self.divider_rect = rect;
        if self.divider.is_none() {
            warn!("no divider to rotate");
            return;
        }
        self.deps.inner.update_inner_window(self.display_id, WindowType::DockSlice, rect.width, rect.height);
    }

    pub fn dump_pair_info(&self) {
        for (role, slot) in [("primary", &self.primary), ("secondary", &self.secondary), ("divider", &self.divider)] {
            if let Some(node) = slot {
                debug!(role, id = %node.id(), mode = %node.window_mode(), "pair member");
            }
        }
        debug!(status = %self.status, "pair status");
    }

    fn derive_status(&self) -> WindowPairStatus {
        match (self.primary.is_some(), self.secondary.is_some(), self.divider.is_some()) {
            (true, true, true) => WindowPairStatus::PairedDone,
            (true, true, false) => WindowPairStatus::Pairing,
            (true, false, _) => WindowPairStatus::SinglePrimary,
            (false, true, _) => WindowPairStatus::SingleSecondary,
            (false, false, _) => WindowPairStatus::Empty,
        }
    }

    fn update_window_pair_status(&mut self) {
        let prev = self.status;
        let next = self.derive_status();
        self.status = next;
        if next == WindowPairStatus::Pairing && !prev.is_paired_or_pairing() {
            self.deps.inner.create_inner_window(
                DIVIDER_WINDOW_NAME,
                self.display_id,
                self.divider_rect,
                WindowType::DockSlice,
                WindowMode::Floating,
            );
        } else if prev.is_paired_or_pairing() && !next.is_paired_or_pairing() {
            self.clear();
        }
        self.dump_pair_info();
    }

    fn handle_paired_nodes_change(&mut self) {
        if self.primary.as_ref().is_some_and(|n| !n.is_split_mode()) {
            self.primary = None;
        }
        if self.secondary.as_ref().is_some_and(|n| !n.is_split_mode()) {
            self.secondary = None;
        }
        let modes = (
            self.primary.as_ref().map(|n| n.window_mode()),
            self.secondary.as_ref().map(|n| n.window_mode()),
        );
        match modes {
            (Some(WindowMode::SplitSecondary), None) | (None, Some(WindowMode::SplitPrimary)) => {
                std::mem::swap(&mut self.primary, &mut self.secondary);
            }
            (Some(a), Some(b)) if a == b => self.switch_position(),
            _ => {}
        }
        self.update_window_pair_status();
    }

    /// Both halves claim the same side: the one that was already there
    /// yields and takes the other side.
    fn switch_position(&mut self) {
        let (Some(primary), Some(secondary)) = (&self.primary, &self.secondary) else { return };
        info!(primary = %primary.id(), secondary = %secondary.id(), mode = %primary.window_mode(), "switching pair positions");
        let (yielding, new_mode) = match primary.window_mode() {
            WindowMode::SplitPrimary => (primary, WindowMode::SplitSecondary),
            WindowMode::SplitSecondary => (secondary, WindowMode::SplitPrimary),
            _ => return,
        };
        yielding.set_window_mode(new_mode);
        if let Some(token) = yielding.window_token() {
            token.update_window_mode(new_mode);
        }
        std::mem::swap(&mut self.primary, &mut self.secondary);
    }

    fn send_broadcast_msg(&self, node: &WindowNode) {
        let _identity = IdentityGuard::reset(self.deps.identity.as_ref());
        let mission_id = node
            .ability_token()
            .and_then(|token| self.deps.ability.mission_id_by_token(token))
            .unwrap_or(-1);
        let mode = if node.window_mode() == WindowMode::SplitSecondary { "Primary" } else { "Secondary" };
        let event = CommonEvent::new(SPLIT_SCREEN_EVENT)
            .with_param("windowMode", mode)
            .with_param("missionId", mission_id);
        if !self.deps.broadcast.publish(event) {
            warn!("split screen broadcast was not delivered");
        }
        info!(mode, mission_id, "sent split screen broadcast");
    }
}

impl Drop for WindowPair {
    fn drop(&mut self) { self.clear(); }
}
