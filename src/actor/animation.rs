//! Hands window transitions to a remote animation controller.
//!
//! The controller only animates surfaces; whatever has to happen once an
//! animation ends (minimizing, closing) is posted back to the inner manager
//! from the completion callback.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, info, instrument, warn};

use super::error::WmError;
use super::inner_manager::InnerManagerHandle;
use crate::common::config::AnimationSettings;
use crate::model::minimize::MinimizeQueue;
use crate::model::window::{WindowNode, WindowType};
use crate::model::window_root::WindowRoot;
use crate::sys::geometry::RoundedRect;
use crate::sys::remote::{
    AbilityManager, AbilityToken, AnimationTarget, FinishedCallback, StartingAppType,
    WindowAnimationController, same_object,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum_macros::Display)]
pub enum TransitionReason {
    #[default]
    Ability,
    Minimize,
    Close,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum TransitionEvent {
    Unknown,
    AppTransition,
    Home,
    Minimize,
    Close,
    Back,
}

/// What the ability side tells us about one end of a transition.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionInfo {
    pub bundle_name: String,
    pub ability_name: String,
    pub window_type: WindowType,
    pub reason: TransitionReason,
    pub is_recent: bool,
    pub ability_token: Option<AbilityToken>,
}

impl Default for TransitionInfo {
    fn default() -> Self {
        TransitionInfo {
            bundle_name: String::new(),
            ability_name: String::new(),
            window_type: WindowType::AppMainWindow,
            reason: TransitionReason::Ability,
            is_recent: false,
            ability_token: None,
        }
    }
}

pub struct AnimationCoordinator {
    enabled: bool,
    controller: Mutex<Option<Arc<dyn WindowAnimationController>>>,
    root: WindowRoot,
    minimize: MinimizeQueue,
    inner: InnerManagerHandle,
    ability: Arc<dyn AbilityManager>,
}

impl AnimationCoordinator {
    pub fn new(
        settings: &AnimationSettings,
        root: WindowRoot,
        minimize: MinimizeQueue,
        inner: InnerManagerHandle,
        ability: Arc<dyn AbilityManager>,
    ) -> AnimationCoordinator {
        AnimationCoordinator {
            enabled: settings.remote_enabled,
            controller: Mutex::new(None),
            root,
            minimize,
            inner,
            ability,
        }
    }

    pub fn set_window_animation_controller(
        &self,
        controller: Arc<dyn WindowAnimationController>,
    ) -> Result<(), WmError> {
        if !self.enabled {
            error!("remote animation is not enabled, refusing controller");
            return Err(WmError::NoRemoteAnimation);
        }
        let mut current = self.controller.lock();
        if current.is_some() {
            info!("replacing window animation controller, maybe a user switch");
        }
        *current = Some(controller);
        Ok(())
    }

    pub fn check_animation_controller(&self) -> bool {
        let present = self.controller.lock().is_some();
        if !present {
            debug!("no window animation controller");
        }
        present
    }

    /// Both ends must have something to draw.
    pub fn check_transition(&self, src: Option<&WindowNode>, dst: Option<&WindowNode>) -> bool {
        for node in [src, dst].into_iter().flatten() {
            if !node.has_surface() {
                info!(id = %node.id(), "window has no surface to animate");
                return false;
            }
        }
        self.check_animation_controller()
    }

    /// Forgets the controller if it is the one whose process died.
    pub fn on_remote_died(&self, controller: &Arc<dyn WindowAnimationController>) {
        let mut current = self.controller.lock();
        if current.as_ref().is_some_and(|c| same_object(c, controller)) {
            info!("window animation controller died");
            *current = None;
        }
    }

    pub fn transition_event(
        src_info: &TransitionInfo,
        dst_info: &TransitionInfo,
        src_node: Option<&WindowNode>,
        dst_node: Option<&WindowNode>,
    ) -> TransitionEvent {
        if src_node.is_some() {
            match src_info.reason {
                TransitionReason::Close => return TransitionEvent::Close,
                TransitionReason::Minimize => return TransitionEvent::Minimize,
                TransitionReason::Back => return TransitionEvent::Back,
                TransitionReason::Ability => {}
            }
        }
        if dst_node.is_none() {
            if dst_info.ability_token.is_none() {
                error!("transition target has no ability token");
            }
            return TransitionEvent::Unknown;
        }
        match dst_info.window_type {
            t if t.is_main_window() => TransitionEvent::AppTransition,
            WindowType::Desktop => TransitionEvent::Home,
            _ => TransitionEvent::Unknown,
        }
    }

    #[instrument(skip_all, fields(dst = %dst_node.id()))]
    pub fn notify_animation_transition(
        &self,
        src_info: &TransitionInfo,
        dst_info: &TransitionInfo,
        src_node: Option<&Arc<WindowNode>>,
        dst_node: &Arc<WindowNode>,
    ) -> Result<(), WmError> {
        if !dst_node.starting_window_shown() {
            error!("destination shows no starting window");
            return Err(WmError::NoRemoteAnimation);
        }
        let controller = self.controller()?;
        let finished = self.minimize_all_when_finished();
        let Some(dst_target) = self.create_target(dst_info, dst_node) else {
            finished.on_animation_finished();
            return Err(WmError::NoMem);
        };
        dst_node.set_play_animation_show(true);

        if let Some(src) = src_node
            && self.minimize.is_node_need_minimize(src)
        {
            let src_target = self.create_target(src_info, src);
            self.hide_for_animation(src);
            info!(src = %src.id(), "app transition");
            controller.on_app_transition(src_target, dst_target, finished);
            return Ok(());
        }
        let kind = if src_node.is_some_and(|n| n.window_type() == WindowType::Desktop) {
            StartingAppType::FromLauncher
        } else if src_info.is_recent {
            StartingAppType::FromRecent
        } else {
            StartingAppType::FromOther
        };
        info!(%kind, "start app");
        controller.on_start_app(kind, dst_target, finished);
        Ok(())
    }

    #[instrument(skip_all, fields(src = %src_node.id()))]
    pub fn notify_animation_minimize(
        &self,
        src_info: &TransitionInfo,
        src_node: &Arc<WindowNode>,
    ) -> Result<(), WmError> {
        let controller = self.controller()?;
        let target = self.create_target(src_info, src_node).ok_or(WmError::NoMem)?;
        self.hide_for_animation(src_node);
        let inner = self.inner.clone();
        let node = src_node.clone();
        let finished = FinishedCallback::new(move || inner.minimize_ability(&node, true));
        info!("minimize window");
        controller.on_minimize_window(target, finished);
        Ok(())
    }

    /// `event` picks what happens to the ability afterwards: closed for
    /// `Close`, terminated for `Back`.
    #[instrument(skip_all, fields(src = %src_node.id(), %event))]
    pub fn notify_animation_close(
        &self,
        src_info: &TransitionInfo,
        src_node: &Arc<WindowNode>,
        event: TransitionEvent,
    ) -> Result<(), WmError> {
        let controller = self.controller()?;
        let target = self.create_target(src_info, src_node).ok_or(WmError::NoMem)?;
        self.hide_for_animation(src_node);
        let inner = self.inner.clone();
        let node = src_node.clone();
        let finished = FinishedCallback::new(move || match event {
            TransitionEvent::Close => inner.close_ability(&node),
            TransitionEvent::Back => inner.terminate_ability(&node),
            _ => {}
        });
        info!("close window");
        controller.on_close_window(target, finished);
        Ok(())
    }

    /// Animates every window waiting to be minimized out at once.
    #[instrument(skip_all)]
    pub fn notify_animation_by_home(&self) -> Result<(), WmError> {
        let controller = self.controller()?;
        let info = TransitionInfo::default();
        let mut targets = Vec::new();
        for node in self.minimize.need_minimize_app_nodes() {
            let Some(target) = self.create_target(&info, &node) else { continue };
            self.hide_for_animation(&node);
            targets.push(target);
        }
        info!(count = targets.len(), "minimize all by home");
        controller.on_minimize_all_window(targets, self.minimize_all_when_finished());
        Ok(())
    }

    pub fn notify_animation_screen_unlock(
        &self,
        callback: impl FnOnce() + Send + 'static,
    ) -> Result<(), WmError> {
        let controller = self.controller()?;
        info!("screen unlock");
        controller.on_screen_unlock(FinishedCallback::new(callback));
        Ok(())
    }

    fn controller(&self) -> Result<Arc<dyn WindowAnimationController>, WmError> {
        self.controller.lock().clone().ok_or(WmError::NoRemoteAnimation)
    }

    fn minimize_all_when_finished(&self) -> FinishedCallback {
        let minimize = self.minimize.clone();
        FinishedCallback::new(move || {
            debug!("animation finished, minimizing queued windows");
            minimize.execute_minimize_all();
        })
    }

    /// Marks the node as animating out, snapshots its mission and takes it
    /// out of the tree so normal hiding does not run.
    fn hide_for_animation(&self, node: &WindowNode) {
        node.set_play_animation_hide(true);
        if let Some(token) = node.ability_token() {
            self.ability.update_mission_snapshot(token);
        }
        self.root.remove_window_node(node.id());
    }

    fn create_target(&self, info: &TransitionInfo, node: &WindowNode) -> Option<AnimationTarget> {
        let surface = if node.window_type().is_app_window() {
            node.leash_surface()
        } else {
            node.surface()
        };
        let Some(surface) = surface else {
            warn!(id = %node.id(), "window has no surface for an animation target");
            return None;
        };
        let property = node.property();
        Some(AnimationTarget {
            bundle_name: info.bundle_name.clone(),
            ability_name: info.ability_name.clone(),
            window_id: property.window_id,
            display_id: property.display_id,
            surface,
            bounds: RoundedRect::new(property.window_rect, property.corner_radius),
        })
    }
}
