use std::cell::RefCell;
use std::sync::{Arc, Weak};

use parking_lot::ReentrantMutex;
use tracing::{debug, info, instrument, trace, warn};

use super::geometry::Point;
use super::remote::{SurfaceHandle, same_object};
use crate::actor::error::DmError;
use crate::common::collections::HashMap;
use crate::common::config::ScreenSettings;
use crate::model::screen::{
    ExpandOption, PowerStateChangeReason, Screen, ScreenChangeEvent, ScreenGroup,
    ScreenGroupChangeEvent, ScreenGroupInfo, ScreenId, ScreenInfo, ScreenPowerState,
    VirtualScreenOption,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum AgentType {
    ScreenEventListener,
    DisplayEventListener,
}

/// Receives notifications from the display service. Every method defaults
/// to ignoring the notification.
pub trait DisplayManagerAgent: Send + Sync {
    fn on_screen_connect(&self, _info: Option<ScreenInfo>) {}
    fn on_screen_disconnect(&self, _id: ScreenId) {}
    fn on_screen_change(&self, _info: Option<ScreenInfo>, _event: ScreenChangeEvent) {}
    fn on_screen_group_change(&self, _infos: Vec<ScreenInfo>, _event: ScreenGroupChangeEvent) {}
}

/// Agent that ignores everything. The display service uses it to tie
/// virtual screens to the lifetime of the process that created them.
pub struct DefaultAgent;

impl DisplayManagerAgent for DefaultAgent {}

/// The display service: the authority on which screens exist.
pub trait ScreenSource: Send + Sync {
    fn screen_info(&self, id: ScreenId) -> Option<ScreenInfo>;
    fn all_screen_infos(&self) -> Vec<ScreenInfo>;
    fn screen_group_info(&self, id: ScreenId) -> Option<ScreenGroupInfo>;
    fn register_agent(&self, agent: Arc<dyn DisplayManagerAgent>, kind: AgentType) -> bool;
    fn unregister_agent(&self, agent: &Arc<dyn DisplayManagerAgent>, kind: AgentType) -> bool;
    fn create_virtual_screen(
        &self,
        option: VirtualScreenOption,
        agent: Arc<dyn DisplayManagerAgent>,
    ) -> ScreenId;
    fn destroy_virtual_screen(&self, id: ScreenId) -> Result<(), DmError>;
    fn set_virtual_screen_surface(&self, id: ScreenId, surface: SurfaceHandle) -> Result<(), DmError>;
    fn make_mirror(&self, main: ScreenId, mirrors: &[ScreenId]) -> ScreenId;
    fn make_expand(&self, screens: &[ScreenId], start_points: &[Point]) -> ScreenId;
    fn remove_virtual_screen_from_group(&self, screens: &[ScreenId]);
    fn set_screen_power_for_all(&self, state: ScreenPowerState, reason: PowerStateChangeReason)
    -> bool;
    fn screen_power(&self, id: ScreenId) -> ScreenPowerState;
    fn set_screen_rotation_locked(&self, locked: bool);
    fn is_screen_rotation_locked(&self) -> bool;
}

pub trait ScreenListener: Send + Sync {
    fn on_connect(&self, id: ScreenId);
    fn on_disconnect(&self, id: ScreenId);
    fn on_change(&self, id: ScreenId);
}

pub trait ScreenGroupListener: Send + Sync {
    fn on_change(&self, ids: &[ScreenId], event: ScreenGroupChangeEvent);
}

/// Local cache of screens and screen groups, kept in sync with the display
/// service and fanned out to local listeners.
///
/// All state sits behind one reentrant lock: listeners are called with the
/// lock held and may query the registry again from the same thread.
#[derive(Clone)]
pub struct ScreenRegistry(Arc<Inner>);

struct Inner {
    source: Arc<dyn ScreenSource>,
    max_group_size: usize,
    state: ReentrantMutex<RefCell<State>>,
}

#[derive(Default)]
struct State {
    screens: HashMap<ScreenId, Arc<Screen>>,
    groups: HashMap<ScreenId, Arc<ScreenGroup>>,
    screen_listeners: Vec<Arc<dyn ScreenListener>>,
    group_listeners: Vec<Arc<dyn ScreenGroupListener>>,
    agent: Option<Arc<dyn DisplayManagerAgent>>,
    virtual_agent: Option<Arc<dyn DisplayManagerAgent>>,
}

impl State {
    fn update_screen(&mut self, info: ScreenInfo) -> bool {
        let id = info.id;
        if !id.is_valid() {
            warn!("screen info carries an invalid id");
            return false;
        }
        match self.screens.get(&id) {
            Some(screen) => {
                trace!(?id, "refreshing cached screen");
                screen.update(info);
            }
            None => {
                self.screens.insert(id, Screen::new(info));
            }
        }
        true
    }
}

impl Inner {
    fn with_state<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        f(&mut state)
    }

    fn notify_connect(&self, info: ScreenInfo) {
        let id = info.id;
        let _guard = self.state.lock();
        if !self.with_state(|s| s.update_screen(info)) {
            return;
        }
        let listeners = self.with_state(|s| s.screen_listeners.clone());
        for listener in listeners {
            listener.on_connect(id);
        }
    }

    fn notify_disconnect(&self, id: ScreenId) {
        info!(?id, "screen disconnected");
        let _guard = self.state.lock();
        self.with_state(|s| s.screens.remove(&id));
        let listeners = self.with_state(|s| s.screen_listeners.clone());
        for listener in listeners {
            listener.on_disconnect(id);
        }
    }

    fn notify_change(&self, info: ScreenInfo, event: ScreenChangeEvent) {
        let id = info.id;
        debug!(?id, %event, "screen changed");
        let _guard = self.state.lock();
        if !self.with_state(|s| s.update_screen(info)) {
            return;
        }
        let listeners = self.with_state(|s| s.screen_listeners.clone());
        for listener in listeners {
            listener.on_change(id);
        }
    }

    fn notify_group_change(&self, infos: Vec<ScreenInfo>, event: ScreenGroupChangeEvent) {
        debug!(count = infos.len(), %event, "screen group changed");
        let ids: Vec<ScreenId> = infos.iter().map(|i| i.id).filter(ScreenId::is_valid).collect();
        let _guard = self.state.lock();
        self.with_state(|s| {
            for info in infos {
                s.update_screen(info);
            }
        });
        let listeners = self.with_state(|s| s.group_listeners.clone());
        for listener in listeners {
            listener.on_change(&ids, event);
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let agent = self.state.get_mut().get_mut().agent.take();
        if let Some(agent) = agent
            && !self.source.unregister_agent(&agent, AgentType::ScreenEventListener)
        {
            warn!("failed to unregister screen event agent");
        }
    }
}

/// The registry's single subscription with the display service.
struct RegistryAgent {
    registry: Weak<Inner>,
}

impl DisplayManagerAgent for RegistryAgent {
    fn on_screen_connect(&self, info: Option<ScreenInfo>) {
        let Some(info) = info.filter(|i| i.id.is_valid()) else {
            warn!("dropping connect notification with invalid screen info");
            return;
        };
        if let Some(inner) = self.registry.upgrade() {
            inner.notify_connect(info);
        }
    }

    fn on_screen_disconnect(&self, id: ScreenId) {
        if !id.is_valid() {
            warn!("dropping disconnect notification for invalid screen");
            return;
        }
        if let Some(inner) = self.registry.upgrade() {
            inner.notify_disconnect(id);
        }
    }

    fn on_screen_change(&self, info: Option<ScreenInfo>, event: ScreenChangeEvent) {
        let Some(info) = info.filter(|i| i.id.is_valid()) else {
            warn!("dropping change notification with invalid screen info");
            return;
        };
        if let Some(inner) = self.registry.upgrade() {
            inner.notify_change(info, event);
        }
    }

    fn on_screen_group_change(&self, infos: Vec<ScreenInfo>, event: ScreenGroupChangeEvent) {
        if infos.is_empty() {
            warn!("dropping empty screen group notification");
            return;
        }
        if let Some(inner) = self.registry.upgrade() {
            inner.notify_group_change(infos, event);
        }
    }
}

impl ScreenRegistry {
    pub fn new(source: Arc<dyn ScreenSource>, settings: &ScreenSettings) -> ScreenRegistry {
        ScreenRegistry(Arc::new(Inner {
            source,
            max_group_size: settings.max_group_size,
            state: ReentrantMutex::new(RefCell::new(State::default())),
        }))
    }

    pub fn source(&self) -> &Arc<dyn ScreenSource> { &self.0.source }

    /// Refreshes one screen from the display service. A screen the service
    /// no longer knows is evicted.
    pub fn screen(&self, id: ScreenId) -> Option<Arc<Screen>> {
        let info = self.0.source.screen_info(id);
        self.0.with_state(|s| {
            if let Some(info) = info
                && s.update_screen(info)
            {
                return s.screens.get(&id).cloned();
            }
            s.screens.remove(&id);
            None
        })
    }

    pub fn screen_group(&self, id: ScreenId) -> Option<Arc<ScreenGroup>> {
        let info = self.0.source.screen_group_info(id);
        self.0.with_state(|s| {
            let Some(info) = info else {
                debug!(?id, "screen group not found");
                s.groups.remove(&id);
                return None;
            };
            if let Some(group) = s.groups.get(&id) {
                group.update(info);
                return Some(group.clone());
            }
            let group = ScreenGroup::new(info);
            s.groups.insert(id, group.clone());
            Some(group)
        })
    }

    /// Replaces the whole cache with a fresh enumeration.
    pub fn all_screens(&self) -> Vec<Arc<Screen>> {
        let infos = self.0.source.all_screen_infos();
        self.0.with_state(|s| {
            let mut screens = Vec::with_capacity(infos.len());
            for info in infos {
                let id = info.id;
                if s.update_screen(info)
                    && let Some(screen) = s.screens.get(&id)
                {
                    screens.push(screen.clone());
                }
            }
            s.screens = screens.iter().map(|screen| (screen.id(), screen.clone())).collect();
            screens
        })
    }

    /// Whether the screen is cached, without asking the display service.
    pub fn is_cached(&self, id: ScreenId) -> bool { self.0.with_state(|s| s.screens.contains_key(&id)) }

    pub fn register_screen_listener(&self, listener: Arc<dyn ScreenListener>) -> bool {
        let _guard = self.0.state.lock();
        if !self.subscribe() {
            warn!("register screen listener failed");
            return false;
        }
        self.0.with_state(|s| {
            if !s.screen_listeners.iter().any(|l| same_object(l, &listener)) {
                s.screen_listeners.push(listener);
            }
        });
        true
    }

    pub fn unregister_screen_listener(&self, listener: &Arc<dyn ScreenListener>) -> bool {
        let _guard = self.0.state.lock();
        let removed = self.0.with_state(|s| {
            let before = s.screen_listeners.len();
            s.screen_listeners.retain(|l| !same_object(l, listener));
            before != s.screen_listeners.len()
        });
        if !removed {
            warn!("could not find this screen listener");
            return false;
        }
        self.unsubscribe_if_idle()
    }

    pub fn register_screen_group_listener(&self, listener: Arc<dyn ScreenGroupListener>) -> bool {
        let _guard = self.0.state.lock();
        if !self.subscribe() {
            warn!("register screen group listener failed");
            return false;
        }
        self.0.with_state(|s| {
            if !s.group_listeners.iter().any(|l| same_object(l, &listener)) {
                s.group_listeners.push(listener);
            }
        });
        true
    }

    pub fn unregister_screen_group_listener(&self, listener: &Arc<dyn ScreenGroupListener>) -> bool {
        let _guard = self.0.state.lock();
        let removed = self.0.with_state(|s| {
            let before = s.group_listeners.len();
            s.group_listeners.retain(|l| !same_object(l, listener));
            before != s.group_listeners.len()
        });
        if !removed {
            warn!("could not find this screen group listener");
            return false;
        }
        self.unsubscribe_if_idle()
    }

    /// Must be called with the state lock held.
    fn subscribe(&self) -> bool {
        if self.0.with_state(|s| s.agent.is_some()) {
            return true;
        }
        let agent: Arc<dyn DisplayManagerAgent> =
            Arc::new(RegistryAgent { registry: Arc::downgrade(&self.0) });
        self.0.with_state(|s| s.agent = Some(agent.clone()));
        if self.0.source.register_agent(agent, AgentType::ScreenEventListener) {
            debug!("subscribed to screen events");
            return true;
        }
        self.0.with_state(|s| s.agent = None);
        false
    }

    /// Must be called with the state lock held.
    fn unsubscribe_if_idle(&self) -> bool {
        let agent = self.0.with_state(|s| {
            if s.screen_listeners.is_empty() && s.group_listeners.is_empty() {
                s.agent.take()
            } else {
                None
            }
        });
        match agent {
            Some(agent) => {
                debug!("unsubscribing from screen events");
                self.0.source.unregister_agent(&agent, AgentType::ScreenEventListener)
            }
            None => true,
        }
    }

    #[instrument(skip(self), fields(name = %option.name))]
    pub fn create_virtual_screen(&self, option: VirtualScreenOption) -> ScreenId {
        let agent = self.0.with_state(|s| {
            s.virtual_agent
                .get_or_insert_with(|| Arc::new(DefaultAgent) as Arc<dyn DisplayManagerAgent>)
                .clone()
        });
        let id = self.0.source.create_virtual_screen(option, agent);
        if !id.is_valid() {
            warn!("create virtual screen failed");
        }
        id
    }

    pub fn destroy_virtual_screen(&self, id: ScreenId) -> Result<(), DmError> {
        self.0.source.destroy_virtual_screen(id)
    }

    pub fn set_virtual_screen_surface(&self, id: ScreenId, surface: SurfaceHandle) -> Result<(), DmError> {
        self.0.source.set_virtual_screen_surface(id, surface)
    }

    #[instrument(skip(self, mirrors), fields(count = mirrors.len()))]
    pub fn make_mirror(&self, main: ScreenId, mirrors: &[ScreenId]) -> ScreenId {
        if mirrors.len() > self.0.max_group_size {
            warn!(max = self.0.max_group_size, "make mirror failed, too many screens");
            return ScreenId::INVALID;
        }
        let group = self.0.source.make_mirror(main, mirrors);
        if !group.is_valid() {
            info!("make mirror failed");
        }
        group
    }

    /// Duplicate screens keep their first start point.
    #[instrument(skip(self, options), fields(count = options.len()))]
    pub fn make_expand(&self, options: &[ExpandOption]) -> ScreenId {
        if options.is_empty() {
            return ScreenId::INVALID;
        }
        if options.len() > self.0.max_group_size {
            warn!(max = self.0.max_group_size, "make expand failed, too many screens");
            return ScreenId::INVALID;
        }
        let mut screens = Vec::with_capacity(options.len());
        let mut start_points = Vec::with_capacity(options.len());
        for option in options {
            if screens.contains(&option.screen_id) {
                continue;
            }
            screens.push(option.screen_id);
            start_points.push(Point::new(option.start_x, option.start_y));
        }
        let group = self.0.source.make_expand(&screens, &start_points);
        if !group.is_valid() {
            info!("make expand failed");
        }
        group
    }

    pub fn remove_virtual_screen_from_group(&self, screens: &[ScreenId]) {
        if screens.is_empty() {
            warn!("remove virtual screen from group failed, no screens given");
            return;
        }
        if screens.len() > self.0.max_group_size {
            warn!(max = self.0.max_group_size, "remove virtual screen from group failed, too many screens");
            return;
        }
        self.0.source.remove_virtual_screen_from_group(screens);
    }

    pub fn set_screen_power_for_all(&self, state: ScreenPowerState, reason: PowerStateChangeReason) -> bool {
        info!(%state, %reason, "set screen power for all");
        self.0.source.set_screen_power_for_all(state, reason)
    }

    pub fn screen_power(&self, id: ScreenId) -> ScreenPowerState { self.0.source.screen_power(id) }

    pub fn set_screen_rotation_locked(&self, locked: bool) {
        self.0.source.set_screen_rotation_locked(locked)
    }

    pub fn is_screen_rotation_locked(&self) -> bool { self.0.source.is_screen_rotation_locked() }
}
