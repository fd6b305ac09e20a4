use std::collections::BTreeMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use crossbeam_channel::RecvTimeoutError;
use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};

use super::remote::{Compositor, PixelMap, SurfaceHandle, same_object};
use super::screen::{ScreenListener, ScreenRegistry};
use crate::common::config::CaptureSettings;
use crate::model::display::{
    Display, DisplayEvent, DisplayId, DummyDisplay, ScreenBinding, VirtualDisplayInfo,
};
use crate::model::screen::{Screen, ScreenCombination, ScreenId, ScreenModeInfo, ScreenType};

pub trait DisplayChangeListener: Send + Sync {
    fn on_display_event(&self, event: DisplayEvent);
}

/// Binds logical displays to the screens the registry reports.
///
/// The first standalone real screen becomes the main screen: it either
/// adopts the pending dummy display or gets a fresh one. Real screens that
/// join a mirror group are attached to the display already showing a
/// member of that group.
///
/// Registry queries happen before the state lock is taken and listeners
/// run after it is released, so the registry lock is never acquired while
/// holding ours.
#[derive(Clone)]
pub struct DisplayBindingController(Arc<Inner>);

struct Inner {
    registry: ScreenRegistry,
    compositor: Option<Arc<dyn Compositor>>,
    capture_timeout: Duration,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    displays: BTreeMap<DisplayId, Display>,
    dummy: DummyDisplay,
    main_screen: Option<ScreenId>,
    next_display_id: u64,
    listeners: Vec<Arc<dyn DisplayChangeListener>>,
    screen_listener: Option<Arc<dyn ScreenListener>>,
}

impl State {
    fn allocate_id(&mut self) -> DisplayId {
        let id = DisplayId::new(self.next_display_id);
        self.next_display_id += 1;
        id
    }

    fn display_showing(&self, screen: ScreenId) -> Option<DisplayId> {
        self.displays.values().find(|d| d.shows(screen)).map(|d| d.id)
    }
}

fn mode_of(screen: &Screen) -> ScreenModeInfo { screen.active_mode().unwrap_or_default() }

impl Inner {
    fn with_state<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        f(&mut self.state.lock())
    }

    fn notify(&self, event: DisplayEvent) {
        debug!(?event, "display event");
        let listeners = self.with_state(|s| s.listeners.clone());
        for listener in listeners {
            listener.on_display_event(event);
        }
    }

    #[instrument(level = "debug", skip(self))]
    fn on_screen_connect(&self, id: ScreenId) {
        let Some(screen) = self.registry.screen(id) else {
            warn!("connected screen is unknown to the display service");
            return;
        };
        if screen.screen_type() != ScreenType::Real {
            debug!(kind = %screen.screen_type(), "not binding a display to this screen");
            return;
        }
        let group = self.registry.screen_group(screen.parent_id());
        let combination = group.as_ref().map(|g| g.combination()).unwrap_or_default();
        let event = match combination {
            ScreenCombination::Alone => self.bind_alone(&screen),
            ScreenCombination::Mirror => {
                let members = group.map(|g| g.children()).unwrap_or_default();
                self.attach_mirror(id, &members)
            }
            ScreenCombination::Expand => {
                debug!("expanded screens get no display of their own");
                None
            }
        };
        if let Some(event) = event {
            self.notify(event);
        }
    }

    fn bind_alone(&self, screen: &Screen) -> Option<DisplayEvent> {
        let id = screen.id();
        let mode = mode_of(screen);
        self.with_state(|s| {
            if let Some(main) = s.main_screen {
                warn!(%main, screen = %id, "a standalone screen is already bound, ignoring");
                return None;
            }
            s.main_screen = Some(id);
            match s.dummy.take() {
                DummyDisplay::Awaiting(display_id) if s.displays.contains_key(&display_id) => {
                    if let Some(d) = s.displays.get_mut(&display_id) {
                        d.binding = ScreenBinding::BoundTo(id);
                    }
                    info!(%display_id, screen = %id, "dummy display bound");
                    Some(DisplayEvent::DummyBound { display: display_id, screen: id })
                }
                _ => {
                    let display_id = s.allocate_id();
                    let mut d = Display::new(display_id, mode.width, mode.height, mode.refresh_rate);
                    d.binding = ScreenBinding::BoundTo(id);
                    s.displays.insert(display_id, d);
                    info!(%display_id, screen = %id, "display created");
                    Some(DisplayEvent::Created { display: display_id, screen: id })
                }
            }
        })
    }

    fn attach_mirror(&self, id: ScreenId, members: &[ScreenId]) -> Option<DisplayEvent> {
        self.with_state(|s| {
            let target = members
                .iter()
                .filter(|m| **m != id)
                .find_map(|m| s.display_showing(*m));
            let Some(display) = target else {
                warn!(screen = %id, "no display to mirror");
                return None;
            };
            let d = s.displays.get_mut(&display)?;
            if !d.mirrors.contains(&id) {
                d.mirrors.push(id);
            }
            Some(DisplayEvent::MirrorAttached { display, screen: id })
        })
    }

    fn on_screen_disconnect(&self, id: ScreenId) {
        let display = self.with_state(|s| {
            for d in s.displays.values_mut() {
                d.mirrors.retain(|m| *m != id);
            }
            s.displays.values().find(|d| d.binding == ScreenBinding::BoundTo(id)).map(|d| d.id)
        });
        self.notify(DisplayEvent::ScreenDisconnected { display, screen: id });
    }

    fn on_screen_change(&self, id: ScreenId) {
        let display = self.with_state(|s| s.display_showing(id));
        self.notify(DisplayEvent::ScreenChanged { display, screen: id });
    }
}

/// Forwards registry notifications without keeping the controller alive.
struct BindingListener {
    controller: Weak<Inner>,
}

impl ScreenListener for BindingListener {
    fn on_connect(&self, id: ScreenId) {
        if let Some(inner) = self.controller.upgrade() {
            inner.on_screen_connect(id);
        }
    }

    fn on_disconnect(&self, id: ScreenId) {
        if let Some(inner) = self.controller.upgrade() {
            inner.on_screen_disconnect(id);
        }
    }

    fn on_change(&self, id: ScreenId) {
        if let Some(inner) = self.controller.upgrade() {
            inner.on_screen_change(id);
        }
    }
}

impl DisplayBindingController {
    pub fn new(
        registry: ScreenRegistry,
        compositor: Option<Arc<dyn Compositor>>,
        capture: &CaptureSettings,
    ) -> DisplayBindingController {
        DisplayBindingController(Arc::new(Inner {
            registry,
            compositor,
            capture_timeout: capture.timeout(),
            state: Mutex::new(State::default()),
        }))
    }

    /// Starts following the registry and binds screens that are already
    /// connected.
    pub fn attach(&self) -> bool {
        if self.0.with_state(|s| s.screen_listener.is_some()) {
            return true;
        }
        let listener: Arc<dyn ScreenListener> =
            Arc::new(BindingListener { controller: Arc::downgrade(&self.0) });
        if !self.0.registry.register_screen_listener(listener.clone()) {
            warn!("could not follow screen events");
            return false;
        }
        self.0.with_state(|s| s.screen_listener = Some(listener));

        let mut existing: Vec<ScreenId> = self.0.registry.all_screens().iter().map(|s| s.id()).collect();
        existing.sort();
        for id in existing {
            self.0.on_screen_connect(id);
        }
        true
    }

    pub fn detach(&self) -> bool {
        match self.0.with_state(|s| s.screen_listener.take()) {
            Some(listener) => self.0.registry.unregister_screen_listener(&listener),
            None => true,
        }
    }

    pub fn registry(&self) -> &ScreenRegistry { &self.0.registry }

    pub fn register_display_change_listener(&self, listener: Arc<dyn DisplayChangeListener>) {
        self.0.with_state(|s| {
            if !s.listeners.iter().any(|l| same_object(l, &listener)) {
                s.listeners.push(listener);
            }
        });
    }

    pub fn unregister_display_change_listener(&self, listener: &Arc<dyn DisplayChangeListener>) -> bool {
        self.0.with_state(|s| {
            let before = s.listeners.len();
            s.listeners.retain(|l| !same_object(l, listener));
            before != s.listeners.len()
        })
    }

    /// Reserves a display for the first standalone screen to come. Returns
    /// `DisplayId::INVALID` once a dummy is pending or a main screen is bound.
    pub fn add_dummy_display(&self, width: u32, height: u32, refresh_rate: u32) -> DisplayId {
        self.0.with_state(|s| {
            if !s.dummy.is_absent() || s.main_screen.is_some() {
                warn!("dummy display not needed");
                return DisplayId::INVALID;
            }
            let id = s.allocate_id();
            s.displays.insert(id, Display::new(id, width, height, refresh_rate));
            s.dummy = DummyDisplay::Awaiting(id);
            debug!(%id, "dummy display added");
            id
        })
    }

    pub fn display(&self, id: DisplayId) -> Option<Display> {
        self.0.with_state(|s| s.displays.get(&id).cloned())
    }

    pub fn display_by_screen(&self, screen: ScreenId) -> Option<Display> {
        self.0.with_state(|s| s.displays.values().find(|d| d.shows(screen)).cloned())
    }

    pub fn all_display_ids(&self) -> Vec<DisplayId> {
        self.0.with_state(|s| s.displays.keys().copied().collect())
    }

    /// The display bound to the main screen, falling back to a pending dummy.
    pub fn default_display_id(&self) -> DisplayId {
        self.0.with_state(|s| {
            if let Some(main) = s.main_screen
                && let Some(id) = s.display_showing(main)
            {
                return id;
            }
            match s.dummy {
                DummyDisplay::Awaiting(id) => id,
                DummyDisplay::Absent => DisplayId::INVALID,
            }
        })
    }

    pub fn main_screen_id(&self) -> Option<ScreenId> { self.0.with_state(|s| s.main_screen) }

    pub fn has_pending_dummy(&self) -> bool { self.0.with_state(|s| !s.dummy.is_absent()) }

    pub fn default_screen_id(&self) -> ScreenId {
        match &self.0.compositor {
            Some(compositor) => compositor.default_screen_id(),
            None => ScreenId::INVALID,
        }
    }

    pub fn screen_active_mode(&self, id: ScreenId) -> Option<ScreenModeInfo> {
        self.0.compositor.as_ref()?.screen_active_mode(id)
    }

    #[instrument(skip(self, info), fields(name = %info.name))]
    pub fn create_virtual_screen(
        &self,
        info: &VirtualDisplayInfo,
        surface: Option<SurfaceHandle>,
    ) -> ScreenId {
        let Some(compositor) = &self.0.compositor else {
            warn!("no compositor to create a virtual screen on");
            return ScreenId::INVALID;
        };
        compositor.create_virtual_screen(info, surface)
    }

    pub fn destroy_virtual_screen(&self, id: ScreenId) -> bool {
        let Some(compositor) = &self.0.compositor else {
            warn!("no compositor to remove a virtual screen from");
            return false;
        };
        compositor.remove_virtual_screen(id);
        true
    }

    /// Captures whatever screen the display is bound to.
    pub fn display_snapshot(&self, id: DisplayId) -> Option<PixelMap> {
        let screen = self.display(id)?.screen_id();
        if !screen.is_valid() {
            warn!(%id, "display is not bound to a screen");
            return None;
        }
        self.screen_snapshot(screen)
    }

    /// Blocks until the compositor delivers the capture or the configured
    /// timeout passes.
    #[instrument(skip(self))]
    pub fn screen_snapshot(&self, id: ScreenId) -> Option<PixelMap> {
        let compositor = self.0.compositor.as_ref()?;
        let (tx, rx) = crossbeam_channel::bounded(1);
        let started = compositor.take_surface_capture(
            id,
            Box::new(move |image| {
                let _ = tx.send(image);
            }),
        );
        if !started {
            warn!("capture was refused");
            return None;
        }
        match rx.recv_timeout(self.0.capture_timeout) {
            Ok(image) => image,
            Err(RecvTimeoutError::Timeout) => {
                warn!(timeout = ?self.0.capture_timeout, "capture timed out");
                None
            }
            Err(RecvTimeoutError::Disconnected) => {
                warn!("capture callback dropped without an image");
                None
            }
        }
    }
}
