//! The window server context. It owns every service handle the window and
//! display sides share, and is the one place they get wired together.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, info, instrument, warn};

use crate::actor::animation::AnimationCoordinator;
use crate::actor::drag_drop::DragController;
use crate::actor::error::WmError;
use crate::actor::inner_manager::{InnerManagerDeps, InnerManagerHandle, WindowInnerManager};
use crate::actor::window_pair::{PairDeps, WindowPair};
use crate::common::config::Config;
use crate::model::display::{DisplayEvent, DisplayId};
use crate::model::minimize::MinimizeQueue;
use crate::model::window::{MoveDragProperty, WindowId, WindowMode, WindowNode, WindowType};
use crate::model::window_root::WindowRoot;
use crate::sys::display::{DisplayBindingController, DisplayChangeListener};
use crate::sys::input::InputEventSource;
use crate::sys::remote::{AbilityManager, BroadcastPublisher, CallingIdentity, Compositor, InnerWindowHost};
use crate::sys::screen::{ScreenRegistry, ScreenSource};
use crate::sys::vsync::VsyncSource;

/// Every outside service the server talks to.
#[derive(Clone)]
pub struct Services {
    pub screen_source: Arc<dyn ScreenSource>,
    pub compositor: Option<Arc<dyn Compositor>>,
    pub ability: Arc<dyn AbilityManager>,
    pub broadcast: Arc<dyn BroadcastPublisher>,
    pub identity: Arc<dyn CallingIdentity>,
    pub inner_windows: Arc<dyn InnerWindowHost>,
    pub input: Arc<dyn InputEventSource>,
    pub vsync: Arc<dyn VsyncSource>,
}

/// Queues display events so they are handled on the server's thread rather
/// than the one that delivered the screen notification.
struct DisplayEventForwarder(crossbeam_channel::Sender<DisplayEvent>);

impl DisplayChangeListener for DisplayEventForwarder {
    fn on_display_event(&self, event: DisplayEvent) {
        if self.0.send(event).is_err() {
            debug!(?event, "server is gone, dropping display event");
        }
    }
}

pub struct WindowServer {
    config: Config,
    root: WindowRoot,
    inner: InnerManagerHandle,
    minimize: MinimizeQueue,
    display: DisplayBindingController,
    display_listener: Arc<dyn DisplayChangeListener>,
    display_events: crossbeam_channel::Receiver<DisplayEvent>,
    animation: AnimationCoordinator,
    drag: DragController,
    pair_deps: PairDeps,
    pairs: BTreeMap<DisplayId, WindowPair>,
    stopped: bool,
}

impl WindowServer {
    pub fn start(config: Config, services: Services) -> anyhow::Result<WindowServer> {
        let issues = config.validate();
        if !issues.is_empty() {
            anyhow::bail!("invalid config: {}", issues.join("; "));
        }

        let root = WindowRoot::new();
        let inner = WindowInnerManager::start(config.inner_window.clone(), InnerManagerDeps {
            host: services.inner_windows.clone(),
            ability: services.ability.clone(),
            input: services.input.clone(),
            vsync: services.vsync.clone(),
            updates: Arc::new(root.clone()),
        })
        .context("starting the inner window manager")?;
        let minimize = MinimizeQueue::new(inner.clone());

        let registry = ScreenRegistry::new(services.screen_source.clone(), &config.screens);
        let display = DisplayBindingController::new(registry, services.compositor.clone(), &config.capture);
        let (events_tx, display_events) = crossbeam_channel::unbounded();
        let display_listener: Arc<dyn DisplayChangeListener> = Arc::new(DisplayEventForwarder(events_tx));
        display.register_display_change_listener(display_listener.clone());
        if !display.attach() {
            warn!("not following screen changes, displays will not be bound");
        }

        let animation = AnimationCoordinator::new(
            &config.animation,
            root.clone(),
            minimize.clone(),
            inner.clone(),
            services.ability.clone(),
        );
        let pair_deps = PairDeps {
            inner: inner.clone(),
            minimize: minimize.clone(),
            ability: services.ability,
            broadcast: services.broadcast,
            identity: services.identity,
        };

        let mut server = WindowServer {
            drag: DragController::new(root.clone()),
            config,
            root,
            inner,
            minimize,
            display,
            display_listener,
            display_events,
            animation,
            pair_deps,
            pairs: BTreeMap::new(),
            stopped: false,
        };
        server.process_display_events();
        info!(displays = server.pairs.len(), "window server started");
        Ok(server)
    }

    /// Handles display events queued since the last call. Every display
    /// that appeared gets its window pair.
    pub fn process_display_events(&mut self) -> usize {
        let events: Vec<DisplayEvent> = self.display_events.try_iter().collect();
        for event in &events {
            match *event {
                DisplayEvent::Created { display, .. } | DisplayEvent::DummyBound { display, .. } => {
                    self.ensure_pair(display);
                }
                _ => debug!(?event, "display event"),
            }
        }
        events.len()
    }

    pub fn ensure_pair(&mut self, display_id: DisplayId) -> &mut WindowPair {
        let deps = &self.pair_deps;
        let config = &self.config;
        self.pairs.entry(display_id).or_insert_with(|| {
            debug!(%display_id, "creating window pair");
            WindowPair::new(display_id, deps.clone(), config)
        })
    }

    pub fn window_pair(&self, display: DisplayId) -> Option<&WindowPair> { self.pairs.get(&display) }

    pub fn window_pair_mut(&mut self, display: DisplayId) -> Option<&mut WindowPair> {
        self.pairs.get_mut(&display)
    }

    #[instrument(skip(self, node), fields(id = %node.id()))]
    pub fn add_window_node(&mut self, node: Arc<WindowNode>) {
        self.root.add_window_node(node.clone());
        self.update_pair(&node);
    }

    /// Pairs only exist for displays the binding controller reported.
    fn update_pair(&mut self, node: &Arc<WindowNode>) {
        let display_id = node.display_id();
        match self.pairs.get_mut(&display_id) {
            Some(pair) => pair.update_if_split_related(node),
            None => warn!(%display_id, id = %node.id(), "window is on a display without a pair"),
        }
    }

    /// Takes the window out of the tree, its pair and any move/drag session.
    #[instrument(skip(self))]
    pub fn remove_window_node(&mut self, id: WindowId) -> Option<Arc<WindowNode>> {
        let Some(node) = self.root.remove_window_node(id) else {
            warn!("removing a window that is not in the tree");
            return None;
        };
        if let Some(pair) = self.pairs.get_mut(&node.display_id()) {
            pair.handle_remove_window(&node);
        }
        self.inner.notify_window_removed_or_destroyed(id);
        Some(node)
    }

    #[instrument(skip(self))]
    pub fn update_window_mode(&mut self, id: WindowId, mode: WindowMode) -> Result<(), WmError> {
        if mode == WindowMode::Undefined {
            return Err(WmError::InvalidParam(format!("cannot switch window {id} to {mode}")));
        }
        let node = self.root.window_node(id).ok_or(WmError::InvalidWindow(id))?;
        node.set_window_mode(mode);
        self.update_pair(&node);
        Ok(())
    }

    /// Brings the window to the top. A paired window takes the rest of its
    /// pair along: the divider ends up topmost, the raised half right below.
    pub fn raise_window(&mut self, id: WindowId) -> bool {
        let Some(node) = self.root.window_node(id) else { return false };
        let ordered = self.pairs.get(&node.display_id()).map(|p| p.ordered_pair(&node)).unwrap_or_default();
        if ordered.is_empty() {
            return self.root.raise_to_top(id);
        }
        let (dividers, halves): (Vec<_>, Vec<_>) =
            ordered.into_iter().partition(|n| n.window_type() == WindowType::DockSlice);
        for member in halves.iter().rev().chain(&dividers) {
            self.root.raise_to_top(member.id());
        }
        true
    }

    /// Divider drags are refused while either half forbids them.
    pub fn notify_server_ready_to_move_or_drag(&self, id: WindowId, move_drag: &MoveDragProperty) -> bool {
        let Some(node) = self.root.window_node(id) else {
            warn!(%id, "move or drag for an unknown window");
            return false;
        };
        if node.window_type() == WindowType::DockSlice
            && self.pairs.get(&node.display_id()).is_some_and(|p| p.is_forbid_dock_slice_move())
        {
            info!(%id, "divider move forbidden by a paired window");
            return false;
        }
        self.inner.notify_server_ready_to_move_or_drag(id, &node.property(), move_drag)
    }

    pub fn notify_window_end_up_moving_or_dragging(&self, id: WindowId) {
        self.inner.notify_window_end_up_moving_or_dragging(id);
    }

    pub fn start_drag(&mut self, id: WindowId) { self.drag.start_drag(id) }

    pub fn update_drag_info(&mut self, id: WindowId) { self.drag.update_drag_info(id) }

    pub fn finish_drag(&mut self, id: WindowId) { self.drag.finish_drag(id) }

    pub fn config(&self) -> &Config { &self.config }

    pub fn root(&self) -> &WindowRoot { &self.root }

    pub fn inner(&self) -> &InnerManagerHandle { &self.inner }

    pub fn minimize_queue(&self) -> &MinimizeQueue { &self.minimize }

    pub fn display_controller(&self) -> &DisplayBindingController { &self.display }

    pub fn registry(&self) -> &ScreenRegistry { self.display.registry() }

    pub fn animation(&self) -> &AnimationCoordinator { &self.animation }

    /// Tears pairs down first so their inner windows are destroyed before
    /// the loop stops. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.pairs.clear();
        self.display.unregister_display_change_listener(&self.display_listener);
        self.display.detach();
        self.inner.stop();
        info!("window server stopped");
    }
}

impl Drop for WindowServer {
    fn drop(&mut self) { self.shutdown(); }
}
