use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tracing::{debug, error, info, instrument, warn};

use super::error::InnerManagerError;
use super::move_drag::{MoveDragController, WindowUpdateSink};
use super::{Receiver, Sender, channel};
use crate::common::config::InnerWindowSettings;
use crate::model::display::DisplayId;
use crate::model::window::{MoveDragProperty, WindowId, WindowMode, WindowNode, WindowProperty, WindowType};
use crate::sys::geometry::Rect;
use crate::sys::input::{InputEventSource, PointerEvent, PointerEventConsumer};
use crate::sys::remote::{AbilityManager, AbilityToken, InnerWindowHost};
use crate::sys::vsync::VsyncSource;

pub const INNER_WM_THREAD_NAME: &str = "inner-wm";

#[derive(Debug)]
pub enum Event {
    CreateInnerWindow {
        name: String,
        display_id: DisplayId,
        rect: Rect,
        window_type: WindowType,
        mode: WindowMode,
    },
    DestroyInnerWindow {
        display_id: DisplayId,
        window_type: WindowType,
    },
    UpdateInnerWindow {
        display_id: DisplayId,
        window_type: WindowType,
        width: u32,
        height: u32,
    },
    MinimizeAbility {
        window_id: WindowId,
        token: AbilityToken,
        from_user: bool,
    },
    CloseAbility {
        window_id: WindowId,
        token: AbilityToken,
    },
    TerminateAbility {
        window_id: WindowId,
        token: AbilityToken,
    },
    ReadyToMoveOrDrag {
        window_id: WindowId,
        property: Box<WindowProperty>,
        move_drag: MoveDragProperty,
    },
    EndUpMovingOrDragging(WindowId),
    WindowRemovedOrDestroyed(WindowId),
    PointerEvent(PointerEvent),
    Vsync {
        timestamp: i64,
        generation: u64,
    },
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum RunningState {
    NotStarted,
    Running,
}

/// Cloneable entry point to the inner manager loop. Everything except the
/// session bookkeeping is posted to the loop and handled there in order.
#[derive(Clone)]
pub struct InnerManagerHandle {
    events_tx: Sender<Event>,
    active_window: Arc<AtomicU32>,
    running: Arc<AtomicBool>,
    thread: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl std::fmt::Debug for InnerManagerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InnerManagerHandle")
            .field("active_window", &self.active_window_id())
            .field("state", &self.state())
            .finish()
    }
}

impl InnerManagerHandle {
    fn new(events_tx: Sender<Event>) -> InnerManagerHandle {
        InnerManagerHandle {
            events_tx,
            active_window: Arc::new(AtomicU32::new(WindowId::INVALID.get())),
            running: Arc::new(AtomicBool::new(false)),
            thread: Arc::default(),
        }
    }

    /// A handle whose events are left in the returned mailbox.
    #[cfg(test)]
    pub(crate) fn detached() -> (InnerManagerHandle, Receiver<Event>) {
        let (tx, rx) = channel();
        (InnerManagerHandle::new(tx), rx)
    }

    pub fn state(&self) -> RunningState {
        if self.running.load(Ordering::Acquire) {
            RunningState::Running
        } else {
            RunningState::NotStarted
        }
    }

    pub fn active_window_id(&self) -> WindowId { WindowId::new(self.active_window.load(Ordering::Acquire)) }

    pub fn create_inner_window(
        &self,
        name: &str,
        display_id: DisplayId,
        rect: Rect,
        window_type: WindowType,
        mode: WindowMode,
    ) {
        self.events_tx.send(Event::CreateInnerWindow {
            name: name.to_string(),
            display_id,
            rect,
            window_type,
            mode,
        });
    }

    pub fn destroy_inner_window(&self, display_id: DisplayId, window_type: WindowType) {
        self.events_tx.send(Event::DestroyInnerWindow { display_id, window_type });
    }

    pub fn update_inner_window(&self, display_id: DisplayId, window_type: WindowType, width: u32, height: u32) {
        self.events_tx.send(Event::UpdateInnerWindow { display_id, window_type, width, height });
    }

    pub fn minimize_ability(&self, node: &WindowNode, from_user: bool) {
        if node.starting_window_shown() {
            debug!(id = %node.id(), "starting window still shown, not minimizing");
            return;
        }
        let Some(token) = node.ability_token() else {
            warn!(id = %node.id(), "no ability to minimize");
            return;
        };
        self.events_tx.send(Event::MinimizeAbility { window_id: node.id(), token, from_user });
    }

    pub fn close_ability(&self, node: &WindowNode) {
        let Some(token) = node.ability_token() else {
            warn!(id = %node.id(), "no ability to close");
            return;
        };
        self.events_tx.send(Event::CloseAbility { window_id: node.id(), token });
    }

    pub fn terminate_ability(&self, node: &WindowNode) {
        let Some(token) = node.ability_token() else {
            warn!(id = %node.id(), "no ability to terminate");
            return;
        };
        self.events_tx.send(Event::TerminateAbility { window_id: node.id(), token });
    }

    /// Claims the move/drag session for `id`. Fails while another window
    /// holds it.
    pub fn notify_server_ready_to_move_or_drag(
        &self,
        id: WindowId,
        property: &WindowProperty,
        move_drag: &MoveDragProperty,
    ) -> bool {
        if !id.is_valid() {
            return false;
        }
        if let Err(active) = self.active_window.compare_exchange(
            WindowId::INVALID.get(),
            id.get(),
            Ordering::AcqRel,
            Ordering::Acquire,
        ) && active != id.get()
        {
            warn!(%id, active, "already in moving or dragging state");
            return false;
        }
        self.events_tx.send(Event::ReadyToMoveOrDrag {
            window_id: id,
            property: Box::new(property.clone()),
            move_drag: *move_drag,
        });
        true
    }

    pub fn notify_window_end_up_moving_or_dragging(&self, id: WindowId) {
        if self.active_window_id() != id {
            return;
        }
        self.events_tx.send(Event::EndUpMovingOrDragging(id));
    }

    pub fn notify_window_removed_or_destroyed(&self, id: WindowId) {
        if self.active_window_id() != id {
            return;
        }
        self.events_tx.send(Event::WindowRemovedOrDestroyed(id));
    }

    /// Accepts pointer events aimed at the window being moved or dragged.
    pub fn consume_pointer_event(&self, event: PointerEvent) {
        let active = self.active_window_id();
        if !active.is_valid() || event.agent_window_id != active {
            error!(agent = %event.agent_window_id, %active, "pointer event is not for the active window");
            return;
        }
        self.events_tx.send(Event::PointerEvent(event));
    }

    pub fn stop(&self) {
        self.events_tx.send(Event::Stop);
        let Some(handle) = self.thread.lock().take() else { return };
        if handle.thread().id() == thread::current().id() {
            return;
        }
        if handle.join().is_err() {
            error!("inner manager thread panicked");
        }
    }
}

impl PointerEventConsumer for InnerManagerHandle {
    fn on_pointer_event(&self, event: PointerEvent) { self.consume_pointer_event(event) }
}

/// What the loop needs from the rest of the server.
#[derive(Clone)]
pub struct InnerManagerDeps {
    pub host: Arc<dyn InnerWindowHost>,
    pub ability: Arc<dyn AbilityManager>,
    pub input: Arc<dyn InputEventSource>,
    pub vsync: Arc<dyn VsyncSource>,
    pub updates: Arc<dyn WindowUpdateSink>,
}

/// Runs the server's own windows (split divider, placeholder), ability
/// requests and the move/drag session on a dedicated thread.
pub struct WindowInnerManager {
    settings: InnerWindowSettings,
    host: Arc<dyn InnerWindowHost>,
    ability: Arc<dyn AbilityManager>,
    move_drag: MoveDragController,
}

impl WindowInnerManager {
    fn new(
        settings: InnerWindowSettings,
        deps: &InnerManagerDeps,
        handle: &InnerManagerHandle,
    ) -> WindowInnerManager {
        WindowInnerManager {
            settings,
            host: deps.host.clone(),
            ability: deps.ability.clone(),
            move_drag: MoveDragController::new(
                handle.active_window.clone(),
                deps.vsync.clone(),
                deps.updates.clone(),
                handle.events_tx.clone(),
            ),
        }
    }

    pub fn start(
        settings: InnerWindowSettings,
        deps: InnerManagerDeps,
    ) -> Result<InnerManagerHandle, InnerManagerError> {
        let (tx, rx) = channel();
        let handle = InnerManagerHandle::new(tx);
        let manager = WindowInnerManager::new(settings, &deps, &handle);

        handle.running.store(true, Ordering::Release);
        let running = handle.running.clone();
        let spawned = thread::Builder::new()
            .name(INNER_WM_THREAD_NAME.to_string())
            .spawn(move || {
                manager.run(rx);
                running.store(false, Ordering::Release);
            });
        let join = match spawned {
            Ok(join) => join,
            Err(e) => {
                handle.running.store(false, Ordering::Release);
                return Err(e.into());
            }
        };
        *handle.thread.lock() = Some(join);

        if !deps.input.set_window_input_event_consumer(Arc::new(handle.clone())) {
            error!("could not install the pointer event consumer");
            handle.stop();
            return Err(InnerManagerError::InputConsumer);
        }
        info!("window inner manager started");
        Ok(handle)
    }

    fn run(mut self, mut rx: Receiver<Event>) {
        while let Some((span, event)) = rx.blocking_recv() {
            let _guard = span.enter();
            if let Event::Stop = event {
                break;
            }
            self.handle_event(event);
        }
        info!("window inner manager stopped");
    }

    #[instrument(name = "inner_manager::handle_event", skip(self))]
    fn handle_event(&mut self, event: Event) {
        match event {
            Event::CreateInnerWindow { name, display_id, rect, window_type, mode } => {
                self.create_inner_window(&name, display_id, rect, window_type, mode)
            }
            Event::DestroyInnerWindow { display_id, window_type } => {
                self.destroy_inner_window(display_id, window_type)
            }
            Event::UpdateInnerWindow { display_id, window_type, width, height } => {
                self.update_inner_window(display_id, window_type, width, height)
            }
            Event::MinimizeAbility { window_id, token, from_user } => {
                if let Err(e) = self.ability.minimize_ability(token, from_user) {
                    warn!(%window_id, "minimize ability failed: {e}");
                }
            }
            Event::CloseAbility { window_id, token } => {
                if let Err(e) = self.ability.close_ability(token) {
                    warn!(%window_id, "close ability failed: {e}");
                }
            }
            Event::TerminateAbility { window_id, token } => {
                if let Err(e) = self.ability.terminate_ability(token) {
                    warn!(%window_id, "terminate ability failed: {e}");
                }
            }
            Event::ReadyToMoveOrDrag { window_id, property, move_drag } => {
                self.move_drag.handle_ready_to_move_or_drag(window_id, *property, move_drag);
            }
            Event::EndUpMovingOrDragging(id) => self.move_drag.handle_end_up_moving_or_dragging(id),
            Event::WindowRemovedOrDestroyed(id) => self.move_drag.handle_window_removed_or_destroyed(id),
            Event::PointerEvent(event) => self.move_drag.consume_pointer_event(event),
            Event::Vsync { timestamp, generation } => self.move_drag.on_receive_vsync(timestamp, generation),
            Event::Stop => {}
        }
    }

    fn placeholder_allowed(&self, window_type: WindowType) -> bool {
        window_type != WindowType::Placeholder || self.settings.recent_holder_enabled
    }

    fn create_inner_window(
        &self,
        name: &str,
        display_id: DisplayId,
        rect: Rect,
        window_type: WindowType,
        mode: WindowMode,
    ) {
        match window_type {
            WindowType::Placeholder if self.placeholder_allowed(window_type) => {
                self.host.create(name, display_id, rect, window_type, mode);
            }
            WindowType::DockSlice => {
                self.host.create(name, display_id, rect, window_type, mode);
                self.host.update(display_id, window_type, rect.width, rect.height);
            }
            WindowType::Placeholder => debug!("placeholder windows are disabled"),
            other => warn!(kind = %other, "not an inner window type"),
        }
    }

    fn destroy_inner_window(&self, display_id: DisplayId, window_type: WindowType) {
        match window_type {
            WindowType::Placeholder | WindowType::DockSlice if self.placeholder_allowed(window_type) => {
                self.host.destroy(display_id, window_type)
            }
            WindowType::Placeholder => debug!("placeholder windows are disabled"),
            other => warn!(kind = %other, "not an inner window type"),
        }
    }

    fn update_inner_window(&self, display_id: DisplayId, window_type: WindowType, width: u32, height: u32) {
        match window_type {
            WindowType::Placeholder | WindowType::DockSlice if self.placeholder_allowed(window_type) => {
                self.host.update(display_id, window_type, width, height)
            }
            WindowType::Placeholder => debug!("placeholder windows are disabled"),
            other => warn!(kind = %other, "not an inner window type"),
        }
    }
}
