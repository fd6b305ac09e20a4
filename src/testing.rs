//! In-memory stand-ins for the services the window server talks to.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::actor::error::{DmError, WmError};
use crate::model::display::{DisplayId, VirtualDisplayInfo};
use crate::model::screen::{
    PowerStateChangeReason, ScreenChangeEvent, ScreenCombination, ScreenGroupChangeEvent,
    ScreenGroupInfo, ScreenId, ScreenInfo, ScreenModeInfo, ScreenPowerState, ScreenType,
    VirtualScreenOption,
};
use crate::model::window::{
    DragEvent, WindowId, WindowMode, WindowNode, WindowProperty, WindowSizeChangeReason,
    WindowType,
};
use crate::server::Services;
use crate::sys::geometry::{Point, Rect};
use crate::sys::input::{InputEventSource, PointerAction, PointerEvent, PointerEventConsumer};
use crate::sys::remote::{
    AbilityManager, AbilityToken, AnimationTarget, BroadcastPublisher, CallingIdentity,
    CaptureCallback, CommonEvent, Compositor, FinishedCallback, InnerWindowHost, PixelMap,
    StartingAppType, SurfaceHandle, WindowAnimationController, WindowToken, same_object,
};
use crate::sys::screen::{
    AgentType, DisplayManagerAgent, ScreenGroupListener, ScreenListener, ScreenSource,
};
use crate::sys::vsync::{VsyncCallback, VsyncSource};

pub const DEFAULT_SCREEN: ScreenId = ScreenId::new(0);
pub const DEFAULT_GROUP: ScreenId = ScreenId::new(1);

pub fn mode(width: u32, height: u32) -> ScreenModeInfo {
    ScreenModeInfo { id: 0, width, height, refresh_rate: 60 }
}

/// Polls `check` until it holds or two seconds pass.
pub fn eventually(mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    check()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    Immediate,
    Never,
    After(Duration),
}

struct DisplayServiceState {
    screens: BTreeMap<ScreenId, ScreenInfo>,
    groups: BTreeMap<ScreenId, ScreenGroupInfo>,
    agents: Vec<Arc<dyn DisplayManagerAgent>>,
    virtual_agents: Vec<Arc<dyn DisplayManagerAgent>>,
    register_calls: usize,
    unregister_calls: usize,
    fail_register: bool,
    next_id: u64,
    power: ScreenPowerState,
    rotation_locked: bool,
    expand_requests: Vec<Vec<ScreenId>>,
    capture: CaptureMode,
}

/// Display service plus render service. Notifications are delivered
/// synchronously on the calling thread, like a same-process stub would.
pub struct FakeDisplayService {
    state: Mutex<DisplayServiceState>,
}

impl FakeDisplayService {
    pub fn empty() -> Arc<FakeDisplayService> {
        Arc::new(FakeDisplayService {
            state: Mutex::new(DisplayServiceState {
                screens: BTreeMap::new(),
                groups: BTreeMap::new(),
                agents: Vec::new(),
                virtual_agents: Vec::new(),
                register_calls: 0,
                unregister_calls: 0,
                fail_register: false,
                next_id: 2,
                power: ScreenPowerState::On,
                rotation_locked: false,
                expand_requests: Vec::new(),
                capture: CaptureMode::Immediate,
            }),
        })
    }

    /// One real 1080x2340 screen in its own standalone group.
    pub fn with_default_screen() -> Arc<FakeDisplayService> {
        let service = Self::empty();
        service.add_screen(
            ScreenInfo::new(DEFAULT_SCREEN, ScreenType::Real)
                .with_mode(mode(1080, 2340))
                .with_parent(DEFAULT_GROUP),
        );
        service.add_group(DEFAULT_GROUP, ScreenCombination::Alone, vec![DEFAULT_SCREEN]);
        service
    }

    pub fn add_screen(&self, info: ScreenInfo) { self.state.lock().screens.insert(info.id, info); }

    pub fn add_group(&self, id: ScreenId, combination: ScreenCombination, children: Vec<ScreenId>) {
        let positions = vec![Point::ZERO; children.len()];
        self.state.lock().groups.insert(
            id,
            ScreenGroupInfo {
                info: ScreenInfo::new(id, ScreenType::Undefined),
                combination,
                children,
                positions,
            },
        );
    }

    pub fn remove_screen(&self, id: ScreenId) { self.state.lock().screens.remove(&id); }

    pub fn set_fail_register(&self, fail: bool) { self.state.lock().fail_register = fail; }

    pub fn set_capture_mode(&self, capture: CaptureMode) { self.state.lock().capture = capture; }

    pub fn register_calls(&self) -> usize { self.state.lock().register_calls }

    pub fn unregister_calls(&self) -> usize { self.state.lock().unregister_calls }

    pub fn agent_count(&self) -> usize { self.state.lock().agents.len() }

    pub fn virtual_agent_count(&self) -> usize { self.state.lock().virtual_agents.len() }

    pub fn expand_requests(&self) -> Vec<Vec<ScreenId>> { self.state.lock().expand_requests.clone() }

    fn agents(&self) -> Vec<Arc<dyn DisplayManagerAgent>> { self.state.lock().agents.clone() }

    /// Adds the screen and tells every agent.
    pub fn connect(&self, info: ScreenInfo) {
        self.add_screen(info.clone());
        for agent in self.agents() {
            agent.on_screen_connect(Some(info.clone()));
        }
    }

    pub fn disconnect(&self, id: ScreenId) {
        self.remove_screen(id);
        for agent in self.agents() {
            agent.on_screen_disconnect(id);
        }
    }

    pub fn emit_connect(&self, info: Option<ScreenInfo>) {
        for agent in self.agents() {
            agent.on_screen_connect(info.clone());
        }
    }

    pub fn emit_change(&self, info: Option<ScreenInfo>, event: ScreenChangeEvent) {
        for agent in self.agents() {
            agent.on_screen_change(info.clone(), event);
        }
    }

    pub fn emit_group_change(&self, infos: Vec<ScreenInfo>, event: ScreenGroupChangeEvent) {
        for agent in self.agents() {
            agent.on_screen_group_change(infos.clone(), event);
        }
    }

    fn next_id(state: &mut DisplayServiceState) -> ScreenId {
        let id = ScreenId::new(state.next_id);
        state.next_id += 1;
        id
    }

    fn add_virtual(&self, name: &str, width: u32, height: u32) -> ScreenId {
        let info = {
            let mut state = self.state.lock();
            let id = Self::next_id(&mut state);
            let mut info = ScreenInfo::new(id, ScreenType::Virtual).with_mode(mode(width, height));
            info.name = name.to_string();
            state.screens.insert(id, info.clone());
            info
        };
        let id = info.id;
        for agent in self.agents() {
            agent.on_screen_connect(Some(info.clone()));
        }
        id
    }

    fn detach_from_groups(state: &mut DisplayServiceState, ids: &[ScreenId]) -> Vec<ScreenInfo> {
        let mut removed = Vec::new();
        for id in ids {
            let Some(info) = state.screens.get_mut(id) else { continue };
            if !info.parent.is_valid() {
                continue;
            }
            if let Some(group) = state.groups.get_mut(&info.parent) {
                group.children.retain(|child| child != id);
            }
            info.parent = ScreenId::INVALID;
            removed.push(info.clone());
        }
        removed
    }

    fn make_group(
        &self,
        combination: ScreenCombination,
        main: Option<ScreenId>,
        members: &[ScreenId],
    ) -> ScreenId {
        let (group_id, infos) = {
            let mut state = self.state.lock();
            if let Some(main) = main
                && !state.screens.contains_key(&main)
            {
                return ScreenId::INVALID;
            }
            if members.iter().any(|id| !state.screens.contains_key(id)) {
                return ScreenId::INVALID;
            }
            let group_id = Self::next_id(&mut state);
            let mut children: Vec<ScreenId> = main.into_iter().collect();
            children.extend(members.iter().copied().filter(|id| Some(*id) != main));
            let mut infos = Vec::new();
            for id in &children {
                if let Some(info) = state.screens.get_mut(id) {
                    info.parent = group_id;
                    if Some(*id) != main {
                        infos.push(info.clone());
                    }
                }
            }
            let positions = vec![Point::ZERO; children.len()];
            state.groups.insert(
                group_id,
                ScreenGroupInfo {
                    info: ScreenInfo::new(group_id, ScreenType::Undefined),
                    combination,
                    children,
                    positions,
                },
            );
            (group_id, infos)
        };
        self.emit_group_change(infos, ScreenGroupChangeEvent::AddToGroup);
        group_id
    }
}

impl ScreenSource for FakeDisplayService {
    fn screen_info(&self, id: ScreenId) -> Option<ScreenInfo> { self.state.lock().screens.get(&id).cloned() }

    fn all_screen_infos(&self) -> Vec<ScreenInfo> {
        self.state.lock().screens.values().cloned().collect()
    }

    fn screen_group_info(&self, id: ScreenId) -> Option<ScreenGroupInfo> {
        self.state.lock().groups.get(&id).cloned()
    }

    fn register_agent(&self, agent: Arc<dyn DisplayManagerAgent>, _kind: AgentType) -> bool {
        let mut state = self.state.lock();
        state.register_calls += 1;
        if state.fail_register {
            return false;
        }
        state.agents.push(agent);
        true
    }

    fn unregister_agent(&self, agent: &Arc<dyn DisplayManagerAgent>, _kind: AgentType) -> bool {
        let mut state = self.state.lock();
        state.unregister_calls += 1;
        state.agents.retain(|a| !same_object(a, agent));
        true
    }

    fn create_virtual_screen(
        &self,
        option: VirtualScreenOption,
        agent: Arc<dyn DisplayManagerAgent>,
    ) -> ScreenId {
        {
            let mut state = self.state.lock();
            if !state.virtual_agents.iter().any(|a| same_object(a, &agent)) {
                state.virtual_agents.push(agent);
            }
        }
        self.add_virtual(&option.name, option.width, option.height)
    }

    fn destroy_virtual_screen(&self, id: ScreenId) -> Result<(), DmError> {
        let removed = {
            let mut state = self.state.lock();
            match state.screens.get(&id) {
                Some(info) if info.screen_type == ScreenType::Virtual => {}
                _ => return Err(DmError::InvalidScreen(id)),
            }
            Self::detach_from_groups(&mut state, &[id])
        };
        if !removed.is_empty() {
            self.emit_group_change(removed, ScreenGroupChangeEvent::RemoveFromGroup);
        }
        self.disconnect(id);
        Ok(())
    }

    fn set_virtual_screen_surface(&self, id: ScreenId, _surface: SurfaceHandle) -> Result<(), DmError> {
        if self.state.lock().screens.contains_key(&id) {
            Ok(())
        } else {
            Err(DmError::InvalidScreen(id))
        }
    }

    fn make_mirror(&self, main: ScreenId, mirrors: &[ScreenId]) -> ScreenId {
        self.make_group(ScreenCombination::Mirror, Some(main), mirrors)
    }

    fn make_expand(&self, screens: &[ScreenId], _start_points: &[Point]) -> ScreenId {
        self.state.lock().expand_requests.push(screens.to_vec());
        self.make_group(ScreenCombination::Expand, None, screens)
    }

    fn remove_virtual_screen_from_group(&self, screens: &[ScreenId]) {
        let removed = Self::detach_from_groups(&mut self.state.lock(), screens);
        if !removed.is_empty() {
            self.emit_group_change(removed, ScreenGroupChangeEvent::RemoveFromGroup);
        }
    }

    fn set_screen_power_for_all(&self, state: ScreenPowerState, _reason: PowerStateChangeReason) -> bool {
        self.state.lock().power = state;
        true
    }

    fn screen_power(&self, id: ScreenId) -> ScreenPowerState {
        let state = self.state.lock();
        if state.screens.contains_key(&id) { state.power } else { ScreenPowerState::Invalid }
    }

    fn set_screen_rotation_locked(&self, locked: bool) { self.state.lock().rotation_locked = locked; }

    fn is_screen_rotation_locked(&self) -> bool { self.state.lock().rotation_locked }
}

impl Compositor for FakeDisplayService {
    fn default_screen_id(&self) -> ScreenId { DEFAULT_SCREEN }

    fn screen_active_mode(&self, id: ScreenId) -> Option<ScreenModeInfo> {
        self.state.lock().screens.get(&id).and_then(ScreenInfo::active_mode)
    }

    fn create_virtual_screen(&self, info: &VirtualDisplayInfo, _surface: Option<SurfaceHandle>) -> ScreenId {
        self.add_virtual(&info.name, info.width, info.height)
    }

    fn remove_virtual_screen(&self, id: ScreenId) {
        let _ = ScreenSource::destroy_virtual_screen(self, id);
    }

    fn take_surface_capture(&self, id: ScreenId, done: CaptureCallback) -> bool {
        let (capture, size) = {
            let state = self.state.lock();
            let Some(mode) = state.screens.get(&id).and_then(ScreenInfo::active_mode) else {
                return false;
            };
            (state.capture, (mode.width, mode.height))
        };
        let image = PixelMap { width: size.0, height: size.1, pixels: Vec::new() };
        match capture {
            CaptureMode::Immediate => done(Some(image)),
            CaptureMode::Never => {
                // Keep the callback alive so the waiter times out instead of
                // seeing a closed channel.
                std::mem::forget(done);
            }
            CaptureMode::After(delay) => {
                thread::spawn(move || {
                    thread::sleep(delay);
                    done(Some(image));
                });
            }
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenNotice {
    Connect(ScreenId),
    Disconnect(ScreenId),
    Change(ScreenId),
    Group(Vec<ScreenId>, ScreenGroupChangeEvent),
}

#[derive(Default)]
pub struct RecordingScreenListener {
    notices: Mutex<Vec<ScreenNotice>>,
}

impl RecordingScreenListener {
    pub fn new() -> Arc<RecordingScreenListener> { Arc::new(Self::default()) }

    pub fn notices(&self) -> Vec<ScreenNotice> { self.notices.lock().clone() }
}

impl ScreenListener for RecordingScreenListener {
    fn on_connect(&self, id: ScreenId) { self.notices.lock().push(ScreenNotice::Connect(id)) }

    fn on_disconnect(&self, id: ScreenId) { self.notices.lock().push(ScreenNotice::Disconnect(id)) }

    fn on_change(&self, id: ScreenId) { self.notices.lock().push(ScreenNotice::Change(id)) }
}

impl ScreenGroupListener for RecordingScreenListener {
    fn on_change(&self, ids: &[ScreenId], event: ScreenGroupChangeEvent) {
        self.notices.lock().push(ScreenNotice::Group(ids.to_vec(), event))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenCall {
    DragInfo(Point, DragEvent),
    Mode(WindowMode),
    Rect(Rect, WindowSizeChangeReason),
    PointUp(PointerAction),
}

#[derive(Default)]
pub struct RecordingToken {
    calls: Mutex<Vec<TokenCall>>,
}

impl RecordingToken {
    pub fn calls(&self) -> Vec<TokenCall> { self.calls.lock().clone() }

    pub fn take_calls(&self) -> Vec<TokenCall> { std::mem::take(&mut *self.calls.lock()) }
}

impl WindowToken for RecordingToken {
    fn update_window_drag_info(&self, point: Point, event: DragEvent) {
        self.calls.lock().push(TokenCall::DragInfo(point, event));
    }

    fn update_window_mode(&self, mode: WindowMode) { self.calls.lock().push(TokenCall::Mode(mode)); }

    fn update_window_rect(&self, rect: Rect, reason: WindowSizeChangeReason) {
        self.calls.lock().push(TokenCall::Rect(rect, reason));
    }

    fn notify_window_client_point_up(&self, event: &PointerEvent) {
        self.calls.lock().push(TokenCall::PointUp(event.action));
    }
}

/// A window with a recording client token.
pub struct TestWindow {
    pub node: Arc<WindowNode>,
    pub token: Arc<RecordingToken>,
}

impl TestWindow {
    pub fn new(id: u32, window_type: WindowType, mode: WindowMode) -> TestWindow {
        Self::build(id, window_type, mode, |node| node)
    }

    /// App window with an ability token equal to its id.
    pub fn app(id: u32, mode: WindowMode) -> TestWindow {
        Self::build(id, WindowType::AppMainWindow, mode, |node| {
            node.with_ability_token(AbilityToken::new(id as u64))
                .with_surfaces(Some(SurfaceHandle::new(id as u64)), Some(SurfaceHandle::new(1000 + id as u64)))
        })
    }

    pub fn build(
        id: u32,
        window_type: WindowType,
        mode: WindowMode,
        f: impl FnOnce(WindowNode) -> WindowNode,
    ) -> TestWindow {
        let token = Arc::new(RecordingToken::default());
        let property = WindowProperty::new(WindowId::new(id), window_type, mode);
        let node = f(WindowNode::new(property).with_window_token(token.clone())).into_ref();
        TestWindow { node, token }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbilityCall {
    Minimize(AbilityToken, bool),
    Close(AbilityToken),
    Terminate(AbilityToken),
    Snapshot(AbilityToken),
}

#[derive(Default)]
pub struct RecordingAbilityManager {
    calls: Mutex<Vec<AbilityCall>>,
    missions: Mutex<BTreeMap<u64, i32>>,
}

impl RecordingAbilityManager {
    pub fn calls(&self) -> Vec<AbilityCall> { self.calls.lock().clone() }

    pub fn set_mission(&self, token: AbilityToken, mission: i32) {
        self.missions.lock().insert(token.get(), mission);
    }
}

impl AbilityManager for RecordingAbilityManager {
    fn minimize_ability(&self, token: AbilityToken, from_user: bool) -> Result<(), WmError> {
        self.calls.lock().push(AbilityCall::Minimize(token, from_user));
        Ok(())
    }

    fn close_ability(&self, token: AbilityToken) -> Result<(), WmError> {
        self.calls.lock().push(AbilityCall::Close(token));
        Ok(())
    }

    fn terminate_ability(&self, token: AbilityToken) -> Result<(), WmError> {
        self.calls.lock().push(AbilityCall::Terminate(token));
        Ok(())
    }

    fn mission_id_by_token(&self, token: AbilityToken) -> Option<i32> {
        self.missions.lock().get(&token.get()).copied()
    }

    fn update_mission_snapshot(&self, token: AbilityToken) {
        self.calls.lock().push(AbilityCall::Snapshot(token));
    }
}

/// Shared log of identity switches and publishes, to check their order.
pub type Journal = Arc<Mutex<Vec<String>>>;

pub struct FakeIdentity {
    journal: Journal,
}

impl CallingIdentity for FakeIdentity {
    fn reset_calling_identity(&self) -> String {
        self.journal.lock().push("reset".to_string());
        "client".to_string()
    }

    fn set_calling_identity(&self, identity: &str) {
        self.journal.lock().push(format!("restore:{identity}"));
    }
}

pub struct RecordingBroadcast {
    journal: Journal,
    events: Mutex<Vec<CommonEvent>>,
}

impl RecordingBroadcast {
    pub fn events(&self) -> Vec<CommonEvent> { self.events.lock().clone() }
}

impl BroadcastPublisher for RecordingBroadcast {
    fn publish(&self, event: CommonEvent) -> bool {
        self.journal.lock().push(format!("publish:{}", event.action));
        self.events.lock().push(event);
        true
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    Create { name: String, display: DisplayId, rect: Rect, window_type: WindowType, mode: WindowMode },
    Destroy { display: DisplayId, window_type: WindowType },
    Update { display: DisplayId, window_type: WindowType, width: u32, height: u32 },
}

#[derive(Default)]
pub struct RecordingInnerHost {
    calls: Mutex<Vec<HostCall>>,
}

impl RecordingInnerHost {
    pub fn calls(&self) -> Vec<HostCall> { self.calls.lock().clone() }

    pub fn count(&self) -> usize { self.calls.lock().len() }
}

impl InnerWindowHost for RecordingInnerHost {
    fn create(&self, name: &str, display: DisplayId, rect: Rect, window_type: WindowType, mode: WindowMode) {
        self.calls.lock().push(HostCall::Create {
            name: name.to_string(),
            display,
            rect,
            window_type,
            mode,
        });
    }

    fn destroy(&self, display: DisplayId, window_type: WindowType) {
        self.calls.lock().push(HostCall::Destroy { display, window_type });
    }

    fn update(&self, display: DisplayId, window_type: WindowType, width: u32, height: u32) {
        self.calls.lock().push(HostCall::Update { display, window_type, width, height });
    }
}

/// Frame source driven by the test.
#[derive(Default)]
pub struct ManualVsync {
    callbacks: Mutex<Vec<VsyncCallback>>,
}

impl ManualVsync {
    pub fn pending(&self) -> usize { self.callbacks.lock().len() }

    pub fn fire(&self, timestamp: i64) {
        let callbacks = std::mem::take(&mut *self.callbacks.lock());
        for callback in callbacks {
            callback(timestamp);
        }
    }
}

impl VsyncSource for ManualVsync {
    fn request_vsync(&self, callback: VsyncCallback) { self.callbacks.lock().push(callback); }
}

#[derive(Default)]
pub struct FakeInput {
    consumer: Mutex<Option<Arc<dyn PointerEventConsumer>>>,
    refuse: Mutex<bool>,
}

impl FakeInput {
    pub fn refuse_consumers(&self) { *self.refuse.lock() = true; }

    pub fn inject(&self, event: PointerEvent) {
        let consumer = self.consumer.lock().clone();
        if let Some(consumer) = consumer {
            consumer.on_pointer_event(event);
        }
    }
}

impl InputEventSource for FakeInput {
    fn set_window_input_event_consumer(&self, consumer: Arc<dyn PointerEventConsumer>) -> bool {
        if *self.refuse.lock() {
            return false;
        }
        *self.consumer.lock() = Some(consumer);
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnimationCall {
    StartApp(StartingAppType, WindowId),
    AppTransition(Option<WindowId>, WindowId),
    Minimize(WindowId),
    Close(WindowId),
    MinimizeAll(Vec<WindowId>),
    ScreenUnlock,
}

#[derive(Default)]
pub struct RecordingAnimationController {
    calls: Mutex<Vec<AnimationCall>>,
    targets: Mutex<Vec<AnimationTarget>>,
    finished: Mutex<Vec<FinishedCallback>>,
}

impl RecordingAnimationController {
    pub fn calls(&self) -> Vec<AnimationCall> { self.calls.lock().clone() }

    pub fn targets(&self) -> Vec<AnimationTarget> { self.targets.lock().clone() }

    /// Completes every animation started so far.
    pub fn finish_all(&self) {
        let finished = std::mem::take(&mut *self.finished.lock());
        for callback in finished {
            callback.on_animation_finished();
        }
    }

    fn record(&self, call: AnimationCall, targets: Vec<AnimationTarget>, finished: FinishedCallback) {
        self.calls.lock().push(call);
        self.targets.lock().extend(targets);
        self.finished.lock().push(finished);
    }
}

impl WindowAnimationController for RecordingAnimationController {
    fn on_start_app(&self, kind: StartingAppType, target: AnimationTarget, finished: FinishedCallback) {
        self.record(AnimationCall::StartApp(kind, target.window_id), vec![target], finished);
    }

    fn on_app_transition(&self, from: Option<AnimationTarget>, to: AnimationTarget, finished: FinishedCallback) {
        let call = AnimationCall::AppTransition(from.as_ref().map(|t| t.window_id), to.window_id);
        self.record(call, from.into_iter().chain([to]).collect(), finished);
    }

    fn on_minimize_window(&self, target: AnimationTarget, finished: FinishedCallback) {
        self.record(AnimationCall::Minimize(target.window_id), vec![target], finished);
    }

    fn on_close_window(&self, target: AnimationTarget, finished: FinishedCallback) {
        self.record(AnimationCall::Close(target.window_id), vec![target], finished);
    }

    fn on_minimize_all_window(&self, targets: Vec<AnimationTarget>, finished: FinishedCallback) {
        let ids = targets.iter().map(|t| t.window_id).collect();
        self.record(AnimationCall::MinimizeAll(ids), targets, finished);
    }

    fn on_screen_unlock(&self, finished: FinishedCallback) {
        self.record(AnimationCall::ScreenUnlock, Vec::new(), finished);
    }
}

/// Every fake, plus the `Services` bundle wired to them.
pub struct Fakes {
    pub display: Arc<FakeDisplayService>,
    pub ability: Arc<RecordingAbilityManager>,
    pub broadcast: Arc<RecordingBroadcast>,
    pub journal: Journal,
    pub host: Arc<RecordingInnerHost>,
    pub input: Arc<FakeInput>,
    pub vsync: Arc<ManualVsync>,
}

impl Fakes {
    pub fn new() -> Fakes {
        let journal: Journal = Arc::default();
        Fakes {
            display: FakeDisplayService::with_default_screen(),
            ability: Arc::default(),
            broadcast: Arc::new(RecordingBroadcast {
                journal: journal.clone(),
                events: Mutex::default(),
            }),
            journal,
            host: Arc::default(),
            input: Arc::default(),
            vsync: Arc::default(),
        }
    }

    pub fn services(&self) -> Services {
        Services {
            screen_source: self.display.clone(),
            compositor: Some(self.display.clone()),
            ability: self.ability.clone(),
            broadcast: self.broadcast.clone(),
            identity: Arc::new(FakeIdentity { journal: self.journal.clone() }),
            inner_windows: self.host.clone(),
            input: self.input.clone(),
            vsync: self.vsync.clone(),
        }
    }

    pub fn journal(&self) -> Vec<String> { self.journal.lock().clone() }
}
