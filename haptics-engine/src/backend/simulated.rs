//! Simulated haptics backend
//!
//! Software stand-in for a device actuator. Every native call is logged and
//! appended to a bounded journal so callers can assert on call ordering;
//! once full, the oldest entries are dropped. Failures
//! can be injected per call class, and platform notifications (reset,
//! stopped) can be triggered on demand.
//!
//! **Completion:** when auto-complete is enabled, a started player fires its
//! completion handler from a separate thread once the remaining pattern
//! time has elapsed. Pausing, seeking, stopping or cancelling the player
//! invalidates any pending completion.

use super::{
    Actuator, ActuatorNotifier, Capabilities, CompletionHandler, HapticBackend, NativeError,
    NativePlayer, NativeResult,
};
use crate::pattern::Pattern;
use haptics_common::events::CapabilityTier;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::thread;
use std::time::Duration;
use tracing::debug;

/// One recorded native call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    CreateActuator { generation: u64 },
    StartActuator,
    StopActuator,
    MakePlayer { player: u64, events: usize },
    PlayerStart { player: u64, at: Duration },
    PlayerPause { player: u64, at: Duration },
    PlayerResume { player: u64, at: Duration },
    PlayerSeek { player: u64, offset: Duration },
    PlayerStop { player: u64, at: Duration },
    PlayerCancel { player: u64 },
    Pulse { duration: Duration },
    CancelPulse,
}

impl BackendCall {
    /// Player the call was made on, if any
    pub fn player(&self) -> Option<u64> {
        match self {
            BackendCall::MakePlayer { player, .. }
            | BackendCall::PlayerStart { player, .. }
            | BackendCall::PlayerPause { player, .. }
            | BackendCall::PlayerResume { player, .. }
            | BackendCall::PlayerSeek { player, .. }
            | BackendCall::PlayerStop { player, .. }
            | BackendCall::PlayerCancel { player } => Some(*player),
            _ => None,
        }
    }
}

/// Journal entries kept by default
pub const DEFAULT_JOURNAL_CAPACITY: usize = 4096;

/// Call journal that keeps only the most recent entries
#[derive(Debug)]
struct Journal {
    calls: VecDeque<BackendCall>,
    capacity: usize,
}

impl Journal {
    fn push(&mut self, call: BackendCall) {
        if self.capacity == 0 {
            return;
        }
        if self.calls.len() == self.capacity {
            self.calls.pop_front();
        }
        self.calls.push_back(call);
    }
}

impl Default for Journal {
    fn default() -> Self {
        Self {
            calls: VecDeque::new(),
            capacity: DEFAULT_JOURNAL_CAPACITY,
        }
    }
}

#[derive(Debug, Default)]
struct Faults {
    create_failures: u32,
    start_failures: u32,
    make_player: bool,
    player_start: bool,
    player_control: bool,
    player_stop: bool,
}

#[derive(Default)]
struct SimInner {
    journal: Journal,
    faults: Faults,
    notifier: Option<ActuatorNotifier>,
    running: bool,
    /// Bumped by every simulated reset; players from an older value are dead
    resets: u64,
    next_player: u64,
    players: Vec<Weak<Mutex<PlayerShared>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Software haptics backend with call journal and fault injection
///
/// Cloning yields another handle to the same simulated device.
#[derive(Clone)]
pub struct SimulatedBackend {
    capabilities: Capabilities,
    auto_complete: bool,
    inner: Arc<Mutex<SimInner>>,
}

impl SimulatedBackend {
    /// Full-featured device
    pub fn new() -> Self {
        Self::with_tier(CapabilityTier::Full)
    }

    /// Device reporting the capabilities of `tier`
    pub fn with_tier(tier: CapabilityTier) -> Self {
        let capabilities = match tier {
            CapabilityTier::None => Capabilities::default(),
            CapabilityTier::Coarse => Capabilities {
                hardware_haptics: true,
                amplitude_control: Some(false),
                predefined_effects: false,
                native_pattern_parsing: false,
            },
            CapabilityTier::Amplitude => Capabilities {
                hardware_haptics: true,
                amplitude_control: Some(true),
                predefined_effects: false,
                native_pattern_parsing: true,
            },
            CapabilityTier::Full => Capabilities {
                hardware_haptics: true,
                amplitude_control: None,
                predefined_effects: true,
                native_pattern_parsing: true,
            },
        };
        Self {
            capabilities,
            auto_complete: true,
            inner: Arc::new(Mutex::new(SimInner::default())),
        }
    }

    /// Enable or disable completion callbacks after the pattern duration
    pub fn with_auto_complete(mut self, enabled: bool) -> Self {
        self.auto_complete = enabled;
        self
    }

    /// Keep at most `capacity` journal entries; zero disables recording
    pub fn with_journal_capacity(self, capacity: usize) -> Self {
        {
            let mut inner = lock(&self.inner);
            inner.journal.capacity = capacity;
            while inner.journal.calls.len() > capacity {
                inner.journal.calls.pop_front();
            }
        }
        self
    }

    /// Report no native pattern parsing (legacy dialect)
    pub fn with_legacy_patterns(mut self) -> Self {
        self.capabilities.native_pattern_parsing = false;
        self
    }

    /// Make the next `count` actuator creations fail
    pub fn fail_next_creates(&self, count: u32) {
        lock(&self.inner).faults.create_failures = count;
    }

    /// Make the next `count` actuator arm attempts fail
    pub fn fail_next_starts(&self, count: u32) {
        lock(&self.inner).faults.start_failures = count;
    }

    pub fn fail_make_player(&self, fail: bool) {
        lock(&self.inner).faults.make_player = fail;
    }

    pub fn fail_player_start(&self, fail: bool) {
        lock(&self.inner).faults.player_start = fail;
    }

    /// Fail pause, resume, seek and cancel on players
    pub fn fail_player_control(&self, fail: bool) {
        lock(&self.inner).faults.player_control = fail;
    }

    pub fn fail_player_stop(&self, fail: bool) {
        lock(&self.inner).faults.player_stop = fail;
    }

    /// Simulate the platform resetting the actuator
    ///
    /// The resource drops out of the armed state and every existing player
    /// stops accepting calls. Returns false when no actuator exists.
    pub fn trigger_reset(&self) -> bool {
        let notifier = {
            let mut inner = lock(&self.inner);
            inner.running = false;
            inner.resets += 1;
            inner.notifier.clone()
        };
        match notifier {
            Some(notifier) => {
                debug!("Simulated backend: reset (generation {})", notifier.generation());
                notifier.reset();
                true
            }
            None => false,
        }
    }

    /// Simulate the platform stopping the actuator
    pub fn trigger_stopped(&self, reason: &str) -> bool {
        let notifier = lock(&self.inner).notifier.clone();
        match notifier {
            Some(notifier) => {
                debug!("Simulated backend: stopped ({})", reason);
                notifier.stopped(reason);
                true
            }
            None => false,
        }
    }

    /// Fire the completion handler of every unfinished player now
    ///
    /// Returns the number of handlers fired.
    pub fn complete_all(&self) -> usize {
        let players: Vec<_> = {
            let mut inner = lock(&self.inner);
            inner.players.retain(|p| p.strong_count() > 0);
            inner.players.iter().filter_map(Weak::upgrade).collect()
        };

        let handlers: Vec<CompletionHandler> = players
            .iter()
            .filter_map(|shared| {
                let mut shared = lock(shared);
                if shared.finished {
                    return None;
                }
                let handler = shared.handler.take()?;
                shared.finished = true;
                Some(handler)
            })
            .collect();

        let fired = handlers.len();
        for handler in handlers {
            handler(None);
        }
        fired
    }

    /// Recorded native calls, oldest first
    pub fn journal(&self) -> Vec<BackendCall> {
        lock(&self.inner).journal.calls.iter().cloned().collect()
    }

    pub fn clear_journal(&self) {
        lock(&self.inner).journal.calls.clear();
    }

    /// Whether the current actuator is armed
    pub fn is_running(&self) -> bool {
        lock(&self.inner).running
    }
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HapticBackend for SimulatedBackend {
    fn name(&self) -> &str {
        "simulated"
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn create_actuator(&self, notifier: ActuatorNotifier) -> NativeResult<Box<dyn Actuator>> {
        let mut inner = lock(&self.inner);
        let generation = notifier.generation();
        inner.journal.push(BackendCall::CreateActuator { generation });

        if inner.faults.create_failures > 0 {
            inner.faults.create_failures -= 1;
            return Err(NativeError::failed("haptic engine could not be created"));
        }

        debug!("Simulated backend: created actuator (generation {})", generation);
        inner.notifier = Some(notifier);
        inner.running = false;

        Ok(Box::new(SimActuator {
            auto_complete: self.auto_complete,
            inner: Arc::clone(&self.inner),
        }))
    }
}

struct SimActuator {
    auto_complete: bool,
    inner: Arc<Mutex<SimInner>>,
}

impl Actuator for SimActuator {
    fn start(&mut self) -> NativeResult<()> {
        let mut inner = lock(&self.inner);
        inner.journal.push(BackendCall::StartActuator);

        if inner.faults.start_failures > 0 {
            inner.faults.start_failures -= 1;
            return Err(NativeError::failed("haptic engine failed to start"));
        }
        if inner.running {
            return Err(NativeError::already_running("haptic engine already running"));
        }
        inner.running = true;
        debug!("Simulated backend: actuator armed");
        Ok(())
    }

    fn stop(&mut self) -> NativeResult<()> {
        let mut inner = lock(&self.inner);
        inner.journal.push(BackendCall::StopActuator);
        inner.running = false;
        debug!("Simulated backend: actuator stopped");
        Ok(())
    }

    fn make_player(&mut self, pattern: &Pattern) -> NativeResult<Box<dyn NativePlayer>> {
        let mut inner = lock(&self.inner);
        inner.next_player += 1;
        let id = inner.next_player;
        inner.journal.push(BackendCall::MakePlayer {
            player: id,
            events: pattern.len(),
        });

        if inner.faults.make_player {
            return Err(NativeError::failed("pattern player could not be created"));
        }
        if !inner.running {
            return Err(NativeError::failed("haptic engine is not running"));
        }

        let shared = Arc::new(Mutex::new(PlayerShared::default()));
        inner.players.retain(|p| p.strong_count() > 0);
        inner.players.push(Arc::downgrade(&shared));
        debug!("Simulated backend: player {} created ({} events)", id, pattern.len());

        Ok(Box::new(SimPlayer {
            id,
            reset_epoch: inner.resets,
            length: pattern.duration(),
            auto_complete: self.auto_complete,
            looping: false,
            shared,
            inner: Arc::clone(&self.inner),
        }))
    }

    fn pulse(&mut self, duration: Duration) -> NativeResult<()> {
        let mut inner = lock(&self.inner);
        inner.journal.push(BackendCall::Pulse { duration });
        if !inner.running {
            return Err(NativeError::failed("haptic engine is not running"));
        }
        debug!("Simulated backend: pulse {:?}", duration);
        Ok(())
    }

    fn cancel_pulse(&mut self) -> NativeResult<()> {
        lock(&self.inner).journal.push(BackendCall::CancelPulse);
        Ok(())
    }
}

#[derive(Default)]
struct PlayerShared {
    handler: Option<CompletionHandler>,
    /// Bumped on every transport call; a pending completion only fires if
    /// the value is unchanged when its timer expires
    run: u64,
    finished: bool,
}

struct SimPlayer {
    id: u64,
    reset_epoch: u64,
    length: Duration,
    auto_complete: bool,
    looping: bool,
    shared: Arc<Mutex<PlayerShared>>,
    inner: Arc<Mutex<SimInner>>,
}

#[derive(Clone, Copy)]
enum FaultClass {
    Start,
    Control,
    Stop,
}

impl SimPlayer {
    /// Journal a call and apply reset staleness and injected faults
    fn record(&self, call: BackendCall, class: FaultClass) -> NativeResult<()> {
        let mut inner = lock(&self.inner);
        inner.journal.push(call);

        if inner.resets != self.reset_epoch {
            return Err(NativeError::failed(
                "player is bound to an engine that was reset",
            ));
        }
        let injected = match class {
            FaultClass::Start => inner.faults.player_start,
            FaultClass::Control => inner.faults.player_control,
            FaultClass::Stop => inner.faults.player_stop,
        };
        if injected {
            return Err(NativeError::failed(format!(
                "player {} rejected the call",
                self.id
            )));
        }
        Ok(())
    }

    /// Invalidate any pending completion timer
    fn halt(&self) {
        lock(&self.shared).run += 1;
    }

    /// Stop for good; the completion handler is dropped unfired
    fn finish(&self) {
        let mut shared = lock(&self.shared);
        shared.run += 1;
        shared.finished = true;
        shared.handler = None;
    }

    /// Arm a completion timer for the time left after `position`
    fn schedule_completion(&self, position: Duration) {
        let token = {
            let mut shared = lock(&self.shared);
            shared.run += 1;
            shared.run
        };
        if !self.auto_complete || self.looping {
            return;
        }

        let remaining = self.length.saturating_sub(position);
        let shared = Arc::clone(&self.shared);
        let id = self.id;
        thread::spawn(move || {
            thread::sleep(remaining);
            let handler = {
                let mut shared = lock(&shared);
                if shared.run != token || shared.finished {
                    return;
                }
                shared.finished = true;
                shared.handler.take()
            };
            if let Some(handler) = handler {
                debug!("Simulated backend: player {} completed", id);
                handler(None);
            }
        });
    }
}

impl NativePlayer for SimPlayer {
    fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    fn set_completion_handler(&mut self, handler: CompletionHandler) {
        lock(&self.shared).handler = Some(handler);
    }

    fn start(&mut self, at: Duration) -> NativeResult<()> {
        self.record(BackendCall::PlayerStart { player: self.id, at }, FaultClass::Start)?;
        debug!("Simulated backend: player {} started at {:?}", self.id, at);
        self.schedule_completion(at);
        Ok(())
    }

    fn pause(&mut self, at: Duration) -> NativeResult<()> {
        self.record(BackendCall::PlayerPause { player: self.id, at }, FaultClass::Control)?;
        self.halt();
        Ok(())
    }

    fn resume(&mut self, at: Duration) -> NativeResult<()> {
        self.record(BackendCall::PlayerResume { player: self.id, at }, FaultClass::Control)?;
        self.schedule_completion(at);
        Ok(())
    }

    fn seek(&mut self, offset: Duration) -> NativeResult<()> {
        self.record(
            BackendCall::PlayerSeek {
                player: self.id,
                offset,
            },
            FaultClass::Control,
        )?;
        self.schedule_completion(offset);
        Ok(())
    }

    fn stop(&mut self, at: Duration) -> NativeResult<()> {
        self.record(BackendCall::PlayerStop { player: self.id, at }, FaultClass::Stop)?;
        self.finish();
        Ok(())
    }

    fn cancel(&mut self) -> NativeResult<()> {
        self.record(BackendCall::PlayerCancel { player: self.id }, FaultClass::Control)?;
        self.finish();
        Ok(())
    }
}
