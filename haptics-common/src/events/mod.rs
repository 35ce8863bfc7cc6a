//! Event types for the haptics event system
//!
//! Provides the outbound notification enum and the `EventBus` that carries
//! it to any number of host-side subscribers.

mod state_types;

pub use state_types::{CapabilityTier, PatternDialect, PlayerState, SessionState};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Engine notification events
///
/// Emitted by the playback controller and the actuator session. Serialized
/// with an internal `type` tag so the host can forward them verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EngineEvent {
    /// A new pattern player was started and is now the active player
    PlayerStarted {
        /// Identifier of the new active player
        player_id: Uuid,
        /// Number of events in the compiled pattern
        event_count: usize,
        /// Offset the player was started at, in milliseconds
        start_offset_ms: f64,
        /// When playback was issued
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The active player moved between transport states
    PlayerStateChanged {
        /// Player whose state changed
        player_id: Uuid,
        /// State before the transition
        old_state: PlayerState,
        /// State after the transition
        new_state: PlayerState,
        /// When the transition happened
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The native layer reported that a player reached its end
    PlaybackCompleted {
        /// Player that completed
        player_id: Uuid,
        /// Diagnostic reported alongside completion, if any
        error: Option<String>,
        /// When completion was processed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The active player was dropped because its actuator went stale
    PlayerInvalidated {
        /// Player that was discarded
        player_id: Uuid,
        /// When the player was discarded
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The platform reset the actuator resource
    ActuatorReset {
        /// Whether re-arming after the reset succeeded
        rearmed: bool,
        /// When the reset was handled
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The platform stopped the actuator resource
    ActuatorStopped {
        /// Platform-reported reason
        reason: String,
        /// When the notification was handled
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The actuator resource was (re)created
    ActuatorRecreated {
        /// Player epoch after recreation
        epoch: u64,
        /// When the resource was created
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A coarse fixed-duration pulse was issued instead of a pattern
    CoarsePulse {
        /// Player slot entry tracking the pulse
        player_id: Uuid,
        /// Pulse length in milliseconds
        duration_ms: u64,
        /// When the pulse was issued
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl EngineEvent {
    /// Event type name as serialized in the `type` tag
    pub fn event_type(&self) -> &'static str {
        match self {
            EngineEvent::PlayerStarted { .. } => "PlayerStarted",
            EngineEvent::PlayerStateChanged { .. } => "PlayerStateChanged",
            EngineEvent::PlaybackCompleted { .. } => "PlaybackCompleted",
            EngineEvent::PlayerInvalidated { .. } => "PlayerInvalidated",
            EngineEvent::ActuatorReset { .. } => "ActuatorReset",
            EngineEvent::ActuatorStopped { .. } => "ActuatorStopped",
            EngineEvent::ActuatorRecreated { .. } => "ActuatorRecreated",
            EngineEvent::CoarsePulse { .. } => "CoarsePulse",
        }
    }
}

/// Central event distribution bus for engine notifications
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use haptics_common::events::{EventBus, EngineEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(EngineEvent::ActuatorStopped {
///     reason: "idle timeout".to_string(),
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero (tokio broadcast requirement). Configured
    /// capacities are validated before they reach this point.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: EngineEvent,
    ) -> Result<usize, broadcast::error::SendError<EngineEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}
