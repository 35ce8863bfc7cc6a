//! State type definitions
//!
//! Supporting types for player, session and capability state.

use serde::{Deserialize, Serialize};

/// Lifecycle state of the active player
///
/// `Starting → Playing ⇄ Paused → Stopped | Completed | Cancelled`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlayerState {
    /// Player created, start not yet acknowledged by the native layer
    Starting,
    /// Pattern is playing
    Playing,
    /// Pattern is paused and can be resumed
    Paused,
    /// Stopped by an explicit stop or replaced by a newer pattern
    Stopped,
    /// Pattern ran to its end
    Completed,
    /// Cancelled by an explicit cancel
    Cancelled,
}

impl PlayerState {
    /// True for states after which the player is discarded
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PlayerState::Stopped | PlayerState::Completed | PlayerState::Cancelled
        )
    }
}

impl std::fmt::Display for PlayerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayerState::Starting => write!(f, "starting"),
            PlayerState::Playing => write!(f, "playing"),
            PlayerState::Paused => write!(f, "paused"),
            PlayerState::Stopped => write!(f, "stopped"),
            PlayerState::Completed => write!(f, "completed"),
            PlayerState::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Lifecycle state of the actuator session
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// No actuator created yet
    Uninitialized,
    /// Capabilities are being queried
    Probing,
    /// Actuator created and armed
    Ready,
    /// Arming failed or the actuator was lost; next use recreates it
    Degraded,
    /// Actuator torn down
    Released,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Uninitialized => write!(f, "uninitialized"),
            SessionState::Probing => write!(f, "probing"),
            SessionState::Ready => write!(f, "ready"),
            SessionState::Degraded => write!(f, "degraded"),
            SessionState::Released => write!(f, "released"),
        }
    }
}

/// Level of haptic control a device supports
///
/// Ordered from least to most capable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityTier {
    /// No haptic hardware
    None,
    /// On/off vibration only
    Coarse,
    /// Amplitude-controlled patterns
    Amplitude,
    /// Patterns plus predefined effects
    Full,
}

impl CapabilityTier {
    /// Whether timed intensity patterns can be played
    pub fn supports_patterns(&self) -> bool {
        *self >= CapabilityTier::Amplitude
    }

    /// Whether discrete predefined effects are available
    pub fn supports_predefined(&self) -> bool {
        *self == CapabilityTier::Full
    }

    /// Whether any vibration at all can be produced
    pub fn has_hardware(&self) -> bool {
        *self != CapabilityTier::None
    }
}

impl std::fmt::Display for CapabilityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CapabilityTier::None => write!(f, "none"),
            CapabilityTier::Coarse => write!(f, "coarse"),
            CapabilityTier::Amplitude => write!(f, "amplitude"),
            CapabilityTier::Full => write!(f, "full"),
        }
    }
}

impl std::str::FromStr for CapabilityTier {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(CapabilityTier::None),
            "coarse" => Ok(CapabilityTier::Coarse),
            "amplitude" => Ok(CapabilityTier::Amplitude),
            "full" => Ok(CapabilityTier::Full),
            other => Err(crate::Error::InvalidInput(format!(
                "unknown capability tier '{}'",
                other
            ))),
        }
    }
}

/// Parser used for external pattern files
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PatternDialect {
    /// Generic key/value dictionary walk
    Legacy,
    /// Typed document parse
    Native,
}

impl std::fmt::Display for PatternDialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PatternDialect::Legacy => write!(f, "legacy"),
            PatternDialect::Native => write!(f, "native"),
        }
    }
}
