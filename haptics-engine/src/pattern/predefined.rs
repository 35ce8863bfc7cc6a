//! Predefined effects
//!
//! Small fixed vocabulary of named effects, each mapped to a built-in
//! event sequence.

use super::{HapticEvent, Pattern};
use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Named built-in effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectId {
    Click,
    DoubleClick,
    Tick,
    HeavyClick,
    Success,
    Warning,
    Error,
}

impl EffectId {
    /// Every effect, in declaration order
    pub const ALL: [EffectId; 7] = [
        EffectId::Click,
        EffectId::DoubleClick,
        EffectId::Tick,
        EffectId::HeavyClick,
        EffectId::Success,
        EffectId::Warning,
        EffectId::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EffectId::Click => "click",
            EffectId::DoubleClick => "double_click",
            EffectId::Tick => "tick",
            EffectId::HeavyClick => "heavy_click",
            EffectId::Success => "success",
            EffectId::Warning => "warning",
            EffectId::Error => "error",
        }
    }
}

impl std::fmt::Display for EffectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EffectId {
    type Err = Error;

    /// Accepts snake_case and camelCase spellings
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "click" => Ok(EffectId::Click),
            "doubleclick" => Ok(EffectId::DoubleClick),
            "tick" => Ok(EffectId::Tick),
            "heavyclick" => Ok(EffectId::HeavyClick),
            "success" => Ok(EffectId::Success),
            "warning" => Ok(EffectId::Warning),
            "error" => Ok(EffectId::Error),
            _ => Err(Error::InvalidArguments(format!("unknown effect '{}'", s))),
        }
    }
}

/// Built-in event sequence for an effect
pub(super) fn builtin_pattern(effect: EffectId) -> Pattern {
    let at = Duration::from_millis;
    let events = match effect {
        EffectId::Click => vec![HapticEvent::transient(at(0), 0.8).with_sharpness(0.5)],
        EffectId::DoubleClick => vec![
            HapticEvent::transient(at(0), 0.8).with_sharpness(0.5),
            HapticEvent::transient(at(100), 0.8).with_sharpness(0.5),
        ],
        EffectId::Tick => vec![HapticEvent::transient(at(0), 0.4).with_sharpness(1.0)],
        EffectId::HeavyClick => vec![HapticEvent::transient(at(0), 1.0).with_sharpness(0.3)],
        EffectId::Success => vec![
            HapticEvent::transient(at(0), 1.0).with_sharpness(0.5),
            HapticEvent::transient(at(100), 1.0).with_sharpness(0.5),
        ],
        EffectId::Warning => {
            let mut events = Vec::with_capacity(2);
            if let Some(buzz) = HapticEvent::continuous(at(0), at(150), 0.7) {
                events.push(buzz.with_sharpness(0.3));
            }
            events.push(HapticEvent::transient(at(250), 1.0).with_sharpness(0.7));
            events
        }
        EffectId::Error => vec![
            HapticEvent::transient(at(0), 1.0).with_sharpness(0.9),
            HapticEvent::transient(at(100), 1.0).with_sharpness(0.9),
            HapticEvent::transient(at(200), 1.0).with_sharpness(0.9),
        ],
    };
    Pattern::from_events(events)
}
