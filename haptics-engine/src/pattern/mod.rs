//! Pattern compiler
//!
//! Turns the three pattern sources (waveform arrays, predefined effect IDs,
//! external pattern files) into one normalized representation: an ordered,
//! immutable list of `HapticEvent`s.
//!
//! **Invariants:**
//! - Events are ordered by non-decreasing `start_offset`
//! - Continuous events always have `intensity > 0` and `duration > 0`;
//!   candidates that fail this are dropped, never reported as errors
//! - Intensity and sharpness are normalized to 0.0-1.0

mod ahap;
mod predefined;
mod waveform;

pub use predefined::EffectId;
pub use waveform::{compile_waveform, normalize_amplitude, MAX_AMPLITUDE};

use crate::error::{Error, Result};
use haptics_common::events::{CapabilityTier, PatternDialect};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Kind of a discrete vibration instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Instantaneous tap (`duration == 0`)
    Transient,
    /// Sustained vibration over `duration`
    Continuous,
}

/// One discrete vibration instruction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HapticEvent {
    /// Transient or continuous
    pub kind: EventKind,
    /// Time since pattern start
    pub start_offset: Duration,
    /// Length of the vibration (zero for transients)
    pub duration: Duration,
    /// Normalized intensity (0.0-1.0)
    pub intensity: f32,
    /// Normalized sharpness (0.0-1.0), platform-dependent
    pub sharpness: Option<f32>,
}

impl HapticEvent {
    /// Continuous event, or `None` if it would vibrate for nothing
    pub fn continuous(start_offset: Duration, duration: Duration, intensity: f32) -> Option<Self> {
        let intensity = clamp_unit(intensity);
        if intensity > 0.0 && !duration.is_zero() {
            Some(Self {
                kind: EventKind::Continuous,
                start_offset,
                duration,
                intensity,
                sharpness: None,
            })
        } else {
            None
        }
    }

    /// Instantaneous event
    pub fn transient(start_offset: Duration, intensity: f32) -> Self {
        Self {
            kind: EventKind::Transient,
            start_offset,
            duration: Duration::ZERO,
            intensity: clamp_unit(intensity),
            sharpness: None,
        }
    }

    /// Attach a sharpness value (clamped to 0.0-1.0)
    pub fn with_sharpness(mut self, sharpness: f32) -> Self {
        self.sharpness = Some(clamp_unit(sharpness));
        self
    }

    /// Time at which the event finishes
    pub fn end_offset(&self) -> Duration {
        self.start_offset.saturating_add(self.duration)
    }
}

/// Clamp into 0.0-1.0, mapping NaN to 0.0
fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Ordered, immutable sequence of haptic events
///
/// Cloning is cheap; the events are shared.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    events: Arc<[HapticEvent]>,
}

impl Pattern {
    /// Pattern with no events (a successful no-op when played)
    pub fn empty() -> Self {
        Self {
            events: Arc::from(Vec::new()),
        }
    }

    /// Build a pattern, ordering events by start offset
    ///
    /// The sort is stable, so events sharing an offset keep their input order.
    pub fn from_events(mut events: Vec<HapticEvent>) -> Self {
        events.sort_by_key(|e| e.start_offset);
        Self {
            events: Arc::from(events),
        }
    }

    pub fn events(&self) -> &[HapticEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Time at which the last event finishes
    pub fn duration(&self) -> Duration {
        self.events
            .iter()
            .map(HapticEvent::end_offset)
            .max()
            .unwrap_or(Duration::ZERO)
    }
}

impl Default for Pattern {
    fn default() -> Self {
        Self::empty()
    }
}

/// Compiles pattern sources for one device
///
/// The capability tier and external-pattern dialect are fixed when the
/// session is created and never re-checked per call.
#[derive(Debug, Clone, Copy)]
pub struct PatternCompiler {
    tier: CapabilityTier,
    dialect: PatternDialect,
}

impl PatternCompiler {
    pub fn new(tier: CapabilityTier, dialect: PatternDialect) -> Self {
        Self { tier, dialect }
    }

    pub fn tier(&self) -> CapabilityTier {
        self.tier
    }

    pub fn dialect(&self) -> PatternDialect {
        self.dialect
    }

    /// Compile parallel duration/amplitude arrays
    ///
    /// See [`compile_waveform`].
    pub fn compile_waveform(&self, timings: &[Duration], amplitudes: &[f64]) -> Result<Pattern> {
        compile_waveform(timings, amplitudes)
    }

    /// Compile a named built-in effect
    ///
    /// # Errors
    ///
    /// `UnsupportedEffect` when the tier lacks discrete predefined effects.
    /// Callers fall back to a coarse pulse in that case.
    pub fn compile_predefined(&self, effect: EffectId) -> Result<Pattern> {
        if !self.tier.supports_predefined() {
            return Err(Error::UnsupportedEffect(format!(
                "effect '{}' requires predefined effect support (device tier: {})",
                effect, self.tier
            )));
        }
        let pattern = predefined::builtin_pattern(effect);
        debug!("Compiled predefined effect '{}' into {} events", effect, pattern.len());
        Ok(pattern)
    }

    /// Compile external pattern file content
    ///
    /// # Errors
    ///
    /// `PatternParse` carrying the parser diagnostic on malformed content.
    pub fn compile_from_external_pattern(&self, bytes: &[u8]) -> Result<Pattern> {
        let pattern = match self.dialect {
            PatternDialect::Native => ahap::parse_native(bytes)?,
            PatternDialect::Legacy => ahap::parse_legacy(bytes)?,
        };
        debug!(
            "Compiled external pattern ({} dialect) into {} events",
            self.dialect,
            pattern.len()
        );
        Ok(pattern)
    }
}
