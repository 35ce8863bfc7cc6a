//! Waveform compilation
//!
//! A waveform is two parallel arrays: segment durations and segment
//! amplitudes on the 0-255 scale. Every segment whose duration and amplitude
//! are both positive becomes one continuous event; every other segment is a
//! silent gap. Index parity carries no meaning.

use super::{HapticEvent, Pattern};
use crate::error::{Error, Result};
use std::time::Duration;
use tracing::debug;

/// Amplitude that maps to full intensity
pub const MAX_AMPLITUDE: f64 = 255.0;

/// Map a 0-255 amplitude to a normalized intensity
///
/// Values above 255 saturate at 1.0; negative values and NaN map to 0.0.
pub fn normalize_amplitude(amplitude: f64) -> f32 {
    if amplitude.is_nan() {
        return 0.0;
    }
    (amplitude / MAX_AMPLITUDE).clamp(0.0, 1.0) as f32
}

/// Compile a waveform into a pattern
///
/// Walks both arrays in lock-step, accumulating the relative time. Gaps
/// still advance the clock. A waveform made only of gaps compiles to an
/// empty pattern, which plays as a successful no-op.
///
/// # Errors
///
/// `ArgumentMismatch` when the arrays differ in length.
pub fn compile_waveform(timings: &[Duration], amplitudes: &[f64]) -> Result<Pattern> {
    if timings.len() != amplitudes.len() {
        return Err(Error::ArgumentMismatch(format!(
            "timings has {} entries but amplitudes has {}",
            timings.len(),
            amplitudes.len()
        )));
    }

    let mut events = Vec::new();
    let mut relative_time = Duration::ZERO;

    for (&duration, &amplitude) in timings.iter().zip(amplitudes) {
        if amplitude > 0.0 && !duration.is_zero() {
            if let Some(event) =
                HapticEvent::continuous(relative_time, duration, normalize_amplitude(amplitude))
            {
                events.push(event);
            }
        }
        relative_time = relative_time.saturating_add(duration);
    }

    if events.is_empty() {
        debug!("Waveform of {} segments contains only gaps", timings.len());
    } else {
        debug!(
            "Compiled waveform of {} segments into {} events",
            timings.len(),
            events.len()
        );
    }

    Ok(Pattern::from_events(events))
}
