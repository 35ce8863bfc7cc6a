//! External pattern files (AHAP-style JSON)
//!
//! ```json
//! { "Version": 1.0,
//!   "Pattern": [
//!     { "Event": { "Time": 0.0, "EventType": "HapticContinuous", "EventDuration": 0.25,
//!                  "EventParameters": [ { "ParameterID": "HapticIntensity", "ParameterValue": 0.8 } ] } } ] }
//! ```
//!
//! Two dialects read the same format:
//! - **Native**: typed deserialization of the whole document
//! - **Legacy**: parse into a generic key/value dictionary and walk it by hand
//!
//! Times are in seconds. Only haptic events are compiled; dynamic
//! parameters, parameter curves and audio events are skipped.

use super::{HapticEvent, Pattern};
use crate::error::{Error, Result};
use haptics_common::time::secs_f64_to_duration;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

const TRANSIENT: &str = "HapticTransient";
const CONTINUOUS: &str = "HapticContinuous";
const INTENSITY: &str = "HapticIntensity";
const SHARPNESS: &str = "HapticSharpness";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AhapDocument {
    #[serde(default)]
    #[allow(dead_code)]
    version: Option<f64>,
    pattern: Vec<AhapEntry>,
}

/// One element of the `Pattern` array; non-event entries deserialize with
/// `event == None`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AhapEntry {
    #[serde(default)]
    event: Option<AhapEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AhapEvent {
    time: f64,
    event_type: String,
    #[serde(default)]
    event_duration: Option<f64>,
    #[serde(default)]
    event_parameters: Vec<AhapParameter>,
}

#[derive(Debug, Deserialize)]
struct AhapParameter {
    #[serde(rename = "ParameterID")]
    parameter_id: String,
    #[serde(rename = "ParameterValue")]
    parameter_value: f64,
}

/// Parse with the typed (native) dialect
pub(super) fn parse_native(bytes: &[u8]) -> Result<Pattern> {
    reject_blank(bytes)?;
    let document: AhapDocument =
        serde_json::from_slice(bytes).map_err(|e| Error::PatternParse(e.to_string()))?;

    let mut events = Vec::new();
    let mut skipped = 0usize;
    for entry in document.pattern {
        let Some(event) = entry.event else {
            skipped += 1;
            continue;
        };
        let params = event
            .event_parameters
            .iter()
            .map(|p| (p.parameter_id.as_str(), p.parameter_value));
        match build_event(event.time, &event.event_type, event.event_duration, params)? {
            Some(e) => events.push(e),
            None => skipped += 1,
        }
    }

    finish(events, skipped)
}

/// Parse with the dictionary-walking (legacy) dialect
pub(super) fn parse_legacy(bytes: &[u8]) -> Result<Pattern> {
    reject_blank(bytes)?;
    let root: Value =
        serde_json::from_slice(bytes).map_err(|e| Error::PatternParse(e.to_string()))?;

    let dictionary = root
        .as_object()
        .ok_or_else(|| Error::PatternParse("pattern root must be a dictionary".to_string()))?;
    let entries = dictionary
        .get("Pattern")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::PatternParse("missing 'Pattern' array".to_string()))?;

    let mut events = Vec::new();
    let mut skipped = 0usize;
    for (index, entry) in entries.iter().enumerate() {
        let entry = entry.as_object().ok_or_else(|| {
            Error::PatternParse(format!("pattern entry {} is not a dictionary", index))
        })?;
        let Some(event) = entry.get("Event") else {
            skipped += 1;
            continue;
        };
        let event = event.as_object().ok_or_else(|| {
            Error::PatternParse(format!("pattern entry {}: 'Event' is not a dictionary", index))
        })?;

        let time = event.get("Time").and_then(Value::as_f64).ok_or_else(|| {
            Error::PatternParse(format!("pattern entry {}: missing numeric 'Time'", index))
        })?;
        let event_type = event.get("EventType").and_then(Value::as_str).ok_or_else(|| {
            Error::PatternParse(format!("pattern entry {}: missing 'EventType'", index))
        })?;
        let duration = match event.get("EventDuration") {
            None => None,
            Some(v) => Some(v.as_f64().ok_or_else(|| {
                Error::PatternParse(format!(
                    "pattern entry {}: 'EventDuration' is not a number",
                    index
                ))
            })?),
        };

        let mut params = Vec::new();
        if let Some(list) = event.get("EventParameters") {
            let list = list.as_array().ok_or_else(|| {
                Error::PatternParse(format!(
                    "pattern entry {}: 'EventParameters' is not a list",
                    index
                ))
            })?;
            for param in list {
                let id = param.get("ParameterID").and_then(Value::as_str);
                let value = param.get("ParameterValue").and_then(Value::as_f64);
                match (id, value) {
                    (Some(id), Some(value)) => params.push((id, value)),
                    _ => {
                        return Err(Error::PatternParse(format!(
                            "pattern entry {}: malformed event parameter",
                            index
                        )))
                    }
                }
            }
        }

        match build_event(time, event_type, duration, params.into_iter())? {
            Some(e) => events.push(e),
            None => skipped += 1,
        }
    }

    finish(events, skipped)
}

fn reject_blank(bytes: &[u8]) -> Result<()> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(Error::PatternParse("pattern content is empty".to_string()));
    }
    Ok(())
}

/// Convert one event description into a `HapticEvent`
///
/// Returns `Ok(None)` for entries that are valid but produce nothing
/// (audio events, silent continuous events).
fn build_event<'a>(
    time: f64,
    event_type: &str,
    duration: Option<f64>,
    params: impl Iterator<Item = (&'a str, f64)>,
) -> Result<Option<HapticEvent>> {
    if !time.is_finite() || time < 0.0 {
        return Err(Error::PatternParse(format!("invalid event Time {}", time)));
    }

    let mut intensity = 1.0f32;
    let mut sharpness = None;
    for (id, value) in params {
        match id {
            INTENSITY => intensity = value as f32,
            SHARPNESS => sharpness = Some(value as f32),
            other => debug!("Ignoring event parameter '{}'", other),
        }
    }

    let start = secs_f64_to_duration(time);
    let event = match event_type {
        TRANSIENT => Some(HapticEvent::transient(start, intensity)),
        CONTINUOUS => {
            let duration = duration.ok_or_else(|| {
                Error::PatternParse(format!(
                    "{} event at {}s has no EventDuration",
                    CONTINUOUS, time
                ))
            })?;
            let event = HapticEvent::continuous(start, secs_f64_to_duration(duration), intensity);
            if event.is_none() {
                debug!("Dropping silent continuous event at {}s", time);
            }
            event
        }
        "AudioCustom" | "AudioContinuous" => {
            debug!("Skipping audio event at {}s", time);
            None
        }
        other => {
            return Err(Error::PatternParse(format!("unknown EventType '{}'", other)));
        }
    };

    Ok(event.map(|e| match sharpness {
        Some(s) => e.with_sharpness(s),
        None => e,
    }))
}

fn finish(events: Vec<HapticEvent>, skipped: usize) -> Result<Pattern> {
    if skipped > 0 {
        debug!("Skipped {} non-haptic or silent pattern entries", skipped);
    }
    Ok(Pattern::from_events(events))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::EventKind;
    use std::time::Duration;

    const SAMPLE: &str = r#"{
        "Version": 1.0,
        "Metadata": { "Project": "Demo" },
        "Pattern": [
            { "Event": { "Time": 0.3, "EventType": "HapticTransient",
                "EventParameters": [
                    { "ParameterID": "HapticIntensity", "ParameterValue": 0.6 },
                    { "ParameterID": "HapticSharpness", "ParameterValue": 0.9 } ] } },
            { "Event": { "Time": 0.0, "EventType": "HapticContinuous", "EventDuration": 0.25,
                "EventParameters": [
                    { "ParameterID": "HapticIntensity", "ParameterValue": 0.8 } ] } },
            { "ParameterCurve": { "ParameterID": "HapticIntensityControl", "Time": 0.0,
                "ParameterCurveControlPoints": [ { "Time": 0, "ParameterValue": 1 } ] } },
            { "Event": { "Time": 0.5, "EventType": "AudioCustom", "EventWaveformPath": "a.wav" } },
            { "Event": { "Time": 0.6, "EventType": "HapticContinuous", "EventDuration": 0.0 } }
        ]
    }"#;

    fn check_sample(pattern: &Pattern) {
        assert_eq!(pattern.len(), 2);
        let first = pattern.events()[0];
        assert_eq!(first.kind, EventKind::Continuous);
        assert_eq!(first.start_offset, Duration::ZERO);
        assert_eq!(first.duration, Duration::from_millis(250));
        assert!((first.intensity - 0.8).abs() < 1e-6);
        assert_eq!(first.sharpness, None);

        let second = pattern.events()[1];
        assert_eq!(second.kind, EventKind::Transient);
        assert_eq!(second.start_offset, Duration::from_millis(300));
        assert_eq!(second.duration, Duration::ZERO);
        assert!((second.intensity - 0.6).abs() < 1e-6);
        assert!((second.sharpness.unwrap() - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_native_dialect_sample() {
        check_sample(&parse_native(SAMPLE.as_bytes()).unwrap());
    }

    #[test]
    fn test_legacy_dialect_sample() {
        check_sample(&parse_legacy(SAMPLE.as_bytes()).unwrap());
    }

    #[test]
    fn test_default_intensity_is_full() {
        let doc = br#"{"Pattern": [{"Event": {"Time": 0, "EventType": "HapticTransient"}}]}"#;
        for pattern in [parse_native(doc).unwrap(), parse_legacy(doc).unwrap()] {
            assert_eq!(pattern.events()[0].intensity, 1.0);
        }
    }

    #[test]
    fn test_no_haptic_events_is_empty_pattern() {
        let doc = br#"{"Version": 1, "Pattern": []}"#;
        assert!(parse_native(doc).unwrap().is_empty());
        assert!(parse_legacy(doc).unwrap().is_empty());
    }

    #[test]
    fn test_empty_content_is_parse_error() {
        assert!(matches!(parse_native(b""), Err(Error::PatternParse(_))));
        assert!(matches!(parse_legacy(b"  \n"), Err(Error::PatternParse(_))));
    }

    #[test]
    fn test_malformed_json_carries_diagnostic() {
        match parse_native(b"{\"Pattern\": [") {
            Err(Error::PatternParse(msg)) => assert!(msg.contains("EOF")),
            other => panic!("Expected PatternParse, got {:?}", other),
        }
        assert!(matches!(parse_legacy(b"{\"Pattern\": ["), Err(Error::PatternParse(_))));
    }

    #[test]
    fn test_missing_pattern_array() {
        assert!(matches!(parse_native(b"{\"Version\": 1}"), Err(Error::PatternParse(_))));
        match parse_legacy(b"{\"Version\": 1}") {
            Err(Error::PatternParse(msg)) => assert!(msg.contains("Pattern")),
            other => panic!("Expected PatternParse, got {:?}", other),
        }
        assert!(matches!(parse_legacy(b"[1, 2]"), Err(Error::PatternParse(_))));
    }

    #[test]
    fn test_continuous_without_duration() {
        let doc = br#"{"Pattern": [{"Event": {"Time": 0, "EventType": "HapticContinuous"}}]}"#;
        assert!(matches!(parse_native(doc), Err(Error::PatternParse(_))));
        assert!(matches!(parse_legacy(doc), Err(Error::PatternParse(_))));
    }

    #[test]
    fn test_unknown_event_type() {
        let doc = br#"{"Pattern": [{"Event": {"Time": 0, "EventType": "Wobble"}}]}"#;
        match parse_native(doc) {
            Err(Error::PatternParse(msg)) => assert!(msg.contains("Wobble")),
            other => panic!("Expected PatternParse, got {:?}", other),
        }
    }

    #[test]
    fn test_huge_times_saturate() {
        let doc = br#"{"Pattern": [
            {"Event": {"Time": 1e30, "EventType": "HapticTransient"}},
            {"Event": {"Time": 0.1, "EventType": "HapticContinuous", "EventDuration": 1e300}}
        ]}"#;
        for pattern in [parse_native(doc).unwrap(), parse_legacy(doc).unwrap()] {
            assert_eq!(pattern.len(), 2);
            assert_eq!(pattern.events()[0].duration, Duration::MAX);
            assert_eq!(pattern.events()[1].start_offset, Duration::MAX);
            assert_eq!(pattern.duration(), Duration::MAX);
        }
    }

    #[test]
    fn test_negative_time_rejected() {
        let doc = br#"{"Pattern": [{"Event": {"Time": -1.0, "EventType": "HapticTransient"}}]}"#;
        assert!(matches!(parse_native(doc), Err(Error::PatternParse(_))));
        assert!(matches!(parse_legacy(doc), Err(Error::PatternParse(_))));
    }
}
