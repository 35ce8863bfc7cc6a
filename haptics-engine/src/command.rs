//! Command surface
//!
//! Typed intents built from a method name plus a JSON argument map, as
//! delivered by the host's dispatch layer. All times on this surface are
//! milliseconds; missing optional offsets default to zero, and negative or
//! non-finite values are clamped to zero.

use crate::error::{Error, Result};
use crate::pattern::EffectId;
use haptics_common::time::millis_f64_to_duration;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// One command from the host
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `hasCustomHapticsSupport`
    CapabilityQuery,
    /// `playWaveform`
    PlayWaveform {
        timings: Vec<Duration>,
        /// 0-255 scale
        amplitudes: Vec<f64>,
        start_offset: Duration,
    },
    /// `playPredefined`
    PlayPredefined { effect: EffectId },
    /// `playAhap`
    PlayExternal {
        asset_path: String,
        start_offset: Duration,
    },
    /// `success`
    PlaySuccess,
    Pause { at_offset: Duration },
    Resume { at_offset: Duration },
    Seek { offset: Duration },
    Stop { at_offset: Duration },
    Cancel,
}

impl Command {
    /// Build a command from a method name and its argument map
    ///
    /// `args` may be `null` for methods without arguments.
    ///
    /// # Errors
    ///
    /// - `UnknownCommand` for an unrecognized method
    /// - `InvalidArguments` for a missing or ill-typed argument
    pub fn from_method_call(method: &str, args: &Value) -> Result<Self> {
        if !(args.is_null() || args.is_object()) {
            return Err(Error::InvalidArguments(format!(
                "arguments for '{}' must be a map",
                method
            )));
        }

        let command = match method {
            "hasCustomHapticsSupport" => Command::CapabilityQuery,
            "playWaveform" => {
                let timings = number_list(args, "timings")?
                    .into_iter()
                    .map(millis_f64_to_duration)
                    .collect();
                Command::PlayWaveform {
                    timings,
                    amplitudes: number_list(args, "amplitudes")?,
                    start_offset: optional_millis(args, "startOffset")?,
                }
            }
            "playPredefined" => Command::PlayPredefined {
                effect: required_str(args, "effectId")?.parse()?,
            },
            "playAhap" => Command::PlayExternal {
                asset_path: required_str(args, "path")?.to_string(),
                start_offset: optional_millis(args, "startOffset")?,
            },
            "success" => Command::PlaySuccess,
            "pause" => Command::Pause {
                at_offset: optional_millis(args, "atOffset")?,
            },
            "resume" => Command::Resume {
                at_offset: optional_millis(args, "atOffset")?,
            },
            "seek" => Command::Seek {
                offset: required_millis(args, "offset")?,
            },
            "stop" => Command::Stop {
                at_offset: optional_millis(args, "atOffset")?,
            },
            "cancel" => Command::Cancel,
            other => return Err(Error::UnknownCommand(other.to_string())),
        };
        Ok(command)
    }

    /// Host method name this command answers to
    pub fn method_name(&self) -> &'static str {
        match self {
            Command::CapabilityQuery => "hasCustomHapticsSupport",
            Command::PlayWaveform { .. } => "playWaveform",
            Command::PlayPredefined { .. } => "playPredefined",
            Command::PlayExternal { .. } => "playAhap",
            Command::PlaySuccess => "success",
            Command::Pause { .. } => "pause",
            Command::Resume { .. } => "resume",
            Command::Seek { .. } => "seek",
            Command::Stop { .. } => "stop",
            Command::Cancel => "cancel",
        }
    }
}

/// Successful command result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CommandReply {
    /// Answer to a query
    Bool(bool),
    /// Command carried out; serializes as `null`
    Done,
}

fn number_list(args: &Value, key: &str) -> Result<Vec<f64>> {
    let list = args
        .get(key)
        .ok_or_else(|| missing(key))?
        .as_array()
        .ok_or_else(|| Error::InvalidArguments(format!("'{}' must be a list of numbers", key)))?;
    list.iter()
        .map(|v| {
            v.as_f64().ok_or_else(|| {
                Error::InvalidArguments(format!("'{}' contains a non-number: {}", key, v))
            })
        })
        .collect()
}

fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str> {
    args.get(key)
        .ok_or_else(|| missing(key))?
        .as_str()
        .ok_or_else(|| Error::InvalidArguments(format!("'{}' must be a string", key)))
}

fn required_millis(args: &Value, key: &str) -> Result<Duration> {
    match args.get(key) {
        None | Some(Value::Null) => Err(missing(key)),
        Some(value) => millis(key, value),
    }
}

fn optional_millis(args: &Value, key: &str) -> Result<Duration> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(Duration::ZERO),
        Some(value) => millis(key, value),
    }
}

fn millis(key: &str, value: &Value) -> Result<Duration> {
    value
        .as_f64()
        .map(millis_f64_to_duration)
        .ok_or_else(|| Error::InvalidArguments(format!("'{}' must be milliseconds", key)))
}

fn missing(key: &str) -> Error {
    Error::InvalidArguments(format!("missing argument '{}'", key))
}
