//! # Haptics Engine Library (haptics-engine)
//!
//! Haptic pattern playback engine.
//!
//! **Purpose:** Compile waveform descriptions, predefined effects and
//! external pattern files into timed intensity events, own the device
//! actuator resource, and drive a single active player with transport
//! controls.
//!
//! **Architecture:** Command → `HapticEngine` → `PatternCompiler` →
//! `PlaybackController` → `ActuatorSession` → `HapticBackend`. Platform
//! notifications (reset, stopped, completion) arrive on channels and are
//! applied by background tasks.

pub mod asset;
pub mod backend;
pub mod capability;
pub mod command;
pub mod engine;
pub mod error;
pub mod pattern;
pub mod playback;
pub mod session;

pub use engine::{EngineStatus, HapticEngine};
pub use error::{Error, Result};
