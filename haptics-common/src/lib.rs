//! # Haptics Common Library
//!
//! Shared code for the haptics engine crates:
//! - Engine notification events (`EngineEvent`) and the `EventBus`
//! - Player/session/capability state enums
//! - Bootstrap configuration loading (TOML + environment + CLI overrides)
//! - Time conversion helpers

pub mod config;
pub mod error;
pub mod events;
pub mod time;

pub use error::{Error, Result};
