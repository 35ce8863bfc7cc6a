//! Playback control
//!
//! Owns the single ActivePlayer slot and its transport controls.

mod controller;
mod player;

pub use controller::PlaybackController;
pub use player::PlayerInfo;
