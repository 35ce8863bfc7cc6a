//! Engine facade
//!
//! Wires the capability probe, pattern compiler, actuator session,
//! playback controller and asset source together. One method per host
//! command, plus `dispatch` for already-parsed `Command`s.

use crate::asset::AssetSource;
use crate::backend::HapticBackend;
use crate::command::{Command, CommandReply};
use crate::error::{Error, Result};
use crate::pattern::{EffectId, PatternCompiler};
use crate::playback::{PlaybackController, PlayerInfo};
use crate::session::ActuatorSession;
use haptics_common::config::EngineConfig;
use haptics_common::events::{
    CapabilityTier, EngineEvent, EventBus, PatternDialect, SessionState,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::info;

/// Two 50 ms pulses 150 ms apart
const SUCCESS_TIMINGS_MS: [u64; 4] = [0, 50, 100, 50];
const SUCCESS_AMPLITUDES: [f64; 4] = [0.0, 150.0, 0.0, 150.0];

/// Point-in-time view of the engine
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub session_state: SessionState,
    pub tier: CapabilityTier,
    pub dialect: PatternDialect,
    pub supports_custom_haptics: bool,
    pub active_player: Option<PlayerInfo>,
}

/// Haptic playback engine for one device
pub struct HapticEngine {
    config: EngineConfig,
    events: EventBus,
    session: Arc<ActuatorSession>,
    compiler: PatternCompiler,
    controller: PlaybackController,
    assets: Arc<dyn AssetSource>,
}

impl HapticEngine {
    /// Build an engine on top of `backend`
    ///
    /// Capabilities are probed here, once; no native resource is acquired
    /// until the first playback. Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// `Config` if `config` fails validation.
    pub fn new(
        backend: Arc<dyn HapticBackend>,
        assets: Arc<dyn AssetSource>,
        config: EngineConfig,
    ) -> Result<Self> {
        config.validate()?;

        let events = EventBus::new(config.event_capacity);
        let session = ActuatorSession::new(backend, events.clone());
        let compiler = PatternCompiler::new(session.tier(), session.dialect());
        let controller =
            PlaybackController::new(Arc::clone(&session), events.clone(), config.coarse_pulse());

        Ok(Self {
            config,
            events,
            session,
            compiler,
            controller,
            assets,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Whether fine-grained (amplitude/pattern) haptics are available
    pub fn supports_custom_haptics(&self) -> bool {
        self.session.supports_custom_haptics()
    }

    /// Compile and play a waveform (amplitudes on the 0-255 scale)
    pub async fn play_waveform(
        &self,
        timings: &[Duration],
        amplitudes: &[f64],
        start_offset: Duration,
    ) -> Result<()> {
        let pattern = self.compiler.compile_waveform(timings, amplitudes)?;
        self.controller.play(&pattern, start_offset).await
    }

    /// Play a built-in effect, or a coarse pulse where effects are missing
    pub async fn play_predefined(&self, effect: EffectId) -> Result<()> {
        match self.compiler.compile_predefined(effect) {
            Ok(pattern) => self.controller.play(&pattern, Duration::ZERO).await,
            Err(Error::UnsupportedEffect(reason)) => {
                info!("Predefined effect unavailable ({}); falling back to pulse", reason);
                self.controller.play_coarse_pulse().await
            }
            Err(e) => Err(e),
        }
    }

    /// Load, compile and play an external pattern file
    pub async fn play_external(&self, asset_path: &str, start_offset: Duration) -> Result<()> {
        let bytes = self.assets.load(asset_path)?;
        let pattern = self.compiler.compile_from_external_pattern(&bytes)?;
        info!("Playing pattern file '{}' ({} events)", asset_path, pattern.len());
        self.controller.play(&pattern, start_offset).await
    }

    /// Play the fixed success cue
    pub async fn play_success(&self) -> Result<()> {
        let timings = SUCCESS_TIMINGS_MS.map(Duration::from_millis);
        self.play_waveform(&timings, &SUCCESS_AMPLITUDES, Duration::ZERO)
            .await
    }

    pub async fn pause(&self, at_offset: Duration) -> Result<()> {
        self.controller.pause(at_offset).await
    }

    pub async fn resume(&self, at_offset: Duration) -> Result<()> {
        self.controller.resume(at_offset).await
    }

    pub async fn seek(&self, offset: Duration) -> Result<()> {
        self.controller.seek(offset).await
    }

    pub async fn stop(&self, at_offset: Duration) -> Result<()> {
        self.controller.stop(at_offset).await
    }

    pub async fn cancel(&self) {
        self.controller.cancel().await
    }

    /// Silence playback and tear down the actuator
    ///
    /// The engine stays usable; the next playback re-acquires the actuator.
    pub async fn release(&self) {
        info!("Releasing haptic engine");
        self.controller.cancel().await;
        self.session.release().await;
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    pub async fn status(&self) -> EngineStatus {
        EngineStatus {
            session_state: self.session.state().await,
            tier: self.session.tier(),
            dialect: self.session.dialect(),
            supports_custom_haptics: self.session.supports_custom_haptics(),
            active_player: self.controller.active_player().await,
        }
    }

    /// Execute one command
    pub async fn dispatch(&self, command: Command) -> Result<CommandReply> {
        match command {
            Command::CapabilityQuery => {
                return Ok(CommandReply::Bool(self.supports_custom_haptics()));
            }
            Command::PlayWaveform {
                timings,
                amplitudes,
                start_offset,
            } => {
                self.play_waveform(&timings, &amplitudes, start_offset)
                    .await?
            }
            Command::PlayPredefined { effect } => self.play_predefined(effect).await?,
            Command::PlayExternal {
                asset_path,
                start_offset,
            } => self.play_external(&asset_path, start_offset).await?,
            Command::PlaySuccess => self.play_success().await?,
            Command::Pause { at_offset } => self.pause(at_offset).await?,
            Command::Resume { at_offset } => self.resume(at_offset).await?,
            Command::Seek { offset } => self.seek(offset).await?,
            Command::Stop { at_offset } => self.stop(at_offset).await?,
            Command::Cancel => self.cancel().await,
        }
        Ok(CommandReply::Done)
    }
}
