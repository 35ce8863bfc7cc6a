//! Playback controller
//!
//! **Responsibilities:**
//! - Hold at most one ActivePlayer (last writer wins, never queued)
//! - Stop and discard the previous player before a new one starts
//! - Forward transport controls to the native player
//! - Apply completion signals and session invalidations from a listener task
//! - Degrade to a coarse pulse on devices without pattern control
//!
//! **Locking:** the slot mutex is always taken before the session's own
//! lock, never the other way round.

use super::player::{ActivePlayer, PlayerInfo, PlayerKind, PlayerSignal};
use crate::error::{Error, Result};
use crate::pattern::Pattern;
use crate::session::{ActuatorSession, SessionEvent};
use haptics_common::events::{EngineEvent, EventBus, PlayerState};
use haptics_common::time::duration_to_millis_f64;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

type Slot = Arc<Mutex<Option<ActivePlayer>>>;

/// Owner of the ActivePlayer slot
pub struct PlaybackController {
    session: Arc<ActuatorSession>,
    slot: Slot,
    signal_tx: mpsc::UnboundedSender<PlayerSignal>,
    events: EventBus,
    coarse_pulse: Duration,
}

impl PlaybackController {
    /// Create the controller and spawn its listener task
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(session: Arc<ActuatorSession>, events: EventBus, coarse_pulse: Duration) -> Self {
        let slot: Slot = Arc::new(Mutex::new(None));
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();

        tokio::spawn(run_listener(
            Arc::downgrade(&slot),
            session.subscribe_invalidations(),
            signal_rx,
            events.clone(),
        ));

        Self {
            session,
            slot,
            signal_tx,
            events,
            coarse_pulse,
        }
    }

    /// Start playing `pattern` at `at`, replacing any active player
    ///
    /// Returns once the native start has been issued. An empty pattern is a
    /// successful no-op that leaves the current player alone.
    ///
    /// # Errors
    ///
    /// - `ActuatorUnavailable` if the actuator cannot be made ready
    /// - `Playback` if the player cannot be created or started; the slot
    ///   is left empty
    pub async fn play(&self, pattern: &Pattern, at: Duration) -> Result<()> {
        if pattern.is_empty() {
            debug!("Pattern has no events; nothing to play");
            return Ok(());
        }
        if !self.session.tier().supports_patterns() {
            info!(
                "Device tier {} lacks pattern control; issuing coarse pulse",
                self.session.tier()
            );
            return self.play_coarse_pulse().await;
        }

        let mut slot = self.slot.lock().await;
        let handle = self.session.ensure_ready().await?;

        if let Some(previous) = slot.take() {
            self.discard(previous).await;
        }

        let mut native = self.session.make_player(&handle, pattern).await?;
        native.set_looping(false);

        let player_id = Uuid::new_v4();
        let tx = self.signal_tx.clone();
        native.set_completion_handler(Box::new(move |error| {
            // Listener gone means the controller was dropped
            let _ = tx.send(PlayerSignal::Completed {
                player_id,
                error: error.map(|e| e.message),
            });
        }));

        let mut player = ActivePlayer {
            id: player_id,
            epoch: handle.epoch(),
            state: PlayerState::Starting,
            kind: PlayerKind::Pattern(native),
            event_count: pattern.len(),
        };
        if let PlayerKind::Pattern(native) = &mut player.kind {
            native.start(at).map_err(|e| Error::Playback(e.message))?;
        }

        info!(
            "Player {} started: {} events at {:?}",
            player_id,
            pattern.len(),
            at
        );
        self.events.emit_lossy(EngineEvent::PlayerStarted {
            player_id,
            event_count: pattern.len(),
            start_offset_ms: duration_to_millis_f64(at),
            timestamp: chrono::Utc::now(),
        });
        self.transition(&mut player, PlayerState::Playing);
        *slot = Some(player);
        Ok(())
    }

    /// Issue one coarse fixed-duration pulse, replacing any active player
    ///
    /// The pulse occupies the slot until its timer expires.
    pub async fn play_coarse_pulse(&self) -> Result<()> {
        let mut slot = self.slot.lock().await;
        let handle = self.session.ensure_ready().await?;

        if let Some(previous) = slot.take() {
            self.discard(previous).await;
        }

        self.session.pulse(&handle, self.coarse_pulse).await?;

        let player_id = Uuid::new_v4();
        *slot = Some(ActivePlayer {
            id: player_id,
            epoch: handle.epoch(),
            state: PlayerState::Playing,
            kind: PlayerKind::Pulse,
            event_count: 1,
        });

        let tx = self.signal_tx.clone();
        let duration = self.coarse_pulse;
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            let _ = tx.send(PlayerSignal::Completed {
                player_id,
                error: None,
            });
        });

        info!("Coarse pulse {} issued ({:?})", player_id, duration);
        self.events.emit_lossy(EngineEvent::CoarsePulse {
            player_id,
            duration_ms: duration.as_millis() as u64,
            timestamp: chrono::Utc::now(),
        });
        Ok(())
    }

    pub async fn pause(&self, at: Duration) -> Result<()> {
        info!("Pause command received");
        self.require_pattern_control("pause")?;

        let mut slot = self.slot.lock().await;
        let player = self.live_player(&mut slot).await?;
        let PlayerKind::Pattern(native) = &mut player.kind else {
            return Err(Error::UnsupportedOperation(
                "pause is not available for a coarse pulse".to_string(),
            ));
        };
        native
            .pause(at)
            .map_err(|e| Error::PlayerControl(e.message))?;
        self.transition(player, PlayerState::Paused);
        Ok(())
    }

    pub async fn resume(&self, at: Duration) -> Result<()> {
        info!("Resume command received");
        self.require_pattern_control("resume")?;

        let mut slot = self.slot.lock().await;
        let player = self.live_player(&mut slot).await?;
        let PlayerKind::Pattern(native) = &mut player.kind else {
            return Err(Error::UnsupportedOperation(
                "resume is not available for a coarse pulse".to_string(),
            ));
        };
        native
            .resume(at)
            .map_err(|e| Error::PlayerControl(e.message))?;
        self.transition(player, PlayerState::Playing);
        Ok(())
    }

    pub async fn seek(&self, offset: Duration) -> Result<()> {
        info!("Seek command received: {:?}", offset);
        self.require_pattern_control("seek")?;

        let mut slot = self.slot.lock().await;
        let player = self.live_player(&mut slot).await?;
        let PlayerKind::Pattern(native) = &mut player.kind else {
            return Err(Error::UnsupportedOperation(
                "seek is not available for a coarse pulse".to_string(),
            ));
        };
        native
            .seek(offset)
            .map_err(|e| Error::PlayerControl(e.message))
    }

    /// Stop the active player and clear the slot
    pub async fn stop(&self, at: Duration) -> Result<()> {
        info!("Stop command received");
        let mut slot = self.slot.lock().await;
        let player = self.live_player(&mut slot).await?;

        match &mut player.kind {
            PlayerKind::Pattern(native) => native
                .stop(at)
                .map_err(|e| Error::PlayerControl(e.message))?,
            PlayerKind::Pulse => self.session.cancel_pulse().await?,
        }

        if let Some(mut player) = slot.take() {
            self.transition(&mut player, PlayerState::Stopped);
        }
        Ok(())
    }

    /// Make sure nothing is vibrating
    ///
    /// Never fails. With no active player this performs no native call;
    /// a native cancel failure is logged and the slot is cleared anyway.
    pub async fn cancel(&self) {
        info!("Cancel command received");
        let mut slot = self.slot.lock().await;
        let Some(mut player) = slot.take() else {
            debug!("No active player to cancel");
            return;
        };

        if player.epoch < self.session.epoch().await {
            self.emit_invalidated(&player);
            return;
        }

        let result = match &mut player.kind {
            PlayerKind::Pattern(native) => {
                native.cancel().map_err(|e| Error::PlayerControl(e.message))
            }
            PlayerKind::Pulse => self.session.cancel_pulse().await,
        };
        if let Err(e) = result {
            warn!("Cancel of player {} failed: {}", player.id, e);
        }
        self.transition(&mut player, PlayerState::Cancelled);
    }

    /// Snapshot of the active player, if it is still live
    pub async fn active_player(&self) -> Option<PlayerInfo> {
        let slot = self.slot.lock().await;
        let epoch = self.session.epoch().await;
        slot.as_ref()
            .filter(|p| p.epoch >= epoch)
            .map(ActivePlayer::info)
    }

    fn require_pattern_control(&self, operation: &str) -> Result<()> {
        let tier = self.session.tier();
        if tier.supports_patterns() {
            Ok(())
        } else {
            Err(Error::UnsupportedOperation(format!(
                "{} requires pattern control (device tier: {})",
                operation, tier
            )))
        }
    }

    /// Active player bound to the current epoch; a stale one is cleared
    async fn live_player<'a>(
        &self,
        slot: &'a mut Option<ActivePlayer>,
    ) -> Result<&'a mut ActivePlayer> {
        let epoch = self.session.epoch().await;
        if slot.as_ref().is_some_and(|p| p.epoch < epoch) {
            if let Some(stale) = slot.take() {
                self.emit_invalidated(&stale);
            }
        }
        slot.as_mut().ok_or(Error::NoActivePlayer)
    }

    /// Best-effort stop of a replaced player; failures are swallowed
    async fn discard(&self, mut previous: ActivePlayer) {
        let result = match &mut previous.kind {
            PlayerKind::Pattern(native) => native
                .stop(Duration::ZERO)
                .map_err(|e| Error::PlayerControl(e.message)),
            PlayerKind::Pulse => self.session.cancel_pulse().await,
        };
        match result {
            Ok(()) => debug!("Replaced player {} stopped", previous.id),
            Err(e) => debug!("Ignoring stop failure for replaced player {}: {}", previous.id, e),
        }
        self.transition(&mut previous, PlayerState::Stopped);
    }

    fn transition(&self, player: &mut ActivePlayer, new_state: PlayerState) {
        let old_state = player.state;
        player.state = new_state;
        debug!("Player {}: {} -> {}", player.id, old_state, new_state);
        self.events.emit_lossy(EngineEvent::PlayerStateChanged {
            player_id: player.id,
            old_state,
            new_state,
            timestamp: chrono::Utc::now(),
        });
    }

    fn emit_invalidated(&self, player: &ActivePlayer) {
        info!("Player {} dropped: actuator went stale", player.id);
        self.events.emit_lossy(EngineEvent::PlayerInvalidated {
            player_id: player.id,
            timestamp: chrono::Utc::now(),
        });
    }
}

/// Apply session invalidations and completion signals to the slot
///
/// Exits once the controller (and with it the slot) is dropped.
async fn run_listener(
    slot: Weak<Mutex<Option<ActivePlayer>>>,
    mut invalidations: broadcast::Receiver<SessionEvent>,
    mut signals: mpsc::UnboundedReceiver<PlayerSignal>,
    events: EventBus,
) {
    loop {
        tokio::select! {
            received = invalidations.recv() => match received {
                Ok(SessionEvent::Invalidated { epoch }) => {
                    let Some(slot) = slot.upgrade() else { break };
                    let mut guard = slot.lock().await;
                    if guard.as_ref().is_some_and(|p| p.epoch < epoch) {
                        if let Some(player) = guard.take() {
                            info!("Player {} invalidated by actuator epoch {}", player.id, epoch);
                            events.emit_lossy(EngineEvent::PlayerInvalidated {
                                player_id: player.id,
                                timestamp: chrono::Utc::now(),
                            });
                        }
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    // Transport controls still catch stale players lazily
                    warn!("Playback listener lagged by {} invalidations", skipped);
                }
                Err(RecvError::Closed) => break,
            },
            signal = signals.recv() => match signal {
                Some(PlayerSignal::Completed { player_id, error }) => {
                    let Some(slot) = slot.upgrade() else { break };
                    let mut guard = slot.lock().await;
                    if !guard.as_ref().is_some_and(|p| p.id == player_id) {
                        debug!("Ignoring completion of replaced player {}", player_id);
                        continue;
                    }
                    if let Some(player) = guard.take() {
                        match &error {
                            Some(e) => warn!("Player {} completed with error: {}", player_id, e),
                            None => info!("Player {} completed", player_id),
                        }
                        events.emit_lossy(EngineEvent::PlayerStateChanged {
                            player_id,
                            old_state: player.state,
                            new_state: PlayerState::Completed,
                            timestamp: chrono::Utc::now(),
                        });
                        events.emit_lossy(EngineEvent::PlaybackCompleted {
                            player_id,
                            error,
                            timestamp: chrono::Utc::now(),
                        });
                    }
                }
                None => break,
            },
        }
    }
    debug!("Playback listener exited");
}
