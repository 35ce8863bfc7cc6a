//! Actuator session
//!
//! Sole owner of the native actuator resource.
//!
//! **Responsibilities:**
//! - Lazily create and arm the actuator (`ensure_ready`)
//! - Self-heal: one tear-down/recreate/re-arm retry on arm failure
//! - Apply platform reset/stopped notifications off the caller's path, and
//!   before arming so a queued reset is never applied after a newer player
//! - Invalidate players bound to a stale actuator via `SessionEvent`
//! - Tear the resource down on `release`
//!
//! **Epochs:** every player records the session epoch current when it was
//! created. The epoch advances whenever the actuator instance it was bound
//! to stops being usable (tear-down, reset, release), and the new value is
//! broadcast so the playback controller can drop stale players.

use crate::backend::{
    Actuator, ActuatorNotification, ActuatorNotifier, Capabilities, HapticBackend, NativeError,
    NativePlayer, NativeResult,
};
use crate::capability;
use crate::error::{Error, Result};
use crate::pattern::Pattern;
use haptics_common::events::{
    CapabilityTier, EngineEvent, EventBus, PatternDialect, SessionState,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::{debug, info, warn};

/// Invalidation signal consumed by the playback controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Players created under an epoch older than `epoch` are unusable
    Invalidated { epoch: u64 },
}

/// Proof that the actuator was armed under a given epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActuatorHandle {
    epoch: u64,
}

impl ActuatorHandle {
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

struct SessionInner {
    state: SessionState,
    actuator: Option<Box<dyn Actuator>>,
    /// Incremented per created actuator; tags notifier messages
    generation: u64,
    epoch: u64,
    /// Queued platform notifications; only drained under this lock
    notifications: mpsc::UnboundedReceiver<(u64, ActuatorNotification)>,
}

/// Owner of the native vibration resource
pub struct ActuatorSession {
    backend: Arc<dyn HapticBackend>,
    capabilities: Capabilities,
    tier: CapabilityTier,
    dialect: PatternDialect,
    inner: Mutex<SessionInner>,
    notify_tx: mpsc::UnboundedSender<(u64, ActuatorNotification)>,
    doorbell_tx: mpsc::UnboundedSender<()>,
    invalidate_tx: broadcast::Sender<SessionEvent>,
    events: EventBus,
}

impl ActuatorSession {
    /// Probe capabilities and start the notification pump
    ///
    /// Must be called from within a Tokio runtime. No native resource is
    /// acquired until the first `ensure_ready`.
    pub fn new(backend: Arc<dyn HapticBackend>, events: EventBus) -> Arc<Self> {
        let capabilities = backend.capabilities();
        let tier = capability::resolve_tier(&capabilities);
        let dialect = capability::resolve_dialect(&capabilities);
        info!(
            "Haptic backend '{}': tier={}, patterns={}",
            backend.name(),
            tier,
            dialect
        );

        let (notify_tx, notifications) = mpsc::unbounded_channel();
        let (doorbell_tx, mut doorbell_rx) = mpsc::unbounded_channel();
        let (invalidate_tx, _) = broadcast::channel(16);

        let session = Arc::new(Self {
            backend,
            capabilities,
            tier,
            dialect,
            inner: Mutex::new(SessionInner {
                state: SessionState::Uninitialized,
                actuator: None,
                generation: 0,
                epoch: 0,
                notifications,
            }),
            notify_tx,
            doorbell_tx,
            invalidate_tx,
            events,
        });

        let weak = Arc::downgrade(&session);
        tokio::spawn(async move {
            while doorbell_rx.recv().await.is_some() {
                let Some(session) = weak.upgrade() else {
                    break;
                };
                let mut inner = session.inner.lock().await;
                session.apply_notifications(&mut inner);
            }
            debug!("Actuator notification pump exited");
        });

        session
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn tier(&self) -> CapabilityTier {
        self.tier
    }

    pub fn dialect(&self) -> PatternDialect {
        self.dialect
    }

    /// See [`capability::supports_custom_haptics`]
    pub fn supports_custom_haptics(&self) -> bool {
        capability::supports_custom_haptics(&self.capabilities)
    }

    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state
    }

    pub async fn epoch(&self) -> u64 {
        self.inner.lock().await.epoch
    }

    pub fn subscribe_invalidations(&self) -> broadcast::Receiver<SessionEvent> {
        self.invalidate_tx.subscribe()
    }

    /// Make sure a live, armed actuator exists
    ///
    /// An "already running" arm result counts as success. Any other arm
    /// failure tears the resource down and retries once with a fresh one;
    /// invalidating players bound to the old resource is part of that.
    ///
    /// # Errors
    ///
    /// `ActuatorUnavailable` when the device has no haptic hardware or the
    /// retry also fails.
    pub async fn ensure_ready(&self) -> Result<ActuatorHandle> {
        if !self.tier.has_hardware() {
            return Err(Error::ActuatorUnavailable(
                "device has no haptic hardware".to_string(),
            ));
        }

        let mut inner = self.inner.lock().await;
        self.apply_notifications(&mut inner);
        if matches!(
            inner.state,
            SessionState::Uninitialized | SessionState::Released
        ) {
            self.set_state(&mut inner, SessionState::Probing);
        }

        let first = match self.arm(&mut inner) {
            Ok(()) => return Ok(self.ready(&mut inner)),
            Err(e) => e,
        };

        warn!("Actuator arm failed: {}; recreating", first);
        if self.teardown(&mut inner) {
            self.invalidate_players(&mut inner);
        }

        match self.arm(&mut inner) {
            Ok(()) => {
                info!("Actuator recovered after recreate");
                Ok(self.ready(&mut inner))
            }
            Err(second) => {
                self.teardown(&mut inner);
                self.set_state(&mut inner, SessionState::Degraded);
                Err(Error::ActuatorUnavailable(second.message))
            }
        }
    }

    /// Create a native player on the actuator armed under `handle`
    ///
    /// # Errors
    ///
    /// `Playback` with the native diagnostic, or when the actuator went
    /// stale since `handle` was issued.
    pub async fn make_player(
        &self,
        handle: &ActuatorHandle,
        pattern: &Pattern,
    ) -> Result<Box<dyn NativePlayer>> {
        let mut inner = self.inner.lock().await;
        let actuator = Self::live_actuator(&mut inner, handle)?;
        actuator
            .make_player(pattern)
            .map_err(|e| Error::Playback(e.message))
    }

    /// Issue one coarse fixed-duration vibration
    pub async fn pulse(&self, handle: &ActuatorHandle, duration: Duration) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let actuator = Self::live_actuator(&mut inner, handle)?;
        actuator
            .pulse(duration)
            .map_err(|e| Error::Playback(e.message))
    }

    /// Silence a coarse pulse; no-op without an actuator
    pub async fn cancel_pulse(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        match inner.actuator.as_mut() {
            Some(actuator) => actuator
                .cancel_pulse()
                .map_err(|e| Error::PlayerControl(e.message)),
            None => Ok(()),
        }
    }

    /// Tear down the resource
    ///
    /// Idempotent and safe before the first `ensure_ready`. A later
    /// `ensure_ready` acquires a fresh resource.
    pub async fn release(&self) {
        let mut inner = self.inner.lock().await;
        if self.teardown(&mut inner) {
            self.invalidate_players(&mut inner);
            info!("Actuator released");
        }
        self.set_state(&mut inner, SessionState::Released);
    }

    /// Apply every queued notification in arrival order
    fn apply_notifications(&self, inner: &mut SessionInner) {
        loop {
            let Ok((generation, notification)) = inner.notifications.try_recv() else {
                break;
            };
            self.handle_notification(inner, generation, notification);
        }
    }

    fn handle_notification(
        &self,
        inner: &mut SessionInner,
        generation: u64,
        notification: ActuatorNotification,
    ) {
        if generation != inner.generation || inner.actuator.is_none() {
            debug!(
                "Ignoring {:?} from stale actuator generation {}",
                notification, generation
            );
            return;
        }

        match notification {
            ActuatorNotification::Reset => {
                warn!("Actuator reset by platform; re-arming");
                self.invalidate_players(inner);

                let rearmed = match inner.actuator.as_mut().map(|a| a.start()) {
                    Some(Ok(())) => true,
                    Some(Err(e)) if e.is_already_running() => true,
                    Some(Err(e)) => {
                        warn!("Re-arm after reset failed: {}", e);
                        false
                    }
                    None => false,
                };

                if rearmed {
                    self.set_state(inner, SessionState::Ready);
                } else {
                    self.teardown(inner);
                    self.set_state(inner, SessionState::Degraded);
                }
                let delivered = self.events.emit(EngineEvent::ActuatorReset {
                    rearmed,
                    timestamp: chrono::Utc::now(),
                });
                if delivered.is_err() {
                    debug!("No event subscribers for actuator reset");
                }
            }
            ActuatorNotification::Stopped { reason } => {
                info!("Actuator stopped by platform: {}", reason);
                let delivered = self.events.emit(EngineEvent::ActuatorStopped {
                    reason,
                    timestamp: chrono::Utc::now(),
                });
                if delivered.is_err() {
                    debug!("No event subscribers for actuator stop");
                }
            }
        }
    }

    /// Create the actuator if absent, then arm it
    fn arm(&self, inner: &mut SessionInner) -> NativeResult<()> {
        if inner.actuator.is_none() {
            inner.generation += 1;
            let notifier = ActuatorNotifier::new(inner.generation, self.notify_tx.clone())
                .with_doorbell(self.doorbell_tx.clone());
            let actuator = self.backend.create_actuator(notifier)?;
            inner.actuator = Some(actuator);
            info!(
                "Actuator created (generation {}, epoch {})",
                inner.generation, inner.epoch
            );
            self.events.emit_lossy(EngineEvent::ActuatorRecreated {
                epoch: inner.epoch,
                timestamp: chrono::Utc::now(),
            });
        }

        let Some(actuator) = inner.actuator.as_mut() else {
            return Err(NativeError::failed("actuator missing after creation"));
        };
        match actuator.start() {
            Ok(()) => {
                debug!("Actuator armed");
                Ok(())
            }
            Err(e) if e.is_already_running() => {
                debug!("Actuator already armed");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn ready(&self, inner: &mut SessionInner) -> ActuatorHandle {
        self.set_state(inner, SessionState::Ready);
        ActuatorHandle { epoch: inner.epoch }
    }

    /// Stop and drop the actuator; returns whether one existed
    fn teardown(&self, inner: &mut SessionInner) -> bool {
        match inner.actuator.take() {
            Some(mut actuator) => {
                if let Err(e) = actuator.stop() {
                    debug!("Actuator stop during tear-down failed: {}", e);
                }
                true
            }
            None => false,
        }
    }

    fn invalidate_players(&self, inner: &mut SessionInner) {
        inner.epoch += 1;
        debug!("Session epoch advanced to {}", inner.epoch);
        // No subscriber just means no controller is attached
        let _ = self
            .invalidate_tx
            .send(SessionEvent::Invalidated { epoch: inner.epoch });
    }

    fn live_actuator<'a>(
        inner: &'a mut SessionInner,
        handle: &ActuatorHandle,
    ) -> Result<&'a mut Box<dyn Actuator>> {
        if inner.epoch != handle.epoch {
            return Err(Error::Playback(
                "actuator was reset before the player could be created".to_string(),
            ));
        }
        inner
            .actuator
            .as_mut()
            .ok_or_else(|| Error::Playback("actuator was released".to_string()))
    }

    fn set_state(&self, inner: &mut SessionInner, state: SessionState) {
        if inner.state != state {
            debug!("Session state: {} -> {}", inner.state, state);
            inner.state = state;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendCall, SimulatedBackend};

    fn session_with(backend: &SimulatedBackend) -> Arc<ActuatorSession> {
        ActuatorSession::new(Arc::new(backend.clone()), EventBus::new(16))
    }

    async fn next_invalidation(rx: &mut broadcast::Receiver<SessionEvent>) -> SessionEvent {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("Timed out waiting for invalidation")
            .expect("Invalidation channel closed")
    }

    #[tokio::test]
    async fn test_lazy_creation_and_idempotent_arm() {
        let backend = SimulatedBackend::new();
        let session = session_with(&backend);
        assert_eq!(session.state().await, SessionState::Uninitialized);
        assert!(backend.journal().is_empty());

        let first = session.ensure_ready().await.unwrap();
        let second = session.ensure_ready().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(session.state().await, SessionState::Ready);
        assert_eq!(
            backend.journal(),
            vec![
                BackendCall::CreateActuator { generation: 1 },
                BackendCall::StartActuator,
                BackendCall::StartActuator,
            ]
        );
    }

    #[tokio::test]
    async fn test_arm_failure_recreates_once() {
        let backend = SimulatedBackend::new();
        let session = session_with(&backend);
        let handle = session.ensure_ready().await.unwrap();
        let mut rx = session.subscribe_invalidations();

        // Resource drops out, and the first re-arm attempt fails
        backend.trigger_reset();
        let SessionEvent::Invalidated { epoch } = next_invalidation(&mut rx).await;
        assert!(epoch > handle.epoch());
        // Lock is held until the pump has re-armed
        assert_eq!(session.epoch().await, epoch);

        backend.fail_next_starts(1);
        backend.clear_journal();
        let recovered = session.ensure_ready().await.unwrap();
        assert!(recovered.epoch() > epoch);
        assert_eq!(
            backend.journal(),
            vec![
                BackendCall::StartActuator,
                BackendCall::StopActuator,
                BackendCall::CreateActuator { generation: 2 },
                BackendCall::StartActuator,
            ]
        );
    }

    #[tokio::test]
    async fn test_second_failure_is_unavailable() {
        let backend = SimulatedBackend::new();
        backend.fail_next_starts(2);
        let session = session_with(&backend);

        let err = session.ensure_ready().await.unwrap_err();
        assert_eq!(err.code(), "ACTUATOR_UNAVAILABLE");
        assert_eq!(session.state().await, SessionState::Degraded);

        // Next call self-heals
        session.ensure_ready().await.unwrap();
        assert_eq!(session.state().await, SessionState::Ready);
    }

    #[tokio::test]
    async fn test_no_hardware_never_touches_backend() {
        let backend = SimulatedBackend::with_tier(CapabilityTier::None);
        let session = session_with(&backend);
        assert!(!session.supports_custom_haptics());
        assert!(matches!(
            session.ensure_ready().await,
            Err(Error::ActuatorUnavailable(_))
        ));
        assert!(backend.journal().is_empty());
    }

    #[tokio::test]
    async fn test_reset_rearms_and_invalidates() {
        let backend = SimulatedBackend::new();
        let session = session_with(&backend);
        let handle = session.ensure_ready().await.unwrap();
        let mut rx = session.subscribe_invalidations();

        backend.trigger_reset();
        next_invalidation(&mut rx).await;

        let epoch = session.epoch().await;
        assert!(epoch > handle.epoch());
        assert!(backend.is_running());
        assert_eq!(session.state().await, SessionState::Ready);

        // Old handle is stale for player creation
        let pattern = Pattern::empty();
        assert!(matches!(
            session.make_player(&handle, &pattern).await,
            Err(Error::Playback(_))
        ));
    }

    #[tokio::test]
    async fn test_queued_reset_applies_before_arming() {
        let backend = SimulatedBackend::new();
        let session = session_with(&backend);
        let before = session.ensure_ready().await.unwrap();

        backend.trigger_reset();
        let after = session.ensure_ready().await.unwrap();
        assert!(after.epoch() > before.epoch());
        assert!(backend.is_running());

        // Nothing is left for the pump to apply
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(session.epoch().await, after.epoch());
        assert_eq!(session.state().await, SessionState::Ready);
    }

    #[tokio::test]
    async fn test_release_is_idempotent_and_recoverable() {
        let backend = SimulatedBackend::new();
        let session = session_with(&backend);

        // Safe before anything was acquired
        session.release().await;
        assert_eq!(session.state().await, SessionState::Released);

        session.ensure_ready().await.unwrap();
        session.release().await;
        session.release().await;
        assert!(!backend.is_running());

        session.ensure_ready().await.unwrap();
        assert!(backend.is_running());
        assert_eq!(session.state().await, SessionState::Ready);
    }
}
