//! Native haptics layer
//!
//! Traits a platform backend implements so the engine can drive a device
//! actuator. The engine never talks to hardware directly; every native call
//! goes through these seams.
//!
//! **Callback contract:** completion handlers and notifier calls may be
//! invoked from any thread. Implementations must not hold locks that the
//! engine could be waiting on while invoking them; the engine side only
//! posts to unbounded channels.

pub mod simulated;

pub use simulated::{BackendCall, SimulatedBackend};

use crate::pattern::Pattern;
use std::time::Duration;
use tokio::sync::mpsc;

/// Class of a native failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeErrorKind {
    /// Resource was already armed; callers treat this as success
    AlreadyRunning,
    /// Any other failure
    Failed,
}

/// Failure reported by the native layer
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct NativeError {
    pub kind: NativeErrorKind,
    pub message: String,
}

impl NativeError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            kind: NativeErrorKind::Failed,
            message: message.into(),
        }
    }

    pub fn already_running(message: impl Into<String>) -> Self {
        Self {
            kind: NativeErrorKind::AlreadyRunning,
            message: message.into(),
        }
    }

    pub fn is_already_running(&self) -> bool {
        self.kind == NativeErrorKind::AlreadyRunning
    }
}

/// Result type for native calls
pub type NativeResult<T> = std::result::Result<T, NativeError>;

/// Haptic capabilities reported by a backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Device has a vibration actuator at all
    pub hardware_haptics: bool,
    /// Amplitude control; `None` when the platform does not distinguish it
    pub amplitude_control: Option<bool>,
    /// Discrete predefined effects are available
    pub predefined_effects: bool,
    /// Platform parses external pattern documents natively
    pub native_pattern_parsing: bool,
}

/// Asynchronous notification about the actuator resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActuatorNotification {
    /// Resource was reset by the platform and must be re-armed
    Reset,
    /// Resource stopped for a platform-reported reason
    Stopped { reason: String },
}

/// Non-blocking handle a backend uses to post actuator notifications
///
/// Each actuator receives a notifier stamped with the generation that
/// created it, so notifications from a torn-down actuator can be ignored.
/// After queueing a notification the notifier rings the doorbell, if one is
/// attached, so the owning session knows to drain its queue.
#[derive(Debug, Clone)]
pub struct ActuatorNotifier {
    generation: u64,
    tx: mpsc::UnboundedSender<(u64, ActuatorNotification)>,
    doorbell: Option<mpsc::UnboundedSender<()>>,
}

impl ActuatorNotifier {
    pub(crate) fn new(generation: u64, tx: mpsc::UnboundedSender<(u64, ActuatorNotification)>) -> Self {
        Self {
            generation,
            tx,
            doorbell: None,
        }
    }

    pub(crate) fn with_doorbell(mut self, doorbell: mpsc::UnboundedSender<()>) -> Self {
        self.doorbell = Some(doorbell);
        self
    }

    /// Generation of the actuator this notifier belongs to
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Report that the platform reset the resource
    pub fn reset(&self) {
        self.post(ActuatorNotification::Reset);
    }

    /// Report that the platform stopped the resource
    pub fn stopped(&self, reason: impl Into<String>) {
        self.post(ActuatorNotification::Stopped {
            reason: reason.into(),
        });
    }

    fn post(&self, notification: ActuatorNotification) {
        // Receiver gone means the session was dropped; nothing left to notify
        if self.tx.send((self.generation, notification)).is_err() {
            return;
        }
        if let Some(doorbell) = &self.doorbell {
            let _ = doorbell.send(());
        }
    }
}

/// Called once when a player finishes, with the native error if any
pub type CompletionHandler = Box<dyn FnOnce(Option<NativeError>) + Send>;

/// Native player bound to one compiled pattern
pub trait NativePlayer: Send {
    fn set_looping(&mut self, looping: bool);

    fn set_completion_handler(&mut self, handler: CompletionHandler);

    fn start(&mut self, at: Duration) -> NativeResult<()>;

    fn pause(&mut self, at: Duration) -> NativeResult<()>;

    fn resume(&mut self, at: Duration) -> NativeResult<()>;

    fn seek(&mut self, offset: Duration) -> NativeResult<()>;

    fn stop(&mut self, at: Duration) -> NativeResult<()>;

    /// Silence immediately
    fn cancel(&mut self) -> NativeResult<()>;
}

/// Native vibration resource
pub trait Actuator: Send {
    /// Arm the resource
    ///
    /// Returns an `AlreadyRunning` error when it is armed already.
    fn start(&mut self) -> NativeResult<()>;

    fn stop(&mut self) -> NativeResult<()>;

    /// Create a player bound to `pattern`
    fn make_player(&mut self, pattern: &Pattern) -> NativeResult<Box<dyn NativePlayer>>;

    /// Single fixed-duration on/off vibration
    fn pulse(&mut self, duration: Duration) -> NativeResult<()>;

    fn cancel_pulse(&mut self) -> NativeResult<()>;
}

/// Platform entry point
pub trait HapticBackend: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    fn capabilities(&self) -> Capabilities;

    /// Create a fresh (unarmed) actuator
    fn create_actuator(&self, notifier: ActuatorNotifier) -> NativeResult<Box<dyn Actuator>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_error_kinds() {
        let err = NativeError::already_running("engine already started");
        assert!(err.is_already_running());
        assert_eq!(err.to_string(), "engine already started");
        assert!(!NativeError::failed("boom").is_already_running());
    }

    #[test]
    fn test_notifier_tags_generation() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let notifier = ActuatorNotifier::new(3, tx);
        notifier.reset();
        notifier.stopped("idle");

        assert_eq!(rx.try_recv().unwrap(), (3, ActuatorNotification::Reset));
        assert_eq!(
            rx.try_recv().unwrap(),
            (
                3,
                ActuatorNotification::Stopped {
                    reason: "idle".to_string()
                }
            )
        );
    }

    #[test]
    fn test_notifier_rings_doorbell_after_queueing() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (bell_tx, mut bell_rx) = mpsc::unbounded_channel();
        let notifier = ActuatorNotifier::new(2, tx).with_doorbell(bell_tx);

        assert!(bell_rx.try_recv().is_err());
        notifier.reset();
        assert_eq!(bell_rx.try_recv(), Ok(()));
        assert_eq!(rx.try_recv().unwrap(), (2, ActuatorNotification::Reset));
    }

    #[test]
    fn test_notifier_survives_dropped_receiver() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        ActuatorNotifier::new(1, tx).reset();
    }
}
