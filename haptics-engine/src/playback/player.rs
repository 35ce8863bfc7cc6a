//! Active player slot contents

use crate::backend::NativePlayer;
use haptics_common::events::PlayerState;
use serde::Serialize;
use uuid::Uuid;

/// What the slot is driving
pub(super) enum PlayerKind {
    /// Native pattern player with full transport control
    Pattern(Box<dyn NativePlayer>),
    /// Coarse fixed-duration pulse; only stop/cancel apply
    Pulse,
}

/// The single live playback handle
pub(super) struct ActivePlayer {
    pub(super) id: Uuid,
    /// Session epoch the player was created under
    pub(super) epoch: u64,
    pub(super) state: PlayerState,
    pub(super) kind: PlayerKind,
    pub(super) event_count: usize,
}

impl ActivePlayer {
    pub(super) fn info(&self) -> PlayerInfo {
        PlayerInfo {
            id: self.id,
            state: self.state,
            epoch: self.epoch,
            event_count: self.event_count,
            coarse: matches!(self.kind, PlayerKind::Pulse),
        }
    }
}

/// Snapshot of the active player
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerInfo {
    pub id: Uuid,
    pub state: PlayerState,
    pub epoch: u64,
    pub event_count: usize,
    /// True for a coarse pulse rather than a pattern player
    pub coarse: bool,
}

/// Posted by completion callbacks and pulse timers
#[derive(Debug, Clone)]
pub(super) enum PlayerSignal {
    Completed {
        player_id: Uuid,
        error: Option<String>,
    },
}
