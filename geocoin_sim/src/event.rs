// Player-visible narrative events emitted by the session.
//
// Every `Session` operation returns a `StepResult` listing what happened, in
// order. Front ends render these as status lines; tests assert on them.
// Events carry plain values only (cells, token ids, positions), never
// references into session state.
//
// Empty-source transfers (`NothingToDeposit`, `NothingToWithdraw`,
// `NoSuchCache`) are ordinary events, not errors. `SaveFailed` reports a
// write-through save that the store rejected; the in-memory state is still
// updated.
//
// See also: `session.rs` for where each event is produced, `command.rs` for
// the `PlayerAction` inputs.

use crate::types::{Cell, Direction, LatLng, TokenId};
use serde::{Deserialize, Serialize};

/// Types of narrative events visible to the player.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SessionEvent {
    /// The player now stands at `position`, inside `cell`.
    PlayerMoved { position: LatLng, cell: Cell },
    /// A step would leave the addressable grid; the player did not move.
    MoveBlocked { direction: Direction },
    /// A cache was populated for the first time.
    CacheDiscovered { cell: Cell, coins: usize },
    TokenDeposited { token: TokenId, cell: Cell },
    TokenWithdrawn { token: TokenId, cell: Cell },
    NothingToDeposit,
    NothingToWithdraw { cell: Cell },
    /// The named cell has no populated cache.
    NoSuchCache { cell: Cell },
    /// The player declined the reset confirmation.
    ResetDeclined,
    /// All state was cleared and the player returned to `origin`.
    WorldReset { origin: LatLng },
    /// A geolocation fix matched the last one seen.
    GeolocationIgnored { position: LatLng },
    GeolocationFailed { code: u16, message: String },
    TrackingStarted,
    TrackingStopped,
    /// The write-through save after this operation failed.
    SaveFailed { reason: String },
}

impl SessionEvent {
    /// Did this event change the game state?
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::PlayerMoved { .. }
                | Self::CacheDiscovered { .. }
                | Self::TokenDeposited { .. }
                | Self::TokenWithdrawn { .. }
                | Self::WorldReset { .. }
        )
    }
}

/// The result of one session operation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StepResult {
    /// Narrative events emitted during this operation, for the UI.
    pub events: Vec<SessionEvent>,
}

impl StepResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: SessionEvent) {
        self.events.push(event);
    }

    /// True if any event satisfies `pred`.
    pub fn any(&self, pred: impl Fn(&SessionEvent) -> bool) -> bool {
        self.events.iter().any(pred)
    }

    /// True if the operation changed the game state.
    pub fn mutated(&self) -> bool {
        self.any(SessionEvent::is_mutation)
    }
}
