// Player actions that mutate session state.
//
// Every input a front end can send is a `PlayerAction`. `Session::apply()`
// dispatches each variant to the matching session operation, so a front end
// (or a replay script) only needs to build actions. Actions are plain serde
// values; a recorded `Vec<PlayerAction>` replayed against a fresh session
// with the same config reproduces the same state.
//
// `Reset` carries no answer of its own: the session still asks the
// confirmation boundary passed to `apply()`.
//
// See also: `session.rs` for `apply()`, `event.rs` for what each action
// reports.

use crate::types::{Cell, Direction, LatLng};
use serde::{Deserialize, Serialize};

/// The specific action a player performs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PlayerAction {
    /// Step one tile.
    Move { direction: Direction },
    /// Deposit the oldest held coin into the cache at `cache`.
    Deposit { cache: Cell },
    /// Withdraw the oldest coin from the cache at `cache`.
    Withdraw { cache: Cell },
    /// Clear all state, after confirmation.
    Reset,
    /// A position fix from the geolocation boundary.
    GeolocationFix { position: LatLng },
}
