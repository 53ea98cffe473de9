// geocoin_sim: the Geocoin Carrier game core.
//
// This crate contains all game logic: grid addressing, the deterministic
// cache world, the coin inventory and transfer protocol, the memento
// (save/load) subsystem, and the session controller that ties them to the
// outside world. It has no rendering, map-library or platform dependencies
// and can be tested, benchmarked, and run headless.
//
// Module overview:
// - `session.rs`:   Session controller: movement, regeneration, reset, tracking, write-through saves.
// - `state.rs`:     GameState aggregate + snapshot / restore.
// - `grid.rs`:      Lat/lng <-> cell transform and the canonical-cell table.
// - `cache.rs`:     Spawn decisions, neighborhoods, and per-cache coin contents.
// - `inventory.rs`: Player inventory + deposit / withdraw.
// - `memento.rs`:   Versioned per-field persistence of a GameSnapshot.
// - `store.rs`:     Durable key-value store boundary (MemoryStore, DirStore).
// - `boundary.rs`:  Renderer, geolocation and confirmation traits.
// - `command.rs`:   PlayerAction: every player input.
// - `event.rs`:     SessionEvent / StepResult: what each operation did.
// - `config.rs`:    GameConfig: all tunable parameters.
// - `error.rs`:     Error enums.
// - `types.rs`:     LatLng, Cell, TokenId, Direction.
// - `testing.rs`:   Test doubles for every boundary (unit tests, or the `testing` feature).
// - `prng`:         Re-exported from `geocoin_prng`: the keyed luck function.
//
// **Critical constraint: determinism.** Whether a cell holds a cache and how
// many coins it starts with are pure functions of (i, j) and the config. No
// `HashMap`, no system time, no OS entropy anywhere in world generation. Use
// `BTreeMap` for ordered collections.

pub mod boundary;
pub mod cache;
pub mod command;
pub mod config;
pub mod error;
pub mod event;
pub mod grid;
pub mod inventory;
pub mod memento;
pub use geocoin_prng as prng;
pub mod session;
pub mod state;
pub mod store;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod types;
