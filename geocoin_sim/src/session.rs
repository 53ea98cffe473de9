// The session controller.
//
// `Session` wraps a `GameState` with everything that touches the outside
// world: the durable store, the rendering service, and the geolocation
// subscription. Each public operation runs to completion and returns a
// `StepResult` narrating what happened.
//
// ## Operation shape
//
// Every mutating operation follows the same sequence:
//
//   1. mutate `GameState` (move, transfer, reset, geolocation fix)
//   2. rebuild the neighborhood, if the player may have changed cells
//   3. sync the renderer (regions, marker, view, trail)
//   4. write-through save of the full snapshot
//
// A failed save does not roll back the in-memory mutation; it is logged and
// reported as `SessionEvent::SaveFailed`. The next successful save catches
// the store up, since every save writes the full snapshot.
//
// ## Rendering sync
//
// `regions` maps each drawn cache to its renderer handle. A rebuild removes
// every drawn region and redraws the caches of the current neighborhood.
// This visual churn never touches cache contents.
//
// ## Geolocation
//
// `start_tracking` subscribes with the configured options; the front end
// forwards deliveries to `handle_geolocation`. A fix equal to the last one
// seen (or to the current position) is ignored. Errors are reported and
// leave state untouched; the core never retries on its own. A fix that is
// not a finite latitude/longitude on the globe is reported the same way, as
// `GeolocationFailed` with `POSITION_UNAVAILABLE`, and is not remembered as
// the last fix.
//
// See also: `state.rs` for the state aggregate, `memento.rs` for the save
// format, `boundary.rs` for the collaborator traits, `command.rs` for the
// `PlayerAction` dispatcher input.

use crate::boundary::{
    Confirm, GeolocationError, GeolocationProvider, GeolocationUpdate, PopupContent,
    RegionHandle, RenderService, WatchId,
};
use crate::command::PlayerAction;
use crate::config::GameConfig;
use crate::error::{ConfigError, SaveError};
use crate::event::{SessionEvent, StepResult};
use crate::inventory::TransferOutcome;
use crate::memento::{self, StoreKeys};
use crate::state::GameState;
use crate::store::KeyValueStore;
use crate::types::{Cell, Direction, LatLng};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Prompt shown by `reset`.
pub const RESET_PROMPT: &str = "Reset the game? All coins and progress will be lost.";

/// A running game: state plus its store, renderer and tracking status.
pub struct Session<S: KeyValueStore, R: RenderService> {
    state: GameState,
    store: S,
    keys: StoreKeys,
    renderer: R,
    regions: BTreeMap<Cell, RegionHandle>,
    last_fix: Option<LatLng>,
    watch: Option<WatchId>,
}

impl<S: KeyValueStore, R: RenderService> Session<S, R> {
    /// Start a session: load whatever `store` holds, restore it, and build
    /// the neighborhood around the player.
    pub fn open(config: GameConfig, store: S, renderer: R) -> Result<Self, ConfigError> {
        let mut state = GameState::new(config)?;
        let keys = StoreKeys::new(state.config.storage_prefix.clone());
        state.restore(memento::load(&store, &keys));
        info!(
            position = %state.player.position,
            cells = state.cells.len(),
            caches = state.caches.len(),
            held = state.inventory.len(),
            "session opened"
        );

        let mut session = Self {
            state,
            store,
            keys,
            renderer,
            regions: BTreeMap::new(),
            last_fix: None,
            watch: None,
        };
        for point in &session.state.player.trail {
            session.renderer.append_trail_point(*point);
        }
        let mut result = StepResult::new();
        session.rebuild(&mut result);
        session.persist(&mut result);
        Ok(session)
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn config(&self) -> &GameConfig {
        &self.state.config
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Consume the session, returning its store.
    pub fn into_store(self) -> S {
        self.store
    }

    /// Drawn cache regions, by cell.
    pub fn regions(&self) -> &BTreeMap<Cell, RegionHandle> {
        &self.regions
    }

    pub fn player_position(&self) -> LatLng {
        self.state.player.position
    }

    pub fn player_cell(&self) -> Cell {
        self.state.player_cell()
    }

    pub fn is_tracking(&self) -> bool {
        self.watch.is_some()
    }

    /// Step one tile in `direction`.
    pub fn move_player(&mut self, direction: Direction) -> StepResult {
        let mut result = StepResult::new();
        match self.state.move_player(direction) {
            Ok(position) => self.arrive(position, &mut result),
            Err(e) => {
                warn!(?direction, error = %e, "move blocked");
                result.push(SessionEvent::MoveBlocked { direction });
            }
        }
        result
    }

    /// Rebuild the neighborhood around the player and redraw it.
    pub fn regenerate_neighborhood(&mut self) -> StepResult {
        let mut result = StepResult::new();
        self.rebuild(&mut result);
        self.persist(&mut result);
        result
    }

    /// Deposit the oldest held coin into the cache at `cell`.
    pub fn deposit(&mut self, cell: Cell) -> StepResult {
        let outcome = self.state.deposit(cell);
        self.transfer_result(cell, outcome)
    }

    /// Withdraw the oldest coin of the cache at `cell`.
    pub fn withdraw(&mut self, cell: Cell) -> StepResult {
        let outcome = self.state.withdraw(cell);
        self.transfer_result(cell, outcome)
    }

    /// After confirmation, clear everything and start over at the origin.
    pub fn reset(&mut self, confirm: &mut impl Confirm) -> StepResult {
        let mut result = StepResult::new();
        if !confirm.confirm(RESET_PROMPT) {
            result.push(SessionEvent::ResetDeclined);
            return result;
        }

        self.state.reset();
        self.last_fix = None;
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "store clear failed during reset");
            result.push(SessionEvent::SaveFailed {
                reason: e.to_string(),
            });
        }
        let origin = self.state.player.position;
        self.renderer.clear_trail();
        self.renderer.append_trail_point(origin);
        info!(%origin, "world reset");
        result.push(SessionEvent::WorldReset { origin });

        self.rebuild(&mut result);
        self.persist(&mut result);
        result
    }

    /// Subscribe to position updates. No-op if already tracking.
    pub fn start_tracking(&mut self, provider: &mut impl GeolocationProvider) -> StepResult {
        let mut result = StepResult::new();
        if self.watch.is_none() {
            let id = provider.watch(&self.state.config.geolocation);
            info!(watch = id.0, "geolocation tracking started");
            self.watch = Some(id);
            result.push(SessionEvent::TrackingStarted);
        }
        result
    }

    /// Unsubscribe from position updates. No-op if not tracking.
    pub fn stop_tracking(&mut self, provider: &mut impl GeolocationProvider) -> StepResult {
        let mut result = StepResult::new();
        if let Some(id) = self.watch.take() {
            provider.clear_watch(id);
            info!(watch = id.0, "geolocation tracking stopped");
            result.push(SessionEvent::TrackingStopped);
        }
        result
    }

    /// Apply one delivery from the geolocation subscription.
    pub fn handle_geolocation(&mut self, update: GeolocationUpdate) -> StepResult {
        let mut result = StepResult::new();
        match update {
            GeolocationUpdate::Position(position) if !position.is_geographic() => {
                warn!(%position, "ignoring geolocation fix off the globe");
                result.push(unavailable(format!("position {position} is off the globe")));
            }
            GeolocationUpdate::Position(position) => {
                let unchanged =
                    self.last_fix == Some(position) || self.state.player.position == position;
                if unchanged {
                    self.last_fix = Some(position);
                    debug!(%position, "geolocation fix unchanged");
                    result.push(SessionEvent::GeolocationIgnored { position });
                    return result;
                }
                match self.state.relocate(position) {
                    Ok(_) => {
                        self.last_fix = Some(position);
                        self.arrive(position, &mut result);
                    }
                    Err(e) => {
                        warn!(%position, error = %e, "ignoring geolocation fix off the grid");
                        result.push(unavailable(e.to_string()));
                    }
                }
            }
            GeolocationUpdate::Error(e) => {
                warn!(code = e.code, message = %e.message, "geolocation failed");
                result.push(SessionEvent::GeolocationFailed {
                    code: e.code,
                    message: e.message,
                });
            }
        }
        result
    }

    /// What the popup for the cache at `cell` shows, or `None` if no cache
    /// has been populated there.
    pub fn popup(&self, cell: Cell) -> Option<PopupContent> {
        let coins = self.state.caches.contents(cell)?;
        Some(PopupContent {
            cell,
            coins: coins.iter().copied().collect(),
            can_deposit: !self.state.inventory.is_empty(),
            can_withdraw: !coins.is_empty(),
        })
    }

    /// Dispatch a `PlayerAction` to the matching operation.
    pub fn apply(&mut self, action: &PlayerAction, confirm: &mut impl Confirm) -> StepResult {
        match action {
            PlayerAction::Move { direction } => self.move_player(*direction),
            PlayerAction::Deposit { cache } => self.deposit(*cache),
            PlayerAction::Withdraw { cache } => self.withdraw(*cache),
            PlayerAction::Reset => self.reset(confirm),
            PlayerAction::GeolocationFix { position } => {
                self.handle_geolocation(GeolocationUpdate::Position(*position))
            }
        }
    }

    /// Write the full snapshot to the store.
    pub fn save(&mut self) -> Result<(), SaveError> {
        memento::save(&mut self.store, &self.keys, &self.state.snapshot())
    }

    /// Shared tail of every position change.
    fn arrive(&mut self, position: LatLng, result: &mut StepResult) {
        let cell = self.state.player_cell();
        self.renderer.append_trail_point(position);
        result.push(SessionEvent::PlayerMoved { position, cell });
        self.rebuild(result);
        self.persist(result);
    }

    fn transfer_result(&mut self, cell: Cell, outcome: TransferOutcome) -> StepResult {
        let mut result = StepResult::new();
        result.push(match outcome {
            TransferOutcome::Deposited(token) => SessionEvent::TokenDeposited { token, cell },
            TransferOutcome::Withdrawn(token) => SessionEvent::TokenWithdrawn { token, cell },
            TransferOutcome::NothingToDeposit => SessionEvent::NothingToDeposit,
            TransferOutcome::NothingToWithdraw => SessionEvent::NothingToWithdraw { cell },
            TransferOutcome::NoSuchCache => SessionEvent::NoSuchCache { cell },
        });
        self.persist(&mut result);
        result
    }

    /// Rebuild the neighborhood and redraw it.
    fn rebuild(&mut self, result: &mut StepResult) {
        let update = match self.state.regenerate() {
            Ok(update) => update,
            Err(e) => {
                warn!(error = %e, "neighborhood rebuild rejected");
                return;
            }
        };
        for cell in &update.discovered {
            let coins = self.state.caches.contents(*cell).map_or(0, |c| c.len());
            result.push(SessionEvent::CacheDiscovered { cell: *cell, coins });
        }

        for (_, handle) in std::mem::take(&mut self.regions) {
            self.renderer.remove_cache_region(handle);
        }
        for cell in update.caches {
            let bounds = self.state.grid.cell_to_bounds(cell);
            let handle = self.renderer.draw_cache_region(bounds, cell);
            self.regions.insert(cell, handle);
        }

        let position = self.state.player.position;
        self.renderer.set_player_marker_position(position);
        self.renderer
            .set_map_view(position, self.state.config.map_zoom);
    }

    fn persist(&mut self, result: &mut StepResult) {
        if let Err(e) = self.save() {
            warn!(error = %e, "write-through save failed");
            result.push(SessionEvent::SaveFailed {
                reason: e.to_string(),
            });
        }
    }
}

/// A rejected fix, reported like a device that could not locate itself.
fn unavailable(message: String) -> SessionEvent {
    SessionEvent::GeolocationFailed {
        code: GeolocationError::POSITION_UNAVAILABLE,
        message,
    }
}
