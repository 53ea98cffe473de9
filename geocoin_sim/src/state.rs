// The game state aggregate.
//
// `GameState` owns every mutable collection of a session: the canonical-cell
// table, the cache contents, the inventory, and the player (position plus
// travel trail). It is an explicit value passed to every operation rather
// than module-level singletons, so several independent sessions can coexist
// (tests routinely build two and compare them).
//
// `GameState` knows nothing about storage or rendering; `session.rs` wraps
// it with the write-through save policy and the boundary calls.
//
// ## Snapshot / restore
//
// `snapshot()` captures the state as a `GameSnapshot` of plain values.
// `restore()` rebuilds live collections from one, so later `ensure_cache`
// calls see restored caches as already populated. A snapshot assembled from
// partially corrupted fields may put a coin in two places; `restore` keeps
// the first occurrence (caches in cell order, then the inventory) and drops
// the rest, and populating a lost cache later skips coins the player holds.
// A coin is therefore never in two places after a restore.
//
// The player's cell is computed once per position change and kept next to
// the position. Every way of changing the position (`move_player`,
// `relocate`, `restore`) maps the new position first and refuses positions
// the grid cannot address, so the stored cell is always valid.

use crate::cache::{self, CacheWorld};
use crate::config::GameConfig;
use crate::error::{ConfigError, WorldError};
use crate::grid::{CellTable, Grid};
use crate::inventory::{self, Inventory, TransferOutcome};
use crate::memento::{CacheContents, GameSnapshot, HeldCoins, KnownCells, PlayerRecord};
use crate::types::{Cell, Direction, LatLng, TokenId};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::{debug, warn};

/// The player's position and where they have been.
#[derive(Clone, Debug, PartialEq)]
pub struct Player {
    pub position: LatLng,
    /// The cell containing `position`.
    pub cell: Cell,
    /// Every position visited, in order, starting with the start point.
    pub trail: Vec<LatLng>,
}

impl Player {
    fn at(position: LatLng, cell: Cell) -> Self {
        Self {
            position,
            cell,
            trail: vec![position],
        }
    }

    fn go_to(&mut self, position: LatLng, cell: Cell) {
        self.position = position;
        self.cell = cell;
        self.trail.push(position);
    }
}

/// The origin is cell (0, 0) by construction.
const ORIGIN_CELL: Cell = Cell::new(0, 0);

/// What a neighborhood rebuild found.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NeighborhoodUpdate {
    /// Cells around the player that hold a cache, in (i, j) order.
    pub caches: Vec<Cell>,
    /// Caches populated for the first time by this rebuild.
    pub discovered: Vec<Cell>,
}

/// All mutable state of one game session.
#[derive(Clone, Debug)]
pub struct GameState {
    pub config: GameConfig,
    pub grid: Grid,
    pub cells: CellTable,
    pub caches: CacheWorld,
    pub inventory: Inventory,
    pub player: Player,
}

impl GameState {
    /// Fresh state at the configured origin. Nothing is populated until the
    /// first `regenerate`.
    pub fn new(config: GameConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            grid: Grid::new(config.origin, config.tile_size),
            cells: CellTable::new(),
            caches: CacheWorld::new(config.initial_token_scale),
            inventory: Inventory::new(),
            player: Player::at(config.origin, ORIGIN_CELL),
            config,
        })
    }

    /// The cell the player stands in.
    pub fn player_cell(&self) -> Cell {
        self.player.cell
    }

    /// Rebuild the neighborhood around the player: every cell in the square
    /// is canonicalized, and every cache in it is populated if it has not
    /// been already.
    pub fn regenerate(&mut self) -> Result<NeighborhoodUpdate, WorldError> {
        let center = self.player_cell();
        let radius = self.config.neighborhood_radius;
        let probability = self.config.spawn_probability;
        let mut update = NeighborhoodUpdate::default();
        for cell in cache::neighborhood(center, radius)? {
            let cell = *self.cells.intern(cell);
            if !cache::decide_spawn(cell.i, cell.j, probability) {
                continue;
            }
            if !self.caches.is_populated(cell) {
                update.discovered.push(cell);
            }
            self.ensure_cache(cell);
            update.caches.push(cell);
        }
        debug!(
            %center,
            caches = update.caches.len(),
            discovered = update.discovered.len(),
            "neighborhood rebuilt"
        );
        Ok(update)
    }

    /// Populate the cache at `cell` if needed and return its coins.
    pub fn ensure_cache(&mut self, cell: Cell) -> &VecDeque<TokenId> {
        let held = &self.inventory;
        self.caches
            .ensure_cache_excluding(cell, |token| held.contains(*token))
    }

    /// Step one tile in `direction`, extending the trail. A step off the
    /// addressable grid leaves the player where they are.
    pub fn move_player(&mut self, direction: Direction) -> Result<LatLng, WorldError> {
        let (di, dj) = direction.offset();
        let tile = self.config.tile_size;
        let next = LatLng::new(
            self.player.position.lat + di as f64 * tile,
            self.player.position.lng + dj as f64 * tile,
        );
        let cell = self.grid.coordinate_to_cell(next)?;
        self.player.go_to(next, cell);
        Ok(next)
    }

    /// Jump to an arbitrary position (a geolocation fix), extending the
    /// trail. Returns the new cell.
    pub fn relocate(&mut self, position: LatLng) -> Result<Cell, WorldError> {
        let cell = self.grid.coordinate_to_cell(position)?;
        self.player.go_to(position, cell);
        Ok(cell)
    }

    pub fn deposit(&mut self, cell: Cell) -> TransferOutcome {
        inventory::deposit(&mut self.inventory, &mut self.caches, cell)
    }

    pub fn withdraw(&mut self, cell: Cell) -> TransferOutcome {
        inventory::withdraw(&mut self.inventory, &mut self.caches, cell)
    }

    /// Forget everything and return to the origin. The next `regenerate`
    /// re-derives an identical world.
    pub fn reset(&mut self) {
        self.cells.clear();
        self.caches.clear();
        self.inventory.clear();
        self.player = Player::at(self.config.origin, ORIGIN_CELL);
    }

    /// Coins in the inventory plus every cache.
    pub fn total_tokens(&self) -> usize {
        self.inventory.len() + self.caches.total_tokens()
    }

    /// Capture the mutable state as plain values.
    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            cells: KnownCells(self.cells.iter().copied().collect()),
            caches: CacheContents(
                self.caches
                    .contents_map()
                    .iter()
                    .map(|(cell, coins)| (*cell, coins.iter().copied().collect()))
                    .collect(),
            ),
            inventory: HeldCoins(self.inventory.iter().copied().collect()),
            player: PlayerRecord {
                position: Some(self.player.position),
                trail: self.player.trail.clone(),
            },
        }
    }

    /// Replace the mutable state with the contents of `snapshot`.
    pub fn restore(&mut self, snapshot: GameSnapshot) {
        let mut seen: BTreeSet<TokenId> = BTreeSet::new();
        let mut dropped = 0usize;

        let mut contents: BTreeMap<Cell, VecDeque<TokenId>> = BTreeMap::new();
        for (cell, coins) in snapshot.caches.0 {
            let kept = coins
                .into_iter()
                .filter(|coin| {
                    let fresh = seen.insert(*coin);
                    dropped += usize::from(!fresh);
                    fresh
                })
                .collect();
            contents.insert(cell, kept);
        }
        let inventory: Inventory = snapshot
            .inventory
            .0
            .into_iter()
            .filter(|coin| {
                let fresh = seen.insert(*coin);
                dropped += usize::from(!fresh);
                fresh
            })
            .collect();
        if dropped > 0 {
            warn!(dropped, "restored snapshot held coins in more than one place");
        }

        let cells: CellTable = snapshot
            .cells
            .0
            .into_iter()
            .chain(contents.keys().copied())
            .collect();

        let PlayerRecord { position, mut trail } = snapshot.player;
        let saved = position.or_else(|| trail.last().copied());
        let located = [position, trail.last().copied()]
            .into_iter()
            .flatten()
            .find_map(|p| self.grid.coordinate_to_cell(p).ok().map(|cell| (p, cell)));
        let (position, cell) = match located {
            Some(found) => found,
            None => {
                if let Some(p) = saved {
                    warn!(position = %p, "saved position is off the grid; starting at the origin");
                }
                (self.config.origin, ORIGIN_CELL)
            }
        };
        // The trail always ends where the player stands.
        if trail.last() != Some(&position) {
            trail.push(position);
        }

        self.cells = cells;
        self.caches = CacheWorld::from_contents(self.config.initial_token_scale, contents);
        self.inventory = inventory;
        self.player = Player {
            position,
            cell,
            trail,
        };
    }
}
