// Cache world model.
//
// Whether a cell holds a cache, and how many coins it starts with, are pure
// functions of (i, j) through the luck function:
//
//   spawn:         luck("{i},{j}") < probability
//   initial count: floor(luck("{i},{j},initialValue") * scale)
//
// Coins are minted with sequential serials `0..count`. Nothing about which
// cells have caches is stored; it is re-derived whenever a neighborhood is
// rebuilt.
//
// What *is* stored is `CacheWorld::contents`: the current coins of every
// cache populated so far, keyed by cell. `ensure_cache` populates a cache
// only the first time its key is absent, so rebuilding a neighborhood (or
// restoring a save) never re-rolls or duplicates coins. Emptied caches keep
// their (empty) entry for the same reason.
//
// See also: `inventory.rs` for the transfer protocol that mutates contents,
// `memento.rs` for persistence, `session.rs` which regenerates the
// neighborhood around the player.

use crate::error::WorldError;
use crate::types::{Cell, TokenId};
use geocoin_prng::{GameRng, luck};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// Largest accepted neighborhood radius.
pub const MAX_NEIGHBORHOOD_RADIUS: i32 = 1024;

/// Largest accepted initial coin scale.
pub const MAX_TOKEN_SCALE: u32 = 10_000;

/// Does cell (i, j) hold a cache? `probability <= 0` never spawns,
/// `probability >= 1` always does.
pub fn decide_spawn(i: i32, j: i32, probability: f64) -> bool {
    GameRng::from_key(&Cell::new(i, j).luck_key()).chance(probability)
}

/// Number of coins a freshly populated cache at `cell` starts with.
pub fn initial_token_count(cell: Cell, scale: u32) -> u32 {
    (luck(&cell.initial_value_key()) * scale as f64).floor() as u32
}

/// Mint the coin with the given serial at (i, j).
pub fn mint_token(i: i32, j: i32, serial: u32) -> TokenId {
    TokenId::new(Cell::new(i, j), serial)
}

/// All cells with `|i - center.i| <= radius` and `|j - center.j| <= radius`,
/// in (i, j) order. The square is closed on every edge.
///
/// `radius` must lie in `0..=MAX_NEIGHBORHOOD_RADIUS`, and the square must
/// fit in `i32` coordinates.
pub fn neighborhood(center: Cell, radius: i32) -> Result<Vec<Cell>, WorldError> {
    if radius < 0 {
        return Err(WorldError::NegativeRadius(radius));
    }
    if radius > MAX_NEIGHBORHOOD_RADIUS {
        return Err(WorldError::RadiusTooLarge {
            radius,
            max: MAX_NEIGHBORHOOD_RADIUS,
        });
    }
    let edges = (
        center.i.checked_sub(radius),
        center.i.checked_add(radius),
        center.j.checked_sub(radius),
        center.j.checked_add(radius),
    );
    let (Some(south), Some(north), Some(west), Some(east)) = edges else {
        return Err(WorldError::NeighborhoodOutOfRange { center, radius });
    };
    let side = 2 * radius as usize + 1;
    let mut cells = Vec::with_capacity(side * side);
    for i in south..=north {
        for j in west..=east {
            cells.push(Cell::new(i, j));
        }
    }
    Ok(cells)
}

/// The cells of `center`'s neighborhood that hold a cache.
pub fn spawned_caches(center: Cell, radius: i32, probability: f64) -> Result<Vec<Cell>, WorldError> {
    Ok(neighborhood(center, radius)?
        .into_iter()
        .filter(|c| decide_spawn(c.i, c.j, probability))
        .collect())
}

/// Current contents of every populated cache.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheWorld {
    initial_token_scale: u32,
    contents: BTreeMap<Cell, VecDeque<TokenId>>,
}

impl CacheWorld {
    pub fn new(initial_token_scale: u32) -> Self {
        Self {
            initial_token_scale,
            contents: BTreeMap::new(),
        }
    }

    /// Rebuild from persisted contents. Caches present here count as
    /// populated and will not be re-rolled.
    pub fn from_contents(
        initial_token_scale: u32,
        contents: BTreeMap<Cell, VecDeque<TokenId>>,
    ) -> Self {
        Self {
            initial_token_scale,
            contents,
        }
    }

    /// Return the coins at `cell`, populating the cache on first use.
    ///
    /// Idempotent: a second call returns the same contents unchanged.
    pub fn ensure_cache(&mut self, cell: Cell) -> &VecDeque<TokenId> {
        self.ensure_cache_excluding(cell, |_| false)
    }

    /// Like `ensure_cache`, but a fresh population skips coins for which
    /// `exists_elsewhere` is true. Used after a partial restore, where the
    /// inventory may already hold coins minted by a cache whose contents
    /// were lost.
    pub fn ensure_cache_excluding(
        &mut self,
        cell: Cell,
        exists_elsewhere: impl Fn(&TokenId) -> bool,
    ) -> &VecDeque<TokenId> {
        let scale = self.initial_token_scale;
        self.contents.entry(cell).or_insert_with(|| {
            let count = initial_token_count(cell, scale);
            (0..count)
                .map(|serial| mint_token(cell.i, cell.j, serial))
                .filter(|token| !exists_elsewhere(token))
                .collect()
        })
    }

    /// Has the cache at `cell` been populated?
    pub fn is_populated(&self, cell: Cell) -> bool {
        self.contents.contains_key(&cell)
    }

    /// Coins currently in the cache at `cell`, if it has been populated.
    pub fn contents(&self, cell: Cell) -> Option<&VecDeque<TokenId>> {
        self.contents.get(&cell)
    }

    /// Take the oldest coin out of the cache at `cell`.
    pub(crate) fn take_oldest(&mut self, cell: Cell) -> Option<TokenId> {
        self.contents.get_mut(&cell)?.pop_front()
    }

    /// Append a coin to an already populated cache. Returns the coin back if
    /// the cache is unknown.
    pub(crate) fn put(&mut self, cell: Cell, token: TokenId) -> Result<(), TokenId> {
        match self.contents.get_mut(&cell) {
            Some(coins) => {
                coins.push_back(token);
                Ok(())
            }
            None => Err(token),
        }
    }

    /// All populated caches in cell order.
    pub fn iter(&self) -> impl Iterator<Item = (&Cell, &VecDeque<TokenId>)> {
        self.contents.iter()
    }

    /// Number of populated caches (including emptied ones).
    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    /// Total coins across every cache.
    pub fn total_tokens(&self) -> usize {
        self.contents.values().map(VecDeque::len).sum()
    }

    pub fn initial_token_scale(&self) -> u32 {
        self.initial_token_scale
    }

    /// Drop every cache; the next `ensure_cache` re-derives from scratch.
    pub fn clear(&mut self) {
        self.contents.clear();
    }

    pub(crate) fn contents_map(&self) -> &BTreeMap<Cell, VecDeque<TokenId>> {
        &self.contents
    }
}
