// Player inventory and the coin transfer protocol.
//
// A coin is always in exactly one place: the player's `Inventory` or one
// cache in `CacheWorld`. `deposit` and `withdraw` are the only functions
// that move coins between the two, and each moves at most one coin.
//
// Ordering policy is oldest-first on both sides:
// - the inventory is an insertion-ordered set; `deposit` hands over its
//   oldest member and appends it to the back of the cache;
// - `withdraw` takes the front (oldest) coin of the cache and appends it to
//   the inventory.
//
// Empty sources are not errors. They come back as `TransferOutcome`
// variants and leave every collection untouched. The session turns the
// outcome into a `SessionEvent` and writes a save (see `session.rs`).

use crate::cache::CacheWorld;
use crate::types::{Cell, TokenId};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Coins held by the player. Membership is what matters; insertion order is
/// kept only to make transfers deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Inventory {
    coins: IndexSet<TokenId>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a coin. Returns `false` if it was already held.
    pub fn insert(&mut self, token: TokenId) -> bool {
        self.coins.insert(token)
    }

    pub fn contains(&self, token: TokenId) -> bool {
        self.coins.contains(&token)
    }

    pub fn len(&self) -> usize {
        self.coins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coins.is_empty()
    }

    /// Held coins, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &TokenId> {
        self.coins.iter()
    }

    pub fn clear(&mut self) {
        self.coins.clear();
    }

    /// Human-readable summary for status displays.
    pub fn status_line(&self) -> String {
        match self.coins.len() {
            0 => "no coins".to_string(),
            n => {
                let ids: Vec<String> = self.coins.iter().map(ToString::to_string).collect();
                let noun = if n == 1 { "coin" } else { "coins" };
                format!("{n} {noun}: {}", ids.join(", "))
            }
        }
    }

    fn take_oldest(&mut self) -> Option<TokenId> {
        self.coins.shift_remove_index(0)
    }
}

impl FromIterator<TokenId> for Inventory {
    fn from_iter<T: IntoIterator<Item = TokenId>>(iter: T) -> Self {
        Self {
            coins: iter.into_iter().collect(),
        }
    }
}

/// What a transfer did.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferOutcome {
    /// The coin moved from the inventory into the cache.
    Deposited(TokenId),
    /// The coin moved from the cache into the inventory.
    Withdrawn(TokenId),
    NothingToDeposit,
    NothingToWithdraw,
    /// The named cache has never been populated.
    NoSuchCache,
}

impl TransferOutcome {
    /// Did a coin change hands?
    pub fn moved(self) -> bool {
        matches!(self, Self::Deposited(_) | Self::Withdrawn(_))
    }
}

/// Move the oldest held coin into the cache at `cell`.
pub fn deposit(inventory: &mut Inventory, caches: &mut CacheWorld, cell: Cell) -> TransferOutcome {
    if inventory.is_empty() {
        return TransferOutcome::NothingToDeposit;
    }
    if !caches.is_populated(cell) {
        return TransferOutcome::NoSuchCache;
    }
    let Some(token) = inventory.take_oldest() else {
        return TransferOutcome::NothingToDeposit;
    };
    match caches.put(cell, token) {
        Ok(()) => {
            trace!(%token, %cell, "deposited");
            TransferOutcome::Deposited(token)
        }
        Err(token) => {
            // Unreachable after the populated check; put the coin back where
            // it was rather than lose it.
            inventory.coins.shift_insert(0, token);
            TransferOutcome::NoSuchCache
        }
    }
}

/// Move the oldest coin of the cache at `cell` into the inventory.
pub fn withdraw(inventory: &mut Inventory, caches: &mut CacheWorld, cell: Cell) -> TransferOutcome {
    if !caches.is_populated(cell) {
        return TransferOutcome::NoSuchCache;
    }
    match caches.take_oldest(cell) {
        Some(token) => {
            inventory.insert(token);
            trace!(%token, %cell, "withdrew");
            TransferOutcome::Withdrawn(token)
        }
        None => TransferOutcome::NothingToWithdraw,
    }
}
