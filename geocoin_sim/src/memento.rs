// Memento subsystem: snapshot encoding and durable save/load.
//
// A `GameSnapshot` holds the whole mutable game state as plain values:
//
//   cells     - the canonical-cell table (every cell looked up so far)
//   caches    - per-cache coin lists, including emptied caches
//   inventory - coins held by the player, oldest first
//   player    - current position and the travel trail
//
// Each of the four is a `MementoField` with its own store key
// (`{prefix}.cells`, `{prefix}.caches`, `{prefix}.inventory`,
// `{prefix}.player`) and its own versioned JSON envelope:
//
//   { "version": 1, "data": ... }
//
// Fields are written and read independently. On load, a missing, unreadable,
// malformed or wrong-version field falls back to its default and is logged;
// the other fields are still restored. Nothing in `load` can fail.
//
// Cross-field consistency (a coin present in two places after a partial
// corruption) is repaired by `GameState::restore`, not here.
//
// See also: `store.rs` for the key-value boundary, `state.rs` for
// `snapshot()` / `restore()`, `session.rs` for the write-through policy.

use crate::error::{MementoError, SaveError};
use crate::store::KeyValueStore;
use crate::types::{Cell, LatLng, TokenId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Current envelope version for every field.
pub const MEMENTO_VERSION: u32 = 1;

/// A persisted field: a self-describing record with its own store key.
pub trait MementoField: Sized + Default + Serialize + DeserializeOwned {
    /// Suffix appended to the storage prefix to form this field's key.
    const KEY: &'static str;

    /// Field-specific checks after JSON decoding.
    fn validate(&self) -> Result<(), MementoError> {
        Ok(())
    }

    /// Encode into a versioned envelope.
    fn encode(&self) -> Result<String, MementoError> {
        Ok(serde_json::to_string(&EnvelopeRef {
            version: MEMENTO_VERSION,
            data: self,
        })?)
    }

    /// Decode a versioned envelope.
    fn decode(raw: &str) -> Result<Self, MementoError> {
        let envelope: Envelope<Self> = serde_json::from_str(raw)?;
        if envelope.version != MEMENTO_VERSION {
            return Err(MementoError::Version {
                found: envelope.version,
                expected: MEMENTO_VERSION,
            });
        }
        envelope.data.validate()?;
        Ok(envelope.data)
    }
}

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    version: u32,
    data: &'a T,
}

#[derive(Deserialize)]
struct Envelope<T> {
    version: u32,
    data: T,
}

/// The canonical-cell table.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KnownCells(pub Vec<Cell>);

impl MementoField for KnownCells {
    const KEY: &'static str = "cells";
}

/// Per-cache coin lists, front = oldest.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheContents(pub BTreeMap<Cell, Vec<TokenId>>);

impl MementoField for CacheContents {
    const KEY: &'static str = "caches";
}

/// Coins held by the player, oldest first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HeldCoins(pub Vec<TokenId>);

impl MementoField for HeldCoins {
    const KEY: &'static str = "inventory";

    fn validate(&self) -> Result<(), MementoError> {
        let mut seen = std::collections::BTreeSet::new();
        for coin in &self.0 {
            if !seen.insert(coin) {
                return Err(MementoError::DuplicateToken(coin.to_string()));
            }
        }
        Ok(())
    }
}

/// Player position plus travel trail. `None` position means "never saved";
/// the session then starts at the configured origin.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub position: Option<LatLng>,
    #[serde(default)]
    pub trail: Vec<LatLng>,
}

impl MementoField for PlayerRecord {
    const KEY: &'static str = "player";

    fn validate(&self) -> Result<(), MementoError> {
        let finite = self.position.is_none_or(LatLng::is_finite)
            && self.trail.iter().all(|p| p.is_finite());
        if finite {
            Ok(())
        } else {
            Err(MementoError::NonFinitePosition)
        }
    }
}

/// The whole mutable game state as plain values.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub cells: KnownCells,
    pub caches: CacheContents,
    pub inventory: HeldCoins,
    pub player: PlayerRecord,
}

/// The four store keys for a given prefix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreKeys {
    prefix: String,
}

impl StoreKeys {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Store key for field `F`.
    pub fn key<F: MementoField>(&self) -> String {
        format!("{}.{}", self.prefix, F::KEY)
    }

    pub fn all(&self) -> [String; 4] {
        [
            self.key::<KnownCells>(),
            self.key::<CacheContents>(),
            self.key::<HeldCoins>(),
            self.key::<PlayerRecord>(),
        ]
    }
}

/// Write every field of `snapshot`. All four writes are attempted; the first
/// failure (if any) is returned.
pub fn save(
    store: &mut impl KeyValueStore,
    keys: &StoreKeys,
    snapshot: &GameSnapshot,
) -> Result<(), SaveError> {
    let results = [
        save_field(store, keys, &snapshot.cells),
        save_field(store, keys, &snapshot.caches),
        save_field(store, keys, &snapshot.inventory),
        save_field(store, keys, &snapshot.player),
    ];
    results.into_iter().collect()
}

fn save_field<F: MementoField>(
    store: &mut impl KeyValueStore,
    keys: &StoreKeys,
    field: &F,
) -> Result<(), SaveError> {
    let key = keys.key::<F>();
    let encoded = field.encode().map_err(|source| SaveError::Encode {
        key: key.clone(),
        source,
    })?;
    store.set(&key, &encoded)?;
    Ok(())
}

/// Read every field, substituting defaults for any that are missing or
/// malformed.
pub fn load(store: &impl KeyValueStore, keys: &StoreKeys) -> GameSnapshot {
    GameSnapshot {
        cells: load_field(store, keys),
        caches: load_field(store, keys),
        inventory: load_field(store, keys),
        player: load_field(store, keys),
    }
}

fn load_field<F: MementoField>(store: &impl KeyValueStore, keys: &StoreKeys) -> F {
    let key = keys.key::<F>();
    let raw = match store.get(&key) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            debug!(key = %key, "no saved value");
            return F::default();
        }
        Err(e) => {
            warn!(key = %key, error = %e, "store read failed, using default");
            return F::default();
        }
    };
    match F::decode(&raw) {
        Ok(field) => field,
        Err(e) => {
            warn!(key = %key, error = %e, "malformed saved field, using default");
            F::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn sample() -> GameSnapshot {
        let a = Cell::new(0, 1);
        let b = Cell::new(-3, 2);
        let mut caches = BTreeMap::new();
        caches.insert(a, vec![TokenId::new(a, 1), TokenId::new(a, 2)]);
        caches.insert(b, vec![]);
        GameSnapshot {
            cells: KnownCells(vec![b, a]),
            caches: CacheContents(caches),
            inventory: HeldCoins(vec![TokenId::new(a, 0)]),
            player: PlayerRecord {
                position: Some(LatLng::new(36.9896, -122.0628)),
                trail: vec![LatLng::new(36.9895, -122.0628), LatLng::new(36.9896, -122.0628)],
            },
        }
    }

    #[test]
    fn save_then_load_reproduces_snapshot() {
        let keys = StoreKeys::new("geocoin");
        let mut store = MemoryStore::new();
        let snapshot = sample();
        save(&mut store, &keys, &snapshot).unwrap();
        assert_eq!(store.len(), 4);
        assert_eq!(load(&store, &keys), snapshot);
    }

    #[test]
    fn keys_are_prefixed() {
        let keys = StoreKeys::new("test");
        assert_eq!(
            keys.all(),
            [
                "test.cells".to_string(),
                "test.caches".to_string(),
                "test.inventory".to_string(),
                "test.player".to_string(),
            ]
        );
    }

    #[test]
    fn empty_store_loads_defaults() {
        let keys = StoreKeys::new("geocoin");
        assert_eq!(load(&MemoryStore::new(), &keys), GameSnapshot::default());
    }

    #[test]
    fn corrupt_field_does_not_affect_others() {
        let keys = StoreKeys::new("geocoin");
        let mut store = MemoryStore::new();
        let snapshot = sample();
        save(&mut store, &keys, &snapshot).unwrap();
        store
            .set(&keys.key::<CacheContents>(), "{ this is not json")
            .unwrap();

        let loaded = load(&store, &keys);
        assert_eq!(loaded.caches, CacheContents::default());
        assert_eq!(loaded.cells, snapshot.cells);
        assert_eq!(loaded.inventory, snapshot.inventory);
        assert_eq!(loaded.player, snapshot.player);
    }

    #[test]
    fn malformed_ids_reject_only_their_field() {
        let keys = StoreKeys::new("geocoin");
        let mut store = MemoryStore::new();
        save(&mut store, &keys, &sample()).unwrap();
        store
            .set(
                &keys.key::<HeldCoins>(),
                r#"{"version":1,"data":["0:1#0","garbage"]}"#,
            )
            .unwrap();
        let loaded = load(&store, &keys);
        assert!(loaded.inventory.0.is_empty());
        assert_eq!(loaded.cells, sample().cells);
    }

    #[test]
    fn wrong_version_falls_back() {
        let raw = r#"{"version":99,"data":["0:1"]}"#;
        assert!(matches!(
            KnownCells::decode(raw),
            Err(MementoError::Version { found: 99, .. })
        ));
    }

    #[test]
    fn duplicate_held_coin_is_malformed() {
        let raw = r#"{"version":1,"data":["0:1#0","0:1#0"]}"#;
        assert!(matches!(
            HeldCoins::decode(raw),
            Err(MementoError::DuplicateToken(_))
        ));
    }

    #[test]
    fn non_finite_position_is_malformed() {
        let record = PlayerRecord {
            position: Some(LatLng::new(f64::NAN, 0.0)),
            trail: vec![],
        };
        assert!(matches!(
            record.validate(),
            Err(MementoError::NonFinitePosition)
        ));
    }

    #[test]
    fn envelope_shape_is_stable() {
        let cells = KnownCells(vec![Cell::new(1, -1)]);
        assert_eq!(cells.encode().unwrap(), r#"{"version":1,"data":["1:-1"]}"#);
        let player = PlayerRecord {
            position: Some(LatLng::new(1.0, 2.0)),
            trail: vec![LatLng::new(1.0, 2.0)],
        };
        assert_eq!(
            player.encode().unwrap(),
            r#"{"version":1,"data":{"position":{"lat":1.0,"lng":2.0},"trail":[{"lat":1.0,"lng":2.0}]}}"#
        );
    }

    #[test]
    fn player_record_tolerates_missing_trail() {
        let raw = r#"{"version":1,"data":{"position":{"lat":1.0,"lng":2.0}}}"#;
        let record = PlayerRecord::decode(raw).unwrap();
        assert_eq!(record.position, Some(LatLng::new(1.0, 2.0)));
        assert!(record.trail.is_empty());
    }
}
