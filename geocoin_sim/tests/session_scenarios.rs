// End-to-end session scenarios.
//
// Each test drives a real `Session` through its public API with the
// boundary doubles from `geocoin_sim::testing`, using the reference world:
// origin (36.9895, -122.0628), tile size 1e-4, spawn probability 0.1.
// Persistence tests use both the in-memory store and a real directory
// store in a scratch directory.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use geocoin_sim::config::GameConfig;
use geocoin_sim::event::SessionEvent;
use geocoin_sim::memento::{CacheContents, HeldCoins, MementoField, StoreKeys};
use geocoin_sim::session::Session;
use geocoin_sim::store::{DirStore, KeyValueStore, MemoryStore};
use geocoin_sim::testing::{RecordingRenderer, ScriptedConfirm};
use geocoin_sim::types::{Cell, Direction, LatLng};

fn reference_config() -> GameConfig {
    GameConfig {
        origin: LatLng::new(36.9895, -122.0628),
        tile_size: 1e-4,
        spawn_probability: 0.1,
        ..GameConfig::default()
    }
}

fn fresh() -> Session<MemoryStore, RecordingRenderer> {
    Session::open(reference_config(), MemoryStore::new(), RecordingRenderer::new()).unwrap()
}

fn scratch_dir(name: &str) -> PathBuf {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time")
        .as_nanos();
    std::env::temp_dir().join(format!("geocoin_it_{name}_{}_{stamp}", std::process::id()))
}

fn total_tokens<S: KeyValueStore>(s: &Session<S, RecordingRenderer>) -> usize {
    s.state().total_tokens()
}

/// Take coins from the first few non-empty caches around the player.
fn collect_some<S: KeyValueStore>(s: &mut Session<S, RecordingRenderer>, caches: usize) {
    let cells: Vec<Cell> = s
        .regions()
        .keys()
        .copied()
        .filter(|c| s.popup(*c).is_some_and(|p| p.can_withdraw))
        .take(caches)
        .collect();
    for cell in cells {
        s.withdraw(cell);
    }
}

// ---------------------------------------------------------------------------
// Reference scenario
// ---------------------------------------------------------------------------

#[test]
fn north_then_south_returns_to_same_cell() {
    let mut s = fresh();
    collect_some(&mut s, 2);
    let start = s.player_cell();
    let total = total_tokens(&s);

    s.move_player(Direction::North);
    assert_eq!(s.player_cell(), Cell::new(start.i + 1, start.j));
    s.move_player(Direction::South);

    assert_eq!(s.player_cell(), start);
    assert_eq!(total_tokens(&s), total);
    assert_eq!(s.state().player.trail.len(), 3);
}

#[test]
fn long_walk_lands_back_at_origin_cell() {
    let mut s = fresh();
    for _ in 0..25 {
        s.move_player(Direction::East);
        s.move_player(Direction::North);
    }
    for _ in 0..25 {
        s.move_player(Direction::West);
        s.move_player(Direction::South);
    }
    assert_eq!(s.player_cell(), Cell::new(0, 0));
}

#[test]
fn deposit_with_empty_inventory_changes_no_cache() {
    let mut s = fresh();
    let before = s.state().caches.clone();
    for cell in s.regions().keys().copied().collect::<Vec<_>>() {
        let result = s.deposit(cell);
        assert_eq!(result.events, vec![SessionEvent::NothingToDeposit]);
    }
    assert_eq!(s.state().caches, before);
}

#[test]
fn reset_matches_fresh_session() {
    let mut s = fresh();
    collect_some(&mut s, 3);
    s.move_player(Direction::East);
    s.move_player(Direction::East);
    collect_some(&mut s, 1);

    let mut confirm = ScriptedConfirm::answering([true]);
    s.reset(&mut confirm);

    let reference = fresh();
    assert!(s.state().inventory.is_empty());
    assert_eq!(s.state().player.trail, vec![reference_config().origin]);
    assert_eq!(s.state().caches, reference.state().caches);
    assert_eq!(s.state().cells, reference.state().cells);
    assert_eq!(
        s.regions().keys().collect::<Vec<_>>(),
        reference.regions().keys().collect::<Vec<_>>()
    );
    assert_eq!(s.state().snapshot(), reference.state().snapshot());
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

#[test]
fn restore_of_snapshot_is_identity() {
    let mut s = fresh();
    collect_some(&mut s, 4);
    s.move_player(Direction::North);
    s.move_player(Direction::West);
    let cell = s.player_cell();
    if s.popup(cell).is_some() {
        s.deposit(cell);
    }

    let snapshot = s.state().snapshot();
    let mut state = s.state().clone();
    state.reset();
    state.restore(snapshot.clone());
    assert_eq!(state.snapshot(), snapshot);
    assert_eq!(state.inventory, s.state().inventory);
    assert_eq!(state.player, s.state().player);
}

#[test]
fn dir_store_persists_across_sessions() {
    let dir = scratch_dir("persist");
    let (saved, held) = {
        let mut s = Session::open(
            reference_config(),
            DirStore::open(&dir).unwrap(),
            RecordingRenderer::new(),
        )
        .unwrap();
        collect_some(&mut s, 3);
        s.move_player(Direction::South);
        (s.state().snapshot(), s.state().inventory.len())
    };
    assert!(held > 0);

    let reopened = Session::open(
        reference_config(),
        DirStore::open(&dir).unwrap(),
        RecordingRenderer::new(),
    )
    .unwrap();
    assert_eq!(reopened.state().snapshot(), saved);
    assert_eq!(reopened.state().inventory.len(), held);
    assert_eq!(reopened.renderer().trail(), saved.player.trail.as_slice());
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn emptied_cache_stays_empty_after_reload() {
    let mut s = fresh();
    let cell = s
        .regions()
        .keys()
        .copied()
        .find(|c| s.popup(*c).is_some_and(|p| p.coins.len() <= 30 && p.can_withdraw))
        .unwrap();
    while s.popup(cell).is_some_and(|p| p.can_withdraw) {
        s.withdraw(cell);
    }
    let store = s.into_store();
    let reopened = Session::open(reference_config(), store, RecordingRenderer::new()).unwrap();
    assert!(reopened.popup(cell).unwrap().coins.is_empty());
}

#[test]
fn corrupt_cache_field_recovers_without_duplicates() {
    let mut s = fresh();
    collect_some(&mut s, 2);
    let total = total_tokens(&s);
    let inventory = s.state().inventory.clone();
    let mut store = s.into_store();

    let keys = StoreKeys::new(reference_config().storage_prefix);
    store
        .set(&keys.key::<CacheContents>(), "\u{0}garbage")
        .unwrap();

    let reopened = Session::open(reference_config(), store, RecordingRenderer::new()).unwrap();
    assert_eq!(reopened.state().inventory, inventory);
    assert_eq!(total_tokens(&reopened), total);
}

#[test]
fn corrupt_inventory_field_loses_only_inventory() {
    let mut s = fresh();
    collect_some(&mut s, 2);
    s.move_player(Direction::North);
    let before = s.state().snapshot();
    let mut store = s.into_store();

    let keys = StoreKeys::new(reference_config().storage_prefix);
    store
        .set(&keys.key::<HeldCoins>(), r#"{"version":7,"data":[]}"#)
        .unwrap();

    let reopened = Session::open(reference_config(), store, RecordingRenderer::new()).unwrap();
    let after = reopened.state().snapshot();
    assert!(after.inventory.0.is_empty());
    assert_eq!(after.caches, before.caches);
    assert_eq!(after.player, before.player);
    assert_eq!(after.cells, before.cells);
}

#[test]
fn store_keys_are_namespaced_by_prefix() {
    let config = GameConfig {
        storage_prefix: "slot2".into(),
        ..reference_config()
    };
    let s = Session::open(config, MemoryStore::new(), RecordingRenderer::new()).unwrap();
    let keys: Vec<&str> = s.store().keys().collect();
    assert_eq!(
        keys,
        vec!["slot2.caches", "slot2.cells", "slot2.inventory", "slot2.player"]
    );
    assert_eq!(HeldCoins::KEY, "inventory");
}

// ---------------------------------------------------------------------------
// Geolocation
// ---------------------------------------------------------------------------

#[test]
fn geolocation_fixes_follow_the_change_check() {
    use geocoin_sim::boundary::GeolocationUpdate;
    use geocoin_sim::testing::FakeGeolocation;

    let mut s = fresh();
    let mut geo = FakeGeolocation::new();
    s.start_tracking(&mut geo);

    let here = s.player_position();
    let unchanged = s.handle_geolocation(GeolocationUpdate::Position(here));
    assert_eq!(
        unchanged.events,
        vec![SessionEvent::GeolocationIgnored { position: here }]
    );

    let there = s.state().grid.cell_center(Cell::new(-5, 9));
    let moved = s.handle_geolocation(GeolocationUpdate::Position(there));
    assert!(moved.mutated());
    assert_eq!(s.player_cell(), Cell::new(-5, 9));
    assert!(s.regions().keys().all(|c| c.chebyshev_distance(Cell::new(-5, 9)) <= 8));

    s.stop_tracking(&mut geo);
    assert_eq!(geo.active_watches(), 0);
}
