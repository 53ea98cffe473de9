// Test doubles for the session's boundaries.
//
// Compiled for this crate's unit tests, and otherwise only with the
// `testing` feature, which the integration tests under `tests/` and the
// benches enable through a dev-dependency on this crate:
//
// - `RecordingRenderer`: records every render call and tracks which regions
//   are currently drawn, the marker position and the trail.
// - `ScriptedConfirm`: answers prompts from a queue, `false` once exhausted.
// - `FakeGeolocation`: hands out watch ids and tracks active subscriptions.
// - `BrokenStore`: a store whose every operation fails.

use crate::boundary::{Confirm, GeolocationProvider, RegionHandle, RenderService, WatchId};
use crate::config::GeolocationOptions;
use crate::error::StoreError;
use crate::store::KeyValueStore;
use crate::types::{Cell, CellBounds, LatLng};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// One call into the renderer.
#[derive(Clone, Debug, PartialEq)]
pub enum RenderCall {
    DrawRegion {
        handle: RegionHandle,
        cell: Cell,
        bounds: CellBounds,
    },
    RemoveRegion(RegionHandle),
    SetMarker(LatLng),
    SetView { center: LatLng, zoom: u8 },
    AppendTrail(LatLng),
    ClearTrail,
}

/// A renderer that remembers what it was asked to do.
#[derive(Clone, Debug, Default)]
pub struct RecordingRenderer {
    calls: Vec<RenderCall>,
    live: BTreeMap<RegionHandle, Cell>,
    next_handle: u64,
    marker: Option<LatLng>,
    trail: Vec<LatLng>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[RenderCall] {
        &self.calls
    }

    /// Regions drawn and not yet removed.
    pub fn live_regions(&self) -> &BTreeMap<RegionHandle, Cell> {
        &self.live
    }

    /// Total `draw_cache_region` calls so far.
    pub fn drawn_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, RenderCall::DrawRegion { .. }))
            .count()
    }

    pub fn marker(&self) -> Option<LatLng> {
        self.marker
    }

    /// The trail as currently drawn.
    pub fn trail(&self) -> &[LatLng] {
        &self.trail
    }
}

impl RenderService for RecordingRenderer {
    fn draw_cache_region(&mut self, bounds: CellBounds, cell: Cell) -> RegionHandle {
        let handle = RegionHandle(self.next_handle);
        self.next_handle += 1;
        self.live.insert(handle, cell);
        self.calls.push(RenderCall::DrawRegion {
            handle,
            cell,
            bounds,
        });
        handle
    }

    fn remove_cache_region(&mut self, handle: RegionHandle) {
        self.live.remove(&handle);
        self.calls.push(RenderCall::RemoveRegion(handle));
    }

    fn set_player_marker_position(&mut self, position: LatLng) {
        self.marker = Some(position);
        self.calls.push(RenderCall::SetMarker(position));
    }

    fn set_map_view(&mut self, center: LatLng, zoom: u8) {
        self.calls.push(RenderCall::SetView { center, zoom });
    }

    fn append_trail_point(&mut self, point: LatLng) {
        self.trail.push(point);
        self.calls.push(RenderCall::AppendTrail(point));
    }

    fn clear_trail(&mut self) {
        self.trail.clear();
        self.calls.push(RenderCall::ClearTrail);
    }
}

/// Answers confirmation prompts from a script.
#[derive(Clone, Debug, Default)]
pub struct ScriptedConfirm {
    answers: VecDeque<bool>,
    prompts: Vec<String>,
}

impl ScriptedConfirm {
    /// Declines every prompt.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answering(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            prompts: Vec::new(),
        }
    }

    /// Prompts seen so far.
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }
}

impl Confirm for ScriptedConfirm {
    fn confirm(&mut self, prompt: &str) -> bool {
        self.prompts.push(prompt.to_string());
        self.answers.pop_front().unwrap_or(false)
    }
}

/// A geolocation source that only tracks subscriptions. Tests feed updates
/// to the session directly.
#[derive(Clone, Debug, Default)]
pub struct FakeGeolocation {
    next_id: u64,
    active: BTreeSet<WatchId>,
    last_options: Option<GeolocationOptions>,
}

impl FakeGeolocation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_watches(&self) -> usize {
        self.active.len()
    }

    /// Options passed to the most recent `watch`.
    pub fn last_options(&self) -> Option<&GeolocationOptions> {
        self.last_options.as_ref()
    }
}

impl GeolocationProvider for FakeGeolocation {
    fn watch(&mut self, options: &GeolocationOptions) -> WatchId {
        let id = WatchId(self.next_id);
        self.next_id += 1;
        self.active.insert(id);
        self.last_options = Some(options.clone());
        id
    }

    fn clear_watch(&mut self, id: WatchId) {
        self.active.remove(&id);
    }
}

/// A store that rejects every read and write.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrokenStore;

impl BrokenStore {
    fn failure(key: &str) -> StoreError {
        StoreError::Io {
            key: key.to_string(),
            source: std::io::Error::other("store unavailable"),
        }
    }
}

impl KeyValueStore for BrokenStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Err(Self::failure(key))
    }

    fn set(&mut self, key: &str, _value: &str) -> Result<(), StoreError> {
        Err(Self::failure(key))
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        Err(Self::failure("*"))
    }
}
