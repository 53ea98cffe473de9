// Capability interfaces for the session's external collaborators.
//
// The core never references a concrete map library, position source, or
// dialog. It talks to three traits instead:
//
// - `RenderService`: draws and removes cache regions, moves the player
//   marker and map view, maintains the trail polyline. The implementor owns
//   every visual object; the core holds only opaque `RegionHandle`s.
// - `GeolocationProvider`: a subscribe/unsubscribe position source. Updates
//   are pushed back into the session as `GeolocationUpdate` values by the
//   front end's event loop (`Session::handle_geolocation`).
// - `Confirm`: a yes/no prompt, used only by reset.
//
// Instead of a callback per drawn region, `draw_cache_region` receives the
// cell key; when the player interacts with a region the front end asks
// `Session::popup(cell)` for the current `PopupContent`, so popups always
// reflect live contents.
//
// Test doubles for all three live in `testing.rs`.

use crate::config::GeolocationOptions;
use crate::types::{Cell, CellBounds, LatLng, TokenId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque handle to a drawn cache region, issued by the renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegionHandle(pub u64);

/// The map/layer rendering service.
pub trait RenderService {
    /// Draw the region for the cache at `cell`.
    fn draw_cache_region(&mut self, bounds: CellBounds, cell: Cell) -> RegionHandle;

    fn remove_cache_region(&mut self, handle: RegionHandle);

    fn set_player_marker_position(&mut self, position: LatLng);

    fn set_map_view(&mut self, center: LatLng, zoom: u8);

    fn append_trail_point(&mut self, point: LatLng);

    fn clear_trail(&mut self);
}

/// What a cache popup shows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopupContent {
    pub cell: Cell,
    /// Coins in the cache, oldest first.
    pub coins: Vec<TokenId>,
    /// The player holds at least one coin.
    pub can_deposit: bool,
    /// The cache holds at least one coin.
    pub can_withdraw: bool,
}

impl fmt::Display for PopupContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cache {} holds {} coin(s)", self.cell, self.coins.len())?;
        for coin in &self.coins {
            write!(f, "\n  {coin}")?;
        }
        Ok(())
    }
}

/// Subscription id returned by `GeolocationProvider::watch`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WatchId(pub u64);

/// A subscribe/unsubscribe position source.
pub trait GeolocationProvider {
    /// Start delivering updates. The front end forwards each one to
    /// `Session::handle_geolocation`.
    fn watch(&mut self, options: &GeolocationOptions) -> WatchId;

    fn clear_watch(&mut self, id: WatchId);
}

/// A position source failure. Codes follow the W3C Geolocation API.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeolocationError {
    pub code: u16,
    pub message: String,
}

impl GeolocationError {
    pub const PERMISSION_DENIED: u16 = 1;
    pub const POSITION_UNAVAILABLE: u16 = 2;
    pub const TIMEOUT: u16 = 3;

    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for GeolocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "geolocation error {}: {}", self.code, self.message)
    }
}

/// One delivery from a geolocation subscription.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum GeolocationUpdate {
    Position(LatLng),
    Error(GeolocationError),
}

/// A yes/no prompt.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}
