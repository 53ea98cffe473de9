// Data-driven game configuration.
//
// All tunable parameters live in `GameConfig`, loaded from JSON (or taken
// from `Default`). The core never uses magic numbers for world shape: the
// grid origin, tile size, neighborhood radius, spawn probability and initial
// coin scale all come from here. Two sessions with identical configs derive
// identical worlds.
//
// `validate()` rejects out-of-contract values loudly instead of clamping
// them. `GameState::new` calls it, so a session never runs
// with an invalid config. Besides sign checks it enforces upper bounds: the
// radius and coin scale are capped, the origin must lie on the globe, and
// the tile size has a floor so that any latitude/longitude, plus a full
// neighborhood around it, maps to an addressable cell (see `grid.rs`).
//
// See also: `grid.rs` (origin, tile_size), `cache.rs` (radius, probability,
// scale), `session.rs` (zoom, geolocation options), `memento.rs`
// (storage_prefix).

use crate::cache::{MAX_NEIGHBORHOOD_RADIUS, MAX_TOKEN_SCALE};
use crate::error::ConfigError;
use crate::types::LatLng;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Smallest accepted tile edge, in degrees. 360 degrees of longitude is
/// 3.6e8 tiles, well inside `grid::MAX_CELL_INDEX`.
pub const MIN_TILE_SIZE: f64 = 1e-6;

/// Options handed to the geolocation boundary when tracking starts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeolocationOptions {
    /// Ask the device for its most accurate fix.
    pub high_accuracy: bool,
    /// Accept a cached fix at most this old (0 = always fresh).
    pub maximum_age_ms: u64,
    /// Give up on a fix after this long and report a timeout.
    pub timeout_ms: u64,
}

impl Default for GeolocationOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            maximum_age_ms: 0,
            timeout_ms: 10_000,
        }
    }
}

/// Complete game configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Geographic anchor of cell (0, 0) and the reset position.
    pub origin: LatLng,

    /// Edge length of one grid cell, in degrees.
    pub tile_size: f64,

    /// Caches are considered within this many cells of the player
    /// (inclusive square).
    pub neighborhood_radius: i32,

    /// Probability that any given cell holds a cache.
    pub spawn_probability: f64,

    /// Initial coin count of a cache is `floor(luck * initial_token_scale)`.
    pub initial_token_scale: u32,

    /// Zoom level requested from the rendering boundary.
    pub map_zoom: u8,

    /// Options passed when subscribing to geolocation updates.
    pub geolocation: GeolocationOptions,

    /// Namespace prepended to the durable store keys.
    pub storage_prefix: String,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            origin: LatLng::new(36.9895, -122.0628),
            tile_size: 1e-4,
            neighborhood_radius: 8,
            spawn_probability: 0.1,
            initial_token_scale: 100,
            map_zoom: 19,
            geolocation: GeolocationOptions::default(),
            storage_prefix: "geocoin".to_string(),
        }
    }
}

impl GameConfig {
    /// Parse a config from JSON. Missing fields take their defaults. The
    /// result is validated.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON config file.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Reject out-of-contract values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.neighborhood_radius < 0 {
            return Err(ConfigError::NegativeRadius(self.neighborhood_radius));
        }
        if self.neighborhood_radius > MAX_NEIGHBORHOOD_RADIUS {
            return Err(ConfigError::RadiusTooLarge {
                radius: self.neighborhood_radius,
                max: MAX_NEIGHBORHOOD_RADIUS,
            });
        }
        // `contains` is false for NaN.
        if !(0.0..=1.0).contains(&self.spawn_probability) {
            return Err(ConfigError::ProbabilityOutOfRange(self.spawn_probability));
        }
        if !self.tile_size.is_finite() || self.tile_size <= 0.0 {
            return Err(ConfigError::InvalidTileSize(self.tile_size));
        }
        if self.tile_size < MIN_TILE_SIZE {
            return Err(ConfigError::TileTooSmall {
                tile_size: self.tile_size,
                min: MIN_TILE_SIZE,
            });
        }
        if !self.origin.is_geographic() {
            return Err(ConfigError::OriginOutOfRange(self.origin));
        }
        if self.initial_token_scale == 0 {
            return Err(ConfigError::ZeroTokenScale);
        }
        if self.initial_token_scale > MAX_TOKEN_SCALE {
            return Err(ConfigError::TokenScaleTooLarge {
                scale: self.initial_token_scale,
                max: MAX_TOKEN_SCALE,
            });
        }
        Ok(())
    }
}
