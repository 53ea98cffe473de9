// Error types for the game core.
//
// Failures are reserved for out-of-contract inputs (bad configuration, a
// neighborhood radius or position the grid cannot address) and for the
// durable store. Empty-source
// transfers are not errors; they are reported as `SessionEvent`s (see
// `event.rs`). `MementoError` never escapes `memento::load`: a field that
// fails to decode is logged and replaced by its default.

use crate::types::{Cell, LatLng};
use thiserror::Error;

/// Invalid `GameConfig` values, or a config file that cannot be read.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("neighborhood radius must be >= 0, got {0}")]
    NegativeRadius(i32),
    #[error("spawn probability must be within [0, 1], got {0}")]
    ProbabilityOutOfRange(f64),
    #[error("neighborhood radius must be <= {max}, got {radius}")]
    RadiusTooLarge { radius: i32, max: i32 },
    #[error("tile size must be finite and > 0, got {0}")]
    InvalidTileSize(f64),
    #[error("tile size must be >= {min} degrees, got {tile_size}")]
    TileTooSmall { tile_size: f64, min: f64 },
    #[error("origin {0} is not a latitude/longitude on the globe")]
    OriginOutOfRange(LatLng),
    #[error("initial token scale must be > 0")]
    ZeroTokenScale,
    #[error("initial token scale must be <= {max}, got {scale}")]
    TokenScaleTooLarge { scale: u32, max: u32 },
    #[error("malformed config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),
}

/// Out-of-contract inputs to the world model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorldError {
    #[error("neighborhood radius must be >= 0, got {0}")]
    NegativeRadius(i32),
    #[error("neighborhood radius must be <= {max}, got {radius}")]
    RadiusTooLarge { radius: i32, max: i32 },
    #[error("position {0} is outside the addressable grid")]
    PositionOutOfRange(LatLng),
    #[error("neighborhood of {center} with radius {radius} leaves the addressable grid")]
    NeighborhoodOutOfRange { center: Cell, radius: i32 },
}

/// Failures of a durable key-value store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error on key {key:?}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid store key {0:?}")]
    InvalidKey(String),
}

/// A single persisted field could not be decoded.
#[derive(Debug, Error)]
pub enum MementoError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported field version {found} (expected {expected})")]
    Version { found: u32, expected: u32 },
    #[error("coin {0} appears more than once")]
    DuplicateToken(String),
    #[error("position is not finite")]
    NonFinitePosition,
}

/// Failure to write a snapshot.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("cannot encode {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: MementoError,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}
