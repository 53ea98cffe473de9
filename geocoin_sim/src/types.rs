// Core types shared across the game core.
//
// Defines geographic positions (`LatLng`), discrete grid coordinates
// (`Cell`), cell extents (`CellBounds`), coin identifiers (`TokenId`) and
// movement directions. All types derive or implement `Serialize` /
// `Deserialize` for the memento subsystem.
//
// `Cell` and `TokenId` serialize as their external string forms (`"i:j"`
// and `"i:j#serial"`) so they can be used as JSON map keys and read back by
// anything that only knows the string representation.
//
// See also: `grid.rs` for the lat/lng <-> cell transform, `cache.rs` for
// token minting, `memento.rs` for how these are persisted.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Geographic types
// ---------------------------------------------------------------------------

/// A geographic position in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_finite(self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }

    /// Latitude within [-90, 90] and longitude within [-180, 180].
    pub fn is_geographic(self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lng)
    }
}

/// Rectangular extent of one cell: `[[lat_min, lng_min], [lat_max, lng_max]]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellBounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl CellBounds {
    /// The bounds in the nested-array shape map libraries expect.
    pub fn as_array(&self) -> [[f64; 2]; 2] {
        [
            [self.south_west.lat, self.south_west.lng],
            [self.north_east.lat, self.north_east.lng],
        ]
    }

    /// Half-open containment: the south and west edges belong to the cell,
    /// the north and east edges belong to the neighbours.
    pub fn contains(&self, p: LatLng) -> bool {
        p.lat >= self.south_west.lat
            && p.lat < self.north_east.lat
            && p.lng >= self.south_west.lng
            && p.lng < self.north_east.lng
    }
}

// ---------------------------------------------------------------------------
// Grid cells
// ---------------------------------------------------------------------------

/// A discrete grid coordinate. `i` counts tiles north of the origin, `j`
/// counts tiles east of it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cell {
    pub i: i32,
    pub j: i32,
}

impl Cell {
    pub const fn new(i: i32, j: i32) -> Self {
        Self { i, j }
    }

    /// Key fed to the luck function for the spawn decision.
    pub fn luck_key(self) -> String {
        format!("{},{}", self.i, self.j)
    }

    /// Key fed to the luck function for the initial coin count.
    pub fn initial_value_key(self) -> String {
        format!("{},{},initialValue", self.i, self.j)
    }

    /// The neighbouring cell one step in `direction`.
    pub fn step(self, direction: Direction) -> Option<Self> {
        let (di, dj) = direction.offset();
        Some(Self::new(self.i.checked_add(di)?, self.j.checked_add(dj)?))
    }

    /// Chebyshev distance: the smallest neighborhood radius around `self`
    /// that includes `other`.
    pub fn chebyshev_distance(self, other: Self) -> u32 {
        self.i.abs_diff(other.i).max(self.j.abs_diff(other.j))
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.i, self.j)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("invalid cell key {0:?}: expected \"i:j\" or \"i,j\"")]
pub struct CellParseError(pub String);

impl FromStr for Cell {
    type Err = CellParseError;

    /// Accepts both `"i:j"` and `"i,j"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || CellParseError(s.to_string());
        let (i, j) = s
            .split_once(':')
            .or_else(|| s.split_once(','))
            .ok_or_else(err)?;
        let i = i.trim().parse().map_err(|_| err())?;
        let j = j.trim().parse().map_err(|_| err())?;
        Ok(Self::new(i, j))
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Cell {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Coins
// ---------------------------------------------------------------------------

/// A uniquely identified coin. Identity is `(cell, serial)`; a given pair is
/// minted at most once per world, when its cache is first populated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenId {
    pub cell: Cell,
    pub serial: u32,
}

impl TokenId {
    pub const fn new(cell: Cell, serial: u32) -> Self {
        Self { cell, serial }
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.cell, self.serial)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("invalid coin id {0:?}: expected \"i:j#serial\"")]
pub struct TokenParseError(pub String);

impl FromStr for TokenId {
    type Err = TokenParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || TokenParseError(s.to_string());
        let (cell, serial) = s.split_once('#').ok_or_else(err)?;
        let cell = cell.parse().map_err(|_| err())?;
        let serial = serial.parse().map_err(|_| err())?;
        Ok(Self::new(cell, serial))
    }
}

impl Serialize for TokenId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TokenId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Movement
// ---------------------------------------------------------------------------

/// One-tile movement directions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    /// `(di, dj)` grid offset of one step.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::North => (1, 0),
            Direction::South => (-1, 0),
            Direction::East => (0, 1),
            Direction::West => (0, -1),
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "n" | "north" | "up" => Ok(Direction::North),
            "s" | "south" | "down" => Ok(Direction::South),
            "e" | "east" | "right" => Ok(Direction::East),
            "w" | "west" | "left" => Ok(Direction::West),
            other => Err(format!("unknown direction {other:?}")),
        }
    }
}
