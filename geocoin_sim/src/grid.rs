// Grid addressing: continuous lat/lng <-> discrete cells.
//
// The world is an implicit infinite grid anchored at `config.origin`. Cell
// (i, j) covers `[origin.lat + i*tile, origin.lat + (i+1)*tile)` by
// `[origin.lng + j*tile, origin.lng + (j+1)*tile)`. `coordinate_to_cell` is
// the forward transform, `cell_to_bounds` its exact geometric inverse.
//
// Positions produced by repeated one-tile steps carry float drift (e.g.
// `origin + 1e-4 - 1e-4` may land a hair below the origin). Before flooring,
// a tile-unit value within `SNAP_EPSILON` of an integer is snapped to it, so
// walking north then south returns to the starting cell.
//
// Only cells with `|i|, |j| <= MAX_CELL_INDEX` are addressable. A position
// whose tile offset falls outside that range (or is NaN) is rejected with
// `WorldError::PositionOutOfRange` rather than cast. `GameConfig::validate`
// bounds the tile size so every latitude/longitude on the globe, plus a full
// neighborhood around it, stays addressable.
//
// `CellTable` is the canonical-cell table: the first lookup of (i, j)
// inserts the cell, later lookups return the same stored entry. It is part
// of the persisted state (the "known cells" field of the memento).
//
// See also: `cache.rs` for the neighborhood built from cells, `types.rs`
// for `Cell` / `CellBounds`.

use crate::error::WorldError;
use crate::types::{Cell, CellBounds, LatLng};
use std::collections::BTreeMap;

/// Tolerance, in tile units, for snapping onto a grid line.
pub const SNAP_EPSILON: f64 = 1e-6;

/// Largest `|i|` or `|j|` of an addressable cell.
pub const MAX_CELL_INDEX: i32 = 1 << 30;

/// The fixed lat/lng <-> cell transform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Grid {
    pub origin: LatLng,
    pub tile_size: f64,
}

impl Grid {
    pub fn new(origin: LatLng, tile_size: f64) -> Self {
        Self { origin, tile_size }
    }

    /// Map a position to the cell containing it.
    pub fn coordinate_to_cell(&self, p: LatLng) -> Result<Cell, WorldError> {
        let i = snap_floor((p.lat - self.origin.lat) / self.tile_size);
        let j = snap_floor((p.lng - self.origin.lng) / self.tile_size);
        match (i, j) {
            (Some(i), Some(j)) => Ok(Cell::new(i, j)),
            _ => Err(WorldError::PositionOutOfRange(p)),
        }
    }

    /// The extent of `cell`: south-west corner inclusive, north-east corner
    /// exclusive.
    pub fn cell_to_bounds(&self, cell: Cell) -> CellBounds {
        CellBounds {
            south_west: self.corner(cell.i as f64, cell.j as f64),
            north_east: self.corner(cell.i as f64 + 1.0, cell.j as f64 + 1.0),
        }
    }

    /// Centre point of `cell`.
    pub fn cell_center(&self, cell: Cell) -> LatLng {
        LatLng::new(
            self.origin.lat + (cell.i as f64 + 0.5) * self.tile_size,
            self.origin.lng + (cell.j as f64 + 0.5) * self.tile_size,
        )
    }

    fn corner(&self, i: f64, j: f64) -> LatLng {
        LatLng::new(
            self.origin.lat + i * self.tile_size,
            self.origin.lng + j * self.tile_size,
        )
    }
}

/// Floor a tile-unit offset to a cell index, or `None` outside
/// `[-MAX_CELL_INDEX, MAX_CELL_INDEX]`.
fn snap_floor(t: f64) -> Option<i32> {
    let nearest = t.round();
    let index = if (t - nearest).abs() < SNAP_EPSILON {
        nearest
    } else {
        t.floor()
    };
    // NaN fails the comparison.
    if index.abs() <= MAX_CELL_INDEX as f64 {
        Some(index as i32)
    } else {
        None
    }
}

/// Canonical-cell table. Repeated lookups of the same coordinates return the
/// same stored `Cell`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CellTable {
    cells: BTreeMap<(i32, i32), Cell>,
}

impl CellTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up (i, j), inserting it on first use.
    pub fn canonicalize(&mut self, i: i32, j: i32) -> &Cell {
        self.cells.entry((i, j)).or_insert_with(|| Cell::new(i, j))
    }

    /// Look up a cell value, inserting it on first use.
    pub fn intern(&mut self, cell: Cell) -> &Cell {
        self.canonicalize(cell.i, cell.j)
    }

    /// Look up (i, j) without inserting.
    pub fn get(&self, i: i32, j: i32) -> Option<&Cell> {
        self.cells.get(&(i, j))
    }

    pub fn contains(&self, cell: Cell) -> bool {
        self.cells.contains_key(&(cell.i, cell.j))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// All known cells in (i, j) order.
    pub fn iter(&self) -> impl Iterator<Item = &Cell> {
        self.cells.values()
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }
}

impl FromIterator<Cell> for CellTable {
    fn from_iter<T: IntoIterator<Item = Cell>>(iter: T) -> Self {
        let mut table = Self::new();
        for cell in iter {
            table.intern(cell);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn campus_grid() -> Grid {
        Grid::new(LatLng::new(36.9895, -122.0628), 1e-4)
    }

    #[test]
    fn origin_is_cell_zero() {
        let g = campus_grid();
        assert_eq!(g.coordinate_to_cell(g.origin), Ok(Cell::new(0, 0)));
    }

    #[test]
    fn negative_offsets_floor_downward() {
        let g = campus_grid();
        let p = LatLng::new(g.origin.lat - 0.5e-4, g.origin.lng - 2.5e-4);
        assert_eq!(g.coordinate_to_cell(p), Ok(Cell::new(-1, -3)));
    }

    #[test]
    fn one_tile_steps_land_in_neighbour_cells() {
        let g = campus_grid();
        let mut p = g.origin;
        for k in 1..=500 {
            p.lat += g.tile_size;
            assert_eq!(g.coordinate_to_cell(p), Ok(Cell::new(k, 0)));
        }
        for k in (0..500).rev() {
            p.lat -= g.tile_size;
            assert_eq!(g.coordinate_to_cell(p), Ok(Cell::new(k, 0)));
        }
    }

    #[test]
    fn bounds_are_inverse_of_forward_transform() {
        let g = campus_grid();
        for cell in [Cell::new(0, 0), Cell::new(7, -3), Cell::new(-12, 40)] {
            let b = g.cell_to_bounds(cell);
            assert_eq!(g.coordinate_to_cell(b.south_west), Ok(cell));
            assert_eq!(g.coordinate_to_cell(g.cell_center(cell)), Ok(cell));
            // The north-east corner belongs to the diagonal neighbour.
            assert_eq!(
                g.coordinate_to_cell(b.north_east),
                Ok(Cell::new(cell.i + 1, cell.j + 1))
            );
            assert!(b.contains(g.cell_center(cell)));
        }
    }

    #[test]
    fn bounds_span_one_tile() {
        let g = campus_grid();
        let b = g.cell_to_bounds(Cell::new(2, -5));
        assert!((b.north_east.lat - b.south_west.lat - g.tile_size).abs() < 1e-12);
        assert!((b.north_east.lng - b.south_west.lng - g.tile_size).abs() < 1e-12);
        assert!((b.south_west.lat - (g.origin.lat + 2.0 * g.tile_size)).abs() < 1e-12);
        assert!((b.south_west.lng - (g.origin.lng - 5.0 * g.tile_size)).abs() < 1e-12);
    }

    #[test]
    fn positions_off_the_grid_are_rejected() {
        let g = campus_grid();
        for p in [
            LatLng::new(1e300, 0.0),
            LatLng::new(0.0, -1e300),
            LatLng::new(f64::NAN, g.origin.lng),
            LatLng::new(g.origin.lat, f64::INFINITY),
        ] {
            assert!(matches!(
                g.coordinate_to_cell(p),
                Err(WorldError::PositionOutOfRange(_))
            ));
        }
    }

    #[test]
    fn grid_edge_is_inclusive() {
        let g = Grid::new(LatLng::new(0.0, 0.0), 1.0);
        let edge = MAX_CELL_INDEX as f64;
        assert_eq!(
            g.coordinate_to_cell(LatLng::new(edge + 0.5, -edge)),
            Ok(Cell::new(MAX_CELL_INDEX, -MAX_CELL_INDEX))
        );
        assert!(g.coordinate_to_cell(LatLng::new(edge + 1.0, 0.0)).is_err());
        assert!(g.coordinate_to_cell(LatLng::new(-edge - 0.5, 0.0)).is_err());
    }

    #[test]
    fn bounds_of_extreme_cells_do_not_overflow() {
        let g = campus_grid();
        for cell in [Cell::new(i32::MAX, i32::MAX), Cell::new(i32::MIN, i32::MIN)] {
            let b = g.cell_to_bounds(cell);
            assert!(b.north_east.lat > b.south_west.lat);
            assert!(b.north_east.lng > b.south_west.lng);
        }
    }

    #[test]
    fn canonicalize_returns_same_entry() {
        let mut table = CellTable::new();
        let first: *const Cell = table.canonicalize(3, -4);
        let second: *const Cell = table.canonicalize(3, -4);
        assert!(std::ptr::eq(first, second));
        assert_eq!(table.len(), 1);
        assert_eq!(*table.intern(Cell::new(3, -4)), Cell::new(3, -4));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn get_does_not_insert() {
        let mut table = CellTable::new();
        assert!(table.get(1, 1).is_none());
        assert!(table.is_empty());
        table.canonicalize(1, 1);
        assert_eq!(table.get(1, 1), Some(&Cell::new(1, 1)));
    }

    #[test]
    fn table_collects_and_deduplicates() {
        let table: CellTable = [Cell::new(1, 0), Cell::new(0, 1), Cell::new(1, 0)]
            .into_iter()
            .collect();
        let cells: Vec<Cell> = table.iter().copied().collect();
        assert_eq!(cells, vec![Cell::new(0, 1), Cell::new(1, 0)]);
    }
}
