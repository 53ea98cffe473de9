// Terminal implementations of the session boundaries.
//
// `TextRenderer` keeps no visuals: it tracks the drawn regions and logs each
// render call at debug level (set `GEOCOIN_LOG=debug` to watch them).
// `StdinConfirm` asks on stdout and reads the answer from stdin.

use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};

use geocoin_sim::boundary::{Confirm, RegionHandle, RenderService};
use geocoin_sim::types::{Cell, CellBounds, LatLng};
use tracing::debug;

#[derive(Debug, Default)]
pub struct TextRenderer {
    regions: BTreeMap<RegionHandle, Cell>,
    next_handle: u64,
    trail_points: usize,
}

impl TextRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trail_points(&self) -> usize {
        self.trail_points
    }
}

impl RenderService for TextRenderer {
    fn draw_cache_region(&mut self, bounds: CellBounds, cell: Cell) -> RegionHandle {
        let handle = RegionHandle(self.next_handle);
        self.next_handle += 1;
        self.regions.insert(handle, cell);
        debug!(%cell, sw = %bounds.south_west, ne = %bounds.north_east, "draw region");
        handle
    }

    fn remove_cache_region(&mut self, handle: RegionHandle) {
        if let Some(cell) = self.regions.remove(&handle) {
            debug!(%cell, "remove region");
        }
    }

    fn set_player_marker_position(&mut self, position: LatLng) {
        debug!(%position, "marker");
    }

    fn set_map_view(&mut self, center: LatLng, zoom: u8) {
        debug!(%center, zoom, "view");
    }

    fn append_trail_point(&mut self, point: LatLng) {
        self.trail_points += 1;
        debug!(%point, "trail");
    }

    fn clear_trail(&mut self) {
        self.trail_points = 0;
        debug!("trail cleared");
    }
}

/// Reads a y/N answer from stdin. End of input counts as "no".
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&mut self, prompt: &str) -> bool {
        print!("{prompt} [y/N] ");
        // A failed flush only loses the prompt text.
        let _ = io::stdout().flush();
        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => is_yes(&answer),
            Err(_) => false,
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
