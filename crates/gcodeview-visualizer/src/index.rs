//! Cumulative per-command geometry counts and per-layer stop offsets.
//!
//! Draw calls address sub-ranges of the mesh by command slot. Slot 0 is
//! a sentinel so that ranges can be expressed as `counts[end] -
//! counts[start - 1]` without special-casing the first command.

/// Monotone cumulative counts recorded once per movement command, plus
/// the command-slot offset at which each completed layer ends.
///
/// `layer_stops[0] == 0` and `layer_stops.len() == max_layers + 1`.
#[derive(Debug, Clone)]
pub struct DrawRangeIndex {
    /// Cumulative print vertex count after each command slot.
    pub count_print_vertices: Vec<usize>,
    /// Cumulative print triangle-index count after each command slot.
    pub count_print_indices: Vec<usize>,
    /// Cumulative travel vertex count after each command slot.
    pub count_travel_vertices: Vec<usize>,
    /// Command slot at which each completed layer ends.
    pub layer_stops: Vec<usize>,
}

impl Default for DrawRangeIndex {
    fn default() -> Self {
        Self {
            count_print_vertices: vec![0],
            count_print_indices: vec![0],
            count_travel_vertices: vec![0],
            layer_stops: vec![0],
        }
    }
}

impl DrawRangeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the cumulative totals after one movement command and
    /// return the command's slot number.
    pub fn record_command(
        &mut self,
        print_vertices: usize,
        print_indices: usize,
        travel_vertices: usize,
    ) -> usize {
        debug_assert!(print_vertices >= *self.count_print_vertices.last().unwrap_or(&0));
        self.count_print_vertices.push(print_vertices);
        self.count_print_indices.push(print_indices);
        self.count_travel_vertices.push(travel_vertices);
        self.count_print_indices.len() - 1
    }

    /// Mark the current command slot as the end of a layer.
    pub fn close_layer(&mut self) {
        self.layer_stops.push(self.count_print_indices.len() - 1);
    }

    /// Number of completed layers.
    pub fn max_layers(&self) -> usize {
        self.layer_stops.len() - 1
    }

    /// Last recorded command slot.
    pub fn last_slot(&self) -> usize {
        self.count_print_indices.len() - 1
    }

    /// Triangle-index range covering command slots `start..=end`
    /// (1-based, inclusive). Returns `None` when the range holds no
    /// print geometry, so empty layers are skipped rather than issued
    /// as zero-length draws.
    pub fn print_index_range(&self, start: usize, end: usize) -> Option<(usize, usize)> {
        debug_assert!(start >= 1);
        let lo = self.count_print_indices[start - 1];
        let hi = self.count_print_indices[end];
        if hi == lo {
            return None;
        }
        Some((lo, hi))
    }

    /// Print vertex range covering command slots `start..=end`.
    pub fn print_vertex_range(&self, start: usize, end: usize) -> (usize, usize) {
        debug_assert!(start >= 1);
        (
            self.count_print_vertices[start - 1],
            self.count_print_vertices[end],
        )
    }

    /// Travel vertex count up to and including command slot `end`.
    pub fn travel_vertices_until(&self, end: usize) -> usize {
        self.count_travel_vertices[end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_slot_zero() {
        let idx = DrawRangeIndex::new();
        assert_eq!(idx.max_layers(), 0);
        assert_eq!(idx.last_slot(), 0);
        assert_eq!(idx.layer_stops[0], 0);
    }

    #[test]
    fn record_returns_consecutive_slots() {
        let mut idx = DrawRangeIndex::new();
        assert_eq!(idx.record_command(8, 24, 0), 1);
        assert_eq!(idx.record_command(16, 48, 0), 2);
        assert_eq!(idx.record_command(16, 48, 2), 3);
        idx.close_layer();
        assert_eq!(idx.max_layers(), 1);
        assert_eq!(idx.layer_stops, vec![0, 3]);
    }

    #[test]
    fn ranges_subtract_sentinel() {
        let mut idx = DrawRangeIndex::new();
        idx.record_command(8, 24, 0);
        idx.record_command(16, 48, 0);
        assert_eq!(idx.print_index_range(1, 2), Some((0, 48)));
        assert_eq!(idx.print_index_range(2, 2), Some((24, 48)));
        assert_eq!(idx.print_vertex_range(2, 2), (8, 16));
    }

    #[test]
    #[should_panic]
    fn slot_zero_is_not_a_valid_range_start() {
        let idx = DrawRangeIndex::new();
        let _ = idx.print_index_range(0, 0);
    }

    #[test]
    fn empty_range_is_none() {
        let mut idx = DrawRangeIndex::new();
        idx.record_command(0, 0, 2);
        assert_eq!(idx.print_index_range(1, 1), None);
        assert_eq!(idx.travel_vertices_until(1), 2);
    }
}
