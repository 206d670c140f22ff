//! Toolpath color palette.
//!
//! Per-vertex colors baked at load time come from the tool palette;
//! printed/current-layer band colors are applied at draw time over
//! ranges of the index arrays, not stored in the color buffer.

use serde::{Deserialize, Serialize};

pub type Rgba = [f32; 4];

/// Color assignments for the toolpath bands and per-tool extrusion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorScheme {
    pub travel: Rgba,
    /// Extrusion color per tool; tools past the last entry reuse it.
    pub tools: Vec<Rgba>,
    pub printed: Rgba,
    pub current: Rgba,
    pub current_printed: Rgba,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            travel: [0.6, 0.6, 0.6, 0.6],
            tools: vec![
                [1.0, 0.0, 0.0, 1.0],
                [0.67, 0.05, 0.9, 1.0],
                [1.0, 0.8, 0.0, 1.0],
                [1.0, 0.0, 0.62, 1.0],
                [0.0, 1.0, 0.58, 1.0],
            ],
            printed: [0.2, 0.75, 0.0, 1.0],
            current: [0.0, 0.9, 1.0, 1.0],
            current_printed: [0.1, 0.4, 0.0, 1.0],
        }
    }
}

impl ColorScheme {
    /// Color for one movement, keyed on tool number and whether the
    /// move extrudes.
    pub fn movement_color(&self, tool: u8, extruding: bool) -> Rgba {
        if !extruding {
            return self.travel;
        }
        let idx = (tool as usize).min(self.tools.len().saturating_sub(1));
        self.tools.get(idx).copied().unwrap_or(self.travel)
    }
}
