//! Motion command representation.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// How a motion command moves between its endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MotionKind {
    /// G0/G1 straight-line move.
    Linear,
    /// G2 clockwise circular interpolation.
    ArcCw,
    /// G3 counter-clockwise circular interpolation.
    ArcCcw,
}

impl MotionKind {
    pub fn is_arc(self) -> bool {
        !matches!(self, MotionKind::Linear)
    }
}

/// One resolved G-code motion line.
///
/// Created once by the parser with absolute `current_*` coordinates
/// already computed; `end_vertex_index` is filled in exactly once during
/// tessellation and read afterwards for print-progress mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotionCommand {
    /// True for G0..G3; false for every other line kept in the stream.
    pub is_move: bool,
    pub kind: MotionKind,
    /// Target coordinates as written; `None` means "unchanged".
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub z: Option<f32>,
    /// Arc center offsets relative to the start point.
    pub i: Option<f32>,
    pub j: Option<f32>,
    /// True when material is deposited along this move.
    pub extruding: bool,
    pub current_tool: u8,
    /// Absolute position after executing this command.
    pub current_x: f32,
    pub current_y: f32,
    pub current_z: f32,
    /// Slot in the draw-range index where this command's geometry ends.
    /// `None` until the command has been tessellated.
    pub end_vertex_index: Option<usize>,
}

impl MotionCommand {
    /// A non-move line (comment, temperature command, ...) kept only so
    /// line counts match the source file.
    pub fn non_move() -> Self {
        Self {
            is_move: false,
            kind: MotionKind::Linear,
            x: None,
            y: None,
            z: None,
            i: None,
            j: None,
            extruding: false,
            current_tool: 0,
            current_x: 0.0,
            current_y: 0.0,
            current_z: 0.0,
            end_vertex_index: None,
        }
    }

    /// True when the command carries at least one coordinate word.
    /// Moves without any are pure state changes (feed rate only) and
    /// produce no geometry.
    pub fn has_motion_words(&self) -> bool {
        self.x.is_some()
            || self.y.is_some()
            || self.z.is_some()
            || self.i.is_some()
            || self.j.is_some()
    }

    /// Absolute position after this command.
    pub fn resolved(&self) -> Vec3 {
        Vec3::new(self.current_x, self.current_y, self.current_z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_move_has_no_motion_words() {
        let cmd = MotionCommand::non_move();
        assert!(!cmd.is_move);
        assert!(!cmd.has_motion_words());
    }

    #[test]
    fn motion_words_detected() {
        let mut cmd = MotionCommand::non_move();
        cmd.is_move = true;
        cmd.j = Some(1.5);
        assert!(cmd.has_motion_words());
    }
}
