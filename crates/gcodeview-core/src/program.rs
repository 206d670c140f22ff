//! Layered program container shared between parser and tessellator.

use crate::bounds::Bounds;
use crate::command::MotionCommand;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

/// An ordered run of commands sharing one Z height band.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    pub commands: Vec<MotionCommand>,
    /// Z height this layer was opened at.
    pub z: f32,
    /// Cumulative duration estimate, owned by an external time estimator.
    pub duration_estimate: Option<f32>,
}

impl Layer {
    pub fn new(z: f32) -> Self {
        Self {
            commands: Vec::new(),
            z,
            duration_estimate: None,
        }
    }

    /// True when the layer contains at least one move with coordinates.
    pub fn has_movement(&self) -> bool {
        self.commands
            .iter()
            .any(|c| c.is_move && c.has_motion_words())
    }
}

/// A parsed G-code program: ordered layers of motion commands plus a
/// bounding summary over the deposited toolpath.
///
/// A parser thread may still be appending layers while a consumer walks
/// the program; consumers must re-read [`GcodeProgram::line_count`] and
/// the layer count on every iteration step instead of caching them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GcodeProgram {
    pub layers: Vec<Layer>,
    pub bounds: Bounds,
}

impl GcodeProgram {
    pub fn new() -> Self {
        Self {
            layers: Vec::new(),
            bounds: Bounds::new(),
        }
    }

    /// Total number of commands across all layers, moves or not.
    pub fn line_count(&self) -> usize {
        self.layers.iter().map(|l| l.commands.len()).sum()
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// The next move command strictly after `(layer_idx, cmd_idx)`, if
    /// any. Used by the tessellator to decide whether an extrusion run
    /// ends and needs a cap.
    pub fn next_move(&self, mut layer_idx: usize, cmd_idx: usize) -> Option<&MotionCommand> {
        let mut idx = cmd_idx + 1;
        while layer_idx < self.layers.len() {
            let layer = &self.layers[layer_idx];
            while idx < layer.commands.len() {
                let cmd = &layer.commands[idx];
                if cmd.is_move {
                    return Some(cmd);
                }
                idx += 1;
            }
            layer_idx += 1;
            idx = 0;
        }
        None
    }
}

/// Handle letting a parser thread grow the program while the
/// tessellation loader reads it layer by layer.
pub type SharedProgram = Arc<RwLock<GcodeProgram>>;

/// Wrap a program for concurrent access.
pub fn shared(program: GcodeProgram) -> SharedProgram {
    Arc::new(RwLock::new(program))
}
