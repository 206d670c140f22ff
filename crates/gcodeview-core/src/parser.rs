//! Text parser resolving G-code lines into layered motion commands.
//!
//! Deliberately small: absolute positioning (G90) with absolute E, the
//! motion words the visualizer needs, tool selection, and G92 axis
//! resets. Malformed coordinate words are skipped, never fatal.

use crate::command::{MotionCommand, MotionKind};
use crate::error::{ProgramError, Result};
use crate::program::{GcodeProgram, Layer};
use std::path::Path;
use tracing::debug;

struct ParserState {
    x: f32,
    y: f32,
    z: f32,
    e: f32,
    tool: u8,
}

/// Extract the numeric command code from a line starting with `G`.
fn gcode_number(line: &str) -> Option<u32> {
    let after_g = line.strip_prefix('G')?;
    let end = after_g
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(after_g.len());
    if end == 0 {
        return None;
    }
    after_g[..end].parse::<u32>().ok()
}

fn word_value(part: &str) -> Option<f32> {
    part[1..].parse::<f32>().ok()
}

/// Parse a complete G-code text into a layered program.
///
/// Layers split whenever a move resolves to a new Z height. Lines that
/// are not motion commands are kept as non-move entries so that command
/// counts line up with the source file.
pub fn parse_program(text: &str) -> GcodeProgram {
    let mut program = GcodeProgram::new();
    let mut state = ParserState {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        e: 0.0,
        tool: 0,
    };
    let mut layer = Layer::new(0.0);

    for raw in text.lines() {
        // Strip inline comments before tokenizing.
        let line = match raw.find(';') {
            Some(pos) => raw[..pos].trim(),
            None => raw.trim(),
        };
        if line.is_empty() || line.starts_with('(') {
            layer.commands.push(MotionCommand::non_move());
            continue;
        }

        if let Some(rest) = line.strip_prefix('T') {
            if let Ok(tool) = rest.trim().parse::<u8>() {
                state.tool = tool;
            }
            layer.commands.push(MotionCommand::non_move());
            continue;
        }

        match gcode_number(line) {
            Some(code @ 0..=3) => {
                let cmd = parse_move(line, code, &mut state);
                if let Some(z) = cmd.z {
                    if z != layer.z && !layer.commands.is_empty() {
                        program.layers.push(std::mem::replace(&mut layer, Layer::new(z)));
                    } else {
                        layer.z = z;
                    }
                }
                if cmd.extruding {
                    program
                        .bounds
                        .update(cmd.current_x, cmd.current_y, cmd.current_z);
                }
                layer.commands.push(cmd);
            }
            Some(92) => {
                // G92: redefine the current position without motion.
                for part in line.split_whitespace().skip(1) {
                    if part.len() < 2 {
                        continue;
                    }
                    let Some(value) = word_value(part) else {
                        continue;
                    };
                    match part.as_bytes()[0] {
                        b'X' => state.x = value,
                        b'Y' => state.y = value,
                        b'Z' => state.z = value,
                        b'E' => state.e = value,
                        _ => {}
                    }
                }
                layer.commands.push(MotionCommand::non_move());
            }
            _ => layer.commands.push(MotionCommand::non_move()),
        }
    }

    if !layer.commands.is_empty() {
        program.layers.push(layer);
    }

    debug!(
        layers = program.layer_count(),
        lines = program.line_count(),
        "parsed G-code program"
    );
    program
}

fn parse_move(line: &str, code: u32, state: &mut ParserState) -> MotionCommand {
    let mut cmd = MotionCommand::non_move();
    cmd.is_move = true;
    cmd.kind = match code {
        2 => MotionKind::ArcCw,
        3 => MotionKind::ArcCcw,
        _ => MotionKind::Linear,
    };
    cmd.current_tool = state.tool;

    let mut e_word = None;
    for part in line.split_whitespace().skip(1) {
        if part.len() < 2 {
            continue;
        }
        let Some(value) = word_value(part) else {
            continue;
        };
        match part.as_bytes()[0] {
            b'X' => cmd.x = Some(value),
            b'Y' => cmd.y = Some(value),
            b'Z' => cmd.z = Some(value),
            b'I' => cmd.i = Some(value),
            b'J' => cmd.j = Some(value),
            b'E' => e_word = Some(value),
            _ => {}
        }
    }

    state.x = cmd.x.unwrap_or(state.x);
    state.y = cmd.y.unwrap_or(state.y);
    state.z = cmd.z.unwrap_or(state.z);
    cmd.current_x = state.x;
    cmd.current_y = state.y;
    cmd.current_z = state.z;

    if let Some(e) = e_word {
        cmd.extruding = e > state.e;
        state.e = e;
    }
    cmd
}

/// Read and parse a G-code file.
pub fn load_program(path: impl AsRef<Path>) -> Result<GcodeProgram> {
    let text = std::fs::read_to_string(path)?;
    let program = parse_program(&text);
    if program.layers.iter().all(|l| !l.has_movement()) {
        return Err(ProgramError::NoMotion);
    }
    Ok(program)
}
