//! # GCodeView Core
//!
//! Data model for parsed G-code programs: motion commands, layers,
//! bounding summaries, and a compact text parser resolving absolute
//! positions. The tessellation engine in `gcodeview-visualizer` consumes
//! these types through a shared, concurrently growable program handle.

pub mod bounds;
pub mod command;
pub mod error;
pub mod parser;
pub mod program;

pub use bounds::Bounds;
pub use command::{MotionCommand, MotionKind};
pub use error::{ProgramError, Result};
pub use parser::{load_program, parse_program};
pub use program::{shared, GcodeProgram, Layer, SharedProgram};
