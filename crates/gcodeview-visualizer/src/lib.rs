//! # GcodeView Visualizer
//!
//! Incremental G-code toolpath tessellation for 3D print preview.
//! Converts a layered motion-command program into growable mesh
//! buffers, layer by layer, while renderers concurrently read
//! consistent snapshots split into printed / current / unprinted
//! draw bands.

pub mod arc;
pub mod buffer;
pub mod camera;
pub mod colors;
pub mod error;
pub mod index;
pub mod model;
pub mod tessellate;

pub use arc::{ArcInterpolator, PathPoint, MAX_SEGMENTS, MAX_SEGMENT_MM};
pub use buffer::MeshBuffer;
pub use camera::{Camera, ProjectionMode};
pub use colors::{ColorScheme, Rgba};
pub use error::{LoadError, ModelError};
pub use index::DrawRangeIndex;
pub use model::{
    DrawPlan, DrawSpan, GcodeModel, LoadProgress, ModelLoader, SpanColor, TessellationMode,
};
pub use tessellate::{
    triangulate_box, triangulate_rectangle, FullExtrusionStrategy, LineOnlyStrategy, PathStep,
    PrimitiveKind, Tessellator,
};
