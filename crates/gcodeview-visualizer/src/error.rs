//! Error types for model loading and sharing.

use thiserror::Error;

/// Errors surfaced by the tessellation loader.
///
/// Geometry-level anomalies (zero-radius arcs, degenerate segments,
/// out-of-range cursors) are absorbed where they occur and never reach
/// this type; only allocation failure and structural misuse do.
#[derive(Error, Debug)]
pub enum LoadError {
    /// Growing a backing array failed. The load cannot continue and no
    /// partial-state recovery is attempted.
    #[error("out of memory growing {buffer} buffer to {requested} elements")]
    OutOfMemory {
        buffer: &'static str,
        requested: usize,
    },

    /// The model's buffers were shared (via `try_copy`) while a load was
    /// still writing to them.
    #[error("model buffers are shared while a load is in progress")]
    SharedDuringLoad,
}

/// Errors surfaced by model accessors outside the load path.
#[derive(Error, Debug)]
pub enum ModelError {
    /// `try_copy` was called before the load finished.
    #[error("model copy requested before the load finished")]
    NotFullyLoaded,

    /// A mutation requires exclusive buffer ownership but read-only
    /// copies exist.
    #[error("model buffers are shared read-only and cannot be mutated")]
    BuffersShared,
}
