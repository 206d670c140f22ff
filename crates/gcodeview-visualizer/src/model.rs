//! Incremental toolpath model: a shared mesh built layer by layer while
//! renderers read consistent snapshots.
//!
//! One mutex guards the whole model state. The loader holds it for the
//! duration of one layer's commands, so a concurrent reader is blocked
//! for at most one layer's processing time. Readers snapshot
//! `layers_loaded` under the same lock before touching the index
//! arrays, which keeps them off the growing tail.

use crate::buffer::MeshBuffer;
use crate::colors::{ColorScheme, Rgba};
use crate::error::{LoadError, ModelError};
use crate::index::DrawRangeIndex;
use crate::tessellate::{
    FullExtrusionStrategy, LineOnlyStrategy, PathStep, PrimitiveKind, Tessellator,
    DEFAULT_PATH_HALFHEIGHT, DEFAULT_PATH_HALFWIDTH,
};
use crate::arc::ArcInterpolator;
use gcodeview_core::{Bounds, SharedProgram};
use glam::Vec3;
use std::sync::{Arc, Mutex};
use tracing::{debug, trace};

/// Which tessellation strategy a model uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TessellationMode {
    /// Mitered-box extrusion mesh.
    #[default]
    Full,
    /// Plain line segments, for cheap previews.
    LineOnly,
}

/// How a draw span is colored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpanColor {
    /// Per-vertex colors baked into the color buffer at load time.
    Buffered,
    /// Constant override for the whole span.
    Constant(Rgba),
}

/// One contiguous range of geometry to draw.
///
/// For `Triangles` spans, `start..end` addresses the triangle index
/// array and `min_vertex..max_vertex` bounds the vertices those indices
/// reference. For `Lines` spans, `start..end` addresses vertices
/// directly and the vertex bounds repeat it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawSpan {
    pub primitive: PrimitiveKind,
    pub color: SpanColor,
    pub start: usize,
    pub end: usize,
    pub min_vertex: usize,
    pub max_vertex: usize,
}

/// Everything a render pass needs for one frame, computed under the
/// model lock from a consistent snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrawPlan {
    /// Line span over the travel buffer, when travel display is on.
    pub travel: Option<DrawSpan>,
    /// Print spans in back-to-front band order.
    pub spans: Vec<DrawSpan>,
}

struct ModelState {
    buffer: Arc<MeshBuffer>,
    index: DrawRangeIndex,
    colors: ColorScheme,
    primitive: PrimitiveKind,
    bounds: Bounds,
    program: Option<SharedProgram>,
    path_halfwidth: f32,
    path_halfheight: f32,
    max_layers: usize,
    /// Layers whose geometry the renderer has picked up; draw plans
    /// never reach past this.
    layers_loaded: usize,
    num_layers_to_draw: usize,
    printed_until: usize,
    only_current: bool,
    display_travels: bool,
    loaded: bool,
    fully_loaded: bool,
}

impl ModelState {
    fn new(primitive: PrimitiveKind) -> Self {
        Self {
            buffer: Arc::new(MeshBuffer::new()),
            index: DrawRangeIndex::new(),
            colors: ColorScheme::default(),
            primitive,
            bounds: Bounds::new(),
            program: None,
            path_halfwidth: DEFAULT_PATH_HALFWIDTH,
            path_halfheight: DEFAULT_PATH_HALFHEIGHT,
            max_layers: 0,
            layers_loaded: 0,
            num_layers_to_draw: 1,
            printed_until: 0,
            only_current: false,
            display_travels: true,
            loaded: false,
            fully_loaded: false,
        }
    }

    /// Span over command slots `start..=end`, or `None` when the range
    /// holds no geometry.
    fn print_span(&self, start: usize, end: usize, color: SpanColor) -> Option<DrawSpan> {
        match self.primitive {
            PrimitiveKind::Triangles => {
                let (lo, hi) = self.index.print_index_range(start, end)?;
                let (vlo, vhi) = self.index.print_vertex_range(start, end);
                Some(DrawSpan {
                    primitive: PrimitiveKind::Triangles,
                    color,
                    start: lo,
                    end: hi,
                    min_vertex: vlo,
                    max_vertex: vhi,
                })
            }
            PrimitiveKind::Lines => {
                let (lo, hi) = self.index.print_vertex_range(start, end);
                if hi == lo {
                    return None;
                }
                Some(DrawSpan {
                    primitive: PrimitiveKind::Lines,
                    color,
                    start: lo,
                    end: hi,
                    min_vertex: lo,
                    max_vertex: hi,
                })
            }
        }
    }

    fn travel_span(&self) -> Option<DrawSpan> {
        if !self.display_travels {
            return None;
        }
        let max_layers = self.layers_loaded;
        let end = self.index.layer_stops[self.num_layers_to_draw.min(max_layers)];
        let end_vertex = self.index.travel_vertices_until(end);
        let start_vertex = if self.only_current {
            if self.num_layers_to_draw >= max_layers {
                return None;
            }
            let end_prev_layer = self.index.layer_stops[self.num_layers_to_draw - 1];
            self.index.travel_vertices_until(end_prev_layer)
        } else {
            0
        };
        if end_vertex == start_vertex {
            return None;
        }
        Some(DrawSpan {
            primitive: PrimitiveKind::Lines,
            color: SpanColor::Constant(self.colors.travel),
            start: start_vertex,
            end: end_vertex,
            min_vertex: start_vertex,
            max_vertex: end_vertex,
        })
    }

    /// Split the loaded geometry into printed / unprinted / current
    /// layer bands from the two draw cursors. Cursors past the loaded
    /// data clamp silently.
    fn plan(&self) -> DrawPlan {
        let mut plan = DrawPlan {
            travel: self.travel_span(),
            spans: Vec::new(),
        };
        let max_layers = self.layers_loaded;
        let layer_selected = self.num_layers_to_draw <= max_layers;
        let end_prev_layer = if layer_selected {
            self.index.layer_stops[self.num_layers_to_draw - 1]
        } else {
            0
        };
        let end = self.index.layer_stops[self.num_layers_to_draw.min(max_layers)];
        let mut cur_end = self.printed_until.min(end);

        let printed = SpanColor::Constant(self.colors.printed);
        if !self.only_current {
            if end_prev_layer >= 1 && end_prev_layer <= cur_end {
                plan.spans.extend(self.print_span(1, end_prev_layer, printed));
            } else if cur_end >= 1 {
                plan.spans.extend(self.print_span(1, cur_end, printed));
            }
        }

        let start = cur_end.max(1);
        if end_prev_layer >= start {
            if !self.only_current {
                plan.spans
                    .extend(self.print_span(start, end_prev_layer, SpanColor::Buffered));
            }
            cur_end = end_prev_layer;
        }

        if layer_selected {
            if cur_end > end_prev_layer {
                plan.spans.extend(self.print_span(
                    end_prev_layer + 1,
                    cur_end,
                    SpanColor::Constant(self.colors.current_printed),
                ));
            }
            if end > cur_end {
                plan.spans.extend(self.print_span(
                    cur_end + 1,
                    end,
                    SpanColor::Constant(self.colors.current),
                ));
            }
        }

        let start = self.printed_until.max(1);
        if !layer_selected && end >= start {
            plan.spans
                .extend(self.print_span(start, end, SpanColor::Buffered));
        }
        plan
    }
}

/// Handle to one toolpath model, shareable across threads.
#[derive(Clone)]
pub struct GcodeModel {
    state: Arc<Mutex<ModelState>>,
    mode: TessellationMode,
}

fn lock(state: &Mutex<ModelState>) -> std::sync::MutexGuard<'_, ModelState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

impl GcodeModel {
    pub fn new(mode: TessellationMode) -> Self {
        let primitive = match mode {
            TessellationMode::Full => PrimitiveKind::Triangles,
            TessellationMode::LineOnly => PrimitiveKind::Lines,
        };
        Self {
            state: Arc::new(Mutex::new(ModelState::new(primitive))),
            mode,
        }
    }

    /// Cross-section half extents used by the full strategy. Takes
    /// effect on the next load.
    pub fn set_path_size(&self, halfwidth: f32, halfheight: f32) {
        let mut state = lock(&self.state);
        state.path_halfwidth = halfwidth;
        state.path_halfheight = halfheight;
    }

    pub fn set_colors(&self, colors: ColorScheme) {
        lock(&self.state).colors = colors;
    }

    /// Begin loading `program`, discarding any previously loaded
    /// geometry. Copies taken earlier keep the old buffers. The
    /// returned loader is driven by calling [`ModelLoader::advance`]
    /// once per layer.
    pub fn start_load(&self, program: SharedProgram) -> ModelLoader {
        let strategy: Box<dyn Tessellator + Send> = {
            let mut state = lock(&self.state);
            state.buffer = Arc::new(MeshBuffer::new());
            state.index = DrawRangeIndex::new();
            state.program = Some(program.clone());
            state.max_layers = 0;
            state.layers_loaded = 0;
            state.num_layers_to_draw = 1;
            state.printed_until = 0;
            state.loaded = false;
            state.fully_loaded = false;
            match self.mode {
                TessellationMode::Full => Box::new(FullExtrusionStrategy::new(
                    state.path_halfwidth,
                    state.path_halfheight,
                )),
                TessellationMode::LineOnly => Box::new(LineOnlyStrategy::new()),
            }
        };
        ModelLoader {
            model: self.clone(),
            program,
            strategy,
            layer_idx: 0,
            processed_lines: 0,
            prev_resolved: Vec3::ZERO,
            finished: false,
        }
    }

    pub fn max_layers(&self) -> usize {
        lock(&self.state).max_layers
    }

    pub fn layers_loaded(&self) -> usize {
        lock(&self.state).layers_loaded
    }

    pub fn loaded(&self) -> bool {
        lock(&self.state).loaded
    }

    pub fn fully_loaded(&self) -> bool {
        lock(&self.state).fully_loaded
    }

    pub fn bounds(&self) -> Bounds {
        lock(&self.state).bounds
    }

    pub fn primitive(&self) -> PrimitiveKind {
        lock(&self.state).primitive
    }

    /// Select how many layers to render. Clamped to `1..=max_layers +
    /// 1`; values at the top of the range mean "draw everything".
    pub fn set_num_layers_to_draw(&self, n: usize) {
        let mut state = lock(&self.state);
        state.num_layers_to_draw = n.clamp(1, state.max_layers + 1);
    }

    /// Command-slot position the physical print job has reached.
    /// Out-of-range values are accepted and clamp at draw time.
    pub fn set_printed_until(&self, slot: usize) {
        lock(&self.state).printed_until = slot;
    }

    pub fn set_only_current(&self, only: bool) {
        lock(&self.state).only_current = only;
    }

    pub fn set_display_travels(&self, display: bool) {
        lock(&self.state).display_travels = display;
    }

    /// Read the current buffers and index under the model lock.
    pub fn read<R>(&self, f: impl FnOnce(&MeshBuffer, &DrawRangeIndex) -> R) -> R {
        let state = lock(&self.state);
        f(&state.buffer, &state.index)
    }

    /// Hand the buffers to a renderer for upload and commit the layer
    /// count it saw. Draw plans issued afterwards cover everything
    /// loaded up to this point and nothing newer.
    pub fn upload<R>(&self, f: impl FnOnce(&MeshBuffer) -> R) -> R {
        let mut state = lock(&self.state);
        state.layers_loaded = state.max_layers;
        f(&state.buffer)
    }

    /// Compute the draw bands for the current cursors.
    pub fn draw_plan(&self) -> DrawPlan {
        lock(&self.state).plan()
    }

    /// Cheap copy sharing the finished buffers. Fails while a load is
    /// in progress; the copy and the original are read-only thereafter.
    pub fn try_copy(&self) -> Result<GcodeModel, ModelError> {
        let state = lock(&self.state);
        if !state.fully_loaded {
            return Err(ModelError::NotFullyLoaded);
        }
        let copy = ModelState {
            buffer: Arc::clone(&state.buffer),
            index: state.index.clone(),
            colors: state.colors.clone(),
            primitive: state.primitive,
            bounds: state.bounds,
            program: state.program.clone(),
            path_halfwidth: state.path_halfwidth,
            path_halfheight: state.path_halfheight,
            max_layers: state.max_layers,
            layers_loaded: 0,
            num_layers_to_draw: state.num_layers_to_draw,
            printed_until: state.printed_until,
            only_current: state.only_current,
            display_travels: state.display_travels,
            loaded: true,
            fully_loaded: true,
        };
        Ok(GcodeModel {
            state: Arc::new(Mutex::new(copy)),
            mode: self.mode,
        })
    }

    /// Rebake the per-vertex color buffer from a new scheme without
    /// re-tessellating. Requires a completed load and exclusive buffer
    /// ownership.
    pub fn update_colors(&self, scheme: ColorScheme) -> Result<(), ModelError> {
        let mut state = lock(&self.state);
        let state = &mut *state;
        if !state.fully_loaded {
            return Err(ModelError::NotFullyLoaded);
        }
        let Some(program) = state.program.clone() else {
            return Err(ModelError::NotFullyLoaded);
        };
        let buf = Arc::get_mut(&mut state.buffer).ok_or(ModelError::BuffersShared)?;
        let program = program.read().unwrap_or_else(|e| e.into_inner());
        let mut cur_vertex = 0usize;
        for layer in &program.layers {
            for cmd in &layer.commands {
                let Some(slot) = cmd.end_vertex_index else {
                    continue;
                };
                // Back-references written by an earlier load can
                // outlive the command in the program; anything past the
                // current index was not tessellated this load.
                if slot > state.index.last_slot() {
                    continue;
                }
                let color = scheme.movement_color(cmd.current_tool, cmd.extruding);
                let last_vertex = state.index.count_print_vertices[slot];
                while cur_vertex < last_vertex {
                    buf.colors[cur_vertex * 4..cur_vertex * 4 + 4].copy_from_slice(&color);
                    cur_vertex += 1;
                }
            }
        }
        state.colors = scheme;
        Ok(())
    }
}

/// Progress report from one loader step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadProgress {
    /// One more layer has been tessellated and committed.
    Layer(usize),
    /// Every layer present in the program has been processed and the
    /// buffers are trimmed.
    Finished,
}

/// Drives the tessellation of one program into one model, one layer per
/// call. The program may still be growing on another thread; the loader
/// re-reads its length each step and finishes when it has caught up.
pub struct ModelLoader {
    model: GcodeModel,
    program: SharedProgram,
    strategy: Box<dyn Tessellator + Send>,
    layer_idx: usize,
    processed_lines: usize,
    prev_resolved: Vec3,
    finished: bool,
}

impl ModelLoader {
    /// Tessellate the next layer inside one exclusive critical section.
    pub fn advance(&mut self) -> Result<LoadProgress, LoadError> {
        if self.finished {
            return Ok(LoadProgress::Finished);
        }
        let layer_count = self
            .program
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .layer_count();
        if self.layer_idx >= layer_count {
            return self.finish();
        }

        {
            let mut state = lock(&self.model.state);
            let state = &mut *state;
            let mut program = self.program.write().unwrap_or_else(|e| e.into_inner());
            let buf = Arc::get_mut(&mut state.buffer).ok_or(LoadError::SharedDuringLoad)?;

            // Only reserve for lines not yet processed; the program may
            // have grown since the previous layer.
            let remaining = program.line_count().saturating_sub(self.processed_lines);
            buf.reserve_for_commands(remaining)?;

            let layer_len = program.layers[self.layer_idx].commands.len();
            let mut has_movement = false;
            for cmd_idx in 0..layer_len {
                let cmd = program.layers[self.layer_idx].commands[cmd_idx].clone();
                if !cmd.is_move || !cmd.has_motion_words() {
                    continue;
                }
                has_movement = true;
                let next_extruding = program
                    .next_move(self.layer_idx, cmd_idx)
                    .map(|m| m.extruding)
                    .unwrap_or(false);
                let color = state.colors.movement_color(cmd.current_tool, cmd.extruding);

                let interpolator = ArcInterpolator::new(&cmd, self.prev_resolved);
                if cmd.kind.is_arc() {
                    trace!(
                        segments = interpolator.segment_count(),
                        sweep = interpolator.sweep(),
                        "flattening arc"
                    );
                }
                for point in interpolator {
                    self.strategy.step(
                        buf,
                        PathStep {
                            point,
                            extruding: cmd.extruding,
                            next_is_extruding: point.interpolated || next_extruding,
                            color,
                        },
                    )?;
                }

                let slot = state.index.record_command(
                    buf.vertex_count(),
                    buf.index_count(),
                    buf.travel_vertex_count(),
                );
                program.layers[self.layer_idx].commands[cmd_idx].end_vertex_index = Some(slot);
                self.prev_resolved = cmd.resolved();
            }

            if has_movement {
                state.index.close_layer();
                state.max_layers = state.index.max_layers();
                state.num_layers_to_draw = state.max_layers + 1;
                state.loaded = true;
            }
            self.processed_lines += layer_len;
        }

        debug!(layer = self.layer_idx, "tessellated layer");
        let done = self.layer_idx;
        self.layer_idx += 1;
        Ok(LoadProgress::Layer(done))
    }

    /// Drive the load to completion.
    pub fn run(&mut self) -> Result<(), LoadError> {
        while self.advance()? != LoadProgress::Finished {}
        Ok(())
    }

    /// Drive the load to completion, reporting each processed layer.
    pub fn run_with_progress(
        &mut self,
        mut progress: impl FnMut(usize),
    ) -> Result<(), LoadError> {
        loop {
            match self.advance()? {
                LoadProgress::Layer(idx) => progress(idx),
                LoadProgress::Finished => return Ok(()),
            }
        }
    }

    fn finish(&mut self) -> Result<LoadProgress, LoadError> {
        let mut state = lock(&self.model.state);
        let state = &mut *state;
        let buf = Arc::get_mut(&mut state.buffer).ok_or(LoadError::SharedDuringLoad)?;
        buf.trim();
        state.bounds = self.program.read().unwrap_or_else(|e| e.into_inner()).bounds;
        state.loaded = true;
        state.fully_loaded = true;
        debug!(
            vertices = buf.vertex_count() + buf.travel_vertex_count(),
            layers = state.max_layers,
            "toolpath model loaded"
        );
        self.finished = true;
        Ok(LoadProgress::Finished)
    }
}
