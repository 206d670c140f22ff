//! Growable tessellation output storage.
//!
//! Backing arrays grow geometrically ahead of the write cursor so that a
//! burst of arc-interpolated segments never reallocates mid-command, and
//! are trimmed to their exact used length once the load completes.

use crate::error::LoadError;
use glam::Vec3;
use tracing::debug;

/// Floats per position/normal entry.
pub const COORDS_PER_VERTEX: usize = 3;
/// Floats per color entry (RGBA).
pub const COLOR_COMPONENTS: usize = 4;

/// Worst-case print vertices one motion command can emit: two diamond
/// cross-sections of four vertices each.
pub const VERTICES_PER_LINE: usize = 8;
/// Worst-case triangle indices per command: two boxes of four quad faces.
pub const INDICES_PER_LINE: usize = 48;
/// Travel moves are plain line segments.
pub const TRAVEL_VERTICES_PER_LINE: usize = 2;

/// Headroom kept ahead of the write cursor, expressed in commands, so
/// capacity checks can run once per command rather than per point.
const SLACK_COMMANDS: usize = 100;

/// Geometric growth factor for backing arrays.
const GROWTH_FACTOR: usize = 2; // denominator: grow by len / 2 (x1.5)

fn grow<T>(vec: &mut Vec<T>, extra: usize, name: &'static str) -> Result<(), LoadError> {
    let needed = vec.len() + extra;
    if needed <= vec.capacity() {
        return Ok(());
    }
    let target = needed.max(vec.capacity() + vec.capacity() / GROWTH_FACTOR);
    debug!(
        buffer = name,
        from = vec.capacity(),
        to = target,
        "reallocating geometry buffer"
    );
    vec.try_reserve(target - vec.len())
        .map_err(|_| LoadError::OutOfMemory {
            buffer: name,
            requested: target,
        })
}

/// Tessellation output: parallel growable vertex attribute arrays, a
/// triangle index array, and a separate travel line-list array.
///
/// Invariants: `vertices.len() % 3 == 0`, `normals` (when used) and
/// `colors` describe the same vertex count as `vertices`, and every
/// entry of `indices` addresses an existing vertex.
#[derive(Debug, Clone, Default)]
pub struct MeshBuffer {
    pub vertices: Vec<f32>,
    pub normals: Vec<f32>,
    pub colors: Vec<f32>,
    pub indices: Vec<u32>,
    pub travels: Vec<f32>,
}

impl MeshBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / COORDS_PER_VERTEX
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn travel_vertex_count(&self) -> usize {
        self.travels.len() / COORDS_PER_VERTEX
    }

    /// Bulk pre-reservation from the number of commands still to be
    /// processed, called once per layer. Only reallocates memory which
    /// might actually be needed, not memory for everything.
    pub fn reserve_for_commands(&mut self, remaining: usize) -> Result<(), LoadError> {
        grow(
            &mut self.vertices,
            remaining * VERTICES_PER_LINE * COORDS_PER_VERTEX,
            "vertex",
        )?;
        grow(
            &mut self.normals,
            remaining * VERTICES_PER_LINE * COORDS_PER_VERTEX,
            "normal",
        )?;
        grow(
            &mut self.colors,
            remaining * VERTICES_PER_LINE * COLOR_COMPONENTS,
            "color",
        )?;
        grow(&mut self.indices, remaining * INDICES_PER_LINE, "index")?;
        grow(
            &mut self.travels,
            remaining * TRAVEL_VERTICES_PER_LINE * COORDS_PER_VERTEX,
            "travel",
        )
    }

    /// Guarantee room for one more print append plus arc-burst slack.
    pub fn ensure_print_headroom(
        &mut self,
        extra_coords: usize,
        extra_indices: usize,
    ) -> Result<(), LoadError> {
        let slack_coords = SLACK_COMMANDS * VERTICES_PER_LINE * COORDS_PER_VERTEX;
        grow(&mut self.vertices, extra_coords + slack_coords, "vertex")?;
        grow(&mut self.normals, extra_coords + slack_coords, "normal")?;
        let vertex_count = extra_coords / COORDS_PER_VERTEX;
        grow(
            &mut self.colors,
            vertex_count * COLOR_COMPONENTS + SLACK_COMMANDS * VERTICES_PER_LINE * COLOR_COMPONENTS,
            "color",
        )?;
        grow(
            &mut self.indices,
            extra_indices + SLACK_COMMANDS * INDICES_PER_LINE,
            "index",
        )
    }

    /// Guarantee room for one more travel segment plus arc-burst slack.
    pub fn ensure_travel_headroom(&mut self) -> Result<(), LoadError> {
        grow(
            &mut self.travels,
            (SLACK_COMMANDS + 1) * TRAVEL_VERTICES_PER_LINE * COORDS_PER_VERTEX,
            "travel",
        )
    }

    /// Guarantee room for one more line-list segment in the print
    /// arrays (line-only tessellation writes no normals or indices).
    pub fn ensure_line_headroom(&mut self) -> Result<(), LoadError> {
        grow(
            &mut self.vertices,
            (SLACK_COMMANDS + 1) * TRAVEL_VERTICES_PER_LINE * COORDS_PER_VERTEX,
            "vertex",
        )?;
        grow(
            &mut self.colors,
            (SLACK_COMMANDS + 1) * TRAVEL_VERTICES_PER_LINE * COLOR_COMPONENTS,
            "color",
        )
    }

    /// Append one travel line segment.
    pub fn push_travel_segment(&mut self, a: Vec3, b: Vec3) {
        self.travels
            .extend_from_slice(&[a.x, a.y, a.z, b.x, b.y, b.z]);
    }

    /// Append one colored line segment to the print vertex array.
    pub fn push_line_segment(&mut self, a: Vec3, b: Vec3, color: [f32; 4]) {
        self.vertices
            .extend_from_slice(&[a.x, a.y, a.z, b.x, b.y, b.z]);
        self.colors.extend_from_slice(&color);
        self.colors.extend_from_slice(&color);
    }

    /// Append staged triangle geometry, replicating `color` per vertex.
    /// Capacity must have been ensured by the caller.
    pub fn append_print(&mut self, verts: &[f32], norms: &[f32], indices: &[u32], color: [f32; 4]) {
        debug_assert_eq!(verts.len(), norms.len());
        debug_assert_eq!(verts.len() % COORDS_PER_VERTEX, 0);
        self.vertices.extend_from_slice(verts);
        self.normals.extend_from_slice(norms);
        self.indices.extend_from_slice(indices);
        for _ in 0..verts.len() / COORDS_PER_VERTEX {
            self.colors.extend_from_slice(&color);
        }
    }

    /// Trim every array to its exact used length. Called once when the
    /// load completes, before the buffers are handed out for upload.
    pub fn trim(&mut self) {
        self.vertices.shrink_to_fit();
        self.normals.shrink_to_fit();
        self.colors.shrink_to_fit();
        self.indices.shrink_to_fit();
        self.travels.shrink_to_fit();
    }

    /// Byte views for zero-copy GPU upload.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn normal_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.normals)
    }

    pub fn color_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.colors)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    pub fn travel_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.travels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn travel_segment_appends_six_floats() {
        let mut buf = MeshBuffer::new();
        buf.ensure_travel_headroom().unwrap();
        buf.push_travel_segment(Vec3::ZERO, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(buf.travels, vec![0.0, 0.0, 0.0, 1.0, 2.0, 3.0]);
        assert_eq!(buf.travel_vertex_count(), 2);
    }

    #[test]
    fn append_print_replicates_color_per_vertex() {
        let mut buf = MeshBuffer::new();
        let verts = [0.0; 12];
        let norms = [0.0; 12];
        buf.ensure_print_headroom(verts.len(), 6).unwrap();
        buf.append_print(&verts, &norms, &[0, 1, 2, 2, 3, 0], [1.0, 0.5, 0.0, 1.0]);
        assert_eq!(buf.vertex_count(), 4);
        assert_eq!(buf.colors.len(), 4 * COLOR_COMPONENTS);
        assert_eq!(buf.index_count(), 6);
    }

    #[test]
    fn growth_is_geometric() {
        let mut buf = MeshBuffer::new();
        buf.reserve_for_commands(10).unwrap();
        let cap_before = buf.vertices.capacity();
        // Fill past the reservation and regrow; capacity must jump by at
        // least half.
        buf.vertices.resize(cap_before, 0.0);
        grow(&mut buf.vertices, 1, "vertex").unwrap();
        assert!(buf.vertices.capacity() >= cap_before + cap_before / 2);
    }

    #[test]
    fn byte_views_match_element_sizes() {
        let mut buf = MeshBuffer::new();
        buf.ensure_line_headroom().unwrap();
        buf.push_line_segment(Vec3::ZERO, Vec3::ONE, [1.0; 4]);
        assert_eq!(buf.vertex_bytes().len(), buf.vertices.len() * 4);
        assert_eq!(buf.color_bytes().len(), buf.colors.len() * 4);
    }
}
