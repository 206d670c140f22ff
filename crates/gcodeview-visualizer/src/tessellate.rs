//! Path tessellation strategies.
//!
//! Two interchangeable strategies turn flattened motion points into
//! geometry: [`FullExtrusionStrategy`] extrudes a diamond cross-section
//! along the path with mitered joins and end caps, producing an indexed
//! triangle mesh; [`LineOnlyStrategy`] emits plain line segments for a
//! cheap preview. Both route non-extruding moves to the travel buffer.

use crate::arc::PathPoint;
use crate::buffer::{MeshBuffer, COORDS_PER_VERTEX};
use crate::colors::Rgba;
use crate::error::LoadError;
use glam::{Vec2, Vec3};
use std::f32::consts::PI;

/// Default path cross-section half extents, in millimeters.
pub const DEFAULT_PATH_HALFWIDTH: f32 = 0.2;
pub const DEFAULT_PATH_HALFHEIGHT: f32 = 0.2;

/// Cross-sections are widened slightly so adjacent paths visually fuse.
const PATH_SAFETY_FACTOR: f32 = 1.2;

/// Miter joins sharper than this (|cos(Δangle/2)|, about a 120° turn)
/// would produce a long spike, so the join falls back to two boxes
/// meeting at an intermediate cross-section. Empirical, not derived
/// from a tolerance.
pub const DEFAULT_JOIN_THRESHOLD: f32 = 0.5;

/// Primitive topology a strategy's print geometry is drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    Triangles,
    Lines,
}

/// Two triangles covering the quad `i1-i2-i3-i4`.
pub fn triangulate_rectangle(i1: u32, i2: u32, i3: u32, i4: u32) -> [u32; 6] {
    [i1, i4, i3, i3, i2, i1]
}

/// Eight triangles connecting two four-vertex cross-sections.
pub fn triangulate_box(
    i1: u32,
    i2: u32,
    i3: u32,
    i4: u32,
    j1: u32,
    j2: u32,
    j3: u32,
    j4: u32,
) -> [u32; 24] {
    [
        i1, i2, j2, j2, j1, i1, //
        i2, i3, j3, j3, j2, i2, //
        i3, i4, j4, j4, j3, i3, //
        i4, i1, j1, j1, j4, i4,
    ]
}

/// One flattened point of a movement command, with the context the
/// strategy needs to decide joins and caps.
#[derive(Debug, Clone, Copy)]
pub struct PathStep {
    pub point: PathPoint,
    pub extruding: bool,
    /// Whether more extruded geometry follows this point, either
    /// further arc points of the same command or a following extruding
    /// move. Controls end-cap emission.
    pub next_is_extruding: bool,
    pub color: Rgba,
}

/// Converts a stream of flattened path points into mesh geometry.
pub trait Tessellator {
    fn step(&mut self, buf: &mut MeshBuffer, step: PathStep) -> Result<(), LoadError>;

    fn primitive(&self) -> PrimitiveKind;
}

/// Mitered-box tessellation: a diamond cross-section swept along the
/// extrusion path, joined with averaged-normal miters (or a double box
/// past the join threshold) and capped at travel boundaries.
#[derive(Debug, Clone)]
pub struct FullExtrusionStrategy {
    pub path_halfwidth: f32,
    pub path_halfheight: f32,
    pub join_threshold: f32,
    prev_pos: Vec3,
    prev_normal: Vec2,
    prev_angle: f32,
    prev_extruding: bool,
    has_section: bool,
}

impl Default for FullExtrusionStrategy {
    fn default() -> Self {
        Self::new(DEFAULT_PATH_HALFWIDTH, DEFAULT_PATH_HALFHEIGHT)
    }
}

/// Staged geometry for one step, appended to the buffer in one shot
/// once capacity is ensured.
#[derive(Default)]
struct Staging {
    verts: Vec<f32>,
    norms: Vec<f32>,
    indices: Vec<u32>,
}

impl Staging {
    /// Emit one four-vertex diamond cross-section at `pos`, oriented by
    /// the 2D path normal `n`. `divisor` widens the section for miter
    /// compensation.
    fn cross_section(&mut self, n: Vec2, pos: Vec3, divisor: f32, hw: f32, hh: f32) {
        let hw = hw / divisor;
        let left = Vec2::new(pos.x, pos.y) - hw * n;
        let right = Vec2::new(pos.x, pos.y) + hw * n;
        self.verts.extend_from_slice(&[
            pos.x,
            pos.y,
            pos.z + hh,
            left.x,
            left.y,
            pos.z,
            pos.x,
            pos.y,
            pos.z - hh,
            right.x,
            right.y,
            pos.z,
        ]);
        self.norms.extend_from_slice(&[
            0.0, 0.0, 1.0, //
            -n.x, -n.y, 0.0, //
            0.0, 0.0, -1.0, //
            n.x, n.y, 0.0,
        ]);
    }

    fn vertex_count(&self) -> usize {
        self.verts.len() / COORDS_PER_VERTEX
    }
}

impl FullExtrusionStrategy {
    pub fn new(path_halfwidth: f32, path_halfheight: f32) -> Self {
        Self {
            path_halfwidth,
            path_halfheight,
            join_threshold: DEFAULT_JOIN_THRESHOLD,
            prev_pos: Vec3::ZERO,
            prev_normal: Vec2::ZERO,
            prev_angle: 0.0,
            prev_extruding: false,
            has_section: false,
        }
    }

    pub fn with_join_threshold(mut self, threshold: f32) -> Self {
        self.join_threshold = threshold;
        self
    }
}

impl Tessellator for FullExtrusionStrategy {
    fn step(&mut self, buf: &mut MeshBuffer, step: PathStep) -> Result<(), LoadError> {
        let pos = step.point.pos;
        if !step.extruding {
            buf.ensure_travel_headroom()?;
            buf.push_travel_segment(self.prev_pos, pos);
            self.prev_pos = pos;
            self.prev_extruding = false;
            return Ok(());
        }

        let delta = Vec2::new(pos.x - self.prev_pos.x, pos.y - self.prev_pos.y);
        let norm = delta.length_squared();
        if norm == 0.0 {
            // Z+E only move, nothing to sweep along.
            return Ok(());
        }
        let norm = norm.sqrt();
        let normal = Vec2::new(-delta.y / norm, delta.x / norm);
        let angle = delta.y.atan2(delta.x);

        let hw = self.path_halfwidth * PATH_SAFETY_FACTOR;
        let hh = self.path_halfheight * PATH_SAFETY_FACTOR;

        let mut staging = Staging::default();
        let base = buf.vertex_count() as u32;
        let first;
        if self.prev_extruding && self.has_section {
            let prev_id = base - 4;
            let mut avg = (self.prev_normal + normal) / 2.0;
            if avg.length_squared() == 0.0 {
                avg = normal;
            } else {
                avg = avg.normalize();
            }
            let delta_angle = (angle - self.prev_angle).rem_euclid(2.0 * PI);
            let fact = (delta_angle / 2.0).cos().abs();
            if fact < self.join_threshold {
                // Sharp turn: an intermediate box instead of one long
                // miter spike.
                staging.cross_section(self.prev_normal, self.prev_pos, 1.0, hw, hh);
                staging.indices.extend_from_slice(&triangulate_box(
                    prev_id,
                    prev_id + 1,
                    prev_id + 2,
                    prev_id + 3,
                    base,
                    base + 1,
                    base + 2,
                    base + 3,
                ));
                staging.cross_section(normal, self.prev_pos, 1.0, hw, hh);
                first = base + 4;
                staging.indices.extend_from_slice(&triangulate_box(
                    base,
                    base + 1,
                    base + 2,
                    base + 3,
                    first,
                    first + 1,
                    first + 2,
                    first + 3,
                ));
            } else {
                // Miter: widen the averaged section to keep the silhouette.
                staging.cross_section(avg, self.prev_pos, fact, hw, hh);
                first = base;
                staging.indices.extend_from_slice(&triangulate_box(
                    prev_id,
                    prev_id + 1,
                    prev_id + 2,
                    prev_id + 3,
                    first,
                    first + 1,
                    first + 2,
                    first + 3,
                ));
            }
        } else {
            // Fresh path start: cap the open end.
            staging.cross_section(normal, self.prev_pos, 1.0, hw, hh);
            first = base;
            staging
                .indices
                .extend_from_slice(&triangulate_rectangle(first, first + 1, first + 2, first + 3));
        }

        if !step.next_is_extruding {
            staging.cross_section(normal, pos, 1.0, hw, hh);
            let end_first = base + staging.vertex_count() as u32 - 4;
            staging.indices.extend_from_slice(&triangulate_rectangle(
                end_first + 3,
                end_first + 2,
                end_first + 1,
                end_first,
            ));
            staging.indices.extend_from_slice(&triangulate_box(
                first,
                first + 1,
                first + 2,
                first + 3,
                end_first,
                end_first + 1,
                end_first + 2,
                end_first + 3,
            ));
        }

        buf.ensure_print_headroom(staging.verts.len(), staging.indices.len())?;
        buf.append_print(&staging.verts, &staging.norms, &staging.indices, step.color);

        self.prev_normal = normal;
        self.prev_angle = angle;
        self.prev_pos = pos;
        self.prev_extruding = true;
        self.has_section = true;
        Ok(())
    }

    fn primitive(&self) -> PrimitiveKind {
        PrimitiveKind::Triangles
    }
}

/// Cheap preview tessellation: one colored line segment per flattened
/// point, no normals, no triangle indices.
#[derive(Debug, Clone)]
pub struct LineOnlyStrategy {
    prev_pos: Vec3,
}

impl Default for LineOnlyStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl LineOnlyStrategy {
    pub fn new() -> Self {
        Self {
            prev_pos: Vec3::ZERO,
        }
    }
}

impl Tessellator for LineOnlyStrategy {
    fn step(&mut self, buf: &mut MeshBuffer, step: PathStep) -> Result<(), LoadError> {
        let pos = step.point.pos;
        if step.extruding {
            buf.ensure_line_headroom()?;
            buf.push_line_segment(self.prev_pos, pos, step.color);
        } else {
            buf.ensure_travel_headroom()?;
            buf.push_travel_segment(self.prev_pos, pos);
        }
        self.prev_pos = pos;
        Ok(())
    }

    fn primitive(&self) -> PrimitiveKind {
        PrimitiveKind::Lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgba = [1.0, 0.0, 0.0, 1.0];

    fn extrude(to: Vec3, next_is_extruding: bool) -> PathStep {
        PathStep {
            point: PathPoint {
                pos: to,
                interpolated: false,
            },
            extruding: true,
            next_is_extruding,
            color: RED,
        }
    }

    fn travel(to: Vec3) -> PathStep {
        PathStep {
            point: PathPoint {
                pos: to,
                interpolated: false,
            },
            extruding: false,
            next_is_extruding: false,
            color: RED,
        }
    }

    #[test]
    fn isolated_segment_is_a_capped_box() {
        let mut strat = FullExtrusionStrategy::default();
        let mut buf = MeshBuffer::new();
        strat
            .step(&mut buf, extrude(Vec3::new(10.0, 0.0, 0.0), false))
            .unwrap();
        // Two cross-sections, two caps, one box.
        assert_eq!(buf.vertex_count(), 8);
        assert_eq!(buf.index_count(), 6 + 6 + 24);
        assert!(buf.indices.iter().all(|&i| (i as usize) < buf.vertex_count()));
    }

    #[test]
    fn collinear_segments_share_a_mitered_section() {
        let mut strat = FullExtrusionStrategy::default();
        let mut buf = MeshBuffer::new();
        strat
            .step(&mut buf, extrude(Vec3::new(5.0, 0.0, 0.0), true))
            .unwrap();
        assert_eq!(buf.vertex_count(), 4);
        strat
            .step(&mut buf, extrude(Vec3::new(10.0, 0.0, 0.0), false))
            .unwrap();
        // Join section + end section, no intermediate box.
        assert_eq!(buf.vertex_count(), 12);
        assert_eq!(buf.index_count(), 6 + 24 + 6 + 24);
    }

    #[test]
    fn sharp_turn_inserts_intermediate_box() {
        let mut strat = FullExtrusionStrategy::default();
        let mut buf = MeshBuffer::new();
        strat
            .step(&mut buf, extrude(Vec3::new(10.0, 0.0, 0.0), true))
            .unwrap();
        // Full reversal: fact = |cos(pi/2)| = 0.
        strat
            .step(&mut buf, extrude(Vec3::new(0.0, 0.0, 0.0), false))
            .unwrap();
        // Start section + two turn sections + end section.
        assert_eq!(buf.vertex_count(), 16);
        assert_eq!(buf.index_count(), 6 + 24 + 24 + 6 + 24);
    }

    #[test]
    fn travel_emits_two_vertices_and_no_print_geometry() {
        let mut strat = FullExtrusionStrategy::default();
        let mut buf = MeshBuffer::new();
        strat.step(&mut buf, travel(Vec3::new(5.0, 5.0, 0.0))).unwrap();
        assert_eq!(buf.travel_vertex_count(), 2);
        assert_eq!(buf.vertex_count(), 0);
        assert_eq!(buf.index_count(), 0);
    }

    #[test]
    fn z_only_extrusion_is_skipped() {
        let mut strat = FullExtrusionStrategy::default();
        let mut buf = MeshBuffer::new();
        strat
            .step(&mut buf, extrude(Vec3::new(0.0, 0.0, 0.4), false))
            .unwrap();
        assert_eq!(buf.vertex_count(), 0);
        assert_eq!(buf.travel_vertex_count(), 0);
    }

    #[test]
    fn cross_section_uses_safety_factor() {
        let mut strat = FullExtrusionStrategy::new(0.5, 0.25);
        let mut buf = MeshBuffer::new();
        strat
            .step(&mut buf, extrude(Vec3::new(10.0, 0.0, 0.0), false))
            .unwrap();
        // Start section: top vertex sits halfheight * 1.2 above the path.
        assert_eq!(buf.vertices[2], 0.25 * PATH_SAFETY_FACTOR);
        // Path runs +X, so the path normal is +Y and the left vertex
        // sits halfwidth * 1.2 below the axis.
        assert_eq!(buf.vertices[4], -0.5 * PATH_SAFETY_FACTOR);
    }

    #[test]
    fn line_strategy_writes_line_pairs() {
        let mut strat = LineOnlyStrategy::new();
        let mut buf = MeshBuffer::new();
        strat
            .step(&mut buf, extrude(Vec3::new(10.0, 0.0, 0.0), false))
            .unwrap();
        strat.step(&mut buf, travel(Vec3::new(0.0, 5.0, 0.0))).unwrap();
        assert_eq!(buf.vertex_count(), 2);
        assert_eq!(buf.colors.len(), 8);
        assert_eq!(buf.travel_vertex_count(), 2);
        assert_eq!(buf.index_count(), 0);
        assert_eq!(strat.primitive(), PrimitiveKind::Lines);
    }
}
