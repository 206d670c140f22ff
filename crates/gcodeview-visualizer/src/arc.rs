//! Circular interpolation: flattening G2/G3 moves into polyline points.

use gcodeview_core::MotionCommand;
use gcodeview_core::MotionKind;
use glam::{Vec2, Vec3};
use std::f32::consts::PI;

/// Maximum chord length per flattened arc segment, in millimeters.
pub const MAX_SEGMENT_MM: f32 = 0.5;

/// Hard cap on interpolated points, bounding degenerate huge-radius or
/// huge-sweep arcs.
pub const MAX_SEGMENTS: u32 = 100;

/// One resolved point along a flattened move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathPoint {
    pub pos: Vec3,
    /// True for intermediate arc points. The exact command target is
    /// always yielded last with `interpolated == false`.
    pub interpolated: bool,
}

/// Lazy, finite iterator over the flattened points of one motion
/// command.
///
/// Linear moves yield exactly one point: the resolved end position. Arc
/// moves yield up to [`MAX_SEGMENTS`] intermediate points (Z linearly
/// interpolated across the sweep) followed by the exact target. A
/// zero-radius arc collapses to the target point alone and never
/// errors.
#[derive(Debug, Clone)]
pub struct ArcInterpolator {
    center: Vec2,
    radius: f32,
    a_start: f32,
    a_delta: f32,
    z0: f32,
    dz: f32,
    segments: u32,
    t: u32,
    target: Vec3,
    finished: bool,
}

impl ArcInterpolator {
    /// Flatten `cmd`, starting from the previous command's resolved
    /// position.
    pub fn new(cmd: &MotionCommand, prev_pos: Vec3) -> Self {
        let target = cmd.resolved();
        if !cmd.kind.is_arc() {
            return Self {
                center: Vec2::ZERO,
                radius: 0.0,
                a_start: 0.0,
                a_delta: 0.0,
                z0: prev_pos.z,
                dz: 0.0,
                segments: 0,
                t: 0,
                target,
                finished: false,
            };
        }

        let rx = cmd.i.unwrap_or(0.0);
        let ry = cmd.j.unwrap_or(0.0);
        let radius = (rx * rx + ry * ry).sqrt();
        let center = Vec2::new(prev_pos.x + rx, prev_pos.y + ry);

        let a_start = (-ry).atan2(-rx);
        let a_end = (target.y - center.y).atan2(target.x - center.x);
        let mut a_delta = a_end - a_start;

        // Force the sweep sign to match the commanded direction.
        if cmd.kind == MotionKind::ArcCcw && a_delta <= 0.0 {
            a_delta += 2.0 * PI;
        } else if cmd.kind == MotionKind::ArcCw && a_delta >= 0.0 {
            a_delta -= 2.0 * PI;
        }

        let segments =
            ((a_delta.abs() * radius * 2.0 / MAX_SEGMENT_MM).ceil() as u32).min(MAX_SEGMENTS);

        Self {
            center,
            radius,
            a_start,
            a_delta,
            z0: prev_pos.z,
            dz: target.z - prev_pos.z,
            segments,
            t: 0,
            target,
            finished: false,
        }
    }

    /// Number of interpolated points this arc will yield before the
    /// final target point.
    pub fn segment_count(&self) -> u32 {
        self.segments
    }

    /// Signed sweep angle in radians (zero for linear moves).
    pub fn sweep(&self) -> f32 {
        self.a_delta
    }
}

impl Iterator for ArcInterpolator {
    type Item = PathPoint;

    fn next(&mut self) -> Option<PathPoint> {
        if self.finished {
            return None;
        }
        if self.t < self.segments {
            let f = self.t as f32 / self.segments as f32;
            let a = f * self.a_delta + self.a_start;
            self.t += 1;
            return Some(PathPoint {
                pos: Vec3::new(
                    self.center.x + a.cos() * self.radius,
                    self.center.y + a.sin() * self.radius,
                    self.z0 + f * self.dz,
                ),
                interpolated: true,
            });
        }
        self.finished = true;
        Some(PathPoint {
            pos: self.target,
            interpolated: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arc_cmd(kind: MotionKind, to: (f32, f32, f32), i: f32, j: f32) -> MotionCommand {
        let mut cmd = MotionCommand::non_move();
        cmd.is_move = true;
        cmd.kind = kind;
        cmd.extruding = true;
        cmd.i = Some(i);
        cmd.j = Some(j);
        cmd.x = Some(to.0);
        cmd.y = Some(to.1);
        cmd.z = Some(to.2);
        cmd.current_x = to.0;
        cmd.current_y = to.1;
        cmd.current_z = to.2;
        cmd
    }

    #[test]
    fn linear_move_yields_single_final_point() {
        let mut cmd = MotionCommand::non_move();
        cmd.is_move = true;
        cmd.x = Some(10.0);
        cmd.current_x = 10.0;
        let points: Vec<_> = ArcInterpolator::new(&cmd, Vec3::ZERO).collect();
        assert_eq!(points.len(), 1);
        assert!(!points[0].interpolated);
        assert_eq!(points[0].pos, Vec3::new(10.0, 0.0, 0.0));
    }

    #[test]
    fn half_circle_segment_count_and_target() {
        // G2 I5 J0 from origin to (10, 0, 0): radius 5 half circle.
        let cmd = arc_cmd(MotionKind::ArcCw, (10.0, 0.0, 0.0), 5.0, 0.0);
        let interp = ArcInterpolator::new(&cmd, Vec3::ZERO);
        assert_eq!(interp.segment_count(), 63);
        assert!((interp.sweep().abs() - PI).abs() < 1e-5);

        let points: Vec<_> = interp.collect();
        assert_eq!(points.len(), 64);
        let last = points.last().unwrap();
        assert!(!last.interpolated);
        assert_eq!(last.pos, Vec3::new(10.0, 0.0, 0.0));
        assert!(points[..63].iter().all(|p| p.interpolated));
    }

    #[test]
    fn ccw_sweep_is_positive_and_lands_on_target() {
        let cmd = arc_cmd(MotionKind::ArcCcw, (10.0, 0.0, 0.0), 5.0, 0.0);
        let interp = ArcInterpolator::new(&cmd, Vec3::ZERO);
        assert!(interp.sweep() > 0.0);
        let last = interp.last().unwrap();
        assert_eq!(last.pos, Vec3::new(10.0, 0.0, 0.0));
    }

    #[test]
    fn segment_cap_holds_for_huge_arcs() {
        let cmd = arc_cmd(MotionKind::ArcCw, (0.0, 2000.0, 0.0), 1000.0, 0.0);
        let interp = ArcInterpolator::new(&cmd, Vec3::ZERO);
        assert_eq!(interp.segment_count(), MAX_SEGMENTS);
        assert_eq!(interp.count() as u32, MAX_SEGMENTS + 1);
    }

    #[test]
    fn zero_radius_arc_collapses_to_target() {
        let cmd = arc_cmd(MotionKind::ArcCw, (0.0, 0.0, 0.0), 0.0, 0.0);
        let points: Vec<_> = ArcInterpolator::new(&cmd, Vec3::ZERO).collect();
        assert_eq!(points.len(), 1);
        assert!(!points[0].interpolated);
    }

    #[test]
    fn z_is_interpolated_across_the_sweep() {
        let cmd = arc_cmd(MotionKind::ArcCcw, (10.0, 0.0, 1.0), 5.0, 0.0);
        let points: Vec<_> = ArcInterpolator::new(&cmd, Vec3::ZERO).collect();
        let mid = points[points.len() / 2];
        assert!(mid.pos.z > 0.0 && mid.pos.z < 1.0);
        assert_eq!(points.last().unwrap().pos.z, 1.0);
    }

    #[test]
    fn missing_offsets_default_to_zero() {
        let mut cmd = arc_cmd(MotionKind::ArcCw, (0.0, 0.0, 0.0), 0.0, 0.0);
        cmd.i = None;
        cmd.j = None;
        let points: Vec<_> = ArcInterpolator::new(&cmd, Vec3::new(1.0, 0.0, 0.0)).collect();
        assert_eq!(points.last().unwrap().pos, Vec3::ZERO);
    }
}
