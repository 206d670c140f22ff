//! Orbit camera: view and projection matrix maintenance.
//!
//! Orientation accumulates as a quaternion composed from incremental
//! orbit input, avoiding gimbal lock. Pan and dolly act on the eye and
//! target directly in world space. Matrices are rebuilt on every input
//! change and read once per frame by the renderer.

use gcodeview_core::Bounds;
use glam::{Mat4, Quat, Vec2, Vec3};

/// Millimeter-to-pixel conversion used when framing the build area.
const ZOOM_CONSTANT: f32 = 2.1;

/// Orthographic zoom factor bounds.
const MIN_ZOOM_FACTOR: f32 = 0.01;
const MAX_ZOOM_FACTOR: f32 = 0.8;

/// Perspective dolly limits: reject moves that leave the eye closer
/// than this to the target, or further than five times the build
/// distance.
const MIN_DOLLY_DISTANCE: f32 = 6.0;

/// Intersection of a ray with the Z=0 plane, when it exists in front
/// of the ray origin.
fn ground_hit(origin: Vec3, dir: Vec3) -> Option<Vec3> {
    if dir.z.abs() < 1e-6 {
        return None;
    }
    let t = -origin.z / dir.z;
    if t <= 0.0 {
        return None;
    }
    Some(origin + dir * t)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProjectionMode {
    #[default]
    Orthographic,
    Perspective,
}

/// Camera state plus the derived view/projection matrices.
#[derive(Debug, Clone)]
pub struct Camera {
    pub mode: ProjectionMode,
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub zoom_factor: f32,

    width: f32,
    height: f32,
    scale_factor: f32,
    /// Center of the framed build area, in world XY.
    center: Vec2,
    /// Dominant build-area extent, scales the clip planes and dolly
    /// limits.
    dist: f32,

    orientation: Quat,
    angle_x: f32,
    angle_z: f32,

    view: Mat4,
    projection: Mat4,
}

impl Camera {
    pub fn new(mode: ProjectionMode) -> Self {
        let mut camera = Self {
            mode,
            eye: Vec3::new(0.0, 0.0, 1.0),
            target: Vec3::ZERO,
            up: Vec3::new(0.0, 1.0, 0.0),
            zoom_factor: 1.0,
            width: 1.0,
            height: 1.0,
            scale_factor: 1.0,
            center: Vec2::new(100.0, 100.0),
            dist: 200.0,
            orientation: Quat::IDENTITY,
            angle_x: 0.0,
            angle_z: 0.0,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
        };
        camera.set_initial_view();
        camera
    }

    /// Viewport size in pixels plus the display scale factor.
    pub fn update_size(&mut self, width: f32, height: f32, scale_factor: f32) {
        self.width = width.max(1.0);
        self.height = height.max(1.0);
        self.scale_factor = scale_factor;
        self.rebuild_projection();
    }

    /// Frame the camera on a loaded program's bounding box.
    pub fn frame_bounds(&mut self, bounds: &Bounds) {
        if !bounds.is_valid() {
            return;
        }
        let (cx, cy, _) = bounds.center();
        self.center = Vec2::new(cx, cy);
        self.dist = bounds.width().max(bounds.depth()).max(1.0);
        self.set_initial_view();
    }

    /// Reset orientation, recenter, and pick an orthographic zoom that
    /// fits the framed area in the smaller viewport side.
    pub fn reset_view(&mut self) {
        self.orientation = Quat::IDENTITY;
        self.angle_x = 0.0;
        self.angle_z = 0.0;
        self.set_initial_view();

        let (min_side, zoom_length) = if self.width < self.height {
            (self.width * self.scale_factor, 2.0 * self.center.x.abs())
        } else {
            (self.height * self.scale_factor, 2.0 * self.center.y.abs())
        };
        if min_side > 0.0 && zoom_length > 0.0 {
            self.zoom_factor =
                (zoom_length / min_side * ZOOM_CONSTANT).clamp(MIN_ZOOM_FACTOR, MAX_ZOOM_FACTOR);
        }
        self.rebuild_projection();
    }

    fn set_initial_view(&mut self) {
        self.eye = Vec3::new(self.center.x, self.center.y, self.dist * 1.5);
        self.target = Vec3::new(self.center.x, self.center.y, 0.0);
        self.rebuild_view();
        self.rebuild_projection();
    }

    /// Incremental orbit from two pointer positions in normalized
    /// device coordinates. Horizontal motion spins around the world Z
    /// axis, vertical motion tilts around the screen X axis.
    pub fn orbit(&mut self, p1: Vec2, p2: Vec2) {
        self.angle_z -= p2.x - p1.x;
        let rot_z = Quat::from_axis_angle(Vec3::new(0.0, 0.0, -1.0), self.angle_z);
        self.angle_x += p2.y - p1.y;
        let rot_x = Quat::from_axis_angle(Vec3::new(-1.0, 0.0, 0.0), self.angle_x);
        self.orientation = rot_x * rot_z;
        self.rebuild_view();
    }

    /// Translate eye and target together in world space.
    pub fn pan(&mut self, delta: Vec3) {
        self.eye += delta;
        self.target += delta;
        self.rebuild_view();
    }

    /// Zoom by `factor` (> 1 moves in). Orthographic zoom scales the
    /// projection window within fixed bounds; perspective zoom dollies
    /// the eye toward the target, rejecting moves that would leave the
    /// target's working range.
    pub fn zoom(&mut self, factor: f32) {
        if factor <= 0.0 {
            return;
        }
        match self.mode {
            ProjectionMode::Orthographic => {
                self.zoom_factor =
                    (self.zoom_factor / factor).clamp(MIN_ZOOM_FACTOR, MAX_ZOOM_FACTOR);
                self.rebuild_projection();
            }
            ProjectionMode::Perspective => {
                let eye = self.target + (self.eye - self.target) / factor;
                let length = (eye - self.target).length();
                if length > 5.0 * self.dist || length < MIN_DOLLY_DISTANCE {
                    return;
                }
                self.eye = eye;
                self.retarget_to_ground();
                self.rebuild_view();
            }
        }
    }

    /// Zoom biased toward a screen point: the world position under the
    /// cursor stays roughly fixed by shifting eye and target toward it.
    pub fn zoom_to(&mut self, factor: f32, cursor: Vec2) {
        if factor <= 0.0 {
            return;
        }
        let (origin, dir) = self.unproject(cursor);
        let focus = ground_hit(origin, dir);
        self.zoom(factor);
        if let Some(hit) = focus {
            let bias = (hit - self.target) * (1.0 - 1.0 / factor);
            self.pan(Vec3::new(bias.x, bias.y, 0.0));
        }
    }

    /// World-space ray through a screen point (pixels, origin top
    /// left): returns the near-plane origin and the ray direction.
    pub fn unproject(&self, screen: Vec2) -> (Vec3, Vec3) {
        let ndc = Vec2::new(
            2.0 * screen.x / self.width - 1.0,
            1.0 - 2.0 * screen.y / self.height,
        );
        let inverse = (self.projection * self.view).inverse();
        let near = inverse.project_point3(Vec3::new(ndc.x, ndc.y, -1.0));
        let far = inverse.project_point3(Vec3::new(ndc.x, ndc.y, 1.0));
        (near, (far - near).normalize_or_zero())
    }

    /// Keep orbiting well-behaved near the bed: when the look-at point
    /// has been pushed below the print surface, pull it back up to the
    /// Z=0 intersection of the view ray. No intersection, or one behind
    /// the eye, leaves the target unchanged.
    fn retarget_to_ground(&mut self) {
        if self.target.z >= 0.0 {
            return;
        }
        let dir = (self.target - self.eye).normalize_or_zero();
        if let Some(hit) = ground_hit(self.eye, dir) {
            self.target = hit;
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        self.view
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    fn rebuild_view(&mut self) {
        let forward = self.eye - self.target;
        let rotated_eye = self.orientation * forward + self.target;
        let rotated_up = self.orientation * self.up;
        self.view = Mat4::look_at_rh(rotated_eye, self.target, rotated_up);
    }

    fn rebuild_projection(&mut self) {
        self.projection = match self.mode {
            ProjectionMode::Orthographic => Mat4::orthographic_rh_gl(
                -self.width / 2.0 * self.zoom_factor,
                self.width / 2.0 * self.zoom_factor,
                -self.height / 2.0 * self.zoom_factor,
                self.height / 2.0 * self.zoom_factor,
                0.01,
                3.0 * self.dist,
            ),
            ProjectionMode::Perspective => Mat4::perspective_rh_gl(
                45.0_f32.to_radians(),
                self.width / self.height,
                0.1,
                5.5 * self.dist,
            ),
        };
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(ProjectionMode::Orthographic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> Bounds {
        let mut b = Bounds::new();
        b.update(0.0, 0.0, 0.0);
        b.update(100.0, 80.0, 20.0);
        b
    }

    #[test]
    fn framing_centers_the_target() {
        let mut cam = Camera::default();
        cam.frame_bounds(&bounds());
        assert_eq!(cam.target, Vec3::new(50.0, 40.0, 0.0));
        assert_eq!(cam.eye.z, 150.0);
    }

    #[test]
    fn invalid_bounds_leave_the_camera_alone() {
        let mut cam = Camera::default();
        let before = cam.target;
        cam.frame_bounds(&Bounds::new());
        assert_eq!(cam.target, before);
    }

    #[test]
    fn pan_moves_eye_and_target_together() {
        let mut cam = Camera::default();
        let gap = cam.eye - cam.target;
        cam.pan(Vec3::new(5.0, -3.0, 0.0));
        assert_eq!(cam.eye - cam.target, gap);
    }

    #[test]
    fn orthographic_zoom_clamps() {
        let mut cam = Camera::new(ProjectionMode::Orthographic);
        cam.zoom_factor = 0.5;
        for _ in 0..100 {
            cam.zoom(2.0);
        }
        assert_eq!(cam.zoom_factor, MIN_ZOOM_FACTOR);
        for _ in 0..100 {
            cam.zoom(0.5);
        }
        assert_eq!(cam.zoom_factor, MAX_ZOOM_FACTOR);
    }

    #[test]
    fn perspective_dolly_rejects_out_of_range_moves() {
        let mut cam = Camera::new(ProjectionMode::Perspective);
        cam.frame_bounds(&bounds());
        let eye = cam.eye;
        // Far past the minimum distance in one step.
        cam.zoom(1000.0);
        assert_eq!(cam.eye, eye);
        // And far out past 5x the build distance.
        cam.zoom(0.0001);
        assert_eq!(cam.eye, eye);
        cam.zoom(2.0);
        assert!((cam.eye - cam.target).length() < (eye - cam.target).length());
    }

    #[test]
    fn unproject_center_points_at_the_target() {
        let mut cam = Camera::default();
        cam.update_size(800.0, 600.0, 1.0);
        cam.frame_bounds(&bounds());
        let (origin, dir) = cam.unproject(Vec2::new(400.0, 300.0));
        let hit = ground_hit(origin, dir).expect("center ray hits the bed");
        assert!((hit - cam.target).length() < 1e-2);
    }

    #[test]
    fn ground_hit_rejects_parallel_and_backward_rays() {
        assert!(ground_hit(Vec3::new(0.0, 0.0, 10.0), Vec3::new(1.0, 0.0, 0.0)).is_none());
        assert!(ground_hit(Vec3::new(0.0, 0.0, 10.0), Vec3::new(0.0, 0.0, 1.0)).is_none());
        let hit = ground_hit(Vec3::new(0.0, 0.0, 10.0), Vec3::new(0.0, 0.0, -1.0)).unwrap();
        assert_eq!(hit, Vec3::ZERO);
    }

    #[test]
    fn zoom_to_pulls_the_view_toward_the_cursor() {
        let mut cam = Camera::default();
        cam.update_size(800.0, 600.0, 1.0);
        cam.frame_bounds(&bounds());
        let before = cam.target;
        // Cursor off-center: zooming in shifts the target toward it.
        cam.zoom_to(2.0, Vec2::new(600.0, 300.0));
        assert!(cam.target.x > before.x);
        assert_eq!(cam.target.z, 0.0);
    }

    #[test]
    fn orbit_keeps_target_fixed() {
        let mut cam = Camera::default();
        cam.frame_bounds(&bounds());
        let target = cam.target;
        let dist = (cam.eye - cam.target).length();
        cam.orbit(Vec2::ZERO, Vec2::new(0.3, 0.2));
        assert_eq!(cam.target, target);
        // Orbit only rotates; the view still looks at the target from
        // the same distance.
        assert!(((cam.eye - cam.target).length() - dist).abs() < 1e-4);
        assert_ne!(cam.view_matrix(), Mat4::look_at_rh(cam.eye, target, cam.up));
    }
}
