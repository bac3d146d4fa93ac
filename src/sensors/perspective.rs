// Copyright @yucwang 2026

use crate::core::error::RenderResult;
use crate::core::job::CameraParams;
use crate::core::sensor::{CameraSample, Sensor};
use crate::math::constants::{Float, Vector2f, Vector3f};
use crate::math::ray::{Ray3f, RayDifferential};
use crate::math::warp::sample_uniform_disk_concentric;

/// Perspective camera with an optional thin lens.
pub struct PerspectiveCamera {
    params: CameraParams,
    origin: Vector3f,
    forward: Vector3f,
    right: Vector3f,
    up: Vector3f,
    width: usize,
    height: usize,
    image_plane_dist: Float,
    // Camera-space step of the film point for one pixel in x and y.
    dx_cam: Vector3f,
    dy_cam: Vector3f,
}

impl PerspectiveCamera {
    pub fn new(params: CameraParams, width: usize, height: usize) -> RenderResult<Self> {
        params.validate()?;
        crate::core::job::validate_resolution(width, height)?;

        let forward = (params.target - params.position).normalize();
        let right = forward.cross(&params.up).normalize();
        let up = right.cross(&forward).normalize();

        let mut camera = Self {
            params,
            origin: params.position,
            forward,
            right,
            up,
            width,
            height,
            image_plane_dist: 0.0,
            dx_cam: Vector3f::new(1.0, 0.0, 0.0),
            dy_cam: Vector3f::new(0.0, -1.0, 0.0),
        };
        camera.resize(width, height);
        Ok(camera)
    }

    pub fn params(&self) -> &CameraParams {
        &self.params
    }

    pub fn lens_radius(&self) -> Float {
        self.params.lens_radius
    }

    pub fn focal_distance(&self) -> Float {
        self.params.focal_distance
    }

    pub fn image_plane_distance(&self) -> Float {
        self.image_plane_dist
    }

    pub fn dx_cam(&self) -> Vector3f {
        self.dx_cam
    }

    pub fn dy_cam(&self) -> Vector3f {
        self.dy_cam
    }

    fn camera_to_world(&self, v: &Vector3f) -> Vector3f {
        self.right * v.x + self.up * v.y + self.forward * v.z
    }

    fn film_point(&self, sample: &CameraSample) -> Vector3f {
        // Raster y grows downwards, camera y upwards.
        Vector3f::new(sample.image_x - 0.5 * self.width as Float,
                      0.5 * self.height as Float - sample.image_y,
                      self.image_plane_dist)
    }

    /// Camera-space point on the lens, or `None` for a pinhole.
    fn lens_point(&self, sample: &CameraSample, force_pinhole: bool) -> Option<Vector3f> {
        if self.params.lens_radius <= 0.0 || force_pinhole {
            return None;
        }
        let lens = sample_uniform_disk_concentric(&Vector2f::new(sample.lens_u, sample.lens_v))
            * self.params.lens_radius;
        Some(Vector3f::new(lens.x, lens.y, 0.0))
    }

    /// Ray through `p_film`. With a lens point the ray leaves the lens and
    /// passes through the focal-plane point of the matching pinhole ray.
    fn camera_ray(&self, p_film: &Vector3f, lens: Option<Vector3f>) -> Ray3f {
        let mut d_camera = p_film.normalize();
        let mut o_camera = Vector3f::zeros();

        if let Some(lens) = lens {
            let ft = self.params.focal_distance / d_camera.z;
            let p_focus = d_camera * ft;
            o_camera = lens;
            d_camera = (p_focus - o_camera).normalize();
        }

        // Clip planes are perpendicular to the view axis.
        let inv_z = 1.0 / d_camera.z;
        Ray3f::new(self.origin + self.camera_to_world(&o_camera),
                   self.camera_to_world(&d_camera),
                   Some(self.params.near_clip * inv_z),
                   Some(self.params.far_clip * inv_z))
    }
}

impl Sensor for PerspectiveCamera {
    fn generate_ray_with(&self, sample: &CameraSample, force_pinhole: bool) -> Ray3f {
        self.camera_ray(&self.film_point(sample), self.lens_point(sample, force_pinhole))
    }

    /// All three rays share the lens point, so the differentials track the
    /// pixel footprint on the focal plane rather than the aperture.
    fn generate_ray_differential(&self, sample: &CameraSample) -> RayDifferential {
        let p_film = self.film_point(sample);
        let lens = self.lens_point(sample, false);
        let ray = self.camera_ray(&p_film, lens);
        let rx = self.camera_ray(&(p_film + self.dx_cam), lens);
        let ry = self.camera_ray(&(p_film + self.dy_cam), lens);
        RayDifferential::with_differentials(ray, &rx, &ry)
    }

    fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        let tan_half_fov = (0.5 * self.params.fov_y.to_radians()).tan();
        self.image_plane_dist = 0.5 * height as Float / tan_half_fov;
    }

    fn resolution(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn describe(&self) -> String {
        format!("PerspectiveCamera {}x{} fov_y={} lens_radius={} focal_distance={}",
                self.width, self.height, self.params.fov_y,
                self.params.lens_radius, self.params.focal_distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn look_at(position: Vector3f, target: Vector3f) -> CameraParams {
        CameraParams {
            position,
            target,
            up: Vector3f::new(0.0, 1.0, 0.0),
            fov_y: 60.0,
            near_clip: 0.01,
            far_clip: 100.0,
            lens_radius: 0.0,
            focal_distance: 1.0,
        }
    }

    #[test]
    fn test_perspective_camera_center_ray() {
        let position = Vector3f::new(1.0, 2.0, 3.0);
        let target = Vector3f::new(-2.0, 0.5, -4.0);
        let cam = PerspectiveCamera::new(look_at(position, target), 64, 48).unwrap();

        let ray = cam.generate_ray(&CameraSample::new(32.0, 24.0, 0.5, 0.5));
        let expected = (target - position).normalize();
        assert_relative_eq!(ray.dir(), expected, epsilon = 1e-5);
        assert_relative_eq!(ray.origin(), position, epsilon = 1e-6);
    }

    #[test]
    fn test_vertical_extent_matches_fov() {
        let params = look_at(Vector3f::zeros(), Vector3f::new(0.0, 0.0, -1.0));
        let cam = PerspectiveCamera::new(params, 40, 20).unwrap();
        let top = cam.generate_ray(&CameraSample::new(20.0, 0.0, 0.5, 0.5));
        let d = top.dir();
        let half_angle = d.y.atan2(-d.z).to_degrees();
        assert_relative_eq!(half_angle, 30.0, epsilon = 1e-3);
    }

    #[test]
    fn test_clip_planes_are_planar() {
        let params = look_at(Vector3f::zeros(), Vector3f::new(0.0, 0.0, -1.0));
        let cam = PerspectiveCamera::new(params, 16, 16).unwrap();
        let ray = cam.generate_ray(&CameraSample::new(0.0, 0.0, 0.5, 0.5));
        assert_relative_eq!(-ray.at(ray.min_t).z, 0.01, epsilon = 1e-5);
        assert_relative_eq!(-ray.at(ray.max_t).z, 100.0, epsilon = 1e-2);
    }

    #[test]
    fn test_thin_lens_rays_meet_on_focal_plane() {
        let mut params = look_at(Vector3f::new(0.0, 1.0, 5.0), Vector3f::new(0.0, 1.0, 0.0));
        params.lens_radius = 0.25;
        params.focal_distance = 4.0;
        let cam = PerspectiveCamera::new(params, 32, 32).unwrap();
        let forward = Vector3f::new(0.0, 0.0, -1.0);

        let mut focus_points = Vec::new();
        for (u, v) in [(0.1, 0.2), (0.9, 0.4), (0.5, 0.95), (0.3, 0.7), (0.5, 0.5)] {
            let ray = cam.generate_ray(&CameraSample::new(7.3, 20.6, u, v));
            let offset = ray.origin() - params.position;
            assert!(offset.norm() <= params.lens_radius + 1e-5);
            assert!(offset.dot(&forward).abs() < 1e-6);

            let t = params.focal_distance / ray.dir().dot(&forward);
            focus_points.push(ray.at(t));
        }
        for p in &focus_points[1..] {
            assert_relative_eq!(*p, focus_points[0], epsilon = 1e-4);
        }
        // Different lens samples really move the origin.
        let a = cam.generate_ray(&CameraSample::new(7.3, 20.6, 0.1, 0.2)).origin();
        let b = cam.generate_ray(&CameraSample::new(7.3, 20.6, 0.9, 0.4)).origin();
        assert!((a - b).norm() > 1e-3);
    }

    #[test]
    fn test_force_pinhole_ignores_lens() {
        let mut params = look_at(Vector3f::zeros(), Vector3f::new(0.0, 0.0, -1.0));
        params.lens_radius = 0.5;
        params.focal_distance = 2.0;
        let cam = PerspectiveCamera::new(params, 16, 16).unwrap();
        let sample = CameraSample::new(3.0, 4.0, 0.9, 0.1);
        let ray = cam.generate_ray_with(&sample, true);
        assert_relative_eq!(ray.origin(), Vector3f::zeros(), epsilon = 1e-6);

        let mut pinhole = params;
        pinhole.lens_radius = 0.0;
        let reference = PerspectiveCamera::new(pinhole, 16, 16).unwrap().generate_ray(&sample);
        assert_relative_eq!(ray.dir(), reference.dir(), epsilon = 1e-6);
    }

    #[test]
    fn test_differentials_match_neighbouring_pixels() {
        let params = look_at(Vector3f::new(0.5, 0.0, 2.0), Vector3f::new(0.0, 0.3, 0.0));
        let cam = PerspectiveCamera::new(params, 24, 18).unwrap();
        let base = CameraSample::new(5.25, 9.5, 0.5, 0.5);
        let rd = cam.generate_ray_differential(&base);
        assert!(rd.has_differentials);

        let right = cam.generate_ray(&CameraSample::new(6.25, 9.5, 0.5, 0.5));
        let below = cam.generate_ray(&CameraSample::new(5.25, 10.5, 0.5, 0.5));
        assert_relative_eq!(rd.rx_dir - rd.ray.dir(), right.dir() - rd.ray.dir(), epsilon = 1e-6);
        assert_relative_eq!(rd.ry_dir - rd.ray.dir(), below.dir() - rd.ray.dir(), epsilon = 1e-6);
        assert_relative_eq!(rd.rx_origin, rd.ray.origin(), epsilon = 1e-6);
    }

    #[test]
    fn test_thin_lens_differentials_stay_at_pixel_scale() {
        let mut params = look_at(Vector3f::new(0.0, 0.0, 3.0), Vector3f::zeros());
        params.lens_radius = 0.5;
        params.focal_distance = 5.0;
        let cam = PerspectiveCamera::new(params, 640, 480).unwrap();
        let forward = Vector3f::new(0.0, 0.0, -1.0);

        let pinhole_rd = {
            let mut pinhole = params;
            pinhole.lens_radius = 0.0;
            PerspectiveCamera::new(pinhole, 640, 480).unwrap()
                .generate_ray_differential(&CameraSample::new(100.5, 300.5, 0.9, 0.2))
        };
        let pinhole_dx = (pinhole_rd.rx_dir - pinhole_rd.ray.dir()).norm();

        for (u, v) in [(0.9, 0.2), (0.1, 0.8), (0.5, 0.5), (0.3, 0.05)] {
            let sample = CameraSample::new(100.5, 300.5, u, v);
            let rd = cam.generate_ray_differential(&sample);
            assert!(rd.has_differentials);
            assert_relative_eq!(rd.rx_origin, rd.ray.origin(), epsilon = 1e-6);
            assert_relative_eq!(rd.ry_origin, rd.ray.origin(), epsilon = 1e-6);

            let dx = (rd.rx_dir - rd.ray.dir()).norm();
            let dy = (rd.ry_dir - rd.ray.dir()).norm();
            assert!(dx < 0.005 && dy < 0.005, "dx={} dy={}", dx, dy);
            assert!(dx > 0.5 * pinhole_dx && dx < 2.0 * pinhole_dx);

            // The +x ray meets the focal plane where the pinhole ray of the
            // next pixel does.
            let shifted = CameraSample::new(101.5, 300.5, u, v);
            let through = cam.generate_ray_with(&shifted, true);
            let expected = through.at(params.focal_distance / through.dir().dot(&forward));
            let t = params.focal_distance / rd.rx_dir.dot(&forward);
            assert_relative_eq!(rd.rx_origin + rd.rx_dir * t, expected, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_resize_keeps_world_placement() {
        let params = look_at(Vector3f::new(0.0, 0.0, 1.0), Vector3f::new(0.0, 0.0, 0.0));
        let mut cam = PerspectiveCamera::new(params, 32, 32).unwrap();
        cam.resize(64, 16);
        assert_eq!(cam.resolution(), (64, 16));
        let center = cam.generate_ray(&CameraSample::new(32.0, 8.0, 0.5, 0.5));
        assert_relative_eq!(center.dir(), Vector3f::new(0.0, 0.0, -1.0), epsilon = 1e-6);
        assert_relative_eq!(cam.image_plane_distance(), 8.0 / (30.0f32).to_radians().tan(), epsilon = 1e-4);
    }

    #[test]
    fn test_rejects_parallel_up() {
        let mut params = look_at(Vector3f::zeros(), Vector3f::new(0.0, 3.0, 0.0));
        params.up = Vector3f::new(0.0, 1.0, 0.0);
        assert!(PerspectiveCamera::new(params, 8, 8).is_err());
    }
}
