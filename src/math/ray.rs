// Copyright 2020 @TwoCookingMice

use super::constants::{Float, Vector3f};

#[derive(Debug, Copy, Clone)]
pub struct Ray3f {
    origin: Vector3f,
    dir: Vector3f,
    pub min_t: Float,
    pub max_t: Float
}

impl Ray3f {
    pub fn new(o: Vector3f, d: Vector3f,
               min_t: Option<Float>, max_t: Option<Float>) -> Self {
        Self { origin: o, dir: d.normalize(),
               min_t: min_t.unwrap_or(0.0),
               max_t: max_t.unwrap_or(std::f32::MAX)}
    }

    pub fn origin(&self) -> Vector3f {
        self.origin
    }

    pub fn dir(&self) -> Vector3f {
        self.dir
    }

    pub fn at(&self, t: Float) -> Vector3f {
        self.origin + self.dir * t
    }

    pub fn update(&mut self, t: Float) -> bool {
        if t < self.min_t || t > self.max_t {
            false
        } else {
            self.max_t = t;
            true
        }
    }

    pub fn test_segment(&self, t: Float) -> bool {
        t >= self.min_t && t <= self.max_t
    }
}

/// A primary ray plus the rays through the neighbouring pixel in +x and +y.
///
/// The auxiliary rays only approximate the footprint when the camera has a
/// finite aperture: they are always traced as pinhole rays.
#[derive(Debug, Copy, Clone)]
pub struct RayDifferential {
    pub ray: Ray3f,
    pub has_differentials: bool,
    pub rx_origin: Vector3f,
    pub rx_dir: Vector3f,
    pub ry_origin: Vector3f,
    pub ry_dir: Vector3f,
}

impl RayDifferential {
    pub fn new(ray: Ray3f) -> Self {
        Self {
            ray,
            has_differentials: false,
            rx_origin: ray.origin(),
            rx_dir: ray.dir(),
            ry_origin: ray.origin(),
            ry_dir: ray.dir(),
        }
    }

    pub fn with_differentials(ray: Ray3f, rx: &Ray3f, ry: &Ray3f) -> Self {
        Self {
            ray,
            has_differentials: true,
            rx_origin: rx.origin(),
            rx_dir: rx.dir(),
            ry_origin: ry.origin(),
            ry_dir: ry.dir(),
        }
    }

    /// Shrinks the differentials to the spacing of `spp` samples per pixel.
    pub fn scale_differentials(&mut self, s: Float) {
        let o = self.ray.origin();
        let d = self.ray.dir();
        self.rx_origin = o + (self.rx_origin - o) * s;
        self.ry_origin = o + (self.ry_origin - o) * s;
        self.rx_dir = d + (self.rx_dir - d) * s;
        self.ry_dir = d + (self.ry_dir - d) * s;
    }
}

/* Tests for Ray */

#[cfg(test)]
mod tests {
    use super::Vector3f;
    use super::{Ray3f, RayDifferential};

    #[test]
    fn test_ray3f() {
        let o = Vector3f::new(0.0, 0.0, 0.0);
        let d = Vector3f::new(1.0, 0.0, 1.0);
        let mut ray = Ray3f::new(o, d, None, None);
        assert_eq!(o, ray.origin());

        let v1 = ray.at(2.0);
        assert!((v1[0] - std::f32::consts::SQRT_2).abs() < 1e-5);
        assert!(v1[1].abs() < 1e-5);
        assert!((v1[2] - std::f32::consts::SQRT_2).abs() < 1e-5);

        let status1 = ray.update(100.0);
        let status2 = ray.update(105.0);
        assert_eq!(status1, true);
        assert_eq!(status2, false);
    }

    #[test]
    fn test_scale_differentials() {
        let base = Ray3f::new(Vector3f::zeros(), Vector3f::new(0.0, 0.0, 1.0), None, None);
        let rx = Ray3f::new(Vector3f::new(1.0, 0.0, 0.0), Vector3f::new(1.0, 0.0, 1.0), None, None);
        let ry = Ray3f::new(Vector3f::new(0.0, 1.0, 0.0), Vector3f::new(0.0, 1.0, 1.0), None, None);
        let mut rd = RayDifferential::with_differentials(base, &rx, &ry);
        rd.scale_differentials(0.5);
        assert!((rd.rx_origin.x - 0.5).abs() < 1e-6);
        assert!((rd.ry_origin.y - 0.5).abs() < 1e-6);
        assert!(rd.has_differentials);
    }
}
