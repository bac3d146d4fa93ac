// Copyright @yucwang 2026

use crate::math::constants::Float;
use crate::math::ray::{Ray3f, RayDifferential};

/// Film-plane position in raster space plus the lens sample for one ray.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct CameraSample {
    pub image_x: Float,
    pub image_y: Float,
    pub lens_u: Float,
    pub lens_v: Float,
}

impl CameraSample {
    pub fn new(image_x: Float, image_y: Float, lens_u: Float, lens_v: Float) -> Self {
        Self { image_x, image_y, lens_u, lens_v }
    }
}

pub trait Sensor: Send + Sync {
    /// Generates a world-space ray. With `force_pinhole` the lens is ignored.
    fn generate_ray_with(&self, sample: &CameraSample, force_pinhole: bool) -> Ray3f;

    fn resize(&mut self, width: usize, height: usize);

    fn resolution(&self) -> (usize, usize);

    fn generate_ray(&self, sample: &CameraSample) -> Ray3f {
        self.generate_ray_with(sample, false)
    }

    /// The +1 pixel rays reuse the lens sample of the primary ray, so all
    /// three start from the same lens point.
    fn generate_ray_differential(&self, sample: &CameraSample) -> RayDifferential {
        let ray = self.generate_ray(sample);

        let mut shifted = *sample;
        shifted.image_x += 1.0;
        let rx = self.generate_ray(&shifted);

        let mut shifted = *sample;
        shifted.image_y += 1.0;
        let ry = self.generate_ray(&shifted);

        RayDifferential::with_differentials(ray, &rx, &ry)
    }

    fn describe(&self) -> String {
        String::from("Sensor")
    }
}
