// Copyright @yucwang 2026

use crate::core::arena::ScratchArena;
use crate::core::rng::LcgRng;
use crate::core::sampler::{ SampleBuffer, SampleLayout };
use crate::core::scene::Scene;
use crate::math::ray::RayDifferential;
use crate::math::spectrum::RGBSpectrum;

/// Estimates incoming radiance along a camera ray.
///
/// `request_samples` runs once per initialize, before any worker starts, so an
/// integrator can register the per-pixel sample arrays it consumes in `li`.
/// `li` is called concurrently from every render worker and must not mutate
/// shared state.
pub trait Integrator: Send + Sync {
    fn request_samples(&mut self, _scene: &Scene, _layout: &mut SampleLayout) {}

    fn li(&self,
          ray: &RayDifferential,
          scene: &Scene,
          samples: &SampleBuffer,
          rng: &mut LcgRng,
          arena: &ScratchArena) -> RGBSpectrum;

    fn describe(&self) -> String;
}
