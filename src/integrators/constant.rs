// Copyright @yucwang 2026

use crate::core::arena::ScratchArena;
use crate::core::integrator::Integrator;
use crate::core::rng::LcgRng;
use crate::core::sampler::SampleBuffer;
use crate::core::scene::Scene;
use crate::math::ray::RayDifferential;
use crate::math::spectrum::RGBSpectrum;

/// Returns the same radiance for every ray. Useful to check the film and
/// scheduler without any light transport in the way.
pub struct ConstantIntegrator {
    color: RGBSpectrum,
}

impl ConstantIntegrator {
    pub fn new(color: RGBSpectrum) -> Self {
        Self { color }
    }
}

impl Integrator for ConstantIntegrator {
    fn li(&self,
          _ray: &RayDifferential,
          _scene: &Scene,
          _samples: &SampleBuffer,
          _rng: &mut LcgRng,
          _arena: &ScratchArena) -> RGBSpectrum {
        self.color
    }

    fn describe(&self) -> String {
        format!("ConstantIntegrator[color = ({}, {}, {})]", self.color[0], self.color[1], self.color[2])
    }
}
