// Copyright @yucwang 2026

pub mod random;
pub mod stratified;

use crate::core::job::SamplerKind;
use crate::core::sampler::Sampler;

pub fn create_sampler(kind: SamplerKind, samples_per_pixel: u32) -> Box<dyn Sampler> {
    match kind {
        SamplerKind::Random => Box::new(random::RandomSampler::new()),
        SamplerKind::Stratified => Box::new(stratified::StratifiedSampler::new(samples_per_pixel)),
    }
}
