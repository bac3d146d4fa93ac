// Copyright @yucwang 2026

use crate::core::rng::LcgRng;
use crate::core::sampler::{SampleBuffer, Sampler};

/// Independent uniform samples for every dimension.
#[derive(Debug, Default)]
pub struct RandomSampler;

impl RandomSampler {
    pub fn new() -> Self {
        Self
    }
}

impl Sampler for RandomSampler {
    fn generate_samples(&self, _pass: u32, buffer: &mut SampleBuffer, rng: &mut LcgRng) {
        buffer.image_x = rng.next_f32();
        buffer.image_y = rng.next_f32();
        buffer.lens_u = rng.next_f32();
        buffer.lens_v = rng.next_f32();

        for array in buffer.arrays_1d_mut() {
            for v in array.iter_mut() {
                *v = rng.next_f32();
            }
        }
        for array in buffer.arrays_2d_mut() {
            for v in array.iter_mut() {
                *v = rng.next_vec2();
            }
        }
    }

    fn describe(&self) -> String {
        String::from("RandomSampler")
    }
}
