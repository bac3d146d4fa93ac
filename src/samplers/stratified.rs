// Copyright @yucwang 2026

use crate::core::rng::LcgRng;
use crate::core::sampler::{SampleBuffer, Sampler};
use crate::math::constants::{Float, Vector2f, ONE_MINUS_EPSILON};

/// Jittered sampling.
///
/// The pixel offset walks the cells of a `nx x ny` grid across passes, where
/// `nx * ny == spp`, so a full run visits every cell exactly once. Sample
/// arrays are stratified within each ray: 1-D arrays are jittered and
/// shuffled, 2-D arrays use Latin hypercube sampling.
#[derive(Debug)]
pub struct StratifiedSampler {
    nx: u32,
    ny: u32,
}

impl StratifiedSampler {
    pub fn new(samples_per_pixel: u32) -> Self {
        let spp = samples_per_pixel.max(1);
        // Largest divisor not above sqrt(spp); primes fall back to 1 x spp.
        let nx = (1..=spp)
            .take_while(|d| d * d <= spp)
            .filter(|d| spp % d == 0)
            .last()
            .unwrap_or(1);
        Self { nx, ny: spp / nx }
    }

    /// Grid size as `(nx, ny)`.
    pub fn strata(&self) -> (u32, u32) {
        (self.nx, self.ny)
    }

    fn cells(&self) -> u32 {
        self.nx * self.ny
    }
}

fn jitter(cell: u32, count: u32, rng: &mut LcgRng) -> Float {
    ((cell as Float + rng.next_f32()) / count as Float).min(ONE_MINUS_EPSILON)
}

fn shuffle<T>(values: &mut [T], rng: &mut LcgRng) {
    for i in (1..values.len()).rev() {
        let j = (rng.next_u32() as usize) % (i + 1);
        values.swap(i, j);
    }
}

impl Sampler for StratifiedSampler {
    fn generate_samples(&self, pass: u32, buffer: &mut SampleBuffer, rng: &mut LcgRng) {
        let (nx, ny) = (self.nx, self.ny);
        let cells = self.cells();
        let cell = pass % cells;
        buffer.image_x = jitter(cell % nx, nx, rng);
        buffer.image_y = jitter(cell / nx, ny, rng);

        // Offset the lens walk so lens and pixel cells do not move in lockstep.
        let lens_cell = (cell + cells / 2 + 1) % cells;
        buffer.lens_u = jitter(lens_cell % nx, nx, rng);
        buffer.lens_v = jitter(lens_cell / nx, ny, rng);

        for array in buffer.arrays_1d_mut() {
            let len = array.len() as u32;
            for (i, v) in array.iter_mut().enumerate() {
                *v = jitter(i as u32, len, rng);
            }
            shuffle(array, rng);
        }
        for array in buffer.arrays_2d_mut() {
            let len = array.len() as u32;
            for (i, v) in array.iter_mut().enumerate() {
                *v = Vector2f::new(jitter(i as u32, len, rng), jitter(i as u32, len, rng));
            }
            // Decorrelate the two axes.
            for i in (1..array.len()).rev() {
                let j = (rng.next_u32() as usize) % (i + 1);
                let y = array[i].y;
                array[i].y = array[j].y;
                array[j].y = y;
            }
        }
    }

    fn describe(&self) -> String {
        format!("StratifiedSampler {}x{}", self.nx, self.ny)
    }
}
