// Copyright @yucwang 2026

use crate::core::error::RenderResult;
use crate::core::filter::Filter;
use crate::core::job::validate_resolution;
use crate::core::tile::TileClaim;
use crate::math::bitmap::Bitmap;
use crate::math::constants::{Float, Vector3f};
use crate::math::spectrum::RGBSpectrum;

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU32, Ordering};

/// Filter-weighted radiance sum of one pixel, stored as f32 bits.
///
/// Each pixel is only ever written by the thread holding the claim on its
/// tile, so plain relaxed load/store pairs are enough; the pass barriers
/// publish the values to the thread that rescales the film.
#[derive(Default)]
struct AccumPixel {
    rgb: [AtomicU32; 3],
    weight: AtomicU32,
}

impl AccumPixel {
    fn add(&self, l: &RGBSpectrum, w: Float) {
        for c in 0..3 {
            let v = f32::from_bits(self.rgb[c].load(Ordering::Relaxed));
            self.rgb[c].store((v + l[c] * w).to_bits(), Ordering::Relaxed);
        }
        let v = f32::from_bits(self.weight.load(Ordering::Relaxed));
        self.weight.store((v + w).to_bits(), Ordering::Relaxed);
    }

    fn load(&self) -> (Vector3f, Float) {
        let rgb = Vector3f::new(f32::from_bits(self.rgb[0].load(Ordering::Relaxed)),
                                f32::from_bits(self.rgb[1].load(Ordering::Relaxed)),
                                f32::from_bits(self.rgb[2].load(Ordering::Relaxed)));
        (rgb, f32::from_bits(self.weight.load(Ordering::Relaxed)))
    }

    fn clear(&self) {
        for c in &self.rgb {
            c.store(0.0f32.to_bits(), Ordering::Relaxed);
        }
        self.weight.store(0.0f32.to_bits(), Ordering::Relaxed);
    }
}

/// Progressive image accumulator.
///
/// Workers add samples to the pixels of the tiles they claimed; between passes
/// one thread bumps the sample count and rescales the sums into the
/// displayable buffer returned by `frame_buffer`.
pub struct Film {
    width: usize,
    height: usize,
    filter: Box<dyn Filter>,
    reconstruct: bool,
    accum: Vec<AccumPixel>,
    display: RwLock<Vec<Vector3f>>,
    sample_count: AtomicU32,
    dropped_samples: AtomicU32,
}

impl Film {
    pub fn new(width: usize, height: usize, filter: Box<dyn Filter>, reconstruct: bool) -> RenderResult<Self> {
        validate_resolution(width, height)?;
        Ok(Self {
            width,
            height,
            filter,
            reconstruct,
            accum: (0..width * height).map(|_| AccumPixel::default()).collect(),
            display: RwLock::new(vec![Vector3f::zeros(); width * height]),
            sample_count: AtomicU32::new(0),
            dropped_samples: AtomicU32::new(0),
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn filter(&self) -> &dyn Filter {
        self.filter.as_ref()
    }

    pub fn resize(&mut self, width: usize, height: usize) -> RenderResult<()> {
        validate_resolution(width, height)?;
        self.width = width;
        self.height = height;
        self.accum = (0..width * height).map(|_| AccumPixel::default()).collect();
        *self.display.write() = vec![Vector3f::zeros(); width * height];
        self.sample_count.store(0, Ordering::Release);
        self.dropped_samples.store(0, Ordering::Release);
        Ok(())
    }

    /// Only valid while no pass is in flight.
    pub fn clear(&self) {
        for pixel in &self.accum {
            pixel.clear();
        }
        self.display.write().iter_mut().for_each(|p| *p = Vector3f::zeros());
        self.sample_count.store(0, Ordering::Release);
        self.dropped_samples.store(0, Ordering::Release);
    }

    /// Adds one radiance sample at raster position `(image_x, image_y)`.
    ///
    /// The pixel is clamped into the claimed tile: `x + offset` may round up
    /// to the next integer for wide images, and a sample must never touch a
    /// pixel owned by another thread.
    pub fn add_sample(&self, claim: &TileClaim, image_x: Float, image_y: Float, l: &RGBSpectrum) {
        let tile = &claim.tile;
        let x = (image_x.floor().max(0.0) as usize).clamp(tile.min_x, tile.max_x - 1);
        let y = (image_y.floor().max(0.0) as usize).clamp(tile.min_y, tile.max_y - 1);
        debug_assert!(tile.max_x <= self.width && tile.max_y <= self.height);

        if !l.is_finite() {
            self.dropped_samples.fetch_add(1, Ordering::Relaxed);
            return;
        }

        let dx = (image_x - (x as Float + 0.5)).clamp(-0.5, 0.5);
        let dy = (image_y - (y as Float + 0.5)).clamp(-0.5, 0.5);
        let w = self.filter.evaluate(dx, dy);
        self.accum[x + y * self.width].add(l, w);
    }

    pub fn incre_sample_count(&self) {
        self.sample_count.fetch_add(1, Ordering::AcqRel);
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count.load(Ordering::Acquire)
    }

    /// Samples rejected because the integrator returned NaN or infinity.
    pub fn dropped_samples(&self) -> u32 {
        self.dropped_samples.load(Ordering::Relaxed)
    }

    /// Normalizes the accumulated sums into displayable pixel values.
    pub fn scale_to_pixel(&self) {
        let mut display = self.display.write();
        if self.reconstruct {
            let r = self.filter.radius();
            let reach = (r - 0.5).ceil().max(0.0) as isize;
            for y in 0..self.height {
                for x in 0..self.width {
                    let mut sum = Vector3f::zeros();
                    let mut weight = 0.0;
                    for oy in -reach..=reach {
                        for ox in -reach..=reach {
                            let (nx, ny) = (x as isize + ox, y as isize + oy);
                            if nx < 0 || ny < 0 || nx >= self.width as isize || ny >= self.height as isize {
                                continue;
                            }
                            let w = self.filter.evaluate(ox as Float, oy as Float);
                            let (rgb, wsum) = self.accum[nx as usize + ny as usize * self.width].load();
                            sum += rgb * w;
                            weight += wsum * w;
                        }
                    }
                    display[x + y * self.width] = if weight > 0.0 { sum / weight } else { Vector3f::zeros() };
                }
            }
        } else {
            for (out, pixel) in display.iter_mut().zip(&self.accum) {
                let (rgb, weight) = pixel.load();
                *out = if weight > 0.0 { rgb / weight } else { Vector3f::zeros() };
            }
        }
    }

    pub fn frame_buffer(&self) -> Bitmap {
        Bitmap::from_data(self.width, self.height, self.display.read().clone())
    }
}
