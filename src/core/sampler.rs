// Copyright @yucwang 2026

use crate::core::rng::LcgRng;
use crate::core::sensor::CameraSample;
use crate::math::constants::{Float, Vector2f};

/// Shape of the per-ray random numbers an integrator asks for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleLayout {
    arrays_1d: Vec<usize>,
    arrays_2d: Vec<usize>,
}

impl SampleLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the index to pass to `SampleBuffer::array_1d`.
    pub fn request_1d_array(&mut self, len: usize) -> usize {
        self.arrays_1d.push(len);
        self.arrays_1d.len() - 1
    }

    pub fn request_2d_array(&mut self, len: usize) -> usize {
        self.arrays_2d.push(len);
        self.arrays_2d.len() - 1
    }

    pub fn arrays_1d(&self) -> &[usize] {
        &self.arrays_1d
    }

    pub fn arrays_2d(&self) -> &[usize] {
        &self.arrays_2d
    }

    pub fn dimension_count(&self) -> usize {
        4 + self.arrays_1d.iter().sum::<usize>() + 2 * self.arrays_2d.iter().sum::<usize>()
    }
}

/// Sample values for one camera ray, refilled by the sampler before each ray.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    /// Raster position; the sampler writes the offset within the pixel and
    /// the renderer adds the pixel coordinates.
    pub image_x: Float,
    pub image_y: Float,
    pub lens_u: Float,
    pub lens_v: Float,
    values_1d: Vec<Vec<Float>>,
    values_2d: Vec<Vec<Vector2f>>,
}

impl SampleBuffer {
    pub fn from_layout(layout: &SampleLayout) -> Self {
        Self {
            image_x: 0.0,
            image_y: 0.0,
            lens_u: 0.5,
            lens_v: 0.5,
            values_1d: layout.arrays_1d().iter().map(|n| vec![0.0; *n]).collect(),
            values_2d: layout.arrays_2d().iter().map(|n| vec![Vector2f::new(0.5, 0.5); *n]).collect(),
        }
    }

    pub fn camera_sample(&self) -> CameraSample {
        CameraSample::new(self.image_x, self.image_y, self.lens_u, self.lens_v)
    }

    pub fn array_1d(&self, index: usize) -> &[Float] {
        &self.values_1d[index]
    }

    pub fn array_2d(&self, index: usize) -> &[Vector2f] {
        &self.values_2d[index]
    }

    pub fn arrays_1d_mut(&mut self) -> impl Iterator<Item = &mut [Float]> {
        self.values_1d.iter_mut().map(|v| v.as_mut_slice())
    }

    pub fn arrays_2d_mut(&mut self) -> impl Iterator<Item = &mut [Vector2f]> {
        self.values_2d.iter_mut().map(|v| v.as_mut_slice())
    }
}

pub trait Sampler: Send + Sync {
    /// Fills every dimension of `buffer` for one sample of pass `pass`.
    fn generate_samples(&self, pass: u32, buffer: &mut SampleBuffer, rng: &mut LcgRng);

    fn describe(&self) -> String {
        String::from("Sampler")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_shapes_buffer() {
        let mut layout = SampleLayout::new();
        let light = layout.request_2d_array(3);
        let component = layout.request_1d_array(5);
        let bsdf = layout.request_2d_array(2);
        assert_eq!((light, component, bsdf), (0, 0, 1));
        assert_eq!(layout.dimension_count(), 4 + 5 + 2 * 5);

        let buffer = SampleBuffer::from_layout(&layout);
        assert_eq!(buffer.array_2d(light).len(), 3);
        assert_eq!(buffer.array_1d(component).len(), 5);
        assert_eq!(buffer.array_2d(bsdf).len(), 2);
    }
}
