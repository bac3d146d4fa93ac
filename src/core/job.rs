// Copyright @yucwang 2026

use crate::core::error::{RenderError, RenderResult};
use crate::math::constants::{Float, Vector3f};

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraParams {
    pub position: Vector3f,
    pub target: Vector3f,
    pub up: Vector3f,
    /// Vertical field of view in degrees.
    pub fov_y: Float,
    pub near_clip: Float,
    pub far_clip: Float,
    /// Zero selects a pinhole camera.
    pub lens_radius: Float,
    pub focal_distance: Float,
}

impl Default for CameraParams {
    fn default() -> Self {
        Self {
            position: Vector3f::new(0.0, 0.0, 0.0),
            target: Vector3f::new(0.0, 0.0, -1.0),
            up: Vector3f::new(0.0, 1.0, 0.0),
            fov_y: 35.0,
            near_clip: 1e-3,
            far_clip: 1000.0,
            lens_radius: 0.0,
            focal_distance: 1.0,
        }
    }
}

impl CameraParams {
    pub fn validate(&self) -> RenderResult<()> {
        let view = self.target - self.position;
        if view.norm() <= 0.0 || !view.iter().all(|v| v.is_finite()) {
            return Err(RenderError::InvalidCamera(String::from("position and target coincide")));
        }
        if view.normalize().cross(&self.up).norm() < 1e-6 {
            return Err(RenderError::InvalidCamera(String::from("up vector is parallel to the view direction")));
        }
        if !(self.fov_y > 0.0 && self.fov_y < 180.0) {
            return Err(RenderError::InvalidCamera(format!("field of view {} out of (0, 180)", self.fov_y)));
        }
        if !(self.near_clip > 0.0 && self.near_clip < self.far_clip) {
            return Err(RenderError::InvalidCamera(format!(
                "clip range [{}, {}] is empty", self.near_clip, self.far_clip)));
        }
        if !(self.lens_radius >= 0.0) {
            return Err(RenderError::InvalidCamera(format!("negative lens radius {}", self.lens_radius)));
        }
        if self.lens_radius > 0.0 && !(self.focal_distance > 0.0) {
            return Err(RenderError::InvalidCamera(String::from("thin lens needs a positive focal distance")));
        }
        Ok(())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum IntegratorKind {
    Constant,
    DirectLighting,
    PathTracing,
    /// Recognised by the job loader but not implemented.
    Bidirectional,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SamplerKind {
    Random,
    Stratified,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FilterKind {
    Box,
    Gaussian,
    MitchellNetravali,
}

/// Everything needed to set up one render; consumed by `Renderer::initialize`.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderJobDesc {
    pub image_width: usize,
    pub image_height: usize,
    pub samples_per_pixel: u32,
    pub camera: CameraParams,
    pub integrator: IntegratorKind,
    pub max_path_length: u32,
    pub sampler: SamplerKind,
    pub filter: FilterKind,
    pub reconstruct: bool,
    /// `None` uses the available hardware parallelism.
    pub thread_count: Option<usize>,
    pub seed: u64,
    pub show_progress: bool,
    /// Radiance returned by the constant integrator.
    pub constant_color: Vector3f,
}

impl Default for RenderJobDesc {
    fn default() -> Self {
        Self {
            image_width: 640,
            image_height: 480,
            samples_per_pixel: 16,
            camera: CameraParams::default(),
            integrator: IntegratorKind::PathTracing,
            max_path_length: 8,
            sampler: SamplerKind::Random,
            filter: FilterKind::Box,
            reconstruct: false,
            thread_count: None,
            seed: 0,
            show_progress: false,
            constant_color: Vector3f::new(1.0, 1.0, 1.0),
        }
    }
}

impl RenderJobDesc {
    pub fn validate(&self) -> RenderResult<()> {
        validate_resolution(self.image_width, self.image_height)?;
        if self.samples_per_pixel == 0 {
            return Err(RenderError::InvalidJob(String::from("samples per pixel must be at least 1")));
        }
        if self.max_path_length == 0 && self.integrator != IntegratorKind::Constant {
            return Err(RenderError::InvalidJob(String::from("max path length must be at least 1")));
        }
        if self.integrator == IntegratorKind::Bidirectional {
            return Err(RenderError::InvalidJob(String::from("bidirectional path tracing is not supported")));
        }
        if self.thread_count == Some(0) {
            return Err(RenderError::InvalidJob(String::from("thread count must be at least 1")));
        }
        self.camera.validate()
    }

    pub fn resolved_thread_count(&self) -> usize {
        self.thread_count.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}

pub fn validate_resolution(width: usize, height: usize) -> RenderResult<()> {
    // Raster coordinates must stay exact in f32.
    if width == 0 || height == 0 || width > (1 << 16) || height > (1 << 16) {
        return Err(RenderError::InvalidResolution { width, height });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_job_is_valid() {
        assert!(RenderJobDesc::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_degenerate_jobs() {
        let mut job = RenderJobDesc::default();
        job.image_width = 0;
        assert!(matches!(job.validate(), Err(RenderError::InvalidResolution { .. })));

        let mut job = RenderJobDesc::default();
        job.samples_per_pixel = 0;
        assert!(matches!(job.validate(), Err(RenderError::InvalidJob(_))));

        let mut job = RenderJobDesc::default();
        job.thread_count = Some(0);
        assert!(matches!(job.validate(), Err(RenderError::InvalidJob(_))));

        let mut job = RenderJobDesc::default();
        job.integrator = IntegratorKind::Bidirectional;
        assert!(matches!(job.validate(), Err(RenderError::InvalidJob(_))));
    }

    #[test]
    fn test_rejects_degenerate_cameras() {
        let mut camera = CameraParams::default();
        camera.up = Vector3f::new(0.0, 0.0, 2.0);
        assert!(matches!(camera.validate(), Err(RenderError::InvalidCamera(_))));

        let mut camera = CameraParams::default();
        camera.near_clip = 10.0;
        camera.far_clip = 1.0;
        assert!(camera.validate().is_err());

        let mut camera = CameraParams::default();
        camera.lens_radius = -0.1;
        assert!(camera.validate().is_err());

        let mut camera = CameraParams::default();
        camera.lens_radius = 0.1;
        camera.focal_distance = 0.0;
        assert!(camera.validate().is_err());
    }
}
