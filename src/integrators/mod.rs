// Copyright @yucwang 2026

pub mod constant;
pub mod direct;
pub mod path;

use log::info;

use crate::core::error::{ RenderError, RenderResult };
use crate::core::integrator::Integrator;
use crate::core::job::{ IntegratorKind, RenderJobDesc };
use crate::math::spectrum::RGBSpectrum;

pub fn create_integrator(job: &RenderJobDesc) -> RenderResult<Box<dyn Integrator>> {
    let integrator: Box<dyn Integrator> = match job.integrator {
        IntegratorKind::Constant => Box::new(constant::ConstantIntegrator::new(
            RGBSpectrum::from_vector(job.constant_color))),
        IntegratorKind::DirectLighting => Box::new(direct::DirectLightingIntegrator::new(1)),
        IntegratorKind::PathTracing => Box::new(path::PathIntegrator::new(job.max_path_length)),
        IntegratorKind::Bidirectional => {
            return Err(RenderError::InvalidJob(String::from("bidirectional path tracing is not supported")));
        }
    };
    info!("Integrator: {}", integrator.describe());
    Ok(integrator)
}
