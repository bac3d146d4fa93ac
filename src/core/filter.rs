// Copyright @yucwang 2026

use crate::core::job::FilterKind;
use crate::math::constants::Float;

/// Pixel reconstruction filter, evaluated at offsets in pixel units.
pub trait Filter: Send + Sync + std::fmt::Debug {
    fn evaluate(&self, dx: Float, dy: Float) -> Float;
    fn radius(&self) -> Float;
}

#[derive(Debug)]
pub struct BoxFilter {
    radius: Float,
}

impl BoxFilter {
    pub fn new(radius: Float) -> Self {
        Self { radius }
    }
}

impl Filter for BoxFilter {
    fn evaluate(&self, dx: Float, dy: Float) -> Float {
        if dx.abs() <= self.radius && dy.abs() <= self.radius { 1.0 } else { 0.0 }
    }

    fn radius(&self) -> Float {
        self.radius
    }
}

#[derive(Debug)]
pub struct GaussianFilter {
    radius: Float,
    alpha: Float,
    exp_r: Float,
}

impl GaussianFilter {
    pub fn new(radius: Float, alpha: Float) -> Self {
        Self { radius, alpha, exp_r: (-alpha * radius * radius).exp() }
    }

    fn gaussian(&self, d: Float) -> Float {
        ((-self.alpha * d * d).exp() - self.exp_r).max(0.0)
    }
}

impl Filter for GaussianFilter {
    fn evaluate(&self, dx: Float, dy: Float) -> Float {
        self.gaussian(dx) * self.gaussian(dy)
    }

    fn radius(&self) -> Float {
        self.radius
    }
}

#[derive(Debug)]
pub struct MitchellNetravaliFilter {
    radius: Float,
    b: Float,
    c: Float,
}

impl MitchellNetravaliFilter {
    pub fn new(radius: Float, b: Float, c: Float) -> Self {
        Self { radius, b, c }
    }

    fn mitchell_1d(&self, x: Float) -> Float {
        let x = (2.0 * x / self.radius).abs();
        let (b, c) = (self.b, self.c);
        let v = if x > 2.0 {
            0.0
        } else if x > 1.0 {
            (-b - 6.0 * c) * x * x * x + (6.0 * b + 30.0 * c) * x * x
                + (-12.0 * b - 48.0 * c) * x + (8.0 * b + 24.0 * c)
        } else {
            (12.0 - 9.0 * b - 6.0 * c) * x * x * x + (-18.0 + 12.0 * b + 6.0 * c) * x * x
                + (6.0 - 2.0 * b)
        };
        v * (1.0 / 6.0)
    }
}

impl Filter for MitchellNetravaliFilter {
    fn evaluate(&self, dx: Float, dy: Float) -> Float {
        self.mitchell_1d(dx) * self.mitchell_1d(dy)
    }

    fn radius(&self) -> Float {
        self.radius
    }
}

pub fn create_filter(kind: FilterKind) -> Box<dyn Filter> {
    match kind {
        FilterKind::Box => Box::new(BoxFilter::new(0.5)),
        FilterKind::Gaussian => Box::new(GaussianFilter::new(1.5, 2.0)),
        FilterKind::MitchellNetravali => Box::new(MitchellNetravaliFilter::new(2.0, 1.0 / 3.0, 1.0 / 3.0)),
    }
}
