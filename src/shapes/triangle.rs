// Copyright @yucwang 2023

use crate::math::aabb::AABB;
use crate::math::constants::{ Float, Vector2f, Vector3f };
use crate::math::ray::Ray3f;
use crate::math::warp::square_to_triangle;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Triangle {
    p0: Vector3f,
    p1: Vector3f,
    p2: Vector3f
}

impl Triangle {
    pub fn new(p0: Vector3f, p1: Vector3f, p2: Vector3f) -> Self {
        Triangle { p0, p1, p2 }
    }

    pub fn bounding_box(&self) -> AABB {
        let mut bound = AABB::new(self.p0, self.p1);
        bound.expand_by_point(&self.p2);
        bound
    }

    /// Counter-clockwise winding defines the front face.
    pub fn geometric_normal(&self) -> Vector3f {
        (self.p1 - self.p0).cross(&(self.p2 - self.p0)).normalize()
    }

    pub fn surface_area(&self) -> Float {
        0.5 * (self.p1 - self.p0).cross(&(self.p2 - self.p0)).norm()
    }

    /// Moller-Trumbore; returns the hit distance inside the ray segment.
    pub fn ray_intersection_t(&self, ray: &Ray3f) -> Option<Float> {
        let edge0 = self.p1 - self.p0;
        let edge1 = self.p2 - self.p0;
        let pvec = ray.dir().cross(&edge1);
        let det = edge0.dot(&pvec);
        if det.abs() < 1e-10 {
            return None;
        }

        let inv_det = 1.0 / det;
        let tvec = ray.origin() - self.p0;
        let u = tvec.dot(&pvec) * inv_det;
        if u < 0.0 || u > 1.0 {
            return None;
        }

        let qvec = tvec.cross(&edge0);
        let v = ray.dir().dot(&qvec) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = edge1.dot(&qvec) * inv_det;
        if ray.test_segment(t) { Some(t) } else { None }
    }

    /// Uniform point on the triangle, returned with the geometric normal.
    pub fn sample(&self, u: &Vector2f) -> (Vector3f, Vector3f) {
        let b = square_to_triangle(u);
        (self.p0 * b.x + self.p1 * b.y + self.p2 * b.z, self.geometric_normal())
    }

    pub fn apply_transform(&mut self, scale: &Vector3f, translate: &Vector3f) {
        self.p0 = self.p0.component_mul(scale) + translate;
        self.p1 = self.p1.component_mul(scale) + translate;
        self.p2 = self.p2.component_mul(scale) + translate;
    }
}
