// Copyright @yucwang 2023

use super::triangle::Triangle;

use crate::io::obj_utils;
use crate::io::obj_utils::ObjLoadError;
use crate::math::aabb::AABB;
use crate::math::constants::{ Float, Vector3f };
use crate::math::ray::Ray3f;

use std::path::Path;
use std::vec::Vec;

pub struct TriangleMesh {
    triangles: Vec<Triangle>,
    tri_areas: Vec<Float>,
    total_area: Float,
    bounds: AABB,
}

impl TriangleMesh {
    pub fn from_triangles(triangles: Vec<Triangle>) -> Self {
        let mut mesh = Self { triangles, tri_areas: Vec::new(), total_area: 0.0, bounds: AABB::default() };
        mesh.update_derived();
        mesh
    }

    pub fn from_obj<P: AsRef<Path>>(path: P) -> Result<Self, ObjLoadError> {
        let obj_set = obj_utils::load_obj_from_file(path)?;
        Ok(Self::from_obj_set(obj_set))
    }

    pub fn from_obj_str(input: &str) -> Result<Self, ObjLoadError> {
        let obj_set = obj_utils::load_obj_from_str(input)?;
        Ok(Self::from_obj_set(obj_set))
    }

    fn from_obj_set(obj_set: wavefront_obj::obj::ObjSet) -> Self {
        let mut triangles = Vec::new();
        for object in obj_set.objects {
            let vertices: Vec<Vector3f> = object.vertices.iter()
                .map(|v| Vector3f::new(v.x as Float, v.y as Float, v.z as Float))
                .collect();
            for geom in object.geometry {
                for shape in geom.shapes {
                    if let wavefront_obj::obj::Primitive::Triangle(a, b, c) = shape.primitive {
                        triangles.push(Triangle::new(vertices[a.0], vertices[b.0], vertices[c.0]));
                    }
                }
            }
        }
        Self::from_triangles(triangles)
    }

    pub fn apply_transform(&mut self, scale: &Vector3f, translate: &Vector3f) {
        for tri in &mut self.triangles {
            tri.apply_transform(scale, translate);
        }
        self.update_derived();
    }

    fn update_derived(&mut self) {
        self.tri_areas = self.triangles.iter().map(|t| t.surface_area()).collect();
        self.total_area = self.tri_areas.iter().sum();
        self.bounds = AABB::default();
        for tri in &self.triangles {
            self.bounds.expand_by_aabb(&tri.bounding_box());
        }
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn triangle_area(&self, idx: usize) -> Float {
        self.tri_areas[idx]
    }

    pub fn surface_area(&self) -> Float {
        self.total_area
    }

    pub fn bounding_box(&self) -> AABB {
        self.bounds
    }

    /// Closest hit as `(t, triangle index)`.
    pub fn ray_intersection(&self, ray: &Ray3f) -> Option<(Float, usize)> {
        if !self.bounds.ray_intersect(ray) {
            return None;
        }

        let mut segment = *ray;
        let mut closest = None;
        for (idx, tri) in self.triangles.iter().enumerate() {
            if let Some(t) = tri.ray_intersection_t(&segment) {
                segment.max_t = t;
                closest = Some((t, idx));
            }
        }
        closest
    }

    pub fn ray_intersection_t(&self, ray: &Ray3f) -> bool {
        self.bounds.ray_intersect(ray)
            && self.triangles.iter().any(|tri| tri.ray_intersection_t(ray).is_some())
    }
}
