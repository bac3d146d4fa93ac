// Copyright @yucwang 2026

use crate::math::constants::{ Float, Vector2f, Vector3f };
use crate::math::ray::Ray3f;
use crate::math::spectrum::RGBSpectrum;
use crate::shapes::triangle_mesh::TriangleMesh;

/// A diffuse mesh, optionally emitting from its front faces.
pub struct SceneObject {
    mesh: TriangleMesh,
    albedo: RGBSpectrum,
    emission: RGBSpectrum,
    name: Option<String>,
}

impl SceneObject {
    pub fn new(mesh: TriangleMesh, albedo: RGBSpectrum) -> Self {
        Self { mesh, albedo, emission: RGBSpectrum::default(), name: None }
    }

    pub fn with_emission(mut self, emission: RGBSpectrum) -> Self {
        self.emission = emission;
        self
    }

    pub fn with_name(mut self, name: String) -> Self {
        self.name = Some(name);
        self
    }

    pub fn mesh(&self) -> &TriangleMesh {
        &self.mesh
    }

    pub fn albedo(&self) -> RGBSpectrum {
        self.albedo
    }

    pub fn emission(&self) -> RGBSpectrum {
        self.emission
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

#[derive(Debug, Copy, Clone)]
pub struct SurfaceHit {
    pub p: Vector3f,
    pub geo_normal: Vector3f,
    pub t: Float,
    pub object: usize,
    pub triangle: usize,
}

#[derive(Debug, Copy, Clone)]
pub struct EmitterSample {
    pub p: Vector3f,
    pub n: Vector3f,
    pub le: RGBSpectrum,
    /// Density with respect to area over all emissive surfaces.
    pub pdf_area: Float,
}

struct EmissiveTriangle {
    object: usize,
    triangle: usize,
    cdf: Float,
}

/// Nearest-hit / any-hit oracle over a flat list of meshes.
pub struct Scene {
    objects: Vec<SceneObject>,
    background: RGBSpectrum,
    emitters: Vec<EmissiveTriangle>,
    emissive_area: Float,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
            background: RGBSpectrum::default(),
            emitters: Vec::new(),
            emissive_area: 0.0,
        }
    }

    pub fn with_objects(objects: Vec<SceneObject>) -> Self {
        let mut scene = Self::new();
        scene.objects = objects;
        scene.build_emitter_distribution();
        scene
    }

    pub fn add_object(&mut self, object: SceneObject) {
        self.objects.push(object);
        self.build_emitter_distribution();
    }

    pub fn set_background(&mut self, background: RGBSpectrum) {
        self.background = background;
    }

    pub fn background(&self) -> RGBSpectrum {
        self.background
    }

    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub fn object(&self, idx: usize) -> &SceneObject {
        &self.objects[idx]
    }

    pub fn has_emitters(&self) -> bool {
        !self.emitters.is_empty()
    }

    fn build_emitter_distribution(&mut self) {
        self.emitters.clear();
        let mut cdf = 0.0;
        for (object, obj) in self.objects.iter().enumerate() {
            if obj.emission.is_black() {
                continue;
            }
            for triangle in 0..obj.mesh.triangles().len() {
                cdf += obj.mesh.triangle_area(triangle);
                self.emitters.push(EmissiveTriangle { object, triangle, cdf });
            }
        }
        self.emissive_area = cdf;
    }

    pub fn ray_intersection(&self, ray: &Ray3f) -> Option<SurfaceHit> {
        let mut segment = *ray;
        let mut closest: Option<(Float, usize, usize)> = None;
        for (object, obj) in self.objects.iter().enumerate() {
            if let Some((t, triangle)) = obj.mesh.ray_intersection(&segment) {
                segment.max_t = t;
                closest = Some((t, object, triangle));
            }
        }

        closest.map(|(t, object, triangle)| SurfaceHit {
            p: ray.at(t),
            geo_normal: self.objects[object].mesh.triangles()[triangle].geometric_normal(),
            t,
            object,
            triangle,
        })
    }

    pub fn occluded(&self, ray: &Ray3f) -> bool {
        self.objects.iter().any(|obj| obj.mesh.ray_intersection_t(ray))
    }

    /// Radiance leaving `hit` towards `wo`; emitters are one-sided.
    pub fn emitted(&self, hit: &SurfaceHit, wo: &Vector3f) -> RGBSpectrum {
        if hit.geo_normal.dot(wo) > 0.0 {
            self.objects[hit.object].emission
        } else {
            RGBSpectrum::default()
        }
    }

    /// Picks an emissive triangle proportionally to its area, then a uniform
    /// point on it.
    pub fn sample_emitter(&self, u_select: Float, u: &Vector2f) -> Option<EmitterSample> {
        if self.emitters.is_empty() || self.emissive_area <= 0.0 {
            return None;
        }

        let target = u_select * self.emissive_area;
        let idx = self.emitters.partition_point(|e| e.cdf <= target).min(self.emitters.len() - 1);
        let emitter = &self.emitters[idx];
        let obj = &self.objects[emitter.object];
        let (p, n) = obj.mesh.triangles()[emitter.triangle].sample(u);

        Some(EmitterSample { p, n, le: obj.emission, pdf_area: 1.0 / self.emissive_area })
    }
}
