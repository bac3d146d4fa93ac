// Copyright @yucwang 2026

use crate::core::arena::ScratchArena;
use crate::core::integrator::Integrator;
use crate::core::rng::LcgRng;
use crate::core::sampler::{ SampleBuffer, SampleLayout };
use crate::core::scene::{ Scene, SurfaceHit };
use crate::math::constants::{ Float, Vector2f, Vector3f, EPSILON, INV_PI };
use crate::math::frame::Frame;
use crate::math::ray::{ Ray3f, RayDifferential };
use crate::math::spectrum::RGBSpectrum;
use crate::math::warp::sample_cosine_hemisphere;

const SHADOW_EPSILON: Float = 1e-3;

/// Geometric normal flipped into the hemisphere of `wo`.
pub(crate) fn shading_normal(hit: &SurfaceHit, wo: &Vector3f) -> Vector3f {
    if hit.geo_normal.dot(wo) < 0.0 { -hit.geo_normal } else { hit.geo_normal }
}

pub(crate) fn spawn_ray(p: &Vector3f, n: &Vector3f, dir: Vector3f) -> Ray3f {
    Ray3f::new(p + n * EPSILON, dir, Some(EPSILON), None)
}

/// One emitter sample at a diffuse surface point, divided by the area pdf.
pub(crate) fn estimate_direct(scene: &Scene,
                              hit: &SurfaceHit,
                              n: &Vector3f,
                              u_select: Float,
                              u_light: &Vector2f) -> RGBSpectrum {
    let es = match scene.sample_emitter(u_select, u_light) {
        Some(es) => es,
        None => return RGBSpectrum::default(),
    };

    let offset = es.p - hit.p;
    let dist2 = offset.norm_squared();
    if dist2 <= 0.0 {
        return RGBSpectrum::default();
    }
    let dist = dist2.sqrt();
    let wi = offset / dist;
    let cos_surface = n.dot(&wi);
    let cos_light = -es.n.dot(&wi);
    if cos_surface <= 0.0 || cos_light <= 0.0 {
        return RGBSpectrum::default();
    }

    let mut shadow = spawn_ray(&hit.p, n, wi);
    shadow.max_t = dist * (1.0 - SHADOW_EPSILON);
    if scene.occluded(&shadow) {
        return RGBSpectrum::default();
    }

    let albedo = scene.object(hit.object).albedo();
    albedo * es.le * (INV_PI * cos_surface * cos_light / (dist2 * es.pdf_area))
}

/// Single scattering from the emitters plus one cosine-weighted lookup of
/// the background.
pub struct DirectLightingIntegrator {
    light_samples: usize,
    select_array: Option<usize>,
    position_array: Option<usize>,
    background_array: Option<usize>,
}

impl DirectLightingIntegrator {
    pub fn new(light_samples: usize) -> Self {
        Self {
            light_samples: light_samples.max(1),
            select_array: None,
            position_array: None,
            background_array: None,
        }
    }

    pub fn light_samples(&self) -> usize {
        self.light_samples
    }
}

impl Integrator for DirectLightingIntegrator {
    fn request_samples(&mut self, scene: &Scene, layout: &mut SampleLayout) {
        if scene.has_emitters() {
            self.select_array = Some(layout.request_1d_array(self.light_samples));
            self.position_array = Some(layout.request_2d_array(self.light_samples));
        }
        if !scene.background().is_black() {
            self.background_array = Some(layout.request_2d_array(1));
        }
    }

    fn li(&self,
          ray: &RayDifferential,
          scene: &Scene,
          samples: &SampleBuffer,
          rng: &mut LcgRng,
          _arena: &ScratchArena) -> RGBSpectrum {
        let hit = match scene.ray_intersection(&ray.ray) {
            Some(hit) => hit,
            None => return scene.background(),
        };

        let wo = -ray.ray.dir();
        let n = shading_normal(&hit, &wo);
        let mut l = scene.emitted(&hit, &wo);

        if let (Some(select), Some(position)) = (self.select_array, self.position_array) {
            let u_select = samples.array_1d(select);
            let u_light = samples.array_2d(position);
            let mut direct = RGBSpectrum::default();
            for (u, v) in u_select.iter().zip(u_light.iter()) {
                direct += estimate_direct(scene, &hit, &n, *u, v);
            }
            l += direct / self.light_samples as Float;
        }

        if !scene.background().is_black() {
            let u = match self.background_array {
                Some(idx) => samples.array_2d(idx)[0],
                None => rng.next_vec2(),
            };
            let frame = Frame::from_normal(&n);
            let wi = frame.from_local(&sample_cosine_hemisphere(&u));
            if !scene.occluded(&spawn_ray(&hit.p, &n, wi)) {
                // Lambertian f * cos / pdf reduces to the albedo.
                l += scene.object(hit.object).albedo() * scene.background();
            }
        }

        l
    }

    fn describe(&self) -> String {
        format!("DirectLightingIntegrator[light_samples = {}]", self.light_samples)
    }
}
