// Copyright @yucwang 2026

use crate::core::arena::ScratchArena;
use crate::core::integrator::Integrator;
use crate::core::rng::LcgRng;
use crate::core::sampler::{ SampleBuffer, SampleLayout };
use crate::core::scene::Scene;
use crate::integrators::direct::{ estimate_direct, shading_normal, spawn_ray };
use crate::math::constants::{ Float, Vector2f };
use crate::math::frame::Frame;
use crate::math::ray::{ Ray3f, RayDifferential };
use crate::math::spectrum::RGBSpectrum;
use crate::math::warp::sample_cosine_hemisphere;

const RUSSIAN_ROULETTE_DEPTH: u32 = 3;

#[derive(Debug, Copy, Clone)]
struct PathVertex {
    throughput: RGBSpectrum,
    radiance: RGBSpectrum,
}

/// Diffuse path tracer with next event estimation.
///
/// Emission is only picked up by the camera ray; every later bounce gets its
/// emitter contribution from the explicit light sample, so no emitter is
/// counted twice. The first bounce draws from the sampler's arrays, deeper
/// bounces fall back to the thread rng.
pub struct PathIntegrator {
    max_depth: u32,
    select_array: Option<usize>,
    light_array: Option<usize>,
    bounce_array: Option<usize>,
}

impl PathIntegrator {
    pub fn new(max_depth: u32) -> Self {
        Self { max_depth: max_depth.max(1), select_array: None, light_array: None, bounce_array: None }
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    fn first_bounce_samples(&self, samples: &SampleBuffer, rng: &mut LcgRng) -> (Float, Vector2f, Vector2f) {
        let u_select = match self.select_array {
            Some(idx) => samples.array_1d(idx)[0],
            None => rng.next_f32(),
        };
        let u_light = match self.light_array {
            Some(idx) => samples.array_2d(idx)[0],
            None => rng.next_vec2(),
        };
        let u_bounce = match self.bounce_array {
            Some(idx) => samples.array_2d(idx)[0],
            None => rng.next_vec2(),
        };
        (u_select, u_light, u_bounce)
    }
}

impl Integrator for PathIntegrator {
    fn request_samples(&mut self, scene: &Scene, layout: &mut SampleLayout) {
        if scene.has_emitters() {
            self.select_array = Some(layout.request_1d_array(1));
            self.light_array = Some(layout.request_2d_array(1));
        }
        self.bounce_array = Some(layout.request_2d_array(1));
    }

    fn li(&self,
          ray: &RayDifferential,
          scene: &Scene,
          samples: &SampleBuffer,
          rng: &mut LcgRng,
          arena: &ScratchArena) -> RGBSpectrum {
        let empty = PathVertex { throughput: RGBSpectrum::default(), radiance: RGBSpectrum::default() };
        let vertices = arena.alloc_slice(self.max_depth as usize + 1, empty);
        let mut vertex_count = 0;

        let mut ray: Ray3f = ray.ray;
        let mut throughput = RGBSpectrum::splat(1.0);

        for depth in 0..self.max_depth {
            let hit = match scene.ray_intersection(&ray) {
                Some(hit) => hit,
                None => {
                    vertices[vertex_count] = PathVertex { throughput, radiance: scene.background() };
                    vertex_count += 1;
                    break;
                }
            };

            let wo = -ray.dir();
            let n = shading_normal(&hit, &wo);
            let (u_select, u_light, u_bounce) = if depth == 0 {
                self.first_bounce_samples(samples, rng)
            } else {
                (rng.next_f32(), rng.next_vec2(), rng.next_vec2())
            };

            let mut radiance = estimate_direct(scene, &hit, &n, u_select, &u_light);
            if depth == 0 {
                radiance += scene.emitted(&hit, &wo);
            }
            vertices[vertex_count] = PathVertex { throughput, radiance };
            vertex_count += 1;

            if depth + 1 == self.max_depth {
                break;
            }

            // Cosine sampling cancels the Lambertian cos / pdf.
            throughput = throughput * scene.object(hit.object).albedo();
            if throughput.is_black() {
                break;
            }

            if depth + 1 >= RUSSIAN_ROULETTE_DEPTH {
                let q = (1.0 - throughput.max_component()).max(0.05);
                if rng.next_f32() < q {
                    break;
                }
                throughput = throughput / (1.0 - q);
            }

            let wi = Frame::from_normal(&n).from_local(&sample_cosine_hemisphere(&u_bounce));
            ray = spawn_ray(&hit.p, &n, wi);
        }

        vertices[..vertex_count]
            .iter()
            .fold(RGBSpectrum::default(), |acc, v| acc + v.throughput * v.radiance)
    }

    fn describe(&self) -> String {
        format!("PathIntegrator[max_depth = {}]", self.max_depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scene::SceneObject;
    use crate::core::scene::test_util::square;
    use crate::math::constants::Vector3f;
    use approx::assert_relative_eq;

    fn li(integrator: &mut PathIntegrator, scene: &Scene, ray: &RayDifferential) -> RGBSpectrum {
        let mut layout = SampleLayout::new();
        integrator.request_samples(scene, &mut layout);
        let samples = SampleBuffer::from_layout(&layout);
        let mut arena = ScratchArena::new();
        let l = integrator.li(ray, scene, &samples, &mut LcgRng::new(11), &arena);
        arena.free_all();
        l
    }

    fn down_ray() -> RayDifferential {
        RayDifferential::new(Ray3f::new(Vector3f::new(0.0, 0.0, 1.0), Vector3f::new(0.0, 0.0, -1.0), None, None))
    }

    #[test]
    fn test_sees_emitter_directly() {
        let scene = Scene::with_objects(vec![
            SceneObject::new(square(0.0, 1.0, true), RGBSpectrum::default())
                .with_emission(RGBSpectrum::new(1.0, 2.0, 3.0)),
        ]);
        let l = li(&mut PathIntegrator::new(4), &scene, &down_ray());
        assert_eq!(l, RGBSpectrum::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_escaped_ray_returns_background() {
        let mut scene = Scene::new();
        scene.set_background(RGBSpectrum::splat(0.25));
        let l = li(&mut PathIntegrator::new(4), &scene, &down_ray());
        assert_eq!(l, RGBSpectrum::splat(0.25));
    }

    #[test]
    fn test_single_bounce_under_uniform_sky() {
        let mut scene = Scene::with_objects(vec![
            SceneObject::new(square(0.0, 4.0, true), RGBSpectrum::splat(0.5)),
        ]);
        scene.set_background(RGBSpectrum::splat(1.0));

        // One surface vertex: the bounce is never traced.
        let l = li(&mut PathIntegrator::new(1), &scene, &down_ray());
        assert!(l.is_black());

        // Two: the floor's cosine bounce escapes to the sky.
        let l = li(&mut PathIntegrator::new(2), &scene, &down_ray());
        assert_relative_eq!(l[0], 0.5, epsilon = 1e-5);
    }
}
