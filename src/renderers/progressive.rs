// Copyright @yucwang 2026

use crate::core::arena::ScratchArena;
use crate::core::error::{ RenderError, RenderResult };
use crate::core::film::Film;
use crate::core::filter::create_filter;
use crate::core::integrator::Integrator;
use crate::core::job::{ CameraParams, RenderJobDesc };
use crate::core::rng::LcgRng;
use crate::core::sampler::{ SampleBuffer, SampleLayout, Sampler };
use crate::core::scene::Scene;
use crate::core::sensor::Sensor;
use crate::core::thread_pool::ThreadPool;
use crate::core::tile::{ TileClaim, TileScheduler, DEFAULT_TILE_SIZE };
use crate::integrators::create_integrator;
use crate::math::bitmap::Bitmap;
use crate::math::constants::Float;
use crate::samplers::create_sampler;
use crate::sensors::perspective::PerspectiveCamera;

use indicatif::{ ProgressBar, ProgressStyle };
use log::{ debug, error, info, warn };
use std::panic::{ catch_unwind, AssertUnwindSafe };
use std::sync::atomic::{ AtomicU64, Ordering };
use std::sync::Arc;
use std::time::Instant;

pub use super::renderer::Renderer;

/// Everything the workers of one render run read. Shared through an `Arc`;
/// mutation is only possible while no worker holds a clone.
struct RenderContext {
    job: RenderJobDesc,
    camera: Box<dyn Sensor>,
    scene: Arc<Scene>,
    film: Film,
    sampler: Box<dyn Sampler>,
    integrator: Box<dyn Integrator>,
    layout: SampleLayout,
    scheduler: TileScheduler,
    progress: ProgressBar,
    thread_count: usize,
    run: AtomicU64,
}

/// Progressive multi-threaded renderer: every worker takes part in each of
/// the `samples_per_pixel` passes, and the film holds a displayable average
/// after every completed pass.
pub struct ProgressiveRenderer {
    pool: Option<ThreadPool>,
    context: Option<Arc<RenderContext>>,
}

impl Default for ProgressiveRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressiveRenderer {
    pub fn new() -> Self {
        Self { pool: None, context: None }
    }

    pub fn initialize(&mut self, job: RenderJobDesc, scene: Arc<Scene>) -> RenderResult<()> {
        job.validate()?;
        let integrator = create_integrator(&job)?;
        self.initialize_with(job, scene, integrator)
    }

    /// Same as `initialize` with a caller supplied integrator.
    pub fn initialize_with(&mut self,
                           job: RenderJobDesc,
                           scene: Arc<Scene>,
                           mut integrator: Box<dyn Integrator>) -> RenderResult<()> {
        if self.is_rendering() {
            return Err(RenderError::RenderInFlight);
        }
        job.validate()?;

        let (width, height) = (job.image_width, job.image_height);
        let thread_count = job.resolved_thread_count();
        let camera = PerspectiveCamera::new(job.camera, width, height)?;
        let film = Film::new(width, height, create_filter(job.filter), job.reconstruct)?;
        let sampler = create_sampler(job.sampler, job.samples_per_pixel);

        let mut layout = SampleLayout::new();
        integrator.request_samples(&scene, &mut layout);

        let scheduler = TileScheduler::new(DEFAULT_TILE_SIZE, thread_count);
        scheduler.init(width, height);

        if self.pool.as_ref().map_or(true, |pool| pool.thread_count() != thread_count) {
            self.pool = None;
            self.pool = Some(ThreadPool::new(thread_count)?);
        }

        let progress = if job.show_progress {
            let bar = ProgressBar::new(job.samples_per_pixel as u64);
            bar.set_style(
                ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} passes")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            bar
        } else {
            ProgressBar::hidden()
        };

        info!("Renderer initialized: {}x{}, {} spp, {} threads.",
              width, height, job.samples_per_pixel, thread_count);
        info!("{}", camera.describe());
        info!("Sampler: {}, sample dimensions per ray: {}.",
              sampler.describe(), layout.dimension_count());

        self.context = Some(Arc::new(RenderContext {
            job,
            camera: Box::new(camera),
            scene,
            film,
            sampler,
            integrator,
            layout,
            scheduler,
            progress,
            thread_count,
            run: AtomicU64::new(0),
        }));
        Ok(())
    }

    fn context(&self) -> RenderResult<&Arc<RenderContext>> {
        self.context.as_ref().ok_or(RenderError::NotInitialized)
    }

    fn context_mut(&mut self) -> RenderResult<&mut RenderContext> {
        if self.is_rendering() {
            return Err(RenderError::RenderInFlight);
        }
        let context = self.context.as_mut().ok_or(RenderError::NotInitialized)?;
        Arc::get_mut(context).ok_or(RenderError::RenderInFlight)
    }

    /// Changes the output resolution. Accumulated samples are discarded.
    pub fn resize(&mut self, width: usize, height: usize) -> RenderResult<()> {
        crate::core::job::validate_resolution(width, height)?;
        let context = self.context_mut()?;
        context.film.resize(width, height)?;
        context.camera.resize(width, height);
        context.scheduler.init(width, height);
        context.job.image_width = width;
        context.job.image_height = height;
        info!("Renderer resized to {}x{}.", width, height);
        Ok(())
    }

    pub fn set_camera_params(&mut self, params: CameraParams) -> RenderResult<()> {
        let context = self.context_mut()?;
        let camera = PerspectiveCamera::new(params, context.job.image_width, context.job.image_height)?;
        context.camera = Box::new(camera);
        context.job.camera = params;
        debug!("{}", context.camera.describe());
        Ok(())
    }

    /// Clears the film and starts one render task per pool thread.
    pub fn queue_render_tasks(&mut self) -> RenderResult<()> {
        if self.is_rendering() {
            return Err(RenderError::RenderInFlight);
        }
        let context = Arc::clone(self.context()?);
        let pool = self.pool.as_ref().ok_or(RenderError::NotInitialized)?;

        context.film.clear();
        context.scheduler.set_abort(false);
        context.scheduler.begin_run(context.thread_count);
        context.progress.reset();
        let run = context.run.fetch_add(1, Ordering::AcqRel);

        info!("Queueing render run {} on {} threads.", run, context.thread_count);
        for thread_id in 0..context.thread_count {
            let context = Arc::clone(&context);
            pool.execute(move || render_image(&context, thread_id, run));
        }
        Ok(())
    }

    /// Aborts the current run and waits for every worker to leave it. Safe
    /// to call at any time, including when nothing is rendering.
    pub fn stop_render_tasks(&self) {
        let (context, pool) = match (self.context.as_ref(), self.pool.as_ref()) {
            (Some(context), Some(pool)) => (context, pool),
            _ => return,
        };
        if pool.outstanding() > 0 {
            warn!("Aborting render run after {} passes.", context.film.sample_count());
        }
        context.scheduler.set_abort(true);
        pool.join_all();
    }

    /// Waits for the current run to finish without aborting it.
    pub fn wait_render_tasks(&self) {
        if let Some(pool) = self.pool.as_ref() {
            pool.join_all();
        }
    }

    pub fn is_rendering(&self) -> bool {
        self.pool.as_ref().map_or(false, |pool| pool.outstanding() > 0)
    }

    /// Displayable image of the passes completed so far.
    pub fn frame_buffer(&self) -> RenderResult<Bitmap> {
        Ok(self.context()?.film.frame_buffer())
    }

    pub fn film(&self) -> RenderResult<&Film> {
        Ok(&self.context()?.film)
    }

    pub fn job(&self) -> RenderResult<&RenderJobDesc> {
        Ok(&self.context()?.job)
    }
}

impl Renderer for ProgressiveRenderer {
    fn render(&mut self) -> RenderResult<Bitmap> {
        let start = Instant::now();
        self.queue_render_tasks()?;
        self.wait_render_tasks();
        let context = self.context()?;
        context.progress.finish_and_clear();
        info!("Rendered {} passes in {:.2?}.", context.film.sample_count(), start.elapsed());
        if context.film.dropped_samples() > 0 {
            warn!("{} non-finite samples were dropped.", context.film.dropped_samples());
        }
        self.frame_buffer()
    }
}

impl Drop for ProgressiveRenderer {
    fn drop(&mut self) {
        self.stop_render_tasks();
    }
}

/// Body of one worker for a whole render run.
fn render_image(context: &RenderContext, thread_id: usize, run: u64) {
    let mut rng = LcgRng::for_thread(context.job.seed, run, thread_id);
    let mut arena = ScratchArena::new();
    let mut samples = SampleBuffer::from_layout(&context.layout);

    for _ in 0..context.job.samples_per_pixel {
        let pass = catch_unwind(AssertUnwindSafe(|| {
            render_pass(context, thread_id, &mut rng, &mut arena, &mut samples)
        }));
        match pass {
            Ok(true) => {}
            Ok(false) => break,
            Err(_) => {
                // Raising the abort flag releases everyone parked at a barrier.
                error!("Render thread {} panicked, aborting run {}.", thread_id, run);
                context.scheduler.set_abort(true);
                break;
            }
        }
    }
}

/// One pass of one worker. Returns `false` once the run is aborted.
fn render_pass(context: &RenderContext,
               thread_id: usize,
               rng: &mut LcgRng,
               arena: &mut ScratchArena,
               samples: &mut SampleBuffer) -> bool {
    if !context.scheduler.sync_threads_pre_render(thread_id) {
        return false;
    }

    while let Some(claim) = context.scheduler.next_task() {
        if !render_frame(context, &claim, rng, arena, samples) {
            break;
        }
    }

    let released = context.scheduler.sync_threads_post_render(thread_id, || {
        context.film.incre_sample_count();
        context.film.scale_to_pixel();
        context.scheduler.reset_tasks();
        context.progress.inc(1);
        debug!("Pass {} of {} done.", context.film.sample_count(), context.job.samples_per_pixel);
    });
    released && !context.scheduler.aborted()
}

/// Renders one sample for every pixel of a claimed tile.
fn render_frame(context: &RenderContext,
                claim: &TileClaim,
                rng: &mut LcgRng,
                arena: &mut ScratchArena,
                samples: &mut SampleBuffer) -> bool {
    let tile = &claim.tile;
    let differential_scale = 1.0 / (context.job.samples_per_pixel as Float).sqrt();

    for y in tile.min_y..tile.max_y {
        for x in tile.min_x..tile.max_x {
            if context.scheduler.aborted() {
                return false;
            }

            context.sampler.generate_samples(claim.pass, samples, rng);
            samples.image_x += x as Float;
            samples.image_y += y as Float;

            let camera_sample = samples.camera_sample();
            let mut ray = context.camera.generate_ray_differential(&camera_sample);
            ray.scale_differentials(differential_scale);

            let l = context.integrator.li(&ray, &context.scene, samples, rng, arena);
            arena.free_all();
            context.film.add_sample(claim, camera_sample.image_x, camera_sample.image_y, &l);
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::job::{ FilterKind, IntegratorKind, SamplerKind };
    use crate::math::constants::Vector3f;
    use crate::math::spectrum::RGBSpectrum;
    use approx::assert_relative_eq;
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use std::time::Duration;

    fn constant_job(width: usize, height: usize, spp: u32, threads: usize) -> RenderJobDesc {
        RenderJobDesc {
            image_width: width,
            image_height: height,
            samples_per_pixel: spp,
            integrator: IntegratorKind::Constant,
            constant_color: Vector3f::new(1.0, 0.0, 0.0),
            thread_count: Some(threads),
            ..RenderJobDesc::default()
        }
    }

    /// Counts `li` calls and sleeps in each of them.
    struct SlowIntegrator {
        calls: Arc<AtomicUsize>,
        delay: Duration,
    }

    impl Integrator for SlowIntegrator {
        fn li(&self,
              _ray: &crate::math::ray::RayDifferential,
              _scene: &Scene,
              _samples: &SampleBuffer,
              _rng: &mut LcgRng,
              _arena: &ScratchArena) -> RGBSpectrum {
            self.calls.fetch_add(1, Ordering::SeqCst);
            thread::sleep(self.delay);
            RGBSpectrum::splat(1.0)
        }

        fn describe(&self) -> String {
            String::from("SlowIntegrator")
        }
    }

    struct PanickingIntegrator;

    impl Integrator for PanickingIntegrator {
        fn li(&self,
              _ray: &crate::math::ray::RayDifferential,
              _scene: &Scene,
              samples: &SampleBuffer,
              _rng: &mut LcgRng,
              _arena: &ScratchArena) -> RGBSpectrum {
            if samples.image_x >= 40.0 {
                panic!("integrator failure at x = {}", samples.image_x);
            }
            RGBSpectrum::splat(1.0)
        }

        fn describe(&self) -> String {
            String::from("PanickingIntegrator")
        }
    }

    fn assert_uniform(image: &Bitmap, expected: Vector3f) {
        for y in 0..image.height() {
            for x in 0..image.width() {
                assert_relative_eq!(image[(x, y)], expected, epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn test_constant_color_end_to_end() {
        let mut renderer = ProgressiveRenderer::new();
        renderer.initialize(constant_job(2, 2, 4, 2), Arc::new(Scene::new())).unwrap();
        let image = renderer.render().unwrap();

        assert_eq!((image.width(), image.height()), (2, 2));
        assert_uniform(&image, Vector3f::new(1.0, 0.0, 0.0));
        assert_eq!(renderer.film().unwrap().sample_count(), 4);
        assert!(!renderer.is_rendering());
    }

    #[test]
    fn test_single_pass_constant_render() {
        let job = constant_job(2, 2, 1, 1);
        assert_eq!(job.camera.lens_radius, 0.0);

        let mut renderer = ProgressiveRenderer::new();
        renderer.initialize(job, Arc::new(Scene::new())).unwrap();
        let image = renderer.render().unwrap();

        assert_eq!((image.width(), image.height()), (2, 2));
        assert_uniform(&image, Vector3f::new(1.0, 0.0, 0.0));
        assert_eq!(renderer.film().unwrap().sample_count(), 1);
        assert_eq!(renderer.film().unwrap().dropped_samples(), 0);
        assert!(!renderer.is_rendering());
    }

    #[test]
    fn test_stratified_gaussian_reconstruction_keeps_constant() {
        let mut job = constant_job(37, 23, 9, 3);
        job.sampler = SamplerKind::Stratified;
        job.filter = FilterKind::Gaussian;
        job.reconstruct = true;

        let mut renderer = ProgressiveRenderer::new();
        renderer.initialize(job, Arc::new(Scene::new())).unwrap();
        assert_uniform(&renderer.render().unwrap(), Vector3f::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_resize_between_runs() {
        let mut renderer = ProgressiveRenderer::new();
        renderer.initialize(constant_job(70, 40, 2, 4), Arc::new(Scene::new())).unwrap();
        renderer.render().unwrap();

        renderer.resize(33, 65).unwrap();
        assert_eq!(renderer.job().unwrap().image_width, 33);
        let image = renderer.frame_buffer().unwrap();
        assert_eq!((image.width(), image.height()), (33, 65));
        assert_uniform(&image, Vector3f::zeros());

        let image = renderer.render().unwrap();
        assert_eq!((image.width(), image.height()), (33, 65));
        assert_uniform(&image, Vector3f::new(1.0, 0.0, 0.0));

        assert!(matches!(renderer.resize(0, 10), Err(RenderError::InvalidResolution { .. })));
    }

    #[test]
    fn test_uninitialized_renderer() {
        let mut renderer = ProgressiveRenderer::new();
        assert!(matches!(renderer.queue_render_tasks(), Err(RenderError::NotInitialized)));
        assert!(matches!(renderer.resize(4, 4), Err(RenderError::NotInitialized)));
        assert!(matches!(renderer.frame_buffer(), Err(RenderError::NotInitialized)));
        renderer.stop_render_tasks();
    }

    #[test]
    fn test_abort_is_prompt() {
        let threads = 4;
        let calls = Arc::new(AtomicUsize::new(0));
        let integrator = SlowIntegrator { calls: Arc::clone(&calls), delay: Duration::from_millis(1) };

        let mut renderer = ProgressiveRenderer::new();
        renderer.initialize_with(constant_job(128, 128, 1000, threads),
                                 Arc::new(Scene::new()),
                                 Box::new(integrator)).unwrap();
        renderer.queue_render_tasks().unwrap();
        thread::sleep(Duration::from_millis(50));
        assert!(renderer.is_rendering());

        // Mutations are refused while the run is in flight.
        assert!(matches!(renderer.resize(8, 8), Err(RenderError::RenderInFlight)));
        assert!(matches!(renderer.set_camera_params(CameraParams::default()), Err(RenderError::RenderInFlight)));
        assert!(matches!(renderer.queue_render_tasks(), Err(RenderError::RenderInFlight)));

        let before = calls.load(Ordering::SeqCst);
        let start = Instant::now();
        renderer.stop_render_tasks();
        assert!(start.elapsed() < Duration::from_secs(2));
        let after = calls.load(Ordering::SeqCst);
        assert!(after - before <= 4 * threads, "{} calls after abort", after - before);

        assert!(!renderer.is_rendering());
        thread::sleep(Duration::from_millis(10));
        assert_eq!(calls.load(Ordering::SeqCst), after);
        assert!(renderer.film().unwrap().sample_count() < 1000);

        // Once stopped the context is exclusively ours again.
        renderer.resize(8, 8).unwrap();
    }

    #[test]
    fn test_requeue_after_stop() {
        let calls = Arc::new(AtomicUsize::new(0));
        let integrator = SlowIntegrator { calls: Arc::clone(&calls), delay: Duration::from_micros(50) };

        let mut renderer = ProgressiveRenderer::new();
        renderer.initialize_with(constant_job(16, 16, 3, 2),
                                 Arc::new(Scene::new()),
                                 Box::new(integrator)).unwrap();
        renderer.queue_render_tasks().unwrap();
        renderer.stop_render_tasks();

        calls.store(0, Ordering::SeqCst);
        let image = renderer.render().unwrap();
        assert_eq!(renderer.film().unwrap().sample_count(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 16 * 16 * 3);
        assert_uniform(&image, Vector3f::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_integrator_panic_does_not_hang() {
        let mut renderer = ProgressiveRenderer::new();
        renderer.initialize_with(constant_job(64, 64, 8, 4),
                                 Arc::new(Scene::new()),
                                 Box::new(PanickingIntegrator)).unwrap();
        renderer.queue_render_tasks().unwrap();
        renderer.wait_render_tasks();

        assert!(!renderer.is_rendering());
        assert_eq!(renderer.film().unwrap().sample_count(), 0);

        // The scheduler is usable for a fresh run afterwards.
        renderer.set_camera_params(CameraParams::default()).unwrap();
        renderer.queue_render_tasks().unwrap();
        renderer.wait_render_tasks();
        assert_eq!(renderer.film().unwrap().sample_count(), 0);
    }

    #[test]
    fn test_thread_count_change_rebuilds_pool() {
        let mut renderer = ProgressiveRenderer::new();
        renderer.initialize(constant_job(8, 8, 1, 2), Arc::new(Scene::new())).unwrap();
        renderer.render().unwrap();
        renderer.initialize(constant_job(8, 8, 2, 5), Arc::new(Scene::new())).unwrap();
        assert_uniform(&renderer.render().unwrap(), Vector3f::new(1.0, 0.0, 0.0));
        assert_eq!(renderer.film().unwrap().sample_count(), 2);
    }
}
