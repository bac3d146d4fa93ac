// Copyright @yucwang 2026

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use quick_xml::events::{ BytesStart, Event };
use quick_xml::Reader;
use thiserror::Error;

use crate::core::job::{ CameraParams, FilterKind, IntegratorKind, RenderJobDesc, SamplerKind };
use crate::core::scene::{ Scene, SceneObject };
use crate::io::obj_utils::ObjLoadError;
use crate::math::constants::{ Float, Vector3f };
use crate::math::spectrum::RGBSpectrum;
use crate::shapes::triangle_mesh::TriangleMesh;

#[derive(Debug, Error)]
pub enum JobLoadError {
    #[error("failed to read job file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed job: {0}")]
    Parse(String),
    #[error("missing field: {0}")]
    MissingField(&'static str),
    #[error("failed to load mesh {path}: {source}")]
    Obj {
        path: String,
        #[source]
        source: ObjLoadError,
    },
}

pub struct JobLoadResult {
    pub job: RenderJobDesc,
    pub scene: Scene,
}

pub fn load_job<P: AsRef<Path>>(path: P) -> Result<JobLoadResult, JobLoadError> {
    let path = path.as_ref();
    let xml = fs::read_to_string(path)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    parse_job(&xml, base_dir)
}

#[derive(Default)]
struct PendingShape {
    filename: Option<String>,
    id: Option<String>,
    albedo: Option<RGBSpectrum>,
    emission: Option<RGBSpectrum>,
    translate: Vector3f,
    scale: Option<Vector3f>,
}

/// Parses a `<job>` document. Relative mesh paths resolve against `base_dir`.
pub fn parse_job(xml: &str, base_dir: &Path) -> Result<JobLoadResult, JobLoadError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut buf = Vec::new();

    let mut defaults: HashMap<String, String> = HashMap::new();
    let mut job = RenderJobDesc::default();
    let mut camera = CameraParams::default();
    let mut scene = Scene::new();

    let mut seen_job = false;
    let mut in_camera = false;
    let mut shape: Option<PendingShape> = None;

    loop {
        let event = reader.read_event_into(&mut buf)
            .map_err(|e| JobLoadError::Parse(e.to_string()))?;
        let is_empty = matches!(event, Event::Empty(_));
        match event {
            Event::Eof => break,
            Event::Start(ref e) | Event::Empty(ref e) => {
                let attrs = attributes(e, &defaults)?;
                match e.name().as_ref() {
                    b"job" => seen_job = true,
                    b"default" => {
                        let name = attrs.get("name").ok_or(JobLoadError::MissingField("default.name"))?;
                        let value = attrs.get("value").ok_or(JobLoadError::MissingField("default.value"))?;
                        defaults.insert(name.clone(), value.clone());
                    }
                    b"film" => {
                        if let Some(v) = attrs.get("width") { job.image_width = parse_usize(v)?; }
                        if let Some(v) = attrs.get("height") { job.image_height = parse_usize(v)?; }
                        if let Some(v) = attrs.get("spp") { job.samples_per_pixel = parse_u32(v)?; }
                        if let Some(v) = attrs.get("filter") { job.filter = parse_filter(v)?; }
                        if let Some(v) = attrs.get("reconstruct") { job.reconstruct = parse_bool(v)?; }
                    }
                    b"camera" => {
                        if let Some(v) = attrs.get("fov") { camera.fov_y = parse_float(v)?; }
                        if let Some(v) = attrs.get("near") { camera.near_clip = parse_float(v)?; }
                        if let Some(v) = attrs.get("far") { camera.far_clip = parse_float(v)?; }
                        if let Some(v) = attrs.get("lens_radius") { camera.lens_radius = parse_float(v)?; }
                        if let Some(v) = attrs.get("focal_distance") { camera.focal_distance = parse_float(v)?; }
                        in_camera = !is_empty;
                    }
                    b"lookat" => {
                        if !in_camera {
                            return Err(JobLoadError::Parse(String::from("<lookat> outside <camera>")));
                        }
                        camera.position = parse_vec3(attrs.get("origin").ok_or(JobLoadError::MissingField("lookat.origin"))?)?;
                        camera.target = parse_vec3(attrs.get("target").ok_or(JobLoadError::MissingField("lookat.target"))?)?;
                        if let Some(v) = attrs.get("up") { camera.up = parse_vec3(v)?; }
                    }
                    b"integrator" => {
                        if let Some(v) = attrs.get("type") { job.integrator = parse_integrator(v)?; }
                        if let Some(v) = attrs.get("max_depth") { job.max_path_length = parse_u32(v)?; }
                        if let Some(v) = attrs.get("color") { job.constant_color = parse_vec3(v)?; }
                    }
                    b"sampler" => {
                        if let Some(v) = attrs.get("type") { job.sampler = parse_sampler(v)?; }
                    }
                    b"render" => {
                        if let Some(v) = attrs.get("threads") { job.thread_count = Some(parse_usize(v)?); }
                        if let Some(v) = attrs.get("seed") { job.seed = parse_u64(v)?; }
                        if let Some(v) = attrs.get("progress") { job.show_progress = parse_bool(v)?; }
                    }
                    b"background" => {
                        let rgb = attrs.get("rgb").ok_or(JobLoadError::MissingField("background.rgb"))?;
                        scene.set_background(parse_spectrum(rgb)?);
                    }
                    b"shape" => {
                        let pending = PendingShape {
                            filename: attrs.get("filename").cloned(),
                            id: attrs.get("id").cloned(),
                            albedo: attrs.get("albedo").map(|v| parse_spectrum(v)).transpose()?,
                            emission: attrs.get("emission").map(|v| parse_spectrum(v)).transpose()?,
                            translate: Vector3f::zeros(),
                            scale: None,
                        };
                        if is_empty {
                            scene.add_object(build_object(pending, base_dir)?);
                        } else {
                            shape = Some(pending);
                        }
                    }
                    b"translate" => {
                        let pending = shape.as_mut()
                            .ok_or_else(|| JobLoadError::Parse(String::from("<translate> outside <shape>")))?;
                        pending.translate += parse_xyz(&attrs, 0.0)?;
                    }
                    b"scale" => {
                        let pending = shape.as_mut()
                            .ok_or_else(|| JobLoadError::Parse(String::from("<scale> outside <shape>")))?;
                        let s = match attrs.get("value") {
                            Some(v) => Vector3f::repeat(parse_float(v)?),
                            None => parse_xyz(&attrs, 1.0)?,
                        };
                        pending.scale = Some(pending.scale.unwrap_or_else(|| Vector3f::repeat(1.0)).component_mul(&s));
                    }
                    other => {
                        log::warn!("Ignoring unknown job element <{}>.", String::from_utf8_lossy(other));
                    }
                }
            }
            Event::End(ref e) => {
                match e.name().as_ref() {
                    b"camera" => in_camera = false,
                    b"shape" => {
                        if let Some(pending) = shape.take() {
                            scene.add_object(build_object(pending, base_dir)?);
                        }
                    }
                    _ => {}
                }
            }
            _ => {}
        }

        buf.clear();
    }

    if !seen_job {
        return Err(JobLoadError::MissingField("job"));
    }
    job.camera = camera;

    log::info!("Job loaded: {}x{}, {} spp, {:?}, {} objects.",
               job.image_width, job.image_height, job.samples_per_pixel,
               job.integrator, scene.objects().len());
    Ok(JobLoadResult { job, scene })
}

fn build_object(pending: PendingShape, base_dir: &Path) -> Result<SceneObject, JobLoadError> {
    let filename = pending.filename.ok_or(JobLoadError::MissingField("shape.filename"))?;
    let filename = if Path::new(&filename).is_absolute() {
        filename
    } else {
        base_dir.join(filename).to_string_lossy().to_string()
    };

    let mut mesh = TriangleMesh::from_obj(&filename)
        .map_err(|source| JobLoadError::Obj { path: filename.clone(), source })?;
    let scale = pending.scale.unwrap_or_else(|| Vector3f::repeat(1.0));
    if scale != Vector3f::repeat(1.0) || pending.translate != Vector3f::zeros() {
        mesh.apply_transform(&scale, &pending.translate);
    }
    log::debug!("Loaded {} with {} triangles.", filename, mesh.triangles().len());

    let mut object = SceneObject::new(mesh, pending.albedo.unwrap_or_else(|| RGBSpectrum::splat(0.5)));
    if let Some(emission) = pending.emission {
        object = object.with_emission(emission);
    }
    if let Some(id) = pending.id {
        object = object.with_name(id);
    }
    Ok(object)
}

fn attributes(e: &BytesStart, defaults: &HashMap<String, String>) -> Result<HashMap<String, String>, JobLoadError> {
    let mut attrs = HashMap::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|e| JobLoadError::Parse(e.to_string()))?;
        let value = attr.unescape_value().map_err(|e| JobLoadError::Parse(e.to_string()))?;
        attrs.insert(String::from_utf8_lossy(attr.key.as_ref()).to_string(),
                     resolve_value(&value, defaults));
    }
    Ok(attrs)
}

fn resolve_value(raw: &str, defaults: &HashMap<String, String>) -> String {
    let mut out = raw.to_string();
    for (k, v) in defaults {
        out = out.replace(&format!("${}", k), v);
    }
    out
}

fn parse_integrator(value: &str) -> Result<IntegratorKind, JobLoadError> {
    match value {
        "constant" => Ok(IntegratorKind::Constant),
        "direct" => Ok(IntegratorKind::DirectLighting),
        "path" => Ok(IntegratorKind::PathTracing),
        "bdpt" | "bidirectional" => Ok(IntegratorKind::Bidirectional),
        _ => Err(JobLoadError::Parse(format!("unknown integrator: {}", value))),
    }
}

fn parse_sampler(value: &str) -> Result<SamplerKind, JobLoadError> {
    match value {
        "random" | "independent" => Ok(SamplerKind::Random),
        "stratified" => Ok(SamplerKind::Stratified),
        _ => Err(JobLoadError::Parse(format!("unknown sampler: {}", value))),
    }
}

fn parse_filter(value: &str) -> Result<FilterKind, JobLoadError> {
    match value {
        "box" => Ok(FilterKind::Box),
        "gaussian" => Ok(FilterKind::Gaussian),
        "mitchell" => Ok(FilterKind::MitchellNetravali),
        _ => Err(JobLoadError::Parse(format!("unknown filter: {}", value))),
    }
}

fn parse_bool(value: &str) -> Result<bool, JobLoadError> {
    match value {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(JobLoadError::Parse(format!("invalid bool: {}", value))),
    }
}

fn parse_float(value: &str) -> Result<Float, JobLoadError> {
    value.trim().parse::<Float>().map_err(|_| JobLoadError::Parse(format!("invalid float: {}", value)))
}

fn parse_u32(value: &str) -> Result<u32, JobLoadError> {
    value.trim().parse::<u32>().map_err(|_| JobLoadError::Parse(format!("invalid integer: {}", value)))
}

fn parse_u64(value: &str) -> Result<u64, JobLoadError> {
    value.trim().parse::<u64>().map_err(|_| JobLoadError::Parse(format!("invalid integer: {}", value)))
}

fn parse_usize(value: &str) -> Result<usize, JobLoadError> {
    value.trim().parse::<usize>().map_err(|_| JobLoadError::Parse(format!("invalid integer: {}", value)))
}

fn parse_vec3(value: &str) -> Result<Vector3f, JobLoadError> {
    let mut parts = value.split(',').map(|s| s.trim()).filter(|s| !s.is_empty());
    let mut next = || parts.next().ok_or_else(|| JobLoadError::Parse(format!("invalid vec3: {}", value)));
    let (x, y, z) = (next()?, next()?, next()?);
    Ok(Vector3f::new(parse_float(x)?, parse_float(y)?, parse_float(z)?))
}

fn parse_spectrum(value: &str) -> Result<RGBSpectrum, JobLoadError> {
    if !value.contains(',') {
        return Ok(RGBSpectrum::splat(parse_float(value)?));
    }
    Ok(RGBSpectrum::from_vector(parse_vec3(value)?))
}

fn parse_xyz(attrs: &HashMap<String, String>, fallback: Float) -> Result<Vector3f, JobLoadError> {
    let component = |key: &str| attrs.get(key).map(|v| parse_float(v)).unwrap_or(Ok(fallback));
    Ok(Vector3f::new(component("x")?, component("y")?, component("z")?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const QUAD_OBJ: &str = "\
v -1.0 -1.0 0.0
v 1.0 -1.0 0.0
v 1.0 1.0 0.0
v -1.0 1.0 0.0
f 1 2 3 4
";

    fn temp_dir_with_quad(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("millefeuille-{}-{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("quad.obj"), QUAD_OBJ).unwrap();
        dir
    }

    #[test]
    fn test_parse_full_job() {
        let dir = temp_dir_with_quad("full");
        let xml = r#"
<job>
    <default name="res" value="64"/>
    <film width="$res" height="32" spp="8" filter="gaussian" reconstruct="true"/>
    <camera fov="45" near="0.1" far="50" lens_radius="0.05" focal_distance="3">
        <lookat origin="0, 1, 4" target="0, 1, 0" up="0, 1, 0"/>
    </camera>
    <integrator type="direct" max_depth="3"/>
    <sampler type="stratified"/>
    <render threads="3" seed="42" progress="false"/>
    <background rgb="0.1, 0.2, 0.3"/>
    <shape id="floor" filename="quad.obj" albedo="0.7">
        <scale value="2"/>
        <translate y="-1"/>
    </shape>
    <shape filename="quad.obj" emission="5, 5, 4">
        <translate z="2"/>
    </shape>
</job>"#;
        let result = parse_job(xml, &dir).unwrap();
        let job = &result.job;
        assert_eq!((job.image_width, job.image_height, job.samples_per_pixel), (64, 32, 8));
        assert_eq!(job.filter, FilterKind::Gaussian);
        assert!(job.reconstruct);
        assert_eq!(job.integrator, IntegratorKind::DirectLighting);
        assert_eq!(job.max_path_length, 3);
        assert_eq!(job.sampler, SamplerKind::Stratified);
        assert_eq!(job.thread_count, Some(3));
        assert_eq!(job.seed, 42);
        assert_relative_eq!(job.camera.fov_y, 45.0);
        assert_relative_eq!(job.camera.lens_radius, 0.05);
        assert_relative_eq!(job.camera.position, Vector3f::new(0.0, 1.0, 4.0));
        assert!(job.validate().is_ok());

        let scene = &result.scene;
        assert_eq!(scene.background(), RGBSpectrum::new(0.1, 0.2, 0.3));
        assert_eq!(scene.objects().len(), 2);
        assert_eq!(scene.object(0).name(), Some("floor"));
        assert_eq!(scene.object(0).albedo(), RGBSpectrum::splat(0.7));
        let bounds = scene.object(0).mesh().bounding_box();
        assert_relative_eq!(bounds.p_min, Vector3f::new(-2.0, -3.0, 0.0));
        assert!(scene.has_emitters());
        assert_eq!(scene.object(1).emission(), RGBSpectrum::new(5.0, 5.0, 4.0));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_defaults_and_bidirectional_name() {
        let result = parse_job(r#"<job><integrator type="bdpt"/></job>"#, Path::new(".")).unwrap();
        assert_eq!(result.job.integrator, IntegratorKind::Bidirectional);
        assert_eq!(result.job.image_width, RenderJobDesc::default().image_width);
        assert!(result.job.validate().is_err());
        assert!(result.scene.objects().is_empty());
    }

    #[test]
    fn test_load_errors() {
        let err = parse_job(r#"<job><film width="abc"/></job>"#, Path::new(".")).err().unwrap();
        assert!(matches!(err, JobLoadError::Parse(_)));

        let err = parse_job(r#"<job><shape albedo="0.5"/></job>"#, Path::new(".")).err().unwrap();
        assert!(matches!(err, JobLoadError::MissingField("shape.filename")));

        let err = parse_job(r#"<job><shape filename="missing.obj"/></job>"#, Path::new("/nonexistent")).err().unwrap();
        assert!(matches!(err, JobLoadError::Obj { .. }));

        let err = parse_job(r#"<film width="4"/>"#, Path::new(".")).err().unwrap();
        assert!(matches!(err, JobLoadError::MissingField("job")));

        assert!(matches!(load_job("/nonexistent/job.xml"), Err(JobLoadError::Io(_))));
    }
}
