use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time;

use anyhow::{anyhow, bail, Context};
use show_image::{create_window, event, ImageInfo, ImageView, WindowOptions};
use threadpool::ThreadPool;

use soft_raster::image::{Image, Origin, WriteOptions};
use soft_raster::math::Vec3;
use soft_raster::model::Model;
use soft_raster::scene::{Camera, FlatShader, PhongShader, RenderStats, Scene, Transforms};

pub const USAGE: &str = "\
usage: soft_raster [options] <model.obj>...

options:
    -o <path>       output file, .png or .tga (default output.tga)
    -d <path>       also write the z-buffer as a grayscale tga
    -s <name>       shader: phong (default) or flat
    -w <pixels>     frame buffer width (default 800)
    -h <pixels>     frame buffer height (default 800)
    --raw           write uncompressed tga
    --show          show the result in a window, Escape closes it";

/// Which shader the models are drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderKind {
    Phong,
    Flat,
}

impl ShaderKind {
    pub fn from_name(name: &str) -> Option<ShaderKind> {
        return match name {
            "phong" => Some(ShaderKind::Phong),
            "flat" => Some(ShaderKind::Flat),
            _ => None,
        };
    }
}

/// Everything a render run needs to know, filled in from the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct Params {
    pub width: u32,
    pub height: u32,
    pub models: Vec<PathBuf>,
    pub output: PathBuf,
    pub depth_output: Option<PathBuf>,
    pub shader: ShaderKind,
    pub rle: bool,
    pub show: bool,
}

impl Params {
    /// Parses command line arguments, program name excluded.
    pub fn from_args<I: IntoIterator<Item = String>>(args: I, width: u32, height: u32) -> anyhow::Result<Params> {
        let mut params = Params {
            width,
            height,
            models: Vec::new(),
            output: PathBuf::from("output.tga"),
            depth_output: None,
            shader: ShaderKind::Phong,
            rle: true,
            show: false,
        };

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            let mut value = |flag: &str| args.next().with_context(|| format!("{} expects a value", flag));
            match arg.as_str() {
                "-o" => params.output = PathBuf::from(value("-o")?),
                "-d" => params.depth_output = Some(PathBuf::from(value("-d")?)),
                "-s" => {
                    let name = value("-s")?;
                    params.shader = ShaderKind::from_name(&name).with_context(|| format!("unknown shader {}", name))?;
                }
                "-w" => params.width = parse_size(&value("-w")?)?,
                "-h" => params.height = parse_size(&value("-h")?)?,
                "--raw" => params.rle = false,
                "--show" => params.show = true,
                flag if flag.starts_with('-') => bail!("unknown option {}", flag),
                _ => params.models.push(PathBuf::from(arg)),
            }
        }

        if params.models.is_empty() {
            bail!("no model files given");
        }
        return Ok(params);
    }
}

fn parse_size(value: &str) -> anyhow::Result<u32> {
    let size: u32 = value.parse().with_context(|| format!("{} is not a size", value))?;
    if size == 0 || size > u16::MAX as u32 {
        bail!("size {} is out of range 1..={}", size, u16::MAX);
    }
    return Ok(size);
}

/// Fixed camera the scene is looked at from.
pub fn camera() -> Camera {
    return Camera {
        eye: Vec3::new(1.0, 1.0, 3.0),
        center: Vec3::new(0.0, 0.0, 0.0),
        up: Vec3::new(0.0, 1.0, 0.0),
    };
}

/// Direction towards the light, world space.
pub fn light_direction() -> Vec3 {
    return Vec3::new(1.0, 1.0, 1.0).normalize();
}

/// Loads all models on a thread pool. The result keeps the order of `paths`.
pub fn load_models(paths: &[PathBuf]) -> anyhow::Result<Vec<Model>> {
    let threads = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4);
    let pool = ThreadPool::new(threads.min(paths.len()).max(1));
    let (sender, receiver) = mpsc::channel();
    for (index, path) in paths.iter().cloned().enumerate() {
        let sender = sender.clone();
        pool.execute(move || {
            let result = Model::load(&path).with_context(|| format!("failed to load model {}", path.display()));
            // Only fails if the receiving side already gave up on an earlier error.
            let _ = sender.send((index, result));
        });
    }
    drop(sender);

    let mut models: Vec<Option<Model>> = (0..paths.len()).map(|_| None).collect();
    for (index, result) in receiver.iter() {
        models[index] = Some(result?);
    }
    return models
        .into_iter()
        .collect::<Option<Vec<Model>>>()
        .context("a model loading job died before reporting back");
}

/// Draws every model, in order, into the scene.
pub fn render(scene: &mut Scene, models: &[Model], shader: ShaderKind, transforms: &Transforms) -> anyhow::Result<RenderStats> {
    let mut total = RenderStats::default();
    for model in models {
        let stats = match shader {
            ShaderKind::Phong => {
                let mut shader = PhongShader::new(model, transforms, light_direction())?;
                scene.draw_mesh(&mut shader, model.face_count(), &transforms.viewport)
            }
            ShaderKind::Flat => {
                let mut shader = FlatShader::new(model, transforms, light_direction())?;
                scene.draw_mesh(&mut shader, model.face_count(), &transforms.viewport)
            }
        };
        if stats.skipped > 0 {
            log::warn!("{} of {} faces could not be rasterized", stats.skipped, stats.faces);
        }
        total += stats;
    }
    return Ok(total);
}

/// Writes through the `image` crate for .png, as tga otherwise.
pub fn write_image(image: &Image, path: &Path, rle: bool) -> anyhow::Result<()> {
    let is_png = path
        .extension()
        .map(|extension| extension.eq_ignore_ascii_case("png"))
        .unwrap_or(false);
    if is_png {
        let buffer = ::image::RgbaImage::from_raw(image.width, image.height, image.to_rgba8())
            .context("pixel buffer has the wrong size")?;
        buffer.save(path).with_context(|| format!("failed to write {}", path.display()))?;
    } else {
        let options = WriteOptions { rle, origin: Origin::BottomLeft };
        image
            .write_tga(path, &options)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    log::info!("wrote {}", path.display());
    return Ok(());
}

/// Loads, renders and writes. Returns the final, top row first, frame.
pub fn run(params: &Params) -> anyhow::Result<Image> {
    let models = load_models(&params.models)?;

    let transforms = Transforms::for_camera(&camera(), params.width, params.height)?;
    let mut scene = Scene::new(params.width, params.height);
    let time_begin = time::Instant::now();
    let stats = render(&mut scene, &models, params.shader, &transforms)?;
    log::info!(
        "rendered {} faces, {} pixels in {:.2?}",
        stats.faces,
        stats.pixels,
        time_begin.elapsed()
    );

    // The rasterizer works with y going up, files and windows want the top row first.
    let mut frame = scene.image.clone();
    frame.flip_vertically();
    write_image(&frame, &params.output, params.rle)?;

    if let Some(depth_output) = &params.depth_output {
        let mut depth = scene.depth_image();
        depth.flip_vertically();
        write_image(&depth, depth_output, params.rle)?;
    }
    return Ok(frame);
}

/// Helper, defining exit event to be an Escape key press.
fn is_exit_event(window_event: event::WindowEvent) -> bool {
    if let event::WindowEvent::KeyboardInput(event) = window_event {
        if event.input.key_code == Some(event::VirtualKeyCode::Escape) && event.input.state.is_released() {
            return true;
        }
    }
    return false;
}

/// Shows the frame in a window until Escape is pressed or the window goes away.
/// Has to run inside the show-image context.
pub fn show(frame: &Image) -> anyhow::Result<()> {
    let window_options = WindowOptions {
        size: Some([frame.width, frame.height]),
        ..Default::default()
    };
    let window = create_window("output", window_options).map_err(|error| anyhow!("can't open window: {}", error))?;
    let pixels = frame.to_rgb8();
    let image_view = ImageView::new(ImageInfo::rgb8(frame.width, frame.height), &pixels);
    window
        .set_image("image", image_view)
        .map_err(|error| anyhow!("can't show image: {}", error))?;
    let event_channel = window
        .event_channel()
        .map_err(|error| anyhow!("can't listen to window events: {}", error))?;

    for window_event in event_channel.iter() {
        if is_exit_event(window_event) {
            break;
        }
    }
    return Ok(());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        return list.iter().map(|s| s.to_string()).collect();
    }

    #[test]
    fn defaults() {
        let params = Params::from_args(args(&["head.obj"]), 800, 800).unwrap();
        assert_eq!(params.models, vec![PathBuf::from("head.obj")]);
        assert_eq!(params.output, PathBuf::from("output.tga"));
        assert_eq!(params.shader, ShaderKind::Phong);
        assert!(params.rle);
        assert!(!params.show);
        assert_eq!((params.width, params.height), (800, 800));
    }

    #[test]
    fn all_flags() {
        let params = Params::from_args(
            args(&["-o", "out.png", "a.obj", "-s", "flat", "-w", "64", "-h", "32", "--raw", "-d", "z.tga", "b.obj", "--show"]),
            800,
            800,
        )
        .unwrap();
        assert_eq!(params.models, vec![PathBuf::from("a.obj"), PathBuf::from("b.obj")]);
        assert_eq!(params.output, PathBuf::from("out.png"));
        assert_eq!(params.depth_output, Some(PathBuf::from("z.tga")));
        assert_eq!(params.shader, ShaderKind::Flat);
        assert_eq!((params.width, params.height), (64, 32));
        assert!(!params.rle);
        assert!(params.show);
    }

    #[test]
    fn bad_arguments() {
        assert!(Params::from_args(args(&[]), 800, 800).is_err());
        assert!(Params::from_args(args(&["a.obj", "-o"]), 800, 800).is_err());
        assert!(Params::from_args(args(&["a.obj", "-s", "toon"]), 800, 800).is_err());
        assert!(Params::from_args(args(&["a.obj", "-w", "0"]), 800, 800).is_err());
        assert!(Params::from_args(args(&["a.obj", "--fast"]), 800, 800).is_err());
    }

    #[test]
    fn light_is_unit_length() {
        assert!((light_direction().norm() - 1.0).abs() < 1e-12);
        assert!((camera().distance() - 11f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn renders_and_writes_a_model() {
        let dir = std::env::temp_dir().join(format!("soft_raster_app_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let mesh = dir.join("tri.obj");
        std::fs::write(&mesh, "v -1 -1 0\nv 1 -1 0\nv 0 1 0\nvn 0 0 1\nf 1//1 2//1 3//1\n").unwrap();

        let params = Params {
            width: 64,
            height: 64,
            models: vec![mesh.clone(), mesh],
            output: dir.join("out.tga"),
            depth_output: Some(dir.join("depth.tga")),
            shader: ShaderKind::Phong,
            rle: true,
            show: false,
        };
        let frame = run(&params).unwrap();
        let written = Image::read_tga(&params.output).unwrap();
        assert_eq!(written, frame);
        assert!(frame.to_rgb8().iter().any(|c| *c > 0));
        assert!(Image::read_tga(dir.join("depth.tga")).is_ok());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
