//! Entry point for Doorwatch.
//! Logging, CLI flags, then hand off to the platform loop.

use std::path::PathBuf;

use anyhow::Result;
use corelib::config::SceneConfig;

const DEFAULT_WIDTH: u32 = 1280;
const DEFAULT_HEIGHT: u32 = 720;

/// Everything the command line can change.
#[derive(Debug)]
struct CliOptions {
    backends: wgpu::Backends,
    show_fps: bool,
    width: u32,
    height: u32,
    scene: SceneConfig,
}

impl Default for CliOptions {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            show_fps: false,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            scene: SceneConfig::default(),
        }
    }
}

/// `auto|vulkan|dx12|metal|gl` (plus common aliases).
fn backend_from_name(name: &str) -> Option<wgpu::Backends> {
    Some(match name.to_ascii_lowercase().as_str() {
        "auto" => wgpu::Backends::all(),
        "vulkan" | "vk" => wgpu::Backends::VULKAN,
        "dx12" | "d3d12" => wgpu::Backends::DX12,
        "metal" | "mtl" => wgpu::Backends::METAL,
        "gl" | "opengl" | "gles" => wgpu::Backends::GL,
        _ => return None,
    })
}

fn on_off(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "on" | "yes")
}

/// One pass over the arguments (program name excluded). Later flags win;
/// bad values are logged and leave the previous setting in place.
fn parse_args(args: impl IntoIterator<Item = String>) -> CliOptions {
    let mut opts = CliOptions::default();
    for arg in args {
        if arg == "--show-fps" {
            opts.show_fps = true;
            continue;
        }
        let Some((key, value)) = arg.split_once('=') else {
            log::warn!("Ignoring argument '{arg}'");
            continue;
        };
        match key {
            "--gpu-backend" => {
                opts.backends = backend_from_name(value).unwrap_or_else(|| {
                    log::warn!("Unknown backend '{value}', falling back to auto.");
                    wgpu::Backends::all()
                });
            }
            "--show-fps" => opts.show_fps = on_off(value),
            "--size" => {
                let dims = value
                    .split_once(['x', 'X'])
                    .and_then(|(w, h)| Some((w.parse::<u32>().ok()?, h.parse::<u32>().ok()?)));
                match dims {
                    Some((w, h)) => (opts.width, opts.height) = (w, h),
                    None => log::warn!("Bad --size '{value}', expected WIDTHxHEIGHT"),
                }
            }
            "--width" => match value.parse() {
                Ok(w) => opts.width = w,
                Err(_) => log::warn!("Bad --width '{value}'"),
            },
            "--height" => match value.parse() {
                Ok(h) => opts.height = h,
                Err(_) => log::warn!("Bad --height '{value}'"),
            },
            "--assets" => opts.scene.assets_dir = PathBuf::from(value),
            "--model" => opts.scene.model_file = value.to_owned(),
            "--msaa" => match value.parse::<u32>() {
                Ok(n @ (1 | 4)) => opts.scene.msaa_samples = n,
                _ => log::warn!(
                    "Unsupported --msaa value '{value}', keeping {}",
                    opts.scene.msaa_samples
                ),
            },
            _ => log::warn!("Ignoring unknown flag '{key}'"),
        }
    }
    opts.width = opts.width.max(1);
    opts.height = opts.height.max(1);
    opts
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let opts = parse_args(std::env::args().skip(1));
    log::info!(
        "Starting Doorwatch. Backend: {:?}, show_fps={}, window_size={}x{}, model={:?}, msaa={}",
        opts.backends,
        opts.show_fps,
        opts.width,
        opts.height,
        opts.scene.model_path(),
        opts.scene.msaa_samples
    );

    platform::run_with_renderer(opts.scene, opts.backends, opts.show_fps, opts.width, opts.height)?;

    log::info!("Graceful shutdown. Bye!");
    Ok(())
}
