//! Background loading of the scene's model and textures.
//!
//! The job runs once on its own thread and reports through a callback.
//! There is no retry, timeout or cancellation: a failure is logged and
//! handed to the callback like any other result.

use std::path::{Path, PathBuf};
use std::thread;

use anyhow::{Context, Result};
use corelib::config::{
    DOOR_NORMALS_FILE, EYE_COLOR_FILE, EYE_NORMALS_FILE, GRADIENT_RAMP_FILE, SceneConfig,
};

use crate::model::{ModelData, load_model};
use crate::texture::{ColorSpace, TextureData, TextureFilter};

const WHITE: [u8; 4] = [255, 255, 255, 255];
const FLAT_NORMAL: [u8; 4] = [128, 128, 255, 255];

/// Files the scene reads.
#[derive(Clone, Debug, PartialEq)]
pub struct AssetPaths {
    pub model: PathBuf,
    pub gradient_ramp: PathBuf,
    pub door_normals: PathBuf,
    pub eye_color: PathBuf,
    pub eye_normals: PathBuf,
}

impl AssetPaths {
    pub fn in_dir(dir: impl AsRef<Path>, model_file: &str) -> Self {
        let dir = dir.as_ref();
        Self {
            model: dir.join(model_file),
            gradient_ramp: dir.join(GRADIENT_RAMP_FILE),
            door_normals: dir.join(DOOR_NORMALS_FILE),
            eye_color: dir.join(EYE_COLOR_FILE),
            eye_normals: dir.join(EYE_NORMALS_FILE),
        }
    }

    pub fn from_config(config: &SceneConfig) -> Self {
        Self::in_dir(&config.assets_dir, &config.model_file)
    }
}

/// The four material textures.
#[derive(Clone, Debug)]
pub struct SceneTextures {
    /// Toon lookup ramp, sampled with nearest filtering.
    pub gradient_ramp: TextureData,
    pub door_normals: TextureData,
    pub eye_color: TextureData,
    /// Loaded for completeness; the unlit eye material does not sample it.
    pub eye_normals: TextureData,
}

impl SceneTextures {
    /// Load every texture; a file that fails to load is replaced by a
    /// neutral single texel.
    pub fn load(paths: &AssetPaths) -> Self {
        Self {
            gradient_ramp: load_or(&paths.gradient_ramp, WHITE)
                .with_color_space(ColorSpace::Linear)
                .with_filter(TextureFilter::Nearest),
            door_normals: load_or(&paths.door_normals, FLAT_NORMAL)
                .with_color_space(ColorSpace::Linear),
            eye_color: load_or(&paths.eye_color, WHITE).with_color_space(ColorSpace::Srgb),
            eye_normals: load_or(&paths.eye_normals, FLAT_NORMAL)
                .with_color_space(ColorSpace::Linear),
        }
    }

    /// All-fallback set, for running without any files.
    pub fn fallback() -> Self {
        Self {
            gradient_ramp: TextureData::solid(WHITE)
                .with_color_space(ColorSpace::Linear)
                .with_filter(TextureFilter::Nearest),
            door_normals: TextureData::solid(FLAT_NORMAL).with_color_space(ColorSpace::Linear),
            eye_color: TextureData::solid(WHITE),
            eye_normals: TextureData::solid(FLAT_NORMAL).with_color_space(ColorSpace::Linear),
        }
    }
}

fn load_or(path: &Path, fallback: [u8; 4]) -> TextureData {
    match TextureData::load(path) {
        Ok(t) => t,
        Err(e) => {
            log::error!("Texture unavailable, using fallback: {e:#}");
            TextureData::solid(fallback)
        }
    }
}

/// Result of the load job. Textures always arrive (possibly as
/// fallbacks); the model may fail on its own.
#[derive(Debug)]
pub struct AssetLoad {
    pub textures: SceneTextures,
    pub model: Result<ModelData>,
}

/// Load everything on the calling thread.
pub fn load_all(paths: &AssetPaths) -> AssetLoad {
    let textures = SceneTextures::load(paths);
    let model = load_model(&paths.model);
    if let Err(e) = &model {
        log::error!("Model unavailable: {e:#}");
    }
    AssetLoad { textures, model }
}

/// Start the load job on a background thread. `on_done` runs exactly once,
/// on that thread.
pub fn spawn_load<F>(paths: AssetPaths, on_done: F) -> Result<thread::JoinHandle<()>>
where
    F: FnOnce(AssetLoad) + Send + 'static,
{
    thread::Builder::new()
        .name("asset-loader".into())
        .spawn(move || {
            log::info!("Loading assets (model {:?})", paths.model);
            on_done(load_all(&paths));
        })
        .context("Failed to spawn asset loader thread")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn paths_use_fixed_file_names() {
        let p = AssetPaths::in_dir("static", "Door02.gltf");
        assert_eq!(p.model, Path::new("static/Door02.gltf"));
        assert_eq!(p.gradient_ramp, Path::new("static/threeTone.jpg"));
        assert_eq!(p.door_normals, Path::new("static/noise_Normals_c.png"));
        assert_eq!(p.eye_color, Path::new("static/Eyes_mat_baseColor.jpg"));
        assert_eq!(p.eye_normals, Path::new("static/Eyes_mat_normal.png"));
    }

    #[test]
    fn missing_files_degrade_to_fallbacks() {
        let dir = tempfile::tempdir().unwrap();
        let load = load_all(&AssetPaths::in_dir(dir.path(), "Door02.gltf"));
        assert!(load.model.is_err());
        let t = &load.textures;
        assert_eq!(t.gradient_ramp.data, WHITE.to_vec());
        assert_eq!(t.gradient_ramp.filter, TextureFilter::Nearest);
        assert_eq!(t.door_normals.data, FLAT_NORMAL.to_vec());
        assert_eq!(t.door_normals.color_space, ColorSpace::Linear);
        assert_eq!(t.eye_color.color_space, ColorSpace::Srgb);
    }

    #[test]
    fn present_texture_is_loaded_with_its_settings() {
        let dir = tempfile::tempdir().unwrap();
        image::RgbaImage::from_pixel(3, 1, image::Rgba([90, 160, 250, 255]))
            .save(dir.path().join(DOOR_NORMALS_FILE))
            .unwrap();
        let textures = SceneTextures::load(&AssetPaths::in_dir(dir.path(), "x.gltf"));
        assert_eq!(textures.door_normals.width, 3);
        assert_eq!(textures.door_normals.color_space, ColorSpace::Linear);
    }

    #[test]
    fn spawn_load_calls_back_once() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, rx) = mpsc::channel();
        let handle = spawn_load(AssetPaths::in_dir(dir.path(), "missing.gltf"), move |load| {
            tx.send(load.model.is_err()).unwrap();
        })
        .unwrap();
        handle.join().unwrap();
        assert_eq!(rx.recv().unwrap(), true);
        assert!(rx.try_recv().is_err());
    }
}
