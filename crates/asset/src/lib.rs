//! Asset loading: glTF models, RGBA8 textures and the background job that
//! fetches both for the scene.

pub mod loader;
pub mod mesh;
pub mod model;
pub mod texture;

pub use loader::{AssetLoad, AssetPaths, SceneTextures, load_all, spawn_load};
pub use model::{ModelData, load_model};
