//! Input loading shared by the binary and library users.

pub mod config;
pub mod scene;

pub use config::BuildConfig;
pub use scene::{Scene, SceneLoadError, load_scene};
