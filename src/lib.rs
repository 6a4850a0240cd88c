//! Shadow-mapped scene renderer.
//!
//! A light renders the scene's depth into a shadow map, then the camera
//! draws the scene lit with a percentage-closer shadow lookup and outlines
//! the light frustum. The same frame runs on the GPU through
//! [`Renderer`] or on the CPU through [`SoftwareBackend`], which keeps the
//! shadow math testable without a device.

pub mod frame;
pub mod input;
pub mod math;
pub mod mesh;
pub mod raster;
pub mod render;
pub mod rig;
pub mod scene;
pub mod settings;
pub mod shading;
pub mod software;

pub use frame::{FrameBackend, FrameDriver, FrameReport, FrameStage};
pub use input::{ControlAction, Controls, KeyCode, NamedKey};
pub use math::MathError;
pub use mesh::{LineMesh, Mesh, Vertex};
pub use raster::{rasterize_depth, DepthTarget, RasterStats};
pub use render::Renderer;
pub use rig::{CameraRig, LightRig};
pub use scene::{Checkerboard, Drawable, ObjectUniforms, Scene, Shape};
pub use settings::{FrameConfig, SettingKey, Settings, SettingsStore, SHADOW_MAP_SIZE};
pub use shading::{DepthSampler, ShadingParams};
pub use software::SoftwareBackend;
