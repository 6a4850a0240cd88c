pub mod common;
pub mod native;
mod shaders;

pub use common::{FlatGlobals, FlatObject, LitGlobals, LitObject};
pub use native::Renderer;
