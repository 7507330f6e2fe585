// Headless core of the feature viewer: builds the feature/DFM tree from process
// data and keeps it in sync with the selection of the external 3D scene.
// Rendering, geometry and file loading stay behind the traits in `scene`.

pub mod builder;
pub mod colorize;
pub mod error;
pub mod fixtures;
pub mod harness;
pub mod render;
pub mod scene;
pub mod selection;
pub mod session;
pub mod tree;

pub use error::ViewerError;
pub use session::{CollectedPart, Viewer};
