//! model-viewer
//!
//! A minimal 3D model viewer for native windows and the web. It builds a lit
//! scene, loads one Wavefront OBJ model (optionally with its MTL materials)
//! in the background, lets the camera orbit the model with the mouse and
//! redraws continuously.
//!
//! High-level modules
//! - `camera`: camera, projection, orbit controller and the camera uniform
//! - `config`: viewer configuration and the built-in presets
//! - `context`: the viewport and the GPU context that owns device/queue/pipeline
//! - `data_structures`: models, textures, transforms and the scene root
//! - `flow`: the winit application and its event loop
//! - `frame`: the per-frame update/draw cycle and its run/stop token
//! - `pipelines`: the render pipeline and light uniform
//! - `resources`: asset sources and the two-stage OBJ/MTL loader
//! - `render`: drawing the scene root onto the surface
//! - `viewer`: the window-independent viewer state
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod flow;
pub mod frame;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod viewer;

pub use config::ViewerConfig;
pub use flow::run;
pub use viewer::Viewer;
