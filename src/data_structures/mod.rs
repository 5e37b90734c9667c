//! Viewer data structures: models, textures, transforms and the scene root.
//!
//! - `model` contains mesh and material definitions, GPU resources for 3D models
//! - `texture` contains the GPU texture wrapper and creation utilities
//! - `transform` holds per-node position, rotation and scale
//! - `scene_graph` is the append-only scene the frame loop draws

pub mod model;
pub mod scene_graph;
pub mod texture;
pub mod transform;
