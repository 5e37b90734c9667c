//! Render pipelines and the uniforms they bind.
//!
//! - `basic` is the lit, textured model pipeline
//! - `light` holds the light uniform and its GPU resources

pub mod basic;
pub mod light;
