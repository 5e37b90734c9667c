//! Per-frame update and draw cycle.
//!
//! The host (winit's redraw requests) calls [`FrameScheduler::tick`] as often as
//! it can until the [`RunControl`] token is stopped. A tick advances the orbit
//! controller, applies the post-load transform to the model if one is
//! attached and then draws. There is no frame-rate control; anything done per
//! tick happens once per redraw.

use std::{
    ops::ControlFlow,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use crate::{
    camera::{Camera, OrbitController},
    config::PostLoadTransform,
    data_structures::scene_graph::{NodeHandle, SceneRoot},
};

/// Shared run/stop token. Clones observe the same state.
#[derive(Clone, Debug)]
pub struct RunControl(Arc<AtomicBool>);

impl RunControl {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn stop(&self) {
        self.0.store(false, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

impl Default for RunControl {
    fn default() -> Self {
        Self::new()
    }
}

/// Whatever a frame is drawn onto. The GPU [`crate::context::Context`] is the
/// real one; tests use headless targets.
pub trait FrameTarget {
    fn camera_mut(&mut self) -> &mut Camera;

    fn draw(&mut self, scene: &SceneRoot) -> Result<(), wgpu::SurfaceError>;
}

#[derive(Debug)]
pub struct FrameScheduler {
    post_load: Option<PostLoadTransform>,
    run: RunControl,
    frames: u64,
}

impl FrameScheduler {
    pub fn new(post_load: Option<PostLoadTransform>, run: RunControl) -> Self {
        Self {
            post_load,
            run,
            frames: 0,
        }
    }

    /// Runs one frame. Returns `Break` once the run token is stopped, without
    /// touching the camera, the scene or the target.
    pub fn tick<T: FrameTarget + ?Sized>(
        &mut self,
        target: &mut T,
        controller: &mut OrbitController,
        scene: &mut SceneRoot,
        model: Option<NodeHandle>,
    ) -> Result<ControlFlow<()>, wgpu::SurfaceError> {
        if !self.run.is_running() {
            return Ok(ControlFlow::Break(()));
        }

        controller.update(target.camera_mut());

        if let (Some(handle), Some(post_load)) = (model, self.post_load.as_ref()) {
            match scene.get_mut(handle) {
                Some(node) => node.transform_mut().apply(post_load),
                None => log::warn!("model handle {} does not refer to a scene node", handle.index()),
            }
        }

        target.draw(scene)?;
        self.frames += 1;
        Ok(ControlFlow::Continue(()))
    }

    /// Frames drawn so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn run_control(&self) -> &RunControl {
        &self.run
    }
}
