//! The viewer bootstrap: scene, camera controls, the pending load and the
//! frame loop state, independent of any window or GPU.
//!
//! [`crate::flow`] drives it from winit: it feeds window events, forwards
//! load events and calls [`Viewer::frame`] on every redraw.

use std::ops::ControlFlow;

use winit::event::WindowEvent;

use crate::{
    camera::OrbitController,
    config::ViewerConfig,
    data_structures::scene_graph::{LightNode, NodeHandle, SceneNode, SceneRoot},
    frame::{FrameScheduler, FrameTarget, RunControl},
    resources::loader::{LoadEvent, LoadRequest, LoadSequence, LoadStage, LoadedAsset},
};

#[derive(Debug)]
pub struct Viewer {
    config: ViewerConfig,
    scene: SceneRoot,
    controller: OrbitController,
    load: Option<LoadSequence>,
    model: Option<NodeHandle>,
    scheduler: FrameScheduler,
}

impl Viewer {
    /// Builds the scene with its ambient and directional lights. No load is
    /// issued yet; see [`Viewer::begin_load`].
    pub fn new(config: ViewerConfig) -> Self {
        let mut scene = SceneRoot::new();
        scene.add(Box::new(LightNode::ambient(
            config.light_colour,
            config.ambient_intensity,
        )));
        scene.add(Box::new(LightNode::directional(
            config.light_colour,
            config.directional_intensity,
            config.directional_position,
        )));

        let controller =
            OrbitController::default().with_limits(config.min_distance, config.max_distance);
        let scheduler = FrameScheduler::new(config.post_load, RunControl::new());

        Self {
            config,
            scene,
            controller,
            load: None,
            model: None,
            scheduler,
        }
    }

    /// Registers the one load of this run and returns what to fetch.
    /// Later calls return `None`.
    pub fn begin_load(&mut self) -> Option<LoadRequest> {
        if self.load.is_some() {
            log::warn!("the asset load was already issued");
            return None;
        }
        let request = LoadRequest::from(&self.config);
        log::info!(
            "loading {}{}",
            request.model_path,
            request
                .material_path
                .as_ref()
                .map(|mtl| format!(" with materials from {mtl}"))
                .unwrap_or_default()
        );
        self.load = Some(LoadSequence::new(request.clone()));
        Some(request)
    }

    /// Applies one event of the running load.
    ///
    /// `realize` turns the parsed asset into a scene node (the GPU upload); it
    /// runs at most once, when the load succeeds.
    pub fn on_load_event<F>(&mut self, event: LoadEvent, realize: F)
    where
        F: FnOnce(LoadedAsset) -> anyhow::Result<Box<dyn SceneNode>>,
    {
        let Some(load) = self.load.as_mut() else {
            log::warn!("received a load event without a pending load");
            return;
        };

        match event {
            LoadEvent::Stage(stage) => {
                load.advance(stage);
            }
            LoadEvent::Progress { resource, fraction } => {
                if !load.stage().is_resolved() {
                    log::info!("{resource}: {:.0}% loaded", fraction * 100.0);
                }
            }
            LoadEvent::Loaded(asset) => {
                if !load.advance(LoadStage::Loaded) {
                    return;
                }
                match realize(asset) {
                    Ok(node) => {
                        self.model = Some(self.scene.add(node));
                        load.advance(LoadStage::Attached);
                        log::info!(
                            "{} attached to the scene after {:?}",
                            load.request().model_path,
                            load.elapsed()
                        );
                    }
                    Err(e) => {
                        load.advance(LoadStage::Failed);
                        log::error!(
                            "An error happened while loading {}: {e:#}",
                            load.request().model_path
                        );
                    }
                }
            }
            LoadEvent::Failed(failure) => {
                if load.advance(LoadStage::Failed) {
                    log::error!(
                        "An error happened while loading {}: {:#}",
                        failure.path,
                        failure.source
                    );
                }
            }
        }
    }

    pub fn handle_window_event(&mut self, event: &WindowEvent) {
        self.controller.handle_window_events(event);
    }

    /// Runs one frame against `target`.
    pub fn frame<T: FrameTarget + ?Sized>(
        &mut self,
        target: &mut T,
    ) -> Result<ControlFlow<()>, wgpu::SurfaceError> {
        self.scheduler
            .tick(target, &mut self.controller, &mut self.scene, self.model)
    }

    /// Stops the frame loop; the next [`Viewer::frame`] returns `Break`.
    pub fn stop(&self) {
        self.scheduler.run_control().stop();
    }

    pub fn run_control(&self) -> RunControl {
        self.scheduler.run_control().clone()
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn scene(&self) -> &SceneRoot {
        &self.scene
    }

    pub fn model(&self) -> Option<NodeHandle> {
        self.model
    }

    pub fn model_node(&self) -> Option<&dyn SceneNode> {
        self.model.and_then(|handle| self.scene.get(handle))
    }

    pub fn load_stage(&self) -> LoadStage {
        self.load
            .as_ref()
            .map_or(LoadStage::Idle, LoadSequence::stage)
    }

    pub fn controller_mut(&mut self) -> &mut OrbitController {
        &mut self.controller
    }

    pub fn frames(&self) -> u64 {
        self.scheduler.frames()
    }
}
