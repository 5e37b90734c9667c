#![allow(dead_code)]

use std::{
    collections::HashMap,
    future::Future,
    io::Cursor,
    sync::{Arc, Mutex},
};

use anyhow::anyhow;
use model_viewer::{
    camera::Camera,
    config::ViewerConfig,
    context::Viewport,
    data_structures::{
        scene_graph::{SceneNode, SceneRoot},
        transform::Transform,
    },
    frame::FrameTarget,
    resources::{
        AssetSource, Progress,
        loader::{LoadEvent, LoadSink, LoadStage, LoadedAsset},
    },
};

pub const TRIANGLE_OBJ: &str = "\
mtllib model.mtl
o triangle
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 0.0 1.0 0.0
vt 0.0 0.0
vt 1.0 0.0
vt 0.0 1.0
vn 0.0 0.0 1.0
usemtl red
f 1/1/1 2/2/1 3/3/1
";

/// Two triangles sharing an edge, without normals.
pub const QUAD_NO_NORMALS_OBJ: &str = "\
o quad
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 1.0 1.0 0.0
v 0.0 1.0 0.0
f 1 2 3
f 1 3 4
";

pub const RED_MTL: &str = "\
newmtl red
Kd 1.0 0.0 0.0
";

pub const TEXTURED_MTL: &str = "\
newmtl red
Kd 1.0 0.0 0.0
map_Kd red.png
";

/// Encodes a `width`x`height` PNG of a single colour.
pub fn png(width: u32, height: u32, colour: [u8; 4]) -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(width, height, image::Rgba(colour));
    let mut bytes = Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, image::ImageFormat::Png)
        .expect("encoding a PNG in memory");
    bytes.into_inner()
}

/// Serves files from memory in fixed size chunks and records every request.
#[derive(Clone, Debug, Default)]
pub struct MemorySource {
    files: HashMap<String, Vec<u8>>,
    chunk_size: usize,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self {
            chunk_size: 16,
            ..Default::default()
        }
    }

    pub fn with_file(mut self, path: &str, contents: impl Into<Vec<u8>>) -> Self {
        self.files.insert(path.to_string(), contents.into());
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl AssetSource for MemorySource {
    fn fetch<P>(&self, path: &str, mut progress: P) -> impl Future<Output = anyhow::Result<Vec<u8>>>
    where
        P: FnMut(Progress),
    {
        self.requests.lock().unwrap().push(path.to_string());
        let file = self
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow!("{path} not found"));
        let chunk_size = self.chunk_size.max(1);
        async move {
            let data = file?;
            let total = data.len() as u64;
            let mut loaded = 0;
            for chunk in data.chunks(chunk_size) {
                loaded += chunk.len() as u64;
                progress(Progress {
                    loaded,
                    total: Some(total),
                });
            }
            Ok(data)
        }
    }
}

/// Collects load events in the order they were emitted.
#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<LoadEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<LoadEvent> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }
}

impl LoadSink for RecordingSink {
    fn emit(&self, event: LoadEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub fn stages(events: &[LoadEvent]) -> Vec<LoadStage> {
    events
        .iter()
        .filter_map(|event| match event {
            LoadEvent::Stage(stage) => Some(*stage),
            _ => None,
        })
        .collect()
}

pub fn terminal_count(events: &[LoadEvent]) -> usize {
    events
        .iter()
        .filter(|event| matches!(event, LoadEvent::Loaded(_) | LoadEvent::Failed(_)))
        .count()
}

pub fn progress_of(events: &[LoadEvent], resource: &str) -> Vec<f32> {
    events
        .iter()
        .filter_map(|event| match event {
            LoadEvent::Progress {
                resource: r,
                fraction,
            } if r == resource => Some(*fraction),
            _ => None,
        })
        .collect()
}

pub fn loaded_asset(events: Vec<LoadEvent>) -> Option<LoadedAsset> {
    events.into_iter().find_map(|event| match event {
        LoadEvent::Loaded(asset) => Some(asset),
        _ => None,
    })
}

/// Frame target that draws nothing but remembers what it was asked to draw.
#[derive(Debug)]
pub struct HeadlessTarget {
    pub viewport: Viewport,
    pub draws: usize,
    pub scene_sizes: Vec<usize>,
    pub fail_next: Option<wgpu::SurfaceError>,
}

impl HeadlessTarget {
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            viewport: Viewport::new(800, 600, config),
            draws: 0,
            scene_sizes: Vec::new(),
            fail_next: None,
        }
    }
}

impl FrameTarget for HeadlessTarget {
    fn camera_mut(&mut self) -> &mut Camera {
        &mut self.viewport.camera
    }

    fn draw(&mut self, scene: &SceneRoot) -> Result<(), wgpu::SurfaceError> {
        if let Some(error) = self.fail_next.take() {
            return Err(error);
        }
        self.draws += 1;
        self.scene_sizes.push(scene.len());
        Ok(())
    }
}

/// CPU-only scene node standing in for an uploaded model.
#[derive(Debug)]
pub struct DummyNode {
    name: String,
    transform: Transform,
}

impl DummyNode {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            transform: Transform::default(),
        }
    }
}

impl SceneNode for DummyNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn transform(&self) -> &Transform {
        &self.transform
    }

    fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }
}

pub fn realize_dummy(asset: LoadedAsset) -> anyhow::Result<Box<dyn SceneNode>> {
    Ok(Box::new(DummyNode::new(&asset.name)))
}
