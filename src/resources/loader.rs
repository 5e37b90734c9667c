//! Two-stage asset loading.
//!
//! With a material file the load fetches and parses the MTL first and only
//! then fetches the OBJ, with those materials bound to it. Without one the OBJ
//! is fetched directly and any `mtllib` it names is ignored. A failing
//! material stage aborts the load before the geometry is requested.
//!
//! The load future emits [`LoadEvent`]s into a [`LoadSink`]: stage
//! transitions, progress, and exactly one terminal `Loaded` or `Failed`.
//! [`LoadSequence`] is the receiving side's record of where a load is.

use std::{fmt, io::Cursor};

use anyhow::{Context as _, bail};
use instant::{Duration, Instant};

use crate::{
    config::ViewerConfig,
    resources::{
        AssetSource, Progress,
        material::{self, MaterialData, MaterialLibrary},
        mesh::MeshData,
    },
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LoadStage {
    Idle,
    LoadingMaterial,
    LoadingGeometry,
    Loaded,
    Attached,
    Failed,
}

impl LoadStage {
    pub fn can_advance_to(self, next: LoadStage) -> bool {
        use LoadStage::*;
        matches!(
            (self, next),
            (Idle, LoadingMaterial)
                | (Idle, LoadingGeometry)
                | (LoadingMaterial, LoadingGeometry)
                | (LoadingMaterial, Failed)
                | (LoadingGeometry, Loaded)
                | (LoadingGeometry, Failed)
                | (Loaded, Attached)
                | (Loaded, Failed)
        )
    }

    /// Whether the load has produced its one outcome.
    pub fn is_resolved(self) -> bool {
        matches!(self, LoadStage::Loaded | LoadStage::Attached | LoadStage::Failed)
    }
}

impl fmt::Display for LoadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoadStage::Idle => "idle",
            LoadStage::LoadingMaterial => "loading material",
            LoadStage::LoadingGeometry => "loading geometry",
            LoadStage::Loaded => "loaded",
            LoadStage::Attached => "attached",
            LoadStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Which files make up the asset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadRequest {
    pub model_path: String,
    pub material_path: Option<String>,
}

impl LoadRequest {
    pub fn new(model_path: impl Into<String>, material_path: Option<String>) -> Self {
        Self {
            model_path: model_path.into(),
            material_path,
        }
    }
}

impl From<&ViewerConfig> for LoadRequest {
    fn from(config: &ViewerConfig) -> Self {
        Self::new(config.model_path.clone(), config.material_path.clone())
    }
}

/// The parsed asset, still on the CPU.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LoadedAsset {
    pub name: String,
    pub meshes: Vec<MeshData>,
    pub materials: Vec<MaterialData>,
}

#[derive(Debug)]
pub struct LoadFailure {
    pub stage: LoadStage,
    pub path: String,
    pub source: anyhow::Error,
}

impl fmt::Display for LoadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed while {}", self.path, self.stage)
    }
}

impl std::error::Error for LoadFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

#[derive(Debug)]
pub enum LoadEvent {
    Stage(LoadStage),
    Progress { resource: String, fraction: f32 },
    Loaded(LoadedAsset),
    Failed(LoadFailure),
}

/// Receives the events of a running load.
pub trait LoadSink: Clone {
    fn emit(&self, event: LoadEvent);
}

/// Drops progress reports that would go backwards, and reports fractions
/// clamped to [0, 1].
#[derive(Clone, Debug)]
pub struct ProgressTracker {
    resource: String,
    last: Option<f32>,
}

impl ProgressTracker {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            last: None,
        }
    }

    /// The fraction to report for `progress`, if any.
    pub fn observe(&mut self, progress: Progress) -> Option<f32> {
        let fraction = progress.fraction()?.clamp(0.0, 1.0);
        if self.last.is_some_and(|last| fraction <= last) {
            return None;
        }
        self.last = Some(fraction);
        Some(fraction)
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }
}

/// Receiving side of one load: tracks its stage and guarantees it resolves once.
#[derive(Clone, Debug)]
pub struct LoadSequence {
    request: LoadRequest,
    stage: LoadStage,
    issued_at: Instant,
}

impl LoadSequence {
    pub fn new(request: LoadRequest) -> Self {
        Self {
            request,
            stage: LoadStage::Idle,
            issued_at: Instant::now(),
        }
    }

    /// Time since the load was issued.
    pub fn elapsed(&self) -> Duration {
        self.issued_at.elapsed()
    }

    pub fn request(&self) -> &LoadRequest {
        &self.request
    }

    pub fn stage(&self) -> LoadStage {
        self.stage
    }

    /// Moves to `next` if the transition is allowed. Invalid transitions are
    /// logged and leave the stage unchanged.
    pub fn advance(&mut self, next: LoadStage) -> bool {
        if self.stage.can_advance_to(next) {
            log::debug!("{}: {} -> {}", self.request.model_path, self.stage, next);
            self.stage = next;
            true
        } else {
            log::warn!(
                "{}: ignoring transition from {} to {}",
                self.request.model_path,
                self.stage,
                next
            );
            false
        }
    }
}

/// Loads `request` from `source`, reporting into `sink`.
///
/// Emits exactly one terminal event. Never panics on I/O or parse errors;
/// they end up in [`LoadEvent::Failed`].
pub async fn load_model<S, K>(source: &S, request: &LoadRequest, sink: K)
where
    S: AssetSource,
    K: LoadSink,
{
    match run_stages(source, request, sink.clone()).await {
        Ok(asset) => sink.emit(LoadEvent::Loaded(asset)),
        Err(failure) => sink.emit(LoadEvent::Failed(failure)),
    }
}

async fn run_stages<S, K>(
    source: &S,
    request: &LoadRequest,
    sink: K,
) -> Result<LoadedAsset, LoadFailure>
where
    S: AssetSource,
    K: LoadSink,
{
    let library = match &request.material_path {
        Some(mtl_path) => {
            sink.emit(LoadEvent::Stage(LoadStage::LoadingMaterial));
            let library = load_material_library(source, mtl_path, sink.clone())
                .await
                .map_err(|source| LoadFailure {
                    stage: LoadStage::LoadingMaterial,
                    path: mtl_path.clone(),
                    source,
                })?;
            Some(library)
        }
        None => None,
    };

    sink.emit(LoadEvent::Stage(LoadStage::LoadingGeometry));
    let geometry_failure = |source| LoadFailure {
        stage: LoadStage::LoadingGeometry,
        path: request.model_path.clone(),
        source,
    };
    let bytes = fetch_reporting(source, &request.model_path, sink)
        .await
        .map_err(geometry_failure)?;
    let meshes = parse_obj(&bytes, library.as_ref().map(MaterialLibrary::bytes))
        .await
        .with_context(|| format!("Cannot parse {}", request.model_path))
        .map_err(geometry_failure)?;

    Ok(LoadedAsset {
        name: request.model_path.clone(),
        meshes,
        materials: library.map(|library| library.materials).unwrap_or_default(),
    })
}

async fn load_material_library<S, K>(
    source: &S,
    mtl_path: &str,
    sink: K,
) -> anyhow::Result<MaterialLibrary>
where
    S: AssetSource,
    K: LoadSink,
{
    let bytes = fetch_reporting(source, mtl_path, sink.clone()).await?;
    let parsed = material::parse_mtl(&bytes).with_context(|| format!("Cannot parse {mtl_path}"))?;

    let mut trackers: Vec<ProgressTracker> = Vec::new();
    let materials = material::load_textures(source, mtl_path, parsed, move |resource, progress| {
        let idx = match trackers.iter().position(|t| t.resource() == resource) {
            Some(idx) => idx,
            None => {
                trackers.push(ProgressTracker::new(resource));
                trackers.len() - 1
            }
        };
        if let Some(fraction) = trackers[idx].observe(progress) {
            sink.emit(LoadEvent::Progress {
                resource: resource.to_string(),
                fraction,
            });
        }
    })
    .await;

    Ok(MaterialLibrary {
        materials,
        source: bytes,
    })
}

async fn fetch_reporting<S, K>(source: &S, path: &str, sink: K) -> anyhow::Result<Vec<u8>>
where
    S: AssetSource,
    K: LoadSink,
{
    let mut tracker = ProgressTracker::new(path);
    source
        .fetch(path, move |progress| {
            if let Some(fraction) = tracker.observe(progress) {
                sink.emit(LoadEvent::Progress {
                    resource: tracker.resource().to_string(),
                    fraction,
                });
            }
        })
        .await
}

/// Parses OBJ text. With `mtl` the OBJ's `usemtl` names are resolved against
/// it, whether or not the OBJ names an `mtllib`; without, they are left unbound.
pub async fn parse_obj(obj: &[u8], mtl: Option<&[u8]>) -> anyhow::Result<Vec<MeshData>> {
    let obj = match mtl {
        Some(_) => bind_material_library(obj),
        None => obj.to_vec(),
    };
    let (models, _) = tobj::load_obj_buf_async(
        &mut Cursor::new(obj),
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
        |_mtllib| {
            std::future::ready(match mtl {
                Some(text) => tobj::load_mtl_buf(&mut Cursor::new(text)),
                None => Err(tobj::LoadError::OpenFileFailed),
            })
        },
    )
    .await?;

    let meshes: Vec<MeshData> = models
        .iter()
        .filter_map(|model| {
            if model.mesh.positions.is_empty() || model.mesh.indices.is_empty() {
                log::warn!("Skipping mesh {:?} without faces", model.name);
                return None;
            }
            Some(MeshData::from_obj(model))
        })
        .collect();

    if meshes.is_empty() {
        bail!("no drawable geometry");
    }
    Ok(meshes)
}

/// Replaces the OBJ's own `mtllib` statements with a single leading one, so
/// tobj asks for the bound library exactly once and before any `usemtl`.
fn bind_material_library(obj: &[u8]) -> Vec<u8> {
    let mut bound = b"mtllib bound.mtl\n".to_vec();
    for line in obj.split_inclusive(|&b| b == b'\n') {
        if line.trim_ascii_start().starts_with(b"mtllib") {
            continue;
        }
        bound.extend_from_slice(line);
    }
    bound
}
