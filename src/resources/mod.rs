//! Loading the viewer's asset from external files.
//!
//! - `loader` runs the two-stage load (material, then geometry) and reports
//!   its progress and outcome as [`loader::LoadEvent`]s
//! - `material` parses MTL files and decodes their diffuse textures
//! - `mesh` turns OBJ geometry into vertex and index data
//!
//! Parsing happens on the CPU inside the load future. The result is uploaded
//! to the GPU by [`upload_model`] once it is back on the event-loop thread.

use std::future::Future;
#[cfg(not(target_arch = "wasm32"))]
use std::path::PathBuf;

#[cfg(not(target_arch = "wasm32"))]
use anyhow::Context as _;

use crate::data_structures::model;

pub mod loader;
pub mod material;
pub mod mesh;

/// Bytes received so far for one resource, and the full size when known.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Progress {
    pub loaded: u64,
    pub total: Option<u64>,
}

impl Progress {
    /// Share of the resource received, within [0, 1]. `None` if the size is unknown.
    pub fn fraction(&self) -> Option<f32> {
        match self.total {
            Some(0) => Some(1.0),
            Some(total) => Some((self.loaded as f64 / total as f64).clamp(0.0, 1.0) as f32),
            None => None,
        }
    }
}

/// Where asset bytes come from.
pub trait AssetSource {
    /// Fetches the resource at `path`, calling `progress` as bytes arrive.
    fn fetch<P>(&self, path: &str, progress: P) -> impl Future<Output = anyhow::Result<Vec<u8>>>
    where
        P: FnMut(Progress);
}

/// Reads assets from a directory on disk.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Clone, Debug)]
pub struct FileSource {
    root: PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
impl FileSource {
    const CHUNK_SIZE: usize = 64 * 1024;

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl AssetSource for FileSource {
    fn fetch<P>(&self, path: &str, mut progress: P) -> impl Future<Output = anyhow::Result<Vec<u8>>>
    where
        P: FnMut(Progress),
    {
        use tokio::io::AsyncReadExt;

        let full_path = self.root.join(path);
        async move {
            let mut file = tokio::fs::File::open(&full_path)
                .await
                .with_context(|| format!("Cannot open {}", full_path.display()))?;
            let total = file.metadata().await.ok().map(|meta| meta.len());

            let mut data = Vec::with_capacity(total.unwrap_or(0) as usize);
            let mut chunk = vec![0u8; Self::CHUNK_SIZE];
            loop {
                let read = file
                    .read(&mut chunk)
                    .await
                    .with_context(|| format!("Cannot read {}", full_path.display()))?;
                if read == 0 {
                    break;
                }
                data.extend_from_slice(&chunk[..read]);
                progress(Progress {
                    loaded: data.len() as u64,
                    total,
                });
            }
            if data.is_empty() {
                // Empty files never enter the loop; report them as complete.
                progress(Progress { loaded: 0, total });
            }
            Ok(data)
        }
    }
}

/// Fetches assets over HTTP relative to the page origin.
#[cfg(target_arch = "wasm32")]
#[derive(Clone, Debug)]
pub struct HttpSource {
    root: String,
}

#[cfg(target_arch = "wasm32")]
impl HttpSource {
    pub fn new(root: impl Into<String>) -> Self {
        Self { root: root.into() }
    }

    fn format_url(&self, file_name: &str) -> anyhow::Result<reqwest::Url> {
        let origin = web_sys::window()
            .ok_or_else(|| anyhow::anyhow!("No browser window"))?
            .location()
            .origin()
            .map_err(|e| anyhow::anyhow!("Cannot read the page origin: {e:?}"))?;
        let root = self.root.trim_matches('/');
        let base = if root.is_empty() {
            format!("{origin}/")
        } else {
            format!("{origin}/{root}/")
        };
        Ok(reqwest::Url::parse(&base)?.join(file_name)?)
    }
}

#[cfg(target_arch = "wasm32")]
impl AssetSource for HttpSource {
    fn fetch<P>(&self, path: &str, mut progress: P) -> impl Future<Output = anyhow::Result<Vec<u8>>>
    where
        P: FnMut(Progress),
    {
        let url = self.format_url(path);
        async move {
            let url = url?;
            let response = reqwest::get(url.clone()).await?.error_for_status()?;
            let total = response.content_length();
            // The browser fetch API hands the body over in one piece.
            let data = response.bytes().await?.to_vec();
            progress(Progress {
                loaded: data.len() as u64,
                total: total.or(Some(data.len() as u64)),
            });
            log::debug!("fetched {url}");
            Ok(data)
        }
    }
}

/// Uploads a parsed asset: one GPU mesh per parsed mesh and one GPU material
/// per parsed material, plus a neutral default for meshes without one.
pub fn upload_model(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
    asset: &loader::LoadedAsset,
) -> model::Model {
    let mut materials: Vec<model::Material> = asset
        .materials
        .iter()
        .map(|data| material::upload(device, queue, layout, data))
        .collect();

    let default_index = materials.len();
    let needs_default = asset
        .meshes
        .iter()
        .any(|mesh| mesh.material.is_none_or(|idx| idx >= default_index));
    if needs_default {
        materials.push(material::upload(
            device,
            queue,
            layout,
            &material::MaterialData::default(),
        ));
    }

    let meshes = asset
        .meshes
        .iter()
        .map(|data| {
            let material = data
                .material
                .filter(|idx| *idx < default_index)
                .unwrap_or(default_index);
            mesh::upload(device, data, material)
        })
        .collect();

    model::Model { meshes, materials }
}
