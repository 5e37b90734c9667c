//! MTL materials: diffuse colour and diffuse texture.

use std::io::Cursor;

use anyhow::Context as _;

use crate::{
    data_structures::{model, texture::Texture},
    resources::AssetSource,
};

/// Neutral grey used for meshes that have no material.
pub const DEFAULT_DIFFUSE: [f32; 3] = [0.8, 0.8, 0.8];

#[derive(Clone, Debug, PartialEq)]
pub struct MaterialData {
    pub name: String,
    pub diffuse_colour: [f32; 3],
    pub diffuse_texture: Option<image::RgbaImage>,
}

impl Default for MaterialData {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            diffuse_colour: DEFAULT_DIFFUSE,
            diffuse_texture: None,
        }
    }
}

/// A parsed material file. The raw text is kept so the geometry stage can
/// bind it to the OBJ's `usemtl` statements.
#[derive(Clone, Debug)]
pub struct MaterialLibrary {
    pub materials: Vec<MaterialData>,
    pub(crate) source: Vec<u8>,
}

impl MaterialLibrary {
    pub fn bytes(&self) -> &[u8] {
        &self.source
    }
}

pub fn parse_mtl(bytes: &[u8]) -> anyhow::Result<Vec<tobj::Material>> {
    let (materials, _) = tobj::load_mtl_buf(&mut Cursor::new(bytes))
        .context("Cannot parse the material definition")?;
    Ok(materials)
}

/// Resolves `file` relative to the directory `relative_to` sits in.
pub fn sibling_path(relative_to: &str, file: &str) -> String {
    let file = file.replace('\\', "/");
    match relative_to.rfind('/') {
        Some(idx) if !file.starts_with('/') => format!("{}/{}", &relative_to[..idx], file),
        _ => file,
    }
}

/// Decodes `map_Kd` textures for every parsed material.
///
/// A texture that can't be fetched or decoded is logged and left out; the
/// material then renders with its diffuse colour only.
pub async fn load_textures<S: AssetSource>(
    source: &S,
    mtl_path: &str,
    materials: Vec<tobj::Material>,
    mut on_progress: impl FnMut(&str, crate::resources::Progress),
) -> Vec<MaterialData> {
    let mut loaded = Vec::with_capacity(materials.len());
    for material in materials {
        let diffuse_texture = match &material.diffuse_texture {
            Some(file) if !file.trim().is_empty() => {
                let path = sibling_path(mtl_path, file.trim());
                let fetched = source
                    .fetch(&path, |progress| on_progress(&path, progress))
                    .await
                    .and_then(|bytes| decode_texture(&bytes));
                match fetched {
                    Ok(image) => Some(image),
                    Err(e) => {
                        log::warn!(
                            "Texture {path} of material {} is unavailable, using the diffuse colour: {e:#}",
                            material.name
                        );
                        None
                    }
                }
            }
            _ => None,
        };
        let diffuse_colour = material.diffuse.unwrap_or(if diffuse_texture.is_some() {
            [1.0, 1.0, 1.0]
        } else {
            DEFAULT_DIFFUSE
        });
        loaded.push(MaterialData {
            name: material.name,
            diffuse_colour,
            diffuse_texture,
        });
    }
    loaded
}

fn decode_texture(bytes: &[u8]) -> anyhow::Result<image::RgbaImage> {
    let image = image::load_from_memory(bytes).context("Cannot decode the texture image")?;
    Ok(image.to_rgba8())
}

pub fn upload(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
    data: &MaterialData,
) -> model::Material {
    let diffuse_texture = match &data.diffuse_texture {
        Some(image) => Texture::from_rgba(device, queue, image, Some(&data.name)),
        // White so that the diffuse colour comes through unchanged.
        None => Texture::create_solid([255, 255, 255, 255], device, queue),
    };
    model::Material::new(
        device,
        &data.name,
        data.diffuse_colour,
        diffuse_texture,
        layout,
    )
}
