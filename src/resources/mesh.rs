use cgmath::{InnerSpace, Vector3};
use wgpu::util::DeviceExt;

use crate::data_structures::model;

/// One OBJ object after parsing, ready to be uploaded.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshData {
    pub name: String,
    pub vertices: Vec<model::ModelVertex>,
    pub indices: Vec<u32>,
    /// Index into the asset's materials; `None` draws with the default material.
    pub material: Option<usize>,
}

impl MeshData {
    pub fn from_obj(model: &tobj::Model) -> Self {
        let mesh = &model.mesh;
        Self {
            name: model.name.clone(),
            vertices: build_vertices(&mesh.positions, &mesh.texcoords, &mesh.normals, &mesh.indices),
            indices: mesh.indices.clone(),
            material: mesh.material_id,
        }
    }
}

/**
 * Interleaves single-indexed OBJ attributes into vertices.
 *
 * Texture coordinates are flipped vertically because OBJ has its origin at
 * the bottom left and wgpu at the top left. Files without normals get smooth
 * normals averaged from the faces around each vertex.
 */
pub fn build_vertices(
    positions: &[f32],
    texcoords: &[f32],
    normals: &[f32],
    indices: &[u32],
) -> Vec<model::ModelVertex> {
    let mut vertices = (0..positions.len() / 3)
        .map(|i| model::ModelVertex {
            position: [positions[i * 3], positions[i * 3 + 1], positions[i * 3 + 2]],
            tex_coords: [
                texcoords.get(i * 2).map_or(0.0, |f| *f),
                1.0 - texcoords.get(i * 2 + 1).map_or(0.0, |f| *f),
            ],
            normal: [
                normals.get(i * 3).map_or(0.0, |f| *f),
                normals.get(i * 3 + 1).map_or(0.0, |f| *f),
                normals.get(i * 3 + 2).map_or(0.0, |f| *f),
            ],
        })
        .collect::<Vec<_>>();

    if normals.is_empty() {
        compute_smooth_normals(&mut vertices, indices);
    }
    vertices
}

fn compute_smooth_normals(vertices: &mut [model::ModelVertex], indices: &[u32]) {
    let mut accumulated = vec![Vector3::new(0.0f32, 0.0, 0.0); vertices.len()];

    for c in indices.chunks_exact(3) {
        let (i0, i1, i2) = (c[0] as usize, c[1] as usize, c[2] as usize);
        if i0 >= vertices.len() || i1 >= vertices.len() || i2 >= vertices.len() {
            continue;
        }
        let pos0: Vector3<_> = vertices[i0].position.into();
        let pos1: Vector3<_> = vertices[i1].position.into();
        let pos2: Vector3<_> = vertices[i2].position.into();

        // Not normalized, so larger faces weigh more in the average.
        let face_normal = (pos1 - pos0).cross(pos2 - pos0);
        accumulated[i0] += face_normal;
        accumulated[i1] += face_normal;
        accumulated[i2] += face_normal;
    }

    for (vertex, normal) in vertices.iter_mut().zip(accumulated) {
        // Vertices no face refers to keep a zero normal.
        if normal.magnitude2() > 0.0 {
            vertex.normal = normal.normalize().into();
        }
    }
}

pub fn upload(device: &wgpu::Device, data: &MeshData, material: usize) -> model::Mesh {
    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{:?} Vertex Buffer", data.name)),
        contents: bytemuck::cast_slice(&data.vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });

    let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{:?} Index Buffer", data.name)),
        // The indices are for positions, texels, and normals because we set `single_index` to true
        contents: bytemuck::cast_slice(&data.indices),
        usage: wgpu::BufferUsages::INDEX,
    });

    model::Mesh {
        name: data.name.clone(),
        vertex_buffer,
        index_buffer,
        num_elements: data.indices.len() as u32,
        material,
    }
}
