//! Scene root and scene nodes.
//!
//! The scene is an ordered, append-only list of nodes drawn together every
//! frame: the lights added at start-up and, once the asset arrives, the loaded
//! model. Nodes are referenced by the [`NodeHandle`] returned when they are
//! attached; handles stay valid for the lifetime of the scene because nodes are
//! never removed.

use std::fmt::Debug;

use cgmath::{InnerSpace, Vector3};
use wgpu::util::DeviceExt;

use crate::data_structures::{
    model::{self, DrawModel},
    transform::Transform,
};

/// A light contributing to the shading of every drawn mesh.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Light {
    Ambient {
        colour: [f32; 3],
        intensity: f32,
    },
    /// `direction` points from the scene towards the light.
    Directional {
        colour: [f32; 3],
        intensity: f32,
        direction: Vector3<f32>,
    },
}

pub trait SceneNode {
    fn name(&self) -> &str;

    fn transform(&self) -> &Transform;

    fn transform_mut(&mut self) -> &mut Transform;

    /// Lights return what they emit; drawable nodes return `None`.
    fn light(&self) -> Option<Light> {
        None
    }

    /// Upload per-frame data (the world transform) before the render pass starts.
    fn write_to_buffer(&self, _queue: &wgpu::Queue) {}

    fn draw(
        &self,
        _render_pass: &mut wgpu::RenderPass<'_>,
        _camera_bind_group: &wgpu::BindGroup,
        _light_bind_group: &wgpu::BindGroup,
    ) {
    }
}

// Dummy impl so containers of nodes can derive Debug
impl Debug for dyn SceneNode + 'static {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneNode")
            .field("name", &self.name())
            .finish()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeHandle(usize);

impl NodeHandle {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Default)]
pub struct SceneRoot {
    nodes: Vec<Box<dyn SceneNode>>,
}

impl SceneRoot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `node` and returns a handle to it.
    pub fn add(&mut self, node: Box<dyn SceneNode>) -> NodeHandle {
        log::debug!("attaching scene node {}", node.name());
        self.nodes.push(node);
        NodeHandle(self.nodes.len() - 1)
    }

    pub fn get(&self, handle: NodeHandle) -> Option<&dyn SceneNode> {
        self.nodes.get(handle.0).map(|node| node.as_ref())
    }

    pub fn get_mut(&mut self, handle: NodeHandle) -> Option<&mut (dyn SceneNode + 'static)> {
        self.nodes.get_mut(handle.0).map(|node| node.as_mut())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn SceneNode> {
        self.nodes.iter().map(|node| node.as_ref())
    }

    pub fn lights(&self) -> impl Iterator<Item = Light> + '_ {
        self.nodes.iter().filter_map(|node| node.light())
    }
}

pub struct LightNode {
    name: String,
    light: Light,
    transform: Transform,
}

impl LightNode {
    pub fn ambient(colour: [f32; 3], intensity: f32) -> Self {
        Self {
            name: "ambient light".to_string(),
            light: Light::Ambient { colour, intensity },
            transform: Transform::default(),
        }
    }

    /// `position` is where the light sits; it shines towards the origin.
    pub fn directional(colour: [f32; 3], intensity: f32, position: Vector3<f32>) -> Self {
        let direction = if position.magnitude2() > 0.0 {
            position.normalize()
        } else {
            Vector3::unit_y()
        };
        Self {
            name: "directional light".to_string(),
            light: Light::Directional {
                colour,
                intensity,
                direction,
            },
            transform: Transform::from(direction),
        }
    }
}

impl SceneNode for LightNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn transform(&self) -> &Transform {
        &self.transform
    }

    fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }

    fn light(&self) -> Option<Light> {
        Some(self.light)
    }
}

/// A drawable model with its own world transform.
pub struct ModelNode {
    name: String,
    model: model::Model,
    transform: Transform,
    transform_buffer: wgpu::Buffer,
}

impl ModelNode {
    pub fn new(device: &wgpu::Device, name: &str, model: model::Model) -> Self {
        let transform = Transform::default();
        let transform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Transform Buffer"),
            contents: bytemuck::cast_slice(&[transform.to_raw()]),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });

        Self {
            name: name.to_string(),
            model,
            transform,
            transform_buffer,
        }
    }

    pub fn model(&self) -> &model::Model {
        &self.model
    }
}

impl SceneNode for ModelNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn transform(&self) -> &Transform {
        &self.transform
    }

    fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }

    fn write_to_buffer(&self, queue: &wgpu::Queue) {
        queue.write_buffer(
            &self.transform_buffer,
            0,
            bytemuck::cast_slice(&[self.transform.to_raw()]),
        );
    }

    fn draw(
        &self,
        render_pass: &mut wgpu::RenderPass<'_>,
        camera_bind_group: &wgpu::BindGroup,
        light_bind_group: &wgpu::BindGroup,
    ) {
        render_pass.set_vertex_buffer(1, self.transform_buffer.slice(..));
        render_pass.draw_model(&self.model, camera_bind_group, light_bind_group);
    }
}
