use wgpu::util::DeviceExt;

use crate::data_structures::scene_graph::Light;

pub struct LightResources {
    pub uniform: LightUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl std::fmt::Debug for LightResources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LightResources")
            .field("uniform", &self.uniform)
            .finish_non_exhaustive()
    }
}

impl LightResources {
    pub fn new(uniform: LightUniform, device: &wgpu::Device) -> Self {
        let buffer = mk_buffer(device, uniform);
        let bind_group_layout = mk_bind_group_layout(device);
        let bind_group = mk_bind_group(device, &bind_group_layout, &buffer);
        Self {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    /// Writes `uniform` to the GPU if it differs from what is already there.
    pub fn update(&mut self, queue: &wgpu::Queue, uniform: LightUniform) {
        if uniform != self.uniform {
            self.uniform = uniform;
            queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
        }
    }
}

/// Ambient term plus a single directional light, both pre-multiplied by intensity.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    // vec4 instead of vec3: uniforms require 16 byte alignment
    ambient: [f32; 4],
    direction: [f32; 4],
    colour: [f32; 4],
}

impl LightUniform {
    /// Folds the scene's lights into one uniform. Ambient lights add up; the
    /// first directional light wins and later ones are ignored with a warning.
    pub fn from_lights(lights: impl IntoIterator<Item = Light>) -> Self {
        let mut uniform = <Self as bytemuck::Zeroable>::zeroed();
        let mut has_directional = false;
        for light in lights {
            match light {
                Light::Ambient { colour, intensity } => {
                    for (acc, c) in uniform.ambient.iter_mut().zip(colour) {
                        *acc += c * intensity;
                    }
                }
                Light::Directional {
                    colour,
                    intensity,
                    direction,
                } => {
                    if has_directional {
                        log::warn!("only one directional light is supported, ignoring extra light");
                        continue;
                    }
                    has_directional = true;
                    uniform.direction = [direction.x, direction.y, direction.z, 0.0];
                    uniform.colour = [colour[0] * intensity, colour[1] * intensity, colour[2] * intensity, 1.0];
                }
            }
        }
        uniform
    }

    pub fn ambient(&self) -> [f32; 3] {
        [self.ambient[0], self.ambient[1], self.ambient[2]]
    }

    pub fn directional(&self) -> ([f32; 3], [f32; 3]) {
        (
            [self.direction[0], self.direction[1], self.direction[2]],
            [self.colour[0], self.colour[1], self.colour[2]],
        )
    }
}

pub fn mk_buffer(device: &wgpu::Device, light_uniform: LightUniform) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Light Buffer"),
        contents: bytemuck::cast_slice(&[light_uniform]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("light_bind_group_layout"),
    })
}

pub fn mk_bind_group(
    device: &wgpu::Device,
    bind_group_layout: &wgpu::BindGroupLayout,
    light_buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: bind_group_layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: light_buffer.as_entire_binding(),
        }],
        label: Some("light_bind_group"),
    })
}
