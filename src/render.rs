//! Drawing the scene root onto the window surface.
//!
//! Every frame the camera and light uniforms are refreshed, each node uploads
//! its transform and then draws itself into a single render pass. With MSAA
//! enabled the pass renders into the multisampled target and resolves into
//! the surface texture.

use std::iter;

use crate::{
    camera::Camera,
    context::Context,
    data_structures::scene_graph::SceneRoot,
    frame::FrameTarget,
    pipelines::light::LightUniform,
};

impl Context {
    pub fn render(&mut self, scene: &SceneRoot) -> Result<(), wgpu::SurfaceError> {
        // Rendering requires the surface to be configured
        if !self.is_surface_configured {
            return Ok(());
        }

        self.camera
            .uniform
            .update_view_proj(&self.viewport.camera, &self.viewport.projection);
        self.queue.write_buffer(
            &self.camera.buffer,
            0,
            bytemuck::cast_slice(&[self.camera.uniform]),
        );
        self.light
            .update(&self.queue, LightUniform::from_lights(scene.lights()));
        scene.iter().for_each(|node| node.write_to_buffer(&self.queue));

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let (target, resolve_target, store) = match &self.msaa_texture {
            // The multisampled image is only needed until it is resolved.
            Some(msaa) => (&msaa.view, Some(&view), wgpu::StoreOp::Discard),
            None => (&view, None, wgpu::StoreOp::Store),
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_colour),
                        store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_pipeline(&self.pipeline);
            for node in scene.iter() {
                node.draw(
                    &mut render_pass,
                    &self.camera.bind_group,
                    &self.light.bind_group,
                );
            }
        }

        self.queue.submit(iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

impl FrameTarget for Context {
    fn camera_mut(&mut self) -> &mut Camera {
        &mut self.viewport.camera
    }

    fn draw(&mut self, scene: &SceneRoot) -> Result<(), wgpu::SurfaceError> {
        self.render(scene)
    }
}
