//! Rendering context.
//!
//! [`Viewport`] is the CPU side of what gets drawn: surface dimensions,
//! projection and camera pose. [`Context`] owns the GPU objects (surface,
//! device, queue, pipeline, uniforms) together with the viewport they render.

use std::sync::Arc;

use anyhow::{Context as _, anyhow};
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::{
    camera::{Camera, CameraResources, CameraUniform, Projection},
    config::ViewerConfig,
    data_structures::{model, texture::Texture},
    pipelines::{
        basic::mk_basic_pipeline,
        light::{LightResources, LightUniform},
    },
};

/// Host element the web build appends its canvas to.
#[cfg(target_arch = "wasm32")]
pub const CANVAS_CONTAINER_ID: &str = "canvas-container";

/// Size the web canvas starts at when the browser does not report one.
pub const FALLBACK_CANVAS_SIZE: (f64, f64) = (800.0, 600.0);

/// Logical canvas size for a browser viewport of `browser` (inner width and
/// height in CSS pixels). Unknown or empty viewports get
/// [`FALLBACK_CANVAS_SIZE`].
pub fn canvas_size(browser: Option<(f64, f64)>) -> winit::dpi::LogicalSize<f64> {
    let (width, height) = browser
        .filter(|&(w, h)| w.is_finite() && h.is_finite() && w >= 1.0 && h >= 1.0)
        .unwrap_or(FALLBACK_CANVAS_SIZE);
    winit::dpi::LogicalSize::new(width, height)
}

/// Surface size, projection and camera pose.
#[derive(Clone, Debug, PartialEq)]
pub struct Viewport {
    width: u32,
    height: u32,
    pub camera: Camera,
    pub projection: Projection,
}

impl Viewport {
    pub fn new(width: u32, height: u32, config: &ViewerConfig) -> Self {
        let camera = Camera::new(config.camera_position, config.camera_target);
        let projection = Projection::new(
            width,
            height,
            cgmath::Deg(config.fovy_degrees),
            config.znear,
            config.zfar,
        );
        Self {
            width,
            height,
            camera,
            projection,
        }
    }

    /// Applies a resize notification. Zero sized notifications (minimised
    /// windows) are ignored and return `false`.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        self.width = width;
        self.height = height;
        self.projection.resize(width, height);
        true
    }

    pub fn surface_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn aspect(&self) -> f32 {
        self.projection.aspect
    }
}

#[derive(Debug)]
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub(crate) depth_texture: Texture,
    pub(crate) msaa_texture: Option<Texture>,
    pub(crate) is_surface_configured: bool,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub camera: CameraResources,
    pub light: LightResources,
    pub material_layout: wgpu::BindGroupLayout,
    pub pipeline: wgpu::RenderPipeline,
    pub viewport: Viewport,
    pub clear_colour: wgpu::Color,
    pub sample_count: u32,
}

impl Context {
    pub async fn new(window: Arc<Window>, viewer_config: &ViewerConfig) -> anyhow::Result<Self> {
        #[cfg(target_arch = "wasm32")]
        attach_canvas(&window)?;

        let size = window.inner_size();

        // The instance is a handle to our GPU
        // Backends::PRIMARY => Vulkan + Metal + DX12 + Browser WebGPU
        log::info!("WGPU setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("Cannot create a drawing surface for the window")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No graphics adapter is compatible with the window surface")?;

        log::info!("device and queue");
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                // WebGL doesn't support all of wgpu's features, so if
                // we're building for the web we'll have to disable some.
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults()
                } else {
                    wgpu::Limits::default()
                },
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
                ..Default::default()
            })
            .await
            .context("Cannot open the graphics device")?;

        log::info!("Surface");
        let surface_caps = surface.get_capabilities(&adapter);
        // The shader writes linear colour, so prefer an sRGB surface and let
        // the hardware do the conversion.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| anyhow!("The surface reports no supported texture formats"))?;
        let present_mode = surface_caps
            .present_modes
            .first()
            .copied()
            .unwrap_or(wgpu::PresentMode::Fifo);
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let sample_count = {
            let requested = viewer_config.sample_count();
            let supported = adapter
                .get_texture_format_features(surface_format)
                .flags
                .sample_count_supported(requested);
            if supported {
                requested
            } else {
                log::warn!("{requested}x MSAA is not supported for {surface_format:?}, rendering without antialiasing");
                1
            }
        };

        let viewport = Viewport::new(size.width, size.height, viewer_config);

        let mut camera_uniform = CameraUniform::new();
        camera_uniform.update_view_proj(&viewport.camera, &viewport.projection);

        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[camera_uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let camera_bind_group_layout =
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
                label: Some("camera_bind_group_layout"),
            });

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        let camera = CameraResources {
            uniform: camera_uniform,
            buffer: camera_buffer,
            bind_group: camera_bind_group,
            bind_group_layout: camera_bind_group_layout,
        };

        // Filled from the scene's light nodes on the first frame.
        let light = LightResources::new(LightUniform::from_lights([]), &device);

        let material_layout = model::material_layout(&device);
        let pipeline = mk_basic_pipeline(
            &device,
            &config,
            sample_count,
            &material_layout,
            &camera.bind_group_layout,
            &light.bind_group_layout,
        );

        let depth_texture = Texture::create_depth_texture(
            &device,
            [config.width, config.height],
            sample_count,
            "depth_texture",
        );
        let msaa_texture = mk_msaa_texture(&device, &config, sample_count);

        // Rendering requires a configured surface, which a zero sized window can't have.
        let is_surface_configured = size.width > 0 && size.height > 0;
        if is_surface_configured {
            surface.configure(&device, &config);
        }

        Ok(Self {
            window,
            depth_texture,
            msaa_texture,
            is_surface_configured,
            surface,
            device,
            queue,
            config,
            camera,
            light,
            material_layout,
            pipeline,
            viewport,
            clear_colour: viewer_config.clear_colour,
            sample_count,
        })
    }

    /// Resizes the viewport, the surface and every attachment sized after it.
    pub fn resize(&mut self, width: u32, height: u32) {
        if !self.viewport.resize(width, height) {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.is_surface_configured = true;
        self.depth_texture = Texture::create_depth_texture(
            &self.device,
            [width, height],
            self.sample_count,
            "depth_texture",
        );
        self.msaa_texture = mk_msaa_texture(&self.device, &self.config, self.sample_count);
    }

    pub fn window(&self) -> &Window {
        &self.window
    }
}

fn mk_msaa_texture(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    sample_count: u32,
) -> Option<Texture> {
    (sample_count > 1).then(|| {
        Texture::create_msaa_texture(
            device,
            [config.width, config.height],
            config.format,
            sample_count,
        )
    })
}

#[cfg(target_arch = "wasm32")]
fn attach_canvas(window: &Window) -> anyhow::Result<()> {
    use winit::platform::web::WindowExtWebSys;

    let canvas = window
        .canvas()
        .ok_or_else(|| anyhow!("The window has no canvas"))?;
    let container = web_sys::window()
        .and_then(|win| win.document())
        .and_then(|doc| doc.get_element_by_id(CANVAS_CONTAINER_ID))
        .ok_or_else(|| anyhow!("No element with id {CANVAS_CONTAINER_ID:?} to host the canvas"))?;
    container
        .append_child(&canvas)
        .map_err(|e| anyhow!("Cannot append the canvas to {CANVAS_CONTAINER_ID:?}: {e:?}"))?;
    Ok(())
}
