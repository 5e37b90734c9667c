//! Application event loop.
//!
//! [`App`] is the winit [`ApplicationHandler`] hosting one [`Viewer`]. It
//! creates the window and the GPU [`Context`], issues the asset load once the
//! context exists and then keeps a redraw requested for as long as the viewer
//! runs.
//!
//! # Lifecycle
//!
//! 1. `resumed` creates the window and the context (asynchronously on the web)
//! 2. the asset load is spawned onto the async runtime (tokio natively,
//!    `spawn_local` on the web); its events come back as [`ViewerEvent::Load`]
//! 3. every `RedrawRequested` runs one [`Viewer::frame`] and requests the next
//! 4. closing the window or pressing Escape stops the run token and exits

use std::{fmt::Debug, ops::ControlFlow, sync::Arc};

use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    keyboard::{KeyCode, PhysicalKey},
    window::Window,
};

use crate::{
    config::ViewerConfig,
    context::Context,
    data_structures::scene_graph::{ModelNode, SceneNode},
    resources::{
        self,
        loader::{LoadEvent, LoadRequest, LoadSink},
    },
    viewer::Viewer,
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Events sent to the event loop from outside of it.
pub enum ViewerEvent {
    /// The context finished initializing (web only, where it is created asynchronously).
    #[cfg(target_arch = "wasm32")]
    Initialized(Box<Context>),
    #[cfg(target_arch = "wasm32")]
    InitFailed(anyhow::Error),
    Load(LoadEvent),
}

impl Debug for ViewerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(target_arch = "wasm32")]
            Self::Initialized(_) => f.write_str("Initialized"),
            #[cfg(target_arch = "wasm32")]
            Self::InitFailed(e) => f.debug_tuple("InitFailed").field(e).finish(),
            Self::Load(event) => f.debug_tuple("Load").field(event).finish(),
        }
    }
}

impl LoadSink for EventLoopProxy<ViewerEvent> {
    fn emit(&self, event: LoadEvent) {
        if self.send_event(ViewerEvent::Load(event)).is_err() {
            log::warn!("The event loop closed before a load event could be delivered");
        }
    }
}

pub struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    proxy: EventLoopProxy<ViewerEvent>,
    viewer: Viewer,
    ctx: Option<Context>,
    initializing: bool,
    init_error: Option<anyhow::Error>,
}

impl App {
    fn new(event_loop: &EventLoop<ViewerEvent>, config: ViewerConfig) -> anyhow::Result<Self> {
        let proxy = event_loop.create_proxy();
        #[cfg(not(target_arch = "wasm32"))]
        let async_runtime = tokio::runtime::Runtime::new()?;
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            proxy,
            viewer: Viewer::new(config),
            ctx: None,
            initializing: false,
            init_error: None,
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("Viewer initialization failed: {error:#}");
        self.viewer.stop();
        self.init_error = Some(error);
        event_loop.exit();
    }

    fn on_context_ready(&mut self, mut ctx: Context) {
        let size = ctx.window.inner_size();
        ctx.resize(size.width, size.height);
        ctx.window.request_redraw();
        self.ctx = Some(ctx);
        self.initializing = false;

        if let Some(request) = self.viewer.begin_load() {
            self.spawn_load(request);
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn spawn_load(&self, request: LoadRequest) {
        let source = resources::FileSource::new(&self.viewer.config().asset_root);
        let proxy = self.proxy.clone();
        self.async_runtime.spawn(async move {
            resources::loader::load_model(&source, &request, proxy).await;
        });
    }

    #[cfg(target_arch = "wasm32")]
    fn spawn_load(&self, request: LoadRequest) {
        let source = resources::HttpSource::new(self.viewer.config().asset_root.clone());
        let proxy = self.proxy.clone();
        wasm_bindgen_futures::spawn_local(async move {
            resources::loader::load_model(&source, &request, proxy).await;
        });
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(ctx) = self.ctx.as_mut() else {
            return;
        };
        match self.viewer.frame(ctx) {
            Ok(ControlFlow::Continue(())) => ctx.window.request_redraw(),
            Ok(ControlFlow::Break(())) => event_loop.exit(),
            // Reconfigure the surface if it's lost or outdated
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let size = ctx.window.inner_size();
                ctx.resize(size.width, size.height);
                ctx.window.request_redraw();
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("Out of GPU memory, stopping");
                self.viewer.stop();
                event_loop.exit();
            }
            Err(e) => {
                log::error!("Unable to render {}", e);
                ctx.window.request_redraw();
            }
        }
    }
}

impl ApplicationHandler<ViewerEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.ctx.is_some() || self.initializing {
            return;
        }

        #[allow(unused_mut)]
        let mut window_attributes =
            Window::default_attributes().with_title(self.viewer.config().title.clone());

        #[cfg(target_arch = "wasm32")]
        {
            use winit::platform::web::WindowAttributesExtWebSys;
            // The canvas is appended to the page by `Context::new`.
            window_attributes = window_attributes
                .with_append(false)
                .with_inner_size(crate::context::canvas_size(browser_size()));
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                self.fail(event_loop, anyhow::Error::new(e).context("Cannot create the window"));
                return;
            }
        };
        self.initializing = true;

        #[cfg(target_arch = "wasm32")]
        follow_browser_size(window.clone());

        #[cfg(not(target_arch = "wasm32"))]
        {
            let ctx = self
                .async_runtime
                .block_on(Context::new(window, self.viewer.config()));
            match ctx {
                Ok(ctx) => self.on_context_ready(ctx),
                Err(e) => self.fail(event_loop, e),
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            let config = self.viewer.config().clone();
            wasm_bindgen_futures::spawn_local(async move {
                let event = match Context::new(window, &config).await {
                    Ok(ctx) => ViewerEvent::Initialized(Box::new(ctx)),
                    Err(e) => ViewerEvent::InitFailed(e),
                };
                if proxy.send_event(event).is_err() {
                    log::error!("The event loop closed before the context was ready");
                }
            });
        }
    }

    #[cfg_attr(not(target_arch = "wasm32"), allow(unused_variables))]
    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: ViewerEvent) {
        match event {
            #[cfg(target_arch = "wasm32")]
            ViewerEvent::Initialized(ctx) => self.on_context_ready(*ctx),
            #[cfg(target_arch = "wasm32")]
            ViewerEvent::InitFailed(e) => self.fail(event_loop, e),
            ViewerEvent::Load(load_event) => {
                let Some(ctx) = self.ctx.as_ref() else {
                    log::warn!("Dropping {load_event:?}, there is no context to attach to");
                    return;
                };
                self.viewer.on_load_event(load_event, |asset| {
                    let model = resources::upload_model(
                        &ctx.device,
                        &ctx.queue,
                        &ctx.material_layout,
                        &asset,
                    );
                    let node: Box<dyn SceneNode> =
                        Box::new(ModelNode::new(&ctx.device, &asset.name, model));
                    Ok(node)
                });
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        if self.ctx.is_none() {
            return;
        }

        self.viewer.handle_window_event(&event);

        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                self.viewer.stop();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(ctx) = self.ctx.as_mut() {
                    ctx.resize(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }
}

/// Runs the viewer until its window closes.
///
/// Initialization faults (no window, no adapter, missing canvas container)
/// are returned; asset load failures are logged and the viewer keeps running.
pub fn run(config: ViewerConfig) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        // Fails only if a logger is already installed.
        let _ = console_log::init_with_level(log::Level::Info);
    }

    let event_loop: EventLoop<ViewerEvent> = EventLoop::with_user_event().build()?;

    let mut app = App::new(&event_loop, config)?;

    event_loop.run_app(&mut app)?;

    match app.init_error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Web entry point. The preset is picked with the `preset` query parameter.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn run_web() -> Result<(), JsValue> {
    let config = web_preset()
        .map(|name| ViewerConfig::preset(&name))
        .unwrap_or_else(|| Ok(ViewerConfig::default()))
        .map_err(|e| JsValue::from_str(&format!("{e:#}")))?;
    run(config).map_err(|e| JsValue::from_str(&format!("{e:#}")))
}

#[cfg(target_arch = "wasm32")]
fn web_preset() -> Option<String> {
    let search = web_sys::window()?.location().search().ok()?;
    search
        .trim_start_matches('?')
        .split('&')
        .find_map(|pair| pair.strip_prefix("preset="))
        .map(str::to_string)
}

/// Inner width and height of the browser window in CSS pixels.
#[cfg(target_arch = "wasm32")]
fn browser_size() -> Option<(f64, f64)> {
    let browser = web_sys::window()?;
    let width = browser.inner_width().ok()?.as_f64()?;
    let height = browser.inner_height().ok()?.as_f64()?;
    Some((width, height))
}

/// Keeps the canvas as large as the browser window. winit observes the canvas
/// and reports every change as `WindowEvent::Resized`.
#[cfg(target_arch = "wasm32")]
fn follow_browser_size(window: Arc<Window>) {
    let Some(browser) = web_sys::window() else {
        log::warn!("No browser window, the canvas keeps its initial size");
        return;
    };
    let on_resize = Closure::<dyn FnMut()>::new(move || {
        let _ = window.request_inner_size(crate::context::canvas_size(browser_size()));
    });
    if let Err(e) =
        browser.add_event_listener_with_callback("resize", on_resize.as_ref().unchecked_ref())
    {
        log::warn!("Cannot follow browser resizes: {e:?}");
    }
    // The listener lives as long as the page.
    on_resize.forget();
}
