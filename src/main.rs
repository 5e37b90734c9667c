#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    let config = model_viewer::ViewerConfig::from_env()?;
    model_viewer::run(config)
}

// The web build starts through the `wasm_bindgen(start)` entry point in the library.
#[cfg(target_arch = "wasm32")]
fn main() {}
