//! Viewer configuration and presets.
//!
//! A [`ViewerConfig`] collects every literal that differs between viewer
//! setups: camera pose, light intensities, which files to load and what to do
//! with the model once it arrives. The three presets reproduce the classic
//! setups (plain OBJ, OBJ + MTL, OBJ + MTL spinning about the vertical axis).

use anyhow::bail;
use cgmath::{Point3, Vector3};

/// Environment variable used by [`ViewerConfig::from_env`] to pick a preset.
pub const PRESET_ENV: &str = "VIEWER_PRESET";

/// Axis a post-load rotation is applied around.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn unit(self) -> Vector3<f32> {
        match self {
            Axis::X => Vector3::unit_x(),
            Axis::Y => Vector3::unit_y(),
            Axis::Z => Vector3::unit_z(),
        }
    }
}

/// What happens to the model node every frame once it is attached.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PostLoadTransform {
    /// Rotate by a fixed amount per frame. The speed is per invocation, not per
    /// elapsed second, so it depends on the display refresh rate.
    Spin { axis: Axis, radians_per_frame: f32 },
}

#[derive(Clone, Debug, PartialEq)]
pub struct ViewerConfig {
    pub title: String,
    pub camera_position: Point3<f32>,
    pub camera_target: Point3<f32>,
    pub fovy_degrees: f32,
    pub znear: f32,
    pub zfar: f32,
    pub ambient_intensity: f32,
    pub directional_intensity: f32,
    /// Direction the directional light shines *from*; normalized on use.
    pub directional_position: Vector3<f32>,
    pub light_colour: [f32; 3],
    pub clear_colour: wgpu::Color,
    pub model_path: String,
    pub material_path: Option<String>,
    pub post_load: Option<PostLoadTransform>,
    pub min_distance: Option<f32>,
    pub max_distance: Option<f32>,
    pub antialias: bool,
    /// Directory (native) or URL prefix (web) that asset paths resolve against.
    pub asset_root: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self::basic()
    }
}

impl ViewerConfig {
    /// Plain OBJ model, no material file.
    pub fn basic() -> Self {
        Self {
            title: "model-viewer".to_string(),
            camera_position: Point3::new(0.0, 1.0, 5.0),
            camera_target: Point3::new(0.0, 0.0, 0.0),
            fovy_degrees: 45.0,
            znear: 0.1,
            zfar: 1000.0,
            ambient_intensity: 0.6,
            directional_intensity: 0.6,
            directional_position: Vector3::new(5.0, 10.0, 7.0),
            light_colour: [1.0, 1.0, 1.0],
            clear_colour: wgpu::Color::BLACK,
            model_path: "model.obj".to_string(),
            material_path: None,
            post_load: None,
            min_distance: None,
            max_distance: None,
            antialias: true,
            asset_root: "assets".to_string(),
        }
    }

    /// OBJ model with its MTL material file.
    pub fn textured() -> Self {
        Self {
            camera_position: Point3::new(0.0, 2.0, 8.0),
            ambient_intensity: 0.5,
            directional_intensity: 0.8,
            model_path: "models/model.obj".to_string(),
            material_path: Some("models/model.mtl".to_string()),
            ..Self::basic()
        }
    }

    /// Textured model that keeps spinning about the vertical axis once loaded.
    pub fn spinning() -> Self {
        Self {
            camera_position: Point3::new(0.0, 1.0, 5.0),
            ambient_intensity: 0.6,
            directional_intensity: 0.8,
            post_load: Some(PostLoadTransform::Spin {
                axis: Axis::Y,
                radians_per_frame: 0.01,
            }),
            ..Self::textured()
        }
    }

    pub fn preset(name: &str) -> anyhow::Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "" | "basic" => Ok(Self::basic()),
            "textured" => Ok(Self::textured()),
            "spinning" => Ok(Self::spinning()),
            other => bail!(
                "unknown viewer preset {other:?}, expected one of: basic, textured, spinning"
            ),
        }
    }

    /// Reads the preset name from [`PRESET_ENV`], falling back to [`ViewerConfig::basic`].
    pub fn from_env() -> anyhow::Result<Self> {
        match std::env::var(PRESET_ENV) {
            Ok(name) => Self::preset(&name),
            Err(std::env::VarError::NotPresent) => Ok(Self::basic()),
            Err(e) => bail!("{PRESET_ENV} is not valid unicode: {e}"),
        }
    }

    pub fn with_model(mut self, model_path: impl Into<String>) -> Self {
        self.model_path = model_path.into();
        self
    }

    pub fn with_material(mut self, material_path: impl Into<String>) -> Self {
        self.material_path = Some(material_path.into());
        self
    }

    pub fn without_material(mut self) -> Self {
        self.material_path = None;
        self
    }

    pub fn with_camera(mut self, position: Point3<f32>, target: Point3<f32>) -> Self {
        self.camera_position = position;
        self.camera_target = target;
        self
    }

    pub fn with_lights(mut self, ambient: f32, directional: f32) -> Self {
        self.ambient_intensity = ambient;
        self.directional_intensity = directional;
        self
    }

    pub fn with_post_load(mut self, transform: PostLoadTransform) -> Self {
        self.post_load = Some(transform);
        self
    }

    pub fn with_distance_limits(mut self, min: Option<f32>, max: Option<f32>) -> Self {
        self.min_distance = min;
        self.max_distance = max;
        self
    }

    pub fn with_asset_root(mut self, root: impl Into<String>) -> Self {
        self.asset_root = root.into();
        self
    }

    pub fn with_antialias(mut self, antialias: bool) -> Self {
        self.antialias = antialias;
        self
    }

    pub fn sample_count(&self) -> u32 {
        if self.antialias { 4 } else { 1 }
    }
}
