use eink_frame::{
    DitherMode, FitMode, PaletteError, ParseColorError, Quantizer, Rotation, Srgb,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use super::PanelSpec;

/// Application configuration loaded from `CONFIG_FILE` (YAML)
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// How uploads are turned into frames
    pub render: RenderConfig,

    /// Upload limits and preview output
    pub upload: UploadConfig,

    /// Panel calibration
    pub panel: PanelConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    pub mode: ResizeMode,

    /// Clockwise quarter turns for a rotated mount: 0, 90, 180 or 270
    pub rotate: u16,

    pub dither: DitherSetting,

    /// Alternate the scan direction per row
    pub serpentine: bool,

    pub contrast: f32,

    pub saturation: f32,

    /// Letterbox color in fit mode
    pub background: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            mode: ResizeMode::Fit,
            rotate: 0,
            dither: DitherSetting::FloydSteinberg,
            serpentine: false,
            contrast: 1.5,
            saturation: 1.5,
            background: "#FFFFFF".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ResizeMode {
    /// Letterbox the whole photo
    #[default]
    Fit,
    /// Crop the photo to cover the panel
    Fill,
}

impl From<ResizeMode> for FitMode {
    fn from(mode: ResizeMode) -> Self {
        match mode {
            ResizeMode::Fit => FitMode::Fit,
            ResizeMode::Fill => FitMode::Fill,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DitherSetting {
    #[default]
    FloydSteinberg,
    Atkinson,
    None,
}

impl From<DitherSetting> for DitherMode {
    fn from(setting: DitherSetting) -> Self {
        match setting {
            DitherSetting::FloydSteinberg => DitherMode::FloydSteinberg,
            DitherSetting::Atkinson => DitherMode::Atkinson,
            DitherSetting::None => DitherMode::None,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct UploadConfig {
    /// Largest accepted request body
    pub max_bytes: usize,

    /// How long a request may wait for the panel
    pub queue_timeout_secs: u64,

    /// Where preview PNGs go; `null` disables them
    pub preview_dir: Option<PathBuf>,

    /// Most recent previews kept on disk; 0 keeps all
    pub preview_keep: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: 30 * 1024 * 1024,
            queue_timeout_secs: 120,
            preview_dir: Some(PathBuf::from("processed")),
            preview_keep: 20,
        }
    }
}

impl UploadConfig {
    pub fn queue_timeout(&self) -> Duration {
        Duration::from_secs(self.queue_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct PanelConfig {
    /// Measured panel colors in device code order
    pub colors_actual: Option<Vec<String>>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("rotate must be 0, 90, 180 or 270, got {0}")]
    Rotation(u16),

    #[error("invalid background color: {0}")]
    Background(#[from] ParseColorError),

    #[error("invalid panel colors: {0}")]
    Palette(#[from] PaletteError),
}

impl AppConfig {
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.build_quantizer(&PanelSpec::ACEP_7IN3F)?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Load configuration, falling back to defaults when the file is missing
    /// or invalid
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            tracing::debug!("No config file given, using defaults");
            return Self::default();
        };

        match Self::from_file(path) {
            Ok(config) => {
                tracing::info!(
                    path = %path.display(),
                    mode = ?config.render.mode,
                    rotate = config.render.rotate,
                    dither = ?config.render.dither,
                    "Loaded configuration"
                );
                config
            }
            Err(e) => {
                tracing::warn!(%e, path = %path.display(), "Failed to load config, using defaults");
                Self::default()
            }
        }
    }

    /// Quantizer for `spec` with the configured render settings
    pub fn build_quantizer(&self, spec: &PanelSpec) -> Result<Quantizer, ConfigError> {
        let render = &self.render;
        let rotation =
            Rotation::from_degrees(render.rotate).ok_or(ConfigError::Rotation(render.rotate))?;
        let background: Srgb = render.background.parse()?;

        let mut palette = spec.palette();
        if let Some(actual) = &self.panel.colors_actual {
            let actual = actual
                .iter()
                .map(|hex| hex.parse::<Srgb>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(PaletteError::from)?;
            palette = palette.with_actual(&actual)?;
        }

        Ok(Quantizer::new(palette)
            .fit_mode(render.mode.into())
            .rotation(rotation)
            .background(background.to_bytes())
            .contrast(render.contrast)
            .saturation(render.saturation)
            .dither_mode(render.dither.into())
            .serpentine(render.serpentine))
    }
}
