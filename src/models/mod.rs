pub mod config;
pub mod panel_spec;

pub use config::{AppConfig, ConfigError, DitherSetting, PanelConfig, RenderConfig, ResizeMode, UploadConfig};
pub use panel_spec::PanelSpec;
