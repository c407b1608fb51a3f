use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub viewport: ViewportConfig,
    #[serde(default)]
    pub projection: ProjectionConfig,
    #[serde(default)]
    pub zoom: ZoomConfig,
    pub output: OutputConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    pub world_topology: String, // URL or local path
    pub meteorites: String,     // URL or local path, GeoJSON or CSV
    #[serde(default = "default_countries_object")]
    pub countries_object: String,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct ViewportConfig {
    pub width: f64,
    pub height: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: 960.0,
            height: 600.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct ProjectionConfig {
    pub scale: f64,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self { scale: 200.0 }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct ZoomConfig {
    pub min_scale: f64,
    pub max_scale: f64,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            min_scale: 1.0,
            max_scale: 7.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

fn default_countries_object() -> String {
    "countries".to_string()
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let ViewportConfig { width, height } = self.viewport;
        if !(width > 0.0 && height > 0.0) {
            bail!("Viewport must have positive size, got {}x{}", width, height);
        }
        let ZoomConfig {
            min_scale,
            max_scale,
        } = self.zoom;
        if !(min_scale > 0.0 && min_scale <= max_scale) {
            bail!("Invalid zoom extent [{}, {}]", min_scale, max_scale);
        }
        if !(self.projection.scale > 0.0) {
            bail!("Projection scale must be positive");
        }
        Ok(())
    }
}
