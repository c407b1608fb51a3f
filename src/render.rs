use crate::config::AppConfig;
use crate::interaction::ViewTransform;
use crate::scene::Scene;
use crate::svg::{render_page, render_svg};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const PAGE_TITLE: &str = "Meteorite strikes";

/// Files produced by a render, in the configured output directory.
#[derive(Debug, Clone)]
pub struct RenderedFiles {
    pub svg: PathBuf,
    pub page: PathBuf,
    pub scene: PathBuf,
}

pub fn write_outputs(config: &AppConfig, scene: &Scene) -> Result<RenderedFiles> {
    write_to_dir(&config.output.dir, scene)
}

pub fn write_to_dir(dir: &Path, scene: &Scene) -> Result<RenderedFiles> {
    info!("Writing map to {:?}...", dir);
    fs::create_dir_all(dir).with_context(|| format!("Failed to create output directory: {:?}", dir))?;

    let files = RenderedFiles {
        svg: dir.join("map.svg"),
        page: dir.join("index.html"),
        scene: dir.join("scene.json"),
    };

    fs::write(&files.svg, render_svg(scene, ViewTransform::IDENTITY))
        .with_context(|| format!("Failed to write {:?}", files.svg))?;
    fs::write(&files.page, render_page(scene, PAGE_TITLE))
        .with_context(|| format!("Failed to write {:?}", files.page))?;

    let json = serde_json::to_vec_pretty(scene).context("Failed to serialise scene")?;
    fs::write(&files.scene, json).with_context(|| format!("Failed to write {:?}", files.scene))?;

    Ok(files)
}
