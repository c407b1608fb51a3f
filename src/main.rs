pub mod types;
pub mod config;
pub mod topology;
pub mod data;
pub mod scales;
pub mod projection;
pub mod scene;
pub mod interaction;
pub mod hit;
pub mod svg;
pub mod render;
pub mod server;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the meteorite map to SVG, HTML and JSON
    Render {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Serve the map with pan/zoom and hover
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Render { config } => {
            tracing::info!("Rendering map with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(config)?;

            // 1. Load both documents; nothing is drawn unless both arrived
            let map_data = data::load_data(&app_config).await?;

            // 2. Project and style
            let scene = scene::build_scene(&app_config, &map_data);

            // 3. Write files
            let files = render::write_outputs(&app_config, &scene)?;
            tracing::info!("Wrote {:?}, {:?} and {:?}", files.svg, files.page, files.scene);

            println!("Render complete! Open {}", files.page.display());
        }
        Commands::Serve { config } => {
            tracing::info!("Serving map with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(config)?;

            let map_data = data::load_data(&app_config).await?;
            let scene = scene::build_scene(&app_config, &map_data);

            server::start_server(app_config, scene).await?;
        }
    }

    Ok(())
}
