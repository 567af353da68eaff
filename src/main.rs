//! Headless annosync driver.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use annosync::config::AppConfig;
use annosync::model::FolderName;
use annosync::table::Column;
use annosync::{HttpGateway, ImageFrame, SyncEngine};

#[derive(Parser)]
#[command(name = "annosync")]
#[command(version, about = "Inspect annotation folders on an annotation server")]
struct Cli {
    /// Server address; overrides the configuration file
    #[arg(long, global = true)]
    server: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List folders known to the server
    Folders,
    /// List available icon templates
    Icons,
    /// Load a folder and print its table
    Show {
        folder: String,
        /// Sort by a column (id, type, color, description, notes); repeat to toggle
        #[arg(long)]
        sort: Vec<String>,
        /// Only show rows whose description contains this text
        #[arg(long)]
        filter: Option<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load_from_default_path().unwrap_or_default();

    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        config.log_level.to_level_filter()
    };
    env_logger::Builder::new().filter_level(level).init();

    let server = cli.server.unwrap_or_else(|| config.server_url.clone());
    let gateway = HttpGateway::new(server).context("Failed to create HTTP client")?;
    let engine = SyncEngine::new(gateway, config.engine_settings());

    match cli.command {
        Commands::Folders => {
            for folder in engine.list_folders().await? {
                println!("{}", folder);
            }
        }
        Commands::Icons => {
            for icon in engine.refresh_icon_options().await? {
                println!("{}", icon);
            }
        }
        Commands::Show {
            folder,
            sort,
            filter,
        } => show(&engine, &folder, &sort, filter.as_deref()).await?,
    }

    for warning in engine.take_warnings() {
        eprintln!("warning: {}", warning.message);
    }
    Ok(())
}

async fn show(
    engine: &SyncEngine<HttpGateway>,
    folder: &str,
    sort: &[String],
    filter: Option<&str>,
) -> Result<()> {
    let folder = FolderName::parse(folder)?;
    let columns = sort
        .iter()
        .map(|s| s.parse::<Column>())
        .collect::<Result<Vec<_>, _>>()?;

    let url = engine.image_url(&folder).await?;
    let bytes = engine
        .gateway()
        .fetch_bytes(&url)
        .await
        .with_context(|| format!("Failed to download base image {}", url))?;
    let frame = ImageFrame::from_image_bytes(url, &bytes)?;

    if let Err(e) = engine.refresh_icon_options().await {
        log::warn!("Continuing without icon list: {}", e);
    }
    engine
        .switch_folder(folder.clone(), frame)
        .await
        .with_context(|| format!("Failed to load folder {}", folder))?;

    for column in columns {
        engine.sort_by(column);
    }
    if let Some(text) = filter {
        engine.set_filter(text);
    }

    let table = engine.table();
    println!(
        "{:<10} {:<12} {:<8} {:<30} {}",
        "ID", "TYPE", "COLOR", "DESCRIPTION", "NOTES"
    );
    for row in table.visible_rows() {
        println!(
            "{:<10} {:<12} {:<8} {:<30} {}",
            row.short_id,
            row.type_label,
            row.color.to_hex(),
            row.description,
            row.notes.lines().next().unwrap_or("")
        );
    }
    Ok(())
}
