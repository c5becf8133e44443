use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use common::cli::utils::{
    handle_common_command, init_logging, load_config, validate_config, version_info,
};
use common::cli::{CommonArgs, CommonCommands};
use common::config::{CONFIG, Configuration};
use common::storage::BucketStores;
use janitor::{
    Notification, NotificationHandler, ObjectReference, ObjectStorePlaylists, Response,
    SystemClock,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncReadExt;

#[derive(Parser, Debug)]
#[command(author, version, about = "Deletes live HLS playlists that stopped updating", long_about = None)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check the playlist named by an object-created notification (default)
    Run {
        #[arg(long, help = "Notification JSON file, read from stdin when omitted")]
        event: Option<PathBuf>,
    },
    /// Check a playlist by bucket and key
    Check {
        #[arg(long)]
        bucket: String,
        #[arg(long, help = "Object key, used verbatim")]
        key: String,
    },
    #[command(flatten)]
    Common(CommonCommands),
}

async fn read_notification(path: Option<&Path>) -> Result<Notification> {
    let data = match path {
        Some(path) => tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read notification from {}", path.display()))?,
        None => {
            let mut data = Vec::new();
            tokio::io::stdin()
                .read_to_end(&mut data)
                .await
                .context("Failed to read notification from stdin")?;
            data
        }
    };

    Notification::from_slice(&data).context("Failed to parse notification")
}

/// Validate and publish the configuration, then wire the handler.
fn build_handler(config: Configuration) -> Result<NotificationHandler> {
    validate_config(&config)?;
    let config = CONFIG.get_or_init(|| config);

    let stores = BucketStores::from_config(&config.storage)
        .context("Failed to initialize object storage")?;
    log::debug!("Using storage backend {:?}", stores.backend());

    Ok(NotificationHandler::new(
        Arc::new(ObjectStorePlaylists::new(Arc::new(stores))),
        Arc::new(SystemClock),
        config.staleness.clone(),
    ))
}

fn print_response(response: &Response) -> Result<()> {
    let json = serde_json::to_string(response).context("Failed to serialize response")?;
    println!("{json}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.common);

    let config = load_config(cli.common.config.as_ref())?;

    let response = match cli.command.unwrap_or(Command::Run { event: None }) {
        Command::Common(command) => {
            let version = version_info(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
            return handle_common_command(&command, &config, &version);
        }
        Command::Run { event } => {
            let notification = read_notification(event.as_deref()).await?;
            build_handler(config)?
                .handle_notification(&notification)
                .await?
        }
        Command::Check { bucket, key } => {
            build_handler(config)?
                .handle_reference(&ObjectReference::new(bucket, key))
                .await?
        }
    };

    print_response(&response)
}
