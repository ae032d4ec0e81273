use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use artmode::{ArtModeError, ClientConfig, Session, WsTransport};
use clap::{ArgAction, Parser, Subcommand};
use serde_json::Value;
use time::{OffsetDateTime, UtcOffset};
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    ArtMode(#[from] ArtModeError),
    #[error("failed to read {path}: {source}")]
    ReadFile { path: PathBuf, source: io::Error },
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Connection flags override `ARTMODE_PORT`, `ARTMODE_APP_NAME` and
/// `ARTMODE_RECV_TIMEOUT_SECS`.
#[derive(Parser, Debug)]
#[command(name = "artmode-cli", about = "List, upload and delete art mode pictures on a Frame TV")]
struct Cli {
    /// TV host name or IP address.
    server: String,

    #[arg(long, help = "Channel port [env: ARTMODE_PORT, default: 8001]")]
    port: Option<u16>,

    #[arg(long, help = "Client name sent to the TV [env: ARTMODE_APP_NAME]")]
    name: Option<String>,

    #[arg(long, help = "Per-response deadline in seconds; 0 waits forever [env: ARTMODE_RECV_TIMEOUT_SECS]")]
    timeout: Option<u64>,

    #[arg(short, long, action = ArgAction::Count, help = "Increase log verbosity (-v info, -vv debug)")]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::from_env(self.server.clone());
        if let Some(port) = self.port {
            config = config.with_port(port);
        }
        if let Some(name) = &self.name {
            config = config.with_app_name(name.clone());
        }
        if let Some(secs) = self.timeout {
            config = config.with_recv_timeout((secs > 0).then(|| Duration::from_secs(secs)));
        }
        config
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print stored artwork.
    List,
    /// Upload a JPEG or PNG image.
    Upload { file: PathBuf },
    /// Delete artwork by content id.
    Delete {
        #[arg(required = true)]
        content_id: Vec<String>,
    },
}

/// A command with its local inputs already loaded.
#[derive(Debug)]
enum Job {
    List,
    Upload(Upload),
    Delete(Vec<String>),
}

#[derive(Debug)]
struct Upload {
    image: Vec<u8>,
    extension: String,
    created_at: OffsetDateTime,
}

impl Upload {
    fn load(path: &Path) -> Result<Self, CliError> {
        let metadata = std::fs::metadata(path).map_err(|source| read_error(path, source))?;
        let image = std::fs::read(path).map_err(|source| read_error(path, source))?;
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_owned();
        Ok(Self {
            image,
            extension,
            created_at: file_created_at(&metadata),
        })
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.client_config();
    let job = prepare(cli.command)?;

    let mut session = Session::open(&config).await?;
    let result = run(&mut session, job).await;
    if let Err(error) = session.close().await {
        tracing::warn!(%error, "failed to close art-app channel");
    }
    result
}

/// Load everything the command needs from disk before the TV is contacted.
fn prepare(command: Command) -> Result<Job, CliError> {
    Ok(match command {
        Command::List => Job::List,
        Command::Upload { file } => Job::Upload(Upload::load(&file)?),
        Command::Delete { content_id } => Job::Delete(content_id),
    })
}

async fn run(session: &mut Session<WsTransport>, job: Job) -> Result<(), CliError> {
    match job {
        Job::List => {
            let items = session.list_content().await?;
            print_json(&serde_json::to_value(items)?)
        }
        Job::Upload(upload) => {
            let confirmation = session
                .upload_image(&upload.image, &upload.extension, upload.created_at)
                .await?;
            print_json(&confirmation)
        }
        Job::Delete(content_ids) => {
            let response = session.delete_images(&content_ids).await?;
            print_json(&response)
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn read_error(path: &Path, source: io::Error) -> CliError {
    CliError::ReadFile {
        path: path.to_path_buf(),
        source,
    }
}

/// File creation time in local time, or UTC when the offset is unknown.
fn file_created_at(metadata: &std::fs::Metadata) -> OffsetDateTime {
    let created = metadata
        .created()
        .or_else(|_| metadata.modified())
        .unwrap_or_else(|_| SystemTime::now());
    let at = OffsetDateTime::from(created);
    match UtcOffset::current_local_offset() {
        Ok(offset) => at.to_offset(offset),
        Err(_) => at,
    }
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
