//! quillstore-admin: operational CLI for the attachment store.
//!
//! Talks to the same endpoints the sync server uses, with the same
//! configuration file. Handy for support work: issuing one-off
//! download URLs, probing attachment sizes, and cleaning up after
//! account deletions.

use clap::{Parser, Subcommand};
use quillstore::{load_config, AttachmentStore, CompleteUpload, S3AttachmentStore};
use std::io::Read;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "quillstore-admin",
    version,
    about = "Administrative CLI for the quillstore attachment store"
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, default_value = "quillstore.yaml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a presigned download URL for an attachment.
    DownloadUrl {
        #[arg(long)]
        user: String,
        #[arg(long)]
        name: String,
    },
    /// Print a presigned upload URL for an attachment.
    UploadUrl {
        #[arg(long)]
        user: String,
        #[arg(long)]
        name: String,
    },
    /// Probe the stored size of an attachment in bytes.
    Size {
        #[arg(long)]
        user: String,
        #[arg(long)]
        name: String,
    },
    /// Delete a single attachment.
    Delete {
        #[arg(long)]
        user: String,
        #[arg(long)]
        name: String,
    },
    /// Delete every attachment belonging to a user.
    Purge {
        #[arg(long)]
        user: String,
    },
    /// Manage multipart upload sessions.
    #[command(subcommand)]
    Multipart(MultipartCommands),
}

#[derive(Subcommand)]
enum MultipartCommands {
    /// Start or resume a session; prints session metadata as JSON.
    Start {
        #[arg(long)]
        user: String,
        #[arg(long)]
        name: String,
        /// Number of part URLs to presign.
        #[arg(long)]
        parts: u32,
        /// Resume an existing session instead of initiating a new one.
        #[arg(long)]
        upload_id: Option<String>,
    },
    /// Abort a session.
    Abort {
        #[arg(long)]
        user: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        upload_id: String,
    },
    /// Complete a session from a JSON manifest ("-" reads stdin).
    Complete {
        #[arg(long)]
        user: String,
        /// Path to the manifest file.
        #[arg(long, default_value = "-")]
        manifest: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    if config.logging.format == "json" {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let store = S3AttachmentStore::new(&config.storage, config.deployment.self_hosted).await?;

    match cli.command {
        Commands::DownloadUrl { user, name } => match store.download_url(&user, &name).await? {
            Some(url) => println!("{url}"),
            None => anyhow::bail!("invalid object name"),
        },
        Commands::UploadUrl { user, name } => match store.upload_url(&user, &name).await? {
            Some(url) => println!("{url}"),
            None => anyhow::bail!("invalid object name"),
        },
        Commands::Size { user, name } => {
            let size = store.object_size(&user, &name).await?;
            println!("{size}");
        }
        Commands::Delete { user, name } => {
            store.delete_object(&user, &name).await?;
            println!("deleted {user}/{name}");
        }
        Commands::Purge { user } => {
            store.delete_directory(&user).await?;
            println!("purged attachments for {user}");
        }
        Commands::Multipart(command) => match command {
            MultipartCommands::Start {
                user,
                name,
                parts,
                upload_id,
            } => {
                let meta = store
                    .start_multipart_upload(&user, &name, parts, upload_id.as_deref())
                    .await?;
                println!("{}", serde_json::to_string_pretty(&meta)?);
            }
            MultipartCommands::Abort {
                user,
                name,
                upload_id,
            } => {
                store.abort_multipart_upload(&user, &name, &upload_id).await?;
                println!("aborted {upload_id}");
            }
            MultipartCommands::Complete { user, manifest } => {
                let raw = if manifest == "-" {
                    let mut buffer = String::new();
                    std::io::stdin().read_to_string(&mut buffer)?;
                    buffer
                } else {
                    std::fs::read_to_string(&manifest)?
                };
                let request: CompleteUpload = serde_json::from_str(&raw)?;
                store.complete_multipart_upload(&user, request).await?;
                println!("completed upload");
            }
        },
    }

    Ok(())
}
