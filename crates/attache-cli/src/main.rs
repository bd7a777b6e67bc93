//! Attache CLI: inspect and manage attachment storage from the shell.
//!
//! Reads the same environment as the hosting service (SITE_URL,
//! PUBLIC_FILES_PATH, PRIVATE_FILES_PATH, OBJECT_STORE_BACKEND, S3_*).

use anyhow::Context;
use attache_cli::{init_tracing, reference_record};
use attache_core::{FileContent, FileRecord, NoOpAttachmentHost, StorageConfig};
use attache_services::{create_controller, TrackedFile};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::Write;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "attache", about = "Attachment storage CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show which backend and key a reference resolves to
    Resolve {
        /// File URL or bare file name
        reference: String,
        #[arg(long)]
        private: bool,
        /// Treat the reference as an external URL
        #[arg(long)]
        remote: bool,
    },
    /// Write a file's content to stdout
    Cat {
        /// File URL or bare file name
        reference: String,
        #[arg(long)]
        private: bool,
    },
    /// Print a URL the file can be downloaded from
    Url {
        /// File URL or bare file name
        reference: String,
        #[arg(long)]
        private: bool,
    },
    /// Store a local file as a new attachment
    Put {
        /// Path to the file to store
        file: std::path::PathBuf,
        /// File name to store under (defaults to the path's file name)
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        private: bool,
        /// Owning record, as DOCTYPE NAME
        #[arg(long, num_args = 2, value_names = ["DOCTYPE", "NAME"])]
        attach: Option<Vec<String>>,
    },
    /// Delete a file's stored content
    Rm {
        /// File URL or bare file name
        reference: String,
        #[arg(long)]
        private: bool,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = StorageConfig::from_env().context("Failed to load storage configuration")?;
    let controller = create_controller(&config, Arc::new(NoOpAttachmentHost))
        .await
        .context("Failed to set up storage")?;
    let dispatcher = controller.dispatcher();

    let cli = Cli::parse();

    match cli.command {
        Commands::Resolve {
            reference,
            private,
            remote,
        } => {
            let record = reference_record(&reference, private, remote);
            let location = dispatcher.resolve(&record)?;
            print_json(&location)?;
        }
        Commands::Cat { reference, private } => {
            let record = reference_record(&reference, private, false);
            let mut stdout = std::io::stdout().lock();
            match dispatcher.read_content(&record).await? {
                FileContent::Text(text) => stdout.write_all(text.as_bytes())?,
                FileContent::Binary(bytes) => stdout.write_all(&bytes)?,
            }
            stdout.flush()?;
        }
        Commands::Url { reference, private } => {
            let record = reference_record(&reference, private, false);
            println!("{}", dispatcher.retrieval_url(&record).await?);
        }
        Commands::Put {
            file,
            name,
            private,
            attach,
        } => {
            let data = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let file_name = match name {
                Some(name) => name,
                None => file
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .context("Path has no file name; pass --name")?,
            };

            let mut record = FileRecord::new(file_name)
                .with_content(bytes::Bytes::from(data))
                .private(private);
            if let Some([doctype, docname]) = attach.as_deref() {
                record = record.attached_to(doctype.as_str(), docname.as_str());
            }

            let mut tracked = TrackedFile::new(record);
            controller.before_insert(&mut tracked).await?;
            controller.mark_persisted(&mut tracked).await?;
            print_json(&tracked.record)?;
        }
        Commands::Rm { reference, private } => {
            let record = reference_record(&reference, private, false);
            dispatcher.delete_backend_object(&record).await?;
            tracing::info!(reference = %reference, "Deleted");
        }
    }

    Ok(())
}
