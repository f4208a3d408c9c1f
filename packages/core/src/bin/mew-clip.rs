//! Mew Clipper Command Line
//!
//! Drives the clipper flows from a terminal: the same actions the browser
//! extension triggers from its context menu.
//!
//! # Usage
//!
//! ```bash
//! # One-time setup with the URL of your Mew user root node
//! mew-clip setup "https://mew-edge.ideaflow.app/g/all/global-root-to-users/all/users-to-user-relation-id-.../user-root-id-..."
//!
//! # Save a selection, a page, or a transcript
//! mew-clip selection --title "Example" --url https://example.com "quoted text"
//! mew-clip page --title "Example" --url https://example.com
//! mew-clip transcript --title "Talk" --url https://youtube.com/watch?v=x --file transcript.txt
//!
//! # Print the transactions instead of sending them
//! mew-clip --dry-run page --title "Example" --url https://example.com
//! ```
//!
//! # Environment Variables
//!
//! - `MEW_CLIENT_ID` / `MEW_CLIENT_SECRET`: client credentials (required)
//! - `MEW_API_BASE_URL`, `MEW_NODE_BASE_URL`, `MEW_AUTH_DOMAIN`,
//!   `MEW_AUDIENCE`, `MEW_REQUEST_TIMEOUT_SECS`: connection overrides
//! - `RUST_LOG`: Logging level (e.g., "info", "debug", "trace")

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use mew_clipper_core::config::MewConfig;
use mew_clipper_core::ids::SystemIdGenerator;
use mew_clipper_core::models::{ContentBlock, GraphNode};
use mew_clipper_core::services::{
    ClipReceipt, ClipperService, JsonFileKeyValueStore, KeyValueStore, MemoryKeyValueStore,
    PageInfo, FAILURE_MESSAGE, SAVING_MESSAGE, USER_NODE_ID_KEY, USER_ROOT_URL_KEY,
};
use mew_clipper_core::transport::{GraphStore, HttpGraphStore, InMemoryGraphStore};

#[derive(Parser)]
#[command(
    name = "mew-clip",
    version,
    about = "Save web selections, pages and transcripts to Mew"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true, help = "Configuration file path")]
    config: Option<PathBuf>,

    #[arg(long, global = true, help = "State file path (setup and article cache)")]
    state: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        help = "Apply to an in-memory graph and print the transactions instead of sending them"
    )]
    dry_run: bool,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Store the URL of your Mew user root node")]
    Setup {
        #[arg(help = "User root node URL")]
        root_url: String,
    },

    #[command(about = "Save selected text under the page's article node")]
    Selection {
        #[command(flatten)]
        page: PageArgs,

        #[arg(help = "Selected text ('-' reads stdin)")]
        text: String,
    },

    #[command(about = "Save a page")]
    Page {
        #[command(flatten)]
        page: PageArgs,
    },

    #[command(about = "Save a page with its transcript")]
    Transcript {
        #[command(flatten)]
        page: PageArgs,

        #[arg(long, help = "Transcript file (stdin when omitted)")]
        file: Option<PathBuf>,
    },

    #[command(about = "Show setup and the size of the visible graph")]
    Status,

    #[command(about = "Forget setup and cached article nodes")]
    Clear,
}

#[derive(clap::Args)]
struct PageArgs {
    #[arg(long, help = "Page title")]
    title: String,

    #[arg(long, help = "Page URL")]
    url: String,
}

impl PageArgs {
    fn to_page(&self) -> PageInfo {
        PageInfo::new(self.title.clone(), self.url.clone())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            let mut config = MewConfig::load_file(path).await?;
            config.apply_env();
            config
        }
        None => MewConfig::load().await?,
    };
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    let file_state = match &cli.state {
        Some(path) => JsonFileKeyValueStore::new(path),
        None => JsonFileKeyValueStore::default_location()?,
    };
    let state: Arc<dyn KeyValueStore> = if cli.dry_run {
        // Setup is read from disk but nothing is written back
        let scratch = MemoryKeyValueStore::new();
        for key in [USER_ROOT_URL_KEY, USER_NODE_ID_KEY] {
            if let Some(value) = file_state.get(key).await? {
                scratch.set(key, value).await?;
            }
        }
        Arc::new(scratch)
    } else {
        Arc::new(file_state)
    };

    let memory = Arc::new(InMemoryGraphStore::new());
    let store: Arc<dyn GraphStore> = if cli.dry_run {
        memory.clone()
    } else {
        if !config.has_credentials() {
            tracing::warn!("MEW_CLIENT_ID / MEW_CLIENT_SECRET are not set; requests will be rejected");
        }
        Arc::new(HttpGraphStore::new(&config).context("Failed to create Mew client")?)
    };

    let clipper = ClipperService::new(
        &config,
        store.clone(),
        state,
        Arc::new(SystemIdGenerator::new()),
    )?;

    if cli.dry_run {
        if let Ok(setup) = clipper.setup().await {
            // The real root lives on the server; stand in for it locally
            memory.insert_node(GraphNode::new(
                setup.user_node_id.clone(),
                setup.user_node_id,
                0,
                vec![ContentBlock::text("User root")],
            ));
        }
    }

    let result = run(&cli.command, &clipper, store.as_ref()).await;

    if cli.dry_run {
        for transaction in memory.transactions() {
            println!("{}", serde_json::to_string_pretty(&transaction)?);
        }
    }

    match result {
        Ok(()) => Ok(()),
        Err(e) => {
            eprintln!("{}", FAILURE_MESSAGE);
            Err(e)
        }
    }
}

async fn run(command: &Commands, clipper: &ClipperService, store: &dyn GraphStore) -> Result<()> {
    match command {
        Commands::Setup { root_url } => {
            let user_node_id = clipper
                .configure(root_url)
                .await
                .context("Please enter a valid Mew user node URL")?;
            println!("Setup complete. User node id: {}", user_node_id);
        }

        Commands::Selection { page, text } => {
            let text = if text == "-" {
                read_stdin()?
            } else {
                text.clone()
            };
            eprintln!("{}", SAVING_MESSAGE);
            let receipt = clipper.save_selection(&page.to_page(), &text).await?;
            report(clipper, &receipt);
        }

        Commands::Page { page } => {
            eprintln!("{}", SAVING_MESSAGE);
            let receipt = clipper.save_page(&page.to_page()).await?;
            report(clipper, &receipt);
        }

        Commands::Transcript { page, file } => {
            let transcript = match file {
                Some(path) => tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("Failed to read transcript {:?}", path))?,
                None => read_stdin()?,
            };
            eprintln!("{}", SAVING_MESSAGE);
            let receipt = clipper.save_transcript(&page.to_page(), &transcript).await?;
            report(clipper, &receipt);
        }

        Commands::Status => {
            let setup = clipper.setup().await?;
            println!("User root URL: {}", setup.user_root_url);
            println!("User node id:  {}", setup.user_node_id);

            let snapshot = store.fetch_sync_snapshot().await?;
            println!(
                "Visible graph: {} node(s), {} relation(s), {} user(s)",
                snapshot.nodes_by_id.len(),
                snapshot.relations_by_id.len(),
                snapshot.users_by_id.len()
            );
        }

        Commands::Clear => {
            clipper.clear_state().await?;
            println!("Cleared clipper state");
        }
    }
    Ok(())
}

fn report(clipper: &ClipperService, receipt: &ClipReceipt) {
    println!("{}", receipt.notification());
    println!("Article: {}", clipper.resolver().node_url(&receipt.article_id));
    if let Some(clip_id) = &receipt.clip_id {
        println!("Clip:    {}", clipper.resolver().node_url(clip_id));
    }
}

fn read_stdin() -> Result<String> {
    let mut buffer = String::new();
    std::io::stdin()
        .read_to_string(&mut buffer)
        .context("Failed to read stdin")?;
    Ok(buffer)
}
