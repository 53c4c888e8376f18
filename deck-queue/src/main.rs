//! deck-queue - Manage queued content
//!
//! Adds, lists and removes the content items deck-publish works from.

use clap::{Parser, Subcommand};
use libpostdeck::config::resolve_store_path;
use libpostdeck::error::ConfigError;
use libpostdeck::logging::LoggingConfig;
use libpostdeck::{Config, ContentItem, ContentStore, Destination, MediaRef, PostdeckError, Result};
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "deck-queue")]
#[command(version)]
#[command(about = "Manage queued content items")]
#[command(long_about = "\
deck-queue - Manage queued content items

DESCRIPTION:
    deck-queue edits the content store that deck-publish reads. Each item
    has a title, a caption, an optional media reference (URL or storage
    path) and a destination.

USAGE EXAMPLES:
    # Queue an image for Instagram
    deck-queue add --title \"Launch\" --caption \"We are live\" \\
        --media https://cdn.example.com/launch.jpg

    # List everything queued for Twitter as JSON
    deck-queue list --destination twitter --format json

    # Remove an item
    deck-queue remove <ITEM_ID>

CONFIGURATION:
    Configuration file: ~/.config/postdeck/config.toml
    Store location: ~/.local/share/postdeck/queue.db

    Override with environment variables:
        POSTDECK_CONFIG    - Path to config file
        POSTDECK_DB_PATH   - Path to the content store

EXIT CODES:
    0 - Success
    1 - Operation failed
    2 - Store or configuration error
    3 - Invalid input (unknown item, bad destination, etc.)
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Queue a new content item
    Add {
        #[arg(long)]
        title: String,

        #[arg(long, default_value = "")]
        caption: String,

        /// Media URL or storage path
        #[arg(long)]
        media: Option<String>,

        /// Destination (defaults to the configured one)
        #[arg(short, long)]
        destination: Option<String>,
    },

    /// List queued items in queue order
    List {
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Only items for this destination
        #[arg(short, long)]
        destination: Option<String>,
    },

    /// Remove a queued item
    Remove {
        item_id: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    LoggingConfig::from_env(cli.verbose).init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let store_path = resolve_store_path(Some(&config.store.path))?;
    let store_path = store_path.to_str().ok_or_else(|| {
        PostdeckError::Config(ConfigError::InvalidValue {
            field: "store.path".to_string(),
            reason: "path is not valid UTF-8".to_string(),
        })
    })?;
    let store = ContentStore::new(store_path).await?;

    match cli.command {
        Commands::Add {
            title,
            caption,
            media,
            destination,
        } => {
            let destination = match destination {
                Some(d) => parse_destination(&d)?,
                None => config.defaults.destination,
            };
            cmd_add(&store, title, caption, media, destination).await?;
        }
        Commands::List {
            format,
            destination,
        } => {
            let destination = destination.as_deref().map(parse_destination).transpose()?;
            cmd_list(&store, &format, destination).await?;
        }
        Commands::Remove { item_id } => {
            cmd_remove(&store, &item_id).await?;
        }
    }

    Ok(())
}

fn parse_destination(value: &str) -> Result<Destination> {
    value.parse().map_err(PostdeckError::InvalidInput)
}

async fn cmd_add(
    store: &ContentStore,
    title: String,
    caption: String,
    media: Option<String>,
    destination: Destination,
) -> Result<()> {
    if title.trim().is_empty() {
        return Err(PostdeckError::InvalidInput("Title cannot be empty".to_string()));
    }

    let media = media.filter(|m| !m.trim().is_empty()).map(MediaRef::new);
    if media.is_none() {
        eprintln!("Warning: item has no media and will not be published");
    }

    let item = ContentItem::new(title, caption, media, destination);
    store.add_item(&item).await?;
    debug!(item = %item.id, %destination, "item queued");

    println!("{}", item.id);
    Ok(())
}

async fn cmd_list(store: &ContentStore, format: &str, destination: Option<Destination>) -> Result<()> {
    if format != "text" && format != "json" {
        return Err(PostdeckError::InvalidInput(format!(
            "Invalid format '{}'. Must be 'text' or 'json'",
            format
        )));
    }

    let items = store.list_items(destination).await?;

    if format == "json" {
        let json = serde_json::to_string_pretty(&items)
            .map_err(|e| PostdeckError::InvalidInput(format!("Failed to encode items: {}", e)))?;
        println!("{}", json);
    } else {
        for item in &items {
            println!(
                "{} | {} | {} | {}",
                item.id,
                item.destination,
                truncate(&item.title, 40),
                item.media.as_ref().map(|m| m.as_str()).unwrap_or("(no media)")
            );
        }
    }

    Ok(())
}

async fn cmd_remove(store: &ContentStore, item_id: &str) -> Result<()> {
    if !store.remove_item(item_id).await? {
        return Err(PostdeckError::InvalidInput(format!("No item with id {}", item_id)));
    }
    println!("Removed {}", item_id);
    Ok(())
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}...", head)
    }
}
