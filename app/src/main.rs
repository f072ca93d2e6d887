//! Main entry point for the photoshelf CLI.

use clap::{Parser, Subcommand};
use gallery::{aggregate_albums, group_by_day, LoadOutcome, PhotoPager};
use media::{FsMediaSource, MediaError, MediaSource};
use std::path::PathBuf;
use store::{FavoritesStore, SqliteKvStore};
use tracing_appender::rolling;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

mod config;

#[derive(Parser)]
#[command(
    name = "photoshelf",
    author,
    version,
    about = "Local photo library browser"
)]
struct Cli {
    /// Override log level (e.g. info, debug)
    #[arg(long)]
    log_level: Option<String>,
    /// Photo library root directory
    #[arg(long)]
    library: Option<PathBuf>,
    /// Directory holding the favorites database and logs
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Photos fetched per page
    #[arg(long)]
    page_size: Option<usize>,
    /// Path to config file
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List albums with their most recent photo as thumbnail
    Albums,
    /// Page through the photos of one album
    Photos {
        /// ID of the album to open
        #[arg(long)]
        album: String,
        /// Title shown above the listing
        #[arg(long)]
        title: Option<String>,
        /// Number of pages to load
        #[arg(long)]
        pages: Option<usize>,
    },
    /// Date-sectioned view of the whole library
    Timeline {
        /// Number of pages to load; everything when omitted
        #[arg(long)]
        pages: Option<usize>,
    },
    /// List favorite photos, most recently added first
    Favorites,
    /// Toggle a photo uri in the favorites set
    Favorite {
        /// Photo uri to toggle
        uri: String,
    },
    /// Show library location, album count and favorites count
    Status,
}

async fn load_pages<S: MediaSource>(
    pager: &PhotoPager<S>,
    pages: Option<usize>,
) -> Result<(), MediaError> {
    let mut remaining = pages.unwrap_or(usize::MAX);
    while remaining > 0 {
        match pager.load_more().await? {
            LoadOutcome::Loaded(_) => remaining -= 1,
            _ => break,
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let overrides = config::AppConfigOverrides {
        log_level: cli.log_level.clone(),
        library_path: cli.library.clone(),
        data_path: cli.data_dir.clone(),
        page_size: cli.page_size,
    };
    let cfg = config::AppConfig::load_from(cli.config.clone()).apply_overrides(&overrides);

    std::fs::create_dir_all(&cfg.data_path)?;
    let file_appender = rolling::daily(&cfg.data_path, "photoshelf.log");
    let (file_writer, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(cfg.log_level.clone()))
        .with_writer(std::io::stdout.and(file_writer))
        .init();

    let source = FsMediaSource::new(cfg.library_path.clone());
    let db_path = cfg.data_path.join("favorites.sqlite");
    tracing::debug!(library = ?cfg.library_path, db = ?db_path, "photoshelf starting");
    let favorites = FavoritesStore::new(SqliteKvStore::new(&db_path)?);

    match cli.command {
        Commands::Albums => {
            let albums = aggregate_albums(&source).await?;
            if albums.is_empty() {
                println!("No albums found in {:?}", cfg.library_path);
            }
            for album in albums {
                let thumb = album.thumbnail_uri.unwrap_or_default();
                println!("{} (id: {}) - {}", album.title, album.id, thumb);
            }
        }
        Commands::Photos {
            album,
            title,
            pages,
        } => {
            if let Some(title) = title {
                println!("== {} ==", title);
            }
            let pager = PhotoPager::new(source, Some(album), cfg.page_size);
            load_pages(&pager, pages).await?;
            let items = pager.items().await;
            for photo in &items {
                println!("{}", photo.uri);
            }
            println!("{} photos loaded", items.len());
            if pager.has_more().await {
                println!("(more photos available)");
            }
        }
        Commands::Timeline { pages } => {
            let pager = PhotoPager::new(source, None, cfg.page_size);
            load_pages(&pager, pages).await?;
            let items = pager.items().await;
            for section in group_by_day(&items) {
                println!("{}", section.title);
                for photo in &section.photos {
                    println!("  {}", photo.uri);
                }
            }
        }
        Commands::Favorites => {
            for uri in favorites.display_order().await {
                println!("{}", uri);
            }
        }
        Commands::Favorite { uri } => {
            if favorites.toggle(&uri).await {
                println!("Added to favorites: {}", uri);
            } else {
                println!("Removed from favorites: {}", uri);
            }
        }
        Commands::Status => {
            let albums = aggregate_albums(&source).await?;
            let favorite_count = favorites.get().await.len();
            println!("Library: {:?}", cfg.library_path);
            println!("Albums: {}", albums.len());
            println!("Favorites: {}", favorite_count);
        }
    }

    Ok(())
}
