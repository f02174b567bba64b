use clap::{Parser, Subcommand};
use gfg_notion_sync::gfg::{detect_successful_submission, GfgExtractor};
use gfg_notion_sync::notion::NotionClient;
use gfg_notion_sync::relay::SyncRelay;
use gfg_notion_sync::settings::{
    validate_api_key, validate_database_id, SettingsBackend, SettingsStore, KEY_API_KEY,
    KEY_AUTO_SYNC, KEY_DATABASE_ID, KEY_DEFAULT_SHEET, KEY_INCLUDE_CODE,
};
use gfg_notion_sync::{Extractor, SyncError};
use scraper::Html;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_error::ErrorLayer;
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(name = "gfg-notion-sync")]
#[command(about = "Sync GeeksforGeeks problems into a Notion database")]
struct Cli {
    /// Sqlite file holding the stored settings
    #[arg(long, global = true, default_value = "settings.db")]
    db: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch a problem page, extract it and create a Notion page
    Sync { url: String },
    /// Verify the stored credentials against the configured database
    Check,
    /// Show or change the stored settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    Show,
    Set {
        #[arg(long)]
        api_key: Option<String>,
        #[arg(long)]
        database_id: Option<String>,
        #[arg(long)]
        default_sheet: Option<String>,
        #[arg(long)]
        auto_sync: Option<bool>,
        #[arg(long)]
        include_code: Option<bool>,
    },
    Reset,
}

async fn sync(store: Arc<SettingsStore>, url: &str) -> Result<(), SyncError> {
    let extractor = GfgExtractor::default();
    if !extractor.can_extract(url) {
        return Err(SyncError::Configuration(format!(
            "Not a GeeksforGeeks problem page: {}",
            url
        )));
    }

    debug!("Visit {}", url);
    let html = reqwest::get(url).await?.text().await?;

    let record = {
        let doc = Html::parse_document(&html);
        if detect_successful_submission(&doc) {
            // Detection is informational only; syncing stays user-triggered.
            info!("Successful submission detected on {}", url);
        }
        extractor.extract(&doc, url)
    };
    let Some(record) = record else {
        return Err(SyncError::Configuration(format!(
            "Could not extract problem data from {}",
            url
        )));
    };

    if record.solution.is_empty() {
        warn!("No solution code captured on {}", url);
    }
    print!("{}", record);

    let handle = SyncRelay::new(store.clone()).spawn();
    let result = handle.sync(record.clone()).await?;

    let count = store.record_sync().await?;
    println!("Problem \"{}\" synced to Notion ({} total)", record.title, count);
    if let Some(id) = result["id"].as_str() {
        println!("Created page {}", id);
    }
    Ok(())
}

fn mask_key(key: &str) -> String {
    format!("{}***", key.chars().take(7).collect::<String>())
}

async fn check(store: &SettingsStore) -> Result<(), SyncError> {
    let settings = store.load().await?;
    let (api_key, database_id) = match (settings.notion_api_key, settings.database_id) {
        (Some(key), Some(id)) => (key, id),
        _ => {
            return Err(SyncError::Configuration(
                "Configure the API key and database id first (config set)".to_string(),
            ))
        }
    };

    let client = NotionClient::new(api_key, database_id);
    match client.check_connection().await {
        Ok(title) => {
            println!("Connection successful! Database: \"{}\"", title);
            Ok(())
        }
        Err(e) if e.is_timeout() => {
            println!("Connection timed out");
            Err(e)
        }
        Err(e) => {
            println!("Connection failed: {}", e);
            Err(e)
        }
    }
}

async fn config(store: &SettingsStore, action: ConfigAction) -> Result<(), SyncError> {
    match action {
        ConfigAction::Show => {
            let settings = store.load().await?;
            let masked = settings
                .notion_api_key
                .map(|k| mask_key(&k))
                .unwrap_or_else(|| "unset".to_string());
            println!("API key       : {}", masked);
            println!(
                "Database id   : {}",
                settings.database_id.as_deref().unwrap_or("unset")
            );
            println!("Default sheet : {}", settings.default_sheet);
            println!("Auto sync     : {}", settings.auto_sync);
            println!("Include code  : {}", settings.include_code);
            println!("Synced        : {}", settings.sync_count);
            match settings.last_sync_time {
                Some(t) => println!("Last sync     : {}", t),
                None => println!("Last sync     : Never"),
            }
        }
        ConfigAction::Set {
            api_key,
            database_id,
            default_sheet,
            auto_sync,
            include_code,
        } => {
            if let Some(key) = api_key {
                validate_api_key(&key)?;
                store.set(KEY_API_KEY, &key).await?;
            }
            if let Some(id) = database_id {
                validate_database_id(&id)?;
                store.set(KEY_DATABASE_ID, &id).await?;
            }
            if let Some(sheet) = default_sheet {
                store.set(KEY_DEFAULT_SHEET, &sheet).await?;
            }
            if let Some(auto) = auto_sync {
                store.set(KEY_AUTO_SYNC, &auto.to_string()).await?;
            }
            if let Some(include) = include_code {
                store.set(KEY_INCLUDE_CODE, &include.to_string()).await?;
            }
            println!("Settings saved");
        }
        ConfigAction::Reset => {
            store.reset().await?;
            println!("All settings have been reset");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| {
                "info,html5ever=error,selectors=error,hyper=warn,reqwest=info,sqlx=warn".into()
            }),
        )
        .with(ErrorLayer::default())
        .init();

    let cli = Cli::parse();
    let store = Arc::new(SettingsStore::new(&cli.db).await?);

    match cli.command {
        Command::Sync { url } => sync(store, &url).await?,
        Command::Check => check(&store).await?,
        Command::Config { action } => config(&store, action).await?,
    }

    Ok(())
}
