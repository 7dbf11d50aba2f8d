use clap::Parser;
use colored::*;
use settingskit::codec::parse_value;
use settingskit::config::StoreConfig;
use settingskit::error::{Result, SettingsError};
use settingskit::location::{open_store, StoreLocation};
use settingskit::logging::init_logging;
use settingskit::paths::default_config_dir;
use settingskit::store::{SettingsStore, SettingsStoreExt};
use settingskit::ValueKind;
use std::sync::Arc;

mod args;
use args::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

struct AppContext {
    store: Arc<dyn SettingsStore>,
    location: StoreLocation,
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    // a subscriber installed by the environment is fine
    let _ = init_logging(cli.verbose);

    let ctx = init_context(&cli)?;
    let result = match cli.command {
        Commands::Keys => handle_keys(&ctx),
        Commands::Get { key } => handle_get(&ctx, &key),
        Commands::Set { key, value, kind } => handle_set(&ctx, &key, &value, kind.into()),
        Commands::Remove { key } => handle_remove(&ctx, &key),
        Commands::Rename { old_key, new_key } => handle_rename(&ctx, &old_key, &new_key),
        Commands::RemoveMatching { pattern } => handle_remove_matching(&ctx, &pattern),
        Commands::Info => handle_info(&ctx),
    };

    // pending file writes land here
    let disposed = ctx.store.dispose();
    result.and(disposed)
}

fn init_context(cli: &Cli) -> Result<AppContext> {
    let config_dir = match &cli.config {
        Some(dir) => dir.clone(),
        None => default_config_dir()?,
    };
    let config = StoreConfig::load(&config_dir)?;

    let text = cli
        .store
        .clone()
        .or_else(|| config.default_location.clone())
        .ok_or_else(|| {
            SettingsError::InvalidLocation(
                "no store given; pass --store or set default_location in config.json".to_string(),
            )
        })?;
    let location = StoreLocation::parse(&text)?;
    let store = open_store(&location, &config, cli.read_only)?;

    Ok(AppContext { store, location })
}

fn handle_keys(ctx: &AppContext) -> Result<()> {
    let keys = ctx.store.keys()?;
    if keys.is_empty() {
        println!("{}", "No settings.".dimmed());
        return Ok(());
    }
    for key in keys {
        println!("{}", key);
    }
    Ok(())
}

fn handle_get(ctx: &AppContext, key: &str) -> Result<()> {
    match ctx.store.get(key)? {
        Some(value) => {
            println!("{} {}", value.to_string().bold(), format!("({})", value.kind()).dimmed());
            Ok(())
        }
        None => Err(SettingsError::Store(format!("key '{}' not found", key))),
    }
}

fn handle_set(ctx: &AppContext, key: &str, text: &str, kind: ValueKind) -> Result<()> {
    let value = parse_value(kind, text)?;
    ctx.store.set(key, Some(value))?;
    println!("{} {}", "Set".green(), key);
    Ok(())
}

fn handle_remove(ctx: &AppContext, key: &str) -> Result<()> {
    if ctx.store.remove(key)? {
        println!("{} {}", "Removed".green(), key);
    } else {
        println!("{} {}", "Not found:".yellow(), key);
    }
    Ok(())
}

fn handle_rename(ctx: &AppContext, old_key: &str, new_key: &str) -> Result<()> {
    if ctx.store.rename(old_key, new_key)? {
        println!("{} {} -> {}", "Renamed".green(), old_key, new_key);
        Ok(())
    } else {
        Err(SettingsError::Store(format!("key '{}' not found", old_key)))
    }
}

fn handle_remove_matching(ctx: &AppContext, pattern: &str) -> Result<()> {
    if ctx.store.remove_matching(pattern)? {
        println!("{} keys matching {}", "Removed".green(), pattern);
    } else {
        println!("{}", "No keys matched.".dimmed());
    }
    Ok(())
}

fn handle_info(ctx: &AppContext) -> Result<()> {
    println!("{:<10} {}", "Location".bold(), ctx.location);
    println!("{:<10} {}", "Store".bold(), ctx.store.location());
    println!("{:<10} {}", "Keys".bold(), ctx.store.keys()?.len());
    Ok(())
}
