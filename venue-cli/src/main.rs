use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{debug, info};
use venue_cli::app;
use venue_cli::config::AppConfig;
use venue_cli::logging;
use venue_core::{CatalogItemKind, CatalogRepository};

/// Price packages and services with their fees and taxes.
#[derive(Parser, Debug)]
#[command(name = "venue")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Config file (defaults to ./venue.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Storage backend, overriding the config file
    #[arg(long, global = true)]
    backend: Option<String>,

    /// Database path or connection string, overriding the config file
    #[arg(long, global = true)]
    db: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Price a base amount with the given fees and taxes
    Quote {
        /// Base price as typed; anything non-numeric prices as zero
        #[arg(long, allow_hyphen_values = true)]
        base_price: String,

        /// Fee or service charge id, repeatable, applied in order
        #[arg(long = "fee")]
        fees: Vec<String>,

        /// Tax id, repeatable, applied in order
        #[arg(long = "tax")]
        taxes: Vec<String>,
    },

    /// Price a saved package or service, or manage saved items
    Item(ItemArgs),

    /// List the fees and taxes that can be selected
    Definitions,
}

#[derive(Args, Debug)]
#[command(args_conflicts_with_subcommands = true)]
struct ItemArgs {
    /// Catalog item id to price
    id: Option<i64>,

    #[command(subcommand)]
    action: Option<ItemAction>,
}

#[derive(Subcommand, Debug)]
enum ItemAction {
    /// Save a new package or service
    Add {
        /// `package` or `service`
        #[arg(long, value_parser = parse_kind)]
        kind: CatalogItemKind,

        #[arg(long)]
        name: String,

        #[arg(long)]
        description: Option<String>,

        /// Base price as typed; anything non-numeric saves as zero
        #[arg(long, allow_hyphen_values = true)]
        base_price: String,

        /// Fee or service charge id to switch on, repeatable
        #[arg(long = "fee")]
        fees: Vec<String>,

        /// Tax id to switch on, repeatable
        #[arg(long = "tax")]
        taxes: Vec<String>,
    },

    /// Switch fees and taxes on or off for a saved item
    Toggle {
        /// Catalog item id
        id: i64,

        /// Fee or service charge id to flip, repeatable
        #[arg(long = "fee")]
        fees: Vec<String>,

        /// Tax id to flip, repeatable
        #[arg(long = "tax")]
        taxes: Vec<String>,
    },

    /// List saved items
    List {
        /// Only list `package` or `service` items
        #[arg(long, value_parser = parse_kind)]
        kind: Option<CatalogItemKind>,
    },
}

fn parse_kind(s: &str) -> Result<CatalogItemKind, String> {
    CatalogItemKind::parse(s).ok_or_else(|| format!("unknown item kind '{s}'"))
}

async fn price_item(
    repo: &dyn CatalogRepository,
    id: i64,
    symbol: &str,
) -> Result<()> {
    let (item, breakdown) = app::quote_item(repo, id)
        .await
        .with_context(|| format!("Failed to price catalog item {}", id))?;
    info!(id = item.id, kind = item.kind.as_str(), "pricing catalog item");
    println!("{} ({})", item.name, item.kind.as_str());
    print!("{}", app::render_breakdown(&breakdown, symbol));
    Ok(())
}

async fn run_item_action(
    repo: &dyn CatalogRepository,
    action: ItemAction,
    symbol: &str,
) -> Result<()> {
    match action {
        ItemAction::Add {
            kind,
            name,
            description,
            base_price,
            fees,
            taxes,
        } => {
            let item = app::add_item(repo, kind, &name, description, &base_price, &fees, &taxes)
                .await
                .with_context(|| format!("Failed to save '{}'", name))?;
            println!("Saved {} {} as id {}", item.kind.as_str(), item.name, item.id);
            price_item(repo, item.id, symbol).await
        }
        ItemAction::Toggle { id, fees, taxes } => {
            let item = app::toggle_item_selection(repo, id, &fees, &taxes)
                .await
                .with_context(|| format!("Failed to update catalog item {}", id))?;
            price_item(repo, item.id, symbol).await
        }
        ItemAction::List { kind } => {
            let items = app::list_items(repo, kind)
                .await
                .context("Failed to list catalog items")?;
            print!("{}", app::render_items(&items, symbol));
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())?.with_overrides(cli.backend, cli.db);
    logging::init_logging(&config.logging)?;
    debug!(?config, "configuration loaded");

    let db_config = config.db_config();
    let repo = app::open_catalog(&db_config).await.with_context(|| {
        format!(
            "Failed to open {} catalog at '{}'",
            db_config.backend, db_config.connection_string
        )
    })?;
    let symbol = &config.display.currency_symbol;

    match cli.command {
        Command::Quote {
            base_price,
            fees,
            taxes,
        } => {
            let breakdown = app::quote(repo.as_ref(), &base_price, &fees, &taxes)
                .await
                .context("Failed to load definitions")?;
            print!("{}", app::render_breakdown(&breakdown, symbol));
        }
        Command::Item(ItemArgs {
            action: Some(action),
            ..
        }) => run_item_action(repo.as_ref(), action, symbol).await?,
        Command::Item(ItemArgs { id: Some(id), .. }) => {
            price_item(repo.as_ref(), id, symbol).await?
        }
        Command::Item(ItemArgs { .. }) => {
            anyhow::bail!("expected an item id or one of: add, toggle, list")
        }
        Command::Definitions => {
            let (fees, taxes) = app::selectable_definitions(repo.as_ref())
                .await
                .context("Failed to load definitions")?;
            print!("{}", app::render_definitions(&fees, &taxes, symbol));
        }
    }

    Ok(())
}
