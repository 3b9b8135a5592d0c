// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use address_selector::{
    filter_items, get_streets_by_city, run_etl, EtlReport, Settings,
};

#[derive(Parser)]
#[command(name = "address-selector")]
#[command(about = "Israeli settlements and streets: import and pick an address", long_about = None)]
struct Cli {
    /// SQLite database file
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// City cache JSON file
    #[arg(long, global = true)]
    cache: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Reload cities and streets from the source tables
    Import {
        /// Settlements table (.json or .csv)
        #[arg(long)]
        cities: Option<PathBuf>,
        /// Streets table (.json or .csv)
        #[arg(long)]
        streets: Option<PathBuf>,
    },
    /// Interactive city → street picker (default)
    Ui,
    /// Print the streets of one city as JSON
    Streets {
        symbol: i64,
        #[arg(short, long)]
        query: Option<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        tracing::error!("{:#}", err);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut settings = Settings::from_env();
    if let Some(db) = cli.db {
        settings.db_path = db;
    }
    if let Some(cache) = cli.cache {
        settings.cache_path = cache;
    }

    match cli.command {
        Some(Commands::Import { cities, streets }) => {
            if let Some(cities) = cities {
                settings.cities_path = cities;
            }
            if let Some(streets) = streets {
                settings.streets_path = streets;
            }
            run_import(&settings)
        }
        Some(Commands::Streets { symbol, query }) => run_streets(&settings, symbol, query.as_deref()),
        Some(Commands::Ui) | None => run_ui_mode(&settings),
    }
}

fn open_database(settings: &Settings) -> Result<Connection> {
    if let Some(parent) = settings.db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Connection::open(&settings.db_path)
        .with_context(|| format!("Failed to open database {}", settings.db_path.display()))
}

fn open_existing_database(settings: &Settings) -> Result<Connection> {
    if !settings.db_path.exists() {
        anyhow::bail!(
            "database not found at {} (run `address-selector import` first)",
            settings.db_path.display()
        );
    }
    open_database(settings)
}

fn run_import(settings: &Settings) -> Result<()> {
    let mut conn = open_database(settings)?;
    let report = run_etl(&mut conn, settings).context("ETL process failed")?;
    print_summary(&report);
    Ok(())
}

fn print_summary(report: &EtlReport) {
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("   Raw cities:          {}", report.raw_cities);
    println!("   Unique cities:       {}", report.unique_cities);
    println!("   Raw streets:         {}", report.raw_streets);
    println!("   City-name streets:   -{}", report.removed_city_name_streets);
    println!("   Orphan streets:      -{}", report.removed_orphan_streets);
    println!("   Total cities in DB:  {}", report.cities_in_db);
    println!("   Total streets in DB: {}", report.streets_in_db);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}

fn run_streets(settings: &Settings, symbol: i64, query: Option<&str>) -> Result<()> {
    let conn = open_existing_database(settings)?;
    let streets = get_streets_by_city(&conn, symbol)?;
    let visible = filter_items(&streets, query.unwrap_or(""));
    println!("{}", serde_json::to_string_pretty(&visible)?);
    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(settings: &Settings) -> Result<()> {
    let conn = open_existing_database(settings)?;

    // The cache is the normal source; fall back to the table if it's missing
    let cities = match address_selector::read_city_cache(&settings.cache_path) {
        Ok(cities) => cities,
        Err(err) => {
            tracing::warn!("{:#}; reading cities from the database", err);
            address_selector::get_all_cities(&conn)?
        }
    };

    let mut app = ui::App::new(cities);
    ui::run_ui(&mut app, &conn)?;

    if let Some(address) = app.selector.details() {
        println!("{}, {} (סמל ישוב {})", address.street_name, address.city_name, address.city_symbol);
    }

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_settings: &Settings) -> Result<()> {
    anyhow::bail!(
        "TUI mode not available; rebuild with `--features tui` or run `address-server --features server`"
    )
}
