use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info};

pub const CITY_BATCH_SIZE: usize = 1000;
pub const STREET_BATCH_SIZE: usize = 5000;

/// A settlement, keyed by its government-assigned symbol.
/// This is also the shape of a city cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct City {
    pub symbol: i64,
    pub name: String,
    #[serde(default)]
    pub council_name: String,
}

/// A stored street. `id` is a surrogate assigned by the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Street {
    pub id: i64,
    pub name: String,
    pub city_symbol: i64,
}

/// A street on its way into the database (no id yet).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStreet {
    pub city_symbol: i64,
    pub name: String,
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    // ==========================================================================
    // Cities
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS cities (
            symbol INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            council_name TEXT NOT NULL DEFAULT ''
        )",
        [],
    )?;

    // ==========================================================================
    // Streets
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS streets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            city_symbol INTEGER NOT NULL REFERENCES cities(symbol) ON DELETE CASCADE,
            name TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute("CREATE INDEX IF NOT EXISTS idx_cities_name ON cities(name)", [])?;
    conn.execute("CREATE INDEX IF NOT EXISTS idx_streets_name ON streets(name)", [])?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_streets_city_symbol ON streets(city_symbol)",
        [],
    )?;

    Ok(())
}

/// Drop every row. Streets go first so the foreign key never dangles.
pub fn clear_all(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction()?;
    let streets = tx.execute("DELETE FROM streets", [])?;
    let cities = tx.execute("DELETE FROM cities", [])?;
    tx.commit()?;

    info!(cities, streets, "cleared existing cities and streets");
    Ok(())
}

/// Insert cities in batches, one transaction per batch. Rows whose symbol is
/// already present are skipped. Returns the number of rows written.
pub fn insert_cities(conn: &mut Connection, cities: &[City], batch_size: usize) -> Result<usize> {
    let batch_size = batch_size.max(1);
    let mut inserted = 0;

    for (n, batch) in cities.chunks(batch_size).enumerate() {
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR IGNORE INTO cities (symbol, name, council_name) VALUES (?1, ?2, ?3)",
            )?;
            for city in batch {
                inserted += stmt
                    .execute(params![city.symbol, city.name, city.council_name])
                    .with_context(|| format!("Failed to insert city {}", city.symbol))?;
            }
        }
        tx.commit()?;

        let from = n * batch_size + 1;
        info!("Inserted cities {} to {}", from, from + batch.len() - 1);
    }

    Ok(inserted)
}

/// Same as [`insert_cities`] for streets. Every `city_symbol` must already
/// exist in `cities`.
pub fn insert_streets(conn: &mut Connection, streets: &[NewStreet], batch_size: usize) -> Result<usize> {
    let batch_size = batch_size.max(1);
    let mut inserted = 0;

    for (n, batch) in streets.chunks(batch_size).enumerate() {
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR IGNORE INTO streets (city_symbol, name) VALUES (?1, ?2)",
            )?;
            for street in batch {
                inserted += stmt
                    .execute(params![street.city_symbol, street.name])
                    .with_context(|| {
                        format!("Failed to insert street {:?} of city {}", street.name, street.city_symbol)
                    })?;
            }
        }
        tx.commit()?;

        let from = n * batch_size + 1;
        info!("Inserted streets {} to {}", from, from + batch.len() - 1);
    }

    Ok(inserted)
}

/// Symbols of the cities actually stored.
pub fn city_symbols(conn: &Connection) -> Result<HashSet<i64>> {
    let mut stmt = conn.prepare("SELECT symbol FROM cities")?;
    let symbols = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<HashSet<i64>>>()?;
    Ok(symbols)
}

/// Streets of one city, ordered by name ascending.
pub fn get_streets_by_city(conn: &Connection, city_symbol: i64) -> Result<Vec<Street>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, name, city_symbol FROM streets
         WHERE city_symbol = ?1
         ORDER BY name ASC, id ASC",
    )?;

    let streets = stmt
        .query_map(params![city_symbol], |row| {
            Ok(Street {
                id: row.get(0)?,
                name: row.get(1)?,
                city_symbol: row.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()
        .with_context(|| format!("Failed to read streets of city {}", city_symbol))?;

    debug!(city_symbol, count = streets.len(), "loaded streets");
    Ok(streets)
}

pub fn get_all_cities(conn: &Connection) -> Result<Vec<City>> {
    let mut stmt = conn.prepare("SELECT symbol, name, council_name FROM cities ORDER BY symbol")?;
    let cities = stmt
        .query_map([], |row| {
            Ok(City {
                symbol: row.get(0)?,
                name: row.get(1)?,
                council_name: row.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(cities)
}

pub fn get_city(conn: &Connection, symbol: i64) -> Result<Option<City>> {
    let city = conn
        .query_row(
            "SELECT symbol, name, council_name FROM cities WHERE symbol = ?1",
            params![symbol],
            |row| {
                Ok(City {
                    symbol: row.get(0)?,
                    name: row.get(1)?,
                    council_name: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(city)
}

pub fn count_cities(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM cities", [], |row| row.get(0))?;
    Ok(count)
}

pub fn count_streets(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM streets", [], |row| row.get(0))?;
    Ok(count)
}
