// 🚚 ETL - one-shot import of the settlement and street tables
// Normalize → dedupe → cache → clear → insert cities → filter → insert streets

use crate::cache::write_city_cache;
use crate::config::Settings;
use crate::db::{self, City, NewStreet};
use crate::error::LoadError;
use crate::normalize::{
    dedupe_cities, drop_city_name_streets, drop_orphan_streets, normalize_cities, normalize_streets,
};
use crate::raw::{load_cities, load_streets, RawCity, RawStreet};
use anyhow::Result;
use rusqlite::Connection;
use serde::Serialize;
use tracing::info;

/// Normalized input, ready to be written.
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub cities: Vec<City>,
    pub streets: Vec<NewStreet>,
    pub raw_city_count: usize,
    pub raw_street_count: usize,
    pub removed_city_name_streets: usize,
}

/// What a run did, step by step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EtlReport {
    pub raw_cities: usize,
    pub unique_cities: usize,
    pub raw_streets: usize,
    pub removed_city_name_streets: usize,
    pub removed_orphan_streets: usize,
    pub inserted_cities: usize,
    pub inserted_streets: usize,
    pub cities_in_db: i64,
    pub streets_in_db: i64,
}

/// Pure part of the run: everything up to the first write.
pub fn prepare(raw_cities: &[RawCity], raw_streets: &[RawStreet]) -> Result<PreparedData, LoadError> {
    info!("Processing cities...");
    let cities = dedupe_cities(normalize_cities(raw_cities)?);
    info!(
        "Found {} raw cities, {} unique cities",
        raw_cities.len(),
        cities.len()
    );

    info!("Processing streets...");
    let normalized = normalize_streets(raw_streets)?;
    info!("Found {} streets", normalized.len());

    let before = normalized.len();
    let streets = drop_city_name_streets(normalized, &cities);
    let removed_city_name_streets = before - streets.len();
    if removed_city_name_streets > 0 {
        info!("Removed {} streets duplicated as city name", removed_city_name_streets);
    }

    Ok(PreparedData {
        cities,
        streets,
        raw_city_count: raw_cities.len(),
        raw_street_count: raw_streets.len(),
        removed_city_name_streets,
    })
}

/// Write prepared data: cache file, then a full reload of both tables.
pub fn load(conn: &mut Connection, data: PreparedData, settings: &Settings) -> Result<EtlReport> {
    info!("Exporting cities cache...");
    write_city_cache(&settings.cache_path, &data.cities)?;

    info!("Clearing existing data...");
    db::clear_all(conn)?;

    info!("Inserting cities...");
    let inserted_cities = db::insert_cities(conn, &data.cities, settings.city_batch_size)?;
    info!("Inserted {} cities", inserted_cities);

    // Filter against what was actually stored, not what we meant to store
    let symbols = db::city_symbols(conn)?;
    let before = data.streets.len();
    let streets = drop_orphan_streets(data.streets, &symbols);
    let removed_orphan_streets = before - streets.len();
    info!("{} streets have valid city references", streets.len());

    info!("Inserting streets...");
    let inserted_streets = db::insert_streets(conn, &streets, settings.street_batch_size)?;
    info!("Inserted {} streets", inserted_streets);

    Ok(EtlReport {
        raw_cities: data.raw_city_count,
        unique_cities: data.cities.len(),
        raw_streets: data.raw_street_count,
        removed_city_name_streets: data.removed_city_name_streets,
        removed_orphan_streets,
        inserted_cities,
        inserted_streets,
        cities_in_db: db::count_cities(conn)?,
        streets_in_db: db::count_streets(conn)?,
    })
}

/// Full run against the files named in `settings`.
pub fn run_etl(conn: &mut Connection, settings: &Settings) -> Result<EtlReport> {
    info!("Starting ETL process...");

    let raw_cities = load_cities(&settings.cities_path)?;
    let raw_streets = load_streets(&settings.streets_path)?;
    let data = prepare(&raw_cities, &raw_streets)?;

    db::setup_database(conn)?;
    let report = load(conn, data, settings)?;

    info!(
        cities = report.cities_in_db,
        streets = report.streets_in_db,
        "ETL process completed"
    );
    Ok(report)
}
