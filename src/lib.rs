// Address Selector - Core Library
// Exposes all modules for use in the importer, the TUI picker, the API server, and tests

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod etl;
pub mod normalize;
pub mod raw;
pub mod selector;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use cache::{read_city_cache, write_city_cache};
pub use config::Settings;
pub use db::{
    City, Street, NewStreet,
    setup_database, clear_all, insert_cities, insert_streets,
    city_symbols, get_streets_by_city, get_all_cities, get_city,
    count_cities, count_streets,
    CITY_BATCH_SIZE, STREET_BATCH_SIZE,
};
pub use error::LoadError;
pub use etl::{prepare, run_etl, EtlReport, PreparedData};
pub use normalize::{
    dedupe_cities, drop_city_name_streets, drop_orphan_streets,
    normalize_city, normalize_street, parse_symbol,
};
pub use raw::{RawCity, RawStreet, RawValue, SourceFormat, detect_format, load_cities, load_streets};
pub use selector::{
    filter_items, Named, SelectedAddress, Selector, StreetLookup,
    StreetPrompt, StreetsRequest, MAX_VISIBLE,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
