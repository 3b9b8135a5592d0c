// 📁 City Cache - flattened city list for the pickers
// Lets a front-end list cities without touching the database

use crate::db::City;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::info;

/// Write `cities` as a pretty-printed JSON array of `{symbol, name, councilName}`.
pub fn write_city_cache(path: &Path, cities: &[City]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create cache directory {}", parent.display()))?;
    }

    let json = serde_json::to_string_pretty(cities)?;
    fs::write(path, json).with_context(|| format!("Failed to write city cache {}", path.display()))?;

    info!(count = cities.len(), path = %path.display(), "exported city cache");
    Ok(())
}

pub fn read_city_cache(path: &Path) -> Result<Vec<City>> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read city cache {}", path.display()))?;
    let cities = serde_json::from_str(&json)
        .with_context(|| format!("Malformed city cache {}", path.display()))?;
    Ok(cities)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_file_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("cities_cache.json");
        let cities = vec![City {
            symbol: 70,
            name: "אשדוד".to_string(),
            council_name: "אשדוד".to_string(),
        }];

        write_city_cache(&path, &cities).unwrap();

        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!([{"symbol": 70, "name": "אשדוד", "councilName": "אשדוד"}])
        );
        assert_eq!(read_city_cache(&path).unwrap(), cities);
    }

    #[test]
    fn test_read_missing_cache_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_city_cache(&dir.path().join("nope.json")).is_err());
    }
}
