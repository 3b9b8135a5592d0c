// 🧹 Normalization - raw rows → typed cities/streets
// Trim, coerce symbols, collapse duplicate cities, drop artifact streets

use crate::db::{City, NewStreet};
use crate::error::LoadError;
use crate::raw::{RawCity, RawStreet, RawValue};
use std::collections::{HashMap, HashSet};

// ============================================================================
// FIELD COERCION
// ============================================================================

/// Integer prefix of `s`, read the way `parseInt(s, 10)` reads it:
/// leading whitespace, an optional sign, then decimal digits. Anything
/// after the digits is ignored.
pub fn parse_int_prefix(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return None;
    }

    let magnitude: i64 = rest[..digits_len].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

/// Coerce a symbol cell to an integer.
pub fn parse_symbol(value: &RawValue, index: usize, field: &'static str) -> Result<i64, LoadError> {
    let malformed = || LoadError::MalformedSymbol {
        index,
        field,
        value: value.to_trimmed_string(),
    };

    match value {
        RawValue::Int(n) => Ok(*n),
        RawValue::Float(f) if f.is_finite() && f.fract() == 0.0 => Ok(*f as i64),
        RawValue::Float(_) => Err(malformed()),
        RawValue::Text(s) => parse_int_prefix(s.trim()).ok_or_else(malformed),
    }
}

fn required<'a>(
    value: &'a Option<RawValue>,
    index: usize,
    field: &'static str,
) -> Result<&'a RawValue, LoadError> {
    value.as_ref().ok_or(LoadError::MissingField { index, field })
}

fn required_text(value: &Option<String>, index: usize, field: &'static str) -> Result<String, LoadError> {
    value
        .as_deref()
        .map(|s| s.trim().to_string())
        .ok_or(LoadError::MissingField { index, field })
}

// ============================================================================
// RECORDS
// ============================================================================

pub fn normalize_city(index: usize, raw: &RawCity) -> Result<City, LoadError> {
    let symbol = parse_symbol(required(&raw.symbol, index, "סמל_ישוב")?, index, "סמל_ישוב")?;
    let name = required_text(&raw.name, index, "שם_ישוב")?;
    let council_name = raw
        .council_name
        .as_deref()
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    Ok(City {
        symbol,
        name,
        council_name,
    })
}

pub fn normalize_street(index: usize, raw: &RawStreet) -> Result<NewStreet, LoadError> {
    let city_symbol = parse_symbol(required(&raw.city_symbol, index, "סמל_ישוב")?, index, "סמל_ישוב")?;
    let name = required_text(&raw.name, index, "שם_רחוב")?;

    Ok(NewStreet { city_symbol, name })
}

pub fn normalize_cities(raw: &[RawCity]) -> Result<Vec<City>, LoadError> {
    raw.iter()
        .enumerate()
        .map(|(i, r)| normalize_city(i, r))
        .collect()
}

pub fn normalize_streets(raw: &[RawStreet]) -> Result<Vec<NewStreet>, LoadError> {
    raw.iter()
        .enumerate()
        .map(|(i, r)| normalize_street(i, r))
        .collect()
}

// ============================================================================
// DEDUPLICATION & FILTERING
// ============================================================================

/// One city per symbol. The last occurrence wins; the city keeps the
/// position of the first occurrence.
pub fn dedupe_cities(cities: Vec<City>) -> Vec<City> {
    let mut position: HashMap<i64, usize> = HashMap::with_capacity(cities.len());
    let mut unique: Vec<City> = Vec::with_capacity(cities.len());

    for city in cities {
        match position.get(&city.symbol) {
            Some(&i) => unique[i] = city,
            None => {
                position.insert(city.symbol, unique.len());
                unique.push(city);
            }
        }
    }

    unique
}

/// Drop streets that repeat their city's name. The source tables list every
/// settlement as a street of itself.
pub fn drop_city_name_streets(streets: Vec<NewStreet>, cities: &[City]) -> Vec<NewStreet> {
    let city_names: HashMap<i64, &str> = cities
        .iter()
        .map(|c| (c.symbol, c.name.trim()))
        .collect();

    streets
        .into_iter()
        .filter(|street| match city_names.get(&street.city_symbol) {
            Some(city_name) if !city_name.is_empty() => street.name.trim() != *city_name,
            _ => true,
        })
        .collect()
}

/// Drop streets that point at a city outside `symbols`.
pub fn drop_orphan_streets(streets: Vec<NewStreet>, symbols: &HashSet<i64>) -> Vec<NewStreet> {
    streets
        .into_iter()
        .filter(|street| symbols.contains(&street.city_symbol))
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_city(symbol: RawValue, name: &str) -> RawCity {
        RawCity {
            symbol: Some(symbol),
            name: Some(name.to_string()),
            council_name: None,
        }
    }

    fn raw_street(city_symbol: RawValue, name: &str) -> RawStreet {
        RawStreet {
            city_symbol: Some(city_symbol),
            name: Some(name.to_string()),
        }
    }

    fn city(symbol: i64, name: &str) -> City {
        City {
            symbol,
            name: name.to_string(),
            council_name: String::new(),
        }
    }

    fn street(city_symbol: i64, name: &str) -> NewStreet {
        NewStreet {
            city_symbol,
            name: name.to_string(),
        }
    }

    #[test]
    fn test_parse_int_prefix_like_parse_int() {
        assert_eq!(parse_int_prefix("5"), Some(5));
        assert_eq!(parse_int_prefix("  0070"), Some(70));
        assert_eq!(parse_int_prefix("-12"), Some(-12));
        assert_eq!(parse_int_prefix("+8"), Some(8));
        assert_eq!(parse_int_prefix("472abc"), Some(472));
        assert_eq!(parse_int_prefix("5.9"), Some(5));
        assert_eq!(parse_int_prefix("abc"), None);
        assert_eq!(parse_int_prefix(""), None);
        assert_eq!(parse_int_prefix("-"), None);
    }

    #[test]
    fn test_parse_symbol_rejects_non_numeric_text() {
        let err = parse_symbol(&RawValue::from("ללא"), 3, "סמל_ישוב").unwrap_err();

        assert_eq!(err.record_index(), Some(3));
        assert!(err.to_string().contains("ללא"));
    }

    #[test]
    fn test_parse_symbol_numbers() {
        assert_eq!(parse_symbol(&RawValue::Int(3000), 0, "סמל_ישוב").unwrap(), 3000);
        assert_eq!(parse_symbol(&RawValue::Float(3000.0), 0, "סמל_ישוב").unwrap(), 3000);
        assert!(parse_symbol(&RawValue::Float(1.5), 0, "סמל_ישוב").is_err());
    }

    #[test]
    fn test_normalize_city_trims_and_defaults_council() {
        let raw = RawCity {
            symbol: Some(RawValue::from(" 5000 ")),
            name: Some("  תל אביב - יפו ".to_string()),
            council_name: None,
        };

        let city = normalize_city(0, &raw).unwrap();

        assert_eq!(city.symbol, 5000);
        assert_eq!(city.name, "תל אביב - יפו");
        assert_eq!(city.council_name, "");
    }

    #[test]
    fn test_normalize_city_missing_name() {
        let raw = RawCity {
            symbol: Some(RawValue::Int(1)),
            ..Default::default()
        };

        let err = normalize_city(7, &raw).unwrap_err();
        assert!(matches!(err, LoadError::MissingField { index: 7, field: "שם_ישוב" }));
    }

    #[test]
    fn test_dedupe_last_occurrence_wins() {
        let raw = vec![
            raw_city(RawValue::from("5"), " Tel Aviv "),
            raw_city(RawValue::Int(5), "Tel Aviv City"),
        ];

        let cities = dedupe_cities(normalize_cities(&raw).unwrap());

        assert_eq!(cities, vec![city(5, "Tel Aviv City")]);
    }

    #[test]
    fn test_dedupe_keeps_first_position() {
        let cities = vec![city(1, "a"), city(2, "b"), city(1, "c"), city(3, "d"), city(2, "e")];

        let unique = dedupe_cities(cities);

        assert_eq!(unique, vec![city(1, "c"), city(2, "e"), city(3, "d")]);
    }

    #[test]
    fn test_drop_city_name_streets() {
        let cities = vec![city(70, " אשדוד "), city(8, "")];
        let streets = vec![
            street(70, "אשדוד"),
            street(70, " אשדוד"),
            street(70, "הרצל"),
            street(8, ""),
            street(999, "אשדוד"),
        ];

        let kept = drop_city_name_streets(streets, &cities);

        // unknown city and empty city name are left for the orphan pass
        assert_eq!(kept, vec![street(70, "הרצל"), street(8, ""), street(999, "אשדוד")]);
    }

    #[test]
    fn test_drop_orphan_streets() {
        let symbols = HashSet::from([70, 5000]);
        let streets = vec![street(70, "הרצל"), street(1, "יתום"), street(5000, "דיזנגוף")];

        let kept = drop_orphan_streets(streets, &symbols);

        assert_eq!(kept, vec![street(70, "הרצל"), street(5000, "דיזנגוף")]);
    }

    #[test]
    fn test_normalize_streets_reports_bad_index() {
        let raw = vec![
            raw_street(RawValue::Int(70), "הרצל"),
            raw_street(RawValue::from("n/a"), "בלפור"),
        ];

        let err = normalize_streets(&raw).unwrap_err();
        assert_eq!(err.record_index(), Some(1));
    }
}
