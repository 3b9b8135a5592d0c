// 🧭 Selector - two-stage city → street picker state
// Front-end agnostic: the TUI and any other client drive the same machine

use crate::db::{self, City, Street};
use anyhow::Result;
use rusqlite::Connection;
use serde::Serialize;
use tracing::debug;

/// Most items a filtered list shows.
pub const MAX_VISIBLE: usize = 100;

// ============================================================================
// FILTERING
// ============================================================================

pub trait Named {
    fn name(&self) -> &str;
}

impl Named for City {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for Street {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Case-insensitive substring match over names, first [`MAX_VISIBLE`] hits.
/// An empty query returns the first [`MAX_VISIBLE`] items unfiltered.
pub fn filter_items<'a, T: Named>(items: &'a [T], query: &str) -> Vec<&'a T> {
    if query.is_empty() {
        return items.iter().take(MAX_VISIBLE).collect();
    }

    let needle = query.to_lowercase();
    items
        .iter()
        .filter(|item| item.name().to_lowercase().contains(&needle))
        .take(MAX_VISIBLE)
        .collect()
}

// ============================================================================
// STREET LOOKUP
// ============================================================================

/// Where streets come from once a city is picked.
pub trait StreetLookup {
    fn streets_by_city(&self, city_symbol: i64) -> Result<Vec<Street>>;
}

impl StreetLookup for Connection {
    fn streets_by_city(&self, city_symbol: i64) -> Result<Vec<Street>> {
        db::get_streets_by_city(self, city_symbol)
    }
}

/// Ticket for one outstanding lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreetsRequest {
    pub city_symbol: i64,
}

// ============================================================================
// STATE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum StreetsStatus {
    Idle,
    Loading,
    Loaded,
    Failed(String),
}

/// What the street picker shows instead of a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreetPrompt {
    Loading,
    Selected(String),
    Failed(String),
    NoStreets,
    NoCity,
    Choose,
}

impl StreetPrompt {
    pub fn label(&self) -> &str {
        match self {
            StreetPrompt::Loading => "טוען רחובות...",
            StreetPrompt::Selected(name) => name.as_str(),
            StreetPrompt::Failed(_) => "שגיאה בטעינת רחובות",
            StreetPrompt::NoStreets => "אין מידע על רחובות בעיר הזו",
            StreetPrompt::NoCity => "אנא בחר עיר תחילה",
            StreetPrompt::Choose => "בחר רחוב...",
        }
    }
}

/// A complete selection: a city and one of its streets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedAddress {
    pub city_symbol: i64,
    pub city_name: String,
    pub street_id: i64,
    pub street_name: String,
}

#[derive(Debug, Clone)]
pub struct Selector {
    cities: Vec<City>,
    selected_city: Option<City>,
    selected_street: Option<Street>,
    streets: Vec<Street>,
    status: StreetsStatus,
}

impl Selector {
    pub fn new(cities: Vec<City>) -> Self {
        Self {
            cities,
            selected_city: None,
            selected_street: None,
            streets: Vec::new(),
            status: StreetsStatus::Idle,
        }
    }

    pub fn cities(&self) -> &[City] {
        &self.cities
    }

    pub fn streets(&self) -> &[Street] {
        &self.streets
    }

    pub fn selected_city(&self) -> Option<&City> {
        self.selected_city.as_ref()
    }

    pub fn selected_street(&self) -> Option<&Street> {
        self.selected_street.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.status == StreetsStatus::Loading
    }

    pub fn lookup_error(&self) -> Option<&str> {
        match &self.status {
            StreetsStatus::Failed(msg) => Some(msg.as_str()),
            _ => None,
        }
    }

    pub fn filtered_cities(&self, query: &str) -> Vec<&City> {
        filter_items(&self.cities, query)
    }

    pub fn filtered_streets(&self, query: &str) -> Vec<&Street> {
        filter_items(&self.streets, query)
    }

    /// Pick `city`, or deselect it if it is already the selection.
    ///
    /// Either way the street selection and list are cleared. Returns the
    /// lookup the caller must run when a new city became selected.
    pub fn select_city(&mut self, city: &City) -> Option<StreetsRequest> {
        let toggled_off = self
            .selected_city
            .as_ref()
            .is_some_and(|current| current.symbol == city.symbol);

        self.selected_street = None;
        self.streets.clear();

        if toggled_off {
            self.selected_city = None;
            self.status = StreetsStatus::Idle;
            return None;
        }

        self.selected_city = Some(city.clone());
        self.status = StreetsStatus::Loading;
        Some(StreetsRequest {
            city_symbol: city.symbol,
        })
    }

    /// Drop the city and everything that depends on it.
    pub fn clear_city(&mut self) {
        self.selected_city = None;
        self.selected_street = None;
        self.streets.clear();
        self.status = StreetsStatus::Idle;
    }

    /// Complete a lookup. Results for a city that is no longer selected are
    /// dropped; returns whether the result was applied.
    pub fn apply_streets(&mut self, request: StreetsRequest, result: Result<Vec<Street>>) -> bool {
        let current = self.selected_city.as_ref().map(|c| c.symbol);
        if current != Some(request.city_symbol) {
            debug!(city_symbol = request.city_symbol, "discarding stale street lookup");
            return false;
        }

        match result {
            Ok(streets) => {
                self.streets = streets;
                self.status = StreetsStatus::Loaded;
            }
            Err(err) => {
                self.streets.clear();
                self.status = StreetsStatus::Failed(format!("{:#}", err));
            }
        }
        true
    }

    /// Run `request` against `lookup` and apply the result.
    pub fn fetch_streets<L: StreetLookup + ?Sized>(&mut self, lookup: &L, request: StreetsRequest) -> bool {
        let result = lookup.streets_by_city(request.city_symbol);
        self.apply_streets(request, result)
    }

    /// Pick `street`, or deselect it if it is already the selection.
    pub fn select_street(&mut self, street: &Street) {
        let toggled_off = self
            .selected_street
            .as_ref()
            .is_some_and(|current| current.id == street.id);

        self.selected_street = if toggled_off { None } else { Some(street.clone()) };
    }

    pub fn street_prompt(&self) -> StreetPrompt {
        if self.is_loading() {
            return StreetPrompt::Loading;
        }
        if let Some(street) = &self.selected_street {
            return StreetPrompt::Selected(street.name.clone());
        }
        if let Some(msg) = self.lookup_error() {
            return StreetPrompt::Failed(msg.to_string());
        }
        match (&self.selected_city, self.streets.is_empty()) {
            (Some(_), true) => StreetPrompt::NoStreets,
            (None, true) => StreetPrompt::NoCity,
            (_, false) => StreetPrompt::Choose,
        }
    }

    pub fn details(&self) -> Option<SelectedAddress> {
        let city = self.selected_city.as_ref()?;
        let street = self.selected_street.as_ref()?;

        Some(SelectedAddress {
            city_symbol: city.symbol,
            city_name: city.name.clone(),
            street_id: street.id,
            street_name: street.name.clone(),
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct FakeLookup {
        streets: HashMap<i64, Vec<Street>>,
    }

    impl StreetLookup for FakeLookup {
        fn streets_by_city(&self, city_symbol: i64) -> Result<Vec<Street>> {
            Ok(self.streets.get(&city_symbol).cloned().unwrap_or_default())
        }
    }

    struct BrokenLookup;

    impl StreetLookup for BrokenLookup {
        fn streets_by_city(&self, _city_symbol: i64) -> Result<Vec<Street>> {
            anyhow::bail!("database is locked")
        }
    }

    fn city(symbol: i64, name: &str) -> City {
        City {
            symbol,
            name: name.to_string(),
            council_name: String::new(),
        }
    }

    fn street(id: i64, city_symbol: i64, name: &str) -> Street {
        Street {
            id,
            name: name.to_string(),
            city_symbol,
        }
    }

    fn fixture() -> (Selector, FakeLookup) {
        let selector = Selector::new(vec![city(5000, "תל אביב - יפו"), city(70, "אשדוד"), city(5, "Tel Aviv")]);
        let lookup = FakeLookup {
            streets: HashMap::from([(
                5000,
                vec![street(1, 5000, "אלנבי"), street(2, 5000, "דיזנגוף")],
            )]),
        };
        (selector, lookup)
    }

    #[test]
    fn test_filter_is_case_insensitive_substring() {
        let cities = vec![city(1, "Tel Aviv"), city(2, "Haifa"), city(3, "TEL MOND")];

        let hits: Vec<i64> = filter_items(&cities, "tel").iter().map(|c| c.symbol).collect();

        assert_eq!(hits, vec![1, 3]);
        assert!(filter_items(&cities, "xyz").is_empty());
    }

    #[test]
    fn test_filter_caps_at_max_visible() {
        let cities: Vec<City> = (0..250).map(|i| city(i, &format!("עיר {}", i))).collect();

        assert_eq!(filter_items(&cities, "").len(), MAX_VISIBLE);
        assert_eq!(filter_items(&cities, "עיר").len(), MAX_VISIBLE);
        assert_eq!(filter_items(&cities, "")[0].symbol, 0);
        // "עיר 1", "עיר 10".."עיר 19", "עיר 100".."עיר 199"
        assert_eq!(filter_items(&cities, "עיר 1").len(), 100);
        assert_eq!(filter_items(&cities, "עיר 2").len(), 1 + 10 + 50);
    }

    #[test]
    fn test_select_city_loads_streets() {
        let (mut selector, lookup) = fixture();
        assert_eq!(selector.street_prompt(), StreetPrompt::NoCity);

        let tlv = selector.cities()[0].clone();
        let request = selector.select_city(&tlv).unwrap();
        assert!(selector.is_loading());
        assert_eq!(selector.street_prompt(), StreetPrompt::Loading);

        assert!(selector.fetch_streets(&lookup, request));
        assert!(!selector.is_loading());
        assert_eq!(selector.streets().len(), 2);
        assert_eq!(selector.street_prompt(), StreetPrompt::Choose);
    }

    #[test]
    fn test_city_without_streets_shows_no_streets() {
        let (mut selector, lookup) = fixture();
        let tel_aviv = selector.cities()[2].clone();

        let request = selector.select_city(&tel_aviv).unwrap();
        selector.fetch_streets(&lookup, request);

        assert!(!selector.is_loading());
        assert_eq!(selector.street_prompt(), StreetPrompt::NoStreets);
        assert!(selector.lookup_error().is_none());
    }

    #[test]
    fn test_reselecting_city_deselects() {
        let (mut selector, lookup) = fixture();
        let tlv = selector.cities()[0].clone();

        let request = selector.select_city(&tlv).unwrap();
        selector.fetch_streets(&lookup, request);
        let dizengoff = selector.streets()[1].clone();
        selector.select_street(&dizengoff);

        assert!(selector.select_city(&tlv).is_none());
        assert!(selector.selected_city().is_none());
        assert!(selector.selected_street().is_none());
        assert!(selector.streets().is_empty());
        assert_eq!(selector.street_prompt(), StreetPrompt::NoCity);
    }

    #[test]
    fn test_changing_city_clears_street() {
        let (mut selector, lookup) = fixture();
        let tlv = selector.cities()[0].clone();
        let ashdod = selector.cities()[1].clone();

        let request = selector.select_city(&tlv).unwrap();
        selector.fetch_streets(&lookup, request);
        let allenby = selector.streets()[0].clone();
        selector.select_street(&allenby);

        selector.select_city(&ashdod).unwrap();

        assert_eq!(selector.selected_city(), Some(&ashdod));
        assert!(selector.selected_street().is_none());
        assert!(selector.streets().is_empty());
    }

    #[test]
    fn test_stale_lookup_is_discarded() {
        let (mut selector, lookup) = fixture();
        let tlv = selector.cities()[0].clone();
        let ashdod = selector.cities()[1].clone();

        let first = selector.select_city(&tlv).unwrap();
        let second = selector.select_city(&ashdod).unwrap();

        assert!(!selector.fetch_streets(&lookup, first));
        assert!(selector.is_loading());
        assert!(selector.fetch_streets(&lookup, second));
        assert!(selector.streets().is_empty());
    }

    #[test]
    fn test_clear_city_resets_selection() {
        let (mut selector, lookup) = fixture();
        let tlv = selector.cities()[0].clone();

        let request = selector.select_city(&tlv).unwrap();
        selector.clear_city();

        assert!(!selector.is_loading());
        assert!(!selector.fetch_streets(&lookup, request));
        assert!(selector.selected_city().is_none());
        assert!(selector.streets().is_empty());
        assert_eq!(selector.street_prompt(), StreetPrompt::NoCity);
    }

    #[test]
    fn test_street_toggle_and_details() {
        let (mut selector, lookup) = fixture();
        let tlv = selector.cities()[0].clone();
        let request = selector.select_city(&tlv).unwrap();
        selector.fetch_streets(&lookup, request);
        let allenby = selector.streets()[0].clone();

        assert!(selector.details().is_none());

        selector.select_street(&allenby);
        assert_eq!(selector.street_prompt(), StreetPrompt::Selected("אלנבי".to_string()));
        assert_eq!(
            selector.details(),
            Some(SelectedAddress {
                city_symbol: 5000,
                city_name: "תל אביב - יפו".to_string(),
                street_id: 1,
                street_name: "אלנבי".to_string(),
            })
        );

        selector.select_street(&allenby);
        assert!(selector.selected_street().is_none());
        assert!(selector.details().is_none());
    }

    #[test]
    fn test_failed_lookup_is_recorded() {
        let (mut selector, _) = fixture();
        let tlv = selector.cities()[0].clone();

        let request = selector.select_city(&tlv).unwrap();
        assert!(selector.fetch_streets(&BrokenLookup, request));

        assert_eq!(selector.lookup_error(), Some("database is locked"));
        assert!(matches!(selector.street_prompt(), StreetPrompt::Failed(_)));
    }

    #[test]
    fn test_connection_lookup() {
        let mut conn = Connection::open_in_memory().unwrap();
        db::setup_database(&conn).unwrap();
        db::insert_cities(&mut conn, &[city(70, "אשדוד")], db::CITY_BATCH_SIZE).unwrap();
        db::insert_streets(
            &mut conn,
            &[db::NewStreet {
                city_symbol: 70,
                name: "הרצל".to_string(),
            }],
            db::STREET_BATCH_SIZE,
        )
        .unwrap();

        let mut selector = Selector::new(db::get_all_cities(&conn).unwrap());
        let ashdod = selector.cities()[0].clone();
        let request = selector.select_city(&ashdod).unwrap();
        selector.fetch_streets(&conn, request);

        assert_eq!(selector.filtered_streets("הר").len(), 1);
        assert_eq!(selector.streets()[0].city_symbol, 70);
    }
}
