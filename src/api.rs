// Address Selector - HTTP API
// City list from the cache, street lookup from SQLite

use crate::db::{self, City, Street};
use crate::selector::filter_items;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub cities: Arc<Vec<City>>,
}

impl AppState {
    pub fn new(conn: Connection, cities: Vec<City>) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
            cities: Arc::new(cities),
        }
    }
}

/// API Response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// Handler error: logged server-side, reported as `{success: false, error}`.
#[derive(Debug)]
pub struct ApiError(anyhow::Error);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!(error = ?self.0, "request failed");
        let body = ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(format!("{:#}", self.0)),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self(err)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/cities?q= - Cached cities, filtered
async fn list_cities(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Json<ApiResponse<Vec<City>>> {
    let cities = filter_items(state.cities.as_slice(), &query.q)
        .into_iter()
        .cloned()
        .collect();
    Json(ApiResponse::ok(cities))
}

/// GET /api/cities/:symbol/streets?q= - Streets of one city, by name
async fn list_streets(
    State(state): State<AppState>,
    Path(symbol): Path<i64>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiResponse<Vec<Street>>>, ApiError> {
    let streets = {
        let conn = state
            .db
            .lock()
            .map_err(|_| anyhow::anyhow!("database lock poisoned"))?;
        db::get_streets_by_city(&conn, symbol)?
    };

    let visible = if query.q.is_empty() {
        streets
    } else {
        filter_items(&streets, &query.q).into_iter().cloned().collect()
    };

    Ok(Json(ApiResponse::ok(visible)))
}

pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/cities", get(list_cities))
        .route("/cities/:symbol/streets", get(list_streets))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::NewStreet;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        let mut conn = Connection::open_in_memory().unwrap();
        db::setup_database(&conn).unwrap();

        let cities = vec![
            City { symbol: 5000, name: "תל אביב - יפו".to_string(), council_name: String::new() },
            City { symbol: 70, name: "אשדוד".to_string(), council_name: String::new() },
        ];
        db::insert_cities(&mut conn, &cities, db::CITY_BATCH_SIZE).unwrap();
        db::insert_streets(
            &mut conn,
            &[
                NewStreet { city_symbol: 5000, name: "דיזנגוף".to_string() },
                NewStreet { city_symbol: 5000, name: "אלנבי".to_string() },
            ],
            db::STREET_BATCH_SIZE,
        )
        .unwrap();

        AppState::new(conn, cities)
    }

    async fn get_json(state: AppState, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = create_router(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get_json(test_state(), "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], "OK");
    }

    #[tokio::test]
    async fn test_streets_ordered_by_name() {
        let (status, body) = get_json(test_state(), "/api/cities/5000/streets").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"][0]["name"], "אלנבי");
        assert_eq!(body["data"][1]["name"], "דיזנגוף");
        assert_eq!(body["data"][0]["citySymbol"], 5000);
    }

    #[tokio::test]
    async fn test_city_without_streets_is_empty_list() {
        let (status, body) = get_json(test_state(), "/api/cities/70/streets").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_city_search() {
        let uri = format!("/api/cities?q={}", "%D7%90%D7%A9%D7%93"); // "אשד"
        let (status, body) = get_json(test_state(), &uri).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().map(|a| a.len()), Some(1));
        assert_eq!(body["data"][0]["symbol"], 70);
    }
}
