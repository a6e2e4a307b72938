use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use askama::Template;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tower_http::services::ServeDir;

use vip_tips::api::backend_api::BackendApiClient;
use vip_tips::{fetch_history_data, fetch_other_games_data, fetch_viewer_data, ViewerData, ViewerPackage};

struct AppState {
    backend: BackendApiClient,
    cache_dir: PathBuf,
}

#[derive(Template)]
#[template(path = "vip.html")]
struct VipPage {
    data: ViewerData,
}

#[derive(Template)]
#[template(path = "history.html")]
struct HistoryPage {
    date: String,
    packages: Vec<ViewerPackage>,
}

#[derive(Deserialize)]
struct DateQuery {
    date: Option<String>,
}

fn parse_date(raw: &Option<String>) -> NaiveDate {
    raw.as_deref()
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        .unwrap_or_else(|| Utc::now().date_naive())
}

async fn vip_page(State(state): State<Arc<AppState>>) -> VipPage {
    let data = fetch_viewer_data(&state.backend, &state.cache_dir).await;
    VipPage { data }
}

async fn packages_json(State(state): State<Arc<AppState>>) -> Json<ViewerData> {
    Json(fetch_viewer_data(&state.backend, &state.cache_dir).await)
}

async fn history_page(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DateQuery>,
) -> HistoryPage {
    let date = parse_date(&query.date);
    HistoryPage {
        date: date.format("%Y-%m-%d").to_string(),
        packages: fetch_history_data(&state.backend, date).await,
    }
}

async fn other_games_json(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DateQuery>,
) -> Json<Vec<ViewerPackage>> {
    let date = parse_date(&query.date);
    Json(fetch_other_games_data(&state.backend, date).await)
}

async fn health() -> &'static str {
    "ok"
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let base_url =
        std::env::var("TIPS_BACKEND_URL").context("TIPS_BACKEND_URL not set in .env file")?;
    let cache_dir =
        PathBuf::from(std::env::var("TIPS_CACHE_DIR").unwrap_or_else(|_| "cache".to_string()));
    let bind_addr = std::env::var("TIPS_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

    let state = Arc::new(AppState {
        backend: BackendApiClient::new(&base_url)?,
        cache_dir,
    });

    let app = Router::new()
        .route("/", get(vip_page))
        .route("/history", get(history_page))
        .route("/api/packages", get(packages_json))
        .route("/api/other-games", get(other_games_json))
        .route("/health", get(health))
        .nest_service("/static", ServeDir::new("static"))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;
    println!("Serving tips on http://{}", bind_addr);
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
