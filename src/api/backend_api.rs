//! HTTP client for the site backend.
//!
//! Every response body deserializes into an explicit schema here; a payload
//! that does not match is a `Service` error at ingress, never a crash deeper
//! in. Writes go through the `BookingBackend`/`AvailabilityBackend` traits
//! so the admin components can be driven by a fake in tests.

use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::availability::PlanStatus;
use crate::models::bundle::{Category, PackageBundle};
use crate::models::game::{GameRecord, MatchStatus};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// One game as returned by `GET /load-booking/{code}`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoadedGame {
    pub home: String,
    pub away: String,
    pub prediction: String,
    pub odd: f64,
}

#[derive(Debug, Deserialize)]
struct LoadBookingResponse {
    games: Vec<LoadedGame>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadGame {
    pub id: String,
    pub home: String,
    pub away: String,
    pub prediction: String,
    pub odd: f64,
}

/// Payload for `POST /upload-booking`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadBookingRequest {
    pub deadline: DateTime<Utc>,
    pub share_code: String,
    pub alt_code: String,
    pub category: Category,
    pub price: f64,
    pub games: Vec<UploadGame>,
}

/// One entry of the whole-booking status push.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameStatusUpdate {
    pub id: String,
    pub status: MatchStatus,
}

#[derive(Debug, Serialize)]
struct UpdateGamesStatusRequest<'a> {
    games: &'a [GameStatusUpdate],
}

/// One game inside a viewer-side bundle payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleGamePayload {
    #[serde(default)]
    pub id: String,
    pub home: String,
    pub away: String,
    #[serde(default)]
    pub prediction: String,
    #[serde(default)]
    pub odd: f64,
    /// Stored with inconsistent casing upstream; normalized on ingress.
    #[serde(default)]
    pub status: MatchStatus,
    #[serde(default)]
    pub booking_code: String,
}

/// Viewer-side bundle as returned by `/vip-for-today`, `/vip-history`,
/// `/free-bookings` and `/other-games`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundlePayload {
    pub category: Category,
    #[serde(default)]
    pub games: Vec<BundleGamePayload>,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub share_code: Option<String>,
    #[serde(default)]
    pub alt_code: Option<String>,
    #[serde(default)]
    pub updated: bool,
}

impl BundlePayload {
    pub fn into_bundle(self) -> PackageBundle {
        let category = self.category;
        PackageBundle {
            category,
            games: self
                .games
                .into_iter()
                .map(|g| GameRecord {
                    id: g.id,
                    category,
                    home_team: g.home,
                    away_team: g.away,
                    prediction: g.prediction,
                    odds: g.odd,
                    status: g.status,
                    booking_code: g.booking_code,
                    share_code: self.share_code.clone(),
                    alt_code: self.alt_code.clone(),
                    deadline: None,
                })
                .collect(),
            price: self.price,
            share_code: self.share_code,
            alt_code: self.alt_code,
            updated: self.updated,
        }
    }
}

/// Admin write surface for bookings.
#[allow(async_fn_in_trait)]
pub trait BookingBackend {
    async fn load_booking(&self, code: &str) -> Result<Vec<LoadedGame>>;
    async fn upload_booking(&self, request: &UploadBookingRequest) -> Result<()>;
    async fn update_games_status(
        &self,
        booking_code: &str,
        games: &[GameStatusUpdate],
    ) -> Result<()>;
}

/// Admin write surface for package availability.
#[allow(async_fn_in_trait)]
pub trait AvailabilityBackend {
    async fn fetch_plans(&self) -> Result<Vec<PlanStatus>>;
    async fn mark_sold_out(&self, plan_id: u32) -> Result<()>;
    async fn mark_available(&self, plan_id: u32) -> Result<()>;
}

pub struct BackendApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl BackendApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.client.get(self.url(path)).send().await?;
        let response = response.error_for_status()?;
        Ok(response.json::<T>().await?)
    }

    async fn post_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<()> {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        response.error_for_status()?;
        Ok(())
    }

    async fn post_empty(&self, path: &str) -> Result<()> {
        let response = self.client.post(self.url(path)).send().await?;
        response.error_for_status()?;
        Ok(())
    }

    pub async fn fetch_vip_for_today(&self) -> Result<Vec<BundlePayload>> {
        self.get_json("/vip-for-today").await
    }

    pub async fn fetch_vip_history(&self, date: NaiveDate) -> Result<Vec<BundlePayload>> {
        self.get_json(&format!("/vip-history?date={}", date.format("%Y-%m-%d")))
            .await
    }

    pub async fn fetch_free_bookings(&self) -> Result<Vec<BundlePayload>> {
        self.get_json("/free-bookings").await
    }

    pub async fn fetch_other_games(&self, date: NaiveDate) -> Result<Vec<BundlePayload>> {
        self.get_json(&format!("/other-games?date={}", date.format("%Y-%m-%d")))
            .await
    }
}

impl BookingBackend for BackendApiClient {
    async fn load_booking(&self, code: &str) -> Result<Vec<LoadedGame>> {
        let response: LoadBookingResponse =
            self.get_json(&format!("/load-booking/{}", code)).await?;
        Ok(response.games)
    }

    async fn upload_booking(&self, request: &UploadBookingRequest) -> Result<()> {
        self.post_json("/upload-booking", request).await
    }

    async fn update_games_status(
        &self,
        booking_code: &str,
        games: &[GameStatusUpdate],
    ) -> Result<()> {
        self.post_json(
            &format!("/update-games-status/{}", booking_code),
            &UpdateGamesStatusRequest { games },
        )
        .await
    }
}

impl AvailabilityBackend for BackendApiClient {
    async fn fetch_plans(&self) -> Result<Vec<PlanStatus>> {
        self.get_json("/vip-list").await
    }

    async fn mark_sold_out(&self, plan_id: u32) -> Result<()> {
        self.post_empty(&format!("/mark-sold-out/{}", plan_id)).await
    }

    async fn mark_available(&self, plan_id: u32) -> Result<()> {
        self.post_empty(&format!("/update-availability/{}", plan_id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundle_payload_normalizes_status_casing() {
        let json = r#"{
            "category": "vip1",
            "price": 20,
            "updated": true,
            "shareCode": "SC1",
            "games": [
                {"home": "Arsenal", "away": "Chelsea", "prediction": "Over 2.5 Goals", "odd": 1.85, "status": "WON"},
                {"home": "City", "away": "Napoli", "prediction": "1X", "odd": 1.4, "status": ""}
            ]
        }"#;
        let payload: BundlePayload = serde_json::from_str(json).unwrap();
        let bundle = payload.into_bundle();
        assert_eq!(bundle.category, Category::Vip1);
        assert_eq!(bundle.games[0].status, MatchStatus::Won);
        assert_eq!(bundle.games[1].status, MatchStatus::Pending);
        assert_eq!(bundle.games[0].share_code.as_deref(), Some("SC1"));
        assert_eq!(bundle.price, 20.0);
    }

    #[test]
    fn bundle_payload_tolerates_missing_optional_fields() {
        let json = r#"{"category": "free", "games": [{"home": "A", "away": "B"}]}"#;
        let payload: BundlePayload = serde_json::from_str(json).unwrap();
        let bundle = payload.into_bundle();
        assert!(!bundle.updated);
        assert_eq!(bundle.games[0].status, MatchStatus::Pending);
        assert_eq!(bundle.games[0].prediction, "");
    }

    #[test]
    fn upload_request_uses_wire_field_names() {
        let request = UploadBookingRequest {
            deadline: DateTime::parse_from_rfc3339("2026-08-01T12:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            share_code: "SC1".to_string(),
            alt_code: "MSP1".to_string(),
            category: Category::Vip2,
            price: 20.0,
            games: vec![],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("shareCode").is_some());
        assert!(json.get("altCode").is_some());
        assert_eq!(json["category"], "vip2");
    }
}
