pub mod admin;
pub mod api;
pub mod error;
pub mod models;
pub mod utils;

pub use admin::*;
pub use api::*;
pub use error::{Error, Result};
pub use models::*;
pub use utils::*;

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::warn;

use api::backend_api::{AvailabilityBackend, BackendApiClient, BundlePayload};
use models::availability::PlanStatus;
use models::bundle::{Category, PackageBundle, ALL_CATEGORIES};
use models::session::Session;
use utils::data::{load_from_cache, save_to_cache};
use utils::visibility::{purchase_affordance, render_bundle, GameView, PurchaseAffordance};

/// One package as the viewer pages render it.
#[derive(Debug, Clone, Serialize)]
pub struct ViewerPackage {
    pub category: Category,
    pub title: String,
    pub views: Vec<GameView>,
    pub affordance: PurchaseAffordance,
}

impl ViewerPackage {
    pub fn affordance_label(&self) -> String {
        // Free tips are a teaser, not a product.
        if self.category == Category::Free {
            "FREE".to_string()
        } else {
            self.affordance.label()
        }
    }

    pub fn has_games(&self) -> bool {
        !self.views.is_empty()
    }
}

/// All the data the viewer page needs.
#[derive(Debug, Clone, Serialize)]
pub struct ViewerData {
    pub packages: Vec<ViewerPackage>,
    pub fetched_at: DateTime<Utc>,
}

fn render_package(
    category: Category,
    bundle: Option<&PackageBundle>,
    available: bool,
    session: &Session,
) -> ViewerPackage {
    ViewerPackage {
        category,
        title: category.display_name().to_string(),
        views: bundle
            .map(|b| render_bundle(b, session.entitlement(category)))
            .unwrap_or_default(),
        affordance: purchase_affordance(available, bundle),
    }
}

/// Fetch everything the public viewer page shows.
///
/// Read failures never surface: bundles fall back to the JSON cache (or
/// empty), availability falls back to its cache (or default-unavailable),
/// and the page renders whatever is left.
pub async fn fetch_viewer_data(backend: &BackendApiClient, cache_dir: &Path) -> ViewerData {
    let bundles_cache = cache_dir.join("bundles_cache.json");
    let availability_cache = cache_dir.join("availability_cache.json");

    let mut bundles: Vec<PackageBundle> = Vec::new();
    let mut degraded = false;
    match backend.fetch_vip_for_today().await {
        Ok(payloads) => bundles.extend(payloads.into_iter().map(BundlePayload::into_bundle)),
        Err(err) => {
            warn!("vip-for-today fetch failed: {}", err);
            degraded = true;
        }
    }
    match backend.fetch_free_bookings().await {
        Ok(payloads) => bundles.extend(payloads.into_iter().map(BundlePayload::into_bundle)),
        Err(err) => {
            warn!("free-bookings fetch failed: {}", err);
            degraded = true;
        }
    }
    if !degraded {
        if let Err(err) = save_to_cache(&bundles, &bundles_cache) {
            warn!("could not write bundle cache: {}", err);
        }
    } else if bundles.is_empty() {
        match load_from_cache::<Vec<PackageBundle>>(&bundles_cache) {
            Ok(cached) => bundles = cached,
            Err(err) => warn!("no usable bundle cache: {}", err),
        }
    }

    let availability: HashMap<String, bool> = match backend.fetch_plans().await {
        Ok(plans) => {
            if let Err(err) = save_to_cache(&plans, &availability_cache) {
                warn!("could not write availability cache: {}", err);
            }
            plans
                .into_iter()
                .map(|p| (p.name.to_ascii_lowercase(), p.available))
                .collect()
        }
        Err(err) => {
            warn!("availability fetch failed, trying cache: {}", err);
            match load_from_cache::<Vec<PlanStatus>>(&availability_cache) {
                Ok(cached) => cached
                    .into_iter()
                    .map(|p| (p.name.to_ascii_lowercase(), p.available))
                    .collect(),
                // No cache either: every plan reads as unavailable.
                Err(_) => HashMap::new(),
            }
        }
    };

    let session = Session::new();
    let packages = ALL_CATEGORIES
        .iter()
        .map(|&category| {
            let bundle = bundles.iter().find(|b| b.category == category);
            let available = category == Category::Free
                || availability
                    .get(category.as_str())
                    .copied()
                    .unwrap_or(false);
            render_package(category, bundle, available, &session)
        })
        .collect();

    ViewerData {
        packages,
        fetched_at: Utc::now(),
    }
}

/// Settled bundles for a past date. History is public record, so a read
/// failure just renders an empty page.
pub async fn fetch_history_data(backend: &BackendApiClient, date: NaiveDate) -> Vec<ViewerPackage> {
    let session = Session::new();
    match backend.fetch_vip_history(date).await {
        Ok(payloads) => payloads
            .into_iter()
            .map(|payload| {
                let bundle = payload.into_bundle();
                render_package(bundle.category, Some(&bundle), true, &session)
            })
            .collect(),
        Err(err) => {
            warn!("vip-history fetch failed for {}: {}", date, err);
            Vec::new()
        }
    }
}

/// Non-VIP games for a date, same degrade path as history.
pub async fn fetch_other_games_data(
    backend: &BackendApiClient,
    date: NaiveDate,
) -> Vec<ViewerPackage> {
    let session = Session::new();
    match backend.fetch_other_games(date).await {
        Ok(payloads) => payloads
            .into_iter()
            .map(|payload| {
                let bundle = payload.into_bundle();
                render_package(bundle.category, Some(&bundle), true, &session)
            })
            .collect(),
        Err(err) => {
            warn!("other-games fetch failed for {}: {}", date, err);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::game::{GameRecord, MatchStatus};

    fn bundle(category: Category, updated: bool, statuses: &[MatchStatus]) -> PackageBundle {
        PackageBundle {
            category,
            games: statuses
                .iter()
                .enumerate()
                .map(|(i, status)| GameRecord {
                    id: format!("{}-0-{}", category.as_str(), i),
                    category,
                    home_team: format!("Home{}", i),
                    away_team: format!("Away{}", i),
                    prediction: "Over 2.5 Goals".to_string(),
                    odds: 1.85,
                    status: *status,
                    booking_code: "ABC".to_string(),
                    share_code: None,
                    alt_code: None,
                    deadline: None,
                })
                .collect(),
            price: 20.0,
            share_code: None,
            alt_code: None,
            updated,
        }
    }

    #[test]
    fn free_package_label_is_free() {
        let b = bundle(Category::Free, true, &[MatchStatus::Pending]);
        let package = render_package(Category::Free, Some(&b), true, &Session::new());
        assert_eq!(package.affordance_label(), "FREE");
        // Everyone is entitled to the free teaser.
        assert!(package.views[0].is_full_detail());
    }

    #[test]
    fn paid_package_renders_gated_for_visitors() {
        let b = bundle(Category::Vip1, true, &[MatchStatus::Pending]);
        let package = render_package(Category::Vip1, Some(&b), true, &Session::new());
        assert!(!package.views[0].is_full_detail());
        assert_eq!(package.affordance_label(), "Buy for 20.00");
    }

    #[test]
    fn missing_bundle_is_not_available() {
        let package = render_package(Category::Vip3, None, true, &Session::new());
        assert!(!package.has_games());
        assert_eq!(package.affordance, PurchaseAffordance::NotAvailable);
    }
}
