//! Tracks which packages are purchasable and lets an admin flip them.
//!
//! The backend is the authority. A successful fetch always overwrites the
//! local fallback cache; the cache is only read when the live fetch fails,
//! and with no cache at all every plan defaults to unavailable.

use std::collections::HashMap;
use std::path::PathBuf;

use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::api::backend_api::AvailabilityBackend;
use crate::error::{Error, Result};
use crate::models::availability::PlanStatus;
use crate::utils::data::{load_from_cache, save_to_cache};

pub struct AvailabilityRegistry<B> {
    backend: B,
    plans: Mutex<HashMap<String, PlanStatus>>,
    cache_file: Option<PathBuf>,
}

fn plan_key(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

impl<B: AvailabilityBackend> AvailabilityRegistry<B> {
    pub fn new(backend: B, cache_file: Option<PathBuf>) -> Self {
        Self {
            backend,
            plans: Mutex::new(HashMap::new()),
            cache_file,
        }
    }

    /// Refresh from the backend, degrading to the fallback cache on failure.
    /// A read failure is never fatal here; the caller gets whatever best
    /// effort state is left.
    pub async fn refresh(&self) {
        match self.backend.fetch_plans().await {
            Ok(fetched) => {
                let mut plans = self.plans.lock().await;
                plans.clear();
                for plan in &fetched {
                    plans.insert(plan_key(&plan.name), plan.clone());
                }
                drop(plans);
                self.persist_cache(&fetched).await;
                info!("availability refreshed: {} plans", fetched.len());
            }
            Err(err) => {
                warn!("availability fetch failed, using fallback cache: {}", err);
                if let Some(path) = &self.cache_file {
                    match load_from_cache::<Vec<PlanStatus>>(path) {
                        Ok(cached) => {
                            let mut plans = self.plans.lock().await;
                            plans.clear();
                            for plan in cached {
                                plans.insert(plan_key(&plan.name), plan);
                            }
                        }
                        Err(cache_err) => {
                            // No cache either: leave the map empty so every
                            // plan reads as unavailable.
                            warn!("no usable availability cache: {}", cache_err);
                        }
                    }
                }
            }
        }
    }

    /// Flip one plan. The backend models the two directions as different
    /// operations, so each direction hits its own endpoint. Local state (and
    /// the cache) move only after the call succeeds.
    pub async fn toggle(&self, plan_name: &str) -> Result<bool> {
        let key = plan_key(plan_name);
        let (id, currently_available) = {
            let plans = self.plans.lock().await;
            let plan = plans
                .get(&key)
                .ok_or_else(|| Error::not_found(format!("no plan named {}", plan_name)))?;
            (plan.id, plan.available)
        };

        let call = if currently_available {
            self.backend.mark_sold_out(id).await
        } else {
            self.backend.mark_available(id).await
        };
        if let Err(err) = call {
            error!("toggle for {} failed, state unchanged: {}", plan_name, err);
            return Err(err);
        }

        let snapshot = {
            let mut plans = self.plans.lock().await;
            if let Some(plan) = plans.get_mut(&key) {
                plan.available = !currently_available;
            }
            let mut all: Vec<PlanStatus> = plans.values().cloned().collect();
            all.sort_by_key(|p| p.id);
            all
        };
        self.persist_cache(&snapshot).await;
        Ok(!currently_available)
    }

    pub async fn is_available(&self, plan_name: &str) -> bool {
        let plans = self.plans.lock().await;
        plans
            .get(&plan_key(plan_name))
            .map(|p| p.available)
            .unwrap_or(false)
    }

    pub async fn snapshot(&self) -> Vec<PlanStatus> {
        let plans = self.plans.lock().await;
        let mut all: Vec<PlanStatus> = plans.values().cloned().collect();
        all.sort_by_key(|p| p.id);
        all
    }

    async fn persist_cache(&self, plans: &[PlanStatus]) {
        if let Some(path) = &self.cache_file {
            if let Err(err) = save_to_cache(&plans.to_vec(), path) {
                warn!("could not write availability cache: {}", err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct FakePlansBackend {
        plans: Vec<PlanStatus>,
        fail_fetch: Arc<AtomicBool>,
        fail_toggle: Arc<AtomicBool>,
        sold_out_calls: Arc<AtomicU32>,
        available_calls: Arc<AtomicU32>,
    }

    impl AvailabilityBackend for FakePlansBackend {
        async fn fetch_plans(&self) -> Result<Vec<PlanStatus>> {
            if self.fail_fetch.load(Ordering::SeqCst) {
                return Err(Error::Timeout);
            }
            Ok(self.plans.clone())
        }

        async fn mark_sold_out(&self, _plan_id: u32) -> Result<()> {
            if self.fail_toggle.load(Ordering::SeqCst) {
                return Err(Error::Service("toggle failed".to_string()));
            }
            self.sold_out_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn mark_available(&self, _plan_id: u32) -> Result<()> {
            if self.fail_toggle.load(Ordering::SeqCst) {
                return Err(Error::Service("toggle failed".to_string()));
            }
            self.available_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn backend() -> FakePlansBackend {
        FakePlansBackend {
            plans: vec![
                PlanStatus {
                    id: 1,
                    name: "VIP1".to_string(),
                    available: true,
                },
                PlanStatus {
                    id: 2,
                    name: "VIP2".to_string(),
                    available: false,
                },
            ],
            ..Default::default()
        }
    }

    fn temp_cache(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("vip_tips_avail_{}_{}", std::process::id(), name))
    }

    #[tokio::test]
    async fn refresh_populates_from_backend() {
        let registry = AvailabilityRegistry::new(backend(), None);
        registry.refresh().await;
        assert!(registry.is_available("VIP1").await);
        assert!(registry.is_available("vip1").await);
        assert!(!registry.is_available("VIP2").await);
        assert!(!registry.is_available("VIP3").await);
    }

    #[tokio::test]
    async fn toggle_twice_returns_to_original_state() {
        let fake = backend();
        let registry = AvailabilityRegistry::new(fake.clone(), None);
        registry.refresh().await;

        assert!(!registry.toggle("VIP1").await.unwrap());
        assert!(!registry.is_available("VIP1").await);
        assert!(registry.toggle("VIP1").await.unwrap());
        assert!(registry.is_available("VIP1").await);

        // Each direction used its own endpoint.
        assert_eq!(fake.sold_out_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fake.available_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_toggle_leaves_state_untouched() {
        let fake = backend();
        let registry = AvailabilityRegistry::new(fake.clone(), None);
        registry.refresh().await;
        fake.fail_toggle.store(true, Ordering::SeqCst);

        let err = registry.toggle("VIP1").await.unwrap_err();
        assert!(err.is_retryable());
        assert!(registry.is_available("VIP1").await);
    }

    #[tokio::test]
    async fn unknown_plan_is_not_found() {
        let registry = AvailabilityRegistry::new(backend(), None);
        registry.refresh().await;
        assert!(matches!(
            registry.toggle("VIP9").await.unwrap_err(),
            Error::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn fetch_failure_falls_back_to_cache() {
        let cache = temp_cache("fallback.json");
        let fake = backend();

        // First process: live fetch succeeds and seeds the cache.
        {
            let registry = AvailabilityRegistry::new(fake.clone(), Some(cache.clone()));
            registry.refresh().await;
        }

        // Second process: live fetch fails; the cache carries the day.
        fake.fail_fetch.store(true, Ordering::SeqCst);
        let registry = AvailabilityRegistry::new(fake.clone(), Some(cache.clone()));
        registry.refresh().await;
        assert!(registry.is_available("VIP1").await);
        assert!(!registry.is_available("VIP2").await);

        let _ = std::fs::remove_file(cache);
    }

    #[tokio::test]
    async fn fetch_failure_without_cache_defaults_to_unavailable() {
        let fake = backend();
        fake.fail_fetch.store(true, Ordering::SeqCst);
        let registry = AvailabilityRegistry::new(fake, Some(temp_cache("absent.json")));
        registry.refresh().await;
        assert!(!registry.is_available("VIP1").await);
        assert!(!registry.is_available("VIP2").await);
    }

    #[tokio::test]
    async fn live_fetch_overwrites_stale_cache() {
        let cache = temp_cache("stale.json");
        // Stale cache claims VIP2 is available.
        save_to_cache(
            &vec![PlanStatus {
                id: 2,
                name: "VIP2".to_string(),
                available: true,
            }],
            &cache,
        )
        .unwrap();

        let registry = AvailabilityRegistry::new(backend(), Some(cache.clone()));
        registry.refresh().await;
        // Live data wins over the cached claim.
        assert!(!registry.is_available("VIP2").await);
        let reloaded: Vec<PlanStatus> = load_from_cache(&cache).unwrap();
        assert_eq!(reloaded.len(), 2);

        let _ = std::fs::remove_file(cache);
    }
}
