//! Admin-side assembly of game batches into uploadable bookings.
//!
//! One draft batch per category at a time. Drafts survive a failed upload
//! untouched so the admin can retry without re-entering anything, and every
//! backend mutation for a category goes through a per-category gate: a
//! second submission while one is outstanding is rejected instead of racing
//! the first.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{error, info};

use crate::api::backend_api::{
    BookingBackend, GameStatusUpdate, UploadBookingRequest, UploadGame,
};
use crate::error::{Error, Result};
use crate::models::bundle::Category;
use crate::models::game::{GameRecord, MatchStatus};
use crate::utils::slips::{group_into_slips, Slip};

/// An in-progress batch for one category.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DraftBatch {
    pub booking_code: String,
    pub games: Vec<GameRecord>,
    pub share_code: Option<String>,
    pub alt_code: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
}

/// Everything the assembler tracks; serialized as-is so the admin CLI can
/// persist it between invocations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssemblerState {
    pub drafts: HashMap<Category, DraftBatch>,
    /// Prices are per category, not per game.
    pub prices: HashMap<Category, f64>,
    /// Games from confirmed uploads; slips group over these.
    pub history: Vec<GameRecord>,
    /// Slip keys the admin has archived. The games stay in `history`.
    pub archived: HashSet<i64>,
}

pub struct BookingAssembler<B> {
    backend: B,
    state: Mutex<AssemblerState>,
    gates: Mutex<HashMap<Category, Arc<Mutex<()>>>>,
}

impl<B: BookingBackend> BookingAssembler<B> {
    pub fn new(backend: B) -> Self {
        Self::with_state(backend, AssemblerState::default())
    }

    pub fn with_state(backend: B, state: AssemblerState) -> Self {
        Self {
            backend,
            state: Mutex::new(state),
            gates: Mutex::new(HashMap::new()),
        }
    }

    pub async fn state_snapshot(&self) -> AssemblerState {
        self.state.lock().await.clone()
    }

    async fn acquire_gate(&self, category: Category) -> Result<OwnedMutexGuard<()>> {
        let gate = {
            let mut gates = self.gates.lock().await;
            gates
                .entry(category)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        gate.try_lock_owned()
            .map_err(|_| Error::InFlight(category.display_name().to_string()))
    }

    /// Pull a batch of games from the odds platform by booking code.
    ///
    /// One active batch per category: loading over an existing draft is
    /// rejected. Game ids are synthetic (`{category}-{millis}-{index}`) and
    /// per-session only.
    pub async fn load_by_code(&self, category: Category, code: &str) -> Result<Vec<GameRecord>> {
        let code = code.trim();
        if code.is_empty() {
            return Err(Error::validation("booking code is required"));
        }
        let _gate = self.acquire_gate(category).await?;
        {
            let state = self.state.lock().await;
            if state.drafts.contains_key(&category) {
                return Err(Error::validation(format!(
                    "{} already has a batch loaded; upload or clear it first",
                    category
                )));
            }
        }

        let loaded = self.backend.load_booking(code).await?;
        let millis = Utc::now().timestamp_millis();
        let games: Vec<GameRecord> = loaded
            .into_iter()
            .enumerate()
            .map(|(index, g)| GameRecord {
                id: format!("{}-{}-{}", category.as_str(), millis, index),
                category,
                home_team: g.home,
                away_team: g.away,
                prediction: g.prediction,
                odds: g.odd,
                status: MatchStatus::Pending,
                booking_code: code.to_string(),
                share_code: None,
                alt_code: None,
                deadline: None,
            })
            .collect();
        info!("loaded {} games for {} from code {}", games.len(), category, code);

        let mut state = self.state.lock().await;
        state.drafts.insert(
            category,
            DraftBatch {
                booking_code: code.to_string(),
                games: games.clone(),
                share_code: None,
                alt_code: None,
                deadline: None,
            },
        );
        Ok(games)
    }

    /// Stamp the draft with the share code and the alternate-platform code.
    /// Both are required; nothing is mutated on a blank code.
    pub async fn attach_codes(
        &self,
        category: Category,
        primary: &str,
        secondary: &str,
    ) -> Result<()> {
        if primary.trim().is_empty() || secondary.trim().is_empty() {
            return Err(Error::validation("both share codes are required"));
        }
        let mut state = self.state.lock().await;
        let draft = state
            .drafts
            .get_mut(&category)
            .ok_or_else(|| Error::not_found(format!("no batch loaded for {}", category)))?;
        draft.share_code = Some(primary.trim().to_string());
        draft.alt_code = Some(secondary.trim().to_string());
        for game in &mut draft.games {
            game.share_code = draft.share_code.clone();
            game.alt_code = draft.alt_code.clone();
        }
        Ok(())
    }

    pub async fn set_price(&self, category: Category, price: &str) -> Result<f64> {
        let trimmed = price.trim();
        if trimmed.is_empty() {
            return Err(Error::validation("price is required"));
        }
        let value: f64 = trimmed
            .parse()
            .map_err(|_| Error::validation(format!("'{}' is not a valid price", trimmed)))?;
        if value < 0.0 {
            return Err(Error::validation("price cannot be negative"));
        }
        self.state.lock().await.prices.insert(category, value);
        Ok(value)
    }

    pub async fn price_of(&self, category: Category) -> Option<f64> {
        self.state.lock().await.prices.get(&category).copied()
    }

    pub async fn set_deadline(&self, category: Category, deadline: DateTime<Utc>) -> Result<()> {
        let mut state = self.state.lock().await;
        let draft = state
            .drafts
            .get_mut(&category)
            .ok_or_else(|| Error::not_found(format!("no batch loaded for {}", category)))?;
        draft.deadline = Some(deadline);
        Ok(())
    }

    pub async fn remove_game(&self, category: Category, game_id: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        let draft = state
            .drafts
            .get_mut(&category)
            .ok_or_else(|| Error::not_found(format!("no batch loaded for {}", category)))?;
        let before = draft.games.len();
        draft.games.retain(|g| g.id != game_id);
        if draft.games.len() == before {
            return Err(Error::not_found(format!(
                "no game {} in the {} batch",
                game_id, category
            )));
        }
        Ok(())
    }

    /// Reset every category's draft, all prices and the whole history.
    /// Destructive; any confirmation prompt lives with the caller.
    pub async fn clear_all(&self) {
        *self.state.lock().await = AssemblerState::default();
        info!("cleared all drafts and history");
    }

    /// Serialize the draft to the backend. The draft clears (and enters the
    /// slip history) only on confirmed success; any failure leaves it intact
    /// for retry.
    pub async fn upload(&self, category: Category) -> Result<usize> {
        let _gate = self.acquire_gate(category).await?;
        let (request, deadline) = {
            let state = self.state.lock().await;
            let draft = state
                .drafts
                .get(&category)
                .filter(|d| !d.games.is_empty())
                .ok_or_else(|| Error::not_found(format!("no games loaded for {}", category)))?;
            let price = state
                .prices
                .get(&category)
                .copied()
                .ok_or_else(|| Error::validation(format!("no price set for {}", category)))?;
            let deadline = draft.deadline.unwrap_or_else(Utc::now);
            let request = UploadBookingRequest {
                deadline,
                share_code: draft.share_code.clone().unwrap_or_default(),
                alt_code: draft.alt_code.clone().unwrap_or_default(),
                category,
                price,
                games: draft
                    .games
                    .iter()
                    .map(|g| UploadGame {
                        id: g.id.clone(),
                        home: g.home_team.clone(),
                        away: g.away_team.clone(),
                        prediction: g.prediction.clone(),
                        odd: g.odds,
                    })
                    .collect(),
            };
            (request, deadline)
        };

        if let Err(err) = self.backend.upload_booking(&request).await {
            error!("upload for {} failed, draft kept for retry: {}", category, err);
            return Err(err);
        }

        let count = request.games.len();
        let mut state = self.state.lock().await;
        if let Some(mut draft) = state.drafts.remove(&category) {
            for game in &mut draft.games {
                game.deadline = Some(deadline);
            }
            state.history.extend(draft.games);
        }
        info!("uploaded {} games for {}", count, category);
        Ok(count)
    }

    /// Apply a result to one uploaded game, then push the full status set of
    /// every game in the same booking (the external API settles a booking
    /// atomically). The local change is reverted if the push fails.
    pub async fn update_game_result(&self, game_id: &str, result: MatchStatus) -> Result<()> {
        let category = {
            let state = self.state.lock().await;
            state
                .history
                .iter()
                .find(|g| g.id == game_id)
                .map(|g| g.category)
                .ok_or_else(|| Error::not_found(format!("no uploaded game with id {}", game_id)))?
        };
        let _gate = self.acquire_gate(category).await?;

        let (booking_code, previous, updates) = {
            let mut state = self.state.lock().await;
            let previous;
            let booking_code;
            {
                let game = state
                    .history
                    .iter_mut()
                    .find(|g| g.id == game_id)
                    .ok_or_else(|| {
                        Error::not_found(format!("no uploaded game with id {}", game_id))
                    })?;
                previous = game.status;
                game.settle(result)?;
                booking_code = game.booking_code.clone();
            }
            let updates: Vec<GameStatusUpdate> = state
                .history
                .iter()
                .filter(|g| g.booking_code == booking_code)
                .map(|g| GameStatusUpdate {
                    id: g.id.clone(),
                    status: g.status,
                })
                .collect();
            (booking_code, previous, updates)
        };

        if let Err(err) = self
            .backend
            .update_games_status(&booking_code, &updates)
            .await
        {
            // Roll the optimistic update back.
            let mut state = self.state.lock().await;
            if let Some(game) = state.history.iter_mut().find(|g| g.id == game_id) {
                game.status = previous;
            }
            error!(
                "status push for booking {} failed, local result reverted: {}",
                booking_code, err
            );
            return Err(err);
        }
        Ok(())
    }

    /// Slips that have not been archived, in first-seen order.
    pub async fn active_slips(&self) -> Vec<Slip> {
        let state = self.state.lock().await;
        group_into_slips(&state.history, &state.archived)
    }

    /// Hide a slip from the active list without deleting its games.
    pub async fn archive_slip(&self, key: i64) -> Result<()> {
        let mut state = self.state.lock().await;
        let exists = state
            .history
            .iter()
            .any(|g| g.deadline.map(|d| d.timestamp_millis()) == Some(key));
        if !exists {
            return Err(Error::not_found(format!("no slip with key {}", key)));
        }
        state.archived.insert(key);
        Ok(())
    }

    pub async fn drafts(&self) -> HashMap<Category, DraftBatch> {
        self.state.lock().await.drafts.clone()
    }
}
