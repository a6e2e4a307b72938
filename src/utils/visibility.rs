//! Decides which fields of a bundle each viewer may see.
//!
//! The pick itself is the paid product, so the public preview never shows a
//! prediction for a game that has not settled. Settled legs are public
//! record and safe to disclose. The whole policy is pure; callers feed it
//! bundles fetched elsewhere.

use serde::Serialize;

use crate::models::bundle::PackageBundle;
use crate::models::game::{GameRecord, MatchStatus};
use crate::models::session::Entitlement;

/// How much of a single game is exposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Detail {
    MatchNameOnly,
    FullDetail,
}

/// Result marker, computed from the game's status alone, independent of the
/// detail-gating decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResultGlyph {
    Won,
    Lost,
    Unknown,
}

impl ResultGlyph {
    pub fn from_status(status: MatchStatus) -> ResultGlyph {
        match status {
            MatchStatus::Won => ResultGlyph::Won,
            MatchStatus::Lost => ResultGlyph::Lost,
            MatchStatus::Pending => ResultGlyph::Unknown,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            ResultGlyph::Won => "\u{2713}",
            ResultGlyph::Lost => "\u{2717}",
            ResultGlyph::Unknown => "?",
        }
    }
}

/// Gating state of a whole bundle, evaluated once and reused per game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundlePhase {
    /// Admin has not finalized detail visibility; nothing beyond team names
    /// is shown, not even to purchasers.
    Unfinalized,
    /// Every game still pending: picks stay hidden on the public preview.
    AllPending,
    /// At least one game settled: settled legs are disclosed, pending legs
    /// stay name-only so the live pick cannot be inferred.
    AnySettled,
    /// Ambiguous leftover state; disclose everything.
    Mixed,
}

pub fn bundle_phase(bundle: &PackageBundle) -> BundlePhase {
    if !bundle.updated {
        BundlePhase::Unfinalized
    } else if bundle.all_pending() {
        BundlePhase::AllPending
    } else if bundle.any_settled() {
        BundlePhase::AnySettled
    } else {
        BundlePhase::Mixed
    }
}

/// Per-game render decision handed to the page layer.
#[derive(Debug, Clone, Serialize)]
pub struct GameView {
    pub fixture: String,
    pub detail: Detail,
    pub glyph: ResultGlyph,
    pub prediction: Option<String>,
    pub odds: Option<f64>,
}

impl GameView {
    fn name_only(game: &GameRecord) -> GameView {
        GameView {
            fixture: game.fixture(),
            detail: Detail::MatchNameOnly,
            glyph: ResultGlyph::from_status(game.status),
            prediction: None,
            odds: None,
        }
    }

    fn full(game: &GameRecord) -> GameView {
        GameView {
            fixture: game.fixture(),
            detail: Detail::FullDetail,
            glyph: ResultGlyph::from_status(game.status),
            prediction: Some(game.prediction.clone()),
            odds: Some(game.odds),
        }
    }

    pub fn is_full_detail(&self) -> bool {
        self.detail == Detail::FullDetail
    }

    pub fn glyph_symbol(&self) -> &'static str {
        self.glyph.symbol()
    }

    // Template helpers.
    pub fn prediction_text(&self) -> &str {
        self.prediction.as_deref().unwrap_or("")
    }

    pub fn odds_text(&self) -> String {
        self.odds.map(|o| format!("{:.2}", o)).unwrap_or_default()
    }
}

/// Render every game of a bundle for the given viewer.
pub fn render_bundle(bundle: &PackageBundle, entitlement: Entitlement) -> Vec<GameView> {
    let phase = bundle_phase(bundle);

    // A purchaser's private view shows the full bundle, but only once the
    // admin has finalized it.
    if entitlement == Entitlement::Purchaser && phase != BundlePhase::Unfinalized {
        return bundle.games.iter().map(GameView::full).collect();
    }

    bundle
        .games
        .iter()
        .map(|game| match phase {
            BundlePhase::Unfinalized | BundlePhase::AllPending => GameView::name_only(game),
            BundlePhase::AnySettled => {
                if game.status.is_settled() {
                    GameView::full(game)
                } else {
                    GameView::name_only(game)
                }
            }
            BundlePhase::Mixed => GameView::full(game),
        })
        .collect()
}

/// What the purchase control should show, decided separately from detail
/// gating.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PurchaseAffordance {
    SoldOut,
    NotAvailable,
    NoMatches,
    ResultsUploaded,
    Buy(f64),
}

impl PurchaseAffordance {
    pub fn label(&self) -> String {
        match self {
            PurchaseAffordance::SoldOut => "SOLD OUT".to_string(),
            PurchaseAffordance::NotAvailable => "NOT AVAILABLE".to_string(),
            PurchaseAffordance::NoMatches => "No matches available".to_string(),
            PurchaseAffordance::ResultsUploaded => "RESULTS UPLOADED".to_string(),
            PurchaseAffordance::Buy(price) => format!("Buy for {:.2}", price),
        }
    }

    pub fn purchasable(&self) -> bool {
        matches!(self, PurchaseAffordance::Buy(_))
    }
}

/// Precedence: availability flag, then missing bundle, then the empty
/// bundle edge, then staleness, then the live price.
pub fn purchase_affordance(available: bool, bundle: Option<&PackageBundle>) -> PurchaseAffordance {
    if !available {
        return PurchaseAffordance::SoldOut;
    }
    let bundle = match bundle {
        Some(b) => b,
        None => return PurchaseAffordance::NotAvailable,
    };
    if bundle.is_empty() {
        PurchaseAffordance::NoMatches
    } else if bundle.any_settled() {
        PurchaseAffordance::ResultsUploaded
    } else {
        PurchaseAffordance::Buy(bundle.price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::bundle::Category;

    fn game(home: &str, away: &str, status: MatchStatus) -> GameRecord {
        GameRecord {
            id: format!("vip1-0-{}", home.len()),
            category: Category::Vip1,
            home_team: home.to_string(),
            away_team: away.to_string(),
            prediction: "Over 2.5 Goals".to_string(),
            odds: 1.85,
            status,
            booking_code: "ABC123".to_string(),
            share_code: None,
            alt_code: None,
            deadline: None,
        }
    }

    fn bundle(updated: bool, statuses: &[MatchStatus]) -> PackageBundle {
        let teams = [
            ("Arsenal", "Chelsea"),
            ("City", "Napoli"),
            ("Inter", "Porto"),
        ];
        PackageBundle {
            category: Category::Vip1,
            games: statuses
                .iter()
                .zip(teams.iter())
                .map(|(status, (h, a))| game(h, a, *status))
                .collect(),
            price: 20.0,
            share_code: None,
            alt_code: None,
            updated,
        }
    }

    #[test]
    fn unfinalized_bundle_hides_everything_regardless_of_status() {
        let b = bundle(false, &[MatchStatus::Won, MatchStatus::Pending]);
        for view in render_bundle(&b, Entitlement::Visitor) {
            assert_eq!(view.detail, Detail::MatchNameOnly);
            assert!(view.prediction.is_none());
            assert!(view.odds.is_none());
        }
        // Not even purchasers see an unfinalized batch.
        for view in render_bundle(&b, Entitlement::Purchaser) {
            assert_eq!(view.detail, Detail::MatchNameOnly);
        }
    }

    #[test]
    fn all_pending_bundle_shows_names_only() {
        let b = bundle(true, &[MatchStatus::Pending, MatchStatus::Pending]);
        for view in render_bundle(&b, Entitlement::Visitor) {
            assert_eq!(view.detail, Detail::MatchNameOnly);
            assert!(view.prediction.is_none());
        }
    }

    #[test]
    fn partially_settled_bundle_discloses_only_settled_legs() {
        let b = bundle(true, &[MatchStatus::Pending, MatchStatus::Won]);
        let views = render_bundle(&b, Entitlement::Visitor);

        assert_eq!(views[0].detail, Detail::MatchNameOnly);
        assert_eq!(views[0].glyph, ResultGlyph::Unknown);
        assert_eq!(views[0].glyph_symbol(), "?");
        assert!(views[0].prediction.is_none());

        assert_eq!(views[1].detail, Detail::FullDetail);
        assert_eq!(views[1].glyph, ResultGlyph::Won);
        assert_eq!(views[1].prediction.as_deref(), Some("Over 2.5 Goals"));
        assert_eq!(views[1].odds, Some(1.85));
    }

    #[test]
    fn glyph_tracks_status_even_when_detail_is_gated() {
        let b = bundle(true, &[MatchStatus::Lost, MatchStatus::Pending]);
        let views = render_bundle(&b, Entitlement::Visitor);
        assert_eq!(views[0].glyph, ResultGlyph::Lost);
        assert_eq!(views[1].glyph, ResultGlyph::Unknown);
    }

    #[test]
    fn purchaser_sees_full_detail_before_kickoff() {
        let b = bundle(true, &[MatchStatus::Pending, MatchStatus::Pending]);
        for view in render_bundle(&b, Entitlement::Purchaser) {
            assert_eq!(view.detail, Detail::FullDetail);
            assert!(view.prediction.is_some());
        }
    }

    #[test]
    fn scenario_pending_pair_then_one_settles() {
        // Both pending: names only, price shown.
        let b = bundle(true, &[MatchStatus::Pending, MatchStatus::Pending]);
        for view in render_bundle(&b, Entitlement::Visitor) {
            assert_eq!(view.detail, Detail::MatchNameOnly);
        }
        assert_eq!(
            purchase_affordance(true, Some(&b)),
            PurchaseAffordance::Buy(20.0)
        );

        // Second game settles: first stays gated with "?", checkout closes.
        let b = bundle(true, &[MatchStatus::Pending, MatchStatus::Won]);
        let views = render_bundle(&b, Entitlement::Visitor);
        assert_eq!(views[0].detail, Detail::MatchNameOnly);
        assert_eq!(views[0].glyph_symbol(), "?");
        assert_eq!(views[1].detail, Detail::FullDetail);
        assert_eq!(views[1].glyph_symbol(), "\u{2713}");
        assert_eq!(
            purchase_affordance(true, Some(&b)),
            PurchaseAffordance::ResultsUploaded
        );
    }

    #[test]
    fn affordance_precedence() {
        let settled = bundle(true, &[MatchStatus::Won]);
        // Sold-out wins over everything else.
        assert_eq!(
            purchase_affordance(false, Some(&settled)),
            PurchaseAffordance::SoldOut
        );
        assert_eq!(purchase_affordance(true, None), PurchaseAffordance::NotAvailable);

        let empty = bundle(true, &[]);
        assert_eq!(
            purchase_affordance(true, Some(&empty)),
            PurchaseAffordance::NoMatches
        );
        assert!(!purchase_affordance(true, Some(&empty)).purchasable());
    }

    #[test]
    fn empty_bundle_renders_no_views() {
        let b = bundle(true, &[]);
        assert!(render_bundle(&b, Entitlement::Visitor).is_empty());
    }
}
