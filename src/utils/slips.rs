//! Groups uploaded games into slips for the admin's aggregate view.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::game::GameRecord;

/// A batch of games sharing one upload deadline.
#[derive(Debug, Clone, Serialize)]
pub struct Slip {
    pub deadline: DateTime<Utc>,
    pub booking_code: String,
    pub games: Vec<GameRecord>,
}

impl Slip {
    /// Key used for archiving; one slip = one timestamp bucket.
    pub fn key(&self) -> i64 {
        self.deadline.timestamp_millis()
    }

    pub fn format(&self) -> String {
        format!(
            "{} [{}] {} games",
            self.deadline.format("%Y-%m-%d %H:%M"),
            self.booking_code,
            self.games.len()
        )
    }
}

/// Bucket games by deadline timestamp, keeping first-seen order. Slips whose
/// key is in `archived` are excluded from the active list (the underlying
/// games are untouched). Games without a deadline never made it through an
/// upload and are skipped.
pub fn group_into_slips(games: &[GameRecord], archived: &HashSet<i64>) -> Vec<Slip> {
    let mut slips: Vec<Slip> = Vec::new();
    for game in games {
        let deadline = match game.deadline {
            Some(d) => d,
            None => continue,
        };
        let key = deadline.timestamp_millis();
        if archived.contains(&key) {
            continue;
        }
        match slips.iter_mut().find(|s| s.key() == key) {
            Some(slip) => slip.games.push(game.clone()),
            None => slips.push(Slip {
                deadline,
                booking_code: game.booking_code.clone(),
                games: vec![game.clone()],
            }),
        }
    }
    slips
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::bundle::Category;
    use crate::models::game::MatchStatus;
    use chrono::TimeZone;

    fn game(id: &str, code: &str, deadline_ms: Option<i64>) -> GameRecord {
        GameRecord {
            id: id.to_string(),
            category: Category::Vip1,
            home_team: "Home".to_string(),
            away_team: "Away".to_string(),
            prediction: "1X".to_string(),
            odds: 1.5,
            status: MatchStatus::Pending,
            booking_code: code.to_string(),
            share_code: None,
            alt_code: None,
            deadline: deadline_ms.map(|ms| Utc.timestamp_millis_opt(ms).unwrap()),
        }
    }

    #[test]
    fn groups_by_deadline_in_first_seen_order() {
        let games = vec![
            game("a", "B1", Some(2_000)),
            game("b", "B2", Some(1_000)),
            game("c", "B1", Some(2_000)),
        ];
        let slips = group_into_slips(&games, &HashSet::new());
        assert_eq!(slips.len(), 2);
        assert_eq!(slips[0].key(), 2_000);
        assert_eq!(slips[0].games.len(), 2);
        assert_eq!(slips[1].key(), 1_000);
    }

    #[test]
    fn archived_slips_are_excluded_not_deleted() {
        let games = vec![game("a", "B1", Some(1_000)), game("b", "B2", Some(2_000))];
        let archived: HashSet<i64> = [1_000].into_iter().collect();
        let slips = group_into_slips(&games, &archived);
        assert_eq!(slips.len(), 1);
        assert_eq!(slips[0].key(), 2_000);
        // Source list untouched.
        assert_eq!(games.len(), 2);
    }

    #[test]
    fn games_without_deadline_are_skipped() {
        let games = vec![game("a", "B1", None)];
        assert!(group_into_slips(&games, &HashSet::new()).is_empty());
    }
}
