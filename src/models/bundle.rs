use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};
use crate::models::game::GameRecord;

/// Package a bundle of games is sold under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Free,
    Vip1,
    Vip2,
    Vip3,
    Slips,
}

pub const ALL_CATEGORIES: [Category; 5] = [
    Category::Free,
    Category::Vip1,
    Category::Vip2,
    Category::Vip3,
    Category::Slips,
];

impl Category {
    /// Lowercase wire name, matching what the backend stores.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Free => "free",
            Category::Vip1 => "vip1",
            Category::Vip2 => "vip2",
            Category::Vip3 => "vip3",
            Category::Slips => "slips",
        }
    }

    /// Display name as shown on the site.
    pub fn display_name(&self) -> &'static str {
        match self {
            Category::Free => "Free",
            Category::Vip1 => "VIP1",
            Category::Vip2 => "VIP2",
            Category::Vip3 => "VIP3",
            Category::Slips => "Slips",
        }
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(Category::Free),
            "vip1" => Ok(Category::Vip1),
            "vip2" => Ok(Category::Vip2),
            "vip3" => Ok(Category::Vip3),
            "slips" => Ok(Category::Slips),
            other => Err(Error::validation(format!(
                "unknown category '{}': expected free, vip1, vip2, vip3 or slips",
                other
            ))),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

// Case-insensitive on ingress; an unknown name is a malformed payload, not
// a silent default.
impl<'de> Deserialize<'de> for Category {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A priced, named group of games sold as one unit.
///
/// `updated` is the admin's finalization flag: until it is set, viewers (and
/// purchasers) see team names only, with no predictions or odds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageBundle {
    pub category: Category,
    /// Insertion order is display order.
    pub games: Vec<GameRecord>,
    pub price: f64,
    pub share_code: Option<String>,
    pub alt_code: Option<String>,
    pub updated: bool,
}

impl PackageBundle {
    pub fn all_pending(&self) -> bool {
        self.games.iter().all(|g| !g.status.is_settled())
    }

    pub fn any_settled(&self) -> bool {
        self.games.iter().any(|g| g.status.is_settled())
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parse_is_case_insensitive() {
        assert_eq!("VIP1".parse::<Category>().unwrap(), Category::Vip1);
        assert_eq!(" free ".parse::<Category>().unwrap(), Category::Free);
        assert!("vip4".parse::<Category>().is_err());
    }

    #[test]
    fn category_wire_name_round_trips() {
        let cat: Category = serde_json::from_str("\"vip2\"").unwrap();
        assert_eq!(cat, Category::Vip2);
        assert_eq!(serde_json::to_string(&cat).unwrap(), "\"vip2\"");
        // Ingress tolerates the casing the backend actually stores.
        let upper: Category = serde_json::from_str("\"VIP2\"").unwrap();
        assert_eq!(upper, Category::Vip2);
        assert!(serde_json::from_str::<Category>("\"vip9\"").is_err());
    }
}
