use serde::{Deserialize, Serialize};

/// One purchasable plan as reported by the backend's VIP list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStatus {
    /// Numeric identifier used by the toggle endpoints.
    pub id: u32,
    pub name: String,
    pub available: bool,
}
