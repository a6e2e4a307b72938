use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::models::bundle::Category;

/// What a viewer is allowed to see for a given bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Entitlement {
    /// Public preview only.
    Visitor,
    /// Verified purchaser of the bundle's package.
    Purchaser,
}

/// Explicit per-viewer session state.
///
/// Entitlements are granted through `api::payment_api::confirm_purchase`
/// after server-side verification succeeds; nothing here is persisted
/// client-side.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    entitlements: HashSet<Category>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_entitled(&self, category: Category) -> bool {
        // Free tips are the public teaser; everyone is entitled to them.
        category == Category::Free || self.entitlements.contains(&category)
    }

    pub fn entitlement(&self, category: Category) -> Entitlement {
        if self.is_entitled(category) {
            Entitlement::Purchaser
        } else {
            Entitlement::Visitor
        }
    }

    pub(crate) fn grant(&mut self, category: Category) {
        self.entitlements.insert(category);
    }
}
