//! Engine configuration.

use meridian_domain::ShortSellPolicy;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Cash balance every new portfolio starts with
    pub initial_cash: Decimal,
    /// Whether sells may exceed the held quantity
    pub short_selling: ShortSellPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_cash: Decimal::ZERO,
            short_selling: ShortSellPolicy::Disabled,
        }
    }
}
