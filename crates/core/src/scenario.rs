//! Scenario feature flags
//!
//! Field requiredness depends on what a sales scenario involves rather than on its
//! identifier. Features are computed once when a scenario is selected and passed
//! to the requirement predicates as a value.

use serde::{Deserialize, Serialize};

/// Trade-in situation of a scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeInStatus {
    #[default]
    None,
    /// Trade-in owned outright
    Paid,
    /// Trade-in with an outstanding loan
    Unpaid,
}

/// A single feature a field requirement can depend on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioFeature {
    /// Scenario includes a trade-in
    TradeIn,
    /// Trade-in still carries a loan that must be paid off
    UnpaidTrade,
}

/// Capability set of the active scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScenarioFeatures {
    pub has_trade_in: bool,
    pub trade_is_unpaid: bool,
}

impl ScenarioFeatures {
    pub fn from_trade_in(status: TradeInStatus) -> Self {
        match status {
            TradeInStatus::None => Self::default(),
            TradeInStatus::Paid => Self {
                has_trade_in: true,
                trade_is_unpaid: false,
            },
            TradeInStatus::Unpaid => Self {
                has_trade_in: true,
                trade_is_unpaid: true,
            },
        }
    }

    /// Derive features from an identifier that is not in the catalog.
    ///
    /// Follows the naming convention of catalog ids: `trade` marks a trade-in
    /// unless it appears as `no-trade`, and `unpaid` marks an outstanding loan.
    pub fn infer_from_id(scenario_id: &str) -> Self {
        let id = scenario_id.to_lowercase();
        let has_trade_in = id.contains("trade") && !id.contains("no-trade");
        Self {
            has_trade_in,
            trade_is_unpaid: has_trade_in && id.contains("unpaid"),
        }
    }

    pub fn has(&self, feature: ScenarioFeature) -> bool {
        match feature {
            ScenarioFeature::TradeIn => self.has_trade_in,
            ScenarioFeature::UnpaidTrade => self.trade_is_unpaid,
        }
    }
}
