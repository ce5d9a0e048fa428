//! Scenario resolution
//!
//! Turns a scenario id into its name, feature flags and required documents.
//! Ids missing from the catalog still resolve: features are inferred from the id
//! and no documents are required.

use dealer_assist_config::DealerDomainConfig;
use dealer_assist_core::ScenarioFeatures;
use serde::Serialize;
use std::sync::Arc;

/// Scenario selected for a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveScenario {
    pub id: String,
    /// Catalog name, absent for ids not in the catalog
    pub name: Option<String>,
    pub features: ScenarioFeatures,
}

impl ActiveScenario {
    pub fn is_known(&self) -> bool {
        self.name.is_some()
    }
}

#[derive(Clone)]
pub struct ScenarioResolver {
    domain: Arc<DealerDomainConfig>,
}

impl ScenarioResolver {
    pub fn from_domain(domain: &Arc<DealerDomainConfig>) -> Self {
        Self {
            domain: Arc::clone(domain),
        }
    }

    pub fn resolve(&self, scenario_id: &str) -> ActiveScenario {
        match self.domain.scenarios.get(scenario_id) {
            Some(definition) => ActiveScenario {
                id: definition.id.clone(),
                name: Some(definition.name.clone()),
                features: definition.features(),
            },
            None => {
                tracing::debug!(scenario_id, "Scenario not in catalog, inferring features from id");
                ActiveScenario {
                    id: scenario_id.to_string(),
                    name: None,
                    features: ScenarioFeatures::infer_from_id(scenario_id),
                }
            }
        }
    }

    /// Documents a scenario needs, in signing order; empty when none or unknown
    pub fn required_documents(&self, scenario_id: Option<&str>) -> Vec<String> {
        scenario_id
            .and_then(|id| self.domain.scenarios.get(id))
            .map(|s| s.required_documents.clone())
            .unwrap_or_default()
    }

    /// Whether a field must be filled for a scenario.
    ///
    /// With no scenario only unconditional requirements apply.
    pub fn is_required(&self, field_id: &str, scenario_id: Option<&str>) -> bool {
        let features = scenario_id
            .map(|id| self.resolve(id).features)
            .unwrap_or_default();
        self.domain.fields.is_required(field_id, &features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> ScenarioResolver {
        ScenarioResolver::from_domain(&Arc::new(DealerDomainConfig::builtin().unwrap()))
    }

    #[test]
    fn test_required_documents() {
        let resolver = resolver();
        let docs = resolver.required_documents(Some("used-unpaid-trade"));
        assert!(docs.contains(&"payoff-authorization".to_string()));
        assert!(resolver.required_documents(None).is_empty());
        assert!(resolver.required_documents(Some("lease-deal")).is_empty());
    }

    #[test]
    fn test_requiredness_by_scenario() {
        let resolver = resolver();
        assert!(resolver.is_required("firstName", Some("new-no-trade")));
        assert!(!resolver.is_required("tradeVin", Some("new-no-trade")));
        assert!(resolver.is_required("tradeVin", Some("new-paid-trade")));
        assert!(!resolver.is_required("payoffAmount", Some("used-paid-trade")));
        assert!(resolver.is_required("payoffAmount", Some("used-unpaid-trade")));
        assert!(!resolver.is_required("homePhone", Some("used-unpaid-trade")));
        assert!(!resolver.is_required("noSuchField", Some("new-no-trade")));
    }

    #[test]
    fn test_unknown_scenario_infers_features() {
        let resolver = resolver();
        let active = resolver.resolve("demo-unpaid-trade");
        assert!(!active.is_known());
        assert!(active.features.has_trade_in);
        assert!(active.features.trade_is_unpaid);
        assert!(resolver.is_required("lenderName", Some("demo-unpaid-trade")));
        assert!(!resolver.is_required("tradeVin", Some("demo-no-trade")));
    }
}
