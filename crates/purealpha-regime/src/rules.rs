//! The fixed, versioned regime rule table.
//!
//! Each regime is scored by the fraction of its indicator conditions the
//! snapshot satisfies. Ranges are inclusive on both ends. Editing a range
//! or a condition set means bumping `REGIME_RULES_VERSION`.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use purealpha_models::{FeatureId, RegimeLabel};

/// Version tag carried on every `Regime` record.
pub const REGIME_RULES_VERSION: &str = "regime_rules_v1";

/// One inclusive range condition on an indicator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub feature: FeatureId,
    pub low: f64,
    pub high: f64,
}

impl Condition {
    fn new(feature: &str, low: f64, high: f64) -> Self {
        Self {
            feature: FeatureId::from(feature),
            low,
            high,
        }
    }

    pub fn matches(&self, value: f64) -> bool {
        self.low <= value && value <= self.high
    }
}

/// Rule set for one regime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeRule {
    pub label: RegimeLabel,
    pub conditions: Vec<Condition>,
    pub description: String,
}

/// The full 10-regime rule table, in canonical label order.
pub fn regime_rules() -> Vec<RegimeRule> {
    vec![
        RegimeRule {
            label: RegimeLabel::Goldilocks,
            conditions: vec![
                Condition::new("gdp_growth", 0.02, 0.05),
                Condition::new("inflation", 0.015, 0.030),
                Condition::new("vix", 10.0, 20.0),
                Condition::new("unemployment", 0.03, 0.05),
            ],
            description: "Moderate growth with stable inflation".to_string(),
        },
        RegimeRule {
            label: RegimeLabel::Recession,
            conditions: vec![
                Condition::new("gdp_growth", -0.05, 0.01),
                Condition::new("unemployment", 0.06, 0.12),
                Condition::new("vix", 25.0, 50.0),
                Condition::new("credit_spread", 0.03, 0.10),
            ],
            description: "Economic contraction".to_string(),
        },
        RegimeRule {
            label: RegimeLabel::Crisis,
            conditions: vec![
                Condition::new("vix", 40.0, 90.0),
                Condition::new("credit_spread", 0.05, 0.20),
                Condition::new("unemployment", 0.08, 0.15),
            ],
            description: "Systemic crisis or market crash".to_string(),
        },
        RegimeRule {
            label: RegimeLabel::Stagflation,
            conditions: vec![
                Condition::new("gdp_growth", -0.02, 0.01),
                Condition::new("inflation", 0.05, 0.15),
                Condition::new("unemployment", 0.06, 0.10),
            ],
            description: "Stagnant growth with high inflation".to_string(),
        },
        RegimeRule {
            label: RegimeLabel::MeltUp,
            conditions: vec![
                Condition::new("gdp_growth", 0.04, 0.08),
                Condition::new("vix", 15.0, 30.0),
                Condition::new("inflation", 0.02, 0.04),
            ],
            description: "Euphoric market rally".to_string(),
        },
        RegimeRule {
            label: RegimeLabel::Recovery,
            conditions: vec![
                Condition::new("gdp_growth", 0.01, 0.03),
                Condition::new("unemployment", 0.04, 0.07),
                Condition::new("vix", 18.0, 30.0),
            ],
            description: "Post-crisis recovery phase".to_string(),
        },
        RegimeRule {
            label: RegimeLabel::TaperTantrum,
            conditions: vec![
                Condition::new("fed_rate", 0.04, 0.07),
                Condition::new("credit_spread", 0.02, 0.05),
                Condition::new("vix", 20.0, 35.0),
            ],
            description: "Market shock from Fed tightening".to_string(),
        },
        RegimeRule {
            label: RegimeLabel::GeopoliticalShock,
            conditions: vec![
                Condition::new("vix", 30.0, 60.0),
                Condition::new("dxy", 105.0, 120.0),
                Condition::new("credit_spread", 0.02, 0.06),
            ],
            description: "War, sanctions, or major geopolitical event".to_string(),
        },
        RegimeRule {
            label: RegimeLabel::TechDisruption,
            conditions: vec![
                Condition::new("gdp_growth", 0.03, 0.06),
                Condition::new("inflation", 0.00, 0.02),
                Condition::new("vix", 12.0, 22.0),
            ],
            description: "AI/tech revolution driving markets".to_string(),
        },
        RegimeRule {
            label: RegimeLabel::Deglobalization,
            conditions: vec![
                Condition::new("inflation", 0.03, 0.06),
                Condition::new("dxy", 100.0, 110.0),
                Condition::new("credit_spread", 0.015, 0.035),
            ],
            description: "Supply chain reorganization era".to_string(),
        },
    ]
}

/// Union of all features referenced by the rule table.
pub fn required_features(rules: &[RegimeRule]) -> BTreeSet<FeatureId> {
    rules
        .iter()
        .flat_map(|r| r.conditions.iter().map(|c| c.feature.clone()))
        .collect()
}
