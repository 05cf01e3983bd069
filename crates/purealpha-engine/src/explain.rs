//! Explainability builder.
//!
//! Derives a ranked, human-readable rationale from the final allocation,
//! the surviving causal drivers, and the regime frame. Pure: nothing here
//! mutates the inputs, and identical inputs render identical text.

use tracing::debug;

use purealpha_models::{
    CausalEffectEstimate, PortfolioAllocation, Rationale, RationaleEntry, Regime, RiskMetrics,
};

use crate::config::ConfigStore;
use crate::pipeline::AnalysisQuery;

/// Build the rationale for one analysis.
///
/// Drivers are restricted to validated effects on assets that actually
/// received weight, ranked by realized contribution to the expected-return
/// shift (`|effect × confidence × weight|`), with ties broken by
/// hypothesis id for determinism.
pub fn build_rationale(
    allocation: &PortfolioAllocation,
    metrics: &RiskMetrics,
    effects: &[CausalEffectEstimate],
    regime: &Regime,
    store: &ConfigStore,
    query: &AnalysisQuery,
) -> Rationale {
    let mut ranked: Vec<(&CausalEffectEstimate, f64)> = effects
        .iter()
        .filter(|e| e.validated)
        .filter_map(|e| {
            let weight = allocation.weight(&e.effect_asset);
            (weight > 0.0).then(|| (e, (e.effect * e.confidence * weight).abs()))
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.hypothesis.cmp(&b.0.hypothesis))
    });

    let entries: Vec<RationaleEntry> = ranked
        .iter()
        .enumerate()
        .map(|(i, (est, contribution))| {
            let mechanism = store
                .hypotheses
                .iter()
                .find(|h| h.id == est.hypothesis)
                .map(|h| h.mechanism.as_str())
                .unwrap_or("declared causal relationship");
            let weight = allocation.weight(&est.effect_asset);
            RationaleEntry {
                rank: (i + 1) as u32,
                driver: format!("{} → {}", est.cause, est.effect_asset),
                detail: format!(
                    "{mechanism}; shifts {} expected return by {:+.2}pp at {:.1}% weight",
                    est.effect_asset,
                    est.effect * est.confidence * 100.0,
                    weight * 100.0
                ),
                contribution: *contribution,
            }
        })
        .collect();

    debug!(drivers = entries.len(), regime = %regime.label, "rationale built");

    let summary = render_summary(allocation, metrics, regime, &entries, store, query);

    Rationale {
        regime: regime.label,
        regime_confidence: regime.confidence,
        lsi_status: regime.lsi.status,
        entries,
        summary,
    }
}

fn render_summary(
    allocation: &PortfolioAllocation,
    metrics: &RiskMetrics,
    regime: &Regime,
    entries: &[RationaleEntry],
    store: &ConfigStore,
    query: &AnalysisQuery,
) -> String {
    let capital = query.capital;
    let mut lines = Vec::new();
    lines.push(format!(
        "{} risk portfolio (${capital:.0}) under {} (confidence {:.2}, LSI {:?}):",
        query.risk_level.as_str(),
        regime.label,
        regime.confidence,
        regime.lsi.status,
    ));

    lines.push(String::new());
    lines.push("ALLOCATIONS:".to_string());
    let dollars = allocation.scaled_to(capital);
    let mut positions: Vec<_> = dollars.iter().filter(|(_, amt)| **amt > 0.0).collect();
    positions.sort_by(|a, b| {
        b.1.partial_cmp(a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(b.0))
    });
    for (id, amount) in positions {
        let name = store
            .universe
            .get(id)
            .map(|a| a.name.as_str())
            .unwrap_or(id.as_str());
        let pct = if capital > 0.0 { amount / capital * 100.0 } else { 0.0 };
        lines.push(format!("- {name}: ${amount:.2} ({pct:.1}%)"));
    }

    let years = query.horizon_years;
    let terminal = |rate: f64| capital * (1.0 + rate).powi(years as i32);
    lines.push(String::new());
    lines.push(format!(
        "EXPECTED OUTCOMES ({years} year{}):",
        if years == 1 { "" } else { "s" }
    ));
    lines.push(format!(
        "- Best case (95%): {:+.1}%/yr (${:.0})",
        metrics.scenarios.best_case * 100.0,
        terminal(metrics.scenarios.best_case)
    ));
    lines.push(format!(
        "- Base case (50%): {:+.1}%/yr (${:.0})",
        metrics.scenarios.base_case * 100.0,
        terminal(metrics.scenarios.base_case)
    ));
    lines.push(format!(
        "- Worst case (5%): {:+.1}%/yr (${:.0})",
        metrics.scenarios.worst_case * 100.0,
        terminal(metrics.scenarios.worst_case)
    ));

    lines.push(String::new());
    lines.push("RISK METRICS:".to_string());
    lines.push(format!("- Volatility: {:.1}%", metrics.volatility * 100.0));
    lines.push(format!("- Sharpe ratio: {:.2}", metrics.sharpe_ratio));
    lines.push(format!(
        "- CVaR ({:.0}%): {:.1}%",
        metrics.cvar_confidence * 100.0,
        metrics.cvar * 100.0
    ));

    lines.push(String::new());
    lines.push("CAUSAL DRIVERS:".to_string());
    if entries.is_empty() {
        lines.push("- no validated drivers in this regime".to_string());
    } else {
        for entry in entries {
            lines.push(format!("{}. {}: {}", entry.rank, entry.driver, entry.detail));
        }
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigStore;
    use chrono::{DateTime, Utc};
    use purealpha_models::{
        AssetClass, AssetId, AssetProfile, AssetUniverse, CausalHypothesis, EstimateDisposition,
        FeatureCatalog, FeatureId, HypothesisId, Lsi, LsiComponents, LsiStatus, RegimeLabel,
        ReturnScenarios, RiskLevel,
    };
    use std::collections::BTreeMap;

    fn ts() -> DateTime<Utc> {
        "2026-08-01T00:00:00Z".parse().unwrap()
    }

    fn query(capital: f64, risk_level: RiskLevel) -> AnalysisQuery {
        AnalysisQuery {
            capital,
            horizon_years: 1,
            risk_level,
        }
    }

    fn store() -> ConfigStore {
        let asset = |id: &str, class: AssetClass| AssetProfile {
            id: AssetId::from(id),
            name: format!("{id} fund"),
            class,
            expected_return: 0.06,
            volatility: 0.12,
            min_weight: 0.0,
            max_weight: 1.0,
        };
        let catalog = FeatureCatalog::new(
            "catalog_v1",
            ["dxy", "vix"].into_iter().map(FeatureId::from),
        );
        let universe = AssetUniverse::new(
            "universe_v1",
            vec![
                asset("VTI", AssetClass::Equity),
                asset("GLD", AssetClass::Gold),
            ],
            BTreeMap::new(),
        );
        let hypothesis = |id: &str, cause: &str, asset: &str, mechanism: &str| CausalHypothesis {
            id: HypothesisId::from(id),
            cause: FeatureId::from(cause),
            effect: AssetId::from(asset),
            prior_strength: 0.02,
            prior_confidence: 0.9,
            baseline: 0.0,
            scale: 1.0,
            adjustment_set: vec![],
            applicable_regimes: RegimeLabel::ALL.into_iter().collect(),
            mechanism: mechanism.to_string(),
        };
        ConfigStore::new(
            catalog,
            universe,
            vec![
                hypothesis("dxy_to_gld", "dxy", "GLD", "Dollar strength inverse to gold"),
                hypothesis("vix_to_vti", "vix", "VTI", "Volatility spike triggers risk-off selling"),
            ],
        )
        .unwrap()
    }

    fn regime() -> Regime {
        Regime {
            label: RegimeLabel::Goldilocks,
            confidence: 0.72,
            lsi: Lsi {
                score: 18.0,
                status: LsiStatus::Normal,
                components: LsiComponents::default(),
            },
            scores: BTreeMap::new(),
            hysteresis_hold: false,
            rules_version: "regime_rules_v1".to_string(),
            snapshot_as_of: ts(),
        }
    }

    fn metrics() -> RiskMetrics {
        RiskMetrics {
            expected_return: 0.07,
            volatility: 0.11,
            cvar: 0.15,
            cvar_confidence: 0.95,
            sharpe_ratio: 0.23,
            scenarios: ReturnScenarios {
                best_case: 0.29,
                base_case: 0.07,
                worst_case: -0.15,
            },
        }
    }

    fn estimate(id: &str, cause: &str, asset: &str, effect: f64, validated: bool) -> CausalEffectEstimate {
        CausalEffectEstimate {
            hypothesis: HypothesisId::from(id),
            cause: FeatureId::from(cause),
            effect_asset: AssetId::from(asset),
            effect,
            confidence: 0.9,
            validated,
            disposition: if validated {
                EstimateDisposition::Validated
            } else {
                EstimateDisposition::RegimeInapplicable
            },
        }
    }

    #[test]
    fn regime_is_the_top_level_frame() {
        let allocation = PortfolioAllocation::new(
            [(AssetId::from("VTI"), 0.7), (AssetId::from("GLD"), 0.3)]
                .into_iter()
                .collect(),
        );
        let rationale = build_rationale(
            &allocation,
            &metrics(),
            &[],
            &regime(),
            &store(),
            &query(5000.0, RiskLevel::Medium),
        );

        assert_eq!(rationale.regime, RegimeLabel::Goldilocks);
        assert!((rationale.regime_confidence - 0.72).abs() < 1e-12);
        assert!(rationale.summary.starts_with("MEDIUM risk portfolio"));
        assert!(rationale.summary.contains("GOLDILOCKS"));
    }

    #[test]
    fn drivers_ranked_by_realized_contribution() {
        let allocation = PortfolioAllocation::new(
            [(AssetId::from("VTI"), 0.8), (AssetId::from("GLD"), 0.2)]
                .into_iter()
                .collect(),
        );
        // GLD effect is larger per unit, but VTI's weight dominates the
        // realized contribution: 0.02*0.9*0.8 > 0.05*0.9*0.2.
        let effects = vec![
            estimate("dxy_to_gld", "dxy", "GLD", 0.05, true),
            estimate("vix_to_vti", "vix", "VTI", 0.02, true),
        ];
        let rationale = build_rationale(
            &allocation,
            &metrics(),
            &effects,
            &regime(),
            &store(),
            &query(10_000.0, RiskLevel::High),
        );

        assert_eq!(rationale.entries.len(), 2);
        assert_eq!(rationale.entries[0].driver, "vix → VTI");
        assert_eq!(rationale.entries[0].rank, 1);
        assert!(rationale.entries[0].contribution > rationale.entries[1].contribution);
        assert!(rationale.entries[0]
            .detail
            .contains("Volatility spike triggers risk-off selling"));
    }

    #[test]
    fn zero_weight_and_non_validated_drivers_are_excluded() {
        let allocation = PortfolioAllocation::new(
            [(AssetId::from("VTI"), 1.0), (AssetId::from("GLD"), 0.0)]
                .into_iter()
                .collect(),
        );
        let effects = vec![
            estimate("dxy_to_gld", "dxy", "GLD", 0.05, true), // zero weight
            estimate("vix_to_vti", "vix", "VTI", 0.02, false), // not validated
        ];
        let rationale = build_rationale(
            &allocation,
            &metrics(),
            &effects,
            &regime(),
            &store(),
            &query(1000.0, RiskLevel::Low),
        );

        assert!(rationale.entries.is_empty());
        assert!(rationale.summary.contains("no validated drivers"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let allocation = PortfolioAllocation::new(
            [(AssetId::from("VTI"), 0.6), (AssetId::from("GLD"), 0.4)]
                .into_iter()
                .collect(),
        );
        let effects = vec![estimate("dxy_to_gld", "dxy", "GLD", 0.05, true)];
        let a = build_rationale(
            &allocation,
            &metrics(),
            &effects,
            &regime(),
            &store(),
            &query(5000.0, RiskLevel::Medium),
        );
        let b = build_rationale(
            &allocation,
            &metrics(),
            &effects,
            &regime(),
            &store(),
            &query(5000.0, RiskLevel::Medium),
        );
        assert_eq!(a, b);
    }
}
