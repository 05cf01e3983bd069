//! Liquidity Stress Index.
//!
//! Weighted blend of volatility, credit, and dollar stress on a 0-100
//! scale. Weights: VIX 30%, credit spreads 25%, dollar stress 20%,
//! baseline 25%. When an input feature is unavailable its component is
//! dropped and the remaining weights are renormalized; the gap is recorded
//! in the component breakdown rather than filled with a neutral value.

use purealpha_models::{FeatureId, FeatureSnapshot, Lsi, LsiComponents, LsiStatus};

const VIX_WEIGHT: f64 = 0.30;
const SPREAD_WEIGHT: f64 = 0.25;
const DXY_WEIGHT: f64 = 0.20;
const BASELINE_WEIGHT: f64 = 0.25;

/// Baseline stress floor: general market stress not captured by the
/// explicit components.
const BASELINE_SCORE: f64 = 25.0;

/// Compute the LSI from a snapshot. Subscores in `components` are raw
/// per-component values on the 0-100 scale.
pub fn compute_lsi(snapshot: &FeatureSnapshot) -> Lsi {
    let vix = snapshot
        .value_of(&FeatureId::from("vix"))
        .map(|v| ((v - 15.0) / 35.0 * 100.0).clamp(0.0, 100.0));
    let credit_spread = snapshot
        .value_of(&FeatureId::from("credit_spread"))
        .map(|s| (s / 0.05 * 100.0).clamp(0.0, 100.0));
    let dollar_stress = snapshot
        .value_of(&FeatureId::from("dxy"))
        .map(|d| ((d - 95.0) / 15.0 * 100.0).clamp(0.0, 100.0));

    let mut weighted = BASELINE_SCORE * BASELINE_WEIGHT;
    let mut weight_total = BASELINE_WEIGHT;

    if let Some(v) = vix {
        weighted += v * VIX_WEIGHT;
        weight_total += VIX_WEIGHT;
    }
    if let Some(s) = credit_spread {
        weighted += s * SPREAD_WEIGHT;
        weight_total += SPREAD_WEIGHT;
    }
    if let Some(d) = dollar_stress {
        weighted += d * DXY_WEIGHT;
        weight_total += DXY_WEIGHT;
    }

    let score = (weighted / weight_total).clamp(0.0, 100.0);

    Lsi {
        score,
        status: LsiStatus::from_score(score),
        components: LsiComponents {
            vix,
            credit_spread,
            dollar_stress,
            baseline: BASELINE_SCORE,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use purealpha_models::{FeatureObservation, SourceTag};

    fn ts() -> DateTime<Utc> {
        "2026-08-01T00:00:00Z".parse().unwrap()
    }

    fn snapshot(values: &[(&str, f64)]) -> FeatureSnapshot {
        let mut snap = FeatureSnapshot::new(ts(), "catalog_v1");
        for (id, v) in values {
            snap.insert(
                FeatureId::from(*id),
                FeatureObservation::present(*v, ts(), SourceTag::Market),
            );
        }
        snap
    }

    #[test]
    fn calm_market_is_normal() {
        let snap = snapshot(&[("vix", 14.0), ("credit_spread", 0.012), ("dxy", 98.0)]);
        let lsi = compute_lsi(&snap);
        assert!(lsi.score < 30.0, "score was {}", lsi.score);
        assert_eq!(lsi.status, LsiStatus::Normal);
    }

    #[test]
    fn stressed_market_escalates() {
        let snap = snapshot(&[("vix", 55.0), ("credit_spread", 0.06), ("dxy", 114.0)]);
        let lsi = compute_lsi(&snap);
        assert!(lsi.score >= 75.0, "score was {}", lsi.score);
        assert_eq!(lsi.status, LsiStatus::CriticalLiquidityShock);
    }

    #[test]
    fn score_stays_in_bounds() {
        let extreme = snapshot(&[("vix", 500.0), ("credit_spread", 2.0), ("dxy", 400.0)]);
        let lsi = compute_lsi(&extreme);
        assert!(lsi.score <= 100.0);

        let placid = snapshot(&[("vix", 1.0), ("credit_spread", 0.0), ("dxy", 80.0)]);
        let lsi = compute_lsi(&placid);
        assert!(lsi.score >= 0.0);
    }

    #[test]
    fn missing_inputs_renormalize_instead_of_defaulting() {
        let snap = snapshot(&[("vix", 55.0)]);
        let lsi = compute_lsi(&snap);

        assert!(lsi.components.credit_spread.is_none());
        assert!(lsi.components.dollar_stress.is_none());
        // Only vix (high stress) and baseline contribute; the blend sits
        // between the two rather than being dragged down by phantom zeros.
        let vix_sub = lsi.components.vix.unwrap();
        let expected =
            (vix_sub * VIX_WEIGHT + BASELINE_SCORE * BASELINE_WEIGHT) / (VIX_WEIGHT + BASELINE_WEIGHT);
        assert!((lsi.score - expected).abs() < 1e-9);
    }
}
