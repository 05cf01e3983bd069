//! Closed-form normal tail math.
//!
//! CVaR under the Gaussian portfolio-return model:
//! `CVaR_α = −μ + σ·φ(z_α)/(1−α)` with `z_α = Φ⁻¹(α)`, expressed as a
//! positive loss magnitude. Everything here is deterministic; the quantile
//! uses Acklam's rational approximation and the CDF an Abramowitz–Stegun
//! erf expansion, both accurate to well below the tolerances this engine
//! works at.

/// Standard normal density.
pub fn norm_pdf(x: f64) -> f64 {
    const INV_SQRT_2PI: f64 = 0.398_942_280_401_432_7;
    INV_SQRT_2PI * (-0.5 * x * x).exp()
}

/// Standard normal CDF via the Abramowitz–Stegun 7.1.26 erf approximation
/// (max absolute error ~1.5e-7).
pub fn norm_cdf(x: f64) -> f64 {
    let z = x / std::f64::consts::SQRT_2;
    0.5 * (1.0 + erf(z))
}

fn erf(x: f64) -> f64 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    const A1: f64 = 0.254_829_592;
    const A2: f64 = -0.284_496_736;
    const A3: f64 = 1.421_413_741;
    const A4: f64 = -1.453_152_027;
    const A5: f64 = 1.061_405_429;
    const P: f64 = 0.327_591_1;

    let t = 1.0 / (1.0 + P * x);
    let y = 1.0 - (((((A5 * t + A4) * t) + A3) * t + A2) * t + A1) * t * (-x * x).exp();
    sign * y
}

/// Standard normal quantile via Acklam's rational approximation
/// (relative error below 1.15e-9 on (0, 1)).
pub fn norm_ppf(p: f64) -> f64 {
    assert!(p > 0.0 && p < 1.0, "quantile requires p in (0, 1), got {p}");

    const A: [f64; 6] = [
        -3.969_683_028_665_376e1,
        2.209_460_984_245_205e2,
        -2.759_285_104_469_687e2,
        1.383_577_518_672_690e2,
        -3.066_479_806_614_716e1,
        2.506_628_277_459_239,
    ];
    const B: [f64; 5] = [
        -5.447_609_879_822_406e1,
        1.615_858_368_580_409e2,
        -1.556_989_798_598_866e2,
        6.680_131_188_771_972e1,
        -1.328_068_155_288_572e1,
    ];
    const C: [f64; 6] = [
        -7.784_894_002_430_293e-3,
        -3.223_964_580_411_365e-1,
        -2.400_758_277_161_838,
        -2.549_732_539_343_734,
        4.374_664_141_464_968,
        2.938_163_982_698_783,
    ];
    const D: [f64; 4] = [
        7.784_695_709_041_462e-3,
        3.224_671_290_700_398e-1,
        2.445_134_137_142_996,
        3.754_408_661_907_416,
    ];

    const P_LOW: f64 = 0.02425;

    if p < P_LOW {
        let q = (-2.0 * p.ln()).sqrt();
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        -(((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    }
}

/// CVaR of a Gaussian return `R ~ N(μ, σ²)` at tail confidence `alpha`,
/// as a positive loss magnitude. A portfolio whose expected return is high
/// enough can have negative CVaR (the tail still gains).
pub fn cvar_gaussian(mu: f64, sigma: f64, alpha: f64) -> f64 {
    assert!(alpha > 0.5 && alpha < 1.0, "alpha must lie in (0.5, 1)");
    if sigma <= 0.0 {
        return -mu;
    }
    -mu + sigma * norm_pdf(norm_ppf(alpha)) / (1.0 - alpha)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantile_matches_known_points() {
        assert!((norm_ppf(0.975) - 1.959_964).abs() < 1e-4);
        assert!((norm_ppf(0.95) - 1.644_854).abs() < 1e-4);
        assert!(norm_ppf(0.5).abs() < 1e-9);
        assert!((norm_ppf(0.05) + 1.644_854).abs() < 1e-4);
    }

    #[test]
    fn cdf_matches_known_points() {
        assert!((norm_cdf(0.0) - 0.5).abs() < 1e-7);
        assert!((norm_cdf(1.96) - 0.975).abs() < 1e-4);
        assert!((norm_cdf(-1.96) - 0.025).abs() < 1e-4);
    }

    #[test]
    fn standard_normal_cvar_95() {
        // ES_0.95 of N(0,1) = φ(z_0.95)/0.05 ≈ 2.0627.
        let cvar = cvar_gaussian(0.0, 1.0, 0.95);
        assert!((cvar - 2.0627).abs() < 1e-3, "cvar was {cvar}");
    }

    #[test]
    fn cvar_scales_and_shifts() {
        let base = cvar_gaussian(0.0, 1.0, 0.95);
        assert!((cvar_gaussian(0.0, 2.0, 0.95) - 2.0 * base).abs() < 1e-9);
        assert!((cvar_gaussian(0.1, 1.0, 0.95) - (base - 0.1)).abs() < 1e-9);
    }

    #[test]
    fn cvar_monotone_in_tail_level() {
        assert!(cvar_gaussian(0.05, 0.15, 0.99) > cvar_gaussian(0.05, 0.15, 0.95));
    }

    #[test]
    fn zero_vol_degenerates_to_negative_mean() {
        assert_eq!(cvar_gaussian(0.04, 0.0, 0.95), -0.04);
    }
}
