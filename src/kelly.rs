// Probability clamps and Kelly stake sizing shared by markets and tickets.

pub const KELLY_SCALE: f64 = 0.4;
pub const KELLY_FLOOR: f64 = 0.005;
pub const KELLY_CEIL: f64 = 0.08;

const KELLY_P_EPS: f64 = 1e-6;

/// Lower/upper bound applied to any probability before it becomes an odds denominator.
pub const MARKET_P_FLOOR: f64 = 0.01;
pub const MARKET_P_CEIL: f64 = 0.99;

/// Full Kelly fraction for decimal odds. Negative when the bet has no edge.
pub fn raw_kelly(p: f64, odds: f64) -> f64 {
    let b = odds - 1.0;
    if !p.is_finite() || !b.is_finite() || b <= 0.0 {
        return f64::NEG_INFINITY;
    }
    let p = p.clamp(KELLY_P_EPS, 1.0 - KELLY_P_EPS);
    (b * p - (1.0 - p)) / b
}

/// Conservative fractional Kelly: `clamp(kelly * 0.4, 0.005, 0.08)`.
///
/// The floor is returned even for negative-edge bets; callers that need a hard
/// "no bet" cutoff must check [`raw_kelly`] themselves.
pub fn kelly(p: f64, odds: f64) -> f64 {
    let raw = raw_kelly(p, odds);
    if !raw.is_finite() {
        return KELLY_FLOOR;
    }
    (raw * KELLY_SCALE).clamp(KELLY_FLOOR, KELLY_CEIL)
}

pub fn clamp_probability(p: f64) -> f64 {
    if !p.is_finite() {
        return 0.5;
    }
    p.clamp(MARKET_P_FLOOR, MARKET_P_CEIL)
}

/// Price a side: `round(1/p * margin, 2)`. Callers clamp `p` first; a zero or
/// non-finite `p` is priced at the floor.
pub fn priced_odds(p: f64, margin: f64) -> f64 {
    let p = if p.is_finite() && p > 0.0 {
        p.min(1.0)
    } else {
        MARKET_P_FLOOR
    };
    round2(margin / p)
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

pub fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() { v } else { 0.0 }
}

/// Poisson pmf for `0..=max_k`; the last bucket absorbs the tail mass.
pub fn poisson_pmf(lambda: f64, max_k: u32) -> Vec<f64> {
    let max_k = max_k as usize;
    let mut out = vec![0.0; max_k + 1];
    let lambda = if lambda.is_finite() { lambda.max(0.0) } else { 0.0 };

    out[0] = (-lambda).exp();
    for k in 1..=max_k {
        out[k] = out[k - 1] * lambda / k as f64;
    }

    let sum: f64 = out.iter().sum();
    if sum < 1.0 {
        out[max_k] += 1.0 - sum;
    }
    out
}

/// P(X > line) for X ~ Poisson(lambda), with half-goal style lines.
pub fn poisson_over(lambda: f64, line: f64) -> f64 {
    let threshold = line.floor().max(0.0) as u32;
    let pmf = poisson_pmf(lambda, threshold + 1);
    let at_or_below: f64 = pmf.iter().take(threshold as usize + 1).sum();
    (1.0 - at_or_below).clamp(0.0, 1.0)
}
