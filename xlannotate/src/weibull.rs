use std::cmp::Ordering;
use std::collections::HashSet;

use rand::RngCore;

/// The reference implementation hardcodes a floor of 30 raw decoy samples before even attempting
/// a two-parameter fit, independent of the driver-facing `min-weibull-points` configuration key
/// (spec.md §6, see `DESIGN.md` "Supplemented features" item 5).
const MIN_RAW_SAMPLES: usize = 30;
/// `fit_three_parameter_weibull`'s grid search stops early once the best-so-far Pearson
/// correlation drops by more than this much (spec.md §4.6 step 3, "Supplemented features" item 2).
const CORRELATION_TOLERANCE: f64 = 0.1;
/// Floor a NaN or non-positive p-value is clamped to (spec.md §4.6 step 4).
const MIN_P_VALUE: f64 = 1e-10;

/// A committed three-parameter Weibull fit: `p(s) = exp(-((s + shift) / eta).powf(beta))`
/// (spec.md §4.6 step 4, GLOSSARY "Weibull p-value").
#[derive(Clone, Copy, Debug)]
pub struct WeibullFit {
    pub eta: f64,
    pub beta: f64,
    pub shift: f64,
    pub correlation: f64,
}

impl WeibullFit {
    /// P-value of `score` under this fit (spec.md §4.6 step 4). Never returns NaN or a
    /// non-positive value — clamped to [`MIN_P_VALUE`].
    #[must_use]
    pub fn p_value(&self, score: f64) -> f64 {
        let shifted = score + self.shift;
        if shifted <= 0.0 {
            return 1.0;
        }
        let p = (-((shifted / self.eta).powf(self.beta))).exp();
        if p.is_nan() { MIN_P_VALUE } else { p.clamp(MIN_P_VALUE, 1.0) }
    }
}

/// Outcome of attempting a three-parameter Weibull fit over a spectrum's decoy score population
/// (spec.md §4.6): either a committed fit, or a failure that callers fall back to
/// [`ecdf_p_value`] for.
#[derive(Clone, Copy, Debug)]
pub enum WeibullOutcome {
    Fit(WeibullFit),
    Failed,
}

/// Parameters governing the three-parameter grid search (spec.md §6
/// `fraction-top-scores-to-fit`; `step` and `correlation-threshold` are calibrator internals not
/// named as separate configuration keys in spec.md §6, kept here rather than hardcoded so a
/// caller can tune them).
#[derive(Clone, Copy, Debug)]
pub struct WeibullConfig {
    pub fraction_to_fit: f64,
    pub step: f64,
    pub correlation_threshold: f64,
}

impl Default for WeibullConfig {
    fn default() -> Self {
        Self { fraction_to_fit: 0.55, step: 0.01, correlation_threshold: 0.8 }
    }
}

/// Fit a three-parameter Weibull to `decoy_scores` (spec.md §4.6 steps 1-3).
///
/// Requires at least [`MIN_RAW_SAMPLES`] scores regardless of `config`; fewer always fails.
#[must_use]
pub fn fit_three_parameter_weibull(decoy_scores: &[f64], config: &WeibullConfig) -> WeibullOutcome {
    if decoy_scores.len() < MIN_RAW_SAMPLES {
        return WeibullOutcome::Failed;
    }

    let mut sorted_desc = decoy_scores.to_vec();
    sorted_desc.sort_by(|a, b| b.partial_cmp(a).unwrap_or(Ordering::Equal));

    let tail_len = ((sorted_desc.len() as f64) * config.fraction_to_fit).ceil() as usize;
    let tail_len = tail_len.clamp(2, sorted_desc.len());
    let mut tail_asc = sorted_desc[..tail_len].to_vec();
    tail_asc.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    // Pinned to the 30th-ranked score (index 29), not the literal maximum; `sorted_desc.len() >=
    // MIN_RAW_SAMPLES` (30) above guarantees this index exists.
    let max_shift = sorted_desc[29];
    let min_shift = 0.0f64;
    let range = max_shift - min_shift;
    if range <= 0.0 {
        return WeibullOutcome::Failed;
    }
    let delta = config.step * range;

    let mut best: Option<WeibullFit> = None;
    let mut shift = max_shift;
    while shift >= min_shift {
        if let Some(candidate) = fit_at_shift(&tail_asc, shift) {
            match &best {
                Some(current) if candidate.correlation <= current.correlation => {
                    if current.correlation - candidate.correlation > CORRELATION_TOLERANCE {
                        break;
                    }
                }
                _ => best = Some(candidate),
            }
        }
        shift -= delta;
    }

    match best {
        Some(fit) if fit.correlation >= config.correlation_threshold => WeibullOutcome::Fit(fit),
        _ => WeibullOutcome::Failed,
    }
}

/// One grid point of the three-parameter search: fit `eta`/`beta` by OLS on the Weibull-linearised
/// pair at a fixed `shift` (spec.md §4.6 step 2).
fn fit_at_shift(tail_asc: &[f64], shift: f64) -> Option<WeibullFit> {
    let n = tail_asc.len() as f64;
    let mut xs = Vec::with_capacity(tail_asc.len());
    let mut ys = Vec::with_capacity(tail_asc.len());
    for (i, &score) in tail_asc.iter().enumerate() {
        let shifted = score + shift;
        if shifted <= 0.0 {
            continue;
        }
        let rank = (i + 1) as f64;
        let f_hat = (rank - 0.3) / (n + 0.4);
        if !(0.0..1.0).contains(&f_hat) {
            continue;
        }
        xs.push(shifted.ln());
        ys.push((-(1.0 - f_hat).ln()).ln());
    }
    if xs.len() < 2 {
        return None;
    }

    let (slope, intercept, correlation) = ordinary_least_squares(&xs, &ys)?;
    let beta = slope;
    if beta <= 0.0 {
        return None;
    }
    let eta = (-intercept / beta).exp();
    if eta <= 0.0 || !eta.is_finite() {
        return None;
    }
    Some(WeibullFit { eta, beta, shift, correlation })
}

/// Slope, intercept, and Pearson correlation of the least-squares line through `(xs, ys)`.
/// Returns `None` (rather than a correlation of zero at a caller level, per spec.md §9 "guard
/// against zero denominators") when either variable is constant.
fn ordinary_least_squares(xs: &[f64], ys: &[f64]) -> Option<(f64, f64, f64)> {
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (&x, &y) in xs.iter().zip(ys) {
        sxy += (x - mean_x) * (y - mean_y);
        sxx += (x - mean_x).powi(2);
        syy += (y - mean_y).powi(2);
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    let correlation = sxy / (sxx.sqrt() * syy.sqrt());
    Some((slope, intercept, correlation))
}

/// Empirical-CDF p-value fallback (spec.md §4.6 step 4, "Supplemented features" item 1):
/// the rank-based tie-break identical to the reference `getECDFPValue` rather than a naive
/// `rank/n` that double-counts ties. `decoy_scores` need not be pre-sorted.
#[must_use]
pub fn ecdf_p_value(decoy_scores: &[f64], score: f64) -> f64 {
    let n = decoy_scores.len();
    if n == 0 {
        return 1.0;
    }
    let mut sorted_desc = decoy_scores.to_vec();
    sorted_desc.sort_by(|a, b| b.partial_cmp(a).unwrap_or(Ordering::Equal));

    let mut rank = 0usize;
    while rank < n && score <= sorted_desc[rank] {
        rank += 1;
    }
    let p = rank as f64 / n as f64;
    p.max(1.0 / (n as f64 + 1.0))
}

/// A Weibull training set that deduplicates points by candidate sequence (spec.md §4.9 "Record
/// the mapping from decoy back to its target"; "Supplemented features" item 4) — the reference
/// implementation maintains a `set<string>` and silently drops (while counting) repeat insertions
/// rather than letting the same sequence's score dominate the tail through a quadrant that
/// produced several equivalent decoys.
#[derive(Debug, Default)]
pub struct TrainingSet {
    seen_sequences: HashSet<String>,
    scores: Vec<f64>,
    duplicate_count: usize,
}

impl TrainingSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one decoy's score under its modified sequence. Returns `false` (and counts the
    /// point as a duplicate instead of adding it) if that sequence was already recorded.
    pub fn add_point(&mut self, sequence: String, score: f64) -> bool {
        if self.seen_sequences.insert(sequence) {
            self.scores.push(score);
            true
        } else {
            self.duplicate_count += 1;
            false
        }
    }

    #[must_use]
    pub fn scores(&self) -> &[f64] {
        &self.scores
    }

    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.duplicate_count
    }

    /// Pad the training set up to `min_points` by duplicating already-collected scores at
    /// random, as the reference implementation does when a spectrum's natural decoy population
    /// is smaller than `min-weibull-points` (spec.md §4.6 "padded with shuffled duplicates of the
    /// decoys if fewer are available naturally"). A no-op if there are no points to duplicate
    /// from, or the set already meets `min_points`.
    pub fn pad_with_shuffled_duplicates(&mut self, min_points: usize, rng: &mut impl RngCore) {
        if self.scores.is_empty() {
            return;
        }
        let original_len = self.scores.len();
        while self.scores.len() < min_points {
            let index = (rng.next_u64() as usize) % original_len;
            self.scores.push(self.scores[index]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn synthetic_weibull_scores(eta: f64, beta: f64, n: usize) -> Vec<f64> {
        (1..=n)
            .map(|i| {
                let f_hat = (i as f64 - 0.3) / (n as f64 + 0.4);
                eta * (-(1.0 - f_hat).ln()).powf(1.0 / beta)
            })
            .collect()
    }

    #[test]
    fn fits_clean_synthetic_weibull_data() {
        let scores = synthetic_weibull_scores(2.0, 1.5, 200);
        let outcome = fit_three_parameter_weibull(&scores, &WeibullConfig::default());
        match outcome {
            WeibullOutcome::Fit(fit) => assert!(fit.correlation > 0.8),
            WeibullOutcome::Failed => panic!("expected a committed fit on clean synthetic data"),
        }
    }

    #[test]
    fn fails_with_fewer_than_thirty_samples() {
        let scores = vec![1.0; 29];
        assert!(matches!(fit_three_parameter_weibull(&scores, &WeibullConfig::default()), WeibullOutcome::Failed));
    }

    #[test]
    fn constant_scores_fail_to_fit() {
        let scores = vec![5.0; 40];
        assert!(matches!(fit_three_parameter_weibull(&scores, &WeibullConfig::default()), WeibullOutcome::Failed));
    }

    #[test]
    fn ecdf_pvalue_uses_rank_over_n_with_floor() {
        let decoys = vec![10.0, 8.0, 6.0, 4.0, 2.0];
        assert!((ecdf_p_value(&decoys, 20.0) - 1.0 / 6.0).abs() < 1e-9);
        assert!((ecdf_p_value(&decoys, 6.0) - 0.6).abs() < 1e-9);
    }

    #[test]
    fn training_set_dedups_by_sequence() {
        let mut set = TrainingSet::new();
        assert!(set.add_point("AK".into(), 1.0));
        assert!(!set.add_point("AK".into(), 2.0));
        assert_eq!(set.scores(), &[1.0]);
        assert_eq!(set.duplicate_count(), 1);
    }

    #[test]
    fn padding_reaches_minimum_without_losing_originals() {
        let mut set = TrainingSet::new();
        set.add_point("AK".into(), 1.0);
        set.add_point("DE".into(), 2.0);
        let mut rng = StdRng::seed_from_u64(3);
        set.pad_with_shuffled_duplicates(10, &mut rng);
        assert_eq!(set.scores().len(), 10);
        assert!(set.scores().contains(&1.0));
        assert!(set.scores().contains(&2.0));
    }
}
