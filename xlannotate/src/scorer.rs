use crate::fragment::Fragment;
use crate::preprocessor::ProcessedSpectrum;
use crate::spectrum::{Peak, Spectrum};

/// Scale factor XCorr is divided by for display (spec.md §4.5 "XCorr").
const DISPLAY_SCALE: f64 = 10000.0;
/// Relative intensity of a flanking peak, one bin either side of the matched ion, when
/// `use-flanking-peaks` is enabled.
const FLANKING_INTENSITY: f64 = 0.5;

/// Build the theoretical vector XCorr's dot product runs against: each fragment's nearest bin
/// gets full intensity, and its two neighbouring bins get a fraction of it when flanking peaks
/// are enabled (spec.md §4.5 "XCorr").
fn theoretical_vector(processed: &ProcessedSpectrum, fragments: &[Fragment], use_flanking_peaks: bool) -> Vec<f64> {
    let mut theoretical: Vec<f64> = vec![0.0; processed.bins().len()];
    for fragment in fragments {
        let bin = processed.bin_of(fragment.mz);
        if let Some(slot) = theoretical.get_mut(bin) {
            *slot = 1.0;
        }
        if use_flanking_peaks {
            if bin > 0 {
                if let Some(slot) = theoretical.get_mut(bin - 1) {
                    *slot = slot.max(FLANKING_INTENSITY);
                }
            }
            if let Some(slot) = theoretical.get_mut(bin + 1) {
                *slot = slot.max(FLANKING_INTENSITY);
            }
        }
    }
    theoretical
}

/// Sequential cross-correlation score between a preprocessed observed spectrum and the
/// theoretical ions of a candidate (spec.md §4.5 "XCorr"): dot product of the two vectors,
/// divided by [`DISPLAY_SCALE`].
#[must_use]
pub fn xcorr(processed: &ProcessedSpectrum, fragments: &[Fragment], use_flanking_peaks: bool) -> f64 {
    let theoretical = theoretical_vector(processed, fragments, use_flanking_peaks);
    let dot: f64 = processed.bins().iter().zip(&theoretical).map(|(o, t)| o * t).sum();
    dot / DISPLAY_SCALE
}

/// The per-peptide XCorr breakdown the scorer reports for cross-link candidates: the joint score
/// against both peptides' ions together, plus each peptide's own score when scored with the
/// partner's mass fixed on the link site (spec.md §4.5 "Per cross-link candidate").
#[derive(Clone, Copy, Debug)]
pub struct CrossLinkXcorr {
    pub joint: f64,
    pub first: f64,
    pub second: f64,
}

/// Compute the joint and per-peptide XCorrs for a cross-link candidate from its already-predicted
/// fragments, partitioned by [`crate::fragment::FragmentOwner`].
#[must_use]
pub fn cross_link_xcorr(processed: &ProcessedSpectrum, fragments: &[Fragment], use_flanking_peaks: bool) -> CrossLinkXcorr {
    use crate::fragment::FragmentOwner;
    let first: Vec<Fragment> = fragments.iter().copied().filter(|f| f.owner == FragmentOwner::First).collect();
    let second: Vec<Fragment> = fragments.iter().copied().filter(|f| f.owner == FragmentOwner::Second).collect();
    CrossLinkXcorr {
        joint: xcorr(processed, fragments, use_flanking_peaks),
        first: xcorr(processed, &first, use_flanking_peaks),
        second: xcorr(processed, &second, use_flanking_peaks),
    }
}

/// Result of scoring a candidate's ions against the raw (unbinned) spectrum by fractional
/// explained intensity (spec.md §4.5 "optional Sp").
#[derive(Clone, Copy, Debug)]
pub struct SpScore {
    pub score: f64,
    pub matched_ions: usize,
    pub total_ions: usize,
}

/// Preliminary Sp score: fraction of total ion intensity explained by matched fragments, scaled
/// by the matched ion count and a bonus for runs of consecutive matched cleavage indices within
/// the same ion series (spec.md §4.5 "optional Sp"). `peaks` must already be sorted by m/z (see
/// [`Spectrum::sort_by_mz`]).
///
/// # Panics
/// Panics in debug builds if `peaks` is not sorted by m/z.
#[must_use]
pub fn sp_score(peaks: &[Peak], fragments: &[Fragment], tolerance: f64) -> SpScore {
    debug_assert!(peaks.windows(2).all(|w| w[0].mz <= w[1].mz), "peaks must be sorted by m/z");
    let total_intensity: f64 = peaks.iter().map(|p| p.intensity).sum();
    if total_intensity == 0.0 || fragments.is_empty() {
        return SpScore { score: 0.0, matched_ions: 0, total_ions: fragments.len() };
    }

    let mut matched_intensity = 0.0;
    let mut matched_ions = 0usize;
    let mut matched_indices_by_kind: std::collections::HashMap<crate::fragment::IonKind, Vec<usize>> =
        std::collections::HashMap::new();

    for fragment in fragments {
        if let Some(peak) = nearest_peak(peaks, fragment.mz, tolerance) {
            matched_intensity += peak.intensity;
            matched_ions += 1;
            matched_indices_by_kind.entry(fragment.kind).or_default().push(fragment.cleavage_index);
        }
    }

    let consecutive_runs: usize = matched_indices_by_kind
        .values()
        .map(|indices| {
            let mut sorted = indices.clone();
            sorted.sort_unstable();
            sorted.dedup();
            sorted.windows(2).filter(|w| w[1] == w[0] + 1).count()
        })
        .sum();

    let fraction_explained = matched_intensity / total_intensity;
    let score = fraction_explained * matched_ions as f64 * (1.0 + 0.075 * consecutive_runs as f64);
    SpScore { score, matched_ions, total_ions: fragments.len() }
}

/// Binary-search the nearest peak to `mz` within `tolerance`, if any.
fn nearest_peak(peaks: &[Peak], mz: f64, tolerance: f64) -> Option<Peak> {
    let idx = peaks.partition_point(|p| p.mz < mz);
    let mut best: Option<Peak> = None;
    let mut best_distance = tolerance;
    for candidate in [idx.checked_sub(1), Some(idx)].into_iter().flatten() {
        if let Some(peak) = peaks.get(candidate) {
            let distance = (peak.mz - mz).abs();
            if distance <= best_distance {
                best_distance = distance;
                best = Some(*peak);
            }
        }
    }
    best
}

/// Exact-p-value variant that bypasses the Weibull fit by convolving the observed intensity
/// histogram with itself once per theoretical ion, producing the exact null distribution of the
/// XCorr-style dot product score under a random theoretical spectrum with the same ion count
/// (spec.md §4.5 "An optional exact-p-value variant convolves observed and theoretical
/// histograms and reports the tail probability").
#[must_use]
pub fn exact_p_value(processed: &ProcessedSpectrum, fragments: &[Fragment], use_flanking_peaks: bool) -> f64 {
    let levels: Vec<u32> = processed.bins().iter().map(|v| v.round().max(0.0) as u32).collect();
    if levels.is_empty() || fragments.is_empty() {
        return 1.0;
    }
    let max_level = *levels.iter().max().unwrap_or(&0);
    let mut histogram = vec![0u64; max_level as usize + 1];
    for &level in &levels {
        histogram[level as usize] += 1;
    }
    let total = levels.len() as f64;
    let single_draw: Vec<f64> = histogram.iter().map(|&count| count as f64 / total).collect();

    let mut distribution = vec![1.0];
    for _ in 0..fragments.len() {
        distribution = convolve(&distribution, &single_draw);
    }

    let theoretical = theoretical_vector(processed, fragments, use_flanking_peaks);
    let observed_score: f64 = processed.bins().iter().zip(&theoretical).map(|(o, t)| o * t).sum();
    let threshold = observed_score.round().max(0.0) as usize;
    distribution.iter().enumerate().filter(|&(i, _)| i >= threshold).map(|(_, p)| p).sum()
}

fn convolve(a: &[f64], b: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, &ai) in a.iter().enumerate() {
        if ai == 0.0 {
            continue;
        }
        for (j, &bj) in b.iter().enumerate() {
            out[i + j] += ai * bj;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::{FragmentOwner, IonKind};

    fn processed(bins: Vec<f64>) -> ProcessedSpectrum {
        crate::preprocessor::preprocess(
            &Spectrum::new(
                1,
                1,
                0.0,
                vec![],
                bins.iter().enumerate().map(|(i, &v)| Peak { mz: i as f64, intensity: v }).collect(),
            ),
            &crate::preprocessor::PreprocessConfig {
                bin_width: 1.0,
                bin_offset: 0.0,
                remove_precursor_tolerance: None,
                background_half_window: 1,
                normalisation_regions: 1,
                normalisation_target: 1.0,
            },
        )
    }

    #[test]
    fn xcorr_is_zero_with_no_overlap() {
        let processed = processed(vec![1.0, 0.0, 0.0]);
        let fragments = vec![Fragment { kind: IonKind::B, charge: 1, mz: 1.0, cleavage_index: 1, owner: FragmentOwner::Single }];
        assert_eq!(xcorr(&processed, &fragments, false), 0.0);
    }

    #[test]
    fn xcorr_is_positive_on_exact_match() {
        let processed = processed(vec![0.0, 5.0, 0.0]);
        let fragments = vec![Fragment { kind: IonKind::B, charge: 1, mz: 1.0, cleavage_index: 1, owner: FragmentOwner::Single }];
        assert!(xcorr(&processed, &fragments, false) > 0.0);
    }

    #[test]
    fn sp_score_rewards_consecutive_matches() {
        let peaks = vec![
            Peak { mz: 100.0, intensity: 10.0 },
            Peak { mz: 200.0, intensity: 10.0 },
            Peak { mz: 300.0, intensity: 10.0 },
        ];
        let consecutive = vec![
            Fragment { kind: IonKind::B, charge: 1, mz: 100.0, cleavage_index: 1, owner: FragmentOwner::Single },
            Fragment { kind: IonKind::B, charge: 1, mz: 200.0, cleavage_index: 2, owner: FragmentOwner::Single },
        ];
        let scattered = vec![
            Fragment { kind: IonKind::B, charge: 1, mz: 100.0, cleavage_index: 1, owner: FragmentOwner::Single },
            Fragment { kind: IonKind::B, charge: 1, mz: 300.0, cleavage_index: 5, owner: FragmentOwner::Single },
        ];
        let consecutive_score = sp_score(&peaks, &consecutive, 0.5).score;
        let scattered_score = sp_score(&peaks, &scattered, 0.5).score;
        assert!(consecutive_score > scattered_score);
    }
}
