use crate::spectrum::Spectrum;

/// Parameters governing spectrum preprocessing before XCorr scoring (spec.md §4.5 step 1-4).
#[derive(Clone, Copy, Debug)]
pub struct PreprocessConfig {
    pub bin_width: f64,
    pub bin_offset: f64,
    pub remove_precursor_tolerance: Option<f64>,
    /// Half-width, in bins, of the running-background window subtracted in step 4 ("remove
    /// grass"). The reference implementation uses 75.
    pub background_half_window: usize,
    /// Number of equal m/z regions step 3's per-region intensity normalisation divides the
    /// spectrum into. The reference implementation uses 10.
    pub normalisation_regions: usize,
    /// The value the tallest peak in each normalisation region is scaled to.
    pub normalisation_target: f64,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            bin_width: 1.0005079,
            bin_offset: 0.68,
            remove_precursor_tolerance: Some(1.5),
            background_half_window: 75,
            normalisation_regions: 10,
            normalisation_target: 50.0,
        }
    }
}

/// The binned, intensity-processed observed vector XCorr is computed against (spec.md §4.5).
#[derive(Clone, Debug)]
pub struct ProcessedSpectrum {
    bins: Vec<f64>,
    bin_width: f64,
    bin_offset: f64,
}

impl ProcessedSpectrum {
    #[must_use]
    pub fn bins(&self) -> &[f64] {
        &self.bins
    }

    #[must_use]
    pub fn bin_width(&self) -> f64 {
        self.bin_width
    }

    #[must_use]
    pub fn bin_offset(&self) -> f64 {
        self.bin_offset
    }

    #[must_use]
    pub fn bin_of(&self, mz: f64) -> usize {
        ((mz + self.bin_offset) / self.bin_width).floor() as usize
    }

    #[must_use]
    pub fn value_at(&self, bin: usize) -> f64 {
        self.bins.get(bin).copied().unwrap_or(0.0)
    }
}

/// Run all four preprocessing steps of spec.md §4.5 once per spectrum (independent of charge).
#[must_use]
pub fn preprocess(spectrum: &Spectrum, config: &PreprocessConfig) -> ProcessedSpectrum {
    let filtered: Vec<(f64, f64)> = spectrum
        .peaks()
        .iter()
        .filter(|p| {
            config.remove_precursor_tolerance.is_none_or(|tol| (p.mz - spectrum.precursor_mz).abs() > tol)
        })
        .map(|p| (p.mz, p.intensity))
        .collect();

    let max_bin = filtered
        .iter()
        .map(|&(mz, _)| ((mz + config.bin_offset) / config.bin_width).floor() as usize)
        .max()
        .unwrap_or(0);
    let mut bins = vec![0.0f64; max_bin + 1];
    for &(mz, intensity) in &filtered {
        let bin = ((mz + config.bin_offset) / config.bin_width).floor() as usize;
        if intensity > bins[bin] {
            bins[bin] = intensity;
        }
    }

    for bin in &mut bins {
        *bin = bin.sqrt();
    }

    normalise_by_region(&mut bins, config.normalisation_regions, config.normalisation_target);
    subtract_running_background(&mut bins, config.background_half_window);

    ProcessedSpectrum { bins, bin_width: config.bin_width, bin_offset: config.bin_offset }
}

fn normalise_by_region(bins: &mut [f64], regions: usize, target: f64) {
    if bins.is_empty() || regions == 0 {
        return;
    }
    let region_size = bins.len().div_ceil(regions);
    for region in bins.chunks_mut(region_size) {
        let max = region.iter().copied().fold(0.0f64, f64::max);
        if max > 0.0 {
            let scale = target / max;
            for value in region {
                *value *= scale;
            }
        }
    }
}

fn subtract_running_background(bins: &mut [f64], half_window: usize) {
    let original = bins.to_vec();
    for (i, bin) in bins.iter_mut().enumerate() {
        let lo = i.saturating_sub(half_window);
        let hi = (i + half_window).min(original.len().saturating_sub(1));
        let window_len = hi - lo + 1;
        let sum: f64 = original[lo..=hi].iter().sum();
        let mean = sum / window_len as f64;
        *bin = (original[i] - mean).max(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::Peak;

    #[test]
    fn removes_peaks_near_precursor() {
        let spectrum = Spectrum::new(
            1,
            1,
            500.0,
            vec![],
            vec![Peak { mz: 500.2, intensity: 100.0 }, Peak { mz: 200.0, intensity: 50.0 }],
        );
        let config = PreprocessConfig { remove_precursor_tolerance: Some(1.0), ..PreprocessConfig::default() };
        let processed = preprocess(&spectrum, &config);
        let precursor_bin = processed.bin_of(500.2);
        assert!((0.0..processed.bins().len() as f64).contains(&(precursor_bin as f64)));
        assert_eq!(processed.value_at(precursor_bin), 0.0);
    }

    #[test]
    fn preprocessing_is_deterministic() {
        let spectrum = Spectrum::new(
            1,
            1,
            500.0,
            vec![],
            vec![Peak { mz: 200.0, intensity: 50.0 }, Peak { mz: 210.0, intensity: 80.0 }],
        );
        let config = PreprocessConfig::default();
        let a = preprocess(&spectrum, &config);
        let b = preprocess(&spectrum, &config);
        assert_eq!(a.bins(), b.bins());
    }
}
