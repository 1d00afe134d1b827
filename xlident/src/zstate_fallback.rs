use xlannotate::prelude::{Peak, Spectrum, ZState};

/// Default value of the ratio threshold spec.md §4.8 calls `0.2 × correctionFactor`, exposed as a
/// tunable per spec.md §9 open question (iii) rather than hardcoded.
pub const DEFAULT_THRESHOLD: f64 = 0.2;

/// Infers Z-states for a spectrum that arrived with none, per spec.md §4.8: partition peaks into
/// those below `precursor m/z - 20` and those above `precursor m/z + 20`, and compare
/// `right_sum / left_sum` against `threshold`. A low ratio (most intensity below the precursor)
/// suggests a singly-charged precursor; otherwise both z=2 and z=3 are emitted since the heuristic
/// cannot itself distinguish between them.
///
/// Returns an empty vector if `spectrum` has no peaks on one side of the split (the ratio is
/// undefined), leaving the caller to treat this the same as a disabled fallback (spec.md §7 item
/// 3 "missing charge with fallback disabled").
#[must_use]
pub fn infer_z_states(spectrum: &Spectrum, threshold: f64) -> Vec<ZState> {
    let left_sum: f64 = below(spectrum.peaks(), spectrum.precursor_mz).map(|p| p.intensity).sum();
    let right_sum: f64 = above(spectrum.peaks(), spectrum.precursor_mz).map(|p| p.intensity).sum();
    if left_sum <= 0.0 {
        return Vec::new();
    }

    let ratio = right_sum / left_sum;
    if ratio < threshold {
        vec![ZState::from_mz(1, spectrum.precursor_mz)]
    } else {
        vec![ZState::from_mz(2, spectrum.precursor_mz), ZState::from_mz(3, spectrum.precursor_mz)]
    }
}

fn below(peaks: &[Peak], precursor_mz: f64) -> impl Iterator<Item = &Peak> {
    peaks.iter().filter(move |p| p.mz < precursor_mz - 20.0)
}

fn above(peaks: &[Peak], precursor_mz: f64) -> impl Iterator<Item = &Peak> {
    peaks.iter().filter(move |p| p.mz > precursor_mz + 20.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spectrum_with(peaks: Vec<Peak>) -> Spectrum {
        Spectrum::new(1, 1, 500.0, Vec::new(), peaks)
    }

    #[test]
    fn mostly_low_mass_intensity_infers_singly_charged() {
        let spectrum = spectrum_with(vec![
            Peak { mz: 100.0, intensity: 90.0 },
            Peak { mz: 900.0, intensity: 10.0 },
        ]);
        let z_states = infer_z_states(&spectrum, DEFAULT_THRESHOLD);
        assert_eq!(z_states.len(), 1);
        assert_eq!(z_states[0].charge(), 1);
    }

    #[test]
    fn substantial_high_mass_intensity_infers_two_and_three() {
        let spectrum = spectrum_with(vec![
            Peak { mz: 100.0, intensity: 10.0 },
            Peak { mz: 900.0, intensity: 10.0 },
        ]);
        let z_states = infer_z_states(&spectrum, DEFAULT_THRESHOLD);
        assert_eq!(z_states.len(), 2);
        assert_eq!(z_states[0].charge(), 2);
        assert_eq!(z_states[1].charge(), 3);
    }

    #[test]
    fn no_low_mass_peaks_yields_no_inference() {
        let spectrum = spectrum_with(vec![Peak { mz: 900.0, intensity: 10.0 }]);
        assert!(infer_z_states(&spectrum, DEFAULT_THRESHOLD).is_empty());
    }
}
