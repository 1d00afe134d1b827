use xlcore::chemistry::PROTON;

/// A single observed peak (spec.md §3 "Spectrum").
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Peak {
    pub mz: f64,
    pub intensity: f64,
}

/// How a spectrum's peak list is currently ordered; tracked explicitly because both orderings
/// are needed (XCorr wants m/z order for binning, Sp wants m/z order for nearest-peak queries,
/// but a parser may natively hand back intensity order).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PeakOrder {
    ByMz,
    ByIntensity,
    Unspecified,
}

/// Precursor charge-mass tuple (spec.md §3 "Z-state"): charge `z`, singly protonated mass `M+H`,
/// neutral mass, and m/z, kept consistent with each other at construction time rather than
/// recomputed ad hoc.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZState {
    charge: u8,
    mz: f64,
}

impl ZState {
    #[must_use]
    pub fn from_mz(charge: u8, mz: f64) -> Self {
        Self { charge, mz }
    }

    /// Build from an already-known neutral mass, the common case when a Z-state is *inferred*
    /// rather than read off the spectrum file.
    #[must_use]
    pub fn from_neutral_mass(charge: u8, neutral_mass: f64) -> Self {
        let mz = (neutral_mass + f64::from(charge) * PROTON) / f64::from(charge);
        Self { charge, mz }
    }

    #[must_use]
    pub fn charge(self) -> u8 {
        self.charge
    }

    #[must_use]
    pub fn mz(self) -> f64 {
        self.mz
    }

    /// `M+H`, the singly protonated mass.
    #[must_use]
    pub fn mh(self) -> f64 {
        self.mz * f64::from(self.charge) - f64::from(self.charge - 1) * PROTON
    }

    /// Neutral (uncharged) monoisotopic mass.
    #[must_use]
    pub fn neutral_mass(self) -> f64 {
        self.mz * f64::from(self.charge) - f64::from(self.charge) * PROTON
    }
}

/// An MS2 fragmentation spectrum (spec.md §3 "Spectrum"): scan range, precursor m/z, zero or
/// more Z-states (empty when the parser could not determine charge — see
/// [`crate::zstate_fallback`] in the `xlident` crate), and a peak list.
#[derive(Clone, Debug)]
pub struct Spectrum {
    pub first_scan: u32,
    pub last_scan: u32,
    pub precursor_mz: f64,
    pub z_states: Vec<ZState>,
    peaks: Vec<Peak>,
    order: PeakOrder,
}

impl Spectrum {
    #[must_use]
    pub fn new(first_scan: u32, last_scan: u32, precursor_mz: f64, z_states: Vec<ZState>, peaks: Vec<Peak>) -> Self {
        Self { first_scan, last_scan, precursor_mz, z_states, peaks, order: PeakOrder::Unspecified }
    }

    #[must_use]
    pub fn peaks(&self) -> &[Peak] {
        &self.peaks
    }

    #[must_use]
    pub fn peak_order(&self) -> PeakOrder {
        self.order
    }

    pub fn sort_by_mz(&mut self) {
        self.peaks.sort_by(|a, b| a.mz.partial_cmp(&b.mz).unwrap());
        self.order = PeakOrder::ByMz;
    }

    pub fn sort_by_intensity_desc(&mut self) {
        self.peaks.sort_by(|a, b| b.intensity.partial_cmp(&a.intensity).unwrap());
        self.order = PeakOrder::ByIntensity;
    }

    #[must_use]
    pub fn peak_count(&self) -> usize {
        self.peaks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zstate_round_trips_neutral_mass() {
        let z = ZState::from_neutral_mass(2, 1000.0);
        assert!((z.neutral_mass() - 1000.0).abs() < 1e-6);
    }

    #[test]
    fn sort_by_mz_updates_order() {
        let mut s = Spectrum::new(
            1,
            1,
            500.0,
            vec![],
            vec![Peak { mz: 300.0, intensity: 1.0 }, Peak { mz: 100.0, intensity: 2.0 }],
        );
        s.sort_by_mz();
        assert_eq!(s.peak_order(), PeakOrder::ByMz);
        assert!(s.peaks()[0].mz < s.peaks()[1].mz);
    }
}
