use xlcore::chemistry::{MassMode, PROTON, WATER, average_residue_mass, monoisotopic_residue_mass};
use xlcore::sequence::{Candidate, ModificationTable, Peptide, MAX_MODIFICATIONS};

const CO: f64 = 27.994915;
const NH3: f64 = 17.026549;

/// One of the six standard backbone cleavage ion series (spec.md §4.4).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum IonKind {
    A,
    B,
    C,
    X,
    Y,
    Z,
}

impl IonKind {
    /// Forward (N-terminal fragment) series are a/b/c; reverse (C-terminal fragment) are x/y/z.
    #[must_use]
    pub fn is_forward(self) -> bool {
        matches!(self, Self::A | Self::B | Self::C)
    }

    /// Mass offset from the bare prefix-sum/suffix-sum backbone mass.
    fn neutral_offset(self) -> f64 {
        match self {
            Self::B => PROTON,
            Self::A => PROTON - CO,
            Self::C => PROTON + NH3,
            Self::Y => WATER + PROTON,
            Self::X => WATER + PROTON + CO - 2.0 * PROTON,
            Self::Z => WATER + PROTON - NH3,
        }
    }
}

/// Which candidate peptide a fragment was predicted from; meaningful only for cross-link
/// candidates, which score two independent per-peptide XCorrs (spec.md §4.5 "per cross-link
/// candidate").
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FragmentOwner {
    Single,
    First,
    Second,
}

/// A single theoretical fragment ion.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fragment {
    pub kind: IonKind,
    pub charge: u8,
    pub mz: f64,
    pub cleavage_index: usize,
    pub owner: FragmentOwner,
}

/// Which ion series and charges to predict (spec.md §4.4 "Contract", §6 `use-a/b/c/x/y/z-ions`,
/// `max-ion-charge`, `use-flanking-peaks`).
#[derive(Clone, Copy, Debug)]
pub struct IonPredictionConfig {
    pub use_a: bool,
    pub use_b: bool,
    pub use_c: bool,
    pub use_x: bool,
    pub use_y: bool,
    pub use_z: bool,
    pub max_ion_charge: u8,
    pub use_flanking_peaks: bool,
    pub mass_mode: MassMode,
}

impl Default for IonPredictionConfig {
    fn default() -> Self {
        Self {
            use_a: false,
            use_b: true,
            use_c: false,
            use_x: false,
            use_y: true,
            use_z: false,
            max_ion_charge: 2,
            use_flanking_peaks: false,
            mass_mode: MassMode::Monoisotopic,
        }
    }
}

impl IonPredictionConfig {
    fn series(self) -> Vec<IonKind> {
        let mut out = Vec::with_capacity(6);
        if self.use_a {
            out.push(IonKind::A);
        }
        if self.use_b {
            out.push(IonKind::B);
        }
        if self.use_c {
            out.push(IonKind::C);
        }
        if self.use_x {
            out.push(IonKind::X);
        }
        if self.use_y {
            out.push(IonKind::Y);
        }
        if self.use_z {
            out.push(IonKind::Z);
        }
        out
    }
}

/// Per-residue mass including any applied modification deltas, in sequence order.
fn residue_masses(peptide: &Peptide, mods: &ModificationTable, mode: MassMode) -> Vec<f64> {
    let base = match mode {
        MassMode::Monoisotopic => monoisotopic_residue_mass,
        MassMode::Average => average_residue_mass,
    };
    peptide
        .residues()
        .iter()
        .map(|r| {
            let delta: f64 = (0..MAX_MODIFICATIONS)
                .filter(|&i| r.has_modification(i))
                .filter_map(|i| mods.get(i))
                .map(|m| m.mass_delta)
                .sum();
            base(r.letter()) + delta
        })
        .collect()
}

fn prefix_sums(masses: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(masses.len() + 1);
    out.push(0.0);
    let mut running = 0.0;
    for m in masses {
        running += m;
        out.push(running);
    }
    out
}

/// Predict every configured ion, at charges `1..=min(z, max_ion_charge)`, for a single linear
/// backbone with an optional extra mass added to fragments on one side of `carry_from` (spec.md
/// §4.4 "Rules" — this single routine implements the linear/mono-link, self-loop, and cross-link
/// cases, which differ only in which side of which cleavage index carries `extra_mass`, and
/// whether a middle range is suppressed).
///
/// `carry` and `suppress` are evaluated per `(cleavage index, is this ion series forward)`, since
/// a forward fragment `[0, c)` and a reverse fragment `[c, n)` at the same cleavage index `c`
/// contain different residues and so can disagree on whether a link site falls inside them.
fn predict_backbone(
    masses: &[f64],
    owner: FragmentOwner,
    config: &IonPredictionConfig,
    z: u8,
    carry: impl Fn(usize, bool) -> Option<f64>,
    suppress: impl Fn(usize, bool) -> bool,
) -> Vec<Fragment> {
    let n = masses.len();
    let prefix = prefix_sums(masses);
    let total: f64 = masses.iter().sum();
    let max_charge = z.min(config.max_ion_charge).max(1);
    let mut out = Vec::new();

    for kind in config.series() {
        let forward = kind.is_forward();
        for c in 1..n {
            if suppress(c, forward) {
                continue;
            }
            let backbone = if forward { prefix[c] } else { total - prefix[c] };
            let neutral = backbone + kind.neutral_offset() + carry(c, forward).unwrap_or(0.0);
            for charge in 1..=max_charge {
                let mz = (neutral + f64::from(charge - 1) * PROTON) / f64::from(charge);
                out.push(Fragment { kind, charge, mz, cleavage_index: c, owner });
            }
        }
    }
    out
}

/// Whether the fragment produced by cleaving at `c` (forward: residues `[0, c)`; reverse:
/// residues `[c, n)`) contains residue position `site`.
fn fragment_contains(site: usize, c: usize, forward: bool) -> bool {
    if forward { site < c } else { site >= c }
}

/// Standard linear/mono-link fragmentation: no suppression, no carried mass (spec.md §4.4
/// "Linear / mono-link").
#[must_use]
pub fn predict_linear(peptide: &Peptide, mods: &ModificationTable, config: &IonPredictionConfig, z: u8) -> Vec<Fragment> {
    let masses = residue_masses(peptide, mods, config.mass_mode);
    predict_backbone(&masses, FragmentOwner::Single, config, z, |_, _| None, |_, _| false)
}

/// Self-loop fragmentation: a cleavage whose fragment contains exactly one of the two link sites
/// is suppressed (the macrocycle still holds the backbone together, so no discrete ion is
/// released); a cleavage whose fragment contains both sites carries the linker mass (spec.md
/// §4.4 "Self-loop").
#[must_use]
pub fn predict_self_loop(
    peptide: &Peptide,
    mods: &ModificationTable,
    config: &IonPredictionConfig,
    z: u8,
    site_i: usize,
    site_j: usize,
    linker_mass: f64,
) -> Vec<Fragment> {
    let masses = residue_masses(peptide, mods, config.mass_mode);
    predict_backbone(
        &masses,
        FragmentOwner::Single,
        config,
        z,
        move |c, forward| {
            let both = fragment_contains(site_i, c, forward) && fragment_contains(site_j, c, forward);
            both.then_some(linker_mass)
        },
        move |c, forward| fragment_contains(site_i, c, forward) != fragment_contains(site_j, c, forward),
    )
}

/// Cross-link fragmentation for one of the two peptides: a cleavage whose fragment contains the
/// link site carries the partner peptide's mass plus the linker mass (spec.md §4.4
/// "Cross-link").
#[must_use]
pub fn predict_cross_link_side(
    peptide: &Peptide,
    mods: &ModificationTable,
    config: &IonPredictionConfig,
    z: u8,
    site: usize,
    owner: FragmentOwner,
    partner_mass: f64,
    linker_mass: f64,
) -> Vec<Fragment> {
    let masses = residue_masses(peptide, mods, config.mass_mode);
    let extra = partner_mass + linker_mass;
    predict_backbone(
        &masses,
        owner,
        config,
        z,
        move |c, forward| fragment_contains(site, c, forward).then_some(extra),
        |_, _| false,
    )
}

/// Predict ions for any [`Candidate`] kind by dispatching to the appropriate rule above.
pub fn predict_ions(
    candidate: &Candidate,
    mods: &ModificationTable,
    config: &IonPredictionConfig,
    z: u8,
) -> Vec<Fragment> {
    match candidate {
        Candidate::Linear(c) => predict_linear(&c.peptide, mods, config, z),
        Candidate::SelfLoop(c) => {
            predict_self_loop(&c.peptide, mods, config, z, c.site_i, c.site_j, c.linker_mass)
        }
        Candidate::CrossLink(c) => {
            let mass_a = c.first.monoisotopic_mass(mods);
            let mass_b = c.second.monoisotopic_mass(mods);
            let mut ions = predict_cross_link_side(
                c.first.peptide(),
                mods,
                config,
                z,
                c.first_site,
                FragmentOwner::First,
                mass_b,
                c.linker_mass,
            );
            ions.extend(predict_cross_link_side(
                c.second.peptide(),
                mods,
                config,
                z,
                c.second_site,
                FragmentOwner::Second,
                mass_a,
                c.linker_mass,
            ));
            ions
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xlcore::sequence::{LinearCandidate, ModifiedResidue, PeptideSourceRef};
    use std::sync::Arc;

    fn peptide(seq: &str) -> Peptide {
        Peptide::from_residues(
            seq.bytes().map(ModifiedResidue::new).collect(),
            vec![PeptideSourceRef { protein_id: Arc::from("P1"), start: 0, protein_length: seq.len() }],
            None,
            None,
            vec![],
            false,
        )
    }

    #[test]
    fn linear_b1_matches_first_residue_plus_proton() {
        let p = peptide("MRAPK");
        let mods = ModificationTable::default();
        let config = IonPredictionConfig::default();
        let ions = predict_linear(&p, &mods, &config, 1);
        let b1 = ions.iter().find(|f| f.kind == IonKind::B && f.cleavage_index == 1 && f.charge == 1).unwrap();
        let expected = monoisotopic_residue_mass(b'M') + PROTON;
        assert!((b1.mz - expected).abs() < 1e-6);
    }

    #[test]
    fn self_loop_suppresses_middle_cleavages() {
        let p = peptide("MKAKM");
        let mods = ModificationTable::default();
        let config = IonPredictionConfig::default();
        let ions = predict_self_loop(&p, &mods, &config, 1, 1, 3, 138.0681);
        assert!(!ions.iter().any(|f| f.kind == IonKind::B && f.cleavage_index == 2));
        assert!(ions.iter().any(|f| f.kind == IonKind::B && f.cleavage_index == 4));
    }

    #[test]
    fn candidate_dispatch_predicts_linear() {
        let p = Arc::new(peptide("MRAPK"));
        let candidate = Candidate::Linear(LinearCandidate::new(p, false));
        let mods = ModificationTable::default();
        let config = IonPredictionConfig::default();
        assert!(!predict_ions(&candidate, &mods, &config, 2).is_empty());
    }
}
