use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::Arc;

use xlannotate::fragment::predict_cross_link_side;
use xlannotate::prelude::{FragmentOwner, IonPredictionConfig, ProcessedSpectrum, xcorr};
use xlcore::prelude::{
    BondMap, Candidate, CandidateDatabase, CrossLinkCandidate, CrossLinkRelation, LinearCandidate,
    LinkablePeptide,
};
use xlcore::sequence::{FlatLinkablePeptide, ModificationTable};

use crate::config::Config;

/// Target and decoy candidates found in one precursor mass window (spec.md §4.3 "Contract").
#[derive(Clone, Debug, Default)]
pub struct EnumeratedCandidates {
    pub targets: Vec<Candidate>,
    pub decoys: Vec<Candidate>,
}

impl EnumeratedCandidates {
    fn merge(mut self, other: Self) -> Self {
        self.targets.extend(other.targets);
        self.decoys.extend(other.decoys);
        self
    }
}

/// Enumerate every candidate class enabled by `config` whose mass falls in `[lo, hi]`, across
/// every configured isotope offset (spec.md §4.3 "for each isotope offset k ... computes [lo, hi]
/// = window around M_prec + k * m_neutron").
///
/// `scoring` is `Some` only when `config.xlink_top_n > 0`, in which case cross-link pairs use the
/// top-N preliminary-XCorr pre-filter (spec.md §4.3 "Top-N pre-filter"); otherwise the full
/// partner-range search is used.
#[must_use]
pub fn enumerate(
    database: &CandidateDatabase,
    bond_map: &BondMap,
    config: &Config,
    precursor_neutral_mass: f64,
    scoring: Option<TopNScoring<'_>>,
) -> EnumeratedCandidates {
    let tolerance = config.precursor_tolerance();
    let mut out = EnumeratedCandidates::default();
    for &offset in &config.isotope_windows {
        let shifted_mass = precursor_neutral_mass + f64::from(offset) * xlcore::chemistry::NEUTRON;
        let (lo, hi) = tolerance.bounds(shifted_mass);
        out = out.merge(enumerate_window(database, bond_map, config, lo, hi, shifted_mass, scoring));
    }
    out
}

/// Enumerate a single window, without the isotope-offset loop; also used directly to build the
/// (generally wider) Weibull-training decoy set (spec.md §4.3 "Decoy window").
#[must_use]
pub fn enumerate_window(
    database: &CandidateDatabase,
    bond_map: &BondMap,
    config: &Config,
    lo: f64,
    hi: f64,
    precursor_neutral_mass: f64,
    scoring: Option<TopNScoring<'_>>,
) -> EnumeratedCandidates {
    let mods = database.modification_table();
    let mut targets = enumerate_singles(database, config, false, lo, hi);
    let mut decoys = enumerate_singles(database, config, true, lo, hi);

    if config.xlink_include_inter || config.xlink_include_intra || config.xlink_include_inter_intra {
        let pair_fn = |first_decoy: bool, second_decoy: bool| -> Vec<CrossLinkCandidate> {
            if let Some(scoring) = scoring.as_ref().filter(|_| config.xlink_top_n > 0) {
                cross_link_pairs_top_n(
                    database, bond_map, config, mods, lo, hi, precursor_neutral_mass, scoring,
                    first_decoy, second_decoy,
                )
            } else {
                cross_link_pairs_full(database, bond_map, config, mods, lo, hi, first_decoy, second_decoy)
            }
        };

        targets.extend(pair_fn(false, false).into_iter().map(Candidate::CrossLink));
        let mut decoy_pairs = pair_fn(true, true);
        decoy_pairs.extend(pair_fn(false, true));
        decoys.extend(decoy_pairs.into_iter().map(Candidate::CrossLink));
    }

    EnumeratedCandidates { targets, decoys }
}

/// Linears, mono-links (dead-ends), and self-loops: plain range queries, every element in
/// `[lo, hi]` becomes a candidate (spec.md §4.3 "Linears, mono-links, self-loops").
fn enumerate_singles(
    database: &CandidateDatabase,
    config: &Config,
    decoy: bool,
    lo: f64,
    hi: f64,
) -> Vec<Candidate> {
    let mut out = Vec::new();
    if config.xlink_include_linears {
        out.extend(
            database.linear_range(decoy, lo, hi).iter().map(|p| Candidate::Linear(LinearCandidate::new(Arc::clone(p), false))),
        );
    }
    if config.xlink_include_deadends {
        out.extend(
            database.mono_link_range(decoy, lo, hi).iter().map(|p| Candidate::Linear(LinearCandidate::new(Arc::clone(p), true))),
        );
    }
    if config.xlink_include_selfloops {
        out.extend(database.self_loop_range(decoy, lo, hi).iter().cloned().map(Candidate::SelfLoop));
    }
    out
}

fn relation_allowed(relation: CrossLinkRelation, config: &Config) -> bool {
    match relation {
        CrossLinkRelation::Intra => config.xlink_include_intra,
        CrossLinkRelation::Inter => config.xlink_include_inter,
        CrossLinkRelation::InterIntra => config.xlink_include_inter_intra,
    }
}

/// `[begin, end)` index range of `full` (assumed sorted ascending by monoisotopic mass) whose
/// mass falls in `[lo, hi]`, as absolute positions into `full` (spec.md §4.3 "index(p2) >
/// index(p1)" requires a stable absolute ordering, not just a sub-slice).
fn mass_bounds(full: &[Arc<LinkablePeptide>], lo: f64, hi: f64, mods: &ModificationTable) -> (usize, usize) {
    let begin = full.partition_point(|p| p.monoisotopic_mass(mods) < lo);
    let end = full.partition_point(|p| p.monoisotopic_mass(mods) <= hi);
    (begin, end.max(begin))
}

fn admits_candidate(
    p1: &LinkablePeptide,
    site_i: usize,
    p2: &LinkablePeptide,
    site_j: usize,
    bond_map: &BondMap,
    mods: &ModificationTable,
    config: &Config,
) -> bool {
    if !bond_map.can_link_pair(p1.peptide(), site_i, p2.peptide(), site_j) {
        return false;
    }
    let combined_mods = p1.peptide().modification_count() + p2.peptide().modification_count();
    if config.max_xlink_mods > 0 && combined_mods > config.max_xlink_mods {
        return false;
    }
    let skip_i: BTreeSet<usize> = [site_i].into_iter().collect();
    let skip_j: BTreeSet<usize> = [site_j].into_iter().collect();
    p1.peptide().missed_cleavages(&skip_i, mods) <= config.missed_cleavages
        && p2.peptide().missed_cleavages(&skip_j, mods) <= config.missed_cleavages
}

/// The full quadratic-avoiding partner-range search (spec.md §4.3 "Cross-link pairs"): for each
/// linkable peptide `p1` in `[M_min, M_hi - M_link - M_min]`, compute the partner range
/// `[M_lo - m1 - M_link, M_hi - m1 - M_link]` and pair with every `p2` there, applying the
/// inter/intra filter and the combined modification and missed-cleavage caps.
#[allow(clippy::too_many_arguments)]
fn cross_link_pairs_full(
    database: &CandidateDatabase,
    bond_map: &BondMap,
    config: &Config,
    mods: &ModificationTable,
    lo: f64,
    hi: f64,
    first_decoy: bool,
    second_decoy: bool,
) -> Vec<CrossLinkCandidate> {
    let first_full = database.linkable_peptides(first_decoy);
    let second_full = database.linkable_peptides(second_decoy);
    let same_list = first_decoy == second_decoy;
    let Some(m_min) = database.min_linkable_mass(first_decoy) else { return Vec::new() };

    let mut out = Vec::new();
    let (begin1, end1) = mass_bounds(first_full, m_min, hi - config.link_mass - m_min, mods);
    for i1 in begin1..end1 {
        let p1 = &first_full[i1];
        let m1 = p1.monoisotopic_mass(mods);
        let (begin2, end2) = mass_bounds(second_full, lo - m1 - config.link_mass, hi - m1 - config.link_mass, mods);
        for i2 in begin2..end2 {
            if same_list && i2 <= i1 {
                continue;
            }
            let p2 = &second_full[i2];
            push_site_pairs(p1, p2, bond_map, mods, config, config.link_mass, &mut out);
        }
    }
    out
}

fn push_site_pairs(
    p1: &Arc<LinkablePeptide>,
    p2: &Arc<LinkablePeptide>,
    bond_map: &BondMap,
    mods: &ModificationTable,
    config: &Config,
    linker_mass: f64,
    out: &mut Vec<CrossLinkCandidate>,
) {
    for &site_i in p1.link_sites() {
        for &site_j in p2.link_sites() {
            if !admits_candidate(p1, site_i, p2, site_j, bond_map, mods, config) {
                continue;
            }
            let candidate = CrossLinkCandidate::new(Arc::clone(p1), site_i, Arc::clone(p2), site_j, linker_mass, mods);
            if relation_allowed(candidate.relation, config) {
                out.push(candidate);
            }
        }
    }
}

/// Per-peptide-per-site preliminary XCorr inputs for the top-N pre-filter (spec.md §4.3
/// "Top-N pre-filter").
#[derive(Clone, Copy)]
pub struct TopNScoring<'a> {
    pub processed: &'a ProcessedSpectrum,
    pub ion_config: &'a IonPredictionConfig,
    pub charge: u8,
}

/// Score every flattened `(peptide, site)` pair in `[m_min, hi - link - m_min]` by cheap XCorr
/// against `scoring.processed`, using a single mass shift `M_prec - m_peptide` on the link site in
/// place of an unknown partner (spec.md §4.3 "compute cheap XCorr ... using mass shift = M_prec -
/// m_peptide on the link site"), then keep the top `xlink-top-n` (spec.md §6 `xlink-top-n`).
fn top_n_flattened(
    database: &CandidateDatabase,
    config: &Config,
    mods: &ModificationTable,
    lo: f64,
    hi: f64,
    precursor_neutral_mass: f64,
    scoring: &TopNScoring<'_>,
    decoy: bool,
) -> Vec<FlatLinkablePeptide> {
    let _ = lo;
    let Some(m_min) = database.min_linkable_mass(decoy) else { return Vec::new() };
    let flattened = database.flattened_linkable_range(decoy, m_min, hi - config.link_mass - m_min);

    let mut scored: Vec<(f64, FlatLinkablePeptide)> = flattened
        .iter()
        .map(|flat| {
            let peptide_mass = flat.monoisotopic_mass(mods);
            let shift = precursor_neutral_mass - peptide_mass;
            let fragments = predict_cross_link_side(
                flat.linkable().peptide(),
                mods,
                scoring.ion_config,
                scoring.charge,
                flat.site(),
                FragmentOwner::Single,
                shift - config.link_mass,
                config.link_mass,
            );
            let score = xcorr(scoring.processed, &fragments, scoring.ion_config.use_flanking_peaks);
            flat.linkable().set_preliminary_xcorr(score);
            (score, flat.clone())
        })
        .collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
    scored.truncate(config.xlink_top_n);
    scored.into_iter().map(|(_, flat)| flat).collect()
}

/// Top-N-approximated cross-link pair search: restrict both sides to the top-N flattened
/// single-peptide candidates before forming pairs, so only `O(N^2)` pairs (rather than the full
/// partner-range product) are ever materialised (spec.md §4.3 "only form cross-link candidates
/// among those N").
#[allow(clippy::too_many_arguments)]
fn cross_link_pairs_top_n(
    database: &CandidateDatabase,
    bond_map: &BondMap,
    config: &Config,
    mods: &ModificationTable,
    lo: f64,
    hi: f64,
    precursor_neutral_mass: f64,
    scoring: &TopNScoring<'_>,
    first_decoy: bool,
    second_decoy: bool,
) -> Vec<CrossLinkCandidate> {
    let first_top = top_n_flattened(database, config, mods, lo, hi, precursor_neutral_mass, scoring, first_decoy);
    let second_top = if first_decoy == second_decoy {
        first_top.clone()
    } else {
        top_n_flattened(database, config, mods, lo, hi, precursor_neutral_mass, scoring, second_decoy)
    };
    let same_list = first_decoy == second_decoy;

    let mut out = Vec::new();
    for (i1, flat1) in first_top.iter().enumerate() {
        for (i2, flat2) in second_top.iter().enumerate() {
            if same_list && i2 <= i1 {
                continue;
            }
            if Arc::ptr_eq(flat1.linkable(), flat2.linkable()) {
                continue;
            }
            if !admits_candidate(flat1.linkable(), flat1.site(), flat2.linkable(), flat2.site(), bond_map, mods, config) {
                continue;
            }
            let candidate = CrossLinkCandidate::new(
                Arc::clone(flat1.linkable()),
                flat1.site(),
                Arc::clone(flat2.linkable()),
                flat2.site(),
                config.link_mass,
                mods,
            );
            if relation_allowed(candidate.relation, config) {
                out.push(candidate);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use xlcore::prelude::{CandidateDatabase as Db, DigestedPeptide, PeptideSource};
    use xlcore::sequence::{ModificationTable as Mods, PeptideSourceRef};

    struct OnePeptide(Vec<u8>);
    impl PeptideSource for OnePeptide {
        fn digest(&self, _max_missed: usize, _min_len: usize, _max_len: usize) -> Vec<DigestedPeptide> {
            vec![DigestedPeptide {
                sequence: self.0.clone(),
                sources: vec![PeptideSourceRef { protein_id: Arc::from("P1"), start: 0, protein_length: self.0.len() }],
                missed_cleavage_sites: vec![],
                flanking_n: None,
                flanking_c: None,
            }]
        }
    }

    fn database_config() -> xlcore::prelude::DatabaseConfig {
        use xlcore::prelude::DatabaseConfig;
        DatabaseConfig {
            enable_linear: true,
            enable_mono_link: false,
            enable_self_loop: false,
            enable_cross_link: true,
            min_length: 2,
            max_length: 20,
            max_missed_cleavages: 2,
            max_mods_per_peptide: 0,
            linker_mass: 138.0681,
            generate_decoys: false,
        }
    }

    #[test]
    fn enumerates_linear_candidate_in_window() {
        let source = OnePeptide(b"MRAPK".to_vec());
        let bond_map = BondMap::parse("K:K").unwrap();
        let mods = Mods::default();
        let mut rng = StdRng::seed_from_u64(1);
        let db = Db::build(&source, &bond_map, mods, database_config(), &mut rng);
        let config = Config { xlink_include_selfloops: false, ..Config::default() };
        let mass = db.linear_range(false, 0.0, f64::MAX)[0].monoisotopic_mass(db.modification_table());
        let found = enumerate(&db, &bond_map, &config, mass, None);
        assert_eq!(found.targets.len(), 1);
    }
}
