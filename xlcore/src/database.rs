use std::collections::BTreeSet;
use std::sync::Arc;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use rand::RngCore;

use crate::decoy::shuffle_peptide;
use crate::peptide_source::PeptideSource;
use crate::sequence::{
    BondMap, CandidateLike, FlatLinkablePeptide, LinkablePeptide, ModificationTable,
    ModifiedResidue, Peptide, SelfLoopCandidate,
};

/// Which candidate classes a database build should populate, and the budgets governing
/// enumeration (spec.md §4.2 "Construction").
#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub enable_linear: bool,
    pub enable_mono_link: bool,
    pub enable_self_loop: bool,
    pub enable_cross_link: bool,
    pub min_length: usize,
    pub max_length: usize,
    /// The user-configured (un-inflated) missed-cleavage budget checked against each finished
    /// candidate.
    pub max_missed_cleavages: usize,
    /// Global cap on the number of modified residues a single peptide may carry while still
    /// being eligible as a linkable peptide (distinct from the pairwise `max-xlink-mods` the
    /// enumerator applies to a candidate's two peptides combined). `0` means unlimited, not zero
    /// allowed — see [`DatabaseConfig::effective_max_mods_per_peptide`].
    pub max_mods_per_peptide: usize,
    pub linker_mass: f64,
    pub generate_decoys: bool,
}

impl DatabaseConfig {
    /// The missed-cleavage budget passed to the peptide source, inflated per spec.md §4.2 step 1
    /// so that link sites and prevents-cleavage modifications consumed later do not starve
    /// digestion of candidates that should have survived.
    #[must_use]
    pub fn inflated_missed_cleavages(&self, mods: &ModificationTable) -> usize {
        let additional = if self.enable_self_loop {
            2
        } else if self.enable_cross_link {
            1
        } else {
            0
        };
        self.max_missed_cleavages + additional + mods.max_prevents_cleavage_count()
    }

    /// `max_mods_per_peptide`, with `0` read as "unlimited" rather than "zero allowed" — the same
    /// convention `xlident::enumerator` uses for `max-xlink-mods` (spec.md §4.2 step 2).
    #[must_use]
    pub fn effective_max_mods_per_peptide(&self) -> usize {
        if self.max_mods_per_peptide == 0 { usize::MAX } else { self.max_mods_per_peptide }
    }
}

/// One decoy-flag's worth of the five parallel catalogues spec.md §3 "Candidate database"
/// describes, each sorted by cached monoisotopic mass.
#[derive(Debug, Default)]
struct CandidateList {
    linear: Vec<Arc<Peptide>>,
    mono_link: Vec<Arc<Peptide>>,
    self_loop: Vec<SelfLoopCandidate>,
    linkable: Vec<Arc<LinkablePeptide>>,
    flattened: Vec<FlatLinkablePeptide>,
}

impl CandidateList {
    fn extend(&mut self, other: Self) {
        self.linear.extend(other.linear);
        self.mono_link.extend(other.mono_link);
        self.self_loop.extend(other.self_loop);
        self.linkable.extend(other.linkable);
        self.flattened.extend(other.flattened);
    }

    fn sort(&mut self, mods: &ModificationTable) {
        self.linear.sort_by(|a, b| a.monoisotopic_mass(mods).partial_cmp(&b.monoisotopic_mass(mods)).unwrap());
        self.mono_link.sort_by(|a, b| a.monoisotopic_mass(mods).partial_cmp(&b.monoisotopic_mass(mods)).unwrap());
        self.self_loop.sort_by(|a, b| a.mass(mods).partial_cmp(&b.mass(mods)).unwrap());
        self.linkable
            .sort_by(|a, b| a.cmp_by_mass_then_sequence(b, mods));
        self.flattened
            .sort_by(|a, b| a.monoisotopic_mass(mods).partial_cmp(&b.monoisotopic_mass(mods)).unwrap());
    }
}

/// Mass-sorted catalogues of every linear, mono-link, self-loop, and linkable peptide derivable
/// from a protein database under the configured enzyme, modification, and cross-link-site
/// specification (spec.md §4.2). Built once per run; teardown drops all owned peptide and
/// candidate storage.
#[derive(Debug)]
pub struct CandidateDatabase {
    targets: CandidateList,
    decoys: CandidateList,
    mods: ModificationTable,
    config: DatabaseConfig,
}

impl CandidateDatabase {
    /// Build the database from a peptide source and a bond map, per spec.md §4.2 steps 1-5.
    pub fn build(
        source: &dyn PeptideSource,
        bond_map: &BondMap,
        mods: ModificationTable,
        config: DatabaseConfig,
        rng: &mut impl RngCore,
    ) -> Self {
        let inflated_budget = config.inflated_missed_cleavages(&mods);
        let digested = source.digest(inflated_budget, config.min_length, config.max_length);

        // Every unmodified peptide's variant generation and classification is independent of
        // every other's, so this is embarrassingly parallel across the digest (spec.md §5).
        #[cfg(feature = "rayon")]
        let per_peptide_lists: Vec<CandidateList> = digested
            .par_iter()
            .map(|unmodified| classify_unmodified_peptide(unmodified, bond_map, &mods, &config))
            .collect();
        #[cfg(not(feature = "rayon"))]
        let per_peptide_lists: Vec<CandidateList> = digested
            .iter()
            .map(|unmodified| classify_unmodified_peptide(unmodified, bond_map, &mods, &config))
            .collect();

        let mut targets = CandidateList::default();
        for list in per_peptide_lists {
            targets.extend(list);
        }
        targets.sort(&mods);

        let mut decoys = CandidateList::default();
        if config.generate_decoys {
            decoys = build_decoy_list(&targets, bond_map, &mods, &config, rng);
            decoys.sort(&mods);
        }

        Self { targets, decoys, mods, config }
    }

    #[must_use]
    pub fn modification_table(&self) -> &ModificationTable {
        &self.mods
    }

    #[must_use]
    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    fn list(&self, decoy: bool) -> &CandidateList {
        if decoy { &self.decoys } else { &self.targets }
    }

    /// `[lo, hi]` range of linear-peptide indices whose mass falls in the window, found by binary
    /// search on the cached mass (spec.md §4.2 "Query contract").
    #[must_use]
    pub fn linear_range(&self, decoy: bool, lo: f64, hi: f64) -> &[Arc<Peptide>] {
        mass_range(&self.list(decoy).linear, lo, hi, |p| p.monoisotopic_mass(&self.mods))
    }

    #[must_use]
    pub fn mono_link_range(&self, decoy: bool, lo: f64, hi: f64) -> &[Arc<Peptide>] {
        mass_range(&self.list(decoy).mono_link, lo, hi, |p| p.monoisotopic_mass(&self.mods))
    }

    #[must_use]
    pub fn self_loop_range(&self, decoy: bool, lo: f64, hi: f64) -> &[SelfLoopCandidate] {
        mass_range(&self.list(decoy).self_loop, lo, hi, |c| c.mass(&self.mods))
    }

    #[must_use]
    pub fn linkable_range(&self, decoy: bool, lo: f64, hi: f64) -> &[Arc<LinkablePeptide>] {
        mass_range(&self.list(decoy).linkable, lo, hi, |p| p.monoisotopic_mass(&self.mods))
    }

    #[must_use]
    pub fn flattened_linkable_range(&self, decoy: bool, lo: f64, hi: f64) -> &[FlatLinkablePeptide] {
        mass_range(&self.list(decoy).flattened, lo, hi, |p| p.monoisotopic_mass(&self.mods))
    }

    /// Smallest mass among target linkable peptides, used by the enumerator to bound the
    /// partner-peptide search range (spec.md §4.3 "Cross-link pairs").
    #[must_use]
    pub fn min_linkable_mass(&self, decoy: bool) -> Option<f64> {
        self.list(decoy).linkable.first().map(|p| p.monoisotopic_mass(&self.mods))
    }

    #[must_use]
    pub fn linkable_peptides(&self, decoy: bool) -> &[Arc<LinkablePeptide>] {
        &self.list(decoy).linkable
    }
}

/// Binary-search `[lo, hi]` in a list pre-sorted by `key`, returning the contiguous slice within
/// bounds (spec.md §4.2 "`getXLinkableBegin(lo)` / `getXLinkableEnd(hi)` are O(log N)").
fn mass_range<T>(items: &[T], lo: f64, hi: f64, key: impl Fn(&T) -> f64) -> &[T] {
    let begin = items.partition_point(|item| key(item) < lo);
    let end = items.partition_point(|item| key(item) <= hi);
    &items[begin..end.max(begin)]
}

fn generate_modified_variants(
    sequence: &[u8],
    mods: &ModificationTable,
    max_mods_per_peptide: usize,
) -> Vec<Vec<ModifiedResidue>> {
    let len = sequence.len();
    let applicable: Vec<(usize, usize)> = (0..len)
        .flat_map(|pos| {
            mods.iter()
                .filter(move |(_, m)| m.allows_residue(sequence[pos]) && m.position.allows(pos, len))
                .map(move |(idx, _)| (pos, idx))
        })
        .collect();

    let mut variants = Vec::new();
    let base: Vec<ModifiedResidue> = sequence.iter().copied().map(ModifiedResidue::new).collect();
    let mut per_mod_counts = vec![0usize; mods.len()];
    enumerate_subsets(&applicable, 0, mods, max_mods_per_peptide, &mut per_mod_counts, base.clone(), &mut variants);
    variants
}

/// Backtracking enumeration of every subset of `applicable (position, modification)` pairs that
/// respects each modification's per-peptide cap and the overall `max_mods_per_peptide` cap
/// (spec.md §4.2 step 2, "Cartesian product of variable modifications ... respecting each
/// modification's per-peptide cap and the global modified-residue cap").
fn enumerate_subsets(
    applicable: &[(usize, usize)],
    start: usize,
    mods: &ModificationTable,
    max_mods_per_peptide: usize,
    per_mod_counts: &mut [usize],
    current: Vec<ModifiedResidue>,
    out: &mut Vec<Vec<ModifiedResidue>>,
) {
    out.push(current.clone());
    for i in start..applicable.len() {
        let (pos, mod_idx) = applicable[i];
        let Some(modification) = mods.get(mod_idx) else { continue };
        if per_mod_counts[mod_idx] >= modification.per_peptide_cap {
            continue;
        }
        if current.iter().map(|r| r.modification_count() as usize).sum::<usize>() >= max_mods_per_peptide {
            continue;
        }
        let mut next = current.clone();
        next[pos] = next[pos].with_modification(mod_idx);
        per_mod_counts[mod_idx] += 1;
        enumerate_subsets(applicable, i + 1, mods, max_mods_per_peptide, per_mod_counts, next, out);
        per_mod_counts[mod_idx] -= 1;
    }
}

fn classify_unmodified_peptide(
    unmodified: &crate::peptide_source::DigestedPeptide,
    bond_map: &BondMap,
    mods: &ModificationTable,
    config: &DatabaseConfig,
) -> CandidateList {
    let mut list = CandidateList::default();
    for residues in generate_modified_variants(&unmodified.sequence, mods, config.effective_max_mods_per_peptide()) {
        let peptide = Arc::new(Peptide::from_residues(
            residues,
            unmodified.sources.clone(),
            unmodified.flanking_n,
            unmodified.flanking_c,
            unmodified.missed_cleavage_sites.clone(),
            false,
        ));
        classify_into(&peptide, bond_map, mods, config, &mut list);
    }
    list
}

fn classify_into(
    peptide: &Arc<Peptide>,
    bond_map: &BondMap,
    mods: &ModificationTable,
    config: &DatabaseConfig,
    list: &mut CandidateList,
) {
    let empty_skip = BTreeSet::new();
    let carries_mono_link = mods.mono_link().is_some_and(|(idx, _)| {
        peptide.residues().iter().any(|r| r.has_modification(idx))
    });

    if config.enable_mono_link && carries_mono_link {
        if peptide.missed_cleavages(&empty_skip, mods) <= config.max_missed_cleavages {
            list.mono_link.push(Arc::clone(peptide));
        }
    } else if config.enable_linear && peptide.missed_cleavages(&empty_skip, mods) <= config.max_missed_cleavages {
        list.linear.push(Arc::clone(peptide));
    }

    if !config.enable_cross_link && !config.enable_self_loop {
        return;
    }
    if peptide.modification_count() > config.effective_max_mods_per_peptide() {
        return;
    }
    let Some(linkable) = LinkablePeptide::new(Arc::clone(peptide), bond_map, mods) else {
        return;
    };
    let linkable = Arc::new(linkable);

    if config.enable_cross_link {
        list.flattened.extend(LinkablePeptide::flatten(&linkable));
        list.linkable.push(Arc::clone(&linkable));
    }

    if config.enable_self_loop && linkable.link_sites().len() >= 2 {
        let sites = linkable.link_sites();
        for a in 0..sites.len() {
            for b in (a + 1)..sites.len() {
                let (i, j) = (sites[a], sites[b]);
                if !bond_map.can_link_self(peptide, i, j) {
                    continue;
                }
                let skip: BTreeSet<usize> = [i, j].into_iter().collect();
                if peptide.missed_cleavages(&skip, mods) <= config.max_missed_cleavages + 1 {
                    list.self_loop.push(SelfLoopCandidate::new(Arc::clone(peptide), i, j, config.linker_mass));
                }
            }
        }
    }
}

fn build_decoy_list(
    targets: &CandidateList,
    bond_map: &BondMap,
    mods: &ModificationTable,
    config: &DatabaseConfig,
    rng: &mut impl RngCore,
) -> CandidateList {
    let mut decoys = CandidateList::default();

    for peptide in &targets.linear {
        let retained: BTreeSet<usize> = [0, peptide.len() - 1].into_iter().collect();
        decoys.linear.push(Arc::new(shuffle_peptide(peptide, &retained, rng)));
    }
    for peptide in &targets.mono_link {
        let retained: BTreeSet<usize> = [0, peptide.len() - 1].into_iter().collect();
        decoys.mono_link.push(Arc::new(shuffle_peptide(peptide, &retained, rng)));
    }
    for candidate in &targets.self_loop {
        let retained: BTreeSet<usize> =
            [0, candidate.peptide.len() - 1, candidate.site_i, candidate.site_j].into_iter().collect();
        let decoy_peptide = Arc::new(shuffle_peptide(&candidate.peptide, &retained, rng));
        decoys.self_loop.push(SelfLoopCandidate::new(decoy_peptide, candidate.site_i, candidate.site_j, candidate.linker_mass));
    }
    for linkable in &targets.linkable {
        let peptide = linkable.peptide();
        let mut retained: BTreeSet<usize> = [0, peptide.len() - 1].into_iter().collect();
        retained.extend(linkable.link_sites().iter().copied());
        let decoy_peptide = Arc::new(shuffle_peptide(peptide, &retained, rng));
        if let Some(decoy_linkable) = LinkablePeptide::new(decoy_peptide, bond_map, mods) {
            let decoy_linkable = Arc::new(decoy_linkable);
            decoys.flattened.extend(LinkablePeptide::flatten(&decoy_linkable));
            decoys.linkable.push(decoy_linkable);
        }
    }
    decoys
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peptide_source::FastaPeptideSource;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn config() -> DatabaseConfig {
        DatabaseConfig {
            enable_linear: true,
            enable_mono_link: false,
            enable_self_loop: false,
            enable_cross_link: true,
            min_length: 2,
            max_length: 20,
            max_missed_cleavages: 1,
            max_mods_per_peptide: 2,
            linker_mass: 138.0681,
            generate_decoys: true,
        }
    }

    #[test]
    fn builds_linear_and_linkable_lists_sorted_by_mass() {
        let source = FastaPeptideSource::new(vec![("P1".into(), "MKAKDEMR".into())]);
        let bond_map = BondMap::parse("K:K").unwrap();
        let mods = ModificationTable::default();
        let mut rng = StdRng::seed_from_u64(1);
        let db = CandidateDatabase::build(&source, &bond_map, mods, config(), &mut rng);

        assert!(!db.targets.linear.is_empty());
        let masses: Vec<f64> = db.targets.linear.iter().map(|p| p.monoisotopic_mass(&db.mods)).collect();
        assert!(masses.windows(2).all(|w| w[0] <= w[1]));
        assert!(!db.targets.linkable.is_empty());
        assert_eq!(db.decoys.linear.len(), db.targets.linear.len());
    }

    #[test]
    fn mass_range_returns_only_in_window() {
        let source = FastaPeptideSource::new(vec![("P1".into(), "MKAKDEMRMKAKDEMR".into())]);
        let bond_map = BondMap::parse("K:K").unwrap();
        let mods = ModificationTable::default();
        let mut rng = StdRng::seed_from_u64(2);
        let db = CandidateDatabase::build(&source, &bond_map, mods, config(), &mut rng);
        if let Some(first) = db.targets.linear.first() {
            let m = first.monoisotopic_mass(&db.mods);
            let in_range = db.linear_range(false, m - 0.01, m + 0.01);
            assert!(in_range.iter().all(|p| (p.monoisotopic_mass(&db.mods) - m).abs() < 1.0));
        }
    }
}
