use std::collections::BTreeSet;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};

use crate::chemistry::{WATER, average_residue_mass, monoisotopic_residue_mass};
use crate::peptide_source::DigestedPeptide;
use crate::sequence::modification::ModificationTable;
use crate::sequence::residue::ModifiedResidue;

/// One location a peptide's sequence occurs at: a protein identifier and the 0-based offset of
/// the peptide's first residue within that protein (spec.md §3 "Peptide").
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct PeptideSourceRef {
    pub protein_id: Arc<str>,
    pub start: usize,
    /// Length of the parent protein, needed to tell whether this peptide reaches the protein's
    /// C-terminus (used by the bond map's `cterm` descriptor).
    pub protein_length: usize,
}

impl PeptideSourceRef {
    /// Whether position `index` within a peptide of `peptide_len` starting here is the protein's
    /// N-terminus.
    #[must_use]
    pub fn is_protein_n_term(&self, index: usize) -> bool {
        self.start == 0 && index == 0
    }

    /// Whether position `index` within a peptide of `peptide_len` starting here is the protein's
    /// C-terminus.
    #[must_use]
    pub fn is_protein_c_term(&self, index: usize, peptide_len: usize) -> bool {
        index == peptide_len - 1 && self.start + peptide_len == self.protein_length
    }
}

/// An (unmodified or modified) peptide: a sequence of residues plus its source locations.
///
/// Monoisotopic and average masses are computed once and cached in a [`OnceLock`] — per spec.md
/// §3 "the cache is the single most-accessed field and is shared with derived objects" — so that
/// a [`super::LinkablePeptide`] wrapping this peptide, and every candidate referencing it, reuse
/// the same computed mass rather than recomputing the sum over residues.
#[derive(Debug)]
pub struct Peptide {
    residues: Vec<ModifiedResidue>,
    sources: Vec<PeptideSourceRef>,
    flanking_n: Option<u8>,
    flanking_c: Option<u8>,
    /// Cleavage sites (0-based, position before the cut) admitted by the enzyme, relative to
    /// this peptide's own sequence — inherited from the [`DigestedPeptide`] that produced it.
    cleavage_sites: Vec<usize>,
    is_decoy: bool,
    monoisotopic_mass: OnceLock<f64>,
    average_mass: OnceLock<f64>,
}

impl Peptide {
    /// Build an unmodified peptide from a digested source.
    #[must_use]
    pub fn from_digested(digested: &DigestedPeptide, is_decoy: bool) -> Self {
        Self {
            residues: digested.sequence.iter().copied().map(ModifiedResidue::new).collect(),
            sources: digested.sources.clone(),
            flanking_n: digested.flanking_n,
            flanking_c: digested.flanking_c,
            cleavage_sites: digested.missed_cleavage_sites.clone(),
            is_decoy,
            monoisotopic_mass: OnceLock::new(),
            average_mass: OnceLock::new(),
        }
    }

    /// Build a peptide from residues directly, for tests and for decoy shuffling.
    #[must_use]
    pub fn from_residues(
        residues: Vec<ModifiedResidue>,
        sources: Vec<PeptideSourceRef>,
        flanking_n: Option<u8>,
        flanking_c: Option<u8>,
        cleavage_sites: Vec<usize>,
        is_decoy: bool,
    ) -> Self {
        Self {
            residues,
            sources,
            flanking_n,
            flanking_c,
            cleavage_sites,
            is_decoy,
            monoisotopic_mass: OnceLock::new(),
            average_mass: OnceLock::new(),
        }
    }

    #[must_use]
    pub fn residues(&self) -> &[ModifiedResidue] {
        &self.residues
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.residues.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.residues.is_empty()
    }

    #[must_use]
    pub fn sources(&self) -> &[PeptideSourceRef] {
        &self.sources
    }

    #[must_use]
    pub fn flanking(&self) -> (Option<u8>, Option<u8>) {
        (self.flanking_n, self.flanking_c)
    }

    #[must_use]
    pub fn is_decoy(&self) -> bool {
        self.is_decoy
    }

    #[must_use]
    pub fn cleavage_sites(&self) -> &[usize] {
        &self.cleavage_sites
    }

    /// Cached monoisotopic mass, including the single water cap and every applied modification's
    /// mass delta.
    #[must_use]
    pub fn monoisotopic_mass(&self, mods: &ModificationTable) -> f64 {
        *self.monoisotopic_mass.get_or_init(|| self.compute_mass(mods, true))
    }

    /// Cached average mass, see [`Self::monoisotopic_mass`].
    #[must_use]
    pub fn average_mass(&self, mods: &ModificationTable) -> f64 {
        *self.average_mass.get_or_init(|| self.compute_mass(mods, false))
    }

    fn compute_mass(&self, mods: &ModificationTable, monoisotopic: bool) -> f64 {
        let water = if monoisotopic { WATER } else { crate::chemistry::WATER_AVERAGE };
        let residue_mass = if monoisotopic { monoisotopic_residue_mass } else { average_residue_mass };
        self.residues.iter().fold(water, |acc, r| {
            let base = residue_mass(r.letter());
            let delta: f64 = (0..crate::sequence::residue::MAX_MODIFICATIONS)
                .filter(|&i| r.has_modification(i))
                .filter_map(|i| mods.get(i))
                .map(|m| m.mass_delta)
                .sum();
            acc + base + delta
        })
    }

    /// Count of missed cleavages within this peptide, excluding cleavage sites in `skip` (those
    /// "consumed" by a chosen link site, spec.md §3 "Peptide") or covered by a `prevents_cleavage`
    /// modification.
    #[must_use]
    pub fn missed_cleavages(&self, skip: &BTreeSet<usize>, mods: &ModificationTable) -> usize {
        self.cleavage_sites
            .iter()
            .filter(|&&site| !skip.contains(&site))
            .filter(|&&site| !self.cleavage_prevented_at(site, mods))
            .count()
    }

    fn cleavage_prevented_at(&self, site: usize, mods: &ModificationTable) -> bool {
        let Some(residue) = self.residues.get(site) else {
            return false;
        };
        (0..crate::sequence::residue::MAX_MODIFICATIONS)
            .filter(|&i| residue.has_modification(i))
            .filter_map(|i| mods.get(i))
            .any(|m| m.prevents_cleavage)
    }

    /// Number of modified residues (sum of `modification_count`) in this peptide.
    #[must_use]
    pub fn modification_count(&self) -> usize {
        self.residues.iter().map(|r| r.modification_count() as usize).sum()
    }

    /// Plain-text sequence, ignoring modifications.
    #[must_use]
    pub fn sequence_string(&self) -> String {
        self.residues.iter().map(|r| r.letter() as char).collect()
    }

    /// Plain-text sequence annotated with each applied modification's symbol immediately after
    /// the residue it sits on, e.g. `AC[ph]DK`.
    #[must_use]
    pub fn modified_sequence_string(&self, mods: &ModificationTable) -> String {
        let mut out = String::with_capacity(self.residues.len() * 2);
        for r in &self.residues {
            out.push(r.letter() as char);
            for i in 0..crate::sequence::residue::MAX_MODIFICATIONS {
                if r.has_modification(i) {
                    if let Some(m) = mods.get(i) {
                        out.push('[');
                        out.push_str(&m.symbol);
                        out.push(']');
                    }
                }
            }
        }
        out
    }
}

impl PartialEq for Peptide {
    fn eq(&self, other: &Self) -> bool {
        self.residues == other.residues
    }
}
impl Eq for Peptide {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::modification::ModificationTable;

    #[test]
    fn mass_matches_mr_plus_water() {
        let source = PeptideSourceRef { protein_id: Arc::from("P1"), start: 0, protein_length: 5 };
        let peptide = Peptide::from_residues(
            vec![ModifiedResidue::new(b'M'), ModifiedResidue::new(b'R')],
            vec![source],
            None,
            Some(b'A'),
            vec![],
            false,
        );
        let mods = ModificationTable::default();
        let expected = monoisotopic_residue_mass(b'M') + monoisotopic_residue_mass(b'R') + WATER;
        assert!((peptide.monoisotopic_mass(&mods) - expected).abs() < 1e-9);
    }

    #[test]
    fn missed_cleavages_excludes_skip_set() {
        let peptide = Peptide::from_residues(
            vec![
                ModifiedResidue::new(b'A'),
                ModifiedResidue::new(b'K'),
                ModifiedResidue::new(b'D'),
                ModifiedResidue::new(b'E'),
            ],
            vec![],
            None,
            None,
            vec![1],
            false,
        );
        let mods = ModificationTable::default();
        assert_eq!(peptide.missed_cleavages(&BTreeSet::new(), &mods), 1);
        let mut skip = BTreeSet::new();
        skip.insert(1);
        assert_eq!(peptide.missed_cleavages(&skip, &mods), 0);
    }
}
