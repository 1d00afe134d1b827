use std::cmp::Ordering;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use crate::sequence::bond_map::BondMap;
use crate::sequence::modification::ModificationTable;
use crate::sequence::peptide::Peptide;

/// A peptide annotated with every residue position eligible for cross-linking under the
/// configured bond map (spec.md §3 "Linkable peptide").
///
/// Equality and ordering are defined on the *modified sequence*, not on link sites, matching
/// spec.md: "Two linkable peptides are equal if their modified sequences are equal; ordering is
/// by cached monoisotopic mass then by modified sequence." The preliminary-XCorr cache backs the
/// top-N pre-filter (spec.md §4.3); it is stored as the bit pattern of an [`AtomicU64`] rather
/// than a `Cell` so that `LinkablePeptide` stays `Sync` and candidate lists built behind
/// `Arc<LinkablePeptide>` can cross the rayon parallel boundary during database construction. It
/// is legitimately overwritten on every new spectrum's preliminary pass.
#[derive(Debug)]
pub struct LinkablePeptide {
    peptide: Arc<Peptide>,
    link_sites: Vec<usize>,
    preliminary_xcorr: AtomicU64,
}

/// Bit pattern marking an absent preliminary-XCorr value; `f64::to_bits` of a real score can
/// never collide with it since xcorr scores are always finite.
const NO_PRELIMINARY_XCORR: u64 = u64::MAX;

impl LinkablePeptide {
    /// Compute the link sites for `peptide` under `bond_map`, respecting any `prevents_xlink`
    /// modification and excluding residues already carrying the mono-link modification (a
    /// dead-ended residue cannot also be a live cross-link site).
    #[must_use]
    pub fn new(peptide: Arc<Peptide>, bond_map: &BondMap, mods: &ModificationTable) -> Option<Self> {
        let link_sites: Vec<usize> = (0..peptide.len())
            .filter(|&i| !Self::prevents_xlink(&peptide, i, mods))
            .filter(|&i| bond_map.can_link_one(&peptide, i))
            .collect();
        if link_sites.is_empty() {
            None
        } else {
            Some(Self { peptide, link_sites, preliminary_xcorr: AtomicU64::new(NO_PRELIMINARY_XCORR) })
        }
    }

    fn prevents_xlink(peptide: &Peptide, index: usize, mods: &ModificationTable) -> bool {
        let residue = peptide.residues()[index];
        (0..crate::sequence::residue::MAX_MODIFICATIONS)
            .filter(|&i| residue.has_modification(i))
            .filter_map(|i| mods.get(i))
            .any(|m| m.prevents_xlink)
    }

    #[must_use]
    pub fn peptide(&self) -> &Arc<Peptide> {
        &self.peptide
    }

    #[must_use]
    pub fn link_sites(&self) -> &[usize] {
        &self.link_sites
    }

    #[must_use]
    pub fn monoisotopic_mass(&self, mods: &ModificationTable) -> f64 {
        self.peptide.monoisotopic_mass(mods)
    }

    #[must_use]
    pub fn modified_sequence_string(&self, mods: &ModificationTable) -> String {
        self.peptide.modified_sequence_string(mods)
    }

    /// The XCorr this peptide achieved in the most recent top-N preliminary scoring pass
    /// (spec.md §4.3), if any.
    #[must_use]
    pub fn preliminary_xcorr(&self) -> Option<f64> {
        match self.preliminary_xcorr.load(AtomicOrdering::Relaxed) {
            NO_PRELIMINARY_XCORR => None,
            bits => Some(f64::from_bits(bits)),
        }
    }

    pub fn set_preliminary_xcorr(&self, score: f64) {
        self.preliminary_xcorr.store(score.to_bits(), AtomicOrdering::Relaxed);
    }

    /// Compare two linkable peptides by modified sequence, per spec.md's equality rule.
    #[must_use]
    pub fn same_sequence(&self, other: &Self, mods: &ModificationTable) -> bool {
        self.modified_sequence_string(mods) == other.modified_sequence_string(mods)
    }

    /// Order by cached monoisotopic mass, then by modified sequence (spec.md §3).
    #[must_use]
    pub fn cmp_by_mass_then_sequence(&self, other: &Self, mods: &ModificationTable) -> Ordering {
        self.monoisotopic_mass(mods)
            .partial_cmp(&other.monoisotopic_mass(mods))
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.modified_sequence_string(mods).cmp(&other.modified_sequence_string(mods)))
    }

    /// One entry per `(peptide, single link site)` pair, used to build the flattened linkable
    /// list the top-N pre-filter queries (spec.md §4.2 "flattened linkable peptides").
    ///
    /// Takes the enclosing `Arc` explicitly (rather than as an arbitrary `self` receiver) so it
    /// stays usable on stable Rust.
    #[must_use]
    pub fn flatten(self_arc: &Arc<Self>) -> Vec<FlatLinkablePeptide> {
        self_arc
            .link_sites
            .iter()
            .map(|&site| FlatLinkablePeptide { linkable: Arc::clone(self_arc), site })
            .collect()
    }
}

/// A single `(linkable peptide, chosen link site)` pair (spec.md §4.2).
#[derive(Debug, Clone)]
pub struct FlatLinkablePeptide {
    linkable: Arc<LinkablePeptide>,
    site: usize,
}

impl FlatLinkablePeptide {
    #[must_use]
    pub fn linkable(&self) -> &Arc<LinkablePeptide> {
        &self.linkable
    }

    #[must_use]
    pub fn site(&self) -> usize {
        self.site
    }

    #[must_use]
    pub fn monoisotopic_mass(&self, mods: &ModificationTable) -> f64 {
        self.linkable.monoisotopic_mass(mods)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::residue::ModifiedResidue;

    #[test]
    fn mkakm_has_two_link_sites() {
        let peptide = Arc::new(Peptide::from_residues(
            "MKAKM".bytes().map(ModifiedResidue::new).collect(),
            vec![],
            None,
            None,
            vec![],
            false,
        ));
        let bond_map = BondMap::parse("K:K").unwrap();
        let mods = ModificationTable::default();
        let linkable = LinkablePeptide::new(peptide, &bond_map, &mods).unwrap();
        assert_eq!(linkable.link_sites(), &[1, 3]);
    }
}
