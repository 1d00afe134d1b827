use xlcore::sequence::{Candidate, CandidateLike, DecoyQuadrant};

/// Label a candidate with its decoy-type quadrant for the `decoy-type` output column (spec.md §6).
///
/// The candidate database already produced every decoy peptide once, at build time, by shuffling
/// interior residues while preserving length, termini, link-site positions, and the modification
/// pattern at each retained position (`xlcore::decoy::shuffle_peptide`, spec.md §4.9 "preserve (a)
/// length, (b) terminal residues, (c) the set of link-site positions, (d) the modification
/// pattern"). This module's job is narrower: [`crate::enumerator`] already paired target and
/// decoy linkable peptides across all three mixed quadrants (decoy-decoy, target-decoy,
/// decoy-target), so by the time a candidate reaches here its quadrant is simply read off the
/// peptides it already carries — there is nothing left to shuffle.
///
/// The mapping from a decoy back to its originating target (spec.md §4.9 "Record the mapping")
/// is the shuffled peptide's `is_decoy` flag plus its source protein ID, which
/// `xlcore::decoy::shuffle_peptide` names `decoy_{protein_id}` — sufficient for
/// `xlannotate::weibull::TrainingSet`'s sequence-keyed deduplication, without a separate
/// back-reference field.
#[must_use]
pub fn quadrant(candidate: &Candidate) -> DecoyQuadrant {
    candidate.quadrant()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use xlcore::sequence::{LinearCandidate, ModifiedResidue, Peptide};

    #[test]
    fn reports_single_peptide_quadrant() {
        let peptide = Arc::new(Peptide::from_residues(
            "MKAKM".bytes().map(ModifiedResidue::new).collect(),
            vec![],
            None,
            None,
            vec![],
            true,
        ));
        let candidate = Candidate::Linear(LinearCandidate::new(peptide, false));
        assert_eq!(quadrant(&candidate), DecoyQuadrant::Decoy);
    }
}
