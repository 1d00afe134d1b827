use std::collections::BTreeSet;
use std::sync::Arc;

use rand::RngCore;
use rand::seq::SliceRandom;

use crate::sequence::{ModifiedResidue, Peptide, PeptideSourceRef};

/// Shuffle the residues of `source` that are not in `retained_positions`, leaving retained
/// positions (terminal residues, link sites) exactly where they are with their modification
/// pattern unchanged (spec.md §4.9: "preserve (a) length, (b) terminal residues, (c) the set of
/// link-site positions, and (d) the modification pattern at each retained position").
///
/// The decoy is detached from its target's protein sources; it keeps the source list only to
/// answer terminus queries (`is_protein_n_term`/`is_protein_c_term`) the bond map relies on, with
/// a synthetic protein id so it is never mistaken for a real accession.
#[must_use]
pub fn shuffle_peptide(source: &Peptide, retained_positions: &BTreeSet<usize>, rng: &mut impl RngCore) -> Peptide {
    let residues = source.residues();
    let len = residues.len();
    let mut shuffled: Vec<usize> = (0..len).filter(|i| !retained_positions.contains(i)).collect();
    let pool: Vec<ModifiedResidue> = shuffled.iter().map(|&i| residues[i]).collect();
    let mut pool = pool;
    pool.shuffle(rng);
    shuffled.shuffle(rng);

    let mut out = residues.to_vec();
    for (slot, residue) in shuffled.into_iter().zip(pool) {
        out[slot] = residue;
    }

    let decoy_source = source
        .sources()
        .first()
        .map(|s| PeptideSourceRef { protein_id: Arc::from(format!("decoy_{}", s.protein_id)), start: 0, protein_length: len })
        .into_iter()
        .collect();
    let (flanking_n, flanking_c) = source.flanking();
    Peptide::from_residues(out, decoy_source, flanking_n, flanking_c, source.cleavage_sites().to_vec(), true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn terminal_and_link_site_residues_survive_shuffle() {
        let source = Peptide::from_residues(
            "MKAKDEM".bytes().map(ModifiedResidue::new).collect(),
            vec![PeptideSourceRef { protein_id: Arc::from("P1"), start: 0, protein_length: 7 }],
            None,
            None,
            vec![],
            false,
        );
        let retained: BTreeSet<usize> = [0, 1, 3, 6].into_iter().collect();
        let mut rng = StdRng::seed_from_u64(7);
        let decoy = shuffle_peptide(&source, &retained, &mut rng);
        assert_eq!(decoy.len(), source.len());
        for &i in &retained {
            assert_eq!(decoy.residues()[i], source.residues()[i]);
        }
        assert!(decoy.is_decoy());
    }
}
