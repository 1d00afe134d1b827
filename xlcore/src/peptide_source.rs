use std::sync::Arc;

use crate::sequence::PeptideSourceRef;

/// An unmodified peptide as produced by in-silico digestion, before any variable modification
/// is applied.
///
/// Digestion itself — enzyme rules, digestion specificity, inflating the missed-cleavage budget
/// for the reasons spec.md §4.2 step 1 describes — is an external collaborator's job (spec.md
/// §6 "FASTA parsing and in-silico digestion ... delegated to a peptide-source abstraction").
/// [`PeptideSource`] implementations are expected to have already applied the *inflated* budget
/// the candidate database asks for; the database re-checks the user's configured (un-inflated)
/// budget per candidate once modifications and link sites are known.
#[derive(Clone, Debug, PartialEq)]
pub struct DigestedPeptide {
    /// The unmodified residue sequence.
    pub sequence: Vec<u8>,
    /// One or more (protein, offset) locations this sequence occurs at.
    pub sources: Vec<PeptideSourceRef>,
    /// Sequence-internal positions (0-based, the position *before* which a cut site falls)
    /// that the enzyme would ordinarily cleave at but did not, i.e. the missed cleavages
    /// counted against the inflated budget.
    pub missed_cleavage_sites: Vec<usize>,
    /// Residue preceding the peptide in its parent protein, if any (flanking residue, spec.md
    /// §3 "Peptide" attributes).
    pub flanking_n: Option<u8>,
    /// Residue following the peptide in its parent protein, if any.
    pub flanking_c: Option<u8>,
}

/// External collaborator that supplies already-digested, unmodified peptides to the candidate
/// database (spec.md §6). Implementations typically parse a FASTA file and apply an enzyme and
/// digestion specificity; none of that is this crate's concern.
pub trait PeptideSource: Send + Sync {
    /// Produce every unmodified peptide admissible under `max_missed_cleavages` (the *inflated*
    /// budget, see [`DigestedPeptide`]), between `min_length` and `max_length` residues long.
    fn digest(
        &self,
        max_missed_cleavages: usize,
        min_length: usize,
        max_length: usize,
    ) -> Vec<DigestedPeptide>;
}

/// A simple in-memory [`PeptideSource`] used by tests and small ad-hoc searches: every protein
/// is a full tryptic digest (cleave after K/R, not before P) computed eagerly.
#[derive(Clone, Debug, Default)]
pub struct FastaPeptideSource {
    proteins: Vec<(Arc<str>, Vec<u8>)>,
}

impl FastaPeptideSource {
    /// Build a source from `(protein id, sequence)` pairs.
    #[must_use]
    pub fn new(proteins: Vec<(String, String)>) -> Self {
        Self {
            proteins: proteins
                .into_iter()
                .map(|(id, seq)| (Arc::from(id.as_str()), seq.into_bytes()))
                .collect(),
        }
    }

    fn cleavage_sites(sequence: &[u8]) -> Vec<usize> {
        sequence
            .iter()
            .enumerate()
            .take(sequence.len().saturating_sub(1))
            .filter(|(i, &r)| (r == b'K' || r == b'R') && sequence[i + 1] != b'P')
            .map(|(i, _)| i)
            .collect()
    }
}

impl PeptideSource for FastaPeptideSource {
    fn digest(
        &self,
        max_missed_cleavages: usize,
        min_length: usize,
        max_length: usize,
    ) -> Vec<DigestedPeptide> {
        let mut out = Vec::new();
        for (id, protein) in &self.proteins {
            let sites = Self::cleavage_sites(protein);
            // cut points: start of protein, after every cleavage site, end of protein
            let mut starts = vec![0usize];
            starts.extend(sites.iter().map(|&i| i + 1));
            let ends: Vec<usize> = sites.iter().map(|&i| i + 1).chain([protein.len()]).collect();

            for (start_idx, &start) in starts.iter().enumerate() {
                for missed in 0..=max_missed_cleavages {
                    let end_idx = start_idx + missed;
                    let Some(&end) = ends.get(end_idx) else { break };
                    if end <= start {
                        continue;
                    }
                    let len = end - start;
                    if len < min_length || len > max_length {
                        continue;
                    }
                    let internal_sites: Vec<usize> = sites
                        .iter()
                        .filter(|&&s| s > start && s + 1 < end)
                        .map(|&s| s - start)
                        .collect();
                    out.push(DigestedPeptide {
                        sequence: protein[start..end].to_vec(),
                        sources: vec![PeptideSourceRef {
                            protein_id: id.clone(),
                            start,
                            protein_length: protein.len(),
                        }],
                        missed_cleavage_sites: internal_sites,
                        flanking_n: start.checked_sub(1).map(|i| protein[i]),
                        flanking_c: protein.get(end).copied(),
                    });
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digests_simple_tryptic_peptide() {
        let source = FastaPeptideSource::new(vec![("P1".into(), "MRAPK".into())]);
        let peptides = source.digest(0, 1, 10);
        assert!(peptides.iter().any(|p| p.sequence == b"MR"));
        assert!(peptides.iter().any(|p| p.sequence == b"APK"));
    }
}
