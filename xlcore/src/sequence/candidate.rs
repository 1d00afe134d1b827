use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::sequence::linkable_peptide::LinkablePeptide;
use crate::sequence::modification::ModificationTable;
use crate::sequence::peptide::Peptide;

/// The kind of molecular species a [`Candidate`] represents (spec.md §3).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum CandidateKind {
    Linear,
    MonoLink,
    SelfLoop,
    CrossLink(CrossLinkRelation),
}

impl CandidateKind {
    /// The column value this kind is reported under (spec.md §6 output columns).
    #[must_use]
    pub fn report_label(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::MonoLink => "dead-link",
            Self::SelfLoop => "self-loop",
            Self::CrossLink(CrossLinkRelation::Intra) => "xlink-intra",
            Self::CrossLink(CrossLinkRelation::Inter) => "xlink-inter",
            Self::CrossLink(CrossLinkRelation::InterIntra) => "xlink-inter-intra",
        }
    }
}

/// Whether the two peptides of a cross-link candidate come from the same protein(s), disjoint
/// proteins, or a mix (spec.md §3 "Cross-link candidate").
///
/// The reference implementation classifies this with a bitwise-AND where a logical-AND was
/// intended (spec.md §9 open question (ii)); this type's constructor uses `&&` throughout.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum CrossLinkRelation {
    /// Every protein ID shared between the two peptides' source sets coincides: both peptides
    /// come from the same protein(s) only.
    Intra,
    /// No protein ID is shared between the two peptides' source sets.
    Inter,
    /// Some protein IDs are shared and some are not — typical of proteins sharing a tryptic
    /// peptide, or of shuffled decoy proteins that happen to retain a target's accession.
    InterIntra,
}

impl CrossLinkRelation {
    /// Classify the relation between two peptides from their source protein ID sets.
    #[must_use]
    pub fn classify(peptide_a: &Peptide, peptide_b: &Peptide) -> Self {
        let ids_a: BTreeSet<&Arc<str>> = peptide_a.sources().iter().map(|s| &s.protein_id).collect();
        let ids_b: BTreeSet<&Arc<str>> = peptide_b.sources().iter().map(|s| &s.protein_id).collect();
        let any_shared = ids_a.intersection(&ids_b).next().is_some();
        let any_disjoint = ids_a.iter().any(|id| !ids_b.contains(id)) || ids_b.iter().any(|id| !ids_a.contains(id));
        if any_shared && any_disjoint {
            Self::InterIntra
        } else if any_shared {
            Self::Intra
        } else {
            Self::Inter
        }
    }
}

/// The target/decoy makeup of a candidate's participants, reported as the `decoy-type` output
/// column (spec.md §6).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum DecoyQuadrant {
    /// Single-peptide candidate (linear, mono-link, self-loop) drawn from target sequences.
    Target,
    /// Single-peptide candidate drawn from a decoy (shuffled) sequence.
    Decoy,
    /// Cross-link candidate, both peptides target.
    TargetTarget,
    /// Cross-link candidate, first peptide target, second decoy.
    TargetDecoy,
    /// Cross-link candidate, first peptide decoy, second target.
    DecoyTarget,
    /// Cross-link candidate, both peptides decoy.
    DecoyDecoy,
}

impl DecoyQuadrant {
    #[must_use]
    pub fn single(is_decoy: bool) -> Self {
        if is_decoy { Self::Decoy } else { Self::Target }
    }

    #[must_use]
    pub fn pair(first_is_decoy: bool, second_is_decoy: bool) -> Self {
        match (first_is_decoy, second_is_decoy) {
            (false, false) => Self::TargetTarget,
            (false, true) => Self::TargetDecoy,
            (true, false) => Self::DecoyTarget,
            (true, true) => Self::DecoyDecoy,
        }
    }

    /// Whether this quadrant counts as a decoy at all for FDR purposes, i.e. anything but
    /// all-target.
    #[must_use]
    pub fn is_decoy(self) -> bool {
        !matches!(self, Self::Target | Self::TargetTarget)
    }

    #[must_use]
    pub fn report_label(self) -> &'static str {
        match self {
            Self::Target => "target",
            Self::Decoy => "decoy",
            Self::TargetTarget => "target-target",
            Self::TargetDecoy => "target-decoy",
            Self::DecoyTarget => "decoy-target",
            Self::DecoyDecoy => "decoy-decoy",
        }
    }
}

/// Common interface implemented by every candidate kind (spec.md §9 "Dynamic dispatch across
/// candidate kinds"). The number of kinds is closed and small, so this is a tagged variant
/// ([`Candidate`]) rather than a trait object hierarchy.
pub trait CandidateLike {
    fn kind(&self) -> CandidateKind;
    fn mass(&self, mods: &ModificationTable) -> f64;
    fn sequence_string(&self, mods: &ModificationTable) -> String;
    fn quadrant(&self) -> DecoyQuadrant;
}

/// A linear peptide or mono-link ("dead-end") candidate — representationally identical, the
/// distinction is carried entirely by [`CandidateKind`] (spec.md §3).
#[derive(Clone, Debug)]
pub struct LinearCandidate {
    pub peptide: Arc<Peptide>,
    pub kind: CandidateKind,
}

impl LinearCandidate {
    #[must_use]
    pub fn new(peptide: Arc<Peptide>, is_mono_link: bool) -> Self {
        let kind = if is_mono_link { CandidateKind::MonoLink } else { CandidateKind::Linear };
        Self { peptide, kind }
    }
}

impl CandidateLike for LinearCandidate {
    fn kind(&self) -> CandidateKind {
        self.kind
    }
    fn mass(&self, mods: &ModificationTable) -> f64 {
        self.peptide.monoisotopic_mass(mods)
    }
    fn sequence_string(&self, mods: &ModificationTable) -> String {
        self.peptide.modified_sequence_string(mods)
    }
    fn quadrant(&self) -> DecoyQuadrant {
        DecoyQuadrant::single(self.peptide.is_decoy())
    }
}

/// An intra-peptide self-loop candidate: two link sites `(i, j)`, `i < j`, on the same peptide
/// (spec.md §4.2 step 4, §8 scenario 2).
#[derive(Clone, Debug)]
pub struct SelfLoopCandidate {
    pub peptide: Arc<Peptide>,
    pub site_i: usize,
    pub site_j: usize,
    pub linker_mass: f64,
}

impl SelfLoopCandidate {
    /// # Panics
    /// Panics if `site_i >= site_j`; callers are expected to have already ordered the pair.
    #[must_use]
    pub fn new(peptide: Arc<Peptide>, site_i: usize, site_j: usize, linker_mass: f64) -> Self {
        assert!(site_i < site_j, "self-loop sites must be ordered");
        Self { peptide, site_i, site_j, linker_mass }
    }
}

impl CandidateLike for SelfLoopCandidate {
    fn kind(&self) -> CandidateKind {
        CandidateKind::SelfLoop
    }
    fn mass(&self, mods: &ModificationTable) -> f64 {
        self.peptide.monoisotopic_mass(mods) + self.linker_mass
    }
    fn sequence_string(&self, mods: &ModificationTable) -> String {
        self.peptide.modified_sequence_string(mods)
    }
    fn quadrant(&self) -> DecoyQuadrant {
        DecoyQuadrant::single(self.peptide.is_decoy())
    }
}

/// An inter-peptide cross-link candidate: two linkable peptides, one chosen link site on each,
/// canonicalised so the lexicographically smaller modified sequence is first (spec.md §3).
#[derive(Clone, Debug)]
pub struct CrossLinkCandidate {
    pub first: Arc<LinkablePeptide>,
    pub first_site: usize,
    pub second: Arc<LinkablePeptide>,
    pub second_site: usize,
    pub linker_mass: f64,
    pub relation: CrossLinkRelation,
}

impl CrossLinkCandidate {
    /// Build a candidate from an unordered pair, canonicalising the order by modified sequence.
    #[must_use]
    pub fn new(
        a: Arc<LinkablePeptide>,
        site_a: usize,
        b: Arc<LinkablePeptide>,
        site_b: usize,
        linker_mass: f64,
        mods: &ModificationTable,
    ) -> Self {
        let relation = CrossLinkRelation::classify(a.peptide(), b.peptide());
        if a.modified_sequence_string(mods) <= b.modified_sequence_string(mods) {
            Self { first: a, first_site: site_a, second: b, second_site: site_b, linker_mass, relation }
        } else {
            Self { first: b, first_site: site_b, second: a, second_site: site_a, linker_mass, relation }
        }
    }
}

impl CandidateLike for CrossLinkCandidate {
    fn kind(&self) -> CandidateKind {
        CandidateKind::CrossLink(self.relation)
    }
    fn mass(&self, mods: &ModificationTable) -> f64 {
        self.first.monoisotopic_mass(mods) + self.second.monoisotopic_mass(mods) + self.linker_mass
    }
    fn sequence_string(&self, mods: &ModificationTable) -> String {
        format!(
            "{}-{}",
            self.first.modified_sequence_string(mods),
            self.second.modified_sequence_string(mods)
        )
    }
    fn quadrant(&self) -> DecoyQuadrant {
        DecoyQuadrant::pair(self.first.peptide().is_decoy(), self.second.peptide().is_decoy())
    }
}

/// A tagged union over every candidate kind, implementing [`CandidateLike`] by dispatch (spec.md
/// §9 "Dynamic dispatch across candidate kinds").
#[derive(Clone, Debug)]
pub enum Candidate {
    Linear(LinearCandidate),
    SelfLoop(SelfLoopCandidate),
    CrossLink(CrossLinkCandidate),
}

impl Candidate {
    #[must_use]
    pub fn kind(&self) -> CandidateKind {
        match self {
            Self::Linear(c) => c.kind(),
            Self::SelfLoop(c) => c.kind(),
            Self::CrossLink(c) => c.kind(),
        }
    }

    #[must_use]
    pub fn mass(&self, mods: &ModificationTable) -> f64 {
        match self {
            Self::Linear(c) => c.mass(mods),
            Self::SelfLoop(c) => c.mass(mods),
            Self::CrossLink(c) => c.mass(mods),
        }
    }

    #[must_use]
    pub fn sequence_string(&self, mods: &ModificationTable) -> String {
        match self {
            Self::Linear(c) => c.sequence_string(mods),
            Self::SelfLoop(c) => c.sequence_string(mods),
            Self::CrossLink(c) => c.sequence_string(mods),
        }
    }

    #[must_use]
    pub fn quadrant(&self) -> DecoyQuadrant {
        match self {
            Self::Linear(c) => c.quadrant(),
            Self::SelfLoop(c) => c.quadrant(),
            Self::CrossLink(c) => c.quadrant(),
        }
    }

    /// Order candidates by mass, used to keep per-spectrum result rows reproducibly sorted
    /// before ranking (spec.md §3 "Match / result row").
    #[must_use]
    pub fn cmp_by_mass(&self, other: &Self, mods: &ModificationTable) -> Ordering {
        self.mass(mods).partial_cmp(&other.mass(mods)).unwrap_or(Ordering::Equal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::peptide::PeptideSourceRef;
    use crate::sequence::residue::ModifiedResidue;

    fn peptide(seq: &str, protein: &str) -> Arc<Peptide> {
        Arc::new(Peptide::from_residues(
            seq.bytes().map(ModifiedResidue::new).collect(),
            vec![PeptideSourceRef { protein_id: Arc::from(protein), start: 0, protein_length: seq.len() }],
            None,
            None,
            vec![],
            false,
        ))
    }

    #[test]
    fn relation_is_intra_when_all_proteins_coincide() {
        let a = peptide("AKDE", "P1");
        let b = peptide("AKDE", "P1");
        assert_eq!(CrossLinkRelation::classify(&a, &b), CrossLinkRelation::Intra);
    }

    #[test]
    fn relation_is_inter_when_no_protein_coincides() {
        let a = peptide("AKDE", "P1");
        let b = peptide("AKDE", "P2");
        assert_eq!(CrossLinkRelation::classify(&a, &b), CrossLinkRelation::Inter);
    }

    #[test]
    fn relation_is_inter_intra_for_partially_shared_proteins() {
        let a = Arc::new(Peptide::from_residues(
            "AKDE".bytes().map(ModifiedResidue::new).collect(),
            vec![
                PeptideSourceRef { protein_id: Arc::from("P1"), start: 0, protein_length: 4 },
                PeptideSourceRef { protein_id: Arc::from("P2"), start: 0, protein_length: 4 },
            ],
            None,
            None,
            vec![],
            false,
        ));
        let b = peptide("AKDE", "P2");
        assert_eq!(CrossLinkRelation::classify(&a, &b), CrossLinkRelation::InterIntra);
    }

    #[test]
    fn self_loop_mass_includes_linker() {
        let p = peptide("MKAKM", "P1");
        let candidate = SelfLoopCandidate::new(p.clone(), 1, 3, 138.0681);
        let mods = ModificationTable::default();
        assert!((candidate.mass(&mods) - (p.monoisotopic_mass(&mods) + 138.0681)).abs() < 1e-9);
    }
}
