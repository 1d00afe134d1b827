mod bond_map;
mod candidate;
mod linkable_peptide;
mod modification;
mod peptide;
mod residue;

pub use bond_map::BondMap;
pub use candidate::{
    Candidate, CandidateKind, CandidateLike, CrossLinkCandidate, CrossLinkRelation, DecoyQuadrant,
    LinearCandidate, SelfLoopCandidate,
};
pub use linkable_peptide::{FlatLinkablePeptide, LinkablePeptide};
pub use modification::{ModificationTable, PositionRestriction, VariableModification};
pub use peptide::{Peptide, PeptideSourceRef};
pub use residue::{MAX_MODIFICATIONS, ModifiedResidue};
