#![doc = include_str!("../README.md")]

/// Monoisotopic/average masses for residues, water, and the proton/neutron constants the rest
/// of the crate is built on.
pub mod chemistry;
/// The error kind returned by every fallible operation in this crate.
pub mod error;
/// Tolerances and mass windows used to query the candidate database.
pub mod quantities;
/// Residues, variable modifications, peptides, linkable peptides, the bond map and the five
/// candidate kinds a spectrum can be matched against.
pub mod sequence;

mod database;
/// Generation of decoy (shuffled) peptides that preserve length, termini, link sites, and the
/// modification pattern at every retained position.
pub mod decoy;
mod peptide_source;

pub use database::{CandidateDatabase, DatabaseConfig};
pub use peptide_source::{DigestedPeptide, FastaPeptideSource, PeptideSource};

/// A subset of the types most commonly needed together, mirroring the teacher crate's prelude
/// convention.
pub mod prelude {
    pub use crate::chemistry::{MassMode, NEUTRON, PROTON, WATER, monoisotopic_residue_mass};
    pub use crate::database::{CandidateDatabase, DatabaseConfig};
    pub use crate::peptide_source::{DigestedPeptide, FastaPeptideSource, PeptideSource};
    pub use crate::quantities::{Tolerance, WindowKind};
    pub use crate::sequence::{
        BondMap, Candidate, CandidateKind, CrossLinkCandidate, CrossLinkRelation,
        DecoyQuadrant, LinearCandidate, LinkablePeptide, ModifiedResidue, Peptide,
        PeptideSourceRef, SelfLoopCandidate, VariableModification,
    };
}
