use serde::{Deserialize, Serialize};

/// The mode of mass to use when evaluating a peptide or fragment ion.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default, Debug, Serialize, Deserialize,
)]
pub enum MassMode {
    /// Monoisotopic mass, built from each element's most abundant (lightest, for CHNOS) isotope.
    #[default]
    Monoisotopic,
    /// The average weight, using the natural isotopic abundance of each element.
    Average,
}

impl std::fmt::Display for MassMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Average => write!(f, "average weight"),
            Self::Monoisotopic => write!(f, "monoisotopic mass"),
        }
    }
}
