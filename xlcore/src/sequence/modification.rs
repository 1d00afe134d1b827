use context_error::{BoxedError, Context, CreateError};
use serde::{Deserialize, Serialize};

use crate::error::XlCoreError;
use crate::sequence::residue::MAX_MODIFICATIONS;

/// Where on a peptide a variable modification is allowed to sit.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum PositionRestriction {
    /// No positional restriction.
    Any,
    /// Must be within `max_distance` residues of the N-terminus (`None` means anywhere).
    NTerminal { max_distance: Option<usize> },
    /// Must be within `max_distance` residues of the C-terminus (`None` means anywhere).
    CTerminal { max_distance: Option<usize> },
}

impl PositionRestriction {
    /// Whether `index` (0-based from the N-terminus) in a peptide of length `len` satisfies
    /// this restriction.
    #[must_use]
    pub fn allows(self, index: usize, len: usize) -> bool {
        match self {
            Self::Any => true,
            Self::NTerminal { max_distance } => {
                max_distance.is_none_or(|max| index <= max)
            }
            Self::CTerminal { max_distance } => {
                let distance_from_end = len - 1 - index;
                max_distance.is_none_or(|max| distance_from_end <= max)
            }
        }
    }
}

/// A single globally configured variable modification (spec.md §3).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VariableModification {
    /// Short display symbol, e.g. `*` or `ph`.
    pub symbol: String,
    /// Monoisotopic mass delta added when this modification is applied.
    pub mass_delta: f64,
    /// The set of residue letters this modification may be applied to.
    pub allowed_residues: Vec<u8>,
    /// Maximum number of times this modification may be applied to a single peptide.
    pub per_peptide_cap: usize,
    /// Positional restriction.
    pub position: PositionRestriction,
    /// If applied, suppresses the enzyme's cleavage at this residue (spec.md §4.2).
    pub prevents_cleavage: bool,
    /// If applied, this residue can no longer serve as a cross-link site (spec.md §3).
    pub prevents_xlink: bool,
    /// Whether this is the mono-link ("dead-end") modification rather than an ordinary variable
    /// modification — see spec.md GLOSSARY "Mono-link / dead-end".
    pub is_mono_link: bool,
}

impl VariableModification {
    /// Whether this modification may be applied to `letter`.
    #[must_use]
    pub fn allows_residue(&self, letter: u8) -> bool {
        self.allowed_residues.contains(&letter)
    }
}

/// The global registry of configured variable modifications, indexed 0..11 — the bit positions
/// used by [`crate::sequence::ModifiedResidue`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ModificationTable {
    modifications: Vec<VariableModification>,
}

impl ModificationTable {
    /// Build a table from a list of modifications, in bit-index order.
    ///
    /// # Errors
    /// Returns [`XlCoreError::TooManyModifications`] if more than
    /// [`MAX_MODIFICATIONS`] are supplied.
    pub fn new(modifications: Vec<VariableModification>) -> Result<Self, BoxedError<'static, XlCoreError>> {
        if modifications.len() > MAX_MODIFICATIONS {
            return Err(BoxedError::new(
                XlCoreError::TooManyModifications,
                "too many variable modifications",
                format!(
                    "at most {MAX_MODIFICATIONS} variable modifications are supported, got {}",
                    modifications.len()
                ),
                Context::none(),
            ));
        }
        Ok(Self { modifications })
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&VariableModification> {
        self.modifications.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.modifications.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modifications.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &VariableModification)> {
        self.modifications.iter().enumerate()
    }

    /// Index (and modification) of the mono-link modification, if one is configured.
    #[must_use]
    pub fn mono_link(&self) -> Option<(usize, &VariableModification)> {
        self.iter().find(|(_, m)| m.is_mono_link)
    }

    /// The largest number of `prevents_cleavage` modifications that could simultaneously be
    /// attached to a single peptide — used to inflate the missed-cleavage budget at database
    /// construction time (spec.md §4.2 step 1).
    #[must_use]
    pub fn max_prevents_cleavage_count(&self) -> usize {
        self.modifications.iter().filter(|m| m.prevents_cleavage).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phospho() -> VariableModification {
        VariableModification {
            symbol: "ph".into(),
            mass_delta: 79.966_331,
            allowed_residues: vec![b'S', b'T', b'Y'],
            per_peptide_cap: 3,
            position: PositionRestriction::Any,
            prevents_cleavage: false,
            prevents_xlink: false,
            is_mono_link: false,
        }
    }

    #[test]
    fn rejects_too_many_modifications() {
        let mods = std::iter::repeat(phospho()).take(12).collect();
        assert!(ModificationTable::new(mods).is_err());
    }

    #[test]
    fn position_restriction_respects_max_distance() {
        let restriction = PositionRestriction::NTerminal { max_distance: Some(1) };
        assert!(restriction.allows(0, 10));
        assert!(restriction.allows(1, 10));
        assert!(!restriction.allows(2, 10));
    }
}
