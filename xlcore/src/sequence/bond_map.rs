use context_error::{BoxedError, Context, CreateError};

use crate::error::XlCoreError;
use crate::sequence::peptide::Peptide;

/// A link-site descriptor: the left- or right-hand side of a `link sites` bond-map token
/// (spec.md §4.1). Grounded directly on the reference implementation's `XLinkSite`
/// (`examples/original_source/src/c/xlink/XLinkSite.cpp`).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum SiteDescriptor {
    Residue(u8),
    NTerm,
    CTerm,
    Any,
}

impl SiteDescriptor {
    fn parse(token: &str) -> Result<Self, BoxedError<'static, XlCoreError>> {
        match token {
            "nterm" => Ok(Self::NTerm),
            "cterm" => Ok(Self::CTerm),
            "*" => Ok(Self::Any),
            _ if token.len() == 1 && token.as_bytes()[0].is_ascii_uppercase() => {
                Ok(Self::Residue(token.as_bytes()[0]))
            }
            _ => Err(BoxedError::new(
                XlCoreError::InvalidBondMapToken,
                "invalid link site token",
                format!("'{token}' is not a residue letter, nterm, cterm, or *"),
                Context::none(),
            )),
        }
    }

    /// Whether `peptide` has this site at 0-based sequence position `index`.
    fn matches(self, peptide: &Peptide, index: usize) -> bool {
        match self {
            Self::Any => true,
            Self::Residue(letter) => peptide.residues()[index].letter() == letter,
            Self::NTerm => index == 0 && peptide.sources().iter().any(|s| s.is_protein_n_term(0)),
            Self::CTerm => {
                let len = peptide.len();
                index == len - 1
                    && peptide.sources().iter().any(|s| s.is_protein_c_term(index, len))
            }
        }
    }
}

/// A symmetric relation on [`SiteDescriptor`]s: the cross-linker's chemistry (spec.md §4.1).
///
/// Constructed from a string of the form `A:B,C:D,...`; each `A:B` token pair is inserted in
/// both directions since the original always interprets the relation symmetrically.
#[derive(Clone, Debug, Default)]
pub struct BondMap {
    pairs: Vec<(SiteDescriptor, SiteDescriptor)>,
}

impl BondMap {
    /// Parse a bond-map specification, e.g. `K:K` for a homobifunctional lysine-lysine linker or
    /// `K:D,K:E` for a carbodiimide-style linker.
    ///
    /// # Errors
    /// Returns [`XlCoreError::InvalidBondMapToken`] if any token is not a residue letter,
    /// `nterm`, `cterm`, or `*`.
    pub fn parse(spec: &str) -> Result<Self, BoxedError<'static, XlCoreError>> {
        let mut pairs = Vec::new();
        for bond in spec.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let mut sides = bond.splitn(2, ':');
            let (Some(a), Some(b)) = (sides.next(), sides.next()) else {
                return Err(BoxedError::new(
                    XlCoreError::InvalidBondMapToken,
                    "invalid link site token",
                    format!("'{bond}' is not of the form A:B"),
                    Context::none(),
                ));
            };
            let (a, b) = (SiteDescriptor::parse(a)?, SiteDescriptor::parse(b)?);
            pairs.push((a, b));
            pairs.push((b, a));
        }
        Ok(Self { pairs })
    }

    /// Whether a cross-link (of any kind admitted by this bond map) can occur at position
    /// `index` in `peptide` — used for mono-link eligibility.
    #[must_use]
    pub fn can_link_one(&self, peptide: &Peptide, index: usize) -> bool {
        self.pairs.iter().any(|(left, _)| left.matches(peptide, index))
    }

    /// Whether a cross-link can occur between positions `i` and `j` within the same peptide —
    /// used for self-loop eligibility.
    #[must_use]
    pub fn can_link_self(&self, peptide: &Peptide, i: usize, j: usize) -> bool {
        self.pairs
            .iter()
            .any(|(left, right)| left.matches(peptide, i) && right.matches(peptide, j))
    }

    /// Whether a cross-link can occur between position `i` in `peptide_a` and position `j` in
    /// `peptide_b` — used for inter-/intra-peptide cross-link eligibility.
    #[must_use]
    pub fn can_link_pair(&self, peptide_a: &Peptide, i: usize, peptide_b: &Peptide, j: usize) -> bool {
        self.pairs
            .iter()
            .any(|(left, right)| left.matches(peptide_a, i) && right.matches(peptide_b, j))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::peptide::PeptideSourceRef;
    use crate::sequence::residue::ModifiedResidue;
    use std::sync::Arc;

    fn peptide(seq: &str, start: usize, protein_length: usize) -> Peptide {
        Peptide::from_residues(
            seq.bytes().map(ModifiedResidue::new).collect(),
            vec![PeptideSourceRef { protein_id: Arc::from("P1"), start, protein_length }],
            None,
            None,
            vec![],
            false,
        )
    }

    #[test]
    fn symmetry_holds_for_every_pair() {
        let map = BondMap::parse("K:D").unwrap();
        let p = peptide("KDAA", 0, 4);
        assert!(map.can_link_pair(&p, 0, &p, 1));
        assert!(map.can_link_pair(&p, 1, &p, 0));
    }

    #[test]
    fn residue_descriptor_matches_letter() {
        let map = BondMap::parse("K:K").unwrap();
        let p = peptide("MKAKM", 0, 5);
        assert!(map.can_link_self(&p, 1, 3));
        assert!(!map.can_link_self(&p, 0, 1));
    }

    #[test]
    fn cterm_descriptor_requires_protein_c_terminus() {
        let map = BondMap::parse("cterm:K").unwrap();
        let reaches_end = peptide("AK", 3, 5);
        assert!(map.can_link_pair(&reaches_end, 1, &reaches_end, 1));
        let not_at_end = peptide("AK", 0, 5);
        assert!(!map.can_link_pair(&not_at_end, 1, &not_at_end, 1));
    }
}
