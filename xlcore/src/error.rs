use context_error::ErrorKind;

/// The kind of error that can occur while building or querying the candidate database.
///
/// Mirrors the teacher crate's convention of one small `Copy` enum per crate implementing
/// [`ErrorKind`], matched on by downstream callers instead of parsing error strings.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum XlCoreError {
    /// A bond-map specification token was not a residue letter, `nterm`, `cterm`, or `*`.
    InvalidBondMapToken,
    /// A variable modification specification referenced an unknown residue or was otherwise
    /// malformed.
    InvalidModificationSpec,
    /// The same variable modification was applied twice to the same residue.
    #[default]
    DuplicateModification,
    /// More than 11 distinct variable modifications were configured.
    TooManyModifications,
    /// A peptide source (protein id + offset) referenced a position outside its protein.
    InvalidPeptideSource,
}

impl ErrorKind for XlCoreError {
    type Settings = ();
    fn descriptor(&self) -> &'static str {
        "xlcore error"
    }
    fn ignored(&self, (): Self::Settings) -> bool {
        false
    }
    fn is_error(&self, (): Self::Settings) -> bool {
        true
    }
}

/// The boxed error type returned by this crate's fallible APIs.
pub type Error = context_error::BoxedError<'static, XlCoreError>;
