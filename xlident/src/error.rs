use context_error::ErrorKind;

/// The kind of error that can occur while configuring, enumerating, or driving a search.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum XlIdentError {
    /// A configuration key held a value outside its valid range, or an unrecognised key.
    #[default]
    InvalidConfiguration,
    /// A configuration file could not be read or parsed as `key = value` lines.
    ConfigurationIo,
    /// The bond map or modification table supplied to the enumerator was itself invalid.
    InvalidBondMapOrModifications,
    /// A fatal error writing the output path (spec.md §7 item 5).
    OutputIo,
}

impl ErrorKind for XlIdentError {
    type Settings = ();
    fn descriptor(&self) -> &'static str {
        "xlident error"
    }
    fn ignored(&self, (): Self::Settings) -> bool {
        false
    }
    fn is_error(&self, (): Self::Settings) -> bool {
        true
    }
}

/// The boxed error type returned by this crate's fallible APIs.
pub type Error = context_error::BoxedError<'static, XlIdentError>;
