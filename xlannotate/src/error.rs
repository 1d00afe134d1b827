use context_error::ErrorKind;

/// The kind of error that can occur while preprocessing a spectrum or fitting a calibration.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum XlAnnotateError {
    /// A spectrum had fewer peaks than the configured minimum.
    #[default]
    TooFewPeaks,
    /// A bin-width or tolerance parameter was zero or negative.
    InvalidBinWidth,
}

impl ErrorKind for XlAnnotateError {
    type Settings = ();
    fn descriptor(&self) -> &'static str {
        "xlannotate error"
    }
    fn ignored(&self, (): Self::Settings) -> bool {
        false
    }
    fn is_error(&self, (): Self::Settings) -> bool {
        true
    }
}

/// The boxed error type returned by this crate's fallible APIs.
pub type Error = context_error::BoxedError<'static, XlAnnotateError>;
