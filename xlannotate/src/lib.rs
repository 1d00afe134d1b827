#![doc = include_str!("../README.md")]

/// The error kind returned by every fallible operation in this crate.
pub mod error;
/// Theoretical fragment-ion prediction for the five candidate kinds `xlcore` defines.
pub mod fragment;
/// Spectrum binning, intensity normalisation, and background subtraction ahead of scoring.
pub mod preprocessor;
/// XCorr and Sp scoring of a candidate's predicted fragments against a preprocessed spectrum.
pub mod scorer;
/// The observed-spectrum model: peaks, Z-states, and scan metadata.
pub mod spectrum;
/// Three-parameter Weibull p-value calibration with empirical-CDF fallback.
pub mod weibull;

/// A subset of the types most commonly needed together, mirroring the teacher crate's prelude
/// convention.
pub mod prelude {
    pub use crate::error::Error;
    pub use crate::fragment::{Fragment, FragmentOwner, IonKind, IonPredictionConfig, predict_ions};
    pub use crate::preprocessor::{PreprocessConfig, ProcessedSpectrum, preprocess};
    pub use crate::scorer::{CrossLinkXcorr, SpScore, cross_link_xcorr, sp_score, xcorr};
    pub use crate::spectrum::{Peak, Spectrum, ZState};
    pub use crate::weibull::{TrainingSet, WeibullConfig, WeibullFit, WeibullOutcome, ecdf_p_value, fit_three_parameter_weibull};
}
