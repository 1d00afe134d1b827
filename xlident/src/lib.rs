#![doc = include_str!("../README.md")]

/// Parsing and validation of the flat `key = value` configuration text spec.md §6 recognises.
pub mod config;
/// Generation of a decoy candidate's shuffled sequence variant via `xlcore::decoy`.
pub mod decoy;
/// The per-spectrum search loop: Z-state resolution, candidate enumeration, scoring, optional
/// p-value calibration, ranking, and top-match truncation.
pub mod driver;
/// Precursor-window candidate enumeration across the five candidate kinds.
pub mod enumerator;
/// The error kind returned by every fallible operation in this crate.
pub mod error;
/// One scored candidate against one spectrum at one Z-state, and the result table row it maps to.
pub mod match_row;
/// The external spectrum source trait `xlink-search` adapts a concrete spectrum format to.
pub mod spectrum_source;
/// The tab-delimited result table writer.
pub mod writer;
/// Z-state inference for spectra that arrive without a known precursor charge.
pub mod zstate_fallback;

/// A subset of the types most commonly needed together, mirroring the teacher crate's prelude
/// convention.
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::driver::SearchDriver;
    pub use crate::enumerator::{EnumeratedCandidates, TopNScoring, enumerate, enumerate_window};
    pub use crate::error::{Error, XlIdentError};
    pub use crate::match_row::MatchRow;
    pub use crate::spectrum_source::SpectrumSource;
    pub use crate::writer::ResultWriter;
}
