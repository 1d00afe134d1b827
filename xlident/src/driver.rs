use std::cell::RefCell;

use rand::SeedableRng;
use rand::rngs::StdRng;
use xlannotate::prelude::{
    CrossLinkXcorr, IonPredictionConfig, ProcessedSpectrum, SpScore, Spectrum, TrainingSet, WeibullConfig,
    WeibullOutcome, ZState, cross_link_xcorr, ecdf_p_value, fit_three_parameter_weibull, predict_ions, preprocess,
    sp_score, xcorr,
};
use xlcore::prelude::{BondMap, Candidate, CandidateDatabase};
use xlcore::sequence::{CandidateLike, ModificationTable};

use crate::config::Config;
use crate::enumerator::{self, TopNScoring};
use crate::error::Error;
use crate::match_row::MatchRow;
use crate::spectrum_source::SpectrumSource;
use crate::writer::ResultWriter;
use crate::zstate_fallback;

/// Runs the per-spectrum search loop of spec.md §4.7 against an already-built candidate
/// database, owning the process-wide seeded random source spec.md §5 "Shared resources"
/// describes (used to pad a spectrum's decoy training set when it falls short of
/// `min-weibull-points`).
#[derive(Debug)]
pub struct SearchDriver<'a> {
    database: &'a CandidateDatabase,
    bond_map: &'a BondMap,
    config: &'a Config,
    rng: RefCell<StdRng>,
}

impl<'a> SearchDriver<'a> {
    #[must_use]
    pub fn new(database: &'a CandidateDatabase, bond_map: &'a BondMap, config: &'a Config) -> Self {
        Self { database, bond_map, config, rng: RefCell::new(StdRng::seed_from_u64(config.seed)) }
    }

    /// Run the full search over every spectrum `spectra` yields, writing retained matches to
    /// `writer` in input spectrum order (spec.md §5 "Ordering guarantees"), and logging progress
    /// at `config.progress_cadence` spectra (spec.md §4.7 "Progress reporting").
    ///
    /// # Errors
    /// Returns an [`Error`] if `writer` fails; `writer.flush()` is still attempted first so
    /// partial results survive (spec.md §7 "the writer flushes partial results on any fatal
    /// error").
    pub fn run(&self, spectra: &mut dyn SpectrumSource, writer: &mut ResultWriter<impl std::io::Write>) -> Result<(), Error> {
        let mods = self.database.modification_table();
        let mut processed_count = 0usize;
        while let Some(mut spectrum) = spectra.next_spectrum() {
            processed_count += 1;
            if processed_count % self.config.progress_cadence.max(1) == 0 {
                log::info!("processed {processed_count} spectra");
            }

            let rows = self.search_spectrum(&mut spectrum);
            for row in &rows {
                if let Err(err) = writer.write_row(row, mods) {
                    let _ = writer.flush();
                    return Err(err);
                }
            }
        }
        writer.flush()
    }

    /// Score one spectrum against every admissible Z-state and return its retained matches
    /// (spec.md §4.7). Sorts `spectrum`'s peaks by m/z if they are not already, since the Sp
    /// score requires that ordering.
    #[must_use]
    pub fn search_spectrum(&self, spectrum: &mut Spectrum) -> Vec<MatchRow> {
        if spectrum.peak_order() != xlannotate::spectrum::PeakOrder::ByMz {
            spectrum.sort_by_mz();
        }

        let mut z_states = spectrum.z_states.clone();
        if let Some(only) = self.config.spectrum_charge {
            z_states.retain(|z| z.charge() == only);
        }
        if z_states.is_empty() && self.config.zstate_fallback_enabled {
            z_states = zstate_fallback::infer_z_states(spectrum, self.config.zstate_fallback_threshold);
        }
        if z_states.is_empty() {
            log::info!("scan {}: no usable z-state, skipping", spectrum.first_scan);
            return Vec::new();
        }

        if spectrum.peaks().is_empty() {
            log::info!("scan {}: no peaks, skipping", spectrum.first_scan);
            return Vec::new();
        }

        let processed = preprocess(spectrum, &self.config.preprocess_config());
        let ion_config = self.config.ion_prediction_config();

        z_states
            .into_iter()
            .flat_map(|z| self.search_z_state(spectrum, &processed, &ion_config, z))
            .collect()
    }

    fn search_z_state(
        &self,
        spectrum: &Spectrum,
        processed: &ProcessedSpectrum,
        ion_config: &IonPredictionConfig,
        z: ZState,
    ) -> Vec<MatchRow> {
        let mods = self.database.modification_table();
        let precursor_neutral_mass = z.neutral_mass();

        let top_n_scoring =
            (self.config.xlink_top_n > 0).then(|| TopNScoring { processed, ion_config, charge: z.charge() });
        let enumerated =
            enumerator::enumerate(self.database, self.bond_map, self.config, precursor_neutral_mass, top_n_scoring);

        if enumerated.targets.is_empty() {
            log::info!("scan {} z={}: no candidates in window, skipping", spectrum.first_scan, z.charge());
            return Vec::new();
        }
        if self.config.require_xlink_candidate
            && !enumerated.targets.iter().any(|c| matches!(c, Candidate::CrossLink(_)))
        {
            return Vec::new();
        }

        let score_one = |candidate: &Candidate| -> (f64, Option<CrossLinkXcorr>, Option<SpScore>) {
            let fragments = predict_ions(candidate, mods, ion_config, z.charge());
            let score = xcorr(processed, &fragments, ion_config.use_flanking_peaks);
            let cross_link = matches!(candidate, Candidate::CrossLink(_))
                .then(|| cross_link_xcorr(processed, &fragments, ion_config.use_flanking_peaks));
            let sp = sp_score(spectrum.peaks(), &fragments, self.config.sp_score_tolerance);
            (score, cross_link, Some(sp))
        };

        let scored_targets: Vec<(Candidate, f64, Option<CrossLinkXcorr>, Option<SpScore>)> = enumerated
            .targets
            .into_iter()
            .map(|c| {
                let (score, cl, sp) = score_one(&c);
                (c, score, cl, sp)
            })
            .collect();
        let scored_decoys: Vec<(Candidate, f64, Option<CrossLinkXcorr>, Option<SpScore>)> = enumerated
            .decoys
            .into_iter()
            .map(|c| {
                let (score, cl, sp) = score_one(&c);
                (c, score, cl, sp)
            })
            .collect();

        let mut rows = if self.config.concat {
            let mut combined = scored_targets;
            combined.extend(scored_decoys);
            rank_and_build_rows(combined, spectrum.first_scan, z, mods)
        } else {
            let mut rows = rank_and_build_rows(scored_targets, spectrum.first_scan, z, mods);
            rows.extend(rank_and_build_rows(scored_decoys, spectrum.first_scan, z, mods));
            rows
        };
        rows.truncate(self.config.top_match);

        if self.config.compute_p_values {
            self.annotate_p_values(&mut rows, precursor_neutral_mass, processed, ion_config, z, mods);
        }

        rows
    }

    fn annotate_p_values(
        &self,
        rows: &mut [MatchRow],
        precursor_neutral_mass: f64,
        processed: &ProcessedSpectrum,
        ion_config: &IonPredictionConfig,
        z: ZState,
        mods: &ModificationTable,
    ) {
        let (lo, hi) = self.config.weibull_tolerance().bounds(precursor_neutral_mass);
        let training = enumerator::enumerate_window(
            self.database,
            self.bond_map,
            self.config,
            lo,
            hi,
            precursor_neutral_mass,
            None,
        );

        let mut training_set = TrainingSet::new();
        for candidate in &training.decoys {
            let fragments = predict_ions(candidate, mods, ion_config, z.charge());
            let score = xcorr(processed, &fragments, ion_config.use_flanking_peaks);
            training_set.add_point(candidate.sequence_string(mods), score);
        }
        if training_set.scores().len() < self.config.min_weibull_points {
            training_set.pad_with_shuffled_duplicates(self.config.min_weibull_points, &mut *self.rng.borrow_mut());
        }

        let weibull_config = WeibullConfig { fraction_to_fit: self.config.fraction_top_scores_to_fit, ..WeibullConfig::default() };
        let outcome = fit_three_parameter_weibull(training_set.scores(), &weibull_config);

        for row in rows.iter_mut() {
            let (weibull, ecdf) = match outcome {
                WeibullOutcome::Fit(fit) => (Some(fit.p_value(row.xcorr)), None),
                WeibullOutcome::Failed => (None, Some(ecdf_p_value(training_set.scores(), row.xcorr))),
            };
            row.weibull_p_value = weibull;
            row.ecdf_p_value = ecdf;
        }
    }
}

fn rank_and_build_rows(
    mut scored: Vec<(Candidate, f64, Option<CrossLinkXcorr>, Option<SpScore>)>,
    scan: u32,
    z: ZState,
    mods: &ModificationTable,
) -> Vec<MatchRow> {
    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.0.sequence_string(mods).cmp(&b.0.sequence_string(mods)))
    });

    let mut xlink_rank = 0usize;
    scored
        .into_iter()
        .enumerate()
        .map(|(i, (candidate, score, cross_link, sp))| {
            let this_xlink_rank = matches!(candidate, Candidate::CrossLink(_)).then(|| {
                xlink_rank += 1;
                xlink_rank
            });
            MatchRow {
                scan,
                z_state: z,
                candidate,
                preliminary_xcorr: None,
                xcorr: score,
                cross_link_xcorr: cross_link,
                sp_score: sp,
                weibull_p_value: None,
                ecdf_p_value: None,
                psm_rank: i + 1,
                xlink_rank: this_xlink_rank,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use xlannotate::prelude::Peak;
    use xlcore::prelude::{BondMap, DatabaseConfig, FastaPeptideSource};
    use xlcore::sequence::ModificationTable;

    fn build_database(config: &Config) -> CandidateDatabase {
        let source = FastaPeptideSource::new(vec![("P1".into(), "MRAPK".into())]);
        let bond_map = BondMap::parse(&config.link_sites).unwrap();
        let mods = ModificationTable::default();
        let mut rng = StdRng::seed_from_u64(config.seed);
        let db_config = DatabaseConfig {
            enable_linear: true,
            enable_mono_link: false,
            enable_self_loop: false,
            enable_cross_link: false,
            min_length: 1,
            max_length: 50,
            max_missed_cleavages: config.missed_cleavages,
            max_mods_per_peptide: 2,
            linker_mass: config.link_mass,
            generate_decoys: true,
        };
        CandidateDatabase::build(&source, &bond_map, mods, db_config, &mut rng)
    }

    #[test]
    fn retains_a_linear_match_with_a_matching_precursor_mass() {
        let config = Config::default();
        let database = build_database(&config);
        let bond_map = BondMap::parse(&config.link_sites).unwrap();
        let driver = SearchDriver::new(&database, &bond_map, &config);

        let mr_mass = database
            .linear_range(false, 0.0, f64::MAX)
            .iter()
            .find(|p| p.sequence_string() == "MR")
            .unwrap()
            .monoisotopic_mass(database.modification_table());

        let mut spectrum = Spectrum::new(
            1,
            1,
            mr_mass / 2.0 + xlcore::chemistry::PROTON,
            vec![ZState::from_neutral_mass(2, mr_mass)],
            vec![Peak { mz: 150.0, intensity: 10.0 }, Peak { mz: 250.0, intensity: 8.0 }],
        );

        let rows = driver.search_spectrum(&mut spectrum);
        assert!(rows.iter().any(|r| r.candidate.sequence_string(database.modification_table()) == "MR"));
    }
}
