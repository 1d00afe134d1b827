use xlannotate::prelude::{CrossLinkXcorr, SpScore, ZState};
use xlcore::sequence::Candidate;

/// One result row: a scored candidate against one spectrum at one Z-state (spec.md §3
/// "Match / result row: Candidate, Z-state, preliminary score, XCorr, p-value, rank(s), associated
/// spectrum reference").
///
/// Carries both `psm_rank` (rank among all candidates scored for this spectrum/Z-state) and an
/// optional `xlink_rank` (rank among cross-link candidates specifically), matching the reference
/// implementation's two separate rank fields rather than collapsing to one (spec.md §3's plural
/// "rank(s)"; `DESIGN.md` "Supplemented features" item 6).
#[derive(Clone, Debug)]
pub struct MatchRow {
    pub scan: u32,
    pub z_state: ZState,
    pub candidate: Candidate,
    pub preliminary_xcorr: Option<f64>,
    pub xcorr: f64,
    pub cross_link_xcorr: Option<CrossLinkXcorr>,
    pub sp_score: Option<SpScore>,
    pub weibull_p_value: Option<f64>,
    pub ecdf_p_value: Option<f64>,
    pub psm_rank: usize,
    pub xlink_rank: Option<usize>,
}

impl MatchRow {
    /// `log10` of the Weibull p-value, if one was computed (spec.md §6 "p-value and
    /// log-p-value"). Returns `None` rather than a nonsensical log of a missing p-value.
    #[must_use]
    pub fn log_p_value(&self) -> Option<f64> {
        self.weibull_p_value.map(f64::log10)
    }

    /// Signed part-per-million error between the candidate's theoretical mass and the spectrum's
    /// observed neutral mass at this Z-state (spec.md §6 "PPM error").
    #[must_use]
    pub fn ppm_error(&self, candidate_mass: f64) -> f64 {
        let observed = self.z_state.neutral_mass();
        (observed - candidate_mass) / candidate_mass * 1_000_000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use xlcore::sequence::{LinearCandidate, ModifiedResidue, Peptide};

    #[test]
    fn log_p_value_is_none_without_a_weibull_fit() {
        let peptide = Arc::new(Peptide::from_residues(
            "MR".bytes().map(ModifiedResidue::new).collect(),
            vec![],
            None,
            None,
            vec![],
            false,
        ));
        let row = MatchRow {
            scan: 1,
            z_state: ZState::from_mz(2, 400.0),
            candidate: Candidate::Linear(LinearCandidate::new(peptide, false)),
            preliminary_xcorr: None,
            xcorr: 1.5,
            cross_link_xcorr: None,
            sp_score: None,
            weibull_p_value: None,
            ecdf_p_value: Some(0.01),
            psm_rank: 1,
            xlink_rank: None,
        };
        assert_eq!(row.log_p_value(), None);
    }

    #[test]
    fn ppm_error_is_zero_for_an_exact_match() {
        let z = ZState::from_neutral_mass(2, 1000.0);
        let peptide = Arc::new(Peptide::from_residues(
            "MR".bytes().map(ModifiedResidue::new).collect(),
            vec![],
            None,
            None,
            vec![],
            false,
        ));
        let row = MatchRow {
            scan: 1,
            z_state: z,
            candidate: Candidate::Linear(LinearCandidate::new(peptide, false)),
            preliminary_xcorr: None,
            xcorr: 0.0,
            cross_link_xcorr: None,
            sp_score: None,
            weibull_p_value: None,
            ecdf_p_value: None,
            psm_rank: 1,
            xlink_rank: None,
        };
        assert!(row.ppm_error(1000.0).abs() < 1e-9);
    }
}
