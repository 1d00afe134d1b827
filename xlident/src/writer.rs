use std::io::Write;

use context_error::CreateError;
use itertools::Itertools;
use xlcore::sequence::{Candidate, ModificationTable};

use crate::error::{Error, XlIdentError};
use crate::match_row::MatchRow;

/// Fixed output column order (spec.md §6 "Outputs ... one row per match, columns:").
const HEADER: [&str; 18] = [
    "scan",
    "charge",
    "precursor mass",
    "psm rank",
    "candidate type",
    "decoy type",
    "candidate mass",
    "candidate sequence",
    "protein ids",
    "flanking residues",
    "xcorr",
    "xcorr first",
    "xcorr second",
    "sp score",
    "p-value",
    "log p-value",
    "ppm error",
    "missed cleavages",
];

/// Writes the tab-delimited result table spec.md §6 describes: one row per [`MatchRow`], the
/// fixed column order of [`HEADER`], escaping a value that itself contains a tab the same way the
/// teacher crate's dynamic-column CSV writer does (wrap in quotes, fold embedded quotes to single
/// quotes) rather than adopting the teacher's dynamic union-of-columns schema, since spec.md §6
/// fixes the column set in advance.
pub struct ResultWriter<W: Write> {
    sink: W,
    header_written: bool,
}

impl<W: Write> ResultWriter<W> {
    #[must_use]
    pub fn new(sink: W) -> Self {
        Self { sink, header_written: false }
    }

    /// Write the header row, once, on first use.
    ///
    /// # Errors
    /// Returns [`XlIdentError::OutputIo`] if the underlying writer fails (spec.md §7 item 5).
    pub fn write_header(&mut self) -> Result<(), Error> {
        if self.header_written {
            return Ok(());
        }
        writeln!(self.sink, "{}", HEADER.join("\t")).map_err(io_error)?;
        self.header_written = true;
        Ok(())
    }

    /// Write one result row, matching [`HEADER`]'s column order.
    ///
    /// # Errors
    /// Returns [`XlIdentError::OutputIo`] if the underlying writer fails (spec.md §7 item 5).
    pub fn write_row(&mut self, row: &MatchRow, mods: &ModificationTable) -> Result<(), Error> {
        self.write_header()?;
        let fields = row_fields(row, mods);
        let escaped = fields.iter().map(|f| escape(f, '\t')).join("\t");
        writeln!(self.sink, "{escaped}").map_err(io_error)?;
        Ok(())
    }

    /// Flush any buffered output; called unconditionally on a fatal error so partial results
    /// survive it (spec.md §7 "the writer flushes partial results on any fatal error").
    ///
    /// # Errors
    /// Returns [`XlIdentError::OutputIo`] if the underlying writer fails to flush.
    pub fn flush(&mut self) -> Result<(), Error> {
        self.sink.flush().map_err(io_error)
    }
}

fn io_error(source: std::io::Error) -> Error {
    context_error::BoxedError::new(
        XlIdentError::OutputIo,
        "failed to write output",
        source.to_string(),
        context_error::Context::none(),
    )
}

fn escape(value: &str, separator: char) -> String {
    if value.contains(separator) { format!("\"{}\"", value.replace('\"', "\'")) } else { value.to_string() }
}

fn protein_ids(candidate: &Candidate) -> String {
    let peptides: Vec<&xlcore::sequence::Peptide> = match candidate {
        Candidate::Linear(c) => vec![c.peptide.as_ref()],
        Candidate::SelfLoop(c) => vec![c.peptide.as_ref()],
        Candidate::CrossLink(c) => vec![c.first.peptide().as_ref(), c.second.peptide().as_ref()],
    };
    peptides
        .iter()
        .flat_map(|p| p.sources().iter().map(|s| format!("{}:{}", s.protein_id, s.start)))
        .join(";")
}

fn flanking_residues(candidate: &Candidate) -> String {
    let peptides: Vec<&xlcore::sequence::Peptide> = match candidate {
        Candidate::Linear(c) => vec![c.peptide.as_ref()],
        Candidate::SelfLoop(c) => vec![c.peptide.as_ref()],
        Candidate::CrossLink(c) => vec![c.first.peptide().as_ref(), c.second.peptide().as_ref()],
    };
    peptides
        .iter()
        .map(|p| {
            let (n, c) = p.flanking();
            format!("{}.{}", n.map_or('-', char::from), c.map_or('-', char::from))
        })
        .join(";")
}

fn missed_cleavages(candidate: &Candidate, mods: &ModificationTable) -> usize {
    let empty = std::collections::BTreeSet::new();
    match candidate {
        Candidate::Linear(c) => c.peptide.missed_cleavages(&empty, mods),
        Candidate::SelfLoop(c) => {
            let skip: std::collections::BTreeSet<usize> = [c.site_i, c.site_j].into_iter().collect();
            c.peptide.missed_cleavages(&skip, mods)
        }
        Candidate::CrossLink(c) => {
            let skip_first: std::collections::BTreeSet<usize> = [c.first_site].into_iter().collect();
            let skip_second: std::collections::BTreeSet<usize> = [c.second_site].into_iter().collect();
            c.first.peptide().missed_cleavages(&skip_first, mods) + c.second.peptide().missed_cleavages(&skip_second, mods)
        }
    }
}

fn row_fields(row: &MatchRow, mods: &ModificationTable) -> Vec<String> {
    let candidate_mass = row.candidate.mass(mods);
    vec![
        row.scan.to_string(),
        row.z_state.charge().to_string(),
        row.z_state.neutral_mass().to_string(),
        row.psm_rank.to_string(),
        row.candidate.kind().report_label().to_string(),
        row.candidate.quadrant().report_label().to_string(),
        candidate_mass.to_string(),
        row.candidate.sequence_string(mods),
        protein_ids(&row.candidate),
        flanking_residues(&row.candidate),
        row.xcorr.to_string(),
        row.cross_link_xcorr.map(|x| x.first.to_string()).unwrap_or_default(),
        row.cross_link_xcorr.map(|x| x.second.to_string()).unwrap_or_default(),
        row.sp_score.map(|s| s.score.to_string()).unwrap_or_default(),
        row.weibull_p_value.map(|p| p.to_string()).unwrap_or_default(),
        row.log_p_value().map(|p| p.to_string()).unwrap_or_default(),
        row.ppm_error(candidate_mass).to_string(),
        missed_cleavages(&row.candidate, mods).to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use xlannotate::prelude::ZState;
    use xlcore::sequence::{LinearCandidate, ModifiedResidue, Peptide};

    #[test]
    fn writes_header_then_one_row() {
        let peptide = Arc::new(Peptide::from_residues(
            "MR".bytes().map(ModifiedResidue::new).collect(),
            vec![],
            None,
            None,
            vec![],
            false,
        ));
        let row = MatchRow {
            scan: 7,
            z_state: ZState::from_mz(2, 400.0),
            candidate: Candidate::Linear(LinearCandidate::new(peptide, false)),
            preliminary_xcorr: None,
            xcorr: 1.2,
            cross_link_xcorr: None,
            sp_score: None,
            weibull_p_value: None,
            ecdf_p_value: None,
            psm_rank: 1,
            xlink_rank: None,
        };
        let mods = ModificationTable::default();
        let mut buffer = Vec::new();
        let mut writer = ResultWriter::new(&mut buffer);
        writer.write_row(&row, &mods).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("scan\tcharge"));
        assert!(lines[1].starts_with("7\t2\t"));
    }
}
