//! Thin CLI entry point wiring configuration, database construction, the search driver, and the
//! result writer together into a runnable binary (spec.md §6 "command-line parsing ... delegated";
//! `SPEC_FULL.md` "CLI" — needed for the repo to run end-to-end even though the core crates treat
//! it as an external collaborator).
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter};
use std::time::Instant;

use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use xlannotate::prelude::{Peak, Spectrum, ZState};
use xlcore::prelude::{BondMap, DatabaseConfig, FastaPeptideSource};
use xlcore::sequence::ModificationTable;
use xlident::config::Config;
use xlident::driver::SearchDriver;
use xlident::spectrum_source::SpectrumSource;
use xlident::writer::ResultWriter;

#[derive(Debug, Parser)]
#[command(name = "xlink-search", about = "Cross-link identification search against an MS2 spectrum file and a FASTA database.")]
struct Cli {
    /// MS2-format spectrum file to search.
    #[arg(short, long)]
    spectra: String,
    /// FASTA file of candidate proteins.
    #[arg(short, long)]
    fasta: String,
    /// `key = value` configuration file; omit to run with defaults.
    #[arg(short, long)]
    config: Option<String>,
    /// Where to write the tab-delimited result table.
    #[arg(short, long, default_value = "xlink-search.tsv")]
    out: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init_from_env(env_logger::Env::default().filter_or("XLINK_SEARCH_LOG", "info"));
    let start = Instant::now();
    let args = Cli::parse();

    let config = match &args.config {
        Some(path) => Config::parse(&std::fs::read_to_string(path)?)?,
        None => Config::default(),
    };

    let proteins = read_fasta(&args.fasta)?;
    let source = FastaPeptideSource::new(proteins);
    let bond_map = BondMap::parse(&config.link_sites)?;
    let mods = build_modification_table(&config)?;
    let database_config = DatabaseConfig {
        enable_linear: config.xlink_include_linears,
        enable_mono_link: config.xlink_include_deadends,
        enable_self_loop: config.xlink_include_selfloops,
        enable_cross_link: config.xlink_include_inter || config.xlink_include_intra || config.xlink_include_inter_intra,
        min_length: config.min_length,
        max_length: config.max_length,
        max_missed_cleavages: config.missed_cleavages,
        max_mods_per_peptide: config.max_xlink_mods,
        linker_mass: config.link_mass,
        generate_decoys: true,
    };
    let mut build_rng = StdRng::seed_from_u64(config.seed);
    let database = xlcore::prelude::CandidateDatabase::build(&source, &bond_map, mods, database_config, &mut build_rng);
    log::info!("database built with {} candidates in {}ms", database.linear_range(false, 0.0, f64::MAX).len(), start.elapsed().as_millis());

    let mut spectra = Ms2Reader::open(&args.spectra)?;
    let driver = SearchDriver::new(&database, &bond_map, &config);
    let out_file = BufWriter::new(File::create(&args.out)?);
    let mut writer = ResultWriter::new(out_file);
    driver.run(&mut spectra, &mut writer)?;

    log::info!("search finished in {}ms, wrote results to {}", start.elapsed().as_millis(), args.out);
    Ok(())
}

fn build_modification_table(config: &Config) -> Result<ModificationTable, xlcore::error::Error> {
    let mut mods = config.variable_mods.clone();
    mods.extend(config.mono_link_mods.clone());
    ModificationTable::new(mods)
}

/// Read a FASTA file into `(id, sequence)` pairs. Only the `>id` token before the first
/// whitespace is kept as the protein identifier; this crate treats FASTA parsing as an external
/// collaborator's job (spec.md §6), so only the minimal reading needed to drive the binary lives
/// here rather than a full FASTA-parsing dependency.
fn read_fasta(path: &str) -> std::io::Result<Vec<(String, String)>> {
    let reader = BufReader::new(File::open(path)?);
    let mut proteins = Vec::new();
    let mut current_id: Option<String> = None;
    let mut current_seq = String::new();
    for line in reader.lines() {
        let line = line?;
        if let Some(header) = line.strip_prefix('>') {
            if let Some(id) = current_id.take() {
                proteins.push((id, std::mem::take(&mut current_seq)));
            }
            current_id = Some(header.split_whitespace().next().unwrap_or_default().to_string());
        } else {
            current_seq.push_str(line.trim());
        }
    }
    if let Some(id) = current_id {
        proteins.push((id, current_seq));
    }
    Ok(proteins)
}

/// Minimal reader for the `MS2` spectrum text format: `S` lines start a new spectrum (scan,
/// scan, precursor m/z), `Z` lines append a Z-state (charge, singly-protonated mass), all other
/// non-comment lines are `mz intensity` peak pairs. Spectrum file parsing is an external
/// collaborator's job per spec.md §6; this is the minimal concrete [`SpectrumSource`] the binary
/// needs to be runnable against real MS2 files, not a general multi-format parser.
struct Ms2Reader {
    lines: std::io::Lines<BufReader<File>>,
    pending: Option<String>,
}

impl Ms2Reader {
    fn open(path: &str) -> std::io::Result<Self> {
        Ok(Self { lines: BufReader::new(File::open(path)?).lines(), pending: None })
    }

    fn next_line(&mut self) -> Option<String> {
        self.pending.take().or_else(|| self.lines.next().and_then(Result::ok))
    }
}

impl SpectrumSource for Ms2Reader {
    fn next_spectrum(&mut self) -> Option<Spectrum> {
        let mut first_scan = 0u32;
        let mut last_scan = 0u32;
        let mut precursor_mz = 0.0;
        let mut z_states = Vec::new();
        let mut peaks = Vec::new();
        let mut started = false;

        while let Some(line) = self.next_line() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('H') {
                continue;
            }
            if let Some(rest) = line.strip_prefix('S') {
                if started {
                    self.pending = Some(format!("S{rest}"));
                    break;
                }
                let fields: Vec<&str> = rest.split_whitespace().collect();
                if fields.len() >= 3 {
                    first_scan = fields[0].parse().unwrap_or(0);
                    last_scan = fields[1].parse().unwrap_or(first_scan);
                    precursor_mz = fields[2].parse().unwrap_or(0.0);
                }
                started = true;
            } else if let Some(rest) = line.strip_prefix('Z') {
                let fields: Vec<&str> = rest.split_whitespace().collect();
                if fields.len() >= 2 {
                    if let (Ok(charge), Ok(mh)) = (fields[0].parse::<u8>(), fields[1].parse::<f64>()) {
                        z_states.push(ZState::from_neutral_mass(charge, mh - xlcore::chemistry::PROTON));
                    }
                }
            } else {
                let fields: Vec<&str> = line.split_whitespace().collect();
                if fields.len() >= 2 {
                    if let (Ok(mz), Ok(intensity)) = (fields[0].parse::<f64>(), fields[1].parse::<f64>()) {
                        peaks.push(Peak { mz, intensity });
                    }
                }
            }
        }

        if !started {
            return None;
        }
        Some(Spectrum::new(first_scan, last_scan, precursor_mz, z_states, peaks))
    }
}
