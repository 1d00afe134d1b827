//! End-to-end search scenarios driven through [`xlident::driver::SearchDriver`] against a small
//! in-memory [`FastaPeptideSource`], exercising the same contract `xlink-search` drives the
//! binary with (spec.md §8 "End-to-end scenarios").
use rand::SeedableRng;
use rand::rngs::StdRng;
use xlannotate::prelude::{Peak, Spectrum, ZState};
use xlcore::prelude::{BondMap, CandidateDatabase, DatabaseConfig, FastaPeptideSource};
use xlcore::sequence::{Candidate, CandidateLike, ModificationTable, PositionRestriction, VariableModification};
use xlident::config::Config;
use xlident::driver::SearchDriver;

fn build(proteins: Vec<(&str, &str)>, bond_map_spec: &str, link_mass: f64, mods: Vec<VariableModification>, config: &Config) -> (CandidateDatabase, BondMap) {
    let source = FastaPeptideSource::new(proteins.into_iter().map(|(id, seq)| (id.to_string(), seq.to_string())).collect());
    let bond_map = BondMap::parse(bond_map_spec).unwrap();
    let table = ModificationTable::new(mods).unwrap();
    let mut rng = StdRng::seed_from_u64(config.seed);
    let db_config = DatabaseConfig {
        enable_linear: config.xlink_include_linears,
        enable_mono_link: config.xlink_include_deadends,
        enable_self_loop: config.xlink_include_selfloops,
        enable_cross_link: config.xlink_include_inter || config.xlink_include_intra || config.xlink_include_inter_intra,
        min_length: config.min_length,
        max_length: config.max_length,
        max_missed_cleavages: config.missed_cleavages,
        max_mods_per_peptide: config.max_xlink_mods,
        linker_mass: link_mass,
        generate_decoys: false,
    };
    let database = CandidateDatabase::build(&source, &bond_map, table, db_config, &mut rng);
    (database, bond_map)
}

fn spectrum_at(precursor_neutral_mass: f64) -> Spectrum {
    Spectrum::new(
        1,
        1,
        precursor_neutral_mass / 2.0 + xlcore::chemistry::PROTON,
        vec![ZState::from_neutral_mass(2, precursor_neutral_mass)],
        vec![Peak { mz: 175.1, intensity: 12.0 }, Peak { mz: 245.2, intensity: 9.0 }, Peak { mz: 310.0, intensity: 5.0 }],
    )
}

#[test]
fn linear_only_sanity_picks_the_matching_tryptic_peptide() {
    let config = Config {
        xlink_include_selfloops: false,
        xlink_include_inter: false,
        xlink_include_intra: false,
        xlink_include_inter_intra: false,
        min_length: 1,
        ..Config::default()
    };
    let (database, bond_map) = build(vec![("P1", "MRAPK"), ("P2", "MSTK")], "K:K", 138.0681, Vec::new(), &config);
    let mr_mass = database
        .linear_range(false, 0.0, f64::MAX)
        .iter()
        .find(|p| p.sequence_string() == "MR")
        .unwrap()
        .monoisotopic_mass(database.modification_table());

    let driver = SearchDriver::new(&database, &bond_map, &config);
    let mut spectrum = spectrum_at(mr_mass);
    let rows = driver.search_spectrum(&mut spectrum);

    let top = rows.iter().find(|r| r.candidate.sequence_string(database.modification_table()) == "MR").unwrap();
    assert_eq!(top.psm_rank, 1);
    assert!(top.xcorr > 0.0);
}

#[test]
fn self_loop_candidate_is_found_at_the_shifted_precursor_mass() {
    let config = Config {
        xlink_include_linears: false,
        xlink_include_selfloops: true,
        xlink_include_inter: false,
        xlink_include_intra: false,
        xlink_include_inter_intra: false,
        missed_cleavages: 2,
        min_length: 1,
        ..Config::default()
    };
    let (database, bond_map) = build(vec![("P1", "MKAKM")], "K:K", 138.0681, Vec::new(), &config);
    let peptide_mass =
        database.self_loop_range(false, 0.0, f64::MAX).first().map(|c| c.mass(database.modification_table())).unwrap();

    let driver = SearchDriver::new(&database, &bond_map, &config);
    let mut spectrum = spectrum_at(peptide_mass);
    let rows = driver.search_spectrum(&mut spectrum);

    assert!(rows.iter().any(|r| matches!(r.candidate, Candidate::SelfLoop(ref c) if c.site_i == 1 && c.site_j == 3)));
}

#[test]
fn cross_link_intra_filter_excludes_inter_protein_pairs() {
    let config = Config {
        xlink_include_linears: false,
        xlink_include_inter: false,
        xlink_include_intra: true,
        xlink_include_inter_intra: false,
        missed_cleavages: 2,
        min_length: 1,
        ..Config::default()
    };
    let (database, bond_map) = build(vec![("P1", "AKDE"), ("P2", "AKDE")], "K:D", 138.0681, Vec::new(), &config);
    let peptide_mass = database.linear_range(false, 0.0, f64::MAX)[0].monoisotopic_mass(database.modification_table());
    let precursor = 2.0 * peptide_mass + config.link_mass;

    let driver = SearchDriver::new(&database, &bond_map, &config);
    let mut spectrum = spectrum_at(precursor);
    let rows = driver.search_spectrum(&mut spectrum);

    let cross_links: Vec<_> = rows.iter().filter(|r| matches!(r.candidate, Candidate::CrossLink(_))).collect();
    assert!(!cross_links.is_empty());
    for row in &cross_links {
        let Candidate::CrossLink(ref c) = row.candidate else { unreachable!() };
        assert_eq!(c.relation, xlcore::sequence::CrossLinkRelation::Intra);
    }
}

#[test]
fn mono_link_and_variable_modification_produce_the_same_mass() {
    let mono_link = VariableModification {
        symbol: "monolink".to_string(),
        mass_delta: 113.084,
        allowed_residues: vec![b'K'],
        per_peptide_cap: 1,
        position: PositionRestriction::Any,
        prevents_cleavage: false,
        prevents_xlink: true,
        is_mono_link: true,
    };
    let variable = VariableModification { is_mono_link: false, ..mono_link.clone() };

    let config_mono = Config {
        xlink_include_deadends: true,
        xlink_include_linears: false,
        xlink_include_selfloops: false,
        xlink_include_inter: false,
        xlink_include_intra: false,
        xlink_include_inter_intra: false,
        min_length: 1,
        max_xlink_mods: 1,
        ..Config::default()
    };
    let (mono_db, _) = build(vec![("P1", "AKCR")], "K:K", 138.0681, vec![mono_link], &config_mono);
    let mono_mass = mono_db.mono_link_range(false, 0.0, f64::MAX)[0].monoisotopic_mass(mono_db.modification_table());

    let config_linear = Config { xlink_include_linears: true, min_length: 1, max_xlink_mods: 1, ..Config::default() };
    let (linear_db, _) = build(vec![("P1", "AKCR")], "K:K", 138.0681, vec![variable], &config_linear);
    let linear_mass = linear_db
        .linear_range(false, 0.0, f64::MAX)
        .iter()
        .map(|p| p.monoisotopic_mass(linear_db.modification_table()))
        .fold(f64::MIN, f64::max);

    assert!((mono_mass - linear_mass).abs() < 1e-6);
}

#[test]
fn top_n_approximation_agrees_with_the_exhaustive_search_on_a_narrow_window() {
    let base = Config {
        xlink_include_linears: false,
        xlink_include_inter: true,
        xlink_include_intra: true,
        xlink_include_inter_intra: true,
        missed_cleavages: 2,
        min_length: 1,
        precursor_window: 0.01,
        ..Config::default()
    };
    let proteins = vec![("P1", "AKDEFGHIK"), ("P2", "MNPQRAKDE")];
    let (database, bond_map) = build(proteins.clone(), "K:D", 138.0681, Vec::new(), &base);
    let exhaustive = Config { xlink_top_n: 0, ..base.clone() };
    let top_n = Config { xlink_top_n: 5, ..base };

    let precursor = {
        let all = database.flattened_linkable_range(false, 0.0, f64::MAX);
        let a = all[0].monoisotopic_mass(database.modification_table());
        let b = all[1].monoisotopic_mass(database.modification_table());
        a + b + 138.0681
    };

    let driver_exhaustive = SearchDriver::new(&database, &bond_map, &exhaustive);
    let mut spectrum_a = spectrum_at(precursor);
    let best_exhaustive = driver_exhaustive
        .search_spectrum(&mut spectrum_a)
        .into_iter()
        .filter(|r| matches!(r.candidate, Candidate::CrossLink(_)))
        .max_by(|a, b| a.xcorr.partial_cmp(&b.xcorr).unwrap());

    let driver_top_n = SearchDriver::new(&database, &bond_map, &top_n);
    let mut spectrum_b = spectrum_at(precursor);
    let best_top_n = driver_top_n
        .search_spectrum(&mut spectrum_b)
        .into_iter()
        .filter(|r| matches!(r.candidate, Candidate::CrossLink(_)))
        .max_by(|a, b| a.xcorr.partial_cmp(&b.xcorr).unwrap());

    let exhaustive_best = best_exhaustive.expect("exhaustive search should find a cross-link candidate");
    let top_n_best = best_top_n.expect("top-N search should find a cross-link candidate");
    assert_eq!(
        exhaustive_best.candidate.sequence_string(database.modification_table()),
        top_n_best.candidate.sequence_string(database.modification_table())
    );
}
