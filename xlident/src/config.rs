use std::collections::BTreeMap;

use context_error::{BoxedError, Context, CreateError};
use xlcore::chemistry::MassMode;
use xlcore::quantities::{Tolerance, WindowKind};
use xlcore::sequence::{PositionRestriction, VariableModification};

use crate::error::XlIdentError;

/// Every configuration key spec.md §6 recognises, built the way `mzident`'s format readers build
/// typed structs from loosely-typed input: parsed from a flat `key = value` text file (the
/// format `crux` itself uses, see `examples/original_source/src/util/Params.cpp`) rather than a
/// structured format, with out-of-range values rejected at parse time (spec.md §7 item 1).
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub link_sites: String,
    pub link_mass: f64,
    pub mono_link_mods: Vec<VariableModification>,
    pub variable_mods: Vec<VariableModification>,
    pub xlink_prevents_cleavage: Vec<u8>,

    pub xlink_include_linears: bool,
    pub xlink_include_deadends: bool,
    pub xlink_include_selfloops: bool,
    pub xlink_include_inter: bool,
    pub xlink_include_intra: bool,
    pub xlink_include_inter_intra: bool,
    pub require_xlink_candidate: bool,
    pub xlink_top_n: usize,
    pub max_xlink_mods: usize,

    pub missed_cleavages: usize,
    pub enzyme: String,
    pub custom_enzyme: Option<String>,
    pub digestion: String,
    pub min_mass: f64,
    pub max_mass: f64,
    pub min_length: usize,
    pub max_length: usize,

    pub precursor_window: f64,
    pub precursor_window_type: WindowKind,
    pub precursor_window_weibull: f64,
    pub precursor_window_type_weibull: WindowKind,
    pub isotope_windows: Vec<i32>,

    pub isotopic_mass: MassMode,
    pub fragment_mass: MassMode,

    pub mz_bin_width: f64,
    pub mz_bin_offset: f64,

    pub use_a_ions: bool,
    pub use_b_ions: bool,
    pub use_c_ions: bool,
    pub use_x_ions: bool,
    pub use_y_ions: bool,
    pub use_z_ions: bool,
    pub max_ion_charge: u8,
    pub use_flanking_peaks: bool,

    pub remove_precursor_tolerance: Option<f64>,
    pub spectrum_charge: Option<u8>,
    pub spectrum_min_mz: Option<f64>,
    pub spectrum_max_mz: Option<f64>,
    pub zstate_fallback_enabled: bool,
    pub zstate_fallback_threshold: f64,

    pub compute_p_values: bool,
    pub min_weibull_points: usize,
    pub fraction_top_scores_to_fit: f64,

    pub top_match: usize,
    pub concat: bool,

    pub sp_score_tolerance: f64,
    pub progress_cadence: usize,

    pub seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            link_sites: "K:K".to_string(),
            link_mass: 138.0681,
            mono_link_mods: Vec::new(),
            variable_mods: Vec::new(),
            xlink_prevents_cleavage: Vec::new(),

            xlink_include_linears: true,
            xlink_include_deadends: false,
            xlink_include_selfloops: false,
            xlink_include_inter: true,
            xlink_include_intra: true,
            xlink_include_inter_intra: true,
            require_xlink_candidate: false,
            xlink_top_n: 0,
            max_xlink_mods: 0,

            missed_cleavages: 1,
            enzyme: "trypsin".to_string(),
            custom_enzyme: None,
            digestion: "full-digest".to_string(),
            min_mass: 200.0,
            max_mass: 10000.0,
            min_length: 5,
            max_length: 50,

            precursor_window: 3.0,
            precursor_window_type: WindowKind::Mass,
            precursor_window_weibull: 25.0,
            precursor_window_type_weibull: WindowKind::Mass,
            isotope_windows: vec![0],

            isotopic_mass: MassMode::Monoisotopic,
            fragment_mass: MassMode::Monoisotopic,

            mz_bin_width: 1.0005079,
            mz_bin_offset: 0.68,

            use_a_ions: false,
            use_b_ions: true,
            use_c_ions: false,
            use_x_ions: false,
            use_y_ions: true,
            use_z_ions: false,
            max_ion_charge: 2,
            use_flanking_peaks: false,

            remove_precursor_tolerance: Some(1.5),
            spectrum_charge: None,
            spectrum_min_mz: None,
            spectrum_max_mz: None,
            zstate_fallback_enabled: true,
            zstate_fallback_threshold: crate::zstate_fallback::DEFAULT_THRESHOLD,

            compute_p_values: true,
            min_weibull_points: 3000,
            fraction_top_scores_to_fit: 0.55,

            top_match: 5,
            concat: false,

            sp_score_tolerance: 0.5,
            progress_cadence: 1000,

            seed: 1,
        }
    }
}

impl Config {
    /// Parse a `key = value` text configuration, one key per line, `#` starting a comment,
    /// against the recognised keys of spec.md §6. Unknown keys are ignored, matching `crux`'s own
    /// parameter file tolerance (extra keys are commonly left over from a shared parameter file).
    ///
    /// # Errors
    /// Returns [`XlIdentError::InvalidConfiguration`] if a recognised key's value fails to parse
    /// or falls outside its valid range (spec.md §7 item 1).
    pub fn parse(text: &str) -> Result<Self, BoxedError<'static, XlIdentError>> {
        let mut raw = BTreeMap::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(config_error(format!("line '{line}' is not of the form key = value")));
            };
            raw.insert(key.trim().to_string(), value.trim().to_string());
        }
        Self::from_map(&raw)
    }

    fn from_map(raw: &BTreeMap<String, String>) -> Result<Self, BoxedError<'static, XlIdentError>> {
        let mut config = Self::default();

        if let Some(v) = raw.get("link sites") {
            config.link_sites = v.clone();
        }
        if let Some(v) = raw.get("link mass") {
            config.link_mass = parse_f64(v)?;
        }
        if let Some(v) = raw.get("mono-link") {
            config.mono_link_mods = parse_modification_list(v, true)?;
        }
        if let Some(v) = raw.get("variable-mods") {
            config.variable_mods = parse_modification_list(v, false)?;
        }
        if let Some(v) = raw.get("xlink-prevents-cleavage") {
            config.xlink_prevents_cleavage = v.bytes().collect();
        }

        assign_bool(raw, "xlink-include-linears", &mut config.xlink_include_linears)?;
        assign_bool(raw, "xlink-include-deadends", &mut config.xlink_include_deadends)?;
        assign_bool(raw, "xlink-include-selfloops", &mut config.xlink_include_selfloops)?;
        assign_bool(raw, "xlink-include-inter", &mut config.xlink_include_inter)?;
        assign_bool(raw, "xlink-include-intra", &mut config.xlink_include_intra)?;
        assign_bool(raw, "xlink-include-inter-intra", &mut config.xlink_include_inter_intra)?;
        assign_bool(raw, "require-xlink-candidate", &mut config.require_xlink_candidate)?;
        assign_usize(raw, "xlink-top-n", &mut config.xlink_top_n)?;
        assign_usize(raw, "max-xlink-mods", &mut config.max_xlink_mods)?;

        assign_usize(raw, "missed-cleavages", &mut config.missed_cleavages)?;
        if let Some(v) = raw.get("enzyme") {
            config.enzyme = v.clone();
        }
        if let Some(v) = raw.get("custom-enzyme") {
            config.custom_enzyme = Some(v.clone());
        }
        if let Some(v) = raw.get("digestion") {
            config.digestion = v.clone();
        }
        assign_f64(raw, "min-mass", &mut config.min_mass)?;
        assign_f64(raw, "max-mass", &mut config.max_mass)?;
        assign_usize(raw, "min-length", &mut config.min_length)?;
        assign_usize(raw, "max-length", &mut config.max_length)?;
        if config.min_mass > config.max_mass || config.min_length > config.max_length {
            return Err(config_error("min-mass/min-length must not exceed max-mass/max-length".to_string()));
        }

        assign_f64(raw, "precursor-window", &mut config.precursor_window)?;
        if let Some(v) = raw.get("precursor-window-type") {
            config.precursor_window_type = parse_window_kind(v)?;
        }
        assign_f64(raw, "precursor-window-weibull", &mut config.precursor_window_weibull)?;
        if let Some(v) = raw.get("precursor-window-type-weibull") {
            config.precursor_window_type_weibull = parse_window_kind(v)?;
        }
        if let Some(v) = raw.get("isotope-windows") {
            config.isotope_windows = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| s.parse::<i32>().map_err(|_| config_error(format!("'{s}' is not an integer isotope offset"))))
                .collect::<Result<_, _>>()?;
        }

        if let Some(v) = raw.get("isotopic-mass") {
            config.isotopic_mass = parse_mass_mode(v)?;
        }
        if let Some(v) = raw.get("fragment-mass") {
            config.fragment_mass = parse_mass_mode(v)?;
        }

        assign_f64(raw, "mz-bin-width", &mut config.mz_bin_width)?;
        assign_f64(raw, "mz-bin-offset", &mut config.mz_bin_offset)?;

        assign_bool(raw, "use-a-ions", &mut config.use_a_ions)?;
        assign_bool(raw, "use-b-ions", &mut config.use_b_ions)?;
        assign_bool(raw, "use-c-ions", &mut config.use_c_ions)?;
        assign_bool(raw, "use-x-ions", &mut config.use_x_ions)?;
        assign_bool(raw, "use-y-ions", &mut config.use_y_ions)?;
        assign_bool(raw, "use-z-ions", &mut config.use_z_ions)?;
        if let Some(v) = raw.get("max-ion-charge") {
            config.max_ion_charge = v.parse().map_err(|_| config_error(format!("'{v}' is not a valid max-ion-charge")))?;
            if config.max_ion_charge == 0 {
                return Err(config_error("max-ion-charge must be at least 1".to_string()));
            }
        }
        assign_bool(raw, "use-flanking-peaks", &mut config.use_flanking_peaks)?;

        if let Some(v) = raw.get("remove-precursor-tolerance") {
            config.remove_precursor_tolerance = parse_optional_f64(v)?;
        }
        if let Some(v) = raw.get("spectrum-charge") {
            config.spectrum_charge = if v.eq_ignore_ascii_case("none") { None } else { Some(v.parse().map_err(|_| config_error(format!("'{v}' is not a valid spectrum-charge")))?) };
        }
        if let Some(v) = raw.get("spectrum-min-mz") {
            config.spectrum_min_mz = parse_optional_f64(v)?;
        }
        if let Some(v) = raw.get("spectrum-max-mz") {
            config.spectrum_max_mz = parse_optional_f64(v)?;
        }
        assign_bool(raw, "zstate-fallback-enabled", &mut config.zstate_fallback_enabled)?;
        assign_f64(raw, "zstate-fallback-threshold", &mut config.zstate_fallback_threshold)?;

        assign_bool(raw, "compute-p-values", &mut config.compute_p_values)?;
        assign_usize(raw, "min-weibull-points", &mut config.min_weibull_points)?;
        assign_f64(raw, "fraction-top-scores-to-fit", &mut config.fraction_top_scores_to_fit)?;
        if !(0.0..=1.0).contains(&config.fraction_top_scores_to_fit) {
            return Err(config_error("fraction-top-scores-to-fit must be within [0, 1]".to_string()));
        }

        assign_usize(raw, "top-match", &mut config.top_match)?;
        assign_bool(raw, "concat", &mut config.concat)?;
        assign_f64(raw, "sp-score-tolerance", &mut config.sp_score_tolerance)?;
        assign_usize(raw, "progress-cadence", &mut config.progress_cadence)?;

        if let Some(v) = raw.get("seed") {
            config.seed = v.parse().map_err(|_| config_error(format!("'{v}' is not a valid seed")))?;
        }

        Ok(config)
    }

    /// The precursor search tolerance built from `precursor-window`/`precursor-window-type`.
    #[must_use]
    pub fn precursor_tolerance(&self) -> Tolerance {
        Tolerance::new(self.precursor_window_type, self.precursor_window)
    }

    /// The (generally wider) Weibull-training tolerance built from `precursor-window-weibull`.
    #[must_use]
    pub fn weibull_tolerance(&self) -> Tolerance {
        Tolerance::new(self.precursor_window_type_weibull, self.precursor_window_weibull)
    }

    /// The ion prediction configuration implied by `use-a/b/c/x/y/z-ions`, `max-ion-charge`,
    /// `use-flanking-peaks`, and `fragment-mass` (spec.md §4.4, §6).
    #[must_use]
    pub fn ion_prediction_config(&self) -> xlannotate::prelude::IonPredictionConfig {
        xlannotate::prelude::IonPredictionConfig {
            use_a: self.use_a_ions,
            use_b: self.use_b_ions,
            use_c: self.use_c_ions,
            use_x: self.use_x_ions,
            use_y: self.use_y_ions,
            use_z: self.use_z_ions,
            max_ion_charge: self.max_ion_charge,
            use_flanking_peaks: self.use_flanking_peaks,
            mass_mode: self.fragment_mass,
        }
    }

    /// The preprocessing configuration implied by `mz-bin-width`/`mz-bin-offset`/
    /// `remove-precursor-tolerance` (spec.md §4.5 step 1-4).
    #[must_use]
    pub fn preprocess_config(&self) -> xlannotate::prelude::PreprocessConfig {
        xlannotate::prelude::PreprocessConfig {
            bin_width: self.mz_bin_width,
            bin_offset: self.mz_bin_offset,
            remove_precursor_tolerance: self.remove_precursor_tolerance,
            ..Default::default()
        }
    }
}

fn config_error(detail: String) -> BoxedError<'static, XlIdentError> {
    BoxedError::new(XlIdentError::InvalidConfiguration, "invalid configuration", detail, Context::none())
}

fn parse_f64(v: &str) -> Result<f64, BoxedError<'static, XlIdentError>> {
    v.parse().map_err(|_| config_error(format!("'{v}' is not a valid number")))
}

fn parse_optional_f64(v: &str) -> Result<Option<f64>, BoxedError<'static, XlIdentError>> {
    if v.eq_ignore_ascii_case("none") || v.is_empty() {
        Ok(None)
    } else {
        Ok(Some(parse_f64(v)?))
    }
}

fn assign_f64(raw: &BTreeMap<String, String>, key: &str, slot: &mut f64) -> Result<(), BoxedError<'static, XlIdentError>> {
    if let Some(v) = raw.get(key) {
        *slot = parse_f64(v)?;
    }
    Ok(())
}

fn assign_usize(raw: &BTreeMap<String, String>, key: &str, slot: &mut usize) -> Result<(), BoxedError<'static, XlIdentError>> {
    if let Some(v) = raw.get(key) {
        *slot = v.parse().map_err(|_| config_error(format!("'{v}' is not a valid non-negative integer for '{key}'")))?;
    }
    Ok(())
}

fn assign_bool(raw: &BTreeMap<String, String>, key: &str, slot: &mut bool) -> Result<(), BoxedError<'static, XlIdentError>> {
    if let Some(v) = raw.get(key) {
        *slot = match v.to_ascii_lowercase().as_str() {
            "true" | "1" | "t" | "yes" => true,
            "false" | "0" | "f" | "no" => false,
            _ => return Err(config_error(format!("'{v}' is not a valid boolean for '{key}'"))),
        };
    }
    Ok(())
}

fn parse_window_kind(v: &str) -> Result<WindowKind, BoxedError<'static, XlIdentError>> {
    match v.to_ascii_lowercase().as_str() {
        "mass" => Ok(WindowKind::Mass),
        "mz" => Ok(WindowKind::Mz),
        "ppm" => Ok(WindowKind::Ppm),
        _ => Err(config_error(format!("'{v}' is not mass, mz, or ppm"))),
    }
}

fn parse_mass_mode(v: &str) -> Result<MassMode, BoxedError<'static, XlIdentError>> {
    match v.to_ascii_lowercase().as_str() {
        "mono" | "monoisotopic" => Ok(MassMode::Monoisotopic),
        "average" => Ok(MassMode::Average),
        _ => Err(config_error(format!("'{v}' is not mono or average"))),
    }
}

/// Parse a `;`-separated list of modification specs, each `RESIDUES:MASS:SYMBOL[:CAP]`, e.g.
/// `K:156.0786:monolink:1` or `STY:79.966331:ph:3`. `RESIDUES` may also be `nterm` or `cterm` for
/// a terminally restricted modification.
fn parse_modification_list(spec: &str, is_mono_link: bool) -> Result<Vec<VariableModification>, BoxedError<'static, XlIdentError>> {
    spec.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|one| parse_modification_spec(one, is_mono_link))
        .collect()
}

fn parse_modification_spec(spec: &str, is_mono_link: bool) -> Result<VariableModification, BoxedError<'static, XlIdentError>> {
    let parts: Vec<&str> = spec.split(':').collect();
    if parts.len() < 3 {
        return Err(config_error(format!("'{spec}' is not RESIDUES:MASS:SYMBOL[:CAP]")));
    }
    let (allowed_residues, position) = match parts[0] {
        "nterm" => (Vec::new(), PositionRestriction::NTerminal { max_distance: Some(0) }),
        "cterm" => (Vec::new(), PositionRestriction::CTerminal { max_distance: Some(0) }),
        residues => (residues.bytes().collect(), PositionRestriction::Any),
    };
    let mass_delta = parse_f64(parts[1])?;
    let symbol = parts[2].to_string();
    let per_peptide_cap = match parts.get(3) {
        Some(cap) => cap.parse().map_err(|_| config_error(format!("'{cap}' is not a valid per-peptide cap")))?,
        None => usize::from(is_mono_link) * 1 + usize::from(!is_mono_link) * 3,
    };
    Ok(VariableModification {
        symbol,
        mass_delta,
        allowed_residues,
        per_peptide_cap,
        position,
        prevents_cleavage: false,
        prevents_xlink: is_mono_link,
        is_mono_link,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass_validation() {
        let config = Config::from_map(&BTreeMap::new()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn parses_overridden_keys() {
        let text = "link sites = K:K\nlink mass = 138.0681\nxlink-top-n = 5\nmax-xlink-mods = 2\nconcat = true\n# a comment\n";
        let config = Config::parse(text).unwrap();
        assert_eq!(config.xlink_top_n, 5);
        assert_eq!(config.max_xlink_mods, 2);
        assert!(config.concat);
    }

    #[test]
    fn rejects_fraction_outside_unit_interval() {
        let text = "fraction-top-scores-to-fit = 1.5\n";
        assert!(Config::parse(text).is_err());
    }

    #[test]
    fn parses_mono_link_modification_spec() {
        let text = "mono-link = K:156.0786:monolink:1\n";
        let config = Config::parse(text).unwrap();
        assert_eq!(config.mono_link_mods.len(), 1);
        let m = &config.mono_link_mods[0];
        assert!(m.is_mono_link);
        assert!(m.allows_residue(b'K'));
        assert!((m.mass_delta - 156.0786).abs() < 1e-9);
    }

    #[test]
    fn rejects_malformed_modification_spec() {
        let text = "variable-mods = K-only-two-fields\n";
        assert!(Config::parse(text).is_err());
    }
}
