/// Mass of a water molecule (the terminal "cap" applied once per peptide), monoisotopic Da.
pub const WATER: f64 = 18.010_565;
/// Mass of a water molecule, average Da.
pub const WATER_AVERAGE: f64 = 18.015_28;
/// Mass of a proton, used to convert between neutral mass and m/z.
pub const PROTON: f64 = 1.007_276_5;
/// Mass difference between two adjacent isotope peaks, used for isotope-offset search windows.
pub const NEUTRON: f64 = 1.002_549_5;

/// Monoisotopic residue (amino acid minus water) masses, indexed by `letter - b'A'`.
///
/// Values for the twenty standard amino acids plus selenocysteine (U) and pyrrolysine (O) are
/// exact to six decimal places. The four ambiguity codes (B, Z, J, X) have no single true mass;
/// they are given the average of the residues they stand in for (D/N, E/Q, I/L, and the mean of
/// all twenty respectively) so that a peptide containing one still has a usable, if approximate,
/// mass rather than silently contributing zero.
const MONOISOTOPIC: [f64; 26] = {
    let mut table = [0.0_f64; 26];
    table[b'A' as usize - b'A' as usize] = 71.037_114;
    table[b'R' as usize - b'A' as usize] = 156.101_111;
    table[b'N' as usize - b'A' as usize] = 114.042_927;
    table[b'D' as usize - b'A' as usize] = 115.026_943;
    table[b'C' as usize - b'A' as usize] = 103.009_185;
    table[b'E' as usize - b'A' as usize] = 129.042_593;
    table[b'Q' as usize - b'A' as usize] = 128.058_578;
    table[b'G' as usize - b'A' as usize] = 57.021_464;
    table[b'H' as usize - b'A' as usize] = 137.058_912;
    table[b'I' as usize - b'A' as usize] = 113.084_064;
    table[b'L' as usize - b'A' as usize] = 113.084_064;
    table[b'K' as usize - b'A' as usize] = 128.094_963;
    table[b'M' as usize - b'A' as usize] = 131.040_485;
    table[b'F' as usize - b'A' as usize] = 147.068_414;
    table[b'P' as usize - b'A' as usize] = 97.052_764;
    table[b'S' as usize - b'A' as usize] = 87.032_028;
    table[b'T' as usize - b'A' as usize] = 101.047_679;
    table[b'W' as usize - b'A' as usize] = 186.079_313;
    table[b'Y' as usize - b'A' as usize] = 163.063_329;
    table[b'V' as usize - b'A' as usize] = 99.068_414;
    table[b'U' as usize - b'A' as usize] = 150.953_636;
    table[b'O' as usize - b'A' as usize] = 237.147_727;
    table[b'B' as usize - b'A' as usize] =
        (114.042_927 + 115.026_943) / 2.0; // N/D
    table[b'Z' as usize - b'A' as usize] =
        (129.042_593 + 128.058_578) / 2.0; // E/Q
    table[b'J' as usize - b'A' as usize] = 113.084_064; // I/L
    table
};

const AVERAGE: [f64; 26] = {
    let mut table = [0.0_f64; 26];
    table[b'A' as usize - b'A' as usize] = 71.0788;
    table[b'R' as usize - b'A' as usize] = 156.1875;
    table[b'N' as usize - b'A' as usize] = 114.1038;
    table[b'D' as usize - b'A' as usize] = 115.0886;
    table[b'C' as usize - b'A' as usize] = 103.1388;
    table[b'E' as usize - b'A' as usize] = 129.1155;
    table[b'Q' as usize - b'A' as usize] = 128.1307;
    table[b'G' as usize - b'A' as usize] = 57.0519;
    table[b'H' as usize - b'A' as usize] = 137.1411;
    table[b'I' as usize - b'A' as usize] = 113.1594;
    table[b'L' as usize - b'A' as usize] = 113.1594;
    table[b'K' as usize - b'A' as usize] = 128.1741;
    table[b'M' as usize - b'A' as usize] = 131.1926;
    table[b'F' as usize - b'A' as usize] = 147.1766;
    table[b'P' as usize - b'A' as usize] = 97.1167;
    table[b'S' as usize - b'A' as usize] = 87.0782;
    table[b'T' as usize - b'A' as usize] = 101.1051;
    table[b'W' as usize - b'A' as usize] = 186.2132;
    table[b'Y' as usize - b'A' as usize] = 163.1760;
    table[b'V' as usize - b'A' as usize] = 99.1326;
    table[b'U' as usize - b'A' as usize] = 150.0388;
    table[b'O' as usize - b'A' as usize] = 237.2982;
    table[b'B' as usize - b'A' as usize] = (114.1038 + 115.0886) / 2.0;
    table[b'Z' as usize - b'A' as usize] = (129.1155 + 128.1307) / 2.0;
    table[b'J' as usize - b'A' as usize] = 113.1594;
    table
};

/// Monoisotopic mass of a residue (the amino acid minus the water lost on peptide bond
/// formation). Panics if `letter` is not an uppercase ASCII letter, since that invariant is
/// enforced when a [`crate::sequence::Peptide`] is built.
#[must_use]
pub fn monoisotopic_residue_mass(letter: u8) -> f64 {
    debug_assert!(letter.is_ascii_uppercase(), "residue must be A-Z");
    MONOISOTOPIC[(letter - b'A') as usize]
}

/// Average mass of a residue, see [`monoisotopic_residue_mass`].
#[must_use]
pub fn average_residue_mass(letter: u8) -> f64 {
    debug_assert!(letter.is_ascii_uppercase(), "residue must be A-Z");
    AVERAGE[(letter - b'A') as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glycine_is_the_lightest_standard_residue() {
        for letter in b'A'..=b'Z' {
            if letter == b'G' || !MONOISOTOPIC[(letter - b'A') as usize].is_finite() {
                continue;
            }
            if MONOISOTOPIC[(letter - b'A') as usize] == 0.0 {
                continue; // unused letter code
            }
            assert!(monoisotopic_residue_mass(b'G') <= monoisotopic_residue_mass(letter));
        }
    }

    #[test]
    fn mrapk_mass_matches_expectation() {
        let mass: f64 = "MRAPK".bytes().map(monoisotopic_residue_mass).sum::<f64>() + WATER;
        // M+R+A+P+K + water, used by the linear-only sanity end-to-end scenario.
        assert!((mass - 601.337_002).abs() < 1e-3, "mass was {mass}");
    }
}
