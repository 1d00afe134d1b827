mod element;
mod mass_mode;

pub use element::{
    NEUTRON, PROTON, WATER, WATER_AVERAGE, average_residue_mass, monoisotopic_residue_mass,
};
pub use mass_mode::MassMode;
