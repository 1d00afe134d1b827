mod tolerance;

pub use tolerance::{Tolerance, WindowKind};
