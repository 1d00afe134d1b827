use serde::{Deserialize, Serialize};

/// The unit a [`Tolerance`] is expressed in, matching the `precursor-window-type` /
/// `precursor-window-type-weibull` configuration keys (spec.md §6).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum WindowKind {
    /// A fixed mass offset in Daltons.
    #[default]
    Mass,
    /// A fixed m/z offset.
    Mz,
    /// Parts-per-million of the target value.
    Ppm,
}

/// A search window around a target mass, expressed in one of the three units the candidate
/// enumerator and the Weibull training-point enumerator both understand.
///
/// `width = 0` always collapses [`Tolerance::bounds`] to `(value, value)`, i.e. only an exact
/// mass match is admitted, per spec.md §8 "Boundary behaviours".
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    kind: WindowKind,
    width: f64,
}

impl Tolerance {
    /// Build a new tolerance of the given kind and width. `width` must be non-negative.
    #[must_use]
    pub fn new(kind: WindowKind, width: f64) -> Self {
        debug_assert!(width >= 0.0, "tolerance width must not be negative");
        Self { kind, width }
    }

    #[must_use]
    pub fn kind(&self) -> WindowKind {
        self.kind
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Compute the `[lo, hi]` bounds of this tolerance's window around `value`.
    #[must_use]
    pub fn bounds(&self, value: f64) -> (f64, f64) {
        if self.width == 0.0 {
            return (value, value);
        }
        match self.kind {
            WindowKind::Mass | WindowKind::Mz => (value - self.width, value + self.width),
            WindowKind::Ppm => {
                let delta = value * self.width / 1_000_000.0;
                (value - delta, value + delta)
            }
        }
    }
}

impl std::fmt::Display for Tolerance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            WindowKind::Mass => write!(f, "{} Da", self.width),
            WindowKind::Mz => write!(f, "{} m/z", self.width),
            WindowKind::Ppm => write!(f, "{} ppm", self.width),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_width_is_exact() {
        let tolerance = Tolerance::new(WindowKind::Mass, 0.0);
        assert_eq!(tolerance.bounds(500.0), (500.0, 500.0));
    }

    #[test]
    fn ppm_scales_with_value() {
        let tolerance = Tolerance::new(WindowKind::Ppm, 10.0);
        let (lo, hi) = tolerance.bounds(1_000_000.0);
        assert!((lo - 999_990.0).abs() < 1e-6);
        assert!((hi - 1_000_010.0).abs() < 1e-6);
    }
}
