use xlannotate::prelude::Spectrum;

/// An external collaborator exposing an iterator over the spectra of one MS2/mzXML/mzML/MGF
/// file (spec.md §6). Object-safe so a driver can hold `&mut dyn SpectrumSource` without knowing
/// the concrete file format; parsing those formats is outside this crate's scope (spec.md §1).
pub trait SpectrumSource {
    /// Returns the next spectrum in file order, or `None` once exhausted.
    fn next_spectrum(&mut self) -> Option<Spectrum>;
}

impl<I> SpectrumSource for I
where
    I: Iterator<Item = Spectrum>,
{
    fn next_spectrum(&mut self) -> Option<Spectrum> {
        self.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xlannotate::prelude::{Peak, ZState};

    #[test]
    fn an_in_memory_vec_iterator_satisfies_spectrum_source() {
        let spectrum = Spectrum::new(1, 1, 500.0, vec![ZState::from_mz(2, 500.0)], vec![Peak { mz: 100.0, intensity: 1.0 }]);
        let mut source = vec![spectrum].into_iter();
        assert!(source.next_spectrum().is_some());
        assert!(source.next_spectrum().is_none());
    }
}
