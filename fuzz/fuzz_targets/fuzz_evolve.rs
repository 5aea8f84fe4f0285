#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use structree_core::Rational;
use structree_tree::{GrowthError, GrowthTree};

#[derive(Debug, Arbitrary)]
struct FuzzStructor {
    rate_numerator: u8,
    rate_denominator: u8,
    magnitude_numerator: i8,
    magnitude_denominator: u8,
}

impl FuzzStructor {
    /// Small positive rates and magnitudes keep runs short.
    fn rate(&self) -> Option<Rational> {
        let numerator = i64::from(self.rate_numerator % 4) + 1;
        let denominator = i64::from(self.rate_denominator % 4) + 1;
        Rational::new(numerator, denominator).ok()
    }

    fn magnitude(&self) -> Option<Rational> {
        let numerator = i64::from(self.magnitude_numerator % 16);
        let denominator = i64::from(self.magnitude_denominator % 4) + 1;
        Rational::new(numerator, denominator).ok()
    }
}

fuzz_target!(|structors: Vec<FuzzStructor>| {
    let Ok(mut tree) = GrowthTree::new(Rational::ONE) else {
        return;
    };
    let mut applied = Rational::ZERO;
    for structor in structors.iter().take(12) {
        let (Some(rate), Some(magnitude)) = (structor.rate(), structor.magnitude()) else {
            return;
        };
        match tree.evolve(rate, magnitude) {
            Ok(_) => {}
            // Leaving 64-bit bounds is a reported error, not a defect.
            Err(GrowthError::Arithmetic(_)) => return,
            Err(error) => panic!("evolve({rate}, {magnitude}) failed: {error}"),
        }
        let Ok(next) = applied.checked_add(magnitude) else {
            return;
        };
        applied = next;

        assert_eq!(tree.total_weight(), Ok(applied), "weight not conserved");
        assert_eq!(tree.validate(), Ok(()), "invalid tree");
        assert!(tree.node(tree.root()).is_some(), "root removed");
    }
});
