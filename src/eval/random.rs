use rand::{Rng, RngCore};

/// Source of randomness handed to a context.
///
/// Every generator from `rand` is a source; a source is never shared between concurrent
/// evaluations.
pub trait RandomSource {
    /// Uniform sample in `[0, 1)`.
    fn next_float(&mut self) -> f64;

    /// Uniform sample in `[0, bound)`; `0` when `bound` is not positive.
    fn next_int(&mut self, bound: i64) -> i64;
}

impl<R: RngCore> RandomSource for R {
    fn next_float(&mut self) -> f64 {
        self.gen::<f64>()
    }

    fn next_int(&mut self, bound: i64) -> i64 {
        if bound <= 0 {
            return 0;
        }
        self.gen_range(0..bound)
    }
}
