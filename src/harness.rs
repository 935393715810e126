use crate::array::NdArray;
use crate::binding::{self, ApplyResult};
use crate::error::Result;
use log::debug;
use std::fmt::Display;
use std::io::Write;

/// The calls the smoke test exercises.
pub trait Binding {
    type Applied: Display;

    fn apply(&mut self, matrix: &NdArray<f64>) -> Result<Self::Applied>;

    fn dot(&self, left: &NdArray<f64>, right: &NdArray<f64>) -> Result<NdArray<f64>>;

    fn dot2(&self, left: &NdArray<f64>, right: &NdArray<f64>) -> Result<NdArray<f64>>;
}

/// `Binding` backed by the module level functions in `binding`.
#[derive(Clone, Copy, Debug, Default)]
pub struct NativeBinding;

impl Binding for NativeBinding {
    type Applied = ApplyResult;

    fn apply(&mut self, matrix: &NdArray<f64>) -> Result<ApplyResult> {
        binding::apply(matrix)
    }

    fn dot(&self, left: &NdArray<f64>, right: &NdArray<f64>) -> Result<NdArray<f64>> {
        binding::dot(left, right)
    }

    fn dot2(&self, left: &NdArray<f64>, right: &NdArray<f64>) -> Result<NdArray<f64>> {
        binding::dot2(left, right).map(NdArray::from)
    }
}

/// The row vector `[[1, 2, 3]]` and the column vector `[[1], [2], [3]]`.
pub fn fixtures() -> Result<(NdArray<f64>, NdArray<f64>)> {
    let a = NdArray::from_rows(&[[1.0, 2.0, 3.0]])?;
    let b = NdArray::from_rows(&[[1.0], [2.0], [3.0]])?;
    Ok((a, b))
}

pub struct Harness<B, W> {
    binding: B,
    out: W,
}

impl<B: Binding, W: Write> Harness<B, W> {
    pub fn new(binding: B, out: W) -> Self {
        Harness { binding, out }
    }

    /// Prints `apply(a)`, `dot(a, b)` and `dot2(a, b)`, one per line. Stops at
    /// the first failing call, so nothing follows the failure in the output.
    pub fn run(&mut self, a: &NdArray<f64>, b: &NdArray<f64>) -> Result<()> {
        debug!("apply on {:?}", a.shape());
        let applied = self.binding.apply(a)?;
        writeln!(self.out, "{}", applied)?;

        debug!("dot on {:?} x {:?}", a.shape(), b.shape());
        let product = self.binding.dot(a, b)?;
        writeln!(self.out, "{}", product)?;

        let product2 = self.binding.dot2(a, b)?;
        writeln!(self.out, "{}", product2)?;

        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> (B, W) {
        (self.binding, self.out)
    }
}
