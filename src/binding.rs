//! Module level functions of the binding: the background subtractor shared by
//! every `apply` call, two matrix products and a couple of small helpers.

use crate::array::{Element, NdArray};
use crate::background::{BackgroundSubtractorMog2, Mog2Params};
use crate::constants::{SAMPLE_CHANNELS, SAMPLE_COLS, SAMPLE_ROWS};
use crate::convert::IntoMat;
use crate::error::{Error, Result};
use log::debug;
use nalgebra::DMatrix;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

lazy_static! {
    static ref SUBTRACTOR: Mutex<Option<BackgroundSubtractorMog2>> = Mutex::new(None);
}

fn subtractor() -> MutexGuard<'static, Option<BackgroundSubtractorMog2>> {
    // The model is plain data, a panic elsewhere cannot leave it half written
    SUBTRACTOR.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Foreground mask of a frame, paired with the frame itself.
#[derive(Clone, Debug, PartialEq)]
pub struct ApplyResult {
    pub foreground_mask: NdArray<u8>,
    pub frame: NdArray<f64>,
}

impl fmt::Display for ApplyResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.foreground_mask.repr(), self.frame.repr())
    }
}

/// Runs the frame through the process wide background model, creating it with
/// default parameters on first use.
pub fn apply(frame: &NdArray<f64>) -> Result<ApplyResult> {
    let mut guard = subtractor();
    if guard.is_none() {
        *guard = Some(BackgroundSubtractorMog2::new(Mog2Params::default())?);
    }

    let model = guard.as_mut().ok_or(Error::NotInitialized)?;

    let foreground_mask = model.apply(frame, None)?;
    let background = model.background_image()?;
    debug!("background image {:?} after {} frame(s)", background.shape(), model.frames_seen());

    Ok(ApplyResult { foreground_mask, frame: frame.clone() })
}

/// Forgets the process wide background model.
pub fn reset_background_model() {
    *subtractor() = None;
}

fn check_product(left: &DMatrix<f64>, right: &DMatrix<f64>) -> Result<()> {
    if left.ncols() != right.nrows() {
        return Err(Error::IncompatibleSizes { left: left.shape(), right: right.shape() });
    }
    Ok(())
}

/// Matrix product with the operands converted explicitly.
pub fn dot<L: Element, R: Element>(left: &NdArray<L>, right: &NdArray<R>) -> Result<NdArray<f64>> {
    let left_mat = left.to_mat()?;
    let right_mat = right.to_mat()?;
    check_product(&left_mat, &right_mat)?;
    let result = left_mat * right_mat;
    Ok(NdArray::from(&result))
}

/// Matrix product on operands that convert themselves.
pub fn dot2<L: IntoMat, R: IntoMat>(left: L, right: R) -> Result<DMatrix<f64>> {
    let left = left.into_mat()?;
    let right = right.into_mat()?;
    check_product(&left, &right)?;
    Ok(left * right)
}

/// A blank 16-bit, three channel 240x320 image.
pub fn make_cv_16uc3_matrix() -> NdArray<u16> {
    NdArray::zeros(vec![SAMPLE_ROWS, SAMPLE_COLS, SAMPLE_CHANNELS])
}

pub fn increment_elements_by_one(matrix: NdArray<f64>) -> NdArray<f64> {
    matrix.mapv(|e| e + 1.0)
}
